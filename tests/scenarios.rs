//! End-to-end scenarios through the public API.

use breakout_bt::prelude::*;
use chrono::{DateTime, Duration, FixedOffset, NaiveTime};

const SESSION: &str = include_str!("../data/nifty_option_1m.csv");

fn at(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(&format!("2025-11-19T{hour:02}:{minute:02}:00+05:30")).unwrap()
}

fn bar(time: DateTime<FixedOffset>, open: f64, high: f64, low: f64, close: f64) -> Bar {
    BarBuilder::builder()
        .timestamp(time)
        .open(open)
        .high(high)
        .low(low)
        .close(close)
        .build()
        .unwrap()
}

fn minutes_from(start: DateTime<FixedOffset>, ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    ohlc.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| bar(start + Duration::minutes(i as i64), o, h, l, c))
        .collect()
}

#[test]
fn single_reference_breakout_on_recorded_session() {
    let bars = bars_from_csv(SESSION.as_bytes()).unwrap();
    assert_eq!(bars.len(), 13);
    assert_eq!(bars[0].timestamp(), at(9, 15));

    let mut events = Vec::new();
    let backtest = Backtest::new(bars, Parameters::default());
    let result = backtest.run_with_trace(Strategy::SingleReference, |event| events.push(event));

    // 09:18 red sets 96.7, 09:19 red shifts to 89.0, 09:20 misses, 09:21 breaks
    let at_0918 = events.iter().find(|e| e.index() == 3).unwrap();
    assert!(matches!(at_0918, Event::ReferenceShifted { high, .. } if *high == 96.7));
    assert!(events.iter().any(|e| matches!(e, Event::ReferenceShifted { index: 4, high, .. } if *high == 89.0)));
    assert!(!events.iter().any(|e| e.index() == 5 && matches!(e, Event::EntrySignal { .. })));

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.entry_time, at(9, 21));
    assert_eq!(trade.entry_price, 89.0);
    assert_eq!(trade.initial_stop, 83.0);
    assert_eq!(trade.reference_bar.timestamp(), at(9, 19));

    // 09:24 high 100.55 is 11.55 up: one step past the trigger, stop to 94
    assert_eq!(trade.trailing_history.len(), 1);
    assert_eq!(trade.trailing_history[0].time, at(9, 24));
    assert_eq!(trade.trailing_history[0].new_stop, 94.0);
    assert!(events.iter().any(|e| matches!(e, Event::StopTrailed { index: 9, new_stop, .. } if *new_stop == 94.0)));

    assert_eq!(trade.exit_reason, ExitReason::EndOfData);
    assert_eq!(trade.exit_time, at(9, 27));
    assert_eq!(trade.exit_price, 99.3);
    assert_eq!(trade.pl, 10.3);
    assert_eq!(trade.final_stop, 94.0);
    assert_eq!(trade.highest_profit, 102.25 - 89.0);

    let summary = &result.summary;
    assert_eq!(summary.total_trades, 1);
    assert_eq!(summary.net_pl, 10.3);
    assert_eq!(summary.total_bars, 13);
    assert_eq!(summary.start_time, at(9, 15));
    assert_eq!(summary.end_time, at(9, 27));
}

#[test]
fn cost_to_cost_trailing() {
    let parameters = Parameters::default().trailing(5.0, 5.0).cost_to_cost(true);
    let reference = bar(at(9, 30), 99.0, 99.5, 95.0, 96.0);
    let entry_bar = bar(at(9, 31), 96.0, 100.5, 95.5, 100.2);
    let mut manager = TradeManager::enter(&parameters, 100.0, at(9, 31), reference, entry_bar);
    assert_eq!(manager.current_stop(), 95.0);

    // profit 12: floor((12 - 5) / 5) = 1 step, stop to 100 + 5
    assert!(manager.check_exit(&bar(at(9, 32), 100.5, 112.0, 100.4, 111.0)).is_none());
    assert_eq!(manager.current_stop(), 105.0);
    assert_eq!(manager.trailing_history()[0].steps, 1);

    assert!(manager.check_exit(&bar(at(9, 33), 111.0, 111.5, 105.5, 106.0)).is_none());

    let exit = manager.check_exit(&bar(at(9, 34), 106.0, 106.5, 104.9, 105.2)).unwrap();
    assert_eq!(exit.reason, ExitReason::TrailingStop);
    assert_eq!(exit.price, 105.0);

    let trade = manager.summary(exit.price, exit.reason, exit.time);
    assert_eq!(trade.pl, 5.0);
    assert_eq!(trade.highest_profit, 12.0);
}

#[test]
fn stop_is_not_moved_by_its_own_bar() {
    let parameters = Parameters::default().trailing(5.0, 5.0);
    let reference = bar(at(9, 30), 99.0, 99.5, 95.0, 96.0);
    let entry_bar = bar(at(9, 31), 96.0, 100.5, 95.5, 100.2);
    let mut manager = TradeManager::enter(&parameters, 100.0, at(9, 31), reference, entry_bar);

    // reaches +12 and trades down to 104 within the same bar: the stop was still 95
    assert!(manager.check_exit(&bar(at(9, 32), 106.0, 112.0, 104.0, 104.5)).is_none());
    assert_eq!(manager.current_stop(), 105.0);
}

#[test]
fn target_checked_before_close() {
    let parameters = Parameters::default().profit_target(20.0);
    let reference = bar(at(9, 30), 99.0, 99.5, 95.0, 96.0);
    let entry_bar = bar(at(9, 31), 96.0, 100.5, 95.5, 100.2);
    let mut manager = TradeManager::enter(&parameters, 100.0, at(9, 31), reference, entry_bar);

    let exit = manager.check_exit(&bar(at(9, 32), 101.0, 121.0, 100.5, 115.0)).unwrap();
    assert_eq!(exit.price, 120.0);
    assert_eq!(exit.reason, ExitReason::Target);
    assert_eq!(exit.reason.to_string(), "Target Hit");
}

#[test]
fn time_exit_at_cutoff() {
    let cutoff = NaiveTime::from_hms_opt(9, 40, 0).unwrap();
    let bars = minutes_from(
        at(9, 36),
        &[
            (100.0, 101.0, 99.0, 100.5),
            (100.5, 102.0, 99.5, 101.8), // entry at 101
            (101.8, 103.0, 101.0, 102.5),
            (102.5, 103.5, 102.0, 103.0),
            (103.0, 103.8, 102.6, 103.4), // 09:40
        ],
    );
    let parameters = Parameters::default().time_exit(cutoff);
    let result = run(bars, Strategy::AdjacentBreakout, parameters);

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.exit_reason, ExitReason::TimeExit);
    assert_eq!(trade.exit_reason.to_string(), "Time Exit");
    assert_eq!(trade.exit_time, at(9, 40));
    assert_eq!(trade.exit_price, 103.4);
    assert_eq!(trade.pl, 2.4);
}

#[test]
fn time_exit_parsed_from_text() {
    let cutoff = parse_time_of_day("09:40").unwrap();
    assert_eq!(cutoff, NaiveTime::from_hms_opt(9, 40, 0).unwrap());
}

#[test]
fn every_strategy_on_recorded_session() {
    let bars = bars_from_csv(SESSION.as_bytes()).unwrap();
    let backtest = Backtest::new(bars, Parameters::default());

    for strategy in Strategy::ALL {
        let result = backtest.run(strategy);
        let summary = &result.summary;
        assert_eq!(summary.total_trades, result.trades.len());
        assert_eq!(summary.winning_trades + summary.losing_trades, summary.total_trades);
        assert_eq!(summary.exit_breakdown.values().sum::<usize>(), summary.total_trades);
        for pair in result.trades.windows(2) {
            assert!(pair[0].exit_time <= pair[1].entry_time, "{strategy}: overlapping trades");
        }
    }
}
