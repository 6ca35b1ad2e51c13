//! Core simulation engine.
//!
//! This module provides the fundamental types for replaying bars:
//! - `Bar`: OHLCV sample of one interval.
//! - `Parameters`: stop, trailing, target and time-exit configuration.
//! - `TradeManager`: lifecycle of one open position.
//! - `Trade` / `SkippedSetup`: the ledger records.
//! - `Summary`: statistics over the ledger.
//! - `Backtest`: the bar-by-bar loop driving a strategy session.

mod bar;
mod event;
mod manager;
mod parameters;
mod summary;
mod trade;

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::strategies::{EntrySession, Strategy};

pub use bar::*;
#[cfg(feature = "serde")]
pub(crate) use bar::BarRecord;
pub use event::*;
pub use manager::*;
pub use parameters::*;
pub use summary::*;
pub use trade::*;

/// Outcome of one run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    /// Closed trades, in order of entry.
    pub trades: Vec<Trade>,
    /// Setups rejected by the same-bar policy.
    pub skipped_setups: Vec<SkippedSetup>,
    /// Statistics over `trades`.
    pub summary: Summary,
}

/// Replays a bar sequence through a strategy.
///
/// The bars are shared read-only, so one `Backtest` can run every strategy, and clones
/// are cheap enough to hand out to worker threads.
#[derive(Debug, Clone)]
pub struct Backtest {
    bars: Arc<[Bar]>,
    parameters: Parameters,
}

impl Backtest {
    /// Creates a new backtest.
    ///
    /// ### Arguments
    /// * `bars` - Bars in ascending chronological order. May be empty.
    /// * `parameters` - Run configuration; invalid settings are replaced by their fallbacks.
    pub fn new(bars: impl Into<Arc<[Bar]>>, parameters: Parameters) -> Self {
        Self {
            bars: bars.into(),
            parameters: parameters.resolved(),
        }
    }

    /// Returns the replayed bars.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Returns the effective parameters (after fallbacks).
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Runs one strategy over the bars.
    pub fn run(&self, strategy: Strategy) -> BacktestResult {
        self.run_with_trace(strategy, |_| {})
    }

    /// Runs one strategy over the bars and reports every state transition.
    ///
    /// ### Arguments
    /// * `strategy` - The strategy to replay; a fresh session is created for this run.
    /// * `on_event` - Receives the session and trade events in bar order.
    ///
    /// ### Example
    /// ```rust
    /// use breakout_bt::prelude::*;
    ///
    /// let backtest = Backtest::new(Vec::<Bar>::new(), Parameters::default());
    /// let mut events = Vec::new();
    /// let result = backtest.run_with_trace(Strategy::SingleReference, |event| events.push(event));
    /// assert!(result.trades.is_empty());
    /// assert!(events.is_empty());
    /// ```
    pub fn run_with_trace<F>(&self, strategy: Strategy, on_event: F) -> BacktestResult
    where
        F: FnMut(Event),
    {
        let mut session = strategy.create_session();
        self.replay(&mut session, on_event)
    }

    /// Drives any entry session over the bars.
    ///
    /// Per bar: evaluate the open trade, feed the session, open a trade on a signal when
    /// flat, then resolve the entry bar itself against the new trade.
    pub fn replay<S, F>(&self, session: &mut S, mut on_event: F) -> BacktestResult
    where
        S: EntrySession,
        F: FnMut(Event),
    {
        let bars = &self.bars[..];
        let policy = self.parameters.same_bar_policy;
        let mut sink = |event: Event| {
            trace!(?event);
            on_event(event);
        };

        let mut trades = Vec::new();
        let mut skipped_setups = Vec::new();
        let mut position: Option<TradeManager> = None;

        for (index, bar) in bars.iter().enumerate() {
            if let Some(mut manager) = position.take() {
                match check(&mut manager, bar, index, &mut sink) {
                    Some(exit) => {
                        trades.push(close(manager, exit, index, &mut sink));
                        session.on_exit();
                    }
                    None => position = Some(manager),
                }
            }

            let signal = session.check_entry(bars, index, &mut sink);
            if position.is_some() {
                continue;
            }
            let Some(signal) = signal else {
                continue;
            };

            let time = bar.timestamp();
            let entry_price = signal.entry_price;
            if !entry_price.is_finite() || entry_price <= 0.0 {
                warn!(index, entry_price, "malformed entry signal discarded");
                sink(Event::SignalDiscarded {
                    index,
                    time,
                    entry_price,
                });
                continue;
            }

            let mut manager = TradeManager::enter(&self.parameters, entry_price, time, signal.reference, *bar);
            let initial_stop = manager.initial_stop();

            if policy == SameBarPolicy::RejectAmbiguous && bar.low() <= initial_stop && bar.high() >= entry_price {
                debug!(index, entry_price, initial_stop, "ambiguous entry bar, setup skipped");
                sink(Event::SetupSkipped {
                    index,
                    time,
                    reason: SkipReason::Ambiguous,
                });
                skipped_setups.push(SkippedSetup {
                    timestamp: time,
                    reference_bar: signal.reference,
                    entry_bar: *bar,
                    entry_price,
                    initial_stop,
                    reason: SkipReason::Ambiguous,
                });
                session.on_exit();
                continue;
            }

            debug!(index, entry_price, initial_stop, "trade opened");
            sink(Event::TradeOpened {
                index,
                time,
                entry_price,
                initial_stop,
            });
            session.on_entry();

            match check(&mut manager, bar, index, &mut sink) {
                Some(exit)
                    if policy == SameBarPolicy::WickTolerant && exit.reason.is_stop() && bar.is_bullish() =>
                {
                    debug!(index, stop = exit.price, "stop touched on the bullish entry bar, kept open");
                    sink(Event::WickTolerated {
                        index,
                        time,
                        stop: exit.price,
                    });
                    position = Some(manager);
                }
                Some(exit) => {
                    trades.push(close(manager, exit, index, &mut sink));
                    session.on_exit();
                }
                None => position = Some(manager),
            }
        }

        if let (Some(manager), Some(last)) = (position, bars.last()) {
            let exit = Exit {
                price: last.close(),
                reason: ExitReason::EndOfData,
                time: last.timestamp(),
            };
            trades.push(close(manager, exit, bars.len() - 1, &mut sink));
        }

        let summary = Summary::from_ledger(&trades, skipped_setups.len(), bars);
        BacktestResult {
            trades,
            skipped_setups,
            summary,
        }
    }
}

/// Runs `strategy` over `bars` with `parameters`.
///
/// Shorthand for [`Backtest::new`] followed by [`Backtest::run`].
pub fn run(bars: impl Into<Arc<[Bar]>>, strategy: Strategy, parameters: Parameters) -> BacktestResult {
    Backtest::new(bars, parameters).run(strategy)
}

/// Evaluates one bar against the open trade and reports stop moves.
fn check(manager: &mut TradeManager, bar: &Bar, index: usize, sink: &mut Trace<'_>) -> Option<Exit> {
    let moves = manager.trailing_history().len();
    let exit = manager.check_exit(bar);
    if let Some(update) = manager.trailing_history().get(moves) {
        sink(Event::StopTrailed {
            index,
            time: update.time,
            new_stop: update.new_stop,
        });
    }
    exit
}

fn close(manager: TradeManager, exit: Exit, index: usize, sink: &mut Trace<'_>) -> Trade {
    let trade = manager.summary(exit.price, exit.reason, exit.time);
    debug!(
        index,
        exit_price = trade.exit_price,
        pl = trade.pl,
        reason = %trade.exit_reason,
        "trade closed"
    );
    sink(Event::TradeClosed {
        index,
        time: exit.time,
        exit_price: trade.exit_price,
        reason: trade.exit_reason,
        pl: trade.pl,
    });
    trade
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::{EntrySignal, fixtures::*};

    fn bt(ohlc: &[(f64, f64, f64, f64)], parameters: Parameters) -> Backtest {
        Backtest::new(bars(ohlc), parameters)
    }

    fn collect(backtest: &Backtest, strategy: Strategy) -> (BacktestResult, Vec<Event>) {
        let mut events = Vec::new();
        let result = backtest.run_with_trace(strategy, |event| events.push(event));
        (result, events)
    }

    #[test]
    fn empty_bars() {
        let result = run(Vec::<Bar>::new(), Strategy::SingleReference, Parameters::default());
        assert!(result.trades.is_empty());
        assert!(result.skipped_setups.is_empty());
        assert_eq!(result.summary, Summary::default());
    }

    #[test]
    fn every_strategy_survives_a_single_bar() {
        let backtest = bt(&[(100.0, 101.0, 99.0, 100.5)], Parameters::default());
        for strategy in Strategy::ALL {
            let result = backtest.run(strategy);
            assert!(result.trades.is_empty());
            assert_eq!(result.summary.total_bars, 1);
        }
    }

    #[test]
    fn open_trade_closes_at_end_of_data() {
        let backtest = bt(
            &[
                (96.65, 96.7, 86.75, 86.8),
                (87.05, 89.0, 83.0, 83.8),
                (84.0, 87.35, 81.35, 85.7),
                (85.8, 91.4, 85.0, 87.6),
            ],
            Parameters::default(),
        );
        let result = backtest.run(Strategy::SingleReference);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.entry_price, 89.0);
        assert_eq!(trade.initial_stop, 83.0);
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        assert_eq!(trade.exit_price, 87.6);
        assert_eq!(trade.pl, -1.4);
        assert_eq!(trade.entry_time, trade.exit_time);
        assert_eq!(result.summary.exit_breakdown[&ExitReason::EndOfData], 1);
    }

    #[test]
    fn bullish_entry_bar_tolerates_stop_wick() {
        let backtest = bt(
            &[
                (100.0, 101.0, 99.0, 100.5),
                (100.5, 102.0, 98.5, 101.8), // breaks 101, wicks through the 99 stop
                (101.8, 103.0, 100.5, 102.5),
            ],
            Parameters::default(),
        );
        let (result, events) = collect(&backtest, Strategy::AdjacentBreakout);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.entry_price, 101.0);
        assert_eq!(trade.exit_reason, ExitReason::EndOfData);
        assert_eq!(trade.pl, 1.5);
        assert_eq!(trade.highest_profit, 2.0);

        let opened = events.iter().position(|e| matches!(e, Event::TradeOpened { .. })).unwrap();
        assert!(matches!(events[opened + 1], Event::WickTolerated { index: 1, stop, .. } if stop == 99.0));
        assert!(matches!(
            events.last(),
            Some(Event::TradeClosed { index: 2, reason: ExitReason::EndOfData, .. })
        ));
    }

    #[test]
    fn bearish_entry_bar_stops_out() {
        let backtest = bt(
            &[(100.0, 101.0, 99.0, 100.5), (101.5, 102.0, 98.5, 99.0)],
            Parameters::default(),
        );
        let result = backtest.run(Strategy::AdjacentBreakout);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_price, 99.0);
        assert_eq!(trade.pl, -2.0);
        assert_eq!(trade.exit_time, trade.entry_time);
    }

    #[test]
    fn target_on_entry_bar_finalizes() {
        let backtest = bt(
            &[(100.0, 101.0, 99.0, 100.5), (100.5, 102.0, 99.5, 101.8)],
            Parameters::default().profit_target(1.0),
        );
        let result = backtest.run(Strategy::AdjacentBreakout);

        assert_eq!(result.trades.len(), 1);
        assert_eq!(result.trades[0].exit_reason, ExitReason::Target);
        assert_eq!(result.trades[0].exit_price, 102.0);
        assert_eq!(result.trades[0].pl, 1.0);
    }

    #[test]
    fn reject_ambiguous_records_skipped_setup() {
        let backtest = bt(
            &[
                (100.0, 101.0, 99.0, 100.5),
                (100.5, 102.0, 98.5, 101.8),
                (101.8, 103.0, 100.5, 102.5),
            ],
            Parameters::default().same_bar_policy(SameBarPolicy::RejectAmbiguous),
        );
        let (result, events) = collect(&backtest, Strategy::AdjacentBreakout);

        assert!(result.trades.is_empty());
        assert_eq!(result.skipped_setups.len(), 1);
        let skipped = &result.skipped_setups[0];
        assert_eq!(skipped.entry_price, 101.0);
        assert_eq!(skipped.initial_stop, 99.0);
        assert_eq!(skipped.reason, SkipReason::Ambiguous);
        assert_eq!(result.summary.skipped_setups, 1);
        assert!(events.iter().any(|e| matches!(e, Event::SetupSkipped { index: 1, .. })));
        assert!(!events.iter().any(|e| matches!(e, Event::TradeOpened { .. })));
    }

    #[test]
    fn reject_ambiguous_keeps_clean_entries() {
        let backtest = bt(
            &[(100.0, 101.0, 99.0, 100.5), (100.5, 102.0, 99.5, 101.8)],
            Parameters::default().same_bar_policy(SameBarPolicy::RejectAmbiguous),
        );
        let result = backtest.run(Strategy::AdjacentBreakout);
        assert!(result.skipped_setups.is_empty());
        assert_eq!(result.trades.len(), 1);
    }

    #[test]
    fn trailing_stop_moves_then_hits() {
        let backtest = bt(
            &[
                (100.0, 101.0, 99.0, 100.5),
                (100.5, 102.0, 99.5, 101.8),  // entry at 101, stop 99
                (101.8, 107.5, 101.5, 107.0), // +6.5: stop to 101 for the next bar
                (107.0, 107.2, 100.8, 101.2), // hits 101
            ],
            Parameters::default(),
        );
        let (result, events) = collect(&backtest, Strategy::AdjacentBreakout);

        assert_eq!(result.trades.len(), 1);
        let trade = &result.trades[0];
        assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
        assert_eq!(trade.exit_price, 101.0);
        assert_eq!(trade.final_stop, 101.0);
        assert_eq!(trade.pl, 0.0);
        assert_eq!(trade.highest_profit, 6.5);
        assert_eq!(trade.trailing_history.len(), 1);
        assert!(events.iter().any(|e| matches!(e, Event::StopTrailed { index: 2, new_stop, .. } if *new_stop == 101.0)));
    }

    #[test]
    fn signals_ignored_while_in_trade() {
        let backtest = bt(
            &[
                (100.0, 101.0, 99.0, 100.5),
                (100.5, 102.0, 99.5, 101.8), // entry
                (101.8, 103.0, 101.0, 102.8), // new reference while in the trade
                (102.8, 104.0, 102.0, 103.5), // breaks 103, ignored
            ],
            Parameters::default().without_trailing(),
        );
        let (result, events) = collect(&backtest, Strategy::AdjacentBreakout);

        assert_eq!(result.trades.len(), 1);
        assert_eq!(events.iter().filter(|e| matches!(e, Event::TradeOpened { .. })).count(), 1);
        assert!(events.iter().filter(|e| matches!(e, Event::EntrySignal { .. })).count() > 1);
    }

    #[test]
    fn session_sees_exit_bar() {
        // after a same-bar stop out the session starts over on the next bar
        let backtest = bt(
            &[
                (100.0, 101.0, 99.0, 100.5),
                (101.5, 102.0, 98.5, 99.0),  // entry at 101, stopped at 99
                (99.0, 99.5, 98.0, 98.2),    // reference
                (98.2, 100.0, 98.1, 99.8),   // breaks 99.5
            ],
            Parameters::default(),
        );
        let result = backtest.run(Strategy::AdjacentBreakout);
        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.trades[1].entry_price, 99.5);
        assert_eq!(result.trades[1].initial_stop, 98.0);
    }

    struct Malformed;

    impl EntrySession for Malformed {
        fn check_entry(&mut self, bars: &[Bar], index: usize, _: &mut Trace<'_>) -> Option<EntrySignal> {
            let entry_price = if index == 0 { f64::NAN } else { 0.0 };
            Some(EntrySignal {
                entry_price,
                reference: bars[index],
            })
        }
    }

    #[test]
    fn malformed_signals_are_discarded() {
        let backtest = bt(
            &[(100.0, 101.0, 99.0, 100.5), (100.5, 102.0, 99.5, 101.8)],
            Parameters::default(),
        );
        let mut events = Vec::new();
        let result = backtest.replay(&mut Malformed, |event| events.push(event));

        assert!(result.trades.is_empty());
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, Event::SignalDiscarded { .. })));
    }

    #[test]
    fn invalid_parameters_are_resolved() {
        let parameters = Parameters::default()
            .initial_stop(InitialStopMode::Fixed)
            .fixed_stop_points(-3.0);
        let backtest = Backtest::new(Vec::<Bar>::new(), parameters);
        assert_eq!(backtest.parameters().initial_stop_mode, InitialStopMode::ReferenceLow);
    }
}
