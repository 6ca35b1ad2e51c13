//! # Red Candle High Break
//!
//! Replays the recorded option session in `data/` through the single reference session
//! and prints every engine event followed by the summary.

use breakout_bt::prelude::*;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/nifty_option_1m.csv");
    let bars = get_bars_from_file(path)?;

    let parameters = Parameters::default().trailing(5.0, 5.0).cost_to_cost(true);
    let backtest = Backtest::new(bars, parameters);

    let result = backtest.run_with_trace(Strategy::SingleReference, |event| {
        println!("[{:>3}] {event:?}", event.index());
    });

    println!();
    for trade in &result.trades {
        println!(
            "{} -> {}  {:.2} -> {:.2}  ({:+.2}, {})",
            trade.entry_time.format("%H:%M"),
            trade.exit_time.format("%H:%M"),
            trade.entry_price,
            trade.exit_price,
            trade.pl,
            trade.exit_reason
        );
    }
    println!();
    println!("{}", result.summary);

    Ok(())
}
