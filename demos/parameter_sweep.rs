//! # Trailing Parameters Sweep
//!
//! Runs every strategy over a grid of trailing triggers and steps in parallel and prints
//! the best combinations by net P&L.

use breakout_bt::prelude::*;

#[derive(Clone)]
struct TrailingGrid;

impl ParameterCombination for TrailingGrid {
    type Output = (Strategy, f64, f64);

    fn generate() -> Vec<Self::Output> {
        Strategy::ALL
            .into_iter()
            .flat_map(|strategy| {
                (1..=10).flat_map(move |trigger| {
                    (1..=5).map(move |step| (strategy, f64::from(trigger), f64::from(step)))
                })
            })
            .collect()
    }
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/nifty_option_1m.csv");
    let bars = get_bars_from_file(path)?;
    let opt = Optimizer::<TrailingGrid>::new(bars);

    let mut result = opt.with(|&(strategy, trigger, step)| {
        Ok((strategy, Parameters::default().trailing(trigger, step)))
    })?;

    result.sort_by(|(_, a), (_, b)| b.net_pl.partial_cmp(&a.net_pl).unwrap_or(std::cmp::Ordering::Equal));

    println!("{:<24} {:>7} {:>5} {:>7} {:>8}", "strategy", "trigger", "step", "trades", "net p&l");
    for ((strategy, trigger, step), summary) in result.iter().take(10) {
        println!(
            "{:<24} {:>7.1} {:>5.1} {:>7} {:>8.2}",
            strategy.id(),
            trigger,
            step,
            summary.total_trades,
            summary.net_pl
        );
    }

    Ok(())
}
