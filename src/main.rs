use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use breakout_bt::prelude::{
    Backtest, BacktestResult, InitialStopMode, Parameters, SameBarPolicy, Strategy, get_bars_from_file,
    parse_time_of_day,
};
use chrono::NaiveTime;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "breakout-bt")]
#[command(about = "Replay historical bars through a breakout strategy")]
struct Args {
    /// Bar file (CSV with a timestamp,open,high,low,close header)
    #[arg(short, long, required_unless_present = "list")]
    file: Option<PathBuf>,

    /// Strategy id, see --list
    #[arg(short, long, default_value = "red_candle_high_break")]
    strategy: Strategy,

    /// Initial stop: reference_low, fixed or entry_low
    #[arg(long, default_value = "reference_low")]
    stop_mode: InitialStopMode,

    /// Stop distance in points for the fixed stop mode
    #[arg(long, default_value = "10.0")]
    fixed_points: f64,

    /// Disable the trailing stop
    #[arg(long)]
    no_trailing: bool,

    /// Profit in points from which the stop starts trailing
    #[arg(long, default_value = "5.0")]
    trigger: f64,

    /// Trailing step in points
    #[arg(long, default_value = "5.0")]
    step: f64,

    /// First trailing move goes to trigger - step instead of the entry price
    #[arg(long)]
    no_cost_to_cost: bool,

    /// Profit target in points
    #[arg(long)]
    target: Option<f64>,

    /// Close open trades from this time of day (HH:MM)
    #[arg(long, value_parser = parse_time_of_day)]
    time_exit: Option<NaiveTime>,

    /// Entry bar stop breaches: wick_tolerant or reject_ambiguous
    #[arg(long, default_value = "wick_tolerant")]
    same_bar: SameBarPolicy,

    /// Print every trade
    #[arg(long)]
    trades: bool,

    /// Print the whole result as JSON
    #[cfg(feature = "serde")]
    #[arg(long)]
    json: bool,

    /// List the available strategies and exit
    #[arg(long)]
    list: bool,

    /// Print verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn parameters(&self) -> Parameters {
        let mut parameters = Parameters::default()
            .initial_stop(self.stop_mode)
            .fixed_stop_points(self.fixed_points)
            .cost_to_cost(!self.no_cost_to_cost)
            .same_bar_policy(self.same_bar);
        parameters = if self.no_trailing {
            parameters.without_trailing()
        } else {
            parameters.trailing(self.trigger, self.step)
        };
        if let Some(target) = self.target {
            parameters = parameters.profit_target(target);
        }
        if let Some(cutoff) = self.time_exit {
            parameters = parameters.time_exit(cutoff);
        }
        parameters
    }
}

fn print_trades(result: &BacktestResult) {
    println!(
        "{:>3}  {:<25}  {:>9}  {:<25}  {:>9}  {:>8}  {}",
        "#", "entry time", "entry", "exit time", "exit", "p&l", "reason"
    );
    for (i, trade) in result.trades.iter().enumerate() {
        println!(
            "{:>3}  {:<25}  {:>9.2}  {:<25}  {:>9.2}  {:>8.2}  {}",
            i + 1,
            trade.entry_time.to_rfc3339(),
            trade.entry_price,
            trade.exit_time.to_rfc3339(),
            trade.exit_price,
            trade.pl,
            trade.exit_reason
        );
    }
    for skipped in &result.skipped_setups {
        println!(
            "  -  {:<25}  {:>9.2}  skipped: {}",
            skipped.timestamp.to_rfc3339(),
            skipped.entry_price,
            skipped.reason
        );
    }
    println!();
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "debug" } else { "info" })),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.list {
        for strategy in Strategy::ALL {
            println!("{:<24} {}: {}", strategy.id(), strategy.name(), strategy.description());
        }
        return Ok(());
    }

    let Some(path) = args.file.as_ref() else {
        bail!("--file is required");
    };

    #[cfg(feature = "serde")]
    let bars = if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        breakout_bt::utils::get_bars_from_json(path)
    } else {
        get_bars_from_file(path)
    };
    #[cfg(not(feature = "serde"))]
    let bars = get_bars_from_file(path);
    let bars = bars.with_context(|| format!("Failed to load bars from {}", path.display()))?;

    info!("Loaded {} bars from {}", bars.len(), path.display());
    info!("Strategy: {} ({})", args.strategy, args.strategy.id());

    let backtest = Backtest::new(bars, args.parameters());
    let result = backtest.run(args.strategy);

    #[cfg(feature = "serde")]
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if args.trades {
        print_trades(&result);
    }
    println!("{}", result.summary);

    #[cfg(feature = "metrics")]
    {
        println!();
        println!("{}", breakout_bt::metrics::Metrics::from(&result));
    }

    Ok(())
}
