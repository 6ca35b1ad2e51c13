//! # Breakout BT: bar-replay backtester for breakout strategies
//!
//! **Breakout BT** replays a historical sequence of OHLCV bars through a breakout entry rule
//! and a stop/trailing/target/time exit policy, and returns the trade ledger with its summary
//! statistics. It is built for intraday option and index data (1-minute bars) where the setup
//! is read off single candles.
//!
//! ## Why Breakout BT?
//! - **Deterministic**: one synchronous O(n) pass, no hidden state between runs.
//! - **Pluggable Entries**: each strategy is a self-contained session behind one trait.
//! - **Traceable**: every state transition is reported as an [`Event`](engine::Event) you can assert on.
//! - **Parallel Sweeps**: run parameter grids on all cores with the `optimizer` feature.
//!
//! ## Core Components
//! | Component   | Description                                                                                     |
//! |-------------|-------------------------------------------------------------------------------------------------|
//! | **`Bar`** | One OHLCV sample with its exchange-local timestamp.                                             |
//! | **`Strategy`** | Descriptor creating a fresh entry session per run.                                         |
//! | **`TradeManager`** | Owns the initial stop, trailing stop, target and time exit of the open trade.        |
//! | **`Summary`** | Trade counts, P&L statistics and the exit-reason histogram.                                 |
//! | **`Metrics`** | Win rate, profit factor, drawdown and expectancy.                                          |
//! | **`Optimizer`** | Runs many parameter combinations in parallel.                                            |
//! | **`Backtest`** | The engine that replays the bars.                                                          |
//!
//! ## Strategies
//! | Id                       | Entry                                                                              |
//! |--------------------------|------------------------------------------------------------------------------------|
//! | `red_candle_high_break`  | Break of the latest bearish bar's high, within 2 bars.                            |
//! | `four_red_candle_break`  | Break of the first bullish bar after 4+ consecutive bearish bars.                  |
//! | `green_continuation`     | Break of a bullish bar's high within 2 bars.                                      |
//! | `red_green_flexible`     | Bearish/bullish reference breakout that cools down after large-range bars.         |
//! | `whatever_breaks`        | Break of the previous bar's high.                                                  |
//!
//! ## Getting Started
//! ```rust
//! use breakout_bt::prelude::*;
//! use chrono::{DateTime, Duration};
//!
//! let start = DateTime::parse_from_rfc3339("2025-11-19T09:18:00+05:30").unwrap();
//! let ohlc = [
//!     (96.65, 96.7, 86.75, 86.8),
//!     (87.05, 89.0, 83.0, 83.8),
//!     (84.0, 87.35, 81.35, 85.7),
//!     (85.8, 91.4, 85.0, 87.6),
//! ];
//! let bars = ohlc
//!     .iter()
//!     .enumerate()
//!     .map(|(i, &(open, high, low, close))| {
//!         BarBuilder::builder()
//!             .timestamp(start + Duration::minutes(i as i64))
//!             .open(open)
//!             .high(high)
//!             .low(low)
//!             .close(close)
//!             .build()
//!     })
//!     .collect::<Result<Vec<_>>>()
//!     .unwrap();
//!
//! let parameters = Parameters::default().trailing(5.0, 5.0).profit_target(20.0);
//! let result = Backtest::new(bars, parameters).run(Strategy::SingleReference);
//!
//! assert_eq!(result.trades[0].entry_price, 89.0);
//! println!("{}", result.summary);
//! ```
//!
//! ## Error Handling
//! A run never fails: bad configuration falls back to safe defaults, ambiguous bars become
//! skipped setups and empty data yields an empty ledger. Building bars and loading files
//! return [`errors::Result`].
#![warn(missing_docs)]

/// Core engine: bars, parameters, trade lifecycle and the replay loop.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Entry strategies and their sessions.
pub mod strategies;

/// Bar loaders.
pub mod utils;

/// Performance metrics: drawdown, profit factor, win rate, etc.
#[cfg(feature = "metrics")]
pub mod metrics;

/// Strategy parameter optimization.
#[cfg(feature = "optimizer")]
pub mod optimizer;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::strategies::*;
    pub use crate::utils::*;

    #[cfg(feature = "metrics")]
    pub use crate::metrics::*;

    #[cfg(feature = "optimizer")]
    pub use crate::optimizer::*;
}

/// Point arithmetic on prices.
///
/// Every P&L and profit figure is expressed in points, rounded to 2 decimals.
pub trait PriceCalculus {
    /// Rounds to 2 decimals, half away from zero.
    fn round2(self) -> Self;

    /// Points gained from `self` to `exit`.
    ///
    /// ### Arguments
    /// * `exit` - The price the position is valued at.
    ///
    /// ### Returns
    /// `exit - self`, rounded to 2 decimals.
    fn points_to(self, exit: Self) -> Self;
}

impl PriceCalculus for f64 {
    fn round2(self) -> Self {
        (self * 100.0).round() / 100.0
    }

    fn points_to(self, exit: Self) -> Self {
        (exit - self).round2()
    }
}
