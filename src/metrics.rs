//! Performance metrics for backtesting.
//!
//! This module provides tools to calculate, from the closed-trade ledger:
//! - Max drawdown of the cumulative P&L curve
//! - Profit factor
//! - Expectancy
//! - Win rate
//!
//! It needs to enable `metrics` feature to use it.

use std::fmt;

use crate::{PriceCalculus, engine::*};

/// A collection of trading metrics calculated from a ledger.
///
/// All amounts are in points. It is typically constructed from a [`BacktestResult`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pls: Vec<f64>,
    skipped_setups: usize,
}

impl From<&BacktestResult> for Metrics {
    fn from(value: &BacktestResult) -> Self {
        Self {
            pls: value.trades.iter().map(|trade| trade.pl).collect(),
            skipped_setups: value.skipped_setups.len(),
        }
    }
}

impl Metrics {
    /// Creates a new `Metrics` instance from the P&L of each trade, in order.
    pub fn new(pls: Vec<f64>) -> Self {
        Self { pls, skipped_setups: 0 }
    }

    /// Returns the P&L of each trade.
    pub fn pls(&self) -> &[f64] {
        &self.pls
    }

    /// Returns the number of trades.
    pub fn trades(&self) -> usize {
        self.pls.len()
    }

    /// Sum of the winning P&L.
    pub fn gross_profit(&self) -> f64 {
        self.pls.iter().filter(|pl| **pl > 0.0).sum::<f64>().round2()
    }

    /// Sum of the losing P&L, as a positive amount.
    pub fn gross_loss(&self) -> f64 {
        self.pls.iter().filter(|pl| **pl < 0.0).map(|pl| pl.abs()).sum::<f64>().round2()
    }

    /// Computes the largest peak-to-trough decline of the cumulative P&L, in points.
    pub fn max_drawdown(&self) -> f64 {
        let mut equity = 0.0;
        let mut max_peak = 0.0;
        let mut max_drawdown = 0.0;

        for pl in &self.pls {
            equity += pl;
            if equity > max_peak {
                max_peak = equity;
            }
            let drawdown = max_peak - equity;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }

        max_drawdown.round2()
    }

    /// Computes the profit factor.
    pub fn profit_factor(&self) -> f64 {
        let total_losses = self.gross_loss();
        if total_losses == 0.0 {
            return f64::INFINITY;
        }

        self.gross_profit() / total_losses
    }

    /// Average P&L per trade.
    pub fn expectancy(&self) -> f64 {
        if self.pls.is_empty() {
            return 0.0;
        }
        (self.pls.iter().sum::<f64>() / self.pls.len() as f64).round2()
    }

    /// Computes the win rate as a percentage of winning trades.
    pub fn win_rate(&self) -> f64 {
        if self.pls.is_empty() {
            return 0.0;
        }

        let winning_trades = self.pls.iter().filter(|pl| **pl > 0.0).count();
        (winning_trades as f64 / self.pls.len() as f64) * 100.0
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Metrics ===")?;
        writeln!(f, "Trades: {}", self.trades())?;
        writeln!(f, "Skipped Setups: {}", self.skipped_setups)?;
        writeln!(f, "Gross Profit: {:.2}", self.gross_profit())?;
        writeln!(f, "Gross Loss: {:.2}", self.gross_loss())?;
        #[allow(clippy::writeln_empty_string)]
        writeln!(f, "")?;
        writeln!(f, "Max Drawdown: {:.2} pts", self.max_drawdown())?;
        writeln!(f, "Profit Factor: {:.2}", self.profit_factor())?;
        writeln!(f, "Expectancy: {:.2}", self.expectancy())?;
        writeln!(f, "Win Rate: {:.2}%", self.win_rate())
    }
}

#[cfg(test)]
#[test]
fn max_drawdown() {
    let metrics = Metrics::new(vec![10.0, 5.0, -8.0, -4.0, 6.0]);
    assert_eq!(metrics.max_drawdown(), 12.0); // peak 15, trough 3
}

#[cfg(test)]
#[test]
fn max_drawdown_no_trades() {
    let metrics = Metrics::new(vec![]);
    assert_eq!(metrics.max_drawdown(), 0.0);
}

#[cfg(test)]
#[test]
fn drawdown_from_the_start() {
    let metrics = Metrics::new(vec![-3.0, -2.0, 1.0]);
    assert_eq!(metrics.max_drawdown(), 5.0);
}

#[cfg(test)]
#[test]
fn profit_factor() {
    let metrics = Metrics::new(vec![20.0, -10.0]);
    assert_eq!(metrics.profit_factor(), 2.0); // 20 / 10 = 2.0
}

#[cfg(test)]
#[test]
fn profit_factor_no_losses() {
    let metrics = Metrics::new(vec![20.0, 0.0]);
    assert_eq!(metrics.profit_factor(), f64::INFINITY); // No losses
}

#[cfg(test)]
#[test]
fn profit_factor_no_trades() {
    let metrics = Metrics::new(vec![]);
    assert_eq!(metrics.profit_factor(), f64::INFINITY); // No trades
}

#[cfg(test)]
#[test]
fn expectancy() {
    let metrics = Metrics::new(vec![20.0, -10.0, 5.0]);
    assert_eq!(metrics.expectancy(), 5.0);
    assert_eq!(Metrics::new(vec![]).expectancy(), 0.0);
}

#[cfg(test)]
#[test]
fn win_rate() {
    let metrics = Metrics::new(vec![20.0, -10.0, 0.0, 1.5]);
    assert_eq!(metrics.win_rate(), 50.0);
}

#[cfg(test)]
#[test]
fn win_rate_no_trades() {
    let metrics = Metrics::new(vec![]);
    assert_eq!(metrics.win_rate(), 0.0);
}

#[cfg(test)]
#[test]
fn from_result() {
    let result = BacktestResult {
        trades: Vec::new(),
        skipped_setups: Vec::new(),
        summary: Summary::default(),
    };
    let metrics = Metrics::from(&result);
    assert_eq!(metrics.trades(), 0);
    assert!(metrics.to_string().contains("Win Rate: 0.00%"));
}
