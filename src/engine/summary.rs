use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, FixedOffset};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    PriceCalculus,
    engine::{Bar, ExitReason, Trade},
};

/// Run statistics reduced from the closed-trade ledger.
///
/// Every field is always populated; a run without trades gives zeros and an empty
/// histogram.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Summary {
    /// Number of closed trades.
    pub total_trades: usize,
    /// Trades with a strictly positive P&L.
    pub winning_trades: usize,
    /// Trades with a P&L of zero or less.
    pub losing_trades: usize,
    /// Sum of all P&L, in points.
    pub net_pl: f64,
    /// Mean P&L of the winning trades.
    pub avg_win: f64,
    /// Mean P&L of the losing trades.
    pub avg_loss: f64,
    /// Best P&L of a winning trade.
    pub largest_win: f64,
    /// Worst P&L of a losing trade.
    pub largest_loss: f64,
    /// Number of setups rejected without a trade.
    pub skipped_setups: usize,
    /// Closed trades per exit reason.
    pub exit_breakdown: BTreeMap<ExitReason, usize>,
    /// Number of bars replayed.
    pub total_bars: usize,
    /// Timestamp of the first bar.
    pub start_time: DateTime<FixedOffset>,
    /// Timestamp of the last bar.
    pub end_time: DateTime<FixedOffset>,
}

impl Summary {
    /// Reduces a ledger to its statistics.
    ///
    /// ### Arguments
    /// * `trades` - Closed trades of the run.
    /// * `skipped_setups` - Number of rejected setups.
    /// * `bars` - The replayed bars, for the bar count and the time span.
    pub fn from_ledger(trades: &[Trade], skipped_setups: usize, bars: &[Bar]) -> Self {
        let (wins, losses): (Vec<f64>, Vec<f64>) = trades
            .iter()
            .map(|trade| trade.pl)
            .partition(|pl| *pl > 0.0);

        let mut exit_breakdown = BTreeMap::new();
        for trade in trades {
            *exit_breakdown.entry(trade.exit_reason).or_insert(0) += 1;
        }

        Self {
            total_trades: trades.len(),
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            net_pl: trades.iter().map(|trade| trade.pl).sum::<f64>().round2(),
            avg_win: mean(&wins).round2(),
            avg_loss: mean(&losses).round2(),
            largest_win: wins.iter().copied().reduce(f64::max).unwrap_or_default().round2(),
            largest_loss: losses.iter().copied().reduce(f64::min).unwrap_or_default().round2(),
            skipped_setups,
            exit_breakdown,
            total_bars: bars.len(),
            start_time: bars.first().map(Bar::timestamp).unwrap_or_default(),
            end_time: bars.last().map(Bar::timestamp).unwrap_or_default(),
        }
    }

    /// Share of winning trades in percent, zero without trades.
    pub fn win_rate(&self) -> f64 {
        if self.total_trades == 0 {
            return 0.0;
        }
        (self.winning_trades as f64 / self.total_trades as f64 * 100.0).round2()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Backtest Summary ===")?;
        writeln!(f, "Period: {} -> {}", self.start_time, self.end_time)?;
        writeln!(f, "Bars: {}", self.total_bars)?;
        writeln!(
            f,
            "Trades: {} ({} won, {} lost)",
            self.total_trades, self.winning_trades, self.losing_trades
        )?;
        writeln!(f, "Skipped Setups: {}", self.skipped_setups)?;
        writeln!(f, "Win Rate: {:.2}%", self.win_rate())?;
        writeln!(f, "Net P&L: {:.2}", self.net_pl)?;
        writeln!(f, "Average Win: {:.2}", self.avg_win)?;
        writeln!(f, "Average Loss: {:.2}", self.avg_loss)?;
        writeln!(f, "Largest Win: {:.2}", self.largest_win)?;
        write!(f, "Largest Loss: {:.2}", self.largest_loss)?;
        for (reason, count) in &self.exit_breakdown {
            write!(f, "\n  {reason}: {count}")?;
        }
        Ok(())
    }
}
