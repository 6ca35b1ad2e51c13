use std::fmt;

use chrono::{DateTime, FixedOffset};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::Bar;

/// Why a trade was closed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExitReason {
    /// The untouched initial stop was hit.
    #[cfg_attr(feature = "serde", serde(rename = "Stop Loss Hit"))]
    StopLoss,
    /// The stop was hit after it had trailed up.
    #[cfg_attr(feature = "serde", serde(rename = "Trailing Stop Hit"))]
    TrailingStop,
    /// The profit target was reached.
    #[cfg_attr(feature = "serde", serde(rename = "Target Hit"))]
    Target,
    /// The time-of-day cutoff was reached.
    #[cfg_attr(feature = "serde", serde(rename = "Time Exit"))]
    TimeExit,
    /// The data ran out with the trade still open.
    #[cfg_attr(feature = "serde", serde(rename = "End of Data"))]
    EndOfData,
}

impl ExitReason {
    /// Returns the human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::StopLoss => "Stop Loss Hit",
            Self::TrailingStop => "Trailing Stop Hit",
            Self::Target => "Target Hit",
            Self::TimeExit => "Time Exit",
            Self::EndOfData => "End of Data",
        }
    }

    /// Stop-loss and trailing-stop exits are price breaches of the stop level.
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::StopLoss | Self::TrailingStop)
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One upward move of the trailing stop.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingUpdate {
    /// Timestamp of the bar that produced the move.
    pub time: DateTime<FixedOffset>,
    /// Profit at that bar's high, in points.
    pub profit: f64,
    /// Stop level effective from the next bar on.
    pub new_stop: f64,
    /// Number of whole trailing steps above the trigger.
    pub steps: u32,
}

/// A closed trade. Only the trade manager creates these, once the trade has exited.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    /// Entry bar timestamp.
    pub entry_time: DateTime<FixedOffset>,
    /// Entry price.
    pub entry_price: f64,
    /// Exit bar timestamp.
    pub exit_time: DateTime<FixedOffset>,
    /// Exit price.
    pub exit_price: f64,
    /// Profit and loss in points, rounded to 2 decimals.
    pub pl: f64,
    /// Why the trade was closed.
    pub exit_reason: ExitReason,
    /// Stop level at entry.
    pub initial_stop: f64,
    /// Stop level at exit.
    pub final_stop: f64,
    /// Every upward stop move, in order.
    pub trailing_history: Vec<TrailingUpdate>,
    /// Best `high - entry` seen while the trade was open.
    pub highest_profit: f64,
    /// The bar that anchored the setup.
    pub reference_bar: Bar,
    /// The bar the entry happened on.
    pub entry_bar: Bar,
}

impl Trade {
    /// A trade with a strictly positive P&L.
    pub fn is_win(&self) -> bool {
        self.pl > 0.0
    }
}

/// Why a detected setup was not traded.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Entry price and initial stop were both reached inside the entry bar.
    Ambiguous,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ambiguous => f.write_str("Entry and stop both hit in the same bar (ambiguous)"),
        }
    }
}

/// A setup that was detected but rejected. Kept for reporting only.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedSetup {
    /// Timestamp of the bar that triggered the rejected entry.
    pub timestamp: DateTime<FixedOffset>,
    /// Reference bar of the setup.
    pub reference_bar: Bar,
    /// Bar that would have been the entry bar.
    pub entry_bar: Bar,
    /// Entry price the session asked for.
    pub entry_price: f64,
    /// Stop the trade would have started with.
    pub initial_stop: f64,
    /// Why the setup was rejected.
    pub reason: SkipReason,
}

#[cfg(test)]
#[test]
fn exit_reason_labels() {
    assert_eq!(ExitReason::StopLoss.to_string(), "Stop Loss Hit");
    assert_eq!(ExitReason::TrailingStop.to_string(), "Trailing Stop Hit");
    assert_eq!(ExitReason::Target.to_string(), "Target Hit");
    assert_eq!(ExitReason::TimeExit.to_string(), "Time Exit");
    assert_eq!(ExitReason::EndOfData.to_string(), "End of Data");
}

#[cfg(test)]
#[test]
fn stop_reasons() {
    assert!(ExitReason::StopLoss.is_stop());
    assert!(ExitReason::TrailingStop.is_stop());
    assert!(!ExitReason::Target.is_stop());
    assert!(!ExitReason::TimeExit.is_stop());
    assert!(!ExitReason::EndOfData.is_stop());
}
