use std::{fmt, str::FromStr};

use chrono::NaiveTime;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::{Error, Result};

/// How the initial stop-loss of a new trade is placed.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", from = "String"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InitialStopMode {
    /// Low of the reference bar.
    #[default]
    ReferenceLow,
    /// A fixed number of points below the entry price.
    Fixed,
    /// Low of the bar the entry happened on.
    EntryLow,
}

impl InitialStopMode {
    /// Returns the identifier used in configuration files and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Self::ReferenceLow => "reference_low",
            Self::Fixed => "fixed",
            Self::EntryLow => "entry_low",
        }
    }
}

impl fmt::Display for InitialStopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Unknown modes fall back to [`InitialStopMode::ReferenceLow`].
impl From<&str> for InitialStopMode {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "reference_low" => Self::ReferenceLow,
            "fixed" => Self::Fixed,
            "entry_low" => Self::EntryLow,
            other => {
                warn!(mode = other, "unknown initial stop mode, using reference_low");
                Self::ReferenceLow
            }
        }
    }
}

/// What to do when the entry bar itself trades through the stop.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case", from = "String"))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SameBarPolicy {
    /// Enter, then re-check the entry bar: a stop breach on a bullish entry bar is
    /// treated as wick noise and the trade stays open.
    #[default]
    WickTolerant,
    /// Refuse the entry when the entry bar reaches both the entry price and the initial
    /// stop. The setup is recorded as skipped.
    RejectAmbiguous,
}

impl SameBarPolicy {
    /// Returns the identifier used in configuration files and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            Self::WickTolerant => "wick_tolerant",
            Self::RejectAmbiguous => "reject_ambiguous",
        }
    }
}

/// Unknown policies fall back to [`SameBarPolicy::WickTolerant`].
impl From<&str> for SameBarPolicy {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "wick_tolerant" => Self::WickTolerant,
            "reject_ambiguous" => Self::RejectAmbiguous,
            other => {
                warn!(policy = other, "unknown same-bar policy, using wick_tolerant");
                Self::WickTolerant
            }
        }
    }
}

/// Run configuration. Every field is fixed for the duration of a run.
///
/// ### Example
/// ```rust
/// use breakout_bt::prelude::*;
///
/// let parameters = Parameters::default()
///     .initial_stop(InitialStopMode::Fixed)
///     .fixed_stop_points(12.0)
///     .trailing(5.0, 5.0)
///     .cost_to_cost(false)
///     .profit_target(20.0)
///     .time_exit(parse_time_of_day("15:15").unwrap());
/// assert_eq!(parameters.initial_stop_mode, InitialStopMode::Fixed);
/// ```
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    /// Placement of the initial stop-loss.
    pub initial_stop_mode: InitialStopMode,
    /// Distance below the entry for [`InitialStopMode::Fixed`].
    pub fixed_stop_points: f64,
    /// Whether the stop trails once the trade is in profit.
    pub trailing_enabled: bool,
    /// Profit (in points, measured at the bar high) that engages the trailing stop.
    pub trailing_trigger: f64,
    /// Size of each trailing step in points.
    pub trailing_step: f64,
    /// First trailing move goes to the entry price instead of keeping the step distance.
    pub cost_to_cost: bool,
    /// Exit once the high reaches `entry + profit_target`.
    pub profit_target: Option<f64>,
    /// Exit at the close of the first bar at or after this local time of day.
    pub time_exit: Option<NaiveTime>,
    /// Resolution of entry/stop conflicts inside the entry bar.
    pub same_bar_policy: SameBarPolicy,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            initial_stop_mode: InitialStopMode::ReferenceLow,
            fixed_stop_points: 10.0,
            trailing_enabled: true,
            trailing_trigger: 5.0,
            trailing_step: 5.0,
            cost_to_cost: true,
            profit_target: None,
            time_exit: None,
            same_bar_policy: SameBarPolicy::WickTolerant,
        }
    }
}

impl Parameters {
    /// Sets the initial stop placement.
    pub fn initial_stop(mut self, mode: InitialStopMode) -> Self {
        self.initial_stop_mode = mode;
        self
    }

    /// Sets the fixed stop distance used by [`InitialStopMode::Fixed`].
    pub fn fixed_stop_points(mut self, points: f64) -> Self {
        self.fixed_stop_points = points;
        self
    }

    /// Enables trailing with the given trigger and step.
    pub fn trailing(mut self, trigger: f64, step: f64) -> Self {
        self.trailing_enabled = true;
        self.trailing_trigger = trigger;
        self.trailing_step = step;
        self
    }

    /// Disables trailing.
    pub fn without_trailing(mut self) -> Self {
        self.trailing_enabled = false;
        self
    }

    /// Sets the cost-to-cost trailing policy.
    pub fn cost_to_cost(mut self, enabled: bool) -> Self {
        self.cost_to_cost = enabled;
        self
    }

    /// Sets the profit target in points.
    pub fn profit_target(mut self, points: f64) -> Self {
        self.profit_target = Some(points);
        self
    }

    /// Sets the time-of-day exit cutoff.
    pub fn time_exit(mut self, cutoff: NaiveTime) -> Self {
        self.time_exit = Some(cutoff);
        self
    }

    /// Sets the same-bar policy.
    pub fn same_bar_policy(mut self, policy: SameBarPolicy) -> Self {
        self.same_bar_policy = policy;
        self
    }

    /// Returns a copy with inconsistent settings replaced by deterministic fallbacks.
    ///
    /// Configuration problems never abort a run:
    /// - `Fixed` without a positive finite distance uses `ReferenceLow`;
    /// - trailing with a non-positive step or a negative trigger is disabled;
    /// - a non-positive profit target is ignored.
    pub fn resolved(&self) -> Self {
        let mut resolved = *self;

        if resolved.initial_stop_mode == InitialStopMode::Fixed
            && !(resolved.fixed_stop_points.is_finite() && resolved.fixed_stop_points > 0.0)
        {
            warn!(
                points = resolved.fixed_stop_points,
                "fixed stop without a positive distance, using reference_low"
            );
            resolved.initial_stop_mode = InitialStopMode::ReferenceLow;
        }

        if resolved.trailing_enabled {
            let step_ok = resolved.trailing_step.is_finite() && resolved.trailing_step > 0.0;
            let trigger_ok = resolved.trailing_trigger.is_finite() && resolved.trailing_trigger >= 0.0;
            if !step_ok || !trigger_ok {
                warn!(
                    trigger = resolved.trailing_trigger,
                    step = resolved.trailing_step,
                    "invalid trailing settings, trailing disabled"
                );
                resolved.trailing_enabled = false;
            }
        }

        if let Some(target) = resolved.profit_target
            && !(target.is_finite() && target > 0.0)
        {
            warn!(target, "non-positive profit target ignored");
            resolved.profit_target = None;
        }

        resolved
    }
}

/// Parses a time of day written as `HH:MM` or `HH:MM:SS`.
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| Error::InvalidTime(value.to_owned()))
}

impl From<String> for InitialStopMode {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<String> for SameBarPolicy {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl FromStr for InitialStopMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl FromStr for SameBarPolicy {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}
