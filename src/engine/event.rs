//! State transitions emitted during a run.
//!
//! Sessions and the simulation loop report every transition as an [`Event`] to a
//! caller-supplied callback (see [`Backtest::run_with_trace`](crate::engine::Backtest::run_with_trace)),
//! so the transition history can be asserted on directly. Each event is also logged at
//! `trace` level.

use chrono::{DateTime, FixedOffset};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::{ExitReason, SkipReason};

/// One state transition of a run.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// A bar was adopted as the reference of a new setup.
    ReferenceSet {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// Reference high (the breakout level).
        high: f64,
    },

    /// A newer bar replaced the current reference.
    ReferenceShifted {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// New reference high.
        high: f64,
    },

    /// The reference waited too long without a breakout and was dropped.
    ReferenceExpired {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// Unsuccessful bars seen.
        waited: usize,
    },

    /// A run of consecutive bearish bars long enough to arm a setup ended on this bar.
    RunDetected {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// Length of the run.
        length: usize,
    },

    /// The confirmation bar whose high must be broken was found.
    ConfirmationSet {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// Confirmation high (the breakout level).
        high: f64,
    },

    /// A volatile bar started a cooling period.
    CoolingStarted {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// Directional range of the bar.
        range: f64,
    },

    /// Another volatile bar extended the cooling period.
    CoolingExtended {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// Directional range of the bar.
        range: f64,
    },

    /// The cooling period is over.
    CoolingComplete {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
    },

    /// A session asked to enter.
    EntrySignal {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// Requested entry price.
        entry_price: f64,
    },

    /// An entry signal was unusable and dropped.
    SignalDiscarded {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// The rejected entry price.
        entry_price: f64,
    },

    /// A trade was opened.
    TradeOpened {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// Entry price.
        entry_price: f64,
        /// Initial stop level.
        initial_stop: f64,
    },

    /// The trailing stop moved up; effective from the next bar.
    StopTrailed {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// New stop level.
        new_stop: f64,
    },

    /// A stop breach on the bullish entry bar was ignored as wick noise.
    WickTolerated {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// Stop level that was touched.
        stop: f64,
    },

    /// A trade was closed.
    TradeClosed {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// Exit price.
        exit_price: f64,
        /// Why it was closed.
        reason: ExitReason,
        /// Realized profit and loss in points.
        pl: f64,
    },

    /// A setup was rejected and recorded as skipped.
    SetupSkipped {
        /// Bar index.
        index: usize,
        /// Bar timestamp.
        time: DateTime<FixedOffset>,
        /// Why it was rejected.
        reason: SkipReason,
    },
}

impl Event {
    /// Returns the index of the bar that produced the event.
    pub fn index(&self) -> usize {
        match self {
            Self::ReferenceSet { index, .. }
            | Self::ReferenceShifted { index, .. }
            | Self::ReferenceExpired { index, .. }
            | Self::RunDetected { index, .. }
            | Self::ConfirmationSet { index, .. }
            | Self::CoolingStarted { index, .. }
            | Self::CoolingExtended { index, .. }
            | Self::CoolingComplete { index, .. }
            | Self::EntrySignal { index, .. }
            | Self::SignalDiscarded { index, .. }
            | Self::TradeOpened { index, .. }
            | Self::StopTrailed { index, .. }
            | Self::WickTolerated { index, .. }
            | Self::TradeClosed { index, .. }
            | Self::SetupSkipped { index, .. } => *index,
        }
    }
}

/// Callback receiving the events of a run.
pub type Trace<'t> = dyn FnMut(Event) + 't;
