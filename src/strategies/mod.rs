//! Entry-signal sessions.
//!
//! A [`Strategy`] is a descriptor; each run asks it for a fresh [`Session`] that owns all
//! of the setup state (reference bar, counters, mode flags). The simulation loop feeds
//! every bar to the session and only reads back an optional [`EntrySignal`]. It never
//! looks inside the session, and no session state outlives its run.

mod adjacent_breakout;
mod bullish_continuation;
mod four_bearish_run;
mod single_reference;
mod volatility_adaptive;

use std::{fmt, str::FromStr};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    engine::{Bar, Trace},
    errors::{Error, Result},
};

pub use adjacent_breakout::*;
pub use bullish_continuation::*;
pub use four_bearish_run::*;
pub use single_reference::*;
pub use volatility_adaptive::*;

/// Request to open a long position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySignal {
    /// Price to enter at (the broken level).
    pub entry_price: f64,
    /// Bar that anchors the setup; its low is the default initial stop.
    pub reference: Bar,
}

/// Bar-by-bar entry decision with private state.
///
/// `check_entry` is called for **every** bar of the run, including bars where a trade is
/// open or has just closed, so the reference tracking is never starved. Signals returned
/// while a trade is open are ignored by the loop.
pub trait EntrySession {
    /// Evaluates `bars[index]` given the bars before it.
    ///
    /// ### Arguments
    /// * `bars` - The whole bar sequence of the run; only `bars[..=index]` may be read.
    /// * `index` - Index of the current bar.
    /// * `trace` - Receives the state transitions.
    fn check_entry(&mut self, bars: &[Bar], index: usize, trace: &mut Trace<'_>) -> Option<EntrySignal>;

    /// Called after the loop opened a trade from this session's signal.
    fn on_entry(&mut self) {}

    /// Called after the trade closed, or after the setup was rejected.
    fn on_exit(&mut self) {}
}

/// Available entry strategies.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Break of the high of the latest bearish bar.
    SingleReference,
    /// Break of the first bullish bar after four or more bearish bars.
    FourBearishRun,
    /// Break of a bullish bar's high within two bars.
    BullishContinuation,
    /// Bearish/bullish reference breakout with cooling after large bars.
    VolatilityAdaptive,
    /// Break of the previous bar's high, whatever it was.
    AdjacentBreakout,
}

impl Strategy {
    /// Every strategy, in display order.
    pub const ALL: [Strategy; 5] = [
        Self::SingleReference,
        Self::FourBearishRun,
        Self::BullishContinuation,
        Self::VolatilityAdaptive,
        Self::AdjacentBreakout,
    ];

    /// Returns the stable identifier.
    pub fn id(&self) -> &'static str {
        match self {
            Self::SingleReference => "red_candle_high_break",
            Self::FourBearishRun => "four_red_candle_break",
            Self::BullishContinuation => "green_continuation",
            Self::VolatilityAdaptive => "red_green_flexible",
            Self::AdjacentBreakout => "whatever_breaks",
        }
    }

    /// Returns the display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SingleReference => "Red Candle High Break",
            Self::FourBearishRun => "Four Red Candle Break",
            Self::BullishContinuation => "Green Candle Continuation",
            Self::VolatilityAdaptive => "Red-Green Flexible Breakout",
            Self::AdjacentBreakout => "Whatever Breaks",
        }
    }

    /// Returns a one-line description.
    pub fn description(&self) -> &'static str {
        match self {
            Self::SingleReference => "Enter when price breaks above the high of the latest red candle",
            Self::FourBearishRun => "Enter on break of the green candle high after 4 or more consecutive red candles",
            Self::BullishContinuation => "Enter when a green candle high is broken within the next two candles",
            Self::VolatilityAdaptive => "Red/green breakout that cools down after large-range candles",
            Self::AdjacentBreakout => "Enter on any break of the previous candle high",
        }
    }

    /// Creates a fresh session for one run.
    pub fn create_session(&self) -> Session {
        match self {
            Self::SingleReference => Session::SingleReference(SingleReferenceSession::default()),
            Self::FourBearishRun => Session::FourBearishRun(FourBearishRunSession::default()),
            Self::BullishContinuation => Session::BullishContinuation(BullishContinuationSession::default()),
            Self::VolatilityAdaptive => Session::VolatilityAdaptive(VolatilityAdaptiveSession::default()),
            Self::AdjacentBreakout => Session::AdjacentBreakout(AdjacentBreakoutSession::default()),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id = s.trim();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.id().eq_ignore_ascii_case(id))
            .ok_or_else(|| Error::UnknownStrategy(id.to_owned()))
    }
}

/// Per-run state of one strategy.
#[derive(Debug, Clone)]
pub enum Session {
    /// See [`SingleReferenceSession`].
    SingleReference(SingleReferenceSession),
    /// See [`FourBearishRunSession`].
    FourBearishRun(FourBearishRunSession),
    /// See [`BullishContinuationSession`].
    BullishContinuation(BullishContinuationSession),
    /// See [`VolatilityAdaptiveSession`].
    VolatilityAdaptive(VolatilityAdaptiveSession),
    /// See [`AdjacentBreakoutSession`].
    AdjacentBreakout(AdjacentBreakoutSession),
}

impl EntrySession for Session {
    fn check_entry(&mut self, bars: &[Bar], index: usize, trace: &mut Trace<'_>) -> Option<EntrySignal> {
        match self {
            Self::SingleReference(session) => session.check_entry(bars, index, trace),
            Self::FourBearishRun(session) => session.check_entry(bars, index, trace),
            Self::BullishContinuation(session) => session.check_entry(bars, index, trace),
            Self::VolatilityAdaptive(session) => session.check_entry(bars, index, trace),
            Self::AdjacentBreakout(session) => session.check_entry(bars, index, trace),
        }
    }

    fn on_entry(&mut self) {
        match self {
            Self::SingleReference(session) => session.on_entry(),
            Self::FourBearishRun(session) => session.on_entry(),
            Self::BullishContinuation(session) => session.on_entry(),
            Self::VolatilityAdaptive(session) => session.on_entry(),
            Self::AdjacentBreakout(session) => session.on_entry(),
        }
    }

    fn on_exit(&mut self) {
        match self {
            Self::SingleReference(session) => session.on_exit(),
            Self::FourBearishRun(session) => session.on_exit(),
            Self::BullishContinuation(session) => session.on_exit(),
            Self::VolatilityAdaptive(session) => session.on_exit(),
            Self::AdjacentBreakout(session) => session.on_exit(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Duration, FixedOffset, TimeZone};

    use super::{EntrySession, EntrySignal};
    use crate::engine::{Bar, BarBuilder, Event};

    /// 09:15 IST plus `minute` minutes.
    pub(crate) fn at(minute: i64) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap();
        offset.with_ymd_and_hms(2025, 11, 19, 9, 15, 0).unwrap() + Duration::minutes(minute)
    }

    pub(crate) fn bar(minute: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
        BarBuilder::builder()
            .timestamp(at(minute))
            .open(open)
            .high(high)
            .low(low)
            .close(close)
            .build()
            .unwrap()
    }

    /// Builds consecutive one-minute bars from `(open, high, low, close)` tuples.
    pub(crate) fn bars(ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        ohlc.iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| bar(i as i64, o, h, l, c))
            .collect()
    }

    /// Feeds every bar to the session without any hook calls.
    pub(crate) fn drive<S: EntrySession>(session: &mut S, bars: &[Bar]) -> (Vec<(usize, EntrySignal)>, Vec<Event>) {
        let mut events = Vec::new();
        let mut signals = Vec::new();
        for index in 0..bars.len() {
            if let Some(signal) = session.check_entry(bars, index, &mut |event: Event| events.push(event)) {
                signals.push((index, signal));
            }
        }
        (signals, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_ids_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.id().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!(
            " Whatever_Breaks ".parse::<Strategy>().unwrap(),
            Strategy::AdjacentBreakout
        );
    }

    #[test]
    fn unknown_strategy() {
        let result = "golden_cross".parse::<Strategy>();
        assert!(matches!(result, Err(Error::UnknownStrategy(id)) if id == "golden_cross"));
    }

    #[test]
    fn sessions_match_descriptor() {
        assert!(matches!(Strategy::SingleReference.create_session(), Session::SingleReference(_)));
        assert!(matches!(Strategy::FourBearishRun.create_session(), Session::FourBearishRun(_)));
        assert!(matches!(
            Strategy::BullishContinuation.create_session(),
            Session::BullishContinuation(_)
        ));
        assert!(matches!(
            Strategy::VolatilityAdaptive.create_session(),
            Session::VolatilityAdaptive(_)
        ));
        assert!(matches!(Strategy::AdjacentBreakout.create_session(), Session::AdjacentBreakout(_)));
    }
}
