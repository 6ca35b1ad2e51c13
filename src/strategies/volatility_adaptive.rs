use crate::{
    engine::{Bar, Event, Trace},
    strategies::{EntrySession, EntrySignal},
};

/// Directional range, in points, from which a bar counts as volatile.
pub const VOLATILITY_THRESHOLD: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Bearish,
    Bullish,
}

impl Direction {
    fn of(bar: &Bar) -> Self {
        if bar.is_bearish() { Self::Bearish } else { Self::Bullish }
    }

    /// Bars a reference of this direction may wait for its breakout.
    fn max_wait(self) -> usize {
        match self {
            Self::Bearish => 2,
            Self::Bullish => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum State {
    #[default]
    Seeking,
    Cooling {
        trigger: Direction,
    },
    Waiting {
        reference: Bar,
        direction: Direction,
        waited: usize,
    },
}

fn is_volatile(bar: &Bar) -> bool {
    bar.directional_range() >= VOLATILITY_THRESHOLD
}

/// Red/green breakout that pauses after large-range bars.
///
/// - seek: a bearish bar becomes the reference, a volatile bar starts a cooling period;
/// - cooling: lasts while bars stay volatile. After a bullish trigger the next reference
///   must be bearish; after a bearish trigger the first calm bar is the reference;
/// - wait: bearish references survive two bars and shift on newer bearish bars, bullish
///   references survive one bar.
///
/// Entering on a volatile bar makes the setup after that trade start with a cooling period.
#[derive(Debug, Clone, Default)]
pub struct VolatilityAdaptiveSession {
    state: State,
    last_volatile: Option<Direction>,
    sticky: Option<Direction>,
}

impl VolatilityAdaptiveSession {
    fn seek(&mut self, bar: Bar, index: usize, trace: &mut Trace<'_>) {
        if is_volatile(&bar) {
            self.start_cooling(bar, index, trace);
        } else if bar.is_bearish() {
            self.adopt(bar, index, trace);
        }
    }

    fn start_cooling(&mut self, bar: Bar, index: usize, trace: &mut Trace<'_>) {
        trace(Event::CoolingStarted {
            index,
            time: bar.timestamp(),
            range: bar.directional_range(),
        });
        self.state = State::Cooling {
            trigger: Direction::of(&bar),
        };
    }

    fn adopt(&mut self, bar: Bar, index: usize, trace: &mut Trace<'_>) {
        trace(Event::ReferenceSet {
            index,
            time: bar.timestamp(),
            high: bar.high(),
        });
        self.state = State::Waiting {
            reference: bar,
            direction: Direction::of(&bar),
            waited: 0,
        };
    }
}

impl EntrySession for VolatilityAdaptiveSession {
    fn check_entry(&mut self, bars: &[Bar], index: usize, trace: &mut Trace<'_>) -> Option<EntrySignal> {
        let bar = *bars.get(index)?;
        let time = bar.timestamp();
        let volatile = is_volatile(&bar);
        self.last_volatile = volatile.then(|| Direction::of(&bar));

        match self.state {
            State::Seeking => self.seek(bar, index, trace),

            State::Cooling { trigger } => {
                if volatile {
                    trace(Event::CoolingExtended {
                        index,
                        time,
                        range: bar.directional_range(),
                    });
                    self.state = State::Cooling {
                        trigger: Direction::of(&bar),
                    };
                    return None;
                }

                trace(Event::CoolingComplete { index, time });
                match trigger {
                    Direction::Bullish => {
                        self.state = State::Seeking;
                        self.seek(bar, index, trace);
                    }
                    Direction::Bearish => self.adopt(bar, index, trace),
                }
            }

            State::Waiting {
                reference,
                direction,
                waited,
            } => {
                let waited = waited + 1;

                if bar.high() > reference.high() {
                    let entry_price = reference.high();
                    trace(Event::EntrySignal {
                        index,
                        time,
                        entry_price,
                    });
                    return Some(EntrySignal { entry_price, reference });
                }

                if volatile {
                    self.start_cooling(bar, index, trace);
                } else if bar.is_bearish() && direction == Direction::Bearish {
                    trace(Event::ReferenceShifted {
                        index,
                        time,
                        high: bar.high(),
                    });
                    self.state = State::Waiting {
                        reference: bar,
                        direction,
                        waited: 0,
                    };
                } else if waited >= direction.max_wait() {
                    trace(Event::ReferenceExpired { index, time, waited });
                    self.state = State::Seeking;
                } else {
                    self.state = State::Waiting {
                        reference,
                        direction,
                        waited,
                    };
                }
            }
        }

        None
    }

    fn on_entry(&mut self) {
        self.sticky = self.last_volatile;
        self.state = State::Seeking;
    }

    fn on_exit(&mut self) {
        self.state = match self.sticky.take() {
            Some(trigger) => State::Cooling { trigger },
            None => State::Seeking,
        };
    }
}
