use crate::{
    engine::{Bar, Event, Trace},
    strategies::{EntrySession, EntrySignal},
};

/// Consecutive bearish bars needed to arm a setup.
const MIN_RUN: usize = 4;
/// Bars the confirmation high may take to break.
const MAX_WAIT: usize = 2;

#[derive(Debug, Clone, Copy, Default)]
enum State {
    #[default]
    SeekRun,
    SeekConfirmation {
        reference: Bar,
    },
    WaitBreakout {
        reference: Bar,
        confirmation: Bar,
        waited: usize,
    },
}

/// Confirmation breakout after a run of four or more bearish bars.
///
/// The last bar of the run is the reference (its low anchors the stop), the first bullish bar
/// after it is the confirmation, and the entry is at the confirmation high.
///
/// The length of the current bearish run is tracked across bars, so the session must see
/// every bar of the run in order. The hooks reset the setup but not the run count.
#[derive(Debug, Clone, Default)]
pub struct FourBearishRunSession {
    state: State,
    run: usize,
}

impl EntrySession for FourBearishRunSession {
    fn check_entry(&mut self, bars: &[Bar], index: usize, trace: &mut Trace<'_>) -> Option<EntrySignal> {
        let bar = *bars.get(index)?;
        let time = bar.timestamp();
        let previous_run = self.run;
        self.run = if bar.is_bearish() { self.run + 1 } else { 0 };
        let run = self.run;

        match self.state {
            State::SeekRun => {
                if run >= MIN_RUN {
                    trace(Event::RunDetected { index, time, length: run });
                    trace(Event::ReferenceSet {
                        index,
                        time,
                        high: bar.high(),
                    });
                    self.state = State::SeekConfirmation { reference: bar };
                } else if bar.is_bullish() && index > 0 && previous_run >= MIN_RUN {
                    let reference = bars[index - 1];
                    trace(Event::ReferenceSet {
                        index,
                        time,
                        high: reference.high(),
                    });
                    trace(Event::ConfirmationSet {
                        index,
                        time,
                        high: bar.high(),
                    });
                    self.state = State::WaitBreakout {
                        reference,
                        confirmation: bar,
                        waited: 0,
                    };
                }
                None
            }

            State::SeekConfirmation { reference } => {
                if run >= MIN_RUN {
                    trace(Event::ReferenceShifted {
                        index,
                        time,
                        high: bar.high(),
                    });
                    self.state = State::SeekConfirmation { reference: bar };
                } else if bar.is_bullish() {
                    trace(Event::ConfirmationSet {
                        index,
                        time,
                        high: bar.high(),
                    });
                    self.state = State::WaitBreakout {
                        reference,
                        confirmation: bar,
                        waited: 0,
                    };
                }
                None
            }

            State::WaitBreakout {
                reference,
                confirmation,
                waited,
            } => {
                if bar.high() > confirmation.high() {
                    let entry_price = confirmation.high();
                    trace(Event::EntrySignal {
                        index,
                        time,
                        entry_price,
                    });
                    return Some(EntrySignal { entry_price, reference });
                }

                let waited = waited + 1;
                if waited >= MAX_WAIT {
                    trace(Event::ReferenceExpired { index, time, waited });
                    self.state = State::SeekRun;
                } else {
                    self.state = State::WaitBreakout {
                        reference,
                        confirmation,
                        waited,
                    };
                }
                None
            }
        }
    }

    fn on_entry(&mut self) {
        self.state = State::SeekRun;
    }

    fn on_exit(&mut self) {
        self.state = State::SeekRun;
    }
}
