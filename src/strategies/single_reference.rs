use crate::{
    engine::{Bar, Event, Trace},
    strategies::{EntrySession, EntrySignal},
};

/// Unsuccessful bars a reference survives.
const MAX_WAIT: usize = 2;

/// Single-reference breakout on the latest bearish bar.
///
/// - seek: any bearish bar becomes the reference;
/// - wait: a newer bearish bar replaces it, a non-bearish bar whose high exceeds the
///   reference high enters at the reference high, two unsuccessful bars expire it.
#[derive(Debug, Clone, Default)]
pub struct SingleReferenceSession {
    reference: Option<Bar>,
    waited: usize,
}

impl SingleReferenceSession {
    fn reset(&mut self) {
        self.reference = None;
        self.waited = 0;
    }
}

impl EntrySession for SingleReferenceSession {
    fn check_entry(&mut self, bars: &[Bar], index: usize, trace: &mut Trace<'_>) -> Option<EntrySignal> {
        let bar = *bars.get(index)?;
        let time = bar.timestamp();

        let Some(reference) = self.reference else {
            if bar.is_bearish() {
                self.reference = Some(bar);
                self.waited = 0;
                trace(Event::ReferenceSet {
                    index,
                    time,
                    high: bar.high(),
                });
            }
            return None;
        };

        if bar.is_bearish() {
            self.reference = Some(bar);
            self.waited = 0;
            trace(Event::ReferenceShifted {
                index,
                time,
                high: bar.high(),
            });
            return None;
        }

        if bar.high() > reference.high() {
            let entry_price = reference.high();
            trace(Event::EntrySignal {
                index,
                time,
                entry_price,
            });
            return Some(EntrySignal { entry_price, reference });
        }

        self.waited += 1;
        if self.waited >= MAX_WAIT {
            trace(Event::ReferenceExpired {
                index,
                time,
                waited: self.waited,
            });
            self.reset();
        }

        None
    }

    fn on_entry(&mut self) {
        self.reset();
    }

    fn on_exit(&mut self) {
        self.reset();
    }
}
