use crate::{
    engine::{Bar, Event, Trace},
    strategies::{EntrySession, EntrySignal},
};

const MAX_WAIT: usize = 2;

/// Continuation breakout of a bullish bar.
///
/// The first bullish bar is the reference; its high must break within two bars. When the
/// second bar fails and is itself bullish it becomes the next reference straight away.
#[derive(Debug, Clone, Default)]
pub struct BullishContinuationSession {
    reference: Option<Bar>,
    waited: usize,
}

impl BullishContinuationSession {
    fn reset(&mut self) {
        self.reference = None;
        self.waited = 0;
    }

    fn adopt(&mut self, bar: Bar, index: usize, trace: &mut Trace<'_>) {
        self.reference = Some(bar);
        self.waited = 0;
        trace(Event::ReferenceSet {
            index,
            time: bar.timestamp(),
            high: bar.high(),
        });
    }
}

impl EntrySession for BullishContinuationSession {
    fn check_entry(&mut self, bars: &[Bar], index: usize, trace: &mut Trace<'_>) -> Option<EntrySignal> {
        let bar = *bars.get(index)?;

        let Some(reference) = self.reference else {
            if bar.is_bullish() {
                self.adopt(bar, index, trace);
            }
            return None;
        };

        self.waited += 1;

        if bar.high() > reference.high() {
            let entry_price = reference.high();
            trace(Event::EntrySignal {
                index,
                time: bar.timestamp(),
                entry_price,
            });
            return Some(EntrySignal { entry_price, reference });
        }

        if self.waited == MAX_WAIT {
            trace(Event::ReferenceExpired {
                index,
                time: bar.timestamp(),
                waited: self.waited,
            });
            self.reset();
            if bar.is_bullish() {
                self.adopt(bar, index, trace);
            }
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
