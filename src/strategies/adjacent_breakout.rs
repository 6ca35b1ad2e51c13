use crate::{
    engine::{Bar, Event, Trace},
    strategies::{EntrySession, EntrySignal},
};

/// Naive breakout of the previous bar's high, whatever its colour.
///
/// Every bar is a reference candidate: the next bar either breaks its high or replaces it.
#[derive(Debug, Clone, Default)]
pub struct AdjacentBreakoutSession {
    reference: Option<Bar>,
}

impl EntrySession for AdjacentBreakoutSession {
    fn check_entry(&mut self, bars: &[Bar], index: usize, trace: &mut Trace<'_>) -> Option<EntrySignal> {
        let bar = *bars.get(index)?;
        let time = bar.timestamp();

        match self.reference {
            None => {
                trace(Event::ReferenceSet {
                    index,
                    time,
                    high: bar.high(),
                });
            }
            Some(reference) if bar.high() > reference.high() => {
                let entry_price = reference.high();
                trace(Event::EntrySignal {
                    index,
                    time,
                    entry_price,
                });
                return Some(EntrySignal { entry_price, reference });
            }
            Some(_) => {
                trace(Event::ReferenceShifted {
                    index,
                    time,
                    high: bar.high(),
                });
            }
        }

        self.reference = Some(bar);
        None
    }

    fn on_entry(&mut self) {
        self.reference = None;
    }

    fn on_exit(&mut self) {
        self.reference = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::fixtures::*;

    #[test]
    fn perpetual_shift() {
        let bars = bars(&[
            (100.0, 101.0, 99.0, 100.5),
            (100.5, 100.8, 99.5, 100.0), // lower high: shift
            (100.0, 100.6, 99.0, 99.5),  // lower high: shift
            (99.5, 100.7, 99.2, 100.6),  // breaks 100.6
        ]);
        let mut session = AdjacentBreakoutSession::default();
        let (signals, events) = drive(&mut session, &bars);

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].0, 3);
        assert_eq!(signals[0].1.entry_price, 100.6);
        assert_eq!(signals[0].1.reference, bars[2]);
        assert_eq!(
            events.iter().filter(|e| matches!(e, Event::ReferenceShifted { .. })).count(),
            2
        );
    }

    #[test]
    fn equal_high_is_not_a_breakout() {
        let bars = bars(&[(100.0, 101.0, 99.0, 100.5), (100.5, 101.0, 99.5, 100.0)]);
        let mut session = AdjacentBreakoutSession::default();
        let (signals, _) = drive(&mut session, &bars);
        assert!(signals.is_empty());
    }

    #[test]
    fn reference_cleared_by_exit() {
        let bars = bars(&[(100.0, 101.0, 99.0, 100.5), (100.5, 102.0, 99.5, 101.5)]);
        let mut session = AdjacentBreakoutSession::default();
        session.check_entry(&bars, 0, &mut |_| {});
        session.on_exit();
        assert!(session.check_entry(&bars, 1, &mut |_| {}).is_none());
    }
}
