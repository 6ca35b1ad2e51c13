use chrono::{DateTime, FixedOffset};

use crate::{
    PriceCalculus,
    engine::{Bar, ExitReason, InitialStopMode, Parameters, Trade, TrailingUpdate},
};

/// Exit decision reported by [`TradeManager::check_exit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exit {
    /// Fill price of the exit.
    pub price: f64,
    /// Why the trade exits.
    pub reason: ExitReason,
    /// Timestamp of the bar the exit happened on.
    pub time: DateTime<FixedOffset>,
}

/// Owns the lifecycle of one open position: initial stop, trailing stop, target and
/// time exit.
#[derive(Debug, Clone)]
pub struct TradeManager {
    parameters: Parameters,
    entry_price: f64,
    entry_time: DateTime<FixedOffset>,
    reference: Bar,
    entry_bar: Bar,
    initial_stop: f64,
    current_stop: f64,
    highest_profit: f64,
    trailing_history: Vec<TrailingUpdate>,
}

impl TradeManager {
    /// Opens a position and places its initial stop.
    ///
    /// ### Arguments
    /// * `parameters` - Run configuration, taken as-is (callers resolve fallbacks first).
    /// * `entry_price` - Fill price of the entry.
    /// * `entry_time` - Timestamp of the entry bar.
    /// * `reference` - Bar that anchored the setup.
    /// * `entry_bar` - Bar the entry happened on.
    pub fn enter(
        parameters: &Parameters,
        entry_price: f64,
        entry_time: DateTime<FixedOffset>,
        reference: Bar,
        entry_bar: Bar,
    ) -> Self {
        let initial_stop = match parameters.initial_stop_mode {
            InitialStopMode::ReferenceLow => reference.low(),
            InitialStopMode::Fixed => entry_price - parameters.fixed_stop_points,
            InitialStopMode::EntryLow => entry_bar.low(),
        };

        Self {
            parameters: *parameters,
            entry_price,
            entry_time,
            reference,
            entry_bar,
            initial_stop,
            current_stop: initial_stop,
            highest_profit: 0.0,
            trailing_history: Vec::new(),
        }
    }

    /// Returns the entry price.
    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Returns the entry timestamp.
    pub fn entry_time(&self) -> DateTime<FixedOffset> {
        self.entry_time
    }

    /// Returns the stop placed at entry.
    pub fn initial_stop(&self) -> f64 {
        self.initial_stop
    }

    /// Returns the stop that applies to the next evaluated bar.
    pub fn current_stop(&self) -> f64 {
        self.current_stop
    }

    /// Returns the best `high - entry` seen so far.
    pub fn highest_profit(&self) -> f64 {
        self.highest_profit
    }

    /// Returns the trailing stop moves so far.
    pub fn trailing_history(&self) -> &[TrailingUpdate] {
        &self.trailing_history
    }

    /// Evaluates one bar against the open position.
    ///
    /// The first matching rule wins: stop, then target, then time exit. When the trade
    /// survives the bar and trailing is enabled, the stop is moved for the **next** bar;
    /// a bar's own exit decision never sees a stop computed from that bar.
    pub fn check_exit(&mut self, bar: &Bar) -> Option<Exit> {
        let time = bar.timestamp();
        self.highest_profit = self.highest_profit.max(bar.high() - self.entry_price);

        if bar.low() <= self.current_stop {
            let reason = if self.current_stop == self.initial_stop {
                ExitReason::StopLoss
            } else {
                ExitReason::TrailingStop
            };
            return Some(Exit {
                price: self.current_stop,
                reason,
                time,
            });
        }

        if let Some(target) = self.parameters.profit_target {
            let target_price = self.entry_price + target;
            if bar.high() >= target_price {
                return Some(Exit {
                    price: target_price,
                    reason: ExitReason::Target,
                    time,
                });
            }
        }

        if let Some(cutoff) = self.parameters.time_exit
            && bar.time_of_day() >= cutoff
        {
            return Some(Exit {
                price: bar.close(),
                reason: ExitReason::TimeExit,
                time,
            });
        }

        if self.parameters.trailing_enabled {
            self.update_trailing_stop(bar);
        }

        None
    }

    /// Ratchets the stop from the bar high. Whole steps only, never downwards.
    fn update_trailing_stop(&mut self, bar: &Bar) {
        let Parameters {
            trailing_trigger: trigger,
            trailing_step: step,
            cost_to_cost,
            ..
        } = self.parameters;

        let profit = self.entry_price.points_to(bar.high());
        if profit < trigger {
            return;
        }

        let steps = ((profit - trigger) / step).floor();
        let candidate = if cost_to_cost {
            self.entry_price + step * steps
        } else {
            self.entry_price + (trigger - step) + step * steps
        };

        if candidate > self.current_stop {
            self.current_stop = candidate;
            self.trailing_history.push(TrailingUpdate {
                time: bar.timestamp(),
                profit,
                new_stop: candidate,
                steps: steps as u32,
            });
        }
    }

    /// Closes the position and returns the immutable trade record.
    pub fn summary(self, exit_price: f64, exit_reason: ExitReason, exit_time: DateTime<FixedOffset>) -> Trade {
        Trade {
            entry_time: self.entry_time,
            entry_price: self.entry_price,
            exit_time,
            exit_price,
            pl: self.entry_price.points_to(exit_price),
            exit_reason,
            initial_stop: self.initial_stop,
            final_stop: self.current_stop,
            trailing_history: self.trailing_history,
            highest_profit: self.highest_profit,
            reference_bar: self.reference,
            entry_bar: self.entry_bar,
        }
    }
}
