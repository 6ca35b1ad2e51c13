//! Strategy parameter optimization.
//!
//! This module provides tools to optimize trading strategies by testing different parameter combinations.
//! The `Optimizer` struct handles the execution of backtests for each combination, while the
//! `ParameterCombination` trait defines how to generate parameter sets.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::engine::{Backtest, Bar, Parameters, Summary};
use crate::errors::Result;
use crate::strategies::Strategy;

use rayon::prelude::*;
use tracing::debug;

/// Trait defining how to generate parameter combinations for optimization.
///
/// Implement this trait for your parameter types to define how combinations should be generated.
/// The associated type `Output` represents a single parameter combination (e.g., a tuple of values).
pub trait ParameterCombination: Sync {
    /// Type representing a single parameter combination (e.g., `(f64, f64)`).
    type Output: Clone + Send + Sync;

    /// Generates all possible parameter combinations to test.
    ///
    /// # Returns
    /// A vector containing all parameter combinations.
    fn generate() -> Vec<Self::Output>;
}

/// Optimizer for testing strategies with different parameter combinations.
///
/// Every combination gets its own session and trade manager; only the bars are shared.
pub struct Optimizer<PC: ParameterCombination> {
    bars: Arc<[Bar]>,
    _marker: PhantomData<PC>,
}

impl<PC: ParameterCombination> From<&Backtest> for Optimizer<PC> {
    fn from(value: &Backtest) -> Self {
        Self::new(value.bars())
    }
}

impl<PC: ParameterCombination> Optimizer<PC> {
    /// Creates a new `Optimizer` over the given bars.
    ///
    /// # Arguments
    /// * `bars` - Historical bars, in ascending order.
    pub fn new(bars: impl Into<Arc<[Bar]>>) -> Self {
        Self {
            bars: bars.into(),
            _marker: PhantomData,
        }
    }

    /// Runs every parameter combination.
    ///
    /// # Arguments
    /// * `combinator` - Converts a parameter combination into the strategy and parameters to replay.
    ///
    /// # Returns
    /// Each combination with the summary of its run, in the order of [`ParameterCombination::generate`].
    ///
    /// # Errors
    /// Returns the first error raised by `combinator`.
    pub fn with<C>(&self, combinator: C) -> Result<Vec<(PC::Output, Summary)>>
    where
        C: Fn(&PC::Output) -> Result<(Strategy, Parameters)> + Sync,
    {
        let num_cpus = num_cpus::get();
        let combinations = PC::generate();
        let chunk_size = combinations.len().div_ceil(num_cpus).max(1);
        debug!(combinations = combinations.len(), chunk_size, "optimizer started");

        combinations
            .par_chunks(chunk_size)
            .map::<_, Result<_>>(|par_combinations| {
                let mut local_results = Vec::with_capacity(par_combinations.len());

                for param_set in par_combinations {
                    let (strategy, parameters) = combinator(param_set)?;
                    let result = Backtest::new(Arc::clone(&self.bars), parameters).run(strategy);
                    local_results.push((param_set.clone(), result.summary));
                }

                Ok(local_results)
            })
            .collect::<Result<Vec<_>>>()
            .map(|chunks| chunks.into_iter().flatten().collect())
    }
}

#[cfg(test)]
struct TrailingGrid;

#[cfg(test)]
impl ParameterCombination for TrailingGrid {
    type Output = (f64, f64);

    fn generate() -> Vec<Self::Output> {
        [3.0, 5.0, 8.0]
            .into_iter()
            .flat_map(|trigger| [2.0, 5.0].into_iter().map(move |step| (trigger, step)))
            .collect()
    }
}

#[cfg(test)]
fn get_data() -> Vec<Bar> {
    use crate::strategies::fixtures::bars;

    bars(&[
        (100.0, 101.0, 99.0, 100.5),
        (100.5, 102.0, 99.5, 101.8),
        (101.8, 107.5, 101.5, 107.0),
        (107.0, 107.2, 100.8, 101.2),
        (101.2, 101.5, 100.0, 100.4),
        (100.4, 103.0, 100.2, 102.9),
    ])
}

#[cfg(test)]
#[test]
fn optimizer_over_trailing_grid() {
    let opt = Optimizer::<TrailingGrid>::new(get_data());

    let result = opt
        .with(|&(trigger, step)| {
            Ok((
                Strategy::AdjacentBreakout,
                Parameters::default().trailing(trigger, step),
            ))
        })
        .unwrap();

    assert_eq!(result.len(), 6);
    assert_eq!(result[0].0, (3.0, 2.0));
    assert_eq!(result[5].0, (8.0, 5.0));

    let backtest = Backtest::new(get_data(), Parameters::default().trailing(5.0, 5.0));
    let expected = backtest.run(Strategy::AdjacentBreakout).summary;
    let (_, summary) = result.iter().find(|(params, _)| *params == (5.0, 5.0)).unwrap();
    assert_eq!(*summary, expected);
}

#[cfg(test)]
#[test]
fn optimizer_propagates_combinator_errors() {
    use crate::errors::Error;

    let opt = Optimizer::<TrailingGrid>::new(get_data());
    let result = opt.with(|_| Err(Error::Msg("bad combination".to_owned())));
    assert!(matches!(result, Err(Error::Msg(_))));
}
