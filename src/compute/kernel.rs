//! Operation functions for the standard node vocabulary.
//!
//! Each builder wraps a user callback into an `OperationFn`, the uniform
//! `Input -> Output` shape the generation engine submits.
use super::data::Data;
use super::error::ComputationError;
use super::payload::{Input, Output};
use rand::rngs::StdRng;
use std::sync::Arc;

pub type OperationFn = Arc<dyn Fn(Input) -> Result<Output, ComputationError> + Send + Sync>;

/// `(parent data, n, generator) -> samples`
pub type SimulatorFn = Arc<dyn Fn(&[Data], usize, &mut StdRng) -> Result<Data, ComputationError> + Send + Sync>;

/// `(parent data) -> statistic`
pub type StatisticFn = Arc<dyn Fn(&[Data]) -> Result<Data, ComputationError> + Send + Sync>;

/// `(parent data, parent observed data) -> distance`
pub type ComparatorFn = Arc<dyn Fn(&[Data], &[Data]) -> Result<Data, ComputationError> + Send + Sync>;

/// Ignores its input and repeats `value` once per requested sample.
pub fn constant_operation(value: Data) -> OperationFn {
    Arc::new(move |input: Input| {
        let data = value.repeat_rows(input.n)?;
        Ok(input.into_output(data))
    })
}

/// Runs the simulator on a generator restored from the input's random state
/// and returns the advanced state with the samples.
pub fn simulator_operation(simulator: SimulatorFn) -> OperationFn {
    Arc::new(move |mut input: Input| {
        let state = input.random_state.take().ok_or(ComputationError::MissingRandomState)?;
        let mut prng = state.generator();
        let data = simulator(&input.data, input.n, &mut prng)?;
        input.random_state = Some(state.advanced(prng));
        Ok(input.into_output(data))
    })
}

pub fn summary_operation(statistic: StatisticFn) -> OperationFn {
    Arc::new(move |input: Input| {
        let data = statistic(&input.data)?;
        Ok(input.into_output(data))
    })
}

pub fn discrepancy_operation(comparator: ComparatorFn) -> OperationFn {
    Arc::new(move |input: Input| {
        let observed = input.observed.as_deref().ok_or(ComputationError::MissingObserved)?;
        let data = comparator(&input.data, observed)?;
        Ok(input.into_output(data))
    })
}

/// Marks the samples of the first parent that fall below `threshold`.
pub fn threshold_operation(threshold: f64) -> OperationFn {
    Arc::new(move |input: Input| {
        let data = input.parent(0)?.lt(threshold)?;
        Ok(input.into_output(data))
    })
}
