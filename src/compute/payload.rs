//! The values flowing into and out of operation functions.
use super::data::Data;
use super::deferred::Deferred;
use super::error::ComputationError;
use super::seeding::RandomState;
use serde::{Deserialize, Serialize};

/// Extra fields added to a node's input after the base payload is built.
/// Steps run in the order they are declared on the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadStep {
    /// Draw a substream and attach its `random_state`.
    Seed,
    /// Attach the tuple of every parent's observed data.
    AttachObserved,
}

/// What an operation function receives.
#[derive(Debug, Clone)]
pub struct Input {
    /// One entry per parent, in parent order.
    pub data: Vec<Data>,
    pub n: usize,
    pub index: usize,
    pub random_state: Option<RandomState>,
    pub observed: Option<Vec<Data>>,
}

/// What an operation function returns.
#[derive(Debug, Clone)]
pub struct Output {
    pub data: Data,
    pub n: usize,
    pub index: usize,
    pub random_state: Option<RandomState>,
}

impl Input {
    /// Carries `n`, `index` and `random_state` over to an output holding `data`.
    pub fn into_output(self, data: Data) -> Output {
        Output { data, n: self.n, index: self.index, random_state: self.random_state }
    }

    pub fn parent(&self, i: usize) -> Result<&Data, ComputationError> {
        self.data.get(i).ok_or(ComputationError::MissingInput(i))
    }
}

/// An input whose parent data has not been forced yet.
#[derive(Debug, Clone)]
pub struct PendingInput {
    pub data: Vec<Deferred<Data>>,
    pub n: usize,
    pub index: usize,
    pub random_state: Option<RandomState>,
    pub observed: Option<Vec<Data>>,
}

impl PendingInput {
    pub fn new(data: Vec<Deferred<Data>>, n: usize, index: usize) -> Self {
        Self { data, n, index, random_state: None, observed: None }
    }

    /// Forces every parent, in parent order.
    pub fn resolve(self) -> Result<Input, ComputationError> {
        let data = self.data.iter().map(Deferred::compute).collect::<Result<Vec<_>, _>>()?;
        Ok(Input {
            data,
            n: self.n,
            index: self.index,
            random_state: self.random_state,
            observed: self.observed,
        })
    }
}
