//! Lazy batched generation.
//!
//! Nothing is evaluated here: `generate` and `get` fill the node's ledger
//! with deferred segments and hand back a deferred view of the requested
//! range. Parents are requested over the same range, recursively, so one
//! call describes the whole upstream computation.
use super::data::Data;
use super::deferred::{Deferred, TaskKey};
use super::ledger::OutputRecord;
use super::payload::{PayloadStep, PendingInput};
use super::seeding::{set_substream, RandomState};
use crate::graph::{Model, Source};
use crate::store::{GraphError, NodeId};
use std::ops::Range;
use tracing::debug;

impl Model {
    /// Requests `n` samples of `node` starting at `starting` (by default the
    /// high-water mark). Missing samples are generated in batches of at most
    /// `batch_size`; the whole request is one batch when no size is given
    /// here or in the config.
    pub fn generate(
        &mut self,
        node: NodeId,
        n: usize,
        starting: Option<usize>,
        batch_size: Option<usize>,
    ) -> Result<Deferred<Data>, GraphError> {
        let starting = starting.unwrap_or(self.operation(node)?.index);
        let ending = starting + n;
        if n == 0 {
            return Err(self.invalid_range(node, starting..ending));
        }
        let batch_size = batch_size.or(self.config.default_batch_size).unwrap_or(n).max(1);

        loop {
            let cached = self.operation(node)?.ledger.len();
            if cached >= ending {
                break;
            }
            let width = (ending - cached).min(batch_size);
            let record = self.submit(node, cached..cached + width)?;
            self.operation_mut(node)?.ledger.add(record);
        }

        let op = self.operation_mut(node)?;
        op.index = op.index.max(ending);
        debug!(node = %self.name(node), starting, n, batch_size, "generated");

        self.get(node, starting..ending)
    }

    /// The samples of `range`, generating the missing tail of the cache
    /// first. Does not move the high-water mark.
    pub fn get(&mut self, node: NodeId, range: Range<usize>) -> Result<Deferred<Data>, GraphError> {
        let cached = self.operation(node)?.ledger.len();
        if range.start >= range.end {
            return Err(self.invalid_range(node, range));
        }
        if cached < range.end {
            let record = self.submit(node, cached..range.end)?;
            self.operation_mut(node)?.ledger.add(record);
        }
        self.operation(node)?.ledger.fetch(range)
    }

    /// The input of one generation call over `range`: every parent's samples
    /// over the same range, then the node's payload steps in order.
    pub(crate) fn build_input(&mut self, node: NodeId, range: Range<usize>) -> Result<PendingInput, GraphError> {
        let parents = self.registry.get_parents(node).to_vec();
        let data = parents
            .iter()
            .map(|&parent| self.get(parent, range.clone()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut pending = PendingInput::new(data, range.len(), range.start);
        let op = self.operation(node)?;
        for step in &op.steps {
            match step {
                PayloadStep::Seed => {
                    pending.random_state = Some(set_substream(op.seed, self.substreams.allocate()));
                }
                PayloadStep::AttachObserved => {
                    let sources: Vec<Source> = parents.iter().copied().map(Source::Node).collect();
                    pending.observed = Some(self.observed_of(self.registry.name(node), &sources)?);
                }
            }
        }
        Ok(pending)
    }

    /// Wraps the node's function and the input over `range` into a deferred
    /// output and records it in the task table.
    ///
    /// Callers only submit at the cached end of a ledger and names are
    /// unique, so a key is never submitted twice within a model. Consumers
    /// share work through the ledger, which hands out the same memoized
    /// segment to every reader.
    pub(crate) fn submit(&mut self, node: NodeId, range: Range<usize>) -> Result<OutputRecord, GraphError> {
        let key = TaskKey::new(self.name(node), range.start, range.len());
        debug_assert!(self.tasks.get(&key).is_none(), "task {} submitted twice", key);

        let pending = self.build_input(node, range)?;
        let function = self.operation(node)?.function.clone();
        debug!(
            task = %key,
            substream = ?pending.random_state.as_ref().map(RandomState::substream),
            "submitting task"
        );
        let output = self.tasks.delayed(key.clone(), move || function(pending.resolve()?));
        Ok(OutputRecord::new(key, output))
    }

    fn invalid_range(&self, node: NodeId, range: Range<usize>) -> GraphError {
        GraphError::InvalidRange { node: self.name(node).to_string(), start: range.start, stop: range.end }
    }
}
