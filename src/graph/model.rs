//! The model: one arena of nodes, the operation attached to each of them and
//! the shared state generation needs (task table, substream counter, config).
use super::source::{converter_for, IntoNodeList, Source};
use crate::analysis::topology;
use crate::compute::deferred::{compute_all, Deferred, TaskTable};
use crate::compute::kernel::{self, OperationFn};
use crate::compute::{ComputationError, Data, Input, Ledger, Output, PayloadStep, SubstreamCounter};
use crate::config::EngineConfig;
use crate::store::{GraphError, NodeId, NodeKind, NodeMetadata, Registry};
use rand::rngs::StdRng;
use smallvec::{smallvec, SmallVec};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

pub type PayloadSteps = SmallVec<[PayloadStep; 2]>;

/// Per-node state of an operation: its function, the generated segments and
/// the high-water mark of requested samples.
pub struct OperationState {
    pub(crate) function: OperationFn,
    pub(crate) ledger: Ledger,
    pub(crate) index: usize,
    pub(crate) seed: u64,
    pub(crate) steps: PayloadSteps,
    pub(crate) observed: Option<Data>,
}

impl fmt::Debug for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationState")
            .field("ledger", &self.ledger)
            .field("index", &self.index)
            .field("seed", &self.seed)
            .field("steps", &self.steps)
            .field("observed", &self.observed.as_ref().map(Data::shape))
            .finish()
    }
}

#[derive(Debug)]
pub struct Model {
    pub(crate) registry: Registry,
    // Indexed like the registry; `None` for plain graph nodes.
    pub(crate) operations: Vec<Option<OperationState>>,
    // Index of every submitted task; segments are shared through the ledgers.
    pub(crate) tasks: TaskTable<Output>,
    pub(crate) substreams: Arc<SubstreamCounter>,
    pub(crate) config: EngineConfig,
}

impl Default for Model {
    fn default() -> Self { Self::new() }
}

impl Model {
    pub fn new() -> Self { Self::with_config(EngineConfig::default()) }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            registry: Registry::new(),
            operations: Vec::new(),
            tasks: TaskTable::new(),
            substreams: Arc::new(SubstreamCounter::new()),
            config,
        }
    }

    /// Draw substreams from `counter` instead of a private one, so that
    /// several models share one allocation order.
    pub fn with_substreams(mut self, counter: Arc<SubstreamCounter>) -> Self {
        self.substreams = counter;
        self
    }

    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn substreams(&self) -> &Arc<SubstreamCounter> { &self.substreams }

    // --- Construction ---

    /// A structural node without an operation. Values given as parents
    /// cannot be converted and fail with `Conversion`.
    pub fn add_node(&mut self, name: impl Into<String>, parents: impl IntoNodeList) -> Result<NodeId, GraphError> {
        let name = name.into();
        let sources = parents.into_node_list();
        self.check_new(NodeKind::Plain, &name, &sources)?;

        let id = self.registry.add_node(NodeKind::Plain, NodeMetadata::named(name))?;
        self.operations.push(None);
        self.add_parents(id, sources)?;
        Ok(id)
    }

    pub fn add_operation<F>(&mut self, name: impl Into<String>, function: F, parents: impl IntoNodeList) -> Result<NodeId, GraphError>
    where
        F: Fn(Input) -> Result<Output, ComputationError> + Send + Sync + 'static,
    {
        self.register(name.into(), NodeKind::Operation, Arc::new(function), smallvec![], None, parents.into_node_list())
    }

    /// A node producing `value` for every sample.
    pub fn add_constant(&mut self, name: impl Into<String>, value: impl Into<Data>) -> Result<NodeId, GraphError> {
        let value = value.into().ndmin(1);
        self.register(name.into(), NodeKind::Constant, kernel::constant_operation(value), smallvec![], None, Vec::new())
    }

    /// A stochastic node. Each generation call gets its own substream.
    ///
    /// Without explicit `observed` data the simulator would have to inherit
    /// it from its parents, which needs a random state, so in practice
    /// simulators are given their observations.
    pub fn add_simulator<F>(
        &mut self,
        name: impl Into<String>,
        simulator: F,
        parents: impl IntoNodeList,
        observed: Option<Data>,
    ) -> Result<NodeId, GraphError>
    where
        F: Fn(&[Data], usize, &mut StdRng) -> Result<Data, ComputationError> + Send + Sync + 'static,
    {
        let name = name.into();
        let sources = parents.into_node_list();
        self.check_new(NodeKind::Simulator, &name, &sources)?;

        let function = kernel::simulator_operation(Arc::new(simulator));
        let observed = self.resolve_observed(&name, &function, &sources, observed)?;
        self.register(name, NodeKind::Simulator, function, smallvec![PayloadStep::Seed], Some(observed), sources)
    }

    /// A summary statistic. Inherits observed data by summarising the
    /// parents' observations when none is given.
    pub fn add_summary<F>(
        &mut self,
        name: impl Into<String>,
        statistic: F,
        parents: impl IntoNodeList,
        observed: Option<Data>,
    ) -> Result<NodeId, GraphError>
    where
        F: Fn(&[Data]) -> Result<Data, ComputationError> + Send + Sync + 'static,
    {
        let name = name.into();
        let sources = parents.into_node_list();
        self.check_new(NodeKind::Summary, &name, &sources)?;

        let function = kernel::summary_operation(Arc::new(statistic));
        let observed = self.resolve_observed(&name, &function, &sources, observed)?;
        self.register(name, NodeKind::Summary, function, smallvec![], Some(observed), sources)
    }

    /// Compares the parents' samples with the parents' observed data. Every
    /// parent must carry observed data.
    pub fn add_discrepancy<F>(&mut self, name: impl Into<String>, comparator: F, parents: impl IntoNodeList) -> Result<NodeId, GraphError>
    where
        F: Fn(&[Data], &[Data]) -> Result<Data, ComputationError> + Send + Sync + 'static,
    {
        let name = name.into();
        let sources = parents.into_node_list();
        self.check_new(NodeKind::Discrepancy, &name, &sources)?;
        self.observed_of(&name, &sources)?;

        let function = kernel::discrepancy_operation(Arc::new(comparator));
        self.register(name, NodeKind::Discrepancy, function, smallvec![PayloadStep::AttachObserved], None, sources)
    }

    pub fn add_threshold(&mut self, name: impl Into<String>, threshold: f64, parents: impl IntoNodeList) -> Result<NodeId, GraphError> {
        self.register(name.into(), NodeKind::Threshold, kernel::threshold_operation(threshold), smallvec![], None, parents.into_node_list())
    }

    fn register(
        &mut self,
        name: String,
        kind: NodeKind,
        function: OperationFn,
        steps: PayloadSteps,
        observed: Option<Data>,
        sources: Vec<Source>,
    ) -> Result<NodeId, GraphError> {
        self.check_new(kind, &name, &sources)?;

        let id = self.registry.add_node(kind, NodeMetadata::named(name.clone()))?;
        self.operations.push(Some(OperationState {
            function,
            ledger: Ledger::new(name),
            index: 0,
            seed: self.config.seed,
            steps,
            observed,
        }));
        self.add_parents(id, sources)?;
        Ok(id)
    }

    /// Everything that could fail after the node is registered is checked
    /// here first, so a failed construction leaves the model untouched.
    fn check_new(&self, kind: NodeKind, name: &str, sources: &[Source]) -> Result<(), GraphError> {
        if self.registry.name_taken(name) {
            return Err(GraphError::DuplicateName(name.to_string()));
        }
        for source in sources {
            match source {
                Source::Node(id) => self.registry.check(*id)?,
                Source::Value(_) if converter_for(kind).is_none() => {
                    return Err(GraphError::Conversion { node: name.to_string() });
                }
                Source::Value(_) => {}
            }
        }
        Ok(())
    }

    // --- Observed data ---

    fn resolve_observed(
        &self,
        name: &str,
        function: &OperationFn,
        sources: &[Source],
        explicit: Option<Data>,
    ) -> Result<Data, GraphError> {
        match explicit {
            Some(observed) => Ok(observed.ndmin(2)),
            None => {
                // One deterministic pass of the node's own function over the
                // parents' observations.
                let observed = self.observed_of(name, sources)?;
                let n = observed.first().map_or(1, Data::rows);
                let input = Input { data: observed, n, index: 0, random_state: None, observed: None };
                Ok(function(input)?.data.ndmin(2))
            }
        }
    }

    /// The observed data of every source, in order. Fails when there are no
    /// sources or one of them carries no observed data.
    pub(crate) fn observed_of(&self, name: &str, sources: &[Source]) -> Result<Vec<Data>, GraphError> {
        let missing = || GraphError::MissingObserved { node: name.to_string() };
        if sources.is_empty() {
            return Err(missing());
        }
        sources
            .iter()
            .map(|source| match source {
                Source::Node(id) => self.observed(*id).cloned().ok_or_else(missing),
                Source::Value(_) => Err(missing()),
            })
            .collect()
    }

    // --- Accessors ---
    // Ids are only ever issued by the model they belong to; passing a
    // foreign id to these panics like an out of bounds index.

    pub fn node_count(&self) -> usize { self.registry.count() }
    pub fn registry(&self) -> &Registry { &self.registry }
    pub fn name(&self, id: NodeId) -> &str { self.registry.name(id) }
    pub fn kind(&self, id: NodeId) -> NodeKind { self.registry.kind(id) }
    pub fn parents(&self, id: NodeId) -> &[NodeId] { self.registry.get_parents(id) }
    pub fn children(&self, id: NodeId) -> &BTreeSet<NodeId> { self.registry.get_children(id) }
    pub fn neighbours(&self, id: NodeId) -> BTreeSet<NodeId> { self.registry.neighbours(id) }
    pub fn is_root(&self, id: NodeId) -> bool { self.parents(id).is_empty() }
    pub fn is_leaf(&self, id: NodeId) -> bool { self.children(id).is_empty() }
    pub fn find(&self, name: &str) -> Option<NodeId> { self.registry.lookup(name) }

    fn state(&self, id: NodeId) -> Option<&OperationState> {
        self.operations.get(id.index()).and_then(Option::as_ref)
    }

    pub fn observed(&self, id: NodeId) -> Option<&Data> { self.state(id)?.observed.as_ref() }
    pub fn ledger(&self, id: NodeId) -> Option<&Ledger> { self.state(id).map(|op| &op.ledger) }
    pub fn seed(&self, id: NodeId) -> Option<u64> { self.state(id).map(|op| op.seed) }

    /// Largest sample index up to which generation has been requested.
    pub fn high_water_mark(&self, id: NodeId) -> Option<usize> { self.state(id).map(|op| op.index) }

    /// Number of cached samples over all segments.
    pub fn cached_len(&self, id: NodeId) -> Option<usize> { self.state(id).map(|op| op.ledger.len()) }

    pub fn set_seed(&mut self, id: NodeId, seed: u64) -> Result<(), GraphError> {
        self.operation_mut(id)?.seed = seed;
        Ok(())
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        self.registry.ids().filter(|&id| self.registry.kind(id) == kind).collect()
    }

    pub fn simulators(&self) -> Vec<NodeId> { self.nodes_of_kind(NodeKind::Simulator) }
    pub fn discrepancies(&self) -> Vec<NodeId> { self.nodes_of_kind(NodeKind::Discrepancy) }
    pub fn thresholds(&self) -> Vec<NodeId> { self.nodes_of_kind(NodeKind::Threshold) }

    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        topology::sort(&self.registry)
    }

    /// `id` and every node it (transitively) depends on.
    pub fn upstream(&self, id: NodeId) -> HashSet<NodeId> { topology::upstream_from(&self.registry, &[id]) }

    /// `id` and every node (transitively) depending on it.
    pub fn downstream(&self, id: NodeId) -> HashSet<NodeId> { topology::downstream_from(&self.registry, &[id]) }

    /// Number of distinct deferred computations issued so far.
    pub fn task_count(&self) -> usize { self.tasks.len() }

    /// Forces `values`, using the rayon pool when the model is configured to.
    /// Functions that use rayon themselves need `parallel = false`; see
    /// `compute::compute_all`.
    pub fn compute_all<T>(&self, values: &[Deferred<T>]) -> Result<Vec<T>, ComputationError>
    where
        T: Clone + Send + Sync + 'static,
    {
        compute_all(values, self.config.parallel)
    }

    pub(crate) fn operation(&self, id: NodeId) -> Result<&OperationState, GraphError> {
        self.registry.check(id)?;
        self.state(id).ok_or_else(|| GraphError::NotAnOperation(self.registry.name(id).to_string()))
    }

    pub(crate) fn operation_mut(&mut self, id: NodeId) -> Result<&mut OperationState, GraphError> {
        self.registry.check(id)?;
        let name = self.registry.name(id).to_string();
        self.operations
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(GraphError::NotAnOperation(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(data: &[Data]) -> Result<Data, ComputationError> {
        let a = data[0].as_f64()?;
        let rows = a.shape()[0].max(1) as f64;
        Ok(Data::from_vec(vec![a.sum() / rows]))
    }

    #[test]
    fn test_constant_registration() {
        let mut model = Model::new();
        let c = model.add_constant("c", 1.5).unwrap();
        assert_eq!(model.kind(c), NodeKind::Constant);
        assert_eq!(model.find("c"), Some(c));
        assert_eq!(model.high_water_mark(c), Some(0));
        assert!(model.is_root(c) && model.is_leaf(c));
    }

    #[test]
    fn test_explicit_observed_is_normalized() {
        let mut model = Model::new();
        let a = model.add_constant("a", 1.0).unwrap();
        let s = model
            .add_summary("s", mean, a, Some(Data::from_vec(vec![2.0, 3.0])))
            .unwrap();
        assert_eq!(model.observed(s).unwrap().shape(), &[1, 2]);
    }

    #[test]
    fn test_summary_inherits_observed() {
        let mut model = Model::new();
        let a = model.add_constant("a", 0.0).unwrap();
        let obs = Data::from_rows(vec![vec![1.0], vec![3.0]]).unwrap();
        let b = model
            .add_simulator("b", |_: &[Data], n: usize, _: &mut StdRng| Ok(Data::from_vec(vec![0.0; n])), a, Some(obs.clone()))
            .unwrap();
        let s = model.add_summary("s", mean, b, None).unwrap();

        let expected = mean(&[obs]).unwrap().ndmin(2);
        assert_eq!(model.observed(s), Some(&expected));
    }

    #[test]
    fn test_summary_without_observed_parents_fails() {
        let mut model = Model::new();
        let a = model.add_constant("a", 0.0).unwrap();
        let err = model.add_summary("s", mean, a, None).unwrap_err();
        assert_eq!(err, GraphError::MissingObserved { node: "s".into() });
        assert_eq!(model.node_count(), 1);
        assert!(model.is_leaf(a));

        let err = model.add_summary("root", mean, (), None).unwrap_err();
        assert_eq!(err, GraphError::MissingObserved { node: "root".into() });
    }

    #[test]
    fn test_simulator_cannot_inherit_without_random_state() {
        let mut model = Model::new();
        let a = model.add_constant("a", 0.0).unwrap();
        let s = model.add_summary("s", mean, a, Some(Data::scalar(1.0))).unwrap();
        let err = model
            .add_simulator("b", |_: &[Data], n: usize, _: &mut StdRng| Ok(Data::from_vec(vec![0.0; n])), s, None)
            .unwrap_err();
        assert_eq!(err, GraphError::Computation(ComputationError::MissingRandomState));
    }

    #[test]
    fn test_duplicate_and_unknown_rejected_before_registration() {
        let mut model = Model::new();
        model.add_constant("a", 0.0).unwrap();
        assert_eq!(model.add_constant("a", 1.0).unwrap_err(), GraphError::DuplicateName("a".into()));

        let err = model.add_threshold("t", 0.1, NodeId(42)).unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode(_)));
        assert_eq!(model.find("t"), None);
    }

    #[test]
    fn test_plain_node_rejects_values() {
        let mut model = Model::new();
        let err = model.add_node("n", Source::from(3.0)).unwrap_err();
        assert_eq!(err, GraphError::Conversion { node: "n".into() });
        assert_eq!(model.node_count(), 0);
    }

    #[test]
    fn test_kind_queries_and_seed() {
        let mut model = Model::with_config(EngineConfig { seed: 11, ..Default::default() });
        let a = model.add_constant("a", 0.0).unwrap();
        let b = model
            .add_simulator("b", |_: &[Data], n: usize, _: &mut StdRng| Ok(Data::from_vec(vec![0.0; n])), a, Some(Data::scalar(0.0)))
            .unwrap();
        let t = model.add_threshold("t", 0.5, b).unwrap();
        let plain = model.add_node("p", ()).unwrap();

        assert_eq!(model.simulators(), vec![b]);
        assert_eq!(model.thresholds(), vec![t]);
        assert_eq!(model.seed(b), Some(11));
        model.set_seed(b, 3).unwrap();
        assert_eq!(model.seed(b), Some(3));
        assert_eq!(model.seed(plain), None);
        assert_eq!(model.set_seed(plain, 1).unwrap_err(), GraphError::NotAnOperation("p".into()));

        assert_eq!(model.upstream(t), HashSet::from([a, b, t]));
        assert_eq!(model.downstream(b), HashSet::from([b, t]));
        assert_eq!(model.downstream(plain), HashSet::from([plain]));
    }
}
