//! Core of a likelihood-free inference toolkit: a graph of named nodes whose
//! operations generate samples lazily, in batches, as a growing stream.
//!
//! Nodes live in a `graph::Model`. Operation nodes cache generated segments
//! in a ledger; `generate` and `get` only describe work, and the returned
//! `compute::Deferred` values are forced later, sequentially or on the rayon
//! pool through `Model::compute_all`.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod display;
pub mod graph;
pub mod store;

pub use compute::{ComputationError, Data, Deferred, Input, Output, RandomState};
pub use config::EngineConfig;
pub use graph::{IntoNodeList, Model, ParentRef, Source};
pub use store::{GraphError, NodeId, NodeKind};
