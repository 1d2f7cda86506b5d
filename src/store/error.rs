//! Construction-time failures. Every variant is raised synchronously while the
//! graph or a generation request is being built, never inside a deferred job.
use crate::compute::ComputationError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node '{parent}' is not a parent of '{node}'")]
    NotFound { node: String, parent: String },
    #[error("Parent index {index} is out of range for '{node}' ({len} parents)")]
    ParentIndexOutOfRange { node: String, index: usize, len: usize },
    #[error("No cached segment of '{node}' starts in {start}..{stop}")]
    EmptyRange { node: String, start: usize, stop: usize },
    #[error("Range {start}..{stop} of '{node}' does not align with cached segments")]
    MisalignedRange { node: String, start: usize, stop: usize },
    #[error("Invalid range {start}..{stop} requested from '{node}'")]
    InvalidRange { node: String, start: usize, stop: usize },
    #[error("No conversion to a node for a value passed to '{node}'")]
    Conversion { node: String },
    #[error("There is no observed data for '{node}' to inherit")]
    MissingObserved { node: String },
    #[error("A node named '{0}' already exists")]
    DuplicateName(String),
    #[error("Unknown node {0}")]
    UnknownNode(String),
    #[error("'{0}' is not an operation node")]
    NotAnOperation(String),
    #[error("Adding '{parent}' as a parent of '{node}' would create a cycle")]
    Cycle { node: String, parent: String },
    #[error("Invalid engine configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Computation(#[from] ComputationError),
}
