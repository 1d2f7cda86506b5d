//! The node graph: an arena of named nodes, the operations attached to them
//! and the edit API keeping parent and child edges in sync.
pub mod edit;
pub mod model;
pub mod source;

pub use model::{Model, OperationState, PayloadSteps};
pub use source::{converter_for, Converter, IntoNodeList, ParentRef, Source};
