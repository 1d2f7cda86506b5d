//! The node arena: identities, kinds and the edge tables.
pub mod error;
pub mod registry;
pub mod types;

pub use error::GraphError;
pub use registry::{ParentList, Registry};
pub use types::{NodeId, NodeKind, NodeMetadata};
