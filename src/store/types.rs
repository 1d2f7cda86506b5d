use serde::{Serialize, Deserialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The role a node plays in the model.
///
/// `Plain` nodes only take part in the structure; every other kind owns an
/// operation and a sample ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Plain,
    Operation,
    Constant,
    Simulator,
    Summary,
    Discrepancy,
    Threshold,
}

impl NodeKind {
    pub fn is_operation(&self) -> bool {
        !matches!(self, NodeKind::Plain)
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Plain => "Node",
            NodeKind::Operation => "Operation",
            NodeKind::Constant => "Constant",
            NodeKind::Simulator => "Simulator",
            NodeKind::Summary => "Summary",
            NodeKind::Discrepancy => "Discrepancy",
            NodeKind::Threshold => "Threshold",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    pub name: String,
}

impl NodeMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
