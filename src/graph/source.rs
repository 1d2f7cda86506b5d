//! Things that can stand where a node is expected.
use super::model::Model;
use crate::compute::Data;
use crate::store::{GraphError, NodeId, NodeKind};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Either an existing node or a plain value that has to be converted first.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Node(NodeId),
    Value(Data),
}

impl From<NodeId> for Source {
    fn from(id: NodeId) -> Self { Source::Node(id) }
}

impl From<Data> for Source {
    fn from(value: Data) -> Self { Source::Value(value) }
}

impl From<f64> for Source {
    fn from(value: f64) -> Self { Source::Value(Data::scalar(value)) }
}

impl From<Vec<f64>> for Source {
    fn from(values: Vec<f64>) -> Self { Source::Value(Data::from_vec(values)) }
}

/// Selects a parent edge either by position or by the parent node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    Index(usize),
    Node(NodeId),
}

impl From<usize> for ParentRef {
    fn from(index: usize) -> Self { ParentRef::Index(index) }
}

impl From<NodeId> for ParentRef {
    fn from(id: NodeId) -> Self { ParentRef::Node(id) }
}

/// Turns a value into a node owned by the model. The returned node is new
/// and named `name`.
pub type Converter = fn(&mut Model, String, Data) -> Result<NodeId, GraphError>;

/// The conversion a node of `kind` applies to plain values given to it.
/// Operations wrap them into constants; plain graph nodes have none.
pub fn converter_for(kind: NodeKind) -> Option<Converter> {
    if kind.is_operation() {
        Some(convert_to_constant)
    } else {
        None
    }
}

fn convert_to_constant(model: &mut Model, name: String, value: Data) -> Result<NodeId, GraphError> {
    model.add_constant(name, value)
}

/// Batch arguments of the edit API: a single node or value, a sequence, a
/// set, or a name-keyed map whose values are used.
pub trait IntoNodeList {
    fn into_node_list(self) -> Vec<Source>;
}

impl IntoNodeList for () {
    fn into_node_list(self) -> Vec<Source> { Vec::new() }
}

impl IntoNodeList for NodeId {
    fn into_node_list(self) -> Vec<Source> { vec![Source::Node(self)] }
}

impl IntoNodeList for Source {
    fn into_node_list(self) -> Vec<Source> { vec![self] }
}

impl IntoNodeList for Data {
    fn into_node_list(self) -> Vec<Source> { vec![Source::Value(self)] }
}

impl<S: Into<Source>> IntoNodeList for Vec<S> {
    fn into_node_list(self) -> Vec<Source> { self.into_iter().map(Into::into).collect() }
}

impl<S: Into<Source>, const N: usize> IntoNodeList for [S; N] {
    fn into_node_list(self) -> Vec<Source> { self.into_iter().map(Into::into).collect() }
}

impl<S: Into<Source> + Clone> IntoNodeList for &[S] {
    fn into_node_list(self) -> Vec<Source> { self.iter().cloned().map(Into::into).collect() }
}

impl IntoNodeList for BTreeSet<NodeId> {
    fn into_node_list(self) -> Vec<Source> { self.into_iter().map(Source::Node).collect() }
}

impl IntoNodeList for HashSet<NodeId> {
    fn into_node_list(self) -> Vec<Source> {
        let mut ids: Vec<NodeId> = self.into_iter().collect();
        ids.sort();
        ids.into_iter().map(Source::Node).collect()
    }
}

impl<K, S: Into<Source>> IntoNodeList for BTreeMap<K, S> {
    fn into_node_list(self) -> Vec<Source> { self.into_values().map(Into::into).collect() }
}

impl<K, S: Into<Source>> IntoNodeList for HashMap<K, S> {
    fn into_node_list(self) -> Vec<Source> { self.into_values().map(Into::into).collect() }
}
