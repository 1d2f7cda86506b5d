use super::error::GraphError;
use super::types::*;
use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap};

pub type ParentList = SmallVec<[NodeId; 4]>;

/// Arena holding every node of a model.
///
/// Topology is kept in two index tables: the ordered parent list of each node
/// and the child set of each node. They are private so that the only way to
/// change an edge is through the edit methods below, which always update both
/// sides.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    // Columnar Arrays
    pub(crate) kinds: Vec<NodeKind>,
    pub(crate) meta: Vec<NodeMetadata>,

    // Topology
    parents: Vec<ParentList>,
    children: Vec<BTreeSet<NodeId>>,

    // Name -> id, used for lookup and uniqueness checks
    names: HashMap<String, NodeId>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }
    pub fn count(&self) -> usize { self.kinds.len() }

    pub fn add_node(&mut self, kind: NodeKind, meta: NodeMetadata) -> Result<NodeId, GraphError> {
        if self.names.contains_key(&meta.name) {
            return Err(GraphError::DuplicateName(meta.name));
        }
        let id = NodeId::new(self.kinds.len());
        self.names.insert(meta.name.clone(), id);

        self.kinds.push(kind);
        self.meta.push(meta);
        self.parents.push(ParentList::new());
        self.children.push(BTreeSet::new());
        Ok(id)
    }

    pub fn contains(&self, id: NodeId) -> bool { id.index() < self.count() }

    pub fn check(&self, id: NodeId) -> Result<(), GraphError> {
        if self.contains(id) { Ok(()) } else { Err(GraphError::UnknownNode(id.to_string())) }
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> { self.names.get(name).copied() }
    pub fn name_taken(&self, name: &str) -> bool { self.names.contains_key(name) }

    #[inline(always)]
    pub fn name(&self, id: NodeId) -> &str { &self.meta[id.index()].name }

    #[inline(always)]
    pub fn kind(&self, id: NodeId) -> NodeKind { self.kinds[id.index()] }

    #[inline(always)]
    pub fn get_parents(&self, id: NodeId) -> &[NodeId] { &self.parents[id.index()] }

    #[inline(always)]
    pub fn get_children(&self, id: NodeId) -> &BTreeSet<NodeId> { &self.children[id.index()] }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.count()).map(NodeId::new)
    }

    /// Parents and children together, each listed once.
    pub fn neighbours(&self, id: NodeId) -> BTreeSet<NodeId> {
        let mut n = self.children[id.index()].clone();
        n.extend(self.parents[id.index()].iter().copied());
        n
    }

    pub fn position_of(&self, child: NodeId, parent: NodeId) -> Option<usize> {
        self.parents[child.index()].iter().position(|&p| p == parent)
    }

    /// Inserts `parent` into the parent list of `child` at `index` (appending
    /// when `None`, clamping past the end) and records the reciprocal child
    /// edge. Returns the position the edge landed on.
    pub fn insert_parent(&mut self, child: NodeId, parent: NodeId, index: Option<usize>) -> usize {
        let list = &mut self.parents[child.index()];
        let index = index.unwrap_or(list.len()).min(list.len());
        list.insert(index, parent);
        self.children[parent.index()].insert(child);
        index
    }

    /// Removes the parent edge at `index`. The child stays in the parent's
    /// child set while another edge between the two remains.
    pub fn remove_parent_at(&mut self, child: NodeId, index: usize) -> Result<NodeId, GraphError> {
        let len = self.parents[child.index()].len();
        if index >= len {
            return Err(GraphError::ParentIndexOutOfRange { node: self.name(child).to_string(), index, len });
        }
        let parent = self.parents[child.index()].remove(index);
        if self.position_of(child, parent).is_none() {
            self.children[parent.index()].remove(&child);
        }
        Ok(parent)
    }
}
