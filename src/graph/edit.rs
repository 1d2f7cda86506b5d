//! Structural edits. Every method goes through the registry's edge API, so
//! parent lists and child sets never disagree.
use super::model::Model;
use super::source::{converter_for, IntoNodeList, ParentRef, Source};
use crate::analysis::topology;
use crate::store::{GraphError, NodeId};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

impl Model {
    /// Returns `source` as a node, converting plain values with the
    /// conversion of `owner`'s kind. Converted nodes are named after the
    /// owner with a random suffix.
    pub fn ensure_node(&mut self, owner: NodeId, source: Source) -> Result<NodeId, GraphError> {
        self.registry.check(owner)?;
        match source {
            Source::Node(id) => {
                self.registry.check(id)?;
                Ok(id)
            }
            Source::Value(value) => {
                let convert = converter_for(self.registry.kind(owner))
                    .ok_or_else(|| GraphError::Conversion { node: self.registry.name(owner).to_string() })?;
                let name = self.fresh_name(owner);
                debug!(owner = %self.registry.name(owner), node = %name, "converting value to node");
                convert(self, name, value)
            }
        }
    }

    fn fresh_name(&self, owner: NodeId) -> String {
        loop {
            let suffix = Uuid::new_v4().simple().to_string();
            let name = format!("_{}_{}", self.registry.name(owner), &suffix[..6]);
            if !self.registry.name_taken(&name) {
                return name;
            }
        }
    }

    /// Inserts `parent` at `index` among the parents of `node` (appending
    /// when `None`). Returns the id of the parent, which is new if a value
    /// was converted.
    pub fn add_parent(&mut self, node: NodeId, parent: impl Into<Source>, index: Option<usize>) -> Result<NodeId, GraphError> {
        self.registry.check(node)?;
        let parent = self.ensure_node(node, parent.into())?;
        if topology::upstream_from(&self.registry, &[parent]).contains(&node) {
            return Err(GraphError::Cycle {
                node: self.registry.name(node).to_string(),
                parent: self.registry.name(parent).to_string(),
            });
        }
        self.registry.insert_parent(node, parent, index);
        Ok(parent)
    }

    pub fn add_parents(&mut self, node: NodeId, parents: impl IntoNodeList) -> Result<Vec<NodeId>, GraphError> {
        parents
            .into_node_list()
            .into_iter()
            .map(|p| self.add_parent(node, p, None))
            .collect()
    }

    /// Makes `node` the last parent of `child`.
    pub fn add_child(&mut self, node: NodeId, child: impl Into<Source>) -> Result<NodeId, GraphError> {
        let child = self.ensure_node(node, child.into())?;
        self.add_parent(child, node, None)?;
        Ok(child)
    }

    /// Like `add_child` for every entry, skipping repeated nodes.
    pub fn add_children(&mut self, node: NodeId, children: impl IntoNodeList) -> Result<Vec<NodeId>, GraphError> {
        let mut seen = HashSet::new();
        let mut added = Vec::new();
        for child in children.into_node_list() {
            if let Source::Node(id) = child {
                if !seen.insert(id) {
                    continue;
                }
            }
            added.push(self.add_child(node, child)?);
        }
        Ok(added)
    }

    /// Removes one parent edge of `node`, chosen by position or by the first
    /// occurrence of a parent node. Returns the position it occupied.
    pub fn remove_parent(&mut self, node: NodeId, which: impl Into<ParentRef>) -> Result<usize, GraphError> {
        self.registry.check(node)?;
        let index = match which.into() {
            ParentRef::Index(index) => index,
            ParentRef::Node(parent) => self.registry.position_of(node, parent).ok_or_else(|| GraphError::NotFound {
                node: self.registry.name(node).to_string(),
                parent: self.name_or_id(parent),
            })?,
        };
        self.registry.remove_parent_at(node, index)?;
        Ok(index)
    }

    /// Detaches `node` from all of its parents and/or from all of its children.
    pub fn remove(&mut self, node: NodeId, keep_parents: bool, keep_children: bool) -> Result<(), GraphError> {
        self.registry.check(node)?;
        if !keep_parents {
            while !self.registry.get_parents(node).is_empty() {
                let last = self.registry.get_parents(node).len() - 1;
                self.registry.remove_parent_at(node, last)?;
            }
        }
        if !keep_children {
            let children: Vec<NodeId> = self.registry.get_children(node).iter().copied().collect();
            for child in children {
                while let Some(index) = self.registry.position_of(child, node) {
                    self.registry.remove_parent_at(child, index)?;
                }
            }
        }
        Ok(())
    }

    /// Puts `other` in the structural place of `node`. Parents move over in
    /// order and are appended to `other`'s; each child edge to `node` is
    /// replaced by an edge to `other` at the same position.
    pub fn replace_by(&mut self, node: NodeId, other: NodeId, transfer_parents: bool, transfer_children: bool) -> Result<(), GraphError> {
        self.registry.check(node)?;
        self.registry.check(other)?;
        if node == other {
            return Ok(());
        }
        self.check_replacement(node, other, transfer_parents, transfer_children)?;

        if transfer_parents {
            let parents = self.registry.get_parents(node).to_vec();
            self.remove(node, false, true)?;
            self.add_parents(other, parents)?;
        }

        if transfer_children {
            let children: Vec<NodeId> = self.registry.get_children(node).iter().copied().collect();
            for child in children {
                while let Some(index) = self.registry.position_of(child, node) {
                    self.registry.remove_parent_at(child, index)?;
                    self.add_parent(child, other, Some(index))?;
                }
            }
        }
        debug!(node = %self.registry.name(node), by = %self.registry.name(other), "replaced node");
        Ok(())
    }

    /// Rejects a replacement that would close a cycle, before any edge moves.
    fn check_replacement(&self, node: NodeId, other: NodeId, transfer_parents: bool, transfer_children: bool) -> Result<(), GraphError> {
        let cycle = |child: NodeId, parent: NodeId| GraphError::Cycle {
            node: self.registry.name(child).to_string(),
            parent: self.registry.name(parent).to_string(),
        };
        let parents = self.registry.get_parents(node);

        // Everything `other` will depend on once the parents have moved.
        let mut upstream = topology::upstream_from(&self.registry, &[other]);
        if transfer_parents {
            for &parent in parents {
                if topology::upstream_from(&self.registry, &[parent]).contains(&other) {
                    return Err(cycle(other, parent));
                }
            }
            upstream.extend(topology::upstream_from(&self.registry, parents));
        }
        if transfer_children {
            if let Some(&child) = self.registry.get_children(node).iter().find(|&&c| upstream.contains(&c)) {
                return Err(cycle(child, other));
            }
        }
        Ok(())
    }

    /// Every node connected to `node` through parent or child edges, `node`
    /// included. Order is unspecified.
    pub fn component(&self, node: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.registry.check(node)?;
        Ok(topology::component(&self.registry, node))
    }

    fn name_or_id(&self, id: NodeId) -> String {
        if self.registry.contains(id) {
            self.registry.name(id).to_string()
        } else {
            id.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::compute::{ComputationError, Data, Input, Output};
    use crate::graph::{Model, Source};
    use crate::store::{GraphError, NodeId, NodeKind};
    use std::collections::{BTreeMap, HashMap};

    fn identity(input: Input) -> Result<Output, ComputationError> {
        let data = input.parent(0).cloned().unwrap_or(Data::scalar(0.0));
        Ok(input.into_output(data))
    }

    fn assert_consistent(model: &Model) {
        for id in model.registry().ids() {
            for &p in model.parents(id) {
                assert!(model.children(p).contains(&id));
            }
            for &c in model.children(id) {
                assert!(model.parents(c).contains(&id));
            }
        }
    }

    fn plain(model: &mut Model, names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|n| model.add_node(*n, ()).unwrap()).collect()
    }

    #[test]
    fn test_add_parent_at_position() {
        let mut model = Model::new();
        let ids = plain(&mut model, &["a", "b", "c"]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        model.add_parent(c, a, None).unwrap();
        model.add_parent(c, b, Some(0)).unwrap();
        assert_eq!(model.parents(c), &[b, a]);
        assert!(model.children(a).contains(&c));
        assert!(!model.is_root(c) && model.is_leaf(c));
        assert_consistent(&model);
    }

    #[test]
    fn test_value_parent_becomes_constant() {
        let mut model = Model::new();
        let op = model.add_operation("op", identity, ()).unwrap();
        let c = model.add_parent(op, 2.5, None).unwrap();

        assert_eq!(model.kind(c), NodeKind::Constant);
        let name = model.name(c);
        assert!(name.starts_with("_op_"), "{}", name);
        assert_eq!(name.len(), "_op_".len() + 6);
        assert_eq!(model.parents(op), &[c]);
    }

    #[test]
    fn test_plain_node_cannot_convert() {
        let mut model = Model::new();
        let n = model.add_node("n", ()).unwrap();
        let err = model.add_parent(n, Source::from(1.0), None).unwrap_err();
        assert_eq!(err, GraphError::Conversion { node: "n".into() });
    }

    #[test]
    fn test_batch_forms() {
        let mut model = Model::new();
        let ids = plain(&mut model, &["a", "b", "c", "d"]);
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);

        model.add_parents(d, BTreeMap::from([("first", a), ("second", b)])).unwrap();
        assert_eq!(model.parents(d), &[a, b]);

        let added = model.add_children(c, vec![d, d]).unwrap();
        assert_eq!(added, vec![d]);
        assert_eq!(model.parents(d), &[a, b, c]);

        model.add_children(a, HashMap::from([("x", b)])).unwrap();
        assert_eq!(model.parents(b), &[a]);
        assert_consistent(&model);
    }

    #[test]
    fn test_remove_parent_by_node_and_index() {
        let mut model = Model::new();
        let ids = plain(&mut model, &["a", "b", "c", "x"]);
        let (a, b, c, x) = (ids[0], ids[1], ids[2], ids[3]);
        model.add_parents(c, vec![a, b, a]).unwrap();

        assert_eq!(model.remove_parent(c, a).unwrap(), 0);
        assert_eq!(model.parents(c), &[b, a]);
        assert!(model.children(a).contains(&c));

        assert_eq!(model.remove_parent(c, 1).unwrap(), 1);
        assert!(model.children(a).is_empty());

        let err = model.remove_parent(c, x).unwrap_err();
        assert_eq!(err, GraphError::NotFound { node: "c".into(), parent: "x".into() });
        assert_consistent(&model);
    }

    #[test]
    fn test_remove_detaches() {
        let mut model = Model::new();
        let ids = plain(&mut model, &["a", "b", "c", "d"]);
        let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
        model.add_parents(c, vec![a, b]).unwrap();
        model.add_parents(d, vec![c, c]).unwrap();

        model.remove(c, true, false).unwrap();
        assert_eq!(model.parents(c), &[a, b]);
        assert!(model.parents(d).is_empty());

        model.remove(c, false, false).unwrap();
        assert!(model.is_root(c) && model.is_leaf(c));
        assert!(model.is_leaf(a) && model.is_leaf(b));
        assert_consistent(&model);
    }

    #[test]
    fn test_replace_by_keeps_positions() {
        let mut model = Model::new();
        let ids = plain(&mut model, &["p1", "p2", "old", "new", "other", "child"]);
        let (p1, p2, old, new, other, child) = (ids[0], ids[1], ids[2], ids[3], ids[4], ids[5]);
        model.add_parents(old, vec![p1, p2]).unwrap();
        model.add_parents(child, vec![other, old, other]).unwrap();

        model.replace_by(old, new, true, true).unwrap();

        assert_eq!(model.parents(new), &[p1, p2]);
        assert_eq!(model.parents(child), &[other, new, other]);
        assert!(model.is_root(old) && model.is_leaf(old));
        assert!(model.children(p1).contains(&new) && !model.children(p1).contains(&old));
        assert_consistent(&model);
    }

    #[test]
    fn test_replace_by_child_leaves_graph_unchanged() {
        let mut model = Model::new();
        let ids = plain(&mut model, &["p", "old", "child"]);
        let (p, old, child) = (ids[0], ids[1], ids[2]);
        model.add_parent(old, p, None).unwrap();
        model.add_parent(child, old, None).unwrap();

        let err = model.replace_by(old, child, true, true).unwrap_err();
        assert_eq!(err, GraphError::Cycle { node: "child".into(), parent: "child".into() });
        assert_eq!(model.parents(old), &[p]);
        assert_eq!(model.parents(child), &[old]);
        assert_eq!(model.children(p).iter().copied().collect::<Vec<_>>(), vec![old]);
        assert_consistent(&model);
    }

    #[test]
    fn test_replace_by_ancestor_leaves_graph_unchanged() {
        let mut model = Model::new();
        let ids = plain(&mut model, &["top", "p", "node"]);
        let (top, p, node) = (ids[0], ids[1], ids[2]);
        model.add_parent(p, top, None).unwrap();
        model.add_parent(node, p, None).unwrap();

        let err = model.replace_by(node, top, true, false).unwrap_err();
        assert_eq!(err, GraphError::Cycle { node: "top".into(), parent: "p".into() });
        assert_eq!(model.parents(node), &[p]);
        assert!(model.is_root(top));
        assert_consistent(&model);

        // Moving only the children is fine.
        model.replace_by(node, top, false, true).unwrap();
        assert_eq!(model.parents(node), &[p]);
    }

    #[test]
    fn test_cycles_rejected() {
        let mut model = Model::new();
        let ids = plain(&mut model, &["a", "b", "c"]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        model.add_parent(b, a, None).unwrap();
        model.add_parent(c, b, None).unwrap();

        assert!(matches!(model.add_parent(a, c, None), Err(GraphError::Cycle { .. })));
        assert!(matches!(model.add_parent(a, a, None), Err(GraphError::Cycle { .. })));
        assert!(model.is_root(a));
    }

    #[test]
    fn test_component() {
        let mut model = Model::new();
        let ids = plain(&mut model, &["a", "b", "c", "lone"]);
        let (a, b, c, lone) = (ids[0], ids[1], ids[2], ids[3]);
        model.add_parent(b, a, None).unwrap();
        model.add_child(c, b).unwrap();

        let mut comp = model.component(b).unwrap();
        comp.sort();
        assert_eq!(comp, vec![a, b, c]);
        assert_eq!(model.component(lone).unwrap(), vec![lone]);
    }
}
