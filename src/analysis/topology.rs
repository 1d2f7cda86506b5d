use crate::store::{GraphError, NodeId, Registry};
use std::collections::{HashSet, VecDeque};

/// Performs a Topological Sort using Depth-First Search (DFS).
///
/// Returns a list of NodeIds where every parent appears before its consumers.
/// Nodes that are disconnected from each other are all included.
pub fn sort(registry: &Registry) -> Result<Vec<NodeId>, GraphError> {
    let count = registry.count();
    let mut order = Vec::with_capacity(count);
    let mut state = vec![VisitState::None; count];

    for i in 0..count {
        if state[i] == VisitState::None {
            visit(NodeId::new(i), None, registry, &mut state, &mut order)?;
        }
    }

    Ok(order)
}

#[derive(Clone, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting, // Used for cycle detection
    Visited,
}

fn visit(
    node: NodeId,
    from: Option<NodeId>,
    registry: &Registry,
    state: &mut Vec<VisitState>,
    order: &mut Vec<NodeId>,
) -> Result<(), GraphError> {
    let idx = node.index();

    match state[idx] {
        VisitState::Visited => return Ok(()),
        VisitState::Visiting => {
            let child = from.unwrap_or(node);
            return Err(GraphError::Cycle {
                node: registry.name(child).to_string(),
                parent: registry.name(node).to_string(),
            });
        }
        VisitState::None => state[idx] = VisitState::Visiting,
    }

    for &parent in registry.get_parents(node) {
        visit(parent, Some(node), registry, state, order)?;
    }

    state[idx] = VisitState::Visited;
    order.push(node);
    Ok(())
}

/// Every node that (transitively) feeds into one of `start_nodes`, the start
/// nodes included.
pub fn upstream_from(registry: &Registry, start_nodes: &[NodeId]) -> HashSet<NodeId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from(start_nodes.to_vec());

    while let Some(node) = queue.pop_front() {
        if visited.insert(node) {
            queue.extend(registry.get_parents(node).iter().copied());
        }
    }
    visited
}

/// Every node that (transitively) consumes one of `start_nodes`, the start
/// nodes included.
pub fn downstream_from(registry: &Registry, start_nodes: &[NodeId]) -> HashSet<NodeId> {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::from(start_nodes.to_vec());

    while let Some(node) = queue.pop_front() {
        if visited.insert(node) {
            queue.extend(registry.get_children(node).iter().copied());
        }
    }
    visited
}

/// The connected component of `start`, following parent and child edges alike.
///
/// Depth first; a node is skipped once its name has been seen.
pub fn component(registry: &Registry, start: NodeId) -> Vec<NodeId> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut found = Vec::new();
    let mut search = vec![start];

    while let Some(current) = search.pop() {
        if !seen.insert(registry.name(current)) {
            continue;
        }
        found.push(current);
        search.extend(registry.neighbours(current));
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NodeKind, NodeMetadata};

    fn diamond() -> (Registry, [NodeId; 4]) {
        // Shape: A -> B, A -> C, B+C -> D
        let mut reg = Registry::new();
        let a = reg.add_node(NodeKind::Plain, NodeMetadata::named("A")).unwrap();
        let b = reg.add_node(NodeKind::Plain, NodeMetadata::named("B")).unwrap();
        let c = reg.add_node(NodeKind::Plain, NodeMetadata::named("C")).unwrap();
        let d = reg.add_node(NodeKind::Plain, NodeMetadata::named("D")).unwrap();
        reg.insert_parent(b, a, None);
        reg.insert_parent(c, a, None);
        reg.insert_parent(d, b, None);
        reg.insert_parent(d, c, None);
        (reg, [a, b, c, d])
    }

    #[test]
    fn test_sort_diamond_dependency() {
        let (reg, [a, b, c, d]) = diamond();
        let res = sort(&reg).expect("Sort failed");

        let pos = |id: NodeId| res.iter().position(|&x| x == id).unwrap();
        assert!(pos(a) < pos(b));
        assert!(pos(a) < pos(c));
        assert!(pos(b) < pos(d));
        assert!(pos(c) < pos(d));
    }

    #[test]
    fn test_cycle_detection_explicit() {
        // The edit API refuses cycles, so inject one through the raw table.
        let (mut reg, [a, _, _, d]) = diamond();
        reg.insert_parent(a, d, None);

        let err = sort(&reg).unwrap_err();
        assert!(matches!(err, GraphError::Cycle { .. }), "{:?}", err);
    }

    #[test]
    fn test_reachability() {
        let (reg, [a, b, c, d]) = diamond();
        assert_eq!(upstream_from(&reg, &[b]), HashSet::from([a, b]));
        assert_eq!(downstream_from(&reg, &[b]), HashSet::from([b, d]));
        assert_eq!(downstream_from(&reg, &[a]).len(), 4);
        assert!(!upstream_from(&reg, &[c]).contains(&d));
    }

    #[test]
    fn test_component_ignores_direction_and_isolated_nodes() {
        let (mut reg, [a, b, c, d]) = diamond();
        let lone = reg.add_node(NodeKind::Plain, NodeMetadata::named("Lone")).unwrap();

        let mut comp = component(&reg, c);
        comp.sort();
        assert_eq!(comp, vec![a, b, c, d]);
        assert_eq!(component(&reg, lone), vec![lone]);
    }
}
