use crate::graph::Model;
use crate::store::NodeId;
use std::collections::HashMap;
use std::fmt::Write;

/// Renders the upstream tree of `target`: every node with its kind, its
/// generation state and its observed data, parents indented below children.
/// A node reached a second time is printed as a reference to the level where
/// it first appeared.
pub fn format_trace(model: &Model, target: NodeId) -> String {
    let mut tracer = Tracer { model, visited_at_level: HashMap::new(), output: String::new() };

    if model.registry().contains(target) {
        let _ = writeln!(tracer.output, "GENERATION TRACE for node '{}':", model.name(target));
        let _ = writeln!(tracer.output, "--------------------------------------------------");
        tracer.trace_node(target, 1, "");
    } else {
        let _ = writeln!(tracer.output, "Error: Invalid Node ID {}", target);
    }
    tracer.output
}

struct Tracer<'a> {
    model: &'a Model,
    visited_at_level: HashMap<NodeId, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_node(&mut self, node_id: NodeId, level: usize, prefix: &str) {
        let model = self.model;
        let name = model.name(node_id);
        if let Some(&first_seen) = self.visited_at_level.get(&node_id) {
            let _ = writeln!(self.output, "{}{} -> (Ref to L{})", prefix, name, first_seen);
            return;
        }
        self.visited_at_level.insert(node_id, level);

        let kind = model.kind(node_id).label();
        let state = self.format_state(node_id);
        let _ = writeln!(self.output, "{}[L{}] {} <{}>{}", prefix, level, name, kind, state);

        let parents = model.parents(node_id);
        let stem = build_child_stem(prefix);
        for (i, &parent) in parents.iter().enumerate() {
            let connector = if i == parents.len() - 1 { "`--" } else { "|--" };
            self.trace_node(parent, level + 1, &format!("{}{}", stem, connector));
        }
    }

    fn format_state(&self, id: NodeId) -> String {
        let ledger = match self.model.ledger(id) {
            Some(ledger) => ledger,
            None => return String::new(),
        };
        let mut state = format!(" index={}", self.model.high_water_mark(id).unwrap_or(0));

        if ledger.is_empty() {
            state.push_str(" cache=empty");
        } else {
            let segments: Vec<String> = ledger.segments().map(|s| format!("{}..{}", s.start(), s.end())).collect();
            let _ = write!(state, " cache=[{}]", segments.join(", "));
        }
        if let Some(observed) = self.model.observed(id) {
            let _ = write!(state, " observed={:?}", observed.shape());
        }
        state
    }
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`--", "   ").replace("|--", "|  ")
}
