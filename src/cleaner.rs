use crate::transfer_pattern::{TargetDag, TpNode, TpNodeId, TransferPatternIndex};
use tracing::info;

/// Removes every cycle from every target-rooted DAG of the index.
///
/// Two disjoint predecessor paths meeting the same node are permitted; a
/// path revisiting a node of itself is not. Returns the number of arcs
/// removed.
pub fn clean(index: &mut TransferPatternIndex) -> usize {
    let mut removed = 0;
    for pattern in index.transfer_patterns_mut() {
        for dag in &mut pattern.targets {
            removed += clean_dag(dag);
        }
    }
    if removed > 0 {
        info!("removed {} cyclic arcs", removed);
    }
    removed
}

pub fn clean_dag(dag: &mut TargetDag) -> usize {
    let mut on_path = vec![false; dag.nodes.len()];
    visit(&mut dag.nodes, TargetDag::SINK, &mut on_path)
}

/// Depth-first walk with per-path marking. An arc leading to a node already
/// on the current path is dropped from its parent.
fn visit(nodes: &mut Vec<TpNode>, node: TpNodeId, on_path: &mut Vec<bool>) -> usize {
    let mut removed = 0;
    on_path[node] = true;

    let mut arc = 0;
    while arc < nodes[node].predecessors.len() {
        let predecessor = nodes[node].predecessors[arc].node;
        if on_path[predecessor] {
            // cycle detected, remove it
            nodes[node].predecessors.swap_remove(arc);
            removed += 1;
        } else {
            removed += visit(nodes, predecessor, on_path);
            arc += 1;
        }
    }

    on_path[node] = false;
    removed
}
