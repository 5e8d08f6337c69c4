use crate::graph::{chunk_filename, Graph, GraphIoError};
use crate::transfer_pattern::{DelayScenario, TargetDag, TpNode, TransferPattern};
use crate::transit_data::{Stop, TransitData, TripPattern};
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::{debug, info};

/// A label or code of an incoming chunk has no equivalent in the first
/// chunk's graph : the chunks were built against different data versions.
#[derive(Debug, PartialEq, Eq)]
pub enum MergeError {
    UnknownStop(String),
    UnknownTripPattern(String),
}

impl Display for MergeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeError::UnknownStop(label) => {
                write!(f, "Stop not found with label {}", label)
            }
            MergeError::UnknownTripPattern(code) => {
                write!(f, "TripPattern not found with code {}", code)
            }
        }
    }
}

impl std::error::Error for MergeError {}

#[derive(Debug)]
pub enum ChunkMergeError {
    Io(GraphIoError),
    Merge(MergeError),
}

impl Display for ChunkMergeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkMergeError::Io(err) => err.fmt(f),
            ChunkMergeError::Merge(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for ChunkMergeError {}

impl From<GraphIoError> for ChunkMergeError {
    fn from(err: GraphIoError) -> Self {
        ChunkMergeError::Io(err)
    }
}

impl From<MergeError> for ChunkMergeError {
    fn from(err: MergeError) -> Self {
        ChunkMergeError::Merge(err)
    }
}

/// Loads the `m` chunk files of `dir` and merges them into one graph,
/// canonicalizing every stop and pattern reference to the first chunk's
/// copies. Each merged-in chunk graph is dropped before the next one is
/// loaded.
pub fn merge_chunks(dir: &Path, m: usize) -> Result<Graph, ChunkMergeError> {
    info!("merging {} graphs into one", m);

    let first = dir.join(chunk_filename(1, m));
    info!("loading graph {:?}", first);
    let mut accumulator = Graph::load(&first)?;

    for n in 2..=m {
        let path = dir.join(chunk_filename(n, m));
        info!("loading graph {:?}", path);
        let incoming = Graph::load(&path)?;
        merge_into(&mut accumulator, incoming)?;
        debug!("throwing out graph {} in order to save memory", n);
    }

    Ok(accumulator)
}

/// Merges `incoming` into `accumulator`, replacing every stop and pattern
/// reference by the accumulator's equivalent, looked up by label and code.
/// Chunks are disjoint by source stop, so arcs are copied without
/// arc-level deduplication.
pub fn merge_into(accumulator: &mut Graph, incoming: Graph) -> Result<(), MergeError> {
    let Graph {
        transit: incoming_transit,
        tp: incoming_tp,
    } = incoming;

    for (stop, pattern, position) in incoming_tp.direct_connections.entries() {
        let stop = canonical_stop(&accumulator.transit, &incoming_transit, stop)?;
        let pattern = canonical_pattern(&accumulator.transit, &incoming_transit, pattern)?;
        accumulator
            .tp
            .direct_connections
            .insert(stop, pattern, position);
    }

    for transfer_pattern in incoming_tp.transfer_patterns() {
        let canonicalized =
            canonicalize_transfer_pattern(&accumulator.transit, &incoming_transit, transfer_pattern)?;
        accumulator.tp.insert(canonicalized);
    }

    Ok(())
}

fn canonicalize_transfer_pattern(
    reference: &TransitData,
    incoming: &TransitData,
    transfer_pattern: &TransferPattern,
) -> Result<TransferPattern, MergeError> {
    let source = canonical_stop(reference, incoming, transfer_pattern.source)?;

    let mut targets = Vec::with_capacity(transfer_pattern.targets.len());
    for dag in &transfer_pattern.targets {
        let mut nodes = Vec::with_capacity(dag.nodes.len());
        for node in &dag.nodes {
            nodes.push(TpNode {
                stop: canonical_stop(reference, incoming, node.stop)?,
                predecessors: node.predecessors.clone(),
            });
        }
        targets.push(TargetDag {
            target: canonical_stop(reference, incoming, dag.target)?,
            nodes,
        });
    }

    let mut scenarios = Vec::with_capacity(transfer_pattern.scenarios.len());
    for scenario in &transfer_pattern.scenarios {
        let mut entries = Vec::with_capacity(scenario.entries.len());
        for &(pattern, min_delay) in &scenario.entries {
            entries.push((canonical_pattern(reference, incoming, pattern)?, min_delay));
        }
        scenarios.push(DelayScenario::new(entries));
    }

    Ok(TransferPattern {
        source,
        targets,
        scenarios,
    })
}

fn canonical_stop(
    reference: &TransitData,
    incoming: &TransitData,
    stop: Stop,
) -> Result<Stop, MergeError> {
    let label = incoming.stop_label(stop);
    reference
        .stop_by_label(label)
        .ok_or_else(|| MergeError::UnknownStop(label.to_string()))
}

fn canonical_pattern(
    reference: &TransitData,
    incoming: &TransitData,
    pattern: TripPattern,
) -> Result<TripPattern, MergeError> {
    let code = incoming.pattern_code(pattern);
    reference
        .pattern_by_code(code)
        .ok_or_else(|| MergeError::UnknownTripPattern(code.to_string()))
}
