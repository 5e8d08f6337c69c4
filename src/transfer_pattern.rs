use crate::realtime::DelaySnapshot;
use crate::transit_data::{Stop, TransitData, TripPattern};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

/// Index of a node inside one target DAG's arena.
pub type TpNodeId = usize;

/// Index of a scenario inside one transfer pattern's scenario table.
pub type ScenarioId = usize;

/// An arc `current ← predecessor` of a target-rooted DAG.
///
/// `scenario` is present iff the arc was discovered only under that delay
/// scenario (a dynamic arc). Two arcs agreeing on `(node, walking)` but
/// differing in scenario are distinct : each records its own provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpArc {
    pub node: TpNodeId,
    pub walking: bool,
    pub scenario: Option<ScenarioId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TpNode {
    pub stop: Stop,
    pub predecessors: Vec<TpArc>,
}

impl TpNode {
    pub fn new(stop: Stop) -> Self {
        Self {
            stop,
            predecessors: Vec::new(),
        }
    }
}

/// The predecessor DAG anchored at one target stop. Node 0 is the target
/// sink; every predecessor chain ends at a node without predecessors, whose
/// stop is the pattern's source. Within one DAG a stop appears at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDag {
    pub target: Stop,
    pub nodes: Vec<TpNode>,
}

impl TargetDag {
    pub const SINK: TpNodeId = 0;

    pub fn sink(&self) -> &TpNode {
        &self.nodes[Self::SINK]
    }
}

/// A synthesized perturbation of the timetable : each mentioned pattern is
/// delayed by at least the recorded number of seconds. The recorded value is
/// strictly positive and already includes the extra second that makes the
/// originally-chosen connection missed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayScenario {
    pub entries: Vec<(TripPattern, u32)>,
}

impl DelayScenario {
    pub fn new(entries: Vec<(TripPattern, u32)>) -> Self {
        Self { entries }
    }

    /// Identity for interning and deduplication : the set of mentioned
    /// patterns.
    pub fn pattern_set(&self) -> BTreeSet<TripPattern> {
        self.entries.iter().map(|(pattern, _)| *pattern).collect()
    }

    /// The overlay realizing this scenario on the scheduled timetable.
    pub fn to_snapshot(&self, transit: &TransitData) -> DelaySnapshot {
        let mut snapshot = DelaySnapshot::new();
        for &(pattern, delay_seconds) in &self.entries {
            snapshot.delay_pattern(transit, pattern, delay_seconds);
        }
        snapshot
    }

    /// Whether the current realtime situation exhibits at least the delays
    /// this scenario was built for. Dynamic arcs may only be used when it
    /// does.
    pub fn is_applicable(&self, transit: &TransitData, overlay: Option<&DelaySnapshot>) -> bool {
        for &(pattern, min_delay) in &self.entries {
            let max_delay = overlay
                .map(|snapshot| snapshot.max_arrival_delay(transit, pattern))
                .unwrap_or(0);
            if max_delay < min_delay {
                return false;
            }
        }
        true
    }

    pub fn display<'a>(&'a self, transit: &'a TransitData) -> impl Display + 'a {
        DelayScenarioDisplay {
            scenario: self,
            transit,
        }
    }
}

struct DelayScenarioDisplay<'a> {
    scenario: &'a DelayScenario,
    transit: &'a TransitData,
}

impl Display for DelayScenarioDisplay<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (rank, (pattern, delay)) in self.scenario.entries.iter().enumerate() {
            if rank > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} <{}s>", self.transit.pattern_code(*pattern), delay)?;
        }
        write!(f, "}}")
    }
}

/// All patterns from one source stop to every reachable target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferPattern {
    pub source: Stop,
    pub targets: Vec<TargetDag>,
    /// Interned delay scenarios; arcs reference them by index.
    pub scenarios: Vec<DelayScenario>,
}

impl TransferPattern {
    pub fn target_dag(&self, target: Stop) -> Option<&TargetDag> {
        self.targets.iter().find(|dag| dag.target == target)
    }

    pub fn scenario(&self, id: ScenarioId) -> &DelayScenario {
        &self.scenarios[id]
    }
}

/// Ride pattern `pattern` from its position `from_pos` to `to_pos`, no
/// transfer. Invariant : `from_pos < to_pos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectConnection {
    pub pattern: TripPattern,
    pub from_pos: usize,
    pub to_pos: usize,
}

/// Inverted index stop → (pattern, position) enabling on-the-fly
/// enumeration of direct connections between any two stops.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct DirectConnectionIndex {
    visits: Vec<Vec<(TripPattern, usize)>>,
}

impl DirectConnectionIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn build(transit: &TransitData) -> Self {
        let mut visits = vec![Vec::new(); transit.nb_of_stops()];
        for pattern in transit.trip_patterns() {
            for (position, stop) in transit.pattern_data(pattern).stops.iter().enumerate() {
                visits[stop.idx].push((pattern, position));
            }
        }
        Self { visits }
    }

    pub fn is_empty(&self) -> bool {
        self.visits.iter().all(Vec::is_empty)
    }

    fn visits_of(&self, stop: Stop) -> &[(TripPattern, usize)] {
        self.visits.get(stop.idx).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn connections(&self, from: Stop, to: Stop) -> Vec<DirectConnection> {
        let mut connections = Vec::new();
        for &(pattern_from, from_pos) in self.visits_of(from) {
            for &(pattern_to, to_pos) in self.visits_of(to) {
                if pattern_from == pattern_to && from_pos < to_pos {
                    connections.push(DirectConnection {
                        pattern: pattern_from,
                        from_pos,
                        to_pos,
                    });
                }
            }
        }
        connections
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (Stop, TripPattern, usize)> + '_ {
        self.visits.iter().enumerate().flat_map(|(idx, visits)| {
            visits
                .iter()
                .map(move |&(pattern, position)| (Stop { idx }, pattern, position))
        })
    }

    pub(crate) fn insert(&mut self, stop: Stop, pattern: TripPattern, position: usize) {
        if self.visits.len() <= stop.idx {
            self.visits.resize_with(stop.idx + 1, Vec::new);
        }
        self.visits[stop.idx].push((pattern, position));
    }
}

/// Arc counts reported at the end of a build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArcStats {
    pub sources: usize,
    pub total_arcs: usize,
    pub walking_arcs: usize,
    pub dynamic_arcs: usize,
    pub dynamic_walking_arcs: usize,
}

/// The final data model : per-source transfer patterns plus the
/// direct-connection index.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TransferPatternIndex {
    transfer_patterns: Vec<TransferPattern>,
    pub direct_connections: DirectConnectionIndex,
    #[serde(skip)]
    of_source: HashMap<Stop, usize>,
}

impl TransferPatternIndex {
    pub fn new(direct_connections: DirectConnectionIndex) -> Self {
        Self {
            transfer_patterns: Vec::new(),
            direct_connections,
            of_source: HashMap::new(),
        }
    }

    pub fn insert(&mut self, pattern: TransferPattern) {
        self.of_source
            .insert(pattern.source, self.transfer_patterns.len());
        self.transfer_patterns.push(pattern);
    }

    pub fn pattern_for_source(&self, source: Stop) -> Option<&TransferPattern> {
        self.of_source
            .get(&source)
            .map(|&rank| &self.transfer_patterns[rank])
    }

    /// The target-anchored DAG for one (source, target) pair.
    pub fn transfer_pattern(&self, source: Stop, target: Stop) -> Option<&TargetDag> {
        self.pattern_for_source(source)?.target_dag(target)
    }

    pub fn direct_connections(&self, from: Stop, to: Stop) -> Vec<DirectConnection> {
        self.direct_connections.connections(from, to)
    }

    pub fn transfer_patterns(&self) -> &[TransferPattern] {
        &self.transfer_patterns
    }

    pub fn transfer_patterns_mut(&mut self) -> &mut [TransferPattern] {
        &mut self.transfer_patterns
    }

    pub fn nb_of_sources(&self) -> usize {
        self.transfer_patterns.len()
    }

    /// Restores the source lookup after deserialization.
    pub fn rebuild_lookups(&mut self) {
        self.of_source = self
            .transfer_patterns
            .iter()
            .enumerate()
            .map(|(rank, pattern)| (pattern.source, rank))
            .collect();
    }

    pub fn arc_stats(&self) -> ArcStats {
        let mut stats = ArcStats::default();
        for pattern in &self.transfer_patterns {
            stats.sources += 1;
            for dag in &pattern.targets {
                for node in &dag.nodes {
                    for arc in &node.predecessors {
                        stats.total_arcs += 1;
                        if arc.walking {
                            stats.walking_arcs += 1;
                        }
                        if arc.scenario.is_some() {
                            stats.dynamic_arcs += 1;
                            if arc.walking {
                                stats.dynamic_walking_arcs += 1;
                            }
                        }
                    }
                }
            }
        }
        stats
    }
}
