use crate::engine::one_to_all::{BackLink, SearchResult, SearchVertex};
use crate::transfer_pattern::{
    DelayScenario, ScenarioId, TargetDag, TpArc, TpNode, TpNodeId, TransferPattern,
};
use crate::transit_data::{Stop, TripPattern};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Accumulates one-to-all search outputs into the per-source DAGs of one
/// transfer pattern.
pub struct TransferPatternEditor {
    root: Stop,
    targets: HashMap<Stop, TargetDagBuilder>,
    /// Per pattern, the largest transfer wait observed after riding it,
    /// recorded only during static (scenario-less) passes.
    possible_delays: BTreeMap<TripPattern, u32>,
    scenarios: Vec<DelayScenario>,
}

struct TargetDagBuilder {
    nodes: Vec<TpNode>,
    node_of_stop: HashMap<Stop, TpNodeId>,
}

impl TargetDagBuilder {
    fn new(target: Stop) -> Self {
        let mut node_of_stop = HashMap::new();
        node_of_stop.insert(target, TargetDag::SINK);
        Self {
            nodes: vec![TpNode::new(target)],
            node_of_stop,
        }
    }

    fn node_of(&mut self, stop: Stop) -> TpNodeId {
        if let Some(&node) = self.node_of_stop.get(&stop) {
            return node;
        }
        let node = self.nodes.len();
        self.nodes.push(TpNode::new(stop));
        self.node_of_stop.insert(stop, node);
        node
    }

    fn has_predecessor(
        &self,
        node: TpNodeId,
        predecessor: TpNodeId,
        walking: bool,
        scenario: Option<ScenarioId>,
    ) -> bool {
        self.nodes[node]
            .predecessors
            .iter()
            .any(|arc| arc.node == predecessor && arc.walking == walking && arc.scenario == scenario)
    }
}

impl TransferPatternEditor {
    pub fn new(root: Stop) -> Self {
        Self {
            root,
            targets: HashMap::new(),
            possible_delays: BTreeMap::new(),
            scenarios: Vec::new(),
        }
    }

    /// Interns a scenario by its pattern set and returns its id for
    /// tagging subsequent `add` calls.
    pub fn intern_scenario(&mut self, scenario: DelayScenario) -> ScenarioId {
        let pattern_set = scenario.pattern_set();
        for (id, existing) in self.scenarios.iter().enumerate() {
            if existing.pattern_set() == pattern_set {
                return id;
            }
        }
        self.scenarios.push(scenario);
        self.scenarios.len() - 1
    }

    /// Folds every optimal chain of `result` into the per-target DAGs. All
    /// new arcs are tagged with `scenario`; waits feeding the delay policy
    /// are recorded only when `scenario` is `None`.
    pub fn add(&mut self, result: &SearchResult, scenario: Option<ScenarioId>) {
        for target_idx in 0..result.nb_of_targets() {
            let target = Stop { idx: target_idx };
            // no pattern from a stop to itself
            if target == self.root {
                continue;
            }
            let states = result.states_for(target);
            if states.is_empty() {
                // no route found to this target
                continue;
            }
            self.add_chains(target, states, result, scenario);
        }
    }

    fn add_chains(
        &mut self,
        target: Stop,
        states: &[usize],
        result: &SearchResult,
        scenario: Option<ScenarioId>,
    ) {
        let dag = self
            .targets
            .entry(target)
            .or_insert_with(|| TargetDagBuilder::new(target));

        for &state_idx in states {
            let mut before: Option<TpNodeId> = None;
            let mut was_walking = false;
            let mut last_time: Option<i64> = None;

            for state in result.tree.chain(state_idx) {
                let stop_visiting = state.back.is_none()
                    || state.link == BackLink::Walk
                    || state.link == BackLink::LegSwitch;

                if stop_visiting {
                    match state.vertex {
                        SearchVertex::Stop(stop) => {
                            let current = dag.node_of(stop);
                            if let Some(before_node) = before {
                                if current != TargetDag::SINK
                                    && current != before_node
                                    && !dag.has_predecessor(
                                        before_node,
                                        current,
                                        was_walking,
                                        scenario,
                                    )
                                {
                                    dag.nodes[before_node].predecessors.push(TpArc {
                                        node: current,
                                        walking: was_walking,
                                        scenario,
                                    });
                                    if scenario.is_some() {
                                        debug!(
                                            "new dynamic arc {} <- {} for target {}",
                                            before_node, current, target.idx
                                        );
                                    }
                                }
                            }
                            before = Some(current);
                            was_walking = state.link == BackLink::Walk;
                        }
                        SearchVertex::StopDepart(_) if scenario.is_none() => {
                            if let Some(last_time) = last_time {
                                let wait = last_time - state.time;
                                if wait > 0 && state.boardings > 0 {
                                    if let Some(pattern) = state.last_pattern {
                                        let wait = wait as u32;
                                        let entry =
                                            self.possible_delays.entry(pattern).or_insert(0);
                                        if *entry < wait {
                                            *entry = wait;
                                        }
                                    }
                                }
                            }
                        }
                        _ => {}
                    }
                }

                last_time = Some(state.time);
            }
        }
    }

    /// All transfer waits recorded during static construction.
    pub fn possible_delays(&self) -> &BTreeMap<TripPattern, u32> {
        &self.possible_delays
    }

    /// Finalizes into a transfer pattern. Targets that never produced a
    /// path (a lone sink node) are left out.
    pub fn create(self) -> TransferPattern {
        let mut targets: Vec<TargetDag> = self
            .targets
            .into_iter()
            .filter(|(_, builder)| builder.nodes.len() > 1)
            .map(|(target, builder)| TargetDag {
                target,
                nodes: builder.nodes,
            })
            .collect();
        targets.sort_by_key(|dag| dag.target);
        TransferPattern {
            source: self.root,
            targets,
            scenarios: self.scenarios,
        }
    }
}
