pub mod model_builder;

pub use model_builder::TimetableBuilder;

use tresse::builder::{build, BuildConfig};
use tresse::graph::Graph;
use tresse::transit_data::TransitData;
use tresse::DelayPolicy;

/// Builds a single-chunk graph with the given delay policy.
pub fn build_graph(transit: TransitData, delay_policy: DelayPolicy) -> Graph {
    let config = BuildConfig {
        delay_policy,
        ..BuildConfig::default()
    };
    let index = build(&transit, &config);
    Graph::new(transit, index)
}

/// Epoch seconds of `hh:mm:ss` on the default reference day.
pub fn reference_time(time: &str) -> i64 {
    let day = tresse::ServiceDay::new(BuildConfig::default().reference_date);
    day.time(tresse::time::parse_day_time(time).expect("invalid time literal"))
}

/// Flattens every arc of the index into a canonical, label-based
/// description, so indices built through different chunkings can be
/// compared as sets.
pub fn normalized_arcs(graph: &Graph) -> std::collections::BTreeSet<String> {
    let mut arcs = std::collections::BTreeSet::new();
    for pattern in graph.tp.transfer_patterns() {
        let source = graph.transit.stop_label(pattern.source);
        for dag in &pattern.targets {
            let target = graph.transit.stop_label(dag.target);
            for node in &dag.nodes {
                let node_label = graph.transit.stop_label(node.stop);
                for arc in &node.predecessors {
                    let predecessor = graph.transit.stop_label(dag.nodes[arc.node].stop);
                    let scenario = match arc.scenario {
                        Some(id) => pattern.scenarios[id]
                            .entries
                            .iter()
                            .map(|&(scenario_pattern, delay)| {
                                format!("{}<{}>", graph.transit.pattern_code(scenario_pattern), delay)
                            })
                            .collect::<Vec<_>>()
                            .join("+"),
                        None => String::from("static"),
                    };
                    arcs.insert(format!(
                        "{}->{} : {} <- {} walking={} scenario={}",
                        source, target, node_label, predecessor, arc.walking, scenario
                    ));
                }
            }
        }
    }
    arcs
}
