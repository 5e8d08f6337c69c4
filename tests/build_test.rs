mod utils;

use tresse::builder::{build, BuildConfig};
use tresse::cleaner;
use tresse::graph::{chunk_filename, Graph};
use tresse::merge::{merge_chunks, merge_into, MergeError};
use tresse::transfer_pattern::TargetDag;
use tresse::transit_data::TransitData;
use tresse::{DelayPolicy, Stop};
use utils::{build_graph, normalized_arcs, TimetableBuilder};

fn stop(transit: &TransitData, label: &str) -> Stop {
    transit
        .stop_by_label(label)
        .unwrap_or_else(|| panic!("no stop {}", label))
}

/// (predecessor label, node label, walking, is dynamic) of every arc of one DAG.
fn dag_arcs(transit: &TransitData, dag: &TargetDag) -> Vec<(String, String, bool, bool)> {
    let mut arcs = Vec::new();
    for node in &dag.nodes {
        for arc in &node.predecessors {
            arcs.push((
                transit.stop_label(dag.nodes[arc.node].stop).to_string(),
                transit.stop_label(node.stop).to_string(),
                arc.walking,
                arc.scenario.is_some(),
            ));
        }
    }
    arcs.sort();
    arcs
}

#[test]
fn linear_line_without_transfers() {
    let _guard = tresse::logger::init_test_logger();

    let transit = TimetableBuilder::default()
        .pattern("P1", |p| {
            p.st("A", "08:00:00").st("B", "08:10:00").st("C", "08:20:00");
        })
        .build();
    let graph = build_graph(transit, DelayPolicy::Simple);

    let a = stop(&graph.transit, "A");
    let c = stop(&graph.transit, "C");

    let dag = graph.tp.transfer_pattern(a, c).expect("no pattern A -> C");
    assert_eq!(
        dag_arcs(&graph.transit, dag),
        vec![("A".into(), "C".into(), false, false)]
    );

    // every predecessor chain ends at the source
    let root = &dag.nodes[dag.sink().predecessors[0].node];
    assert!(root.predecessors.is_empty());
    assert_eq!(graph.transit.stop_label(root.stop), "A");
}

#[test]
fn single_transfer_builds_a_two_arc_chain() {
    let _guard = tresse::logger::init_test_logger();

    let transit = TimetableBuilder::default()
        .pattern("P1", |p| {
            p.st("A", "08:00:00").st("B", "08:10:00");
        })
        .pattern("P2", |p| {
            p.st("B", "08:15:00").st("C", "08:30:00");
        })
        .build();
    let graph = build_graph(transit, DelayPolicy::Simple);

    let a = stop(&graph.transit, "A");
    let c = stop(&graph.transit, "C");

    let dag = graph.tp.transfer_pattern(a, c).expect("no pattern A -> C");
    assert_eq!(
        dag_arcs(&graph.transit, dag),
        vec![
            ("A".into(), "B".into(), false, false),
            ("B".into(), "C".into(), false, false),
        ]
    );

    // the 5 minute transfer wait at B was recorded against P1, plus the
    // second that makes the connection missed
    let transfer_pattern = graph.tp.pattern_for_source(a).unwrap();
    let p1 = graph.transit.pattern_by_code("P1").unwrap();
    assert_eq!(transfer_pattern.scenarios.len(), 1);
    assert_eq!(transfer_pattern.scenarios[0].entries, vec![(p1, 301)]);
}

#[test]
fn walking_interchange_appears_as_a_walking_arc() {
    let _guard = tresse::logger::init_test_logger();

    let transit = TimetableBuilder::default()
        .pattern("P1", |p| {
            p.st("A", "08:00:00").st("B", "08:10:00");
        })
        .pattern("P2", |p| {
            p.st("Bp", "08:15:00").st("C", "08:30:00");
        })
        .footpath("B", "Bp", 120, 100.0)
        .build();
    let graph = build_graph(transit, DelayPolicy::None);

    let a = stop(&graph.transit, "A");
    let c = stop(&graph.transit, "C");

    let dag = graph.tp.transfer_pattern(a, c).expect("no pattern A -> C");
    assert_eq!(
        dag_arcs(&graph.transit, dag),
        vec![
            ("A".into(), "B".into(), false, false),
            ("B".into(), "Bp".into(), true, false),
            ("Bp".into(), "C".into(), false, false),
        ]
    );
}

#[test]
fn dynamic_arcs_carry_their_scenario() {
    let _guard = tresse::logger::init_test_logger();

    // the alternative via D is slower on schedule, but becomes optimal
    // once P1 is delayed enough to miss P2 at B
    let transit = TimetableBuilder::default()
        .pattern("P1", |p| {
            p.st("A", "08:00:00").st("B", "08:10:00");
        })
        .pattern("P2", |p| {
            p.st("B", "08:15:00").st("C", "08:30:00");
        })
        .pattern("PA", |p| {
            p.st("A", "08:05:00").st("D", "08:20:00");
        })
        .pattern("PB", |p| {
            p.st("D", "08:25:00").st("C", "08:45:00");
        })
        .build();
    let graph = build_graph(transit, DelayPolicy::Simple);

    let a = stop(&graph.transit, "A");
    let c = stop(&graph.transit, "C");

    let dag = graph.tp.transfer_pattern(a, c).expect("no pattern A -> C");
    let arcs = dag_arcs(&graph.transit, dag);

    // static chain via B
    assert!(arcs.contains(&("A".into(), "B".into(), false, false)));
    assert!(arcs.contains(&("B".into(), "C".into(), false, false)));
    // dynamic chain via D, tagged with the scenario
    assert!(arcs.contains(&("A".into(), "D".into(), false, true)));
    assert!(arcs.contains(&("D".into(), "C".into(), false, true)));
    // the alternative never appears as a static arc
    assert!(!arcs.contains(&("A".into(), "D".into(), false, false)));
    assert!(!arcs.contains(&("D".into(), "C".into(), false, false)));
}

#[test]
fn stop_without_transit_has_no_targets() {
    let _guard = tresse::logger::init_test_logger();

    let transit = TimetableBuilder::default()
        .stop("Z", 3.0, 46.0)
        .pattern("P1", |p| {
            p.st("A", "08:00:00").st("B", "08:10:00");
        })
        .build();
    let graph = build_graph(transit, DelayPolicy::Simple);

    let z = stop(&graph.transit, "Z");
    let transfer_pattern = graph.tp.pattern_for_source(z).expect("no pattern for Z");
    assert!(transfer_pattern.targets.is_empty());

    // and Z is no target of anybody either
    let a = stop(&graph.transit, "A");
    assert!(graph.tp.transfer_pattern(a, z).is_none());
}

#[test]
fn cleaning_a_built_index_changes_nothing() {
    let _guard = tresse::logger::init_test_logger();

    let transit = TimetableBuilder::default()
        .pattern("P1", |p| {
            p.st("A", "08:00:00").st("B", "08:10:00").st("C", "08:20:00");
        })
        .pattern("P2", |p| {
            p.st("C", "08:30:00").st("B", "08:40:00").st("D", "08:50:00");
        })
        .footpath("B", "C", 120, 100.0)
        .build();
    let mut graph = build_graph(transit, DelayPolicy::Simple);

    let before = normalized_arcs(&graph);
    assert_eq!(cleaner::clean(&mut graph.tp), 0);
    assert_eq!(normalized_arcs(&graph), before);
}

fn ten_stop_transit() -> TransitData {
    TimetableBuilder::default()
        .pattern("L1", |p| {
            p.st("A", "08:00:00")
                .st("B", "08:10:00")
                .st("C", "08:20:00")
                .st("D", "08:30:00")
                .st("E", "08:40:00")
                .extra_trip(&["09:00:00", "09:10:00", "09:20:00", "09:30:00", "09:40:00"]);
        })
        .pattern("L2", |p| {
            p.st("F", "08:05:00")
                .st("C", "08:25:00")
                .st("G", "08:35:00")
                .st("H", "08:45:00");
        })
        .pattern("L3", |p| {
            p.st("I", "08:50:00").st("J", "09:05:00");
        })
        .footpath("H", "I", 180, 200.0)
        .build()
}

#[test]
fn chunked_build_and_merge_equals_single_build() {
    let _guard = tresse::logger::init_test_logger();

    let transit = ten_stop_transit();
    let single = build_graph(transit.clone(), DelayPolicy::Simple);

    let nb_of_chunks = 5;
    let dir = tempfile::tempdir().expect("no temp dir");
    for chunk in 1..=nb_of_chunks {
        let config = BuildConfig {
            chunk,
            nb_of_chunks,
            delay_policy: DelayPolicy::Simple,
            ..BuildConfig::default()
        };
        let index = build(&transit, &config);
        let path = dir.path().join(chunk_filename(chunk, nb_of_chunks));
        Graph::new(transit.clone(), index)
            .save(&path)
            .expect("could not save chunk");
    }

    let merged = merge_chunks(dir.path(), nb_of_chunks).expect("merge failed");

    assert_eq!(normalized_arcs(&merged), normalized_arcs(&single));
    assert_eq!(merged.tp.nb_of_sources(), single.tp.nb_of_sources());
    // only chunk 1 built the direct connections, and they survived the merge
    assert!(!merged.tp.direct_connections.is_empty());
}

#[test]
fn merged_index_serializes_and_reloads_identically() {
    let _guard = tresse::logger::init_test_logger();

    let graph = build_graph(ten_stop_transit(), DelayPolicy::Simple);

    let dir = tempfile::tempdir().expect("no temp dir");
    let path = dir.path().join("graph.json");
    graph.save(&path).expect("could not save");
    let reloaded = Graph::load(&path).expect("could not load");

    assert_eq!(normalized_arcs(&reloaded), normalized_arcs(&graph));
    let a = stop(&reloaded.transit, "A");
    let c = stop(&reloaded.transit, "C");
    assert_eq!(
        reloaded.tp.direct_connections(a, c).len(),
        graph.tp.direct_connections(a, c).len()
    );
}

#[test]
fn merging_a_chunk_with_unknown_identities_is_fatal() {
    let _guard = tresse::logger::init_test_logger();

    let accumulator_transit = TimetableBuilder::default()
        .pattern("P1", |p| {
            p.st("A", "08:00:00").st("B", "08:10:00");
        })
        .build();
    let mut accumulator = build_graph(accumulator_transit, DelayPolicy::None);

    // same stops, but a pattern code the accumulator has never seen
    let foreign_pattern = TimetableBuilder::default()
        .pattern("P9", |p| {
            p.st("A", "08:00:00").st("B", "08:10:00");
        })
        .build();
    let incoming = build_graph(foreign_pattern, DelayPolicy::None);
    assert_eq!(
        merge_into(&mut accumulator, incoming),
        Err(MergeError::UnknownTripPattern("P9".to_string()))
    );

    // same pattern code, but a stop label the accumulator has never seen
    let foreign_stop = TimetableBuilder::default()
        .pattern("P1", |p| {
            p.st("A", "08:00:00").st("X", "08:10:00");
        })
        .build();
    let incoming = build_graph(foreign_stop, DelayPolicy::None);
    assert_eq!(
        merge_into(&mut accumulator, incoming),
        Err(MergeError::UnknownStop("X".to_string()))
    );
}
