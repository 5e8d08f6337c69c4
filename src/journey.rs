use crate::geometry::Coord;
use crate::street::WalkingPath;
use crate::time::{SecondsSinceDayStart, ServiceDay};
use crate::transfer_pattern::{DelayScenario, TargetDag, TpNodeId, TransferPattern};
use crate::transit_data::{Stop, TransitData, TripPattern};

/// An endpoint of a journey leg : either a transit stop or a requested
/// street location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JourneyVertex {
    Stop(Stop),
    Place(Coord),
}

impl JourneyVertex {
    pub fn coord(&self, transit: &TransitData) -> Coord {
        match self {
            JourneyVertex::Stop(stop) => transit.stop_data(*stop).coord,
            JourneyVertex::Place(coord) => *coord,
        }
    }
}

/// A concrete ride : trip, boarding and alighting positions, resolved
/// times.
#[derive(Debug, Clone)]
pub struct TransitConnection {
    pub pattern: TripPattern,
    pub trip: usize,
    pub from_pos: usize,
    pub to_pos: usize,
    pub departure: SecondsSinceDayStart,
    pub arrival: SecondsSinceDayStart,
    pub day: ServiceDay,
}

impl TransitConnection {
    pub fn departure_epoch(&self) -> i64 {
        self.day.time(self.departure)
    }

    pub fn arrival_epoch(&self) -> i64 {
        self.day.time(self.arrival)
    }
}

/// One leg of a journey, either walking or transit. Materialization fills
/// in the concrete connection.
#[derive(Debug, Clone)]
pub struct TpLeg {
    pub from: JourneyVertex,
    pub to: JourneyVertex,
    pub walking: bool,
    /// The delay scenario this leg was discovered under, if any. Such a
    /// leg is only feasible when the scenario is realized.
    pub scenario: Option<DelayScenario>,
    pub transit: Option<TransitConnection>,
    pub walk: Option<WalkingPath>,
}

impl TpLeg {
    pub fn departure_epoch(&self) -> Option<i64> {
        if let Some(walk) = &self.walk {
            return Some(walk.depart_epoch);
        }
        self.transit
            .as_ref()
            .map(TransitConnection::departure_epoch)
    }

    pub fn arrival_epoch(&self) -> Option<i64> {
        if let Some(walk) = &self.walk {
            return Some(walk.end_epoch());
        }
        self.transit.as_ref().map(TransitConnection::arrival_epoch)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TpJourney {
    pub legs: Vec<TpLeg>,
}

impl TpJourney {
    pub fn has_legs(&self) -> bool {
        !self.legs.is_empty()
    }

    pub fn departure_epoch(&self) -> Option<i64> {
        self.legs.first().and_then(TpLeg::departure_epoch)
    }

    pub fn arrival_epoch(&self) -> Option<i64> {
        self.legs.last().and_then(TpLeg::arrival_epoch)
    }

    pub fn duration_seconds(&self) -> Option<i64> {
        Some(self.arrival_epoch()? - self.departure_epoch()?)
    }

    pub fn nb_of_transfers(&self) -> usize {
        self.legs
            .iter()
            .filter(|leg| !leg.walking)
            .count()
            .saturating_sub(1)
    }
}

/// Expands the predecessor DAG of one target into candidate leg sequences.
/// One journey is emitted per source-to-target path; legs carry no times
/// yet.
pub fn unfold_transfer_pattern(
    transfer_pattern: &TransferPattern,
    dag: &TargetDag,
) -> Vec<TpJourney> {
    let mut journeys = Vec::new();
    let mut suffix = Vec::new();
    unfold_node(
        dag,
        &transfer_pattern.scenarios,
        TargetDag::SINK,
        &mut suffix,
        &mut journeys,
    );
    journeys
}

fn unfold_node(
    dag: &TargetDag,
    scenarios: &[DelayScenario],
    node_id: TpNodeId,
    suffix: &mut Vec<TpLeg>,
    journeys: &mut Vec<TpJourney>,
) {
    let node = &dag.nodes[node_id];
    if node.predecessors.is_empty() {
        // reached the source root; suffix holds the legs from target
        // backwards
        journeys.push(TpJourney {
            legs: suffix.iter().rev().cloned().collect(),
        });
        return;
    }
    for arc in &node.predecessors {
        let leg = TpLeg {
            from: JourneyVertex::Stop(dag.nodes[arc.node].stop),
            to: JourneyVertex::Stop(node.stop),
            walking: arc.walking,
            scenario: arc.scenario.map(|id| scenarios[id].clone()),
            transit: None,
            walk: None,
        };
        suffix.push(leg);
        unfold_node(dag, scenarios, arc.node, suffix, journeys);
        suffix.pop();
    }
}

/// Pareto comparison over (departure, arrival, leg count). Returns 1 when
/// `a` dominates `b` (at least as good everywhere, better somewhere), -1
/// for the converse, 0 when incomparable.
pub fn pareto_compare(a: &TpJourney, b: &TpJourney) -> i32 {
    if !a.has_legs() {
        return if b.has_legs() { -1 } else { 0 };
    }
    if !b.has_legs() {
        return 1;
    }

    // later departure, earlier arrival, fewer legs are better
    let value_arr = cut(b.arrival_epoch().unwrap_or(0) - a.arrival_epoch().unwrap_or(0));
    let value_dep = cut(a.departure_epoch().unwrap_or(0) - b.departure_epoch().unwrap_or(0));
    let value_legs = cut(b.legs.len() as i64 - a.legs.len() as i64);

    let values = [value_arr, value_dep, value_legs];
    let sum: i32 = values.iter().sum();
    if sum > 0 && !values.contains(&-1) {
        1
    } else if sum < 0 && !values.contains(&1) {
        -1
    } else {
        0
    }
}

fn cut(difference: i64) -> i32 {
    match difference {
        d if d > 0 => 1,
        d if d < 0 => -1,
        _ => 0,
    }
}

/// Reduces `journeys` to its Pareto set.
pub fn pareto_filter(journeys: Vec<TpJourney>) -> Vec<TpJourney> {
    let mut pareto_set: Vec<TpJourney> = Vec::new();
    for candidate in journeys {
        let mut keep = true;
        pareto_set.retain(|kept| match pareto_compare(&candidate, kept) {
            comparison if comparison > 0 => false,
            comparison if comparison < 0 => {
                keep = false;
                true
            }
            _ => true,
        });
        if keep {
            pareto_set.push(candidate);
        }
    }
    pareto_set
}

/// Display order : arrival time ascending, then total duration ascending.
pub fn sort_for_display(journeys: &mut [TpJourney]) {
    journeys.sort_by_key(|journey| {
        (
            journey.arrival_epoch().unwrap_or(i64::MAX),
            journey.duration_seconds().unwrap_or(i64::MAX),
        )
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::PositiveDuration;

    fn journey(departure: i64, arrival: i64, nb_of_legs: usize) -> TpJourney {
        let legs = (0..nb_of_legs)
            .map(|rank| {
                let leg_departure = if rank == 0 { departure } else { arrival };
                let duration = if rank + 1 == nb_of_legs {
                    (arrival - leg_departure).max(0) as u32
                } else {
                    0
                };
                TpLeg {
                    from: JourneyVertex::Place(Coord { lon: 0.0, lat: 0.0 }),
                    to: JourneyVertex::Place(Coord { lon: 0.0, lat: 0.0 }),
                    walking: true,
                    scenario: None,
                    transit: None,
                    walk: Some(WalkingPath {
                        depart_epoch: leg_departure,
                        duration: PositiveDuration::from_seconds(duration),
                        distance_meters: 0.0,
                    }),
                }
            })
            .collect();
        TpJourney { legs }
    }

    #[test]
    fn dominated_journeys_are_filtered_out() {
        let hour = 3600;
        // (08:00, 09:00, 2 legs), (08:05, 09:00, 1 leg), (07:55, 09:05, 2 legs)
        let journeys = vec![
            journey(8 * hour, 9 * hour, 2),
            journey(8 * hour + 300, 9 * hour, 1),
            journey(8 * hour - 300, 9 * hour + 300, 2),
        ];
        let filtered = pareto_filter(journeys);
        // the second candidate departs later with the same arrival and
        // fewer legs, so it dominates both others
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].departure_epoch(), Some(8 * hour + 300));
    }

    #[test]
    fn incomparable_journeys_all_survive() {
        let hour = 3600;
        let journeys = vec![
            // earlier arrival, more legs
            journey(8 * hour, 9 * hour, 2),
            // later arrival, fewer legs
            journey(8 * hour, 9 * hour + 600, 1),
        ];
        let filtered = pareto_filter(journeys);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn display_order_is_by_arrival_then_duration() {
        let hour = 3600;
        let mut journeys = vec![
            journey(8 * hour, 10 * hour, 1),
            journey(9 * hour, 10 * hour, 1),
            journey(8 * hour, 9 * hour, 1),
        ];
        sort_for_display(&mut journeys);
        assert_eq!(journeys[0].arrival_epoch(), Some(9 * hour));
        // same arrival : shorter journey first
        assert_eq!(journeys[1].departure_epoch(), Some(9 * hour));
        assert_eq!(journeys[2].departure_epoch(), Some(8 * hour));
    }
}
