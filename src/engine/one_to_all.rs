use crate::engine::pareto_front::{Dominance, ParetoFront};
use crate::time::ServiceDay;
use crate::transit_data::{Stop, TimetableView, TripPattern};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Transfer bound of the construction searches.
pub const MAX_TRANSFERS: u8 = 2;
pub const MAX_BOARDINGS: u8 = MAX_TRANSFERS + 1;

/// Hard cap on the total walking distance of one chain.
pub const MAX_WALK_DISTANCE_METERS: f64 = 500.0;

/// A vertex of the implicit search graph.
///
/// `StopDepart` is the boarding boundary : the state there still carries the
/// arrival time at the stop, while its `Ride` successor carries the actual
/// trip departure, so the transfer wait is the time delta across it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchVertex {
    Stop(Stop),
    StopDepart(Stop),
    OnTrip {
        pattern: TripPattern,
        trip: usize,
        pos: usize,
    },
}

/// How a state was reached from its back state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackLink {
    Root,
    Walk,
    LegSwitch,
    Ride,
}

#[derive(Debug, Clone, Copy)]
pub struct State {
    pub vertex: SearchVertex,
    /// Epoch seconds.
    pub time: i64,
    pub boardings: u8,
    pub walked_meters: f64,
    /// Pattern of the most recently completed transit leg.
    pub last_pattern: Option<TripPattern>,
    pub back: Option<usize>,
    pub link: BackLink,
}

/// Arena of search states; chains walk `back` indices toward the root.
#[derive(Debug, Default)]
pub struct StateTree {
    states: Vec<State>,
}

impl StateTree {
    pub fn state(&self, idx: usize) -> &State {
        &self.states[idx]
    }

    pub fn nb_of_states(&self) -> usize {
        self.states.len()
    }

    /// The chain from `idx` back to the root, in backward order.
    pub fn chain(&self, idx: usize) -> ChainIter<'_> {
        ChainIter {
            tree: self,
            next: Some(idx),
        }
    }

    fn push(&mut self, state: State) -> usize {
        self.states.push(state);
        self.states.len() - 1
    }
}

pub struct ChainIter<'a> {
    tree: &'a StateTree,
    next: Option<usize>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a State;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let state = self.tree.state(idx);
        self.next = state.back;
        Some(state)
    }
}

/// The output of one search : per target stop, the Pareto-optimal settled
/// states over (arrival time, boardings), each walking back to the source.
pub struct SearchResult {
    pub tree: StateTree,
    states_by_target: Vec<Vec<usize>>,
}

impl SearchResult {
    pub fn states_for(&self, target: Stop) -> &[usize] {
        &self.states_by_target[target.idx]
    }

    pub fn nb_of_targets(&self) -> usize {
        self.states_by_target.len()
    }
}

#[derive(Debug, Clone, Copy)]
struct Label {
    time: i64,
    boardings: u8,
    walked_meters: f64,
}

impl Dominance for Label {
    fn dominates(&self, other: &Self) -> bool {
        self.time <= other.time
            && self.boardings <= other.boardings
            && self.walked_meters <= other.walked_meters
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum VertexKey {
    Stop(usize),
    StopDepart(usize),
    OnTrip(usize, usize, usize),
}

impl From<SearchVertex> for VertexKey {
    fn from(vertex: SearchVertex) -> Self {
        match vertex {
            SearchVertex::Stop(stop) => VertexKey::Stop(stop.idx),
            SearchVertex::StopDepart(stop) => VertexKey::StopDepart(stop.idx),
            SearchVertex::OnTrip { pattern, trip, pos } => {
                VertexKey::OnTrip(pattern.idx, trip, pos)
            }
        }
    }
}

/// Multi-target bounded-transfer earliest-arrival search from `source`.
///
/// Expands a label-correcting queue over the whole bounded state space, so
/// every stop of the network ends up with its full Pareto set of optimal
/// chains; this meets the multi-target termination contract without
/// tracking an explicit remaining-target set.
pub fn one_to_all(
    view: &TimetableView<'_>,
    source: Stop,
    depart_epoch: i64,
    day: &ServiceDay,
) -> SearchResult {
    let transit = view.transit;
    let mut tree = StateTree::default();
    let mut fronts: HashMap<VertexKey, ParetoFront<(), Label>> = HashMap::new();
    let mut queue: BinaryHeap<Reverse<(i64, u8, usize)>> = BinaryHeap::new();
    let mut stop_states: Vec<Vec<usize>> = vec![Vec::new(); transit.nb_of_stops()];

    let root = State {
        vertex: SearchVertex::Stop(source),
        time: depart_epoch,
        boardings: 0,
        walked_meters: 0.0,
        last_pattern: None,
        back: None,
        link: BackLink::Root,
    };
    enqueue(
        root,
        &mut tree,
        &mut fronts,
        &mut queue,
        &mut stop_states,
    );

    while let Some(Reverse((_, _, idx))) = queue.pop() {
        let state = *tree.state(idx);
        let label = label_of(&state);
        // a better label may have settled this vertex since the push
        if is_obsolete(&fronts, state.vertex, &label) {
            continue;
        }

        match state.vertex {
            SearchVertex::Stop(stop) => {
                // footpaths
                for footpath in &transit.stop_data(stop).footpaths {
                    let walked = state.walked_meters + footpath.distance_meters;
                    if walked > MAX_WALK_DISTANCE_METERS {
                        continue;
                    }
                    enqueue(
                        State {
                            vertex: SearchVertex::Stop(footpath.to),
                            time: state.time + footpath.duration.total_seconds() as i64,
                            boardings: state.boardings,
                            walked_meters: walked,
                            last_pattern: state.last_pattern,
                            back: Some(idx),
                            link: BackLink::Walk,
                        },
                        &mut tree,
                        &mut fronts,
                        &mut queue,
                        &mut stop_states,
                    );
                }
                // boarding boundary
                if state.boardings < MAX_BOARDINGS {
                    enqueue(
                        State {
                            vertex: SearchVertex::StopDepart(stop),
                            back: Some(idx),
                            link: BackLink::LegSwitch,
                            ..state
                        },
                        &mut tree,
                        &mut fronts,
                        &mut queue,
                        &mut stop_states,
                    );
                }
            }
            SearchVertex::StopDepart(stop) => {
                let earliest_depart = day.seconds_since_day_start(state.time);
                for &(pattern, pos) in &transit.stop_data(stop).stop_visits {
                    if pos + 1 >= transit.pattern_data(pattern).stops.len() {
                        continue;
                    }
                    if let Some((trip, departure)) = view.next_trip(pattern, pos, earliest_depart)
                    {
                        enqueue(
                            State {
                                vertex: SearchVertex::OnTrip { pattern, trip, pos },
                                time: day.time(departure),
                                boardings: state.boardings + 1,
                                walked_meters: state.walked_meters,
                                last_pattern: state.last_pattern,
                                back: Some(idx),
                                link: BackLink::Ride,
                            },
                            &mut tree,
                            &mut fronts,
                            &mut queue,
                            &mut stop_states,
                        );
                    }
                }
            }
            SearchVertex::OnTrip { pattern, trip, pos } => {
                let pattern_data = transit.pattern_data(pattern);
                let timetable = view.timetable_for(pattern);
                let boarded_here = state
                    .back
                    .map(|back| matches!(tree.state(back).vertex, SearchVertex::StopDepart(_)))
                    .unwrap_or(false);
                // alight, unless this is the boarding state itself
                if !boarded_here {
                    enqueue(
                        State {
                            vertex: SearchVertex::Stop(pattern_data.stops[pos]),
                            last_pattern: Some(pattern),
                            back: Some(idx),
                            link: BackLink::LegSwitch,
                            ..state
                        },
                        &mut tree,
                        &mut fronts,
                        &mut queue,
                        &mut stop_states,
                    );
                }
                // ride on
                if pos + 1 < pattern_data.stops.len() {
                    let arrival = timetable.trips[trip].arrivals[pos + 1];
                    enqueue(
                        State {
                            vertex: SearchVertex::OnTrip {
                                pattern,
                                trip,
                                pos: pos + 1,
                            },
                            time: day.time(arrival),
                            back: Some(idx),
                            link: BackLink::Ride,
                            ..state
                        },
                        &mut tree,
                        &mut fronts,
                        &mut queue,
                        &mut stop_states,
                    );
                }
            }
        }
    }

    let states_by_target = stop_states
        .into_iter()
        .map(|candidates| final_front(&tree, candidates))
        .collect();

    SearchResult {
        tree,
        states_by_target,
    }
}

fn label_of(state: &State) -> Label {
    Label {
        time: state.time,
        boardings: state.boardings,
        walked_meters: state.walked_meters,
    }
}

fn is_obsolete(
    fronts: &HashMap<VertexKey, ParetoFront<(), Label>>,
    vertex: SearchVertex,
    label: &Label,
) -> bool {
    match fronts.get(&VertexKey::from(vertex)) {
        Some(front) => !front
            .iter()
            .any(|(_, kept)| kept.time == label.time && kept.boardings == label.boardings),
        None => true,
    }
}

fn enqueue(
    state: State,
    tree: &mut StateTree,
    fronts: &mut HashMap<VertexKey, ParetoFront<(), Label>>,
    queue: &mut BinaryHeap<Reverse<(i64, u8, usize)>>,
    stop_states: &mut [Vec<usize>],
) {
    let label = label_of(&state);
    let front = fronts.entry(VertexKey::from(state.vertex)).or_default();
    if !front.add((), label) {
        return;
    }
    let idx = tree.push(state);
    if let SearchVertex::Stop(stop) = state.vertex {
        stop_states[stop.idx].push(idx);
    }
    queue.push(Reverse((state.time, state.boardings, idx)));
}

/// Reduces the recorded candidates of one stop to the Pareto set over
/// (arrival time, boardings).
fn final_front(tree: &StateTree, candidates: Vec<usize>) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::new();
    for idx in candidates {
        let state = tree.state(idx);
        let dominated = kept.iter().any(|&other| {
            let kept_state = tree.state(other);
            kept_state.time <= state.time && kept_state.boardings <= state.boardings
        });
        if dominated {
            continue;
        }
        kept.retain(|&other| {
            let kept_state = tree.state(other);
            !(state.time <= kept_state.time && state.boardings <= kept_state.boardings)
        });
        kept.push(idx);
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coord;
    use crate::time::{parse_day_time, PositiveDuration};
    use crate::transit_data::{Timetable, TransitData, TransitMode, TripTimes};
    use chrono::NaiveDate;

    fn secs(time: &str) -> i32 {
        parse_day_time(time).unwrap()
    }

    #[test]
    fn chains_alternate_rides_and_walks() {
        let mut transit = TransitData::new();
        let a = transit.add_stop("A", Coord { lon: 0.0, lat: 0.0 });
        let b = transit.add_stop("B", Coord { lon: 0.01, lat: 0.0 });
        let bp = transit.add_stop("Bp", Coord { lon: 0.011, lat: 0.0 });
        let c = transit.add_stop("C", Coord { lon: 0.02, lat: 0.0 });
        transit.add_pattern(
            "P1",
            TransitMode::Bus,
            vec![a, b],
            Timetable {
                trips: vec![TripTimes {
                    arrivals: vec![secs("08:00:00"), secs("08:10:00")],
                    departures: vec![secs("08:00:00"), secs("08:10:00")],
                }],
            },
        );
        transit.add_pattern(
            "P2",
            TransitMode::Bus,
            vec![bp, c],
            Timetable {
                trips: vec![TripTimes {
                    arrivals: vec![secs("08:15:00"), secs("08:30:00")],
                    departures: vec![secs("08:15:00"), secs("08:30:00")],
                }],
            },
        );
        transit.add_footpath(b, bp, PositiveDuration::from_seconds(120), 100.0);

        let day = ServiceDay::new(NaiveDate::from_ymd(2020, 1, 6));
        let view = TimetableView::scheduled(&transit);
        let result = one_to_all(&view, a, day.time(secs("08:00:00")), &day);

        let at_c = result.states_for(c);
        assert_eq!(at_c.len(), 1);
        let arrival = result.tree.state(at_c[0]);
        assert_eq!(arrival.time, day.time(secs("08:30:00")));
        assert_eq!(arrival.boardings, 2);

        // the chain visits C, Bp, B and A at its stop-visiting states
        let visited: Vec<Stop> = result
            .tree
            .chain(at_c[0])
            .filter(|state| {
                matches!(state.vertex, SearchVertex::Stop(_))
                    && (state.back.is_none()
                        || state.link == BackLink::Walk
                        || state.link == BackLink::LegSwitch)
            })
            .map(|state| match state.vertex {
                SearchVertex::Stop(stop) => stop,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(visited, vec![c, bp, b, a]);

        // the walk segment is observable on the chain
        assert!(result
            .tree
            .chain(at_c[0])
            .any(|state| state.link == BackLink::Walk));
    }

    #[test]
    fn walking_distance_is_capped() {
        let mut transit = TransitData::new();
        let a = transit.add_stop("A", Coord { lon: 0.0, lat: 0.0 });
        let b = transit.add_stop("B", Coord { lon: 0.01, lat: 0.0 });
        // a footpath longer than the walking budget
        transit.add_footpath(a, b, PositiveDuration::from_seconds(600), 800.0);

        let day = ServiceDay::new(NaiveDate::from_ymd(2020, 1, 6));
        let view = TimetableView::scheduled(&transit);
        let result = one_to_all(&view, a, day.time(secs("08:00:00")), &day);

        assert!(result.states_for(b).is_empty());
    }
}
