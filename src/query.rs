use crate::geometry::{bounding_box, distance_coord_to_coord, within_box, Coord};
use crate::graph::Graph;
use crate::journey::{
    pareto_filter, sort_for_display, unfold_transfer_pattern, JourneyVertex, TpJourney, TpLeg,
    TransitConnection,
};
use crate::realtime::DelaySnapshot;
use crate::street::{StreetRouter, WalkingPath};
use crate::time::{PositiveDuration, SecondsSinceDayStart, ServiceDay};
use crate::transit_data::{Stop, TimetableView};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Radius of the first nearby-stop lookup, for stops in immediate
/// proximity of the requested point.
const IMMEDIATE_PROXIMITY_RADIUS: f64 = 30.0;

/// Walking paths are computed once at a canonical time of day and
/// re-anchored afterwards.
const WALK_CACHE_TIME: SecondsSinceDayStart = 12 * 60 * 60;

#[derive(Debug, Clone)]
pub enum Place {
    Stop(String),
    Coord(Coord),
}

#[derive(Debug, Clone)]
pub struct JourneyRequest {
    pub from: Place,
    pub to: Place,
    /// Epoch seconds of the requested departure.
    pub datetime: i64,
    pub max_walk_distance: f64,
}

#[derive(Debug)]
pub enum BadJourneyRequest {
    /// A requested endpoint resolves to no known location.
    VertexNotFound(String),
    /// No origin or destination stop within the walking radius.
    PathNotFound,
    /// The query exceeded its deadline; no partial results are returned.
    SearchTimedOut,
}

impl Display for BadJourneyRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BadJourneyRequest::VertexNotFound(place) => {
                write!(f, "No location found for {}", place)
            }
            BadJourneyRequest::PathNotFound => {
                write!(f, "No transit stop reachable from the requested endpoints")
            }
            BadJourneyRequest::SearchTimedOut => write!(f, "The query timed out"),
        }
    }
}

impl std::error::Error for BadJourneyRequest {}

enum MaterializeError {
    LegInfeasible,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum WalkCacheKey {
    Stop(usize),
    Place(u64, u64),
}

impl WalkCacheKey {
    fn of(vertex: &JourneyVertex) -> Self {
        match vertex {
            JourneyVertex::Stop(stop) => WalkCacheKey::Stop(stop.idx),
            JourneyVertex::Place(coord) => {
                WalkCacheKey::Place(coord.lon.to_bits(), coord.lat.to_bits())
            }
        }
    }
}

type WalkCache = HashMap<(WalkCacheKey, WalkCacheKey), Option<(PositiveDuration, f64)>>;

/// Answers journey requests from a transfer-pattern index, the live
/// timetable and a street router.
pub struct TransferPatternRouter<'a> {
    graph: &'a Graph,
    street: &'a dyn StreetRouter,
    overlay: Option<&'a DelaySnapshot>,
    timeout: Option<Duration>,
}

impl<'a> TransferPatternRouter<'a> {
    pub fn new(graph: &'a Graph, street: &'a dyn StreetRouter) -> Self {
        Self {
            graph,
            street,
            overlay: None,
            timeout: None,
        }
    }

    /// Uses the given realtime overlay, read-only, for trip resolution and
    /// delay-scenario applicability.
    pub fn with_overlay(mut self, overlay: &'a DelaySnapshot) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn find_journeys(
        &self,
        request: &JourneyRequest,
    ) -> Result<Vec<TpJourney>, BadJourneyRequest> {
        let transit = &self.graph.transit;
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);

        let (request_start, source_stops) = self.resolve_endpoint(&request.from, request)?;
        let (request_end, target_stops) = self.resolve_endpoint(&request.to, request)?;
        if source_stops.is_empty() || target_stops.is_empty() {
            return Err(BadJourneyRequest::PathNotFound);
        }

        let day = ServiceDay::of_epoch(request.datetime);
        let start_secs = day.seconds_since_day_start(request.datetime);
        let start_coord = request_start.coord(transit);
        let end_coord = request_end.coord(transit);

        // owned by this request, discarded with it
        let mut walk_cache: WalkCache = HashMap::new();
        let mut journeys: Vec<TpJourney> = Vec::new();

        for &source in &source_stops {
            for &target in &target_stops {
                let start_walk =
                    distance_coord_to_coord(&start_coord, &transit.stop_data(source).coord);
                let end_walk =
                    distance_coord_to_coord(&transit.stop_data(target).coord, &end_coord);
                // the endpoint walks alone already break the walking budget
                if start_walk + end_walk > request.max_walk_distance {
                    continue;
                }

                let transfer_pattern = match self.graph.tp.pattern_for_source(source) {
                    Some(transfer_pattern) => transfer_pattern,
                    None => continue,
                };
                let dag = match transfer_pattern.target_dag(target) {
                    Some(dag) => dag,
                    None => continue,
                };

                let mut candidates = unfold_transfer_pattern(transfer_pattern, dag);
                trace!(
                    "{} candidate journeys between {} and {}",
                    candidates.len(),
                    transit.stop_label(source),
                    transit.stop_label(target),
                );
                attach_walking_ends(&mut candidates, request_start, request_end);

                for mut journey in candidates.drain(..) {
                    match self.materialize(&mut journey, &day, start_secs, deadline, &mut walk_cache)
                    {
                        Ok(()) => journeys.push(journey),
                        Err(MaterializeError::LegInfeasible) => {}
                        Err(MaterializeError::Cancelled) => {
                            return Err(BadJourneyRequest::SearchTimedOut)
                        }
                    }
                }
            }
        }

        let mut result = pareto_filter(journeys);
        sort_for_display(&mut result);
        debug!("{} journeys after filtering", result.len());
        Ok(result)
    }

    fn resolve_endpoint(
        &self,
        place: &Place,
        request: &JourneyRequest,
    ) -> Result<(JourneyVertex, Vec<Stop>), BadJourneyRequest> {
        let transit = &self.graph.transit;
        match place {
            Place::Stop(label) => {
                let stop = transit
                    .stop_by_label(label)
                    .ok_or_else(|| BadJourneyRequest::VertexNotFound(label.clone()))?;
                Ok((JourneyVertex::Stop(stop), vec![stop]))
            }
            Place::Coord(coord) => {
                let stops = self.nearby_stops(coord, request.max_walk_distance);
                Ok((JourneyVertex::Place(*coord), stops))
            }
        }
    }

    /// Transit stops around `coord` : first within immediate proximity,
    /// then within the requested radius, then within one and a half of it.
    fn nearby_stops(&self, coord: &Coord, max_walk_distance: f64) -> Vec<Stop> {
        let transit = &self.graph.transit;
        let radiuses = [
            IMMEDIATE_PROXIMITY_RADIUS,
            max_walk_distance,
            max_walk_distance * 1.5,
        ];
        for radius in radiuses {
            let bbox = bounding_box(*coord, radius);
            let stops: Vec<Stop> = transit
                .stops()
                .filter(|stop| {
                    let stop_coord = &transit.stop_data(*stop).coord;
                    within_box(&bbox, stop_coord)
                        && distance_coord_to_coord(coord, stop_coord) < radius
                })
                .collect();
            if !stops.is_empty() {
                return stops;
            }
        }
        Vec::new()
    }

    /// Fills concrete departures and walking paths into `journey`,
    /// advancing the clock leg by leg. Any failure drops only this
    /// journey.
    fn materialize(
        &self,
        journey: &mut TpJourney,
        day: &ServiceDay,
        start_secs: SecondsSinceDayStart,
        deadline: Option<Instant>,
        walk_cache: &mut WalkCache,
    ) -> Result<(), MaterializeError> {
        let transit = &self.graph.transit;
        let view = TimetableView {
            transit,
            overlay: self.overlay,
        };
        let mut current_secs = start_secs;

        for leg in journey.legs.iter_mut() {
            if let Some(deadline) = deadline {
                if Instant::now() > deadline {
                    return Err(MaterializeError::Cancelled);
                }
            }

            if leg.walking {
                let walk = self
                    .cached_walk(&leg.from, &leg.to, day, walk_cache)
                    .ok_or(MaterializeError::LegInfeasible)?;
                let (duration, distance_meters) = walk;
                leg.walk = Some(WalkingPath {
                    depart_epoch: day.time(current_secs),
                    duration,
                    distance_meters,
                });
                current_secs += duration.total_seconds() as i32;
            } else {
                let (from, to) = match (&leg.from, &leg.to) {
                    (JourneyVertex::Stop(from), JourneyVertex::Stop(to)) => (*from, *to),
                    // transit legs always connect stops
                    _ => return Err(MaterializeError::LegInfeasible),
                };

                if let Some(scenario) = &leg.scenario {
                    if !scenario.is_applicable(transit, self.overlay) {
                        return Err(MaterializeError::LegInfeasible);
                    }
                }

                let mut best: Option<TransitConnection> = None;
                for connection in self.graph.tp.direct_connections(from, to) {
                    let (trip, departure) =
                        match view.next_trip(connection.pattern, connection.from_pos, current_secs)
                        {
                            Some(next) => next,
                            None => continue,
                        };
                    let arrival =
                        view.timetable_for(connection.pattern).trips[trip].arrivals
                            [connection.to_pos];
                    let better = match &best {
                        Some(best) => departure < best.departure,
                        None => true,
                    };
                    if better {
                        best = Some(TransitConnection {
                            pattern: connection.pattern,
                            trip,
                            from_pos: connection.from_pos,
                            to_pos: connection.to_pos,
                            departure,
                            arrival,
                            day: *day,
                        });
                    }
                }

                let best = best.ok_or(MaterializeError::LegInfeasible)?;
                let mode = transit.pattern_data(best.pattern).mode;
                current_secs = best.arrival + mode.alight_time().total_seconds() as i32;
                leg.transit = Some(best);
            }
        }

        shift_first_walk(journey);
        Ok(())
    }

    /// Walking paths are cached per (from, to) pair for the lifetime of
    /// one request and re-anchored to each use's departure time.
    fn cached_walk(
        &self,
        from: &JourneyVertex,
        to: &JourneyVertex,
        day: &ServiceDay,
        walk_cache: &mut WalkCache,
    ) -> Option<(PositiveDuration, f64)> {
        let key = (WalkCacheKey::of(from), WalkCacheKey::of(to));
        if let Some(cached) = walk_cache.get(&key) {
            return *cached;
        }
        let transit = &self.graph.transit;
        let walk = self
            .street
            .walk(
                &from.coord(transit),
                &to.coord(transit),
                day.time(WALK_CACHE_TIME),
            )
            .map(|path| (path.duration, path.distance_meters));
        walk_cache.insert(key, walk);
        walk
    }
}

/// Attaches the requested street endpoints to each candidate : an existing
/// boundary walking leg is retargeted, otherwise a new walking leg is
/// added.
fn attach_walking_ends(
    journeys: &mut [TpJourney],
    request_start: JourneyVertex,
    request_end: JourneyVertex,
) {
    for journey in journeys.iter_mut() {
        if journey.legs.is_empty() {
            continue;
        }

        let first = &mut journey.legs[0];
        if first.from != request_start {
            if first.walking {
                first.from = request_start;
            } else {
                let to = first.from;
                journey.legs.insert(
                    0,
                    TpLeg {
                        from: request_start,
                        to,
                        walking: true,
                        scenario: None,
                        transit: None,
                        walk: None,
                    },
                );
            }
        }

        let last_rank = journey.legs.len() - 1;
        let last = &mut journey.legs[last_rank];
        if last.to != request_end {
            if last.walking {
                last.to = request_end;
            } else {
                let from = last.to;
                journey.legs.push(TpLeg {
                    from,
                    to: request_end,
                    walking: true,
                    scenario: None,
                    transit: None,
                    walk: None,
                });
            }
        }
    }
}

/// The first walking leg may have started later : shift it so it ends
/// exactly when the following leg departs. All-walking journeys are left
/// as materialized.
fn shift_first_walk(journey: &mut TpJourney) {
    if journey.legs.len() < 2 {
        return;
    }
    if !journey.legs[0].walking || !journey.legs.iter().skip(1).any(|leg| !leg.walking) {
        return;
    }
    let next_departure = match journey.legs[1].departure_epoch() {
        Some(departure) => departure,
        None => return,
    };
    if let Some(walk) = &mut journey.legs[0].walk {
        let duration = walk.duration.total_seconds() as i64;
        *walk = walk.anchored_at(next_departure - duration);
    }
}
