use crate::geometry::Coord;
use crate::realtime::DelaySnapshot;
use crate::time::{PositiveDuration, SecondsSinceDayStart};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Handle to a stop of the transit network. Cheap to copy; only valid for
/// the `TransitData` it was issued by. Cross-process identity is the label.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Stop {
    pub(crate) idx: usize,
}

/// Handle to a trip pattern. Cross-process identity is the code.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TripPattern {
    pub(crate) idx: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitMode {
    Bus,
    Tramway,
    Metro,
    Rail,
    Ferry,
}

impl TransitMode {
    /// Dwell added after alighting before the traveler is available for the
    /// next leg.
    pub fn alight_time(&self) -> PositiveDuration {
        match self {
            TransitMode::Bus | TransitMode::Tramway | TransitMode::Metro => {
                PositiveDuration::zero()
            }
            TransitMode::Rail | TransitMode::Ferry => PositiveDuration::from_seconds(60),
        }
    }
}

/// Per-trip schedule along one pattern : one arrival and one departure per
/// stop position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripTimes {
    pub arrivals: Vec<SecondsSinceDayStart>,
    pub departures: Vec<SecondsSinceDayStart>,
}

impl TripTimes {
    pub fn nb_of_positions(&self) -> usize {
        self.arrivals.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timetable {
    pub trips: Vec<TripTimes>,
}

impl Timetable {
    /// Earliest trip departing at `from_pos` at or after `earliest_depart`.
    pub fn next_trip(
        &self,
        from_pos: usize,
        earliest_depart: SecondsSinceDayStart,
    ) -> Option<(usize, SecondsSinceDayStart)> {
        let mut best: Option<(usize, SecondsSinceDayStart)> = None;
        for (trip, trip_times) in self.trips.iter().enumerate() {
            let departure = trip_times.departures[from_pos];
            if departure < earliest_depart {
                continue;
            }
            match best {
                Some((_, best_departure)) if best_departure <= departure => {}
                _ => best = Some((trip, departure)),
            }
        }
        best
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footpath {
    pub to: Stop,
    pub duration: PositiveDuration,
    pub distance_meters: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopData {
    pub label: String,
    pub coord: Coord,
    pub footpaths: Vec<Footpath>,
    /// All (pattern, position) visits of this stop.
    pub stop_visits: Vec<(TripPattern, usize)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripPatternData {
    pub code: String,
    pub mode: TransitMode,
    pub stops: Vec<Stop>,
    pub timetable: Timetable,
}

/// The in-memory timetable graph : stops, trip patterns and footpaths.
///
/// Loading from GTFS/NeTEx is not handled here; embedders and tests fill a
/// `TransitData` through the `add_*` methods, and persisted graphs restore
/// their lookup maps with `rebuild_lookups`.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TransitData {
    stops: Vec<StopData>,
    patterns: Vec<TripPatternData>,
    #[serde(skip)]
    stop_of_label: HashMap<String, Stop>,
    #[serde(skip)]
    pattern_of_code: HashMap<String, TripPattern>,
}

impl TransitData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nb_of_stops(&self) -> usize {
        self.stops.len()
    }

    pub fn nb_of_patterns(&self) -> usize {
        self.patterns.len()
    }

    pub fn stops(&self) -> impl Iterator<Item = Stop> {
        (0..self.stops.len()).map(|idx| Stop { idx })
    }

    pub fn trip_patterns(&self) -> impl Iterator<Item = TripPattern> {
        (0..self.patterns.len()).map(|idx| TripPattern { idx })
    }

    pub fn stop_data(&self, stop: Stop) -> &StopData {
        &self.stops[stop.idx]
    }

    pub fn pattern_data(&self, pattern: TripPattern) -> &TripPatternData {
        &self.patterns[pattern.idx]
    }

    pub fn stop_label(&self, stop: Stop) -> &str {
        &self.stops[stop.idx].label
    }

    pub fn pattern_code(&self, pattern: TripPattern) -> &str {
        &self.patterns[pattern.idx].code
    }

    pub fn stop_by_label(&self, label: &str) -> Option<Stop> {
        self.stop_of_label.get(label).copied()
    }

    pub fn pattern_by_code(&self, code: &str) -> Option<TripPattern> {
        self.pattern_of_code.get(code).copied()
    }

    pub fn add_stop(&mut self, label: &str, coord: Coord) -> Stop {
        if let Some(stop) = self.stop_by_label(label) {
            return stop;
        }
        let stop = Stop {
            idx: self.stops.len(),
        };
        self.stops.push(StopData {
            label: label.to_string(),
            coord,
            footpaths: Vec::new(),
            stop_visits: Vec::new(),
        });
        self.stop_of_label.insert(label.to_string(), stop);
        stop
    }

    pub fn add_pattern(
        &mut self,
        code: &str,
        mode: TransitMode,
        stops: Vec<Stop>,
        timetable: Timetable,
    ) -> TripPattern {
        let pattern = TripPattern {
            idx: self.patterns.len(),
        };
        for (position, stop) in stops.iter().enumerate() {
            self.stops[stop.idx].stop_visits.push((pattern, position));
        }
        self.patterns.push(TripPatternData {
            code: code.to_string(),
            mode,
            stops,
            timetable,
        });
        self.pattern_of_code.insert(code.to_string(), pattern);
        pattern
    }

    pub fn add_footpath(
        &mut self,
        from: Stop,
        to: Stop,
        duration: PositiveDuration,
        distance_meters: f64,
    ) {
        self.stops[from.idx].footpaths.push(Footpath {
            to,
            duration,
            distance_meters,
        });
    }

    /// All scheduled departures from `stop`, as (pattern, position, departure).
    /// The last position of a pattern is excluded since nothing departs there.
    pub fn scheduled_departures(
        &self,
        stop: Stop,
    ) -> Vec<(TripPattern, usize, SecondsSinceDayStart)> {
        let mut departures = Vec::new();
        for &(pattern, position) in &self.stops[stop.idx].stop_visits {
            let pattern_data = &self.patterns[pattern.idx];
            if position + 1 >= pattern_data.stops.len() {
                continue;
            }
            for trip_times in &pattern_data.timetable.trips {
                departures.push((pattern, position, trip_times.departures[position]));
            }
        }
        departures
    }

    /// Restores the label/code lookup maps after deserialization.
    pub fn rebuild_lookups(&mut self) {
        self.stop_of_label = self
            .stops
            .iter()
            .enumerate()
            .map(|(idx, data)| (data.label.clone(), Stop { idx }))
            .collect();
        self.pattern_of_code = self
            .patterns
            .iter()
            .enumerate()
            .map(|(idx, data)| (data.code.clone(), TripPattern { idx }))
            .collect();
    }
}

/// Read-only view over the transit data with an optional realtime overlay.
///
/// Searches and queries receive the overlay through this view instead of a
/// process-global slot, so two searches under different delay scenarios
/// cannot observe each other.
#[derive(Clone, Copy)]
pub struct TimetableView<'a> {
    pub transit: &'a TransitData,
    pub overlay: Option<&'a DelaySnapshot>,
}

impl<'a> TimetableView<'a> {
    pub fn scheduled(transit: &'a TransitData) -> Self {
        Self {
            transit,
            overlay: None,
        }
    }

    pub fn with_overlay(transit: &'a TransitData, overlay: &'a DelaySnapshot) -> Self {
        Self {
            transit,
            overlay: Some(overlay),
        }
    }

    /// The realtime-overlayed timetable of `pattern` if any, the scheduled
    /// one otherwise.
    pub fn timetable_for(&self, pattern: TripPattern) -> &'a Timetable {
        if let Some(overlay) = self.overlay {
            if let Some(timetable) = overlay.resolve(pattern) {
                return timetable;
            }
        }
        &self.transit.pattern_data(pattern).timetable
    }

    /// Earliest trip of `pattern` boardable at `from_pos` at or after
    /// `earliest_depart`, under the overlay if one applies.
    pub fn next_trip(
        &self,
        pattern: TripPattern,
        from_pos: usize,
        earliest_depart: SecondsSinceDayStart,
    ) -> Option<(usize, SecondsSinceDayStart)> {
        self.timetable_for(pattern).next_trip(from_pos, earliest_depart)
    }
}
