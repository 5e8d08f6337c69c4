use crate::transit_data::{Timetable, TransitData, TripPattern};
use std::collections::HashMap;

/// A realtime overlay : replacement timetables for a subset of the trip
/// patterns. During the build it is synthesized from a delay scenario; at
/// query time it is provided, read-only, by the realtime feed layer.
#[derive(Debug, Default, Clone)]
pub struct DelaySnapshot {
    delayed: HashMap<TripPattern, Timetable>,
}

impl DelaySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, pattern: TripPattern) -> Option<&Timetable> {
        self.delayed.get(&pattern)
    }

    pub fn is_empty(&self) -> bool {
        self.delayed.is_empty()
    }

    /// Installs a timetable where every trip of `pattern` is shifted by
    /// `delay_seconds` on every position.
    pub fn delay_pattern(&mut self, transit: &TransitData, pattern: TripPattern, delay_seconds: u32) {
        let scheduled = &transit.pattern_data(pattern).timetable;
        let mut delayed = scheduled.clone();
        for trip_times in &mut delayed.trips {
            for arrival in &mut trip_times.arrivals {
                *arrival += delay_seconds as i32;
            }
            for departure in &mut trip_times.departures {
                *departure += delay_seconds as i32;
            }
        }
        self.delayed.insert(pattern, delayed);
    }

    /// Largest per-stop arrival delay of `pattern` in this overlay, against
    /// the scheduled timetable. Zero when the pattern is not overlayed or
    /// the trip sets diverge.
    pub fn max_arrival_delay(&self, transit: &TransitData, pattern: TripPattern) -> u32 {
        let updated = match self.delayed.get(&pattern) {
            Some(timetable) => timetable,
            None => return 0,
        };
        let scheduled = &transit.pattern_data(pattern).timetable;
        let mut max_delay: i32 = 0;
        for (updated_trip, scheduled_trip) in updated.trips.iter().zip(scheduled.trips.iter()) {
            for (updated_arrival, scheduled_arrival) in updated_trip
                .arrivals
                .iter()
                .zip(scheduled_trip.arrivals.iter())
            {
                max_delay = max_delay.max(updated_arrival - scheduled_arrival);
            }
        }
        max_delay.max(0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coord;
    use crate::transit_data::{TransitMode, TripTimes};

    #[test]
    fn delayed_pattern_reports_its_delay() {
        let mut transit = TransitData::new();
        let a = transit.add_stop("A", Coord { lon: 0.0, lat: 0.0 });
        let b = transit.add_stop("B", Coord { lon: 0.0, lat: 0.0 });
        let pattern = transit.add_pattern(
            "P1",
            TransitMode::Bus,
            vec![a, b],
            Timetable {
                trips: vec![TripTimes {
                    arrivals: vec![100, 200],
                    departures: vec![100, 200],
                }],
            },
        );

        let mut snapshot = DelaySnapshot::new();
        snapshot.delay_pattern(&transit, pattern, 300);
        assert_eq!(snapshot.max_arrival_delay(&transit, pattern), 300);
        assert_eq!(snapshot.resolve(pattern).unwrap().trips[0].departures[0], 400);
    }
}
