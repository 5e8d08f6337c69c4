//! Provides an easy way to create a `TransitData` for tests
//!
//! ```
//! let transit = TimetableBuilder::default()
//!     .pattern("P1", |p| {
//!         p.st("A", "08:00:00").st("B", "08:10:00");
//!     })
//!     .footpath("B", "Bp", 120, 100.0)
//!     .build();
//! ```

use tresse::geometry::Coord;
use tresse::time::{parse_day_time, PositiveDuration};
use tresse::transit_data::{Timetable, TransitData, TransitMode, TripTimes};
use tresse::Stop;

/// Spacing of auto-placed stops, roughly 2.2 km at the equator.
const AUTO_COORD_STEP: f64 = 0.02;

#[derive(Default)]
pub struct TimetableBuilder {
    transit: TransitData,
}

pub struct PatternBuilder {
    stops: Vec<String>,
    trips: Vec<Vec<(i32, i32)>>,
}

impl TimetableBuilder {
    /// Declares a stop with an explicit coordinate. Stops first mentioned
    /// inside a pattern are auto-placed on a line instead.
    pub fn stop(mut self, label: &str, lon: f64, lat: f64) -> Self {
        self.transit.add_stop(label, Coord { lon, lat });
        self
    }

    /// Adds a trip pattern. The closure declares the stop sequence with the
    /// first trip's times, and optionally extra trips.
    ///
    /// ```
    /// TimetableBuilder::default().pattern("P1", |p| {
    ///     p.st("A", "08:00:00")
    ///      .st("B", "08:10:00")
    ///      .extra_trip(&["09:00:00", "09:10:00"]);
    /// });
    /// ```
    pub fn pattern<F>(mut self, code: &str, initer: F) -> Self
    where
        F: FnOnce(&mut PatternBuilder),
    {
        let mut pattern = PatternBuilder {
            stops: Vec::new(),
            trips: vec![Vec::new()],
        };
        initer(&mut pattern);

        let stops: Vec<Stop> = pattern
            .stops
            .iter()
            .map(|label| self.auto_stop(label))
            .collect();
        let trips = pattern
            .trips
            .into_iter()
            .map(|times| {
                assert_eq!(times.len(), stops.len(), "trip times do not cover the stops");
                TripTimes {
                    arrivals: times.iter().map(|&(arrival, _)| arrival).collect(),
                    departures: times.iter().map(|&(_, departure)| departure).collect(),
                }
            })
            .collect();

        self.transit
            .add_pattern(code, TransitMode::Bus, stops, Timetable { trips });
        self
    }

    /// Adds a footpath in both directions.
    pub fn footpath(mut self, from: &str, to: &str, seconds: u32, meters: f64) -> Self {
        let from = self.auto_stop(from);
        let to = self.auto_stop(to);
        let duration = PositiveDuration::from_seconds(seconds);
        self.transit.add_footpath(from, to, duration, meters);
        self.transit.add_footpath(to, from, duration, meters);
        self
    }

    pub fn build(self) -> TransitData {
        self.transit
    }

    fn auto_stop(&mut self, label: &str) -> Stop {
        if let Some(stop) = self.transit.stop_by_label(label) {
            return stop;
        }
        let lon = AUTO_COORD_STEP * self.transit.nb_of_stops() as f64;
        self.transit.add_stop(label, Coord { lon, lat: 0.0 })
    }
}

impl PatternBuilder {
    /// Adds a stop with equal arrival and departure time.
    pub fn st(&mut self, label: &str, time: &str) -> &mut Self {
        let seconds = time_literal(time);
        self.push_stop(label, seconds, seconds)
    }

    /// Adds a stop with distinct arrival and departure times.
    pub fn st_arrival_departure(&mut self, label: &str, arrival: &str, departure: &str) -> &mut Self {
        self.push_stop(label, time_literal(arrival), time_literal(departure))
    }

    /// Adds one more trip over the same stop sequence.
    pub fn extra_trip(&mut self, times: &[&str]) -> &mut Self {
        self.trips.push(
            times
                .iter()
                .map(|time| {
                    let seconds = time_literal(time);
                    (seconds, seconds)
                })
                .collect(),
        );
        self
    }

    fn push_stop(&mut self, label: &str, arrival: i32, departure: i32) -> &mut Self {
        self.stops.push(label.to_string());
        self.trips[0].push((arrival, departure));
        self
    }
}

fn time_literal(time: &str) -> i32 {
    parse_day_time(time).unwrap_or_else(|| panic!("invalid time literal {}", time))
}
