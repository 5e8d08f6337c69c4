use crate::cleaner;
use crate::delay::DelayPolicy;
use crate::editor::TransferPatternEditor;
use crate::engine::one_to_all::one_to_all;
use crate::time::{display_day_time, SecondsSinceDayStart, ServiceDay};
use crate::transfer_pattern::{DirectConnectionIndex, TransferPattern, TransferPatternIndex};
use crate::transit_data::{Stop, TimetableView, TransitData};
use chrono::NaiveDate;
use std::ops::Range;
use std::time::Instant;
use tracing::{debug, info};

/// Minimal spacing between two departure-time samples of one source stop.
pub const DEPART_TIMES_FILTER: u32 = 60 * 30;

#[derive(Debug, Clone, Copy)]
pub struct BuildConfig {
    /// Number of this chunk, starting with 1.
    pub chunk: usize,
    /// Total number of chunks.
    pub nb_of_chunks: usize,
    pub delay_policy: DelayPolicy,
    /// The service day all construction searches are anchored to.
    pub reference_date: NaiveDate,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            chunk: 1,
            nb_of_chunks: 1,
            delay_policy: DelayPolicy::Simple,
            // a Monday
            reference_date: NaiveDate::from_ymd(2020, 1, 6),
        }
    }
}

/// Builds the transfer-pattern index of one chunk of source stops.
///
/// Stops are taken in dense-index order and split into `nb_of_chunks` equal
/// contiguous ranges; only chunk 1 carries the direct-connection index.
pub fn build(transit: &TransitData, config: &BuildConfig) -> TransferPatternIndex {
    let start_time = Instant::now();

    let direct_connections = if config.chunk == 1 {
        info!("building direct connection table");
        DirectConnectionIndex::build(transit)
    } else {
        DirectConnectionIndex::empty()
    };
    let mut index = TransferPatternIndex::new(direct_connections);

    let range = chunk_range(transit.nb_of_stops(), config.chunk, config.nb_of_chunks);
    info!(
        "building {} transfer patterns, stops {} to {}, with delay policy {}",
        range.len(),
        range.start,
        range.end,
        config.delay_policy,
    );

    let day = ServiceDay::new(config.reference_date);
    for idx in range {
        let source = Stop { idx };
        index.insert(build_source(transit, source, &day, config.delay_policy));
    }

    let removed = cleaner::clean(&mut index);
    debug!("cycle cleaning removed {} arcs", removed);

    let stats = index.arc_stats();
    info!(
        "{} stops, {} arcs in total, of which {} walking arcs and {} dynamic arcs of which {} walking",
        stats.sources,
        stats.total_arcs,
        stats.walking_arcs,
        stats.dynamic_arcs,
        stats.dynamic_walking_arcs,
    );
    info!(
        "done. building transfer patterns took {:.1} minutes",
        start_time.elapsed().as_secs_f64() / 60.0
    );

    index
}

fn build_source(
    transit: &TransitData,
    source: Stop,
    day: &ServiceDay,
    delay_policy: DelayPolicy,
) -> TransferPattern {
    info!("building transfer pattern of {}", transit.stop_label(source));

    let mut editor = TransferPatternEditor::new(source);
    let samples = departure_samples(transit, source, DEPART_TIMES_FILTER);
    if let (Some(first), Some(last)) = (samples.first(), samples.last()) {
        debug!(
            "{} departure samples between {} and {}",
            samples.len(),
            display_day_time(*first),
            display_day_time(*last),
        );
    }

    // static patterns, no overlay
    let view = TimetableView::scheduled(transit);
    for &depart in &samples {
        let result = one_to_all(&view, source, day.time(depart), day);
        editor.add(&result, None);
    }

    // dynamic patterns, one synthesized overlay per scenario
    let scenarios = delay_policy.scenarios(editor.possible_delays());
    debug!("building delayed patterns with {} delay scenarios", scenarios.len());
    for scenario in scenarios {
        debug!("probing delay scenario {}", scenario.display(transit));
        let snapshot = scenario.to_snapshot(transit);
        let view = TimetableView::with_overlay(transit, &snapshot);
        let scenario_id = editor.intern_scenario(scenario);
        for &depart in &samples {
            let result = one_to_all(&view, source, day.time(depart), day);
            editor.add(&result, Some(scenario_id));
        }
    }

    editor.create()
}

/// The stop range `[total*(n-1)/m, total*n/m)` built by chunk `n` of `m`.
pub fn chunk_range(total: usize, n: usize, m: usize) -> Range<usize> {
    (total * (n - 1) / m)..(total * n / m)
}

/// All scheduled departure times of `stop`, sorted, then thinned so
/// consecutive samples are at least `min_delta` seconds apart.
pub fn departure_samples(
    transit: &TransitData,
    stop: Stop,
    min_delta: u32,
) -> Vec<SecondsSinceDayStart> {
    let mut times: Vec<SecondsSinceDayStart> = transit
        .scheduled_departures(stop)
        .iter()
        .map(|&(_, _, departure)| departure)
        .collect();
    times.sort_unstable();

    let min_delta = min_delta as i32;
    let mut samples = Vec::with_capacity(times.len());
    let mut last_time = -min_delta;
    for time in times {
        if time - last_time >= min_delta {
            samples.push(time);
            last_time = time;
        }
    }
    samples
}
