use crate::transfer_pattern::DelayScenario;
use crate::transit_data::TripPattern;
use rand::prelude::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// How delay scenarios are derived from the waits observed during static
/// construction. All variants answer the same `scenarios` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayPolicy {
    /// No dynamic patterns.
    None,
    /// One scenario per observed pattern, delaying it just enough to miss
    /// the originally-chosen connection.
    Simple,
    /// `Simple`, uniformly downsampled to at most the given number of
    /// scenarios.
    RestrictedSimple(usize),
    /// Every non-empty subset of the observed patterns up to the given
    /// size.
    PowerSet(usize),
}

impl DelayPolicy {
    /// Derives the scenarios to probe from observed waits. Each entry's
    /// minimum delay is the observed wait plus one second.
    pub fn scenarios(&self, delays: &BTreeMap<TripPattern, u32>) -> Vec<DelayScenario> {
        match self {
            DelayPolicy::None => Vec::new(),
            DelayPolicy::Simple => simple_scenarios(delays),
            DelayPolicy::RestrictedSimple(max_scenarios) => {
                let mut scenarios = simple_scenarios(delays);
                if scenarios.len() > *max_scenarios {
                    let mut rng = ChaCha8Rng::seed_from_u64(1);
                    scenarios.shuffle(&mut rng);
                    scenarios.truncate(*max_scenarios);
                }
                scenarios
            }
            DelayPolicy::PowerSet(max_items) => power_set_scenarios(delays, *max_items),
        }
    }
}

fn simple_scenarios(delays: &BTreeMap<TripPattern, u32>) -> Vec<DelayScenario> {
    delays
        .iter()
        .map(|(&pattern, &wait)| DelayScenario::new(vec![(pattern, wait + 1)]))
        .collect()
}

fn power_set_scenarios(delays: &BTreeMap<TripPattern, u32>, max_items: usize) -> Vec<DelayScenario> {
    let entries: Vec<(TripPattern, u32)> = delays
        .iter()
        .map(|(&pattern, &wait)| (pattern, wait + 1))
        .collect();

    let mut scenarios = Vec::new();
    let mut subset = Vec::new();
    collect_subsets(&entries, 0, max_items, &mut subset, &mut scenarios);
    scenarios
}

fn collect_subsets(
    entries: &[(TripPattern, u32)],
    start: usize,
    max_items: usize,
    subset: &mut Vec<(TripPattern, u32)>,
    scenarios: &mut Vec<DelayScenario>,
) {
    if subset.len() == max_items {
        return;
    }
    for rank in start..entries.len() {
        subset.push(entries[rank]);
        scenarios.push(DelayScenario::new(subset.clone()));
        collect_subsets(entries, rank + 1, max_items, subset, scenarios);
        subset.pop();
    }
}

impl Display for DelayPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DelayPolicy::None => write!(f, "none"),
            DelayPolicy::Simple => write!(f, "simple"),
            DelayPolicy::RestrictedSimple(max) => write!(f, "restricted:{}", max),
            DelayPolicy::PowerSet(max) => write!(f, "powerset:{}", max),
        }
    }
}

impl FromStr for DelayPolicy {
    type Err = BadDelayPolicy;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input == "none" {
            return Ok(DelayPolicy::None);
        }
        if input == "simple" {
            return Ok(DelayPolicy::Simple);
        }
        if let Some(max) = input.strip_prefix("restricted:") {
            let max = max.parse().map_err(|_| BadDelayPolicy(input.to_string()))?;
            return Ok(DelayPolicy::RestrictedSimple(max));
        }
        if let Some(max) = input.strip_prefix("powerset:") {
            let max = max.parse().map_err(|_| BadDelayPolicy(input.to_string()))?;
            return Ok(DelayPolicy::PowerSet(max));
        }
        Err(BadDelayPolicy(input.to_string()))
    }
}

#[derive(Debug)]
pub struct BadDelayPolicy(String);

impl Display for BadDelayPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Unknown delay policy '{}'. Expected none, simple, restricted:<k> or powerset:<k>",
            self.0
        )
    }
}

impl std::error::Error for BadDelayPolicy {}
