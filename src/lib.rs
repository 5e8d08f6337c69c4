pub mod builder;
pub mod cleaner;
pub mod delay;
pub mod editor;
mod engine;
pub mod geometry;
pub mod graph;
pub mod journey;
pub mod logger;
pub mod merge;
pub mod query;
pub mod realtime;
pub mod street;
pub mod time;
pub mod transfer_pattern;
pub mod transit_data;

pub use chrono::{NaiveDate, NaiveDateTime};
pub use tracing;

pub use builder::{build, BuildConfig};
pub use delay::DelayPolicy;
pub use engine::one_to_all::{one_to_all, SearchResult};
pub use graph::Graph;
pub use query::{BadJourneyRequest, JourneyRequest, Place, TransferPatternRouter};
pub use time::{PositiveDuration, ServiceDay};
pub use transfer_pattern::{TransferPattern, TransferPatternIndex};
pub use transit_data::{Stop, TimetableView, TransitData, TripPattern};
