#![forbid(unsafe_code)]

pub mod aggregate;
pub mod error;
pub mod merge;
pub mod model;
pub mod time;

pub use aggregate::{Aggregator, ProgressLookup, ProgressReport, ProgressSnapshot};
pub use error::Error;
pub use time::Clock;
