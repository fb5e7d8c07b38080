//! Monthly adviser performance reports.
//!
//! Per-adviser profit exports are loaded into a [`registry::Registry`] keyed
//! by month, then summarised by the pure functions in [`aggregate`] and
//! [`compare`]. [`reports`] and [`output`] turn the results into tables.
pub mod aggregate;
pub mod cache;
pub mod compare;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod period;
pub mod registry;
pub mod reports;
pub mod types;
pub mod util;

pub use error::{ReportError, ReportResult};
