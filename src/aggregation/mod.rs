//! Candidate/result aggregation.

pub mod merge;
pub mod service;

pub use service::ResultsAggregator;
