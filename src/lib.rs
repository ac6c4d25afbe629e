pub mod buckets;
pub mod checklist;
pub mod coerce;
pub mod config;
pub mod db;
pub mod delta;
pub mod error;
pub mod filter;
pub mod grouping;
pub mod models;
pub mod report;
pub mod stats;
pub mod timeseries;
