//! # DataStore Module
//!
//! Postgres-backed persistence for summarization jobs, extracted predictions
//! and process-wide settings. The `DataStore` trait is the abstraction the
//! processing pipeline writes through; `PgDataStore` is the sqlx-backed
//! implementation with embedded migrations.

mod datastore;
mod domain;

pub use datastore::postgres::PgDataStore;
pub use datastore::DataStore;
pub use domain::{
    Job, JobStatus, NewJob, NewPrediction, Prediction, Settings, DEFAULT_SUMMARY_PROMPT,
};
