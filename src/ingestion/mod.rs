//! Data ingestion module - fetch, normalize, upsert and aggregate pipeline
//! for the three planning-application domains (DA / CC / OC)

pub mod aggregate;
pub mod fetch;
pub mod map;
pub mod types;
pub mod write;

pub use types::*;
