// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod channel;
pub mod config;
pub mod discover;
pub mod fetch;
pub mod filter;
pub mod metrics;
pub mod model;
pub mod scan;
pub mod services;
pub mod store;
pub mod thumbnail;
pub mod topics;

// Ingestion pipeline (extractors, cycle runner, scheduler)
pub mod ingest;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::ingest::{run_cycle, IngestDeps};
pub use crate::model::{
    ContentType, CycleReport, DiscoveredFeed, FilterPolicy, NormalizedItem, Source, SourceType,
};
