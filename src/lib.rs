// src/lib.rs
// Public library surface for the API binary, the report binary and integration tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod datasets;
pub mod fetch;
pub mod metrics;

// Offline dashboard builder (bin: report)
pub mod report;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::datasets::{Dataset, DatasetClient};
pub use crate::fetch::{extract_visible_text, FetchError, HttpFetcher, TextFetcher};
