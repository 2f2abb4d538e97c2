// src/config/mod.rs
pub mod api;
pub mod report;

pub use api::ApiConfig;
pub use report::ReportConfig;
