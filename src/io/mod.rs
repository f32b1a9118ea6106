//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `backend` - HTTP client for the simulator backend (generate, replay,
//!   manual connect, BTS locations)
//! - `ndjson` - incremental newline-delimited JSON stream decoder
//! - `export` - CSV export of the event log

pub mod backend;
pub mod export;
pub mod ndjson;

// Re-export commonly used types
pub use backend::{BackendApi, BackendClient, BackendError, StreamSummary};
pub use export::CsvExporter;
pub use ndjson::NdjsonDecoder;
