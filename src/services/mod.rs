//! Services - session state and derived geometry
//!
//! This module contains the core panel logic:
//! - `event_log` - append-only session log with an observer list
//! - `projector` - map geometry derived from the log (paths, markers,
//!   click-to-plane mapping)

pub mod event_log;
pub mod projector;

// Re-export commonly used types
pub use event_log::{EventLog, LogChange};
pub use projector::{plane_from_click, project, DevicePath, Marker, Projection, PLANE_MAX};
