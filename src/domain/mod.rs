//! Domain models - core data types of the control panel
//!
//! This module contains the canonical data types used throughout the panel:
//! - `SimulationEvent` - one device position update or manual connect result
//! - `ConnectOutcome` - the backend's per-event response payload
//! - `EventClass` - marker classification (success / handover / error)
//! - `BtsLocation` - static reference geometry rendered on the map
//! - `MapSelection` - the most recent map click, in plane coordinates
//! - `ConnectRequest` - payload of a manual connect submission

pub mod event;

pub use event::{
    BtsLocation, ConnectOutcome, ConnectRequest, EventClass, Imei, MapSelection, SimulationEvent,
};
