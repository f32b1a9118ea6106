//! Shared types for the simulator control panel

use serde::{Deserialize, Serialize};

/// Newtype wrapper for device IMEIs to provide type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Imei(pub String);

impl Imei {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Imei {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-event response payload from the backend
///
/// Either `detail` (human-readable outcome) or `error` is set; both may be
/// absent for records produced by older backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectOutcome {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One device position update or manual connect result
///
/// Immutable once appended to the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationEvent {
    pub timestamp: String,
    pub imei: Imei,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub response: ConnectOutcome,
}

impl SimulationEvent {
    /// Marker classification for this event
    pub fn class(&self) -> EventClass {
        EventClass::classify(self.response.error.as_deref(), self.response.detail.as_deref())
    }
}

/// Marker classification derived from an event's response payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Success,
    Handover,
    Error,
}

impl EventClass {
    /// Pure classification of `(error, detail)`.
    ///
    /// A present error always wins over a handover detail.
    pub fn classify(error: Option<&str>, detail: Option<&str>) -> Self {
        if error.is_some() {
            return EventClass::Error;
        }
        let is_handover =
            detail.map(|d| d.to_lowercase().contains("handover")).unwrap_or(false);
        if is_handover {
            EventClass::Handover
        } else {
            EventClass::Success
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventClass::Success => "success",
            EventClass::Handover => "handover",
            EventClass::Error => "error",
        }
    }
}

/// Static BTS reference point, fetched once at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BtsLocation {
    pub bts_id: String,
    pub x: f64,
    pub y: f64,
}

/// Most recent pointer click on the map plane
///
/// Coordinates are in the plane's 0-400 unit square. Overwritten by each
/// new click; consumed by the manual connect form to prefill coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapSelection {
    pub x: i32,
    pub y: i32,
    /// Selection time, epoch milliseconds
    pub ts: i64,
}

/// Payload of a manual connect submission
///
/// `x`/`y` are numeric here; the connect form coerces its text input
/// before building the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub imei: String,
    pub x: f64,
    pub y: f64,
    pub timestamp: String,
    pub keepalive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(error: Option<&str>, detail: Option<&str>) -> SimulationEvent {
        SimulationEvent {
            timestamp: "2024-05-01 12:00:00".to_string(),
            imei: Imei("490154203237518".to_string()),
            x: 10.0,
            y: 20.0,
            response: ConnectOutcome {
                detail: detail.map(str::to_string),
                error: error.map(str::to_string),
            },
        }
    }

    #[test]
    fn test_classify_error_wins() {
        assert_eq!(
            EventClass::classify(Some("Connect timeout"), Some("Handover to BTS_2")),
            EventClass::Error
        );
    }

    #[test]
    fn test_classify_handover_case_insensitive() {
        assert_eq!(
            EventClass::classify(None, Some("HANDOVER to BTS_3")),
            EventClass::Handover
        );
        assert_eq!(
            EventClass::classify(None, Some("mid-call Handover accepted")),
            EventClass::Handover
        );
    }

    #[test]
    fn test_classify_success_default() {
        assert_eq!(
            EventClass::classify(None, Some("Connected successfully to BTS_1")),
            EventClass::Success
        );
        assert_eq!(EventClass::classify(None, None), EventClass::Success);
    }

    #[test]
    fn test_event_class_accessor() {
        assert_eq!(event(Some("boom"), None).class(), EventClass::Error);
        assert_eq!(event(None, Some("handover")).class(), EventClass::Handover);
        assert_eq!(event(None, None).class(), EventClass::Success);
    }

    #[test]
    fn test_event_roundtrip_defaults_response() {
        // Records without a response payload still deserialize
        let ev: SimulationEvent = serde_json::from_str(
            r#"{"timestamp":"2024-05-01 12:00:00","imei":"1234","x":1,"y":2}"#,
        )
        .unwrap();
        assert!(ev.response.detail.is_none());
        assert!(ev.response.error.is_none());
        assert_eq!(ev.class(), EventClass::Success);
    }
}
