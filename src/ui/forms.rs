//! Form state for the three input panels
//!
//! Each form holds its own text buffers, coerces them on submit, tracks a
//! submit-in-progress flag, and carries the last result message. Status is
//! cleared when the next submit starts.

use crate::domain::{ConnectRequest, MapSelection};
use chrono::Utc;

/// Timestamp format the backend expects
pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Last-result message shown under a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormStatus {
    pub ok: bool,
    pub message: String,
}

impl FormStatus {
    pub fn success(message: impl Into<String>) -> Self {
        Self { ok: true, message: message.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { ok: false, message: message.into() }
    }
}

/// Validated generate parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateParams {
    pub users: u32,
    pub events: u32,
}

/// Generate-simulation form
#[derive(Debug)]
pub struct GenerateForm {
    pub users: String,
    pub events: String,
    pub busy: bool,
    pub status: Option<FormStatus>,
}

impl Default for GenerateForm {
    fn default() -> Self {
        Self { users: "1".to_string(), events: "10".to_string(), busy: false, status: None }
    }
}

impl GenerateForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerce text buffers into positive integers
    pub fn parsed(&self) -> Result<GenerateParams, String> {
        let users = parse_positive(&self.users, "Users")?;
        let events = parse_positive(&self.events, "Events")?;
        Ok(GenerateParams { users, events })
    }

    pub fn begin_submit(&mut self) {
        self.busy = true;
        self.status = None;
    }

    pub fn reset_after_success(&mut self) {
        self.users = "1".to_string();
        self.events = "10".to_string();
    }
}

fn parse_positive(text: &str, label: &str) -> Result<u32, String> {
    match text.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("{} must be a positive integer", label)),
    }
}

/// Replay-simulation form
#[derive(Debug, Default)]
pub struct ReplayForm {
    pub path: String,
    pub busy: bool,
    pub status: Option<FormStatus>,
}

impl ReplayForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parsed(&self) -> Result<String, String> {
        let path = self.path.trim();
        if path.is_empty() {
            return Err("Choose a CSV file first".to_string());
        }
        Ok(path.to_string())
    }

    pub fn begin_submit(&mut self) {
        self.busy = true;
        self.status = None;
    }

    pub fn reset_after_success(&mut self) {
        self.path.clear();
    }
}

/// Manual-connect form
#[derive(Debug)]
pub struct ConnectForm {
    pub imei: String,
    pub x: String,
    pub y: String,
    pub timestamp: String,
    pub keepalive: bool,
    pub busy: bool,
    pub status: Option<FormStatus>,
}

impl Default for ConnectForm {
    fn default() -> Self {
        Self {
            imei: String::new(),
            x: String::new(),
            y: String::new(),
            timestamp: now_timestamp(),
            keepalive: false,
            busy: false,
            status: None,
        }
    }
}

impl ConnectForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coerce text buffers into a request: coordinates must be numeric
    pub fn parsed(&self) -> Result<ConnectRequest, String> {
        let imei = self.imei.trim();
        if imei.is_empty() {
            return Err("IMEI is required".to_string());
        }
        let x: f64 =
            self.x.trim().parse().map_err(|_| "X must be numeric".to_string())?;
        let y: f64 =
            self.y.trim().parse().map_err(|_| "Y must be numeric".to_string())?;

        Ok(ConnectRequest {
            imei: imei.to_string(),
            x,
            y,
            timestamp: self.timestamp.trim().to_string(),
            keepalive: self.keepalive,
        })
    }

    pub fn begin_submit(&mut self) {
        self.busy = true;
        self.status = None;
    }

    pub fn set_timestamp_now(&mut self) {
        self.timestamp = now_timestamp();
    }

    /// A new map click prefills coordinates and refreshes the timestamp
    pub fn apply_selection(&mut self, selection: &MapSelection) {
        self.x = selection.x.to_string();
        self.y = selection.y.to_string();
        self.set_timestamp_now();
    }

    /// Only the timestamp resets after a successful send
    pub fn reset_after_success(&mut self) {
        self.set_timestamp_now();
    }
}
