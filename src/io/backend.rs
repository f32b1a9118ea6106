//! HTTP client for the simulator backend
//!
//! Endpoints:
//! - `POST /generate` `{users, events}` -> NDJSON stream of events
//! - `POST /replay` multipart field `file` (CSV) -> NDJSON stream of events
//! - `POST /connect` `{imei, x, y, timestamp, keepalive}` -> single outcome
//! - `GET /` -> JSON array of BTS locations
//!
//! Streaming responses are decoded incrementally; each record is handed to
//! the caller's sink as soon as its line is complete. There is no retry
//! policy: every failure is terminal for that submission.

use crate::domain::{BtsLocation, ConnectRequest, Imei, SimulationEvent};
use crate::infra::Config;
use crate::io::ndjson::NdjsonDecoder;
use async_trait::async_trait;
use reqwest::{multipart, Response, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Per-record sink for streaming operations
pub type EventSink<'a> = &'a mut (dyn FnMut(SimulationEvent) + Send);

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("generate request failed with status {0}")]
    GenerateFailed(StatusCode),
    #[error("replay request failed with status {0}")]
    ReplayFailed(StatusCode),
    #[error("connect request failed with status {0}")]
    ConnectFailed(StatusCode),
    #[error("stream read failed: {0}")]
    StreamRead(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid response payload: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Result of a completed streaming operation
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamSummary {
    /// Records delivered to the sink
    pub records: usize,
    /// Lines skipped because they failed to decode
    pub malformed: u64,
}

/// Backend operations, behind a trait so the UI can be driven against a
/// scripted fake in tests
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn generate(
        &self,
        users: u32,
        events: u32,
        on_event: EventSink<'_>,
    ) -> Result<StreamSummary, BackendError>;

    async fn replay(
        &self,
        file_name: &str,
        file: Vec<u8>,
        on_event: EventSink<'_>,
    ) -> Result<StreamSummary, BackendError>;

    async fn connect_manual(
        &self,
        req: &ConnectRequest,
    ) -> Result<SimulationEvent, BackendError>;

    async fn bts_locations(&self) -> Result<Vec<BtsLocation>, BackendError>;
}

/// reqwest-backed client for the simulator backend
pub struct BackendClient {
    base_url: String,
    request_timeout: Duration,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: &Config) -> Result<Self, BackendError> {
        // No overall timeout on the client: generate/replay streams run for
        // as long as the backend keeps emitting. Single request/response
        // calls get a per-request timeout instead.
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms()))
            .build()?;

        Ok(Self {
            base_url: config.base_url().trim_end_matches('/').to_string(),
            request_timeout: Duration::from_millis(config.request_timeout_ms()),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Drain a streaming response through the NDJSON decoder
    async fn read_stream(
        mut resp: Response,
        on_event: EventSink<'_>,
    ) -> Result<StreamSummary, BackendError> {
        let mut decoder = NdjsonDecoder::new();
        let mut records = 0usize;

        loop {
            match resp.chunk().await {
                Ok(Some(chunk)) => {
                    for event in decoder.feed(&chunk) {
                        records += 1;
                        on_event(event);
                    }
                }
                Ok(None) => break,
                Err(e) => return Err(BackendError::StreamRead(e)),
            }
        }

        decoder.finish();
        Ok(StreamSummary { records, malformed: decoder.malformed() })
    }
}

#[async_trait]
impl BackendApi for BackendClient {
    async fn generate(
        &self,
        users: u32,
        events: u32,
        on_event: EventSink<'_>,
    ) -> Result<StreamSummary, BackendError> {
        let start = Instant::now();
        info!(users, events, "generate_requested");

        let resp = self
            .http
            .post(format!("{}/generate", self.base_url))
            .json(&serde_json::json!({ "users": users, "events": events }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BackendError::GenerateFailed(resp.status()));
        }

        let summary = Self::read_stream(resp, on_event).await?;
        info!(
            records = summary.records,
            malformed = summary.malformed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generate_stream_complete"
        );
        Ok(summary)
    }

    async fn replay(
        &self,
        file_name: &str,
        file: Vec<u8>,
        on_event: EventSink<'_>,
    ) -> Result<StreamSummary, BackendError> {
        let start = Instant::now();
        info!(file = %file_name, bytes = file.len(), "replay_requested");

        let part = multipart::Part::bytes(file)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(format!("{}/replay", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BackendError::ReplayFailed(resp.status()));
        }

        let summary = Self::read_stream(resp, on_event).await?;
        info!(
            records = summary.records,
            malformed = summary.malformed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "replay_stream_complete"
        );
        Ok(summary)
    }

    async fn connect_manual(
        &self,
        req: &ConnectRequest,
    ) -> Result<SimulationEvent, BackendError> {
        debug!(imei = %req.imei, x = req.x, y = req.y, keepalive = req.keepalive, "connect_requested");

        let resp = self
            .http
            .post(format!("{}/connect", self.base_url))
            .timeout(self.request_timeout)
            .json(req)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(BackendError::ConnectFailed(resp.status()));
        }

        let body = resp.bytes().await.map_err(BackendError::StreamRead)?;
        let outcome = serde_json::from_slice(&body)?;

        Ok(SimulationEvent {
            timestamp: req.timestamp.clone(),
            imei: Imei(req.imei.clone()),
            x: req.x,
            y: req.y,
            response: outcome,
        })
    }

    async fn bts_locations(&self) -> Result<Vec<BtsLocation>, BackendError> {
        let resp = self
            .http
            .get(format!("{}/", self.base_url))
            .timeout(self.request_timeout)
            .send()
            .await?;

        let body = resp.bytes().await.map_err(BackendError::StreamRead)?;
        let locations: Vec<BtsLocation> = serde_json::from_slice(&body)?;
        info!(count = locations.len(), "bts_locations_loaded");
        Ok(locations)
    }
}
