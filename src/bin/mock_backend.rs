//! Mock simulator backend
//!
//! Emulates the backend HTTP API for local development of the panel:
//! - `GET /` - static BTS locations
//! - `POST /generate` - `{users, events}` -> NDJSON stream of random-walk events
//! - `POST /replay` - multipart CSV upload -> NDJSON stream re-emitting the rows
//! - `POST /connect` - manual connect -> single outcome object
//!
//! The walk is a deterministic xorshift so runs are reproducible for a given
//! seed. Handover and error outcomes are injected at fixed intervals.
//!
//! Usage:
//!   cargo run --bin mock-backend -- --port 5000 --seed 42

use bytes::Bytes;
use chrono::Utc;
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use simpanel::domain::{BtsLocation, ConnectOutcome, SimulationEvent};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

const PLANE_MAX: f64 = 400.0;
/// A device out of this range of every BTS gets an error outcome
const SIGNAL_RANGE: f64 = 220.0;

#[derive(Parser, Debug)]
#[command(name = "mock-backend")]
#[command(about = "Mock simulator backend for local panel development")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "5000")]
    port: u16,

    /// Walk seed; equal seeds produce equal streams
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Inject an error outcome every Nth event (0 disables)
    #[arg(long, default_value = "17")]
    error_every: u64,
}

/// Shared state across connections
struct MockState {
    bts: Vec<BtsLocation>,
    seed: u64,
    error_every: u64,
    requests: AtomicU64,
}

/// xorshift64 - deterministic, dependency-free walk driver
struct XorShift(u64);

impl XorShift {
    fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in [0, bound)
    fn below(&mut self, bound: u64) -> u64 {
        self.next_u64() % bound
    }
}

/// Luhn check digit over a numeric payload
fn luhn_check_digit(digits: &str) -> u32 {
    let mut total = 0u32;
    for (i, c) in digits.chars().rev().enumerate() {
        let d = c.to_digit(10).unwrap_or(0);
        total += if i % 2 == 0 {
            let doubled = d * 2;
            doubled / 10 + doubled % 10
        } else {
            d
        };
    }
    (10 - total % 10) % 10
}

fn gen_imei(rng: &mut XorShift) -> String {
    // 8-digit TAC + 6-digit serial + Luhn check digit
    let tac = 35_000_000 + rng.below(1_000_000);
    let serial = 100_000 + rng.below(900_000);
    let payload = format!("{:08}{:06}", tac, serial);
    format!("{}{}", payload, luhn_check_digit(&payload))
}

fn default_bts() -> Vec<BtsLocation> {
    vec![
        BtsLocation { bts_id: "BTS_1".to_string(), x: 100.0, y: 100.0 },
        BtsLocation { bts_id: "BTS_2".to_string(), x: 300.0, y: 100.0 },
        BtsLocation { bts_id: "BTS_3".to_string(), x: 100.0, y: 300.0 },
        BtsLocation { bts_id: "BTS_4".to_string(), x: 300.0, y: 300.0 },
    ]
}

fn closest_bts(bts: &[BtsLocation], x: f64, y: f64) -> Option<(&BtsLocation, f64)> {
    bts.iter()
        .map(|b| (b, ((b.x - x).powi(2) + (b.y - y).powi(2)).sqrt()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Outcome for one position, tracking the device's serving cell to decide
/// handovers
fn outcome_at(
    state: &MockState,
    serving: &mut Option<String>,
    x: f64,
    y: f64,
    event_no: u64,
) -> ConnectOutcome {
    if state.error_every > 0 && event_no % state.error_every == state.error_every - 1 {
        return ConnectOutcome {
            detail: Some("Connecting to BTS failed".to_string()),
            error: Some("Connect timeout".to_string()),
        };
    }

    match closest_bts(&state.bts, x, y) {
        None => ConnectOutcome {
            detail: Some("No BTS found (at all)".to_string()),
            error: Some("No BTS found".to_string()),
        },
        Some((_, dist)) if dist > SIGNAL_RANGE => ConnectOutcome {
            detail: Some("No BTS found (in signal range)".to_string()),
            error: Some("No BTS found".to_string()),
        },
        Some((bts, _)) => {
            let outcome = match serving {
                Some(prev) if *prev != bts.bts_id => ConnectOutcome {
                    detail: Some(format!("Handover from {} to {}", prev, bts.bts_id)),
                    error: None,
                },
                _ => ConnectOutcome {
                    detail: Some(format!("Connected successfully to {}", bts.bts_id)),
                    error: None,
                },
            };
            *serving = Some(bts.bts_id.clone());
            outcome
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    users: u32,
    events: u32,
}

#[derive(Debug, Deserialize)]
struct ConnectPayload {
    imei: String,
    x: f64,
    y: f64,
    timestamp: String,
    #[serde(default)]
    keepalive: bool,
}

fn now_stamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Simulate the random walks and render the NDJSON body
fn generate_stream(state: &MockState, req: &GenerateRequest) -> String {
    let run = state.requests.fetch_add(1, Ordering::Relaxed);
    let mut rng = XorShift::new(state.seed.wrapping_add(run.wrapping_mul(0x9e37)));

    struct Device {
        imei: String,
        x: f64,
        y: f64,
        serving: Option<String>,
    }

    let mut devices: Vec<Device> = (0..req.users)
        .map(|_| Device {
            imei: gen_imei(&mut rng),
            x: rng.below(PLANE_MAX as u64) as f64,
            y: rng.below(PLANE_MAX as u64) as f64,
            serving: None,
        })
        .collect();

    let mut body = String::new();
    let mut event_no = 0u64;
    for _ in 0..req.events {
        for device in devices.iter_mut() {
            // 30% chance to stay put, otherwise one step in a random
            // direction on each axis
            if rng.below(10) >= 3 {
                device.x = (device.x + rng.below(3) as f64 - 1.0).clamp(0.0, PLANE_MAX);
                device.y = (device.y + rng.below(3) as f64 - 1.0).clamp(0.0, PLANE_MAX);
            }

            let event = SimulationEvent {
                timestamp: now_stamp(),
                imei: simpanel::domain::Imei(device.imei.clone()),
                x: device.x,
                y: device.y,
                response: outcome_at(state, &mut device.serving, device.x, device.y, event_no),
            };
            event_no += 1;

            if let Ok(line) = serde_json::to_string(&event) {
                body.push_str(&line);
                body.push('\n');
            }
        }
    }
    body
}

/// Re-emit uploaded CSV rows as events with freshly computed outcomes
fn replay_stream(state: &MockState, csv: &[u8]) -> String {
    let text = String::from_utf8_lossy(csv);
    let mut body = String::new();
    let mut serving: Option<String> = None;
    let mut event_no = 0u64;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("timestamp") {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() < 4 {
            warn!(line = %line, "replay_row_malformed");
            continue;
        }
        let (Ok(x), Ok(y)) = (fields[2].parse::<f64>(), fields[3].parse::<f64>()) else {
            warn!(line = %line, "replay_row_malformed");
            continue;
        };

        let event = SimulationEvent {
            timestamp: fields[0].to_string(),
            imei: simpanel::domain::Imei(fields[1].to_string()),
            x,
            y,
            response: outcome_at(state, &mut serving, x, y, event_no),
        };
        event_no += 1;

        if let Ok(json) = serde_json::to_string(&event) {
            body.push_str(&json);
            body.push('\n');
        }
    }
    body
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Pull the first file part out of a multipart body
fn extract_multipart_file<'a>(body: &'a [u8], content_type: &str) -> Option<&'a [u8]> {
    let boundary = content_type.split("boundary=").nth(1)?.trim();
    let delimiter = format!("--{}", boundary);

    let start = find_subslice(body, delimiter.as_bytes())?;
    let after_boundary = &body[start + delimiter.len()..];
    let headers_end = find_subslice(after_boundary, b"\r\n\r\n")?;
    let content = &after_boundary[headers_end + 4..];
    let content_end = find_subslice(content, format!("\r\n{}", delimiter).as_bytes())?;
    Some(&content[..content_end])
}

fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn ndjson_response(body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

fn bad_request(message: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::BAD_REQUEST,
        format!(r#"{{"error":"{}"}}"#, message),
    )
}

async fn handle(
    req: Request<Incoming>,
    state: Arc<MockState>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/") => {
            let body = serde_json::to_string(&state.bts).unwrap_or_else(|_| "[]".to_string());
            json_response(StatusCode::OK, body)
        }
        (&Method::POST, "/generate") => {
            let body = req.collect().await?.to_bytes();
            match serde_json::from_slice::<GenerateRequest>(&body) {
                Ok(gen) if gen.users > 0 && gen.events > 0 => {
                    info!(users = gen.users, events = gen.events, "generate_requested");
                    ndjson_response(generate_stream(&state, &gen))
                }
                Ok(_) => bad_request("users and events must be positive"),
                Err(_) => bad_request("invalid generate payload"),
            }
        }
        (&Method::POST, "/replay") => {
            let content_type = req
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();
            let body = req.collect().await?.to_bytes();

            match extract_multipart_file(&body, &content_type) {
                Some(file) => {
                    info!(bytes = file.len(), "replay_requested");
                    ndjson_response(replay_stream(&state, file))
                }
                None => bad_request("multipart field 'file' missing"),
            }
        }
        (&Method::POST, "/connect") => {
            let body = req.collect().await?.to_bytes();
            match serde_json::from_slice::<ConnectPayload>(&body) {
                Ok(payload) => {
                    info!(
                        imei = %payload.imei,
                        x = payload.x,
                        y = payload.y,
                        keepalive = payload.keepalive,
                        timestamp = %payload.timestamp,
                        "connect_requested"
                    );
                    let mut serving = None;
                    let mut outcome =
                        outcome_at(&state, &mut serving, payload.x, payload.y, 0);
                    if payload.keepalive && outcome.error.is_none() {
                        outcome.detail = serving.map(|s| format!("Keepalive acknowledged by {}", s));
                    }
                    let body = serde_json::to_string(&outcome)
                        .unwrap_or_else(|_| "{}".to_string());
                    json_response(StatusCode::OK, body)
                }
                Err(_) => bad_request("invalid connect payload"),
            }
        }
        _ => json_response(StatusCode::NOT_FOUND, r#"{"error":"not found"}"#.to_string()),
    };

    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    let state = Arc::new(MockState {
        bts: default_bts(),
        seed: args.seed,
        error_every: args.error_every,
        requests: AtomicU64::new(0),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, seed = args.seed, "mock_backend_listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            let service = service_fn(move |req| handle(req, state.clone()));
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!(peer = %peer, error = %e, "mock_backend_connection_error");
            }
        });
    }
}
