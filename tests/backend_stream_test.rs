//! Integration tests for the backend client and stream ingestion
//!
//! Each test runs the client against an in-process HTTP server, so the
//! whole path (request shape, status handling, incremental NDJSON
//! decoding) is exercised end to end.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use simpanel::domain::{ConnectRequest, SimulationEvent};
use simpanel::infra::Config;
use simpanel::io::backend::{BackendApi, BackendClient, BackendError};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// (method, path, content-type, body) -> response
type Handler =
    Arc<dyn Fn(Method, String, String, Bytes) -> Response<Full<Bytes>> + Send + Sync>;

async fn spawn_server(handler: Handler) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else { break };
            let handler = handler.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req: Request<Incoming>| {
                    let handler = handler.clone();
                    async move {
                        let method = req.method().clone();
                        let path = req.uri().path().to_string();
                        let content_type = req
                            .headers()
                            .get(header::CONTENT_TYPE)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or("")
                            .to_string();
                        let body = req.collect().await?.to_bytes();
                        Ok::<_, hyper::Error>(handler(method, path, content_type, body))
                    }
                });
                let _ = http1::Builder::new().serve_connection(io, service).await;
            });
        }
    });

    format!("http://{}", addr)
}

fn client_for(base_url: &str) -> BackendClient {
    let config = Config::default().with_base_url(base_url);
    BackendClient::new(&config).unwrap()
}

fn ndjson(status: StatusCode, body: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn event_line(imei: &str, x: f64, y: f64) -> String {
    format!(
        r#"{{"timestamp":"2024-05-01 12:00:00","imei":"{}","x":{},"y":{},"response":{{"detail":"Connected successfully to BTS_1","error":null}}}}"#,
        imei, x, y
    )
}

#[tokio::test]
async fn test_generate_streams_events_in_order() {
    // 2 users x 5 events -> 10 lines
    let mut body = String::new();
    for i in 0..10 {
        body.push_str(&event_line(&format!("{}", 100 + i), i as f64, i as f64));
        body.push('\n');
    }
    let handler: Handler = Arc::new(move |method, path, _ct, req_body| {
        assert_eq!(method, Method::POST);
        assert_eq!(path, "/generate");
        let payload: serde_json::Value = serde_json::from_slice(&req_body).unwrap();
        assert_eq!(payload["users"], 2);
        assert_eq!(payload["events"], 5);
        ndjson(StatusCode::OK, &body)
    });

    let base = spawn_server(handler).await;
    let client = client_for(&base);

    let mut received: Vec<SimulationEvent> = Vec::new();
    let mut sink = |event: SimulationEvent| received.push(event);
    let summary = client.generate(2, 5, &mut sink).await.unwrap();

    assert_eq!(summary.records, 10);
    assert_eq!(summary.malformed, 0);
    assert_eq!(received.len(), 10);
    let imeis: Vec<&str> = received.iter().map(|e| e.imei.as_str()).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("{}", 100 + i)).collect();
    assert_eq!(imeis, expected.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_generate_non_success_fails_before_streaming() {
    let handler: Handler = Arc::new(|_m, _p, _ct, _b| {
        ndjson(StatusCode::INTERNAL_SERVER_ERROR, "ignored\n")
    });
    let base = spawn_server(handler).await;
    let client = client_for(&base);

    let mut received = 0usize;
    let mut sink = |_event: SimulationEvent| received += 1;
    let err = client.generate(1, 1, &mut sink).await.unwrap_err();

    assert!(matches!(err, BackendError::GenerateFailed(status) if status.as_u16() == 500));
    assert_eq!(received, 0);
}

#[tokio::test]
async fn test_generate_skips_malformed_line_and_continues() {
    let body = format!(
        "{}\n{{not json\n\n{}\n",
        event_line("111", 1.0, 1.0),
        event_line("222", 2.0, 2.0)
    );
    let handler: Handler = Arc::new(move |_m, _p, _ct, _b| ndjson(StatusCode::OK, &body));
    let base = spawn_server(handler).await;
    let client = client_for(&base);

    let mut received: Vec<SimulationEvent> = Vec::new();
    let mut sink = |event: SimulationEvent| received.push(event);
    let summary = client.generate(1, 2, &mut sink).await.unwrap();

    assert_eq!(summary.records, 2);
    assert_eq!(summary.malformed, 1);
    assert_eq!(received[1].imei.as_str(), "222");
}

#[tokio::test]
async fn test_replay_uploads_multipart_file_field() {
    let uploaded = "timestamp,imei,x,y\n2024-05-01 12:00:00,111,1,2\n";
    let stream = format!("{}\n", event_line("111", 1.0, 2.0));

    let handler: Handler = Arc::new(move |method, path, content_type, body| {
        assert_eq!(method, Method::POST);
        assert_eq!(path, "/replay");
        assert!(content_type.starts_with("multipart/form-data"));
        let text = String::from_utf8_lossy(&body);
        // Field name and file content travel in the multipart body
        assert!(text.contains("name=\"file\""));
        assert!(text.contains("2024-05-01 12:00:00,111,1,2"));
        ndjson(StatusCode::OK, &stream)
    });

    let base = spawn_server(handler).await;
    let client = client_for(&base);

    let mut received: Vec<SimulationEvent> = Vec::new();
    let mut sink = |event: SimulationEvent| received.push(event);
    let summary = client
        .replay("recorded.csv", uploaded.as_bytes().to_vec(), &mut sink)
        .await
        .unwrap();

    assert_eq!(summary.records, 1);
    assert_eq!(received[0].x, 1.0);
}

#[tokio::test]
async fn test_replay_non_success_status() {
    let handler: Handler =
        Arc::new(|_m, _p, _ct, _b| ndjson(StatusCode::UNPROCESSABLE_ENTITY, ""));
    let base = spawn_server(handler).await;
    let client = client_for(&base);

    let mut sink = |_event: SimulationEvent| {};
    let err = client.replay("x.csv", b"timestamp,imei,x,y\n".to_vec(), &mut sink).await.unwrap_err();
    assert!(matches!(err, BackendError::ReplayFailed(status) if status.as_u16() == 422));
}

#[tokio::test]
async fn test_connect_sends_numeric_coordinates() {
    let handler: Handler = Arc::new(|method, path, _ct, body| {
        assert_eq!(method, Method::POST);
        assert_eq!(path, "/connect");
        let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
        // Numbers on the wire, not strings
        assert!(payload["x"].is_number());
        assert!(payload["y"].is_number());
        assert_eq!(payload["x"], serde_json::json!(12.0));
        assert_eq!(payload["y"], serde_json::json!(7.0));
        assert_eq!(payload["keepalive"], serde_json::json!(true));

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(
                r#"{"detail":"Connected successfully to BTS_2","error":null}"#,
            )))
            .unwrap()
    });

    let base = spawn_server(handler).await;
    let client = client_for(&base);

    let req = ConnectRequest {
        imei: "490154203237518".to_string(),
        x: 12.0,
        y: 7.0,
        timestamp: "2024-05-01 12:00:00".to_string(),
        keepalive: true,
    };
    let event = client.connect_manual(&req).await.unwrap();

    assert_eq!(event.imei.as_str(), "490154203237518");
    assert_eq!(event.x, 12.0);
    assert_eq!(event.y, 7.0);
    assert_eq!(
        event.response.detail.as_deref(),
        Some("Connected successfully to BTS_2")
    );
}

#[tokio::test]
async fn test_connect_non_success_status() {
    let handler: Handler = Arc::new(|_m, _p, _ct, _b| {
        Response::builder()
            .status(StatusCode::BAD_GATEWAY)
            .body(Full::new(Bytes::new()))
            .unwrap()
    });
    let base = spawn_server(handler).await;
    let client = client_for(&base);

    let req = ConnectRequest {
        imei: "1".to_string(),
        x: 0.0,
        y: 0.0,
        timestamp: "2024-05-01 12:00:00".to_string(),
        keepalive: false,
    };
    let err = client.connect_manual(&req).await.unwrap_err();
    assert!(matches!(err, BackendError::ConnectFailed(status) if status.as_u16() == 502));
}

#[tokio::test]
async fn test_bts_locations_fetch() {
    let handler: Handler = Arc::new(|method, path, _ct, _b| {
        assert_eq!(method, Method::GET);
        assert_eq!(path, "/");
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(
                r#"[{"bts_id":"BTS_1","x":100.0,"y":100.0},{"bts_id":"BTS_2","x":300.0,"y":100.0}]"#,
            )))
            .unwrap()
    });
    let base = spawn_server(handler).await;
    let client = client_for(&base);

    let locations = client.bts_locations().await.unwrap();
    assert_eq!(locations.len(), 2);
    assert_eq!(locations[0].bts_id, "BTS_1");
    assert_eq!(locations[1].x, 300.0);
}

/// Raw chunked HTTP server: chunk boundaries fall mid-line and inside a
/// multibyte character, and the final line has no newline before the stream
/// ends.
#[tokio::test]
async fn test_chunked_stream_split_mid_line_and_mid_character() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let line1 = event_line("111", 1.0, 1.0);
    let line2 = r#"{"timestamp":"2024-05-01 12:00:01","imei":"222","x":2,"y":2,"response":{"detail":"Handover → BTS_2","error":null}}"#;
    // Trailing partial record: must be discarded, not parsed
    let partial = r#"{"timestamp":"2024-05-01 12:00:02","imei":"333""#;

    let full = format!("{}\n{}\n{}", line1, line2, partial);
    let bytes = full.clone().into_bytes();
    // Split inside line1, then inside the UTF-8 arrow of line2
    let arrow_pos = full.find('→').unwrap() + 1; // one byte into the 3-byte arrow
    let cuts = [40usize, arrow_pos, bytes.len()];

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        // Read until the request head is complete; the body is irrelevant
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&buf[..n]);
        }

        stream
            .write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\n\r\n",
            )
            .await
            .unwrap();

        let mut start = 0usize;
        for cut in cuts {
            let chunk = &bytes[start..cut];
            start = cut;
            stream
                .write_all(format!("{:x}\r\n", chunk.len()).as_bytes())
                .await
                .unwrap();
            stream.write_all(chunk).await.unwrap();
            stream.write_all(b"\r\n").await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        stream.write_all(b"0\r\n\r\n").await.unwrap();
        stream.flush().await.unwrap();
    });

    let client = client_for(&format!("http://{}", addr));

    let mut received: Vec<SimulationEvent> = Vec::new();
    let mut sink = |event: SimulationEvent| received.push(event);
    let summary = client.generate(1, 2, &mut sink).await.unwrap();

    assert_eq!(summary.records, 2);
    assert_eq!(summary.malformed, 0);
    assert_eq!(received[0].imei.as_str(), "111");
    assert_eq!(received[1].imei.as_str(), "222");
    assert_eq!(received[1].response.detail.as_deref(), Some("Handover → BTS_2"));
}
