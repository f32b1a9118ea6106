//! Incremental NDJSON stream decoding
//!
//! The backend streams one JSON record per line. Chunk boundaries fall
//! wherever the network puts them, so a record may arrive split across
//! several chunks (including mid-character). The decoder accumulates bytes,
//! emits a record per complete non-blank line, and keeps the trailing
//! partial line buffered for the next feed.
//!
//! A line that fails to decode is logged and skipped; it never aborts the
//! stream. A partial line still buffered when the stream ends is discarded.

use crate::domain::SimulationEvent;
use bytes::{Buf, BytesMut};
use tracing::warn;

/// Streaming decoder state: a buffered line prefix plus a malformed-line count
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    buf: BytesMut,
    malformed: u64,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self { buf: BytesMut::with_capacity(4096), malformed: 0 }
    }

    /// Feed one chunk of the response body, returning every record completed
    /// by it, in stream order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SimulationEvent> {
        self.buf.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line = self.buf.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match serde_json::from_slice::<SimulationEvent>(&line) {
                Ok(event) => out.push(event),
                Err(e) => {
                    self.malformed += 1;
                    warn!(
                        error = %e,
                        line_len = line.len(),
                        "stream_record_malformed"
                    );
                }
            }
        }
        out
    }

    /// Stream ended: an incomplete trailing line is not a record
    pub fn finish(&mut self) {
        if !self.buf.is_empty() {
            warn!(bytes = self.buf.len(), "stream_partial_line_discarded");
            self.buf.advance(self.buf.len());
        }
    }

    /// Number of lines skipped because they failed to decode
    pub fn malformed(&self) -> u64 {
        self.malformed
    }
}
