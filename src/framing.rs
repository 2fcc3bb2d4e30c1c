//! Line framing and response assembly for the makuosan control protocol.
//!
//! The daemon speaks a prompt-delimited text protocol over its Unix
//! control socket:
//!
//! ```text
//! client:  send -r -t web htdocs/index.html\r\n
//! daemon:  htdocs/index.html\r\n
//!          (1 directories and 1 files)\r\n
//!          >·                                 <- two bytes, no newline
//! ```
//!
//! A response is a run of newline-terminated lines followed by the
//! two-character prompt `"> "` sent *without* a trailing newline. The
//! transport delivers bytes in arbitrary-sized chunks, so [`ResponseDecoder`]
//! accumulates partial lines across reads and recognizes the prompt only in
//! the unterminated buffer remainder. A line that merely *starts* with
//! `"> "` is ordinary output.
//!
//! Lines beginning with `error:` are daemon-level failure reports. One of
//! them fails the whole cycle: accumulated output is discarded, the decoder
//! keeps consuming through the terminating prompt so the stream stays
//! aligned on a response boundary, and the caller gets
//! [`ClientError::Daemon`].
//!
//! Rust guideline compliant 2026-02

use std::io::{ErrorKind, Read};

use crate::error::{ClientError, Result};

/// Transport read chunk size.
///
/// Small on purpose: responses are a handful of short text lines, and a
/// small chunk keeps the reassembly path exercised.
const READ_CHUNK: usize = 512;

/// The two-byte end-of-response marker, sent without a trailing newline.
const PROMPT: &[u8] = b"> ";

/// Marker prefix of daemon-level error report lines.
const ERROR_PREFIX: &[u8] = b"error:";

// ─── Decoder ────────────────────────────────────────────────────────────────

/// Incremental decoder for prompt-delimited responses.
///
/// Feed raw transport bytes with [`ResponseDecoder::feed`]; a completed
/// response body comes out once the prompt is seen, partial data is retained
/// for the next call. State is reset at the start of every cycle so an
/// aborted response never leaks bytes into the next one.
#[derive(Debug, Default)]
pub struct ResponseDecoder {
    /// Bytes read but not yet split into a complete line.
    buf: Vec<u8>,
    /// Normal-output lines accumulated since the last prompt.
    body: Vec<u8>,
    /// First `error:` line seen this cycle, marker stripped.
    error: Option<String>,
}

impl ResponseDecoder {
    /// Create a decoder with empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and check for response completion.
    ///
    /// Splits off every newline-terminated line, trims trailing whitespace
    /// (including the `\r` of CRLF endings), and classifies it. Returns
    /// `Ok(Some(body))` once the unterminated remainder equals the prompt,
    /// `Ok(None)` while more data is needed.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Daemon`] at the prompt boundary when any line
    /// of the cycle carried the `error:` marker.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Option<String>> {
        self.buf.extend_from_slice(bytes);

        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            while line.last().is_some_and(|b| b.is_ascii_whitespace()) {
                line.pop();
            }

            if let Some(rest) = line.strip_prefix(ERROR_PREFIX) {
                // First error wins; the rest of the cycle is discarded but
                // still consumed so the next command starts on a prompt
                // boundary.
                if self.error.is_none() {
                    self.error =
                        Some(String::from_utf8_lossy(trim_leading_ws(rest)).into_owned());
                    self.body.clear();
                }
            } else if self.error.is_none() {
                self.body.extend_from_slice(&line);
                self.body.push(b'\n');
            }
        }

        // The prompt arrives with no trailing newline, so it only ever shows
        // up as the exact unterminated remainder, never as a line above.
        if self.buf.as_slice() == PROMPT {
            self.buf.clear();
            let body = std::mem::take(&mut self.body);
            return match self.error.take() {
                Some(message) => Err(ClientError::Daemon(message)),
                None => Ok(Some(String::from_utf8_lossy(&body).into_owned())),
            };
        }

        Ok(None)
    }

    /// Run one full response cycle against `transport`.
    ///
    /// Clears per-cycle state, then reads chunks of up to [`READ_CHUNK`]
    /// bytes until the prompt is observed.
    ///
    /// # Errors
    ///
    /// - [`ClientError::ConnectionClosed`] - the peer closed mid-response
    ///   (zero-byte read).
    /// - [`ClientError::Timeout`] - the transport read deadline expired.
    /// - [`ClientError::Daemon`] - the response carried an `error:` line.
    /// - [`ClientError::Io`] - any other transport failure.
    pub fn read_response(&mut self, transport: &mut impl Read) -> Result<String> {
        self.reset();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = match transport.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(ClientError::Timeout);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(ClientError::Io(e)),
            };
            if n == 0 {
                return Err(ClientError::ConnectionClosed);
            }
            if let Some(body) = self.feed(&chunk[..n])? {
                return Ok(body);
            }
        }
    }

    /// True while undelivered bytes or lines are buffered mid-cycle.
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty() || !self.body.is_empty() || self.error.is_some()
    }

    /// Clear all per-cycle state.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.body.clear();
        self.error = None;
    }
}

fn trim_leading_ws(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

// ─── Tests ──────────────────────────────────────────────────────────────────
