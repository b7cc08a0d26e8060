//! Chunked transfer of large responses.
//!
//! The payload is cut into pieces of at most `chunk_size` bytes, each piece
//! is written newline-terminated to the raw stream with a short pause after
//! it, and a final `[END]` line marks completion. There is no length prefix
//! and no checksum: a receiver detects a truncated transfer only by the
//! missing sentinel.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::TransportError;
use crate::sleeper::{RealSleeper, Sleeper};

pub const END_SENTINEL: &str = "[END]";

/// Splits `text` into pieces of at most `chunk_size` bytes.
///
/// Cuts land on the last `char` boundary at or below the limit, so a UTF-8
/// sequence is never split. A single character wider than `chunk_size` is
/// emitted on its own.
pub fn split_chunks(text: &str, chunk_size: usize) -> impl Iterator<Item = &str> {
    let chunk_size = chunk_size.max(1);
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let mut end = chunk_size.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(chunk)
    })
}

/// True if sending `chunk` would put a bare sentinel line on the wire.
///
/// Payloads carry their own newlines, so any line inside the chunk counts,
/// including a trailing fragment that the chunk terminator completes.
fn collides_with_sentinel(chunk: &str) -> bool {
    chunk
        .split('\n')
        .any(|line| line.trim_end_matches('\r') == END_SENTINEL)
}

#[derive(Clone)]
pub struct ChunkedTransport {
    chunk_size: usize,
    delay: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl ChunkedTransport {
    pub fn new(chunk_size: usize, delay: Duration) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            delay,
            sleeper: Arc::new(RealSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Writes every chunk and the sentinel, returning the number of data chunks.
    ///
    /// The first failed write abandons the rest of the transfer, sentinel
    /// included.
    pub fn send<W: Write + ?Sized>(&self, out: &mut W, text: &str) -> Result<usize, TransportError> {
        let mut sent = 0;
        for chunk in split_chunks(text, self.chunk_size) {
            if collides_with_sentinel(chunk) {
                warn!(chunk = sent, "Chunk content is indistinguishable from the end sentinel");
            }
            out.write_all(chunk.as_bytes())?;
            out.write_all(b"\n")?;
            out.flush()?;
            sent += 1;
            debug!(chunk = sent, len = chunk.len(), "Chunk sent");
            self.sleeper.sleep(self.delay);
        }

        out.write_all(END_SENTINEL.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()?;
        debug!(chunks = sent, "Chunked transfer complete");
        Ok(sent)
    }
}
