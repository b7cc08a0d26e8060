use std::io::{BufRead, Read};

use crate::error::TransportError;

/// Reads newline-delimited lines, refusing any single line above `max_bytes`.
pub struct LineReader<R> {
    inner: R,
    max_bytes: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R, max_bytes: usize) -> Self {
        Self { inner, max_bytes }
    }

    /// Next line without its terminator, or `None` at end of stream.
    ///
    /// Invalid UTF-8 is replaced rather than rejected so one bad byte never
    /// costs the connection.
    pub fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        let mut buf = Vec::new();
        let limit = self.max_bytes as u64 + 1;
        let n = (&mut self.inner).take(limit).read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        } else if n as u64 >= limit {
            return Err(TransportError::LineTooLong {
                max_bytes: self.max_bytes,
            });
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}
