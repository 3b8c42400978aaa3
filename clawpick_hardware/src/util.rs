use std::time::{Duration, Instant};

use crate::error::Result;

/// Accumulates raw serial bytes and hands out complete lines.
///
/// Bytes after the first newline stay buffered for the next call, so a
/// device that answers in bursts never loses a partial line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Pop the next complete line, trimmed. Invalid UTF-8 is replaced.
    pub fn take_line(&mut self) -> Option<String> {
        let pos = self.pending.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=pos).collect();
        Some(String::from_utf8_lossy(&raw).trim().to_string())
    }

    /// Pull chunks through `read_chunk` until a full line is available or
    /// `timeout` expires. `read_chunk` must not block; returning 0 means
    /// "nothing yet" and the loop sleeps for `poll_interval`.
    pub fn read_line_with_timeout(
        &mut self,
        mut read_chunk: impl FnMut(&mut [u8]) -> Result<usize>,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 64];
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            let n = read_chunk(&mut chunk)?;
            if n > 0 {
                self.push(&chunk[..n]);
                continue;
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            std::thread::sleep(poll_interval);
        }
    }
}
