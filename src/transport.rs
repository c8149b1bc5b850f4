// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The byte-level transport capability that the server and client are built
//! on. Concrete transports (serial, TCP sockets) are external collaborators;
//! this module only defines the trait they implement and ships an
//! in-memory transport for tests.

/// Read/write/flush/availability capability consumed by the framed I/O
/// driver and, through it, by [`crate::Server`] and [`crate::Client`].
///
/// Mirrors a POSIX-style non-blocking byte stream: `read` returns the
/// number of bytes actually read (`0` means "no data ready right now",
/// not EOF), and `write` returning less than the buffer's length is
/// treated as an error by callers.
pub trait Transport {
    /// Read up to `buf.len()` bytes. Returns the number of bytes read, or
    /// `None` on a hard transport error.
    fn read(&mut self, buf: &mut [u8]) -> Option<usize>;

    /// Write all of `buf`. Returns `true` iff every byte was accepted.
    fn write(&mut self, buf: &[u8]) -> bool;

    /// Flush any buffered output.
    fn flush(&mut self) -> bool;

    /// Best-effort hint: would a `read` right now return at least one byte?
    fn has_data(&self) -> bool;

    /// Best-effort hint: how many bytes are currently available to read.
    fn available_bytes(&self) -> usize;
}

/// An in-memory [`Transport`], driven by pre-loading the bytes a peer is
/// expected to read and inspecting the bytes a peer wrote. The vehicle for
/// every integration-style test in this crate.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    read_buffer: Vec<u8>,
    read_pos: usize,
    write_buffer: Vec<u8>,
}

impl MemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the bytes that subsequent `read` calls will hand out.
    pub fn set_read_data(&mut self, data: &[u8]) {
        self.read_buffer = data.to_vec();
        self.read_pos = 0;
    }

    /// The bytes accumulated across all `write` calls so far.
    #[must_use]
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    pub fn clear_write_buffer(&mut self) {
        self.write_buffer.clear();
    }

    pub fn reset_read_position(&mut self) {
        self.read_pos = 0;
    }
}

impl Transport for MemoryTransport {
    fn read(&mut self, buf: &mut [u8]) -> Option<usize> {
        if self.read_pos >= self.read_buffer.len() {
            return Some(0);
        }
        let n = buf.len().min(self.read_buffer.len() - self.read_pos);
        buf[..n].copy_from_slice(&self.read_buffer[self.read_pos..self.read_pos + n]);
        self.read_pos += n;
        Some(n)
    }

    fn write(&mut self, buf: &[u8]) -> bool {
        self.write_buffer.extend_from_slice(buf);
        true
    }

    fn flush(&mut self) -> bool {
        true
    }

    fn has_data(&self) -> bool {
        self.read_pos < self.read_buffer.len()
    }

    fn available_bytes(&self) -> usize {
        self.read_buffer.len() - self.read_pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_preloaded_bytes() {
        let mut t = MemoryTransport::new();
        t.set_read_data(&[1, 2, 3, 4]);
        let mut buf = [0u8; 2];
        assert_eq!(t.read(&mut buf), Some(2));
        assert_eq!(buf, [1, 2]);
        assert!(t.has_data());
        assert_eq!(t.available_bytes(), 2);
    }

    #[test]
    fn read_past_end_returns_zero() {
        let mut t = MemoryTransport::new();
        t.set_read_data(&[1]);
        let mut buf = [0u8; 4];
        assert_eq!(t.read(&mut buf), Some(1));
        assert_eq!(t.read(&mut buf), Some(0));
        assert!(!t.has_data());
    }

    #[test]
    fn write_accumulates_and_clears() {
        let mut t = MemoryTransport::new();
        assert!(t.write(&[1, 2]));
        assert!(t.write(&[3]));
        assert_eq!(t.written_data(), &[1, 2, 3]);
        t.clear_write_buffer();
        assert!(t.written_data().is_empty());
    }

    #[test]
    fn reset_read_position_replays_data() {
        let mut t = MemoryTransport::new();
        t.set_read_data(&[9, 8]);
        let mut buf = [0u8; 2];
        t.read(&mut buf).unwrap();
        assert!(!t.has_data());
        t.reset_read_position();
        assert!(t.has_data());
        assert_eq!(t.read(&mut buf), Some(2));
        assert_eq!(buf, [9, 8]);
    }
}
