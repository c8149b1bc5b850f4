// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Framed I/O: assembling whole frames out of a byte-oriented [`Transport`]
//! under a deadline.
//!
//! Two strategies are implemented, matching the two framing styles this
//! crate supports:
//! - length-driven (RTU, TCP): read a fixed-size header that exposes the
//!   total frame size, then read the remainder.
//! - delimiter-driven (ASCII): read bytes until a trailing delimiter
//!   sequence is seen.
//!
//! Receiver state, per the crate's frame-assembly contract, moves through
//! `AwaitingHeader -> AwaitingBody -> FrameReady`, or bails out to
//! `Timeout`/`Error` from either phase.

use std::thread;
use std::time::{Duration, Instant};

use crate::transport::Transport;

/// How long the driver sleeps between polls when the transport reports no
/// data ready.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Why a framed read did not produce a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// The deadline elapsed before the frame completed.
    Timeout,
    /// The transport reported a hard error.
    Transport,
}

/// Read a length-driven frame: first accumulate `header_len` bytes, then
/// call `total_len` on the header to learn the full frame size, then read
/// the remainder. Used by RTU (per-function-code minimum) and TCP (the
/// fixed 7-byte MBAP header).
pub fn read_length_driven<T: Transport>(
    transport: &mut T,
    header_len: usize,
    deadline: Duration,
    total_len: impl Fn(&[u8]) -> Option<usize>,
) -> Result<Vec<u8>, ReadError> {
    let start = Instant::now();
    let mut buf = vec![0u8; header_len];
    read_until(transport, &mut buf, 0, header_len, start, deadline)?;

    let Some(total) = total_len(&buf) else {
        return Err(ReadError::Transport);
    };
    buf.resize(total, 0);
    if total > header_len {
        read_until(transport, &mut buf, header_len, total, start, deadline)?;
    }
    Ok(buf)
}

/// Read a delimiter-driven frame: accumulate bytes until `delimiter` is
/// seen as a trailing sequence, or the deadline expires. Used by ASCII
/// (delimiter is CR LF).
pub fn read_delimiter_driven<T: Transport>(
    transport: &mut T,
    delimiter: &[u8],
    deadline: Duration,
) -> Result<Vec<u8>, ReadError> {
    let start = Instant::now();
    let mut buf = Vec::new();
    let mut chunk = [0u8; 64];
    loop {
        if buf.len() >= delimiter.len() && buf[buf.len() - delimiter.len()..] == *delimiter {
            return Ok(buf);
        }
        if start.elapsed() >= deadline {
            return Err(ReadError::Timeout);
        }
        if !transport.has_data() {
            thread::sleep(POLL_INTERVAL);
            continue;
        }
        match transport.read(&mut chunk) {
            Some(0) => thread::sleep(POLL_INTERVAL),
            Some(n) => buf.extend_from_slice(&chunk[..n]),
            None => return Err(ReadError::Transport),
        }
    }
}

fn read_until<T: Transport>(
    transport: &mut T,
    buf: &mut [u8],
    mut filled: usize,
    target: usize,
    start: Instant,
    deadline: Duration,
) -> Result<(), ReadError> {
    while filled < target {
        if start.elapsed() >= deadline {
            return Err(ReadError::Timeout);
        }
        if !transport.has_data() {
            thread::sleep(POLL_INTERVAL);
            continue;
        }
        match transport.read(&mut buf[filled..target]) {
            Some(0) => thread::sleep(POLL_INTERVAL),
            Some(n) => filled += n,
            None => return Err(ReadError::Transport),
        }
    }
    Ok(())
}
