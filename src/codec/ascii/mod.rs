// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus ASCII
//!
//! ASCII framing carries the same slave-addressed PDU as RTU, hex-encoded
//! between a leading `:` and a trailing CR LF, with a longitudinal
//! redundancy check (LRC) in place of RTU's CRC. [`encode_frame`] and
//! [`decode_frame`] do the framing; everything above that (the PDU itself)
//! is decoded and encoded exactly as RTU does it, via [`rtu::DecodedFrame`].

use super::*;
use crate::codec::rtu::{self, DecodedFrame};
use crate::frame::rtu::SlaveId;

pub mod client;
pub mod server;

// ':' + hex(slave + PDU, up to RTU's 254-byte ADU) + hex(lrc) + CR LF
pub const MAX_FRAME_LEN: usize = 1 + (rtu::MAX_FRAME_LEN - 2) * 2 + 2 + 2;

pub const DELIMITER: &[u8] = b"\r\n";

/// The two's-complement LRC over `data`: negate the wrapping sum of every
/// byte, so that the sum of `data` followed by its own LRC wraps to zero.
#[must_use]
pub fn lrc(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    0u8.wrapping_sub(sum)
}

fn hex_nibble(value: u8) -> u8 {
    match value {
        0..=9 => b'0' + value,
        _ => b'A' + (value - 10),
    }
}

fn hex_byte(hi: u8, lo: u8) -> Result<u8> {
    Ok(hex_value(hi)? << 4 | hex_value(lo)?)
}

fn hex_value(digit: u8) -> Result<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        _ => Err(Error::NotHex(digit)),
    }
}

fn write_hex_byte(byte: u8, out: &mut [u8]) {
    out[0] = hex_nibble(byte >> 4);
    out[1] = hex_nibble(byte & 0x0F);
}

/// Encode `slave | pdu` as a complete ASCII frame: `:`, the hex-encoded
/// bytes, the hex-encoded LRC, then CR LF.
pub fn encode_frame(slave: SlaveId, pdu: &[u8], buf: &mut [u8]) -> Result<usize> {
    let adu_len = 1 + pdu.len();
    let frame_len = 1 + adu_len * 2 + 2 + 2;
    if buf.len() < frame_len {
        return Err(Error::BufferSize);
    }
    buf[0] = b':';
    let mut pos = 1;
    write_hex_byte(slave, &mut buf[pos..pos + 2]);
    pos += 2;
    for &byte in pdu {
        write_hex_byte(byte, &mut buf[pos..pos + 2]);
        pos += 2;
    }
    let mut lrc_sum = slave;
    for &byte in pdu {
        lrc_sum = lrc_sum.wrapping_add(byte);
    }
    write_hex_byte(0u8.wrapping_sub(lrc_sum), &mut buf[pos..pos + 2]);
    pos += 2;
    buf[pos] = b'\r';
    buf[pos + 1] = b'\n';
    Ok(frame_len)
}

/// Decode a complete ASCII frame (leading `:`, trailing CR LF already
/// present in `buf`) into the slave id and PDU bytes, hex-decoded and
/// LRC-checked into `target`.
pub fn decode_frame<'t>(buf: &[u8], target: &'t mut [u8]) -> Result<Option<DecodedFrame<'t>>> {
    if buf.len() < 3 {
        return Ok(None);
    }
    if buf[0] != b':' {
        return Err(Error::MissingColon);
    }
    if !buf.ends_with(DELIMITER) {
        return Err(Error::MissingTrailer);
    }
    let hex = &buf[1..buf.len() - 2];
    if hex.len() % 2 != 0 {
        return Err(Error::OddHexLen);
    }
    // one of the decoded bytes is the trailing LRC, not part of the ADU
    let Some(adu_len) = (hex.len() / 2).checked_sub(1) else {
        return Err(Error::BufferSize);
    };
    if adu_len < 1 || target.len() < adu_len {
        return Err(Error::BufferSize);
    }
    for i in 0..adu_len {
        target[i] = hex_byte(hex[2 * i], hex[2 * i + 1])?;
    }
    let expected_lrc = hex_byte(hex[2 * adu_len], hex[2 * adu_len + 1])?;
    let actual_lrc = lrc(&target[..adu_len]);
    if expected_lrc != actual_lrc {
        return Err(Error::Lrc(expected_lrc, actual_lrc));
    }
    let slave = target[0];
    let pdu = &target[1..adu_len];
    Ok(Some(DecodedFrame { slave, pdu }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lrc_of_empty_is_zero() {
        assert_eq!(lrc(&[]), 0);
    }

    #[test]
    fn lrc_makes_the_checksum_wrap_to_zero() {
        let data = &[0x01, 0x03, 0x00, 0x00, 0x00, 0x02];
        let checksum = lrc(data);
        let total = data.iter().fold(checksum, |acc, &b| acc.wrapping_add(b));
        assert_eq!(total, 0);
    }

    #[test]
    fn encode_write_single_register_request() {
        let mut buf = [0u8; MAX_FRAME_LEN];
        let pdu = &[0x06, 0x00, 0x10, 0x00, 0x2A];
        let len = encode_frame(0x11, pdu, &mut buf).unwrap();
        assert_eq!(&buf[..len], b":11060010002AAF\r\n");
    }

    #[test]
    fn encode_then_decode_round_trip() {
        let mut encoded = [0u8; MAX_FRAME_LEN];
        let pdu = &[0x03, 0x00, 0x00, 0x00, 0x02];
        let len = encode_frame(0x11, pdu, &mut encoded).unwrap();
        assert_eq!(encoded[0], b':');
        assert!(encoded[..len].ends_with(DELIMITER));

        let mut decoded = [0u8; 32];
        let frame = decode_frame(&encoded[..len], &mut decoded).unwrap().unwrap();
        assert_eq!(frame.slave, 0x11);
        assert_eq!(frame.pdu, pdu);
    }

    #[test]
    fn decode_rejects_missing_colon() {
        let mut decoded = [0u8; 32];
        let err = decode_frame(b"110600100\r\n", &mut decoded).unwrap_err();
        assert_eq!(err, Error::MissingColon);
    }

    #[test]
    fn decode_rejects_missing_trailer() {
        let mut decoded = [0u8; 32];
        let err = decode_frame(b":1106001000", &mut decoded).unwrap_err();
        assert_eq!(err, Error::MissingTrailer);
    }

    #[test]
    fn decode_rejects_odd_hex_length() {
        let mut decoded = [0u8; 32];
        let err = decode_frame(b":11060\r\n", &mut decoded).unwrap_err();
        assert_eq!(err, Error::OddHexLen);
    }

    #[test]
    fn decode_rejects_non_hex_digit() {
        let mut decoded = [0u8; 32];
        let err = decode_frame(b":11GG\r\n", &mut decoded).unwrap_err();
        assert_eq!(err, Error::NotHex(b'G'));
    }

    #[test]
    fn decode_rejects_bad_lrc() {
        let mut decoded = [0u8; 32];
        let err = decode_frame(b":1106001000FF\r\n", &mut decoded).unwrap_err();
        assert!(matches!(err, Error::Lrc(_, _)));
    }
}
