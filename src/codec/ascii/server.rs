// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus ASCII server (slave) specific functions.
use super::*;
use crate::frame::rtu::{Header, RequestAdu, ResponseAdu};

/// Decode an ASCII request out of a complete (`:`- and CR-LF-delimited)
/// frame, hex-decoding and LRC-checking it into `scratch`.
pub fn decode_request<'t>(buf: &[u8], scratch: &'t mut [u8]) -> Result<Option<RequestAdu<'t>>> {
    let Some(DecodedFrame { slave, pdu }) = decode_frame(buf, scratch)? else {
        return Ok(None);
    };
    let hdr = Header { slave };
    Request::try_from(pdu)
        .map(RequestPdu)
        .map(|pdu| Some(RequestAdu { hdr, pdu }))
}

/// Encode an ASCII response.
pub fn encode_response(adu: ResponseAdu<'_>, buf: &mut [u8]) -> Result<usize> {
    let ResponseAdu { hdr, pdu } = adu;
    let mut pdu_buf = [0u8; rtu::MAX_FRAME_LEN];
    let len = pdu.encode(&mut pdu_buf)?;
    encode_frame(hdr.slave, &pdu_buf[..len], buf)
}
