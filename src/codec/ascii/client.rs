// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus ASCII client (master) specific functions.
use super::*;
use crate::frame::rtu::{Header, RequestAdu, ResponseAdu};

/// Encode an ASCII request.
pub fn encode_request(adu: RequestAdu, buf: &mut [u8]) -> Result<usize> {
    let RequestAdu { hdr, pdu } = adu;
    let mut pdu_buf = [0u8; rtu::MAX_FRAME_LEN];
    let len = pdu.encode(&mut pdu_buf)?;
    encode_frame(hdr.slave, &pdu_buf[..len], buf)
}

/// Decode an ASCII response out of a complete (`:`- and CR-LF-delimited)
/// frame, hex-decoding and LRC-checking it into `scratch`.
pub fn decode_response<'t>(buf: &[u8], scratch: &'t mut [u8]) -> Result<Option<ResponseAdu<'t>>> {
    let Some(DecodedFrame { slave, pdu }) = decode_frame(buf, scratch)? else {
        return Ok(None);
    };
    let hdr = Header { slave };
    let response = ExceptionResponse::try_from(pdu)
        .map(|er| ResponsePdu(Err(er)))
        .or_else(|_| Response::try_from(pdu).map(|r| ResponsePdu(Ok(r))))?;
    Ok(Some(ResponseAdu { hdr, pdu: response }))
}
