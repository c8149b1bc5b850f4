//! Modbus TCP server (slave) specific functions.
use super::*;

/// Decode an TCP request.
pub fn decode_request(buf: &[u8]) -> Result<Option<RequestAdu>> {
    decode(DecoderType::Request, buf)
        .and_then(|frame| {
            if let Some((
                DecodedFrame {
                    transaction_id,
                    unit_id,
                    pdu,
                },
                _frame_pos,
            )) = frame
            {
                let hdr = Header {
                    transaction_id,
                    unit_id,
                };
                // Decoding of the PDU should are unlikely to fail due
                // to transmission errors, because the frame's bytes
                // have already been verified at the TCP level.
                Request::try_from(pdu)
                    .map(RequestPdu)
                    .map(|pdu| Some(RequestAdu { hdr, pdu }))
                    .map_err(|err| {
                        // Unrecoverable error
                        error!("Failed to decode request PDU: {}", err);
                        err
                    })
            } else {
                Ok(None)
            }
        })
        .or_else(|error| Err(error))
}

/// Encode an TCP response.
pub fn encode_response(adu: ResponseAdu, buf: &mut [u8]) -> Result<usize> {
    let ResponseAdu { hdr, pdu } = adu;
    if buf.len() < 2 {
        return Err(Error::BufferSize);
    }
    BigEndian::write_u16(&mut buf[0..2], hdr.transaction_id);
    BigEndian::write_u16(&mut buf[2..4], 0); //MODBUS Protocol
    buf[6] = hdr.unit_id;
    let len = pdu.encode(&mut buf[7..])?;
    if buf.len() < len + 7 {
        return Err(Error::BufferSize);
    }
    BigEndian::write_u16(&mut buf[4..6], (len + 1) as u16);

    Ok(len + 7)
}
