// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The client (master) side of a Modbus conversation.
//!
//! [`Client`] sends one request at a time and waits for the matching
//! response, over an RTU, ASCII or TCP [`Transport`]. One method per
//! function code mirrors the server's dispatcher one-for-one; `read_floats`/
//! `write_floats` layer a 32-bit float view on top of `ReadHoldingRegisters`/
//! `WriteMultipleRegisters`.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::codec::{ascii, rtu, tcp};
use crate::error::Error;
use crate::frame::*;
use crate::io::{self, ReadError};
use crate::transport::Transport;
use crate::wire_format::{self, FloatCountSemantics, WireFormatOptions};

/// A reasonable default when the caller does not configure one: long enough
/// for a serial round trip at low baud rates, short enough not to wedge a
/// caller forever on a dead link.
const DEFAULT_DEADLINE: Duration = Duration::from_millis(1000);

/// Upper bound on an encoded request ADU, covering the RTU framing
/// (slave + PDU + CRC), the TCP framing (MBAP header + PDU), and the
/// hex-doubled ASCII framing (`:` + hex(slave + PDU) + hex(LRC) + CR LF).
const MAX_ADU_LEN: usize = ascii::MAX_FRAME_LEN;

/// Which framing a [`Client`] speaks, and the addressing it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Rtu { slave: rtu::SlaveId },
    Ascii { slave: rtu::SlaveId },
    Tcp { unit_id: tcp::UnitId },
}

/// Everything that can go wrong sending a request and waiting for its
/// response. Distinct from [`Error`] (wire-level framing failures) and
/// [`Exception`] (the server explicitly rejected the request).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientError {
    /// No (complete) response arrived before the deadline.
    Timeout,
    /// The transport reported a hard read or write error.
    Transport,
    /// The request or response failed to encode/decode.
    Codec(Error),
    /// The server replied with an exception.
    Exception(Exception),
    /// A TCP response carried a transaction id other than the one sent.
    UnexpectedTransactionId,
    /// The server's response was not of the kind this request expects.
    UnexpectedResponse,
    /// An argument is out of range for the call (e.g. an empty float read).
    InvalidArgument,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out waiting for a response"),
            Self::Transport => write!(f, "transport error"),
            Self::Codec(err) => write!(f, "{err}"),
            Self::Exception(ex) => write!(f, "{ex}"),
            Self::UnexpectedTransactionId => write!(f, "response transaction id did not match"),
            Self::UnexpectedResponse => write!(f, "unexpected response for this request"),
            Self::InvalidArgument => write!(f, "invalid argument"),
        }
    }
}

impl From<ReadError> for ClientError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Timeout => Self::Timeout,
            ReadError::Transport => Self::Transport,
        }
    }
}

impl From<Error> for ClientError {
    fn from(err: Error) -> Self {
        Self::Codec(err)
    }
}

/// Communication event log returned by `GetCommEventLog` (FC 12). The raw
/// `events` bytes are returned as-is; this crate does not interpret them
/// beyond what the server already recorded them as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommEventLog {
    pub status: u16,
    pub event_count: u16,
    pub message_count: u16,
    pub events: Vec<u8>,
}

/// A Modbus master: one request in flight at a time, over one [`Transport`].
pub struct Client<T: Transport> {
    transport: T,
    protocol: Protocol,
    pub wire_format: WireFormatOptions,
    next_transaction_id: tcp::TransactionId,
    deadline: Duration,
}

impl<T: Transport> Client<T> {
    /// Build a client that addresses a single RTU slave. `slave == 0` means
    /// every write is a broadcast: sent, never acknowledged.
    #[must_use]
    pub fn rtu(transport: T, slave: rtu::SlaveId) -> Self {
        Self {
            transport,
            protocol: Protocol::Rtu { slave },
            wire_format: WireFormatOptions::default(),
            next_transaction_id: 1,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Build a client that addresses a single ASCII slave. `slave == 0`
    /// means every write is a broadcast: sent, never acknowledged.
    #[must_use]
    pub fn ascii(transport: T, slave: rtu::SlaveId) -> Self {
        Self {
            transport,
            protocol: Protocol::Ascii { slave },
            wire_format: WireFormatOptions::default(),
            next_transaction_id: 1,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Build a client that addresses a single TCP unit.
    #[must_use]
    pub fn tcp(transport: T, unit_id: tcp::UnitId) -> Self {
        Self {
            transport,
            protocol: Protocol::Tcp { unit_id },
            wire_format: WireFormatOptions::default(),
            next_transaction_id: 1,
            deadline: DEFAULT_DEADLINE,
        }
    }

    #[must_use]
    pub fn with_wire_format(mut self, wire_format: WireFormatOptions) -> Self {
        self.wire_format = wire_format;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    fn is_broadcast(&self) -> bool {
        matches!(
            self.protocol,
            Protocol::Rtu { slave: 0 } | Protocol::Ascii { slave: 0 }
        )
    }

    fn send(&mut self, request: Request<'_>) -> Result<tcp::TransactionId, ClientError> {
        let mut req_buf = [0u8; MAX_ADU_LEN];
        let (n, transaction_id) = match self.protocol {
            Protocol::Rtu { slave } => {
                let adu = rtu::RequestAdu {
                    hdr: rtu::Header { slave },
                    pdu: RequestPdu(request),
                };
                (rtu::client::encode_request(adu, &mut req_buf)?, 0)
            }
            Protocol::Ascii { slave } => {
                let adu = rtu::RequestAdu {
                    hdr: rtu::Header { slave },
                    pdu: RequestPdu(request),
                };
                (ascii::client::encode_request(adu, &mut req_buf)?, 0)
            }
            Protocol::Tcp { unit_id } => {
                let transaction_id = self.next_transaction_id;
                self.next_transaction_id = self.next_transaction_id.wrapping_add(1);
                let adu = tcp::RequestAdu {
                    hdr: tcp::Header {
                        transaction_id,
                        unit_id,
                    },
                    pdu: RequestPdu(request),
                };
                (
                    tcp::client::encode_request(adu, &mut req_buf)?,
                    transaction_id,
                )
            }
        };
        if !self.transport.write(&req_buf[..n]) {
            return Err(ClientError::Transport);
        }
        if !self.transport.flush() {
            return Err(ClientError::Transport);
        }
        Ok(transaction_id)
    }

    fn receive(&mut self) -> Result<Vec<u8>, ClientError> {
        match self.protocol {
            Protocol::Rtu { .. } => Ok(io::read_length_driven(
                &mut self.transport,
                3,
                self.deadline,
                |hdr| rtu::response_pdu_len(hdr).ok().flatten().map(|pdu_len| 1 + pdu_len + 2),
            )?),
            Protocol::Ascii { .. } => Ok(io::read_delimiter_driven(
                &mut self.transport,
                ascii::DELIMITER,
                self.deadline,
            )?),
            Protocol::Tcp { .. } => Ok(io::read_length_driven(
                &mut self.transport,
                7,
                self.deadline,
                |hdr| Some(6 + usize::from(u16::from_be_bytes([hdr[4], hdr[5]]))),
            )?),
        }
    }

    fn decode_response<'f>(
        &self,
        frame: &'f [u8],
        scratch: &'f mut [u8],
        transaction_id: tcp::TransactionId,
    ) -> Result<Response<'f>, ClientError> {
        let pdu = match self.protocol {
            Protocol::Rtu { .. } => {
                let adu = rtu::client::decode_response(frame)?.ok_or(ClientError::Transport)?;
                adu.pdu.0
            }
            Protocol::Ascii { .. } => {
                let adu =
                    ascii::client::decode_response(frame, scratch)?.ok_or(ClientError::Transport)?;
                adu.pdu.0
            }
            Protocol::Tcp { .. } => {
                let adu = tcp::client::decode_response(frame)?.ok_or(ClientError::Transport)?;
                if adu.hdr.transaction_id != transaction_id {
                    return Err(ClientError::UnexpectedTransactionId);
                }
                adu.pdu.0
            }
        };
        pdu.map_err(|er| ClientError::Exception(er.exception))
    }

    /// Send a request and decode whatever response comes back, handing it
    /// to `extract` while the receive buffer is still alive.
    fn read_call<R>(
        &mut self,
        request: Request<'_>,
        extract: impl FnOnce(Response<'_>) -> Result<R, ClientError>,
    ) -> Result<R, ClientError> {
        let transaction_id = self.send(request)?;
        let frame = self.receive()?;
        let mut scratch = [0u8; MAX_ADU_LEN];
        let response = self.decode_response(&frame, &mut scratch, transaction_id)?;
        extract(response)
    }

    /// As [`Self::read_call`], but the caller only cares whether the
    /// request was acknowledged, not what the response actually contains.
    /// Echo payloads (FC 5/6/22/23) are accepted structurally, without
    /// re-comparing their bytes against what was sent.
    fn write_call(&mut self, request: Request<'_>) -> Result<(), ClientError> {
        if self.is_broadcast() {
            self.send(request)?;
            return Ok(());
        }
        self.read_call(request, |_response| Ok(()))
    }

    pub fn read_coils(&mut self, start_address: u16, count: u16) -> Result<Vec<bool>, ClientError> {
        self.read_call(Request::ReadCoils(start_address, count), |response| match response {
            // The response only carries a byte count, rounded up to a whole
            // byte, so trim back down to what was actually requested.
            Response::ReadCoils(coils) => Ok(coils.into_iter().take(count.into()).collect()),
            _ => Err(ClientError::UnexpectedResponse),
        })
    }

    pub fn read_discrete_inputs(
        &mut self,
        start_address: u16,
        count: u16,
    ) -> Result<Vec<bool>, ClientError> {
        self.read_call(
            Request::ReadDiscreteInputs(start_address, count),
            |response| match response {
                Response::ReadDiscreteInputs(coils) => {
                    Ok(coils.into_iter().take(count.into()).collect())
                }
                _ => Err(ClientError::UnexpectedResponse),
            },
        )
    }

    pub fn read_holding_registers(
        &mut self,
        start_address: u16,
        count: u16,
    ) -> Result<Vec<i16>, ClientError> {
        self.read_call(
            Request::ReadHoldingRegisters(start_address, count),
            |response| match response {
                #[allow(clippy::cast_possible_wrap)]
                Response::ReadHoldingRegisters(data) => {
                    Ok(data.into_iter().map(|w| w as i16).collect())
                }
                _ => Err(ClientError::UnexpectedResponse),
            },
        )
    }

    pub fn read_input_registers(
        &mut self,
        start_address: u16,
        count: u16,
    ) -> Result<Vec<i16>, ClientError> {
        self.read_call(
            Request::ReadInputRegisters(start_address, count),
            |response| match response {
                #[allow(clippy::cast_possible_wrap)]
                Response::ReadInputRegisters(data) => {
                    Ok(data.into_iter().map(|w| w as i16).collect())
                }
                _ => Err(ClientError::UnexpectedResponse),
            },
        )
    }

    pub fn write_single_coil(&mut self, address: u16, value: bool) -> Result<(), ClientError> {
        self.write_call(Request::WriteSingleCoil(address, value))
    }

    pub fn write_single_register(&mut self, address: u16, value: i16) -> Result<(), ClientError> {
        #[allow(clippy::cast_sign_loss)]
        self.write_call(Request::WriteSingleRegister(address, value as u16))
    }

    pub fn write_multiple_coils(
        &mut self,
        start_address: u16,
        values: &[bool],
    ) -> Result<(), ClientError> {
        let mut packed = [0u8; 256];
        let coils = Coils::from_bools(values, &mut packed)?;
        self.write_call(Request::WriteMultipleCoils(start_address, coils))
    }

    pub fn write_multiple_registers(
        &mut self,
        start_address: u16,
        values: &[i16],
    ) -> Result<(), ClientError> {
        let words: Vec<u16> = values.iter().map(|v| *v as u16).collect();
        let mut packed = [0u8; 512];
        let data = Data::from_words(&words, &mut packed)?;
        self.write_call(Request::WriteMultipleRegisters(start_address, data))
    }

    pub fn mask_write_register(
        &mut self,
        address: u16,
        and_mask: u16,
        or_mask: u16,
    ) -> Result<(), ClientError> {
        self.write_call(Request::MaskWriteRegister(address, and_mask, or_mask))
    }

    pub fn read_write_multiple_registers(
        &mut self,
        read_address: u16,
        read_count: u16,
        write_address: u16,
        write_values: &[i16],
    ) -> Result<Vec<i16>, ClientError> {
        let words: Vec<u16> = write_values.iter().map(|v| *v as u16).collect();
        let mut packed = [0u8; 512];
        let data = Data::from_words(&words, &mut packed)?;
        self.read_call(
            Request::ReadWriteMultipleRegisters(read_address, read_count, write_address, data),
            |response| match response {
                #[allow(clippy::cast_possible_wrap)]
                Response::ReadWriteMultipleRegisters(data) => {
                    Ok(data.into_iter().map(|w| w as i16).collect())
                }
                _ => Err(ClientError::UnexpectedResponse),
            },
        )
    }

    pub fn read_exception_status(&mut self) -> Result<u8, ClientError> {
        self.read_call(Request::ReadExceptionStatus, |response| match response {
            Response::ReadExceptionStatus(status) => Ok(status),
            _ => Err(ClientError::UnexpectedResponse),
        })
    }

    pub fn diagnostics(
        &mut self,
        sub_function_code: u16,
        data: &[u16],
    ) -> Result<Vec<u16>, ClientError> {
        let mut packed = [0u8; 512];
        let data = Data::from_words(data, &mut packed)?;
        self.read_call(
            Request::Diagnostics(sub_function_code, data),
            |response| match response {
                Response::Diagnostics(_, data) => Ok(data.into_iter().collect()),
                _ => Err(ClientError::UnexpectedResponse),
            },
        )
    }

    pub fn get_comm_event_counter(&mut self) -> Result<(u16, u16), ClientError> {
        self.read_call(Request::GetCommEventCounter, |response| match response {
            Response::GetCommEventCounter(status, count) => Ok((status, count)),
            _ => Err(ClientError::UnexpectedResponse),
        })
    }

    pub fn get_comm_event_log(&mut self) -> Result<CommEventLog, ClientError> {
        self.read_call(Request::GetCommEventLog, |response| match response {
            Response::GetCommEventLog(status, event_count, message_count, events) => Ok(CommEventLog {
                status,
                event_count,
                message_count,
                events: events.to_vec(),
            }),
            _ => Err(ClientError::UnexpectedResponse),
        })
    }

    /// Returns the vendor-specific trailing bytes and the run-indicator
    /// flag (`true` == running).
    pub fn report_server_id(&mut self) -> Result<(Vec<u8>, bool), ClientError> {
        self.read_call(Request::ReportServerId, |response| match response {
            Response::ReportServerId(data, run_indicator) => Ok((data.to_vec(), run_indicator)),
            _ => Err(ClientError::UnexpectedResponse),
        })
    }

    pub fn read_file_record(
        &mut self,
        items: &[FileRecordRequestItem],
    ) -> Result<HashMap<(u16, u16), Vec<i16>>, ClientError> {
        self.read_call(Request::ReadFileRecord(items.to_vec()), |response| {
            match response {
                Response::ReadFileRecord(items) => Ok(items
                    .into_iter()
                    .map(|item| ((item.file_number, item.record_number), item.data))
                    .collect()),
                _ => Err(ClientError::UnexpectedResponse),
            }
        })
    }

    pub fn write_file_record(&mut self, items: &[FileRecordWriteItem]) -> Result<(), ClientError> {
        self.write_call(Request::WriteFileRecord(items.to_vec()))
    }

    pub fn read_fifo_queue(&mut self, fifo_address: u16) -> Result<Vec<i16>, ClientError> {
        self.read_call(Request::ReadFifoQueue(fifo_address), |response| match response {
            #[allow(clippy::cast_possible_wrap)]
            Response::ReadFifoQueue(words) => Ok(words.into_iter().map(|w| w as i16).collect()),
            _ => Err(ClientError::UnexpectedResponse),
        })
    }

    /// Read `count` 32-bit floats (or `count` registers, depending on
    /// [`WireFormatOptions::float_count_semantics`]) starting at
    /// `start_address`, two registers per float.
    pub fn read_floats(&mut self, start_address: u16, count: u16) -> Result<Vec<f32>, ClientError> {
        let (num_registers, num_floats) = match self.wire_format.float_count_semantics {
            FloatCountSemantics::CountIsFloatCount => (count.saturating_mul(2), usize::from(count)),
            FloatCountSemantics::CountIsRegisterCount => (count, usize::from(count) / 2),
        };
        if num_floats == 0 || num_registers < 2 {
            return Err(ClientError::InvalidArgument);
        }
        self.check_float_range(start_address, num_registers)?;

        let registers = self.read_holding_registers(start_address, num_registers)?;
        if registers.len() < num_registers as usize {
            return Err(ClientError::UnexpectedResponse);
        }
        Ok(registers
            .chunks_exact(2)
            .map(|pair| {
                #[allow(clippy::cast_sign_loss)]
                wire_format::decode_f32(pair[0] as u16, pair[1] as u16, self.wire_format.word_order)
            })
            .collect())
    }

    /// Write `values` as consecutive 32-bit floats, two registers each,
    /// starting at `start_address`.
    pub fn write_floats(&mut self, start_address: u16, values: &[f32]) -> Result<(), ClientError> {
        if values.is_empty() {
            return Ok(());
        }
        let num_registers = values.len().saturating_mul(2);
        let num_registers_u16 = u16::try_from(num_registers).map_err(|_| ClientError::InvalidArgument)?;
        self.check_float_range(start_address, num_registers_u16)?;

        let mut registers = Vec::with_capacity(num_registers);
        for &value in values {
            let (hi, lo) = wire_format::encode_f32(value, self.wire_format.word_order);
            #[allow(clippy::cast_possible_wrap)]
            {
                registers.push(hi as i16);
                registers.push(lo as i16);
            }
        }
        self.write_multiple_registers(start_address, &registers)
    }

    fn check_float_range(&self, start_address: u16, num_registers: u16) -> Result<(), ClientError> {
        let Some(range) = self.wire_format.float_range else {
            return Ok(());
        };
        let end = u32::from(start_address) + u32::from(num_registers);
        let range_end = u32::from(range.start_address) + u32::from(range.count);
        if u32::from(start_address) < u32::from(range.start_address) || end > range_end {
            return Err(ClientError::InvalidArgument);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    #[test]
    fn tcp_write_single_register_round_trip() {
        let mut client = Client::tcp(MemoryTransport::new(), 0x11);
        client.transport.set_read_data(&[
            0x00, 0x01, // transaction id (first request id is 1)
            0x00, 0x00, // protocol id
            0x00, 0x06, // length
            0x11, // unit id
            0x06, // function code
            0x00, 0x10, // address
            0x12, 0x34, // value
        ]);
        client.write_single_register(0x10, 0x1234).unwrap();
        assert_eq!(
            client.transport.written_data(),
            &[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x11, 0x06, 0x00, 0x10, 0x12, 0x34][..]
        );
    }

    #[test]
    fn tcp_read_holding_registers_round_trip() {
        let mut client = Client::tcp(MemoryTransport::new(), 0x01);
        client.transport.set_read_data(&[
            0x00, 0x01, 0x00, 0x00, 0x00, 0x05, // header
            0x01, // unit id
            0x03, // function code
            0x02, // byte count
            0xAB, 0xCD,
        ]);
        let registers = client.read_holding_registers(0x00, 1).unwrap();
        assert_eq!(registers, vec![0xABCDu16 as i16]);
    }

    #[test]
    fn tcp_rejects_mismatched_transaction_id() {
        let mut client = Client::tcp(MemoryTransport::new(), 0x01);
        client.transport.set_read_data(&[
            0x00, 0x02, 0x00, 0x00, 0x00, 0x05, 0x01, 0x03, 0x02, 0xAB, 0xCD,
        ]);
        let err = client.read_holding_registers(0x00, 1).unwrap_err();
        assert_eq!(err, ClientError::UnexpectedTransactionId);
    }

    #[test]
    fn tcp_maps_exception_response() {
        let mut client = Client::tcp(MemoryTransport::new(), 0x01);
        client
            .transport
            .set_read_data(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x01, 0x83, 0x02]);
        let err = client.read_holding_registers(0x00, 1).unwrap_err();
        assert_eq!(err, ClientError::Exception(Exception::IllegalDataAddress));
    }

    #[test]
    fn rtu_read_coils_round_trip() {
        let mut client = Client::rtu(MemoryTransport::new(), 0x05);
        // slave, fn, byte_count, data, crc(2)
        let frame = [0x05, 0x01, 0x01, 0b0000_1101];
        let crc = rtu::crc16(&frame);
        let mut bytes = frame.to_vec();
        bytes.extend_from_slice(&crc.to_be_bytes());
        client.transport.set_read_data(&bytes);

        let coils = client.read_coils(0x00, 4).unwrap();
        assert_eq!(coils, vec![true, false, true, true]);
    }

    #[test]
    fn rtu_broadcast_write_does_not_wait_for_a_response() {
        let mut client = Client::rtu(MemoryTransport::new(), 0);
        client.write_single_coil(0x00, true).unwrap();
        assert!(!client.transport.written_data().is_empty());
    }

    #[test]
    fn ascii_write_single_register_round_trip() {
        let mut client = Client::ascii(MemoryTransport::new(), 0x11);
        client.transport.set_read_data(b":11060010002AAF\r\n");
        client.write_single_register(0x10, 0x2A).unwrap();
        assert_eq!(client.transport.written_data(), b":11060010002AAF\r\n");
    }

    #[test]
    fn ascii_broadcast_write_does_not_wait_for_a_response() {
        let mut client = Client::ascii(MemoryTransport::new(), 0);
        client.write_single_coil(0x00, true).unwrap();
        assert!(!client.transport.written_data().is_empty());
    }

    #[test]
    fn read_floats_decodes_two_registers_high_word_first() {
        let mut client = Client::tcp(MemoryTransport::new(), 0x01);
        let (hi, lo) = wire_format::encode_f32(3.5_f32, wire_format::WordOrder::HighWordFirst);
        client.transport.set_read_data(&[
            0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x04, (hi >> 8) as u8, hi as u8,
            (lo >> 8) as u8, lo as u8,
        ]);
        let floats = client.read_floats(0x00, 1).unwrap();
        assert_eq!(floats, vec![3.5_f32]);
    }
}
