// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The server (slave) data model and request dispatcher.
//!
//! [`Server`] owns the four register/coil address spaces, the file and
//! FIFO storage, and the communication-event bookkeeping a real device
//! exposes through function codes 7, 8, 11 and 12. [`Server::process`]
//! turns one decoded [`Request`] into a [`Response`] or an [`Exception`];
//! [`Server::process_incoming_frame`] layers the broadcast-acceptance
//! policy on top for callers driving RTU or TCP framing.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::codec::{ascii, rtu, tcp};
use crate::frame::*;
use crate::io;
use crate::transport::Transport;
use crate::wire_format::{self, WireFormatOptions, WordOrder};
use crate::AddressMap;

/// How long [`Server::poll`] waits for the rest of a frame once
/// [`Transport::has_data`] has already reported the first byte.
const POLL_DEADLINE: Duration = Duration::from_millis(50);

/// Which framing a [`Server`] speaks. Unlike [`crate::Protocol`] on the
/// client side, the server's own address is tracked separately (`Server::id`),
/// since every framing carries it the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Rtu,
    Ascii,
    Tcp,
}

/// Per file number, per record number, the stored register values.
pub type FileStorage = HashMap<u16, HashMap<u16, Vec<i16>>>;

/// Per FIFO address, the queued register values.
pub type FifoStorage = HashMap<u16, Vec<i16>>;

const EVENT_LOG_CAPACITY: usize = 64;

/// One entry of the communication event log exposed through function
/// code 12.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventLogEntry {
    pub function_code: u8,
    pub event_count: u16,
}

/// A bank of registers reinterpreted as 32-bit floats, overlaid on top of
/// the holding register address space. Reading or writing a register in
/// the overlaid span reads/writes one half of a float; [`Server::float`]
/// and [`Server::set_float`] give whole-float access.
#[derive(Debug, Clone)]
struct FloatOverlay {
    start: u16,
    count: u16,
    registers: Vec<u16>,
}

/// How a `[start, start + count)` address span relates to a [`FloatOverlay`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanOverlap {
    /// The span shares no address with the overlay.
    None,
    /// The span straddles the overlay boundary: some addresses are inside,
    /// some outside. Reads and single-register writes must refuse this.
    Partial,
    /// The span lies entirely inside the overlay.
    Full,
}

impl FloatOverlay {
    fn new(start: u16, count: u16) -> Self {
        Self {
            start,
            count,
            registers: vec![0; count as usize * 2],
        }
    }

    fn contains(&self, address: u16) -> bool {
        let span = u32::from(self.count) * 2;
        let addr = u32::from(address);
        let start = u32::from(self.start);
        addr >= start && addr < start + span
    }

    fn register_index(&self, address: u16) -> usize {
        (address - self.start) as usize
    }

    /// Classify a `[address, address + count)` span against this overlay's
    /// `[start, start + 2*count)` register span, using `u32` throughout so
    /// the comparison never wraps around `u16::MAX`.
    fn span_overlap(&self, address: u16, count: u16) -> SpanOverlap {
        let span_start = u32::from(address);
        let span_end = span_start + u32::from(count);
        let overlay_start = u32::from(self.start);
        let overlay_end = overlay_start + u32::from(self.count) * 2;
        if span_end <= overlay_start || span_start >= overlay_end {
            SpanOverlap::None
        } else if span_start >= overlay_start && span_end <= overlay_end {
            SpanOverlap::Full
        } else {
            SpanOverlap::Partial
        }
    }

    fn get_register(&self, address: u16) -> Option<u16> {
        if self.contains(address) {
            Some(self.registers[self.register_index(address)])
        } else {
            None
        }
    }

    fn set_register(&mut self, address: u16, value: u16) -> bool {
        if !self.contains(address) {
            return false;
        }
        let idx = self.register_index(address);
        self.registers[idx] = value;
        true
    }

    fn get_float(&self, index: u16, word_order: WordOrder) -> Option<f32> {
        if index >= self.count {
            return None;
        }
        let i = index as usize * 2;
        Some(wire_format::decode_f32(
            self.registers[i],
            self.registers[i + 1],
            word_order,
        ))
    }

    fn set_float(&mut self, index: u16, value: f32, word_order: WordOrder) -> bool {
        if index >= self.count {
            return false;
        }
        let (a, b) = wire_format::encode_f32(value, word_order);
        let i = index as usize * 2;
        self.registers[i] = a;
        self.registers[i + 1] = b;
        true
    }
}

/// A Modbus server (slave) data model and request dispatcher.
#[derive(Debug, Clone)]
pub struct Server {
    pub id: u8,
    pub wire_format: WireFormatOptions,
    framing: Framing,
    holding_registers: AddressMap<i16>,
    input_registers: AddressMap<i16>,
    coils: AddressMap<bool>,
    discrete_inputs: AddressMap<bool>,
    file_storage: FileStorage,
    fifo_storage: FifoStorage,
    event_log: VecDeque<EventLogEntry>,
    com_event_counter: u16,
    message_count: u16,
    exception_status: u8,
    float_overlay: Option<FloatOverlay>,
}

impl Server {
    #[must_use]
    pub fn new(id: u8) -> Self {
        Self {
            id,
            wire_format: WireFormatOptions::default(),
            framing: Framing::Rtu,
            holding_registers: AddressMap::new(),
            input_registers: AddressMap::new(),
            coils: AddressMap::new(),
            discrete_inputs: AddressMap::new(),
            file_storage: FileStorage::new(),
            fifo_storage: FifoStorage::new(),
            event_log: VecDeque::new(),
            com_event_counter: 0,
            message_count: 0,
            exception_status: 0,
            float_overlay: None,
        }
    }

    /// Select which framing [`Server::process_incoming_frame`]/[`Server::poll`]
    /// speak over a transport. Defaults to RTU.
    #[must_use]
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn add_holding_registers(&mut self, span: AddressSpan) {
        self.holding_registers.add_span(span);
    }

    pub fn add_input_registers(&mut self, span: AddressSpan) {
        self.input_registers.add_span(span);
    }

    pub fn add_coils(&mut self, span: AddressSpan) {
        self.coils.add_span(span);
    }

    pub fn add_discrete_inputs(&mut self, span: AddressSpan) {
        self.discrete_inputs.add_span(span);
    }

    pub fn set_holding_register(&mut self, address: u16, value: i16) -> bool {
        self.write_holding_register(address, value)
    }

    pub fn set_input_register(&mut self, address: u16, value: i16) -> bool {
        self.input_registers.set(address, value)
    }

    pub fn set_coil(&mut self, address: u16, value: bool) -> bool {
        self.coils.set(address, value)
    }

    pub fn set_discrete_input(&mut self, address: u16, value: bool) -> bool {
        self.discrete_inputs.set(address, value)
    }

    pub fn set_fifo_queue(&mut self, address: u16, values: Vec<i16>) {
        self.fifo_storage.insert(address, values);
    }

    pub fn set_file_record(&mut self, file_number: u16, record_number: u16, values: Vec<i16>) {
        self.file_storage
            .entry(file_number)
            .or_default()
            .insert(record_number, values);
    }

    pub fn set_exception_status(&mut self, status: u8) {
        self.exception_status = status;
    }

    /// Overlay `count` 32-bit floats, backed by `2 * count` holding
    /// registers starting at `start`.
    pub fn add_float_range(&mut self, start: u16, count: u16) {
        self.float_overlay = Some(FloatOverlay::new(start, count));
    }

    pub fn set_float(&mut self, index: u16, value: f32) -> bool {
        let word_order = self.wire_format.word_order;
        match &mut self.float_overlay {
            Some(overlay) => overlay.set_float(index, value, word_order),
            None => false,
        }
    }

    #[must_use]
    pub fn float(&self, index: u16) -> Option<f32> {
        self.float_overlay
            .as_ref()
            .and_then(|overlay| overlay.get_float(index, self.wire_format.word_order))
    }

    fn read_holding_register(&self, address: u16) -> Option<i16> {
        if let Some(overlay) = &self.float_overlay {
            if let Some(raw) = overlay.get_register(address) {
                return Some(raw as i16);
            }
        }
        self.holding_registers.get(address).copied()
    }

    fn write_holding_register(&mut self, address: u16, value: i16) -> bool {
        if let Some(overlay) = &mut self.float_overlay {
            if overlay.contains(address) {
                return overlay.set_register(address, value as u16);
            }
        }
        self.holding_registers.set(address, value)
    }

    fn record_event(&mut self, function_code: FunctionCode) {
        self.message_count = self.message_count.wrapping_add(1);
        self.com_event_counter = self.com_event_counter.wrapping_add(1);
        if self.event_log.len() >= EVENT_LOG_CAPACITY {
            self.event_log.pop_front();
        }
        self.event_log.push_back(EventLogEntry {
            function_code: function_code.value(),
            event_count: self.com_event_counter,
        });
    }

    /// Serialize the event log, most recent first, as repeated
    /// `function_code(1), event_count(2)` triples.
    fn encode_event_log<'buf>(&self, buf: &'buf mut [u8]) -> &'buf [u8] {
        let mut offset = 0;
        for entry in self.event_log.iter().rev() {
            if offset + 3 > buf.len() {
                break;
            }
            buf[offset] = entry.function_code;
            wire_format::write_u16(
                &mut buf[offset + 1..offset + 3],
                entry.event_count,
                wire_format::ByteOrder::BigEndian,
            );
            offset += 3;
        }
        &buf[..offset]
    }

    /// Process one request, returning its response or the exception to
    /// report for it. Updates the event log and counters unconditionally,
    /// exactly as a real device would before it even knows whether the
    /// function code is supported.
    pub fn process<'buf>(
        &mut self,
        request: &Request<'_>,
        buf: &'buf mut [u8],
    ) -> Result<Response<'buf>, ExceptionResponse> {
        let function = FunctionCode::from(request);
        self.record_event(function);
        self.dispatch(request, buf).map_err(|exception| ExceptionResponse {
            function,
            exception,
        })
    }

    fn dispatch<'buf>(
        &mut self,
        request: &Request<'_>,
        buf: &'buf mut [u8],
    ) -> Result<Response<'buf>, Exception> {
        match request {
            Request::ReadCoils(address, count) => {
                let bools = self.collect_bools(&self.coils, *address, *count)?;
                Coils::from_bools(&bools, buf)
                    .map(Response::ReadCoils)
                    .map_err(|_| Exception::IllegalDataValue)
            }
            Request::ReadDiscreteInputs(address, count) => {
                let bools = self.collect_bools(&self.discrete_inputs, *address, *count)?;
                Coils::from_bools(&bools, buf)
                    .map(Response::ReadDiscreteInputs)
                    .map_err(|_| Exception::IllegalDataValue)
            }
            Request::ReadHoldingRegisters(address, count) => {
                let words = self.collect_holding_words(*address, *count)?;
                Data::from_words(&words, buf)
                    .map(Response::ReadHoldingRegisters)
                    .map_err(|_| Exception::IllegalDataValue)
            }
            Request::ReadInputRegisters(address, count) => {
                let words = self.collect_input_words(*address, *count)?;
                Data::from_words(&words, buf)
                    .map(Response::ReadInputRegisters)
                    .map_err(|_| Exception::IllegalDataValue)
            }
            Request::WriteSingleCoil(address, value) => {
                if self.coils.set(*address, *value) {
                    Ok(Response::WriteSingleCoil(*address, *value))
                } else {
                    Err(Exception::IllegalDataAddress)
                }
            }
            Request::WriteSingleRegister(address, value) => {
                // A float region is always written two registers at a time;
                // a lone register inside it has no well-defined value.
                if let Some(overlay) = &self.float_overlay {
                    if overlay.contains(*address) {
                        return Err(Exception::IllegalDataAddress);
                    }
                }
                if self.holding_registers.set(*address, *value as i16) {
                    Ok(Response::WriteSingleRegister(*address, *value))
                } else {
                    Err(Exception::IllegalDataAddress)
                }
            }
            Request::WriteMultipleCoils(address, coils) => {
                let count = coils.len() as u16;
                for (offset, value) in coils.into_iter().enumerate() {
                    if !self.coils.set(address + offset as u16, value) {
                        return Err(Exception::IllegalDataAddress);
                    }
                }
                Ok(Response::WriteMultipleCoils(*address, count))
            }
            Request::WriteMultipleRegisters(address, words) => {
                let count = words.len() as u16;
                for (offset, value) in words.into_iter().enumerate() {
                    if !self.write_holding_register(address + offset as u16, value as i16) {
                        return Err(Exception::IllegalDataAddress);
                    }
                }
                Ok(Response::WriteMultipleRegisters(*address, count))
            }
            Request::ReadWriteMultipleRegisters(read_addr, read_count, write_addr, write_words) => {
                for (offset, value) in write_words.into_iter().enumerate() {
                    if !self.write_holding_register(write_addr + offset as u16, value as i16) {
                        return Err(Exception::IllegalDataAddress);
                    }
                }
                let words = self.collect_holding_words(*read_addr, *read_count)?;
                Data::from_words(&words, buf)
                    .map(Response::ReadWriteMultipleRegisters)
                    .map_err(|_| Exception::IllegalDataValue)
            }
            Request::MaskWriteRegister(address, and_mask, or_mask) => {
                let current = self
                    .read_holding_register(*address)
                    .map(|v| v as u16)
                    .ok_or(Exception::IllegalDataAddress)?;
                let new_value = (current & and_mask) | or_mask;
                if self.write_holding_register(*address, new_value as i16) {
                    Ok(Response::MaskWriteRegister(*address, *and_mask, *or_mask))
                } else {
                    Err(Exception::IllegalDataAddress)
                }
            }
            Request::ReadExceptionStatus => Ok(Response::ReadExceptionStatus(self.exception_status)),
            Request::Diagnostics(sub_fn, data) => {
                let len = data.payload().len();
                buf[..len].copy_from_slice(data.payload());
                Ok(Response::Diagnostics(
                    *sub_fn,
                    Data {
                        data: &buf[..len],
                        quantity: data.len(),
                    },
                ))
            }
            Request::GetCommEventCounter => Ok(Response::GetCommEventCounter(0x0000, self.com_event_counter)),
            Request::GetCommEventLog => {
                let events = self.encode_event_log(buf);
                let len = events.len();
                Ok(Response::GetCommEventLog(
                    0x0000,
                    self.com_event_counter,
                    self.message_count,
                    &buf[..len],
                ))
            }
            Request::ReportServerId => Ok(Response::ReportServerId(&[], true)),
            Request::ReadFileRecord(items) => {
                let mut responses = Vec::with_capacity(items.len());
                for item in items {
                    let record = self
                        .file_storage
                        .get(&item.file_number)
                        .and_then(|records| records.get(&item.record_number))
                        .ok_or(Exception::IllegalDataAddress)?;
                    if record.len() < item.record_length as usize {
                        return Err(Exception::IllegalDataAddress);
                    }
                    responses.push(FileRecordResponseItem {
                        file_number: item.file_number,
                        record_number: item.record_number,
                        data: record[..item.record_length as usize].to_vec(),
                    });
                }
                Ok(Response::ReadFileRecord(responses))
            }
            Request::WriteFileRecord(items) => {
                for item in items {
                    self.file_storage
                        .entry(item.file_number)
                        .or_default()
                        .insert(item.record_number, item.data.clone());
                }
                Ok(Response::WriteFileRecord(items.clone()))
            }
            Request::ReadFifoQueue(address) => match self.fifo_storage.get(address) {
                Some(values) if !values.is_empty() => {
                    let words: Vec<u16> = values.iter().map(|v| *v as u16).collect();
                    Ok(Response::ReadFifoQueue(words))
                }
                _ => Err(Exception::IllegalDataAddress),
            },
            Request::Custom(_, _) => Err(Exception::IllegalFunction),
        }
    }

    fn collect_bools(
        &self,
        map: &AddressMap<bool>,
        address: u16,
        count: u16,
    ) -> Result<Vec<bool>, Exception> {
        AddressSpan {
            start_address: address,
            count,
        }
        .addresses()
        .map(|a| map.get(a).copied().ok_or(Exception::IllegalDataAddress))
        .collect()
    }

    fn collect_holding_words(&self, address: u16, count: u16) -> Result<Vec<u16>, Exception> {
        if let Some(overlay) = &self.float_overlay {
            match overlay.span_overlap(address, count) {
                SpanOverlap::Partial => return Err(Exception::IllegalDataAddress),
                SpanOverlap::Full => {
                    return AddressSpan {
                        start_address: address,
                        count,
                    }
                    .addresses()
                    .map(|a| overlay.get_register(a).ok_or(Exception::IllegalDataAddress))
                    .collect();
                }
                SpanOverlap::None => {}
            }
        }
        AddressSpan {
            start_address: address,
            count,
        }
        .addresses()
        .map(|a| {
            self.holding_registers
                .get(a)
                .copied()
                .map(|v| v as u16)
                .ok_or(Exception::IllegalDataAddress)
        })
        .collect()
    }

    fn collect_input_words(&self, address: u16, count: u16) -> Result<Vec<u16>, Exception> {
        AddressSpan {
            start_address: address,
            count,
        }
        .addresses()
        .map(|a| {
            self.input_registers
                .get(a)
                .map(|v| *v as u16)
                .ok_or(Exception::IllegalDataAddress)
        })
        .collect()
    }

    /// Read one frame off `transport` using the configured [`Framing`],
    /// decode it, and apply the broadcast-acceptance policy: a frame whose
    /// unit id matches neither the server's id nor the broadcast id (0) is
    /// rejected with no side effects; a broadcast frame whose function code
    /// is not write-class is rejected too (broadcast reads make no sense,
    /// since nobody is listening for the reply). A valid unicast request is
    /// processed and its response written back; a valid broadcast request is
    /// processed but no reply is sent. Returns whether a request was
    /// processed (regardless of whether writing the reply succeeded).
    pub fn process_incoming_frame<T: Transport>(&mut self, transport: &mut T, deadline: Duration) -> bool {
        match self.framing {
            Framing::Rtu => {
                let Ok(frame) = read_rtu_request_frame(transport, deadline) else {
                    return false;
                };
                let Ok(Some(adu)) = rtu::server::decode_request(&frame) else {
                    return false;
                };
                let rtu::RequestAdu { hdr, pdu } = adu;
                let RequestPdu(request) = pdu;
                if hdr.slave != self.id && hdr.slave != 0 {
                    return false;
                }
                let is_broadcast = hdr.slave == 0;
                if is_broadcast && !FunctionCode::from(&request).is_write_class() {
                    return false;
                }
                let mut resp_buf = [0u8; rtu::MAX_FRAME_LEN];
                let result = self.process(&request, &mut resp_buf);
                if is_broadcast {
                    return true;
                }
                let response_adu = rtu::ResponseAdu {
                    hdr,
                    pdu: ResponsePdu(result),
                };
                let mut wire_buf = [0u8; rtu::MAX_FRAME_LEN];
                let Ok(n) = rtu::server::encode_response(response_adu, &mut wire_buf) else {
                    return false;
                };
                transport.write(&wire_buf[..n]) && transport.flush()
            }
            Framing::Ascii => {
                let Ok(frame) = io::read_delimiter_driven(transport, ascii::DELIMITER, deadline) else {
                    return false;
                };
                let mut scratch = [0u8; rtu::MAX_FRAME_LEN];
                let Ok(Some(adu)) = ascii::server::decode_request(&frame, &mut scratch) else {
                    return false;
                };
                let rtu::RequestAdu { hdr, pdu } = adu;
                let RequestPdu(request) = pdu;
                if hdr.slave != self.id && hdr.slave != 0 {
                    return false;
                }
                let is_broadcast = hdr.slave == 0;
                if is_broadcast && !FunctionCode::from(&request).is_write_class() {
                    return false;
                }
                let mut resp_buf = [0u8; rtu::MAX_FRAME_LEN];
                let result = self.process(&request, &mut resp_buf);
                if is_broadcast {
                    return true;
                }
                let response_adu = rtu::ResponseAdu {
                    hdr,
                    pdu: ResponsePdu(result),
                };
                let mut wire_buf = [0u8; ascii::MAX_FRAME_LEN];
                let Ok(n) = ascii::server::encode_response(response_adu, &mut wire_buf) else {
                    return false;
                };
                transport.write(&wire_buf[..n]) && transport.flush()
            }
            Framing::Tcp => {
                let Ok(frame) = io::read_length_driven(transport, 7, deadline, |hdr| {
                    Some(6 + usize::from(u16::from_be_bytes([hdr[4], hdr[5]])))
                }) else {
                    return false;
                };
                let Ok(Some(adu)) = tcp::server::decode_request(&frame) else {
                    return false;
                };
                let tcp::RequestAdu { hdr, pdu } = adu;
                let RequestPdu(request) = pdu;
                // Unit id 0 is just another unit id on TCP, never broadcast
                // (there is no shared bus for every slave to overhear).
                if hdr.unit_id != self.id {
                    return false;
                }
                let mut resp_buf = [0u8; tcp::MAX_FRAME_LEN];
                let result = self.process(&request, &mut resp_buf);
                let response_adu = tcp::ResponseAdu {
                    hdr,
                    pdu: ResponsePdu(result),
                };
                let mut wire_buf = [0u8; tcp::MAX_FRAME_LEN];
                let Ok(n) = tcp::server::encode_response(response_adu, &mut wire_buf) else {
                    return false;
                };
                transport.write(&wire_buf[..n]) && transport.flush()
            }
        }
    }

    /// A short-deadline, non-blocking variant of [`Server::process_incoming_frame`]
    /// for a server that is polled cooperatively from an outer loop instead
    /// of dedicating a thread to a blocking read: does nothing unless
    /// [`Transport::has_data`] already reports at least one unread byte.
    pub fn poll<T: Transport>(&mut self, transport: &mut T) -> bool {
        if !transport.has_data() {
            return false;
        }
        self.process_incoming_frame(transport, POLL_DEADLINE)
    }
}

/// Read one RTU request ADU (slave id, PDU, CRC) off `transport`. RTU has no
/// explicit length field, so the header grows in two steps: first just the
/// slave id and function code, enough to settle every fixed-length function
/// code's total length; then, only for the function codes whose length
/// depends on a byte count further into the PDU, however many more header
/// bytes are needed to read that count.
fn read_rtu_request_frame<T: Transport>(transport: &mut T, deadline: Duration) -> Result<Vec<u8>, io::ReadError> {
    let mut header = io::read_length_driven(transport, 2, deadline, |buf| Some(buf.len()))?;
    if rtu::request_pdu_len(&header).ok().flatten().is_none() {
        let extra = match header[1] {
            0x0F | 0x10 => 3, // byte count lives at offset 4
            0x14 | 0x15 => 1, // byte count lives at offset 2
            0x17 => 9,        // write byte count lives at offset 10
            _ => return Err(io::ReadError::Transport),
        };
        let rest = io::read_length_driven(transport, extra, deadline, |buf| Some(buf.len()))?;
        header.extend_from_slice(&rest);
    }
    let pdu_len = rtu::request_pdu_len(&header)
        .ok()
        .flatten()
        .ok_or(io::ReadError::Transport)?;
    let total = 1 + pdu_len + 2;
    if total > header.len() {
        let body = io::read_length_driven(transport, total - header.len(), deadline, |buf| Some(buf.len()))?;
        header.extend_from_slice(&body);
    }
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn holding_server() -> Server {
        let mut server = Server::new(1);
        server.add_holding_registers(AddressSpan {
            start_address: 0,
            count: 10,
        });
        server
    }

    #[test]
    fn write_then_read_single_register() {
        let mut server = holding_server();
        let mut buf = [0u8; 64];
        let response = server
            .process(&Request::WriteSingleRegister(0, 0x1234), &mut buf)
            .unwrap();
        assert_eq!(response, Response::WriteSingleRegister(0, 0x1234));

        let mut buf = [0u8; 64];
        let response = server
            .process(&Request::ReadHoldingRegisters(0, 1), &mut buf)
            .unwrap();
        match response {
            Response::ReadHoldingRegisters(words) => assert_eq!(words.get(0), Some(0x1234)),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn read_unregistered_address_is_illegal_data_address() {
        let mut server = holding_server();
        let mut buf = [0u8; 64];
        let err = server
            .process(&Request::ReadHoldingRegisters(100, 5), &mut buf)
            .unwrap_err();
        assert_eq!(err.exception, Exception::IllegalDataAddress);
    }

    #[test]
    fn mask_write_register_combines_masks() {
        let mut server = holding_server();
        server.set_holding_register(0, 0x1234u16 as i16);
        let mut buf = [0u8; 64];
        let response = server
            .process(&Request::MaskWriteRegister(0, 0xFF00, 0x0056), &mut buf)
            .unwrap();
        assert_eq!(response, Response::MaskWriteRegister(0, 0xFF00, 0x0056));
        assert_eq!(server.read_holding_register(0), Some(0x1256u16 as i16));
    }

    #[test]
    fn write_multiple_coils_packs_and_stores() {
        let mut server = Server::new(1);
        server.add_coils(AddressSpan {
            start_address: 0,
            count: 8,
        });
        let bools = [true, false, true, false, true, false, true, false];
        let mut packed = [0u8; 1];
        let coils = Coils::from_bools(&bools, &mut packed).unwrap();
        let mut buf = [0u8; 64];
        let response = server
            .process(&Request::WriteMultipleCoils(0, coils), &mut buf)
            .unwrap();
        assert_eq!(response, Response::WriteMultipleCoils(0, 8));
        assert_eq!(packed[0], 0x55);
        for (i, expected) in bools.iter().enumerate() {
            assert_eq!(server.coils.get(i as u16), Some(expected));
        }
    }

    #[test]
    fn read_fifo_queue_reports_count_and_values() {
        let mut server = Server::new(1);
        server.set_fifo_queue(0, vec![0x1111, 0x2222, 0x3333_i16.wrapping_sub(0), 0x4444]);
        server.set_fifo_queue(0, vec![0x1111, 0x2222, 0x3333, 0x4444]);
        let mut buf = [0u8; 64];
        let response = server.process(&Request::ReadFifoQueue(0), &mut buf).unwrap();
        match response {
            Response::ReadFifoQueue(values) => {
                assert_eq!(values, vec![0x1111, 0x2222, 0x3333, 0x4444]);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn broadcast_write_mutates_without_reply() {
        let mut server_a = holding_server();
        let mut server_b = holding_server();
        let mut buf = [0u8; 64];
        server_a
            .process(&Request::WriteSingleRegister(0, 0xABCD), &mut buf)
            .unwrap();
        let mut buf = [0u8; 64];
        server_b
            .process(&Request::WriteSingleRegister(0, 0xABCD), &mut buf)
            .unwrap();
        assert_eq!(server_a.read_holding_register(0), Some(0xABCDu16 as i16));
        assert_eq!(server_b.read_holding_register(0), Some(0xABCDu16 as i16));
    }

    fn rtu_frame(parts: &[u8]) -> Vec<u8> {
        let crc = rtu::crc16(parts);
        let mut bytes = parts.to_vec();
        bytes.extend_from_slice(&crc.to_be_bytes());
        bytes
    }

    #[test]
    fn broadcast_write_via_rtu_frame_mutates_with_no_reply() {
        let mut server = holding_server();
        let mut t = MemoryTransport::new();
        t.set_read_data(&rtu_frame(&[0x00, 0x06, 0x00, 0x00, 0xAB, 0xCD]));

        assert!(server.process_incoming_frame(&mut t, Duration::from_millis(100)));
        assert!(t.written_data().is_empty());
        assert_eq!(server.read_holding_register(0), Some(0xABCDu16 as i16));
    }

    #[test]
    fn broadcast_read_via_rtu_frame_is_rejected_with_no_mutation() {
        let mut server = holding_server();
        server.set_holding_register(0, 0x1234u16 as i16);
        let mut t = MemoryTransport::new();
        t.set_read_data(&rtu_frame(&[0x00, 0x03, 0x00, 0x00, 0x00, 0x01]));

        assert!(!server.process_incoming_frame(&mut t, Duration::from_millis(100)));
        assert!(t.written_data().is_empty());
        assert_eq!(server.com_event_counter, 0);
        assert_eq!(server.read_holding_register(0), Some(0x1234u16 as i16));
    }

    #[test]
    fn event_log_records_every_request() {
        let mut server = holding_server();
        let mut buf = [0u8; 64];
        for _ in 0..3 {
            server
                .process(&Request::ReadHoldingRegisters(0, 1), &mut buf)
                .unwrap();
        }
        assert_eq!(server.com_event_counter, 3);
        assert_eq!(server.message_count, 3);
        assert_eq!(server.event_log.len(), 3);
    }

    #[test]
    fn float_overlay_round_trips_through_register_writes() {
        let mut server = Server::new(1);
        server.add_holding_registers(AddressSpan {
            start_address: 0,
            count: 4,
        });
        server.add_float_range(0, 2);
        assert!(server.set_float(0, 3.25));
        assert_eq!(server.float(0), Some(3.25));

        let mut buf = [0u8; 64];
        let response = server
            .process(&Request::ReadHoldingRegisters(0, 2), &mut buf)
            .unwrap();
        let Response::ReadHoldingRegisters(words) = response else {
            panic!("expected ReadHoldingRegisters");
        };
        let (hi, lo) = (words.get(0).unwrap(), words.get(1).unwrap());
        assert_eq!(
            wire_format::decode_f32(hi, lo, server.wire_format.word_order),
            3.25
        );
    }

    #[test]
    fn write_single_register_into_float_overlay_is_illegal_data_address() {
        let mut server = Server::new(1);
        server.add_holding_registers(AddressSpan {
            start_address: 0,
            count: 4,
        });
        server.add_float_range(0, 2);
        let mut buf = [0u8; 64];
        let err = server
            .process(&Request::WriteSingleRegister(0, 0x1234), &mut buf)
            .unwrap_err();
        assert_eq!(err.exception, Exception::IllegalDataAddress);
    }

    #[test]
    fn read_straddling_float_overlay_boundary_is_illegal_data_address() {
        let mut server = Server::new(1);
        server.add_holding_registers(AddressSpan {
            start_address: 0,
            count: 6,
        });
        server.add_float_range(2, 1); // overlay covers registers 2..4
        let mut buf = [0u8; 64];
        let err = server
            .process(&Request::ReadHoldingRegisters(1, 3), &mut buf)
            .unwrap_err();
        assert_eq!(err.exception, Exception::IllegalDataAddress);
    }

    #[test]
    fn poll_processes_a_frame_once_data_is_pending() {
        let mut server = holding_server();
        let mut t = MemoryTransport::new();
        assert!(!server.poll(&mut t));

        t.set_read_data(&rtu_frame(&[0x01, 0x06, 0x00, 0x00, 0xAB, 0xCD]));
        assert!(server.poll(&mut t));
        assert_eq!(server.read_holding_register(0), Some(0xABCDu16 as i16));
        assert!(!t.written_data().is_empty());
    }
}
