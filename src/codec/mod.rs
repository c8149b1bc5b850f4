// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{error::*, frame::*};
use byteorder::{BigEndian, ByteOrder};

pub mod ascii;
pub mod rtu;
pub mod tcp;

/// The type of decoding
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderType {
    Request,
    Response,
}

type Result<T> = core::result::Result<T, Error>;

impl TryFrom<u8> for Exception {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        let ex = match code {
            0x01 => Self::IllegalFunction,
            0x02 => Self::IllegalDataAddress,
            0x03 => Self::IllegalDataValue,
            0x04 => Self::ServerDeviceFailure,
            0x05 => Self::Acknowledge,
            0x06 => Self::ServerDeviceBusy,
            0x08 => Self::MemoryParityError,
            0x0A => Self::GatewayPathUnavailable,
            0x0B => Self::GatewayTargetDevice,
            _ => {
                return Err(Error::ExceptionCode(code));
            }
        };
        Ok(ex)
    }
}

impl From<ExceptionResponse> for [u8; 2] {
    fn from(ex: ExceptionResponse) -> [u8; 2] {
        let data = &mut [0; 2];
        let fn_code: u8 = ex.function.value();
        debug_assert!(fn_code < 0x80);
        data[0] = fn_code + 0x80;
        data[1] = ex.exception as u8;
        *data
    }
}

impl TryFrom<&[u8]> for ExceptionResponse {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::BufferSize);
        }
        let fn_err_code = bytes[0];
        if fn_err_code < 0x80 {
            return Err(Error::ExceptionFnCode(fn_err_code));
        }
        let function = FunctionCode::new(fn_err_code - 0x80);
        let exception = Exception::try_from(bytes[1])?;
        Ok(ExceptionResponse {
            function,
            exception,
        })
    }
}

impl<'r> TryFrom<&'r [u8]> for Request<'r> {
    type Error = Error;

    fn try_from(bytes: &'r [u8]) -> Result<Self> {
        use FunctionCode as F;

        if bytes.is_empty() {
            return Err(Error::BufferSize);
        }

        let fn_code = bytes[0];

        if bytes.len() < min_request_pdu_len(FunctionCode::new(fn_code)) {
            return Err(Error::BufferSize);
        }

        let req = match FunctionCode::new(fn_code) {
            F::ReadCoils
            | F::ReadDiscreteInputs
            | F::ReadInputRegisters
            | F::ReadHoldingRegisters
            | F::WriteSingleRegister => {
                let addr = BigEndian::read_u16(&bytes[1..3]);
                let quantity = BigEndian::read_u16(&bytes[3..5]);

                match FunctionCode::new(fn_code) {
                    F::ReadCoils => Self::ReadCoils(addr, quantity),
                    F::ReadDiscreteInputs => Self::ReadDiscreteInputs(addr, quantity),
                    F::ReadInputRegisters => Self::ReadInputRegisters(addr, quantity),
                    F::ReadHoldingRegisters => Self::ReadHoldingRegisters(addr, quantity),
                    F::WriteSingleRegister => Self::WriteSingleRegister(addr, quantity),
                    _ => unreachable!(),
                }
            }
            F::WriteSingleCoil => Self::WriteSingleCoil(
                BigEndian::read_u16(&bytes[1..3]),
                u16_coil_to_bool(BigEndian::read_u16(&bytes[3..5]))?,
            ),
            F::WriteMultipleCoils => {
                let address = BigEndian::read_u16(&bytes[1..3]);
                let quantity = BigEndian::read_u16(&bytes[3..5]) as usize;
                let byte_count = bytes[5];
                if bytes.len() < (6 + byte_count as usize) {
                    return Err(Error::ByteCount(byte_count));
                }
                let data = &bytes[6..];
                let coils = Coils { data, quantity };
                Self::WriteMultipleCoils(address, coils)
            }
            F::WriteMultipleRegisters => {
                let address = BigEndian::read_u16(&bytes[1..3]);
                let quantity = BigEndian::read_u16(&bytes[3..5]) as usize;
                let byte_count = bytes[5];
                if bytes.len() < (6 + byte_count as usize) {
                    return Err(Error::ByteCount(byte_count));
                }
                let data = Data {
                    quantity,
                    data: &bytes[6..6 + byte_count as usize],
                };
                Self::WriteMultipleRegisters(address, data)
            }
            F::MaskWriteRegister => Self::MaskWriteRegister(
                BigEndian::read_u16(&bytes[1..3]),
                BigEndian::read_u16(&bytes[3..5]),
                BigEndian::read_u16(&bytes[5..7]),
            ),
            F::ReadWriteMultipleRegisters => {
                let read_address = BigEndian::read_u16(&bytes[1..3]);
                let read_quantity = BigEndian::read_u16(&bytes[3..5]);
                let write_address = BigEndian::read_u16(&bytes[5..7]);
                let write_quantity = BigEndian::read_u16(&bytes[7..9]) as usize;
                let write_count = bytes[9];
                if bytes.len() < (10 + write_count as usize) {
                    return Err(Error::ByteCount(write_count));
                }
                let data = Data {
                    quantity: write_quantity,
                    data: &bytes[10..10 + write_count as usize],
                };
                Self::ReadWriteMultipleRegisters(read_address, read_quantity, write_address, data)
            }
            F::ReadExceptionStatus => Self::ReadExceptionStatus,
            F::GetCommEventCounter => Self::GetCommEventCounter,
            F::GetCommEventLog => Self::GetCommEventLog,
            F::ReportServerId => Self::ReportServerId,
            F::Diagnostics => {
                let sub_fn = BigEndian::read_u16(&bytes[1..3]);
                let payload = &bytes[3..];
                Self::Diagnostics(
                    sub_fn,
                    Data {
                        quantity: payload.len() / 2,
                        data: payload,
                    },
                )
            }
            F::ReadFileRecord => {
                let byte_count = bytes[1] as usize;
                if bytes.len() < 2 + byte_count || byte_count % 6 != 0 {
                    return Err(Error::ByteCount(bytes[1]));
                }
                let items = bytes[2..2 + byte_count]
                    .chunks_exact(6)
                    .map(|chunk| FileRecordRequestItem {
                        file_number: BigEndian::read_u16(&chunk[0..2]),
                        record_number: BigEndian::read_u16(&chunk[2..4]),
                        record_length: BigEndian::read_u16(&chunk[4..6]),
                    })
                    .collect();
                Self::ReadFileRecord(items)
            }
            F::WriteFileRecord => {
                let byte_count = bytes[1] as usize;
                if bytes.len() < 2 + byte_count {
                    return Err(Error::ByteCount(bytes[1]));
                }
                let mut items = Vec::new();
                let mut rest = &bytes[2..2 + byte_count];
                while !rest.is_empty() {
                    if rest.len() < 7 {
                        return Err(Error::BufferSize);
                    }
                    let reference_type = rest[0];
                    if reference_type != FILE_RECORD_REFERENCE_TYPE {
                        return Err(Error::FileRecordReferenceType(reference_type));
                    }
                    let file_number = BigEndian::read_u16(&rest[1..3]);
                    let record_number = BigEndian::read_u16(&rest[3..5]);
                    let record_length = BigEndian::read_u16(&rest[5..7]) as usize;
                    if rest.len() < 7 + record_length * 2 {
                        return Err(Error::BufferSize);
                    }
                    let data = rest[7..7 + record_length * 2]
                        .chunks_exact(2)
                        .map(BigEndian::read_i16)
                        .collect();
                    items.push(FileRecordWriteItem {
                        file_number,
                        record_number,
                        data,
                    });
                    rest = &rest[7 + record_length * 2..];
                }
                Self::WriteFileRecord(items)
            }
            F::ReadFifoQueue => Self::ReadFifoQueue(BigEndian::read_u16(&bytes[1..3])),
            _ => match fn_code {
                fn_code if fn_code < 0x80 => {
                    Self::Custom(FunctionCode::Custom(fn_code), &bytes[1..])
                }
                _ => return Err(Error::FnCode(fn_code)),
            },
        };
        Ok(req)
    }
}

impl<'r> TryFrom<&'r [u8]> for Response<'r> {
    type Error = Error;

    fn try_from(bytes: &'r [u8]) -> Result<Self> {
        use FunctionCode as F;
        if bytes.is_empty() {
            return Err(Error::BufferSize);
        }
        let fn_code = bytes[0];
        if bytes.len() < min_response_pdu_len(FunctionCode::new(fn_code)) {
            return Err(Error::BufferSize);
        }
        let rsp = match FunctionCode::new(fn_code) {
            F::ReadCoils | FunctionCode::ReadDiscreteInputs => {
                let byte_count = bytes[1] as usize;
                if byte_count + 2 > bytes.len() {
                    return Err(Error::BufferSize);
                }
                let data = &bytes[2..byte_count + 2];
                // Here we have not information about the exact requested quantity
                // therefore we just assume that the whole byte is meant.
                let quantity = byte_count * 8;

                match FunctionCode::new(fn_code) {
                    FunctionCode::ReadCoils => Self::ReadCoils(Coils { data, quantity }),
                    FunctionCode::ReadDiscreteInputs => {
                        Self::ReadDiscreteInputs(Coils { data, quantity })
                    }
                    _ => unreachable!(),
                }
            }
            F::WriteSingleCoil => Self::WriteSingleCoil(
                BigEndian::read_u16(&bytes[1..3]),
                u16_coil_to_bool(BigEndian::read_u16(&bytes[3..5]))?,
            ),

            F::MaskWriteRegister => Self::MaskWriteRegister(
                BigEndian::read_u16(&bytes[1..3]),
                BigEndian::read_u16(&bytes[3..5]),
                BigEndian::read_u16(&bytes[5..7]),
            ),

            F::WriteMultipleCoils | F::WriteSingleRegister | F::WriteMultipleRegisters => {
                let addr = BigEndian::read_u16(&bytes[1..]);
                let payload = BigEndian::read_u16(&bytes[3..]);
                match FunctionCode::new(fn_code) {
                    F::WriteMultipleCoils => Self::WriteMultipleCoils(addr, payload),
                    F::WriteSingleRegister => Self::WriteSingleRegister(addr, payload),
                    F::WriteMultipleRegisters => Self::WriteMultipleRegisters(addr, payload),
                    _ => unreachable!(),
                }
            }
            F::ReadInputRegisters | F::ReadHoldingRegisters | F::ReadWriteMultipleRegisters => {
                let byte_count = bytes[1] as usize;
                let quantity = byte_count / 2;
                if byte_count + 2 > bytes.len() {
                    return Err(Error::BufferSize);
                }
                let data = &bytes[2..2 + byte_count];
                let data = Data { data, quantity };

                match FunctionCode::new(fn_code) {
                    F::ReadInputRegisters => Self::ReadInputRegisters(data),
                    F::ReadHoldingRegisters => Self::ReadHoldingRegisters(data),
                    F::ReadWriteMultipleRegisters => Self::ReadWriteMultipleRegisters(data),
                    _ => unreachable!(),
                }
            }
            F::ReadExceptionStatus => Self::ReadExceptionStatus(bytes[1]),
            F::GetCommEventCounter => Self::GetCommEventCounter(
                BigEndian::read_u16(&bytes[1..3]),
                BigEndian::read_u16(&bytes[3..5]),
            ),
            F::GetCommEventLog => {
                let status = u16::from(bytes[1]);
                let event_count = BigEndian::read_u16(&bytes[2..4]);
                let message_count = BigEndian::read_u16(&bytes[4..6]);
                Self::GetCommEventLog(status, event_count, message_count, &bytes[6..])
            }
            F::ReportServerId => {
                if bytes.len() < 3 {
                    return Err(Error::BufferSize);
                }
                // byte 1 is the slave id, echoed by the transport's unit id and not
                // retained here; byte 2 is the run indicator, the rest is vendor data.
                Self::ReportServerId(&bytes[3..], bytes[2] == 0xFF)
            }
            F::Diagnostics => {
                let sub_fn = BigEndian::read_u16(&bytes[1..3]);
                let payload = &bytes[3..];
                Self::Diagnostics(
                    sub_fn,
                    Data {
                        quantity: payload.len() / 2,
                        data: payload,
                    },
                )
            }
            F::ReadFileRecord => {
                let resp_len = bytes[1] as usize;
                if bytes.len() < 2 + resp_len {
                    return Err(Error::ByteCount(bytes[1]));
                }
                let mut items = Vec::new();
                let mut rest = &bytes[2..2 + resp_len];
                while !rest.is_empty() {
                    if rest.len() < 6 {
                        return Err(Error::BufferSize);
                    }
                    let reference_type = rest[0];
                    if reference_type != FILE_RECORD_REFERENCE_TYPE {
                        return Err(Error::FileRecordReferenceType(reference_type));
                    }
                    let data_len = rest[1] as usize;
                    let file_number = BigEndian::read_u16(&rest[2..4]);
                    let record_number = BigEndian::read_u16(&rest[4..6]);
                    if rest.len() < 6 + data_len {
                        return Err(Error::BufferSize);
                    }
                    let data = rest[6..6 + data_len]
                        .chunks_exact(2)
                        .map(BigEndian::read_i16)
                        .collect();
                    items.push(FileRecordResponseItem {
                        file_number,
                        record_number,
                        data,
                    });
                    rest = &rest[6 + data_len..];
                }
                Self::ReadFileRecord(items)
            }
            F::WriteFileRecord => {
                let byte_count = bytes[1] as usize;
                if bytes.len() < 2 + byte_count {
                    return Err(Error::ByteCount(bytes[1]));
                }
                let mut items = Vec::new();
                let mut rest = &bytes[2..2 + byte_count];
                while !rest.is_empty() {
                    if rest.len() < 7 {
                        return Err(Error::BufferSize);
                    }
                    let reference_type = rest[0];
                    if reference_type != FILE_RECORD_REFERENCE_TYPE {
                        return Err(Error::FileRecordReferenceType(reference_type));
                    }
                    let file_number = BigEndian::read_u16(&rest[1..3]);
                    let record_number = BigEndian::read_u16(&rest[3..5]);
                    let record_length = BigEndian::read_u16(&rest[5..7]) as usize;
                    if rest.len() < 7 + record_length * 2 {
                        return Err(Error::BufferSize);
                    }
                    let data = rest[7..7 + record_length * 2]
                        .chunks_exact(2)
                        .map(BigEndian::read_i16)
                        .collect();
                    items.push(FileRecordWriteItem {
                        file_number,
                        record_number,
                        data,
                    });
                    rest = &rest[7 + record_length * 2..];
                }
                Self::WriteFileRecord(items)
            }
            F::ReadFifoQueue => {
                let byte_count = BigEndian::read_u16(&bytes[1..3]) as usize;
                let fifo_count = BigEndian::read_u16(&bytes[3..5]) as usize;
                if byte_count != 2 + fifo_count * 2 || fifo_count > 31 {
                    return Err(Error::FifoCount(fifo_count as u16));
                }
                if bytes.len() < 5 + fifo_count * 2 {
                    return Err(Error::BufferSize);
                }
                let values = bytes[5..5 + fifo_count * 2]
                    .chunks_exact(2)
                    .map(BigEndian::read_u16)
                    .collect();
                Self::ReadFifoQueue(values)
            }
            _ => Self::Custom(FunctionCode::new(fn_code), &bytes[1..]),
        };
        Ok(rsp)
    }
}

/// Encode a struct into a buffer.
pub trait Encode {
    fn encode(&self, buf: &mut [u8]) -> Result<usize>;
}

impl Encode for Request<'_> {
    fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < self.pdu_len() {
            return Err(Error::BufferSize);
        }
        buf[0] = FunctionCode::from(self).value();
        match self {
            Self::ReadCoils(address, payload)
            | Self::ReadDiscreteInputs(address, payload)
            | Self::ReadInputRegisters(address, payload)
            | Self::ReadHoldingRegisters(address, payload)
            | Self::WriteSingleRegister(address, payload) => {
                BigEndian::write_u16(&mut buf[1..], *address);
                BigEndian::write_u16(&mut buf[3..], *payload);
            }
            Self::WriteSingleCoil(address, state) => {
                BigEndian::write_u16(&mut buf[1..], *address);
                BigEndian::write_u16(&mut buf[3..], bool_to_u16_coil(*state));
            }
            Self::WriteMultipleCoils(address, coils) => {
                BigEndian::write_u16(&mut buf[1..], *address);
                let len = coils.len();
                BigEndian::write_u16(&mut buf[3..], len as u16);
                buf[5] = coils.packed_len() as u8;
                coils.copy_to(&mut buf[6..]);
            }
            Self::WriteMultipleRegisters(address, words) => {
                BigEndian::write_u16(&mut buf[1..], *address);
                let len = words.len();
                BigEndian::write_u16(&mut buf[3..], len as u16);
                buf[5] = len as u8 * 2;
                for (idx, byte) in words.data.iter().enumerate() {
                    buf[idx + 6] = *byte;
                }
            }
            Self::MaskWriteRegister(address, and_mask, or_mask) => {
                BigEndian::write_u16(&mut buf[1..], *address);
                BigEndian::write_u16(&mut buf[3..], *and_mask);
                BigEndian::write_u16(&mut buf[5..], *or_mask);
            }
            Self::ReadWriteMultipleRegisters(read_address, quantity, write_address, words) => {
                BigEndian::write_u16(&mut buf[1..], *read_address);
                BigEndian::write_u16(&mut buf[3..], *quantity);
                BigEndian::write_u16(&mut buf[5..], *write_address);
                let n = words.len();
                BigEndian::write_u16(&mut buf[7..], n as u16);
                buf[9] = n as u8 * 2;
                for (idx, byte) in words.data.iter().enumerate() {
                    buf[idx + 10] = *byte;
                }
            }
            Self::Custom(_, custom_data) => {
                custom_data.iter().enumerate().for_each(|(idx, d)| {
                    buf[idx + 1] = *d;
                });
            }
            Self::ReadExceptionStatus | Self::GetCommEventCounter | Self::GetCommEventLog => {}
            Self::ReportServerId => {}
            Self::Diagnostics(sub_fn, data) => {
                BigEndian::write_u16(&mut buf[1..], *sub_fn);
                for (idx, byte) in data.data.iter().enumerate() {
                    buf[idx + 3] = *byte;
                }
            }
            Self::ReadFileRecord(items) => {
                buf[1] = (items.len() * 6) as u8;
                let mut offset = 2;
                for item in items {
                    BigEndian::write_u16(&mut buf[offset..], item.file_number);
                    BigEndian::write_u16(&mut buf[offset + 2..], item.record_number);
                    BigEndian::write_u16(&mut buf[offset + 4..], item.record_length);
                    offset += 6;
                }
            }
            Self::WriteFileRecord(items) => {
                let byte_count: usize = items.iter().map(|item| 7 + item.data.len() * 2).sum();
                buf[1] = byte_count as u8;
                let mut offset = 2;
                for item in items {
                    buf[offset] = FILE_RECORD_REFERENCE_TYPE;
                    BigEndian::write_u16(&mut buf[offset + 1..], item.file_number);
                    BigEndian::write_u16(&mut buf[offset + 3..], item.record_number);
                    BigEndian::write_u16(&mut buf[offset + 5..], item.data.len() as u16);
                    offset += 7;
                    for value in &item.data {
                        BigEndian::write_i16(&mut buf[offset..], *value);
                        offset += 2;
                    }
                }
            }
            Self::ReadFifoQueue(address) => {
                BigEndian::write_u16(&mut buf[1..], *address);
            }
        }
        Ok(self.pdu_len())
    }
}

impl Encode for Response<'_> {
    fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < self.pdu_len() {
            return Err(Error::BufferSize);
        }

        buf[0] = FunctionCode::from(self).value();
        match self {
            Self::ReadCoils(coils) | Self::ReadDiscreteInputs(coils) => {
                buf[1] = coils.packed_len() as u8;
                coils.copy_to(&mut buf[2..]);
            }
            Self::ReadInputRegisters(registers)
            | Self::ReadHoldingRegisters(registers)
            | Self::ReadWriteMultipleRegisters(registers) => {
                buf[1] = (registers.len() * 2) as u8;
                registers.copy_to(&mut buf[2..]);
            }
            Self::WriteSingleCoil(address, state) => {
                BigEndian::write_u16(&mut buf[1..], *address);
                BigEndian::write_u16(&mut buf[3..], bool_to_u16_coil(*state));
            }
            Self::WriteMultipleCoils(address, payload)
            | Self::WriteMultipleRegisters(address, payload)
            | Self::WriteSingleRegister(address, payload) => {
                BigEndian::write_u16(&mut buf[1..], *address);
                BigEndian::write_u16(&mut buf[3..], *payload);
            }
            Self::MaskWriteRegister(address, and_mask, or_mask) => {
                BigEndian::write_u16(&mut buf[1..], *address);
                BigEndian::write_u16(&mut buf[3..], *and_mask);
                BigEndian::write_u16(&mut buf[5..], *or_mask);
            }
            Self::Custom(_, custom_data) => {
                for (idx, d) in custom_data.iter().enumerate() {
                    buf[idx + 1] = *d;
                }
            }
            Self::ReadExceptionStatus(status) => {
                buf[1] = *status;
            }
            Self::Diagnostics(sub_fn, data) => {
                BigEndian::write_u16(&mut buf[1..], *sub_fn);
                for (idx, byte) in data.data.iter().enumerate() {
                    buf[idx + 3] = *byte;
                }
            }
            Self::GetCommEventCounter(status, event_count) => {
                BigEndian::write_u16(&mut buf[1..], *status);
                BigEndian::write_u16(&mut buf[3..], *event_count);
            }
            Self::GetCommEventLog(status, event_count, message_count, events) => {
                buf[1] = *status as u8;
                BigEndian::write_u16(&mut buf[2..], *event_count);
                BigEndian::write_u16(&mut buf[4..], *message_count);
                for (idx, byte) in events.iter().enumerate() {
                    buf[idx + 6] = *byte;
                }
            }
            Self::ReportServerId(extra, run_indicator) => {
                buf[1] = 0x00;
                buf[2] = if *run_indicator { 0xFF } else { 0x00 };
                for (idx, byte) in extra.iter().enumerate() {
                    buf[idx + 3] = *byte;
                }
            }
            Self::ReadFileRecord(items) => {
                let resp_len: usize = items.iter().map(|item| 6 + item.data.len() * 2).sum();
                buf[1] = resp_len as u8;
                let mut offset = 2;
                for item in items {
                    buf[offset] = FILE_RECORD_REFERENCE_TYPE;
                    buf[offset + 1] = (item.data.len() * 2) as u8;
                    BigEndian::write_u16(&mut buf[offset + 2..], item.file_number);
                    BigEndian::write_u16(&mut buf[offset + 4..], item.record_number);
                    offset += 6;
                    for value in &item.data {
                        BigEndian::write_i16(&mut buf[offset..], *value);
                        offset += 2;
                    }
                }
            }
            Self::WriteFileRecord(items) => {
                let byte_count: usize = items.iter().map(|item| 7 + item.data.len() * 2).sum();
                buf[1] = byte_count as u8;
                let mut offset = 2;
                for item in items {
                    buf[offset] = FILE_RECORD_REFERENCE_TYPE;
                    BigEndian::write_u16(&mut buf[offset + 1..], item.file_number);
                    BigEndian::write_u16(&mut buf[offset + 3..], item.record_number);
                    BigEndian::write_u16(&mut buf[offset + 5..], item.data.len() as u16);
                    offset += 7;
                    for value in &item.data {
                        BigEndian::write_i16(&mut buf[offset..], *value);
                        offset += 2;
                    }
                }
            }
            Self::ReadFifoQueue(values) => {
                BigEndian::write_u16(&mut buf[1..], (2 + values.len() * 2) as u16);
                BigEndian::write_u16(&mut buf[3..], values.len() as u16);
                let mut offset = 5;
                for value in values {
                    BigEndian::write_u16(&mut buf[offset..], *value);
                    offset += 2;
                }
            }
        }
        Ok(self.pdu_len())
    }
}

impl Encode for RequestPdu<'_> {
    fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        self.0.encode(buf)
    }
}

impl Encode for ResponsePdu<'_> {
    fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(Error::BufferSize);
        }
        match self.0 {
            Ok(res) => res.encode(buf),
            Err(e) => e.encode(buf),
        }
    }
}

impl Encode for ExceptionResponse {
    fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(Error::BufferSize);
        }
        let [code, ex]: [u8; 2] = (*self).into();
        buf[0] = code;
        buf[1] = ex;
        Ok(2)
    }
}

const fn min_request_pdu_len(fn_code: FunctionCode) -> usize {
    use FunctionCode as F;
    match fn_code {
        F::ReadCoils
        | F::ReadDiscreteInputs
        | F::ReadInputRegisters
        | F::WriteSingleCoil
        | F::ReadHoldingRegisters
        | F::WriteSingleRegister => 5,
        F::WriteMultipleCoils | F::WriteMultipleRegisters => 6,
        F::MaskWriteRegister => 7,
        F::ReadWriteMultipleRegisters => 10,
        F::Diagnostics => 3,
        F::ReadFifoQueue => 3,
        F::ReadFileRecord | F::WriteFileRecord => 2,
        _ => 1,
    }
}

const fn min_response_pdu_len(fn_code: FunctionCode) -> usize {
    use FunctionCode as F;
    match fn_code {
        F::ReadCoils
        | F::ReadDiscreteInputs
        | F::ReadInputRegisters
        | F::ReadHoldingRegisters
        | F::ReadWriteMultipleRegisters => 2,
        F::WriteSingleCoil => 3,
        F::WriteMultipleCoils | F::WriteSingleRegister | F::WriteMultipleRegisters => 5,
        F::MaskWriteRegister => 7,
        F::ReadExceptionStatus => 2,
        F::Diagnostics => 3,
        F::GetCommEventCounter => 5,
        F::GetCommEventLog => 6,
        F::ReportServerId => 3,
        F::ReadFileRecord | F::WriteFileRecord => 2,
        F::ReadFifoQueue => 5,
        _ => 1,
    }
}
