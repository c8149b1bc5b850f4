// SPDX-FileCopyrightText: Copyright (c) 2018-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire-format configuration: byte/word order and float interpretation.
//!
//! Real Modbus networks are always big-endian on the wire; this crate's
//! configurable byte order exists for the server/client register-value
//! layer and for composing the optional float overlay, not for the raw
//! PDU framing (which stays big-endian, matching the protocol and the
//! teacher's existing `Data`/`Coils` view types).

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use crate::frame::AddressSpan;

/// Byte order applied to 16-bit register values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    BigEndian,
    LittleEndian,
}

/// Order in which two registers are combined into a 32-bit float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordOrder {
    #[default]
    HighWordFirst,
    LowWordFirst,
}

/// How a client-level float count argument maps onto a register count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FloatCountSemantics {
    #[default]
    CountIsFloatCount,
    CountIsRegisterCount,
}

/// Per-instance wire-format configuration for a client or server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireFormatOptions {
    pub byte_order: ByteOrder,
    pub word_order: WordOrder,
    pub float_count_semantics: FloatCountSemantics,
    pub float_range: Option<AddressSpan>,
}

pub(crate) fn read_u16(buf: &[u8], order: ByteOrder) -> u16 {
    match order {
        ByteOrder::BigEndian => BigEndian::read_u16(buf),
        ByteOrder::LittleEndian => LittleEndian::read_u16(buf),
    }
}

pub(crate) fn write_u16(buf: &mut [u8], value: u16, order: ByteOrder) {
    match order {
        ByteOrder::BigEndian => BigEndian::write_u16(buf, value),
        ByteOrder::LittleEndian => LittleEndian::write_u16(buf, value),
    }
}

/// Decode a 32-bit float from two consecutive registers.
pub(crate) fn decode_f32(hi_first: u16, lo_first: u16, word_order: WordOrder) -> f32 {
    let (hi, lo) = match word_order {
        WordOrder::HighWordFirst => (hi_first, lo_first),
        WordOrder::LowWordFirst => (lo_first, hi_first),
    };
    let bits = (u32::from(hi) << 16) | u32::from(lo);
    f32::from_bits(bits)
}

/// Encode a 32-bit float into two registers, in wire order.
pub(crate) fn encode_f32(value: f32, word_order: WordOrder) -> (u16, u16) {
    let bits = value.to_bits();
    let hi = (bits >> 16) as u16;
    let lo = bits as u16;
    match word_order {
        WordOrder::HighWordFirst => (hi, lo),
        WordOrder::LowWordFirst => (lo, hi),
    }
}
