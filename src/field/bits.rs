//! Sub-byte bit fields
//!
//! Consecutive bit fields of one packet type share a carry in the wire
//! writer/reader, so a run of widths summing to a byte multiple packs
//! exactly. The declared width is signed: a negative width means the bit
//! order inside the field is reversed, which a handful of link-layer
//! protocols require.

use crate::errors::Error;
use crate::packet::Packet;
use crate::types::Value;
use crate::wire::{WireReader, WireWriter};

use super::FieldKind;

#[derive(Debug, Clone, Copy)]
pub struct BitField {
    bits: u32,
    reversed: bool,
}

impl BitField {
    pub fn new(bits: i8) -> Self {
        assert!(bits != 0 && bits.unsigned_abs() <= 32, "bit width out of range");
        Self {
            bits: bits.unsigned_abs() as u32,
            reversed: bits < 0,
        }
    }

    fn max(&self) -> u64 {
        (1u64 << self.bits) - 1
    }

    /// Mirror the low `bits` bits of `v`.
    fn reverse(&self, v: u64) -> u64 {
        let mut out = 0u64;
        for i in 0..self.bits {
            out |= ((v >> i) & 1) << (self.bits - 1 - i);
        }
        out
    }
}

impl FieldKind for BitField {
    fn normalize(&self, value: Value) -> Result<Value, Error> {
        match value {
            Value::UInt(v) if v <= self.max() => Ok(Value::UInt(v)),
            Value::UInt(v) => Err(Error::BuildError(format!(
                "{} does not fit in {} bit(s)",
                v, self.bits
            ))),
            other => Err(Error::BuildError(format!(
                "expected uint, got {}",
                other.kind_name()
            ))),
        }
    }

    fn emit(&self, _pkt: &Packet, value: &Value, w: &mut WireWriter) -> Result<(), Error> {
        let v = value
            .as_u64()
            .ok_or_else(|| Error::BuildError(format!("expected uint, got {}", value.kind_name())))?;
        let v = if self.reversed { self.reverse(v) } else { v };
        w.put_bits(v, self.bits);
        Ok(())
    }

    fn parse(&self, _pkt: &Packet, r: &mut WireReader) -> Result<Value, Error> {
        let v = r.take_bits(self.bits);
        let v = if self.reversed { self.reverse(v) } else { v };
        Ok(Value::UInt(v))
    }

    /// Rounded-up contribution; exact only at byte boundaries.
    fn wire_len(&self, _value: &Value) -> usize {
        (self.bits as usize + 7) / 8
    }
}
