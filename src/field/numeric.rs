//! Fixed-width unsigned integer fields

use crate::errors::Error;
use crate::packet::Packet;
use crate::types::{hex as hexfmt, Value};
use crate::wire::{Endian, WireReader, WireWriter};

use super::FieldKind;

/// An unsigned integer occupying `width` bytes on the wire.
#[derive(Debug, Clone, Copy)]
pub struct UIntField {
    width: usize,
    endian: Endian,
    hex: bool,
}

impl UIntField {
    pub fn new(width: usize, endian: Endian) -> Self {
        assert!(width >= 1 && width <= 8, "width out of range");
        Self {
            width,
            endian,
            hex: false,
        }
    }

    /// Display (and serialize) the value as hex.
    pub fn hex(mut self) -> Self {
        self.hex = true;
        self
    }

    fn max(&self) -> u64 {
        if self.width == 8 {
            u64::MAX
        } else {
            (1u64 << (self.width * 8)) - 1
        }
    }
}

impl FieldKind for UIntField {
    fn normalize(&self, value: Value) -> Result<Value, Error> {
        match value {
            Value::UInt(v) if v <= self.max() => Ok(Value::UInt(v)),
            Value::UInt(v) => Err(Error::BuildError(format!(
                "{} does not fit in {} byte(s)",
                v, self.width
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
        w.put_uint(v, self.width, self.endian);
        Ok(())
    }

    fn parse(&self, _pkt: &Packet, r: &mut WireReader) -> Result<Value, Error> {
        Ok(Value::UInt(r.take_uint(self.width, self.endian)))
    }

    fn wire_len(&self, _value: &Value) -> usize {
        self.width
    }

    fn display(&self, value: &Value) -> String {
        match value.as_u64() {
            Some(v) if self.hex => hexfmt::format_hex(self.width, v),
            _ => value.to_string(),
        }
    }
}
