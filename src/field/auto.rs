//! Deferred length and checksum fields
//!
//! Both kinds emit a typed hole when their value is unset and are patched
//! by the construction pipeline once the layer's bytes are assembled.
//! Length holes patch first, checksum holes second, so a checksum always
//! covers the final length bytes. An explicitly assigned value suppresses
//! the computation entirely, which is how deliberately wrong checksums are
//! crafted.

use crate::errors::Error;
use crate::packet::Packet;
use crate::types::{hex as hexfmt, Value};
use crate::wire::{uint_to_bytes, Endian, PatchPhase, WireReader, WireWriter};

use super::{FieldKind, PatchCtx};

/// What a deferred length field measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    /// The payload bytes of this layer.
    Payload,
    /// Header plus payload of this layer.
    Packet,
    /// The built bytes of one named sibling field.
    Field(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct LenField {
    width: usize,
    endian: Endian,
    measure: Measure,
    adjust: i64,
}

impl LenField {
    pub fn new(width: usize, endian: Endian, measure: Measure, adjust: i64) -> Self {
        assert!(width >= 1 && width <= 8, "width out of range");
        Self {
            width,
            endian,
            measure,
            adjust,
        }
    }

    fn max(&self) -> u64 {
        if self.width == 8 {
            u64::MAX
        } else {
            (1u64 << (self.width * 8)) - 1
        }
    }
}

impl FieldKind for LenField {
    fn normalize(&self, value: Value) -> Result<Value, Error> {
        match value {
            Value::None => Ok(Value::None),
            Value::UInt(v) if v <= self.max() => Ok(Value::UInt(v)),
            Value::UInt(v) => Err(Error::BuildError(format!(
                "{} does not fit in {} byte(s)",
                v, self.width
            ))),
            other => Err(Error::BuildError(format!(
                "expected uint or unset, got {}",
                other.kind_name()
            ))),
        }
    }

    fn emit(&self, _pkt: &Packet, value: &Value, w: &mut WireWriter) -> Result<(), Error> {
        match value {
            Value::None => {
                w.put_hole(self.width, PatchPhase::Length);
                Ok(())
            }
            Value::UInt(v) => {
                w.put_uint(*v, self.width, self.endian);
                Ok(())
            }
            other => Err(Error::BuildError(format!(
                "expected uint or unset, got {}",
                other.kind_name()
            ))),
        }
    }

    fn parse(&self, _pkt: &Packet, r: &mut WireReader) -> Result<Value, Error> {
        Ok(Value::UInt(r.take_uint(self.width, self.endian)))
    }

    fn wire_len(&self, _value: &Value) -> usize {
        self.width
    }

    fn display(&self, value: &Value) -> String {
        match value {
            Value::None => "auto".to_string(),
            v => v.to_string(),
        }
    }

    fn patch(&self, ctx: &PatchCtx) -> Result<Vec<u8>, Error> {
        let measured = match self.measure {
            Measure::Payload => ctx.payload_len,
            Measure::Packet => ctx.header_len + ctx.payload_len,
            Measure::Field(name) => {
                let index = ctx
                    .pkt
                    .packet_type()
                    .field_index(name)
                    .ok_or_else(|| Error::NoSuchField(name.to_string()))?;
                let (start, end) = ctx.spans[index];
                end - start
            }
        };
        let v = measured as i64 + self.adjust;
        if v < 0 || v as u64 > self.max() {
            return Err(Error::BuildError(format!(
                "measured length {} does not fit in {} byte(s)",
                v, self.width
            )));
        }
        Ok(uint_to_bytes(v as u64, self.width, self.endian))
    }
}

/// Computes the final checksum value from the assembled byte range. The
/// context carries the underlay instance for pseudo-header algorithms.
pub type ChecksumFn = fn(&PatchCtx) -> u64;

#[derive(Debug, Clone, Copy)]
pub struct ChecksumField {
    width: usize,
    endian: Endian,
    algo: ChecksumFn,
}

impl ChecksumField {
    pub fn new(width: usize, endian: Endian, algo: ChecksumFn) -> Self {
        assert!(width >= 1 && width <= 8, "width out of range");
        Self {
            width,
            endian,
            algo,
        }
    }

    fn max(&self) -> u64 {
        if self.width == 8 {
            u64::MAX
        } else {
            (1u64 << (self.width * 8)) - 1
        }
    }
}

impl FieldKind for ChecksumField {
    fn normalize(&self, value: Value) -> Result<Value, Error> {
        match value {
            Value::None => Ok(Value::None),
            Value::UInt(v) if v <= self.max() => Ok(Value::UInt(v)),
            Value::UInt(v) => Err(Error::BuildError(format!(
                "{} does not fit in {} byte(s)",
                v, self.width
            ))),
            other => Err(Error::BuildError(format!(
                "expected uint or unset, got {}",
                other.kind_name()
            ))),
        }
    }

    fn emit(&self, _pkt: &Packet, value: &Value, w: &mut WireWriter) -> Result<(), Error> {
        match value {
            Value::None => {
                w.put_hole(self.width, PatchPhase::Checksum);
                Ok(())
            }
            Value::UInt(v) => {
                w.put_uint(*v, self.width, self.endian);
                Ok(())
            }
            other => Err(Error::BuildError(format!(
                "expected uint or unset, got {}",
                other.kind_name()
            ))),
        }
    }

    fn parse(&self, _pkt: &Packet, r: &mut WireReader) -> Result<Value, Error> {
        Ok(Value::UInt(r.take_uint(self.width, self.endian)))
    }

    fn wire_len(&self, _value: &Value) -> usize {
        self.width
    }

    fn display(&self, value: &Value) -> String {
        match value.as_u64() {
            Some(v) => hexfmt::format_hex(self.width, v),
            None => "auto".to_string(),
        }
    }

    fn patch(&self, ctx: &PatchCtx) -> Result<Vec<u8>, Error> {
        let v = (self.algo)(ctx);
        if v > self.max() {
            return Err(Error::BuildError(format!(
                "checksum {} does not fit in {} byte(s)",
                v, self.width
            )));
        }
        Ok(uint_to_bytes(v, self.width, self.endian))
    }
}
