//! Raw byte-string fields
//!
//! One kind covers the byte-string shapes that occur in practice: a fixed
//! width, "everything left in this layer", a length prefix carried on the
//! wire, and a length linked to an already-parsed sibling field (IPv4 and
//! TCP options are sized this way, from the header-length field).

use crate::errors::Error;
use crate::packet::Packet;
use crate::types::Value;
use crate::wire::{Endian, WireReader, WireWriter};

use super::FieldKind;

/// Computes a wire length from the partially dissected packet, typically
/// by reading a sibling field that was parsed earlier.
pub type LenHint = fn(&Packet) -> usize;

#[derive(Debug, Clone, Copy)]
enum Len {
    Fixed(usize),
    Rest,
    Prefixed(usize),
    From(LenHint),
}

#[derive(Debug, Clone, Copy)]
pub struct BytesField {
    len: Len,
}

impl BytesField {
    pub fn fixed(width: usize) -> Self {
        Self {
            len: Len::Fixed(width),
        }
    }

    pub fn rest() -> Self {
        Self { len: Len::Rest }
    }

    pub fn prefixed(prefix: usize) -> Self {
        assert!(prefix >= 1 && prefix <= 4, "prefix width out of range");
        Self {
            len: Len::Prefixed(prefix),
        }
    }

    pub fn from_sibling(hint: LenHint) -> Self {
        Self {
            len: Len::From(hint),
        }
    }
}

impl FieldKind for BytesField {
    fn normalize(&self, value: Value) -> Result<Value, Error> {
        let bytes = match value {
            Value::Bytes(b) => b,
            Value::Str(s) => s.into_bytes(),
            other => {
                return Err(Error::BuildError(format!(
                    "expected bytes, got {}",
                    other.kind_name()
                )))
            }
        };
        if let Len::Fixed(n) = self.len {
            if bytes.len() > n {
                return Err(Error::BuildError(format!(
                    "{} byte(s) exceed fixed width {}",
                    bytes.len(),
                    n
                )));
            }
        }
        Ok(Value::Bytes(bytes))
    }

    fn emit(&self, _pkt: &Packet, value: &Value, w: &mut WireWriter) -> Result<(), Error> {
        let bytes = value.as_bytes().ok_or_else(|| {
            Error::BuildError(format!("expected bytes, got {}", value.kind_name()))
        })?;
        match self.len {
            Len::Fixed(n) => {
                w.put_bytes(bytes);
                if bytes.len() < n {
                    w.put_bytes(&vec![0u8; n - bytes.len()]);
                }
            }
            Len::Rest | Len::From(_) => w.put_bytes(bytes),
            Len::Prefixed(p) => {
                let max = if p >= 8 { u64::MAX } else { (1u64 << (p * 8)) - 1 };
                if bytes.len() as u64 > max {
                    return Err(Error::BuildError(format!(
                        "{} byte(s) exceed a {}-byte length prefix",
                        bytes.len(),
                        p
                    )));
                }
                w.put_uint(bytes.len() as u64, p, Endian::Big);
                w.put_bytes(bytes);
            }
        }
        Ok(())
    }

    fn parse(&self, pkt: &Packet, r: &mut WireReader) -> Result<Value, Error> {
        let bytes = match self.len {
            Len::Fixed(n) => r.take(n),
            Len::Rest => r.rest(),
            Len::Prefixed(p) => {
                let n = r.take_uint(p, Endian::Big) as usize;
                r.take(n)
            }
            Len::From(hint) => {
                let n = hint(pkt);
                r.take(n)
            }
        };
        Ok(Value::Bytes(bytes.to_vec()))
    }

    fn wire_len(&self, value: &Value) -> usize {
        let content = value.as_bytes().map(<[u8]>::len).unwrap_or(0);
        match self.len {
            Len::Fixed(n) => n,
            Len::Rest | Len::From(_) => content,
            Len::Prefixed(p) => p + content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;
    use crate::ptype::PacketType;

    fn scratch() -> Packet {
        let t = PacketType::builder("BytesScratch")
            .field(FieldSpec::u8("x", 0))
            .build()
            .unwrap();
        Packet::new(t)
    }

    #[test]
    fn fixed_pads_and_rejects_overflow() {
        let p = scratch();
        let f = BytesField::fixed(4);
        let mut w = WireWriter::new();
        f.emit(&p, &Value::Bytes(vec![0xab, 0xcd]), &mut w).unwrap();
        let (out, _) = w.finish();
        assert_eq!(out, vec![0xab, 0xcd, 0, 0]);

        assert!(f.normalize(Value::Bytes(vec![0; 5])).is_err());
    }

    #[test]
    fn prefixed_round_trip() {
        let p = scratch();
        let f = BytesField::prefixed(1);
        let mut w = WireWriter::new();
        f.emit(&p, &Value::Bytes(b"abc".to_vec()), &mut w).unwrap();
        let (out, _) = w.finish();
        assert_eq!(out, vec![3, b'a', b'b', b'c']);

        let mut r = WireReader::new(&out);
        assert_eq!(f.parse(&p, &mut r).unwrap(), Value::Bytes(b"abc".to_vec()));
        assert!(r.is_empty());
    }

    #[test]
    fn prefixed_truncated_consumes_available() {
        let p = scratch();
        let f = BytesField::prefixed(1);
        let bytes = [5u8, b'a', b'b'];
        let mut r = WireReader::new(&bytes);
        assert_eq!(f.parse(&p, &mut r).unwrap(), Value::Bytes(b"ab".to_vec()));
        assert!(r.is_empty());
    }

    #[test]
    fn str_normalizes_to_bytes() {
        let f = BytesField::rest();
        assert_eq!(
            f.normalize(Value::Str("hi".into())).unwrap(),
            Value::Bytes(b"hi".to_vec())
        );
    }
}
