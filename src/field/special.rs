//! Address fields and structural wrappers
//!
//! [`MacField`]/[`Ip4Field`] are the 6- and 4-byte address kinds.
//! [`CondField`] guards another kind behind a predicate, [`ListField`]
//! repeats one, and [`PacketField`] embeds a whole nested packet as a
//! field value.

use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::errors::Error;
use crate::packet::Packet;
use crate::types::{MacAddr, Value};
use crate::wire::{WireReader, WireWriter};

use super::FieldKind;

#[derive(Debug, Clone, Copy)]
pub struct MacField;

impl FieldKind for MacField {
    fn normalize(&self, value: Value) -> Result<Value, Error> {
        match value {
            Value::Mac(m) => Ok(Value::Mac(m)),
            Value::Str(s) => Ok(Value::Mac(s.parse()?)),
            Value::Bytes(b) => Ok(Value::Mac(MacAddr::try_from(b.as_slice())?)),
            other => Err(Error::BuildError(format!(
                "expected mac, got {}",
                other.kind_name()
            ))),
        }
    }

    fn emit(&self, _pkt: &Packet, value: &Value, w: &mut WireWriter) -> Result<(), Error> {
        let m = value
            .as_mac()
            .ok_or_else(|| Error::BuildError(format!("expected mac, got {}", value.kind_name())))?;
        w.put_bytes(m.as_slice());
        Ok(())
    }

    fn parse(&self, _pkt: &Packet, r: &mut WireReader) -> Result<Value, Error> {
        let bytes = r.take(6);
        let mut octets = [0u8; 6];
        octets[..bytes.len()].copy_from_slice(bytes);
        Ok(Value::Mac(octets.into()))
    }

    fn wire_len(&self, _value: &Value) -> usize {
        6
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Ip4Field;

impl FieldKind for Ip4Field {
    fn normalize(&self, value: Value) -> Result<Value, Error> {
        match value {
            Value::Ip4(a) => Ok(Value::Ip4(a)),
            Value::Str(s) => {
                let a: Ipv4Addr = s
                    .parse()
                    .map_err(|_| Error::ParseError(format!("Ipv4Addr: {}", s)))?;
                Ok(Value::Ip4(a))
            }
            Value::UInt(v) if v <= u32::MAX as u64 => Ok(Value::Ip4(Ipv4Addr::from(v as u32))),
            other => Err(Error::BuildError(format!(
                "expected ip4, got {}",
                other.kind_name()
            ))),
        }
    }

    fn emit(&self, _pkt: &Packet, value: &Value, w: &mut WireWriter) -> Result<(), Error> {
        let a = value
            .as_ip4()
            .ok_or_else(|| Error::BuildError(format!("expected ip4, got {}", value.kind_name())))?;
        w.put_bytes(&a.octets());
        Ok(())
    }

    fn parse(&self, _pkt: &Packet, r: &mut WireReader) -> Result<Value, Error> {
        let bytes = r.take(4);
        let mut octets = [0u8; 4];
        octets[..bytes.len()].copy_from_slice(bytes);
        Ok(Value::Ip4(Ipv4Addr::from(octets)))
    }

    fn wire_len(&self, _value: &Value) -> usize {
        4
    }
}

/// Wraps another kind behind a predicate over the (partially resolved)
/// instance. A false predicate suppresses the field in both directions: no
/// bytes consumed, no bytes emitted. The dissection pipeline stores nothing
/// for a suppressed field, so reads fall back to the default.
#[derive(Debug)]
pub struct CondField {
    inner: Arc<dyn FieldKind>,
    predicate: fn(&Packet) -> bool,
}

impl CondField {
    pub fn new(inner: Arc<dyn FieldKind>, predicate: fn(&Packet) -> bool) -> Self {
        Self { inner, predicate }
    }
}

impl FieldKind for CondField {
    fn normalize(&self, value: Value) -> Result<Value, Error> {
        self.inner.normalize(value)
    }

    fn emit(&self, pkt: &Packet, value: &Value, w: &mut WireWriter) -> Result<(), Error> {
        if (self.predicate)(pkt) {
            self.inner.emit(pkt, value, w)
        } else {
            Ok(())
        }
    }

    fn parse(&self, pkt: &Packet, r: &mut WireReader) -> Result<Value, Error> {
        if (self.predicate)(pkt) {
            self.inner.parse(pkt, r)
        } else {
            Ok(Value::None)
        }
    }

    fn wire_len(&self, value: &Value) -> usize {
        self.inner.wire_len(value)
    }

    fn display(&self, value: &Value) -> String {
        self.inner.display(value)
    }
}

/// Element count of a [`ListField`].
#[derive(Debug, Clone, Copy)]
pub enum Count {
    Fixed(usize),
    /// Linked to an already-parsed sibling field.
    From(fn(&Packet) -> usize),
}

/// A homogeneous run of elements sharing one inner kind.
#[derive(Debug)]
pub struct ListField {
    inner: Arc<dyn FieldKind>,
    count: Count,
}

impl ListField {
    pub fn new(inner: Arc<dyn FieldKind>, count: Count) -> Self {
        Self { inner, count }
    }
}

impl FieldKind for ListField {
    fn normalize(&self, value: Value) -> Result<Value, Error> {
        match value {
            Value::List(items) => {
                let items = items
                    .into_iter()
                    .map(|v| self.inner.normalize(v))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(items))
            }
            other => Err(Error::BuildError(format!(
                "expected list, got {}",
                other.kind_name()
            ))),
        }
    }

    fn emit(&self, pkt: &Packet, value: &Value, w: &mut WireWriter) -> Result<(), Error> {
        match value {
            Value::List(items) => {
                for item in items {
                    self.inner.emit(pkt, item, w)?;
                }
                Ok(())
            }
            other => Err(Error::BuildError(format!(
                "expected list, got {}",
                other.kind_name()
            ))),
        }
    }

    fn parse(&self, pkt: &Packet, r: &mut WireReader) -> Result<Value, Error> {
        let n = match self.count {
            Count::Fixed(n) => n,
            Count::From(hint) => hint(pkt),
        };
        // The count may come straight off the wire; never let it drive an
        // allocation larger than the bytes that are actually there.
        let mut items = Vec::with_capacity(n.min(r.remaining()));
        for _ in 0..n {
            if r.is_empty() {
                break;
            }
            items.push(self.inner.parse(pkt, r)?);
        }
        Ok(Value::List(items))
    }

    fn wire_len(&self, value: &Value) -> usize {
        match value {
            Value::List(items) => items.iter().map(|v| self.inner.wire_len(v)).sum(),
            _ => 0,
        }
    }

    fn display(&self, value: &Value) -> String {
        match value {
            Value::List(items) => {
                let parts: Vec<_> = items.iter().map(|v| self.inner.display(v)).collect();
                format!("[{}]", parts.join(", "))
            }
            v => v.to_string(),
        }
    }
}

/// A nested packet, dissected with the named type. Consumes the remainder
/// of the layer on parse; an unknown type name degrades to the raw layer.
#[derive(Debug, Clone, Copy)]
pub struct PacketField {
    type_name: &'static str,
}

impl PacketField {
    pub fn new(type_name: &'static str) -> Self {
        Self { type_name }
    }
}

impl FieldKind for PacketField {
    fn normalize(&self, value: Value) -> Result<Value, Error> {
        match value {
            Value::None => Ok(Value::None),
            Value::Packet(p) => Ok(Value::Packet(p)),
            other => Err(Error::BuildError(format!(
                "expected packet, got {}",
                other.kind_name()
            ))),
        }
    }

    fn emit(&self, _pkt: &Packet, value: &Value, w: &mut WireWriter) -> Result<(), Error> {
        match value {
            Value::None => Ok(()),
            Value::Packet(p) => {
                w.put_bytes(&crate::build::encode(p)?);
                Ok(())
            }
            other => Err(Error::BuildError(format!(
                "expected packet, got {}",
                other.kind_name()
            ))),
        }
    }

    fn parse(&self, _pkt: &Packet, r: &mut WireReader) -> Result<Value, Error> {
        let bytes = r.rest();
        let ptype = crate::ptype::PacketType::lookup(self.type_name)
            .unwrap_or_else(|_| crate::layers::raw::raw_type());
        Ok(Value::Packet(Box::new(crate::dissect::decode(
            &ptype, bytes,
        ))))
    }

    fn wire_len(&self, value: &Value) -> usize {
        match value {
            Value::Packet(p) => crate::build::encode(p).map(|b| b.len()).unwrap_or(0),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;
    use crate::ptype::PacketType;

    fn scratch() -> Packet {
        let t = PacketType::builder("SpecialScratch")
            .field(FieldSpec::u8("flag", 0))
            .build()
            .unwrap();
        Packet::new(t)
    }

    #[test]
    fn mac_normalizes_from_str_and_bytes() {
        let f = MacField;
        let m = f.normalize(Value::Str("00:01:02:03:04:05".into())).unwrap();
        assert_eq!(
            m,
            Value::Mac([0x00, 0x01, 0x02, 0x03, 0x04, 0x05].into())
        );
        let m = f.normalize(Value::Bytes(vec![0, 1, 2, 3, 4, 5])).unwrap();
        assert_eq!(
            m,
            Value::Mac([0x00, 0x01, 0x02, 0x03, 0x04, 0x05].into())
        );
        assert!(f.normalize(Value::UInt(1)).is_err());
    }

    #[test]
    fn ip4_truncated_parse_zero_pads() {
        let f = Ip4Field;
        let p = scratch();
        let mut r = WireReader::new(&[10, 0]);
        assert_eq!(
            f.parse(&p, &mut r).unwrap(),
            Value::Ip4(Ipv4Addr::new(10, 0, 0, 0))
        );
    }

    #[test]
    fn cond_suppresses_both_directions() {
        fn flag_set(p: &Packet) -> bool {
            p.get("flag").map(|v| v.as_u64() == Some(1)).unwrap_or(false)
        }

        let f = CondField::new(Arc::new(super::super::UIntField::new(2, crate::wire::Endian::Big)), flag_set);
        let mut p = scratch();

        let mut w = WireWriter::new();
        f.emit(&p, &Value::UInt(0xabcd), &mut w).unwrap();
        assert_eq!(w.finish().0, Vec::<u8>::new());

        p.set("flag", 1u8).unwrap();
        let mut w = WireWriter::new();
        f.emit(&p, &Value::UInt(0xabcd), &mut w).unwrap();
        assert_eq!(w.finish().0, vec![0xab, 0xcd]);

        let bytes = [0xab, 0xcd];
        let mut r = WireReader::new(&bytes);
        assert_eq!(f.parse(&p, &mut r).unwrap(), Value::UInt(0xabcd));

        p.set("flag", 0u8).unwrap();
        let mut r = WireReader::new(&bytes);
        assert_eq!(f.parse(&p, &mut r).unwrap(), Value::None);
        assert_eq!(r.remaining(), 2);
    }

    #[test]
    fn list_count_from_sibling() {
        fn flag(p: &Packet) -> usize {
            p.get("flag").ok().and_then(|v| v.as_u64()).unwrap_or(0) as usize
        }

        let f = ListField::new(
            Arc::new(super::super::UIntField::new(1, crate::wire::Endian::Big)),
            Count::From(flag),
        );
        let mut p = scratch();
        p.set("flag", 3u8).unwrap();

        let bytes = [1u8, 2, 3, 4];
        let mut r = WireReader::new(&bytes);
        assert_eq!(
            f.parse(&p, &mut r).unwrap(),
            Value::List(vec![Value::UInt(1), Value::UInt(2), Value::UInt(3)])
        );
        assert_eq!(r.remaining(), 1);
    }

    #[test]
    fn absurd_wire_count_does_not_allocate() {
        fn count_of(p: &Packet) -> usize {
            p.get("count").ok().and_then(|v| v.as_u64()).unwrap_or(0) as usize
        }

        let t = PacketType::builder("ListBomb")
            .field(FieldSpec::be32("count", 0))
            .field(FieldSpec::list_of(
                "items",
                FieldSpec::u8("item", 0),
                Count::From(count_of),
            ))
            .build()
            .unwrap();

        // A count of 0xffffffff with two element bytes behind it: the list
        // stops at the end of the input instead of reserving 4 GiB.
        let p = crate::dissect::decode(&t, &[0xff, 0xff, 0xff, 0xff, 0x01, 0x02]);
        assert_eq!(p.get("count").unwrap(), Value::UInt(0xffff_ffff));
        assert_eq!(
            p.get("items").unwrap(),
            Value::List(vec![Value::UInt(1), Value::UInt(2)])
        );
    }
}
