//! Internal field values
//!
//! Every field of a packet resolves to a [`Value`]. Field kinds convert
//! between wire bytes and `Value`s; user assignments go through
//! `FieldKind::normalize` which maps convenient inputs (strings, integers)
//! into the canonical variant for that field.

use core::fmt;
use std::net::Ipv4Addr;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use super::MacAddr;
use crate::packet::Packet;

/// A deferred value, resolved to a concrete [`Value`] once per build pass.
///
/// Produced outside this crate (random sources, volatile context) and
/// consumed transparently wherever a field value is read during build.
/// Wrapped in a newtype so that `Value` stays `PartialEq` (function
/// pointers compare by address).
#[derive(Clone, Copy)]
pub struct PendingFn(pub fn() -> Value);

impl PartialEq for PendingFn {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.0 as *const (), other.0 as *const ())
    }
}

impl fmt::Debug for PendingFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PendingFn(..)")
    }
}

/// The internal representation of one field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Unset. For auto-computed fields (lengths, checksums) this means
    /// "fill in at build time".
    None,
    UInt(u64),
    Bytes(Vec<u8>),
    Str(String),
    Mac(MacAddr),
    Ip4(Ipv4Addr),
    List(Vec<Value>),
    /// A nested packet used as a field value.
    Packet(Box<Packet>),
    /// Resolved once per build pass, see [`PendingFn`].
    Pending(PendingFn),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Byte view of `Bytes` and `Str` values.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Str(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_mac(&self) -> Option<MacAddr> {
        match self {
            Value::Mac(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_ip4(&self) -> Option<Ipv4Addr> {
        match self {
            Value::Ip4(a) => Some(*a),
            _ => None,
        }
    }

    /// Kind name used in error messages.
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::UInt(_) => "uint",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "str",
            Value::Mac(_) => "mac",
            Value::Ip4(_) => "ip4",
            Value::List(_) => "list",
            Value::Packet(_) => "packet",
            Value::Pending(_) => "pending",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Bytes(b) => write!(f, "{}", hex::encode(b)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Mac(m) => write!(f, "{}", m),
            Value::Ip4(a) => write!(f, "{}", a),
            Value::List(vs) => {
                write!(f, "[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Packet(p) => write!(f, "<{}>", p.summary()),
            Value::Pending(_) => write!(f, "<pending>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::None => serializer.serialize_none(),
            Value::UInt(v) => serializer.serialize_u64(*v),
            Value::Bytes(b) => serializer.serialize_str(&hex::encode(b)),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Mac(m) => m.serialize(serializer),
            Value::Ip4(a) => serializer.serialize_str(&a.to_string()),
            Value::List(vs) => {
                let mut seq = serializer.serialize_seq(Some(vs.len()))?;
                for v in vs {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Value::Packet(p) => p.serialize(serializer),
            Value::Pending(_) => serializer.serialize_str("<pending>"),
        }
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::UInt(v.into())
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::UInt(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v.into())
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<&'_ [u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<const N: usize> From<&'_ [u8; N]> for Value {
    fn from(v: &[u8; N]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&'_ str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<MacAddr> for Value {
    fn from(v: MacAddr) -> Self {
        Value::Mac(v)
    }
}

impl From<Ipv4Addr> for Value {
    fn from(v: Ipv4Addr) -> Self {
        Value::Ip4(v)
    }
}

impl From<Packet> for Value {
    fn from(v: Packet) -> Self {
        Value::Packet(Box::new(v))
    }
}
