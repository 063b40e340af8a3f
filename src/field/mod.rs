//! Field descriptors
//!
//! [`FieldSpec`] describes one named slot of a packet type: its default
//! value and an [`FieldKind`] implementing the conversions between wire
//! bytes, the internal [`Value`] and a display form. Every protocol in the
//! crate is expressed through these descriptors; new wire formats plug in
//! by implementing `FieldKind`.

use core::fmt::Debug;
use std::net::Ipv4Addr;
use std::sync::Arc;

use crate::errors::Error;
use crate::packet::Packet;
use crate::types::{MacAddr, Value};
use crate::wire::{Endian, Hole, WireReader, WireWriter};

mod numeric;
pub use numeric::UIntField;

mod bits;
pub use bits::BitField;

mod bytes;
pub use bytes::{BytesField, LenHint};

mod auto;
pub use auto::{ChecksumField, ChecksumFn, LenField, Measure};

mod special;
pub use special::{CondField, Count, Ip4Field, ListField, MacField, PacketField};

/// Context handed to deferred fields once the layer's bytes are assembled.
pub struct PatchCtx<'a> {
    pub pkt: &'a Packet,
    /// The instance this layer is attached under, when building a chain.
    pub underlay: Option<&'a Packet>,
    /// Header + payload of this layer. Length holes are already patched
    /// when checksum fields run; the checksum's own hole reads as zero.
    pub buffer: &'a [u8],
    pub header_len: usize,
    pub payload_len: usize,
    /// Byte span of each header field, indexed like the field list.
    pub spans: &'a [(usize, usize)],
    pub hole: &'a Hole,
}

/// Wire behaviour of one field family.
///
/// `parse` consumes a prefix of the reader and must tolerate truncated
/// input by consuming what is available; `emit` must be total over every
/// value `normalize` can produce, the static default included.
pub trait FieldKind: Debug + Send + Sync {
    /// Convert an arbitrary assigned value into the internal form, or
    /// reject it.
    fn normalize(&self, value: Value) -> Result<Value, Error>;

    /// Serialize an already-resolved value (never `Pending`).
    fn emit(&self, pkt: &Packet, value: &Value, w: &mut WireWriter) -> Result<(), Error>;

    /// Deserialize from the remaining bytes of the layer.
    fn parse(&self, pkt: &Packet, r: &mut WireReader) -> Result<Value, Error>;

    /// Wire length of a given value, in bytes.
    fn wire_len(&self, value: &Value) -> usize;

    /// Human-readable form.
    fn display(&self, value: &Value) -> String {
        value.to_string()
    }

    /// Deferred fields only: final bytes for the hole left by `emit`.
    fn patch(&self, _ctx: &PatchCtx) -> Result<Vec<u8>, Error> {
        Err(Error::BuildError(
            "field kind left a hole it cannot patch".to_string(),
        ))
    }
}

/// One named slot in a packet type's wire layout.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: &'static str,
    default: Value,
    kind: Arc<dyn FieldKind>,
    owner: &'static str,
}

impl FieldSpec {
    pub fn with_kind<K>(name: &'static str, default: impl Into<Value>, kind: K) -> Self
    where
        K: FieldKind + 'static,
    {
        Self {
            name,
            default: default.into(),
            kind: Arc::new(kind),
            owner: "",
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn default(&self) -> &Value {
        &self.default
    }

    pub fn kind(&self) -> &Arc<dyn FieldKind> {
        &self.kind
    }

    /// The packet type this field was resolved into, set at registration.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    pub(crate) fn bind_owner(&mut self, owner: &'static str) {
        self.owner = owner;
    }

    /// Same field with a different default, used for inherited overrides.
    pub(crate) fn override_default(&self, default: Value) -> Self {
        Self {
            default,
            ..self.clone()
        }
    }

    // Fixed-width unsigned integers.

    pub fn u8(name: &'static str, default: u8) -> Self {
        Self::with_kind(name, default, UIntField::new(1, Endian::Big))
    }

    pub fn be16(name: &'static str, default: u16) -> Self {
        Self::with_kind(name, default, UIntField::new(2, Endian::Big))
    }

    pub fn be32(name: &'static str, default: u32) -> Self {
        Self::with_kind(name, default, UIntField::new(4, Endian::Big))
    }

    pub fn le16(name: &'static str, default: u16) -> Self {
        Self::with_kind(name, default, UIntField::new(2, Endian::Little))
    }

    pub fn le32(name: &'static str, default: u32) -> Self {
        Self::with_kind(name, default, UIntField::new(4, Endian::Little))
    }

    /// Hex-displayed variants for identifiers and type codes.
    pub fn xu8(name: &'static str, default: u8) -> Self {
        Self::with_kind(name, default, UIntField::new(1, Endian::Big).hex())
    }

    pub fn xbe16(name: &'static str, default: u16) -> Self {
        Self::with_kind(name, default, UIntField::new(2, Endian::Big).hex())
    }

    pub fn xbe32(name: &'static str, default: u32) -> Self {
        Self::with_kind(name, default, UIntField::new(4, Endian::Big).hex())
    }

    /// A sub-byte field `bits` wide. Negative widths reverse the bit order
    /// inside the field, as some link protocols require. Consecutive bit
    /// fields pack into shared bytes.
    pub fn bits(name: &'static str, bits: i8, default: u64) -> Self {
        Self::with_kind(name, default, BitField::new(bits))
    }

    // Addresses.

    pub fn mac(name: &'static str, default: MacAddr) -> Self {
        Self::with_kind(name, default, MacField)
    }

    pub fn ip4(name: &'static str, default: Ipv4Addr) -> Self {
        Self::with_kind(name, default, Ip4Field)
    }

    // Byte strings.

    /// Consumes everything left in the layer.
    pub fn bytes(name: &'static str, default: impl Into<Value>) -> Self {
        Self::with_kind(name, default, BytesField::rest())
    }

    pub fn bytes_fixed(name: &'static str, width: usize, default: impl Into<Value>) -> Self {
        Self::with_kind(name, default, BytesField::fixed(width))
    }

    /// Wire length linked to an already-parsed sibling field.
    pub fn bytes_from(name: &'static str, len_from: LenHint) -> Self {
        Self::with_kind(name, Value::Bytes(Vec::new()), BytesField::from_sibling(len_from))
    }

    /// Length-prefixed on the wire; `prefix` is the prefix width in bytes.
    pub fn len_prefixed(name: &'static str, prefix: usize, default: impl Into<Value>) -> Self {
        Self::with_kind(name, default, BytesField::prefixed(prefix))
    }

    // Deferred fields. Their default is `Value::None`, meaning "compute at
    // build time"; an explicit value suppresses the computation.

    pub fn length_of(name: &'static str, width: usize, measure: Measure) -> Self {
        Self::with_kind(name, Value::None, LenField::new(width, Endian::Big, measure, 0))
    }

    pub fn length_of_adjusted(
        name: &'static str,
        width: usize,
        measure: Measure,
        adjust: i64,
    ) -> Self {
        Self::with_kind(name, Value::None, LenField::new(width, Endian::Big, measure, adjust))
    }

    pub fn checksum(name: &'static str, width: usize, algo: ChecksumFn) -> Self {
        Self::with_kind(name, Value::None, ChecksumField::new(width, Endian::Big, algo))
    }

    // Structural wrappers.

    /// Guard an existing field with a predicate; when it evaluates false
    /// the field neither consumes nor emits bytes.
    pub fn cond(inner: FieldSpec, predicate: fn(&Packet) -> bool) -> Self {
        Self {
            kind: Arc::new(CondField::new(inner.kind.clone(), predicate)),
            ..inner
        }
    }

    /// A homogeneous list of `inner`-shaped elements.
    pub fn list_of(name: &'static str, inner: FieldSpec, count: Count) -> Self {
        Self::with_kind(
            name,
            Value::List(Vec::new()),
            ListField::new(inner.kind.clone(), count),
        )
    }

    /// A nested packet as a field value, dissected with the named type.
    pub fn packet(name: &'static str, type_name: &'static str) -> Self {
        Self::with_kind(name, Value::None, PacketField::new(type_name))
    }
}
