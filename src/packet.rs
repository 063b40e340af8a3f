//! Packet instances
//!
//! A [`Packet`] is one dissected or hand-built layer plus, recursively, its
//! payload. Instances hold only *explicit* field values; reads fall
//! through a fixed priority chain — explicit value, overlay value inherited
//! from the bound payload type, static default of the packet type — and
//! finally delegate unknown names to the payload, so `pkt.get("dst_port")`
//! works from the outermost layer of a chain.
//!
//! The payload chain is a tree of exclusive ownership: a packet owns at
//! most one payload and a payload records its underlay only as a
//! non-owning type-name marker, which structurally rules out cycles.

use core::fmt;
use std::collections::HashMap;
use std::ops::Div;
use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::binding;
use crate::errors::Error;
use crate::field::FieldSpec;
use crate::ptype::PacketType;
use crate::types::Value;

#[derive(Debug, Clone)]
pub struct Packet {
    ptype: Arc<PacketType>,
    explicit: HashMap<&'static str, Value>,
    overlay: HashMap<&'static str, Value>,
    payload: Option<Box<Packet>>,
    underlay: Option<&'static str>,
}

impl Packet {
    pub fn new(ptype: Arc<PacketType>) -> Self {
        Self {
            ptype,
            explicit: HashMap::new(),
            overlay: HashMap::new(),
            payload: None,
            underlay: None,
        }
    }

    pub fn packet_type(&self) -> &Arc<PacketType> {
        &self.ptype
    }

    pub fn type_name(&self) -> &'static str {
        self.ptype.name()
    }

    /// Type name of the layer this packet is attached under, if any.
    pub fn underlay_name(&self) -> Option<&'static str> {
        self.underlay
    }

    /// Resolve one of this layer's own fields: explicit, then overlay,
    /// then the static default. No payload delegation.
    pub(crate) fn resolved(&self, field: &FieldSpec) -> Value {
        if let Some(v) = self.explicit.get(field.name()) {
            return v.clone();
        }
        if let Some(v) = self.overlay.get(field.name()) {
            return v.clone();
        }
        field.default().clone()
    }

    /// Read a field anywhere in the chain (see module docs for the
    /// priority order). Unknown names are a hard error: they indicate a
    /// programming mistake, not bad wire data.
    pub fn get(&self, name: &str) -> Result<Value, Error> {
        if let Some(field) = self.ptype.field(name) {
            return Ok(self.resolved(field));
        }
        match &self.payload {
            Some(p) => p.get(name),
            None => Err(Error::NoSuchField(name.to_string())),
        }
    }

    /// The display form of a field, via its kind.
    pub fn get_display(&self, name: &str) -> Result<String, Error> {
        if let Some(field) = self.ptype.field(name) {
            return Ok(field.kind().display(&self.resolved(field)));
        }
        match &self.payload {
            Some(p) => p.get_display(name),
            None => Err(Error::NoSuchField(name.to_string())),
        }
    }

    /// Write a field anywhere in the chain. The value passes through the
    /// field kind's normalization; a `Pending` value is stored as-is and
    /// resolved at build time. Writing invalidates any overlay entry of
    /// the same name.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        let value = value.into();
        if let Some(field) = self.ptype.field(name) {
            let name = field.name();
            let value = match value {
                Value::Pending(_) => value,
                other => field.kind().normalize(other)?,
            };
            self.overlay.remove(name);
            self.explicit.insert(name, value);
            return Ok(());
        }
        match &mut self.payload {
            Some(p) => p.set(name, value),
            None => Err(Error::NoSuchField(name.to_string())),
        }
    }

    /// Remove an explicit value, falling back to overlay/default reads.
    pub fn unset(&mut self, name: &str) -> Result<(), Error> {
        if self.ptype.field(name).is_some() {
            self.explicit.remove(name);
            return Ok(());
        }
        match &mut self.payload {
            Some(p) => p.unset(name),
            None => Err(Error::NoSuchField(name.to_string())),
        }
    }

    pub fn payload(&self) -> Option<&Packet> {
        self.payload.as_deref()
    }

    pub fn payload_mut(&mut self) -> Option<&mut Packet> {
        self.payload.as_deref_mut()
    }

    /// Attach `payload`, replacing and dropping any previous one. The
    /// overlay map is recomputed from the binding registry keyed on
    /// (self type, payload type); the payload's underlay marker is set to
    /// this layer.
    pub fn set_payload(&mut self, mut payload: Packet) {
        payload.underlay = Some(self.ptype.name());
        self.overlay = binding::overlay_for(&self.ptype, payload.ptype.as_ref())
            .into_iter()
            .collect();
        // Explicit writes stay authoritative; drop overlay entries they
        // shadow so invalidation stays one-way.
        for name in self.explicit.keys() {
            self.overlay.remove(name);
        }
        self.payload = Some(Box::new(payload));
    }

    /// Detach and return the payload; clears the overlay it contributed.
    pub fn take_payload(&mut self) -> Option<Packet> {
        self.overlay.clear();
        self.payload.take().map(|mut p| {
            p.underlay = None;
            *p
        })
    }

    /// Attach `upper` at the innermost tail of the chain, so that
    /// `eth.stack(ip).stack(udp)` (or `eth / ip / udp`) layers naturally.
    pub fn stack(mut self, upper: Packet) -> Packet {
        match self.take_payload() {
            Some(inner) => self.set_payload(inner.stack(upper)),
            None => self.set_payload(upper),
        }
        self
    }

    /// The first layer in the chain with the given type name or short
    /// name, this one included.
    pub fn layer(&self, name: &str) -> Option<&Packet> {
        if self.ptype.name() == name || self.ptype.short_name() == name {
            return Some(self);
        }
        self.payload.as_deref().and_then(|p| p.layer(name))
    }

    /// `Ethernet / IPv4 / UDP / Raw` style one-liner.
    pub fn summary(&self) -> String {
        let mut names = vec![self.ptype.name()];
        let mut cur = self.payload.as_deref();
        while let Some(p) = cur {
            names.push(p.ptype.name());
            cur = p.payload.as_deref();
        }
        names.join(" / ")
    }

    pub(crate) fn insert_dissected(&mut self, name: &'static str, value: Value) {
        self.explicit.insert(name, value);
    }

    pub(crate) fn attach_dissected(&mut self, mut payload: Packet) {
        payload.underlay = Some(self.ptype.name());
        self.payload = Some(Box::new(payload));
    }
}

impl PartialEq for Packet {
    /// Structural equality on resolved field values: the layer types must
    /// match and every field must resolve identically, wherever the value
    /// comes from (explicit, overlay or default). Payloads compare
    /// recursively.
    fn eq(&self, other: &Self) -> bool {
        self.ptype.name() == other.ptype.name()
            && self
                .ptype
                .fields()
                .iter()
                .all(|f| self.resolved(f) == other.resolved(f))
            && self.payload == other.payload
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.ptype.name())?;
        let mut first = true;
        for field in self.ptype.fields() {
            let v = self.resolved(field);
            if v.is_none() && self.explicit.get(field.name()).is_none() {
                continue;
            }
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}={}", field.name(), field.kind().display(&v))?;
        }
        write!(f, ")")?;
        if let Some(p) = &self.payload {
            write!(f, " / {}", p)?;
        }
        Ok(())
    }
}

impl Serialize for Packet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        struct Fields<'a>(&'a Packet);

        impl Serialize for Fields<'_> {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let mut map = serializer.serialize_map(None)?;
                for field in self.0.ptype.fields() {
                    let v = self.0.resolved(field);
                    if !v.is_none() {
                        map.serialize_entry(field.name(), &v)?;
                    }
                }
                map.end()
            }
        }

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.ptype.name())?;
        map.serialize_entry("fields", &Fields(self))?;
        if let Some(p) = &self.payload {
            map.serialize_entry("payload", p)?;
        }
        map.end()
    }
}

impl Div for Packet {
    type Output = Packet;

    fn div(self, rhs: Packet) -> Packet {
        self.stack(rhs)
    }
}
