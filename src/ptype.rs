//! Packet types and the global type catalogue
//!
//! A [`PacketType`] is the immutable description of one protocol layer: an
//! ordered field list plus the hooks both pipelines consult. Types are
//! built once at startup through [`PacketTypeBuilder`] and registered in a
//! process-wide catalogue keyed by name, which supports introspection,
//! nested-packet fields and dispatch indirection.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::errors::Error;
use crate::field::FieldSpec;
use crate::packet::Packet;
use crate::types::Value;

/// Inspects the undissected byte prefix before instantiation and may
/// redirect to a different concrete type. `None` keeps the type the hook
/// is attached to.
pub type DispatchFn = fn(&[u8]) -> Option<Arc<PacketType>>;

/// Picks the next layer's type from the payload bytes and the fully
/// populated instance. `None` defers to the binding registry.
pub type GuessFn = fn(&Packet, &[u8]) -> Option<Arc<PacketType>>;

/// Splits the undissected remainder: returns how many leading bytes belong
/// to the payload; the rest is padding. The default treats everything as
/// payload.
pub type PaddingFn = fn(&Packet, &[u8]) -> usize;

/// May rewrite the assembled bytes of a layer (header + payload, deferred
/// fields already patched). Receives the payload offset. The default is
/// identity.
pub type PostBuildFn = fn(&Packet, Vec<u8>, usize) -> Vec<u8>;

/// Runs after a layer's fields are dissected, before payload guessing.
pub type PostDissectFn = fn(&mut Packet) -> Result<(), Error>;

fn get_packet_types_map() -> &'static RwLock<HashMap<&'static str, Arc<PacketType>>> {
    /// Name -> type catalogue, populated at protocol-definition time and
    /// read-only afterwards.
    static PACKET_TYPES_MAP: OnceLock<RwLock<HashMap<&'static str, Arc<PacketType>>>> =
        OnceLock::new();
    PACKET_TYPES_MAP.get_or_init(|| RwLock::new(HashMap::new()))
}

/// An immutable packet-type definition.
#[derive(Debug)]
pub struct PacketType {
    name: &'static str,
    short_name: &'static str,
    fields: Vec<FieldSpec>,
    dispatch: Option<DispatchFn>,
    guess_payload: Option<GuessFn>,
    extract_padding: Option<PaddingFn>,
    post_build: Option<PostBuildFn>,
    post_dissect: Option<PostDissectFn>,
    padding: bool,
}

impl PacketType {
    pub fn builder(name: &'static str) -> PacketTypeBuilder {
        PacketTypeBuilder {
            name,
            short_name: None,
            base: None,
            fields: Vec::new(),
            dispatch: None,
            guess_payload: None,
            extract_padding: None,
            post_build: None,
            post_dissect: None,
            padding: false,
        }
    }

    /// Catalogue lookup by type name.
    pub fn lookup(name: &str) -> Result<Arc<PacketType>, Error> {
        let map = get_packet_types_map().read().unwrap();
        map.get(name)
            .cloned()
            .ok_or_else(|| Error::RegisterError(format!("unknown packet type: {}", name)))
    }

    /// Names of every registered type, for introspection.
    pub fn registered() -> Vec<&'static str> {
        let map = get_packet_types_map().read().unwrap();
        map.keys().copied().collect()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn short_name(&self) -> &'static str {
        self.short_name
    }

    /// The resolved field list, in wire order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// Whether instances of this type are trailer padding rather than a
    /// payload layer.
    pub fn is_padding(&self) -> bool {
        self.padding
    }

    pub(crate) fn dispatch_hook(&self) -> Option<DispatchFn> {
        self.dispatch
    }

    pub(crate) fn guess_hook(&self) -> Option<GuessFn> {
        self.guess_payload
    }

    pub(crate) fn padding_hook(&self) -> Option<PaddingFn> {
        self.extract_padding
    }

    pub(crate) fn post_build_hook(&self) -> Option<PostBuildFn> {
        self.post_build
    }

    pub(crate) fn post_dissect_hook(&self) -> Option<PostDissectFn> {
        self.post_dissect
    }

    /// Static default of a field, `Value::None` for unknown names.
    pub(crate) fn default_of(&self, name: &str) -> Option<Value> {
        self.field(name).map(|f| f.default().clone())
    }
}

/// Resolves the effective field list of a new type and registers it.
pub struct PacketTypeBuilder {
    name: &'static str,
    short_name: Option<&'static str>,
    base: Option<Arc<PacketType>>,
    fields: Vec<FieldSpec>,
    dispatch: Option<DispatchFn>,
    guess_payload: Option<GuessFn>,
    extract_padding: Option<PaddingFn>,
    post_build: Option<PostBuildFn>,
    post_dissect: Option<PostDissectFn>,
    padding: bool,
}

impl PacketTypeBuilder {
    pub fn short_name(mut self, short_name: &'static str) -> Self {
        self.short_name = Some(short_name);
        self
    }

    /// Start from a base type's resolved field list. A locally declared
    /// field with the same name as an inherited one keeps the inherited
    /// position and kind but takes the local default; genuinely new fields
    /// append in declaration order.
    pub fn inherit(mut self, base: &Arc<PacketType>) -> Self {
        self.base = Some(base.clone());
        self
    }

    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    pub fn dispatch(mut self, hook: DispatchFn) -> Self {
        self.dispatch = Some(hook);
        self
    }

    pub fn guess_payload(mut self, hook: GuessFn) -> Self {
        self.guess_payload = Some(hook);
        self
    }

    pub fn extract_padding(mut self, hook: PaddingFn) -> Self {
        self.extract_padding = Some(hook);
        self
    }

    pub fn post_build(mut self, hook: PostBuildFn) -> Self {
        self.post_build = Some(hook);
        self
    }

    pub fn post_dissect(mut self, hook: PostDissectFn) -> Self {
        self.post_dissect = Some(hook);
        self
    }

    /// Mark instances as trailer padding (see
    /// [`Padding`][`crate::layers::raw`]).
    pub fn padding(mut self, padding: bool) -> Self {
        self.padding = padding;
        self
    }

    /// Resolve the field list without touching the catalogue. Useful for
    /// anonymous or throwaway types.
    pub fn build(self) -> Result<Arc<PacketType>, Error> {
        let mut fields: Vec<FieldSpec> = self
            .base
            .as_ref()
            .map(|b| b.fields.clone())
            .unwrap_or_default();

        for local in self.fields {
            match fields.iter_mut().find(|f| f.name() == local.name()) {
                Some(inherited) => {
                    *inherited = inherited.override_default(local.default().clone());
                }
                None => fields.push(local),
            }
        }

        for i in 0..fields.len() {
            if fields[i + 1..].iter().any(|f| f.name() == fields[i].name()) {
                return Err(Error::RegisterError(format!(
                    "duplicate field {} in {}",
                    fields[i].name(),
                    self.name
                )));
            }
            fields[i].bind_owner(self.name);
        }

        Ok(Arc::new(PacketType {
            name: self.name,
            short_name: self.short_name.unwrap_or(self.name),
            fields,
            dispatch: self.dispatch,
            guess_payload: self.guess_payload,
            extract_padding: self.extract_padding,
            post_build: self.post_build,
            post_dissect: self.post_dissect,
            padding: self.padding,
        }))
    }

    /// Resolve and insert into the global catalogue. Registering the same
    /// name twice is an error, like any other registry in this crate.
    pub fn register(self) -> Result<Arc<PacketType>, Error> {
        let name = self.name;
        let ptype = self.build()?;

        let mut map = get_packet_types_map().write().unwrap();
        if map.contains_key(name) {
            return Err(Error::RegisterError(format!("packet type: {}", name)));
        }
        log::debug!("registered packet type {}", name);
        map.insert(name, ptype.clone());

        Ok(ptype)
    }
}
