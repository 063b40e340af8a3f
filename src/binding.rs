//! Inter-layer binding registry
//!
//! One [`bind_layers`] call registers a rule in both directions: at
//! dissection time the lower layer's payload guess walks the rules in
//! registration order and picks the first upper type whose field predicate
//! matches; at construction time attaching that upper type under the lower
//! one pulls the predicate pairs in as overlay defaults (an Ethernet
//! `ethertype` defaulting to 0x0800 under an IPv4 payload is exactly this).
//!
//! Ambiguous rules are not detected; the first registered rule wins.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use crate::errors::Error;
use crate::packet::Packet;
use crate::ptype::PacketType;
use crate::types::Value;

#[derive(Debug, Clone)]
struct Binding {
    lower: Arc<PacketType>,
    upper: Arc<PacketType>,
    fields: Vec<(&'static str, Value)>,
}

fn get_bindings() -> &'static RwLock<Vec<Binding>> {
    /// Registration-ordered rule table; populated at startup, read-only
    /// from the pipelines' perspective.
    static BINDINGS: OnceLock<RwLock<Vec<Binding>>> = OnceLock::new();
    BINDINGS.get_or_init(|| RwLock::new(Vec::new()))
}

/// Predicate pairs in canonical form: each value passes through its
/// field's kind, so an unrepresentable predicate fails at registration
/// rather than being mangled on the wire later.
fn normalize_predicate(
    lower: &PacketType,
    fields: &[(&'static str, Value)],
) -> Result<Vec<(&'static str, Value)>, Error> {
    fields
        .iter()
        .map(|(name, value)| match lower.field(name) {
            Some(f) => Ok((*name, f.kind().normalize(value.clone())?)),
            None => Err(Error::NoSuchField(format!("{}.{}", lower.name(), name))),
        })
        .collect()
}

/// Register one lower/upper rule. Every `(field, value)` pair must name a
/// field of the lower type and hold a value that field can represent; the
/// pair list may be empty, which makes the upper type an unconditional
/// payload guess.
pub fn bind_layers(
    lower: &Arc<PacketType>,
    upper: &Arc<PacketType>,
    fields: &[(&'static str, Value)],
) -> Result<(), Error> {
    let fields = normalize_predicate(lower, fields)?;

    log::debug!(
        "bound {} -> {} on {} field(s)",
        lower.name(),
        upper.name(),
        fields.len()
    );
    let mut bindings = get_bindings().write().unwrap();
    bindings.push(Binding {
        lower: lower.clone(),
        upper: upper.clone(),
        fields,
    });

    Ok(())
}

/// Remove a rule registered by [`bind_layers`], matched by content
/// equality (types and predicate pairs), not identity.
pub fn split_layers(
    lower: &Arc<PacketType>,
    upper: &Arc<PacketType>,
    fields: &[(&'static str, Value)],
) -> Result<(), Error> {
    // Stored pairs are normalized; normalize the query the same way so
    // content matching is form-insensitive.
    let fields = normalize_predicate(lower, fields)?;
    let mut bindings = get_bindings().write().unwrap();
    let before = bindings.len();
    bindings.retain(|b| {
        !(b.lower.name() == lower.name()
            && b.upper.name() == upper.name()
            && b.fields == fields)
    });
    if bindings.len() == before {
        return Err(Error::RegisterError(format!(
            "no binding {} -> {}",
            lower.name(),
            upper.name()
        )));
    }

    Ok(())
}

/// Decode-direction lookup: the first registered rule on `lower`'s type
/// whose predicate fields all match the dissected values.
pub(crate) fn guess_upper(lower: &Packet) -> Option<Arc<PacketType>> {
    let bindings = get_bindings().read().unwrap();
    for b in bindings.iter() {
        if b.lower.name() != lower.type_name() {
            continue;
        }
        let matched = b
            .fields
            .iter()
            .all(|(name, value)| lower.get(name).map(|v| &v == value).unwrap_or(false));
        if matched {
            return Some(b.upper.clone());
        }
    }
    None
}

/// Encode-direction lookup: the overlay defaults a `lower` instance
/// inherits when a payload of `upper`'s type is attached under it.
pub(crate) fn overlay_for(
    lower: &PacketType,
    upper: &PacketType,
) -> HashMap<&'static str, Value> {
    let bindings = get_bindings().read().unwrap();
    for b in bindings.iter() {
        if b.lower.name() == lower.name() && b.upper.name() == upper.name() {
            return b.fields.iter().cloned().collect();
        }
    }
    HashMap::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSpec;

    fn lower_type() -> Arc<PacketType> {
        PacketType::builder("BindLower")
            .field(FieldSpec::u8("proto", 0))
            .register()
            .or_else(|_| PacketType::lookup("BindLower"))
            .unwrap()
    }

    fn upper_type(name: &'static str) -> Arc<PacketType> {
        PacketType::builder(name)
            .field(FieldSpec::u8("x", 0))
            .register()
            .or_else(|_| PacketType::lookup(name))
            .unwrap()
    }

    #[test]
    fn first_registered_rule_wins() {
        let lower = lower_type();
        let a = upper_type("BindUpperA");
        let b = upper_type("BindUpperB");

        bind_layers(&lower, &a, &[("proto", Value::UInt(9))]).unwrap();
        bind_layers(&lower, &b, &[("proto", Value::UInt(9))]).unwrap();

        let mut p = Packet::new(lower.clone());
        p.set("proto", 9u8).unwrap();
        assert_eq!(guess_upper(&p).unwrap().name(), "BindUpperA");

        split_layers(&lower, &a, &[("proto", Value::UInt(9))]).unwrap();
        assert_eq!(guess_upper(&p).unwrap().name(), "BindUpperB");
        split_layers(&lower, &b, &[("proto", Value::UInt(9))]).unwrap();
        assert!(guess_upper(&p).is_none());
    }

    #[test]
    fn bind_checks_field_names() {
        let lower = lower_type();
        let upper = upper_type("BindUpperC");
        let res = bind_layers(&lower, &upper, &[("nonexistent", Value::UInt(1))]);
        assert!(matches!(res, Err(Error::NoSuchField(_))));
    }

    #[test]
    fn bind_rejects_unrepresentable_predicate_value() {
        let lower = lower_type();
        let upper = upper_type("BindUpperE");
        // "proto" is one byte wide; 0x100 cannot reach the wire intact.
        let res = bind_layers(&lower, &upper, &[("proto", Value::UInt(0x100))]);
        assert!(matches!(res, Err(Error::BuildError(_))));
    }

    #[test]
    fn split_by_content_not_identity() {
        let lower = lower_type();
        let upper = upper_type("BindUpperD");
        bind_layers(&lower, &upper, &[("proto", Value::UInt(77))]).unwrap();
        // A fresh, structurally equal predicate slice must match.
        split_layers(&lower, &upper, &[("proto", Value::UInt(77))]).unwrap();
        assert!(split_layers(&lower, &upper, &[("proto", Value::UInt(77))]).is_err());
    }
}
