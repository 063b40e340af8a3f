//! Construction pipeline
//!
//! Building is two-phase. Phase one walks the field list emitting bytes,
//! leaving typed zero-filled holes for deferred fields and recursing into
//! the payload. Phase two patches the holes against the assembled buffer:
//! lengths first, checksums second, then hands the result to the type's
//! `post_build` hook. A payload chain ending in a padding layer
//! contributes its bytes to a separate channel appended after everything
//! else at the outermost level.

use crate::errors::Error;
use crate::field::PatchCtx;
use crate::packet::Packet;
use crate::types::Value;
use crate::wire::WireWriter;

/// Serialize a packet chain to wire bytes.
///
/// Deterministic: building the same unmutated instance twice yields
/// byte-identical output, except where a field holds an explicit
/// [`Pending`][`crate::types::PendingFn`] resolver, which is invoked once
/// per pass.
pub fn encode(p: &Packet) -> Result<Vec<u8>, Error> {
    let (mut bytes, padding) = build_chain(p, None)?;
    bytes.extend(padding);
    log::trace!("built {} as {} byte(s)", p.type_name(), bytes.len());
    Ok(bytes)
}

/// Build one layer and everything below it. Returns (bytes, padding).
fn build_chain(p: &Packet, underlay: Option<&Packet>) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let fields = p.packet_type().fields();

    // Resolve every field once for this pass; pending values become
    // concrete here and are reused for the whole pass.
    let values = fields
        .iter()
        .map(|f| match p.resolved(f) {
            Value::Pending(resolver) => f.kind().normalize((resolver.0)()),
            v => Ok(v),
        })
        .collect::<Result<Vec<_>, _>>()?;

    // Self-build: bytes, holes and per-field byte spans.
    let mut w = WireWriter::new();
    let mut spans = Vec::with_capacity(fields.len());
    for (i, (field, value)) in fields.iter().zip(&values).enumerate() {
        w.set_field(i);
        let start = w.byte_len();
        field.kind().emit(p, value, &mut w)?;
        spans.push((start, w.byte_len()));
    }
    let (header, holes) = w.finish();

    // Payload and padding channels.
    let (payload_bytes, padding) = match p.payload() {
        Some(pl) if pl.packet_type().is_padding() => {
            let (mut pad, tail) = build_chain(pl, Some(p))?;
            pad.extend(tail);
            (Vec::new(), pad)
        }
        Some(pl) => build_chain(pl, Some(p))?,
        None => (Vec::new(), Vec::new()),
    };

    // Assemble and patch. The sort is stable: within a phase, holes keep
    // field order.
    let header_len = header.len();
    let payload_len = payload_bytes.len();
    let mut buffer = header;
    buffer.extend(&payload_bytes);

    let mut ordered: Vec<_> = holes.iter().collect();
    ordered.sort_by_key(|h| h.phase);
    for hole in ordered {
        let patch = {
            let ctx = PatchCtx {
                pkt: p,
                underlay,
                buffer: &buffer,
                header_len,
                payload_len,
                spans: &spans,
                hole,
            };
            fields[hole.field].kind().patch(&ctx)?
        };
        if patch.len() != hole.width {
            return Err(Error::BuildError(format!(
                "patch for {} produced {} byte(s), hole is {}",
                fields[hole.field].name(),
                patch.len(),
                hole.width
            )));
        }
        buffer[hole.offset..hole.offset + hole.width].copy_from_slice(&patch);
    }

    let buffer = match p.packet_type().post_build_hook() {
        Some(hook) => hook(p, buffer, header_len),
        None => buffer,
    };

    Ok((buffer, padding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldSpec, Measure};
    use crate::ptype::PacketType;
    use crate::types::PendingFn;

    fn header_type() -> std::sync::Arc<PacketType> {
        PacketType::builder("BuildHeader")
            .field(FieldSpec::u8("version", 1))
            .field(FieldSpec::length_of("length", 2, Measure::Payload))
            .build()
            .unwrap()
    }

    fn blob_type() -> std::sync::Arc<PacketType> {
        PacketType::builder("BuildBlob")
            .field(FieldSpec::bytes("load", &b""[..]))
            .build()
            .unwrap()
    }

    #[test]
    fn length_patches_from_payload() {
        let mut p = Packet::new(header_type());
        assert_eq!(encode(&p).unwrap(), vec![0x01, 0x00, 0x00]);

        let mut blob = Packet::new(blob_type());
        blob.set("load", &[0xab, 0xcd][..]).unwrap();
        p.set_payload(blob);
        assert_eq!(encode(&p).unwrap(), vec![0x01, 0x00, 0x02, 0xab, 0xcd]);
    }

    #[test]
    fn explicit_length_wins_over_patch() {
        let mut p = Packet::new(header_type());
        p.set("length", 0xbeefu16).unwrap();
        assert_eq!(encode(&p).unwrap(), vec![0x01, 0xbe, 0xef]);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let mut p = Packet::new(header_type());
        let mut blob = Packet::new(blob_type());
        blob.set("load", &b"hello"[..]).unwrap();
        p.set_payload(blob);

        assert_eq!(encode(&p).unwrap(), encode(&p).unwrap());
    }

    #[test]
    fn pending_resolves_per_pass() {
        fn fixed_seven() -> Value {
            Value::UInt(7)
        }

        let mut p = Packet::new(header_type());
        p.set("version", Value::Pending(PendingFn(fixed_seven)))
            .unwrap();
        assert_eq!(encode(&p).unwrap(), vec![0x07, 0x00, 0x00]);
    }

    #[test]
    fn post_build_rewrites_assembled_bytes() {
        fn stamp_trailer(_p: &Packet, mut bytes: Vec<u8>, header_len: usize) -> Vec<u8> {
            bytes.push(header_len as u8);
            bytes
        }

        let t = PacketType::builder("BuildStamped")
            .field(FieldSpec::u8("version", 3))
            .post_build(stamp_trailer)
            .build()
            .unwrap();

        let p = Packet::new(t);
        assert_eq!(encode(&p).unwrap(), vec![0x03, 0x01]);
    }

    #[test]
    fn length_of_named_field() {
        let t = PacketType::builder("BuildFieldLen")
            .field(FieldSpec::length_of("optlen", 1, Measure::Field("opts")))
            .field(FieldSpec::bytes("opts", &b""[..]))
            .build()
            .unwrap();
        let mut p = Packet::new(t);
        p.set("opts", &[1u8, 2, 3][..]).unwrap();
        assert_eq!(encode(&p).unwrap(), vec![0x03, 1, 2, 3]);
    }

    #[test]
    fn unrepresentable_value_is_a_hard_error() {
        let t = PacketType::builder("BuildOverflow")
            .field(FieldSpec::length_of("length", 1, Measure::Field("load")))
            .field(FieldSpec::bytes("load", &b""[..]))
            .build()
            .unwrap();
        let mut p = Packet::new(t);
        p.set("load", vec![0u8; 300]).unwrap();
        assert!(matches!(encode(&p), Err(Error::BuildError(_))));
    }
}
