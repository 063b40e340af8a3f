//! Dissection pipeline
//!
//! [`decode`] never fails structurally: whatever cannot be interpreted —
//! an unknown next layer, a failing `post_dissect` hook, truncated bytes —
//! ends up attached as a [`Raw`][`crate::layers::raw`] layer instead of
//! aborting, so one malformed layer never kills the processing of a
//! capture. [`decode_strict`] re-raises instead, for debugging protocol
//! definitions.

use std::sync::Arc;

use crate::binding;
use crate::errors::Error;
use crate::layers::raw::{padding_packet, raw_packet};
use crate::packet::Packet;
use crate::ptype::PacketType;
use crate::wire::WireReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Tolerant,
    Strict,
}

/// Dissect `bytes` as `ptype`, wrapping anything unparseable as `Raw`.
pub fn decode(ptype: &Arc<PacketType>, bytes: &[u8]) -> Packet {
    match dissect_layer(ptype, bytes, Mode::Tolerant) {
        Ok(p) => p,
        Err(e) => {
            log::debug!("{} dissection failed ({}), wrapping as raw", ptype.name(), e);
            raw_packet(bytes)
        }
    }
}

/// Best-effort-off variant: propagates dissection errors instead of
/// recovering into `Raw` layers.
pub fn decode_strict(ptype: &Arc<PacketType>, bytes: &[u8]) -> Result<Packet, Error> {
    dissect_layer(ptype, bytes, Mode::Strict)
}

fn dissect_layer(ptype: &Arc<PacketType>, bytes: &[u8], mode: Mode) -> Result<Packet, Error> {
    // Concrete type, via the dispatch hook when the definition has one.
    let concrete = ptype
        .dispatch_hook()
        .and_then(|hook| hook(bytes))
        .unwrap_or_else(|| ptype.clone());
    if concrete.name() != ptype.name() {
        log::trace!("{} dispatched to {}", ptype.name(), concrete.name());
    }

    let mut p = Packet::new(concrete.clone());

    // Field walk. Stops early on exhausted input; whatever is left keeps
    // its static default. A suppressed conditional field stores nothing.
    let mut r = WireReader::new(bytes);
    for field in concrete.fields() {
        if r.is_empty() {
            break;
        }
        let value = field.kind().parse(&p, &mut r)?;
        if !value.is_none() {
            p.insert_dissected(field.name(), value);
        }
    }
    let rem = r.rest();
    let consumed = bytes.len() - rem.len();
    log::trace!("{} consumed {} byte(s)", concrete.name(), consumed);

    if let Some(hook) = concrete.post_dissect_hook() {
        if let Err(e) = hook(&mut p) {
            if mode == Mode::Strict {
                return Err(e);
            }
            log::debug!("{} post_dissect failed: {}", concrete.name(), e);
            if !rem.is_empty() {
                p.attach_dissected(raw_packet(rem));
            }
            return Ok(p);
        }
    }

    // Split the remainder into payload and trailing padding.
    let split = concrete
        .padding_hook()
        .map(|hook| hook(&p, rem).min(rem.len()))
        .unwrap_or(rem.len());
    let (payload_bytes, padding_bytes) = rem.split_at(split);

    if !payload_bytes.is_empty() {
        // A layer that consumed nothing cannot drive the chain forward;
        // stop guessing or the recursion never terminates.
        let next = if consumed == 0 {
            None
        } else {
            concrete
                .guess_hook()
                .and_then(|hook| hook(&p, payload_bytes))
                .or_else(|| binding::guess_upper(&p))
        };
        let payload = match next {
            Some(t) => match mode {
                Mode::Tolerant => decode(&t, payload_bytes),
                Mode::Strict => dissect_layer(&t, payload_bytes, Mode::Strict)?,
            },
            None => raw_packet(payload_bytes),
        };
        p.attach_dissected(payload);
    }

    if !padding_bytes.is_empty() {
        attach_at_tail(&mut p, padding_packet(padding_bytes));
    }

    Ok(p)
}

/// Padding belongs after everything, so it attaches at the innermost
/// layer of the chain.
fn attach_at_tail(p: &mut Packet, padding: Packet) {
    match p.payload_mut() {
        Some(inner) => attach_at_tail(inner, padding),
        None => p.attach_dissected(padding),
    }
}
