//! Raw and Padding fallback layers
//!
//! `Raw` holds bytes no dissector claimed; the pipelines guarantee that
//! dissection always terminates in one rather than failing. `Padding` is
//! the same single-field shape marked as trailer padding: at build time
//! its bytes land after everything else in the frame, at dissect time it
//! holds what `extract_padding` split off.

use std::sync::{Arc, OnceLock};

use crate::errors::Error;
use crate::field::FieldSpec;
use crate::packet::Packet;
use crate::ptype::PacketType;
use crate::types::Value;

pub fn raw_type() -> Arc<PacketType> {
    static RAW: OnceLock<Arc<PacketType>> = OnceLock::new();
    RAW.get_or_init(|| {
        PacketType::builder("Raw")
            .short_name("raw")
            .field(FieldSpec::bytes("load", &b""[..]))
            .register()
            .or_else(|_| PacketType::lookup("Raw"))
            .unwrap()
    })
    .clone()
}

pub fn padding_type() -> Arc<PacketType> {
    static PADDING: OnceLock<Arc<PacketType>> = OnceLock::new();
    PADDING
        .get_or_init(|| {
            PacketType::builder("Padding")
                .short_name("pad")
                .field(FieldSpec::bytes("load", &b""[..]))
                .padding(true)
                .register()
                .or_else(|_| PacketType::lookup("Padding"))
                .unwrap()
        })
        .clone()
}

/// An opaque layer around `bytes`.
pub fn raw_packet(bytes: &[u8]) -> Packet {
    let mut p = Packet::new(raw_type());
    p.insert_dissected("load", Value::Bytes(bytes.to_vec()));
    p
}

/// A trailer-padding layer around `bytes`.
pub fn padding_packet(bytes: &[u8]) -> Packet {
    let mut p = Packet::new(padding_type());
    p.insert_dissected("load", Value::Bytes(bytes.to_vec()));
    p
}

pub(crate) fn register_defaults() -> Result<(), Error> {
    raw_type();
    padding_type();
    Ok(())
}
