//! UDP Layer

use crate::binding::bind_layers;
use crate::checksum::{internet_checksum, pseudo_header_checksum};
use crate::errors::Error;
use crate::field::{FieldSpec, Measure, PatchCtx};
use crate::ptype::PacketType;
use crate::types::Value;

pub const UDP_HEADER_LENGTH: usize = 8_usize;

/// Checksum over the segment plus the IPv4 pseudo-header when the
/// datagram is attached under an IPv4 instance; a bare UDP layer falls
/// back to a plain sum over its own bytes.
pub(crate) fn udp_checksum(ctx: &PatchCtx) -> u64 {
    match ctx.underlay.filter(|u| u.type_name() == "IPv4") {
        Some(ip) => {
            let src = ip
                .get("src")
                .ok()
                .and_then(|v| v.as_ip4())
                .unwrap_or(std::net::Ipv4Addr::UNSPECIFIED);
            let dst = ip
                .get("dst")
                .ok()
                .and_then(|v| v.as_ip4())
                .unwrap_or(std::net::Ipv4Addr::UNSPECIFIED);
            pseudo_header_checksum(src, dst, super::ipv4::IPPROTO_UDP, ctx.buffer) as u64
        }
        None => internet_checksum(ctx.buffer) as u64,
    }
}

pub(crate) fn register_defaults() -> Result<(), Error> {
    let udp = PacketType::builder("UDP")
        .short_name("udp")
        .field(FieldSpec::be16("sport", 0))
        .field(FieldSpec::be16("dport", 0))
        .field(FieldSpec::length_of("len", 2, Measure::Packet))
        .field(FieldSpec::checksum("checksum", 2, udp_checksum))
        .register()?;

    let ipv4 = PacketType::lookup("IPv4")?;
    bind_layers(
        &ipv4,
        &udp,
        &[("proto", Value::UInt(super::ipv4::IPPROTO_UDP as u64))],
    )?;

    Ok(())
}
