//! IPv4 Layer

use std::net::Ipv4Addr;

use crate::binding::bind_layers;
use crate::checksum::internet_checksum;
use crate::errors::Error;
use crate::field::{FieldSpec, Measure, PatchCtx};
use crate::packet::Packet;
use crate::ptype::PacketType;
use crate::types::Value;

/// Length of the IPv4 header when no options are present.
pub const IPV4_BASE_HEADER_LENGTH: usize = 20_usize;

pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;

fn options_len(p: &Packet) -> usize {
    let ihl = p.get("ihl").ok().and_then(|v| v.as_u64()).unwrap_or(5) as usize;
    (ihl * 4).saturating_sub(IPV4_BASE_HEADER_LENGTH)
}

fn header_checksum(ctx: &PatchCtx) -> u64 {
    internet_checksum(&ctx.buffer[..ctx.header_len]) as u64
}

/// Clip the remainder to the total-length field; anything past it is
/// link-layer trailer padding, not payload.
fn clip_to_total_length(p: &Packet, rem: &[u8]) -> usize {
    let total = p.get("len").ok().and_then(|v| v.as_u64()).unwrap_or(0) as usize;
    let ihl = p.get("ihl").ok().and_then(|v| v.as_u64()).unwrap_or(5) as usize;
    total.saturating_sub(ihl * 4).min(rem.len())
}

pub(crate) fn register_defaults() -> Result<(), Error> {
    let ipv4 = PacketType::builder("IPv4")
        .short_name("ip")
        .field(FieldSpec::bits("version", 4, 4))
        .field(FieldSpec::bits("ihl", 4, 5))
        .field(FieldSpec::u8("tos", 0))
        .field(FieldSpec::length_of("len", 2, Measure::Packet))
        .field(FieldSpec::xbe16("id", 1))
        .field(FieldSpec::bits("flags", 3, 0))
        .field(FieldSpec::bits("frag", 13, 0))
        .field(FieldSpec::u8("ttl", 64))
        .field(FieldSpec::u8("proto", 0))
        .field(FieldSpec::checksum("checksum", 2, header_checksum))
        .field(FieldSpec::ip4("src", Ipv4Addr::UNSPECIFIED))
        .field(FieldSpec::ip4("dst", Ipv4Addr::UNSPECIFIED))
        .field(FieldSpec::bytes_from("options", options_len))
        .extract_padding(clip_to_total_length)
        .register()?;

    let ethernet = PacketType::lookup("Ethernet")?;
    bind_layers(
        &ethernet,
        &ipv4,
        &[("ethertype", Value::UInt(super::ethernet::ETHERTYPE_IP as u64))],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::build::encode;
    use crate::dissect::decode;
    use crate::packet::Packet;
    use crate::ptype::PacketType;
    use crate::types::Value;

    #[test]
    fn dissect_header_fields() {
        let _ = crate::layers::register_defaults();

        // 20-byte header, proto 6, followed by nothing.
        let bytes = hex::decode("450000c1d24940008006c85b0a000005cf2e865e").unwrap();
        let t = PacketType::lookup("IPv4").unwrap();
        let p = decode(&t, &bytes);

        assert_eq!(p.get("version").unwrap(), Value::UInt(4));
        assert_eq!(p.get("ihl").unwrap(), Value::UInt(5));
        assert_eq!(p.get("len").unwrap(), Value::UInt(0xc1));
        assert_eq!(p.get("flags").unwrap(), Value::UInt(2));
        assert_eq!(p.get("frag").unwrap(), Value::UInt(0));
        assert_eq!(p.get("ttl").unwrap(), Value::UInt(0x80));
        assert_eq!(p.get("proto").unwrap(), Value::UInt(6));
        assert_eq!(p.get_display("src").unwrap(), "10.0.0.5");
        assert_eq!(p.get_display("dst").unwrap(), "207.46.134.94");
        assert_eq!(p.get("options").unwrap(), Value::Bytes(vec![]));
    }

    #[test]
    fn build_fills_length_and_checksum() {
        let _ = crate::layers::register_defaults();

        let t = PacketType::lookup("IPv4").unwrap();
        let mut p = Packet::new(t.clone());
        p.set("src", "10.0.0.5").unwrap();
        p.set("dst", "10.0.0.9").unwrap();
        let p = p / crate::layers::raw::raw_packet(&[0xde, 0xad]);

        let bytes = encode(&p).unwrap();
        assert_eq!(bytes.len(), 22);
        // Total length covers header and payload.
        assert_eq!(&bytes[2..4], &[0x00, 0x16]);
        // The patched header verifies to zero.
        assert_eq!(crate::checksum::internet_checksum(&bytes[..20]), 0);

        // And the whole frame survives a dissect/rebuild cycle.
        let back = decode(&t, &bytes);
        assert_eq!(encode(&back).unwrap(), bytes);
    }

    #[test]
    fn trailer_bytes_become_padding() {
        let _ = crate::layers::register_defaults();

        // len = 21: one payload byte, then three bytes of trailer.
        let mut bytes =
            hex::decode("450000157777000040110000c0a80001c0a80002").unwrap();
        bytes.extend([0xaa, 0x00, 0x00, 0x00]);
        let t = PacketType::lookup("IPv4").unwrap();
        let p = decode(&t, &bytes);

        let tail = p.layer("Padding").expect("padding layer");
        assert_eq!(tail.get("load").unwrap(), Value::Bytes(vec![0, 0, 0]));
    }
}
