//! TCP Layer

use crate::binding::bind_layers;
use crate::checksum::{internet_checksum, pseudo_header_checksum};
use crate::errors::Error;
use crate::field::{FieldSpec, PatchCtx};
use crate::packet::Packet;
use crate::ptype::PacketType;
use crate::types::Value;

pub const TCP_BASE_HEADER_LENGTH: usize = 20_usize;

pub const TCP_FLAG_FIN: u64 = 0x001;
pub const TCP_FLAG_SYN: u64 = 0x002;
pub const TCP_FLAG_RST: u64 = 0x004;
pub const TCP_FLAG_PSH: u64 = 0x008;
pub const TCP_FLAG_ACK: u64 = 0x010;

fn options_len(p: &Packet) -> usize {
    let dataofs = p.get("dataofs").ok().and_then(|v| v.as_u64()).unwrap_or(5) as usize;
    (dataofs * 4).saturating_sub(TCP_BASE_HEADER_LENGTH)
}

fn tcp_checksum(ctx: &PatchCtx) -> u64 {
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
            pseudo_header_checksum(src, dst, super::ipv4::IPPROTO_TCP, ctx.buffer) as u64
        }
        None => internet_checksum(ctx.buffer) as u64,
    }
}

pub(crate) fn register_defaults() -> Result<(), Error> {
    let tcp = PacketType::builder("TCP")
        .short_name("tcp")
        .field(FieldSpec::be16("sport", 0))
        .field(FieldSpec::be16("dport", 0))
        .field(FieldSpec::be32("seq", 0))
        .field(FieldSpec::be32("ack", 0))
        .field(FieldSpec::bits("dataofs", 4, 5))
        .field(FieldSpec::bits("reserved", 3, 0))
        .field(FieldSpec::bits("flags", 9, TCP_FLAG_SYN))
        .field(FieldSpec::be16("window", 8192))
        .field(FieldSpec::checksum("checksum", 2, tcp_checksum))
        .field(FieldSpec::be16("urgptr", 0))
        .field(FieldSpec::bytes_from("options", options_len))
        .register()?;

    let ipv4 = PacketType::lookup("IPv4")?;
    bind_layers(
        &ipv4,
        &tcp,
        &[("proto", Value::UInt(super::ipv4::IPPROTO_TCP as u64))],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::encode;
    use crate::dissect::decode;

    #[test]
    fn dissect_segment_with_options() {
        let _ = crate::layers::register_defaults();

        // dataofs 8: 20 base bytes plus 12 option bytes, then payload.
        let bytes = hex::decode(
            "001af9c7001903a00000000080022000da4700000204058c0103030801010402ff",
        )
        .unwrap();
        let t = PacketType::lookup("TCP").unwrap();
        let p = decode(&t, &bytes);

        assert_eq!(p.get("sport").unwrap(), Value::UInt(26));
        assert_eq!(p.get("dport").unwrap(), Value::UInt(63943));
        assert_eq!(p.get("dataofs").unwrap(), Value::UInt(8));
        assert_eq!(p.get("flags").unwrap(), Value::UInt(TCP_FLAG_SYN));
        assert_eq!(p.get("window").unwrap(), Value::UInt(0x2000));
        assert_eq!(
            p.get("options").unwrap(),
            Value::Bytes(hex::decode("0204058c0103030801010402").unwrap())
        );
        assert_eq!(
            p.payload().unwrap().get("load").unwrap(),
            Value::Bytes(vec![0xff])
        );

        assert_eq!(encode(&p).unwrap(), bytes);
    }

    #[test]
    fn build_syn_under_ipv4() {
        let _ = crate::layers::register_defaults();

        let ip = PacketType::lookup("IPv4").unwrap();
        let tcp = PacketType::lookup("TCP").unwrap();
        let mut seg = crate::packet::Packet::new(tcp);
        seg.set("dport", 80u16).unwrap();
        let p = crate::packet::Packet::new(ip) / seg;
        assert_eq!(p.get("proto").unwrap(), Value::UInt(6));

        let bytes = encode(&p).unwrap();
        assert_eq!(bytes.len(), 40);
        // dataofs 5, reserved 0, flags SYN.
        assert_eq!(&bytes[32..34], &[0x50, 0x02]);
    }
}
