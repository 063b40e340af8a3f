//! Ethernet Layer
//!
//! Ethernet II and the older 802.3 framing begin identically and diverge
//! at the two-byte word after the addresses: values above 1536 are an
//! ethertype, values up to 1500 are a payload length. The Ethernet type
//! carries a dispatch hook that peeks at that word and redirects to
//! [`Dot3`] framing when it reads as a length.

use std::sync::Arc;

use crate::errors::Error;
use crate::field::{FieldSpec, Measure};
use crate::ptype::PacketType;
use crate::types::MacAddr;

pub const ETH_HEADER_LENGTH: usize = 14_usize;

pub const ETHERTYPE_IP: u16 = 0x0800_u16;
pub const ETHERTYPE_ARP: u16 = 0x0806_u16;
pub const ETHERTYPE_IP6: u16 = 0x86dd_u16;

/// Largest type/length word that still means "length" (802.3).
const ETH_MAX_FRAME_LENGTH: u16 = 1500;

fn dispatch_dot3(bytes: &[u8]) -> Option<Arc<PacketType>> {
    if bytes.len() >= ETH_HEADER_LENGTH {
        let type_or_len = u16::from_be_bytes([bytes[12], bytes[13]]);
        if type_or_len <= ETH_MAX_FRAME_LENGTH {
            return PacketType::lookup("Dot3").ok();
        }
    }
    None
}

pub(crate) fn register_defaults() -> Result<(), Error> {
    // Dot3 first: the Ethernet dispatch hook looks it up by name.
    PacketType::builder("Dot3")
        .short_name("dot3")
        .field(FieldSpec::mac("dst", MacAddr::default()))
        .field(FieldSpec::mac("src", MacAddr::default()))
        .field(FieldSpec::length_of("len", 2, Measure::Payload))
        .register()?;

    PacketType::builder("Ethernet")
        .short_name("eth")
        .field(FieldSpec::mac("dst", MacAddr::default()))
        .field(FieldSpec::mac("src", MacAddr::default()))
        .field(FieldSpec::xbe16("ethertype", 0xFFFF))
        .dispatch(dispatch_dot3)
        .register()?;

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
    fn dissect_ethernet_ii_header() {
        let _ = crate::layers::register_defaults();

        let frame = hex::decode("00e08100b02800096b88f5c9ffff").unwrap();
        let t = PacketType::lookup("Ethernet").unwrap();
        let p = decode(&t, &frame);

        assert_eq!(p.type_name(), "Ethernet");
        assert_eq!(p.get_display("dst").unwrap(), "00:e0:81:00:b0:28");
        assert_eq!(p.get_display("src").unwrap(), "00:09:6b:88:f5:c9");
        assert_eq!(p.get_display("ethertype").unwrap(), "0xffff");
        assert!(p.payload().is_none());
    }

    #[test]
    fn length_word_dispatches_to_dot3() {
        let _ = crate::layers::register_defaults();

        // type/length word 0x0005: five payload bytes follow.
        let frame = hex::decode("00e08100b02800096b88f5c900051122334455").unwrap();
        let t = PacketType::lookup("Ethernet").unwrap();
        let p = decode(&t, &frame);

        assert_eq!(p.type_name(), "Dot3");
        assert_eq!(p.get("len").unwrap(), Value::UInt(5));
        assert_eq!(p.payload().unwrap().type_name(), "Raw");
    }

    #[test]
    fn dot3_auto_length_measures_payload() {
        let _ = crate::layers::register_defaults();

        let t = PacketType::lookup("Dot3").unwrap();
        let p = Packet::new(t) / crate::layers::raw::raw_packet(&[1, 2, 3]);
        let bytes = encode(&p).unwrap();
        assert_eq!(&bytes[12..14], &[0x00, 0x03]);
        assert_eq!(bytes.len(), 17);
    }
}
