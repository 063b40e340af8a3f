//! Checksum routines shared by the built-in layers
//!
//! The Internet Checksum (RFC 1071) used by IPv4, TCP and UDP headers:
//! sum the data as big-endian 16-bit words, fold the carries, complement.

/// Computes the Internet Checksum of `data`.
///
/// An odd trailing byte is padded with a zero octet on the right, per the
/// RFC.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }
    if let Some(&byte) = chunks.remainder().first() {
        sum += (byte as u32) << 8;
    }

    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !sum as u16
}

/// Computes the checksum of a TCP or UDP segment, including the IPv4
/// pseudo-header (source, destination, zero, protocol, segment length).
pub fn pseudo_header_checksum(
    src: std::net::Ipv4Addr,
    dst: std::net::Ipv4Addr,
    proto: u8,
    segment: &[u8],
) -> u16 {
    let mut data = Vec::with_capacity(12 + segment.len());
    data.extend(src.octets());
    data.extend(dst.octets());
    data.push(0);
    data.push(proto);
    data.extend((segment.len() as u16).to_be_bytes());
    data.extend(segment);

    internet_checksum(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc1071_example() {
        // Worked example from RFC 1071 §3: words 0001 f203 f4f5 f6f7.
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(internet_checksum(&data), !0xddf2);
    }

    #[test]
    fn odd_length_pads_right() {
        assert_eq!(internet_checksum(&[0x01]), !0x0100);
    }

    #[test]
    fn ipv4_header_verifies_to_zero() {
        // A header with a correct checksum sums to zero.
        let header =
            hex::decode("450000c1d24940008006c85b0a000005cf2e865e").unwrap();
        assert_eq!(internet_checksum(&header), 0);
    }
}
