//! Hex display helpers
//!
//! Certain fields (ethertypes, identifiers, checksums) read better as hex
//! than as plain integers. The functions here render an integer value at a
//! given wire width, zero padded, the way protocol references print them.

macro_rules! generate_format_hex_fns {
    (($fn:ident, $format:literal)) => {
        pub fn $fn(value: u64) -> String {
            format!($format, value)
        }
    };

    ($($tt:tt,)*) => {
        $(
            generate_format_hex_fns!($tt);
        )+
    };
}

// One function per supported fixed width, in bytes.
generate_format_hex_fns! {
    (format_hex_u8, "0x{:02x}"),
    (format_hex_u16, "0x{:04x}"),
    (format_hex_u24, "0x{:06x}"),
    (format_hex_u32, "0x{:08x}"),
    (format_hex_u64, "0x{:016x}"),
}

/// Dispatch on a wire width in bytes.
pub fn format_hex(width: usize, value: u64) -> String {
    match width {
        1 => format_hex_u8(value),
        2 => format_hex_u16(value),
        3 => format_hex_u24(value),
        4 => format_hex_u32(value),
        _ => format_hex_u64(value),
    }
}
