//! Packet crafting and dissection in Rust.
//!
//! `lancet` models protocol headers as declarative field lists. A
//! [`PacketType`] describes the fields of one layer; a [`Packet`] is a
//! concrete instance whose layers are stacked with the `/` operator.
//!
//! ```rust
//! # fn run() -> Result<(), lancet::Error> {
//! lancet::register_defaults()?;
//!
//! let ip = lancet::PacketType::lookup("IPv4")?;
//! let udp = lancet::PacketType::lookup("UDP")?;
//!
//! let mut dgram = lancet::Packet::new(udp);
//! dgram.set("dport", 53u16)?;
//! let pkt = lancet::Packet::new(ip) / dgram;
//!
//! // Length and checksum fields are filled in during encoding.
//! let bytes = lancet::encode(&pkt)?;
//!
//! let decoded = lancet::decode(&lancet::PacketType::lookup("IPv4")?, &bytes);
//! assert_eq!(decoded.get("dport")?, lancet::Value::UInt(53));
//! assert_eq!(lancet::encode(&decoded)?, bytes);
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```

pub mod binding;
pub mod build;
pub mod checksum;
pub mod dissect;
pub mod errors;
pub mod field;
pub mod layers;
pub mod packet;
pub mod ptype;
pub mod types;
pub mod wire;

pub use binding::{bind_layers, split_layers};
pub use build::encode;
pub use dissect::{decode, decode_strict};
pub use errors::Error;
pub use field::FieldSpec;
pub use layers::register_defaults;
pub use packet::Packet;
pub use ptype::PacketType;
pub use types::Value;
