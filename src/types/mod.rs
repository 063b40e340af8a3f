//! Value and address types shared by all field kinds

mod macaddr;
pub use macaddr::*;

mod value;
pub use value::*;

pub mod hex;
