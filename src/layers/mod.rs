//! Built-in protocol layers.
//!
//! Each submodule defines one packet type and wires it into the binding
//! registry. [`register_defaults`] installs the whole set; it is safe to
//! call more than once.

use std::sync::OnceLock;

use crate::errors::Error;

pub mod ethernet;
pub mod ipv4;
pub mod raw;
pub mod tcp;
pub mod udp;

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Registers every built-in packet type and its layer bindings.
///
/// Registration runs once per process; later calls return the cached
/// outcome.
pub fn register_defaults() -> Result<(), Error> {
    INIT.get_or_init(|| {
        raw::register_defaults().map_err(|e| e.to_string())?;
        ethernet::register_defaults().map_err(|e| e.to_string())?;
        ipv4::register_defaults().map_err(|e| e.to_string())?;
        udp::register_defaults().map_err(|e| e.to_string())?;
        tcp::register_defaults().map_err(|e| e.to_string())?;
        Ok(())
    })
    .clone()
    .map_err(Error::RegisterError)
}
