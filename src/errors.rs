//! Error types

/// Errors returned by the field, packet and registry APIs.
///
/// Tolerant dissection ([`decode`][`crate::decode`]) never surfaces these;
/// malformed input ends up as a [`Raw`][`crate::layers::raw`] layer instead.
/// Registration, field access and construction report them directly.
#[derive(Debug, PartialEq)]
pub enum Error {
    /// Not enough bytes to honour a hard minimum. Carries the offending
    /// bytes hex-encoded for context.
    TooShort {
        required: usize,
        available: usize,
        data: String,
    },
    ParseError(String),
    RegisterError(String),
    /// A field name that belongs to no layer of the packet chain.
    NoSuchField(String),
    /// Construction-time failure (unrepresentable value, unknown measured
    /// field and the like). Always the caller's mistake, never bad input.
    BuildError(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::TooShort {
                required,
                available,
                data,
            } => write!(
                f,
                "too short: required {}, available {} (data: {})",
                required, available, data
            ),
            Error::ParseError(s) => write!(f, "parse error: {}", s),
            Error::RegisterError(s) => write!(f, "register error: {}", s),
            Error::NoSuchField(s) => write!(f, "no such field: {}", s),
            Error::BuildError(s) => write!(f, "build error: {}", s),
        }
    }
}
