//! MAC Address Type
//!
//! A type representing a MAC address as an array of `[u8; 6]`, parseable
//! from the usual colon-separated string form.

use core::convert::TryFrom;
use core::fmt;
use core::str::FromStr;

use serde::{Serialize, Serializer};

use crate::errors::Error as CrateError;

#[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// Returns a slice containing the entire inner array.
    pub const fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns a mutable slice containing the entire inner array.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl Serialize for MacAddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(format!("{}", self).as_str())
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(value: [u8; 6]) -> Self {
        Self(value)
    }
}

impl TryFrom<&'_ [u8]> for MacAddr {
    type Error = CrateError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        if slice.len() < 6 {
            Err(CrateError::TooShort {
                required: 6,
                available: slice.len(),
                data: hex::encode(slice),
            })
        } else if slice.len() > 6 {
            Err(CrateError::ParseError(format!(
                "MacAddr: {}",
                hex::encode(slice)
            )))
        } else {
            let mut m = MacAddr::default();
            m.0.copy_from_slice(slice);
            Ok(m)
        }
    }
}

impl FromStr for MacAddr {
    type Err = CrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut m = MacAddr::default();
        let mut count = 0;
        for (i, part) in s.split(':').enumerate() {
            if i >= 6 || part.len() != 2 {
                return Err(CrateError::ParseError(format!("MacAddr: {}", s)));
            }
            m.0[i] = u8::from_str_radix(part, 16)
                .map_err(|_| CrateError::ParseError(format!("MacAddr: {}", s)))?;
            count += 1;
        }
        if count != 6 {
            return Err(CrateError::ParseError(format!("MacAddr: {}", s)));
        }
        Ok(m)
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
