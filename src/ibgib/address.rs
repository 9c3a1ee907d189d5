//! `ib^gib` addresses

use crate::error::GibError;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use super::GIB;

/// Delimiter between the `ib` and `gib` halves of an address
pub const IBGIB_DELIMITER: char = '^';

/// Address of an ibgib: `ib^gib`
///
/// The address is the only way one ibgib refers to another and doubles as the
/// storage key in every space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Build an address from its halves, rejecting an empty `ib` or one that
    /// contains the delimiter.
    pub fn new(ib: &str, gib: &str) -> Result<Self, GibError> {
        if ib.is_empty() {
            return Err(GibError::InvalidAddress("ib is empty".to_string()));
        }
        if ib.contains(IBGIB_DELIMITER) || gib.contains(IBGIB_DELIMITER) {
            return Err(GibError::InvalidAddress(format!(
                "{}{}{} contains more than one delimiter",
                ib, IBGIB_DELIMITER, gib
            )));
        }
        Ok(Self::from_parts(ib, gib))
    }

    /// Address of the primitive with the given ib, e.g. `tag^gib`
    pub fn primitive(ib: &str) -> Result<Self, GibError> {
        Self::new(ib, GIB)
    }

    pub(crate) fn from_parts(ib: &str, gib: &str) -> Self {
        Self(format!("{}{}{}", ib, IBGIB_DELIMITER, gib))
    }

    fn split_index(&self) -> usize {
        // validated on construction; from_parts callers guarantee the delimiter
        self.0.find(IBGIB_DELIMITER).unwrap_or(self.0.len())
    }

    pub fn ib(&self) -> &str {
        &self.0[..self.split_index()]
    }

    pub fn gib(&self) -> &str {
        let idx = self.split_index();
        self.0.get(idx + 1..).unwrap_or("")
    }

    /// Primitives carry the placeholder gib (or none at all).
    pub fn is_primitive(&self) -> bool {
        let gib = self.gib();
        gib.is_empty() || gib == GIB
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = GibError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((ib, gib)) = s.split_once(IBGIB_DELIMITER) else {
            return Err(GibError::InvalidAddress(format!(
                "{} is missing the {} delimiter",
                s, IBGIB_DELIMITER
            )));
        };
        Self::new(ib, gib)
    }
}

impl TryFrom<String> for Address {
    type Error = GibError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Address {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip_parts() {
        let addr: Address = "comment hello^ABC123".parse().unwrap();
        assert_eq!(addr.ib(), "comment hello");
        assert_eq!(addr.gib(), "ABC123");
        assert!(!addr.is_primitive());
        assert_eq!(addr.to_string(), "comment hello^ABC123");
    }

    #[test]
    fn test_primitive_detection() {
        assert!(Address::primitive("tag").unwrap().is_primitive());
        assert!("tag^".parse::<Address>().unwrap().is_primitive());
    }

    #[test]
    fn test_rejects_bad_addresses() {
        assert!("no delimiter".parse::<Address>().is_err());
        assert!("^ABC".parse::<Address>().is_err());
        assert!("a^b^c".parse::<Address>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let addr = Address::new("x", "Y").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"x^Y\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
        assert!(serde_json::from_str::<Address>("\"nope\"").is_err());
    }
}
