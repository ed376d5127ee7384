use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fixed memory address an image is linked to run at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoadAddress(u64);

impl LoadAddress {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoadAddress {
    /// Lowercase hex with a `0x` prefix and no padding, e.g. `0x80420000`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl From<u64> for LoadAddress {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<LoadAddress> for String {
    fn from(addr: LoadAddress) -> Self {
        addr.to_string()
    }
}

impl TryFrom<String> for LoadAddress {
    type Error = AddressParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address '{input}': {reason}")]
pub struct AddressParseError {
    pub input: String,
    pub reason: String,
}

impl FromStr for LoadAddress {
    type Err = AddressParseError;

    /// Accepts `0x`-prefixed hex (either case, `_` separators allowed) or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| AddressParseError {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let cleaned: String = trimmed.chars().filter(|c| *c != '_').collect();
        if cleaned.is_empty() {
            return Err(fail("empty"));
        }

        let parsed = match cleaned
            .strip_prefix("0x")
            .or_else(|| cleaned.strip_prefix("0X"))
        {
            Some(hex) if hex.is_empty() => return Err(fail("missing hex digits")),
            Some(hex) => u64::from_str_radix(hex, 16),
            None => cleaned.parse::<u64>(),
        };

        parsed
            .map(LoadAddress)
            .map_err(|e| fail(&e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_as_unpadded_lowercase_hex() {
        assert_eq!(LoadAddress::new(0x8042_0000).to_string(), "0x80420000");
        assert_eq!(LoadAddress::new(0xABC).to_string(), "0xabc");
        assert_eq!(LoadAddress::new(0).to_string(), "0x0");
    }

    #[test]
    fn parses_hex_and_decimal() {
        assert_eq!("0x80400000".parse::<LoadAddress>().unwrap().get(), 0x8040_0000);
        assert_eq!("0X8040_0000".parse::<LoadAddress>().unwrap().get(), 0x8040_0000);
        assert_eq!("131072".parse::<LoadAddress>().unwrap().get(), 0x20000);
        assert_eq!(" 0x20000 ".parse::<LoadAddress>().unwrap().get(), 0x20000);
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<LoadAddress>().is_err());
        assert!("0x".parse::<LoadAddress>().is_err());
        assert!("0xzz".parse::<LoadAddress>().is_err());
        assert!("-1".parse::<LoadAddress>().is_err());
        let err = "0x1_0000_0000_0000_0000".parse::<LoadAddress>().unwrap_err();
        assert!(err.to_string().contains("0x1_0000_0000_0000_0000"));
    }

    #[test]
    fn serializes_as_hex_string() {
        let json = serde_json::to_string(&LoadAddress::new(0x8044_0000)).unwrap();
        assert_eq!(json, "\"0x80440000\"");
        let back: LoadAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(), 0x8044_0000);
    }
}
