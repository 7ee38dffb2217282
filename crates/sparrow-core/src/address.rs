//! EVM account/contract address

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{CoreError, CoreResult};

/// 20-byte hex address, normalised to lowercase so comparisons ignore
/// checksum casing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub(crate) String);

impl Address {
    pub fn parse(input: &str) -> CoreResult<Self> {
        let hex = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .ok_or_else(|| CoreError::InvalidAddress(input.to_string()))?;

        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidAddress(input.to_string()));
        }

        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }

    /// Address from its raw 20 bytes
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        Self(format!("0x{}", hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for headers: `0x1234...abcd`
    pub fn short(&self) -> String {
        format!("{}...{}", &self.0[..6], &self.0[self.0.len() - 4..])
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalises_case() {
        let checksummed = Address::parse("0x8F8926A38D03125c448b5EF5f2Edbfc3BE8C69D2").unwrap();
        let lower = Address::parse("0x8f8926a38d03125c448b5ef5f2edbfc3be8c69d2").unwrap();
        assert_eq!(checksummed, lower);
        assert_eq!(checksummed.short(), "0x8f89...69d2");
    }

    #[test]
    fn test_from_bytes() {
        let mut bytes = [0u8; 20];
        bytes[19] = 0xab;
        let address = Address::from_bytes(bytes);
        assert_eq!(address.as_str(), "0x00000000000000000000000000000000000000ab");
        assert_eq!(Address::parse(address.as_str()).unwrap(), address);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Address::parse("8f8926a38d03125c448b5ef5f2edbfc3be8c69d2").is_err());
        assert!(Address::parse("0x8f89").is_err());
        assert!(Address::parse("0xzz8926a38d03125c448b5ef5f2edbfc3be8c69d2").is_err());
    }
}
