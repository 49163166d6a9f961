//! Core type definitions for the Halo ledger

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Token amount in the smallest unit (18 decimals)
pub type Amount = u128;

/// Epoch index counted from the configured start timestamp
pub type EpochIndex = u64;

/// Address - 20-byte account, token or pool identifier
///
/// Rendered as `0x`-prefixed lowercase hex. Serialized in the same form so
/// configuration files stay readable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    bytes: [u8; 20],
}

impl Address {
    /// Create an address from raw bytes
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self { bytes }
    }

    /// Address with every byte set to `byte` (handy for fixtures)
    pub const fn repeat(byte: u8) -> Self {
        Self { bytes: [byte; 20] }
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.bytes
    }

    /// Convert to `0x`-prefixed hex
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.bytes))
    }

    /// Parse from hex, with or without the `0x` prefix
    pub fn from_hex(s: &str) -> Result<Self, AddressParseError> {
        let trimmed = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let decoded = hex::decode(trimmed).map_err(|_| AddressParseError(s.to_string()))?;
        if decoded.len() != 20 {
            return Err(AddressParseError(s.to_string()));
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&decoded);
        Ok(Self { bytes })
    }

    /// The zero address
    pub const ZERO: Self = Self { bytes: [0u8; 20] };
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_hex()
    }
}

/// Malformed address string
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid address: {0}")]
pub struct AddressParseError(pub String);

/// Pool class - every pool belongs to exactly one
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolClass {
    /// AMM liquidity-provider token pools
    Amm,
    /// Minter collateral pools
    Minter,
}

impl PoolClass {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Amm => "amm",
            Self::Minter => "minter",
        }
    }
}

impl fmt::Display for PoolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::repeat(0xab);
        let hex = addr.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 42);
        assert_eq!(Address::from_hex(&hex).unwrap(), addr);
        assert_eq!(Address::from_hex(&hex[2..]).unwrap(), addr);
    }

    #[test]
    fn test_address_rejects_bad_length() {
        assert!(Address::from_hex("0x1234").is_err());
        assert!("0xzz".parse::<Address>().is_err());
    }

    #[test]
    fn test_address_serializes_as_hex_string() {
        let addr = Address::repeat(1);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_pool_class_display() {
        assert_eq!(PoolClass::Amm.to_string(), "amm");
        assert_eq!(PoolClass::Minter.to_string(), "minter");
    }
}
