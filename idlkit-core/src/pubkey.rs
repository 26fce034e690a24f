//! 32-byte public key type with base58 text form and the ed25519
//! curve-point check used by address derivation.

use std::fmt;
use std::str::FromStr;

use base58::{FromBase58, ToBase58};
use borsh::{BorshDeserialize, BorshSerialize};
use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const PUBKEY_BYTES: usize = 32;

/// A 32-byte public key or program-derived address.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub struct Pubkey([u8; PUBKEY_BYTES]);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsePubkeyError {
    #[error("Invalid base58 string: {0}")]
    InvalidBase58(String),

    #[error("Expected 32 bytes, got {0}")]
    WrongLength(usize),
}

impl Pubkey {
    pub const fn new_from_array(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }

    /// Build a key from a slice that must be exactly 32 bytes.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, ParsePubkeyError> {
        let arr: [u8; PUBKEY_BYTES] = bytes
            .try_into()
            .map_err(|_| ParsePubkeyError::WrongLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub const fn to_bytes(self) -> [u8; PUBKEY_BYTES] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; PUBKEY_BYTES] {
        &self.0
    }

    /// Whether these bytes decompress to a point on the ed25519 curve.
    ///
    /// Program-derived addresses are exactly the hashes for which this
    /// returns `false`: no private key can exist for them.
    pub fn is_on_curve(&self) -> bool {
        bytes_are_curve_point(&self.0)
    }
}

pub fn bytes_are_curve_point(bytes: &[u8; PUBKEY_BYTES]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

impl AsRef<[u8]> for Pubkey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; PUBKEY_BYTES]> for Pubkey {
    fn from(bytes: [u8; PUBKEY_BYTES]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Pubkey {
    type Err = ParsePubkeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s
            .from_base58()
            .map_err(|e| ParsePubkeyError::InvalidBase58(format!("{e:?}")))?;
        Self::try_from_slice(&bytes)
    }
}

impl fmt::Display for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_base58())
    }
}

impl fmt::Debug for Pubkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pubkey({self})")
    }
}

impl Serialize for Pubkey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Pubkey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base58_roundtrip() {
        let key = Pubkey::new_from_array([7u8; 32]);
        let text = key.to_string();
        assert_eq!(text.parse::<Pubkey>().unwrap(), key);
    }

    #[test]
    fn test_system_program_is_all_zero() {
        let key: Pubkey = "11111111111111111111111111111111".parse().unwrap();
        assert_eq!(key.to_bytes(), [0u8; 32]);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let err = "1111".parse::<Pubkey>().unwrap_err();
        assert_eq!(err, ParsePubkeyError::WrongLength(4));
    }

    #[test]
    fn test_invalid_base58_rejected() {
        assert!(matches!(
            "0OIl".parse::<Pubkey>(),
            Err(ParsePubkeyError::InvalidBase58(_))
        ));
    }

    #[test]
    fn test_serde_as_base58_string() {
        let key = Pubkey::new_from_array([9u8; 32]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{key}\""));
        assert_eq!(serde_json::from_str::<Pubkey>(&json).unwrap(), key);
        assert!(serde_json::from_str::<Pubkey>("\"0OIl\"").is_err());
    }

    #[test]
    fn test_identity_point_is_on_curve() {
        // y = 1 encodes the neutral element
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        assert!(Pubkey::new_from_array(bytes).is_on_curve());
    }
}
