//! Hex, base64 and key decoding for command line input.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use idlkit_core::hex;
use idlkit_core::pubkey::Pubkey;

use crate::error::{CliError, CliResult};

pub fn hex_encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string, with or without a `0x` prefix.
pub fn hex_decode(input: &str) -> CliResult<Vec<u8>> {
    hex::decode(input.trim()).map_err(|e| CliError::Hex(e.to_string()))
}

/// Decode binary input given as hex or base64.
///
/// A `0x` prefix or an even-length run of hex digits is read as hex;
/// anything else as standard base64.
pub fn decode_data(input: &str) -> CliResult<Vec<u8>> {
    let input = input.trim();
    if hex::is_hex(input) {
        return hex_decode(input);
    }
    STANDARD
        .decode(input)
        .map_err(|e| CliError::usage(format!("input is neither hex nor base64: {}", e)))
}

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode a 32-byte key from base58 or hex.
pub fn decode_pubkey(input: &str) -> CliResult<Pubkey> {
    let base58_err = match input.parse::<Pubkey>() {
        Ok(key) => return Ok(key),
        Err(e) => e,
    };
    if hex::is_hex(input) {
        let bytes = hex_decode(input)?;
        return Pubkey::try_from_slice(&bytes).map_err(|source| CliError::Pubkey {
            input: input.to_string(),
            source,
        });
    }
    Err(CliError::Pubkey {
        input: input.to_string(),
        source: base58_err,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip_with_prefix() {
        assert_eq!(hex_decode("0xdeadBEEF").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(hex_encode(&[0, 255]), "00ff");
        assert!(hex_decode("abc").is_err());
        assert!(hex_decode("zz").is_err());
    }

    #[test]
    fn test_decode_data_prefers_hex() {
        assert_eq!(decode_data("0102").unwrap(), vec![1, 2]);
        assert_eq!(decode_data("AQIDBAUGBwg=").unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(decode_data("!!").is_err());
    }

    #[test]
    fn test_decode_pubkey_forms() {
        let key = Pubkey::new_from_array([7; 32]);
        assert_eq!(decode_pubkey("US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx").unwrap(), key);
        assert_eq!(decode_pubkey(&hex_encode(&[7; 32])).unwrap(), key);
        assert!(decode_pubkey("0x0707").is_err());
    }
}
