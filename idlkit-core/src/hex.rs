//! Lower-case hex text for byte strings, shared by the JSON bridge and
//! command line front ends.

use crate::error::HexError;

pub fn encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Drop a leading `0x` or `0X`.
pub fn strip_prefix(input: &str) -> &str {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input)
}

/// Even-length run of hex digits, prefix optional.
pub fn is_hex(input: &str) -> bool {
    let digits = strip_prefix(input);
    digits.len() % 2 == 0 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Decode hex text, with or without a `0x` prefix. Either case is accepted.
pub fn decode(input: &str) -> Result<Vec<u8>, HexError> {
    let digits = strip_prefix(input);
    if digits.len() % 2 != 0 {
        return Err(HexError::OddLength(digits.len()));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or(HexError::InvalidDigit { position: i })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_forms() {
        assert_eq!(decode("0xdeadBEEF").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
        assert_eq!(decode("abc"), Err(HexError::OddLength(3)));
        assert_eq!(decode("00zz"), Err(HexError::InvalidDigit { position: 2 }));
        // multi-byte characters never split a pair
        assert_eq!(decode("é00"), Err(HexError::InvalidDigit { position: 0 }));
    }

    #[test]
    fn test_is_hex() {
        assert!(is_hex("0x0a0B"));
        assert!(!is_hex("0a0"));
        assert!(!is_hex("AQID"));
    }
}
