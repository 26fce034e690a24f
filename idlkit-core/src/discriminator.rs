//! 8-byte discriminators.
//!
//! A discriminator is the first eight bytes of
//! `SHA-256("<namespace>:<name>")`. Accounts use the `account`
//! namespace, instructions `global` and events `event`. The name is
//! hashed exactly as written: no trimming, no case folding.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::{CoderError, CoderResult};

pub const DISCRIMINATOR_LEN: usize = 8;

pub type Discriminator = [u8; DISCRIMINATOR_LEN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Account,
    Global,
    Event,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Account => "account",
            Namespace::Global => "global",
            Namespace::Event => "event",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The string that gets hashed, e.g. `account:Data`.
pub fn preimage(namespace: Namespace, name: &str) -> String {
    format!("{}:{}", namespace.as_str(), name)
}

/// Compute the discriminator of `name` in `namespace`.
///
/// Fails only on an empty name.
pub fn compute(namespace: Namespace, name: &str) -> CoderResult<Discriminator> {
    if name.is_empty() {
        return Err(CoderError::invalid_argument("discriminator name must not be empty"));
    }
    Ok(hash_preimage(&preimage(namespace, name)))
}

/// Discriminator under a custom namespace string, for programs that
/// hash their own prefixes.
pub fn compute_with_prefix(prefix: &str, name: &str) -> CoderResult<Discriminator> {
    if name.is_empty() {
        return Err(CoderError::invalid_argument("discriminator name must not be empty"));
    }
    Ok(hash_preimage(&format!("{prefix}:{name}")))
}

pub(crate) fn hash_preimage(preimage: &str) -> Discriminator {
    let hash = Sha256::digest(preimage.as_bytes());
    let mut out = [0u8; DISCRIMINATOR_LEN];
    out.copy_from_slice(&hash[..DISCRIMINATOR_LEN]);
    out
}

/// Convert an explicit discriminator from the IDL, which must be exactly
/// eight bytes.
pub fn from_slice(bytes: &[u8]) -> Option<Discriminator> {
    bytes.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preimage_format() {
        assert_eq!(preimage(Namespace::Global, "initialize"), "global:initialize");
        assert_eq!(preimage(Namespace::Event, "Transfer"), "event:Transfer");
    }

    #[test]
    fn test_from_slice_requires_eight_bytes() {
        assert!(from_slice(&[1, 2, 3]).is_none());
        assert_eq!(from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]), Some([1, 2, 3, 4, 5, 6, 7, 8]));
    }
}
