//! Program-derived address derivation.
//!
//! An address is `SHA-256(seeds ‖ [bump] ‖ program_id ‖ "ProgramDerivedAddress")`
//! for the highest bump (255 down to 0) whose hash is not an ed25519
//! curve point. Seeds are concatenated raw: strings carry no length
//! prefix, integers are little-endian at the width the caller picks.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::PdaError;
use crate::idl::{IdlPda, IdlSeed, IdlSeedValue, IdlType};
use crate::pubkey::{bytes_are_curve_point, Pubkey, PUBKEY_BYTES};
use crate::value::IdlValue;

/// Seeds per address computation, counting the bump.
pub const MAX_SEEDS: usize = 16;

/// Bytes per seed.
pub const MAX_SEED_LEN: usize = 32;

/// Width of integer seeds when the caller does not choose one.
pub const DEFAULT_INT_WIDTH: usize = 8;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

/// A derived address and the bump that pushed it off the curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PdaResult {
    pub address: Pubkey,
    pub bump: u8,
}

impl fmt::Display for PdaResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (bump {})", self.address, self.bump)
    }
}

/// A seed before encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdaSeed {
    /// UTF-8 bytes, no length prefix.
    Str(String),
    Bytes(Vec<u8>),
    Pubkey(Pubkey),
    /// Little-endian at `width` bytes.
    Number { value: u64, width: usize },
    BigInt { value: u128, width: usize },
    Bool(bool),
}

impl PdaSeed {
    pub fn str(s: impl Into<String>) -> Self {
        PdaSeed::Str(s.into())
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        PdaSeed::Bytes(b.into())
    }

    /// Integer seed at the default 8-byte width.
    pub fn u64(value: u64) -> Self {
        PdaSeed::Number {
            value,
            width: DEFAULT_INT_WIDTH,
        }
    }

    pub fn number(value: u64, width: usize) -> Self {
        PdaSeed::Number { value, width }
    }

    pub fn big_int(value: u128, width: usize) -> Self {
        PdaSeed::BigInt { value, width }
    }

    /// Encode the seed, checking the width but not the 32-byte limit.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PdaError> {
        match self {
            PdaSeed::Str(s) => Ok(s.as_bytes().to_vec()),
            PdaSeed::Bytes(b) => Ok(b.clone()),
            PdaSeed::Pubkey(key) => Ok(key.as_bytes().to_vec()),
            PdaSeed::Number { value, width } => le_at_width(u128::from(*value), *width),
            PdaSeed::BigInt { value, width } => le_at_width(*value, *width),
            PdaSeed::Bool(b) => Ok(vec![u8::from(*b)]),
        }
    }
}

impl From<&str> for PdaSeed {
    fn from(s: &str) -> Self {
        PdaSeed::Str(s.to_string())
    }
}

impl From<String> for PdaSeed {
    fn from(s: String) -> Self {
        PdaSeed::Str(s)
    }
}

impl From<Vec<u8>> for PdaSeed {
    fn from(b: Vec<u8>) -> Self {
        PdaSeed::Bytes(b)
    }
}

impl From<&[u8]> for PdaSeed {
    fn from(b: &[u8]) -> Self {
        PdaSeed::Bytes(b.to_vec())
    }
}

impl From<Pubkey> for PdaSeed {
    fn from(key: Pubkey) -> Self {
        PdaSeed::Pubkey(key)
    }
}

impl From<bool> for PdaSeed {
    fn from(b: bool) -> Self {
        PdaSeed::Bool(b)
    }
}

impl From<u64> for PdaSeed {
    fn from(value: u64) -> Self {
        PdaSeed::u64(value)
    }
}

fn le_at_width(value: u128, width: usize) -> Result<Vec<u8>, PdaError> {
    if width == 0 || width > MAX_SEED_LEN {
        return Err(PdaError::InvalidWidth { width });
    }
    let full = value.to_le_bytes();
    if width < full.len() && full[width..].iter().any(|b| *b != 0) {
        return Err(PdaError::SeedOverflow {
            value: value.to_string(),
            width,
        });
    }
    let mut out = vec![0u8; width];
    let n = width.min(full.len());
    out[..n].copy_from_slice(&full[..n]);
    Ok(out)
}

/// Encode and length-check a seed list.
pub fn encode_seeds(seeds: &[PdaSeed]) -> Result<Vec<Vec<u8>>, PdaError> {
    let encoded = seeds.iter().map(PdaSeed::to_bytes).collect::<Result<Vec<_>, _>>()?;
    check_seed_lengths(encoded.iter().map(Vec::as_slice))?;
    Ok(encoded)
}

fn check_seed_lengths<'a>(seeds: impl IntoIterator<Item = &'a [u8]>) -> Result<(), PdaError> {
    for (index, seed) in seeds.into_iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(PdaError::SeedTooLong {
                index,
                len: seed.len(),
                max: MAX_SEED_LEN,
            });
        }
    }
    Ok(())
}

fn check_seed_count(count: usize, max: usize) -> Result<(), PdaError> {
    if count > max {
        return Err(PdaError::TooManySeeds { count, max });
    }
    Ok(())
}

fn hash_address(seeds: &[&[u8]], bump: Option<u8>, program_id: &Pubkey) -> [u8; PUBKEY_BYTES] {
    let mut hasher = Sha256::new();
    for seed in seeds {
        hasher.update(seed);
    }
    if let Some(bump) = bump {
        hasher.update([bump]);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);
    hasher.finalize().into()
}

// ─── Derivation ──────────────────────────────────────────────────

/// Search bumps 255 down to 0 for the first off-curve address.
///
/// Accepts at most 15 caller seeds: the bump is appended as the 16th.
pub fn find_program_address(seeds: &[PdaSeed], program_id: &Pubkey) -> Result<PdaResult, PdaError> {
    let encoded = encode_seeds(seeds)?;
    let slices: Vec<&[u8]> = encoded.iter().map(Vec::as_slice).collect();
    find_program_address_raw(&slices, program_id)
}

pub fn find_program_address_raw(seeds: &[&[u8]], program_id: &Pubkey) -> Result<PdaResult, PdaError> {
    // The bump takes the last slot.
    check_seed_count(seeds.len(), MAX_SEEDS - 1)?;
    check_seed_lengths(seeds.iter().copied())?;

    for bump in (0..=u8::MAX).rev() {
        let hash = hash_address(seeds, Some(bump), program_id);
        if !bytes_are_curve_point(&hash) {
            let result = PdaResult {
                address: Pubkey::new_from_array(hash),
                bump,
            };
            debug!(program_id = %program_id, address = %result.address, bump, "derived program address");
            return Ok(result);
        }
    }
    Err(PdaError::NoViableBump)
}

/// Hash once with no search and no curve check. The caller supplies the
/// bump as the last seed.
pub fn create_program_address(seeds: &[PdaSeed], program_id: &Pubkey) -> Result<Pubkey, PdaError> {
    let encoded = encode_seeds(seeds)?;
    let slices: Vec<&[u8]> = encoded.iter().map(Vec::as_slice).collect();
    create_program_address_raw(&slices, program_id)
}

pub fn create_program_address_raw(seeds: &[&[u8]], program_id: &Pubkey) -> Result<Pubkey, PdaError> {
    check_seed_count(seeds.len(), MAX_SEEDS)?;
    check_seed_lengths(seeds.iter().copied())?;
    Ok(Pubkey::new_from_array(hash_address(seeds, None, program_id)))
}

/// Check a claimed `(address, bump)` without searching: the recomputed
/// hash must equal `address` and lie off the curve.
pub fn verify_program_address(
    address: &Pubkey,
    seeds: &[PdaSeed],
    bump: u8,
    program_id: &Pubkey,
) -> Result<bool, PdaError> {
    let encoded = encode_seeds(seeds)?;
    check_seed_count(encoded.len(), MAX_SEEDS - 1)?;
    let slices: Vec<&[u8]> = encoded.iter().map(Vec::as_slice).collect();
    let hash = hash_address(&slices, Some(bump), program_id);
    Ok(hash == *address.as_bytes() && !bytes_are_curve_point(&hash))
}

// ─── IDL-declared seeds ──────────────────────────────────────────

/// Inputs an IDL seed list can reference.
#[derive(Debug, Clone, Default)]
pub struct SeedContext {
    /// Instruction accounts by name.
    pub accounts: HashMap<String, Pubkey>,
    /// Decoded account data by account name, for `account.field` paths.
    pub account_data: HashMap<String, IdlValue>,
    /// Instruction arguments by name.
    pub args: HashMap<String, IdlValue>,
}

impl SeedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, name: impl Into<String>, key: Pubkey) -> Self {
        self.accounts.insert(name.into(), key);
        self
    }

    pub fn with_account_data(mut self, name: impl Into<String>, data: IdlValue) -> Self {
        self.account_data.insert(name.into(), data);
        self
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: IdlValue) -> Self {
        self.args.insert(name.into(), value);
        self
    }

    /// Take every field of a struct value as an argument.
    pub fn with_args(mut self, args: &IdlValue) -> Self {
        if let IdlValue::Struct(fields) = args {
            self.args.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        self
    }

    fn arg(&self, path: &str) -> Result<&IdlValue, PdaError> {
        let mut parts = path.split('.');
        let root = parts.next().unwrap_or_default();
        let value = self.args.get(root).ok_or_else(|| missing(path))?;
        walk(value, parts, path)
    }

    fn account(&self, path: &str) -> Result<PdaSeed, PdaError> {
        match path.split_once('.') {
            None => self
                .accounts
                .get(path)
                .map(|key| PdaSeed::Pubkey(*key))
                .ok_or_else(|| missing(path)),
            Some((root, rest)) => {
                let data = self.account_data.get(root).ok_or_else(|| missing(path))?;
                let value = walk(data, rest.split('.'), path)?;
                seed_from_value(value, None)
            }
        }
    }
}

fn missing(path: &str) -> PdaError {
    PdaError::MissingSeedInput {
        path: path.to_string(),
    }
}

fn walk<'a, 'p>(
    mut value: &'a IdlValue,
    parts: impl Iterator<Item = &'p str>,
    path: &str,
) -> Result<&'a IdlValue, PdaError> {
    for part in parts {
        value = value.get(part).ok_or_else(|| missing(path))?;
    }
    Ok(value)
}

/// Turn an IDL seed list into concrete seeds.
pub fn seeds_from_idl(pda: &IdlPda, ctx: &SeedContext) -> Result<Vec<PdaSeed>, PdaError> {
    pda.seeds.iter().map(|seed| seed_from_idl(seed, ctx)).collect()
}

/// The program a PDA is derived under: the IDL's `program` seed when
/// present, otherwise `default`.
pub fn program_from_idl(pda: &IdlPda, ctx: &SeedContext, default: &Pubkey) -> Result<Pubkey, PdaError> {
    let Some(program) = &pda.program else {
        return Ok(*default);
    };
    let bytes = seed_from_idl(program, ctx)?.to_bytes()?;
    Pubkey::try_from_slice(&bytes).map_err(|_| {
        PdaError::UnsupportedSeed(format!("program seed is {} bytes, expected 32", bytes.len()))
    })
}

pub fn seed_from_idl(seed: &IdlSeed, ctx: &SeedContext) -> Result<PdaSeed, PdaError> {
    match seed {
        IdlSeed::Const { ty, value } => const_seed(value, ty.as_ref()),
        IdlSeed::Arg { path, ty } => seed_from_value(ctx.arg(path)?, ty.as_ref()),
        IdlSeed::Account { path, .. } => ctx.account(path),
    }
}

fn const_seed(value: &IdlSeedValue, ty: Option<&IdlType>) -> Result<PdaSeed, PdaError> {
    match (value, ty) {
        (IdlSeedValue::Bytes(bytes), _) => Ok(PdaSeed::Bytes(bytes.clone())),
        (IdlSeedValue::Str(s), Some(IdlType::Pubkey)) => s
            .parse()
            .map(PdaSeed::Pubkey)
            .map_err(|e| PdaError::UnsupportedSeed(format!("const pubkey `{s}`: {e}"))),
        (IdlSeedValue::Str(s), _) => Ok(PdaSeed::Str(s.clone())),
        (IdlSeedValue::Number(n), ty) => {
            let width = ty.and_then(int_width).unwrap_or(DEFAULT_INT_WIDTH);
            Ok(PdaSeed::Number { value: *n, width })
        }
    }
}

fn int_width(ty: &IdlType) -> Option<usize> {
    match ty {
        IdlType::U8 | IdlType::I8 => Some(1),
        IdlType::U16 | IdlType::I16 => Some(2),
        IdlType::U32 | IdlType::I32 => Some(4),
        IdlType::U64 | IdlType::I64 => Some(8),
        IdlType::U128 | IdlType::I128 => Some(16),
        _ => None,
    }
}

fn is_signed(ty: &IdlType) -> bool {
    matches!(ty, IdlType::I8 | IdlType::I16 | IdlType::I32 | IdlType::I64 | IdlType::I128)
}

/// Convert a value into a seed using the primitive encoding of
/// instruction arguments. `ty`, when known, fixes integer widths.
pub fn seed_from_value(value: &IdlValue, ty: Option<&IdlType>) -> Result<PdaSeed, PdaError> {
    if let Some(ty) = ty {
        if let Some(width) = int_width(ty) {
            return int_seed(value, width, is_signed(ty));
        }
    }
    match value {
        IdlValue::String(s) => Ok(PdaSeed::Str(s.clone())),
        IdlValue::Bytes(b) => Ok(PdaSeed::Bytes(b.clone())),
        IdlValue::Pubkey(key) => Ok(PdaSeed::Pubkey(*key)),
        IdlValue::Bool(b) => Ok(PdaSeed::Bool(*b)),
        IdlValue::U8(_) | IdlValue::I8(_) => int_seed(value, 1, matches!(value, IdlValue::I8(_))),
        IdlValue::U16(_) | IdlValue::I16(_) => int_seed(value, 2, matches!(value, IdlValue::I16(_))),
        IdlValue::U32(_) | IdlValue::I32(_) => int_seed(value, 4, matches!(value, IdlValue::I32(_))),
        IdlValue::U64(_) | IdlValue::I64(_) => int_seed(value, 8, matches!(value, IdlValue::I64(_))),
        IdlValue::U128(_) | IdlValue::I128(_) => int_seed(value, 16, matches!(value, IdlValue::I128(_))),
        IdlValue::Vec(items) | IdlValue::Array(items) => items
            .iter()
            .map(|item| match item {
                IdlValue::U8(b) => Ok(*b),
                other => Err(PdaError::UnsupportedSeed(format!("{} element in byte seed", other.kind()))),
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(PdaSeed::Bytes),
        other => Err(PdaError::UnsupportedSeed(format!("{} value", other.kind()))),
    }
}

fn int_seed(value: &IdlValue, width: usize, signed: bool) -> Result<PdaSeed, PdaError> {
    if signed {
        let v = value
            .as_i128()
            .ok_or_else(|| PdaError::UnsupportedSeed(format!("{} value for an integer seed", value.kind())))?;
        let bits = width * 8;
        let fits = bits >= 128 || (v >= -(1i128 << (bits - 1)) && v < (1i128 << (bits - 1)));
        if !fits {
            return Err(PdaError::SeedOverflow {
                value: v.to_string(),
                width,
            });
        }
        return Ok(PdaSeed::Bytes(v.to_le_bytes()[..width].to_vec()));
    }
    let v = value.as_u128().ok_or_else(|| PdaError::SeedOverflow {
        value: value.to_string(),
        width,
    })?;
    match u64::try_from(v) {
        Ok(v) => Ok(PdaSeed::Number { value: v, width }),
        Err(_) => Ok(PdaSeed::BigInt { value: v, width }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_le_at_width_pads_and_checks_overflow() {
        assert_eq!(le_at_width(1, 2).unwrap(), vec![1, 0]);
        assert_eq!(le_at_width(u128::MAX, 16).unwrap(), vec![0xff; 16]);
        assert_eq!(le_at_width(7, 20).unwrap().len(), 20);
        assert!(matches!(le_at_width(256, 1), Err(PdaError::SeedOverflow { .. })));
        assert_eq!(le_at_width(1, 0), Err(PdaError::InvalidWidth { width: 0 }));
    }

    #[test]
    fn test_signed_seed_is_twos_complement() {
        let seed = seed_from_value(&IdlValue::I16(-2), None).unwrap();
        assert_eq!(seed.to_bytes().unwrap(), vec![0xfe, 0xff]);
        assert!(int_seed(&IdlValue::I64(200), 1, true).is_err());
    }

    #[test]
    fn test_arg_path_walks_struct_fields() {
        let ctx = SeedContext::new().with_arg(
            "params",
            IdlValue::structure([("owner", IdlValue::Pubkey(Pubkey::new_from_array([3; 32])))]),
        );
        let seed = seed_from_idl(
            &IdlSeed::Arg {
                path: "params.owner".into(),
                ty: None,
            },
            &ctx,
        )
        .unwrap();
        assert_eq!(seed, PdaSeed::Pubkey(Pubkey::new_from_array([3; 32])));
    }
}
