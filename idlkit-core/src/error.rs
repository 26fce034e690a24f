//! Structured error types for schema construction, encoding, decoding
//! and address derivation.
//!
//! Errors are layered: [`SchemaError`] is raised once, while building a
//! coder; [`CodecError`] describes a structural failure inside the Borsh
//! codec; [`PdaError`] covers seed validation and the bump search;
//! [`CoderError`] is what the per-call coder API returns and wraps the
//! other three.

use thiserror::Error;

use crate::idl::EntryKind;
use crate::pubkey::Pubkey;

/// Result type alias for coder operations.
pub type CoderResult<T> = Result<T, CoderError>;

/// Raised while turning a parsed IDL into registries and coders.
///
/// Every variant is fatal to building the coder: an IDL that fails here
/// never produces a half-working coder.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A `defined` reference names a type missing from the type table
    #[error("Type `{name}` referenced by `{referenced_by}` is not defined in the IDL")]
    UnresolvedType { name: String, referenced_by: String },

    /// A type contains itself with no option/vec in between, so it has no finite size
    #[error("Type `{name}` contains itself without indirection")]
    RecursiveType { name: String },

    /// Explicit discriminator of the wrong length
    #[error("{kind} `{name}` has a {len}-byte discriminator, expected 8")]
    InvalidDiscriminator {
        kind: EntryKind,
        name: String,
        len: usize,
    },

    /// Two entries of the same kind share a name
    #[error("Duplicate {kind} name `{name}`")]
    DuplicateName { kind: EntryKind, name: String },

    /// Account or event with neither an inline layout nor a `types` entry
    #[error("{kind} `{name}` has no inline type and no matching entry in `types`")]
    MissingTypeDefinition { kind: EntryKind, name: String },

    /// Encoded size does not fit in `usize`
    #[error("Type `{name}` is too large to encode")]
    TypeTooLarge { name: String },

    /// Events must be structs
    #[error("{kind} `{name}` must be a struct")]
    NotAStruct { kind: EntryKind, name: String },

    #[error("Invalid IDL JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read IDL: {0}")]
    Io(#[from] std::io::Error),
}

/// Structural failure inside the Borsh codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unexpected end of data at offset {offset}: need {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("Invalid bool byte {byte} at offset {offset}")]
    InvalidBool { byte: u8, offset: usize },

    #[error("Invalid option tag {tag} at offset {offset}")]
    InvalidOptionTag { tag: u8, offset: usize },

    #[error("Variant index {index} out of range for enum `{type_name}`")]
    InvalidVariantIndex { index: u8, type_name: String },

    #[error("Enum `{type_name}` has no variant `{variant}`")]
    UnknownVariant { variant: String, type_name: String },

    #[error("Invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Value {value} does not fit in {ty}")]
    IntegerOverflow { value: String, ty: &'static str },

    #[error("Length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Length {len} exceeds the u32 length prefix")]
    LengthOverflow { len: usize },

    #[error("Nesting deeper than {limit} definitions at offset {offset}")]
    DepthLimitExceeded { limit: usize, offset: usize },

    /// Counts of zero-sized elements cost no input, so they are refused
    #[error("Collection of {len} zero-sized `{type_name}` elements")]
    ZeroSizedElements { len: usize, type_name: String },

    #[error("Missing field `{field}`")]
    MissingField { field: String },

    #[error("Invalid JSON for {expected}: {message}")]
    InvalidJson { expected: String, message: String },

    #[error("Borsh error: {0}")]
    Borsh(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Borsh(err.to_string())
    }
}

/// Malformed hex text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexError {
    #[error("odd length {0}")]
    OddLength(usize),

    #[error("invalid hex digit at position {position}")]
    InvalidDigit { position: usize },
}

/// Seed validation and bump-search failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PdaError {
    #[error("Too many seeds: {count}, max {max}")]
    TooManySeeds { count: usize, max: usize },

    #[error("Seed {index} is {len} bytes, max {max}")]
    SeedTooLong { index: usize, len: usize, max: usize },

    #[error("Invalid seed width {width}: must be between 1 and 32")]
    InvalidWidth { width: usize },

    #[error("Value {value} does not fit in {width} bytes")]
    SeedOverflow { value: String, width: usize },

    #[error("Unable to find a viable program address bump seed")]
    NoViableBump,

    #[error("Unsupported seed: {0}")]
    UnsupportedSeed(String),

    #[error("PDA seed references `{path}` which was not provided")]
    MissingSeedInput { path: String },
}

/// Errors returned by the account, instruction, event and type coders.
#[derive(Error, Debug)]
pub enum CoderError {
    /// Name absent from the schema
    #[error("Unknown {kind} `{name}`")]
    UnknownName { kind: EntryKind, name: String },

    /// The data does not start with the expected discriminator, or is
    /// too short to hold one
    #[error(
        "Discriminator mismatch for {kind} `{name}`{}: expected {expected:?}, got {actual:?}",
        account_suffix(.account)
    )]
    DiscriminatorMismatch {
        kind: EntryKind,
        name: String,
        expected: [u8; 8],
        actual: Vec<u8>,
        account: Option<Pubkey>,
    },

    /// `decode_any` tried every entry and none matched
    #[error("No {kind} matches discriminator {actual:?}")]
    NoMatchingDiscriminator { kind: EntryKind, actual: Vec<u8> },

    /// Discriminator matched but the body failed to decode
    #[error("Failed to deserialize {len} bytes as `{type_name}`: {source}")]
    DidNotDeserialize {
        type_name: String,
        len: usize,
        #[source]
        source: CodecError,
    },

    /// The value does not fit the declared layout
    #[error("Failed to encode `{name}`: {source}")]
    Encode {
        name: String,
        #[source]
        source: CodecError,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Pda(#[from] PdaError),
}

fn account_suffix(account: &Option<Pubkey>) -> String {
    match account {
        Some(key) => format!(" (account {key})"),
        None => String::new(),
    }
}

impl CoderError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        CoderError::InvalidArgument(message.into())
    }

    /// Get a numeric error code for client-side handling.
    pub fn error_code(&self) -> u32 {
        match self {
            CoderError::UnknownName { .. } => 1000,
            CoderError::DiscriminatorMismatch { .. } => 1001,
            CoderError::NoMatchingDiscriminator { .. } => 1002,
            CoderError::DidNotDeserialize { .. } => 1003,
            CoderError::Encode { .. } => 1004,
            CoderError::InvalidArgument(_) => 1005,
            CoderError::Schema(_) => 1006,
            CoderError::Pda(PdaError::NoViableBump) => 1008,
            CoderError::Pda(_) => 1007,
        }
    }

    /// True when the data is simply not of the requested type, as
    /// opposed to being corrupt or the request being malformed.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(
            self,
            CoderError::DiscriminatorMismatch { .. } | CoderError::NoMatchingDiscriminator { .. }
        )
    }
}
