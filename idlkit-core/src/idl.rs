//! IDL (Interface Definition Language) types.
//!
//! A program's IDL JSON describes its instructions, account layouts,
//! events, named types and error codes. This module is the serde model
//! of that document; it accepts both the current layout (explicit
//! discriminators, account/event bodies in `types`) and the legacy one
//! (`isMut`/`isSigner`, inline account types, inline event fields).

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Top-level IDL for a program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Idl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<IdlMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub instructions: Vec<IdlInstruction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accounts: Vec<IdlAccount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<IdlEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<IdlTypeDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<IdlErrorCode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constants: Vec<IdlConst>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdlMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// An instruction in the IDL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlInstruction {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,
    #[serde(default)]
    pub accounts: Vec<IdlInstructionAccountItem>,
    #[serde(default)]
    pub args: Vec<IdlField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<IdlType>,
}

/// An instruction account, or a named group of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlInstructionAccountItem {
    Composite(IdlInstructionAccounts),
    Single(IdlAccountItem),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlInstructionAccounts {
    pub name: String,
    pub accounts: Vec<IdlInstructionAccountItem>,
}

/// An account expected by an instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlAccountItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    #[serde(default, alias = "isMut")]
    pub writable: bool,
    #[serde(default, alias = "isSigner")]
    pub signer: bool,
    #[serde(default, alias = "isOptional", skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pda: Option<IdlPda>,
}

fn is_false(v: &bool) -> bool {
    !v
}

/// Seeds (and optional program) an account address is derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlPda {
    pub seeds: Vec<IdlSeed>,
    #[serde(default, alias = "programId", skip_serializing_if = "Option::is_none")]
    pub program: Option<IdlSeed>,
}

/// A seed component for PDA derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum IdlSeed {
    #[serde(rename = "const")]
    Const {
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        ty: Option<IdlType>,
        value: IdlSeedValue,
    },
    #[serde(rename = "arg")]
    Arg {
        path: String,
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        ty: Option<IdlType>,
    },
    #[serde(rename = "account")]
    Account {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        account: Option<String>,
        #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
        ty: Option<IdlType>,
    },
}

/// The literal of a `const` seed: raw bytes in current IDLs, a string or
/// number in legacy ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlSeedValue {
    Bytes(Vec<u8>),
    Str(String),
    Number(u64),
}

/// A named, typed field of a struct, event or instruction argument list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    #[serde(rename = "type")]
    pub ty: IdlType,
}

impl IdlField {
    pub fn new(name: impl Into<String>, ty: IdlType) -> Self {
        Self {
            name: name.into(),
            docs: vec![],
            ty,
        }
    }
}

/// Account entry. `ty` is present in legacy IDLs; current IDLs keep the
/// body in `types` under the same name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlAccount {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<IdlTypeDefTy>,
}

/// Event entry. `fields` is present in legacy IDLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlEvent {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<IdlField>>,
}

/// A named type definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlTypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docs: Vec<String>,
    #[serde(rename = "type")]
    pub ty: IdlTypeDefTy,
}

/// Body of a type definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IdlTypeDefTy {
    Struct {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<IdlDefinedFields>,
    },
    Enum {
        variants: Vec<IdlEnumVariant>,
    },
    /// `{"kind": "type", "alias": ...}`
    Type {
        alias: IdlType,
    },
}

/// Struct or variant payload: named fields or a tuple of types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdlDefinedFields {
    Named(Vec<IdlField>),
    Tuple(Vec<IdlType>),
}

/// An enum variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdlEnumVariant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<IdlDefinedFields>,
}

/// Error definition in the IDL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlErrorCode {
    pub code: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdlConst {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: IdlType,
    pub value: String,
}

// ─── IdlType ─────────────────────────────────────────────────────

/// Type representation in the IDL.
///
/// A closed set: every kind the codec understands has its own variant, so
/// matching on it is exhaustive. JSON primitives are plain strings
/// (`"u64"`, `"pubkey"`); compound types are single-key objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawIdlType", into = "RawIdlType")]
pub enum IdlType {
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    U128,
    I128,
    F32,
    F64,
    String,
    Bytes,
    Pubkey,
    Vec(Box<IdlType>),
    Option(Box<IdlType>),
    Array(Box<IdlType>, usize),
    Defined(String),
}

impl IdlType {
    pub fn vec(inner: IdlType) -> Self {
        IdlType::Vec(Box::new(inner))
    }

    pub fn option(inner: IdlType) -> Self {
        IdlType::Option(Box::new(inner))
    }

    pub fn array(inner: IdlType, len: usize) -> Self {
        IdlType::Array(Box::new(inner), len)
    }

    pub fn defined(name: impl Into<String>) -> Self {
        IdlType::Defined(name.into())
    }

    /// Parse a primitive type name. `publicKey` is the legacy spelling of
    /// `pubkey`.
    pub fn primitive(name: &str) -> Option<Self> {
        let ty = match name {
            "bool" => IdlType::Bool,
            "u8" => IdlType::U8,
            "i8" => IdlType::I8,
            "u16" => IdlType::U16,
            "i16" => IdlType::I16,
            "u32" => IdlType::U32,
            "i32" => IdlType::I32,
            "u64" => IdlType::U64,
            "i64" => IdlType::I64,
            "u128" => IdlType::U128,
            "i128" => IdlType::I128,
            "f32" => IdlType::F32,
            "f64" => IdlType::F64,
            "string" => IdlType::String,
            "bytes" => IdlType::Bytes,
            "pubkey" | "publicKey" => IdlType::Pubkey,
            _ => return None,
        };
        Some(ty)
    }

    /// The IDL spelling of a primitive, `None` for compound types.
    pub fn primitive_name(&self) -> Option<&'static str> {
        let name = match self {
            IdlType::Bool => "bool",
            IdlType::U8 => "u8",
            IdlType::I8 => "i8",
            IdlType::U16 => "u16",
            IdlType::I16 => "i16",
            IdlType::U32 => "u32",
            IdlType::I32 => "i32",
            IdlType::U64 => "u64",
            IdlType::I64 => "i64",
            IdlType::U128 => "u128",
            IdlType::I128 => "i128",
            IdlType::F32 => "f32",
            IdlType::F64 => "f64",
            IdlType::String => "string",
            IdlType::Bytes => "bytes",
            IdlType::Pubkey => "pubkey",
            IdlType::Vec(_) | IdlType::Option(_) | IdlType::Array(..) | IdlType::Defined(_) => {
                return None
            }
        };
        Some(name)
    }
}

impl fmt::Display for IdlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdlType::Vec(inner) => write!(f, "Vec<{inner}>"),
            IdlType::Option(inner) => write!(f, "Option<{inner}>"),
            IdlType::Array(inner, len) => write!(f, "[{inner}; {len}]"),
            IdlType::Defined(name) => f.write_str(name),
            primitive => f.write_str(primitive.primitive_name().unwrap_or("?")),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawIdlType {
    Primitive(String),
    Vec { vec: Box<IdlType> },
    Option { option: Box<IdlType> },
    Array { array: (Box<IdlType>, usize) },
    Defined { defined: RawDefined },
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawDefined {
    Name(String),
    Ref { name: String },
}

impl TryFrom<RawIdlType> for IdlType {
    type Error = String;

    fn try_from(raw: RawIdlType) -> Result<Self, Self::Error> {
        Ok(match raw {
            RawIdlType::Primitive(name) => {
                IdlType::primitive(&name).ok_or_else(|| format!("unknown primitive type `{name}`"))?
            }
            RawIdlType::Vec { vec } => IdlType::Vec(vec),
            RawIdlType::Option { option } => IdlType::Option(option),
            RawIdlType::Array { array: (inner, len) } => IdlType::Array(inner, len),
            RawIdlType::Defined {
                defined: RawDefined::Name(name) | RawDefined::Ref { name },
            } => IdlType::Defined(name),
        })
    }
}

impl From<IdlType> for RawIdlType {
    fn from(ty: IdlType) -> Self {
        match ty {
            IdlType::Vec(vec) => RawIdlType::Vec { vec },
            IdlType::Option(option) => RawIdlType::Option { option },
            IdlType::Array(inner, len) => RawIdlType::Array {
                array: (inner, len),
            },
            IdlType::Defined(name) => RawIdlType::Defined {
                defined: RawDefined::Name(name),
            },
            primitive => RawIdlType::Primitive(primitive.primitive_name().unwrap_or_default().to_string()),
        }
    }
}

// ─── Entry kinds ─────────────────────────────────────────────────

/// The schema category an entry belongs to. Used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Account,
    Instruction,
    Event,
    Type,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntryKind::Account => "account",
            EntryKind::Instruction => "instruction",
            EntryKind::Event => "event",
            EntryKind::Type => "type",
        })
    }
}

// ─── Loading ─────────────────────────────────────────────────────

impl Idl {
    /// Parse an IDL from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, SchemaError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Read and parse an IDL JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes)
    }

    /// Serialize the IDL to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Program name from `metadata.name`, falling back to the legacy
    /// top-level `name`.
    pub fn program_name(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .or(self.name.as_deref())
    }

    /// Program address from `address`, `metadata.address` in that order.
    pub fn program_address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .or_else(|| self.metadata.as_ref().and_then(|m| m.address.as_deref()))
    }

    pub fn instruction(&self, name: &str) -> Option<&IdlInstruction> {
        self.instructions.iter().find(|ix| ix.name == name)
    }

    pub fn type_def(&self, name: &str) -> Option<&IdlTypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Look up a program error by its numeric code.
    pub fn error_by_code(&self, code: u32) -> Option<&IdlErrorCode> {
        self.errors.iter().find(|e| e.code == code)
    }
}

impl IdlInstruction {
    /// Flatten composite account groups into the ordered list of leaf
    /// accounts, as they appear in the instruction's account metas.
    pub fn flat_accounts(&self) -> Vec<&IdlAccountItem> {
        fn walk<'a>(items: &'a [IdlInstructionAccountItem], out: &mut Vec<&'a IdlAccountItem>) {
            for item in items {
                match item {
                    IdlInstructionAccountItem::Single(acc) => out.push(acc),
                    IdlInstructionAccountItem::Composite(group) => walk(&group.accounts, out),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.accounts, &mut out);
        out
    }
}
