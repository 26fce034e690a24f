//! Dynamic values flowing through the codec.
//!
//! [`IdlValue`] is what the coders encode from and decode into. It is
//! self-describing, so it can be built by hand, converted from JSON
//! against a [`Layout`], or printed back out as JSON.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD as Base64Engine;
use base64::Engine;
use serde_json::{Map, Number, Value};

use crate::error::CodecError;
use crate::hex;
use crate::layout::{Fields, Layout, TypeDefLayout, TypeRegistry};
use crate::pubkey::Pubkey;

/// A decoded (or to-be-encoded) value.
#[derive(Debug, Clone, PartialEq)]
pub enum IdlValue {
    Bool(bool),
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    U64(u64),
    I64(i64),
    U128(u128),
    I128(i128),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    Pubkey(Pubkey),
    Vec(Vec<IdlValue>),
    Array(Vec<IdlValue>),
    Option(Option<Box<IdlValue>>),
    /// Named fields. Encoding order comes from the layout, not the map.
    Struct(BTreeMap<String, IdlValue>),
    Tuple(Vec<IdlValue>),
    /// `fields` is `None` for unit variants, otherwise a `Struct` or `Tuple`.
    Enum {
        variant: String,
        fields: Option<Box<IdlValue>>,
    },
}

impl IdlValue {
    /// Build a struct value from `(name, value)` pairs.
    pub fn structure<K: Into<String>>(fields: impl IntoIterator<Item = (K, IdlValue)>) -> Self {
        IdlValue::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn unit_variant(name: impl Into<String>) -> Self {
        IdlValue::Enum {
            variant: name.into(),
            fields: None,
        }
    }

    pub fn variant(name: impl Into<String>, fields: IdlValue) -> Self {
        IdlValue::Enum {
            variant: name.into(),
            fields: Some(Box::new(fields)),
        }
    }

    pub fn some(inner: IdlValue) -> Self {
        IdlValue::Option(Some(Box::new(inner)))
    }

    pub fn none() -> Self {
        IdlValue::Option(None)
    }

    /// Field of a struct value.
    pub fn get(&self, field: &str) -> Option<&IdlValue> {
        match self {
            IdlValue::Struct(fields) => fields.get(field),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            IdlValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            IdlValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pubkey(&self) -> Option<Pubkey> {
        match self {
            IdlValue::Pubkey(key) => Some(*key),
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            IdlValue::U8(_)
                | IdlValue::I8(_)
                | IdlValue::U16(_)
                | IdlValue::I16(_)
                | IdlValue::U32(_)
                | IdlValue::I32(_)
                | IdlValue::U64(_)
                | IdlValue::I64(_)
                | IdlValue::U128(_)
                | IdlValue::I128(_)
        )
    }

    /// Integer value as `u128`, `None` for negatives and non-integers.
    pub fn as_u128(&self) -> Option<u128> {
        match *self {
            IdlValue::U8(v) => Some(v.into()),
            IdlValue::U16(v) => Some(v.into()),
            IdlValue::U32(v) => Some(v.into()),
            IdlValue::U64(v) => Some(v.into()),
            IdlValue::U128(v) => Some(v),
            IdlValue::I8(v) => u128::try_from(v).ok(),
            IdlValue::I16(v) => u128::try_from(v).ok(),
            IdlValue::I32(v) => u128::try_from(v).ok(),
            IdlValue::I64(v) => u128::try_from(v).ok(),
            IdlValue::I128(v) => u128::try_from(v).ok(),
            _ => None,
        }
    }

    /// Integer value as `i128`, `None` above `i128::MAX` and for non-integers.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            IdlValue::I8(v) => Some(v.into()),
            IdlValue::I16(v) => Some(v.into()),
            IdlValue::I32(v) => Some(v.into()),
            IdlValue::I64(v) => Some(v.into()),
            IdlValue::I128(v) => Some(v),
            IdlValue::U8(v) => Some(v.into()),
            IdlValue::U16(v) => Some(v.into()),
            IdlValue::U32(v) => Some(v.into()),
            IdlValue::U64(v) => Some(v.into()),
            IdlValue::U128(v) => i128::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_u128().and_then(|v| u64::try_from(v).ok())
    }

    /// Short name of the value's kind, for mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            IdlValue::Bool(_) => "bool",
            IdlValue::U8(_) => "u8",
            IdlValue::I8(_) => "i8",
            IdlValue::U16(_) => "u16",
            IdlValue::I16(_) => "i16",
            IdlValue::U32(_) => "u32",
            IdlValue::I32(_) => "i32",
            IdlValue::U64(_) => "u64",
            IdlValue::I64(_) => "i64",
            IdlValue::U128(_) => "u128",
            IdlValue::I128(_) => "i128",
            IdlValue::F32(_) => "f32",
            IdlValue::F64(_) => "f64",
            IdlValue::String(_) => "string",
            IdlValue::Bytes(_) => "bytes",
            IdlValue::Pubkey(_) => "pubkey",
            IdlValue::Vec(_) => "vec",
            IdlValue::Array(_) => "array",
            IdlValue::Option(_) => "option",
            IdlValue::Struct(_) => "struct",
            IdlValue::Tuple(_) => "tuple",
            IdlValue::Enum { .. } => "enum",
        }
    }
}

impl fmt::Display for IdlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdlValue::Bool(v) => write!(f, "{v}"),
            IdlValue::U8(v) => write!(f, "{v}"),
            IdlValue::I8(v) => write!(f, "{v}"),
            IdlValue::U16(v) => write!(f, "{v}"),
            IdlValue::I16(v) => write!(f, "{v}"),
            IdlValue::U32(v) => write!(f, "{v}"),
            IdlValue::I32(v) => write!(f, "{v}"),
            IdlValue::U64(v) => write!(f, "{v}"),
            IdlValue::I64(v) => write!(f, "{v}"),
            IdlValue::U128(v) => write!(f, "{v}"),
            IdlValue::I128(v) => write!(f, "{v}"),
            IdlValue::F32(v) => write!(f, "{v}"),
            IdlValue::F64(v) => write!(f, "{v}"),
            IdlValue::String(s) => write!(f, "\"{s}\""),
            IdlValue::Bytes(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            IdlValue::Pubkey(key) => write!(f, "{key}"),
            IdlValue::Vec(items) | IdlValue::Array(items) | IdlValue::Tuple(items) => {
                let open = if matches!(self, IdlValue::Tuple(_)) { "(" } else { "[" };
                let close = if matches!(self, IdlValue::Tuple(_)) { ")" } else { "]" };
                f.write_str(open)?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(close)
            }
            IdlValue::Option(None) => f.write_str("None"),
            IdlValue::Option(Some(inner)) => write!(f, "Some({inner})"),
            IdlValue::Struct(fields) => {
                f.write_str("{ ")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str(" }")
            }
            IdlValue::Enum { variant, fields: None } => f.write_str(variant),
            IdlValue::Enum {
                variant,
                fields: Some(fields),
            } => write!(f, "{variant}{fields}"),
        }
    }
}

// ─── JSON bridge ─────────────────────────────────────────────────

impl IdlValue {
    /// Render as JSON. 128-bit integers become decimal strings so no
    /// JSON consumer silently loses precision; pubkeys are base58.
    pub fn to_json(&self) -> Value {
        match self {
            IdlValue::Bool(v) => Value::Bool(*v),
            IdlValue::U8(v) => Value::from(*v),
            IdlValue::I8(v) => Value::from(*v),
            IdlValue::U16(v) => Value::from(*v),
            IdlValue::I16(v) => Value::from(*v),
            IdlValue::U32(v) => Value::from(*v),
            IdlValue::I32(v) => Value::from(*v),
            IdlValue::U64(v) => Value::from(*v),
            IdlValue::I64(v) => Value::from(*v),
            IdlValue::U128(v) => Value::String(v.to_string()),
            IdlValue::I128(v) => Value::String(v.to_string()),
            IdlValue::F32(v) => Number::from_f64(f64::from(*v)).map_or(Value::Null, Value::Number),
            IdlValue::F64(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
            IdlValue::String(s) => Value::String(s.clone()),
            IdlValue::Bytes(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
            IdlValue::Pubkey(key) => Value::String(key.to_string()),
            IdlValue::Vec(items) | IdlValue::Array(items) | IdlValue::Tuple(items) => {
                Value::Array(items.iter().map(IdlValue::to_json).collect())
            }
            IdlValue::Option(None) => Value::Null,
            IdlValue::Option(Some(inner)) => inner.to_json(),
            IdlValue::Struct(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            IdlValue::Enum { variant, fields: None } => Value::String(variant.clone()),
            IdlValue::Enum {
                variant,
                fields: Some(fields),
            } => {
                let mut map = Map::new();
                map.insert(variant.clone(), fields.to_json());
                Value::Object(map)
            }
        }
    }
}

/// Convert JSON into a value shaped by `layout`.
///
/// Integers are accepted as JSON numbers or decimal strings. Bytes (and
/// `u8` vectors/arrays) accept an array of numbers, `0x`-prefixed hex or
/// base64. Missing `Option` fields of a struct read as `None`. Enums are
/// `"Variant"` or `{"Variant": payload}`; variant names match
/// case-insensitively when no exact match exists.
pub fn from_json(json: &Value, layout: &Layout, registry: &TypeRegistry) -> Result<IdlValue, CodecError> {
    JsonReader { registry }.value(json, layout)
}

/// Convert a JSON object into a struct value for a field list, e.g. an
/// instruction's arguments.
pub fn fields_from_json(json: &Value, fields: &Fields, registry: &TypeRegistry) -> Result<IdlValue, CodecError> {
    JsonReader { registry }.fields(json, fields, "struct")
}

struct JsonReader<'a> {
    registry: &'a TypeRegistry,
}

impl JsonReader<'_> {
    fn value(&self, json: &Value, layout: &Layout) -> Result<IdlValue, CodecError> {
        match layout {
            Layout::Bool => json
                .as_bool()
                .map(IdlValue::Bool)
                .ok_or_else(|| self.invalid(layout, json)),
            Layout::U8 => self.unsigned(json, layout).and_then(|v| int(v, "u8").map(IdlValue::U8)),
            Layout::U16 => self.unsigned(json, layout).and_then(|v| int(v, "u16").map(IdlValue::U16)),
            Layout::U32 => self.unsigned(json, layout).and_then(|v| int(v, "u32").map(IdlValue::U32)),
            Layout::U64 => self.unsigned(json, layout).and_then(|v| int(v, "u64").map(IdlValue::U64)),
            Layout::U128 => self.unsigned(json, layout).map(IdlValue::U128),
            Layout::I8 => self.signed(json, layout).and_then(|v| int(v, "i8").map(IdlValue::I8)),
            Layout::I16 => self.signed(json, layout).and_then(|v| int(v, "i16").map(IdlValue::I16)),
            Layout::I32 => self.signed(json, layout).and_then(|v| int(v, "i32").map(IdlValue::I32)),
            Layout::I64 => self.signed(json, layout).and_then(|v| int(v, "i64").map(IdlValue::I64)),
            Layout::I128 => self.signed(json, layout).map(IdlValue::I128),
            Layout::F32 => self.float(json, layout).map(|v| IdlValue::F32(v as f32)),
            Layout::F64 => self.float(json, layout).map(IdlValue::F64),
            Layout::String => json
                .as_str()
                .map(|s| IdlValue::String(s.to_string()))
                .ok_or_else(|| self.invalid(layout, json)),
            Layout::Bytes => self.bytes(json, layout).map(IdlValue::Bytes),
            Layout::Pubkey => {
                let text = json.as_str().ok_or_else(|| self.invalid(layout, json))?;
                text.parse().map(IdlValue::Pubkey).map_err(|e| CodecError::InvalidJson {
                    expected: "pubkey".into(),
                    message: format!("{e}"),
                })
            }
            Layout::Vec(inner) => {
                if **inner == Layout::U8 && json.is_string() {
                    return self.bytes(json, layout).map(IdlValue::Bytes);
                }
                let items = json.as_array().ok_or_else(|| self.invalid(layout, json))?;
                items
                    .iter()
                    .map(|item| self.value(item, inner))
                    .collect::<Result<_, _>>()
                    .map(IdlValue::Vec)
            }
            Layout::Array(inner, len) => {
                if **inner == Layout::U8 && json.is_string() {
                    let bytes = self.bytes(json, layout)?;
                    if bytes.len() != *len {
                        return Err(CodecError::LengthMismatch {
                            expected: *len,
                            actual: bytes.len(),
                        });
                    }
                    return Ok(IdlValue::Bytes(bytes));
                }
                let items = json.as_array().ok_or_else(|| self.invalid(layout, json))?;
                if items.len() != *len {
                    return Err(CodecError::LengthMismatch {
                        expected: *len,
                        actual: items.len(),
                    });
                }
                items
                    .iter()
                    .map(|item| self.value(item, inner))
                    .collect::<Result<_, _>>()
                    .map(IdlValue::Array)
            }
            Layout::Option(inner) => match json {
                Value::Null => Ok(IdlValue::none()),
                other => self.value(other, inner).map(IdlValue::some),
            },
            Layout::Defined(id) => {
                let ty = self.registry.get(*id);
                match &ty.def {
                    TypeDefLayout::Struct(fields) => self.fields(json, fields, &ty.name),
                    TypeDefLayout::Alias(target) => self.value(json, target),
                    TypeDefLayout::Enum(variants) => {
                        let (name, payload) = match json {
                            Value::String(name) => (name.as_str(), None),
                            Value::Object(map) if map.len() == 1 => {
                                let (name, payload) = map.iter().next().ok_or_else(|| self.invalid(layout, json))?;
                                (name.as_str(), Some(payload))
                            }
                            _ => return Err(self.invalid(layout, json)),
                        };
                        let variant = variants
                            .iter()
                            .find(|v| v.name == name)
                            .or_else(|| variants.iter().find(|v| v.name.eq_ignore_ascii_case(name)))
                            .ok_or_else(|| CodecError::UnknownVariant {
                                variant: name.to_string(),
                                type_name: ty.name.clone(),
                            })?;
                        let fields = match (&variant.fields, payload) {
                            (Fields::Unit, _) => None,
                            (fields, Some(payload)) => Some(Box::new(self.fields(payload, fields, &variant.name)?)),
                            (_, None) => {
                                return Err(CodecError::InvalidJson {
                                    expected: format!("{}::{}", ty.name, variant.name),
                                    message: "variant payload missing".into(),
                                })
                            }
                        };
                        Ok(IdlValue::Enum {
                            variant: variant.name.clone(),
                            fields,
                        })
                    }
                }
            }
        }
    }

    fn fields(&self, json: &Value, fields: &Fields, type_name: &str) -> Result<IdlValue, CodecError> {
        match fields {
            Fields::Unit => Ok(IdlValue::Struct(BTreeMap::new())),
            Fields::Named(named) => {
                let map = json.as_object().ok_or_else(|| CodecError::InvalidJson {
                    expected: type_name.to_string(),
                    message: format!("expected object, got {}", json_kind(json)),
                })?;
                let mut out = BTreeMap::new();
                for field in named {
                    let value = match map.get(&field.name) {
                        Some(v) => self.value(v, &field.layout)?,
                        None if matches!(field.layout, Layout::Option(_)) => IdlValue::none(),
                        None => {
                            return Err(CodecError::MissingField {
                                field: field.name.clone(),
                            })
                        }
                    };
                    out.insert(field.name.clone(), value);
                }
                Ok(IdlValue::Struct(out))
            }
            Fields::Tuple(layouts) => {
                let items = json.as_array().ok_or_else(|| CodecError::InvalidJson {
                    expected: type_name.to_string(),
                    message: format!("expected array, got {}", json_kind(json)),
                })?;
                if items.len() != layouts.len() {
                    return Err(CodecError::LengthMismatch {
                        expected: layouts.len(),
                        actual: items.len(),
                    });
                }
                items
                    .iter()
                    .zip(layouts)
                    .map(|(item, layout)| self.value(item, layout))
                    .collect::<Result<_, _>>()
                    .map(IdlValue::Tuple)
            }
        }
    }

    fn unsigned(&self, json: &Value, layout: &Layout) -> Result<u128, CodecError> {
        match json {
            Value::Number(n) => n.as_u64().map(u128::from),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| self.invalid(layout, json))
    }

    fn signed(&self, json: &Value, layout: &Layout) -> Result<i128, CodecError> {
        match json {
            Value::Number(n) => n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| self.invalid(layout, json))
    }

    fn float(&self, json: &Value, layout: &Layout) -> Result<f64, CodecError> {
        match json {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| self.invalid(layout, json))
    }

    fn bytes(&self, json: &Value, layout: &Layout) -> Result<Vec<u8>, CodecError> {
        match json {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|b| u8::try_from(b).ok())
                        .ok_or_else(|| self.invalid(&Layout::U8, item))
                })
                .collect(),
            Value::String(s) => {
                if hex::strip_prefix(s).len() != s.len() {
                    hex::decode(s).map_err(|e| CodecError::InvalidJson {
                        expected: "hex bytes".into(),
                        message: format!("invalid hex `{s}`: {e}"),
                    })
                } else {
                    Base64Engine.decode(s).map_err(|e| CodecError::InvalidJson {
                        expected: "base64 bytes".into(),
                        message: e.to_string(),
                    })
                }
            }
            _ => Err(self.invalid(layout, json)),
        }
    }

    fn invalid(&self, layout: &Layout, json: &Value) -> CodecError {
        CodecError::InvalidJson {
            expected: self.registry.type_name(layout),
            message: format!("got {}", json_kind(json)),
        }
    }
}

fn int<T: TryFrom<V>, V: fmt::Display + Copy>(v: V, ty: &'static str) -> Result<T, CodecError> {
    T::try_from(v).map_err(|_| CodecError::IntegerOverflow {
        value: v.to_string(),
        ty,
    })
}

fn json_kind(json: &Value) -> &'static str {
    match json {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
