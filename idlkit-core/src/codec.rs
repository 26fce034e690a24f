//! Borsh encoding driven by resolved layouts.
//!
//! Wire rules: little-endian fixed-width integers, floats as IEEE-754
//! little-endian, bool as one byte (0 or 1), strings and bytes as a u32
//! length followed by the raw bytes, vectors as a u32 count followed by
//! the elements, options as a 0/1 tag followed by the value, arrays as
//! exactly N elements with no prefix, structs as their fields in
//! declaration order, enums as a one-byte variant index followed by the
//! variant's fields, pubkeys as 32 raw bytes.

use std::collections::BTreeMap;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::CodecError;
use crate::layout::{Fields, Layout, TypeDefLayout, TypeId, TypeRegistry};
use crate::pubkey::{Pubkey, PUBKEY_BYTES};
use crate::value::IdlValue;

/// Deepest nesting of defined types a decode will follow. Matches
/// borsh's `MAX_RECURSION_DEPTH`.
pub const MAX_DECODE_DEPTH: usize = 128;

/// Upper bound on buffer capacity reserved ahead of the data itself.
const PREALLOC_LIMIT: usize = 4096;

/// Encoder/decoder over a resolved type registry.
#[derive(Debug, Clone, Copy)]
pub struct BorshCodec<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> BorshCodec<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    // ─── Encoding ────────────────────────────────────────────────

    pub fn encode(&self, value: &IdlValue, layout: &Layout) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(self.registry.min_size(layout).min(PREALLOC_LIMIT));
        self.encode_into(value, layout, &mut out)?;
        Ok(out)
    }

    /// Encode a struct value against a bare field list (instruction
    /// arguments, event fields).
    pub fn encode_fields(&self, value: &IdlValue, fields: &Fields) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(self.registry.fields_min_size(fields).min(PREALLOC_LIMIT));
        self.write_fields(value, fields, &mut out)?;
        Ok(out)
    }

    pub fn encode_into(&self, value: &IdlValue, layout: &Layout, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match layout {
            Layout::Bool => {
                let b = value.as_bool().ok_or_else(|| mismatch(self.registry, layout, value))?;
                out.push(u8::from(b));
            }
            Layout::U8 => write_borsh(&narrow::<u8>(self.unsigned(value, layout)?, "u8")?, out)?,
            Layout::U16 => write_borsh(&narrow::<u16>(self.unsigned(value, layout)?, "u16")?, out)?,
            Layout::U32 => write_borsh(&narrow::<u32>(self.unsigned(value, layout)?, "u32")?, out)?,
            Layout::U64 => write_borsh(&narrow::<u64>(self.unsigned(value, layout)?, "u64")?, out)?,
            Layout::U128 => write_borsh(&self.unsigned(value, layout)?, out)?,
            Layout::I8 => write_borsh(&narrow_signed::<i8>(self.signed(value, layout)?, "i8")?, out)?,
            Layout::I16 => write_borsh(&narrow_signed::<i16>(self.signed(value, layout)?, "i16")?, out)?,
            Layout::I32 => write_borsh(&narrow_signed::<i32>(self.signed(value, layout)?, "i32")?, out)?,
            Layout::I64 => write_borsh(&narrow_signed::<i64>(self.signed(value, layout)?, "i64")?, out)?,
            Layout::I128 => write_borsh(&self.signed(value, layout)?, out)?,
            // Written by hand: borsh refuses NaN, the wire format does not.
            Layout::F32 => match value {
                IdlValue::F32(v) => out.extend_from_slice(&v.to_le_bytes()),
                IdlValue::F64(v) => out.extend_from_slice(&(*v as f32).to_le_bytes()),
                other => return Err(mismatch(self.registry, layout, other)),
            },
            Layout::F64 => match value {
                IdlValue::F64(v) => out.extend_from_slice(&v.to_le_bytes()),
                IdlValue::F32(v) => out.extend_from_slice(&f64::from(*v).to_le_bytes()),
                other => return Err(mismatch(self.registry, layout, other)),
            },
            Layout::String => {
                let s = value.as_str().ok_or_else(|| mismatch(self.registry, layout, value))?;
                write_prefixed(s.as_bytes(), out)?;
            }
            Layout::Bytes => match value {
                IdlValue::Bytes(bytes) => write_prefixed(bytes, out)?,
                IdlValue::Vec(items) => {
                    let bytes = self.byte_items(items)?;
                    write_prefixed(&bytes, out)?;
                }
                other => return Err(mismatch(self.registry, layout, other)),
            },
            Layout::Pubkey => match value {
                IdlValue::Pubkey(key) => out.extend_from_slice(key.as_bytes()),
                IdlValue::Bytes(bytes) if bytes.len() == PUBKEY_BYTES => out.extend_from_slice(bytes),
                other => return Err(mismatch(self.registry, layout, other)),
            },
            Layout::Vec(inner) => match value {
                IdlValue::Bytes(bytes) if **inner == Layout::U8 => write_prefixed(bytes, out)?,
                IdlValue::Vec(items) | IdlValue::Array(items) => {
                    self.check_element_size(inner, items.len())?;
                    write_len(items.len(), out)?;
                    for item in items {
                        self.encode_into(item, inner, out)?;
                    }
                }
                other => return Err(mismatch(self.registry, layout, other)),
            },
            Layout::Array(inner, len) => match value {
                IdlValue::Bytes(bytes) if **inner == Layout::U8 => {
                    check_len(*len, bytes.len())?;
                    out.extend_from_slice(bytes);
                }
                IdlValue::Array(items) | IdlValue::Vec(items) => {
                    check_len(*len, items.len())?;
                    for item in items {
                        self.encode_into(item, inner, out)?;
                    }
                }
                other => return Err(mismatch(self.registry, layout, other)),
            },
            Layout::Option(inner) => match value {
                IdlValue::Option(None) => out.push(0),
                IdlValue::Option(Some(v)) => {
                    out.push(1);
                    self.encode_into(v, inner, out)?;
                }
                // A bare value stands for `Some`.
                other => {
                    out.push(1);
                    self.encode_into(other, inner, out)?;
                }
            },
            Layout::Defined(id) => {
                let ty = self.registry.get(*id);
                match &ty.def {
                    TypeDefLayout::Struct(fields) => self.write_fields(value, fields, out)?,
                    TypeDefLayout::Alias(target) => self.encode_into(value, target, out)?,
                    TypeDefLayout::Enum(variants) => {
                        let IdlValue::Enum { variant, fields } = value else {
                            return Err(mismatch(self.registry, layout, value));
                        };
                        let (index, def) = variants
                            .iter()
                            .enumerate()
                            .find(|(_, v)| v.name == *variant)
                            .or_else(|| {
                                variants
                                    .iter()
                                    .enumerate()
                                    .find(|(_, v)| v.name.eq_ignore_ascii_case(variant))
                            })
                            .ok_or_else(|| CodecError::UnknownVariant {
                                variant: variant.clone(),
                                type_name: ty.name.clone(),
                            })?;
                        let tag = u8::try_from(index).map_err(|_| CodecError::IntegerOverflow {
                            value: index.to_string(),
                            ty: "u8",
                        })?;
                        out.push(tag);
                        match (&def.fields, fields) {
                            (Fields::Unit, _) => {}
                            (fields, Some(payload)) => self.write_fields(payload, fields, out)?,
                            (_, None) => {
                                return Err(CodecError::MissingField {
                                    field: format!("{}::{}", ty.name, def.name),
                                })
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn write_fields(&self, value: &IdlValue, fields: &Fields, out: &mut Vec<u8>) -> Result<(), CodecError> {
        match fields {
            Fields::Unit => Ok(()),
            Fields::Named(named) => {
                let IdlValue::Struct(map) = value else {
                    return Err(CodecError::TypeMismatch {
                        expected: "struct".into(),
                        found: value.kind().into(),
                    });
                };
                for field in named {
                    match map.get(&field.name) {
                        Some(v) => self.encode_into(v, &field.layout, out)?,
                        None if matches!(field.layout, Layout::Option(_)) => out.push(0),
                        None => {
                            return Err(CodecError::MissingField {
                                field: field.name.clone(),
                            })
                        }
                    }
                }
                Ok(())
            }
            Fields::Tuple(layouts) => {
                let IdlValue::Tuple(items) = value else {
                    return Err(CodecError::TypeMismatch {
                        expected: "tuple".into(),
                        found: value.kind().into(),
                    });
                };
                check_len(layouts.len(), items.len())?;
                for (item, layout) in items.iter().zip(layouts) {
                    self.encode_into(item, layout, out)?;
                }
                Ok(())
            }
        }
    }

    fn unsigned(&self, value: &IdlValue, layout: &Layout) -> Result<u128, CodecError> {
        if !value.is_integer() {
            return Err(mismatch(self.registry, layout, value));
        }
        value.as_u128().ok_or_else(|| CodecError::IntegerOverflow {
            value: value.to_string(),
            ty: primitive_name(layout),
        })
    }

    fn signed(&self, value: &IdlValue, layout: &Layout) -> Result<i128, CodecError> {
        if !value.is_integer() {
            return Err(mismatch(self.registry, layout, value));
        }
        value.as_i128().ok_or_else(|| CodecError::IntegerOverflow {
            value: value.to_string(),
            ty: primitive_name(layout),
        })
    }

    fn byte_items(&self, items: &[IdlValue]) -> Result<Vec<u8>, CodecError> {
        items
            .iter()
            .map(|item| {
                let v = self.unsigned(item, &Layout::U8)?;
                narrow::<u8>(v, "u8")
            })
            .collect()
    }

    // ─── Decoding ────────────────────────────────────────────────

    /// Decode one value starting at `offset`. Returns the value and the
    /// number of bytes consumed; bytes after the value are ignored.
    pub fn decode(&self, data: &[u8], offset: usize, layout: &Layout) -> Result<(IdlValue, usize), CodecError> {
        let mut reader = Reader::at(data, offset)?;
        let value = self.read(&mut reader, layout)?;
        Ok((value, reader.pos - offset))
    }

    /// Decode a bare field list into a struct (or tuple) value.
    pub fn decode_fields(&self, data: &[u8], offset: usize, fields: &Fields) -> Result<(IdlValue, usize), CodecError> {
        let mut reader = Reader::at(data, offset)?;
        let value = self.read_fields(&mut reader, fields)?;
        Ok((value, reader.pos - offset))
    }

    fn read(&self, r: &mut Reader<'_>, layout: &Layout) -> Result<IdlValue, CodecError> {
        let Layout::Defined(id) = layout else {
            return self.read_layout(r, layout);
        };
        r.descend()?;
        let value = self.read_defined(r, *id);
        r.depth -= 1;
        value
    }

    fn read_layout(&self, r: &mut Reader<'_>, layout: &Layout) -> Result<IdlValue, CodecError> {
        Ok(match layout {
            Layout::Bool => {
                let offset = r.pos;
                match r.take(1)?[0] {
                    0 => IdlValue::Bool(false),
                    1 => IdlValue::Bool(true),
                    byte => return Err(CodecError::InvalidBool { byte, offset }),
                }
            }
            Layout::U8 => IdlValue::U8(r.borsh(1)?),
            Layout::I8 => IdlValue::I8(r.borsh(1)?),
            Layout::U16 => IdlValue::U16(r.borsh(2)?),
            Layout::I16 => IdlValue::I16(r.borsh(2)?),
            Layout::U32 => IdlValue::U32(r.borsh(4)?),
            Layout::I32 => IdlValue::I32(r.borsh(4)?),
            Layout::U64 => IdlValue::U64(r.borsh(8)?),
            Layout::I64 => IdlValue::I64(r.borsh(8)?),
            Layout::U128 => IdlValue::U128(r.borsh(16)?),
            Layout::I128 => IdlValue::I128(r.borsh(16)?),
            Layout::F32 => IdlValue::F32(f32::from_le_bytes(r.array::<4>()?)),
            Layout::F64 => IdlValue::F64(f64::from_le_bytes(r.array::<8>()?)),
            Layout::String => {
                let len = r.len_prefix()?;
                let offset = r.pos;
                let bytes = r.take(len)?;
                let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8 { offset })?;
                IdlValue::String(s.to_string())
            }
            Layout::Bytes => {
                let len = r.len_prefix()?;
                IdlValue::Bytes(r.take(len)?.to_vec())
            }
            Layout::Pubkey => IdlValue::Pubkey(Pubkey::new_from_array(r.array::<PUBKEY_BYTES>()?)),
            Layout::Vec(inner) => {
                let len = r.len_prefix()?;
                self.check_element_size(inner, len)?;
                // Reject impossible counts before allocating for them.
                let needed = len.saturating_mul(self.registry.min_size(inner));
                if needed > r.remaining() {
                    return Err(CodecError::UnexpectedEof {
                        offset: r.pos,
                        needed,
                        remaining: r.remaining(),
                    });
                }
                let mut items = Vec::with_capacity(len.min(r.remaining()));
                for _ in 0..len {
                    items.push(self.read(r, inner)?);
                }
                IdlValue::Vec(items)
            }
            Layout::Array(inner, len) => {
                let mut items = Vec::with_capacity((*len).min(r.remaining()));
                for _ in 0..*len {
                    items.push(self.read(r, inner)?);
                }
                IdlValue::Array(items)
            }
            Layout::Option(inner) => {
                let offset = r.pos;
                match r.take(1)?[0] {
                    0 => IdlValue::none(),
                    1 => IdlValue::some(self.read(r, inner)?),
                    tag => return Err(CodecError::InvalidOptionTag { tag, offset }),
                }
            }
            Layout::Defined(_) => return self.read(r, layout),
        })
    }

    fn read_defined(&self, r: &mut Reader<'_>, id: TypeId) -> Result<IdlValue, CodecError> {
        let ty = self.registry.get(id);
        Ok(match &ty.def {
            TypeDefLayout::Struct(fields) => self.read_fields(r, fields)?,
            TypeDefLayout::Alias(target) => self.read(r, target)?,
            TypeDefLayout::Enum(variants) => {
                let index = r.take(1)?[0];
                let variant = variants
                    .get(usize::from(index))
                    .ok_or_else(|| CodecError::InvalidVariantIndex {
                        index,
                        type_name: ty.name.clone(),
                    })?;
                let fields = match &variant.fields {
                    Fields::Unit => None,
                    fields => Some(Box::new(self.read_fields(r, fields)?)),
                };
                IdlValue::Enum {
                    variant: variant.name.clone(),
                    fields,
                }
            }
        })
    }

    /// Vectors of zero-sized elements are refused both ways: their count
    /// is not backed by any input bytes.
    fn check_element_size(&self, inner: &Layout, len: usize) -> Result<(), CodecError> {
        if len > 0 && self.registry.min_size(inner) == 0 {
            return Err(CodecError::ZeroSizedElements {
                len,
                type_name: self.registry.type_name(inner),
            });
        }
        Ok(())
    }

    fn read_fields(&self, r: &mut Reader<'_>, fields: &Fields) -> Result<IdlValue, CodecError> {
        match fields {
            Fields::Unit => Ok(IdlValue::Struct(BTreeMap::new())),
            Fields::Named(named) => {
                let mut out = BTreeMap::new();
                for field in named {
                    out.insert(field.name.clone(), self.read(r, &field.layout)?);
                }
                Ok(IdlValue::Struct(out))
            }
            Fields::Tuple(layouts) => layouts
                .iter()
                .map(|layout| self.read(r, layout))
                .collect::<Result<_, _>>()
                .map(IdlValue::Tuple),
        }
    }
}

/// Cursor over the input with bounds-checked reads.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Defined types currently being decoded.
    depth: usize,
}

impl<'a> Reader<'a> {
    fn at(data: &'a [u8], offset: usize) -> Result<Self, CodecError> {
        if offset > data.len() {
            return Err(CodecError::UnexpectedEof {
                offset,
                needed: 0,
                remaining: 0,
            });
        }
        Ok(Self {
            data,
            pos: offset,
            depth: 0,
        })
    }

    fn descend(&mut self) -> Result<(), CodecError> {
        if self.depth >= MAX_DECODE_DEPTH {
            return Err(CodecError::DepthLimitExceeded {
                limit: MAX_DECODE_DEPTH,
                offset: self.pos,
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::UnexpectedEof {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn borsh<T: BorshDeserialize>(&mut self, width: usize) -> Result<T, CodecError> {
        let mut bytes = self.take(width)?;
        Ok(T::deserialize(&mut bytes)?)
    }

    fn len_prefix(&mut self) -> Result<usize, CodecError> {
        let len: u32 = self.borsh(4)?;
        Ok(len as usize)
    }
}

fn write_borsh<T: BorshSerialize>(value: &T, out: &mut Vec<u8>) -> Result<(), CodecError> {
    value.serialize(out)?;
    Ok(())
}

fn write_len(len: usize, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let len = u32::try_from(len).map_err(|_| CodecError::LengthOverflow { len })?;
    write_borsh(&len, out)
}

fn write_prefixed(bytes: &[u8], out: &mut Vec<u8>) -> Result<(), CodecError> {
    write_len(bytes.len(), out)?;
    out.extend_from_slice(bytes);
    Ok(())
}

fn check_len(expected: usize, actual: usize) -> Result<(), CodecError> {
    if expected != actual {
        return Err(CodecError::LengthMismatch { expected, actual });
    }
    Ok(())
}

fn narrow<T: TryFrom<u128>>(v: u128, ty: &'static str) -> Result<T, CodecError> {
    T::try_from(v).map_err(|_| CodecError::IntegerOverflow {
        value: v.to_string(),
        ty,
    })
}

fn narrow_signed<T: TryFrom<i128>>(v: i128, ty: &'static str) -> Result<T, CodecError> {
    T::try_from(v).map_err(|_| CodecError::IntegerOverflow {
        value: v.to_string(),
        ty,
    })
}

fn primitive_name(layout: &Layout) -> &'static str {
    match layout {
        Layout::U8 => "u8",
        Layout::I8 => "i8",
        Layout::U16 => "u16",
        Layout::I16 => "i16",
        Layout::U32 => "u32",
        Layout::I32 => "i32",
        Layout::U64 => "u64",
        Layout::I64 => "i64",
        Layout::U128 => "u128",
        Layout::I128 => "i128",
        _ => "integer",
    }
}

fn mismatch(registry: &TypeRegistry, layout: &Layout, value: &IdlValue) -> CodecError {
    CodecError::TypeMismatch {
        expected: registry.type_name(layout),
        found: value.kind().to_string(),
    }
}
