//! Type layout resolution.
//!
//! [`TypeRegistry`] turns the IDL's type table into an arena of resolved
//! definitions addressed by [`TypeId`]. Every `defined` reference is
//! looked up exactly once, while the registry is built, so a [`Layout`]
//! can never point at a missing type and the codec never does name
//! lookups on the hot path.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::error::SchemaError;
use crate::idl::{Idl, IdlDefinedFields, IdlField, IdlType, IdlTypeDef, IdlTypeDefTy};

/// Index of a resolved type definition inside a [`TypeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

/// A resolved type: the shape of an [`IdlType`] with `defined` names
/// replaced by arena indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
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
    Vec(Box<Layout>),
    Option(Box<Layout>),
    Array(Box<Layout>, usize),
    Defined(TypeId),
}

impl Layout {
    /// Byte width of fixed-size primitives.
    pub fn primitive_size(&self) -> Option<usize> {
        let size = match self {
            Layout::Bool | Layout::U8 | Layout::I8 => 1,
            Layout::U16 | Layout::I16 => 2,
            Layout::U32 | Layout::I32 | Layout::F32 => 4,
            Layout::U64 | Layout::I64 | Layout::F64 => 8,
            Layout::U128 | Layout::I128 => 16,
            Layout::Pubkey => 32,
            Layout::String
            | Layout::Bytes
            | Layout::Vec(_)
            | Layout::Option(_)
            | Layout::Array(..)
            | Layout::Defined(_) => return None,
        };
        Some(size)
    }
}

/// Fields of a struct or enum variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fields {
    Unit,
    Named(Vec<NamedField>),
    Tuple(Vec<Layout>),
}

impl Fields {
    pub fn len(&self) -> usize {
        match self {
            Fields::Unit => 0,
            Fields::Named(fields) => fields.len(),
            Fields::Tuple(fields) => fields.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field layouts in declaration order.
    pub fn layouts(&self) -> Vec<&Layout> {
        match self {
            Fields::Unit => vec![],
            Fields::Named(fields) => fields.iter().map(|f| &f.layout).collect(),
            Fields::Tuple(fields) => fields.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedField {
    pub name: String,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub name: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDefLayout {
    Struct(Fields),
    Enum(Vec<Variant>),
    Alias(Layout),
}

/// A named definition in the arena, with its sizes computed once.
#[derive(Debug, Clone)]
pub struct ResolvedType {
    pub name: String,
    pub def: TypeDefLayout,
    pub is_fixed_size: bool,
    pub min_size: usize,
    pub max_size: Option<usize>,
    /// Reference-client allocation size; `None` when the definition
    /// reaches itself.
    pub allocation_size: Option<usize>,
}

/// Size class and structure of a layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutInfo {
    pub is_fixed_size: bool,
    pub min_size: usize,
    /// `None` for unbounded layouts (vec, string, bytes, recursion).
    pub max_size: Option<usize>,
    /// Element type of vec/option/array, or the target of an alias.
    pub inner: Option<Layout>,
    /// Field list of a struct.
    pub fields: Option<Vec<FieldInfo>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// `None` for tuple fields.
    pub name: Option<String>,
    pub layout: Layout,
    /// Offset from the start of the struct when every preceding field
    /// is fixed-size.
    pub offset: Option<usize>,
    pub is_fixed_size: bool,
    pub min_size: usize,
}

/// Arena of resolved type definitions.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: Vec<ResolvedType>,
    index: HashMap<String, TypeId>,
}

/// Length prefix of strings, bytes and vectors.
const LEN_PREFIX: usize = 4;

impl TypeRegistry {
    /// Resolve a bare type table.
    pub fn new(defs: &[IdlTypeDef]) -> Result<Self, SchemaError> {
        let named: Vec<(&str, &IdlTypeDefTy)> =
            defs.iter().map(|d| (d.name.as_str(), &d.ty)).collect();
        Self::build(&named, &[])
    }

    /// Resolve the type table of an IDL, including legacy inline account
    /// bodies and inline event field lists, which other types may
    /// reference by name.
    pub fn from_idl(idl: &Idl) -> Result<Self, SchemaError> {
        let named: Vec<(&str, &IdlTypeDefTy)> =
            idl.types.iter().map(|d| (d.name.as_str(), &d.ty)).collect();

        let mut inline: Vec<(&str, IdlTypeDefTy)> = Vec::new();
        for account in &idl.accounts {
            if let Some(ty) = &account.ty {
                inline.push((account.name.as_str(), ty.clone()));
            }
        }
        for event in &idl.events {
            if let Some(fields) = &event.fields {
                inline.push((
                    event.name.as_str(),
                    IdlTypeDefTy::Struct {
                        fields: Some(IdlDefinedFields::Named(fields.clone())),
                    },
                ));
            }
        }
        Self::build(&named, &inline)
    }

    fn build(
        named: &[(&str, &IdlTypeDefTy)],
        inline: &[(&str, IdlTypeDefTy)],
    ) -> Result<Self, SchemaError> {
        // Pass 1: assign ids so forward and self references resolve.
        let mut index = HashMap::new();
        let mut order: Vec<(&str, &IdlTypeDefTy)> = Vec::new();
        for &(name, ty) in named {
            if index.contains_key(name) {
                return Err(SchemaError::DuplicateName {
                    kind: crate::idl::EntryKind::Type,
                    name: name.to_string(),
                });
            }
            index.insert(name.to_string(), TypeId(order.len()));
            order.push((name, ty));
        }
        for (name, ty) in inline {
            if index.contains_key(*name) {
                debug!(type_name = %name, "inline definition shadowed by `types` entry");
                continue;
            }
            index.insert(name.to_string(), TypeId(order.len()));
            order.push((*name, ty));
        }

        let mut registry = TypeRegistry {
            types: Vec::with_capacity(order.len()),
            index,
        };

        // Pass 2: resolve bodies.
        for &(name, ty) in &order {
            let def = registry.resolve_def(name, ty)?;
            registry.types.push(ResolvedType {
                name: name.to_string(),
                def,
                is_fixed_size: false,
                min_size: 0,
                max_size: None,
                allocation_size: None,
            });
        }

        // Pass 3: sizes, each definition computed once.
        let mins = registry.compute_min_sizes()?;
        let count = registry.types.len();
        let mut max_memo: Vec<Walk<Option<usize>>> = vec![Walk::Pending; count];
        let mut alloc_memo: Vec<Walk<Option<usize>>> = vec![Walk::Pending; count];
        for (i, min) in mins.into_iter().enumerate() {
            let max = registry.walk_max(TypeId(i), &mut max_memo)?;
            let alloc = registry.walk_alloc(TypeId(i), &mut alloc_memo)?;
            let ty = &mut registry.types[i];
            ty.min_size = min;
            ty.max_size = max;
            ty.allocation_size = alloc;
        }
        let mut fixed_memo: Vec<Walk<bool>> = vec![Walk::Pending; count];
        for i in 0..count {
            let fixed = registry.walk_fixed(TypeId(i), &mut fixed_memo);
            registry.types[i].is_fixed_size = fixed;
        }

        debug!(types = registry.types.len(), "resolved type registry");
        Ok(registry)
    }

    fn resolve_def(&self, name: &str, ty: &IdlTypeDefTy) -> Result<TypeDefLayout, SchemaError> {
        Ok(match ty {
            IdlTypeDefTy::Struct { fields } => {
                TypeDefLayout::Struct(self.resolve_fields(fields.as_ref(), name)?)
            }
            IdlTypeDefTy::Enum { variants } => {
                let mut out = Vec::with_capacity(variants.len());
                for variant in variants {
                    let context = format!("{name}::{}", variant.name);
                    out.push(Variant {
                        name: variant.name.clone(),
                        fields: self.resolve_fields(variant.fields.as_ref(), &context)?,
                    });
                }
                TypeDefLayout::Enum(out)
            }
            IdlTypeDefTy::Type { alias } => TypeDefLayout::Alias(self.layout_in(alias, name)?),
        })
    }

    fn resolve_fields(
        &self,
        fields: Option<&IdlDefinedFields>,
        context: &str,
    ) -> Result<Fields, SchemaError> {
        match fields {
            None => Ok(Fields::Unit),
            Some(IdlDefinedFields::Named(named)) if named.is_empty() => Ok(Fields::Unit),
            Some(IdlDefinedFields::Named(named)) => Ok(Fields::Named(self.named_fields(named, context)?)),
            Some(IdlDefinedFields::Tuple(types)) if types.is_empty() => Ok(Fields::Unit),
            Some(IdlDefinedFields::Tuple(types)) => {
                let layouts = types
                    .iter()
                    .map(|t| self.layout_in(t, context))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Fields::Tuple(layouts))
            }
        }
    }

    /// Resolve a list of named fields, e.g. instruction arguments.
    pub fn named_fields(&self, fields: &[IdlField], context: &str) -> Result<Vec<NamedField>, SchemaError> {
        fields
            .iter()
            .map(|f| {
                Ok(NamedField {
                    name: f.name.clone(),
                    layout: self.layout_in(&f.ty, &format!("{context}.{}", f.name))?,
                })
            })
            .collect()
    }

    /// Resolve a schema type against the registry.
    pub fn layout_of(&self, ty: &IdlType) -> Result<Layout, SchemaError> {
        self.layout_in(ty, "<root>")
    }

    fn layout_in(&self, ty: &IdlType, context: &str) -> Result<Layout, SchemaError> {
        Ok(match ty {
            IdlType::Bool => Layout::Bool,
            IdlType::U8 => Layout::U8,
            IdlType::I8 => Layout::I8,
            IdlType::U16 => Layout::U16,
            IdlType::I16 => Layout::I16,
            IdlType::U32 => Layout::U32,
            IdlType::I32 => Layout::I32,
            IdlType::U64 => Layout::U64,
            IdlType::I64 => Layout::I64,
            IdlType::U128 => Layout::U128,
            IdlType::I128 => Layout::I128,
            IdlType::F32 => Layout::F32,
            IdlType::F64 => Layout::F64,
            IdlType::String => Layout::String,
            IdlType::Bytes => Layout::Bytes,
            IdlType::Pubkey => Layout::Pubkey,
            IdlType::Vec(inner) => Layout::Vec(Box::new(self.layout_in(inner, context)?)),
            IdlType::Option(inner) => Layout::Option(Box::new(self.layout_in(inner, context)?)),
            IdlType::Array(inner, len) => Layout::Array(Box::new(self.layout_in(inner, context)?), *len),
            IdlType::Defined(name) => Layout::Defined(self.id(name).ok_or_else(|| {
                SchemaError::UnresolvedType {
                    name: name.clone(),
                    referenced_by: context.to_string(),
                }
            })?),
        })
    }

    // ─── Lookup ──────────────────────────────────────────────────

    pub fn id(&self, name: &str) -> Option<TypeId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, id: TypeId) -> &ResolvedType {
        &self.types[id.0]
    }

    pub fn by_name(&self, name: &str) -> Option<&ResolvedType> {
        self.id(name).map(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedType> {
        self.types.iter()
    }

    /// Human-readable name of a layout, for errors.
    pub fn type_name(&self, layout: &Layout) -> String {
        LayoutDisplay { registry: self, layout }.to_string()
    }

    // ─── Sizes ───────────────────────────────────────────────────

    /// Size class and structure of a layout.
    pub fn resolve(&self, layout: &Layout) -> LayoutInfo {
        let (inner, fields) = match layout {
            Layout::Vec(inner) | Layout::Option(inner) | Layout::Array(inner, _) => {
                (Some((**inner).clone()), None)
            }
            Layout::Defined(id) => match &self.get(*id).def {
                TypeDefLayout::Struct(fields) => (None, Some(self.field_infos(fields))),
                TypeDefLayout::Alias(target) => (Some(target.clone()), None),
                TypeDefLayout::Enum(_) => (None, None),
            },
            _ => (None, None),
        };
        LayoutInfo {
            is_fixed_size: self.is_fixed_size(layout),
            min_size: self.min_size(layout),
            max_size: self.max_size(layout),
            inner,
            fields,
        }
    }

    /// Field list of a struct with static offsets where they exist.
    pub fn field_infos(&self, fields: &Fields) -> Vec<FieldInfo> {
        let entries: Vec<(Option<String>, &Layout)> = match fields {
            Fields::Unit => vec![],
            Fields::Named(named) => named.iter().map(|f| (Some(f.name.clone()), &f.layout)).collect(),
            Fields::Tuple(layouts) => layouts.iter().map(|l| (None, l)).collect(),
        };
        let mut offset = Some(0usize);
        let mut out = Vec::with_capacity(entries.len());
        for (name, layout) in entries {
            let fixed = self.is_fixed_size(layout);
            let min = self.min_size(layout);
            out.push(FieldInfo {
                name,
                layout: layout.clone(),
                offset,
                is_fixed_size: fixed,
                min_size: min,
            });
            offset = match offset {
                Some(o) if fixed => o.checked_add(min),
                _ => None,
            };
        }
        out
    }

    pub fn is_fixed_size(&self, layout: &Layout) -> bool {
        match layout {
            Layout::String | Layout::Bytes | Layout::Vec(_) | Layout::Option(_) => false,
            Layout::Array(inner, _) => self.is_fixed_size(inner),
            Layout::Defined(id) => self.get(*id).is_fixed_size,
            _ => true,
        }
    }

    /// Saturates at `usize::MAX` for layouts too large to address.
    pub fn min_size(&self, layout: &Layout) -> usize {
        match layout {
            Layout::String | Layout::Bytes | Layout::Vec(_) => LEN_PREFIX,
            Layout::Option(_) => 1,
            Layout::Array(inner, len) => self.min_size(inner).saturating_mul(*len),
            Layout::Defined(id) => self.get(*id).min_size,
            primitive => primitive.primitive_size().unwrap_or(0),
        }
    }

    /// `None` for unbounded layouts and for bounds past `usize::MAX`.
    pub fn max_size(&self, layout: &Layout) -> Option<usize> {
        match layout {
            Layout::String | Layout::Bytes | Layout::Vec(_) => None,
            Layout::Option(inner) => self.max_size(inner)?.checked_add(1),
            Layout::Array(_, 0) => Some(0),
            Layout::Array(inner, len) => self.max_size(inner)?.checked_mul(*len),
            Layout::Defined(id) => self.get(*id).max_size,
            primitive => primitive.primitive_size(),
        }
    }

    pub fn fields_min_size(&self, fields: &Fields) -> usize {
        fields
            .layouts()
            .into_iter()
            .fold(0usize, |acc, l| acc.saturating_add(self.min_size(l)))
    }

    fn fields_max_size(&self, fields: &Fields) -> Option<usize> {
        fields
            .layouts()
            .into_iter()
            .try_fold(0usize, |acc, l| acc.checked_add(self.max_size(l)?))
    }

    // ─── Size passes run once while building ─────────────────────

    /// Minimum encoded size of every definition.
    ///
    /// Computed by relaxation: all sizes start unknown and each round
    /// recomputes every definition from the current table until nothing
    /// shrinks. A definition still unknown afterwards has no finite
    /// encoding, i.e. it contains itself without indirection.
    fn compute_min_sizes(&self) -> Result<Vec<usize>, SchemaError> {
        let mut table: Vec<Option<usize>> = vec![None; self.types.len()];
        loop {
            let mut changed = false;
            for i in 0..table.len() {
                let next = self.relax_def_min(TypeId(i), &table);
                if next.is_some() && (table[i].is_none() || next < table[i]) {
                    table[i] = next;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        table
            .into_iter()
            .enumerate()
            .map(|(i, size)| match size {
                None => Err(SchemaError::RecursiveType {
                    name: self.types[i].name.clone(),
                }),
                Some(usize::MAX) => Err(SchemaError::TypeTooLarge {
                    name: self.types[i].name.clone(),
                }),
                Some(size) => Ok(size),
            })
            .collect()
    }

    fn relax_def_min(&self, id: TypeId, table: &[Option<usize>]) -> Option<usize> {
        match &self.get(id).def {
            TypeDefLayout::Struct(fields) => self.relax_fields_min(fields, table),
            TypeDefLayout::Enum(variants) if variants.is_empty() => Some(1),
            // A variant that is still unknown cannot be the smallest.
            TypeDefLayout::Enum(variants) => variants
                .iter()
                .filter_map(|v| self.relax_fields_min(&v.fields, table))
                .min()
                .map(|s| s.saturating_add(1)),
            TypeDefLayout::Alias(target) => self.relax_layout_min(target, table),
        }
    }

    fn relax_fields_min(&self, fields: &Fields, table: &[Option<usize>]) -> Option<usize> {
        fields
            .layouts()
            .into_iter()
            .try_fold(0usize, |acc, l| Some(acc.saturating_add(self.relax_layout_min(l, table)?)))
    }

    fn relax_layout_min(&self, layout: &Layout, table: &[Option<usize>]) -> Option<usize> {
        match layout {
            Layout::String | Layout::Bytes | Layout::Vec(_) => Some(LEN_PREFIX),
            Layout::Option(_) => Some(1),
            Layout::Array(_, 0) => Some(0),
            Layout::Array(inner, len) => self.relax_layout_min(inner, table).map(|s| s.saturating_mul(*len)),
            Layout::Defined(id) => table[id.0],
            primitive => primitive.primitive_size(),
        }
    }

    // Memoized walks. Meeting a definition that is `Active` means the
    // walk went round a cycle; every definition on a cycle is unbounded
    // and never fixed-size, so the walks answer for it directly.

    fn walk_max(&self, id: TypeId, memo: &mut [Walk<Option<usize>>]) -> Result<Option<usize>, SchemaError> {
        match memo[id.0] {
            Walk::Done(size) => return Ok(size),
            Walk::Active => return Ok(None),
            Walk::Pending => {}
        }
        memo[id.0] = Walk::Active;
        let ty = self.get(id);
        let size = match &ty.def {
            TypeDefLayout::Struct(fields) => self.walk_fields_max(fields, &ty.name, memo)?,
            TypeDefLayout::Enum(variants) => {
                let mut widest = Some(0usize);
                for variant in variants {
                    let width = self.walk_fields_max(&variant.fields, &ty.name, memo)?;
                    widest = widest.zip(width).map(|(a, b)| a.max(b));
                }
                widest.map(|w| checked_add(w, 1, &ty.name)).transpose()?
            }
            TypeDefLayout::Alias(target) => self.walk_layout_max(target, &ty.name, memo)?,
        };
        memo[id.0] = Walk::Done(size);
        Ok(size)
    }

    fn walk_fields_max(
        &self,
        fields: &Fields,
        owner: &str,
        memo: &mut [Walk<Option<usize>>],
    ) -> Result<Option<usize>, SchemaError> {
        let mut total = Some(0usize);
        for layout in fields.layouts() {
            let size = self.walk_layout_max(layout, owner, memo)?;
            total = match total.zip(size) {
                Some((a, b)) => Some(checked_add(a, b, owner)?),
                None => None,
            };
        }
        Ok(total)
    }

    fn walk_layout_max(
        &self,
        layout: &Layout,
        owner: &str,
        memo: &mut [Walk<Option<usize>>],
    ) -> Result<Option<usize>, SchemaError> {
        Ok(match layout {
            Layout::String | Layout::Bytes | Layout::Vec(_) => None,
            Layout::Option(inner) => match self.walk_layout_max(inner, owner, memo)? {
                Some(s) => Some(checked_add(s, 1, owner)?),
                None => None,
            },
            Layout::Array(_, 0) => Some(0),
            Layout::Array(inner, len) => match self.walk_layout_max(inner, owner, memo)? {
                Some(s) => Some(checked_mul(s, *len, owner)?),
                None => None,
            },
            Layout::Defined(id) => self.walk_max(*id, memo)?,
            primitive => primitive.primitive_size(),
        })
    }

    /// Needs the maximum sizes already stored: an enum is fixed-size
    /// only when every variant encodes to the same width.
    fn walk_fixed(&self, id: TypeId, memo: &mut [Walk<bool>]) -> bool {
        match memo[id.0] {
            Walk::Done(fixed) => return fixed,
            Walk::Active => return false,
            Walk::Pending => {}
        }
        memo[id.0] = Walk::Active;
        let fixed = match &self.get(id).def {
            TypeDefLayout::Struct(fields) => self.walk_fields_fixed(fields, memo),
            TypeDefLayout::Enum(variants) => {
                let all_fixed = variants.iter().all(|v| self.walk_fields_fixed(&v.fields, memo));
                let mut widths = variants.iter().map(|v| self.fields_max_size(&v.fields));
                let first = widths.next().flatten();
                all_fixed && widths.all(|w| w == first)
            }
            TypeDefLayout::Alias(target) => self.walk_layout_fixed(target, memo),
        };
        memo[id.0] = Walk::Done(fixed);
        fixed
    }

    fn walk_fields_fixed(&self, fields: &Fields, memo: &mut [Walk<bool>]) -> bool {
        fields.layouts().into_iter().all(|l| self.walk_layout_fixed(l, memo))
    }

    fn walk_layout_fixed(&self, layout: &Layout, memo: &mut [Walk<bool>]) -> bool {
        match layout {
            Layout::String | Layout::Bytes | Layout::Vec(_) | Layout::Option(_) => false,
            Layout::Array(inner, _) => self.walk_layout_fixed(inner, memo),
            Layout::Defined(id) => self.walk_fixed(*id, memo),
            _ => true,
        }
    }

    fn walk_alloc(&self, id: TypeId, memo: &mut [Walk<Option<usize>>]) -> Result<Option<usize>, SchemaError> {
        match memo[id.0] {
            Walk::Done(size) => return Ok(size),
            Walk::Active => return Ok(None),
            Walk::Pending => {}
        }
        memo[id.0] = Walk::Active;
        let ty = self.get(id);
        let size = match &ty.def {
            TypeDefLayout::Struct(fields) => self.walk_fields_alloc(fields, &ty.name, memo)?,
            TypeDefLayout::Enum(variants) => {
                let mut widest = Some(0usize);
                for variant in variants {
                    let width = self.walk_fields_alloc(&variant.fields, &ty.name, memo)?;
                    widest = widest.zip(width).map(|(a, b)| a.max(b));
                }
                widest.map(|w| checked_add(w, 1, &ty.name)).transpose()?
            }
            TypeDefLayout::Alias(target) => self.walk_layout_alloc(target, &ty.name, memo)?,
        };
        memo[id.0] = Walk::Done(size);
        Ok(size)
    }

    fn walk_fields_alloc(
        &self,
        fields: &Fields,
        owner: &str,
        memo: &mut [Walk<Option<usize>>],
    ) -> Result<Option<usize>, SchemaError> {
        let mut total = Some(0usize);
        for layout in fields.layouts() {
            let size = self.walk_layout_alloc(layout, owner, memo)?;
            total = match total.zip(size) {
                Some((a, b)) => Some(checked_add(a, b, owner)?),
                None => None,
            };
        }
        Ok(total)
    }

    fn walk_layout_alloc(
        &self,
        layout: &Layout,
        owner: &str,
        memo: &mut [Walk<Option<usize>>],
    ) -> Result<Option<usize>, SchemaError> {
        Ok(match layout {
            Layout::String | Layout::Bytes | Layout::Vec(_) => Some(1),
            Layout::Option(inner) => match self.walk_layout_alloc(inner, owner, memo)? {
                Some(s) => Some(checked_add(s, 1, owner)?),
                None => None,
            },
            Layout::Array(inner, len) => match self.walk_layout_alloc(inner, owner, memo)? {
                Some(s) => Some(checked_mul(s, *len, owner)?),
                None => None,
            },
            Layout::Defined(id) => self.walk_alloc(*id, memo)?,
            primitive => primitive.primitive_size(),
        })
    }

    // ─── Allocation sizing ───────────────────────────────────────

    /// Bytes the reference client allocates for a layout.
    ///
    /// Variable-length members are not bounded: strings, bytes and
    /// vectors count a single byte, options count their tag plus the
    /// inner size, enums their tag plus the widest variant. `None` when a
    /// definition reaches itself or the size does not fit in `usize`.
    pub fn allocation_size(&self, layout: &Layout) -> Option<usize> {
        match layout {
            Layout::String | Layout::Bytes | Layout::Vec(_) => Some(1),
            Layout::Option(inner) => self.allocation_size(inner)?.checked_add(1),
            Layout::Array(inner, len) => self.allocation_size(inner)?.checked_mul(*len),
            Layout::Defined(id) => self.get(*id).allocation_size,
            primitive => primitive.primitive_size(),
        }
    }

    pub fn fields_allocation_size(&self, fields: &Fields) -> Option<usize> {
        fields
            .layouts()
            .into_iter()
            .try_fold(0usize, |acc, l| acc.checked_add(self.allocation_size(l)?))
    }
}

/// State of one definition during a memoized walk.
#[derive(Debug, Clone, Copy)]
enum Walk<T> {
    Pending,
    Active,
    Done(T),
}

fn checked_add(a: usize, b: usize, owner: &str) -> Result<usize, SchemaError> {
    a.checked_add(b).ok_or_else(|| SchemaError::TypeTooLarge { name: owner.to_string() })
}

fn checked_mul(a: usize, b: usize, owner: &str) -> Result<usize, SchemaError> {
    a.checked_mul(b).ok_or_else(|| SchemaError::TypeTooLarge { name: owner.to_string() })
}

struct LayoutDisplay<'a> {
    registry: &'a TypeRegistry,
    layout: &'a Layout,
}

impl fmt::Display for LayoutDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nested = |layout| LayoutDisplay {
            registry: self.registry,
            layout,
        };
        match self.layout {
            Layout::Bool => f.write_str("bool"),
            Layout::U8 => f.write_str("u8"),
            Layout::I8 => f.write_str("i8"),
            Layout::U16 => f.write_str("u16"),
            Layout::I16 => f.write_str("i16"),
            Layout::U32 => f.write_str("u32"),
            Layout::I32 => f.write_str("i32"),
            Layout::U64 => f.write_str("u64"),
            Layout::I64 => f.write_str("i64"),
            Layout::U128 => f.write_str("u128"),
            Layout::I128 => f.write_str("i128"),
            Layout::F32 => f.write_str("f32"),
            Layout::F64 => f.write_str("f64"),
            Layout::String => f.write_str("string"),
            Layout::Bytes => f.write_str("bytes"),
            Layout::Pubkey => f.write_str("pubkey"),
            Layout::Vec(inner) => write!(f, "Vec<{}>", nested(inner)),
            Layout::Option(inner) => write!(f, "Option<{}>", nested(inner)),
            Layout::Array(inner, len) => write!(f, "[{}; {len}]", nested(inner)),
            Layout::Defined(id) => f.write_str(&self.registry.get(*id).name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idl::IdlEnumVariant;

    fn def(name: &str, ty: IdlTypeDefTy) -> IdlTypeDef {
        IdlTypeDef {
            name: name.to_string(),
            docs: vec![],
            ty,
        }
    }

    fn named(fields: Vec<IdlField>) -> IdlTypeDefTy {
        IdlTypeDefTy::Struct {
            fields: Some(IdlDefinedFields::Named(fields)),
        }
    }

    #[test]
    fn test_min_size_settles_through_enum_cycle() {
        // Wrapper reaches itself only through the Leaf-or-Wrap enum, so
        // both have a finite minimum once the enum settles on `Leaf`.
        let registry = TypeRegistry::new(&[
            def(
                "Tree",
                IdlTypeDefTy::Enum {
                    variants: vec![
                        IdlEnumVariant {
                            name: "Wrap".into(),
                            fields: Some(IdlDefinedFields::Tuple(vec![IdlType::defined("Wrapper")])),
                        },
                        IdlEnumVariant {
                            name: "Leaf".into(),
                            fields: None,
                        },
                    ],
                },
            ),
            def("Wrapper", named(vec![IdlField::new("tree", IdlType::defined("Tree"))])),
        ])
        .unwrap();
        let tree = registry.by_name("Tree").unwrap();
        let wrapper = registry.by_name("Wrapper").unwrap();
        assert_eq!((tree.min_size, wrapper.min_size), (1, 1));
        assert_eq!((tree.max_size, wrapper.max_size), (None, None));
        assert!(!wrapper.is_fixed_size);
        assert_eq!(wrapper.allocation_size, None);
    }

    #[test]
    fn test_size_overflow_is_a_schema_error() {
        let err = TypeRegistry::new(&[def(
            "Huge",
            named(vec![IdlField::new("data", IdlType::array(IdlType::U64, 1 << 62))]),
        )])
        .unwrap_err();
        assert!(matches!(err, SchemaError::TypeTooLarge { name } if name == "Huge"));

        // Bounded minimum, overflowing maximum.
        let err = TypeRegistry::new(&[def(
            "Maybe",
            named(vec![IdlField::new(
                "data",
                IdlType::option(IdlType::array(IdlType::array(IdlType::U64, 1 << 40), 1 << 30)),
            )]),
        )])
        .unwrap_err();
        assert!(matches!(err, SchemaError::TypeTooLarge { name } if name == "Maybe"));
    }

    #[test]
    fn test_enum_min_ignores_recursive_variant() {
        let registry = TypeRegistry::new(&[def(
            "List",
            IdlTypeDefTy::Enum {
                variants: vec![
                    IdlEnumVariant {
                        name: "Nil".into(),
                        fields: None,
                    },
                    IdlEnumVariant {
                        name: "Cons".into(),
                        fields: Some(IdlDefinedFields::Tuple(vec![
                            IdlType::U8,
                            IdlType::defined("List"),
                        ])),
                    },
                ],
            },
        )])
        .unwrap();
        let list = registry.by_name("List").unwrap();
        assert_eq!(list.min_size, 1);
        assert_eq!(list.max_size, None);
        assert!(!list.is_fixed_size);
    }
}
