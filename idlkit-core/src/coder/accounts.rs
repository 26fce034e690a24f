use std::sync::Arc;

use crate::cache::DiscriminatorCache;
use crate::coder::{DiscriminatedCoder, EntryBody, EntrySpec, MemcmpFilter};
use crate::discriminator::{Discriminator, Namespace, DISCRIMINATOR_LEN};
use crate::error::{CoderError, CoderResult, SchemaError};
use crate::idl::{EntryKind, Idl};
use crate::layout::{Layout, TypeDefLayout, TypeRegistry};
use crate::pubkey::Pubkey;
use crate::value::IdlValue;

/// Encodes and decodes account data: an 8-byte discriminator followed by
/// the account struct.
#[derive(Debug, Clone)]
pub struct AccountsCoder {
    inner: DiscriminatedCoder,
}

impl AccountsCoder {
    /// Build with a private discriminator cache.
    pub fn new(idl: &Idl) -> CoderResult<Self> {
        let registry = Arc::new(TypeRegistry::from_idl(idl)?);
        Self::build(idl, registry, &DiscriminatorCache::default())
    }

    pub(crate) fn build(idl: &Idl, registry: Arc<TypeRegistry>, cache: &DiscriminatorCache) -> CoderResult<Self> {
        let specs = idl
            .accounts
            .iter()
            .map(|account| {
                let id = registry.id(&account.name).ok_or_else(|| SchemaError::MissingTypeDefinition {
                    kind: EntryKind::Account,
                    name: account.name.clone(),
                })?;
                Ok(EntrySpec {
                    name: account.name.clone(),
                    explicit: account.discriminator.clone(),
                    body: EntryBody::Layout(Layout::Defined(id)),
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Ok(Self {
            inner: DiscriminatedCoder::build(EntryKind::Account, Namespace::Account, registry, specs, cache)?,
        })
    }

    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries().is_empty()
    }

    /// Account names in schema order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.names()
    }

    pub fn encode(&self, name: &str, value: &IdlValue) -> CoderResult<Vec<u8>> {
        self.inner.encode(name, value)
    }

    /// Decode, checking the discriminator first.
    pub fn decode(&self, name: &str, data: &[u8]) -> CoderResult<IdlValue> {
        self.inner.decode(name, data, None)
    }

    /// Like [`decode`](Self::decode), naming `address` in a mismatch error.
    pub fn decode_at(&self, name: &str, data: &[u8], address: &Pubkey) -> CoderResult<IdlValue> {
        self.inner.decode(name, data, Some(*address))
    }

    pub fn decode_unchecked(&self, name: &str, data: &[u8]) -> CoderResult<IdlValue> {
        self.inner.decode_unchecked(name, data)
    }

    /// Decode data of unknown type, returning the account name with the value.
    pub fn decode_any(&self, data: &[u8]) -> CoderResult<(String, IdlValue)> {
        self.inner.decode_any(data)
    }

    pub fn value_from_json(&self, name: &str, json: &serde_json::Value) -> CoderResult<IdlValue> {
        self.inner.value_from_json(name, json)
    }

    pub fn discriminator(&self, name: &str) -> CoderResult<Discriminator> {
        self.inner.discriminator(name)
    }

    /// Filter matching every account of this type, optionally narrowed by
    /// bytes that follow the discriminator.
    pub fn memcmp(&self, name: &str, append: Option<&[u8]>) -> CoderResult<MemcmpFilter> {
        self.inner.memcmp(name, append)
    }

    /// Bytes to allocate for the account, discriminator included.
    ///
    /// Follows the reference client's convention: variable-length fields
    /// count one byte, so this is a floor for accounts holding strings or
    /// vectors, not a maximum.
    pub fn size(&self, name: &str) -> CoderResult<usize> {
        self.inner.size(name)
    }

    /// Offset of a top-level field within account data, when every field
    /// before it has a fixed size. Useful for `memcmp` filters on fields.
    pub fn field_offset(&self, name: &str, field: &str) -> CoderResult<Option<usize>> {
        let entry = self.inner.entry(name)?;
        let EntryBody::Layout(Layout::Defined(id)) = &entry.body else {
            return Ok(None);
        };
        let registry = self.inner.registry();
        let TypeDefLayout::Struct(fields) = &registry.get(*id).def else {
            return Ok(None);
        };
        let info = registry
            .field_infos(fields)
            .into_iter()
            .find(|f| f.name.as_deref() == Some(field))
            .ok_or_else(|| CoderError::invalid_argument(format!("account `{name}` has no field `{field}`")))?;
        Ok(info.offset.map(|offset| DISCRIMINATOR_LEN + offset))
    }
}
