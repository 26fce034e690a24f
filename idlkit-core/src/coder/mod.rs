//! Discriminator-aware coders for accounts, instructions and events.
//!
//! Every coder is built once from an [`Idl`]: names are indexed,
//! discriminators computed (or taken from the IDL) and layouts resolved
//! up front. After construction a coder is immutable and can be shared
//! across threads.

mod accounts;
mod events;
mod instructions;
mod types;

use std::collections::HashMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as Base64Engine;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use accounts::AccountsCoder;
pub use events::EventsCoder;
pub use instructions::InstructionsCoder;
pub use types::TypesCoder;

use crate::cache::{CacheConfig, DiscriminatorCache, PdaCache};
use crate::codec::BorshCodec;
use crate::discriminator::{self, Discriminator, Namespace, DISCRIMINATOR_LEN};
use crate::error::{CoderError, CoderResult, SchemaError};
use crate::idl::{EntryKind, Idl};
use crate::layout::{Fields, Layout, TypeRegistry};
use crate::pubkey::Pubkey;
use crate::value::{self, IdlValue};

/// Cache settings for a [`BorshCoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoderConfig {
    pub discriminator_cache: CacheConfig,
    pub pda_cache: CacheConfig,
}

/// RPC `memcmp` filter selecting accounts of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemcmpFilter {
    /// Always 0: the discriminator leads the account data.
    pub offset: usize,
    /// Base64 of the discriminator followed by any appended bytes.
    pub bytes: String,
}

// ─── Shared machinery ────────────────────────────────────────────

/// What follows the discriminator.
#[derive(Debug, Clone)]
pub(crate) enum EntryBody {
    /// A named type (accounts, events).
    Layout(Layout),
    /// A bare field list (instruction arguments).
    Fields(Fields),
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub name: String,
    pub discriminator: Discriminator,
    pub body: EntryBody,
}

/// An entry as declared in the IDL, before its discriminator is settled.
pub(crate) struct EntrySpec {
    pub name: String,
    pub explicit: Option<Vec<u8>>,
    pub body: EntryBody,
}

/// Name-indexed entries of one category, in schema order.
#[derive(Debug, Clone)]
pub(crate) struct DiscriminatedCoder {
    kind: EntryKind,
    registry: Arc<TypeRegistry>,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl DiscriminatedCoder {
    pub fn build(
        kind: EntryKind,
        namespace: Namespace,
        registry: Arc<TypeRegistry>,
        specs: Vec<EntrySpec>,
        cache: &DiscriminatorCache,
    ) -> CoderResult<Self> {
        let mut entries = Vec::with_capacity(specs.len());
        let mut index = HashMap::with_capacity(specs.len());
        let mut seen: HashMap<Discriminator, String> = HashMap::new();

        for spec in specs {
            if index.contains_key(&spec.name) {
                return Err(SchemaError::DuplicateName { kind, name: spec.name }.into());
            }
            let derived = cache.get_or_compute(namespace, &spec.name)?;
            let discriminator = match &spec.explicit {
                Some(bytes) => {
                    let explicit = discriminator::from_slice(bytes).ok_or_else(|| SchemaError::InvalidDiscriminator {
                        kind,
                        name: spec.name.clone(),
                        len: bytes.len(),
                    })?;
                    if explicit != derived {
                        debug!(%kind, name = %spec.name, ?explicit, ?derived, "explicit discriminator differs from derived");
                    }
                    explicit
                }
                None => derived,
            };
            if let Some(other) = seen.insert(discriminator, spec.name.clone()) {
                warn!(%kind, first = %other, second = %spec.name, ?discriminator, "entries share a discriminator");
            }
            index.insert(spec.name.clone(), entries.len());
            entries.push(Entry {
                name: spec.name,
                discriminator,
                body: spec.body,
            });
        }

        debug!(%kind, entries = entries.len(), "built coder");
        Ok(Self {
            kind,
            registry,
            entries,
            index,
        })
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn codec(&self) -> BorshCodec<'_> {
        BorshCodec::new(&self.registry)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn entry(&self, name: &str) -> CoderResult<&Entry> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| CoderError::UnknownName {
                kind: self.kind,
                name: name.to_string(),
            })
    }

    pub fn discriminator(&self, name: &str) -> CoderResult<Discriminator> {
        Ok(self.entry(name)?.discriminator)
    }

    pub fn encode(&self, name: &str, value: &IdlValue) -> CoderResult<Vec<u8>> {
        let entry = self.entry(name)?;
        let codec = self.codec();
        let body = match &entry.body {
            EntryBody::Layout(layout) => codec.encode(value, layout),
            EntryBody::Fields(fields) => codec.encode_fields(value, fields),
        }
        .map_err(|source| CoderError::Encode {
            name: name.to_string(),
            source,
        })?;
        let mut out = Vec::with_capacity(DISCRIMINATOR_LEN + body.len());
        out.extend_from_slice(&entry.discriminator);
        out.extend_from_slice(&body);
        Ok(out)
    }

    pub fn decode(&self, name: &str, data: &[u8], account: Option<Pubkey>) -> CoderResult<IdlValue> {
        let entry = self.entry(name)?;
        if data.len() < DISCRIMINATOR_LEN || data[..DISCRIMINATOR_LEN] != entry.discriminator {
            return Err(CoderError::DiscriminatorMismatch {
                kind: self.kind,
                name: name.to_string(),
                expected: entry.discriminator,
                actual: data[..data.len().min(DISCRIMINATOR_LEN)].to_vec(),
                account,
            });
        }
        self.decode_body(entry, data)
    }

    /// Skip the discriminator comparison but still strip its 8 bytes.
    pub fn decode_unchecked(&self, name: &str, data: &[u8]) -> CoderResult<IdlValue> {
        let entry = self.entry(name)?;
        if data.len() < DISCRIMINATOR_LEN {
            return Err(CoderError::DiscriminatorMismatch {
                kind: self.kind,
                name: name.to_string(),
                expected: entry.discriminator,
                actual: data.to_vec(),
                account: None,
            });
        }
        self.decode_body(entry, data)
    }

    /// Try every entry in schema order. A structural failure of one
    /// candidate moves on to the next; it is reported only when nothing
    /// else decodes.
    pub fn decode_any(&self, data: &[u8]) -> CoderResult<(String, IdlValue)> {
        let no_match = || CoderError::NoMatchingDiscriminator {
            kind: self.kind,
            actual: data[..data.len().min(DISCRIMINATOR_LEN)].to_vec(),
        };
        if data.len() < DISCRIMINATOR_LEN {
            return Err(no_match());
        }
        let mut first_failure = None;
        for entry in self
            .entries
            .iter()
            .filter(|e| data[..DISCRIMINATOR_LEN] == e.discriminator)
        {
            match self.decode_body(entry, data) {
                Ok(value) => return Ok((entry.name.clone(), value)),
                Err(err) => {
                    debug!(kind = %self.kind, name = %entry.name, error = %err, "candidate did not decode");
                    first_failure.get_or_insert(err);
                }
            }
        }
        Err(first_failure.unwrap_or_else(no_match))
    }

    fn decode_body(&self, entry: &Entry, data: &[u8]) -> CoderResult<IdlValue> {
        let codec = self.codec();
        let decoded = match &entry.body {
            EntryBody::Layout(layout) => codec.decode(data, DISCRIMINATOR_LEN, layout),
            EntryBody::Fields(fields) => codec.decode_fields(data, DISCRIMINATOR_LEN, fields),
        };
        decoded
            .map(|(value, _)| value)
            .map_err(|source| CoderError::DidNotDeserialize {
                type_name: entry.name.clone(),
                len: data.len(),
                source,
            })
    }

    /// Convert JSON into the value shape an entry expects.
    pub fn value_from_json(&self, name: &str, json: &serde_json::Value) -> CoderResult<IdlValue> {
        let entry = self.entry(name)?;
        match &entry.body {
            EntryBody::Layout(layout) => value::from_json(json, layout, &self.registry),
            EntryBody::Fields(fields) => value::fields_from_json(json, fields, &self.registry),
        }
        .map_err(|source| CoderError::Encode {
            name: name.to_string(),
            source,
        })
    }

    pub fn memcmp(&self, name: &str, append: Option<&[u8]>) -> CoderResult<MemcmpFilter> {
        let mut bytes = self.discriminator(name)?.to_vec();
        if let Some(extra) = append {
            bytes.extend_from_slice(extra);
        }
        Ok(MemcmpFilter {
            offset: 0,
            bytes: Base64Engine.encode(bytes),
        })
    }

    /// Discriminator plus the allocation size of the body.
    pub fn size(&self, name: &str) -> CoderResult<usize> {
        let entry = self.entry(name)?;
        let body = match &entry.body {
            EntryBody::Layout(layout) => self.registry.allocation_size(layout),
            EntryBody::Fields(fields) => self.registry.fields_allocation_size(fields),
        };
        body.and_then(|size| size.checked_add(DISCRIMINATOR_LEN)).ok_or_else(|| {
            CoderError::invalid_argument(format!("{} `{name}` is recursive and has no allocation size", self.kind))
        })
    }
}

// ─── BorshCoder ──────────────────────────────────────────────────

/// All coders of one program, sharing a type registry and caches.
#[derive(Debug, Clone)]
pub struct BorshCoder {
    registry: Arc<TypeRegistry>,
    accounts: AccountsCoder,
    instructions: InstructionsCoder,
    events: EventsCoder,
    types: TypesCoder,
    discriminator_cache: Arc<DiscriminatorCache>,
    pda_cache: Arc<PdaCache>,
}

impl BorshCoder {
    pub fn new(idl: &Idl) -> CoderResult<Self> {
        Self::with_config(idl, CoderConfig::default())
    }

    pub fn with_config(idl: &Idl, config: CoderConfig) -> CoderResult<Self> {
        Self::with_caches(
            idl,
            Arc::new(DiscriminatorCache::new(config.discriminator_cache)?),
            Arc::new(PdaCache::new(config.pda_cache)?),
        )
    }

    /// Build on caches owned by the caller, e.g. shared between programs.
    pub fn with_caches(
        idl: &Idl,
        discriminator_cache: Arc<DiscriminatorCache>,
        pda_cache: Arc<PdaCache>,
    ) -> CoderResult<Self> {
        let registry = Arc::new(TypeRegistry::from_idl(idl)?);
        let accounts = AccountsCoder::build(idl, registry.clone(), &discriminator_cache)?;
        let instructions =
            InstructionsCoder::build(idl, registry.clone(), &discriminator_cache)?.with_pda_cache(pda_cache.clone());
        let events = EventsCoder::build(idl, registry.clone(), &discriminator_cache)?;
        let types = TypesCoder::new(registry.clone());
        debug!(
            program = idl.program_name().unwrap_or("<unnamed>"),
            accounts = accounts.len(),
            instructions = instructions.len(),
            events = events.len(),
            types = registry.len(),
            "built program coder"
        );
        Ok(Self {
            registry,
            accounts,
            instructions,
            events,
            types,
            discriminator_cache,
            pda_cache,
        })
    }

    pub fn accounts(&self) -> &AccountsCoder {
        &self.accounts
    }

    pub fn instructions(&self) -> &InstructionsCoder {
        &self.instructions
    }

    pub fn events(&self) -> &EventsCoder {
        &self.events
    }

    pub fn types(&self) -> &TypesCoder {
        &self.types
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn discriminator_cache(&self) -> &Arc<DiscriminatorCache> {
        &self.discriminator_cache
    }

    pub fn pda_cache(&self) -> &Arc<PdaCache> {
        &self.pda_cache
    }
}
