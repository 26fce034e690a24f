use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as Base64Engine;
use base64::Engine;
use tracing::trace;

use crate::cache::DiscriminatorCache;
use crate::coder::{DiscriminatedCoder, EntryBody, EntrySpec};
use crate::discriminator::{Discriminator, Namespace};
use crate::error::{CoderError, CoderResult, SchemaError};
use crate::idl::{EntryKind, Idl};
use crate::layout::{Layout, TypeDefLayout, TypeRegistry};
use crate::value::IdlValue;

/// Prefix of the program log line carrying event data.
pub const PROGRAM_DATA_PREFIX: &str = "Program data: ";

/// Decodes events emitted by a program.
#[derive(Debug, Clone)]
pub struct EventsCoder {
    inner: DiscriminatedCoder,
}

impl EventsCoder {
    pub fn new(idl: &Idl) -> CoderResult<Self> {
        let registry = Arc::new(TypeRegistry::from_idl(idl)?);
        Self::build(idl, registry, &DiscriminatorCache::default())
    }

    pub(crate) fn build(idl: &Idl, registry: Arc<TypeRegistry>, cache: &DiscriminatorCache) -> CoderResult<Self> {
        let mut specs = Vec::with_capacity(idl.events.len());
        for event in &idl.events {
            let missing = || SchemaError::MissingTypeDefinition {
                kind: EntryKind::Event,
                name: event.name.clone(),
            };
            let id = registry.id(&event.name).ok_or_else(missing)?;
            if !matches!(registry.get(id).def, TypeDefLayout::Struct(_)) {
                return Err(SchemaError::NotAStruct {
                    kind: EntryKind::Event,
                    name: event.name.clone(),
                }
                .into());
            }
            specs.push(EntrySpec {
                name: event.name.clone(),
                explicit: event.discriminator.clone(),
                body: EntryBody::Layout(Layout::Defined(id)),
            });
        }
        Ok(Self {
            inner: DiscriminatedCoder::build(EntryKind::Event, Namespace::Event, registry, specs, cache)?,
        })
    }

    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries().is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.names()
    }

    pub fn encode(&self, name: &str, value: &IdlValue) -> CoderResult<Vec<u8>> {
        self.inner.encode(name, value)
    }

    pub fn decode(&self, name: &str, data: &[u8]) -> CoderResult<IdlValue> {
        self.inner.decode(name, data, None)
    }

    pub fn decode_unchecked(&self, name: &str, data: &[u8]) -> CoderResult<IdlValue> {
        self.inner.decode_unchecked(name, data)
    }

    pub fn decode_any(&self, data: &[u8]) -> CoderResult<(String, IdlValue)> {
        self.inner.decode_any(data)
    }

    /// Decode one log line. The `Program data: ` prefix is optional; lines
    /// that are not base64 event data, or whose discriminator belongs to
    /// no known event, yield `Ok(None)`.
    pub fn decode_log(&self, line: &str) -> CoderResult<Option<(String, IdlValue)>> {
        let payload = line.strip_prefix(PROGRAM_DATA_PREFIX).unwrap_or(line).trim();
        let Ok(data) = Base64Engine.decode(payload) else {
            trace!(line, "not an event payload");
            return Ok(None);
        };
        if data.len() < crate::discriminator::DISCRIMINATOR_LEN {
            return Ok(None);
        }
        match self.inner.decode_any(&data) {
            Ok(event) => Ok(Some(event)),
            Err(CoderError::NoMatchingDiscriminator { .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn value_from_json(&self, name: &str, json: &serde_json::Value) -> CoderResult<IdlValue> {
        self.inner.value_from_json(name, json)
    }

    pub fn discriminator(&self, name: &str) -> CoderResult<Discriminator> {
        self.inner.discriminator(name)
    }
}
