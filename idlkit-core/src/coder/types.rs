use std::sync::Arc;

use crate::codec::BorshCodec;
use crate::error::{CoderError, CoderResult};
use crate::idl::EntryKind;
use crate::layout::{Layout, LayoutInfo, TypeRegistry};
use crate::value::{self, IdlValue};

/// Plain Borsh coding of named types, with no discriminator.
#[derive(Debug, Clone)]
pub struct TypesCoder {
    registry: Arc<TypeRegistry>,
}

impl TypesCoder {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registry.iter().map(|t| t.name.as_str())
    }

    pub fn layout(&self, name: &str) -> CoderResult<Layout> {
        self.registry
            .id(name)
            .map(Layout::Defined)
            .ok_or_else(|| CoderError::UnknownName {
                kind: EntryKind::Type,
                name: name.to_string(),
            })
    }

    pub fn encode(&self, name: &str, value: &IdlValue) -> CoderResult<Vec<u8>> {
        let layout = self.layout(name)?;
        BorshCodec::new(&self.registry)
            .encode(value, &layout)
            .map_err(|source| CoderError::Encode {
                name: name.to_string(),
                source,
            })
    }

    pub fn decode(&self, name: &str, data: &[u8]) -> CoderResult<IdlValue> {
        let layout = self.layout(name)?;
        BorshCodec::new(&self.registry)
            .decode(data, 0, &layout)
            .map(|(value, _)| value)
            .map_err(|source| CoderError::DidNotDeserialize {
                type_name: name.to_string(),
                len: data.len(),
                source,
            })
    }

    pub fn value_from_json(&self, name: &str, json: &serde_json::Value) -> CoderResult<IdlValue> {
        let layout = self.layout(name)?;
        value::from_json(json, &layout, &self.registry).map_err(|source| CoderError::Encode {
            name: name.to_string(),
            source,
        })
    }

    /// Size class and structure of a named type.
    pub fn layout_info(&self, name: &str) -> CoderResult<LayoutInfo> {
        Ok(self.registry.resolve(&self.layout(name)?))
    }

    /// Allocation size of a named type under the reference client's
    /// convention.
    pub fn size(&self, name: &str) -> CoderResult<usize> {
        self.registry
            .allocation_size(&self.layout(name)?)
            .ok_or_else(|| CoderError::invalid_argument(format!("type `{name}` is recursive and has no allocation size")))
    }
}
