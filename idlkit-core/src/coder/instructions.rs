use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::cache::{DiscriminatorCache, PdaCache};
use crate::coder::{DiscriminatedCoder, EntryBody, EntrySpec};
use crate::discriminator::{Discriminator, Namespace};
use crate::error::{CoderError, CoderResult};
use crate::idl::{EntryKind, Idl, IdlInstruction};
use crate::layout::{Fields, TypeRegistry};
use crate::pda::{self, PdaResult, SeedContext};
use crate::pubkey::Pubkey;
use crate::value::IdlValue;

/// Encodes instruction data (discriminator followed by the arguments in
/// declaration order) and derives the PDAs an instruction declares.
#[derive(Debug, Clone)]
pub struct InstructionsCoder {
    inner: DiscriminatedCoder,
    /// Instruction definitions, parallel to the coder's entries.
    instructions: Vec<IdlInstruction>,
    pda_cache: Option<Arc<PdaCache>>,
}

impl InstructionsCoder {
    pub fn new(idl: &Idl) -> CoderResult<Self> {
        let registry = Arc::new(TypeRegistry::from_idl(idl)?);
        Self::build(idl, registry, &DiscriminatorCache::default())
    }

    pub(crate) fn build(idl: &Idl, registry: Arc<TypeRegistry>, cache: &DiscriminatorCache) -> CoderResult<Self> {
        let mut specs = Vec::with_capacity(idl.instructions.len());
        for ix in &idl.instructions {
            let args = registry.named_fields(&ix.args, &ix.name)?;
            let fields = if args.is_empty() { Fields::Unit } else { Fields::Named(args) };
            specs.push(EntrySpec {
                name: ix.name.clone(),
                explicit: ix.discriminator.clone(),
                body: EntryBody::Fields(fields),
            });
        }
        Ok(Self {
            inner: DiscriminatedCoder::build(EntryKind::Instruction, Namespace::Global, registry, specs, cache)?,
            instructions: idl.instructions.clone(),
            pda_cache: None,
        })
    }

    /// Route PDA derivation through `cache`.
    pub fn with_pda_cache(mut self, cache: Arc<PdaCache>) -> Self {
        self.pda_cache = Some(cache);
        self
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

    pub fn instruction(&self, name: &str) -> CoderResult<&IdlInstruction> {
        self.instructions
            .iter()
            .find(|ix| ix.name == name)
            .ok_or_else(|| CoderError::UnknownName {
                kind: EntryKind::Instruction,
                name: name.to_string(),
            })
    }

    /// Encode with `args` as a struct keyed by argument name.
    pub fn encode(&self, name: &str, args: &IdlValue) -> CoderResult<Vec<u8>> {
        self.inner.encode(name, args)
    }

    /// Encode with arguments given positionally, in declaration order.
    pub fn encode_args(&self, name: &str, args: &[IdlValue]) -> CoderResult<Vec<u8>> {
        let ix = self.instruction(name)?;
        if args.len() != ix.args.len() {
            return Err(CoderError::invalid_argument(format!(
                "instruction `{name}` takes {} arguments, got {}",
                ix.args.len(),
                args.len()
            )));
        }
        let named: BTreeMap<String, IdlValue> = ix
            .args
            .iter()
            .zip(args)
            .map(|(field, value)| (field.name.clone(), value.clone()))
            .collect();
        self.inner.encode(name, &IdlValue::Struct(named))
    }

    pub fn decode(&self, name: &str, data: &[u8]) -> CoderResult<IdlValue> {
        self.inner.decode(name, data, None)
    }

    pub fn decode_unchecked(&self, name: &str, data: &[u8]) -> CoderResult<IdlValue> {
        self.inner.decode_unchecked(name, data)
    }

    /// Identify and decode instruction data, returning the instruction
    /// name with its arguments.
    pub fn decode_any(&self, data: &[u8]) -> CoderResult<(String, IdlValue)> {
        self.inner.decode_any(data)
    }

    pub fn value_from_json(&self, name: &str, json: &serde_json::Value) -> CoderResult<IdlValue> {
        self.inner.value_from_json(name, json)
    }

    pub fn discriminator(&self, name: &str) -> CoderResult<Discriminator> {
        self.inner.discriminator(name)
    }

    // ─── PDA resolution ──────────────────────────────────────────

    /// Derive the address of `account` in instruction `name` from its
    /// declared seeds.
    pub fn resolve_pda(
        &self,
        name: &str,
        account: &str,
        ctx: &SeedContext,
        program_id: &Pubkey,
    ) -> CoderResult<PdaResult> {
        let ix = self.instruction(name)?;
        let item = ix
            .flat_accounts()
            .into_iter()
            .find(|a| a.name == account)
            .ok_or_else(|| CoderError::invalid_argument(format!("instruction `{name}` has no account `{account}`")))?;
        let declared = item
            .pda
            .as_ref()
            .ok_or_else(|| CoderError::invalid_argument(format!("account `{account}` of `{name}` is not a PDA")))?;

        let seeds = pda::seeds_from_idl(declared, ctx)?;
        let program = pda::program_from_idl(declared, ctx, program_id)?;
        let result = match &self.pda_cache {
            Some(cache) => cache.find_program_address(&seeds, &program)?,
            None => pda::find_program_address(&seeds, &program)?,
        };
        debug!(instruction = name, account, address = %result.address, bump = result.bump, "resolved pda");
        Ok(result)
    }

    /// Derive every PDA of an instruction whose seeds can be satisfied
    /// from `ctx`. Each resolved address is added to the context as it is
    /// found, so later seeds may reference earlier PDAs.
    pub fn resolve_pdas(
        &self,
        name: &str,
        ctx: &SeedContext,
        program_id: &Pubkey,
    ) -> CoderResult<Vec<(String, PdaResult)>> {
        let ix = self.instruction(name)?;
        let mut ctx = ctx.clone();
        let mut pending: Vec<&str> = ix
            .flat_accounts()
            .into_iter()
            .filter(|a| a.pda.is_some() && !ctx.accounts.contains_key(&a.name))
            .map(|a| a.name.as_str())
            .collect();
        let mut resolved = Vec::new();

        // Repeat until a pass makes no progress.
        loop {
            let before = pending.len();
            let mut still_pending = Vec::new();
            for account in pending {
                match self.resolve_pda(name, account, &ctx, program_id) {
                    Ok(result) => {
                        ctx.accounts.insert(account.to_string(), result.address);
                        resolved.push((account.to_string(), result));
                    }
                    Err(CoderError::Pda(crate::error::PdaError::MissingSeedInput { .. })) => {
                        still_pending.push(account)
                    }
                    Err(err) => return Err(err),
                }
            }
            pending = still_pending;
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }
        Ok(resolved)
    }
}
