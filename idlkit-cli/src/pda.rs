//! PDA derivation from seed specs or from an instruction's declared seeds.

use idlkit_core::coder::BorshCoder;
use idlkit_core::idl::Idl;
use idlkit_core::pda::{self, PdaResult, SeedContext};
use idlkit_core::pubkey::Pubkey;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CliError, CliResult};
use crate::hex::{decode_pubkey, hex_encode};
use crate::parse::{parse_assignment, parse_seed, partial_args};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdaOutput {
    pub address: String,
    pub bump: u8,
    /// Hex of each encoded seed, bump excluded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub seeds: Vec<String>,
}

impl From<PdaResult> for PdaOutput {
    fn from(result: PdaResult) -> Self {
        Self {
            address: result.address.to_string(),
            bump: result.bump,
            seeds: vec![],
        }
    }
}

/// Derive from `kind:value` seed specs.
pub fn compute_pda_from_specs(program: &str, specs: &[String]) -> CliResult<PdaOutput> {
    let program_id = decode_pubkey(program)?;
    let seeds = specs.iter().map(|s| parse_seed(s)).collect::<CliResult<Vec<_>>>()?;
    let encoded = pda::encode_seeds(&seeds)?;
    let result = pda::find_program_address(&seeds, &program_id)?;
    Ok(PdaOutput {
        seeds: encoded.iter().map(|s| hex_encode(s)).collect(),
        ..PdaOutput::from(result)
    })
}

/// Inputs for deriving an instruction account from its IDL seeds.
#[derive(Debug, Default)]
pub struct IdlPdaRequest<'a> {
    pub instruction: &'a str,
    pub account: &'a str,
    /// JSON object with (some of) the instruction arguments.
    pub args: Option<&'a Value>,
    /// `name=KEY` assignments for accounts the seeds reference.
    pub keys: &'a [String],
    /// Overrides the IDL's program address.
    pub program: Option<&'a str>,
}

pub fn compute_pda_from_idl(idl: &Idl, coder: &BorshCoder, req: &IdlPdaRequest<'_>) -> CliResult<PdaOutput> {
    let program_id = match req.program.or(idl.program_address()) {
        Some(program) => decode_pubkey(program)?,
        None => return Err(CliError::usage("the IDL has no program address; pass --program")),
    };
    let ix = coder.instructions().instruction(req.instruction)?;

    let mut ctx = SeedContext::new();
    if let Some(args) = req.args {
        for (name, value) in partial_args(coder, ix, args)? {
            ctx = ctx.with_arg(name, value);
        }
    }
    for assignment in req.keys {
        let (name, key) = parse_assignment(assignment)?;
        let key: Pubkey = decode_pubkey(&key)?;
        ctx = ctx.with_account(name, key);
    }

    // Seeds may refer to other PDAs of the same instruction.
    for (name, result) in coder.instructions().resolve_pdas(req.instruction, &ctx, &program_id)? {
        if name != req.account {
            ctx = ctx.with_account(name, result.address);
        }
    }
    let result = coder
        .instructions()
        .resolve_pda(req.instruction, req.account, &ctx, &program_id)?;
    Ok(result.into())
}
