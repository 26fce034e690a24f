//! Command implementations shared by the binary and the tests.
//!
//! Each function takes parsed inputs and returns the text or bytes to
//! print, leaving process concerns (exit codes, stdout) to `main`.

use std::fs;
use std::path::Path;

use idlkit_core::coder::{BorshCoder, MemcmpFilter};
use idlkit_core::discriminator::{self, Discriminator, Namespace};
use idlkit_core::idl::Idl;
use idlkit_core::value::IdlValue;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{CliError, CliResult};
use crate::hex::{decode_data, encode_base64, hex_decode, hex_encode};

/// Which table of the IDL a name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Target {
    Account,
    Instruction,
    Event,
    Type,
}

pub fn load_idl(path: &Path) -> CliResult<Idl> {
    let bytes = fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let idl = Idl::from_slice(&bytes)?;
    debug!(path = %path.display(), "loaded idl");
    Ok(idl)
}

pub fn load_coder(path: &Path) -> CliResult<(Idl, BorshCoder)> {
    let idl = load_idl(path)?;
    let coder = BorshCoder::new(&idl)?;
    Ok((idl, coder))
}

/// Discriminator for `namespace:name`. `instruction` is accepted as an
/// alias of the `global` namespace; any other prefix is hashed as given.
pub fn discriminator(namespace: &str, name: &str) -> CliResult<Discriminator> {
    let disc = match namespace {
        "account" => discriminator::compute(Namespace::Account, name)?,
        "global" | "instruction" => discriminator::compute(Namespace::Global, name)?,
        "event" => discriminator::compute(Namespace::Event, name)?,
        other => discriminator::compute_with_prefix(other, name)?,
    };
    Ok(disc)
}

pub fn format_discriminator(disc: &Discriminator) -> String {
    let list: Vec<String> = disc.iter().map(|b| b.to_string()).collect();
    format!("{}\n[{}]", hex_encode(disc), list.join(", "))
}

pub fn encode(coder: &BorshCoder, target: Target, name: &str, json: &Value) -> CliResult<Vec<u8>> {
    let bytes = match target {
        Target::Account => {
            let value = coder.accounts().value_from_json(name, json)?;
            coder.accounts().encode(name, &value)?
        }
        Target::Instruction => {
            let value = coder.instructions().value_from_json(name, json)?;
            coder.instructions().encode(name, &value)?
        }
        Target::Event => {
            let value = coder.events().value_from_json(name, json)?;
            coder.events().encode(name, &value)?
        }
        Target::Type => {
            let value = coder.types().value_from_json(name, json)?;
            coder.types().encode(name, &value)?
        }
    };
    Ok(bytes)
}

pub fn format_bytes(bytes: &[u8], base64: bool) -> String {
    if base64 {
        encode_base64(bytes)
    } else {
        hex_encode(bytes)
    }
}

/// Decode `data` as `name`, or by discriminator when no name is given.
pub fn decode(coder: &BorshCoder, target: Target, name: Option<&str>, data: &[u8]) -> CliResult<(String, IdlValue)> {
    let decoded = match (target, name) {
        (Target::Account, Some(name)) => (name.to_string(), coder.accounts().decode(name, data)?),
        (Target::Account, None) => coder.accounts().decode_any(data)?,
        (Target::Instruction, Some(name)) => (name.to_string(), coder.instructions().decode(name, data)?),
        (Target::Instruction, None) => coder.instructions().decode_any(data)?,
        (Target::Event, Some(name)) => (name.to_string(), coder.events().decode(name, data)?),
        (Target::Event, None) => coder.events().decode_any(data)?,
        (Target::Type, Some(name)) => (name.to_string(), coder.types().decode(name, data)?),
        (Target::Type, None) => {
            return Err(CliError::usage("plain types carry no discriminator; pass a type name"));
        }
    };
    Ok(decoded)
}

/// Split the positional inputs of `decode` into an optional name and the
/// encoded data.
pub fn split_decode_inputs(inputs: &[String]) -> CliResult<(Option<&str>, Vec<u8>)> {
    match inputs {
        [data] => Ok((None, decode_data(data)?)),
        [name, data] => Ok((Some(name.as_str()), decode_data(data)?)),
        _ => Err(CliError::usage("expected [NAME] DATA")),
    }
}

/// Decode a `Program data:` log line. `None` when the line carries no
/// event of this program.
pub fn decode_log(coder: &BorshCoder, line: &str) -> CliResult<Option<(String, IdlValue)>> {
    Ok(coder.events().decode_log(line)?)
}

pub fn decoded_json(name: &str, value: &IdlValue) -> Value {
    json!({ "name": name, "data": value.to_json() })
}

pub fn size(coder: &BorshCoder, account: &str) -> CliResult<usize> {
    Ok(coder.accounts().size(account)?)
}

pub fn memcmp(coder: &BorshCoder, account: &str, append: Option<&str>) -> CliResult<MemcmpFilter> {
    let append = append.map(hex_decode).transpose()?;
    Ok(coder.accounts().memcmp(account, append.as_deref())?)
}
