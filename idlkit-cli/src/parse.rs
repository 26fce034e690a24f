//! Parsing of seed specs and JSON values from command line strings.

use idlkit_core::coder::BorshCoder;
use idlkit_core::error::CoderError;
use idlkit_core::idl::IdlInstruction;
use idlkit_core::pda::PdaSeed;
use idlkit_core::value::{self, IdlValue};
use serde_json::Value;

use crate::error::{CliError, CliResult};
use crate::hex::{decode_pubkey, hex_decode};

/// Parse a `kind:value` seed spec.
///
/// Kinds: `string`, `hex`, `pubkey`, `u8`, `u16`, `u32`, `u64`, `u128`
/// and `bool`. Integers are little-endian at their natural width.
pub fn parse_seed(spec: &str) -> CliResult<PdaSeed> {
    let (kind, raw) = spec
        .split_once(':')
        .ok_or_else(|| CliError::seed(spec, "expected KIND:VALUE"))?;
    let int = |width: usize| -> CliResult<PdaSeed> {
        let value: u128 = raw
            .parse()
            .map_err(|e| CliError::seed(spec, format!("{}", e)))?;
        let seed = match u64::try_from(value) {
            Ok(v) => PdaSeed::number(v, width),
            Err(_) => PdaSeed::big_int(value, width),
        };
        // surfaces overflow for the declared width
        seed.to_bytes()?;
        Ok(seed)
    };
    match kind {
        "string" | "str" => Ok(PdaSeed::str(raw)),
        "hex" | "bytes" => Ok(PdaSeed::bytes(hex_decode(raw)?)),
        "pubkey" => Ok(PdaSeed::Pubkey(decode_pubkey(raw)?)),
        "u8" => int(1),
        "u16" => int(2),
        "u32" => int(4),
        "u64" => int(8),
        "u128" => int(16),
        "bool" => match raw {
            "true" | "1" => Ok(PdaSeed::Bool(true)),
            "false" | "0" => Ok(PdaSeed::Bool(false)),
            _ => Err(CliError::seed(spec, "expected true or false")),
        },
        other => Err(CliError::seed(spec, format!("unknown seed kind `{}`", other))),
    }
}

/// Parse a `name=value` pair.
pub fn parse_assignment(input: &str) -> CliResult<(String, String)> {
    input
        .split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| CliError::usage(format!("expected NAME=VALUE, got `{}`", input)))
}

pub fn parse_json(input: &str) -> CliResult<Value> {
    Ok(serde_json::from_str(input)?)
}

/// Convert the arguments present in a JSON object, leaving out the rest.
///
/// Used where only some arguments are known, e.g. the ones a PDA seed
/// refers to.
pub fn partial_args(coder: &BorshCoder, ix: &IdlInstruction, json: &Value) -> CliResult<Vec<(String, IdlValue)>> {
    let object = json
        .as_object()
        .ok_or_else(|| CliError::usage("instruction arguments must be a JSON object"))?;
    let mut out = Vec::new();
    for arg in &ix.args {
        let Some(raw) = object.get(&arg.name) else {
            continue;
        };
        let layout = coder.registry().layout_of(&arg.ty)?;
        let parsed = value::from_json(raw, &layout, coder.registry()).map_err(|source| CoderError::Encode {
            name: arg.name.clone(),
            source,
        })?;
        out.push((arg.name.clone(), parsed));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed_kinds() {
        assert_eq!(parse_seed("string:counter").unwrap(), PdaSeed::str("counter"));
        assert_eq!(parse_seed("hex:0x0102").unwrap(), PdaSeed::bytes(vec![1, 2]));
        assert_eq!(parse_seed("u16:3").unwrap().to_bytes().unwrap(), vec![3, 0]);
        assert_eq!(parse_seed("u128:1").unwrap().to_bytes().unwrap().len(), 16);
        assert_eq!(parse_seed("bool:true").unwrap(), PdaSeed::Bool(true));
        // the value may itself contain colons
        assert_eq!(parse_seed("string:a:b").unwrap(), PdaSeed::str("a:b"));
    }

    #[test]
    fn test_parse_seed_errors() {
        assert!(matches!(parse_seed("counter"), Err(CliError::Seed { .. })));
        assert!(matches!(parse_seed("i32:1"), Err(CliError::Seed { .. })));
        assert!(matches!(parse_seed("u8:256"), Err(CliError::Pda(_))));
        assert!(matches!(parse_seed("u8:-1"), Err(CliError::Seed { .. })));
        assert!(matches!(parse_seed("bool:maybe"), Err(CliError::Seed { .. })));
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("a=b=c").unwrap(), ("a".to_string(), "b=c".to_string()));
        assert!(parse_assignment("nope").is_err());
    }
}
