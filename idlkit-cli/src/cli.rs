//! IDL summary and naming helpers.

use std::fmt::Write;

use idlkit_core::coder::BorshCoder;
use idlkit_core::idl::{Idl, IdlInstruction, IdlSeed, IdlSeedValue};

use crate::hex::hex_encode;

pub fn snake_to_kebab(s: &str) -> String {
    s.replace('_', "-")
}

/// Human-readable overview of a program: instructions with their
/// accounts and arguments, then accounts, events and types.
pub fn idl_summary(idl: &Idl, coder: &BorshCoder) -> String {
    let mut out = String::new();
    let name = idl.program_name().unwrap_or("<unnamed>");
    let _ = writeln!(out, "{}", name);
    if let Some(address) = idl.program_address() {
        let _ = writeln!(out, "  address: {}", address);
    }

    let _ = writeln!(out, "\nINSTRUCTIONS:");
    for ix in &idl.instructions {
        let disc = coder
            .instructions()
            .discriminator(&ix.name)
            .map(|d| hex_encode(&d))
            .unwrap_or_default();
        let _ = writeln!(out, "  {:<24} {}", snake_to_kebab(&ix.name), disc);
        instruction_detail(&mut out, ix);
    }

    let _ = writeln!(out, "\nACCOUNTS:");
    for name in coder.accounts().names() {
        let disc = coder
            .accounts()
            .discriminator(name)
            .map(|d| hex_encode(&d))
            .unwrap_or_default();
        match coder.accounts().size(name) {
            Ok(size) => {
                let _ = writeln!(out, "  {:<24} {} ({} bytes)", name, disc, size);
            }
            Err(_) => {
                let _ = writeln!(out, "  {:<24} {}", name, disc);
            }
        }
    }

    let _ = writeln!(out, "\nEVENTS:");
    for name in coder.events().names() {
        let disc = coder
            .events()
            .discriminator(name)
            .map(|d| hex_encode(&d))
            .unwrap_or_default();
        let _ = writeln!(out, "  {:<24} {}", name, disc);
    }

    let _ = writeln!(out, "\nTYPES:");
    for ty in coder.registry().iter() {
        let class = if ty.is_fixed_size {
            format!("fixed {} bytes", ty.min_size)
        } else {
            format!("min {} bytes", ty.min_size)
        };
        let _ = writeln!(out, "  {:<24} {}", ty.name, class);
    }

    if !idl.errors.is_empty() {
        let _ = writeln!(out, "\nERRORS:");
        for err in &idl.errors {
            let msg = err.msg.as_deref().unwrap_or("");
            let _ = writeln!(out, "  {:<6} {:<18} {}", err.code, err.name, msg);
        }
    }
    out
}

fn instruction_detail(out: &mut String, ix: &IdlInstruction) {
    for acc in ix.flat_accounts() {
        let mut flags = vec![];
        if acc.writable {
            flags.push("mut");
        }
        if acc.signer {
            flags.push("signer");
        }
        if acc.optional {
            flags.push("optional");
        }
        let flags_str = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        let pda_note = match &acc.pda {
            Some(pda) => format!(" pda({})", seed_list(&pda.seeds)),
            None => String::new(),
        };
        let _ = writeln!(out, "      account {}{}{}", acc.name, flags_str, pda_note);
    }
    for arg in &ix.args {
        let _ = writeln!(out, "      arg     {}: {}", arg.name, arg.ty);
    }
}

fn seed_list(seeds: &[IdlSeed]) -> String {
    seeds
        .iter()
        .map(|seed| match seed {
            IdlSeed::Const { value, .. } => format!("const {}", const_display(value)),
            IdlSeed::Arg { path, .. } => format!("arg {}", path),
            IdlSeed::Account { path, .. } => format!("account {}", path),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn const_display(value: &IdlSeedValue) -> String {
    match value {
        IdlSeedValue::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) if s.chars().all(|c| c.is_ascii_graphic() || c == ' ') => format!("{:?}", s),
            _ => format!("0x{}", hex_encode(bytes)),
        },
        IdlSeedValue::Str(s) => format!("{:?}", s),
        IdlSeedValue::Number(n) => n.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_to_kebab() {
        assert_eq!(snake_to_kebab("set_admin_key"), "set-admin-key");
    }
}
