//! Command functions against the counter fixture.

use idlkit_cli::commands::{self, Target};
use idlkit_cli::error::CliError;
use idlkit_cli::hex::hex_encode;
use idlkit_cli::pda::{compute_pda_from_idl, compute_pda_from_specs, IdlPdaRequest};
use idlkit_core::coder::BorshCoder;
use idlkit_core::idl::Idl;
use idlkit_core::pda::{self, PdaSeed};
use idlkit_core::pubkey::Pubkey;
use serde_json::json;

const COUNTER_IDL: &str = include_str!("../../idlkit-core/tests/fixtures/counter.json");
const PROGRAM: &str = "US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx";

fn coder() -> (Idl, BorshCoder) {
    let idl = Idl::from_json(COUNTER_IDL).unwrap();
    let coder = BorshCoder::new(&idl).unwrap();
    (idl, coder)
}

#[test]
fn test_load_idl_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("counter.json");
    std::fs::write(&path, COUNTER_IDL).unwrap();
    let (idl, coder) = commands::load_coder(&path).unwrap();
    assert_eq!(idl.program_name(), Some("counter"));
    assert_eq!(coder.accounts().len(), 2);

    let missing = commands::load_idl(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(missing, CliError::Io { .. }));
}

#[test]
fn test_encode_account_from_json() {
    let (_, coder) = coder();
    let bytes = commands::encode(
        &coder,
        Target::Account,
        "Data",
        &json!({"id": 123, "name": "test", "isActive": true}),
    )
    .unwrap();
    assert_eq!(
        hex_encode(&bytes),
        "01020304050607087b00000000000000040000007465737401"
    );
    assert_eq!(commands::format_bytes(&bytes[..8], true), "AQIDBAUGBwg=");
}

#[test]
fn test_decode_named_and_by_discriminator() {
    let (_, coder) = coder();
    let data = idlkit_cli::hex::hex_decode("01020304050607087b00000000000000040000007465737401").unwrap();

    let (name, value) = commands::decode(&coder, Target::Account, Some("Data"), &data).unwrap();
    assert_eq!(name, "Data");
    assert_eq!(
        commands::decoded_json(&name, &value),
        json!({"name": "Data", "data": {"id": 123, "name": "test", "isActive": true}})
    );

    let (name, _) = commands::decode(&coder, Target::Account, None, &data).unwrap();
    assert_eq!(name, "Data");

    assert!(matches!(
        commands::decode(&coder, Target::Type, None, &data),
        Err(CliError::Usage(_))
    ));
}

#[test]
fn test_instruction_roundtrip() {
    let (_, coder) = coder();
    let bytes = commands::encode(&coder, Target::Instruction, "increment", &json!({"amount": 5, "index": 2})).unwrap();
    assert_eq!(&bytes[..8], &[11, 18, 104, 9, 104, 174, 59, 33]);
    let (name, value) = commands::decode(&coder, Target::Instruction, None, &bytes).unwrap();
    assert_eq!(name, "increment");
    assert_eq!(value.to_json(), json!({"amount": 5, "index": 2}));
}

#[test]
fn test_size_and_memcmp() {
    let (_, coder) = coder();
    assert_eq!(commands::size(&coder, "Data").unwrap(), 18);
    let filter = commands::memcmp(&coder, "Data", Some("0909")).unwrap();
    assert_eq!(filter.offset, 0);
    assert_eq!(filter.bytes, "AQIDBAUGBwgJCQ==");
    assert!(commands::memcmp(&coder, "Data", Some("xyz")).is_err());
}

#[test]
fn test_pda_from_specs_matches_core() {
    let out = compute_pda_from_specs(PROGRAM, &["string:vault".to_string(), "u16:2".to_string()]).unwrap();
    let expected = pda::find_program_address(
        &[PdaSeed::str("vault"), PdaSeed::number(2, 2)],
        &Pubkey::new_from_array([7; 32]),
    )
    .unwrap();
    assert_eq!(out.address, expected.address.to_string());
    assert_eq!(out.bump, expected.bump);
    assert_eq!(out.seeds, vec!["7661756c74".to_string(), "0200".to_string()]);
}

#[test]
fn test_pda_from_idl_matches_specs() {
    let (idl, coder) = coder();
    let args = json!({"index": 2});
    let req = IdlPdaRequest {
        instruction: "increment",
        account: "vault",
        args: Some(&args),
        ..Default::default()
    };
    let from_idl = compute_pda_from_idl(&idl, &coder, &req).unwrap();
    let from_specs = compute_pda_from_specs(PROGRAM, &["string:vault".to_string(), "u16:2".to_string()]).unwrap();
    assert_eq!(from_idl.address, from_specs.address);
    assert_eq!(from_idl.bump, from_specs.bump);
}

#[test]
fn test_pda_from_idl_with_account_key() {
    let (idl, coder) = coder();
    let authority = Pubkey::new_from_array([3; 32]);
    let keys = vec![format!("authority={}", authority)];
    let req = IdlPdaRequest {
        instruction: "initialize",
        account: "counter",
        keys: &keys,
        ..Default::default()
    };
    let out = compute_pda_from_idl(&idl, &coder, &req).unwrap();
    let expected = pda::find_program_address(
        &[PdaSeed::str("counter"), PdaSeed::Pubkey(authority)],
        &Pubkey::new_from_array([7; 32]),
    )
    .unwrap();
    assert_eq!(out.address, expected.address.to_string());

    // without the key the seed cannot be satisfied
    let req = IdlPdaRequest {
        instruction: "initialize",
        account: "counter",
        ..Default::default()
    };
    assert!(compute_pda_from_idl(&idl, &coder, &req).is_err());
}

#[test]
fn test_idl_summary_lists_entries() {
    let (idl, coder) = coder();
    let summary = idlkit_cli::cli::idl_summary(&idl, &coder);
    assert!(summary.starts_with("counter\n"));
    assert!(summary.contains("increment"));
    assert!(summary.contains("0b12680968ae3b21"));
    assert!(summary.contains("arg     index: u16"));
    assert!(summary.contains("pda(const \"vault\", arg index)"));
    assert!(summary.contains("Data"));
    assert!(summary.contains("(18 bytes)"));
    assert!(summary.contains("6000"));
}
