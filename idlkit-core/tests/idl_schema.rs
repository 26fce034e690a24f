//! IDL parsing (current and legacy layouts) and construction-time schema
//! validation.

use idlkit_core::coder::BorshCoder;
use idlkit_core::error::{CoderError, SchemaError};
use idlkit_core::idl::{EntryKind, Idl, IdlSeed, IdlSeedValue, IdlType};
use idlkit_core::layout::TypeRegistry;
use idlkit_core::pubkey::Pubkey;
use idlkit_core::value::IdlValue;
use serde_json::json;

const COUNTER_IDL: &str = include_str!("fixtures/counter.json");
const LEGACY_IDL: &str = include_str!("fixtures/legacy.json");

fn schema_error(idl: serde_json::Value) -> SchemaError {
    let idl: Idl = serde_json::from_value(idl).unwrap();
    match BorshCoder::new(&idl) {
        Err(CoderError::Schema(err)) => err,
        Err(other) => panic!("expected schema error, got {other}"),
        Ok(_) => panic!("expected schema error"),
    }
}

#[test]
fn test_parse_current_idl() {
    let idl = Idl::from_json(COUNTER_IDL).unwrap();
    assert_eq!(idl.program_name(), Some("counter"));
    assert_eq!(
        idl.program_address(),
        Some("US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx")
    );
    assert_eq!(idl.instructions.len(), 3);
    assert_eq!(idl.error_by_code(6000).map(|e| e.name.as_str()), Some("Overflow"));
    assert!(idl.error_by_code(1).is_none());

    let increment = idl.instruction("increment").unwrap();
    let names: Vec<&str> = increment.flat_accounts().iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["vault", "counter", "authority"]);

    let seeds = &increment.flat_accounts()[0].pda.as_ref().unwrap().seeds;
    assert!(matches!(&seeds[0], IdlSeed::Const { value: IdlSeedValue::Bytes(b), .. } if b == b"vault"));
    assert!(matches!(&seeds[1], IdlSeed::Arg { ty: Some(IdlType::U16), .. }));
}

#[test]
fn test_parse_legacy_idl() {
    let idl = Idl::from_json(LEGACY_IDL).unwrap();
    assert_eq!(idl.program_name(), Some("legacy_counter"));

    let initialize = idl.instruction("initialize").unwrap();
    let accounts = initialize.flat_accounts();
    assert!(accounts[0].writable && !accounts[0].signer);
    assert!(accounts[1].writable && accounts[1].signer);
    assert_eq!(initialize.args[1].ty, IdlType::Pubkey);
}

#[test]
fn test_legacy_inline_types_resolve() {
    let idl = Idl::from_json(LEGACY_IDL).unwrap();
    let coder = BorshCoder::new(&idl).unwrap();

    // derived discriminators
    assert_eq!(
        coder.instructions().discriminator("initialize").unwrap(),
        [175, 175, 109, 31, 13, 152, 155, 237]
    );
    assert_eq!(
        coder.events().discriminator("Transfer").unwrap(),
        [25, 18, 23, 7, 172, 116, 130, 28]
    );

    let data = IdlValue::structure([
        ("id", IdlValue::U64(1)),
        ("owner", IdlValue::Pubkey(Pubkey::default())),
        (
            "tags",
            IdlValue::Vec(vec![IdlValue::structure([
                ("key", IdlValue::String("a".into())),
                ("weight", IdlValue::U8(3)),
            ])]),
        ),
    ]);
    let bytes = coder.accounts().encode("Data", &data).unwrap();
    assert_eq!(coder.accounts().decode("Data", &bytes).unwrap(), data);
}

#[test]
fn test_idl_type_json_forms() {
    let parse = |v: serde_json::Value| serde_json::from_value::<IdlType>(v).unwrap();
    assert_eq!(parse(json!("publicKey")), IdlType::Pubkey);
    assert_eq!(parse(json!({"vec": "u8"})), IdlType::vec(IdlType::U8));
    assert_eq!(parse(json!({"array": ["u16", 4]})), IdlType::array(IdlType::U16, 4));
    assert_eq!(parse(json!({"option": {"defined": "Foo"}})), IdlType::option(IdlType::defined("Foo")));
    assert_eq!(parse(json!({"defined": {"name": "Foo"}})), IdlType::defined("Foo"));
    assert!(serde_json::from_value::<IdlType>(json!("u256")).is_err());

    // serializes back in the current form
    assert_eq!(serde_json::to_value(IdlType::array(IdlType::U8, 2)).unwrap(), json!({"array": ["u8", 2]}));
    assert_eq!(IdlType::vec(IdlType::option(IdlType::Pubkey)).to_string(), "Vec<Option<pubkey>>");
}

#[test]
fn test_idl_json_roundtrip() {
    let idl = Idl::from_json(COUNTER_IDL).unwrap();
    let again = Idl::from_json(&idl.to_json_pretty().unwrap()).unwrap();
    assert_eq!(again.types.len(), idl.types.len());
    assert_eq!(again.instructions[1].args, idl.instructions[1].args);
}

// ─── Schema errors ───────────────────────────────────────────────

#[test]
fn test_unresolved_defined_type() {
    let err = schema_error(json!({
        "instructions": [],
        "types": [{
            "name": "Holder",
            "type": {"kind": "struct", "fields": [{"name": "inner", "type": {"defined": "Missing"}}]}
        }]
    }));
    match err {
        SchemaError::UnresolvedType { name, referenced_by } => {
            assert_eq!(name, "Missing");
            assert_eq!(referenced_by, "Holder.inner");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unresolved_type_in_instruction_args() {
    let err = schema_error(json!({
        "instructions": [{"name": "run", "accounts": [], "args": [{"name": "x", "type": {"defined": "Nope"}}]}]
    }));
    assert!(matches!(err, SchemaError::UnresolvedType { .. }));
}

#[test]
fn test_bad_discriminator_length() {
    let err = schema_error(json!({
        "instructions": [],
        "accounts": [{"name": "Foo", "discriminator": [1, 2, 3]}],
        "types": [{"name": "Foo", "type": {"kind": "struct", "fields": []}}]
    }));
    assert!(matches!(
        err,
        SchemaError::InvalidDiscriminator { kind: EntryKind::Account, len: 3, .. }
    ));
}

#[test]
fn test_account_without_type() {
    let err = schema_error(json!({
        "instructions": [],
        "accounts": [{"name": "Ghost"}]
    }));
    assert!(matches!(err, SchemaError::MissingTypeDefinition { kind: EntryKind::Account, .. }));
}

#[test]
fn test_duplicate_instruction_name() {
    let err = schema_error(json!({
        "instructions": [
            {"name": "run", "accounts": [], "args": []},
            {"name": "run", "accounts": [], "args": []}
        ]
    }));
    assert!(matches!(err, SchemaError::DuplicateName { kind: EntryKind::Instruction, .. }));
}

#[test]
fn test_event_must_be_struct() {
    let err = schema_error(json!({
        "instructions": [],
        "events": [{"name": "Level"}],
        "types": [{"name": "Level", "type": {"kind": "enum", "variants": [{"name": "Low"}]}}]
    }));
    assert!(matches!(err, SchemaError::NotAStruct { kind: EntryKind::Event, .. }));
}

#[test]
fn test_direct_recursion_rejected() {
    let err = schema_error(json!({
        "instructions": [],
        "types": [
            {"name": "A", "type": {"kind": "struct", "fields": [{"name": "b", "type": {"defined": "B"}}]}},
            {"name": "B", "type": {"kind": "struct", "fields": [{"name": "a", "type": {"defined": "A"}}]}}
        ]
    }));
    assert!(matches!(err, SchemaError::RecursiveType { .. }));
}

#[test]
fn test_oversized_array_is_schema_error() {
    let err = schema_error(json!({
        "instructions": [],
        "types": [{
            "name": "Slab",
            "type": {"kind": "struct", "fields": [{"name": "cells", "type": {"array": ["u64", 4611686018427387904u64]}}]}
        }]
    }));
    assert!(matches!(err, SchemaError::TypeTooLarge { ref name } if name == "Slab"));
}

#[test]
fn test_shared_nesting_builds_in_linear_time() {
    // Level k holds two copies of level k-1, so expanding every
    // definition from scratch would visit 2^40 nodes.
    let mut types = vec![json!({
        "name": "L0",
        "type": {"kind": "struct", "fields": [{"name": "a", "type": "u8"}, {"name": "b", "type": "u8"}]}
    })];
    for k in 1..40 {
        let prev = format!("L{}", k - 1);
        types.push(json!({
            "name": format!("L{k}"),
            "type": {"kind": "struct", "fields": [
                {"name": "a", "type": {"defined": prev}},
                {"name": "b", "type": {"defined": prev}}
            ]}
        }));
    }
    let idl: Idl = serde_json::from_value(json!({"instructions": [], "types": types})).unwrap();
    let registry = TypeRegistry::from_idl(&idl).unwrap();

    let top = registry.by_name("L39").unwrap();
    assert!(top.is_fixed_size);
    assert_eq!(top.min_size, 1 << 40);
    assert_eq!(top.max_size, Some(1 << 40));
    assert_eq!(top.allocation_size, Some(1 << 40));
}

#[test]
fn test_recursion_through_option_allowed() {
    let idl: Idl = serde_json::from_value(json!({
        "instructions": [],
        "types": [{
            "name": "Node",
            "type": {"kind": "struct", "fields": [
                {"name": "value", "type": "u8"},
                {"name": "next", "type": {"option": {"defined": "Node"}}}
            ]}
        }]
    }))
    .unwrap();
    let coder = BorshCoder::new(&idl).unwrap();
    let list = IdlValue::structure([
        ("value", IdlValue::U8(1)),
        (
            "next",
            IdlValue::some(IdlValue::structure([("value", IdlValue::U8(2)), ("next", IdlValue::none())])),
        ),
    ]);
    let bytes = coder.types().encode("Node", &list).unwrap();
    assert_eq!(bytes, vec![1, 1, 2, 0]);
    assert_eq!(coder.types().decode("Node", &bytes).unwrap(), list);
    assert!(coder.types().size("Node").is_err());

    let info = coder.types().layout_info("Node").unwrap();
    assert_eq!(info.min_size, 2);
    assert_eq!(info.max_size, None);
}

#[test]
fn test_layout_sizes() {
    let idl = Idl::from_json(COUNTER_IDL).unwrap();
    let registry = TypeRegistry::from_idl(&idl).unwrap();

    let counter = registry.resolve(&registry.layout_of(&IdlType::defined("Counter")).unwrap());
    assert!(!counter.is_fixed_size);
    assert_eq!(counter.min_size, 32 + 8 + 4 + 1);
    assert_eq!(counter.max_size, None);

    let event = registry.resolve(&registry.layout_of(&IdlType::defined("CounterIncremented")).unwrap());
    assert!(event.is_fixed_size);
    assert_eq!(event.min_size, 40);
    assert_eq!(event.max_size, Some(40));

    let array = registry.resolve(&registry.layout_of(&IdlType::array(IdlType::U16, 3)).unwrap());
    assert!(array.is_fixed_size);
    assert_eq!(array.min_size, 6);

    let option = registry.resolve(&registry.layout_of(&IdlType::option(IdlType::U64)).unwrap());
    assert!(!option.is_fixed_size);
    assert_eq!((option.min_size, option.max_size), (1, Some(9)));

    // Status: Active | Paused { i64 } | Closed(u8, string)
    let status = registry.by_name("Status").unwrap();
    assert!(!status.is_fixed_size);
    assert_eq!(status.min_size, 1);
    assert_eq!(status.max_size, None);
}
