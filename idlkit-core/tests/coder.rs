//! Account, instruction, event and type coders built from a full IDL.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as Base64Engine;
use base64::Engine;
use idlkit_core::cache::{CacheConfig, DiscriminatorCache, PdaCache};
use idlkit_core::coder::{BorshCoder, CoderConfig, MemcmpFilter};
use idlkit_core::error::{CodecError, CoderError};
use idlkit_core::idl::{EntryKind, Idl};
use idlkit_core::pda::{self, PdaSeed, SeedContext};
use idlkit_core::pubkey::Pubkey;
use idlkit_core::value::IdlValue;
use serde_json::json;

const COUNTER_IDL: &str = include_str!("fixtures/counter.json");

fn coder() -> BorshCoder {
    BorshCoder::new(&Idl::from_json(COUNTER_IDL).unwrap()).unwrap()
}

fn data_value() -> IdlValue {
    IdlValue::structure([
        ("id", IdlValue::U64(123)),
        ("name", IdlValue::String("test".into())),
        ("isActive", IdlValue::Bool(true)),
    ])
}

// ─── Accounts ────────────────────────────────────────────────────

#[test]
fn test_account_scenario_roundtrip() {
    let coder = coder();
    let bytes = coder.accounts().encode("Data", &data_value()).unwrap();
    assert_eq!(&bytes[..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
    assert!(bytes.len() > 8);

    let decoded = coder.accounts().decode("Data", &bytes).unwrap();
    assert_eq!(decoded, data_value());
}

#[test]
fn test_account_discriminator_mismatch_carries_both_values() {
    let coder = coder();
    let mut bytes = coder.accounts().encode("Data", &data_value()).unwrap();
    bytes[..8].copy_from_slice(&[99, 98, 97, 96, 95, 94, 93, 92]);

    match coder.accounts().decode("Data", &bytes).unwrap_err() {
        CoderError::DiscriminatorMismatch {
            kind,
            name,
            expected,
            actual,
            account,
        } => {
            assert_eq!(kind, EntryKind::Account);
            assert_eq!(name, "Data");
            assert_eq!(expected, [1, 2, 3, 4, 5, 6, 7, 8]);
            assert_eq!(actual, vec![99, 98, 97, 96, 95, 94, 93, 92]);
            assert_eq!(account, None);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_decode_at_names_the_account() {
    let coder = coder();
    let address = Pubkey::new_from_array([4; 32]);
    let err = coder
        .accounts()
        .decode_at("Data", &[0; 16], &address)
        .unwrap_err();
    assert!(err.is_type_mismatch());
    assert!(err.to_string().contains(&address.to_string()));
    assert!(matches!(err, CoderError::DiscriminatorMismatch { account: Some(a), .. } if a == address));
}

#[test]
fn test_short_buffer_is_a_discriminator_mismatch() {
    let coder = coder();
    for name in ["Data", "Counter"] {
        let err = coder.accounts().decode(name, &[1, 2, 3]).unwrap_err();
        assert!(
            matches!(&err, CoderError::DiscriminatorMismatch { actual, .. } if actual == &vec![1, 2, 3]),
            "{err}"
        );
    }
}

#[test]
fn test_truncated_body_did_not_deserialize() {
    let coder = coder();
    let bytes = coder.accounts().encode("Data", &data_value()).unwrap();
    let err = coder.accounts().decode("Data", &bytes[..12]).unwrap_err();
    match err {
        CoderError::DidNotDeserialize { type_name, len, source } => {
            assert_eq!(type_name, "Data");
            assert_eq!(len, 12);
            assert!(matches!(source, CodecError::UnexpectedEof { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_decode_unchecked_skips_comparison() {
    let coder = coder();
    let mut bytes = coder.accounts().encode("Data", &data_value()).unwrap();
    bytes[..8].copy_from_slice(&[0; 8]);
    assert_eq!(coder.accounts().decode_unchecked("Data", &bytes).unwrap(), data_value());
}

#[test]
fn test_decode_any_identifies_account() {
    let coder = coder();
    let counter = IdlValue::structure([
        ("authority", IdlValue::Pubkey(Pubkey::new_from_array([1; 32]))),
        ("count", IdlValue::U64(41)),
        ("label", IdlValue::String("main".into())),
        ("bump", IdlValue::U8(254)),
    ]);
    let bytes = coder.accounts().encode("Counter", &counter).unwrap();
    assert_eq!(&bytes[..8], &[255, 176, 4, 245, 188, 253, 124, 25]);

    let (name, value) = coder.accounts().decode_any(&bytes).unwrap();
    assert_eq!(name, "Counter");
    assert_eq!(value, counter);

    let (name, _) = coder
        .accounts()
        .decode_any(&coder.accounts().encode("Data", &data_value()).unwrap())
        .unwrap();
    assert_eq!(name, "Data");
}

#[test]
fn test_decode_any_without_match() {
    let coder = coder();
    assert!(matches!(
        coder.accounts().decode_any(&[0; 32]),
        Err(CoderError::NoMatchingDiscriminator { .. })
    ));
    assert!(matches!(
        coder.accounts().decode_any(&[1, 2]),
        Err(CoderError::NoMatchingDiscriminator { .. })
    ));
}

#[test]
fn test_unknown_account_name() {
    let coder = coder();
    let err = coder.accounts().encode("Nope", &data_value()).unwrap_err();
    assert!(matches!(err, CoderError::UnknownName { kind: EntryKind::Account, .. }));
    assert_eq!(err.error_code(), 1000);
    assert!(coder.accounts().size("Nope").is_err());
    assert!(coder.accounts().memcmp("Nope", None).is_err());
}

#[test]
fn test_memcmp_filter() {
    let coder = coder();
    assert_eq!(
        coder.accounts().memcmp("Data", None).unwrap(),
        MemcmpFilter {
            offset: 0,
            bytes: "AQIDBAUGBwg=".into()
        }
    );
    let filter = coder.accounts().memcmp("Data", Some(&[9, 9])).unwrap();
    assert_eq!(filter.bytes, "AQIDBAUGBwgJCQ==");
    assert_eq!(Base64Engine.decode(&filter.bytes).unwrap().len(), 10);
}

#[test]
fn test_account_size_uses_allocation_convention() {
    let coder = coder();
    // 8 + u64 + string(1) + bool
    assert_eq!(coder.accounts().size("Data").unwrap(), 18);
    // 8 + pubkey + u64 + string(1) + u8
    assert_eq!(coder.accounts().size("Counter").unwrap(), 50);
}

#[test]
fn test_field_offset() {
    let coder = coder();
    assert_eq!(coder.accounts().field_offset("Counter", "authority").unwrap(), Some(8));
    assert_eq!(coder.accounts().field_offset("Counter", "count").unwrap(), Some(40));
    assert_eq!(coder.accounts().field_offset("Counter", "label").unwrap(), Some(48));
    // follows a string, so no static offset
    assert_eq!(coder.accounts().field_offset("Counter", "bump").unwrap(), None);
    assert!(coder.accounts().field_offset("Counter", "missing").is_err());
}

#[test]
fn test_account_json_bridge() {
    let coder = coder();
    let value = coder
        .accounts()
        .value_from_json("Data", &json!({"id": "123", "name": "test", "isActive": true}))
        .unwrap();
    assert_eq!(value, data_value());
    assert_eq!(value.to_json(), json!({"id": 123, "name": "test", "isActive": true}));
}

// ─── Instructions ────────────────────────────────────────────────

#[test]
fn test_instruction_encode_and_decode() {
    let coder = coder();
    let args = IdlValue::structure([("amount", IdlValue::U64(5)), ("index", IdlValue::U16(2))]);
    let bytes = coder.instructions().encode("increment", &args).unwrap();
    assert_eq!(&bytes[..8], &[11, 18, 104, 9, 104, 174, 59, 33]);
    assert_eq!(&bytes[8..], &[5, 0, 0, 0, 0, 0, 0, 0, 2, 0]);
    assert_eq!(coder.instructions().decode("increment", &bytes).unwrap(), args);

    let (name, decoded) = coder.instructions().decode_any(&bytes).unwrap();
    assert_eq!(name, "increment");
    assert_eq!(decoded, args);
}

#[test]
fn test_instruction_positional_args() {
    let coder = coder();
    let positional = coder
        .instructions()
        .encode_args("increment", &[IdlValue::U64(5), IdlValue::U16(2)])
        .unwrap();
    let named = coder
        .instructions()
        .encode(
            "increment",
            &IdlValue::structure([("amount", IdlValue::U64(5)), ("index", IdlValue::U16(2))]),
        )
        .unwrap();
    assert_eq!(positional, named);
    assert!(matches!(
        coder.instructions().encode_args("increment", &[IdlValue::U64(5)]),
        Err(CoderError::InvalidArgument(_))
    ));
}

#[test]
fn test_explicit_instruction_discriminator_used() {
    let coder = coder();
    assert_eq!(
        coder.instructions().discriminator("initialize").unwrap(),
        [175, 175, 109, 31, 13, 152, 155, 237]
    );
}

#[test]
fn test_instruction_with_nested_types_from_json() {
    let coder = coder();
    let args = coder
        .instructions()
        .value_from_json(
            "configure",
            &json!({
                "config": {
                    "status": {"Paused": {"until": -5}},
                    "limits": [1, 2, 3],
                    "fee": null,
                    "admins": ["US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx"]
                }
            }),
        )
        .unwrap();
    // `note` is an option and may be omitted
    assert_eq!(args.get("note"), Some(&IdlValue::none()));

    let bytes = coder.instructions().encode("configure", &args).unwrap();
    let decoded = coder.instructions().decode("configure", &bytes).unwrap();
    assert_eq!(decoded, args);
    assert_eq!(
        decoded.to_json()["config"]["status"],
        json!({"Paused": {"until": -5}})
    );
}

#[test]
fn test_encode_error_names_the_entry() {
    let coder = coder();
    let err = coder
        .instructions()
        .encode("increment", &IdlValue::structure([("amount", IdlValue::U64(1))]))
        .unwrap_err();
    assert!(matches!(err, CoderError::Encode { ref name, .. } if name == "increment"));
}

// ─── PDA resolution ──────────────────────────────────────────────

#[test]
fn test_resolve_pda_from_account_seed() {
    let coder = coder();
    let program: Pubkey = "US517G5965aydkZ46HS38QLi7UQiSojurfbQfKCELFx".parse().unwrap();
    let authority = Pubkey::new_from_array([5; 32]);
    let ctx = SeedContext::new().with_account("authority", authority);

    let resolved = coder
        .instructions()
        .resolve_pda("initialize", "counter", &ctx, &program)
        .unwrap();
    let expected =
        pda::find_program_address(&[PdaSeed::str("counter"), PdaSeed::Pubkey(authority)], &program).unwrap();
    assert_eq!(resolved, expected);

    // second lookup served by the cache
    coder
        .instructions()
        .resolve_pda("initialize", "counter", &ctx, &program)
        .unwrap();
    assert_eq!(coder.pda_cache().stats().hits, 1);
}

#[test]
fn test_resolve_pda_from_typed_arg_seed() {
    let coder = coder();
    let program = Pubkey::new_from_array([7; 32]);
    let ctx = SeedContext::new().with_args(&IdlValue::structure([
        ("amount", IdlValue::U64(1)),
        ("index", IdlValue::U64(3)),
    ]));
    let resolved = coder
        .instructions()
        .resolve_pda("increment", "vault", &ctx, &program)
        .unwrap();
    // u16 arg seeds are two bytes wide
    let expected = pda::find_program_address(&[PdaSeed::str("vault"), PdaSeed::number(3, 2)], &program).unwrap();
    assert_eq!(resolved, expected);
}

#[test]
fn test_resolve_pda_missing_input() {
    let coder = coder();
    let err = coder
        .instructions()
        .resolve_pda("initialize", "counter", &SeedContext::new(), &Pubkey::default())
        .unwrap_err();
    assert!(matches!(err, CoderError::Pda(_)));

    let resolved = coder
        .instructions()
        .resolve_pdas("initialize", &SeedContext::new(), &Pubkey::default())
        .unwrap();
    assert!(resolved.is_empty());
}

#[test]
fn test_resolve_pda_rejects_plain_account() {
    let coder = coder();
    let err = coder
        .instructions()
        .resolve_pda("initialize", "authority", &SeedContext::new(), &Pubkey::default())
        .unwrap_err();
    assert!(matches!(err, CoderError::InvalidArgument(_)));
}

// ─── Events ──────────────────────────────────────────────────────

fn event_value() -> IdlValue {
    IdlValue::structure([
        ("counter", IdlValue::Pubkey(Pubkey::new_from_array([2; 32]))),
        ("count", IdlValue::U64(9)),
    ])
}

#[test]
fn test_event_decode_log() {
    let coder = coder();
    let bytes = coder.events().encode("CounterIncremented", &event_value()).unwrap();
    let line = format!("Program data: {}", Base64Engine.encode(&bytes));

    let (name, value) = coder.events().decode_log(&line).unwrap().unwrap();
    assert_eq!(name, "CounterIncremented");
    assert_eq!(value, event_value());

    // prefix is optional
    assert!(coder.events().decode_log(&Base64Engine.encode(&bytes)).unwrap().is_some());
}

#[test]
fn test_event_decode_log_ignores_other_lines() {
    let coder = coder();
    assert!(coder.events().decode_log("Program log: Instruction: Increment").unwrap().is_none());
    let unknown = Base64Engine.encode([0u8; 16]);
    assert!(coder.events().decode_log(&unknown).unwrap().is_none());
}

// ─── Types ───────────────────────────────────────────────────────

#[test]
fn test_types_coder_has_no_discriminator() {
    let coder = coder();
    let bytes = coder.types().encode("Data", &data_value()).unwrap();
    assert_eq!(bytes.len(), 8 + 4 + 4 + 1);
    assert_eq!(coder.types().decode("Data", &bytes).unwrap(), data_value());
    // tag + widest variant (Paused: i64)
    assert_eq!(coder.types().size("Status").unwrap(), 1 + 8);

    let info = coder.types().layout_info("Config").unwrap();
    assert!(!info.is_fixed_size);
    assert_eq!(info.fields.unwrap().len(), 4);
}

// ─── Configuration & caches ──────────────────────────────────────

#[test]
fn test_coders_share_injected_cache() {
    let idl = Idl::from_json(COUNTER_IDL).unwrap();
    let cache = Arc::new(DiscriminatorCache::default());
    let pdas = Arc::new(PdaCache::default());
    BorshCoder::with_caches(&idl, cache.clone(), pdas.clone()).unwrap();
    let misses = cache.stats().misses;
    assert!(misses > 0);

    BorshCoder::with_caches(&idl, cache.clone(), pdas).unwrap();
    assert_eq!(cache.stats().misses, misses);
    assert!(cache.stats().hits >= misses);
}

#[test]
fn test_disabled_caches_still_code() {
    let idl = Idl::from_json(COUNTER_IDL).unwrap();
    let config = CoderConfig {
        discriminator_cache: CacheConfig::disabled(),
        pda_cache: CacheConfig::disabled(),
    };
    let coder = BorshCoder::with_config(&idl, config).unwrap();
    let bytes = coder.accounts().encode("Data", &data_value()).unwrap();
    assert_eq!(coder.accounts().decode("Data", &bytes).unwrap(), data_value());
    assert!(coder.discriminator_cache().is_empty());
}

#[test]
fn test_invalid_cache_config_rejected() {
    let idl = Idl::from_json(COUNTER_IDL).unwrap();
    let config = CoderConfig {
        discriminator_cache: CacheConfig::with_max_size(0),
        ..CoderConfig::default()
    };
    assert!(matches!(
        BorshCoder::with_config(&idl, config),
        Err(CoderError::InvalidArgument(_))
    ));
}

#[test]
fn test_coder_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BorshCoder>();
}
