use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use xavier_core::{
    run_batch, BatchOptions, InMemoryReceipt, PubkeyResolver, ReceiptSchema, SecretSeed,
    SignatureCheck, Signer, TrustMapping, VerificationContext,
};

const KEY_REF: &str = "coordinator_v1_ed25519";

fn schema() -> ReceiptSchema {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../schemas/receipt.schema.v1.1.json");
    ReceiptSchema::load(&path).unwrap()
}

fn seed() -> SecretSeed {
    SecretSeed::from_bytes([7u8; 32])
}

fn context() -> VerificationContext {
    let mapping = TrustMapping::from_entries([(KEY_REF, seed().public_key_base64())]);
    VerificationContext::new(
        schema(),
        SignatureCheck::Verify(PubkeyResolver::Mapping(mapping)),
        true,
    )
}

/// Signed receipt with the given emission latency and first-participant fee.
fn receipt(emission_ms: i64, fee_bps: f64) -> Value {
    let emitted = chrono::DateTime::parse_from_rfc3339("2025-03-01T12:00:02Z").unwrap()
        + chrono::Duration::milliseconds(emission_ms);
    let draft = json!({
        "corridor": "USDC-Base↔USDC-Base",
        "participants": [
            {"entity_id": "payer-1", "notional_cents": 5000, "fee_bps": fee_bps},
            {"entity_id": "payee-2", "notional_cents": 5000, "fee_bps": 1}
        ],
        "timestamps": {
            "observed_at": "2025-03-01T12:00:00Z",
            "finality_at": "2025-03-01T12:00:02Z",
            "receipt_emitted_at": emitted.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        },
        "pubkey_ref": KEY_REF
    });
    Signer::default().sign(&draft, &seed(), None).unwrap()
}

/// Ten receipts: eight valid, two with out-of-range fees.
fn mixed_batch() -> Vec<InMemoryReceipt> {
    (0..10)
        .map(|i| {
            let fee = if i == 3 || i == 7 { 150.0 } else { 2.0 };
            InMemoryReceipt::from_value(format!("r{:02}.json", i), &receipt(100 + i, fee))
        })
        .collect()
}

#[test]
fn expected_count_gates_the_verdict() {
    let ctx = context();
    let records = mixed_batch();

    let eight = BatchOptions {
        expected_valid: Some(8),
        ..Default::default()
    };
    let summary = run_batch(&records, &ctx, &eight).unwrap();
    assert_eq!(summary.valid_count, 8);
    assert_eq!(summary.invalid_count, 2);
    assert!(summary.passed());

    let ten = BatchOptions {
        expected_valid: Some(10),
        ..Default::default()
    };
    assert!(!run_batch(&records, &ctx, &ten).unwrap().passed());
    assert!(!run_batch(&records, &ctx, &BatchOptions::default())
        .unwrap()
        .passed());
}

#[test]
fn failures_carry_reasons_in_input_order() {
    let summary = run_batch(&mixed_batch(), &context(), &BatchOptions::default()).unwrap();
    let failed: Vec<(&str, String)> = summary
        .statuses
        .iter()
        .filter(|s| !s.is_valid())
        .map(|s| (s.name.as_str(), s.reason()))
        .collect();
    assert_eq!(
        failed,
        vec![
            ("r03.json", "fee_bps out of range".to_string()),
            ("r07.json", "fee_bps out of range".to_string()),
        ]
    );
}

#[test]
fn p95_over_hundred_receipts() {
    let records: Vec<InMemoryReceipt> = (1..=100)
        .map(|i| InMemoryReceipt::from_value(format!("r{i}"), &receipt(i * 10, 1.0)))
        .collect();
    let summary = run_batch(&records, &context(), &BatchOptions::default()).unwrap();
    assert_eq!(summary.valid_count, 100);
    assert_eq!(summary.p95_emission_ms, Some(950));
}

#[test]
fn parallel_run_matches_sequential() {
    let ctx = context();
    let mut records = mixed_batch();
    records.reverse();

    let sequential = run_batch(&records, &ctx, &BatchOptions::default()).unwrap();
    let parallel = run_batch(
        &records,
        &ctx,
        &BatchOptions {
            workers: 4,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(sequential, parallel);
    assert_eq!(parallel.statuses[0].name, "r09.json");
}

#[test]
fn slo_and_coverage_metrics() {
    let mut with_incident = receipt(20_000, 1.0);
    with_incident["incident_code"] = json!("LATE_FINALITY");
    let with_incident = Signer::default().sign(&with_incident, &seed(), None).unwrap();

    let records = vec![
        InMemoryReceipt::from_value("fast", &receipt(200, 1.0)),
        InMemoryReceipt::from_value("slow", &with_incident),
    ];
    let options = BatchOptions {
        slo_ms: Some(10_000),
        ..Default::default()
    };
    let summary = run_batch(&records, &context(), &options).unwrap();
    assert_eq!(summary.slo_breaches, Some(1));
    assert_eq!(summary.clean_count, 1);
    assert_eq!(summary.coverage_pct(), Some(50.0));
}

#[test]
fn files_on_disk_and_unreadable_records() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.json");
    std::fs::write(&good, serde_json::to_vec_pretty(&receipt(500, 1.0)).unwrap()).unwrap();
    let missing = dir.path().join("missing.json");

    let sources: Vec<PathBuf> = vec![good, missing];
    let summary = run_batch(&sources, &context(), &BatchOptions::default()).unwrap();
    assert_eq!(summary.total(), 2);
    assert_eq!(summary.statuses[0].name, "good.json");
    assert!(summary.statuses[0].is_valid());
    assert_eq!(
        summary.statuses[1].result.as_ref().unwrap_err().code(),
        "Unreadable"
    );
}
