//! Output formatting utilities.

use serde_json::{json, Value};
use xavier_core::{BatchSummary, RecordStatus};

/// Formats one record's status line.
pub fn format_status(status: &RecordStatus) -> String {
    match &status.result {
        Ok(_) => format!("OK: {}", status.name),
        Err(e) => format!("FAIL: {} - {}", status.name, e),
    }
}

/// Formats the aggregate line. Metrics are appended when `detailed` is set.
pub fn format_summary(summary: &BatchSummary, detailed: bool) -> String {
    let mut line = format!(
        "Summary: {} valid, {} invalid",
        summary.valid_count, summary.invalid_count
    );
    if !detailed {
        return line;
    }

    match summary.p95_emission_ms {
        Some(p95) => line.push_str(&format!("; p95_emission_ms={}", p95)),
        None => line.push_str("; p95_emission_ms=n/a"),
    }
    if let Some(coverage) = summary.coverage_pct() {
        line.push_str(&format!("; coverage={:.1}%", coverage));
    }
    if let Some(breaches) = summary.slo_breaches {
        line.push_str(&format!("; slo_breaches={}", breaches));
    }
    line
}

/// Builds the machine-readable report for `verify --json`.
pub fn report_json(summary: &BatchSummary) -> Value {
    let records: Vec<Value> = summary
        .statuses
        .iter()
        .map(|status| match &status.result {
            Ok(verified) => json!({
                "name": status.name,
                "valid": true,
                "receipt_emission_ms": verified.emission_ms,
                "clean": verified.clean,
            }),
            Err(e) => json!({
                "name": status.name,
                "valid": false,
                "code": e.code(),
                "reason": e.to_string(),
            }),
        })
        .collect();

    json!({
        "records": records,
        "summary": {
            "total": summary.total(),
            "valid": summary.valid_count,
            "invalid": summary.invalid_count,
            "expected_valid": summary.expected_valid,
            "p95_emission_ms": summary.p95_emission_ms,
            "clean": summary.clean_count,
            "coverage_pct": summary.coverage_pct(),
            "slo_breaches": summary.slo_breaches,
        },
        "passed": summary.passed(),
    })
}
