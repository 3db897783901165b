//! Business-rule evaluation over a parsed receipt.
//!
//! Order: timestamp order, emission latency, corridor format, participant
//! count and uniqueness, notional bounds, fee bounds. The first violation
//! wins.

use crate::errors::InvariantViolation;
use crate::receipt::{Participant, Receipt, Timestamps, CORRIDOR_SEPARATOR};

/// Number of participants a settlement receipt carries.
pub const PARTICIPANT_COUNT: usize = 2;
/// Inclusive fee bounds in basis points.
pub const FEE_BPS_RANGE: std::ops::RangeInclusive<f64> = 0.0..=100.0;

/// Checks every business invariant of `receipt`, fail-fast.
pub fn check(receipt: &Receipt) -> Result<(), InvariantViolation> {
    check_timestamp_order(&receipt.timestamps)?;
    check_emission_latency(receipt.receipt_emission_ms, &receipt.timestamps)?;
    check_corridor(&receipt.corridor)?;
    check_participants(&receipt.participants)?;
    check_notional(&receipt.participants)?;
    check_fees(&receipt.participants)
}

fn check_timestamp_order(ts: &Timestamps) -> Result<(), InvariantViolation> {
    if ts.observed_at <= ts.finality_at && ts.finality_at <= ts.receipt_emitted_at {
        Ok(())
    } else {
        Err(InvariantViolation::TimestampOrder)
    }
}

fn check_emission_latency(
    emission_ms: Option<i64>,
    ts: &Timestamps,
) -> Result<(), InvariantViolation> {
    let Some(emission_ms) = emission_ms else {
        return Ok(());
    };
    if emission_ms < 0 {
        return Err(InvariantViolation::EmissionLatency(format!(
            "{} is negative",
            emission_ms
        )));
    }
    let derived = ts.emission_delta_ms();
    if emission_ms != derived {
        return Err(InvariantViolation::EmissionLatency(format!(
            "{} does not match finality to emission delta {}",
            emission_ms, derived
        )));
    }
    Ok(())
}

fn check_corridor(corridor: &str) -> Result<(), InvariantViolation> {
    match corridor.split_once(CORRIDOR_SEPARATOR) {
        Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => Ok(()),
        _ => Err(InvariantViolation::CorridorFormat),
    }
}

fn check_participants(participants: &[Participant]) -> Result<(), InvariantViolation> {
    if participants.len() != PARTICIPANT_COUNT {
        return Err(InvariantViolation::ParticipantCount(participants.len()));
    }
    if participants[0].entity_id == participants[1].entity_id {
        return Err(InvariantViolation::DuplicateParticipant(
            participants[0].entity_id.clone(),
        ));
    }
    Ok(())
}

fn check_notional(participants: &[Participant]) -> Result<(), InvariantViolation> {
    match participants.iter().find(|p| p.notional_cents < 0) {
        Some(p) => Err(InvariantViolation::NotionalRange(p.entity_id.clone())),
        None => Ok(()),
    }
}

fn check_fees(participants: &[Participant]) -> Result<(), InvariantViolation> {
    if participants.iter().all(|p| FEE_BPS_RANGE.contains(&p.fee_bps)) {
        Ok(())
    } else {
        Err(InvariantViolation::FeeRange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::parse_instant;

    fn participant(id: &str, notional_cents: i64, fee_bps: f64) -> Participant {
        Participant {
            entity_id: id.to_string(),
            notional_cents,
            fee_bps,
        }
    }

    fn receipt() -> Receipt {
        Receipt {
            corridor: "USDC-Base↔USDC-Base".to_string(),
            participants: vec![participant("a", 100, 1.5), participant("b", 100, 0.0)],
            timestamps: Timestamps {
                observed_at: parse_instant("2025-03-01T12:00:00Z").unwrap(),
                finality_at: parse_instant("2025-03-01T12:00:02Z").unwrap(),
                receipt_emitted_at: parse_instant("2025-03-01T12:00:02.500Z").unwrap(),
            },
            receipt_emission_ms: Some(500),
            pubkey_ref: None,
            hash_anchor: None,
            incident_code: None,
            schema_version: None,
        }
    }

    #[test]
    fn valid_receipt_passes() {
        assert_eq!(check(&receipt()), Ok(()));
    }

    #[test]
    fn emission_before_finality_is_timestamp_order() {
        let mut r = receipt();
        r.timestamps.receipt_emitted_at = parse_instant("2025-03-01T12:00:01Z").unwrap();
        assert_eq!(check(&r), Err(InvariantViolation::TimestampOrder));
    }

    #[test]
    fn observed_after_finality_is_timestamp_order() {
        let mut r = receipt();
        r.timestamps.observed_at = parse_instant("2025-03-01T12:00:03Z").unwrap();
        assert_eq!(check(&r), Err(InvariantViolation::TimestampOrder));
    }

    #[test]
    fn equal_instants_are_allowed() {
        let mut r = receipt();
        let t = parse_instant("2025-03-01T12:00:00Z").unwrap();
        r.timestamps = Timestamps {
            observed_at: t,
            finality_at: t,
            receipt_emitted_at: t,
        };
        r.receipt_emission_ms = Some(0);
        assert_eq!(check(&r), Ok(()));
    }

    #[test]
    fn emission_ms_must_match_timestamps() {
        let mut r = receipt();
        r.receipt_emission_ms = Some(499);
        assert_eq!(check(&r).unwrap_err().code(), "EmissionLatency");

        r.receipt_emission_ms = Some(-1);
        assert_eq!(check(&r).unwrap_err().code(), "EmissionLatency");

        r.receipt_emission_ms = None;
        assert_eq!(check(&r), Ok(()));
    }

    #[test]
    fn corridor_needs_separator_and_endpoints() {
        let mut r = receipt();
        r.corridor = "USDC-Base->USDC-Base".to_string();
        assert_eq!(check(&r), Err(InvariantViolation::CorridorFormat));
        r.corridor = "↔USDC-Base".to_string();
        assert_eq!(check(&r), Err(InvariantViolation::CorridorFormat));
    }

    #[test]
    fn participants_must_be_two_distinct_entities() {
        let mut r = receipt();
        r.participants.push(participant("c", 1, 0.0));
        assert_eq!(check(&r), Err(InvariantViolation::ParticipantCount(3)));

        let mut r = receipt();
        r.participants[1].entity_id = "a".to_string();
        assert_eq!(
            check(&r),
            Err(InvariantViolation::DuplicateParticipant("a".to_string()))
        );
    }

    #[test]
    fn negative_notional_is_rejected() {
        let mut r = receipt();
        r.participants[1].notional_cents = -1;
        assert_eq!(
            check(&r),
            Err(InvariantViolation::NotionalRange("b".to_string()))
        );
    }

    #[test]
    fn fee_bounds_are_inclusive() {
        let mut r = receipt();
        r.participants[0].fee_bps = 100.0;
        assert_eq!(check(&r), Ok(()));
        r.participants[0].fee_bps = 100.01;
        assert_eq!(check(&r), Err(InvariantViolation::FeeRange));
        r.participants[0].fee_bps = -0.5;
        assert_eq!(check(&r), Err(InvariantViolation::FeeRange));
    }

    #[test]
    fn checks_run_in_fixed_order() {
        let mut r = receipt();
        r.corridor = "broken".to_string();
        r.participants[0].fee_bps = 500.0;
        r.timestamps.observed_at = parse_instant("2025-03-02T00:00:00Z").unwrap();
        assert_eq!(check(&r), Err(InvariantViolation::TimestampOrder));
    }
}
