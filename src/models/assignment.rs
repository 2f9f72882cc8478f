use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::presence::PresenceRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    pub candidates: BTreeSet<String>,
    pub deadline_ms: i64,
    pub claimed_by: Option<String>,
}

impl AssignmentRecord {
    pub fn prepared<I>(candidates: I, deadline_ms: i64) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            candidates: candidates.into_iter().collect(),
            deadline_ms,
            claimed_by: None,
        }
    }

    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.deadline_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimOutcome {
    Claimed,
    Expired,
    AlreadyClaimed,
    NotCandidate,
    DriverOffline,
}

impl ClaimOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimOutcome::Claimed => "CLAIMED",
            ClaimOutcome::Expired => "EXPIRED",
            ClaimOutcome::AlreadyClaimed => "ALREADY_CLAIMED",
            ClaimOutcome::NotCandidate => "NOT_CANDIDATE",
            ClaimOutcome::DriverOffline => "DRIVER_OFFLINE",
        }
    }

    pub fn is_claimed(&self) -> bool {
        matches!(self, ClaimOutcome::Claimed)
    }
}

/// Claim state transition. Must be called with exclusive access to `record`.
///
/// Checks run in a fixed order: deadline, existing claim, candidacy, presence.
/// `presence` is only consulted once the cheaper checks have passed. On success
/// the record is mutated in place and never reverts.
pub fn apply_claim<F>(
    record: Option<&mut AssignmentRecord>,
    driver_id: &str,
    now_ms: i64,
    presence: F,
) -> ClaimOutcome
where
    F: FnOnce() -> Option<PresenceRecord>,
{
    let Some(record) = record else {
        return ClaimOutcome::Expired;
    };

    if record.is_expired(now_ms) {
        return ClaimOutcome::Expired;
    }

    if record.claimed_by.is_some() {
        return ClaimOutcome::AlreadyClaimed;
    }

    if !record.candidates.contains(driver_id) {
        return ClaimOutcome::NotCandidate;
    }

    match presence() {
        Some(presence) if presence.is_online() => {}
        _ => return ClaimOutcome::DriverOffline,
    }

    record.claimed_by = Some(driver_id.to_string());
    ClaimOutcome::Claimed
}

#[cfg(test)]
mod tests {
    use super::{apply_claim, AssignmentRecord, ClaimOutcome};
    use crate::models::presence::{DriverStatus, PresenceRecord};

    fn online() -> Option<PresenceRecord> {
        Some(PresenceRecord {
            status: Some(DriverStatus::Online),
            last_seen_ms: 0,
            ..PresenceRecord::default()
        })
    }

    fn record(deadline_ms: i64) -> AssignmentRecord {
        AssignmentRecord::prepared(["d1".to_string(), "d2".to_string()], deadline_ms)
    }

    #[test]
    fn candidate_online_driver_wins_once() {
        let mut rec = record(1_000);

        let first = apply_claim(Some(&mut rec), "d1", 500, online);
        let second = apply_claim(Some(&mut rec), "d1", 501, online);

        assert_eq!(first, ClaimOutcome::Claimed);
        assert_eq!(second, ClaimOutcome::AlreadyClaimed);
        assert_eq!(rec.claimed_by.as_deref(), Some("d1"));
    }

    #[test]
    fn missing_record_reads_as_expired() {
        assert_eq!(apply_claim(None, "d1", 0, online), ClaimOutcome::Expired);
    }

    #[test]
    fn deadline_is_checked_before_everything_else() {
        let mut rec = record(1_000);
        rec.claimed_by = Some("d2".to_string());

        assert_eq!(apply_claim(Some(&mut rec), "stranger", 1_001, || None), ClaimOutcome::Expired);
    }

    #[test]
    fn claim_at_exact_deadline_is_still_open() {
        let mut rec = record(1_000);
        assert_eq!(apply_claim(Some(&mut rec), "d1", 1_000, online), ClaimOutcome::Claimed);
    }

    #[test]
    fn existing_claim_beats_candidacy_check() {
        let mut rec = record(1_000);
        rec.claimed_by = Some("d2".to_string());

        assert_eq!(
            apply_claim(Some(&mut rec), "stranger", 10, online),
            ClaimOutcome::AlreadyClaimed
        );
    }

    #[test]
    fn non_candidate_rejected_without_reading_presence() {
        let mut rec = record(1_000);
        let outcome = apply_claim(Some(&mut rec), "stranger", 10, || {
            panic!("presence must not be read for a non-candidate")
        });

        assert_eq!(outcome, ClaimOutcome::NotCandidate);
        assert!(rec.claimed_by.is_none());
    }

    #[test]
    fn absent_or_statusless_presence_is_offline() {
        let mut rec = record(1_000);

        assert_eq!(apply_claim(Some(&mut rec), "d1", 10, || None), ClaimOutcome::DriverOffline);
        assert_eq!(
            apply_claim(Some(&mut rec), "d1", 10, || Some(PresenceRecord::default())),
            ClaimOutcome::DriverOffline
        );
        assert!(rec.claimed_by.is_none());
    }
}
