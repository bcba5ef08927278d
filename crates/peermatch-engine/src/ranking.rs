//! Candidate ranking and ranking fingerprints.
//!
//! Candidates are ordered by score descending. Equal scores fall back to the
//! earlier-created deposit, then the earlier-created withdrawal, then the
//! smaller ids, so a ranking is a total order and never depends on pool
//! order. Within one search the query side is the same for every candidate,
//! which makes this the same as ordering by the counterparty's age and id.

use std::cmp::Ordering;

use peermatch_types::MatchingCandidate;
use sha2::{Digest, Sha256};

/// Total ordering used by [`rank_candidates`]: best first.
#[must_use]
pub fn compare_candidates(a: &MatchingCandidate, b: &MatchingCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.deposit.created_at.cmp(&b.deposit.created_at))
        .then_with(|| a.withdrawal.created_at.cmp(&b.withdrawal.created_at))
        .then_with(|| a.deposit.id.cmp(&b.deposit.id))
        .then_with(|| a.withdrawal.id.cmp(&b.withdrawal.id))
}

/// Sort best first and keep at most `max_candidates`.
#[must_use]
pub fn rank_candidates(
    mut candidates: Vec<MatchingCandidate>,
    max_candidates: usize,
) -> Vec<MatchingCandidate> {
    candidates.sort_by(compare_candidates);
    candidates.truncate(max_candidates);
    candidates
}

/// Fingerprint of a ranked list.
///
/// Two nodes ranking the same snapshot with the same rules and clock must
/// produce the same digest. Covers the pairing ids, in order, and the exact
/// bits of each score.
#[must_use]
pub fn ranking_digest(candidates: &[MatchingCandidate]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"peermatch:ranking:v1:");
    hasher.update((candidates.len() as u64).to_le_bytes());

    for candidate in candidates {
        hasher.update(candidate.deposit.id.as_bytes());
        hasher.update(candidate.withdrawal.id.as_bytes());
        hasher.update(candidate.score.to_bits().to_le_bytes());
    }

    let result = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&result);
    digest
}

/// Recompute the digest and compare.
#[must_use]
pub fn verify_ranking_digest(candidates: &[MatchingCandidate], expected: &[u8; 32]) -> bool {
    ranking_digest(candidates) == *expected
}

/// Hex form of [`ranking_digest`], for logs and audit records.
#[must_use]
pub fn ranking_digest_hex(candidates: &[MatchingCandidate]) -> String {
    hex::encode(ranking_digest(candidates))
}
