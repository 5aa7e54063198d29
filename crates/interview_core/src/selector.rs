//! crates/interview_core/src/selector.rs
//!
//! Builds the ordered question set for a new session from a question pool and
//! per-tier quotas.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::{Difficulty, Question, TierQuotas};
use crate::error::{InterviewError, InterviewResult};

/// The questions chosen for a session, in presentation order.
#[derive(Debug, Clone)]
pub struct Selection {
    pub questions: Vec<Question>,
    /// How many questions the quotas asked for, pinned questions included.
    pub requested: u32,
}

impl Selection {
    /// True when some tier had fewer questions than its quota.
    pub fn is_partial(&self) -> bool {
        (self.questions.len() as u32) < self.requested
    }
}

/// Samples up to `quotas[tier]` questions per tier, without replacement, and
/// concatenates the tiers from easiest to hardest.
///
/// A tier with fewer questions than requested contributes everything it has.
/// Only a pool with no questions at all is an error.
pub fn select_questions<R: Rng + ?Sized>(
    pool: &[Question],
    quotas: &TierQuotas,
    rng: &mut R,
) -> InterviewResult<Selection> {
    if pool.is_empty() {
        return Err(InterviewError::EmptyQuestionPool);
    }
    let questions = sample_by_tier(pool, quotas, rng);
    if questions.is_empty() {
        return Err(InterviewError::EmptyQuestionPool);
    }
    Ok(Selection {
        questions,
        requested: quotas.total(),
    })
}

/// Builds a company interview set: pinned questions first in authoring order,
/// then the sampled pool by ascending tier. Without quotas the whole pool is used.
pub fn compose_interview_set<R: Rng + ?Sized>(
    questions: &[Question],
    quotas: Option<&TierQuotas>,
    rng: &mut R,
) -> InterviewResult<Selection> {
    let mut pinned: Vec<Question> = questions.iter().filter(|q| q.pinned).cloned().collect();
    pinned.sort_by_key(|q| q.position);
    let pool: Vec<Question> = questions.iter().filter(|q| !q.pinned).cloned().collect();

    let (sampled, requested) = match quotas {
        Some(quotas) => (sample_by_tier(&pool, quotas, rng), quotas.total()),
        None => {
            let mut all = pool;
            all.sort_by_key(|q| (q.difficulty, q.position));
            let count = all.len() as u32;
            (all, count)
        }
    };

    let requested = requested + pinned.len() as u32;
    let mut ordered = pinned;
    ordered.extend(sampled);
    if ordered.is_empty() {
        return Err(InterviewError::EmptyQuestionPool);
    }
    Ok(Selection {
        questions: ordered,
        requested,
    })
}

fn sample_by_tier<R: Rng + ?Sized>(
    pool: &[Question],
    quotas: &TierQuotas,
    rng: &mut R,
) -> Vec<Question> {
    let mut selected = Vec::new();
    for tier in Difficulty::ASCENDING {
        let wanted = quotas.get(tier) as usize;
        if wanted == 0 {
            continue;
        }
        let tier_pool: Vec<&Question> = pool.iter().filter(|q| q.difficulty == tier).collect();
        selected.extend(
            tier_pool
                .choose_multiple(rng, wanted)
                .map(|q| (*q).clone()),
        );
    }
    selected
}
