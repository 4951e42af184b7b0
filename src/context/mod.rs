//! Context builder and cache invalidation (C4).
//!
//! The builder fetches `region`, `rules`, and `answers` concurrently,
//! folds the rule list's strategy leaves into one covering window via
//! C1, and issues a single presence range query — mirroring the
//! "parallel load, one presence query" shape in the spec's context
//! builder section. The invalidator is the write-side half: every
//! mutation that can make a cached `RegionEvaluation` stale deletes the
//! affected entries synchronously, before (or as part of) the mutation
//! that caused the staleness.

use crate::domain::{AnswersByConditionId, EvaluationContext, RegionId, UserId};
use crate::errors::CoreResult;
use crate::period::compute_max_period;
use crate::repository::Repositories;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Build a fresh `EvaluationContext` for `(user_id, region_id)` at `at`.
/// Does not touch the evaluation cache — callers decide when to read or
/// write it (see `crate::service::EvaluationService`).
pub async fn build_context(
    repos: &Repositories,
    at: DateTime<Utc>,
    user_id: UserId,
    region_id: &RegionId,
) -> CoreResult<EvaluationContext> {
    let (region, rules, answers) = tokio::try_join!(
        repos.region.get(region_id),
        repos.rule.list_for_region(region_id),
        repos.answer.list_for_user_and_region(user_id, region_id),
    )?;

    let presences = match compute_max_period(at, &region, &rules)? {
        Some((start, end)) => {
            repos
                .presence
                .list_in_range(user_id, region_id, start.date_naive(), end.date_naive())
                .await?
        }
        None => Vec::new(),
    };

    let mut answers_by_condition_id: AnswersByConditionId = HashMap::with_capacity(answers.len());
    for answer in answers {
        answers_by_condition_id.insert(answer.condition_id.clone(), answer);
    }

    Ok(EvaluationContext {
        at,
        region,
        presences,
        rules,
        answers_by_condition_id,
    })
}

/// One method per mutation kind in the §4.4 invalidation table. Every
/// method deletes rather than updates — deletion is always safe, it only
/// ever forces a cache miss, never serves a stale row.
pub struct CacheInvalidator {
    repos: Repositories,
}

impl CacheInvalidator {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Presence create/delete in region R for user U: delete (U, R).
    pub async fn on_presence_mutation(&self, user_id: UserId, region_id: &RegionId) -> CoreResult<()> {
        self.repos.evaluation.delete(user_id, region_id).await
    }

    /// Answer create/update/delete for user U, condition C (region R):
    /// delete (U, R).
    pub async fn on_answer_mutation(&self, user_id: UserId, region_id: &RegionId) -> CoreResult<()> {
        self.repos.evaluation.delete(user_id, region_id).await
    }

    /// Region upsert R: delete all (*, R).
    pub async fn on_region_upsert(&self, region_id: &RegionId) -> CoreResult<()> {
        self.repos.evaluation.delete_by_region(region_id).await
    }

    /// Rule upsert (region R): delete all (*, R).
    pub async fn on_rule_upsert(&self, region_id: &RegionId) -> CoreResult<()> {
        self.repos.evaluation.delete_by_region(region_id).await
    }

    /// Condition upsert (region R): delete all (*, R).
    pub async fn on_condition_upsert(&self, region_id: &RegionId) -> CoreResult<()> {
        self.repos.evaluation.delete_by_region(region_id).await
    }
}
