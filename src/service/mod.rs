//! `EvaluationService` (C4+C3 facade), grounded on the original's
//! `internal/app/evaluator`/`internal/service.EvaluationService`: one
//! orchestration type both the HTTP read path and the worker call
//! through, so the cache-then-evaluate sequence has a single
//! implementation rather than being duplicated per caller.

use crate::broker::EventPublisher;
use crate::context::build_context;
use crate::domain::{EvaluateOpts, RegionEvaluation, RegionId, UserId};
use crate::engine;
use crate::errors::CoreResult;
use crate::logger::{log, LogTag};
use crate::repository::Repositories;
use crate::strategies::StrategyRegistry;
use chrono::Utc;
use std::sync::Arc;

pub struct EvaluationService {
    repos: Repositories,
    strategies: Arc<StrategyRegistry>,
    publisher: Arc<dyn EventPublisher>,
}

impl EvaluationService {
    pub fn new(repos: Repositories, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            repos,
            strategies: Arc::new(StrategyRegistry::new()),
            publisher,
        }
    }

    /// Cache read path, then context build + evaluate, then cache write
    /// and event publish — each gated by its own `EvaluateOpts` flag
    /// (§4.4, §4.5).
    pub async fn evaluate_region(
        &self,
        user_id: UserId,
        region_id: &RegionId,
        opts: EvaluateOpts,
    ) -> CoreResult<RegionEvaluation> {
        if !opts.recompute {
            if let Some(cached) = self.repos.evaluation.get(user_id, region_id).await? {
                log(
                    LogTag::Cache,
                    "DEBUG",
                    &format!("cache hit for user={user_id} region={region_id}"),
                );
                return Ok(cached);
            }
        }

        let ctx = build_context(&self.repos, opts.point_in_time, user_id, region_id).await?;
        let (nodes, passed) = engine::evaluate_region(&ctx, &self.strategies);

        let evaluation = RegionEvaluation {
            user_id,
            region_id: region_id.clone(),
            passed,
            nodes,
            point_in_time: opts.point_in_time,
            evaluated_at: Utc::now(),
        };

        if opts.cache {
            self.repos.evaluation.upsert(&evaluation).await?;
        }

        if opts.publish {
            if let Err(e) = self.publisher.publish_evaluation_created(user_id, region_id).await {
                log(
                    LogTag::Engine,
                    "WARN",
                    &format!("failed to publish evaluation.created: {e}"),
                );
            }
        }

        log(
            LogTag::Engine,
            "INFO",
            &format!("evaluated user={user_id} region={region_id} passed={passed}"),
        );

        Ok(evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::NullPublisher;
    use crate::domain::{
        Answer, Code, ConditionNode, Comparator, LatLng, Presence, Region, RegionType, Rule,
        RuleNode, StrategyNode, Period,
    };
    use crate::errors::CoreError;
    use crate::repository::{
        AnswerRepository, ConditionRepository, DeviceRepository, EvaluationRepository,
        PresenceRepository, RegionRepository, RuleRepository, UserRepository,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, TimeZone};
    use std::sync::Mutex;

    struct FakeRegionRepo(Region);
    #[async_trait]
    impl RegionRepository for FakeRegionRepo {
        async fn get(&self, _id: &RegionId) -> CoreResult<Region> {
            Ok(self.0.clone())
        }
        async fn list(&self) -> CoreResult<Vec<Region>> {
            Ok(vec![self.0.clone()])
        }
        async fn upsert(&self, _region: &Region) -> CoreResult<()> {
            Ok(())
        }
    }

    struct FakeRuleRepo(Vec<Rule>);
    #[async_trait]
    impl RuleRepository for FakeRuleRepo {
        async fn get(&self, id: &Code) -> CoreResult<Rule> {
            self.0
                .iter()
                .find(|r| &r.id == id)
                .cloned()
                .ok_or_else(|| CoreError::not_found("rule"))
        }
        async fn list_for_region(&self, _region_id: &RegionId) -> CoreResult<Vec<Rule>> {
            Ok(self.0.clone())
        }
        async fn upsert(&self, _rule: &Rule) -> CoreResult<()> {
            Ok(())
        }
    }

    struct FakeConditionRepo;
    #[async_trait]
    impl ConditionRepository for FakeConditionRepo {
        async fn get(&self, _id: &Code) -> CoreResult<crate::domain::ConditionDef> {
            Err(CoreError::not_found("condition"))
        }
        async fn list_for_region(&self, _region_id: &RegionId) -> CoreResult<Vec<crate::domain::ConditionDef>> {
            Ok(vec![])
        }
        async fn upsert(&self, _condition: &crate::domain::ConditionDef) -> CoreResult<()> {
            Ok(())
        }
    }

    struct FakeAnswerRepo(Vec<Answer>);
    #[async_trait]
    impl AnswerRepository for FakeAnswerRepo {
        async fn list_for_user_and_region(&self, _user_id: UserId, _region_id: &RegionId) -> CoreResult<Vec<Answer>> {
            Ok(self.0.clone())
        }
        async fn upsert(&self, _answer: &Answer) -> CoreResult<()> {
            Ok(())
        }
        async fn delete(&self, _user_id: UserId, _condition_id: &Code) -> CoreResult<()> {
            Ok(())
        }
    }

    struct FakePresenceRepo(Vec<Presence>);
    #[async_trait]
    impl PresenceRepository for FakePresenceRepo {
        async fn list_in_range(
            &self,
            _user_id: UserId,
            _region_id: &RegionId,
            start: NaiveDate,
            end: NaiveDate,
        ) -> CoreResult<Vec<Presence>> {
            Ok(self.0.iter().filter(|p| p.date >= start && p.date <= end).cloned().collect())
        }
        async fn create_range(
            &self,
            _user_id: UserId,
            _region_id: &RegionId,
            _range: crate::domain::DateRange,
            _device_id: Option<&str>,
        ) -> CoreResult<()> {
            Ok(())
        }
        async fn delete_range(
            &self,
            _user_id: UserId,
            _region_id: &RegionId,
            _range: crate::domain::DateRange,
        ) -> CoreResult<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeEvaluationRepo(Mutex<Option<RegionEvaluation>>);
    #[async_trait]
    impl EvaluationRepository for FakeEvaluationRepo {
        async fn get(&self, _user_id: UserId, _region_id: &RegionId) -> CoreResult<Option<RegionEvaluation>> {
            Ok(self.0.lock().unwrap().clone())
        }
        async fn upsert(&self, evaluation: &RegionEvaluation) -> CoreResult<()> {
            *self.0.lock().unwrap() = Some(evaluation.clone());
            Ok(())
        }
        async fn delete(&self, _user_id: UserId, _region_id: &RegionId) -> CoreResult<()> {
            *self.0.lock().unwrap() = None;
            Ok(())
        }
        async fn delete_by_region(&self, _region_id: &RegionId) -> CoreResult<()> {
            *self.0.lock().unwrap() = None;
            Ok(())
        }
    }

    struct FakeDeviceRepo;
    #[async_trait]
    impl DeviceRepository for FakeDeviceRepo {
        async fn list_for_user(&self, _user_id: UserId) -> CoreResult<Vec<crate::repository::Device>> {
            Ok(vec![])
        }
        async fn upsert(&self, _device: &crate::repository::Device) -> CoreResult<()> {
            Ok(())
        }
        async fn delete(&self, _id: &str) -> CoreResult<()> {
            Ok(())
        }
    }

    struct FakeUserRepo;
    #[async_trait]
    impl UserRepository for FakeUserRepo {
        async fn get(&self, id: UserId) -> CoreResult<crate::repository::User> {
            Ok(crate::repository::User {
                id,
                external_id: "ext".into(),
                created_at: Utc::now(),
            })
        }
        async fn get_by_external_id(&self, _external_id: &str) -> CoreResult<crate::repository::User> {
            Err(CoreError::not_found("user"))
        }
        async fn upsert(&self, external_id: &str) -> CoreResult<crate::repository::User> {
            Ok(crate::repository::User {
                id: UserId(1),
                external_id: external_id.into(),
                created_at: Utc::now(),
            })
        }
    }

    fn region() -> Region {
        Region {
            id: RegionId::parse("JE").unwrap(),
            parent_region_id: None,
            name: "Jersey".into(),
            region_type: RegionType::Country,
            continent: "Europe".into(),
            year_start_month: 1,
            year_start_day: 1,
            lat_lng: None::<LatLng>,
            sources: vec![],
        }
    }

    fn repos_with(rules: Vec<Rule>, presences: Vec<Presence>, answers: Vec<Answer>) -> Repositories {
        Repositories {
            region: Arc::new(FakeRegionRepo(region())),
            rule: Arc::new(FakeRuleRepo(rules)),
            condition: Arc::new(FakeConditionRepo),
            answer: Arc::new(FakeAnswerRepo(answers)),
            presence: Arc::new(FakePresenceRepo(presences)),
            evaluation: Arc::new(FakeEvaluationRepo::default()),
            device: Arc::new(FakeDeviceRepo),
            user: Arc::new(FakeUserRepo),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn recompute_false_returns_cached_row_unchanged() {
        let repos = repos_with(vec![], vec![], vec![]);
        let stale = RegionEvaluation {
            user_id: UserId(1),
            region_id: region().id,
            passed: true,
            nodes: vec![],
            point_in_time: at(),
            evaluated_at: at(),
        };
        repos.evaluation.upsert(&stale).await.unwrap();

        let service = EvaluationService::new(repos, Arc::new(NullPublisher));
        let result = service
            .evaluate_region(UserId(1), &region().id, EvaluateOpts { recompute: false, ..EvaluateOpts::default() })
            .await
            .unwrap();

        assert_eq!(result.evaluated_at, stale.evaluated_at);
    }

    #[tokio::test]
    async fn recompute_true_builds_fresh_context_and_evaluates() {
        let rule = Rule {
            id: Code::parse("ABODE").unwrap(),
            region_id: region().id,
            name: "abode".into(),
            description: "".into(),
            node: RuleNode::Condition(ConditionNode {
                condition_id: Code::parse("MAINTAINS_ABODE").unwrap(),
                comparator: Comparator::Eq,
                expected: serde_json::json!(true),
            }),
        };
        let answer = Answer {
            user_id: UserId(1),
            condition_id: Code::parse("MAINTAINS_ABODE").unwrap(),
            region_id: region().id,
            value: Some(serde_json::json!(true)),
            created_at: at(),
            updated_at: at(),
        };

        let repos = repos_with(vec![rule], vec![], vec![answer]);
        let service = EvaluationService::new(repos, Arc::new(NullPublisher));
        let result = service
            .evaluate_region(
                UserId(1),
                &region().id,
                EvaluateOpts { point_in_time: at(), recompute: true, cache: true, publish: false },
            )
            .await
            .unwrap();

        assert!(result.passed);
    }

    #[tokio::test]
    async fn recompute_true_evaluates_a_strategy_node_against_presences() {
        let rule = Rule {
            id: Code::parse("DAYS").unwrap(),
            region_id: region().id,
            name: "days".into(),
            description: "".into(),
            node: RuleNode::Strategy(StrategyNode {
                kind: "aggregate".into(),
                period: Period::Year { years: 1, offset_years: 0 },
                props: serde_json::json!({"threshold": 1}),
            }),
        };
        let presences = vec![Presence {
            user_id: UserId(1),
            region_id: region().id,
            date: chrono::NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            device_id: None,
            created_at: at(),
            updated_at: at(),
        }];

        let repos = repos_with(vec![rule], presences, vec![]);
        let service = EvaluationService::new(repos, Arc::new(NullPublisher));
        let result = service
            .evaluate_region(
                UserId(1),
                &region().id,
                EvaluateOpts { point_in_time: at(), recompute: true, cache: true, publish: false },
            )
            .await
            .unwrap();

        assert!(result.passed);
    }
}
