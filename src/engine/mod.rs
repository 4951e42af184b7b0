//! Rule-tree evaluator (C3): walks a `RuleNode` tree against an
//! `EvaluationContext` and produces an `EvaluationComponent` subtree per
//! root rule, plus the overall AND of every root's pass state.
//!
//! Unlike the original's evaluator (which returns a Go `error` and aborts
//! the whole evaluation on a bad strategy leaf), a decode failure or
//! unknown strategy kind here becomes a node-local `Error`-status record:
//! one malformed leaf shouldn't void every other rule's result.

use crate::domain::{
    Comparator, CompositeKind, ConditionNode, EvaluationComponent, EvaluationContext,
    EvaluationStatus, RuleEvaluation, RuleNode, StrategyNode,
};
use crate::period::compute_period;
use crate::strategies::StrategyRegistry;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Evaluate every root rule in `ctx.rules` against `ctx`. Returns the
/// per-rule subtrees plus the AND of every root's `is_passed()`.
pub fn evaluate_region(
    ctx: &EvaluationContext,
    registry: &StrategyRegistry,
) -> (Vec<RuleEvaluation>, bool) {
    let mut passed = true;
    let mut evaluations = Vec::with_capacity(ctx.rules.len());

    for rule in &ctx.rules {
        let component = evaluate_node(&rule.node, ctx, registry);
        if !component.is_passed() {
            passed = false;
        }
        evaluations.push(RuleEvaluation {
            rule_id: rule.id.clone(),
            component,
        });
    }

    (evaluations, passed)
}

fn evaluate_node(
    node: &RuleNode,
    ctx: &EvaluationContext,
    registry: &StrategyRegistry,
) -> EvaluationComponent {
    match node {
        RuleNode::CompositeAnd { children } => evaluate_composite(CompositeKind::And, children, ctx, registry),
        RuleNode::CompositeAny { children } => evaluate_composite(CompositeKind::Any, children, ctx, registry),
        RuleNode::Strategy(strategy) => evaluate_strategy(strategy, ctx, registry),
        RuleNode::Condition(condition) => evaluate_condition(condition, ctx),
    }
}

fn evaluate_composite(
    kind: CompositeKind,
    children: &[RuleNode],
    ctx: &EvaluationContext,
    registry: &StrategyRegistry,
) -> EvaluationComponent {
    let components: Vec<EvaluationComponent> = children
        .iter()
        .map(|child| evaluate_node(child, ctx, registry))
        .collect();

    let passed = match kind {
        CompositeKind::And => components.iter().all(|c| c.is_passed()),
        CompositeKind::Any => components.iter().any(|c| c.is_passed()),
    };

    let status = if components.iter().any(|c| c.status() == EvaluationStatus::Error) {
        EvaluationStatus::Error
    } else if components
        .iter()
        .any(|c| c.status() == EvaluationStatus::Evaluated)
    {
        EvaluationStatus::Evaluated
    } else {
        EvaluationStatus::Unanswered
    };

    EvaluationComponent::Composite {
        node_type: kind,
        status,
        passed,
        components,
    }
}

fn evaluate_condition(node: &ConditionNode, ctx: &EvaluationContext) -> EvaluationComponent {
    let answer = ctx.answers_by_condition_id.get(&node.condition_id);

    let value = match answer.and_then(|a| a.value.as_ref()) {
        Some(value) => value,
        None => {
            return EvaluationComponent::Condition {
                condition_id: node.condition_id.clone(),
                comparator: node.comparator,
                expected: node.expected.clone(),
                actual: None,
                status: EvaluationStatus::Unanswered,
                passed: false,
                reason: Some(format!("condition {} not answered", node.condition_id)),
            };
        }
    };

    let equal = deep_equal(&node.expected, value);
    let passed = match node.comparator {
        Comparator::Eq => equal,
        Comparator::Neq => !equal,
    };

    EvaluationComponent::Condition {
        condition_id: node.condition_id.clone(),
        comparator: node.comparator,
        expected: node.expected.clone(),
        actual: Some(value.clone()),
        status: EvaluationStatus::Evaluated,
        passed,
        reason: Some(format!("condition {} evaluated", node.condition_id)),
    }
}

fn evaluate_strategy(
    node: &StrategyNode,
    ctx: &EvaluationContext,
    registry: &StrategyRegistry,
) -> EvaluationComponent {
    let (start, end) = match compute_period(ctx.at, &ctx.region, &node.period) {
        Ok(window) => window,
        Err(e) => return error_strategy_node(node, ctx.at, ctx.at, format!("compute period: {e}")),
    };

    let presence_days: HashSet<NaiveDate> = ctx
        .presences
        .iter()
        .filter(|p| p.date >= start.date_naive() && p.date <= end.date_naive())
        .map(|p| p.date)
        .collect();

    let strategy = match registry.get(&node.kind) {
        Some(strategy) => strategy,
        None => {
            return error_strategy_node(
                node,
                start,
                end,
                format!("no strategy registered for kind {}", node.kind),
            )
        }
    };

    match strategy.evaluate(&node.props, &presence_days) {
        Ok(evaluation) => EvaluationComponent::Strategy {
            strategy: node.kind.clone(),
            status: EvaluationStatus::Evaluated,
            passed: evaluation.passed,
            reason: Some(format!("strategy {} evaluated", node.kind)),
            start,
            end,
            count: evaluation.count,
            remaining: evaluation.remaining,
            metadata: evaluation.metadata,
        },
        Err(e) => error_strategy_node(node, start, end, e.to_string()),
    }
}

fn error_strategy_node(
    node: &StrategyNode,
    start: chrono::DateTime<chrono::Utc>,
    end: chrono::DateTime<chrono::Utc>,
    reason: String,
) -> EvaluationComponent {
    EvaluationComponent::Strategy {
        strategy: node.kind.clone(),
        status: EvaluationStatus::Error,
        passed: false,
        reason: Some(reason),
        start,
        end,
        count: 0,
        remaining: 0,
        metadata: serde_json::Map::new(),
    }
}

/// Structural equality across JSON value types, with numbers compared
/// numerically regardless of int/float representation — `serde_json`'s
/// derived `PartialEq` treats `183` and `183.0` as different `Number`
/// variants, which would silently break every condition leaf comparing a
/// stored integer answer against a float literal in a rule (or vice
/// versa).
fn deep_equal(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    use serde_json::Value;
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| deep_equal(v, other)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Answer, Code, LatLng, Period, Presence, Region, RegionId, RegionType, Rule, StrategyNode,
        UserId,
    };
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;

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

    fn ctx_with(rules: Vec<Rule>, presences: Vec<Presence>, answers: HashMap<Code, Answer>) -> EvaluationContext {
        EvaluationContext {
            at: Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
            region: region(),
            presences,
            rules,
            answers_by_condition_id: answers,
        }
    }

    fn presence(user: i64, region_id: &str, date: &str) -> Presence {
        Presence {
            user_id: UserId(user),
            region_id: RegionId::parse(region_id).unwrap(),
            date: chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            device_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn composite_and_requires_every_child_to_pass() {
        let rule = Rule {
            id: Code::parse("ALL").unwrap(),
            region_id: region().id,
            name: "all".into(),
            description: "".into(),
            node: RuleNode::CompositeAnd {
                children: vec![
                    RuleNode::Strategy(StrategyNode {
                        kind: "aggregate".into(),
                        period: Period::Year { years: 1, offset_years: 0 },
                        props: serde_json::json!({"threshold": 1}),
                    }),
                    RuleNode::Condition(ConditionNode {
                        condition_id: Code::parse("MAINTAINS_ABODE").unwrap(),
                        comparator: Comparator::Eq,
                        expected: serde_json::json!(true),
                    }),
                ],
            },
        };

        let presences = vec![presence(1, "JE", "2025-02-01")];
        let ctx = ctx_with(vec![rule], presences, HashMap::new());
        let registry = StrategyRegistry::new();

        let (evaluations, passed) = evaluate_region(&ctx, &registry);
        assert!(!passed);
        assert_eq!(evaluations.len(), 1);
        assert_eq!(evaluations[0].component.status(), EvaluationStatus::Evaluated);
    }

    #[test]
    fn unanswered_condition_does_not_block_composite_any() {
        let rule = Rule {
            id: Code::parse("ANY").unwrap(),
            region_id: region().id,
            name: "any".into(),
            description: "".into(),
            node: RuleNode::CompositeAny {
                children: vec![
                    RuleNode::Strategy(StrategyNode {
                        kind: "aggregate".into(),
                        period: Period::Year { years: 1, offset_years: 0 },
                        props: serde_json::json!({"threshold": 1}),
                    }),
                    RuleNode::Condition(ConditionNode {
                        condition_id: Code::parse("MAINTAINS_ABODE").unwrap(),
                        comparator: Comparator::Eq,
                        expected: serde_json::json!(true),
                    }),
                ],
            },
        };

        let presences = vec![presence(1, "JE", "2025-02-01")];
        let ctx = ctx_with(vec![rule], presences, HashMap::new());
        let registry = StrategyRegistry::new();

        let (_evaluations, passed) = evaluate_region(&ctx, &registry);
        assert!(passed);
    }

    #[test]
    fn condition_compares_numbers_across_int_and_float() {
        let node = ConditionNode {
            condition_id: Code::parse("DAYS").unwrap(),
            comparator: Comparator::Eq,
            expected: serde_json::json!(183),
        };
        let mut answers = HashMap::new();
        answers.insert(
            Code::parse("DAYS").unwrap(),
            Answer {
                user_id: UserId(1),
                condition_id: Code::parse("DAYS").unwrap(),
                region_id: region().id,
                value: Some(serde_json::json!(183.0)),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        let ctx = ctx_with(vec![], vec![], answers);
        let evaluation = evaluate_condition(&node, &ctx);
        assert!(evaluation.is_passed());
    }

    #[test]
    fn unknown_strategy_kind_yields_error_status_not_panic() {
        let node = StrategyNode {
            kind: "nonexistent".into(),
            period: Period::Year { years: 1, offset_years: 0 },
            props: serde_json::json!({}),
        };
        let ctx = ctx_with(vec![], vec![], HashMap::new());
        let registry = StrategyRegistry::new();
        let evaluation = evaluate_strategy(&node, &ctx, &registry);
        assert_eq!(evaluation.status(), EvaluationStatus::Error);
        assert!(!evaluation.is_passed());
    }
}
