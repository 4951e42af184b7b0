//! Period calculator (C1): maps a period spec plus a region's fiscal
//! calendar into a concrete `[start, end]` date window, and folds a rule
//! list's strategy leaves into one covering window for the context
//! builder (C4) to fetch presences with a single query.

use crate::domain::{Period, Region, Rule, RuleNode};
use crate::errors::CoreError;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

/// Construct a UTC timestamp the way Go's `time.Date` does: month and day
/// components outside their normal ranges roll over into adjacent months
/// and years instead of erroring. The original source relies on this
/// normalization (e.g. `AddDate` with negative deltas); replicating it
/// here keeps boundary arithmetic identical.
fn normalized_date(year: i64, month: i64, day: i64, time: NaiveTime) -> DateTime<Utc> {
    let month_index = month - 1;
    let year_adjust = month_index.div_euclid(12);
    let month_normalized = (month_index.rem_euclid(12) + 1) as u32;
    let year_final = (year + year_adjust) as i32;

    let base = NaiveDate::from_ymd_opt(year_final, month_normalized, 1)
        .expect("normalized month is always 1..=12");
    let date = base + Duration::days(day - 1);

    DateTime::<Utc>::from_naive_utc_and_offset(date.and_time(time), Utc)
}

fn midnight(_at: DateTime<Utc>) -> NaiveTime {
    NaiveTime::from_hms_opt(0, 0, 0).unwrap()
}

/// Compute `[start, end]` for one period spec, given the region's fiscal
/// year boundary and the point-in-time `at`.
pub fn compute_period(
    at: DateTime<Utc>,
    region: &Region,
    period: &Period,
) -> Result<(DateTime<Utc>, DateTime<Utc>), CoreError> {
    match period {
        Period::Year { years, offset_years } => {
            let midnight_time = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
            let boundary = normalized_date(
                at.year() as i64,
                region.year_start_month as i64,
                region.year_start_day as i64,
                midnight_time,
            );

            let current_year = if at < boundary {
                at.year() as i64 - 1
            } else {
                at.year() as i64
            };

            let years = (*years).max(1) as i64;
            let final_year = current_year - *offset_years as i64;
            let start_year = final_year - (years - 1);

            let start = normalized_date(
                start_year,
                region.year_start_month as i64,
                region.year_start_day as i64,
                midnight_time,
            );
            let end = normalized_date(
                final_year + 1,
                region.year_start_month as i64,
                region.year_start_day as i64,
                midnight_time,
            ) - Duration::seconds(1);

            Ok((start, end))
        }
        Period::Rolling {
            rolling_days,
            rolling_months,
            rolling_years,
        } => {
            let start = normalized_date(
                at.year() as i64 - rolling_years,
                at.month() as i64 - rolling_months,
                at.day() as i64 - rolling_days,
                at.time(),
            );
            let end_of_day = normalized_date(
                at.year() as i64,
                at.month() as i64,
                at.day() as i64 + 1,
                midnight(at),
            ) - Duration::seconds(1);

            Ok((start, end_of_day))
        }
    }
}

/// Fold every strategy leaf in `rules` into one `[minStart, maxEnd]`
/// covering window. Returns `None` if the rule list has no strategy
/// leaves at all, so the context builder can skip the presence query
/// entirely rather than issuing a query against a zero-width window.
///
/// Unlike the original's max-period fold (which only inspected each
/// rule's root node), this walks the full tree: a strategy leaf nested
/// under `CompositeAnd`/`CompositeAny` still contributes its window. The
/// spec text ("walk all strategy nodes in the rule list") requires this;
/// treating only root-level strategies would silently under-fetch
/// presences for any rule with a composite root.
pub fn compute_max_period(
    at: DateTime<Utc>,
    region: &Region,
    rules: &[Rule],
) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, CoreError> {
    let mut bounds: Option<(DateTime<Utc>, DateTime<Utc>)> = None;

    for rule in rules {
        fold_node(at, region, &rule.node, &mut bounds)?;
    }

    Ok(bounds)
}

fn fold_node(
    at: DateTime<Utc>,
    region: &Region,
    node: &RuleNode,
    bounds: &mut Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> Result<(), CoreError> {
    match node {
        RuleNode::CompositeAnd { children } | RuleNode::CompositeAny { children } => {
            for child in children {
                fold_node(at, region, child, bounds)?;
            }
            Ok(())
        }
        RuleNode::Strategy(strategy) => {
            let (start, end) = compute_period(at, region, &strategy.period)?;
            *bounds = Some(match bounds {
                Some((min_start, max_end)) => (start.min(*min_start), end.max(*max_end)),
                None => (start, end),
            });
            Ok(())
        }
        RuleNode::Condition(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LatLng, RegionId, RegionType};
    use chrono::TimeZone;

    fn region(year_start_month: u32, year_start_day: u32) -> Region {
        Region {
            id: RegionId::parse("JE").unwrap(),
            parent_region_id: None,
            name: "Jersey".to_string(),
            region_type: RegionType::Country,
            continent: "Europe".to_string(),
            year_start_month,
            year_start_day,
            lat_lng: None::<LatLng>,
            sources: vec![],
        }
    }

    #[test]
    fn start_never_after_end() {
        let region = region(1, 1);
        let at = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let (start, end) = compute_period(
            at,
            &region,
            &Period::Year {
                years: 4,
                offset_years: 0,
            },
        )
        .unwrap();
        assert!(start < end);

        let (start, end) = compute_period(
            at,
            &region,
            &Period::Rolling {
                rolling_days: 365,
                rolling_months: 0,
                rolling_years: 0,
            },
        )
        .unwrap();
        assert!(start < end);
    }

    #[test]
    fn year_period_at_exact_boundary_starts_on_boundary_day() {
        let region = region(1, 1);
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let (start, _end) = compute_period(
            at,
            &region,
            &Period::Year {
                years: 1,
                offset_years: 0,
            },
        )
        .unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn one_second_before_boundary_falls_into_previous_fiscal_year() {
        let region = region(1, 1);
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let (start, end) = compute_period(
            at,
            &region,
            &Period::Year {
                years: 1,
                offset_years: 0,
            },
        )
        .unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap());
    }

    #[test]
    fn rolling_365_days_from_jan_1_starts_jan_2_prior_year() {
        let region = region(1, 1);
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let (start, _end) = compute_period(
            at,
            &region,
            &Period::Rolling {
                rolling_days: 365,
                rolling_months: 0,
                rolling_years: 0,
            },
        )
        .unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn max_period_is_none_when_no_strategy_leaves() {
        let region = region(1, 1);
        let rules: Vec<Rule> = vec![Rule {
            id: crate::domain::Code::parse("ABODE").unwrap(),
            region_id: region.id.clone(),
            name: "abode".into(),
            description: "".into(),
            node: RuleNode::Condition(crate::domain::ConditionNode {
                condition_id: crate::domain::Code::parse("MAINTAINS_ABODE").unwrap(),
                comparator: crate::domain::Comparator::Eq,
                expected: serde_json::json!(false),
            }),
        }];
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        assert!(compute_max_period(at, &region, &rules).unwrap().is_none());
    }

    #[test]
    fn max_period_folds_min_start_and_max_end_across_rules() {
        let region = region(1, 1);
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        let narrow = Rule {
            id: crate::domain::Code::parse("NARROW").unwrap(),
            region_id: region.id.clone(),
            name: "narrow".into(),
            description: "".into(),
            node: RuleNode::Strategy(crate::domain::StrategyNode {
                kind: "aggregate".into(),
                period: Period::Year {
                    years: 1,
                    offset_years: 0,
                },
                props: serde_json::json!({"threshold": 1}),
            }),
        };
        let wide = Rule {
            id: crate::domain::Code::parse("WIDE").unwrap(),
            region_id: region.id.clone(),
            name: "wide".into(),
            description: "".into(),
            node: RuleNode::Strategy(crate::domain::StrategyNode {
                kind: "average".into(),
                period: Period::Year {
                    years: 4,
                    offset_years: 0,
                },
                props: serde_json::json!({"threshold": 1}),
            }),
        };

        let (min_start, max_end) =
            compute_max_period(at, &region, &[narrow.clone(), wide.clone()])
                .unwrap()
                .unwrap();

        let (narrow_start, narrow_end) = compute_period(at, &region, &narrow_period(&narrow)).unwrap();
        let (wide_start, wide_end) = compute_period(at, &region, &narrow_period(&wide)).unwrap();

        assert_eq!(min_start, narrow_start.min(wide_start));
        assert_eq!(max_end, narrow_end.max(wide_end));
    }

    fn narrow_period(rule: &Rule) -> Period {
        match &rule.node {
            RuleNode::Strategy(s) => match &s.period {
                Period::Year { years, offset_years } => Period::Year {
                    years: *years,
                    offset_years: *offset_years,
                },
                Period::Rolling {
                    rolling_days,
                    rolling_months,
                    rolling_years,
                } => Period::Rolling {
                    rolling_days: *rolling_days,
                    rolling_months: *rolling_months,
                    rolling_years: *rolling_years,
                },
            },
            _ => unreachable!(),
        }
    }
}
