use crate::domain::ids::{RegionId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One calendar day the user was present in a region. Primary key
/// `(userId, regionId, date)`; dense by construction — ranges are expanded
/// into one row per day at the repository boundary, never stored as ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presence {
    pub user_id: UserId,
    pub region_id: RegionId,
    pub date: NaiveDate,
    pub device_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Inclusive day range accepted by the presence create/delete surface;
/// expanded server-side into one `Presence` row per calendar day.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn expand(&self) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut cur = self.start;
        while cur <= self.end {
            dates.push(cur);
            cur = cur.succ_opt().expect("date range within representable bounds");
        }
        dates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_is_inclusive_on_both_ends() {
        let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let range = DateRange { start, end };
        assert_eq!(range.expand().len(), 10);
        assert_eq!(range.expand().first().copied(), Some(start));
        assert_eq!(range.expand().last().copied(), Some(end));
    }
}
