use crate::domain::ids::RegionId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionType {
    Country,
    Province,
    Zone,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Process-wide read-only catalog data. Immutable for the duration of an
/// evaluation; mutated only by the out-of-band seed/upsert path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub parent_region_id: Option<RegionId>,
    pub name: String,
    pub region_type: RegionType,
    pub continent: String,
    /// Fiscal year boundary, 1..12.
    pub year_start_month: u32,
    /// Fiscal year boundary, 1..31.
    pub year_start_day: u32,
    pub lat_lng: Option<LatLng>,
    pub sources: Vec<String>,
}
