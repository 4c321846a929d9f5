use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single dated cost record with resource attribution, as supplied by
/// the caller (billing export, usage feed). Immutable once parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub cost: f64,
    pub resource_type: String,
    #[serde(default)]
    pub resource_group: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}
