pub mod analysis;
pub mod forecast;
pub mod observation;

use chrono::NaiveDate;
use serde::Serializer;

/// Render a monthly period date as "YYYY-MM".
pub(crate) fn serialize_month<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&date.format("%Y-%m").to_string())
}

pub(crate) fn serialize_month_opt<S>(
    date: &Option<NaiveDate>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match date {
        Some(d) => serialize_month(d, serializer),
        None => serializer.serialize_none(),
    }
}
