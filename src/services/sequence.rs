use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

use crate::entities::mrp_request;
use crate::errors::{ServiceError, ServiceResult};

pub const REQUEST_PREFIX: &str = "RQ";
pub const PRODUCTION_PREFIX: &str = "MO";

/// `RQ<DDMMYY><3-digit sequence>`
pub fn format_request_name(date: NaiveDate, sequence: u64) -> String {
    format!("{}{}{:03}", REQUEST_PREFIX, date.format("%d%m%y"), sequence)
}

/// Production order name derived from its request: `RQ151124001` -> `MO151124001`.
pub fn production_name(request_name: &str) -> String {
    let suffix = request_name
        .strip_prefix(REQUEST_PREFIX)
        .unwrap_or(request_name);
    format!("{}{}", PRODUCTION_PREFIX, suffix)
}

fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::default()));
    (start, start + Duration::days(1))
}

/// Next identifier for a request created at `now`.
///
/// Counts the requests already created that calendar day, so two concurrent creations
/// can receive the same name. Names are not unique in storage.
pub async fn next_request_name<C: ConnectionTrait>(
    db: &C,
    now: DateTime<Utc>,
) -> ServiceResult<String> {
    let date = now.date_naive();
    let (start, end) = day_bounds(date);
    let existing = mrp_request::Entity::find()
        .filter(mrp_request::Column::CreatedAt.gte(start))
        .filter(mrp_request::Column::CreatedAt.lt(end))
        .count(db)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(format_request_name(date, existing + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_day_month_year() {
        let date = NaiveDate::from_ymd_opt(2024, 11, 15).unwrap();
        assert_eq!(format_request_name(date, 1), "RQ151124001");
        assert_eq!(format_request_name(date, 2), "RQ151124002");
        assert_eq!(format_request_name(date, 1234), "RQ1511241234");
    }

    #[test]
    fn production_name_swaps_prefix() {
        assert_eq!(production_name("RQ151124001"), "MO151124001");
        assert_eq!(production_name("LEGACY-7"), "MOLEGACY-7");
    }

    proptest! {
        #[test]
        fn request_name_round_trips_into_production_name(
            day in 1u32..=28,
            month in 1u32..=12,
            year in 2000i32..2099,
            seq in 1u64..1000,
        ) {
            let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
            let name = format_request_name(date, seq);
            prop_assert_eq!(name.len(), 11);
            prop_assert!(name.starts_with("RQ"));
            let mo = production_name(&name);
            prop_assert_eq!(&mo[2..], &name[2..]);
            prop_assert!(mo.starts_with("MO"));
        }
    }
}
