use chrono::{DateTime, FixedOffset, Local, SubsecRound, TimeZone, Utc};
use sqlx::SqlitePool;

pub(crate) async fn is_table_exists(
    pool: &SqlitePool,
    table_name: &str,
) -> Result<bool, sqlx::Error> {
    Ok(
        sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name = ?")
            .bind(table_name)
            .fetch_optional(pool)
            .await?
            .is_some(),
    )
}

/// Current local time with millisecond precision.
pub fn get_now() -> DateTime<FixedOffset> {
    let now = Local::now();
    now.with_timezone(now.offset()).trunc_subsecs(3)
}

/// UTC midnight of the calendar day `at` falls on in its own offset.
pub fn start_of_day(at: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    at.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| Utc.from_utc_datetime(&midnight).into())
        .unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn start_of_day_keeps_local_date_at_utc() {
        let at = DateTime::parse_from_rfc3339("2024-03-09T17:45:12.250+07:00").unwrap();
        let midnight = start_of_day(at);

        assert_eq!(midnight.date_naive(), at.date_naive());
        assert_eq!(midnight.offset().local_minus_utc(), 0);
        assert_eq!(midnight.hour(), 0);
        assert_eq!(midnight.nanosecond(), 0);

        let late = DateTime::parse_from_rfc3339("2024-03-09T23:30:00-04:00").unwrap();
        assert_eq!(start_of_day(late), midnight);
    }
}
