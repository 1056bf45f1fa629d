//! Small helpers shared by scenarios

use std::future::Future;
use std::time::Instant;

use chrono::{Duration, Local, Months, NaiveDate};

/// Await `fut` and report how long it took in wall-clock milliseconds
pub async fn measure_ms<F, T>(fut: F) -> (T, u64)
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let result = fut.await;
    (result, start.elapsed().as_millis() as u64)
}

/// `YYYY-MM-DD`, the format the visit date input accepts
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn today() -> String {
    iso_date(Local::now().date_naive())
}

pub fn yesterday() -> String {
    iso_date(Local::now().date_naive() - Duration::days(1))
}

/// Same day next year; Feb 29 clamps to Feb 28
pub fn one_year_from_today() -> String {
    let today = Local::now().date_naive();
    iso_date(today.checked_add_months(Months::new(12)).unwrap_or(today + Duration::days(365)))
}
