//! Listings and zip-code datasets, memoized for the life of the process.

use crate::cache::{Cache, EvictionPolicy};
use crate::error::AppError;
use crate::query::{Dataset, Params, QueryExecutor, SqlValue};
use chrono::NaiveDate;
use std::sync::Arc;

/// Maximum rows returned by `get_listings`; spelled out in `LISTINGS_SQL`.
pub const LISTINGS_ROW_LIMIT: i64 = 1000;

pub const LISTINGS_SQL: &str = "SELECT l.listing_id, l.date, l.price, l.bedrooms, l.bathrooms, \
     a.street, a.city, a.state, a.zip, g.latitude, g.longitude \
     FROM listings l \
     JOIN addresses a ON a.address_id = l.address_id \
     LEFT JOIN geocodes g ON g.address_id = a.address_id \
     WHERE l.date >= :start AND l.date <= :end \
     ORDER BY l.date, l.listing_id \
     LIMIT 1000";

pub const ZIP_CODES_SQL: &str =
    "SELECT DISTINCT zip FROM addresses WHERE zip IS NOT NULL ORDER BY zip";

pub const ZIP_COLUMN: &str = "zip";
pub const DATE_COLUMN: &str = "date";

/// Earliest date the dashboard offers.
pub fn min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Inclusive date range within `[min_date(), today]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Result<Self, AppError> {
        check_order(start, end)?;
        if start < min_date() {
            return Err(AppError::Validation(format!(
                "start date {} is before {}",
                start,
                min_date()
            )));
        }
        if end > today {
            return Err(AppError::Validation(format!(
                "end date {} is after today ({})",
                end, today
            )));
        }
        Ok(Self { start, end })
    }
}

fn check_order(start: NaiveDate, end: NaiveDate) -> Result<(), AppError> {
    if start > end {
        return Err(AppError::Validation(format!(
            "start date {} is after end date {}",
            start, end
        )));
    }
    Ok(())
}

pub struct ListingsAssembler {
    executor: QueryExecutor,
    listings: Cache<(NaiveDate, NaiveDate), Arc<Dataset>>,
    zip_codes: Cache<(), Arc<Dataset>>,
}

impl ListingsAssembler {
    pub fn new(executor: QueryExecutor) -> Self {
        Self {
            executor,
            listings: Cache::new(EvictionPolicy::Never),
            zip_codes: Cache::new(EvictionPolicy::Never),
        }
    }

    /// Listings joined with address and geocode, `start <= date <= end`,
    /// at most `LISTINGS_ROW_LIMIT` rows.
    pub fn get_listings(&mut self, start: NaiveDate, end: NaiveDate) -> Result<Arc<Dataset>, AppError> {
        check_order(start, end)?;
        let executor = &mut self.executor;
        self.listings.get_or_try_insert_with((start, end), || {
            let mut params = Params::new();
            params.insert("start".into(), SqlValue::Date(start));
            params.insert("end".into(), SqlValue::Date(end));
            let ds = executor.run_query(LISTINGS_SQL, params)?;
            log::info!("Loaded {} listings for {}..={}", ds.len(), start, end);
            Ok(ds)
        })
    }

    /// Distinct non-null zip codes known to the database.
    pub fn get_zip_codes(&mut self) -> Result<Arc<Dataset>, AppError> {
        let executor = &mut self.executor;
        self.zip_codes
            .get_or_try_insert_with((), || executor.run_query(ZIP_CODES_SQL, Params::new()))
    }
}
