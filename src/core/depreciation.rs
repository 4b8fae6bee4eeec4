//! Straight-line depreciation engine.
//!
//! Computes the book value of an item at a point in time and its full
//! year-by-year amortization schedule. All monetary amounts are whole currency
//! units and every division floors, so a reported value is never above the
//! true straight-line value. A fully depreciated asset keeps a residual
//! (memorandum) value instead of dropping to zero.
//!
//! The engine is pure: it has no state beyond the [`DepreciationPolicy`] it is
//! called with and never touches the item store.

use crate::errors::{Error, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Residual value kept by a fully depreciated asset.
pub const DEFAULT_RESIDUAL_VALUE: i64 = 1;

/// Average calendar year length, accounting for leap years.
pub const DEFAULT_DAYS_PER_YEAR: f64 = 365.25;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Purchase years must lie strictly between these bounds.
const MIN_PURCHASE_YEAR: i32 = 1900;
const MAX_PURCHASE_YEAR: i32 = 2100;

/// Policy constants for the straight-line method.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepreciationPolicy {
    /// Value a fully depreciated asset retains
    pub residual_value: i64,
    /// Length of one year of useful life, in days
    pub days_per_year: f64,
}

impl Default for DepreciationPolicy {
    fn default() -> Self {
        Self {
            residual_value: DEFAULT_RESIDUAL_VALUE,
            days_per_year: DEFAULT_DAYS_PER_YEAR,
        }
    }
}

/// One year of the amortization schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// 1-based year of useful life
    pub year: u32,
    /// Calendar year the entry belongs to (purchase year + index)
    pub fiscal_year: i32,
    /// Depreciation booked in this year
    pub depreciation: i64,
    /// Depreciation booked up to and including this year
    pub cumulative_depreciation: i64,
    /// Book value at the end of this year
    pub book_value: i64,
}

/// Derived depreciation figures for one item at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationResult {
    /// Elapsed share of the useful life, clamped to `[0, 1]`
    pub progress: f64,
    /// Days between purchase and the evaluation time (may be negative)
    pub days_elapsed: f64,
    /// Straight-line value at the evaluation time
    pub book_value: i64,
    /// Residual value applied by the policy
    pub residual_value: i64,
    /// Regular yearly depreciation amount
    pub annual_depreciation: i64,
    /// Year-by-year schedule over the whole useful life
    pub yearly_breakdown: Vec<ScheduleEntry>,
}

impl DepreciationResult {
    /// True once the whole useful life has elapsed.
    #[must_use]
    pub fn is_fully_depreciated(&self) -> bool {
        self.progress >= 1.0
    }

    /// Total depreciation booked so far.
    #[must_use]
    pub const fn accumulated_depreciation(&self, purchase_price: i64) -> i64 {
        purchase_price - self.book_value
    }
}

/// Parses a purchase date in `YYYY-MM-DD` form.
///
/// Blank input and dates outside the supported range are reported as
/// [`Error::InvalidDate`], the same as unparseable text.
pub fn parse_purchase_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidDate {
            reason: "purchase date is missing".to_string(),
        });
    }

    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|e| Error::InvalidDate {
        reason: format!("cannot parse purchase date {trimmed:?}: {e}"),
    })?;
    validate_purchase_date(date)?;
    Ok(date)
}

fn validate_purchase_date(date: NaiveDate) -> Result<()> {
    let year = date.year();
    if year <= MIN_PURCHASE_YEAR || year >= MAX_PURCHASE_YEAR {
        return Err(Error::InvalidDate {
            reason: format!(
                "purchase year {year} outside {MIN_PURCHASE_YEAR}..{MAX_PURCHASE_YEAR}"
            ),
        });
    }
    Ok(())
}

impl DepreciationPolicy {
    /// Checks that the policy constants can produce finite values.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `days_per_year` is not a finite positive
    /// number or `residual_value` is negative.
    pub fn validate(&self) -> Result<()> {
        if !self.days_per_year.is_finite() || self.days_per_year <= 0.0 {
            return Err(Error::Config {
                message: format!(
                    "depreciation.days_per_year must be a positive number, got {}",
                    self.days_per_year
                ),
            });
        }
        if self.residual_value < 0 {
            return Err(Error::Config {
                message: format!(
                    "depreciation.residual_value must not be negative, got {}",
                    self.residual_value
                ),
            });
        }
        Ok(())
    }

    /// Computes book value and schedule as of `as_of`.
    ///
    /// # Errors
    /// - [`Error::InvalidDate`] if `purchase_date` is missing or its year is not
    ///   strictly between 1900 and 2100
    /// - [`Error::InvalidInput`] if `lifespan_years` is zero
    /// - [`Error::Config`] if the policy itself is invalid
    pub fn compute(
        &self,
        purchase_date: Option<NaiveDate>,
        purchase_price: i64,
        lifespan_years: u32,
        as_of: NaiveDateTime,
    ) -> Result<DepreciationResult> {
        self.validate()?;
        let purchase_date = purchase_date.ok_or_else(|| Error::InvalidDate {
            reason: "purchase date is missing".to_string(),
        })?;
        validate_purchase_date(purchase_date)?;

        if lifespan_years == 0 {
            return Err(Error::InvalidInput {
                field: "lifespan",
                message: "useful life must be at least one year".to_string(),
            });
        }

        let total_days = f64::from(lifespan_years) * self.days_per_year;
        let purchased_at = purchase_date.and_time(chrono::NaiveTime::MIN);
        #[allow(clippy::cast_precision_loss)]
        let days_elapsed = (as_of - purchased_at).num_seconds() as f64 / SECONDS_PER_DAY;
        let progress = (days_elapsed / total_days).clamp(0.0, 1.0);

        let book_value = if progress >= 1.0 {
            self.residual_value
        } else {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            let straight_line = (purchase_price as f64 * (1.0 - progress)).floor() as i64;
            straight_line.max(self.residual_value.min(purchase_price))
        };

        let annual_depreciation = self.annual_depreciation(purchase_price, lifespan_years);
        let yearly_breakdown = self.schedule(purchase_date, purchase_price, lifespan_years);

        Ok(DepreciationResult {
            progress,
            days_elapsed,
            book_value,
            residual_value: self.residual_value,
            annual_depreciation,
            yearly_breakdown,
        })
    }

    fn depreciable_amount(&self, purchase_price: i64) -> i64 {
        (purchase_price - self.residual_value).max(0)
    }

    /// Regular yearly depreciation: `floor((price - residual) / years)`.
    #[must_use]
    pub fn annual_depreciation(&self, purchase_price: i64, lifespan_years: u32) -> i64 {
        if lifespan_years == 0 {
            return 0;
        }
        self.depreciable_amount(purchase_price) / i64::from(lifespan_years)
    }

    /// Builds the year-by-year schedule. The final year absorbs the rounding
    /// remainder so the last book value lands exactly on the residual value.
    #[must_use]
    pub fn schedule(
        &self,
        purchase_date: NaiveDate,
        purchase_price: i64,
        lifespan_years: u32,
    ) -> Vec<ScheduleEntry> {
        let depreciable = self.depreciable_amount(purchase_price);
        let annual = self.annual_depreciation(purchase_price, lifespan_years);
        let years = i64::from(lifespan_years);

        (0..lifespan_years)
            .map(|index| {
                let i = i64::from(index);
                let is_final = i + 1 == years;
                let depreciation = if is_final {
                    depreciable - annual * (years - 1)
                } else {
                    annual
                };
                let cumulative_depreciation = if is_final {
                    depreciable
                } else {
                    annual * (i + 1)
                };
                ScheduleEntry {
                    year: index + 1,
                    fiscal_year: purchase_date
                        .year()
                        .saturating_add(i32::try_from(index).unwrap_or(i32::MAX)),
                    depreciation,
                    cumulative_depreciation,
                    book_value: (purchase_price - cumulative_depreciation)
                        .max(self.residual_value),
                }
            })
            .collect()
    }
}

/// Computes depreciation with the default policy (residual 1, 365.25 days per year).
pub fn compute_depreciation(
    purchase_date: Option<NaiveDate>,
    purchase_price: i64,
    lifespan_years: u32,
    as_of: NaiveDateTime,
) -> Result<DepreciationResult> {
    DepreciationPolicy::default().compute(purchase_date, purchase_price, lifespan_years, as_of)
}

/// Computes depreciation with the default policy as of the current UTC time.
pub fn compute_depreciation_now(
    purchase_date: Option<NaiveDate>,
    purchase_price: i64,
    lifespan_years: u32,
) -> Result<DepreciationResult> {
    compute_depreciation(
        purchase_date,
        purchase_price,
        lifespan_years,
        Utc::now().naive_utc(),
    )
}
