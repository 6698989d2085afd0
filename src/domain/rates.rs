//! Reference-rate tables consulted by [`crate::payroll::rate_book`]. Rows are
//! either global (no `company_id`) or tenant overrides, distinguished per
//! table by an `Option<Uuid>` company scope.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceType {
    Health,
    Care,
    Pension,
    Employment,
}

/// A health/care/pension/employment premium rate row, scoped by prefecture
/// for health/care and nationwide for pension/employment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceRate {
    pub id: Uuid,
    /// `None` for a global rate row, `Some(company_id)` for a tenant override.
    pub company_id: Option<Uuid>,
    pub insurance_type: InsuranceType,
    pub prefecture: Option<String>,
    pub employee_rate: Decimal,
    pub employer_rate: Decimal,
    pub care_insurance_rate: Option<Decimal>,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    MonthlyKou,
    DailyKou,
    Otsu,
    Hei,
}

/// A single bracket row of the withholding tax table (源泉徴収税額表).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeTaxTable {
    pub id: Uuid,
    pub table_type: TableType,
    pub income_from: i64,
    pub income_to: Option<i64>,
    pub dependents_count: u32,
    pub tax_amount: i64,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
}

/// Statutory cap on tax-free commuting allowance, keyed by commute method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommuteTaxLimit {
    pub id: Uuid,
    pub commute_method: crate::domain::CommuteMethod,
    pub monthly_limit: i64,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
}

/// A named numeric constant used by insurance calculations (e.g. the
/// standard-remuneration ceiling for employment insurance), scoped
/// tenant-over-global the same as [`InsuranceRate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceConstant {
    pub id: Uuid,
    pub company_id: Option<Uuid>,
    pub constant_type: String,
    pub value: Decimal,
    pub valid_from: NaiveDate,
    pub valid_to: Option<NaiveDate>,
}
