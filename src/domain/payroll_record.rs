//! The versioned payroll record aggregate: a group holds every version of a
//! payroll record for one (employee, period); only [`crate::payroll::state_machine`]
//! is allowed to mutate status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayrollRecordStatus {
    Draft,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Earning,
    Deduction,
}

/// Tracks every version of one (employee, payroll period)'s payroll record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollRecordGroup {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub payroll_period_id: Uuid,
    pub current_record_id: Option<Uuid>,
}

/// The intermediate scalars `PayrollCalculator` produces alongside the line
/// items, carried on the record for audit and re-derivation. A closed type
/// rather than a free-form JSON blob, per the donor's preference for tagged
/// structured payloads over schemaless columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationDetails {
    pub salary_type: String,
    pub base_salary: i64,
    pub base_hourly_rate: i64,
    pub gross_salary: i64,
    pub social_insurance_total: i64,
    pub taxable_earnings: i64,
    pub income_tax: i64,
    pub work_days: u32,
    pub total_work_minutes: i64,
    pub employee_age: Option<u32>,
    pub notes: Vec<String>,
}

/// One version of a payroll record within a [`PayrollRecordGroup`]. Immutable
/// once it leaves `draft`, except for the status-transition fields
/// (`confirmed_*`, `cancelled_*`) that the state machine itself stamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub id: Uuid,
    pub company_id: Uuid,
    pub group_id: Uuid,
    pub version: u32,
    pub status: PayrollRecordStatus,

    pub total_earnings: i64,
    pub total_deductions: i64,
    pub net_pay: i64,
    pub calculation_details: CalculationDetails,

    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub cancel_reason: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl PayrollRecord {
    /// Totals must equal the sum of their item types.
    pub fn totals_consistent(&self, items: &[PayrollRecordItem]) -> bool {
        let earnings: i64 = items
            .iter()
            .filter(|i| i.record_id == self.id && i.item_type == ItemType::Earning)
            .map(|i| i.amount)
            .sum();
        let deductions: i64 = items
            .iter()
            .filter(|i| i.record_id == self.id && i.item_type == ItemType::Deduction)
            .map(|i| i.amount)
            .sum();
        self.total_earnings == earnings
            && self.total_deductions == deductions
            && self.net_pay == earnings - deductions
    }
}

/// One earning or deduction line on a [`PayrollRecord`]. Created alongside the
/// record and never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollRecordItem {
    pub id: Uuid,
    pub record_id: Uuid,
    pub item_type: ItemType,
    pub item_code: String,
    pub item_name: String,
    pub amount: i64,
    pub is_taxable: bool,
    pub is_social_insurance_target: bool,
    pub is_employment_insurance_target: bool,
    pub display_order: i32,
}

/// Frozen copy of a confirmed record's header and line items, taken at the
/// moment of confirmation. Persists even if the record is later cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollSnapshot {
    pub id: Uuid,
    pub record_id: Uuid,
    pub snapshot_data: JsonValue,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit trail for a record's lifecycle transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollHistory {
    pub id: Uuid,
    pub record_id: Uuid,
    pub action: String,
    pub old_values: Option<JsonValue>,
    pub new_values: Option<JsonValue>,
    pub actor: Uuid,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
