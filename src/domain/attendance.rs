//! Attendance periods and the daily/monthly attendance totals recorded
//! against them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Regular,
    YearEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodStatus {
    Open,
    Closed,
    Locked,
}

/// A closing-to-closing attendance period for one company (e.g. 4/21 – 5/20).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollPeriod {
    pub id: Uuid,
    pub company_id: Uuid,
    pub period_type: PeriodType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub payment_date: NaiveDate,
    pub status: PeriodStatus,
}

/// Aggregated attendance totals for one employee over one [`PayrollPeriod`].
/// Minute-granular fields feed directly into
/// [`crate::payroll::overtime::OvertimeEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub payroll_period_id: Uuid,

    pub work_days: u32,
    pub absence_days: u32,
    pub paid_leave_days: u32,

    /// Total minutes actually worked in the period, including all overtime
    /// categories below. Used directly by the hourly salary-type base-pay
    /// calculation.
    pub total_work_minutes: i64,

    /// Overtime within the statutory daily/weekly limit, paid at straight
    /// time but still tracked separately (e.g. agreed shorter-than-statutory
    /// contracted hours).
    pub overtime_within_statutory_minutes: i64,
    /// Overtime beyond the statutory limit; split by
    /// [`crate::payroll::overtime::OvertimeEngine`] into a normal portion
    /// (≤3600 min) and an over-60-hour portion.
    pub statutory_overtime_minutes: i64,
    pub night_minutes: i64,
    pub statutory_holiday_minutes: i64,
    pub non_statutory_holiday_minutes: i64,
    pub night_overtime_minutes: i64,
    pub night_holiday_minutes: i64,
    pub night_overtime_holiday_minutes: i64,

    pub late_count: u32,
    pub early_leave_count: u32,
}
