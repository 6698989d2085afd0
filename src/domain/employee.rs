//! Employee master and the time-ranged records hung off it (allowances,
//! commute details).

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Withholding category (源泉徴収の甲乙丙).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxCategory {
    /// 甲欄 — primary employer, dependent-count-sensitive table.
    Kou,
    /// 乙欄 — secondary employer.
    Otsu,
    /// 丙欄 — daily/short-term workers.
    Hei,
}

/// Discriminated salary configuration. This replaces the free-form
/// `salary_settings` JSONB payload of the source system with a closed type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "salary_type", rename_all = "snake_case")]
pub enum SalarySettings {
    Monthly {
        monthly_salary: i64,
        /// Prescribed monthly working hours used to derive a base hourly
        /// rate for overtime premiums; defaults to 160 when unset.
        monthly_prescribed_hours: Option<u32>,
    },
    Daily {
        daily_rate: i64,
    },
    Hourly {
        hourly_rate: i64,
    },
    Commission {
        base_amount: i64,
        commission_amount: i64,
    },
}

impl SalarySettings {
    pub fn monthly_prescribed_hours_or_default(&self) -> u32 {
        match self {
            SalarySettings::Monthly {
                monthly_prescribed_hours,
                ..
            } => monthly_prescribed_hours.unwrap_or(160),
            _ => 160,
        }
    }
}

/// Employee master record.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Employee {
    pub id: Uuid,
    pub company_id: Uuid,
    #[validate(length(min = 1, max = 30, message = "employee_code must be 1-30 characters"))]
    pub employee_code: String,

    pub first_name: String,
    pub last_name: String,
    pub first_name_kana: Option<String>,
    pub last_name_kana: Option<String>,
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,

    pub hire_date: NaiveDate,
    pub termination_date: Option<NaiveDate>,
    pub department: Option<String>,

    pub salary_type_settings: SalarySettings,
    pub tax_category: TaxCategory,
    #[validate(range(max = 99, message = "dependents_count is implausibly large"))]
    pub dependents_count: u32,

    pub social_insurance_enrolled: bool,
    pub pension_insurance_enrolled: bool,
    pub employment_insurance_enrolled: bool,
    pub resident_tax_monthly_amount: Option<i64>,

    pub bank_name: Option<String>,
    pub branch_name: Option<String>,
    pub account_type_savings: bool,
    pub account_number: Option<String>,
    pub account_holder: Option<String>,

    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    /// Age on `target_date` as a proper Gregorian year difference, correcting
    /// the source system's `days // 365` approximation which undercounts
    /// across leap years.
    pub fn age_on(&self, target_date: NaiveDate) -> Option<u32> {
        let birth = self.birth_date?;
        let mut years = target_date.year() - birth.year();
        if (target_date.month(), target_date.day()) < (birth.month(), birth.day()) {
            years -= 1;
        }
        Some(years.max(0) as u32)
    }
}

/// Allowance type master (手当種別マスタ), per tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowanceType {
    pub id: Uuid,
    pub company_id: Uuid,
    pub code: String,
    pub name: String,
    pub is_taxable: bool,
    pub is_social_insurance_target: bool,
    pub is_employment_insurance_target: bool,
    /// Carried for data-model fidelity with the source system; does not
    /// currently affect any computation (see DESIGN.md).
    pub is_overtime_base: bool,
    pub is_active: bool,
    pub display_order: Option<i32>,
}

/// A recurring allowance granted to one employee over a time range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeAllowance {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub allowance_type_id: Uuid,
    pub amount: i64,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

impl EmployeeAllowance {
    /// True when this allowance is active for any part of `[period_start, period_end]`.
    pub fn covers_period(&self, period_start: NaiveDate, period_end: NaiveDate) -> bool {
        self.effective_from <= period_end
            && self.effective_to.map(|to| to >= period_start).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommuteMethod {
    PublicTransport,
    Car,
    Bicycle,
    Mixed,
}

/// Commute allowance configuration for one employee over a time range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommuteDetail {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub commute_method: CommuteMethod,
    pub distance_km: Option<rust_decimal::Decimal>,
    pub monthly_cost: Option<i64>,
    pub non_taxable_limit: Option<i64>,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

impl CommuteDetail {
    pub fn covers_period(&self, period_start: NaiveDate, period_end: NaiveDate) -> bool {
        self.effective_from <= period_end
            && self.effective_to.map(|to| to >= period_start).unwrap_or(true)
    }

    /// Non-taxable portion of the monthly commute cost. `fallback_limit` is
    /// the rate book's commute-method limit, used when this record doesn't
    /// carry its own `non_taxable_limit`.
    pub fn non_taxable_amount(&self, fallback_limit: i64) -> i64 {
        let cost = self.monthly_cost.unwrap_or(0);
        let limit = self.non_taxable_limit.unwrap_or(fallback_limit);
        cost.min(limit)
    }
}
