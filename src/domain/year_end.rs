//! Year-end tax adjustment (年末調整) aggregate: the annual true-up between
//! tax withheld during the year and tax actually owed.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearEndStatus {
    Draft,
    Submitted,
    Returned,
    Approved,
    Confirmed,
}

/// The eleven declared-deduction fields an employee supplies for the
/// adjustment, plus the annual totals and family/insurance context needed to
/// compute and later print the withholding slip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearEndAdjustment {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub target_year: i32,
    pub status: YearEndStatus,

    pub spouse_deduction: i64,
    pub spouse_special_deduction: i64,
    pub dependents_deduction: i64,
    pub disability_deduction: i64,
    pub widow_deduction: i64,
    pub working_student_deduction: i64,
    pub life_insurance_deduction: i64,
    pub earthquake_insurance_deduction: i64,
    pub social_insurance_deduction: i64,
    pub small_business_mutual_aid_deduction: i64,
    pub housing_loan_deduction: i64,

    pub spouse_income: Option<i64>,
    pub dependents_count: u32,
    pub has_disability: bool,
    pub is_widow: bool,
    pub is_working_student: bool,

    pub annual_income: Option<i64>,
    pub annual_withheld_tax: Option<i64>,
    pub annual_calculated_tax: Option<i64>,
    pub adjustment_amount: Option<i64>,

    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub returned_at: Option<DateTime<Utc>>,
    pub return_reason: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl YearEndAdjustment {
    pub fn total_deductions(&self) -> i64 {
        self.spouse_deduction
            + self.spouse_special_deduction
            + self.dependents_deduction
            + self.disability_deduction
            + self.widow_deduction
            + self.working_student_deduction
            + self.life_insurance_deduction
            + self.earthquake_insurance_deduction
            + self.social_insurance_deduction
            + self.small_business_mutual_aid_deduction
            + self.housing_loan_deduction
    }
}

/// Append-only transition log for a [`YearEndAdjustment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearEndAdjustmentHistory {
    pub id: Uuid,
    pub adjustment_id: Uuid,
    pub old_status: Option<YearEndStatus>,
    pub new_status: YearEndStatus,
    pub actor: Uuid,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Metadata for a supporting document attached to an adjustment. File bytes
/// and storage are a non-goal here; only the record of attachment is core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeductionCertificate {
    pub id: Uuid,
    pub adjustment_id: Uuid,
    pub certificate_type: String,
    pub file_name: String,
    pub file_size: u64,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
}

/// The frozen payload printed on the 源泉徴収票 (withholding slip), built
/// once at `GenerateWithholdingSlip` and never recomputed afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlipData {
    pub employee_name: String,
    pub employee_name_kana: Option<String>,
    pub employee_address: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub target_year: i32,

    pub annual_income: i64,
    pub annual_withheld_tax: i64,
    pub annual_calculated_tax: i64,
    pub adjustment_amount: i64,

    pub spouse_deduction: i64,
    pub spouse_special_deduction: i64,
    pub dependents_deduction: i64,
    pub disability_deduction: i64,
    pub widow_deduction: i64,
    pub working_student_deduction: i64,
    pub life_insurance_deduction: i64,
    pub earthquake_insurance_deduction: i64,
    pub social_insurance_deduction: i64,
    pub small_business_mutual_aid_deduction: i64,
    pub housing_loan_deduction: i64,

    pub spouse_income: Option<i64>,
    pub dependents_count: u32,

    pub social_insurance_enrolled: bool,
    pub pension_insurance_enrolled: bool,
    pub employment_insurance_enrolled: bool,
}

/// 1:1 with a confirmed [`YearEndAdjustment`]; holds the materialized
/// [`SlipData`] payload. Generated at most once per adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxWithholdingSlip {
    pub id: Uuid,
    pub adjustment_id: Uuid,
    pub slip_data: SlipData,
    pub generated_at: DateTime<Utc>,
}
