//! Composes [`RateBook`], [`OvertimeEngine`], [`InsuranceEngine`], and
//! [`TaxEngine`] with an employee's master data, allowances, commute detail,
//! and attendance to produce an ordered list of earning/deduction items plus
//! totals — the input [`PayrollStateMachine::create_from_calculation`]
//! turns into a draft record.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    AttendanceRecord, CalculationDetails, Company, Employee, ItemType, PayrollPeriod,
    SalarySettings, TaxCategory,
};
use crate::error::{ErrorKind, HasErrorKind};
use crate::payroll::insurance::InsuranceEngine;
use crate::payroll::overtime::OvertimeEngine;
use crate::payroll::rate_book::{RateBook, RateBookError};
use crate::payroll::tax::TaxEngine;
use crate::repository::Repository;

const STATUTORY_WORK_DAYS_DEFAULT: i64 = 20;
const MONTHLY_PRESCRIBED_HOURS_DEFAULT: i64 = 160;
const COMMUTE_NON_TAXABLE_LIMIT_DEFAULT: i64 = 150_000;

#[derive(Debug, Error)]
pub enum CalculatorError {
    #[error(transparent)]
    RateBook(#[from] RateBookError),
}

impl HasErrorKind for CalculatorError {
    fn kind(&self) -> ErrorKind {
        match self {
            CalculatorError::RateBook(e) => e.kind(),
        }
    }
}

/// One earning or deduction line, not yet attached to a `PayrollRecord` id.
#[derive(Debug, Clone)]
pub struct CalculatedItem {
    pub item_type: ItemType,
    pub item_code: String,
    pub item_name: String,
    pub amount: i64,
    pub is_taxable: bool,
    pub is_social_insurance_target: bool,
    pub is_employment_insurance_target: bool,
}

#[derive(Debug, Clone)]
pub struct PayrollResult {
    pub items: Vec<CalculatedItem>,
    pub total_earnings: i64,
    pub total_deductions: i64,
    pub net_pay: i64,
    pub calculation_details: CalculationDetails,
}

pub struct PayrollCalculator;

impl PayrollCalculator {
    #[tracing::instrument(
        skip(repo, company, employee, period),
        fields(company_id = %company.id, employee_id = %employee.id, period_id = %period.id),
    )]
    pub fn calculate(
        repo: &Repository,
        company: &Company,
        employee: &Employee,
        period: &PayrollPeriod,
    ) -> Result<PayrollResult, CalculatorError> {
        let rate_book = RateBook::new(repo);
        let mut notes = Vec::new();

        let attendance = repo
            .find_attendance(company.id, employee.id, period.id)
            .unwrap_or_else(|| zero_attendance(company.id, employee.id, period.id));

        let (mut base_salary, salary_type_name) =
            base_salary(&employee.salary_type_settings, &attendance);
        if base_salary < 0 {
            notes.push("base salary went negative after absence deduction; clamped to 0".to_string());
            base_salary = 0;
        }

        let base_hourly_rate = base_hourly_rate(&employee.salary_type_settings, base_salary);

        let mut items = Vec::new();
        items.push(earning(
            "base_salary",
            "基本給",
            base_salary,
            true,
            true,
            true,
        ));

        let overtime = OvertimeEngine::compute(base_hourly_rate, &attendance);
        for (code, name, amount) in overtime_line_items(&overtime) {
            if amount != 0 {
                items.push(earning(code, name, amount, true, false, true));
            }
        }

        for (allowance, allowance_type) in repo.list_allowances_for_period(
            company.id,
            employee.id,
            period.start_date,
            period.end_date,
        ) {
            items.push(earning(
                &allowance_type.code,
                &allowance_type.name,
                allowance.amount,
                allowance_type.is_taxable,
                allowance_type.is_social_insurance_target,
                allowance_type.is_employment_insurance_target,
            ));
        }

        let commute_non_taxable = repo
            .find_active_commute_detail(company.id, employee.id, period.start_date, period.end_date)
            .map(|detail| {
                let limit = rate_book
                    .find_commute_non_taxable_limit(detail.commute_method, period.payment_date)
                    .unwrap_or(COMMUTE_NON_TAXABLE_LIMIT_DEFAULT);
                let cost = detail.monthly_cost.unwrap_or(0);
                items.push(earning("commute", "通勤手当", cost, false, true, true));
                detail.non_taxable_amount(limit)
            })
            .unwrap_or(0);

        let gross_salary: i64 = items.iter().map(|i| i.amount).sum();

        let mut social_insurance_total = 0i64;
        let employee_age = employee
            .birth_date
            .map(|_| employee.age_on_or_zero(period.payment_date));

        if employee.social_insurance_enrolled {
            let health = InsuranceEngine::health(
                &rate_book,
                company,
                gross_salary,
                period.payment_date,
                employee_age,
            )?;
            notes.extend(health.notes);
            if let Some(amount) = health.health {
                items.push(deduction("health_insurance", "健康保険料", amount));
                social_insurance_total += amount;
            }
            if let Some(amount) = health.care {
                items.push(deduction("care_insurance", "介護保険料", amount));
                social_insurance_total += amount;
            }
        }

        if employee.pension_insurance_enrolled {
            match InsuranceEngine::pension(&rate_book, company.id, gross_salary, period.payment_date)? {
                Some(amount) => {
                    items.push(deduction("pension_insurance", "厚生年金保険料", amount));
                    social_insurance_total += amount;
                }
                None => {
                    let note = format!("pension insurance rate not found for {}", period.payment_date);
                    tracing::warn!(company_id = %company.id, employee_id = %employee.id, date = %period.payment_date, "pension insurance rate miss");
                    notes.push(note);
                }
            }
        }

        if employee.employment_insurance_enrolled {
            match InsuranceEngine::employment(&rate_book, company.id, gross_salary, period.payment_date)? {
                Some(amount) => {
                    items.push(deduction("employment_insurance", "雇用保険料", amount));
                    social_insurance_total += amount;
                }
                None => {
                    let note = format!(
                        "employment insurance rate not found for {}",
                        period.payment_date
                    );
                    tracing::warn!(company_id = %company.id, employee_id = %employee.id, date = %period.payment_date, "employment insurance rate miss");
                    notes.push(note);
                }
            }
        }

        let taxable_earnings = (gross_salary - commute_non_taxable - social_insurance_total).max(0);

        let is_monthly = matches!(employee.salary_type_settings, SalarySettings::Monthly { .. });
        let tax_result = TaxEngine::calculate_income_tax(
            &rate_book,
            taxable_earnings,
            employee.tax_category,
            employee.dependents_count,
            period.payment_date,
            is_monthly,
        );
        if tax_result.used_fallback {
            tracing::warn!(
                company_id = %company.id,
                employee_id = %employee.id,
                tax_category = ?employee.tax_category,
                "income tax bracket miss, used fallback rate"
            );
            notes.push(format!(
                "income tax used the {:?} fallback rate (no bracket matched)",
                employee.tax_category
            ));
        }
        let income_tax = tax_result.amount;
        items.push(deduction("income_tax", "源泉所得税", income_tax));

        if let Some(resident_tax) = employee.resident_tax_monthly_amount.filter(|a| *a != 0) {
            items.push(deduction("resident_tax", "住民税", resident_tax));
        }

        let total_earnings: i64 = items
            .iter()
            .filter(|i| i.item_type == ItemType::Earning)
            .map(|i| i.amount)
            .sum();
        let total_deductions: i64 = items
            .iter()
            .filter(|i| i.item_type == ItemType::Deduction)
            .map(|i| i.amount)
            .sum();

        let calculation_details = CalculationDetails {
            salary_type: salary_type_name.to_string(),
            base_salary,
            base_hourly_rate,
            gross_salary,
            social_insurance_total,
            taxable_earnings,
            income_tax,
            work_days: attendance.work_days,
            total_work_minutes: attendance.total_work_minutes,
            employee_age,
            notes,
        };

        Ok(PayrollResult {
            items,
            total_earnings,
            total_deductions,
            net_pay: total_earnings - total_deductions,
            calculation_details,
        })
    }
}

fn base_salary(settings: &SalarySettings, attendance: &AttendanceRecord) -> (i64, &'static str) {
    match settings {
        SalarySettings::Monthly { monthly_salary, .. } => {
            let mut amount = *monthly_salary;
            if attendance.absence_days > 0 {
                let per_day = monthly_salary / STATUTORY_WORK_DAYS_DEFAULT;
                amount -= per_day * attendance.absence_days as i64;
            }
            (amount, "monthly")
        }
        SalarySettings::Daily { daily_rate } => (daily_rate * attendance.work_days as i64, "daily"),
        SalarySettings::Hourly { hourly_rate } => {
            (
                (hourly_rate * attendance.total_work_minutes) / 60,
                "hourly",
            )
        }
        SalarySettings::Commission {
            base_amount,
            commission_amount,
        } => (base_amount + commission_amount, "commission"),
    }
}

fn base_hourly_rate(settings: &SalarySettings, base_salary: i64) -> i64 {
    match settings {
        SalarySettings::Monthly { monthly_salary, .. } => {
            let prescribed_hours = settings.monthly_prescribed_hours_or_default().max(1) as i64;
            monthly_salary / prescribed_hours
        }
        SalarySettings::Daily { daily_rate } => daily_rate / 8,
        SalarySettings::Hourly { hourly_rate } => *hourly_rate,
        SalarySettings::Commission { .. } => base_salary / MONTHLY_PRESCRIBED_HOURS_DEFAULT,
    }
}

fn overtime_line_items(
    breakdown: &crate::payroll::overtime::OvertimeBreakdown,
) -> [(&'static str, &'static str, i64); 9] {
    [
        ("overtime_within_statutory", "法定内残業手当", breakdown.within_statutory_pay),
        ("overtime_statutory", "時間外手当(60h以内)", breakdown.normal_overtime_pay),
        ("overtime_over_60h", "時間外手当(60h超)", breakdown.over_60h_pay),
        ("night_work", "深夜手当", breakdown.night_pay),
        ("statutory_holiday", "休日出勤手当", breakdown.statutory_holiday_pay),
        ("non_statutory_holiday", "法定外休日出勤手当", breakdown.non_statutory_holiday_pay),
        ("night_overtime", "深夜時間外手当", breakdown.night_overtime_pay),
        ("night_holiday", "深夜休日手当", breakdown.night_holiday_pay),
        (
            "night_overtime_holiday",
            "深夜休日時間外手当",
            breakdown.night_overtime_holiday_pay,
        ),
    ]
}

fn earning(
    code: &str,
    name: &str,
    amount: i64,
    is_taxable: bool,
    is_social_insurance_target: bool,
    is_employment_insurance_target: bool,
) -> CalculatedItem {
    CalculatedItem {
        item_type: ItemType::Earning,
        item_code: code.to_string(),
        item_name: name.to_string(),
        amount,
        is_taxable,
        is_social_insurance_target,
        is_employment_insurance_target,
    }
}

fn deduction(code: &str, name: &str, amount: i64) -> CalculatedItem {
    CalculatedItem {
        item_type: ItemType::Deduction,
        item_code: code.to_string(),
        item_name: name.to_string(),
        amount,
        is_taxable: false,
        is_social_insurance_target: false,
        is_employment_insurance_target: false,
    }
}

fn zero_attendance(company_id: Uuid, employee_id: Uuid, payroll_period_id: Uuid) -> AttendanceRecord {
    AttendanceRecord {
        id: Uuid::new_v4(),
        company_id,
        employee_id,
        payroll_period_id,
        work_days: 0,
        absence_days: 0,
        paid_leave_days: 0,
        total_work_minutes: 0,
        overtime_within_statutory_minutes: 0,
        statutory_overtime_minutes: 0,
        night_minutes: 0,
        statutory_holiday_minutes: 0,
        non_statutory_holiday_minutes: 0,
        night_overtime_minutes: 0,
        night_holiday_minutes: 0,
        night_overtime_holiday_minutes: 0,
        late_count: 0,
        early_leave_count: 0,
    }
}

trait AgeOrZero {
    fn age_on_or_zero(&self, target_date: NaiveDate) -> u32;
}

impl AgeOrZero for Employee {
    fn age_on_or_zero(&self, target_date: NaiveDate) -> u32 {
        self.age_on(target_date).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AllowanceType, Company, Employee, EmployeeAllowance, InsuranceRate, PayrollPeriod,
        PeriodStatus, PeriodType, TaxCategory,
    };
    use rust_decimal_macros::dec;

    fn make_company(id: Uuid) -> Company {
        Company {
            id,
            name: "テスト株式会社".to_string(),
            name_kana: None,
            address: None,
            representative_name: None,
            legal_number: None,
            closing_day: 20,
            payment_day: 25,
            payment_month_offset: 1,
            health_insurance_prefecture: Some("東京都".to_string()),
            health_insurance_union_name: None,
            care_insurance_applicable: true,
            is_deleted: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn make_period(id: Uuid, company_id: Uuid) -> PayrollPeriod {
        PayrollPeriod {
            id,
            company_id,
            period_type: PeriodType::Regular,
            start_date: NaiveDate::from_ymd_opt(2024, 4, 21).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            payment_date: NaiveDate::from_ymd_opt(2024, 5, 25).unwrap(),
            status: PeriodStatus::Open,
        }
    }

    fn make_employee(id: Uuid, company_id: Uuid) -> Employee {
        Employee {
            id,
            company_id,
            employee_code: "E001".to_string(),
            first_name: "太郎".to_string(),
            last_name: "山田".to_string(),
            first_name_kana: None,
            last_name_kana: None,
            email: None,
            birth_date: None,
            address: None,
            hire_date: NaiveDate::from_ymd_opt(2020, 4, 1).unwrap(),
            termination_date: None,
            department: None,
            salary_type_settings: SalarySettings::Monthly {
                monthly_salary: 300_000,
                monthly_prescribed_hours: Some(160),
            },
            tax_category: TaxCategory::Kou,
            dependents_count: 1,
            social_insurance_enrolled: true,
            pension_insurance_enrolled: true,
            employment_insurance_enrolled: true,
            resident_tax_monthly_amount: None,
            bank_name: None,
            branch_name: None,
            account_type_savings: true,
            account_number: None,
            account_holder: None,
            is_deleted: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    /// Monthly employee, no overtime, no allowances.
    #[test]
    fn scenario_one_monthly_no_overtime() {
        let repo = Repository::new();
        let company_id = Uuid::new_v4();
        let company = make_company(company_id);
        let period = make_period(Uuid::new_v4(), company_id);
        let employee = make_employee(Uuid::new_v4(), company_id);

        for (t, rate) in [
            (crate::domain::InsuranceType::Health, dec!(0.04985)),
            (crate::domain::InsuranceType::Pension, dec!(0.09150)),
            (crate::domain::InsuranceType::Employment, dec!(0.00600)),
        ] {
            repo.insurance_rates.insert(
                Uuid::new_v4(),
                InsuranceRate {
                    id: Uuid::new_v4(),
                    company_id: None,
                    insurance_type: t,
                    prefecture: Some("東京都".to_string()),
                    employee_rate: rate,
                    employer_rate: rate,
                    care_insurance_rate: None,
                    valid_from: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                    valid_to: None,
                },
            );
        }
        repo.income_tax_tables.insert(
            Uuid::new_v4(),
            crate::domain::IncomeTaxTable {
                id: Uuid::new_v4(),
                table_type: crate::domain::TableType::MonthlyKou,
                income_from: 240_000,
                income_to: Some(260_000),
                dependents_count: 1,
                tax_amount: 5_740,
                valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                valid_to: None,
            },
        );

        let result = PayrollCalculator::calculate(&repo, &company, &employee, &period).unwrap();

        assert_eq!(result.calculation_details.gross_salary, 300_000);
        assert_eq!(result.calculation_details.social_insurance_total, 44_205);
        assert_eq!(result.calculation_details.taxable_earnings, 255_795);
        assert_eq!(result.calculation_details.income_tax, 5_740);
        assert_eq!(result.net_pay, 250_055);
    }

    #[test]
    fn allowance_and_commute_flow_into_gross() {
        let repo = Repository::new();
        let company_id = Uuid::new_v4();
        let company = make_company(company_id);
        let period = make_period(Uuid::new_v4(), company_id);
        let employee = make_employee(Uuid::new_v4(), company_id);

        let allowance_type_id = Uuid::new_v4();
        repo.allowance_types.insert(
            allowance_type_id,
            AllowanceType {
                id: allowance_type_id,
                company_id,
                code: "family".to_string(),
                name: "家族手当".to_string(),
                is_taxable: true,
                is_social_insurance_target: true,
                is_employment_insurance_target: true,
                is_overtime_base: false,
                is_active: true,
                display_order: Some(1),
            },
        );
        repo.employee_allowances.insert(
            Uuid::new_v4(),
            EmployeeAllowance {
                id: Uuid::new_v4(),
                company_id,
                employee_id: employee.id,
                allowance_type_id,
                amount: 10_000,
                effective_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                effective_to: None,
            },
        );

        let result = PayrollCalculator::calculate(&repo, &company, &employee, &period).unwrap();
        let family_item = result
            .items
            .iter()
            .find(|i| i.item_code == "family")
            .expect("family allowance should appear as a line item");
        assert_eq!(family_item.amount, 10_000);
        assert_eq!(result.calculation_details.gross_salary, 310_000);
    }
}
