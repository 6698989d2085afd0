//! In-memory store standing in for the relational database the source
//! system runs against. Every table becomes a [`DashMap`] keyed the way the
//! real table is keyed, and every lookup method takes an explicit
//! `company_id` to mirror the tenant-scoping discipline a row-level-security
//! session variable would otherwise enforce.
//!
//! This gives [`crate::payroll::rate_book`], [`crate::payroll::state_machine`]
//! and [`crate::payroll::year_end_workflow`] a real, fallible-shaped seam to
//! call into without a running database, and a place a `sqlx`-backed
//! implementation could slot in later with the same method signatures.

use std::sync::Mutex;

use chrono::NaiveDate;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::*;

/// The in-memory database. Cheap to construct; intended to be wrapped in an
/// `Arc` and shared across request handlers the way a connection pool would
/// be.
#[derive(Default)]
pub struct Repository {
    pub companies: DashMap<Uuid, Company>,
    pub employees: DashMap<Uuid, Employee>,
    pub allowance_types: DashMap<Uuid, AllowanceType>,
    pub employee_allowances: DashMap<Uuid, EmployeeAllowance>,
    pub commute_details: DashMap<Uuid, CommuteDetail>,
    pub attendance_records: DashMap<Uuid, AttendanceRecord>,
    pub payroll_periods: DashMap<Uuid, PayrollPeriod>,

    pub payroll_record_groups: DashMap<Uuid, PayrollRecordGroup>,
    pub payroll_records: DashMap<Uuid, PayrollRecord>,
    pub payroll_record_items: DashMap<Uuid, PayrollRecordItem>,
    pub payroll_snapshots: DashMap<Uuid, PayrollSnapshot>,
    pub payroll_history: DashMap<Uuid, PayrollHistory>,

    pub year_end_adjustments: DashMap<Uuid, YearEndAdjustment>,
    pub year_end_history: DashMap<Uuid, YearEndAdjustmentHistory>,
    pub deduction_certificates: DashMap<Uuid, DeductionCertificate>,
    pub tax_withholding_slips: DashMap<Uuid, TaxWithholdingSlip>,

    pub insurance_rates: DashMap<Uuid, InsuranceRate>,
    pub income_tax_tables: DashMap<Uuid, IncomeTaxTable>,
    pub commute_tax_limits: DashMap<Uuid, CommuteTaxLimit>,
    pub insurance_constants: DashMap<Uuid, InsuranceConstant>,

    pub accounting_mappings: DashMap<Uuid, AccountingMapping>,

    /// Serializes the read-check-then-write sequence behind a
    /// `PayrollRecord` status transition. A real store would express this as
    /// `UPDATE ... WHERE status = $expected` and check the row count; a
    /// `DashMap` entry alone doesn't give us that atomicity across the
    /// record and its items, so the state machine takes this lock for the
    /// duration of a transition.
    pub transition_lock: Mutex<()>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_company(&self, id: Uuid) -> Option<Company> {
        self.companies.get(&id).filter(|c| !c.is_deleted).map(|c| c.clone())
    }

    // --- employee-adjacent lookups -------------------------------------

    pub fn find_employee(&self, company_id: Uuid, id: Uuid) -> Option<Employee> {
        self.employees
            .get(&id)
            .filter(|e| e.company_id == company_id && !e.is_deleted)
            .map(|e| e.clone())
    }

    pub fn find_employee_by_code(&self, company_id: Uuid, code: &str) -> Option<Employee> {
        self.employees
            .iter()
            .find(|e| e.company_id == company_id && !e.is_deleted && e.employee_code == code)
            .map(|e| e.clone())
    }

    pub fn list_allowances_for_period(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Vec<(EmployeeAllowance, AllowanceType)> {
        self.employee_allowances
            .iter()
            .filter(|a| {
                a.company_id == company_id
                    && a.employee_id == employee_id
                    && a.covers_period(period_start, period_end)
            })
            .filter_map(|a| {
                self.allowance_types
                    .get(&a.allowance_type_id)
                    .filter(|t| t.is_active)
                    .map(|t| (a.clone(), t.clone()))
            })
            .collect()
    }

    /// The single active commute detail for the period, breaking ties by
    /// greatest `effective_from` (the source has no deterministic order).
    pub fn find_active_commute_detail(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Option<CommuteDetail> {
        self.commute_details
            .iter()
            .filter(|c| {
                c.company_id == company_id
                    && c.employee_id == employee_id
                    && c.covers_period(period_start, period_end)
            })
            .max_by_key(|c| c.effective_from)
            .map(|c| c.clone())
    }

    pub fn find_attendance(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
        payroll_period_id: Uuid,
    ) -> Option<AttendanceRecord> {
        self.attendance_records
            .iter()
            .find(|a| {
                a.company_id == company_id
                    && a.employee_id == employee_id
                    && a.payroll_period_id == payroll_period_id
            })
            .map(|a| a.clone())
    }

    pub fn find_payroll_period(&self, company_id: Uuid, id: Uuid) -> Option<PayrollPeriod> {
        self.payroll_periods
            .get(&id)
            .filter(|p| p.company_id == company_id)
            .map(|p| p.clone())
    }

    // --- rate book -------------------------------------------------------

    /// Tenant-scoped override over global, then greatest `valid_from` within
    /// that scope. Returns `Err` when two rows in the *same* scope tie on
    /// `valid_from` — a data error the caller surfaces as `AmbiguousRate`.
    pub fn find_insurance_rate(
        &self,
        company_id: Uuid,
        insurance_type: InsuranceType,
        prefecture: Option<&str>,
        target_date: NaiveDate,
    ) -> Result<Option<InsuranceRate>, ()> {
        let candidates_in_scope = |scoped: bool| -> Vec<InsuranceRate> {
            self.insurance_rates
                .iter()
                .filter(|r| {
                    r.insurance_type == insurance_type
                        && (r.company_id == Some(company_id)) == scoped
                        && (scoped || r.company_id.is_none())
                        && covers(r.valid_from, r.valid_to, target_date)
                        && prefecture.map_or(true, |p| {
                            r.prefecture.as_deref().map_or(true, |rp| rp == p)
                        })
                })
                .map(|r| r.clone())
                .collect()
        };

        for scoped in [true, false] {
            let candidates = candidates_in_scope(scoped);
            if candidates.is_empty() {
                continue;
            }
            let max_from = candidates.iter().map(|c| c.valid_from).max().unwrap();
            let winners: Vec<_> = candidates
                .into_iter()
                .filter(|c| c.valid_from == max_from)
                .collect();
            return match winners.len() {
                1 => Ok(Some(winners.into_iter().next().unwrap())),
                _ => Err(()),
            };
        }
        Ok(None)
    }

    pub fn find_income_tax(
        &self,
        table_type: TableType,
        taxable_income: i64,
        dependents_count: u32,
        target_date: NaiveDate,
    ) -> Option<i64> {
        self.income_tax_tables
            .iter()
            .filter(|t| {
                t.table_type == table_type
                    && t.dependents_count == dependents_count
                    && covers(t.valid_from, t.valid_to, target_date)
                    && t.income_from <= taxable_income
                    && t.income_to.map_or(true, |to| taxable_income < to)
            })
            .max_by_key(|t| t.income_from)
            .map(|t| t.tax_amount)
    }

    pub fn find_insurance_constant(
        &self,
        company_id: Uuid,
        constant_type: &str,
        target_date: NaiveDate,
    ) -> Option<InsuranceConstant> {
        let scoped = self
            .insurance_constants
            .iter()
            .filter(|c| {
                c.company_id == Some(company_id)
                    && c.constant_type == constant_type
                    && covers(c.valid_from, c.valid_to, target_date)
            })
            .max_by_key(|c| c.valid_from)
            .map(|c| c.clone());
        scoped.or_else(|| {
            self.insurance_constants
                .iter()
                .filter(|c| {
                    c.company_id.is_none()
                        && c.constant_type == constant_type
                        && covers(c.valid_from, c.valid_to, target_date)
                })
                .max_by_key(|c| c.valid_from)
                .map(|c| c.clone())
        })
    }

    pub fn find_commute_tax_limit(
        &self,
        commute_method: CommuteMethod,
        target_date: NaiveDate,
    ) -> Option<i64> {
        self.commute_tax_limits
            .iter()
            .filter(|l| l.commute_method == commute_method && covers(l.valid_from, l.valid_to, target_date))
            .max_by_key(|l| l.valid_from)
            .map(|l| l.monthly_limit)
    }

    pub fn find_accounting_mapping(
        &self,
        company_id: Uuid,
        item_type: ItemType,
        item_code: &str,
    ) -> Option<AccountingMapping> {
        self.accounting_mappings
            .iter()
            .find(|m| m.company_id == company_id && m.item_type == item_type && m.item_code == item_code)
            .map(|m| m.clone())
    }

    // --- payroll record group -------------------------------------------

    pub fn find_group_for_period(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
        payroll_period_id: Uuid,
    ) -> Option<PayrollRecordGroup> {
        self.payroll_record_groups
            .iter()
            .find(|g| {
                g.company_id == company_id
                    && g.employee_id == employee_id
                    && g.payroll_period_id == payroll_period_id
            })
            .map(|g| g.clone())
    }

    pub fn find_group(&self, id: Uuid) -> Option<PayrollRecordGroup> {
        self.payroll_record_groups.get(&id).map(|g| g.clone())
    }

    pub fn records_in_group(&self, group_id: Uuid) -> Vec<PayrollRecord> {
        self.payroll_records
            .iter()
            .filter(|r| r.group_id == group_id)
            .map(|r| r.clone())
            .collect()
    }

    pub fn items_for_record(&self, record_id: Uuid) -> Vec<PayrollRecordItem> {
        self.payroll_record_items
            .iter()
            .filter(|i| i.record_id == record_id)
            .map(|i| i.clone())
            .collect()
    }

    pub fn confirmed_records_for_period(
        &self,
        company_id: Uuid,
        payroll_period_id: Uuid,
    ) -> Vec<PayrollRecord> {
        let group_ids: Vec<Uuid> = self
            .payroll_record_groups
            .iter()
            .filter(|g| g.company_id == company_id && g.payroll_period_id == payroll_period_id)
            .map(|g| g.id)
            .collect();
        self.payroll_records
            .iter()
            .filter(|r| {
                group_ids.contains(&r.group_id) && r.status == PayrollRecordStatus::Confirmed
            })
            .map(|r| r.clone())
            .collect()
    }
}

fn covers(valid_from: NaiveDate, valid_to: Option<NaiveDate>, target: NaiveDate) -> bool {
    valid_from <= target && valid_to.map_or(true, |to| target <= to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn tenant_override_wins_over_global_rate() {
        let repo = Repository::new();
        let company_id = Uuid::new_v4();

        repo.insurance_rates.insert(
            Uuid::new_v4(),
            InsuranceRate {
                id: Uuid::new_v4(),
                company_id: None,
                insurance_type: InsuranceType::Health,
                prefecture: Some("東京都".to_string()),
                employee_rate: dec!(0.05000),
                employer_rate: dec!(0.05000),
                care_insurance_rate: None,
                valid_from: d("2024-04-01"),
                valid_to: None,
            },
        );
        repo.insurance_rates.insert(
            Uuid::new_v4(),
            InsuranceRate {
                id: Uuid::new_v4(),
                company_id: Some(company_id),
                insurance_type: InsuranceType::Health,
                prefecture: Some("東京都".to_string()),
                employee_rate: dec!(0.04985),
                employer_rate: dec!(0.04985),
                care_insurance_rate: None,
                valid_from: d("2024-04-01"),
                valid_to: None,
            },
        );

        let rate = repo
            .find_insurance_rate(company_id, InsuranceType::Health, Some("東京都"), d("2024-05-01"))
            .unwrap()
            .unwrap();
        assert_eq!(rate.employee_rate, dec!(0.04985));
    }

    #[test]
    fn ambiguous_global_rows_are_rejected() {
        let repo = Repository::new();
        let company_id = Uuid::new_v4();
        for _ in 0..2 {
            repo.insurance_rates.insert(
                Uuid::new_v4(),
                InsuranceRate {
                    id: Uuid::new_v4(),
                    company_id: None,
                    insurance_type: InsuranceType::Pension,
                    prefecture: None,
                    employee_rate: dec!(0.09150),
                    employer_rate: dec!(0.09150),
                    care_insurance_rate: None,
                    valid_from: d("2024-04-01"),
                    valid_to: None,
                },
            );
        }
        let result = repo.find_insurance_rate(company_id, InsuranceType::Pension, None, d("2024-05-01"));
        assert!(result.is_err());
    }
}
