//! Pure serializers that read confirmed payroll records back out: the
//! payroll ledger CSV, the accounting-journal CSV, and the Zengin
//! fixed-width bank-transfer file. None of these mutate state; all three
//! are plain functions over what the repository already holds.

use std::collections::BTreeMap;

use chrono::Datelike;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Company, Employee, ItemType, PayrollPeriod, PayrollRecord};
use crate::error::{ErrorKind, HasErrorKind};
use crate::repository::Repository;

const UTF8_BOM: &str = "\u{feff}";
const ZENGIN_RECORD_WIDTH: usize = 120;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("employee for payroll record {0} could not be resolved")]
    EmployeeNotFound(Uuid),
}

impl HasErrorKind for ExportError {
    fn kind(&self) -> ErrorKind {
        match self {
            ExportError::EmployeeNotFound(_) => ErrorKind::NotFound,
        }
    }
}

pub struct ExportRouter;

impl ExportRouter {
    /// Payroll ledger: one row per confirmed record for the period, plus
    /// a grand-totals row. UTF-8 with BOM.
    pub fn payroll_ledger_csv(
        repo: &Repository,
        company_id: Uuid,
        payroll_period_id: Uuid,
    ) -> Result<String, ExportError> {
        let mut out = String::from(UTF8_BOM);
        out.push_str("社員コード,氏名,部署,支給額合計,控除額合計,差引支給額\r\n");

        let mut total_earnings = 0i64;
        let mut total_deductions = 0i64;
        let mut total_net = 0i64;

        for record in Self::confirmed_with_employee(repo, company_id, payroll_period_id)? {
            let (record, employee) = record;
            total_earnings += record.total_earnings;
            total_deductions += record.total_deductions;
            total_net += record.net_pay;
            out.push_str(&format!(
                "{},{},{},{},{},{}\r\n",
                csv_field(&employee.employee_code),
                csv_field(&employee.full_name()),
                csv_field(employee.department.as_deref().unwrap_or("")),
                record.total_earnings,
                record.total_deductions,
                record.net_pay,
            ));
        }

        out.push_str(&format!(
            "合計,,,{},{},{}\r\n",
            total_earnings, total_deductions, total_net
        ));
        Ok(out)
    }

    /// Accounting journal: confirmed line items for the period grouped
    /// by `(item_type, item_code)`, mapped to ledger accounts via
    /// [`crate::domain::AccountingMapping`]. Earnings post to the debit
    /// side, deductions to the credit side, unless a tenant's mapping
    /// overrides which side an item posts to. UTF-8 with BOM.
    pub fn accounting_journal_csv(repo: &Repository, company_id: Uuid, payroll_period_id: Uuid) -> String {
        let mut out = String::from(UTF8_BOM);
        out.push_str("借方科目コード,借方科目名,貸方科目コード,貸方科目名,金額,摘要\r\n");

        let mut grouped: BTreeMap<(ItemType, String), (String, i64)> = BTreeMap::new();
        for record in repo.confirmed_records_for_period(company_id, payroll_period_id) {
            for item in repo.items_for_record(record.id) {
                let entry = grouped
                    .entry((item.item_type, item.item_code.clone()))
                    .or_insert_with(|| (item.item_name.clone(), 0));
                entry.1 += item.amount;
            }
        }

        for ((item_type, item_code), (item_name, amount)) in grouped {
            let mapping = repo.find_accounting_mapping(company_id, item_type, &item_code);
            let is_debit = mapping.as_ref().map(|m| m.is_debit).unwrap_or(item_type == ItemType::Earning);
            let (account_code, account_name) = match &mapping {
                Some(m) => (m.account_code.clone(), m.account_name.clone()),
                None => (
                    item_code.clone(),
                    match item_type {
                        ItemType::Earning => "給与手当".to_string(),
                        ItemType::Deduction => "預り金".to_string(),
                    },
                ),
            };

            let (debit_code, debit_name, credit_code, credit_name) = if is_debit {
                (account_code, account_name, String::new(), String::new())
            } else {
                (String::new(), String::new(), account_code, account_name)
            };

            out.push_str(&format!(
                "{},{},{},{},{},{}\r\n",
                csv_field(&debit_code),
                csv_field(&debit_name),
                csv_field(&credit_code),
                csv_field(&credit_name),
                amount,
                csv_field(&item_name),
            ));
        }
        out
    }

    /// Zengin fixed-width bank-transfer file: header + one data record
    /// per payee + trailer + end, Shift-JIS encoded with `\r\n` separators.
    pub fn zengin_transfer_file(
        repo: &Repository,
        company: &Company,
        period: &PayrollPeriod,
        company_id: Uuid,
    ) -> Result<Vec<u8>, ExportError> {
        let payees = Self::confirmed_with_employee(repo, company_id, period.id)?;

        let mut out = Vec::new();
        out.extend(zengin_header(company, period));
        out.extend(b"\r\n");

        let mut total_amount = 0i64;
        for (record, employee) in &payees {
            out.extend(zengin_data_record(employee, record.net_pay));
            out.extend(b"\r\n");
            total_amount += record.net_pay;
        }

        out.extend(zengin_trailer(payees.len(), total_amount));
        out.extend(b"\r\n");
        out.extend(zengin_end());
        Ok(out)
    }

    fn confirmed_with_employee(
        repo: &Repository,
        company_id: Uuid,
        payroll_period_id: Uuid,
    ) -> Result<Vec<(PayrollRecord, Employee)>, ExportError> {
        let mut rows = Vec::new();
        for record in repo.confirmed_records_for_period(company_id, payroll_period_id) {
            let group = repo
                .find_group(record.group_id)
                .ok_or(ExportError::EmployeeNotFound(record.id))?;
            let employee = repo
                .find_employee(company_id, group.employee_id)
                .ok_or(ExportError::EmployeeNotFound(record.id))?;
            rows.push((record, employee));
        }
        Ok(rows)
    }
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn zengin_header(company: &Company, period: &PayrollPeriod) -> Vec<u8> {
    let mut line = Vec::new();
    line.extend(b"1");
    line.extend(b"21");
    line.extend(b"0");
    line.extend(sjis_padded("", 10, false));
    line.extend(sjis_padded(&company.name, 40, true));
    line.extend(format!("{:02}{:02}", period.payment_date.month(), period.payment_date.day()).into_bytes());
    pad_record(line)
}

fn zengin_data_record(employee: &Employee, net_pay: i64) -> Vec<u8> {
    let holder_name = employee
        .account_holder
        .clone()
        .unwrap_or_else(|| format!("{}{}", employee.last_name, employee.first_name));
    let account_type_code: &[u8] = if employee.account_type_savings { b"1" } else { b"2" };

    let mut line = Vec::new();
    line.extend(b"2");
    line.extend(sjis_padded("", 4, false));
    line.extend(sjis_padded(employee.bank_name.as_deref().unwrap_or(""), 15, false));
    line.extend(sjis_padded("", 3, false));
    line.extend(sjis_padded(employee.branch_name.as_deref().unwrap_or(""), 15, false));
    line.extend(sjis_padded("", 4, false));
    line.extend(account_type_code);
    line.extend(sjis_padded(employee.account_number.as_deref().unwrap_or(""), 7, false));
    line.extend(sjis_padded(&holder_name, 30, false));
    line.extend(format!("{:010}", net_pay.max(0)).into_bytes());
    line.extend(b"0");
    pad_record(line)
}

fn zengin_trailer(count: usize, total_amount: i64) -> Vec<u8> {
    let mut line = Vec::new();
    line.extend(b"8");
    line.extend(format!("{:06}", count).into_bytes());
    line.extend(format!("{:012}", total_amount.max(0)).into_bytes());
    pad_record(line)
}

fn zengin_end() -> Vec<u8> {
    pad_record(b"9".to_vec())
}

/// Pads a partially-built record out to the fixed 120-byte Zengin record
/// width with ASCII spaces; truncates if somehow over (never expected).
fn pad_record(mut line: Vec<u8>) -> Vec<u8> {
    if line.len() < ZENGIN_RECORD_WIDTH {
        line.extend(std::iter::repeat(b' ').take(ZENGIN_RECORD_WIDTH - line.len()));
    } else {
        line.truncate(ZENGIN_RECORD_WIDTH);
    }
    line
}

/// Encodes `s` as Shift-JIS, truncated (on a character boundary) to fit
/// within `width` bytes, then space-padded to exactly `width` bytes —
/// on the left when `left_pad` is set (numeric-style fields), otherwise
/// on the right (the general Zengin text-field convention).
fn sjis_padded(s: &str, width: usize, left_pad: bool) -> Vec<u8> {
    let mut chars: Vec<char> = s.chars().collect();
    let mut encoded = encoding_rs::SHIFT_JIS.encode(s).0.into_owned();
    while encoded.len() > width && !chars.is_empty() {
        chars.pop();
        let candidate: String = chars.iter().collect();
        encoded = encoding_rs::SHIFT_JIS.encode(&candidate).0.into_owned();
    }
    let pad = width - encoded.len();
    if left_pad {
        let mut out = vec![b' '; pad];
        out.extend(encoded);
        out
    } else {
        encoded.extend(std::iter::repeat(b' ').take(pad));
        encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AccountingMapping, AttendanceRecord, Company, Employee, ItemType, PayrollPeriod,
        PayrollRecordGroup, PayrollRecordItem, PayrollRecordStatus, PeriodStatus, PeriodType,
        SalarySettings, TaxCategory,
    };
    use chrono::NaiveDate;

    fn company(id: Uuid) -> Company {
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

    fn employee(id: Uuid, company_id: Uuid, code: &str, net_pay_bank: bool) -> Employee {
        Employee {
            id,
            company_id,
            employee_code: code.to_string(),
            first_name: "太郎".to_string(),
            last_name: "山田".to_string(),
            first_name_kana: None,
            last_name_kana: None,
            email: None,
            birth_date: None,
            address: None,
            hire_date: NaiveDate::from_ymd_opt(2020, 4, 1).unwrap(),
            termination_date: None,
            department: Some("経理部".to_string()),
            salary_type_settings: SalarySettings::Monthly {
                monthly_salary: 300_000,
                monthly_prescribed_hours: Some(160),
            },
            tax_category: TaxCategory::Kou,
            dependents_count: 0,
            social_insurance_enrolled: false,
            pension_insurance_enrolled: false,
            employment_insurance_enrolled: false,
            resident_tax_monthly_amount: None,
            bank_name: Some("みずほ銀行".to_string()),
            branch_name: Some("渋谷支店".to_string()),
            account_type_savings: net_pay_bank,
            account_number: Some("1234567".to_string()),
            account_holder: None,
            is_deleted: false,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn period(id: Uuid, company_id: Uuid) -> PayrollPeriod {
        PayrollPeriod {
            id,
            company_id,
            period_type: PeriodType::Regular,
            start_date: NaiveDate::from_ymd_opt(2024, 4, 21).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 20).unwrap(),
            payment_date: NaiveDate::from_ymd_opt(2024, 5, 25).unwrap(),
            status: PeriodStatus::Closed,
        }
    }

    fn seed_confirmed_record(
        repo: &Repository,
        company_id: Uuid,
        employee_id: Uuid,
        period_id: Uuid,
        net_pay: i64,
    ) {
        let group = PayrollRecordGroup {
            id: Uuid::new_v4(),
            company_id,
            employee_id,
            payroll_period_id: period_id,
            current_record_id: None,
        };
        repo.payroll_record_groups.insert(group.id, group.clone());

        let record = PayrollRecord {
            id: Uuid::new_v4(),
            company_id,
            group_id: group.id,
            version: 1,
            status: PayrollRecordStatus::Confirmed,
            total_earnings: net_pay + 10_000,
            total_deductions: 10_000,
            net_pay,
            calculation_details: crate::domain::CalculationDetails {
                salary_type: "monthly".to_string(),
                base_salary: net_pay + 10_000,
                base_hourly_rate: 0,
                gross_salary: net_pay + 10_000,
                social_insurance_total: 0,
                taxable_earnings: net_pay,
                income_tax: 10_000,
                work_days: 20,
                total_work_minutes: 0,
                employee_age: None,
                notes: vec![],
            },
            confirmed_at: Some(chrono::Utc::now()),
            confirmed_by: Some(Uuid::new_v4()),
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
            created_at: chrono::Utc::now(),
        };
        repo.payroll_records.insert(record.id, record.clone());

        repo.payroll_record_items.insert(
            Uuid::new_v4(),
            PayrollRecordItem {
                id: Uuid::new_v4(),
                record_id: record.id,
                item_type: ItemType::Earning,
                item_code: "base_salary".to_string(),
                item_name: "基本給".to_string(),
                amount: record.total_earnings,
                is_taxable: true,
                is_social_insurance_target: true,
                is_employment_insurance_target: true,
                display_order: 0,
            },
        );
        repo.payroll_record_items.insert(
            Uuid::new_v4(),
            PayrollRecordItem {
                id: Uuid::new_v4(),
                record_id: record.id,
                item_type: ItemType::Deduction,
                item_code: "income_tax".to_string(),
                item_name: "源泉所得税".to_string(),
                amount: record.total_deductions,
                is_taxable: false,
                is_social_insurance_target: false,
                is_employment_insurance_target: false,
                display_order: 1,
            },
        );
    }

    /// Two payees: trailer carries count and summed amount.
    #[test]
    fn zengin_trailer_has_correct_count_and_total_and_is_120_bytes() {
        let trailer = zengin_trailer(2, 250_055 + 198_000);
        assert_eq!(trailer.len(), 120);
        assert_eq!(&trailer[0..1], b"8");
        assert_eq!(&trailer[1..7], b"000002");
        assert_eq!(&trailer[7..19], b"000000448055");
        assert!(trailer[19..].iter().all(|b| *b == b' '));
    }

    #[test]
    fn every_zengin_record_is_120_bytes() {
        let repo = Repository::new();
        let company_id = Uuid::new_v4();
        let c = company(company_id);
        let p = period(Uuid::new_v4(), company_id);
        let e1 = employee(Uuid::new_v4(), company_id, "E001", true);
        repo.employees.insert(e1.id, e1.clone());
        seed_confirmed_record(&repo, company_id, e1.id, p.id, 250_055);

        let file = ExportRouter::zengin_transfer_file(&repo, &c, &p, company_id).unwrap();
        for line in file.split(|b| *b == b'\n') {
            let line = if line.ends_with(b"\r") { &line[..line.len() - 1] } else { line };
            if !line.is_empty() {
                assert_eq!(line.len(), 120, "line {:?} is not 120 bytes", String::from_utf8_lossy(line));
            }
        }
    }

    #[test]
    fn payroll_ledger_csv_includes_grand_total_row() {
        let repo = Repository::new();
        let company_id = Uuid::new_v4();
        let e1 = employee(Uuid::new_v4(), company_id, "E001", true);
        let e2 = employee(Uuid::new_v4(), company_id, "E002", true);
        repo.employees.insert(e1.id, e1.clone());
        repo.employees.insert(e2.id, e2.clone());
        let period_id = Uuid::new_v4();
        seed_confirmed_record(&repo, company_id, e1.id, period_id, 250_055);
        seed_confirmed_record(&repo, company_id, e2.id, period_id, 198_000);

        let csv = ExportRouter::payroll_ledger_csv(&repo, company_id, period_id).unwrap();
        assert!(csv.starts_with(UTF8_BOM));
        assert!(csv.contains("合計,,,468055,20000,448055"));
    }

    #[test]
    fn accounting_journal_uses_fallback_labels_when_unmapped() {
        let repo = Repository::new();
        let company_id = Uuid::new_v4();
        let employee_id = Uuid::new_v4();
        let period_id = Uuid::new_v4();
        seed_confirmed_record(&repo, company_id, employee_id, period_id, 290_000);

        let csv = ExportRouter::accounting_journal_csv(&repo, company_id, period_id);
        assert!(csv.contains("給与手当"));
        assert!(csv.contains("預り金"));
    }

    #[test]
    fn accounting_journal_honors_mapping_override() {
        let repo = Repository::new();
        let company_id = Uuid::new_v4();
        let employee_id = Uuid::new_v4();
        let period_id = Uuid::new_v4();
        seed_confirmed_record(&repo, company_id, employee_id, period_id, 290_000);

        repo.accounting_mappings.insert(
            Uuid::new_v4(),
            AccountingMapping {
                id: Uuid::new_v4(),
                company_id,
                item_type: ItemType::Earning,
                item_code: "base_salary".to_string(),
                account_code: "6110".to_string(),
                account_name: "給料手当".to_string(),
                sub_account_code: None,
                sub_account_name: None,
                is_debit: true,
            },
        );

        let csv = ExportRouter::accounting_journal_csv(&repo, company_id, period_id);
        assert!(csv.contains("6110,給料手当"));
    }
}
