//! Owns the `PayrollRecordGroup` / `PayrollRecord` / `PayrollSnapshot` /
//! `PayrollHistory` aggregate: creates draft versions from a calculation,
//! confirms them with a frozen snapshot, and cancels confirmed records by
//! forking a new draft.

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    PayrollHistory, PayrollRecord, PayrollRecordGroup, PayrollRecordItem, PayrollRecordStatus,
    PayrollSnapshot,
};
use crate::error::{ErrorKind, HasErrorKind};
use crate::payroll::calculator::PayrollResult;
use crate::repository::Repository;

#[derive(Debug, Error)]
pub enum PayrollError {
    #[error("payroll record {0} not found")]
    NotFound(Uuid),
    #[error("record is {0:?}, expected a different status for this transition")]
    InvalidState(PayrollRecordStatus),
    #[error("invariant violated while committing record {0}: {1}")]
    Internal(Uuid, &'static str),
}

impl HasErrorKind for PayrollError {
    fn kind(&self) -> ErrorKind {
        match self {
            PayrollError::NotFound(_) => ErrorKind::NotFound,
            PayrollError::InvalidState(_) => ErrorKind::InvalidState,
            PayrollError::Internal(_, _) => ErrorKind::Internal,
        }
    }
}

pub struct PayrollStateMachine<'a> {
    repo: &'a Repository,
}

impl<'a> PayrollStateMachine<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    /// Idempotent at the group level: if a draft already exists, returns it
    /// unchanged rather than creating a second one.
    #[tracing::instrument(skip(self, calc), fields(%company_id, %employee_id, %payroll_period_id))]
    pub fn create_from_calculation(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
        payroll_period_id: Uuid,
        calc: PayrollResult,
        actor: Uuid,
    ) -> Result<PayrollRecord, PayrollError> {
        let _guard = self.repo.transition_lock.lock().unwrap();

        let group = self
            .repo
            .find_group_for_period(company_id, employee_id, payroll_period_id)
            .unwrap_or_else(|| {
                let group = PayrollRecordGroup {
                    id: Uuid::new_v4(),
                    company_id,
                    employee_id,
                    payroll_period_id,
                    current_record_id: None,
                };
                self.repo.payroll_record_groups.insert(group.id, group.clone());
                group
            });

        let existing = self.repo.records_in_group(group.id);
        if let Some(draft) = existing.iter().find(|r| r.status == PayrollRecordStatus::Draft) {
            tracing::info!(record_id = %draft.id, "draft already exists for group, skipping calculation");
            return Ok(draft.clone());
        }

        let new_version = existing.iter().map(|r| r.version).max().unwrap_or(0) + 1;
        let record = PayrollRecord {
            id: Uuid::new_v4(),
            company_id,
            group_id: group.id,
            version: new_version,
            status: PayrollRecordStatus::Draft,
            total_earnings: calc.total_earnings,
            total_deductions: calc.total_deductions,
            net_pay: calc.net_pay,
            calculation_details: calc.calculation_details,
            confirmed_at: None,
            confirmed_by: None,
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
            created_at: Utc::now(),
        };
        self.repo.payroll_records.insert(record.id, record.clone());

        for (order, item) in calc.items.into_iter().enumerate() {
            let stored = PayrollRecordItem {
                id: Uuid::new_v4(),
                record_id: record.id,
                item_type: item.item_type,
                item_code: item.item_code,
                item_name: item.item_name,
                amount: item.amount,
                is_taxable: item.is_taxable,
                is_social_insurance_target: item.is_social_insurance_target,
                is_employment_insurance_target: item.is_employment_insurance_target,
                display_order: order as i32,
            };
            self.repo.payroll_record_items.insert(stored.id, stored);
        }

        let mut group = group;
        group.current_record_id = Some(record.id);
        self.repo.payroll_record_groups.insert(group.id, group);

        self.repo.payroll_history.insert(
            Uuid::new_v4(),
            PayrollHistory {
                id: Uuid::new_v4(),
                record_id: record.id,
                action: "calculated".to_string(),
                old_values: None,
                new_values: Some(json!({"version": record.version})),
                actor,
                reason: None,
                created_at: Utc::now(),
            },
        );

        self.verify_invariants(&record)?;
        tracing::info!(record_id = %record.id, version = record.version, "created payroll draft");
        Ok(record)
    }

    #[tracing::instrument(skip(self))]
    pub fn confirm(&self, record_id: Uuid, actor: Uuid) -> Result<PayrollRecord, PayrollError> {
        let _guard = self.repo.transition_lock.lock().unwrap();

        let mut record = self
            .repo
            .payroll_records
            .get(&record_id)
            .map(|r| r.clone())
            .ok_or(PayrollError::NotFound(record_id))?;
        if record.status != PayrollRecordStatus::Draft {
            return Err(PayrollError::InvalidState(record.status));
        }

        let old_status = record.status;
        record.status = PayrollRecordStatus::Confirmed;
        record.confirmed_at = Some(Utc::now());
        record.confirmed_by = Some(actor);
        self.repo.payroll_records.insert(record.id, record.clone());

        let items = self.repo.items_for_record(record.id);
        let snapshot_data = json!({
            "record": &record,
            "items": &items,
        });
        self.repo.payroll_snapshots.insert(
            Uuid::new_v4(),
            PayrollSnapshot {
                id: Uuid::new_v4(),
                record_id: record.id,
                snapshot_data,
                created_at: Utc::now(),
            },
        );

        self.repo.payroll_history.insert(
            Uuid::new_v4(),
            PayrollHistory {
                id: Uuid::new_v4(),
                record_id: record.id,
                action: "confirmed".to_string(),
                old_values: Some(json!({"status": format!("{old_status:?}")})),
                new_values: Some(json!({"status": format!("{:?}", record.status)})),
                actor,
                reason: None,
                created_at: Utc::now(),
            },
        );

        self.verify_invariants(&record)?;
        tracing::info!(record_id = %record.id, "confirmed payroll record");
        Ok(record)
    }

    /// Cancels a confirmed record and forks a new draft carrying forward its
    /// totals and calculation details unchanged.
    #[tracing::instrument(skip(self, reason))]
    pub fn cancel(
        &self,
        record_id: Uuid,
        reason: String,
        actor: Uuid,
    ) -> Result<(PayrollRecord, PayrollRecord), PayrollError> {
        let _guard = self.repo.transition_lock.lock().unwrap();

        let mut cancelled = self
            .repo
            .payroll_records
            .get(&record_id)
            .map(|r| r.clone())
            .ok_or(PayrollError::NotFound(record_id))?;
        if cancelled.status != PayrollRecordStatus::Confirmed {
            return Err(PayrollError::InvalidState(cancelled.status));
        }

        cancelled.status = PayrollRecordStatus::Cancelled;
        cancelled.cancelled_at = Some(Utc::now());
        cancelled.cancelled_by = Some(actor);
        cancelled.cancel_reason = Some(reason.clone());
        self.repo.payroll_records.insert(cancelled.id, cancelled.clone());

        let existing = self.repo.records_in_group(cancelled.group_id);
        let new_version = existing.iter().map(|r| r.version).max().unwrap_or(0) + 1;
        let new_record = PayrollRecord {
            id: Uuid::new_v4(),
            company_id: cancelled.company_id,
            group_id: cancelled.group_id,
            version: new_version,
            status: PayrollRecordStatus::Draft,
            total_earnings: cancelled.total_earnings,
            total_deductions: cancelled.total_deductions,
            net_pay: cancelled.net_pay,
            calculation_details: cancelled.calculation_details.clone(),
            confirmed_at: None,
            confirmed_by: None,
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
            created_at: Utc::now(),
        };
        self.repo.payroll_records.insert(new_record.id, new_record.clone());

        for item in self.repo.items_for_record(cancelled.id) {
            let cloned = PayrollRecordItem {
                id: Uuid::new_v4(),
                record_id: new_record.id,
                ..item
            };
            self.repo.payroll_record_items.insert(cloned.id, cloned);
        }

        if let Some(mut group) = self
            .repo
            .payroll_record_groups
            .get(&cancelled.group_id)
            .map(|g| g.clone())
        {
            group.current_record_id = Some(new_record.id);
            self.repo.payroll_record_groups.insert(group.id, group);
        }

        self.repo.payroll_history.insert(
            Uuid::new_v4(),
            PayrollHistory {
                id: Uuid::new_v4(),
                record_id: cancelled.id,
                action: "cancelled".to_string(),
                old_values: Some(json!({"status": "confirmed"})),
                new_values: Some(json!({"status": "cancelled", "reason": reason})),
                actor,
                reason: None,
                created_at: Utc::now(),
            },
        );
        self.repo.payroll_history.insert(
            Uuid::new_v4(),
            PayrollHistory {
                id: Uuid::new_v4(),
                record_id: new_record.id,
                action: "created_from_cancellation".to_string(),
                old_values: None,
                new_values: Some(json!({"source_record_id": cancelled.id})),
                actor,
                reason: None,
                created_at: Utc::now(),
            },
        );

        self.verify_invariants(&cancelled)?;
        self.verify_invariants(&new_record)?;
        tracing::info!(
            cancelled_record_id = %cancelled.id,
            new_draft_id = %new_record.id,
            "cancelled payroll record, forked new draft"
        );
        Ok((cancelled, new_record))
    }

    fn verify_invariants(&self, record: &PayrollRecord) -> Result<(), PayrollError> {
        let items = self.repo.items_for_record(record.id);
        if !record.totals_consistent(&items) {
            return Err(PayrollError::Internal(record.id, "totals do not match line items"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CalculationDetails;
    use crate::payroll::calculator::CalculatedItem;

    fn sample_calc() -> PayrollResult {
        PayrollResult {
            items: vec![
                CalculatedItem {
                    item_type: crate::domain::ItemType::Earning,
                    item_code: "base_salary".to_string(),
                    item_name: "基本給".to_string(),
                    amount: 300_000,
                    is_taxable: true,
                    is_social_insurance_target: true,
                    is_employment_insurance_target: true,
                },
                CalculatedItem {
                    item_type: crate::domain::ItemType::Deduction,
                    item_code: "income_tax".to_string(),
                    item_name: "源泉所得税".to_string(),
                    amount: 5_740,
                    is_taxable: false,
                    is_social_insurance_target: false,
                    is_employment_insurance_target: false,
                },
            ],
            total_earnings: 300_000,
            total_deductions: 5_740,
            net_pay: 294_260,
            calculation_details: CalculationDetails {
                salary_type: "monthly".to_string(),
                base_salary: 300_000,
                base_hourly_rate: 1_875,
                gross_salary: 300_000,
                social_insurance_total: 0,
                taxable_earnings: 300_000,
                income_tax: 5_740,
                work_days: 20,
                total_work_minutes: 0,
                employee_age: None,
                notes: vec![],
            },
        }
    }

    /// Cancelling a confirmed record forks a new draft.
    #[test]
    fn cancel_forks_new_draft_with_same_totals() {
        let repo = Repository::new();
        let machine = PayrollStateMachine::new(&repo);
        let company_id = Uuid::new_v4();
        let employee_id = Uuid::new_v4();
        let period_id = Uuid::new_v4();
        let actor = Uuid::new_v4();

        let draft = machine
            .create_from_calculation(company_id, employee_id, period_id, sample_calc(), actor)
            .unwrap();
        let confirmed = machine.confirm(draft.id, actor).unwrap();
        assert_eq!(confirmed.status, PayrollRecordStatus::Confirmed);

        let (cancelled, new_draft) = machine
            .cancel(confirmed.id, "誤計算".to_string(), actor)
            .unwrap();
        assert_eq!(cancelled.status, PayrollRecordStatus::Cancelled);
        assert_eq!(new_draft.status, PayrollRecordStatus::Draft);
        assert_eq!(new_draft.version, confirmed.version + 1);
        assert_eq!(new_draft.net_pay, cancelled.net_pay);

        let group = repo
            .payroll_record_groups
            .get(&draft.group_id)
            .map(|g| g.clone())
            .unwrap();
        assert_eq!(group.current_record_id, Some(new_draft.id));
    }

    #[test]
    fn create_from_calculation_is_idempotent_while_draft_exists() {
        let repo = Repository::new();
        let machine = PayrollStateMachine::new(&repo);
        let company_id = Uuid::new_v4();
        let employee_id = Uuid::new_v4();
        let period_id = Uuid::new_v4();
        let actor = Uuid::new_v4();

        let first = machine
            .create_from_calculation(company_id, employee_id, period_id, sample_calc(), actor)
            .unwrap();
        let second = machine
            .create_from_calculation(company_id, employee_id, period_id, sample_calc(), actor)
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn confirm_on_non_draft_is_invalid_state() {
        let repo = Repository::new();
        let machine = PayrollStateMachine::new(&repo);
        let actor = Uuid::new_v4();
        let draft = machine
            .create_from_calculation(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), sample_calc(), actor)
            .unwrap();
        let confirmed = machine.confirm(draft.id, actor).unwrap();
        let err = machine.confirm(confirmed.id, actor).unwrap_err();
        assert!(matches!(err, PayrollError::InvalidState(PayrollRecordStatus::Confirmed)));
    }
}
