//! Owns the `YearEndAdjustment` aggregate and its five-state lifecycle:
//! employee submits, admin approves/returns/confirms, and confirmation
//! computes the final tax true-up.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    DeductionCertificate, Employee, SlipData, TaxWithholdingSlip, YearEndAdjustment,
    YearEndAdjustmentHistory, YearEndStatus,
};
use crate::error::{ErrorKind, HasErrorKind};
use crate::repository::Repository;

#[derive(Debug, Error)]
pub enum YearEndError {
    #[error("year-end adjustment {0} not found")]
    NotFound(Uuid),
    #[error("an adjustment for employee {employee_id} and year {year} already exists")]
    Conflict { employee_id: Uuid, year: i32 },
    #[error("adjustment is {0:?}, which does not allow this transition")]
    InvalidState(YearEndStatus),
    #[error("actor is not permitted to act on this employee's adjustment")]
    PermissionDenied,
    #[error("{0}")]
    ValidationFailed(&'static str),
    #[error("a withholding slip has already been generated for this adjustment")]
    SlipAlreadyGenerated,
}

impl HasErrorKind for YearEndError {
    fn kind(&self) -> ErrorKind {
        match self {
            YearEndError::NotFound(_) => ErrorKind::NotFound,
            YearEndError::Conflict { .. } | YearEndError::SlipAlreadyGenerated => {
                ErrorKind::Conflict
            }
            YearEndError::InvalidState(_) => ErrorKind::InvalidState,
            YearEndError::PermissionDenied => ErrorKind::PermissionDenied,
            YearEndError::ValidationFailed(_) => ErrorKind::ValidationFailed,
        }
    }
}

pub struct YearEndWorkflow<'a> {
    repo: &'a Repository,
}

impl<'a> YearEndWorkflow<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    pub fn create(
        &self,
        company_id: Uuid,
        employee_id: Uuid,
        target_year: i32,
        actor: Uuid,
        actor_is_admin: bool,
    ) -> Result<YearEndAdjustment, YearEndError> {
        if !actor_is_admin && actor != employee_id {
            return Err(YearEndError::PermissionDenied);
        }
        let duplicate = self.repo.year_end_adjustments.iter().any(|a| {
            a.company_id == company_id && a.employee_id == employee_id && a.target_year == target_year
        });
        if duplicate {
            return Err(YearEndError::Conflict { employee_id, year: target_year });
        }

        let now = Utc::now();
        let adjustment = YearEndAdjustment {
            id: Uuid::new_v4(),
            company_id,
            employee_id,
            target_year,
            status: YearEndStatus::Draft,
            spouse_deduction: 0,
            spouse_special_deduction: 0,
            dependents_deduction: 0,
            disability_deduction: 0,
            widow_deduction: 0,
            working_student_deduction: 0,
            life_insurance_deduction: 0,
            earthquake_insurance_deduction: 0,
            social_insurance_deduction: 0,
            small_business_mutual_aid_deduction: 0,
            housing_loan_deduction: 0,
            spouse_income: None,
            dependents_count: 0,
            has_disability: false,
            is_widow: false,
            is_working_student: false,
            annual_income: None,
            annual_withheld_tax: None,
            annual_calculated_tax: None,
            adjustment_amount: None,
            submitted_at: None,
            approved_at: None,
            approved_by: None,
            returned_at: None,
            return_reason: None,
            confirmed_at: None,
            confirmed_by: None,
            created_at: now,
            updated_at: now,
        };
        self.repo
            .year_end_adjustments
            .insert(adjustment.id, adjustment.clone());
        self.record_history(adjustment.id, None, YearEndStatus::Draft, actor, None);
        Ok(adjustment)
    }

    /// Only allowed while the adjustment is still editable (`draft` or
    /// `returned`); the caller supplies the already-mutated value.
    pub fn update(&self, mut patched: YearEndAdjustment) -> Result<YearEndAdjustment, YearEndError> {
        let current = self
            .repo
            .year_end_adjustments
            .get(&patched.id)
            .map(|a| a.clone())
            .ok_or(YearEndError::NotFound(patched.id))?;
        if !matches!(current.status, YearEndStatus::Draft | YearEndStatus::Returned) {
            return Err(YearEndError::InvalidState(current.status));
        }
        patched.status = current.status;
        patched.updated_at = Utc::now();
        self.repo
            .year_end_adjustments
            .insert(patched.id, patched.clone());
        Ok(patched)
    }

    pub fn submit(&self, id: Uuid, actor: Uuid) -> Result<YearEndAdjustment, YearEndError> {
        self.transition(id, actor, None, |a| {
            matches!(a.status, YearEndStatus::Draft | YearEndStatus::Returned)
        }, |a, now| {
            a.status = YearEndStatus::Submitted;
            a.submitted_at = Some(now);
        })
    }

    pub fn approve(&self, id: Uuid, actor: Uuid) -> Result<YearEndAdjustment, YearEndError> {
        self.transition(id, actor, None, |a| a.status == YearEndStatus::Submitted, |a, now| {
            a.status = YearEndStatus::Approved;
            a.approved_at = Some(now);
            a.approved_by = Some(actor);
        })
    }

    pub fn return_to_employee(
        &self,
        id: Uuid,
        reason: String,
        actor: Uuid,
    ) -> Result<YearEndAdjustment, YearEndError> {
        self.transition(
            id,
            actor,
            Some(reason.clone()),
            |a| a.status == YearEndStatus::Submitted,
            move |a, now| {
                a.status = YearEndStatus::Returned;
                a.returned_at = Some(now);
                a.return_reason = Some(reason.clone());
            },
        )
    }

    pub fn confirm(&self, id: Uuid, actor: Uuid) -> Result<YearEndAdjustment, YearEndError> {
        let current = self
            .repo
            .year_end_adjustments
            .get(&id)
            .map(|a| a.clone())
            .ok_or(YearEndError::NotFound(id))?;
        if current.status != YearEndStatus::Approved {
            return Err(YearEndError::InvalidState(current.status));
        }
        let (Some(calculated), Some(withheld)) =
            (current.annual_calculated_tax, current.annual_withheld_tax)
        else {
            return Err(YearEndError::ValidationFailed(
                "annual_calculated_tax and annual_withheld_tax must be set before confirming",
            ));
        };

        self.transition(id, actor, None, |a| a.status == YearEndStatus::Approved, move |a, now| {
            a.status = YearEndStatus::Confirmed;
            a.confirmed_at = Some(now);
            a.confirmed_by = Some(actor);
            a.adjustment_amount = Some(calculated - withheld);
        })
    }

    pub fn generate_withholding_slip(
        &self,
        id: Uuid,
        employee: &Employee,
    ) -> Result<TaxWithholdingSlip, YearEndError> {
        let adjustment = self
            .repo
            .year_end_adjustments
            .get(&id)
            .map(|a| a.clone())
            .ok_or(YearEndError::NotFound(id))?;
        if adjustment.status != YearEndStatus::Confirmed {
            return Err(YearEndError::InvalidState(adjustment.status));
        }
        let already_generated = self
            .repo
            .tax_withholding_slips
            .iter()
            .any(|s| s.adjustment_id == id);
        if already_generated {
            return Err(YearEndError::SlipAlreadyGenerated);
        }

        let slip_data = SlipData {
            employee_name: employee.full_name(),
            employee_name_kana: match (&employee.last_name_kana, &employee.first_name_kana) {
                (Some(last), Some(first)) => Some(format!("{last} {first}")),
                _ => None,
            },
            employee_address: employee.address.clone(),
            birth_date: employee.birth_date,
            target_year: adjustment.target_year,
            annual_income: adjustment.annual_income.unwrap_or(0),
            annual_withheld_tax: adjustment.annual_withheld_tax.unwrap_or(0),
            annual_calculated_tax: adjustment.annual_calculated_tax.unwrap_or(0),
            adjustment_amount: adjustment.adjustment_amount.unwrap_or(0),
            spouse_deduction: adjustment.spouse_deduction,
            spouse_special_deduction: adjustment.spouse_special_deduction,
            dependents_deduction: adjustment.dependents_deduction,
            disability_deduction: adjustment.disability_deduction,
            widow_deduction: adjustment.widow_deduction,
            working_student_deduction: adjustment.working_student_deduction,
            life_insurance_deduction: adjustment.life_insurance_deduction,
            earthquake_insurance_deduction: adjustment.earthquake_insurance_deduction,
            social_insurance_deduction: adjustment.social_insurance_deduction,
            small_business_mutual_aid_deduction: adjustment.small_business_mutual_aid_deduction,
            housing_loan_deduction: adjustment.housing_loan_deduction,
            spouse_income: adjustment.spouse_income,
            dependents_count: adjustment.dependents_count,
            social_insurance_enrolled: employee.social_insurance_enrolled,
            pension_insurance_enrolled: employee.pension_insurance_enrolled,
            employment_insurance_enrolled: employee.employment_insurance_enrolled,
        };

        let slip = TaxWithholdingSlip {
            id: Uuid::new_v4(),
            adjustment_id: id,
            slip_data,
            generated_at: Utc::now(),
        };
        self.repo
            .tax_withholding_slips
            .insert(slip.id, slip.clone());
        Ok(slip)
    }

    pub fn attach_certificate(
        &self,
        adjustment_id: Uuid,
        certificate_type: String,
        file_name: String,
        file_size: u64,
        actor: Uuid,
        actor_is_admin: bool,
    ) -> Result<DeductionCertificate, YearEndError> {
        let adjustment = self
            .repo
            .year_end_adjustments
            .get(&adjustment_id)
            .map(|a| a.clone())
            .ok_or(YearEndError::NotFound(adjustment_id))?;
        if !actor_is_admin && actor != adjustment.employee_id {
            return Err(YearEndError::PermissionDenied);
        }

        let certificate = DeductionCertificate {
            id: Uuid::new_v4(),
            adjustment_id,
            certificate_type,
            file_name,
            file_size,
            uploaded_by: actor,
            uploaded_at: Utc::now(),
        };
        self.repo
            .deduction_certificates
            .insert(certificate.id, certificate.clone());
        Ok(certificate)
    }

    fn transition(
        &self,
        id: Uuid,
        actor: Uuid,
        reason: Option<String>,
        precondition: impl Fn(&YearEndAdjustment) -> bool,
        apply: impl FnOnce(&mut YearEndAdjustment, chrono::DateTime<Utc>),
    ) -> Result<YearEndAdjustment, YearEndError> {
        let mut adjustment = self
            .repo
            .year_end_adjustments
            .get(&id)
            .map(|a| a.clone())
            .ok_or(YearEndError::NotFound(id))?;
        if !precondition(&adjustment) {
            return Err(YearEndError::InvalidState(adjustment.status));
        }
        let old_status = adjustment.status;
        let now = Utc::now();
        apply(&mut adjustment, now);
        adjustment.updated_at = now;
        self.repo
            .year_end_adjustments
            .insert(adjustment.id, adjustment.clone());
        self.record_history(adjustment.id, Some(old_status), adjustment.status, actor, reason);
        Ok(adjustment)
    }

    fn record_history(
        &self,
        adjustment_id: Uuid,
        old_status: Option<YearEndStatus>,
        new_status: YearEndStatus,
        actor: Uuid,
        reason: Option<String>,
    ) {
        self.repo.year_end_history.insert(
            Uuid::new_v4(),
            YearEndAdjustmentHistory {
                id: Uuid::new_v4(),
                adjustment_id,
                old_status,
                new_status,
                actor,
                reason,
                created_at: Utc::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Confirming computes the adjustment amount as a refund
    /// when calculated tax is less than what was withheld.
    #[test]
    fn confirm_computes_refund_amount() {
        let repo = Repository::new();
        let workflow = YearEndWorkflow::new(&repo);
        let employee_id = Uuid::new_v4();
        let company_id = Uuid::new_v4();

        let created = workflow
            .create(company_id, employee_id, 2024, employee_id, false)
            .unwrap();
        let submitted = workflow.submit(created.id, employee_id).unwrap();
        let approved = workflow.approve(submitted.id, Uuid::new_v4()).unwrap();

        let mut patch = approved.clone();
        patch.status = YearEndStatus::Approved;
        patch.annual_calculated_tax = Some(420_000);
        patch.annual_withheld_tax = Some(450_000);
        repo.year_end_adjustments.insert(patch.id, patch);

        let confirmed = workflow.confirm(approved.id, Uuid::new_v4()).unwrap();
        assert_eq!(confirmed.status, YearEndStatus::Confirmed);
        assert_eq!(confirmed.adjustment_amount, Some(-30_000));
    }

    #[test]
    fn duplicate_create_is_conflict() {
        let repo = Repository::new();
        let workflow = YearEndWorkflow::new(&repo);
        let employee_id = Uuid::new_v4();
        let company_id = Uuid::new_v4();
        workflow.create(company_id, employee_id, 2024, employee_id, false).unwrap();
        let err = workflow
            .create(company_id, employee_id, 2024, employee_id, false)
            .unwrap_err();
        assert!(matches!(err, YearEndError::Conflict { .. }));
    }

    #[test]
    fn non_owner_cannot_create_for_another_employee() {
        let repo = Repository::new();
        let workflow = YearEndWorkflow::new(&repo);
        let err = workflow
            .create(Uuid::new_v4(), Uuid::new_v4(), 2024, Uuid::new_v4(), false)
            .unwrap_err();
        assert!(matches!(err, YearEndError::PermissionDenied));
    }
}
