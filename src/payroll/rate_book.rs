//! Read-only, time-ranged lookup service for income-tax brackets, insurance
//! rates, commute non-taxable limits, and insurance constants. Every lookup
//! prefers a tenant-scoped override over a global row, then selects the row
//! with the greatest `valid_from` not exceeding the target date.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{CommuteMethod, InsuranceRate, InsuranceType, TableType};
use crate::error::{ErrorKind, HasErrorKind};
use crate::repository::Repository;

/// A missing rate row is not an error at this layer — every lookup returns
/// `Option::None` and lets the caller (insurance/tax engines) decide what
/// a miss means. The only failure this service itself can raise is a data
/// error: two rows in the same scope tied on selection.
#[derive(Debug, Error)]
pub enum RateBookError {
    #[error("multiple rate rows tied on selection for {0}")]
    AmbiguousRate(&'static str),
}

impl HasErrorKind for RateBookError {
    fn kind(&self) -> ErrorKind {
        match self {
            RateBookError::AmbiguousRate(_) => ErrorKind::AmbiguousRate,
        }
    }
}

pub struct RateBook<'a> {
    repo: &'a Repository,
}

impl<'a> RateBook<'a> {
    pub fn new(repo: &'a Repository) -> Self {
        Self { repo }
    }

    pub fn find_insurance_rate(
        &self,
        company_id: Uuid,
        insurance_type: InsuranceType,
        target_date: NaiveDate,
        prefecture: Option<&str>,
    ) -> Result<Option<InsuranceRate>, RateBookError> {
        self.repo
            .find_insurance_rate(company_id, insurance_type, prefecture, target_date)
            .map_err(|_| RateBookError::AmbiguousRate("insurance_rate"))
    }

    pub fn find_income_tax(
        &self,
        table_type: TableType,
        taxable_income: i64,
        dependents_count: u32,
        target_date: NaiveDate,
    ) -> Option<i64> {
        self.repo
            .find_income_tax(table_type, taxable_income, dependents_count, target_date)
    }

    pub fn find_commute_non_taxable_limit(
        &self,
        commute_method: CommuteMethod,
        target_date: NaiveDate,
    ) -> Option<i64> {
        self.repo.find_commute_tax_limit(commute_method, target_date)
    }

    pub fn find_insurance_constant(
        &self,
        company_id: Uuid,
        constant_type: &str,
        target_date: NaiveDate,
    ) -> Option<rust_decimal::Decimal> {
        self.repo
            .find_insurance_constant(company_id, constant_type, target_date)
            .map(|c| c.value)
    }
}
