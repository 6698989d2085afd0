//! Social-insurance deduction engine: health, care, pension, and employment
//! insurance premiums, each the employee's share of a rate looked up via
//! [`RateBook`].

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Company, InsuranceType};
use crate::error::{ErrorKind, HasErrorKind};
use crate::payroll::rate_book::{RateBook, RateBookError};

#[derive(Debug, Error)]
pub enum InsuranceError {
    #[error(transparent)]
    RateBook(#[from] RateBookError),
}

impl HasErrorKind for InsuranceError {
    fn kind(&self) -> ErrorKind {
        match self {
            InsuranceError::RateBook(e) => e.kind(),
        }
    }
}

/// Health and care insurance amounts for one calculation, plus a note when a
/// rate row was missing.
#[derive(Debug, Clone, Default)]
pub struct HealthInsuranceResult {
    pub health: Option<i64>,
    pub care: Option<i64>,
    pub notes: Vec<String>,
}

pub struct InsuranceEngine;

impl InsuranceEngine {
    pub fn health(
        rate_book: &RateBook,
        company: &Company,
        gross: i64,
        target_date: NaiveDate,
        employee_age: Option<u32>,
    ) -> Result<HealthInsuranceResult, InsuranceError> {
        let prefecture = company.health_insurance_prefecture_or_default();
        let rate = rate_book.find_insurance_rate(
            company.id,
            InsuranceType::Health,
            target_date,
            Some(prefecture),
        )?;

        let mut result = HealthInsuranceResult::default();
        let Some(rate) = rate else {
            tracing::warn!(
                company_id = %company.id,
                prefecture,
                %target_date,
                "health insurance rate miss, omitting line item"
            );
            result
                .notes
                .push(format!("health insurance rate not found for {target_date}"));
            return Ok(result);
        };

        result.health = Some(floor_premium(gross, rate.employee_rate));

        let care_eligible = employee_age.map_or(false, |age| (40..65).contains(&age))
            && company.care_insurance_applicable;
        if care_eligible {
            if let Some(care_rate) = rate.care_insurance_rate {
                result.care = Some(floor_premium(gross, care_rate));
            }
        }
        Ok(result)
    }

    pub fn pension(
        rate_book: &RateBook,
        company_id: uuid::Uuid,
        gross: i64,
        target_date: NaiveDate,
    ) -> Result<Option<i64>, InsuranceError> {
        let rate = rate_book.find_insurance_rate(company_id, InsuranceType::Pension, target_date, None)?;
        Ok(rate.map(|r| floor_premium(gross, r.employee_rate)))
    }

    pub fn employment(
        rate_book: &RateBook,
        company_id: uuid::Uuid,
        gross: i64,
        target_date: NaiveDate,
    ) -> Result<Option<i64>, InsuranceError> {
        let rate =
            rate_book.find_insurance_rate(company_id, InsuranceType::Employment, target_date, None)?;
        Ok(rate.map(|r| floor_premium(gross, r.employee_rate)))
    }
}

fn floor_premium(gross: i64, rate: rust_decimal::Decimal) -> i64 {
    use rust_decimal::prelude::ToPrimitive;
    ((gross as f64) * rate.to_f64().unwrap_or(0.0)).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InsuranceRate;
    use crate::repository::Repository;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn company(id: uuid::Uuid) -> Company {
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

    #[test]
    fn scenario_one_social_insurance_total() {
        let repo = Repository::new();
        let company_id = Uuid::new_v4();
        let target_date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        for (t, rate) in [
            (InsuranceType::Health, dec!(0.04985)),
            (InsuranceType::Pension, dec!(0.09150)),
            (InsuranceType::Employment, dec!(0.00600)),
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

        let rate_book = RateBook::new(&repo);
        let gross = 300_000;
        let health =
            InsuranceEngine::health(&rate_book, &company(company_id), gross, target_date, Some(35))
                .unwrap();
        let pension = InsuranceEngine::pension(&rate_book, company_id, gross, target_date).unwrap();
        let employment = InsuranceEngine::employment(&rate_book, company_id, gross, target_date).unwrap();

        assert_eq!(health.health, Some(14_955));
        assert_eq!(health.care, None); // age 35, below the 40-65 band
        assert_eq!(pension, Some(27_450));
        assert_eq!(employment, Some(1_800));
    }
}
