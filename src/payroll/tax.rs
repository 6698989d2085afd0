//! Withholding income-tax lookup (源泉徴収税額表).

use chrono::NaiveDate;

use crate::domain::TableType;
use crate::domain::TaxCategory;
use crate::payroll::rate_book::RateBook;

/// No independent legal basis; carried over from the source system as a
/// documented placeholder (see the resolved-questions note in DESIGN.md).
const FALLBACK_RATE: f64 = 0.0358;

/// Result of a withholding-tax lookup, carrying whether the fallback rate
/// was applied so the calculator can flag it in `calculation_details.notes`.
#[derive(Debug, Clone, Copy)]
pub struct TaxResult {
    pub amount: i64,
    pub used_fallback: bool,
}

pub struct TaxEngine;

impl TaxEngine {
    pub fn calculate_income_tax(
        rate_book: &RateBook,
        taxable: i64,
        tax_category: TaxCategory,
        dependents_count: u32,
        target_date: NaiveDate,
        is_monthly: bool,
    ) -> TaxResult {
        let table_type = match tax_category {
            TaxCategory::Kou if is_monthly => TableType::MonthlyKou,
            TaxCategory::Kou => TableType::DailyKou,
            TaxCategory::Otsu => TableType::Otsu,
            TaxCategory::Hei => TableType::Hei,
        };

        if let Some(amount) =
            rate_book.find_income_tax(table_type, taxable, dependents_count, target_date)
        {
            return TaxResult {
                amount,
                used_fallback: false,
            };
        }

        let amount = match tax_category {
            TaxCategory::Otsu | TaxCategory::Hei => (taxable as f64 * FALLBACK_RATE).floor() as i64,
            TaxCategory::Kou => 0,
        };
        TaxResult {
            amount,
            used_fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::IncomeTaxTable;
    use crate::repository::Repository;
    use uuid::Uuid;

    #[test]
    fn scenario_one_monthly_kou_bracket_lookup() {
        let repo = Repository::new();
        repo.income_tax_tables.insert(
            Uuid::new_v4(),
            IncomeTaxTable {
                id: Uuid::new_v4(),
                table_type: TableType::MonthlyKou,
                income_from: 240_000,
                income_to: Some(260_000),
                dependents_count: 1,
                tax_amount: 5_740,
                valid_from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                valid_to: None,
            },
        );
        let rate_book = RateBook::new(&repo);
        let result = TaxEngine::calculate_income_tax(
            &rate_book,
            255_795,
            TaxCategory::Kou,
            1,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            true,
        );
        assert_eq!(result.amount, 5_740);
        assert!(!result.used_fallback);
    }

    #[test]
    fn otsu_falls_back_to_flat_rate_when_no_bracket_matches() {
        let repo = Repository::new();
        let rate_book = RateBook::new(&repo);
        let result = TaxEngine::calculate_income_tax(
            &rate_book,
            100_000,
            TaxCategory::Otsu,
            0,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            true,
        );
        assert_eq!(result.amount, 3_580);
        assert!(result.used_fallback);
    }

    #[test]
    fn kou_falls_back_to_zero_when_no_bracket_matches() {
        let repo = Repository::new();
        let rate_book = RateBook::new(&repo);
        let result = TaxEngine::calculate_income_tax(
            &rate_book,
            100_000,
            TaxCategory::Kou,
            3,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            true,
        );
        assert_eq!(result.amount, 0);
        assert!(result.used_fallback);
    }
}
