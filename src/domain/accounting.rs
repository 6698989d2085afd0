//! Per-tenant mapping from payroll line items to accounting ledger accounts,
//! consulted by [`crate::payroll::export`] when building the journal export.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ItemType;

/// Maps one `(item_type, item_code)` pair to the debit or credit account it
/// should post to. Unique per tenant on `(item_type, item_code)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingMapping {
    pub id: Uuid,
    pub company_id: Uuid,
    pub item_type: ItemType,
    pub item_code: String,
    pub account_code: String,
    pub account_name: String,
    pub sub_account_code: Option<String>,
    pub sub_account_name: Option<String>,
    /// `true` for debit, `false` for credit. Earnings normally map to debit,
    /// deductions to credit, but the mapping table lets a tenant override.
    pub is_debit: bool,
}
