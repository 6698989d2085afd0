//! Tenant (company) master record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A tenant. Every other entity in the system either belongs to exactly one
/// `Company` or is a global reference table shared by all tenants.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Company {
    pub id: Uuid,
    #[validate(length(min = 1, message = "company name must not be empty"))]
    pub name: String,
    pub name_kana: Option<String>,
    pub address: Option<String>,
    pub representative_name: Option<String>,
    pub legal_number: Option<String>,

    /// Day of month (1-31) the attendance period closes on.
    #[validate(range(min = 1, max = 31, message = "closing_day must be 1-31"))]
    pub closing_day: u8,
    /// Day of month (1-31) salary is paid on.
    #[validate(range(min = 1, max = 31, message = "payment_day must be 1-31"))]
    pub payment_day: u8,
    /// How many months after the closing month payment falls (usually 1).
    pub payment_month_offset: u8,

    pub health_insurance_prefecture: Option<String>,
    pub health_insurance_union_name: Option<String>,
    pub care_insurance_applicable: bool,

    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    /// Prefecture used for health-insurance rate lookups, defaulting to
    /// 東京都 (Tokyo) when the tenant hasn't configured one.
    pub fn health_insurance_prefecture_or_default(&self) -> &str {
        self.health_insurance_prefecture
            .as_deref()
            .unwrap_or("東京都")
    }
}
