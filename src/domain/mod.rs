//! Core entity and value types for the payroll domain.
//!
//! Every entity carries an explicit `company_id` (or is a global table with
//! none) rather than relying on implicit session state — tenant scoping is
//! a parameter, not ambient context.

pub mod accounting;
pub mod attendance;
pub mod company;
pub mod employee;
pub mod payroll_record;
pub mod rates;
pub mod year_end;

pub use accounting::AccountingMapping;
pub use attendance::{AttendanceRecord, PayrollPeriod, PeriodStatus, PeriodType};
pub use company::Company;
pub use employee::{
    AllowanceType, CommuteDetail, CommuteMethod, Employee, EmployeeAllowance, SalarySettings,
    TaxCategory,
};
pub use payroll_record::{
    CalculationDetails, ItemType, PayrollHistory, PayrollRecord, PayrollRecordGroup,
    PayrollRecordItem, PayrollRecordStatus, PayrollSnapshot,
};
pub use rates::{
    CommuteTaxLimit, IncomeTaxTable, InsuranceConstant, InsuranceRate, InsuranceType, TableType,
};
pub use year_end::{
    DeductionCertificate, SlipData, TaxWithholdingSlip, YearEndAdjustment,
    YearEndAdjustmentHistory, YearEndStatus,
};
