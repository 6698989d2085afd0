//! Payroll calculation core: rate lookups, overtime/insurance/tax engines,
//! the calculator that composes them, the payroll-record state machine, the
//! year-end adjustment workflow, and the export serializers that read
//! confirmed records back out.

pub mod calculator;
pub mod export;
pub mod insurance;
pub mod overtime;
pub mod rate_book;
pub mod state_machine;
pub mod tax;
pub mod year_end_workflow;

pub use calculator::{CalculatorError, PayrollCalculator, PayrollResult};
pub use export::{ExportError, ExportRouter};
pub use insurance::{InsuranceEngine, InsuranceError};
pub use overtime::{OvertimeBreakdown, OvertimeEngine};
pub use rate_book::{RateBook, RateBookError};
pub use state_machine::{PayrollError, PayrollStateMachine};
pub use tax::TaxEngine;
pub use year_end_workflow::{YearEndError, YearEndWorkflow};
