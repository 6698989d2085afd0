//! Kyuyo Engine — a multi-tenant Japanese payroll calculation engine.
//!
//! This crate is the core described in the design document: rate-table
//! lookups, the overtime/insurance/tax engines, the payroll calculator that
//! composes them, the versioned payroll-record state machine, the year-end
//! adjustment workflow, and the export serializers that read confirmed
//! records back out. HTTP routing, authentication, and the relational store
//! itself are collaborators that sit outside this crate; [`repository`]
//! provides an in-memory stand-in for the latter so the rest of the crate
//! can be exercised without a running database.

pub mod config;
pub mod domain;
pub mod error;
pub mod payroll;
pub mod repository;

pub use config::Config;
pub use error::{ErrorKind, HasErrorKind};
pub use repository::Repository;
