//! Financial data service client (C4).
//!
//! Fetches the three statements, historical periods, and a composite
//! "complete data" bundle from a remote HTTP façade over the underlying
//! relational store.

pub mod client;
pub mod statement;

pub use client::FinancialDataClient;
pub use statement::{CompleteFinancialBundle, FinancialStatement, PreviousStatements, StatementKind};
