//! Financial context for the billing assistant.
//!
//! Public API: [`ContextBuilder`]. It reads contracts from a
//! [`ContractSource`], classifies pending installments as overdue or
//! receivable against a reference date, ranks overdue debts by corrected
//! value, and serializes a bounded [`ContextPayload`] for the prompt.

pub mod builder;
pub mod cfg;
pub mod correction;
mod error;
pub mod model;
pub mod source;

pub use builder::{
    ClientStatus, ClientSummary, ContextBuilder, ContextPayload, ContextSnapshot, DATA_UNAVAILABLE,
    FinancialSummary, OverdueEntry, today,
};
pub use cfg::ContextLimits;
pub use correction::{LateFeeCorrection, ValueCorrection};
pub use error::ContextError;
pub use model::{Contract, Installment, InstallmentStatus, ServiceType};
pub use source::{ContractSource, InMemorySource, JsonFileSource};
