//! Data models for txsentry

pub mod errors;
pub mod types;

pub use errors::{AppError, AppResult, ErrorCode};
pub use types::{
    AddressResults, CheckKind, CheckPayload, CheckResult, ContractEntry, ContractResults,
    FlaggedAddress, OverallStatus, ResultsEntry, SafeTxInput, Severity, StatusGroup, ThreatIssue,
    ThreatResults,
};
