//! TxSentry Library
//!
//! Pre-signature risk analysis engine for multi-signature wallet
//! transactions:
//! - Severity taxonomy and primary-result selection
//! - Overall-status reduction across recipient, contract, and threat results
//! - Per-group consolidation with count-aware descriptions
//! - Guard-provider (Hypernative) response normalization
//! - Async assessment orchestration for drafts and stored hashes
//! - Address-poisoning lookalike detection

pub mod config;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::consolidate::{consolidate, consolidate_contracts};
pub use crate::core::normalize::{normalize_provider_response, NormalizedAssessment};
pub use crate::core::orchestrator::{AnalysisState, BatchMonitor, ThreatMonitor};
pub use crate::core::similarity::{detect, SimilarityReport};
pub use crate::core::status::{compute_overall_status, select_primary};
pub use config::{SentinelConfig, SimilarityConfig};
pub use models::errors::{AppError, AppResult, ErrorCode};
pub use models::types::{
    CheckKind, CheckResult, OverallStatus, SafeTxInput, Severity, StatusGroup,
};
pub use providers::hypernative::{AssessProvider, HypernativeClient};
pub use utils::cache::{AssessmentCache, CacheStats};
