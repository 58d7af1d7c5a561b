//! Core analysis engine

pub mod consolidate;
pub mod normalize;
pub mod orchestrator;
pub mod similarity;
pub mod status;

pub use consolidate::{consolidate, consolidate_contracts};
pub use normalize::{normalize_provider_response, NormalizedAssessment};
pub use orchestrator::{AnalysisState, BatchMonitor, ThreatMonitor};
pub use similarity::{detect, SimilarityGroup, SimilarityReport};
pub use status::{compute_overall_status, select_primary};
