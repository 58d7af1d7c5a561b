//! Async assessment orchestration
//!
//! Two monitors own the request lifecycle against the guard provider:
//! [`ThreatMonitor`] tracks one proposed transaction, [`BatchMonitor`]
//! tracks a set of stored assessments looked up by safe-tx hash. Each
//! instance owns its state exclusively; batch state never consults
//! single-item history.
//!
//! Lifecycle rules enforced here:
//! - a nonce-only change of the tracked transaction never re-fires
//! - the skip flag forces the result to None and masks late responses
//! - a missing credential fails immediately, no request is sent
//! - responses from a superseded request generation are discarded
//! - batch lookups re-fire only when the hash SET differs

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::core::normalize::{
    normalize_assessment_data, normalize_provider_response, NormalizedAssessment,
};
use crate::models::errors::AppError;
use crate::models::types::{CheckKind, CheckResult, SafeTxInput, Severity};
use crate::providers::hypernative::{AssessProvider, BatchItemStatus, BatchResponse};
use crate::utils::addresses::{is_valid_safe_tx_hash, normalize_address};
use crate::utils::cache::AssessmentCache;

/// The three-field contract every consumer reads. A settled state
/// usually carries `result` or `error`, not both; a provider failure on
/// the single-transaction path carries both, the error alongside its
/// taxonomy rendering
#[derive(Debug, Clone, Default)]
pub struct AnalysisState<T> {
    pub result: Option<T>,
    pub error: Option<AppError>,
    pub loading: bool,
}

impl<T> AnalysisState<T> {
    pub fn idle() -> Self {
        Self {
            result: None,
            error: None,
            loading: false,
        }
    }

    pub fn pending() -> Self {
        Self {
            result: None,
            error: None,
            loading: true,
        }
    }

    pub fn ready(result: T) -> Self {
        Self {
            result: Some(result),
            error: None,
            loading: false,
        }
    }

    pub fn failed(error: AppError) -> Self {
        Self {
            result: None,
            error: Some(error),
            loading: false,
        }
    }
}

/// A request failure rendered as a taxonomy result, so consumers never
/// handle provider or transport error shapes directly
fn failure_assessment(error: &AppError) -> NormalizedAssessment {
    NormalizedAssessment {
        assessment_id: None,
        threat_results: vec![CheckResult::new(
            Severity::Error,
            CheckKind::Failed,
            "Threat analysis failed",
            error.message.clone(),
        )],
        custom_check_results: Vec::new(),
        balance_changes: HashMap::new(),
    }
}

// ============================================
// SINGLE-TRANSACTION MONITOR
// ============================================

struct ThreatInner {
    generation: u64,
    last_input: Option<SafeTxInput>,
    skipped: bool,
    state: AnalysisState<NormalizedAssessment>,
}

/// Tracks the assessment of one proposed transaction across edits
pub struct ThreatMonitor<C> {
    provider: C,
    inner: RwLock<ThreatInner>,
}

impl<C: AssessProvider> ThreatMonitor<C> {
    pub fn new(provider: C) -> Self {
        Self {
            provider,
            inner: RwLock::new(ThreatInner {
                generation: 0,
                last_input: None,
                skipped: false,
                state: AnalysisState::idle(),
            }),
        }
    }

    /// Current state snapshot
    pub async fn state(&self) -> AnalysisState<NormalizedAssessment> {
        self.inner.read().await.state.clone()
    }

    /// Feed the monitor the latest transaction draft.
    ///
    /// Fires a provider request only when the effective content changed;
    /// a nonce-only edit keeps the previous assessment. With `skip` set
    /// the result is forced to None and any in-flight response is masked
    /// when it lands.
    pub async fn refresh(
        &self,
        input: SafeTxInput,
        skip: bool,
    ) -> AnalysisState<NormalizedAssessment> {
        let generation;
        {
            let mut inner = self.inner.write().await;

            if skip {
                debug!("⏭️ Threat analysis skipped for {}", input.safe_address);
                inner.skipped = true;
                inner.generation += 1; // masks any in-flight response
                inner.last_input = Some(input);
                inner.state = AnalysisState::idle();
                return inner.state.clone();
            }

            let resumed = inner.skipped;
            inner.skipped = false;

            if !self.provider.has_credentials() {
                inner.generation += 1;
                inner.last_input = Some(input);
                inner.state = AnalysisState::failed(AppError::missing_api_key());
                return inner.state.clone();
            }

            let settled = !inner.state.loading
                && (inner.state.result.is_some() || inner.state.error.is_some());
            if !resumed && settled {
                if let Some(last) = &inner.last_input {
                    if last.same_content(&input) {
                        debug!("🔁 Nonce-only change, keeping previous assessment");
                        inner.last_input = Some(input);
                        return inner.state.clone();
                    }
                }
            }

            inner.generation += 1;
            generation = inner.generation;
            inner.last_input = Some(input.clone());
            inner.state.loading = true;
            inner.state.error = None;
        }

        let outcome = self.provider.assess_transaction(&input).await;

        let mut inner = self.inner.write().await;
        if inner.generation != generation || inner.skipped {
            debug!("🗑️ Discarding superseded assessment response");
            return inner.state.clone();
        }

        inner.state = match outcome {
            Ok(response) => AnalysisState::ready(normalize_provider_response(
                &response,
                &input.safe_address,
            )),
            Err(error) => {
                warn!("❌ Threat assessment failed [{}]: {}", error.code_str(), error);
                AnalysisState {
                    result: Some(failure_assessment(&error)),
                    error: Some(error),
                    loading: false,
                }
            }
        };
        inner.state.clone()
    }
}

// ============================================
// BATCH MONITOR
// ============================================

struct BatchInner {
    generation: u64,
    last_hashes: HashSet<String>,
    skipped: bool,
    states: HashMap<String, AnalysisState<NormalizedAssessment>>,
}

/// Looks up stored assessments for a set of safe-tx hashes
pub struct BatchMonitor<C> {
    provider: C,
    cache: AssessmentCache,
    inner: RwLock<BatchInner>,
}

impl<C: AssessProvider> BatchMonitor<C> {
    pub fn new(provider: C) -> Self {
        Self::with_cache(provider, AssessmentCache::new())
    }

    /// Cache TTL taken from the engine configuration
    pub fn from_config(provider: C, config: &crate::config::SentinelConfig) -> Self {
        Self::with_cache(provider, AssessmentCache::with_ttl(config.cache_ttl_secs))
    }

    pub fn with_cache(provider: C, cache: AssessmentCache) -> Self {
        Self {
            provider,
            cache,
            inner: RwLock::new(BatchInner {
                generation: 0,
                last_hashes: HashSet::new(),
                skipped: false,
                states: HashMap::new(),
            }),
        }
    }

    pub fn cache(&self) -> &AssessmentCache {
        &self.cache
    }

    /// Per-item state snapshot for one requested hash
    pub async fn state_for(&self, hash: &str) -> Option<AnalysisState<NormalizedAssessment>> {
        self.inner
            .read()
            .await
            .states
            .get(&normalize_address(hash))
            .cloned()
    }

    /// Feed the monitor the latest hash set.
    ///
    /// Malformed hashes get a per-item precondition error and are never
    /// sent. The provider is only contacted when the valid hash set
    /// differs from the previous one (order-insensitive) and at least one
    /// member is missing from the cache. Every item settles
    /// independently; a batch-level failure fans out to all of them.
    /// With `skip` set every per-item state is forced to empty, no
    /// request goes out, and any in-flight batch response is masked when
    /// it lands.
    pub async fn refresh(
        &self,
        hashes: &[String],
        skip: bool,
    ) -> HashMap<String, AnalysisState<NormalizedAssessment>> {
        let mut requested: Vec<String> = Vec::new();
        let mut valid: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for hash in hashes {
            let key = normalize_address(hash);
            if !seen.insert(key.clone()) {
                continue;
            }
            if is_valid_safe_tx_hash(&key) {
                valid.push(key.clone());
            } else {
                warn!("⚠️ Dropping malformed safe-tx hash: {}", hash);
            }
            requested.push(key);
        }
        let valid_set: HashSet<String> = valid.iter().cloned().collect();

        let generation;
        let mut pending: Vec<String> = Vec::new();
        {
            let mut inner = self.inner.write().await;

            if skip {
                debug!("⏭️ Batch assessment skipped ({} hashes)", requested.len());
                inner.skipped = true;
                inner.generation += 1; // masks any in-flight batch response
                inner.last_hashes = valid_set;
                for key in &requested {
                    inner.states.insert(key.clone(), AnalysisState::idle());
                }
                return Self::snapshot(&inner.states, &requested);
            }
            let resumed = inner.skipped;
            inner.skipped = false;

            for key in &requested {
                if !valid_set.contains(key) {
                    inner
                        .states
                        .insert(key.clone(), AnalysisState::failed(AppError::invalid_hash(key)));
                }
            }

            if !resumed && valid_set == inner.last_hashes {
                debug!("🔁 Hash set unchanged ({} entries), not re-fetching", valid_set.len());
                return Self::snapshot(&inner.states, &requested);
            }
            inner.last_hashes = valid_set;

            for key in &valid {
                match self.cache.get(key) {
                    Some(hit) => {
                        inner.states.insert(key.clone(), AnalysisState::ready(hit));
                    }
                    None => pending.push(key.clone()),
                }
            }

            if pending.is_empty() {
                return Self::snapshot(&inner.states, &requested);
            }

            if !self.provider.has_credentials() {
                for key in &pending {
                    inner
                        .states
                        .insert(key.clone(), AnalysisState::failed(AppError::missing_api_key()));
                }
                return Self::snapshot(&inner.states, &requested);
            }

            inner.generation += 1;
            generation = inner.generation;
            for key in &pending {
                inner.states.insert(key.clone(), AnalysisState::pending());
            }
        }

        debug!("🛰️ Fetching {} stored assessments", pending.len());
        let outcome = self.provider.assess_batch(&pending).await;

        let mut inner = self.inner.write().await;
        if inner.generation != generation || inner.skipped {
            debug!("🗑️ Discarding superseded batch response");
            return Self::snapshot(&inner.states, &requested);
        }

        match outcome {
            Ok(BatchResponse::Items(items)) => {
                let mut by_hash = HashMap::new();
                for item in items {
                    by_hash.insert(normalize_address(&item.safe_tx_hash), item);
                }
                for key in &pending {
                    let state = match by_hash.get(key) {
                        Some(item) if item.status == BatchItemStatus::Ok => {
                            match &item.assessment_data {
                                Some(data) => {
                                    let normalized = normalize_assessment_data(data, key);
                                    self.cache.set(key, normalized.clone());
                                    AnalysisState::ready(normalized)
                                }
                                None => AnalysisState::failed(AppError::hash_not_found(key)),
                            }
                        }
                        _ => AnalysisState::failed(AppError::hash_not_found(key)),
                    };
                    inner.states.insert(key.clone(), state);
                }
            }
            Ok(BatchResponse::Failure(failure)) => {
                warn!(
                    "❌ Batch assessment failed: {} ({})",
                    failure.error.message, failure.error.reason
                );
                for key in &pending {
                    inner.states.insert(
                        key.clone(),
                        AnalysisState::failed(AppError::batch_failed(
                            failure.error.reason.clone(),
                            failure.error.message.clone(),
                        )),
                    );
                }
            }
            Err(error) => {
                warn!("❌ Batch request failed [{}]: {}", error.code_str(), error);
                for key in &pending {
                    inner
                        .states
                        .insert(key.clone(), AnalysisState::failed(error.clone()));
                }
            }
        }

        Self::snapshot(&inner.states, &requested)
    }

    fn snapshot(
        states: &HashMap<String, AnalysisState<NormalizedAssessment>>,
        requested: &[String],
    ) -> HashMap<String, AnalysisState<NormalizedAssessment>> {
        requested
            .iter()
            .filter_map(|key| states.get(key).map(|state| (key.clone(), state.clone())))
            .collect()
    }
}
