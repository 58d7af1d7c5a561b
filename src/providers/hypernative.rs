//! Hypernative Guard API Client
//!
//! Third-party guard provider consumed over HTTPS:
//! 1. Transaction assessment - behavioral threat simulation of a single
//!    proposed transaction
//! 2. Batch assessment - lookup of stored assessments by safe-tx hash
//!
//! Responses arrive in the provider's own vocabulary (accept/warn/deny
//! severities, free-text risk titles, balance-delta records); mapping
//! into the engine taxonomy lives in `core::normalize`, never here.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SentinelConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::SafeTxInput;

// ============================================
// WIRE TYPES
// ============================================

/// Severity vocabulary of the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderSeverity {
    Accept,
    Warn,
    Deny,
    #[serde(other)]
    Unknown,
}

/// One risk inside a finding group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Risk {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub details: String,
    pub severity: ProviderSeverity,
    #[serde(default)]
    pub safe_check_id: Option<String>,
}

/// A finding group: threat analysis or custom checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub status: String,
    pub severity: ProviderSeverity,
    #[serde(default)]
    pub risks: Vec<Risk>,
}

/// The two independent finding groups of an assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Findings {
    #[serde(rename = "THREAT_ANALYSIS")]
    pub threat_analysis: Finding,
    #[serde(rename = "CUSTOM_CHECKS")]
    pub custom_checks: Finding,
}

/// One balance movement reported for an account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceChangeRecord {
    /// Token contract; absent for the native asset
    #[serde(default)]
    pub asset_address: Option<String>,
    /// "receive" or "send"
    pub direction: String,
    /// Raw amount as a decimal string
    pub raw_amount: String,
}

/// Assessment payload of a success envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentData {
    pub assessment_id: String,
    pub assessment_timestamp: DateTime<Utc>,
    pub recommendation: ProviderSeverity,
    #[serde(default)]
    pub interpretation: Option<String>,
    pub findings: Findings,
    #[serde(default)]
    pub balance_changes: Option<HashMap<String, Vec<BalanceChangeRecord>>>,
}

/// Success envelope for a single assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResponse {
    pub safe_tx_hash: String,
    pub status: String,
    pub assessment_data: AssessmentData,
}

/// Failure envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureResponse {
    pub error: String,
    pub error_code: i64,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Either envelope the single-assessment endpoint can return
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderResponse {
    Success(Box<AssessmentResponse>),
    Failure(FailureResponse),
}

/// Batch lookup request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub safe_tx_hashes: Vec<String>,
}

/// Per-item status in a batch response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchItemStatus {
    Ok,
    NotFound,
}

/// One item of a batch response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    pub safe_tx_hash: String,
    pub status: BatchItemStatus,
    #[serde(default)]
    pub assessment_data: Option<AssessmentData>,
}

/// Batch-level error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    pub reason: String,
    pub message: String,
}

/// Batch-level failure envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub status: String,
    pub error: BatchError,
}

/// Either shape the batch endpoint can return
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BatchResponse {
    Items(Vec<BatchItem>),
    Failure(BatchFailure),
}

// ============================================
// PROVIDER SEAM
// ============================================

/// Seam between the orchestrators and the remote guard provider, so the
/// orchestration rules are testable without network access
pub trait AssessProvider {
    fn has_credentials(&self) -> bool;

    fn assess_transaction(
        &self,
        tx: &SafeTxInput,
    ) -> impl std::future::Future<Output = AppResult<ProviderResponse>> + Send;

    fn assess_batch(
        &self,
        hashes: &[String],
    ) -> impl std::future::Future<Output = AppResult<BatchResponse>> + Send;
}

// ============================================
// HTTP CLIENT
// ============================================

/// Hypernative HTTP client
pub struct HypernativeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HypernativeClient {
    pub fn new(config: &SentinelConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: config.provider_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> AppResult<T> {
        let token = self.api_key.as_ref().ok_or_else(AppError::missing_api_key)?;
        let request_id = Uuid::new_v4();
        let url = format!("{}{}", self.base_url, path);

        debug!("🛰️ Hypernative POST {} (request {})", url, request_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("x-request-id", request_id.to_string())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            warn!("Hypernative rate limited (request {})", request_id);
            return Err(AppError::provider_rate_limited());
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(
                "Hypernative response did not parse (request {}, status {}): {}",
                request_id, status, e
            );
            AppError::provider_invalid_response(format!("status {}: {}", status, e))
        })
    }
}

impl AssessProvider for HypernativeClient {
    fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Submit a proposed transaction for assessment
    async fn assess_transaction(&self, tx: &SafeTxInput) -> AppResult<ProviderResponse> {
        self.post_json("/assessments", tx).await
    }

    /// Look up stored assessments for a set of safe-tx hashes
    async fn assess_batch(&self, hashes: &[String]) -> AppResult<BatchResponse> {
        let request = BatchRequest {
            safe_tx_hashes: hashes.to_vec(),
        };
        self.post_json("/assessments/batch", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_envelope_parses() {
        let json = r#"{"error":"simulation timed out","errorCode":504,"success":false,"data":null}"#;
        let response: ProviderResponse = serde_json::from_str(json).unwrap();
        match response {
            ProviderResponse::Failure(failure) => {
                assert_eq!(failure.error, "simulation timed out");
                assert_eq!(failure.error_code, 504);
            }
            ProviderResponse::Success(_) => panic!("expected failure envelope"),
        }
    }

    #[test]
    fn test_success_envelope_parses() {
        let json = r#"{
            "safeTxHash": "0xabc",
            "status": "OK",
            "assessmentData": {
                "assessmentId": "a-1",
                "assessmentTimestamp": "2024-05-01T12:00:00Z",
                "recommendation": "warn",
                "interpretation": "review advised",
                "findings": {
                    "THREAT_ANALYSIS": {"status": "DONE", "severity": "warn", "risks": [
                        {"title": "Unusual approval", "details": "", "severity": "warn", "safeCheckId": "approval_unlimited"}
                    ]},
                    "CUSTOM_CHECKS": {"status": "DONE", "severity": "accept", "risks": []}
                }
            }
        }"#;
        let response: ProviderResponse = serde_json::from_str(json).unwrap();
        match response {
            ProviderResponse::Success(success) => {
                assert_eq!(success.assessment_data.recommendation, ProviderSeverity::Warn);
                assert_eq!(success.assessment_data.findings.threat_analysis.risks.len(), 1);
            }
            ProviderResponse::Failure(_) => panic!("expected success envelope"),
        }
    }

    #[test]
    fn test_unknown_provider_severity() {
        let risk: Risk =
            serde_json::from_str(r#"{"title":"x","details":"","severity":"block"}"#).unwrap();
        assert_eq!(risk.severity, ProviderSeverity::Unknown);
    }

    #[test]
    fn test_batch_failure_parses() {
        let json = r#"{"status":"FAILED","error":{"reason":"UPSTREAM","message":"provider down"}}"#;
        let response: BatchResponse = serde_json::from_str(json).unwrap();
        match response {
            BatchResponse::Failure(failure) => assert_eq!(failure.error.reason, "UPSTREAM"),
            BatchResponse::Items(_) => panic!("expected batch failure"),
        }
    }
}
