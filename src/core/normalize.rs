//! Guard-provider response normalization
//!
//! Maps the Hypernative response vocabulary (accept/warn/deny, free-text
//! risk titles, per-account balance-delta records) into the engine's own
//! taxonomy so nothing downstream ever handles provider-specific shapes.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::models::types::{CheckKind, CheckResult, ResultsEntry, Severity, ThreatResults};
use crate::providers::hypernative::{
    AssessmentData, BalanceChangeRecord, Finding, ProviderResponse, ProviderSeverity, Risk,
};
use crate::utils::addresses::normalize_address;

/// Constant advisory sentence appended to every mapped risk description
pub const ADVISORY_SUFFIX: &str = "Review the transaction carefully before signing.";

/// Which finding group a set of risks came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingGroup {
    ThreatAnalysis,
    CustomChecks,
}

/// Raw amounts flowing in and out for one asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetFlow {
    #[serde(rename = "in")]
    pub incoming: Vec<String>,
    #[serde(rename = "out")]
    pub outgoing: Vec<String>,
}

impl AssetFlow {
    fn is_empty(&self) -> bool {
        self.incoming.is_empty() && self.outgoing.is_empty()
    }
}

/// Balance deltas of one account, grouped by asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccountDeltas {
    /// Token flows keyed by lowercase token address
    pub tokens: HashMap<String, AssetFlow>,
    /// Native-asset flow, tracked separately (it has no address)
    pub native: Option<AssetFlow>,
}

/// A provider assessment translated into the engine taxonomy
#[derive(Debug, Clone, Default)]
pub struct NormalizedAssessment {
    /// Provider-side assessment id, when the assessment succeeded
    pub assessment_id: Option<String>,
    /// Results mapped from the THREAT_ANALYSIS finding group
    pub threat_results: Vec<CheckResult>,
    /// Results mapped from the CUSTOM_CHECKS finding group
    pub custom_check_results: Vec<CheckResult>,
    /// Per-account balance deltas, keyed by lowercase account address
    pub balance_changes: HashMap<String, AccountDeltas>,
}

impl NormalizedAssessment {
    /// Deltas reported for one account, matched case-insensitively
    pub fn deltas_for(&self, address: &str) -> Option<&AccountDeltas> {
        self.balance_changes.get(&normalize_address(address))
    }

    /// Assemble the loosely-keyed threat-results map consumed by the
    /// overall-status computer: result lists under the safe address, the
    /// request id as a scalar sibling entry.
    pub fn to_threat_results(&self, safe_address: &str) -> ThreatResults {
        let mut map: ThreatResults = HashMap::new();
        let mut merged = self.threat_results.clone();
        merged.extend(self.custom_check_results.iter().cloned());
        map.insert(
            normalize_address(safe_address),
            ResultsEntry::Results(merged),
        );
        if let Some(id) = &self.assessment_id {
            map.insert(
                "requestId".to_string(),
                ResultsEntry::Other(serde_json::Value::String(id.clone())),
            );
        }
        map
    }
}

/// Translate a provider envelope into taxonomy results.
///
/// The failure envelope becomes a single CRITICAL result whose
/// description is the provider's error text verbatim - an empty string
/// is allowed there, not a bug.
pub fn normalize_provider_response(
    response: &ProviderResponse,
    safe_address: &str,
) -> NormalizedAssessment {
    match response {
        ProviderResponse::Failure(failure) => NormalizedAssessment {
            assessment_id: None,
            threat_results: vec![CheckResult::new(
                Severity::Critical,
                CheckKind::Failed,
                "Threat analysis failed",
                failure.error.clone(),
            )],
            custom_check_results: Vec::new(),
            balance_changes: HashMap::new(),
        },
        ProviderResponse::Success(success) => {
            normalize_assessment_data(&success.assessment_data, safe_address)
        }
    }
}

/// Translate a bare assessment payload, as returned per item by the
/// batch endpoint
pub fn normalize_assessment_data(data: &AssessmentData, safe_address: &str) -> NormalizedAssessment {
    NormalizedAssessment {
        assessment_id: Some(data.assessment_id.clone()),
        threat_results: normalize_finding(
            &data.findings.threat_analysis,
            FindingGroup::ThreatAnalysis,
        ),
        custom_check_results: normalize_finding(
            &data.findings.custom_checks,
            FindingGroup::CustomChecks,
        ),
        balance_changes: data
            .balance_changes
            .as_ref()
            .map(|changes| normalize_balance_changes(changes, safe_address))
            .unwrap_or_default(),
    }
}

/// Map one finding group into severity-sorted taxonomy results
pub fn normalize_finding(finding: &Finding, group: FindingGroup) -> Vec<CheckResult> {
    if finding.risks.is_empty() {
        let (kind, title) = match group {
            FindingGroup::ThreatAnalysis => (CheckKind::NoThreat, "No threat detected"),
            FindingGroup::CustomChecks => (CheckKind::CustomChecksPassed, "Custom checks passed"),
        };
        return vec![CheckResult::new(Severity::Ok, kind, title, "")];
    }

    let mut results: Vec<CheckResult> = finding.risks.iter().map(map_risk).collect();
    // Stable: ties keep provider order.
    results.sort_by_key(|result| result.severity.rank());
    results
}

fn map_risk(risk: &Risk) -> CheckResult {
    let severity = map_severity(risk.severity);
    let kind = map_check_id(risk.safe_check_id.as_deref());

    let title = match kind_title(kind) {
        Some(fixed) => fixed.to_string(),
        // No specific mapping: the generic guard kind gets its
        // severity-based title, anything else echoes the risk's own.
        None if kind == CheckKind::HypernativeGuard => guard_title(severity).to_string(),
        None => risk.title.clone(),
    };

    let base = kind_description(kind)
        .map(str::to_string)
        .or_else(|| non_empty(&risk.title))
        .or_else(|| non_empty(&risk.details));

    CheckResult::new(severity, kind, title, build_description(base.as_deref()))
}

/// Fixed provider-severity translation table; unmapped values are
/// informational, never dropped
pub fn map_severity(severity: ProviderSeverity) -> Severity {
    match severity {
        ProviderSeverity::Accept => Severity::Ok,
        ProviderSeverity::Warn => Severity::Warn,
        ProviderSeverity::Deny => Severity::Critical,
        ProviderSeverity::Unknown => Severity::Info,
    }
}

/// Map the provider's risk identifier onto a taxonomy kind.
///
/// Mastercopy identifiers are intentionally NOT mapped to
/// `MastercopyChange`: that kind requires before/after addresses the
/// provider does not supply, so they take the generic guard kind.
fn map_check_id(safe_check_id: Option<&str>) -> CheckKind {
    match safe_check_id {
        Some("recipient_first_interaction") => CheckKind::FirstInteraction,
        Some("contract_not_verified") => CheckKind::NotVerified,
        Some("delegatecall_untrusted_target") => CheckKind::UnexpectedDelegateCall,
        Some("fallback_handler_unofficial") => CheckKind::UnofficialFallbackHandler,
        Some("bridge_token_unsupported") => CheckKind::BridgeIncompatible,
        Some("custom_check_flagged") => CheckKind::CustomCheckFlagged,
        Some(other) => {
            debug!("Unmapped provider risk identifier: {}", other);
            CheckKind::HypernativeGuard
        }
        None => CheckKind::HypernativeGuard,
    }
}

/// Fixed titles for specifically-mapped kinds
fn kind_title(kind: CheckKind) -> Option<&'static str> {
    match kind {
        CheckKind::FirstInteraction => Some("First interaction with recipient"),
        CheckKind::NotVerified => Some("Unverified contract"),
        CheckKind::UnexpectedDelegateCall => Some("Unexpected delegatecall"),
        CheckKind::UnofficialFallbackHandler => Some("Unofficial fallback handler"),
        CheckKind::BridgeIncompatible => Some("Bridge compatibility issue"),
        CheckKind::CustomCheckFlagged => Some("Custom check flagged"),
        _ => None,
    }
}

/// Severity-based titles for the generic guard kind
fn guard_title(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "Malicious threat detected",
        Severity::Warn | Severity::Error => "Moderate threat detected",
        Severity::Info | Severity::Ok => "No threat detected",
    }
}

/// Fixed descriptions for kinds that have one
fn kind_description(kind: CheckKind) -> Option<&'static str> {
    match kind {
        CheckKind::UnexpectedDelegateCall => {
            Some("This transaction performs a delegatecall to a contract outside the trusted list")
        }
        CheckKind::NotVerified => Some("The source code of the target contract is not verified"),
        CheckKind::UnofficialFallbackHandler => {
            Some("The configured fallback handler is not one of the official handlers")
        }
        _ => None,
    }
}

/// Exactly one trailing period on the base text, then the constant
/// advisory sentence
fn build_description(base: Option<&str>) -> String {
    match base {
        Some(text) => {
            let trimmed = text.trim_end_matches('.');
            if trimmed.is_empty() {
                ADVISORY_SUFFIX.to_string()
            } else {
                format!("{}. {}", trimmed, ADVISORY_SUFFIX)
            }
        }
        None => ADVISORY_SUFFIX.to_string(),
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Group per-account balance records by asset.
///
/// Token keys are lowercased; the native asset (no address) is tracked
/// separately. Accounts left with zero deltas after grouping are omitted
/// entirely. `safe_address` is only used for logging which side the
/// caller is on; lookup stays case-insensitive via [`NormalizedAssessment::deltas_for`].
pub fn normalize_balance_changes(
    changes: &HashMap<String, Vec<BalanceChangeRecord>>,
    safe_address: &str,
) -> HashMap<String, AccountDeltas> {
    let mut normalized: HashMap<String, AccountDeltas> = HashMap::new();

    for (account, records) in changes {
        let mut deltas = AccountDeltas::default();

        for record in records {
            let flow = match record.asset_address.as_deref() {
                Some(token) => deltas
                    .tokens
                    .entry(normalize_address(token))
                    .or_default(),
                None => deltas.native.get_or_insert_with(AssetFlow::default),
            };
            match record.direction.as_str() {
                "receive" => flow.incoming.push(record.raw_amount.clone()),
                "send" => flow.outgoing.push(record.raw_amount.clone()),
                other => debug!("Skipping balance record with direction '{}'", other),
            }
        }

        deltas.tokens.retain(|_, flow| !flow.is_empty());
        if deltas.native.as_ref().is_some_and(AssetFlow::is_empty) {
            deltas.native = None;
        }

        if deltas.tokens.is_empty() && deltas.native.is_none() {
            continue;
        }

        let key = normalize_address(account);
        if key == normalize_address(safe_address) {
            debug!("Balance deltas reported for the caller's own safe");
        }
        normalized.insert(key, deltas);
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::hypernative::{
        AssessmentData, AssessmentResponse, FailureResponse, Findings,
    };
    use chrono::Utc;

    fn risk(severity: ProviderSeverity, check_id: Option<&str>) -> Risk {
        Risk {
            title: "Suspicious approval pattern".to_string(),
            details: "Approval granted to a newly deployed contract".to_string(),
            severity,
            safe_check_id: check_id.map(str::to_string),
        }
    }

    fn finding(risks: Vec<Risk>) -> Finding {
        Finding {
            status: "DONE".to_string(),
            severity: ProviderSeverity::Accept,
            risks,
        }
    }

    fn success_response(threat: Vec<Risk>, custom: Vec<Risk>) -> ProviderResponse {
        ProviderResponse::Success(Box::new(AssessmentResponse {
            safe_tx_hash: "0xhash".to_string(),
            status: "OK".to_string(),
            assessment_data: AssessmentData {
                assessment_id: "a-42".to_string(),
                assessment_timestamp: Utc::now(),
                recommendation: ProviderSeverity::Warn,
                interpretation: None,
                findings: Findings {
                    threat_analysis: finding(threat),
                    custom_checks: finding(custom),
                },
                balance_changes: None,
            },
        }))
    }

    #[test]
    fn test_severity_table() {
        assert_eq!(map_severity(ProviderSeverity::Accept), Severity::Ok);
        assert_eq!(map_severity(ProviderSeverity::Warn), Severity::Warn);
        assert_eq!(map_severity(ProviderSeverity::Deny), Severity::Critical);
        assert_eq!(map_severity(ProviderSeverity::Unknown), Severity::Info);
    }

    #[test]
    fn test_deny_unmapped_identifier_is_deterministic() {
        let result = map_risk(&risk(ProviderSeverity::Deny, Some("totally_novel_check")));
        assert_eq!(result.severity, Severity::Critical);
        assert_eq!(result.kind, CheckKind::HypernativeGuard);
        assert_eq!(result.title, "Malicious threat detected");
        // The risk's own copy is still echoed into the description.
        assert_eq!(
            result.description,
            format!("Suspicious approval pattern. {}", ADVISORY_SUFFIX)
        );
    }

    #[test]
    fn test_mastercopy_identifier_falls_back_to_guard_kind() {
        let result = map_risk(&risk(ProviderSeverity::Warn, Some("mastercopy_changed")));
        // Needs before/after addresses the provider cannot supply.
        assert_eq!(result.kind, CheckKind::HypernativeGuard);
        assert_eq!(result.title, "Moderate threat detected");
    }

    #[test]
    fn test_known_identifier_gets_fixed_title_and_description() {
        let result = map_risk(&risk(
            ProviderSeverity::Warn,
            Some("delegatecall_untrusted_target"),
        ));
        assert_eq!(result.kind, CheckKind::UnexpectedDelegateCall);
        assert_eq!(result.title, "Unexpected delegatecall");
        assert!(result
            .description
            .starts_with("This transaction performs a delegatecall"));
        assert!(result.description.ends_with(ADVISORY_SUFFIX));
    }

    #[test]
    fn test_description_has_single_trailing_period() {
        let mut trailing = risk(ProviderSeverity::Warn, None);
        trailing.title = "Already punctuated.".to_string();
        let result = map_risk(&trailing);
        assert_eq!(
            result.description,
            format!("Already punctuated. {}", ADVISORY_SUFFIX)
        );
        assert!(!result.description.contains(".."));
    }

    #[test]
    fn test_empty_risks_yield_group_specific_ok() {
        let threat = normalize_finding(&finding(vec![]), FindingGroup::ThreatAnalysis);
        assert_eq!(threat.len(), 1);
        assert_eq!(threat[0].severity, Severity::Ok);
        assert_eq!(threat[0].title, "No threat detected");

        let custom = normalize_finding(&finding(vec![]), FindingGroup::CustomChecks);
        assert_eq!(custom[0].title, "Custom checks passed");
        assert_eq!(custom[0].kind, CheckKind::CustomChecksPassed);
    }

    #[test]
    fn test_results_severity_sorted_stable() {
        let mut first_warn = risk(ProviderSeverity::Warn, None);
        first_warn.title = "warn-one".to_string();
        let mut second_warn = risk(ProviderSeverity::Warn, None);
        second_warn.title = "warn-two".to_string();
        let deny = risk(ProviderSeverity::Deny, None);

        let results = normalize_finding(
            &finding(vec![first_warn, second_warn, deny]),
            FindingGroup::ThreatAnalysis,
        );
        assert_eq!(results[0].severity, Severity::Critical);
        // Ties keep provider order.
        assert!(results[1].description.starts_with("warn-one"));
        assert!(results[2].description.starts_with("warn-two"));
    }

    #[test]
    fn test_failure_envelope_maps_to_single_critical() {
        let response = ProviderResponse::Failure(FailureResponse {
            error: "".to_string(),
            error_code: 500,
            success: false,
            data: None,
        });
        let normalized = normalize_provider_response(&response, "0xsafe");
        assert_eq!(normalized.threat_results.len(), 1);
        let failed = &normalized.threat_results[0];
        assert_eq!(failed.severity, Severity::Critical);
        assert_eq!(failed.kind, CheckKind::Failed);
        assert_eq!(failed.title, "Threat analysis failed");
        // Empty provider error text is allowed.
        assert_eq!(failed.description, "");
        assert!(normalized.custom_check_results.is_empty());
    }

    #[test]
    fn test_to_threat_results_includes_scalar_request_id() {
        let response = success_response(vec![], vec![]);
        let normalized = normalize_provider_response(&response, "0xSAFE");
        let map = normalized.to_threat_results("0xSAFE");

        assert!(map.get("0xsafe").and_then(|e| e.as_results()).is_some());
        assert!(map.get("requestId").unwrap().as_results().is_none());
    }

    #[test]
    fn test_balance_changes_grouping() {
        let mut changes: HashMap<String, Vec<BalanceChangeRecord>> = HashMap::new();
        changes.insert(
            "0xSAFE".to_string(),
            vec![
                BalanceChangeRecord {
                    asset_address: Some("0xTOKEN".to_string()),
                    direction: "receive".to_string(),
                    raw_amount: "100".to_string(),
                },
                BalanceChangeRecord {
                    asset_address: Some("0xtoken".to_string()),
                    direction: "send".to_string(),
                    raw_amount: "40".to_string(),
                },
                BalanceChangeRecord {
                    asset_address: None,
                    direction: "send".to_string(),
                    raw_amount: "7".to_string(),
                },
            ],
        );
        // An account whose records all have unusable directions drops out.
        changes.insert(
            "0xother".to_string(),
            vec![BalanceChangeRecord {
                asset_address: Some("0xtoken".to_string()),
                direction: "mint".to_string(),
                raw_amount: "1".to_string(),
            }],
        );

        let normalized = normalize_balance_changes(&changes, "0xsafe");
        assert_eq!(normalized.len(), 1);

        let deltas = &normalized["0xsafe"];
        let token_flow = &deltas.tokens["0xtoken"];
        assert_eq!(token_flow.incoming, vec!["100"]);
        assert_eq!(token_flow.outgoing, vec!["40"]);
        assert_eq!(deltas.native.as_ref().unwrap().outgoing, vec!["7"]);
    }

    #[test]
    fn test_deltas_lookup_is_case_insensitive() {
        let mut changes: HashMap<String, Vec<BalanceChangeRecord>> = HashMap::new();
        changes.insert(
            "0xAbCd".to_string(),
            vec![BalanceChangeRecord {
                asset_address: None,
                direction: "receive".to_string(),
                raw_amount: "1".to_string(),
            }],
        );
        let normalized = NormalizedAssessment {
            balance_changes: normalize_balance_changes(&changes, "0xabcd"),
            ..Default::default()
        };
        assert!(normalized.deltas_for("0xABCD").is_some());
    }
}
