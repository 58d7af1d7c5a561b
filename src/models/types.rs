//! Type definitions for the txsentry risk taxonomy
//! All core data structures for pre-signature transaction analysis

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Severity classification for analysis results
///
/// Ordering is the load-bearing invariant of the whole engine: every
/// aggregation step reduces to "find the minimum-rank severity in a set".
/// `Error` and `Warn` share a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Risk detected - almost certain loss if signed
    Critical,
    /// Check could not complete
    Error,
    /// Issues found - review before signing
    Warn,
    /// Informational finding
    Info,
    /// Checks passed
    Ok,
}

impl Severity {
    /// Aggregation rank. Lower is more severe; `Error` and `Warn` tie.
    #[inline]
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Error | Severity::Warn => 1,
            Severity::Info => 2,
            Severity::Ok => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Error => "ERROR",
            Severity::Warn => "WARN",
            Severity::Info => "INFO",
            Severity::Ok => "OK",
        }
    }

    /// Fixed user-visible title for each severity
    pub fn title(&self) -> &'static str {
        match self {
            Severity::Critical => "Risk detected",
            Severity::Warn => "Issues found",
            Severity::Info => "Review details",
            Severity::Ok => "Checks passed",
            Severity::Error => "Checks unavailable",
        }
    }
}

/// What kind of check produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusGroup {
    /// Address-book membership of recipients
    AddressBook,
    /// On-chain activity level of recipients
    RecipientActivity,
    /// Prior interaction history with recipients
    RecipientInteraction,
    /// Token/recipient compatibility on the destination chain
    BridgeCompatibility,
    /// Contract source verification
    ContractVerification,
    /// Prior interaction history with contracts
    ContractInteraction,
    /// Delegatecall exposure
    DelegateCall,
    /// Trust status of the configured fallback handler
    FallbackHandler,
    /// Behavioral threat simulation
    Threat,
    /// Provider-defined custom checks
    CustomChecks,
    /// Shared bucket for "analysis failed" results
    Common,
}

impl StatusGroup {
    /// Whether this group admits the given result kind.
    /// The shared `Failed` kind is admitted by every group.
    pub fn admits(&self, kind: CheckKind) -> bool {
        kind == CheckKind::Failed || kind.group() == *self
    }
}

/// Closed set of result types, one sub-family per [`StatusGroup`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckKind {
    // Address book
    InAddressBook,
    NotInAddressBook,
    // Recipient activity
    RecipientActive,
    RecipientInactive,
    // Recipient interaction
    RecurringRecipient,
    FirstInteraction,
    // Bridge compatibility
    BridgeCompatible,
    BridgeIncompatible,
    BridgeUnknown,
    // Contract verification
    Verified,
    NotVerified,
    NotVerifiedBySafe,
    VerificationUnavailable,
    // Contract interaction
    KnownContract,
    NewContract,
    // Delegatecall
    TrustedDelegateCall,
    UnexpectedDelegateCall,
    // Fallback handler
    OfficialFallbackHandler,
    UnofficialFallbackHandler,
    // Threat
    MaliciousThreat,
    ModerateThreat,
    NoThreat,
    MastercopyChange,
    HypernativeGuard,
    // Custom checks
    CustomChecksPassed,
    CustomCheckFlagged,
    // Shared
    Failed,
}

impl CheckKind {
    /// The category this kind belongs to
    pub fn group(&self) -> StatusGroup {
        match self {
            CheckKind::InAddressBook | CheckKind::NotInAddressBook => StatusGroup::AddressBook,
            CheckKind::RecipientActive | CheckKind::RecipientInactive => {
                StatusGroup::RecipientActivity
            }
            CheckKind::RecurringRecipient | CheckKind::FirstInteraction => {
                StatusGroup::RecipientInteraction
            }
            CheckKind::BridgeCompatible
            | CheckKind::BridgeIncompatible
            | CheckKind::BridgeUnknown => StatusGroup::BridgeCompatibility,
            CheckKind::Verified
            | CheckKind::NotVerified
            | CheckKind::NotVerifiedBySafe
            | CheckKind::VerificationUnavailable => StatusGroup::ContractVerification,
            CheckKind::KnownContract | CheckKind::NewContract => StatusGroup::ContractInteraction,
            CheckKind::TrustedDelegateCall | CheckKind::UnexpectedDelegateCall => {
                StatusGroup::DelegateCall
            }
            CheckKind::OfficialFallbackHandler | CheckKind::UnofficialFallbackHandler => {
                StatusGroup::FallbackHandler
            }
            CheckKind::MaliciousThreat
            | CheckKind::ModerateThreat
            | CheckKind::NoThreat
            | CheckKind::MastercopyChange
            | CheckKind::HypernativeGuard => StatusGroup::Threat,
            CheckKind::CustomChecksPassed | CheckKind::CustomCheckFlagged => {
                StatusGroup::CustomChecks
            }
            CheckKind::Failed => StatusGroup::Common,
        }
    }
}

/// An address implicated by a result, with optional display metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedAddress {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl FlaggedAddress {
    pub fn bare(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            logo_url: None,
        }
    }
}

/// One concrete issue inside a malicious/moderate threat result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatIssue {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Type-specific extensions of [`CheckResult`], discriminated by shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckPayload {
    /// Mastercopy-change results carry the before/after implementation
    MastercopyChange { before: String, after: String },
    /// Malicious/moderate threat results carry per-severity issue lists
    ThreatIssues {
        issues: BTreeMap<Severity, Vec<ThreatIssue>>,
    },
}

/// One finding: severity, category-specific kind, display copy, and the
/// addresses it implicates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: CheckKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<FlaggedAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub payload: Option<CheckPayload>,
}

impl CheckResult {
    pub fn new(
        severity: Severity,
        kind: CheckKind,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            title: title.into(),
            description: description.into(),
            addresses: Vec::new(),
            error: None,
            payload: None,
        }
    }

    pub fn with_addresses(mut self, addresses: Vec<FlaggedAddress>) -> Self {
        self.addresses = addresses;
        self
    }
}

/// One entry of a grouped-results map. Upstream data is only loosely
/// shaped: a category slot may hold something other than a result list
/// (e.g. a request-id string in threat maps). Consumers skip `Other`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultsEntry {
    Results(Vec<CheckResult>),
    Other(serde_json::Value),
}

impl ResultsEntry {
    pub fn as_results(&self) -> Option<&[CheckResult]> {
        match self {
            ResultsEntry::Results(results) => Some(results),
            ResultsEntry::Other(_) => None,
        }
    }
}

/// Per-recipient analysis results, keyed by lowercase address
pub type AddressResults = HashMap<String, HashMap<StatusGroup, ResultsEntry>>;

/// Per-contract analysis results, with display metadata per address
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub results: HashMap<StatusGroup, ResultsEntry>,
}

pub type ContractResults = HashMap<String, ContractEntry>;

/// Threat-analysis results. Loosely keyed: values can be pre-merged
/// result lists or stray scalars such as a request-id string.
pub type ThreatResults = HashMap<String, ResultsEntry>;

/// The single verdict derived from everything the engine knows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverallStatus {
    pub severity: Severity,
    pub title: String,
}

/// The transaction shape submitted for threat analysis
///
/// `nonce` rotates on every edit elsewhere in the signing flow without
/// changing effective content, so content comparison excludes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeTxInput {
    pub safe_address: String,
    pub to: String,
    pub value: String,
    pub data: String,
    pub operation: u8,
    pub nonce: u64,
    #[serde(default)]
    pub safe_tx_gas: u64,
    #[serde(default)]
    pub base_gas: u64,
    #[serde(default)]
    pub gas_price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

impl SafeTxInput {
    /// Equality over everything except the rotating nonce
    pub fn same_content(&self, other: &Self) -> bool {
        self.safe_address == other.safe_address
            && self.to == other.to
            && self.value == other.value
            && self.data == other.data
            && self.operation == other.operation
            && self.safe_tx_gas == other.safe_tx_gas
            && self.base_gas == other.base_gas
            && self.gas_price == other.gas_price
            && self.gas_token == other.gas_token
            && self.refund_receiver == other.refund_receiver
            && self.origin == other.origin
    }
}
