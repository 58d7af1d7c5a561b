//! Result consolidation
//!
//! When N addresses each produced a result for the same category and
//! kind (e.g. 12 recipients are all known), the summary shows one
//! count-aware line instead of twelve. Addresses are re-attached to the
//! consolidated line so the caller can still render who matched.

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::status::select_primary;
use crate::models::types::{
    AddressResults, CheckKind, CheckResult, ContractResults, FlaggedAddress, ResultsEntry,
    StatusGroup,
};
use crate::utils::addresses::same_address;

/// Collapse an address-keyed result map into a compact summary list.
///
/// `known_addresses` supplies display names/logos to annotate matched
/// addresses with. The output keeps one result per category (the most
/// severe kind within it) and is severity-sorted.
pub fn consolidate(
    grouped: &AddressResults,
    known_addresses: &[FlaggedAddress],
) -> Vec<CheckResult> {
    let total = grouped.len();
    if total == 0 {
        return Vec::new();
    }

    // category -> kind -> [(primary result, owning address)]
    let mut buckets: BTreeMap<StatusGroup, BTreeMap<CheckKind, Vec<(&CheckResult, &str)>>> =
        BTreeMap::new();

    let mut addresses: Vec<&String> = grouped.keys().collect();
    addresses.sort();

    for address in addresses {
        let groups = &grouped[address];
        let mut group_keys: Vec<&StatusGroup> = groups.keys().collect();
        group_keys.sort();

        for group in group_keys {
            match groups[group].as_results() {
                Some(results) => {
                    if let Some(primary) = select_primary(results) {
                        buckets
                            .entry(*group)
                            .or_default()
                            .entry(primary.kind)
                            .or_default()
                            .push((primary, address.as_str()));
                    }
                }
                None => debug!(
                    "Skipping non-result entry for {} in group {:?}",
                    address, group
                ),
            }
        }
    }

    let mut consolidated: Vec<CheckResult> = Vec::new();

    for (group, kinds) in &buckets {
        let mut candidates: Vec<CheckResult> = Vec::new();

        for (kind, members) in kinds {
            let (first, _) = members[0];
            let description = consolidated_description(*group, *kind, members.len(), total);

            // Fallback-handler results flag the handler address itself,
            // not the contract that owns it.
            let result_addresses: Vec<FlaggedAddress> = if *group == StatusGroup::FallbackHandler {
                members
                    .iter()
                    .flat_map(|(result, _)| result.addresses.iter().cloned())
                    .collect()
            } else {
                members
                    .iter()
                    .map(|(_, address)| annotate(address, known_addresses))
                    .collect()
            };

            candidates.push(CheckResult {
                severity: first.severity,
                kind: *kind,
                title: first.title.clone(),
                description,
                addresses: result_addresses,
                error: None,
                payload: first.payload.clone(),
            });
        }

        // Keep only the most severe kind per category.
        if let Some(primary) = select_primary(&candidates) {
            consolidated.push(primary.clone());
        }
    }

    consolidated.sort_by_key(|result| result.severity.rank());
    consolidated
}

/// Consolidate contract results, deriving address annotations from the
/// per-contract display metadata.
pub fn consolidate_contracts(contracts: &ContractResults) -> Vec<CheckResult> {
    let known: Vec<FlaggedAddress> = contracts
        .iter()
        .map(|(address, entry)| FlaggedAddress {
            address: address.clone(),
            name: entry.name.clone(),
            logo_url: entry.logo_url.clone(),
        })
        .collect();

    let grouped: AddressResults = contracts
        .iter()
        .map(|(address, entry)| (address.clone(), entry.results.clone()))
        .collect();

    consolidate(&grouped, &known)
}

fn annotate(address: &str, known_addresses: &[FlaggedAddress]) -> FlaggedAddress {
    match known_addresses
        .iter()
        .find(|known| same_address(&known.address, address))
    {
        Some(known) => FlaggedAddress {
            address: address.to_string(),
            name: known.name.clone(),
            logo_url: known.logo_url.clone(),
        },
        None => FlaggedAddress::bare(address),
    }
}

/// Count-aware description for a consolidated result.
/// "All N match" phrasing is distinct from "K of N match".
fn consolidated_description(
    group: StatusGroup,
    kind: CheckKind,
    matched: usize,
    total: usize,
) -> String {
    let noun = match group {
        StatusGroup::AddressBook
        | StatusGroup::RecipientActivity
        | StatusGroup::RecipientInteraction
        | StatusGroup::BridgeCompatibility => "recipient",
        StatusGroup::ContractVerification
        | StatusGroup::ContractInteraction
        | StatusGroup::DelegateCall
        | StatusGroup::FallbackHandler => "contract",
        StatusGroup::Threat | StatusGroup::CustomChecks | StatusGroup::Common => "address",
    };

    let predicate = match kind {
        CheckKind::InAddressBook => "in your address book",
        CheckKind::NotInAddressBook => "not in your address book",
        CheckKind::RecipientActive => "active on this chain",
        CheckKind::RecipientInactive => "new addresses without prior activity",
        CheckKind::RecurringRecipient => "known from previous transactions",
        CheckKind::FirstInteraction => "being interacted with for the first time",
        CheckKind::BridgeCompatible => "compatible with the selected bridge",
        CheckKind::BridgeIncompatible => "not compatible with the selected bridge",
        CheckKind::BridgeUnknown => "of unknown bridge compatibility",
        CheckKind::Verified => "verified",
        CheckKind::NotVerified => "not verified",
        CheckKind::NotVerifiedBySafe => "not verified by trusted verifiers",
        CheckKind::VerificationUnavailable => "missing source verification",
        CheckKind::KnownContract => "known from previous transactions",
        CheckKind::NewContract => "being interacted with for the first time",
        CheckKind::TrustedDelegateCall => "using a trusted delegatecall target",
        CheckKind::UnexpectedDelegateCall => "using an unexpected delegatecall target",
        CheckKind::OfficialFallbackHandler => "using an official fallback handler",
        CheckKind::UnofficialFallbackHandler => "using an unofficial fallback handler",
        CheckKind::MaliciousThreat => "flagged as malicious",
        CheckKind::ModerateThreat => "flagged as suspicious",
        CheckKind::NoThreat => "free of detected threats",
        CheckKind::MastercopyChange => "changing their mastercopy",
        CheckKind::HypernativeGuard => "flagged by the transaction guard",
        CheckKind::CustomChecksPassed => "passing all custom checks",
        CheckKind::CustomCheckFlagged => "flagged by custom checks",
        CheckKind::Failed => "missing analysis results",
    };

    if matched == total {
        if total == 1 {
            format!("The {} is {}.", noun, predicate)
        } else {
            format!("All {} {}s are {}.", total, noun, predicate)
        }
    } else {
        format!("{} of {} {}s are {}.", matched, total, noun, predicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::Severity;
    use std::collections::HashMap;

    fn entry(results: Vec<CheckResult>) -> ResultsEntry {
        ResultsEntry::Results(results)
    }

    fn result(severity: Severity, kind: CheckKind) -> CheckResult {
        CheckResult::new(severity, kind, severity.title(), "")
    }

    fn grouped_from(entries: Vec<(&str, StatusGroup, Vec<CheckResult>)>) -> AddressResults {
        let mut map: AddressResults = HashMap::new();
        for (address, group, results) in entries {
            map.entry(address.to_string())
                .or_default()
                .insert(group, entry(results));
        }
        map
    }

    #[test]
    fn test_empty_map_yields_empty_list() {
        assert!(consolidate(&HashMap::new(), &[]).is_empty());
    }

    #[test]
    fn test_all_match_phrasing() {
        let grouped = grouped_from(vec![
            (
                "0xaaa",
                StatusGroup::AddressBook,
                vec![result(Severity::Ok, CheckKind::InAddressBook)],
            ),
            (
                "0xbbb",
                StatusGroup::AddressBook,
                vec![result(Severity::Ok, CheckKind::InAddressBook)],
            ),
        ]);

        let consolidated = consolidate(&grouped, &[]);
        assert_eq!(consolidated.len(), 1);
        assert_eq!(
            consolidated[0].description,
            "All 2 recipients are in your address book."
        );
        assert_eq!(consolidated[0].addresses.len(), 2);
    }

    #[test]
    fn test_partial_match_phrasing_embeds_counts() {
        let grouped = grouped_from(vec![
            (
                "0xaaa",
                StatusGroup::AddressBook,
                vec![result(Severity::Ok, CheckKind::InAddressBook)],
            ),
            (
                "0xbbb",
                StatusGroup::AddressBook,
                vec![result(Severity::Info, CheckKind::NotInAddressBook)],
            ),
            (
                "0xccc",
                StatusGroup::AddressBook,
                vec![result(Severity::Info, CheckKind::NotInAddressBook)],
            ),
        ]);

        let consolidated = consolidate(&grouped, &[]);
        // Only the most severe kind per category survives: NOT_IN_ADDRESS_BOOK.
        assert_eq!(consolidated.len(), 1);
        assert_eq!(consolidated[0].kind, CheckKind::NotInAddressBook);
        assert_eq!(
            consolidated[0].description,
            "2 of 3 recipients are not in your address book."
        );
    }

    #[test]
    fn test_single_address_phrasing() {
        let grouped = grouped_from(vec![(
            "0xaaa",
            StatusGroup::ContractVerification,
            vec![result(Severity::Ok, CheckKind::Verified)],
        )]);

        let consolidated = consolidate(&grouped, &[]);
        assert_eq!(consolidated[0].description, "The contract is verified.");
    }

    #[test]
    fn test_fallback_handler_uses_flagged_addresses() {
        let mut flagged = result(Severity::Warn, CheckKind::UnofficialFallbackHandler);
        flagged.addresses = vec![FlaggedAddress::bare("0xhandler")];

        let grouped = grouped_from(vec![("0xcontract", StatusGroup::FallbackHandler, vec![flagged])]);

        let consolidated = consolidate(&grouped, &[]);
        assert_eq!(consolidated.len(), 1);
        // The handler address, never the owning contract address.
        assert_eq!(consolidated[0].addresses.len(), 1);
        assert_eq!(consolidated[0].addresses[0].address, "0xhandler");
    }

    #[test]
    fn test_annotates_known_addresses() {
        let grouped = grouped_from(vec![(
            "0xaaa",
            StatusGroup::AddressBook,
            vec![result(Severity::Ok, CheckKind::InAddressBook)],
        )]);
        let known = vec![FlaggedAddress {
            address: "0xAAA".to_string(),
            name: Some("Treasury".to_string()),
            logo_url: None,
        }];

        let consolidated = consolidate(&grouped, &known);
        assert_eq!(consolidated[0].addresses[0].name.as_deref(), Some("Treasury"));
    }

    #[test]
    fn test_final_list_is_severity_sorted() {
        let grouped = grouped_from(vec![
            (
                "0xaaa",
                StatusGroup::AddressBook,
                vec![result(Severity::Ok, CheckKind::InAddressBook)],
            ),
            (
                "0xaaa",
                StatusGroup::DelegateCall,
                vec![result(Severity::Critical, CheckKind::UnexpectedDelegateCall)],
            ),
            (
                "0xaaa",
                StatusGroup::ContractVerification,
                vec![result(Severity::Warn, CheckKind::NotVerified)],
            ),
        ]);

        let consolidated = consolidate(&grouped, &[]);
        assert_eq!(consolidated.len(), 3);
        assert_eq!(consolidated[0].severity, Severity::Critical);
        assert_eq!(consolidated[1].severity, Severity::Warn);
        assert_eq!(consolidated[2].severity, Severity::Ok);
    }

    #[test]
    fn test_non_array_entries_are_skipped() {
        let mut groups = HashMap::new();
        groups.insert(
            StatusGroup::Threat,
            ResultsEntry::Other(serde_json::json!({"requestId": "req-1"})),
        );
        let mut grouped: AddressResults = HashMap::new();
        grouped.insert("0xaaa".to_string(), groups);

        assert!(consolidate(&grouped, &[]).is_empty());
    }

    #[test]
    fn test_consolidate_contracts_carries_display_metadata() {
        let mut contracts: ContractResults = HashMap::new();
        contracts.insert(
            "0xpool".to_string(),
            crate::models::types::ContractEntry {
                name: Some("Lending Pool".to_string()),
                logo_url: None,
                results: {
                    let mut groups = HashMap::new();
                    groups.insert(
                        StatusGroup::ContractVerification,
                        entry(vec![result(Severity::Ok, CheckKind::Verified)]),
                    );
                    groups
                },
            },
        );

        let consolidated = consolidate_contracts(&contracts);
        assert_eq!(consolidated.len(), 1);
        assert_eq!(
            consolidated[0].addresses[0].name.as_deref(),
            Some("Lending Pool")
        );
    }
}
