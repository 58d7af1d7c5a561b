//! Primary-result selection and overall-status computation
//!
//! Everything the engine knows about a transaction - recipient checks,
//! contract checks, threat simulation, plus the simulation-failed and
//! authentication-required side signals - reduces here to one
//! severity/title pair.

use std::collections::HashMap;

use tracing::debug;

use crate::models::types::{
    AddressResults, CheckResult, ContractResults, OverallStatus, ResultsEntry, Severity,
    StatusGroup, ThreatResults,
};

/// Pick the single most severe result out of an unordered collection.
///
/// Stable: ties on rank keep the first occurrence. Returns `None` for an
/// empty input.
pub fn select_primary<'a, I>(results: I) -> Option<&'a CheckResult>
where
    I: IntoIterator<Item = &'a CheckResult>,
{
    let mut primary: Option<&CheckResult> = None;
    for result in results {
        match primary {
            Some(current) if result.severity.rank() >= current.severity.rank() => {}
            _ => primary = Some(result),
        }
    }
    primary
}

/// Compute the single overall verdict for a transaction.
///
/// Returns `None` when there is nothing to report at all: no result maps
/// and neither side signal set.
pub fn compute_overall_status(
    recipient: Option<&AddressResults>,
    contract: Option<&ContractResults>,
    threat: Option<&ThreatResults>,
    has_simulation_error: bool,
    auth_required: bool,
) -> Option<OverallStatus> {
    if recipient.is_none()
        && contract.is_none()
        && threat.is_none()
        && !has_simulation_error
        && !auth_required
    {
        return None;
    }

    // Flattened findings carry their severity-table display title.
    let mut flattened: Vec<(Severity, String)> = Vec::new();

    if let Some(recipient) = recipient {
        let mut addresses: Vec<&String> = recipient.keys().collect();
        addresses.sort();
        for address in addresses {
            flatten_groups(&recipient[address], &mut flattened);
        }
    }

    if let Some(contract) = contract {
        let mut addresses: Vec<&String> = contract.keys().collect();
        addresses.sort();
        for address in addresses {
            flatten_groups(&contract[address].results, &mut flattened);
        }
    }

    if let Some(threat) = threat {
        let mut keys: Vec<&String> = threat.keys().collect();
        keys.sort();
        for key in keys {
            // Threat maps carry stray scalars (e.g. a request-id string)
            // next to result lists; only structurally matching entries count.
            match threat[key].as_results() {
                Some(results) => {
                    for result in results {
                        flattened.push((result.severity, result.severity.title().to_string()));
                    }
                }
                None => debug!("Skipping non-result threat entry under key {}", key),
            }
        }
    }

    if has_simulation_error {
        flattened.push((Severity::Warn, "Analysis unavailable".to_string()));
    }

    if auth_required {
        flattened.push((Severity::Info, "Authentication required".to_string()));
    }

    // Min-rank reduction, first occurrence wins ties.
    let mut verdict: Option<&(Severity, String)> = None;
    for entry in &flattened {
        match verdict {
            Some((severity, _)) if entry.0.rank() >= severity.rank() => {}
            _ => verdict = Some(entry),
        }
    }

    verdict.map(|(severity, title)| OverallStatus {
        severity: *severity,
        title: if title.is_empty() {
            severity.title().to_string()
        } else {
            title.clone()
        },
    })
}

/// Collect every array-valued category entry; malformed entries are
/// skipped, never thrown.
fn flatten_groups(
    groups: &HashMap<StatusGroup, ResultsEntry>,
    out: &mut Vec<(Severity, String)>,
) {
    let mut keys: Vec<&StatusGroup> = groups.keys().collect();
    keys.sort();
    for group in keys {
        match groups[group].as_results() {
            Some(results) => {
                for result in results {
                    out.push((result.severity, result.severity.title().to_string()));
                }
            }
            None => debug!("Skipping non-result entry for group {:?}", group),
        }
    }
}
