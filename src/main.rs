//! TxSentry CLI
//!
//! Reads a guard-provider assessment response (JSON, from a file argument
//! or stdin), normalizes it into the engine taxonomy, and prints the
//! overall verdict.

use std::io::Read;

use eyre::{Result, WrapErr};
use tracing_subscriber::EnvFilter;

use txsentry::core::normalize::normalize_provider_response;
use txsentry::core::status::compute_overall_status;
use txsentry::providers::hypernative::ProviderResponse;
use txsentry::SentinelConfig;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = SentinelConfig::default();
    if config.api_key.is_none() {
        eprintln!("⚠️  HYPERNATIVE_API_KEY not set; offline normalization only");
    }

    let mut args = std::env::args().skip(1);
    let raw = match args.next() {
        Some(path) => {
            std::fs::read_to_string(&path).wrap_err_with(|| format!("reading {}", path))?
        }
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .wrap_err("reading stdin")?;
            buffer
        }
    };
    let safe_address = args.next().unwrap_or_default();

    let response: ProviderResponse =
        serde_json::from_str(&raw).wrap_err("parsing provider response")?;
    let normalized = normalize_provider_response(&response, &safe_address);
    let threat = normalized.to_threat_results(&safe_address);

    let verdict = compute_overall_status(None, None, Some(&threat), false, false)
        .ok_or_else(|| eyre::eyre!("assessment produced no results"))?;

    println!("🛡️  TxSentry verdict: {} ({})", verdict.title, verdict.severity.as_str());
    for result in normalized
        .threat_results
        .iter()
        .chain(normalized.custom_check_results.iter())
    {
        println!("   [{}] {} - {}", result.severity.as_str(), result.title, result.description);
    }
    if let Some(id) = &normalized.assessment_id {
        println!("   assessment: {}", id);
    }

    Ok(())
}
