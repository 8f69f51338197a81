mod cli;
mod config;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use tdm_engine::{
    Decision, DecisionResolver, DocumentSource, HeaderSource, MetaSource, SignalSource,
};
use tdm_fetch::{FetchConfig, Fetcher};

use crate::cli::Cli;

/// Exit code when mining is reserved (with or without a policy).
const EXIT_RESERVED: i32 = 3;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides.
    let mut cfg = config::load(&cli.config)?;

    if let Some(timeout) = cli.timeout {
        cfg.request.timeout_secs = timeout;
    }
    if let Some(ref user_agent) = cli.user_agent {
        cfg.request.user_agent = user_agent.clone();
    }

    // 3. Init tracing-subscriber on stderr so stdout stays clean for the
    //    decision output.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(url = %cli.url, "tdm-check starting");

    // 4. Build the fetcher.
    let fetch_config = FetchConfig {
        timeout: Duration::from_secs(cfg.request.timeout_secs),
        user_agent: cfg.request.user_agent.clone(),
    };
    let fetcher = Fetcher::new(&fetch_config).context("failed to initialize fetcher")?;

    // 5. Gather whichever channels are enabled and reachable. A failed or
    //    skipped fetch simply leaves that source out of the resolver input.
    let document = if cli.no_document {
        None
    } else {
        fetcher.fetch_rules(&cli.url).await
    };
    if let Some((_, diagnostics)) = &document {
        for diagnostic in diagnostics {
            warn!(
                index = diagnostic.index,
                reason = %diagnostic.reason,
                "rules document entry skipped"
            );
        }
    }

    let headers = if cli.no_headers {
        None
    } else {
        fetcher.fetch_headers(&cli.url).await
    };
    let meta = if cli.no_meta {
        None
    } else {
        fetcher.fetch_meta(&cli.url).await
    };

    // 6. Assemble the sources in protocol preference order: well-known
    //    document, then headers, then HTML meta.
    let document_source = document
        .as_ref()
        .map(|(rules, _)| DocumentSource::new(rules, cli.url.as_str()));
    let header_source = headers.map(HeaderSource::new);
    let meta_source = meta.map(MetaSource::new);

    let mut sources: Vec<&dyn SignalSource> = Vec::new();
    if let Some(source) = &document_source {
        sources.push(source);
    }
    if let Some(source) = &header_source {
        sources.push(source);
    }
    if let Some(source) = &meta_source {
        sources.push(source);
    }

    info!(sources = sources.len(), "resolving decision");

    // 7. Resolve and report.
    let decision = DecisionResolver::resolve(&sources);
    report(&cli, &decision);

    std::process::exit(if decision.is_allowed() { 0 } else { EXIT_RESERVED });
}

fn report(cli: &Cli, decision: &Decision) {
    if cli.json {
        let verdict = if decision.is_allowed() {
            "allowed"
        } else {
            "disallowed"
        };
        let out = serde_json::json!({
            "url": cli.url.as_str(),
            "decision": verdict,
            "policy": decision.policy(),
        });
        println!("{out}");
        return;
    }

    match decision {
        Decision::Allowed => println!("{} can be freely mined.", cli.url),
        Decision::Disallowed => println!("{} cannot be freely mined.", cli.url),
        Decision::DisallowedWithPolicy(policy) => println!(
            "{} cannot be freely mined, but a policy is available: {policy}",
            cli.url
        ),
        // The resolver collapses exhausted sources to Allowed.
        Decision::Unknown => unreachable!("resolver never returns Unknown"),
    }
}
