use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::{error, info};

use driplane::bus::{Bus, Subscriber};
use driplane::capabilities::{self, Capabilities};
use driplane::config::EngineConfig;
use driplane::feeders::FeederRegistry;
use driplane::filters::FilterRegistry;
use driplane::message::{Message, RULE_NAME_KEY};
use driplane::net::HttpClient;
use driplane::pipeline::{Manifest, RuleLoader};

/// Logs whatever makes it through the last stage of a rule.
struct Output;

#[async_trait]
impl Subscriber for Output {
    async fn receive(&self, msg: Message) {
        info!(
            rule = msg.extra(RULE_NAME_KEY).unwrap_or_default(),
            "{}",
            msg.message()
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let manifest_path = std::env::args()
        .nth(1)
        .context("usage: driplane <rules.json>")?;
    let manifest_json = tokio::fs::read_to_string(&manifest_path)
        .await
        .with_context(|| format!("reading {manifest_path}"))?;
    let manifest = Manifest::from_json(&manifest_json)?;

    let config = EngineConfig::from_env();
    let http = HttpClient::new(&config)?;

    eprintln!("driplane v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Rules: {}", manifest_path);
    eprintln!("   User-Agent: {}", config.user_agent);

    if capabilities::install(Capabilities::new(http.clone())).is_err() {
        anyhow::bail!("capabilities already installed");
    }

    let filters = FilterRegistry::builtin(http.clone())?;
    let feeders = FeederRegistry::builtin(http)?;
    eprintln!("   Filters: {}", filters.kinds().join(", "));
    eprintln!("   Feeders: {}\n", feeders.kinds().join(", "));

    let bus = Bus::new();
    let loader = RuleLoader::new(&filters, &feeders, Arc::clone(&bus));
    let rules = loader.load_all(&manifest).await?;

    for rule in &rules {
        bus.subscribe(rule.output().clone(), Arc::new(Output)).await;
        rule.start()?;
    }
    info!(rules = rules.len(), "Started");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    for rule in &rules {
        if let Err(e) = rule.stop().await {
            error!(rule = %rule.name(), "Stop failed: {e}");
        }
    }
    Ok(())
}
