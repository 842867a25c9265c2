use std::sync::Arc;

use clap::Parser;
use tracing::info;

use soar_engine::{
    config::Config,
    models::Alert,
    playbook::PlaybookEngine,
    providers::{EnrichmentProvider, NotificationProvider, SlackNotifier, ThreatIntelClient},
    Result,
};

/// Run the stock response playbooks against a single security alert and
/// print the execution report.
#[derive(Parser, Debug)]
#[command(name = "soar-engine", about = "Run response playbooks against a security alert")]
struct Args {
    /// Brief description of the alert
    #[arg(long)]
    title: String,

    /// Detailed alert information
    #[arg(long)]
    description: Option<String>,

    /// Alert severity: low, medium, high, critical
    #[arg(long, default_value = "medium")]
    severity: String,

    /// System that generated the alert: edr, siem, firewall, ids, email, custom
    #[arg(long, default_value = "custom")]
    source: String,

    /// Source IP address involved
    #[arg(long)]
    source_ip: Option<String>,

    /// Destination IP address involved
    #[arg(long)]
    destination_ip: Option<String>,

    /// Domain name involved
    #[arg(long)]
    domain: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::load()?;

    let enrichment: Arc<dyn EnrichmentProvider> =
        Arc::new(ThreatIntelClient::new(&config.enrichment)?);
    let notifier: Arc<dyn NotificationProvider> = Arc::new(SlackNotifier::new(&config.notification)?);

    let engine = PlaybookEngine::new(&config, enrichment, notifier);
    engine.seed_default_playbooks().await?;

    let mut alert = Alert::new(args.title, args.severity.parse()?, args.source.parse()?);
    alert.description = args.description;
    alert.source_ip = args.source_ip;
    alert.destination_ip = args.destination_ip;
    alert.domain = args.domain;

    info!(alert_id = %alert.id, severity = %alert.severity, "Processing alert");
    let results = engine.run_playbooks_for_alert(&mut alert).await;
    info!(executed = results.len(), "Playbook run complete");

    let report = serde_json::json!({
        "alert": alert,
        "results": results,
        "circuit_breakers": engine.breaker_statuses().await,
        "dead_letter_queue": engine.dead_letter_stats().await,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
