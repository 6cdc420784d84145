//! Audit Client CLI - probe the audit service and send events by hand

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;

use audit_client::{
    Attributes, AuditClient, AuditClientConfig, AuditError, AuditEvent, FixSuggestion, Severity,
};

#[derive(Parser)]
#[command(name = "audit-client")]
#[command(about = "Audit Client - send audit events to the audit service")]
#[command(version)]
struct Cli {
    /// YAML config file (AUDIT_* environment variables still override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the audit service is up
    Health,

    /// Send a single event and wait for the service to store it
    Send {
        /// Event name, e.g. user_login
        event: String,

        #[arg(short, long)]
        user_id: Option<i64>,

        /// info, warning or error
        #[arg(short, long, default_value = "info")]
        severity: Severity,

        /// Defaults to the upper-cased event name
        #[arg(short, long)]
        action_type: Option<String>,

        /// Metadata as a JSON object
        #[arg(short, long)]
        metadata: Option<String>,
    },

    /// Send a JSON array of events in one request
    Batch {
        /// Path to a .json file
        file: PathBuf,
    },

    /// Print the effective configuration (api key masked)
    Config,
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Commands::Health => health(config).await,
            Commands::Send {
                event,
                user_id,
                severity,
                action_type,
                metadata,
            } => send(config, event, user_id, severity, action_type, metadata).await,
            Commands::Batch { file } => batch(config, &file).await,
            Commands::Config => show_config(&config),
        },
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.downcast_ref::<AuditError>().and_then(|e| e.fix_suggestion()) {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<AuditClientConfig, AuditError> {
    let config = match path {
        Some(path) => AuditClientConfig::from_yaml_file(path)?,
        None => AuditClientConfig::default(),
    };
    Ok(config.with_env())
}

async fn health(config: AuditClientConfig) -> anyhow::Result<()> {
    let base_url = config.base_url.clone();
    let client = AuditClient::new(config)?;
    let report = client.health_check().await;

    if !report.healthy {
        anyhow::bail!(
            "audit service at {} is unhealthy: {}",
            base_url,
            report.error.as_deref().unwrap_or("non-200 response")
        );
    }

    println!(
        "{} {} {}",
        "✓".green(),
        report.service.as_deref().unwrap_or("unknown").cyan().bold(),
        report.version.as_deref().unwrap_or("").dimmed()
    );
    Ok(())
}

async fn send(
    config: AuditClientConfig,
    event: String,
    user_id: Option<i64>,
    severity: Severity,
    action_type: Option<String>,
    metadata: Option<String>,
) -> anyhow::Result<()> {
    // the process exits right after, so never fire-and-forget
    let client = AuditClient::new(config.with_async(false))?;

    let metadata: Attributes = match metadata {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(AuditError::from)
            .context("--metadata must be a JSON object")?,
        None => Attributes::new(),
    };

    let action_type = action_type.unwrap_or_else(|| event.to_uppercase());
    let mut audit = AuditEvent::new(event.as_str())
        .with_action_type(action_type)
        .with_severity(severity)
        .with_metadata(metadata);
    if let Some(id) = user_id {
        audit = audit.with_user(id);
    }

    if !client.log(audit).await {
        anyhow::bail!("audit event '{}' was not stored", event);
    }

    if client.is_enabled() {
        println!("{} Sent {}", "✓".green(), event.cyan().bold());
    } else {
        println!("{} Auditing disabled, {} skipped", "→".cyan(), event.cyan());
    }
    Ok(())
}

async fn batch(config: AuditClientConfig, file: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .map_err(AuditError::from)
        .with_context(|| format!("reading {}", file.display()))?;
    let events: Vec<AuditEvent> = serde_json::from_str(&raw)
        .map_err(AuditError::from)
        .with_context(|| format!("{} must hold a JSON array of events", file.display()))?;

    let client = AuditClient::new(config)?;
    let result = client.log_batch(events).await;

    println!(
        "{} created: {}  errors: {}",
        "→".cyan(),
        result.created.to_string().green(),
        result.errors.to_string().red()
    );
    if result.errors > 0 {
        println!("{}", serde_json::to_string_pretty(&result.details).unwrap_or_default());
    }

    if !result.success {
        anyhow::bail!("batch was not fully stored");
    }
    Ok(())
}

fn show_config(config: &AuditClientConfig) -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(&config.redacted()).map_err(AuditError::from)?;
    print!("{}", yaml);
    Ok(())
}
