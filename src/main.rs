#![allow(missing_docs)]

//! `medusa` command line: inspect registered access types and run
//! mediation scenarios against a channel-backed decision authority.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use medusa::access::register_builtin;
use medusa::audit::{AuditLogger, AuditSink, MemoryAuditSink, TracingAuditSink};
use medusa::authority;
use medusa::config::{load_config, Config};
use medusa::kobject::IdentityCache;
use medusa::mediator::Mediator;
use medusa::registry::{self, AccessTypeRegistry, RegistryBuilder};
use medusa::scenario::Scenario;
use medusa::types::{Answer, EscalationStatus};

#[derive(Parser)]
#[command(name = "medusa", version, about = "Virtual-space access mediation")]
struct Cli {
    /// Path to medusa.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered access types and their schemas.
    Acctypes,
    /// Mediate the call described by a scenario file.
    Check {
        /// Scenario TOML file.
        scenario: PathBuf,
    },
}

#[derive(Serialize)]
struct CheckOutcome {
    operation: &'static str,
    answer: Option<Answer>,
    status: Option<EscalationStatus>,
    audited: bool,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };

    let _guard = match &config.logging.dir {
        Some(dir) => Some(medusa::logging::init_production(dir, &config.logging.level)?),
        None => {
            medusa::logging::init_cli(&config.logging.level)?;
            None
        }
    };

    // Registration happens once, before any mediation; a failure halts startup.
    let registry = {
        let mut builder = RegistryBuilder::new();
        register_builtin(&mut builder).context("access type registration failed")?;
        Arc::new(builder.build())
    };
    registry::install_global(Arc::clone(&registry))
        .context("access type registry already installed")?;

    match cli.command {
        Command::Acctypes => print_acctypes(&registry),
        Command::Check { scenario } => check(&config, &registry, &scenario).await,
    }
}

fn print_acctypes(registry: &AccessTypeRegistry) -> Result<()> {
    for def in registry.iter() {
        println!("{}", serde_json::to_string(def)?);
    }
    Ok(())
}

async fn check(config: &Config, registry: &AccessTypeRegistry, path: &Path) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let source = scenario
        .identity_source(registry)
        .context("invalid scenario labels")?;
    let identity = Arc::new(IdentityCache::new(Arc::new(source)));

    let memory = Arc::new(MemoryAuditSink::new());
    let file_sink: Arc<dyn AuditSink> = match &config.audit.path {
        Some(audit_path) => Arc::new(
            AuditLogger::new(audit_path)
                .with_context(|| format!("failed to open audit log {}", audit_path.display()))?,
        ),
        None => Arc::new(TracingAuditSink),
    };
    let audit: Arc<dyn AuditSink> =
        Arc::new(Tee(Arc::clone(&memory) as Arc<dyn AuditSink>, file_sink));

    let (channel_authority, mut endpoint) = authority::channel();
    let answer = scenario.authority.unwrap_or(config.authority.default_answer);
    let daemon = tokio::spawn(async move {
        while let Some(pending) = endpoint.recv().await {
            info!(
                request_id = %pending.request.request_id,
                acctype = pending.request.acctype,
                %answer,
                "answering decision request"
            );
            if let Err(e) = pending.respond(answer) {
                warn!(error = %e, "decision requester went away");
            }
        }
    });

    let mediator = Mediator::from_global(identity, Arc::new(channel_authority), audit)
        .context("mediator needs the installed access type registry")?;
    let operation = scenario.operation.name();

    // The decision call blocks its thread.
    let result = tokio::task::spawn_blocking(move || {
        let result = scenario.run(&mediator);
        drop(mediator);
        result
    })
    .await
    .context("mediation thread panicked")?;
    daemon.await.context("decision endpoint task panicked")?;

    let records = memory.records();
    let outcome = CheckOutcome {
        operation,
        answer: result.as_ref().ok().copied(),
        status: records.first().map(|r| r.status),
        audited: !records.is_empty(),
        error: result.as_ref().err().map(ToString::to_string),
    };
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

/// Sends each record to two sinks.
struct Tee(Arc<dyn AuditSink>, Arc<dyn AuditSink>);

impl AuditSink for Tee {
    fn emit(&self, record: &medusa::audit::AuditRecord) -> Result<()> {
        let first = self.0.emit(record);
        let second = self.1.emit(record);
        first.and(second)
    }
}
