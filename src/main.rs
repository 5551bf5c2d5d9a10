use chrono::{DateTime, Utc};
use clap::Parser;
use leadremind::application::coordinator::ReminderCoordinator;
use leadremind::config::ReminderConfig;
use leadremind::domain::credential::{Credential, Role};
use leadremind::domain::lead::LeadFilter;
use leadremind::domain::ports::{ClockRef, LeadStore, LeadStoreRef, NotificationGatewayRef};
use leadremind::infrastructure::clock::{FixedClock, SystemClock};
use leadremind::infrastructure::in_memory::InMemoryLeadStore;
use leadremind::infrastructure::outbox::{LogGateway, OutboxGateway};
use leadremind::interfaces::csv::lead_reader::LeadReader;
use leadremind::interfaces::csv::lead_writer::LeadWriter;
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Leads CSV file to load into the store before the run
    input: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JSON config file (policy, concurrency, timeouts, message settings)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append outgoing emails to this JSON-lines file instead of only logging them
    #[arg(long)]
    outbox: Option<PathBuf>,

    /// Write the resulting lead state to this CSV file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Evaluate at this RFC 3339 instant instead of the system clock
    #[arg(long)]
    now: Option<DateTime<Utc>>,

    /// Identity of the caller
    #[arg(long, env = "LEADREMIND_SUBJECT")]
    subject: Option<String>,

    /// Role of the caller: admin, service, member or anonymous
    #[arg(long, env = "LEADREMIND_ROLE", default_value = "anonymous")]
    role: String,

    /// Maximum number of leads processed concurrently (overrides config)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Print the actions a run would take without sending or writing anything
    #[arg(long)]
    dry_run: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_json = std::env::var("LEADREMIND_LOG_JSON")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

fn open_store(db_path: Option<PathBuf>) -> Result<LeadStoreRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            use leadremind::infrastructure::rocksdb::RocksDbLeadStore;
            let store = RocksDbLeadStore::open(path).into_diagnostic()?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryLeadStore::new()))
        }
        None => Ok(Arc::new(InMemoryLeadStore::new())),
    }
}

async fn import_leads(store: &dyn LeadStore, input: PathBuf) -> Result<()> {
    let file = File::open(&input).into_diagnostic()?;
    let mut imported = 0usize;
    for lead_result in LeadReader::new(file).leads() {
        match lead_result {
            Ok(lead) => {
                store.upsert(lead).await.into_diagnostic()?;
                imported += 1;
            }
            Err(e) => {
                error!(error = %e, "Error reading lead");
            }
        }
    }
    info!(imported, path = %input.display(), "leads loaded");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ReminderConfig::from_file(path).into_diagnostic()?,
        None => ReminderConfig::default(),
    };
    if let Some(concurrency) = cli.concurrency {
        config.concurrency = concurrency;
    }
    config.validate().into_diagnostic()?;

    let role: Role = cli.role.parse().into_diagnostic()?;
    let credential = match cli.subject {
        Some(subject) => Credential::new(subject, role),
        None => Credential::anonymous(),
    };

    let store = open_store(cli.db_path)?;
    if let Some(input) = cli.input {
        import_leads(store.as_ref(), input).await?;
    }

    let gateway: NotificationGatewayRef = match &cli.outbox {
        Some(path) => {
            let outbox = OutboxGateway::open(path).await.into_diagnostic()?;
            info!(path = %outbox.path().display(), "queueing reminders in outbox");
            Arc::new(outbox)
        }
        None => Arc::new(LogGateway),
    };
    let clock: ClockRef = match cli.now {
        Some(at) => Arc::new(FixedClock::new(at)),
        None => Arc::new(SystemClock),
    };

    let coordinator =
        ReminderCoordinator::new(Arc::clone(&store), gateway, clock, config).into_diagnostic()?;

    let output = if cli.dry_run {
        let plan = coordinator.plan(&credential).await.into_diagnostic()?;
        serde_json::to_string_pretty(&plan).into_diagnostic()?
    } else {
        // Dropping the run on Ctrl-C aborts in-flight leads; committed writes stand.
        let report = tokio::select! {
            report = coordinator.run(&credential) => report.into_diagnostic()?,
            _ = tokio::signal::ctrl_c() => return Err(miette!("reminder run cancelled")),
        };
        if !report.is_clean() {
            warn!(errors = report.errors.len(), "reminder run finished with per-lead errors");
        }
        serde_json::to_string_pretty(&report).into_diagnostic()?
    };
    println!("{output}");

    if let Some(path) = cli.export {
        let leads = store
            .filter(&LeadFilter::default())
            .await
            .into_diagnostic()?;
        let file = File::create(path).into_diagnostic()?;
        LeadWriter::new(file).write_leads(leads).into_diagnostic()?;
    }

    Ok(())
}
