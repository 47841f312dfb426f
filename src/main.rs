use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use gce_provider::config::{Config, ProcessEnv};
use gce_provider::gcp::auth::CredentialSource;
use gce_provider::gcp::compute::ComputeServiceBuilder;
use gce_provider::gcp::http::format_gcp_error;
use gce_provider::provider::ProviderConfig;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Configure and check a Compute Engine client
#[derive(Parser, Debug)]
#[command(name = "gce-provider", version = gce_provider::VERSION, about, long_about = None)]
struct Args {
    /// Service account JSON key file [env: GOOGLE_ACCOUNT_FILE]
    #[arg(long)]
    account_file: Option<String>,

    /// GCP project to use [env: GOOGLE_PROJECT]
    #[arg(short, long)]
    project: Option<String>,

    /// GCP region to use [env: GOOGLE_REGION]
    #[arg(short, long)]
    region: Option<String>,

    /// Metadata server account used when no account file is given
    #[arg(long)]
    service_account: Option<String>,

    /// Settings file (JSON); defaults to the user config directory
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print resolved settings and the credential source
    Show,
    /// Fetch the configured region
    Region,
    /// List zones in the configured region
    Zones,
    /// List instances in a zone
    Instances {
        /// Zone to list, e.g. us-central1-a
        #[arg(short, long)]
        zone: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gce-provider started with log level: {:?}", level);

    Some(guard)
}

impl Args {
    /// Settings from the file, overlaid with explicit flags
    fn settings(&self) -> Result<Config> {
        let file = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_default()?,
        };

        let flags = Config {
            account_file: self.account_file.clone().unwrap_or_default(),
            project: self.project.clone().unwrap_or_default(),
            region: self.region.clone().unwrap_or_default(),
            service_account: self.service_account.clone(),
        };

        Ok(file.merge(flags))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let _log_guard = setup_logging(args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", format_gcp_error(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut provider = ProviderConfig::new(args.settings()?);
    let compute = provider
        .load_and_validate(&ProcessEnv, &ComputeServiceBuilder::new())?
        .clone();
    let config = provider.config();

    match args.command.unwrap_or(Command::Show) {
        Command::Show => {
            let source = match config.credential_source(&ProcessEnv) {
                CredentialSource::AccountFile(path) => json!({
                    "type": "account_file",
                    "path": path,
                }),
                CredentialSource::Metadata(endpoint) => json!({
                    "type": "metadata",
                    "token_url": endpoint.token_url()?.to_string(),
                }),
            };
            let out = json!({
                "project": config.project,
                "region": config.region,
                "principal": compute.http().credentials().principal(),
                "credentials": source,
                "missing": config.missing_fields(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Region => {
            config.validate()?;
            let region = compute.get_region(&config.project, &config.region).await?;
            println!("{}", serde_json::to_string_pretty(&region)?);
        }
        Command::Zones => {
            config.validate()?;
            for zone in compute.list_zones(&config.project, &config.region).await? {
                println!("{}", zone);
            }
        }
        Command::Instances { zone } => {
            config.validate()?;
            for instance in compute.list_instances(&config.project, &zone).await? {
                let name = instance.get("name").and_then(|v| v.as_str()).unwrap_or("-");
                let status = instance.get("status").and_then(|v| v.as_str()).unwrap_or("-");
                println!("{}\t{}", name, status);
            }
        }
    }

    Ok(())
}
