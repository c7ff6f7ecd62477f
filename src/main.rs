//! Command-line driver for the offline mirror.

mod error;

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use exn::ResultExt;
use haven_config::{Config, ManifestSetting};
use haven_fetch::{FetcherHandle, HttpFetcher};
use haven_mirror::{Manifest, ManifestHandle, RemoteManifest, StaticManifest};
use haven_orchestrator::{ContextSpec, Host, Orchestrator, Settings};
use haven_rewrite::transform::InjectBootstrap;
use haven_storage::BackendHandle;
use haven_storage::backend::LocalBackend;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

/// Keep a hosted web application usable offline.
#[derive(Parser, Debug)]
#[command(name = "haven", version, about, long_about = None)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON), layered over the defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile, precache and rewrite once, as on going online
    Sync,
    /// Show what is stored on this device
    Status,
    /// Show where the runtime interceptor would send a request
    Resolve {
        /// Request URL, as the page would issue it
        url: String,
        /// Document issuing the request (defaults to the remote entry document)
        #[arg(long)]
        document: Option<String>,
        /// Resolve as if offline
        #[arg(long)]
        offline: bool,
    },
    /// Print one of the generated in-page scripts
    Script {
        #[arg(value_enum)]
        which: ScriptKind,
        /// Render the interceptor for online mode
        #[arg(long)]
        online: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScriptKind {
    Before,
    After,
    Bootstrap,
}

/// Stand-in for a real hosted context: the CLI never loads documents.
struct Headless;

#[async_trait]
impl Host for Headless {
    async fn create_context(&self, spec: ContextSpec) -> haven_orchestrator::error::Result<()> {
        tracing::debug!(entry = ?spec.entry, offline = spec.offline, "Context requested");
        Ok(())
    }

    async fn destroy_context(&self) {}
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Command failed");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    let mut orchestrator = orchestrator(&config)?;
    match cli.command {
        Command::Sync => {
            orchestrator.start().await;
            let report = orchestrator.run_cycle().await.or_raise(|| ErrorKind::Engine)?;
            println!("version     {}", report.version);
            println!("gate        {:?}", report.reconciliation);
            println!("downloaded  {}", report.precache.downloaded);
            println!("cached      {}", report.precache.cached);
            println!("failed      {}", report.precache.failed.len());
            for failure in &report.precache.failed {
                println!("  {}: {}", failure.asset, failure.reason);
            }
            println!("entry       {}", report.document.url);
            println!("digest      {}", report.document.digest);
        },
        Command::Status => {
            orchestrator.start().await;
            let status = orchestrator.status().await;
            println!("version     {}", status.version.as_deref().unwrap_or("-"));
            println!("mirrored    {}", status.mirrored);
            match status.offline_entry {
                Some(document) => println!("entry       {}", document.url),
                None => println!("entry       -"),
            }
        },
        Command::Resolve { url, document, offline } => {
            let document = match document {
                Some(raw) => Url::parse(&raw).or_raise(|| ErrorKind::InvalidUrl(raw.clone()))?,
                None => {
                    let origin = config.origin().or_raise(|| ErrorKind::Config)?;
                    origin.join(&config.entry).or_raise(|| ErrorKind::InvalidUrl(config.entry.clone()))?
                },
            };
            println!("{}", orchestrator.policy().resolve(&url, &document, offline));
        },
        Command::Script { which, online } => {
            let script = match which {
                ScriptKind::Before => orchestrator.interceptor().before_load(!online).or_raise(|| ErrorKind::Engine)?,
                ScriptKind::After => orchestrator.interceptor().after_load().or_raise(|| ErrorKind::Engine)?,
                ScriptKind::Bootstrap => InjectBootstrap::new(&config.bootstrap, orchestrator.policy())
                    .or_raise(|| ErrorKind::Engine)?
                    .element()
                    .to_string(),
            };
            println!("{script}");
        },
    }
    Ok(())
}

fn orchestrator(config: &Config) -> Result<Orchestrator<Headless>> {
    let origin = config.origin().or_raise(|| ErrorKind::Config)?.clone();
    let root = config.storage_root().or_raise(|| ErrorKind::Config)?;
    let storage: BackendHandle = Arc::new(LocalBackend::new("local", &root).or_raise(|| ErrorKind::Storage)?);
    let fetcher: FetcherHandle =
        Arc::new(HttpFetcher::new(config.user_agent.as_deref()).or_raise(|| ErrorKind::Fetch)?);
    let manifests: ManifestHandle = match config.manifest_setting().or_raise(|| ErrorKind::Config)? {
        ManifestSetting::Inline { version, assets } => Arc::new(StaticManifest::new(Manifest::new(
            version,
            origin.clone(),
            config.entry.as_str(),
            assets.iter().cloned(),
        ))),
        ManifestSetting::Remote(url) => Arc::new(RemoteManifest::new(
            fetcher.clone(),
            url.clone(),
            origin.clone(),
            config.entry.as_str(),
        )),
    };
    let settings = Settings {
        origin,
        app_root: config.app_root.clone(),
        entry: config.entry.clone(),
        template_pattern: config.templates.pattern.clone(),
        template_root: config.templates.root.clone(),
        bootstrap: config.bootstrap.clone(),
    };
    tracing::debug!(root = %root.display(), "Opening offline storage");
    Orchestrator::new(storage, fetcher, manifests, settings, Headless).or_raise(|| ErrorKind::Engine)
}
