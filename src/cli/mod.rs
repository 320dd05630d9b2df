//! CLI mode for voorisync: parse arguments, build the client, run one sync.

mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use console::{Term, style};
use tokio_util::sync::CancellationToken;

use crate::{
    ApiClient, AppConfig, Error, HttpDownloader, Result, SyncConfig, SyncOptions, SyncProgress,
    Syncer,
};

pub use progress::{CliProgress, make_progress_bar, print_summary};

/// Sync Voorivex videos to your local machine.
#[derive(Debug, Parser)]
#[command(name = "voorisync", version, about)]
pub struct Args {
    /// `dl-token` value from the site's cookies (prompted for when omitted)
    #[arg(long, env = "VOORISYNC_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Directory to sync the videos into; must already exist [default: voorivex]
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Leave the video with this key out of the sync (repeatable)
    #[arg(long = "skip", value_name = "KEY")]
    pub skip: Vec<String>,

    /// Read settings from this TOML file instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Milliseconds to wait between active-link polls
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,
}

impl Args {
    /// Layers command-line flags over loaded configuration. Skip keys add to
    /// the configured ones.
    #[must_use]
    pub fn apply(&self, mut config: SyncConfig) -> SyncConfig {
        if let Some(path) = &self.path {
            config.root.clone_from(path);
        }
        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
        if let Some(millis) = self.poll_interval_ms {
            config.poll_interval_ms = millis;
        }
        for key in &self.skip {
            if !config.skip.contains(key) {
                config.skip.push(key.clone());
            }
        }
        config
    }

    fn load_config(&self) -> Result<AppConfig> {
        match &self.config {
            Some(path) => AppConfig::load_from(path),
            None => AppConfig::load(),
        }
    }
}

/// Checks that the sync root exists, is a directory and is writable.
///
/// # Errors
///
/// Returns [`Error::Config`] describing the first check that fails.
pub fn check_root(root: &Path) -> Result<()> {
    let meta = std::fs::metadata(root)
        .map_err(|_| Error::Config(format!("path {} does not exist", root.display())))?;
    if !meta.is_dir() {
        return Err(Error::Config(format!(
            "path {} is not a directory",
            root.display()
        )));
    }
    if meta.permissions().readonly() {
        return Err(Error::Config(format!(
            "path {} is not writable",
            root.display()
        )));
    }
    Ok(())
}

/// Returns the supplied token, prompting on the terminal when there is none.
///
/// # Errors
///
/// Returns an error if the prompt fails or the token is empty.
pub fn resolve_token(token: Option<String>) -> Result<String> {
    let token = match token {
        Some(token) => token,
        None => {
            let term = Term::stderr();
            term.write_str("Token: ")?;
            term.read_secure_line()?
        }
    };
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::Config("a token is required".to_string()));
    }
    Ok(token.to_string())
}

/// Parses the process arguments and runs a sync.
///
/// # Errors
///
/// Returns the first error of the run; the caller reports it.
pub async fn run() -> Result<()> {
    run_with(Args::parse()).await
}

/// Runs a sync for already-parsed arguments.
///
/// # Errors
///
/// Returns the first error of the run; the caller reports it.
pub async fn run_with(args: Args) -> Result<()> {
    let config = args.apply(args.load_config()?.sync);
    config.validate()?;
    check_root(&config.root)?;
    let token = resolve_token(args.token)?;

    let api = ApiClient::new(&config.base_url, &token)?;
    let downloader = HttpDownloader::new(api.http().clone(), config.chunk_size);
    let syncer = Syncer::new(api, downloader, SyncOptions::from_config(&config));

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("interrupt received, stopping");
            on_interrupt.cancel();
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("second interrupt, exiting immediately");
                std::process::exit(130);
            }
        }
    });

    let renderer = Arc::new(CliProgress::new());
    let progress: Arc<dyn SyncProgress> = renderer.clone();
    let result = syncer.run(&progress, &cancel).await;
    renderer.clear();

    let stats = result?;
    print_summary(&stats);
    println!("{}", style("[DONE] All videos are synced!").green());
    Ok(())
}
