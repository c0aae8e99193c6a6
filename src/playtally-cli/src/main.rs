use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use playtally_core::secrets::{CredentialStore, SecretService};
use mpc_plugin::StopHandle;
use playtally_core::{init_logging, AppDirs, Config, MpcConfig, SuggestConfig};
use sqlite_store::SqliteLibrary;
use std::path::PathBuf;
use suggest_plugin::{LastFmClient, SuggestPlugin};
use thiserror::Error;

#[derive(Debug, Parser)]
#[command(name = "playtally", version, about = "Play statistics and artist suggestions for a music library")]
struct Cli {
    /// Library database (overrides config)
    #[arg(long, global = true)]
    library: Option<PathBuf>,
    /// More log output; repeat for more
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a Music Player Daemon client that gathers play statistics
    Mpc(MpcCommand),
    /// Suggest artists similar to the ones matching a library query
    Suggest(SuggestCommand),
    /// Manage credentials kept in the OS keyring
    #[command(subcommand)]
    Credentials(CredentialsCommand),
}

#[derive(Debug, Parser, Clone, Default)]
struct MpcCommand {
    /// Daemon host name, or socket path
    #[arg(long)]
    host: Option<String>,
    /// Daemon port
    #[arg(long)]
    port: Option<u16>,
    /// Daemon password
    #[arg(long)]
    password: Option<String>,
    /// Also record statistics as attribute[user]
    #[arg(long)]
    user: Option<String>,
}

#[derive(Debug, Parser, Clone)]
struct SuggestCommand {
    /// Library queries; each one selects seed artists
    query: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum CredentialsCommand {
    /// Store a secret in the keyring
    Set { service: ServiceArg, secret: String },
    /// Remove a stored secret
    Clear { service: ServiceArg },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ServiceArg {
    /// Daemon password
    Mpd,
    /// Last.fm API key
    Lastfm,
}

impl From<ServiceArg> for SecretService {
    fn from(arg: ServiceArg) -> Self {
        match arg {
            ServiceArg::Mpd => SecretService::Mpd,
            ServiceArg::Lastfm => SecretService::LastFm,
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("no Last.fm API key: set suggest.api_key in config.toml or run `playtally credentials set lastfm <KEY>`")]
    MissingApiKey,
}

impl MpcCommand {
    /// Command line values win over the stored configuration.
    fn apply(&self, config: &mut MpcConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
    }
}

/// First non-empty of: command line, config, keyring.
fn resolve_secret(
    cli: Option<&str>,
    config: Option<&str>,
    keyring: impl FnOnce() -> Option<String>,
) -> Option<String> {
    cli.or(config)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .or_else(keyring)
        .filter(|s| !s.is_empty())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let dirs = AppDirs::discover()?;
    let config = Config::load_or_default(&dirs)?;
    let _logging = init_logging(&config.logging, &dirs, cli.verbose)?;
    let credentials = CredentialStore::new();

    match &cli.command {
        Command::Credentials(command) => run_credentials(&credentials, command),
        Command::Mpc(mpc) => {
            let mut mpc_config = config.mpc.clone();
            mpc.apply(&mut mpc_config);
            mpc_config.password = resolve_secret(
                mpc.password.as_deref(),
                Some(config.mpc.password.as_str()),
                || credentials.lookup(SecretService::Mpd),
            )
            .unwrap_or_default();
            let library = open_library(&cli, &config, &dirs)?;
            let stop = StopHandle::default();
            stop_on_ctrl_c(stop.clone())?;
            mpc_plugin::run_tracker(&mpc_config, &library, stop)?;
            Ok(())
        }
        Command::Suggest(suggest) => run_suggest(
            &suggest.query,
            &config.suggest,
            || {
                resolve_secret(None, config.suggest.api_key.as_deref(), || {
                    credentials.lookup(SecretService::LastFm)
                })
            },
            || open_library(&cli, &config, &dirs),
        ),
    }
}

fn open_library(cli: &Cli, config: &Config, dirs: &AppDirs) -> Result<SqliteLibrary> {
    let path = cli
        .library
        .clone()
        .unwrap_or_else(|| config.library.resolve_path(dirs));
    tracing::debug!(path = %path.display(), "opening library");
    SqliteLibrary::open(&path).with_context(|| format!("failed to open library {}", path.display()))
}

/// Without a query there is nothing to look up, so neither the API key nor
/// the library is touched.
fn run_suggest(
    query: &[String],
    config: &SuggestConfig,
    api_key: impl FnOnce() -> Option<String>,
    open_library: impl FnOnce() -> Result<SqliteLibrary>,
) -> Result<()> {
    if query.is_empty() {
        tracing::info!("You must supply a query so I can make suggestions");
        return Ok(());
    }
    let api_key = api_key().ok_or(CliError::MissingApiKey)?;
    let client = LastFmClient::new(config.base_url.clone(), api_key)?;
    let library = open_library()?;
    SuggestPlugin::new(&library, client, config).run(query)?;
    Ok(())
}

/// Stop the tracker on the first Ctrl-C.
fn stop_on_ctrl_c(stop: StopHandle) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the signal runtime")?;
    std::thread::Builder::new()
        .name("ctrl-c".into())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("interrupted, stopping the tracker");
                        stop.stop();
                    }
                    Err(err) => tracing::warn!(error = %err, "could not listen for Ctrl-C"),
                }
            })
        })
        .context("failed to spawn the signal thread")?;
    Ok(())
}

fn run_credentials(credentials: &CredentialStore, command: &CredentialsCommand) -> Result<()> {
    match command {
        CredentialsCommand::Set { service, secret } => {
            credentials.store((*service).into(), secret)?;
            println!("Stored {} credential.", service_name(*service));
        }
        CredentialsCommand::Clear { service } => {
            credentials.delete((*service).into())?;
            println!("Cleared {} credential.", service_name(*service));
        }
    }
    Ok(())
}

fn service_name(service: ServiceArg) -> &'static str {
    match service {
        ServiceArg::Mpd => "mpd",
        ServiceArg::Lastfm => "lastfm",
    }
}
