//! CLI entrypoint for horo-chat
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use horo_application::{CredentialProvider, SessionOrchestrator, SessionParams, transport_channel};
use horo_domain::{Credential, Role, RoomId, UserId};
use horo_infrastructure::{
    ConfigLoader, FileConfig, HttpApiClient, StaticCredentialProvider, TokenFileProvider,
    WebSocketTransport,
};
use horo_presentation::{ChatRepl, Cli, ConsoleListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref())
            .map_err(|e| anyhow!("failed to load configuration: {e}"))?
    };
    config.validate().context("invalid configuration")?;

    // Held until exit so buffered file logs are flushed
    let _log_guard = init_logging(cli.verbose, config.logging.dir.as_deref());

    info!("Starting horo-chat");

    let role: Role = cli
        .role
        .map(Role::from)
        .or_else(|| config.session.parse_role())
        .context("no role given: pass --role or set session.role")?;
    let user_id: UserId = cli
        .user
        .clone()
        .or_else(|| config.session.user_id.clone())
        .map(UserId::from)
        .context("no user id given: pass --user or set session.user_id")?;
    let reconnect = config.reconnect.to_policy().unwrap_or_default();

    let cancel = CancellationToken::new();

    // === Dependency Injection ===
    let credentials = build_credentials(&cli, &config, &cancel).await?;

    let mut api = HttpApiClient::new(
        &config.server.api_base_url,
        Duration::from_secs(config.server.request_timeout_secs),
        credentials.clone(),
    )?;
    if let Some(name) = &config.session.display_name {
        api = api.with_display_name(name.clone());
    }
    let api = Arc::new(api);

    let (events_tx, events_rx) = transport_channel();
    let transport = Arc::new(WebSocketTransport::new(&config.server.ws_url, events_tx)?);

    let listener = Arc::new(ConsoleListener::stdout(user_id.clone()));
    let params = SessionParams::new(user_id.clone(), role).with_reconnect(reconnect);
    let session = Arc::new(
        SessionOrchestrator::new(params, transport, api.clone(), api).with_listener(listener.clone()),
    );

    let runner = {
        let session = Arc::clone(&session);
        let changes = credentials.subscribe();
        let cancel = cancel.clone();
        tokio::spawn(async move { session.run(events_rx, changes, cancel).await })
    };

    let repl = ChatRepl::new(session, listener, user_id);
    let result = repl.run(cli.room.clone().map(RoomId::from)).await;

    cancel.cancel();
    let _ = runner.await;
    result.context("console input failed")
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over `-v`. Logs go to stderr; with `logging.dir` set they
/// are also written to a daily-rolling file.
fn init_logging(verbose: u8, log_dir: Option<&str>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    });

    let stderr = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(expand_home(dir), "horo-chat.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}

/// Pick the credential source: command line first, then config.
async fn build_credentials(
    cli: &Cli,
    config: &FileConfig,
    cancel: &CancellationToken,
) -> Result<Arc<dyn CredentialProvider>> {
    if let Some(token) = &cli.token {
        return Ok(Arc::new(StaticCredentialProvider::new(Credential::new(
            token.as_str(),
        ))));
    }

    let token_file = cli
        .token_file
        .clone()
        .or_else(|| config.auth.token_file.as_deref().map(expand_home));
    if let Some(path) = token_file {
        let provider = Arc::new(
            TokenFileProvider::open(&path)
                .await
                .with_context(|| format!("failed to read token file {}", path.display()))?,
        );
        if config.auth.token_poll_secs > 0 {
            provider.spawn_watcher(
                Duration::from_secs(config.auth.token_poll_secs),
                cancel.clone(),
            );
        }
        return Ok(provider);
    }

    let token = config
        .auth
        .token
        .as_deref()
        .context("no credential: pass --token or --token-file, or set auth.token or auth.token_file")?;
    Ok(Arc::new(StaticCredentialProvider::new(Credential::new(token))))
}

/// `~/x` → `$HOME/x`
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
