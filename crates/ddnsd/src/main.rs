// # ddnsd - DDNS Daemon
//
// Thin integration layer. Vendor logic lives in the provider crates and
// `ddns-core`; this binary only wires them together.
//
// The ddnsd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Registering providers and building one per configured record
// 3. Running the liveness server
// 4. Optionally pushing a known public IP to every record once
// 5. Shutting everything down on SIGTERM/SIGINT
//
// ## Configuration
//
// ### Records
// - `DDNS_CONFIG`: Inline JSON settings document (takes precedence)
// - `DDNS_CONFIG_PATH`: Path to the JSON settings file (default `config.json`)
//
// ### Runtime
// - `DDNS_HEALTH_ADDRESS`: Liveness listen address (default `127.0.0.1:9999`)
// - `DDNS_HTTP_TIMEOUT_SECS`: Per-request timeout towards vendors (default 10)
// - `DDNS_PUBLIC_IP`: When set, update every record to this address once
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// ## Example
//
// ```bash
// export DDNS_CONFIG_PATH=/etc/ddns/config.json
// export DDNS_PUBLIC_IP=203.0.113.7
//
// ddnsd
// ```

use anyhow::{Context, Result};
use ddns_core::{
    DdnsConfig, HttpClient, Matcher, Provider, ProviderRegistry, RegexMatcher, ReqwestClient,
    update_cancellable,
};
use ddns_health::{BoxError, HealthCheck, Server};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

const DEFAULT_CONFIG_PATH: &str = "config.json";
const DEFAULT_HEALTH_ADDRESS: &str = "127.0.0.1:9999";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Application configuration
struct Config {
    config_json: Option<String>,
    config_path: String,
    health_address: String,
    http_timeout_secs: u64,
    public_ip: Option<IpAddr>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            config_json: env::var("DDNS_CONFIG").ok().filter(|s| !s.trim().is_empty()),
            config_path: env::var("DDNS_CONFIG_PATH")
                .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
            health_address: env::var("DDNS_HEALTH_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_HEALTH_ADDRESS.to_string()),
            http_timeout_secs: match env::var("DDNS_HTTP_TIMEOUT_SECS") {
                Ok(s) => s
                    .trim()
                    .parse()
                    .with_context(|| format!("DDNS_HTTP_TIMEOUT_SECS is not a number: '{s}'"))?,
                Err(_) => DEFAULT_HTTP_TIMEOUT_SECS,
            },
            public_ip: env::var("DDNS_PUBLIC_IP")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| {
                    s.trim()
                        .parse::<IpAddr>()
                        .with_context(|| format!("DDNS_PUBLIC_IP is not an IP address: '{s}'"))
                })
                .transpose()?,
            log_level: env::var("DDNS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.config_json.is_none() && self.config_path.is_empty() {
            anyhow::bail!("DDNS_CONFIG_PATH cannot be empty when DDNS_CONFIG is unset");
        }

        if let Err(e) = self.health_address.parse::<SocketAddr>() {
            anyhow::bail!(
                "DDNS_HEALTH_ADDRESS must be an ip:port socket address. Got: '{}' ({})",
                self.health_address,
                e
            );
        }

        if !(1..=300).contains(&self.http_timeout_secs) {
            anyhow::bail!(
                "DDNS_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.http_timeout_secs
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Read the record settings from `DDNS_CONFIG` or the settings file
    fn load_settings(&self) -> Result<DdnsConfig> {
        let settings = match &self.config_json {
            Some(json) => DdnsConfig::from_json_str(json).context("DDNS_CONFIG is invalid")?,
            None => DdnsConfig::from_file(&self.config_path)
                .with_context(|| format!("failed loading {}", self.config_path))?,
        };
        Ok(settings)
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");

    let registry = ProviderRegistry::new();
    register_providers(&registry);

    let providers = match build_providers(&config, &registry) {
        Ok(providers) => providers,
        Err(e) => {
            error!("Invalid settings: {:#}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config, providers).await {
            Ok(()) => DdnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DdnsExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Register every vendor compiled into this binary
fn register_providers(registry: &ProviderRegistry) {
    #[cfg(feature = "namecheap")]
    ddns_provider_namecheap::register(registry);

    #[cfg(feature = "dondominio")]
    ddns_provider_dondominio::register(registry);

    info!(providers = ?registry.list_providers(), "registered providers");
}

/// Build and validate one provider per configured record
fn build_providers(config: &Config, registry: &ProviderRegistry) -> Result<Vec<Arc<dyn Provider>>> {
    let settings = config.load_settings()?;
    let matcher: Arc<dyn Matcher> = Arc::new(RegexMatcher::new());

    settings
        .settings
        .iter()
        .enumerate()
        .map(|(index, entry)| -> Result<Arc<dyn Provider>> {
            let provider = registry
                .create_provider(entry, &matcher)
                .with_context(|| format!("settings entry {} ({})", index, entry.provider))?;
            info!(record = %provider, "configured record");
            Ok(Arc::from(provider))
        })
        .collect()
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: Config, providers: Vec<Arc<dyn Provider>>) -> Result<()> {
    let client: Arc<dyn HttpClient> = Arc::new(
        ReqwestClient::with_timeout(Duration::from_secs(config.http_timeout_secs))
            .context("failed building HTTP client")?,
    );
    let cancel = CancellationToken::new();
    let failures = Arc::new(AtomicUsize::new(0));

    let health = Server::new(config.health_address.clone(), healthcheck(Arc::clone(&failures)));
    let health_done = health.spawn(cancel.clone());

    let update_pass = config.public_ip.map(|ip| {
        tokio::spawn(update_all(
            providers,
            Arc::clone(&client),
            ip,
            Arc::clone(&failures),
            cancel.clone(),
        ))
    });

    info!("Daemon initialized successfully");

    let signal = wait_for_shutdown().await;
    match &signal {
        Ok(name) => info!("Received shutdown signal: {}", name),
        Err(e) => error!("Shutdown error: {:#}", e),
    }

    info!("Shutting down daemon");
    cancel.cancel();

    if let Some(pass) = update_pass
        && let Err(e) = pass.await
    {
        warn!(error = %e, "update pass did not finish cleanly");
    }
    if health_done.await.is_err() {
        warn!("health server stopped without signalling completion");
    }

    signal.map(|_| ())
}

/// Health check reporting failed record updates
fn healthcheck(failures: Arc<AtomicUsize>) -> HealthCheck {
    Arc::new(move || -> std::result::Result<(), BoxError> {
        match failures.load(Ordering::SeqCst) {
            0 => Ok(()),
            n => Err(format!("{n} record update(s) failed").into()),
        }
    })
}

/// Push `ip` to every record concurrently, counting failures
async fn update_all(
    providers: Vec<Arc<dyn Provider>>,
    client: Arc<dyn HttpClient>,
    ip: IpAddr,
    failures: Arc<AtomicUsize>,
    cancel: CancellationToken,
) {
    info!(%ip, records = providers.len(), "updating records");

    let mut tasks = JoinSet::new();
    for provider in providers {
        let client = Arc::clone(&client);
        let failures = Arc::clone(&failures);
        let cancel = cancel.clone();

        tasks.spawn(async move {
            if provider.ip_version().matches(ip) {
                match update_cancellable(provider.as_ref(), client.as_ref(), ip, &cancel).await {
                    Ok(confirmed) => info!(record = %provider, %confirmed, "record updated"),
                    Err(ddns_core::Error::Canceled) => {
                        warn!(record = %provider, "update canceled")
                    }
                    Err(e) => {
                        failures.fetch_add(1, Ordering::SeqCst);
                        error!(
                            record = %provider,
                            kind = ?e.kind(),
                            retryable = e.is_retryable(),
                            error = %e,
                            "record update failed"
                        );
                    }
                }
            } else {
                info!(record = %provider, %ip, "skipping record for other IP version");
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            failures.fetch_add(1, Ordering::SeqCst);
            error!(error = %e, "update task panicked");
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(name)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .context("Failed to wait for CTRL-C")?;
    Ok("SIGINT")
}
