use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use cloudprov::api::{self, format_api_error, poller, Credentials, Gateway};
use cloudprov::config::Config;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Operator tool for the cloudprov provider core
#[derive(Parser, Debug)]
#[command(name = "cloudprov", version, about, long_about = None)]
struct Args {
    /// Cloud API base URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// API token (overrides CLOUDPROV_TOKEN and the config file)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Calls per second through the gateway
    #[arg(long, global = true)]
    rate_limit: Option<f64>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticated GET; prints the JSON response
    Get {
        /// Path relative to the API URL, or an absolute URL
        path: String,
    },
    /// Block until the resource at URL reports READY
    Wait {
        url: String,
        /// Overall timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Initial poll interval in milliseconds
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Show or change the persisted configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    SetApiUrl { url: String },
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

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("cloudprov started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("cloudprov").join("cloudprov.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".cloudprov").join("cloudprov.log");
    }
    PathBuf::from("cloudprov.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level)?;

    let mut config = Config::load();

    // config subcommands work on the persisted file, without CLI overrides
    if let Command::Config { action } = &args.command {
        return run_config(action, config, Config::config_path().as_deref());
    }

    apply_overrides(&mut config, &args);

    let credentials = match &args.token {
        Some(token) => Some(Credentials::from_token(token.clone())),
        None => config.credentials(),
    };
    let options = config.gateway_options();
    // --api-url beats CLOUDPROV_API_URL
    let options = match &args.api_url {
        Some(url) => api::GatewayOptions {
            base_url: url.clone(),
            ..options
        },
        None => options,
    };
    let gateway = Gateway::with_http(&options, credentials)?;
    tracing::info!("Using API: {}", gateway.base_url());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, cancelling");
                cancel.cancel();
            }
        });
    }

    let result = run_command(&args.command, &gateway, &config, &cancel).await;
    gateway.shutdown();
    result
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(url) = &args.api_url {
        config.api_url = Some(url.clone());
    }
    if let Some(rate) = args.rate_limit {
        config.rate_limit = rate;
    }
}

async fn run_command(
    command: &Command,
    gateway: &Gateway,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<()> {
    match command {
        Command::Get { path } => {
            let response = gateway
                .get_with_cancel(path, cancel)
                .await
                .map_err(|e| anyhow::anyhow!(format_api_error(&e)))?;
            println!("{}", serde_json::to_string_pretty(&response.body)?);
            Ok(())
        }
        Command::Wait {
            url,
            timeout,
            interval,
        } => {
            let mut options = config.poll_options();
            if let Some(secs) = timeout {
                options = options.with_timeout(Duration::from_secs(*secs));
            }
            if let Some(ms) = interval {
                options.interval = Duration::from_millis(*ms);
            }
            poller::wait_until_ready(cancel, gateway, url, &options).await?;
            println!("{url} is ready");
            Ok(())
        }
        Command::Config { .. } => Ok(()),
    }
}

fn run_config(action: &ConfigAction, mut config: Config, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            // never echo the token
            let shown = Config {
                token: config.token.as_ref().map(|_| "********".to_string()),
                ..config
            };
            print!("{}", serde_yaml::to_string(&shown)?);
            if let Some(path) = path {
                println!("# {}", path.display());
            }
        }
        ConfigAction::SetApiUrl { url } => {
            url::Url::parse(url).with_context(|| format!("Invalid URL: {url}"))?;
            config.set_api_url(url, path)?;
            println!("API URL set to {url}");
        }
    }
    Ok(())
}
