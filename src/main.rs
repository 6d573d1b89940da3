use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::config::AppConfig;
use storefront::server::{self, StartupOutcome};

/// Log level for the application
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Verbose,
    Debug,
    Trace,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Storefront command line arguments
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(version, about = "A server-rendered storefront and product admin panel", long_about = None)]
struct CliArgs {
    /// Listen address (overrides BIND_ADDRESS)
    #[arg(short = 'a', long, value_name = "ADDRESS")]
    address: Option<String>,

    /// HTTP port (overrides PORT)
    #[arg(short = 'p', long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides DATABASE_URL)
    #[arg(long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level (error, warn, info, verbose, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Log output format (text, json)
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Increase verbosity (-v for verbose, -vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    init_logging(args.log_level, args.verbose, args.log_format);

    tracing::info!("Starting storefront v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::from_env()?;
    if let Some(address) = args.address {
        config.web.bind_address = address;
    }
    if let Some(port) = args.port {
        config.web.http_port = port;
    }
    if let Some(url) = args.database_url {
        config.database.url = url;
    }

    match server::run(config).await? {
        StartupOutcome::Stopped => {}
        StartupOutcome::DatabaseUnavailable => {
            tracing::warn!("Server was not started");
        }
    }

    Ok(())
}

/// Initialize logging with tracing
fn init_logging(level: LogLevel, verbose_count: u8, format: LogFormat) {
    // Verbose count overrides log level
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Verbose,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "storefront=error,tower_http=error",
        LogLevel::Warn => "storefront=warn,tower_http=warn",
        LogLevel::Info => "storefront=info,tower_http=info",
        LogLevel::Verbose => "storefront=debug,tower_http=info",
        LogLevel::Debug => "storefront=debug,tower_http=debug,sqlx=info",
        LogLevel::Trace => "storefront=trace,tower_http=debug,sqlx=debug",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };
    if let Err(err) = result {
        eprintln!("failed to initialize tracing: {}", err);
    }
}
