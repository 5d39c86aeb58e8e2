use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use drawboard::{
    Config, build_http_resolver, create_app, email,
    results::{
        self, DirectoryProber, ParsedResult, ResultIndex, Resolver, ResultsError, TimeSlot, Today,
        codec,
    },
    startup_checks,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Overrides `app.log_level` from the config file
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Find the result to display (latest, or for a given date/time)
    Resolve {
        #[command(flatten)]
        source: SourceArgs,

        /// Draw date as DD-MM-YYYY
        #[arg(long)]
        date: Option<String>,

        /// Draw time such as 8pm (requires --date)
        #[arg(long, requires = "date")]
        time: Option<String>,
    },

    /// List every result found in the background scan window
    Scan {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Resolve against a local directory instead of a web server
    #[arg(long, conflicts_with_all = ["asset_url", "index_url"])]
    dir: Option<PathBuf>,

    /// Base URL result images are served from
    #[arg(long)]
    asset_url: Option<String>,

    /// Base URL of the index API, e.g. https://example.com/api/results/
    #[arg(long)]
    index_url: Option<String>,

    /// Skip the index and probe files one by one
    #[arg(long)]
    no_index: bool,

    /// Pretend today is this date (DD-MM-YYYY)
    #[arg(long)]
    today: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let (config, loaded) = load_config(&cli.config)?;

    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.app.log_level.clone());
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if loaded {
        info!("Configuration loaded from: {:?}", cli.config);
    } else {
        info!("Config file not found at {:?}, using defaults", cli.config);
    }

    match cli.command {
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, port, host, quit_after).await,
        Some(Commands::Resolve { source, date, time }) => {
            run_resolve(config, source, date, time).await
        }
        Some(Commands::Scan { source }) => run_scan(config, source).await,
        None => run_server(config, None, None, None).await,
    }
}

/// Returns the config and whether it came from a file.
fn load_config(config_path: &Path) -> Result<(Config, bool), Box<dyn std::error::Error>> {
    if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        let config = toml_edit::de::from_str::<Config>(&config_content)?;
        Ok((config, true))
    } else {
        Ok((Config::default(), false))
    }
}

fn parse_date_arg(value: &str) -> Result<chrono::NaiveDate, ResultsError> {
    codec::parse_date_fragment(value).ok_or_else(|| ResultsError::InvalidDate(value.to_string()))
}

fn build_resolver(config: &Config, source: SourceArgs) -> Result<Arc<Resolver>, ResultsError> {
    let mut resolver_config = config.resolver.clone();

    let resolver = if let Some(dir) = source.dir {
        let prober: Arc<dyn results::ExistenceProber> = Arc::new(DirectoryProber::new(dir.clone()));
        let remote = (!source.no_index).then(|| {
            let mut results_config = config.results.clone();
            results_config.source_directory = dir;
            Arc::new(ResultIndex::new(results_config)) as Arc<dyn results::RemoteIndex>
        });
        Resolver::new(resolver_config, prober, remote)
    } else {
        if source.asset_url.is_some() {
            resolver_config.asset_base_url = source.asset_url;
        }
        if source.index_url.is_some() {
            resolver_config.index_url = source.index_url;
        }
        if source.no_index {
            resolver_config.index_url = None;
        }
        build_http_resolver(&resolver_config)?
    };

    let today = match source.today.as_deref() {
        Some(today) => Today::Fixed(parse_date_arg(today)?),
        None => Today::System,
    };

    Ok(Arc::new(resolver.with_today(today)))
}

fn print_result(result: &ParsedResult) {
    println!(
        "{}  {:>4}  {}",
        codec::format_date(result.date),
        result.display_time(),
        result.filename
    );
}

async fn run_resolve(
    config: Config,
    source: SourceArgs,
    date: Option<String>,
    time: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let resolver = build_resolver(&config, source)?;

    let found = match (date, time) {
        (Some(date), Some(time)) => {
            let slot: TimeSlot = time.parse()?;
            resolver
                .result_for_date_time(parse_date_arg(&date)?, slot)
                .await
        }
        (Some(date), None) => {
            resolver
                .result_for_date_any_time(parse_date_arg(&date)?)
                .await
        }
        _ => resolver.fast_first_result().await,
    };

    match found {
        Some(result) => print_result(&result),
        None => println!("No result available"),
    }
    Ok(())
}

async fn run_scan(config: Config, source: SourceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let resolver = build_resolver(&config, source)?;
    let results = resolver.all_available_results().await;

    if results.is_empty() {
        println!("No results found");
    }
    for result in &results {
        print_result(result);
    }

    let stats = resolver.cache().stats().await;
    info!(
        "{} results, {} cache entries ({} hits, {} misses)",
        results.len(),
        stats.entries,
        stats.hits,
        stats.misses
    );
    Ok(())
}

async fn run_server(
    config: Config,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Results directory: {:?}", config.results.source_directory);
    info!(
        "Static files directory: {:?}",
        config.static_files.directory
    );

    match startup_checks::perform_startup_checks(&config).await {
        Ok(()) => info!("All startup checks passed"),
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }

            if errors.iter().any(|e| e.is_critical()) {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
            }
        }
    }

    let email_provider = match &config.email {
        Some(email_config) => match email::create_provider(&email_config.provider).await {
            Ok(provider) => {
                info!("Email provider: {}", provider.name());
                Some(provider)
            }
            Err(e) => {
                tracing::error!("Failed to create email provider: {}", e);
                None
            }
        },
        None => None,
    };

    let app = create_app(config, email_provider);

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
