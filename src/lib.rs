use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod contact;
pub mod email;
pub mod results;
pub mod startup_checks;
pub mod static_files;

use results::TimeSlot;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    #[serde(default)]
    pub results: ResultsConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    pub static_files: StaticConfig,
    #[serde(default)]
    pub contact: ContactConfig,
    #[serde(default)]
    pub email: Option<email::EmailConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticConfig {
    pub directory: PathBuf,
}

/// Where result images live and how long the index listing is reused.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResultsConfig {
    pub source_directory: PathBuf,
    pub listing_cache_seconds: u64,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            source_directory: PathBuf::from("results"),
            listing_cache_seconds: 60,
        }
    }
}

/// Search policy for result discovery. Window sizes, batch sizes and
/// timeouts trade completeness against latency.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Base URL result images are fetched from.
    pub asset_base_url: Option<String>,
    /// Base URL of the index API (`.../api/results/`).
    pub index_url: Option<String>,
    pub fast_lookback_days: u32,
    pub background_lookback_days: u32,
    pub fast_probe_timeout_ms: u64,
    pub background_probe_timeout_ms: u64,
    pub index_timeout_ms: u64,
    pub batch_size: usize,
    pub batch_pause_ms: u64,
    /// Highest priority first.
    pub time_slots: Vec<TimeSlot>,
    pub extensions: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            asset_base_url: None,
            index_url: None,
            fast_lookback_days: 7,
            background_lookback_days: 120,
            fast_probe_timeout_ms: 700,
            background_probe_timeout_ms: 1000,
            index_timeout_ms: 3000,
            batch_size: 6,
            batch_pause_ms: 50,
            time_slots: TimeSlot::PRIORITY_ORDER.to_vec(),
            extensions: results::generator::default_extensions(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContactConfig {
    pub recipient: Option<String>,
    pub subject_prefix: String,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            recipient: None,
            subject_prefix: "[Contact] ".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            app: AppConfig {
                name: "Drawboard".to_string(),
                log_level: "info".to_string(),
            },
            results: ResultsConfig::default(),
            resolver: ResolverConfig::default(),
            static_files: StaticConfig {
                directory: PathBuf::from("static"),
            },
            contact: ContactConfig::default(),
            email: None,
        }
    }
}

use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub results: results::SharedResultIndex,
    pub result_files: static_files::StaticFileHandler,
    pub static_handler: static_files::StaticFileHandler,
    pub email_provider: Option<email::DynEmailProvider>,
    pub config: Config,
}

async fn static_file_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
) -> impl IntoResponse {
    app_state.static_handler.serve(&path).await
}

/// Builds the router; the email provider is passed in because creating one
/// may need network access (SES credentials).
pub fn create_app(config: Config, email_provider: Option<email::DynEmailProvider>) -> Router {
    let results = Arc::new(results::ResultIndex::new(config.results.clone()));

    // names are reused when a draw is republished, so keep caches short
    let result_files =
        static_files::StaticFileHandler::new(config.results.source_directory.clone())
            .with_cache_control("public, max-age=60, must-revalidate");

    let static_handler =
        static_files::StaticFileHandler::new(config.static_files.directory.clone());

    let app_state = AppState {
        results,
        result_files,
        static_handler,
        email_provider,
        config,
    };

    Router::new()
        .route(
            "/api/results/list",
            axum::routing::get(results::list_handler),
        )
        .route(
            "/api/results/find",
            axum::routing::get(results::find_handler),
        )
        .route(
            "/api/results/clear-cache",
            axum::routing::post(results::clear_cache_handler),
        )
        .route(
            "/api/contact",
            axum::routing::post(contact::contact_handler),
        )
        .route(
            "/results/{filename}",
            axum::routing::get(results::result_file_handler),
        )
        .route("/static/{*path}", axum::routing::get(static_file_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let user_agent = request
                        .headers()
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        query = ?request.uri().query(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}

/// Builds a resolver from configuration: HTTP probing against
/// `asset_base_url` and, when configured, the index API at `index_url`.
pub fn build_http_resolver(
    config: &ResolverConfig,
) -> Result<results::Resolver, results::ResultsError> {
    let asset_base = config
        .asset_base_url
        .as_deref()
        .ok_or_else(|| results::ResultsError::MissingSetting("asset_base_url".to_string()))?;
    let asset_base = url::Url::parse(asset_base)?;

    let client = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let prober: Arc<dyn results::ExistenceProber> =
        Arc::new(results::HttpProber::new(client.clone(), asset_base));

    let remote = match config.index_url.as_deref() {
        Some(index_url) => Some(Arc::new(results::HttpRemoteIndex::new(
            client,
            url::Url::parse(index_url)?,
            std::time::Duration::from_millis(config.index_timeout_ms),
        )) as Arc<dyn results::RemoteIndex>),
        None => None,
    };

    Ok(results::Resolver::new(config.clone(), prober, remote))
}
