use chrono::NaiveDate;
use axum::{Router, http::StatusCode, http::header, routing::get};
use drawboard::results::{
    CacheBust, ExistenceProber, HttpProber, HttpRemoteIndex, ProbeOutcome, RemoteIndex, Resolver,
    TimeSlot, Today,
};
use drawboard::{Config, ResolverConfig, build_http_resolver, create_app};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Starts the app on an ephemeral port, serving the given result files.
async fn start_server(temp_dir: &TempDir, files: &[&str]) -> SocketAddr {
    let results_dir = temp_dir.path().join("results");
    std::fs::create_dir_all(&results_dir).unwrap();
    for name in files {
        std::fs::write(results_dir.join(name), b"RIFF....WEBP").unwrap();
    }

    let mut config = Config::default();
    config.results.source_directory = results_dir;
    config.static_files.directory = temp_dir.path().join("static");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_app(config, None);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn resolver_config(addr: SocketAddr, with_index: bool) -> ResolverConfig {
    ResolverConfig {
        asset_base_url: Some(format!("http://{}/results/", addr)),
        index_url: with_index.then(|| format!("http://{}/api/results/", addr)),
        fast_lookback_days: 3,
        background_lookback_days: 5,
        batch_pause_ms: 0,
        fast_probe_timeout_ms: 2000,
        background_probe_timeout_ms: 2000,
        ..ResolverConfig::default()
    }
}

fn date(d: u32, m: u32, y: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> Today {
    Today::Fixed(date(13, 8, 2025))
}

const FILES: [&str; 3] = [
    "13-08-2025 6pm.webp",
    "File 11-08-2025 8pm.png",
    "12-08-2025 1pm.jpg",
];

#[tokio::test]
async fn test_http_prober_against_server() {
    let temp_dir = TempDir::new().unwrap();
    let addr = start_server(&temp_dir, &FILES).await;

    let base = url::Url::parse(&format!("http://{}/results", addr)).unwrap();
    let prober = HttpProber::new(reqwest::Client::new(), base);

    assert_eq!(prober.probe("13-08-2025 6pm.webp").await, ProbeOutcome::Found);
    assert_eq!(
        prober.probe("File 11-08-2025 8pm.png").await,
        ProbeOutcome::Found
    );
    assert_eq!(
        prober.probe("13-08-2025 8pm.webp").await,
        ProbeOutcome::NotFound
    );
}

#[tokio::test]
async fn test_http_prober_reports_unreachable_server_as_transient() {
    // bind and drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = url::Url::parse(&format!("http://{}/results/", addr)).unwrap();
    let prober = HttpProber::new(reqwest::Client::new(), base);
    assert_eq!(
        prober.probe("13-08-2025 6pm.webp").await,
        ProbeOutcome::TransientError
    );
}

/// Serves an HTML fallback page under `/soft/` and 503s under `/down/`.
async fn start_misbehaving_server() -> SocketAddr {
    let app = Router::new()
        .route(
            "/soft/{name}",
            get(|| async {
                (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    "<html><body>Not here</body></html>",
                )
            }),
        )
        .route(
            "/down/{name}",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_html_fallback_and_server_errors_are_transient() {
    let addr = start_misbehaving_server().await;

    for path in ["soft", "down"] {
        let base = url::Url::parse(&format!("http://{}/{}/", addr, path)).unwrap();
        let prober = HttpProber::new(reqwest::Client::new(), base);
        assert_eq!(
            prober.probe("12-08-2025 8pm.webp").await,
            ProbeOutcome::TransientError,
            "{}",
            path
        );

        // a past date, so a definite miss would have been remembered
        let resolver = Resolver::new(ResolverConfig::default(), Arc::new(prober), None)
            .with_today(today());
        assert!(
            resolver
                .result_for_date_time(date(12, 8, 2025), TimeSlot::EIGHT_PM)
                .await
                .is_none()
        );
        assert_eq!(resolver.cache().stats().await.entries, 0, "{}", path);
    }
}

#[test]
fn test_asset_urls_are_encoded_and_busted() {
    let base = url::Url::parse("https://example.com/results").unwrap();
    let url = drawboard::results::prober::asset_url(
        &base,
        "File 11-08-2025 8pm.png",
        &CacheBust::Token("abc".to_string()),
    )
    .unwrap();
    assert_eq!(
        url.as_str(),
        "https://example.com/results/File%2011-08-2025%208pm.png?t=abc"
    );
}

#[tokio::test]
async fn test_http_index_client() {
    let temp_dir = TempDir::new().unwrap();
    let addr = start_server(&temp_dir, &FILES).await;

    let index = HttpRemoteIndex::new(
        reqwest::Client::new(),
        url::Url::parse(&format!("http://{}/api/results", addr)).unwrap(),
        Duration::from_secs(2),
    );

    let listed = index.list().await.unwrap();
    let names: Vec<&str> = listed.iter().map(|d| d.filename.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "13-08-2025 6pm.webp",
            "12-08-2025 1pm.jpg",
            "File 11-08-2025 8pm.png"
        ]
    );

    let found = index
        .find(date(11, 8, 2025), TimeSlot::EIGHT_PM)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.filename, "File 11-08-2025 8pm.png");

    assert!(
        index
            .find(date(11, 8, 2025), TimeSlot::ONE_PM)
            .await
            .unwrap()
            .is_none()
    );
    assert!(index.clear_cache().await.is_ok());
}

#[tokio::test]
async fn test_http_index_client_reports_errors() {
    let temp_dir = TempDir::new().unwrap();
    let addr = start_server(&temp_dir, &[]).await;

    // wrong base path: every route is a 404
    let index = HttpRemoteIndex::new(
        reqwest::Client::new(),
        url::Url::parse(&format!("http://{}/nope/", addr)).unwrap(),
        Duration::from_secs(2),
    );
    assert!(index.list().await.is_err());
    assert!(index.find(date(11, 8, 2025), TimeSlot::EIGHT_PM).await.is_err());
}

#[tokio::test]
async fn test_resolver_end_to_end_with_index() {
    let temp_dir = TempDir::new().unwrap();
    let addr = start_server(&temp_dir, &FILES).await;

    let resolver = Arc::new(
        build_http_resolver(&resolver_config(addr, true))
            .unwrap()
            .with_today(today()),
    );

    let loaded = resolver.load().await;
    let initial = loaded.initial.unwrap();
    assert_eq!(initial.filename, "13-08-2025 6pm.webp");
    assert_eq!(initial.display_time(), "6pm");

    let scanned = loaded.background.await.unwrap();
    assert_eq!(scanned.len(), 3);
    assert_eq!(
        resolver.available_dates().await,
        vec![date(13, 8, 2025), date(12, 8, 2025), date(11, 8, 2025)]
    );

    let exact = resolver
        .result_for_date_time(date(11, 8, 2025), TimeSlot::EIGHT_PM)
        .await
        .unwrap();
    assert_eq!(exact.filename, "File 11-08-2025 8pm.png");

    let any = resolver
        .result_for_date_any_time(date(12, 8, 2025))
        .await
        .unwrap();
    assert_eq!(any.filename, "12-08-2025 1pm.jpg");
}

#[tokio::test]
async fn test_resolver_end_to_end_probing_only() {
    let temp_dir = TempDir::new().unwrap();
    let addr = start_server(&temp_dir, &FILES).await;

    let resolver = Arc::new(
        build_http_resolver(&resolver_config(addr, false))
            .unwrap()
            .with_today(today()),
    );

    let exact = resolver
        .result_for_date_time(date(11, 8, 2025), TimeSlot::EIGHT_PM)
        .await
        .unwrap();
    assert_eq!(exact.filename, "File 11-08-2025 8pm.png");

    // the window scan only tries unprefixed names
    let scanned = resolver.all_available_results().await;
    let names: Vec<&str> = scanned.iter().map(|r| r.filename.as_str()).collect();
    assert_eq!(names, vec!["13-08-2025 6pm.webp", "12-08-2025 1pm.jpg"]);
}

#[test]
fn test_build_http_resolver_requires_asset_url() {
    let config = ResolverConfig::default();
    assert!(build_http_resolver(&config).is_err());
}
