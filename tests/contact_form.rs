use axum::http::StatusCode;
use axum_test::TestServer;
use drawboard::email::{EmailConfig, EmailProviderConfig, create_provider};
use drawboard::{Config, create_app};
use tempfile::TempDir;

fn base_config(temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    let results_dir = temp_dir.path().join("results");
    std::fs::create_dir_all(&results_dir).unwrap();
    config.results.source_directory = results_dir;
    config.static_files.directory = temp_dir.path().join("static");
    config
}

async fn configured_server(temp_dir: &TempDir) -> TestServer {
    let mut config = base_config(temp_dir);
    config.email = Some(EmailConfig {
        from_address: "noreply@example.com".to_string(),
        from_name: Some("Drawboard".to_string()),
        provider: EmailProviderConfig::Null,
    });
    config.contact.recipient = Some("owner@example.com".to_string());

    let provider = create_provider(&EmailProviderConfig::Null).await.unwrap();
    TestServer::new(create_app(config, Some(provider))).unwrap()
}

const VALID_FORM: [(&str, &str); 4] = [
    ("name", "Ada"),
    ("email", "ada@example.com"),
    ("subject", "Wrong result posted"),
    ("message", "The 8pm result for yesterday shows the 6pm numbers."),
];

#[tokio::test]
async fn test_contact_delivers_valid_submission() {
    let temp_dir = TempDir::new().unwrap();
    let server = configured_server(&temp_dir).await;

    let response = server.post("/api/contact").form(&VALID_FORM).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["success"], true);
    assert!(json.get("errors").is_none());
}

#[tokio::test]
async fn test_contact_rejects_invalid_fields() {
    let temp_dir = TempDir::new().unwrap();
    let server = configured_server(&temp_dir).await;

    let long_subject = "x".repeat(201);
    let form = [
        ("name", "   "),
        ("email", "not-an-address"),
        ("subject", long_subject.as_str()),
        ("message", "hello"),
    ];

    let response = server.post("/api/contact").form(&form).await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["success"], false);
    let fields: Vec<&str> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["name", "subject", "email"]);
}

#[tokio::test]
async fn test_contact_unavailable_without_email() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::new(create_app(base_config(&temp_dir), None)).unwrap();

    let response = server.post("/api/contact").form(&VALID_FORM).await;
    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.json::<serde_json::Value>()["success"], false);
}

#[tokio::test]
async fn test_contact_validates_before_checking_delivery() {
    let temp_dir = TempDir::new().unwrap();
    let server = TestServer::new(create_app(base_config(&temp_dir), None)).unwrap();

    let response = server
        .post("/api/contact")
        .form(&[("name", "Ada")])
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}
