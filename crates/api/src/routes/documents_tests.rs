//! Router tests for the upload endpoints.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{AppState, create_router};
use dossier_core::conversion::FormatNormalizer;
use dossier_core::document::{DocumentRecorder, NewDocument, RecorderError};
use dossier_core::ingestion::IngestionService;
use dossier_core::storage::{RetryPolicy, StorageClient, StorageConfig};
use dossier_db::DocumentRepository;
use dossier_shared::{AuthConfig, ConverterCommand, ConverterConfig, JwtService, UploadConfig};

const BOUNDARY: &str = "dossier-test-boundary";

/// Writes a minimal well-formed PDF to the `{output}` path.
const WRITE_PDF: &str = r#"printf '%%PDF-1.4\n1 0 obj << >> endobj\n%%%%EOF\n' > "$1""#;

#[derive(Default)]
struct MemoryRecorder {
    docs: Mutex<Vec<NewDocument>>,
}

impl MemoryRecorder {
    fn docs(&self) -> Vec<NewDocument> {
        self.docs.lock().unwrap().clone()
    }
}

impl DocumentRecorder for MemoryRecorder {
    async fn create(&self, doc: NewDocument) -> Result<Uuid, RecorderError> {
        self.docs.lock().unwrap().push(doc);
        Ok(Uuid::now_v7())
    }
}

struct TestApp<R: DocumentRecorder = DocumentRepository> {
    state: AppState<R>,
    recorder: Arc<R>,
    jwt: Arc<JwtService>,
    server: MockServer,
    work: PathBuf,
    _root: TempDir,
}

fn sh(script: &str, args: &[&str]) -> ConverterCommand {
    let mut argv = vec!["-c".to_string(), script.to_string(), "sh".to_string()];
    argv.extend(args.iter().map(ToString::to_string));
    ConverterCommand::new("sh", argv)
}

async fn test_app(image: ConverterCommand) -> TestApp {
    // No database behind the recorder: every metadata write fails.
    test_app_with(image, DocumentRepository::new(DatabaseConnection::Disconnected)).await
}

async fn test_app_with<R: DocumentRecorder + 'static>(
    image: ConverterCommand,
    recorder: R,
) -> TestApp<R> {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let work = root.path().join("incoming");

    let storage = StorageClient::new(
        StorageConfig::new("key-id", "app-key", "compliance-docs")
            .with_auth_url(server.uri())
            .with_request_timeout(Duration::from_secs(5))
            .with_retry(RetryPolicy::none()),
    )
    .unwrap();
    let normalizer = FormatNormalizer::new(ConverterConfig {
        work_dir: work.clone(),
        output_dir: root.path().join("converted"),
        timeout_secs: 10,
        image,
        office: sh("exit 99", &[]),
    });
    let recorder = Arc::new(recorder);

    let ingestion = IngestionService::new(
        Arc::new(storage),
        Arc::new(normalizer),
        Arc::clone(&recorder),
        UploadConfig::default(),
    );
    let jwt = Arc::new(JwtService::new(AuthConfig {
        secret: "test-secret-at-least-32-bytes-long!!".to_string(),
        issuer: None,
        token_ttl_secs: 600,
    }));

    TestApp {
        state: AppState {
            jwt_service: Arc::clone(&jwt),
            ingestion: Arc::new(ingestion),
        },
        recorder,
        jwt,
        server,
        work,
        _root: root,
    }
}

fn bearer<R: DocumentRecorder>(app: &TestApp<R>, role: &str, company_id: Option<&str>) -> String {
    let token = app
        .jwt
        .issue("uid-42", "ana@example.com", role, company_id)
        .unwrap();
    format!("Bearer {token}")
}

fn multipart_body(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn post(uri: &str, auth: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn send<R: DocumentRecorder + 'static>(app: &TestApp<R>, request: Request<Body>) -> (StatusCode, Value) {
    let response = create_router(app.state.clone())
        .oneshot(request)
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn mount_store(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/b2api/v2/b2_authorize_account"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "authorizationToken": "acct-token",
            "apiUrl": server.uri(),
            "downloadUrl": server.uri(),
            "allowed": { "bucketId": "bucket-1" }
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_get_upload_url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "uploadUrl": format!("{}/upload/bucket-1", server.uri()),
            "authorizationToken": "upload-token"
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/upload/bucket-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fileId": "4_z_file" })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_health_needs_no_credentials() {
    let app = test_app(sh("exit 1", &[])).await;
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_missing_credential_is_401_without_side_effects() {
    let app = test_app(sh("exit 1", &[])).await;
    let body = multipart_body("file", "a.pdf", "application/pdf", b"%PDF-1.4");

    let (status, body) = send(&app, post("/api/upload", None, body)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "UNAUTHENTICATED");
    assert!(app.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_forged_token_is_invalid_credential() {
    let app = test_app(sh("exit 1", &[])).await;
    let other = JwtService::new(AuthConfig {
        secret: "some-other-secret-entirely-32-bytes".to_string(),
        issuer: None,
        token_ttl_secs: 600,
    });
    let token = other.issue("uid-1", "x@example.com", "admin", None).unwrap();
    let body = multipart_body("file", "a.pdf", "application/pdf", b"%PDF-1.4");

    let (status, body) = send(
        &app,
        post("/api/convert", Some(&format!("Bearer {token}")), body),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "INVALID_CREDENTIAL");
}

#[tokio::test]
async fn test_upload_without_file_part_is_400_with_no_io() {
    let app = test_app(sh("exit 1", &[])).await;
    let auth = bearer(&app, "user", Some("C1"));
    let body = multipart_body("attachment", "a.pdf", "application/pdf", b"%PDF-1.4");

    let (status, body) = send(&app, post("/api/upload", Some(&auth), body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MISSING_FILE");
    assert!(app.server.received_requests().await.unwrap().is_empty());
    assert!(!app.work.exists());
}

#[tokio::test]
async fn test_empty_file_part_is_missing_file() {
    let app = test_app(sh("exit 1", &[])).await;
    let auth = bearer(&app, "user", Some("C1"));
    let body = multipart_body("file", "a.pdf", "application/pdf", b"");

    let (status, body) = send(&app, post("/api/convert", Some(&auth), body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "MISSING_FILE");
}

#[tokio::test]
async fn test_converter_failure_is_500_with_stderr() {
    let app = test_app(sh("echo 'cannot identify image file' >&2; exit 1", &[])).await;
    let auth = bearer(&app, "user", Some("C1"));
    let body = multipart_body("file", "scan.jpg", "image/jpeg", &[0xFF, 0xD8, 0xFF, 0xE0]);

    let (status, body) = send(&app, post("/api/convert", Some(&auth), body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "CONVERSION_FAILURE");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("cannot identify image file")
    );
    assert!(app.server.received_requests().await.unwrap().is_empty());
    assert_eq!(std::fs::read_dir(&app.work).unwrap().count(), 0);
}

#[tokio::test]
async fn test_metadata_failure_is_distinct_and_removes_object() {
    let app = test_app(sh("exit 1", &[])).await;
    mount_store(&app.server).await;
    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_delete_file_version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fileId": "4_z_file" })))
        .expect(1)
        .mount(&app.server)
        .await;
    let auth = bearer(&app, "user", Some("C1"));
    let body = multipart_body("file", "informe.pdf", "application/pdf", b"%PDF-1.4 data");

    let (status, body) = send(&app, post("/api/upload", Some(&auth), body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "RECORDER_FAILURE");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("stored object removed: true")
    );
}

#[tokio::test]
async fn test_body_over_limit_is_file_too_large() {
    let app = test_app(sh("exit 1", &[])).await;
    let auth = bearer(&app, "user", Some("C1"));
    let oversized = vec![0u8; 10 * 1024 * 1024 + 200 * 1024];
    let body = multipart_body("file", "big.pdf", "application/pdf", &oversized);

    let (status, body) = send(&app, post("/api/upload", Some(&auth), body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "FILE_TOO_LARGE");
    assert!(app.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_returns_public_url() {
    let app = test_app_with(sh("exit 1", &[]), MemoryRecorder::default()).await;
    mount_store(&app.server).await;
    let auth = bearer(&app, "user", Some("C1"));
    let body = multipart_body("file", "informe.pdf", "application/pdf", b"%PDF-1.4 data");

    let (status, body) = send(&app, post("/api/upload", Some(&auth), body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let url = body["url"].as_str().unwrap();
    assert!(url.starts_with("https://"));
    assert!(url.contains("/file/compliance-docs/"));
    assert!(url.ends_with(".pdf"));
    assert_eq!(body.as_object().unwrap().len(), 2);

    let docs = app.recorder.docs();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].content_type, "application/pdf");
    assert_eq!(docs[0].url, url);
}

#[tokio::test]
async fn test_convert_returns_pdf_names_in_camel_case() {
    let app = test_app_with(sh(WRITE_PDF, &["{output}"]), MemoryRecorder::default()).await;
    mount_store(&app.server).await;
    let auth = bearer(&app, "user", Some("C1"));
    let jpeg = [&[0xFF, 0xD8, 0xFF, 0xE0][..], &[0u8; 10 * 1024]].concat();
    let body = multipart_body("file", "scan.jpg", "image/jpeg", &jpeg);

    let (status, body) = send(&app, post("/api/convert", Some(&auth), body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["originalName"], "scan.jpg");
    let pdf_name = body["pdfName"].as_str().unwrap();
    assert!(pdf_name.ends_with(".pdf"));
    assert!(pdf_name.trim_end_matches(".pdf").parse::<i64>().is_ok());
    assert!(body["url"].as_str().unwrap().ends_with(".pdf"));
    assert!(body.get("original_name").is_none());

    let docs = app.recorder.docs();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].original_name, "scan.jpg");
    assert_eq!(docs[0].content_type, "application/pdf");
    assert_eq!(docs[0].company_id.as_deref(), Some("C1"));
    assert_eq!(docs[0].uploader_uid, "uid-42");
    assert_eq!(std::fs::read_dir(&app.work).unwrap().count(), 0);
}
