//! End-to-end pipeline tests with a fake object store, `sh` converters and an
//! in-memory recorder.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use dossier_shared::{ConverterCommand, ConverterConfig, Identity, UploadConfig};
use serde_json::json;
use tempfile::TempDir;
use uuid::Uuid;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::{IngestionError, IngestionService, UploadRequest};
use crate::conversion::{ConversionError, FormatNormalizer};
use crate::document::{DocumentRecorder, DocumentStatus, NewDocument, RecorderError};
use crate::storage::{RetryPolicy, StorageClient, StorageConfig, content_sha1};

const SAMPLE_PDF: &[u8] = b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\ntrailer\n%%EOF\n";

#[derive(Default)]
struct MemoryRecorder {
    docs: Mutex<Vec<NewDocument>>,
    fail: bool,
}

impl MemoryRecorder {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn docs(&self) -> Vec<NewDocument> {
        self.docs.lock().unwrap().clone()
    }
}

impl DocumentRecorder for MemoryRecorder {
    async fn create(&self, doc: NewDocument) -> Result<Uuid, RecorderError> {
        self.docs.lock().unwrap().push(doc);
        if self.fail {
            return Err(RecorderError::store("insert timed out"));
        }
        Ok(Uuid::now_v7())
    }
}

struct Harness {
    server: MockServer,
    recorder: Arc<MemoryRecorder>,
    service: IngestionService<MemoryRecorder>,
    work: PathBuf,
    out: PathBuf,
    _root: TempDir,
}

fn sh(script: &str, args: &[&str]) -> ConverterCommand {
    let mut argv = vec!["-c".to_string(), script.to_string(), "sh".to_string()];
    argv.extend(args.iter().map(ToString::to_string));
    ConverterCommand::new("sh", argv)
}

fn identity(role: &str, company: Option<&str>) -> Identity {
    Identity {
        uid: "uid-42".to_string(),
        email: "ana@example.com".to_string(),
        role: role.to_string(),
        company_id: company.map(str::to_string),
    }
}

fn request(bytes: &[u8], name: &str, content_type: Option<&str>, who: Identity) -> UploadRequest {
    UploadRequest {
        bytes: Bytes::copy_from_slice(bytes),
        content_type: content_type.map(str::to_string),
        original_name: name.to_string(),
        identity: who,
    }
}

async fn harness_with(image: ConverterCommand, recorder: MemoryRecorder) -> Harness {
    let server = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let work = root.path().join("incoming");
    let out = root.path().join("converted");

    let storage = StorageClient::new(
        StorageConfig::new("key-id", "app-key", "compliance-docs")
            .with_auth_url(server.uri())
            .with_request_timeout(Duration::from_secs(5))
            .with_retry(RetryPolicy::none()),
    )
    .unwrap();

    let normalizer = FormatNormalizer::new(ConverterConfig {
        work_dir: work.clone(),
        output_dir: out.clone(),
        timeout_secs: 10,
        image,
        office: sh("exit 99", &[]),
    });

    let recorder = Arc::new(recorder);
    let service = IngestionService::new(
        Arc::new(storage),
        Arc::new(normalizer),
        Arc::clone(&recorder),
        UploadConfig {
            max_file_size: 64 * 1024,
            folder: "documents".to_string(),
        },
    );

    Harness {
        server,
        recorder,
        service,
        work,
        out,
        _root: root,
    }
}

async fn harness() -> Harness {
    harness_with(sh(r#"cp "$1" "$2""#, &["{input}", "{output}"]), MemoryRecorder::default()).await
}

async fn mount_store(server: &MockServer, upload: ResponseTemplate) {
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
        .respond_with(upload)
        .mount(server)
        .await;
}

fn uploaded() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "fileId": "4_z_file" }))
}

fn assert_empty(dir: &Path) {
    let count = std::fs::read_dir(dir).map(Iterator::count).unwrap_or(0);
    assert_eq!(count, 0, "leftover files in {}", dir.display());
}

async fn upload_requests(server: &MockServer) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/upload/bucket-1")
        .collect()
}

#[tokio::test]
async fn test_converted_upload_is_stored_as_pdf_and_recorded() {
    let h = harness().await;
    mount_store(&h.server, uploaded()).await;

    let outcome = h
        .service
        .handle_upload(
            request(SAMPLE_PDF, "scan.jpg", Some("image/jpeg"), identity("user", Some("C1"))),
            true,
        )
        .await
        .expect("upload succeeds");

    assert_eq!(outcome.stored.content_type, "application/pdf");
    assert!(outcome.stored.key.ends_with(".pdf"));
    assert_eq!(outcome.original_name, "scan.jpg");
    let pdf_name = outcome.pdf_name.expect("pdf name");
    let stem = pdf_name.strip_suffix(".pdf").unwrap();
    assert!(stem.parse::<i64>().is_ok(), "pdf name {pdf_name}");

    let uploads = upload_requests(&h.server).await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(
        uploads[0].headers.get("content-type").unwrap().to_str().unwrap(),
        "application/pdf"
    );
    assert_eq!(uploads[0].body, SAMPLE_PDF);

    let docs = h.recorder.docs();
    assert_eq!(docs.len(), 1);
    let doc = &docs[0];
    assert_eq!(doc.estado, DocumentStatus::PendingReview);
    assert_eq!(doc.estado.as_str(), "pendiente de revisión");
    assert_eq!(doc.company_id.as_deref(), Some("C1"));
    assert_eq!(doc.original_name, "scan.jpg");
    assert_eq!(doc.content_type, "application/pdf");
    assert_eq!(doc.url, outcome.stored.url);
    assert_eq!(doc.uploader_uid, "uid-42");
    assert_eq!(doc.content_sha1, content_sha1(SAMPLE_PDF));

    assert_empty(&h.work);
    assert_empty(&h.out);
}

#[tokio::test]
async fn test_privileged_uploader_records_no_company() {
    let h = harness().await;
    mount_store(&h.server, uploaded()).await;

    h.service
        .handle_upload(
            request(b"plain text", "notes.txt", Some("text/plain"), identity("admin", Some("C9"))),
            false,
        )
        .await
        .unwrap();

    let docs = h.recorder.docs();
    assert_eq!(docs[0].company_id, None);
    assert_eq!(docs[0].content_type, "text/plain");
}

#[tokio::test]
async fn test_direct_upload_keeps_declared_type_and_defaults_missing_one() {
    let h = harness().await;
    mount_store(&h.server, uploaded()).await;

    let declared = h
        .service
        .handle_upload(request(b"\x89PNG", "logo.png", Some("image/png"), identity("user", None)), false)
        .await
        .unwrap();
    let undeclared = h
        .service
        .handle_upload(request(b"blob", "blob", None, identity("user", None)), false)
        .await
        .unwrap();

    assert_eq!(declared.stored.content_type, "image/png");
    assert!(declared.stored.key.ends_with(".png"));
    assert_eq!(declared.pdf_name, None);
    assert_eq!(undeclared.stored.content_type, "application/octet-stream");
}

#[tokio::test]
async fn test_empty_payload_fails_before_any_io() {
    let h = harness().await;
    mount_store(&h.server, uploaded()).await;

    let err = h
        .service
        .handle_upload(request(b"", "scan.jpg", None, identity("user", None)), true)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestionError::MissingFile));
    assert!(h.server.received_requests().await.unwrap().is_empty());
    assert!(h.recorder.docs().is_empty());
    assert!(!h.work.exists());
}

#[tokio::test]
async fn test_oversized_payload_is_rejected() {
    let h = harness().await;
    mount_store(&h.server, uploaded()).await;

    let big = vec![b'x'; 64 * 1024 + 1];
    let err = h
        .service
        .handle_upload(request(&big, "big.pdf", None, identity("user", None)), false)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestionError::FileTooLarge { size, max } if size == 65_537 && max == 65_536));
    assert!(h.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_converter_failure_never_reaches_store() {
    let failing = sh("echo 'unsupported image' >&2; exit 1", &[]);
    let h = harness_with(failing, MemoryRecorder::default()).await;
    mount_store(&h.server, uploaded()).await;

    let err = h
        .service
        .handle_upload(request(b"jpeg", "scan.jpg", None, identity("user", None)), true)
        .await
        .unwrap_err();

    match err {
        IngestionError::Conversion(ConversionError::Failed { stderr, .. }) => {
            assert_eq!(stderr, "unsupported image");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.server.received_requests().await.unwrap().is_empty());
    assert!(h.recorder.docs().is_empty());
    assert_empty(&h.work);
    assert_empty(&h.out);
}

#[tokio::test]
async fn test_store_failure_skips_recorder_and_cleans_up() {
    let h = harness().await;
    mount_store(
        &h.server,
        ResponseTemplate::new(400).set_body_json(json!({
            "status": 400, "code": "bad_request", "message": "bucket is full"
        })),
    )
    .await;

    let err = h
        .service
        .handle_upload(request(SAMPLE_PDF, "scan.png", None, identity("user", None)), true)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestionError::Store(_)));
    assert!(err.to_string().contains("bucket is full"));
    assert!(h.recorder.docs().is_empty());
    assert_empty(&h.work);
    assert_empty(&h.out);
}

#[tokio::test]
async fn test_recorder_failure_deletes_stored_object() {
    let h = harness_with(
        sh(r#"cp "$1" "$2""#, &["{input}", "{output}"]),
        MemoryRecorder::failing(),
    )
    .await;
    mount_store(&h.server, uploaded()).await;
    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_delete_file_version"))
        .and(header("Authorization", "acct-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "fileId": "4_z_file" })))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h
        .service
        .handle_upload(request(b"data", "a.pdf", Some("application/pdf"), identity("user", None)), false)
        .await
        .unwrap_err();

    match err {
        IngestionError::Recorder { orphan_removed, .. } => assert!(orphan_removed),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(upload_requests(&h.server).await.len(), 1);
}

#[tokio::test]
async fn test_failed_compensation_is_reported() {
    let h = harness_with(
        sh(r#"cp "$1" "$2""#, &["{input}", "{output}"]),
        MemoryRecorder::failing(),
    )
    .await;
    mount_store(&h.server, uploaded()).await;
    Mock::given(method("POST"))
        .and(path("/b2api/v2/b2_delete_file_version"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;

    let err = h
        .service
        .handle_upload(request(b"data", "a.pdf", None, identity("user", None)), false)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestionError::Recorder {
            orphan_removed: false,
            ..
        }
    ));
}
