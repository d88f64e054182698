//! Tests for the push pipeline

use super::*;
use crate::config::ClientConfig;
use crate::error::Error;
use crate::progress::PushStage;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;
use test_case::test_case;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingObserver {
    stages: Mutex<Vec<PushStage>>,
}

impl RecordingObserver {
    fn stages(&self) -> Vec<PushStage> {
        self.stages.lock().unwrap().clone()
    }

    fn serialized_path(&self) -> Option<PathBuf> {
        self.stages().into_iter().find_map(|stage| match stage {
            PushStage::Serialized { path, .. } => Some(path),
            _ => None,
        })
    }
}

impl ProgressObserver for RecordingObserver {
    fn on_stage(&self, _table: &TableRef, stage: &PushStage) {
        self.stages.lock().unwrap().push(stage.clone());
    }
}

struct Harness {
    server: MockServer,
    pipeline: PushPipeline,
    observer: Arc<RecordingObserver>,
    _dir: TempDir,
}

async fn harness() -> Harness {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .temp_dir(dir.path())
        .batch_size(2)
        .build();
    let observer = Arc::new(RecordingObserver::default());
    let pipeline = PushPipeline::new(ApiClient::new(Arc::new(config)).unwrap())
        .with_observer(observer.clone());
    Harness {
        server,
        pipeline,
        observer,
        _dir: dir,
    }
}

async fn mount(server: &MockServer, verb: &str, route: &str, status: u16) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

async fn mount_upload_target(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v1/presigned-upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "presignedUrl": format!("{}/storage/object", server.uri()),
            "key": "uploads/object.parquet"
        })))
        .mount(server)
        .await;
}

async fn mount_happy_path(server: &MockServer) {
    mount(server, "POST", "/v1/databases", 200).await;
    mount(server, "POST", "/v1/query", 200).await;
    mount_upload_target(server).await;
    mount(server, "PUT", "/storage/object", 200).await;
    mount(server, "POST", "/v1/tables/s3_parquet_import", 200).await;
    mount(
        server,
        "POST",
        "/v1/tables/s3_parquet_import_append_only_dedupe",
        200,
    )
    .await;
    mount(server, "DELETE", "/v1/files", 200).await;
}

/// Requests the server saw, as `METHOD path` with the SQL verb for queries
async fn request_log(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| {
            let route = format!("{} {}", r.method, r.url.path());
            if r.url.path() == "/v1/query" {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                let sql = body["sql"].as_str().unwrap_or_default();
                let verb: Vec<&str> = sql.split_whitespace().take(2).collect();
                format!("{route} {}", verb.join(" "))
            } else {
                route
            }
        })
        .collect()
}

fn students() -> Vec<Record> {
    vec![
        Record::new().with("id", 1).with("name", "Alice"),
        Record::new().with("id", 2).with("name", "Bob"),
        Record::new().with("id", 3).with("name", "Carol"),
    ]
}

fn table() -> TableRef {
    TableRef::parse("students").unwrap()
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn test_default_options() {
    let options = PushOptions::new();
    assert!(options.create_if_missing);
    assert!(!options.replace_if_exists);
    assert!(!options.dedupe_on_append);
    assert!(options.prepares_table());
    assert_eq!(options.import_mode(), ImportMode::Plain);
}

#[test]
fn test_replace_implies_table_preparation() {
    let options = PushOptions::new().no_create().replace();
    assert!(options.prepares_table());
    assert!(!PushOptions::new().no_create().prepares_table());
}

#[test]
fn test_options_from_yaml() {
    let options: PushOptions =
        serde_yaml::from_str("dedupe_on_append: true\nprimary_key_columns: [id]\n").unwrap();
    assert_eq!(options, PushOptions::new().dedupe_on(["id"]));
    assert_eq!(options.import_mode(), ImportMode::Dedup);
}

#[test_case(Vec::new(), PushOptions::new() ; "empty record set")]
#[test_case(vec![Record::new()], PushOptions::new() ; "sample without fields")]
#[test_case(students(), PushOptions::new().dedupe_on(Vec::<String>::new()) ; "dedup without key")]
#[test_case(students(), PushOptions::new().dedupe_on(["email"]) ; "key not in records")]
fn test_validate_rejects(records: Vec<Record>, options: PushOptions) {
    let err = options.validate(&records).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }), "{err}");
}

#[test]
fn test_validate_accepts_key_in_sample() {
    PushOptions::new()
        .dedupe_on(["id"])
        .validate(&students())
        .unwrap();
}

// ============================================================================
// Pipeline ordering
// ============================================================================

#[tokio::test]
async fn test_push_creates_then_imports() {
    let h = harness().await;
    mount_happy_path(&h.server).await;

    let summary = h
        .pipeline
        .run(&table(), &students(), &PushOptions::new(), "st_tok")
        .await
        .unwrap();

    assert_eq!(summary.rows, 3);
    assert_eq!(summary.mode, ImportMode::Plain);
    assert_eq!(summary.staged_key, "uploads/object.parquet");
    assert_eq!(
        request_log(&h.server).await,
        vec![
            "POST /v1/databases",
            "POST /v1/query CREATE SCHEMA",
            "POST /v1/query CREATE TABLE",
            "GET /v1/presigned-upload",
            "PUT /storage/object",
            "POST /v1/tables/s3_parquet_import",
            "DELETE /v1/files",
        ]
    );
}

#[tokio::test]
async fn test_push_replace_drops_before_create() {
    let h = harness().await;
    mount_happy_path(&h.server).await;

    h.pipeline
        .run(&table(), &students(), &PushOptions::new().replace(), "st_tok")
        .await
        .unwrap();

    let log = request_log(&h.server).await;
    assert_eq!(
        &log[..4],
        &[
            "POST /v1/databases",
            "POST /v1/query CREATE SCHEMA",
            "POST /v1/query DROP TABLE",
            "POST /v1/query CREATE TABLE",
        ]
    );
}

#[tokio::test]
async fn test_push_without_create_skips_ddl() {
    let h = harness().await;
    mount_happy_path(&h.server).await;

    h.pipeline
        .run(&table(), &students(), &PushOptions::new().no_create(), "st_tok")
        .await
        .unwrap();

    let log = request_log(&h.server).await;
    assert_eq!(log[0], "GET /v1/presigned-upload");
    assert!(!log.iter().any(|r| r.contains("/v1/databases")));
    assert!(!h.observer.stages().contains(&PushStage::TableReady));
}

#[tokio::test]
async fn test_push_dedup_uses_dedup_import() {
    let h = harness().await;
    mount_happy_path(&h.server).await;

    let summary = h
        .pipeline
        .run(
            &table(),
            &students(),
            &PushOptions::new().dedupe_on(["id"]),
            "st_tok",
        )
        .await
        .unwrap();

    assert_eq!(summary.mode, ImportMode::Dedup);
    let requests = h.server.received_requests().await.unwrap();
    let import = requests
        .iter()
        .find(|r| r.url.path() == "/v1/tables/s3_parquet_import_append_only_dedupe")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&import.body).unwrap();
    assert_eq!(body["primary_key_columns"], serde_json::json!(["id"]));
    assert_eq!(body["table_name"], "duckdb.main.students");
}

#[tokio::test]
async fn test_invalid_push_makes_no_request() {
    let h = harness().await;

    let err = h
        .pipeline
        .run(&table(), &[], &PushOptions::new(), "st_tok")
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert!(h.server.received_requests().await.unwrap().is_empty());
}

// ============================================================================
// Cleanup
// ============================================================================

#[tokio::test]
async fn test_success_reports_stages_and_removes_local_file() {
    let h = harness().await;
    mount_happy_path(&h.server).await;

    h.pipeline
        .run(&table(), &students(), &PushOptions::new(), "st_tok")
        .await
        .unwrap();

    let stages = h.observer.stages();
    assert_eq!(stages.first(), Some(&PushStage::TableReady));
    assert_eq!(stages.last(), Some(&PushStage::CleanedUp));
    assert!(stages.contains(&PushStage::Imported { rows: 3 }));

    let local = h.observer.serialized_path().unwrap();
    assert!(!local.exists());
}

#[tokio::test]
async fn test_upload_failure_removes_local_file_and_skips_import() {
    let h = harness().await;
    mount(&h.server, "POST", "/v1/databases", 200).await;
    mount(&h.server, "POST", "/v1/query", 200).await;
    mount_upload_target(&h.server).await;
    mount(&h.server, "PUT", "/storage/object", 500).await;

    let err = h
        .pipeline
        .run(&table(), &students(), &PushOptions::new(), "st_tok")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Upload { .. }), "{err}");
    let local = h.observer.serialized_path().unwrap();
    assert!(!local.exists());

    let log = request_log(&h.server).await;
    assert!(!log.iter().any(|r| r.contains("s3_parquet_import")));
    assert!(!log.iter().any(|r| r.starts_with("DELETE")));
}

#[tokio::test]
async fn test_import_failure_still_deletes_staged_object() {
    let h = harness().await;
    mount(&h.server, "POST", "/v1/databases", 200).await;
    mount(&h.server, "POST", "/v1/query", 200).await;
    mount_upload_target(&h.server).await;
    mount(&h.server, "PUT", "/storage/object", 200).await;
    mount(&h.server, "POST", "/v1/tables/s3_parquet_import", 500).await;
    mount(&h.server, "DELETE", "/v1/files", 200).await;

    let err = h
        .pipeline
        .run(&table(), &students(), &PushOptions::new(), "st_tok")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("duckdb.main.students"));
    assert_eq!(
        request_log(&h.server).await.last().map(String::as_str),
        Some("DELETE /v1/files")
    );
    assert!(!h.observer.serialized_path().unwrap().exists());
}

#[tokio::test]
async fn test_failed_staged_delete_does_not_mask_success() {
    let h = harness().await;
    mount(&h.server, "POST", "/v1/databases", 200).await;
    mount(&h.server, "POST", "/v1/query", 200).await;
    mount_upload_target(&h.server).await;
    mount(&h.server, "PUT", "/storage/object", 200).await;
    mount(&h.server, "POST", "/v1/tables/s3_parquet_import", 200).await;
    mount(&h.server, "DELETE", "/v1/files", 503).await;

    let summary = h
        .pipeline
        .run(&table(), &students(), &PushOptions::new(), "st_tok")
        .await
        .unwrap();
    assert_eq!(summary.rows, 3);
}

#[tokio::test]
async fn test_heterogeneous_records_fail_before_upload() {
    let h = harness().await;
    mount_happy_path(&h.server).await;

    let records = vec![
        Record::new().with("id", 1).with("name", "Alice"),
        Record::new().with("id", 2).with("email", "bob@example.com"),
    ];
    let err = h
        .pipeline
        .run(&table(), &records, &PushOptions::new().no_create(), "st_tok")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Serialization { .. }), "{err}");
    assert!(h.server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_refused_with_401_is_deferred_until_new_token() {
    let h = harness().await;
    mount(&h.server, "POST", "/v1/databases", 200).await;
    mount(&h.server, "POST", "/v1/query", 200).await;
    mount_upload_target(&h.server).await;
    mount(&h.server, "PUT", "/storage/object", 200).await;
    mount(&h.server, "POST", "/v1/tables/s3_parquet_import", 401).await;
    Mock::given(method("DELETE"))
        .and(path("/v1/files"))
        .and(wiremock::matchers::header("Authorization", "Bearer st_new"))
        .respond_with(ResponseTemplate::new(200))
        .with_priority(1)
        .expect(1)
        .mount(&h.server)
        .await;
    mount(&h.server, "DELETE", "/v1/files", 401).await;

    let pending = PendingDeletes::default();
    let err = h
        .pipeline
        .run_tracked(&table(), &students(), &PushOptions::new(), "st_old", &pending)
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(pending.keys().await, vec!["uploads/object.parquet"]);
    assert!(!h.observer.serialized_path().unwrap().exists());

    h.pipeline.delete_pending(&pending, "st_new").await.unwrap();
    assert!(pending.is_empty().await);
}

#[tokio::test]
async fn test_delete_pending_keeps_keys_still_refused() {
    let h = harness().await;
    mount(&h.server, "DELETE", "/v1/files", 401).await;

    let pending = PendingDeletes::default();
    pending.push("a.parquet").await;
    pending.push("b.parquet").await;

    let err = h
        .pipeline
        .delete_pending(&pending, "st_old")
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(pending.keys().await, vec!["a.parquet", "b.parquet"]);
}

#[tokio::test]
async fn test_writer_config_controls_compression() {
    use parquet::basic::Compression;
    use parquet::file::reader::{FileReader, SerializedFileReader};

    let h = harness().await;
    mount_happy_path(&h.server).await;
    let pipeline = h
        .pipeline
        .clone()
        .with_writer_config(ParquetWriterConfig::new().uncompressed());

    pipeline
        .run(&table(), &students(), &PushOptions::new().no_create(), "st_tok")
        .await
        .unwrap();

    let requests = h.server.received_requests().await.unwrap();
    let upload = requests.iter().find(|r| r.method.as_str() == "PUT").unwrap();
    let reader = SerializedFileReader::new(bytes::Bytes::from(upload.body.clone())).unwrap();
    assert_eq!(
        reader.metadata().row_group(0).column(0).compression(),
        Compression::UNCOMPRESSED
    );
}
