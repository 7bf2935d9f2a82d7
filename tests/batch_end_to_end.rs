// tests/batch_end_to_end.rs
// Drives the orchestrator against a mocked processing service over HTTP.

use devicebatch::batch::{BatchOrchestrator, FileStatus, JobPhase, OrchestratorConfig, PollConfig, ProcessMode};
use devicebatch::devices::{render_pipe, DeviceList, EditIntent, Position};
use devicebatch::service::HttpProcessingClient;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_csvs(dir: &Path) -> Vec<PathBuf> {
    ["a.csv", "b.csv", "c.csv"]
        .iter()
        .map(|name| {
            let p = dir.join(name);
            std::fs::write(&p, "sku,device\n1,x\n").unwrap();
            p
        })
        .collect()
}

fn config(download_dir: &Path) -> OrchestratorConfig {
    OrchestratorConfig {
        poll: PollConfig {
            interval: Duration::from_millis(20),
            max_duration: Duration::from_secs(10),
        },
        download_dir: download_dir.to_path_buf(),
        ..OrchestratorConfig::default()
    }
}

async fn mount_upload(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/batch-upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "batch_id": "b1",
            "uploaded_files": [
                {"file_id": "f1", "filename": "s_a.csv", "original_name": "a.csv", "devices": ["A", "B"]},
                {"file_id": "f2", "filename": "s_b.csv", "original_name": "b.csv", "devices": ["A", "B"]},
                {"file_id": "f3", "filename": "s_c.csv", "original_name": "c.csv", "devices": ["C", "D"]}
            ],
            "errors": []
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_submit(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/batch-process"))
        .and(body_string_contains("process_mode=different_devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_status(server: &MockServer, statuses: [&str; 3]) {
    let files: Vec<_> = ["f1", "f2", "f3"]
        .iter()
        .zip(statuses)
        .map(|(id, status)| json!({"file_id": id, "status": status, "progress": 100.0}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/batch-status/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "files": files
        })))
        .mount(server)
        .await;
}

fn add_e_at_end() -> EditIntent {
    EditIntent::Positional {
        add: DeviceList::from_names(["E"]).unwrap().into_vec(),
        remove: vec![],
        position: Position::End,
    }
}

#[tokio::test]
async fn test_different_device_groups_complete() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_submit(&server).await;
    mount_status(&server, ["completed", "completed", "completed"]).await;
    Mock::given(method("GET"))
        .and(path("/api/batch-download/b1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK-archive".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let inputs = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let paths = write_csvs(inputs.path());
    let orchestrator = BatchOrchestrator::new(
        Arc::new(HttpProcessingClient::new(&server.uri())),
        config(downloads.path()),
    );

    let draft = orchestrator.collect(&paths).unwrap();
    let job = orchestrator.upload(&draft).await.unwrap();
    assert_eq!(job.phase, JobPhase::Configuring);
    assert_eq!(job.groups.len(), 2);
    assert_eq!(job.effective_mode(), ProcessMode::DifferentDevices);

    let intent = add_e_at_end();
    let previews = orchestrator.preview(&job, &intent, ProcessMode::Auto);
    let rendered: Vec<String> = previews
        .iter()
        .map(|p| render_pipe(p.result.as_ref().unwrap().final_order.as_slice()))
        .collect();
    assert_eq!(rendered, vec!["A|B|E", "C|D|E"]);

    let job = orchestrator.configure(&job, intent, ProcessMode::Auto).unwrap();
    let job = orchestrator.submit(&job).await.unwrap();
    assert_eq!(job.phase, JobPhase::Polling);

    let mut handle = orchestrator.start_polling(&job).unwrap();
    let job = orchestrator.track(job, &mut handle).await.unwrap();
    handle.shutdown().await;

    assert_eq!(job.phase, JobPhase::Completed);
    assert!(job.files.iter().all(|f| f.status == FileStatus::Completed && f.progress == 100));

    let saved = orchestrator.download_all(&job.batch_id).await.unwrap();
    assert_eq!(saved, downloads.path().join("batch_b1_results.zip"));
    assert_eq!(std::fs::read(&saved).unwrap(), b"PK-archive");
}

#[tokio::test]
async fn test_one_failed_file_is_partial_failure() {
    let server = MockServer::start().await;
    mount_upload(&server).await;
    mount_submit(&server).await;
    mount_status(&server, ["completed", "error", "completed"]).await;

    let inputs = tempfile::tempdir().unwrap();
    let downloads = tempfile::tempdir().unwrap();
    let paths = write_csvs(inputs.path());
    let orchestrator = BatchOrchestrator::new(
        Arc::new(HttpProcessingClient::new(&server.uri())),
        config(downloads.path()),
    );

    let job = orchestrator
        .run(&paths, add_e_at_end(), ProcessMode::Auto)
        .await
        .unwrap();

    assert_eq!(job.phase, JobPhase::PartiallyFailed);
    let summary = job.summary();
    assert_eq!(summary.success_count, 2);
    assert_eq!(summary.fail_count, 1);
}

#[tokio::test]
async fn test_rejected_upload_creates_no_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/batch-upload"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "disk full"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/batch-process"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let inputs = tempfile::tempdir().unwrap();
    let paths = write_csvs(inputs.path());
    let orchestrator = BatchOrchestrator::new(
        Arc::new(HttpProcessingClient::new(&server.uri())),
        config(inputs.path()),
    );

    let err = orchestrator
        .run(&paths, add_e_at_end(), ProcessMode::Auto)
        .await
        .unwrap_err();
    assert!(err.is_nothing_happened());
    assert!(err.to_string().contains("disk full"));
}
