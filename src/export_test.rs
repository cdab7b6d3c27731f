use super::*;
use crate::http::mock::{api_error, Method, MockApi};
use crate::project::test_project;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const STATUS_URL: &str = "https://api.test/v1/export/status/77";
const DOWNLOAD_URL: &str = "https://download.test/export-77.zip";

/// 状態を順に返すモック（尽きたら最後の状態を返し続ける）
fn status_sequence(statuses: &[&str]) -> Arc<MockApi> {
    let queue: Mutex<VecDeque<String>> =
        Mutex::new(statuses.iter().map(|s| s.to_string()).collect());
    let last = statuses.last().map(|s| s.to_string()).unwrap_or_default();

    let api = MockApi::new(move |call| match call.path.as_str() {
        "v1/export/project" => Ok(json!({ "exportStatusUrl": STATUS_URL })),
        STATUS_URL => {
            let status = queue.lock().unwrap().pop_front().unwrap_or_else(|| last.clone());
            let mut body = json!({ "status": status });
            if status == "finished" {
                body["downloadUrl"] = json!(DOWNLOAD_URL);
            }
            if status == "errored" {
                body["error"] = json!("disk quota exceeded");
            }
            Ok(body)
        }
        _ => Ok(json!({})),
    })
    .with_download(b"PK-archive");

    Arc::new(api)
}

fn status_checks(api: &MockApi) -> usize {
    api.calls_to(STATUS_URL).len()
}

#[tokio::test]
async fn test_start_sends_filter_options() {
    let api = status_sequence(&["started"]);
    let project = test_project(api.clone());
    let options = ExportOptions::full()
        .with_source_ids(vec![1, 2])
        .with_layers(vec!["Gold".to_string()]);

    let mut export = project.export(options);
    export.start().await.unwrap();

    assert_eq!(export.status_url(), Some(STATUS_URL));
    let body = api.calls_to("v1/export/project")[0].body.clone().unwrap();
    assert_eq!(body["projectIdentifier"], "contracts");
    assert_eq!(body["groupName"], "jdoe");
    assert_eq!(body["includeSchemas"], true);
    assert_eq!(body["includeSources"], true);
    assert_eq!(body["includeTextBounds"], true);
    assert_eq!(body["sourceIds"], json!([1, 2]));
    assert_eq!(body["annotationLayerNames"], json!(["Gold"]));
}

#[tokio::test]
async fn test_start_omits_unset_filters() {
    let api = status_sequence(&["started"]);
    let project = test_project(api.clone());

    project.export(ExportOptions::default()).start().await.unwrap();

    let body = api.calls_to("v1/export/project")[0].body.clone().unwrap();
    assert_eq!(body["includeSources"], false);
    assert!(body.get("sourceIds").is_none());
    assert!(body.get("annotationLayerNames").is_none());
}

#[tokio::test]
async fn test_start_without_status_url_fails() {
    let api = Arc::new(MockApi::new(|_| Ok(json!({ "message": "queued" }))));
    let project = test_project(api);

    let err = project.export(ExportOptions::full()).start().await.unwrap_err();
    assert!(matches!(err, AnnolabError::MissingStatusUrl(_)));
}

#[tokio::test]
async fn test_refresh_status_before_start_fails() {
    let api = status_sequence(&["started"]);
    let project = test_project(api.clone());

    let err = project
        .export(ExportOptions::full())
        .refresh_status()
        .await
        .unwrap_err();

    assert!(matches!(err, AnnolabError::ExportNotStarted));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_refresh_status_accepts_misspelled_initialized() {
    let api = status_sequence(&["initalized"]);
    let project = test_project(api);
    let mut export = project.export(ExportOptions::full());

    export.start().await.unwrap();
    let status = export.refresh_status().await.unwrap();

    assert_eq!(status, Some(ExportStatus::Initialized));
    assert!(export.download_url().is_none());
}

#[tokio::test]
async fn test_download_on_finish_polls_until_finished() {
    let dir = tempfile::TempDir::new().unwrap();
    let dest = dir.path().join("export.zip");
    let api = status_sequence(&["started", "started", "finished"]);
    let project = test_project(api.clone());

    let mut export = project.export(ExportOptions::full());
    let written = export
        .download_on_finish(&dest, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(status_checks(&api), 3);
    assert_eq!(written, 10);
    assert_eq!(std::fs::read(&dest).unwrap(), b"PK-archive");
    assert_eq!(export.last_status(), Some(ExportStatus::Finished));

    let downloads: Vec<_> = api
        .calls()
        .into_iter()
        .filter(|c| c.method == Method::Download)
        .collect();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].path, DOWNLOAD_URL);
}

#[tokio::test]
async fn test_download_on_finish_times_out_without_download() {
    let dir = tempfile::TempDir::new().unwrap();
    let dest = dir.path().join("export.zip");
    let api = status_sequence(&["started"]);
    let project = test_project(api.clone());

    let mut export = project
        .export(ExportOptions::full())
        .with_poll_interval(Duration::from_millis(10));
    let err = export
        .download_on_finish(&dest, Duration::from_millis(50))
        .await
        .unwrap_err();

    assert!(matches!(err, AnnolabError::TimedOut { .. }));
    assert!(status_checks(&api) >= 2);
    assert!(api.calls().iter().all(|c| c.method != Method::Download));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_download_on_finish_reports_errored_export() {
    let dir = tempfile::TempDir::new().unwrap();
    let api = status_sequence(&["started", "errored"]);
    let project = test_project(api.clone());

    let mut export = project.export(ExportOptions::full());
    let err = export
        .download_on_finish(dir.path().join("export.zip"), Duration::from_secs(5))
        .await
        .unwrap_err();

    match err {
        AnnolabError::ExportFailed(message) => assert_eq!(message, "disk quota exceeded"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(export.error(), Some("disk quota exceeded"));
    assert!(api.calls().iter().all(|c| c.method != Method::Download));
}

#[tokio::test]
async fn test_status_transport_error_propagates() {
    let api = Arc::new(MockApi::new(|call| match call.path.as_str() {
        "v1/export/project" => Ok(json!({ "exportStatusUrl": STATUS_URL })),
        _ => Err(api_error(500, "Internal Server Error")),
    }));
    let project = test_project(api);

    let err = project
        .export(ExportOptions::full())
        .download_on_finish("unused.zip", Duration::from_secs(5))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_download_on_finish_with_unbounded_timeout() {
    let dir = tempfile::TempDir::new().unwrap();
    let dest = dir.path().join("export.zip");
    let api = status_sequence(&["started", "finished"]);
    let project = test_project(api.clone());

    let written = project
        .export(ExportOptions::full())
        .download_on_finish(&dest, Duration::MAX)
        .await
        .unwrap();

    assert_eq!(written, 10);
    assert_eq!(status_checks(&api), 2);
}

#[tokio::test]
async fn test_unknown_status_keeps_polling() {
    let dir = tempfile::TempDir::new().unwrap();
    let dest = dir.path().join("export.zip");
    let api = status_sequence(&["queued", "finished"]);
    let project = test_project(api.clone());

    let mut export = project.export(ExportOptions::full());
    export.start().await.unwrap();
    assert_eq!(export.refresh_status().await.unwrap(), Some(ExportStatus::Unknown));

    export
        .download_on_finish(&dest, Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(status_checks(&api), 2);
    assert_eq!(export.last_status(), Some(ExportStatus::Finished));
    assert_eq!(std::fs::read(&dest).unwrap(), b"PK-archive");
}
