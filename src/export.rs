//! プロジェクトのエクスポート
//!
//! サーバー側のエクスポートジョブを開始し、終了状態になるまで状態をポーリングして、
//! 結果のアーカイブをファイルへストリーム保存する。

use crate::endpoints;
use crate::error::{AnnolabError, Result};
use crate::project::Project;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

/// エクスポートジョブの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    /// サーバーは "initalized" と綴ることがある
    #[serde(alias = "initalized")]
    Initialized,
    Started,
    Errored,
    Finished,
    /// 未知の状態（終了状態ではないものとして扱う）
    #[serde(other)]
    Unknown,
}

impl ExportStatus {
    /// 終了状態かどうか
    pub fn is_terminal(self) -> bool {
        matches!(self, ExportStatus::Finished | ExportStatus::Errored)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExportStatus::Initialized => "initialized",
            ExportStatus::Started => "started",
            ExportStatus::Errored => "errored",
            ExportStatus::Finished => "finished",
            ExportStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// エクスポート対象の絞り込み
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub source_ids: Option<Vec<i64>>,
    pub layers: Option<Vec<String>>,
    pub include_schemas: bool,
    pub include_sources: bool,
    pub include_text_bounds: bool,
}

impl ExportOptions {
    /// インポートに必要なデータをすべて含める
    pub fn full() -> Self {
        Self {
            include_schemas: true,
            include_sources: true,
            include_text_bounds: true,
            ..Self::default()
        }
    }

    pub fn with_source_ids(mut self, ids: Vec<i64>) -> Self {
        self.source_ids = Some(ids);
        self
    }

    pub fn with_layers(mut self, layers: Vec<String>) -> Self {
        self.layers = Some(layers);
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusPayload {
    #[serde(default)]
    status: Option<ExportStatus>,
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

/// エクスポートジョブ
pub struct ProjectExport<'p> {
    project: &'p Project,
    options: ExportOptions,
    poll_interval: Duration,
    status_url: Option<String>,
    last_status: Option<ExportStatus>,
    download_url: Option<String>,
    error: Option<String>,
}

impl<'p> ProjectExport<'p> {
    pub fn new(project: &'p Project, options: ExportOptions) -> Self {
        Self {
            project,
            poll_interval: project.config().poll_interval,
            options,
            status_url: None,
            last_status: None,
            download_url: None,
            error: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn status_url(&self) -> Option<&str> {
        self.status_url.as_deref()
    }

    pub fn last_status(&self) -> Option<ExportStatus> {
        self.last_status
    }

    pub fn download_url(&self) -> Option<&str> {
        self.download_url.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn request_body(&self) -> Value {
        let mut body = json!({
            "projectIdentifier": self.project.name(),
            "groupName": self.project.owner_name(),
            "includeSchemas": self.options.include_schemas,
            "includeSources": self.options.include_sources,
            "includeTextBounds": self.options.include_text_bounds,
        });

        if let Some(ids) = &self.options.source_ids {
            body["sourceIds"] = json!(ids);
        }
        if let Some(layers) = &self.options.layers {
            body["annotationLayerNames"] = json!(layers);
        }
        body
    }

    /// エクスポートを開始し、状態確認用 URL を記録する
    pub async fn start(&mut self) -> Result<()> {
        let body = self.request_body();
        let response = self
            .project
            .api()
            .post(endpoints::export::project(), Some(&body), &[])
            .await?;

        let status_url = response
            .get("exportStatusUrl")
            .and_then(Value::as_str)
            .ok_or_else(|| AnnolabError::MissingStatusUrl(response.to_string()))?;

        tracing::info!("Started export of {}", self.project.project_path());
        self.status_url = Some(status_url.to_string());
        Ok(())
    }

    /// 現在の状態を取得して更新する
    pub async fn refresh_status(&mut self) -> Result<Option<ExportStatus>> {
        let status_url = self.status_url.as_deref().ok_or(AnnolabError::ExportNotStarted)?;

        let response = self.project.api().get(status_url, None).await?;
        let payload: StatusPayload = serde_json::from_value(response)?;

        if let Some(status) = payload.status {
            self.last_status = Some(status);
        }

        match self.last_status {
            Some(ExportStatus::Finished) => self.download_url = payload.download_url,
            Some(ExportStatus::Errored) => {
                self.error = payload.error.map(|e| match e {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
            }
            _ => {}
        }

        tracing::debug!("Export status: {:?}", self.last_status);
        Ok(self.last_status)
    }

    /// 終了状態になるまでポーリングする
    ///
    /// `timeout` を過ぎても終了しなければ `TimedOut`。
    pub async fn wait_for_completion(&mut self, timeout: Duration) -> Result<ExportStatus> {
        if self.status_url.is_none() {
            self.start().await?;
        }

        // 表現できないほど長い timeout は期限なしとみなす
        let deadline = Instant::now().checked_add(timeout);

        loop {
            if let Some(status) = self.refresh_status().await? {
                if status.is_terminal() {
                    return Ok(status);
                }
            }

            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::warn!("Export did not finish within {:?}", timeout);
                        return Err(AnnolabError::TimedOut { timeout });
                    }
                    self.poll_interval.min(deadline - now)
                }
                None => self.poll_interval,
            };
            tokio::time::sleep(wait).await;
        }
    }

    /// 完了を待ってからアーカイブを `path` にダウンロードする
    ///
    /// 未開始ならエクスポートを開始する。書き込んだバイト数を返す。
    pub async fn download_on_finish(&mut self, path: impl AsRef<Path>, timeout: Duration) -> Result<u64> {
        match self.wait_for_completion(timeout).await? {
            ExportStatus::Errored => {
                let message = self.error.clone().unwrap_or_else(|| "unknown error".to_string());
                Err(AnnolabError::ExportFailed(message))
            }
            _ => {
                let url = self.download_url.as_deref().ok_or(AnnolabError::MissingDownloadUrl)?;
                let path = path.as_ref();

                let written = self.project.api().download(url, path).await?;
                tracing::info!("Export saved to {} ({} bytes)", path.display(), written);
                Ok(written)
            }
        }
    }
}

#[cfg(test)]
#[path = "export_test.rs"]
mod tests;
