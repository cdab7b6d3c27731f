use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::import::ExportFileKind;

/// SDK統一エラー型
#[derive(Debug, Error)]
pub enum AnnolabError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{method} {path} failed: {message} (status: {status})")]
    Api {
        method: &'static str,
        path: String,
        status: u16,
        message: String,
    },

    #[error("{} missing from export (*.{}.jsonl). {}", .0.label(), .0.tag(), .0.hint())]
    MissingExportData(ExportFileKind),

    #[error("Export did not finish within {timeout:?}")]
    TimedOut { timeout: Duration },

    #[error("Unable to request export status. No status url. Start the export first")]
    ExportNotStarted,

    #[error("Export status url not returned with response: {0}")]
    MissingStatusUrl(String),

    #[error("Export finished without a download url")]
    MissingDownloadUrl,

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("Export archive has not been unpacked")]
    NotUnpacked,

    #[error("Invalid export archive: {0}")]
    InvalidArchive(String),

    #[error("Invalid record in {file:?} at line {line}: {message}")]
    InvalidRecord {
        file: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Unable to find text bounds for source {0}")]
    MissingTextBounds(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, AnnolabError>;

impl AnnolabError {
    /// リモート API が返したステータスコード
    pub fn status(&self) -> Option<u16> {
        match self {
            AnnolabError::Api { status, .. } => Some(*status),
            AnnolabError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// 既に存在するエンティティの作成（409 Conflict）かどうか
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16) -> AnnolabError {
        AnnolabError::Api {
            method: "POST",
            path: "v1/schema/create".to_string(),
            status,
            message: "Already exists".to_string(),
        }
    }

    #[test]
    fn test_is_conflict_409() {
        assert!(api_error(409).is_conflict());
    }

    #[test]
    fn test_is_conflict_other_status() {
        assert!(!api_error(400).is_conflict());
        assert!(!api_error(500).is_conflict());
        assert!(!AnnolabError::NotUnpacked.is_conflict());
    }

    #[test]
    fn test_api_error_display() {
        assert_eq!(
            api_error(409).to_string(),
            "POST v1/schema/create failed: Already exists (status: 409)"
        );
    }

    #[test]
    fn test_missing_export_data_names_file() {
        let err = AnnolabError::MissingExportData(ExportFileKind::Relations);
        let message = err.to_string();
        assert!(message.starts_with("Relations missing from export"));
        assert!(message.contains("*.relations.jsonl"));
    }
}
