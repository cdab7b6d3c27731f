//! AnnoLab クライアント SDK
//!
//! プロジェクト作成、ソースのアップロード、アノテーション／リレーションの一括登録、
//! プロジェクトのエクスポート／インポートを提供する。
//!
//! ```ignore
//! use annolab::{AnnoLab, ClientConfig, ExportOptions};
//! use std::time::Duration;
//!
//! let lab = AnnoLab::connect(ClientConfig::from_env()).await?;
//! let project = lab.find_project("contracts", None).await?;
//!
//! let mut export = project.export(ExportOptions::full());
//! export.download_on_finish("contracts.zip", Duration::from_secs(3600)).await?;
//!
//! let target = lab.create_project("contracts-copy", None).await?;
//! let summary = target.import_archive("contracts.zip").run().await?;
//! ```

pub mod client;
pub mod config;
pub mod endpoints;
pub mod env;
pub mod error;
pub mod export;
pub mod http;
pub mod import;
pub mod mapper;
pub mod project;

pub use client::{AnnoLab, ApiKeyInfo, Group};
pub use config::ClientConfig;
pub use error::{AnnolabError, Result};
pub use export::{ExportOptions, ExportStatus, ProjectExport};
pub use http::{ApiTransport, HttpClient};
pub use import::{ExportFileKind, ImportSummary, ProjectImport};
pub use mapper::{AnnotationInput, Identifier, RelationInput};
pub use project::{AnnotationTypeSpec, CreatedAnnotation, PdfSourceOptions, Project};
