//! プロジェクト単位の操作

use crate::config::ClientConfig;
use crate::endpoints;
use crate::error::{AnnolabError, Result};
use crate::export::{ExportOptions, ProjectExport};
use crate::http::ApiTransport;
use crate::import::ProjectImport;
use crate::mapper::{to_wire_annotation, to_wire_relation, AnnotationInput, Identifier, RelationInput};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_DIRECTORY: &str = "Uploads";

/// API が返すプロジェクト情報
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord {
    name: String,
    id: i64,
    group_name: String,
    group_id: i64,
    #[serde(default)]
    default_directory: Option<String>,
}

/// 一括作成で返るアノテーション
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAnnotation {
    pub id: Identifier,
    #[serde(default)]
    pub client_id: Option<Identifier>,
}

/// PDF ソース作成時のオプション
#[derive(Debug, Clone, Default)]
pub struct PdfSourceOptions {
    /// 省略時はプロジェクトのデフォルトディレクトリ
    pub directory: Option<String>,
    pub ocr: Option<bool>,
    pub source_text: Option<String>,
    pub text_bounds: Option<Value>,
}

/// アノテーションタイプの定義
#[derive(Debug, Clone, Default)]
pub struct AnnotationTypeSpec {
    pub name: String,
    pub color: Option<String>,
    pub is_relation: bool,
    pub is_document_classification: bool,
    pub schema: Option<String>,
}

/// プロジェクト
pub struct Project {
    name: String,
    id: i64,
    owner_name: String,
    owner_id: i64,
    default_directory: String,
    api: Arc<dyn ApiTransport>,
    config: Arc<ClientConfig>,
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("owner_name", &self.owner_name)
            .field("default_directory", &self.default_directory)
            .finish()
    }
}

impl Project {
    /// API レスポンスから作成
    pub(crate) fn from_response(
        value: Value,
        api: Arc<dyn ApiTransport>,
        config: Arc<ClientConfig>,
    ) -> Result<Self> {
        let record: ProjectRecord = serde_json::from_value(value)?;

        Ok(Self {
            name: record.name,
            id: record.id,
            owner_name: record.group_name,
            owner_id: record.group_id,
            default_directory: record
                .default_directory
                .unwrap_or_else(|| DEFAULT_DIRECTORY.to_string()),
            api,
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn owner_id(&self) -> i64 {
        self.owner_id
    }

    pub fn default_directory(&self) -> &str {
        &self.default_directory
    }

    /// "owner/project" 形式のパス
    pub fn project_path(&self) -> String {
        format!("{}/{}", self.owner_name, self.name)
    }

    pub(crate) fn api(&self) -> &dyn ApiTransport {
        self.api.as_ref()
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn directory_or_default<'a>(&'a self, directory: Option<&'a str>) -> &'a str {
        directory.unwrap_or(&self.default_directory)
    }

    /// ソースを名前（とディレクトリ）で検索
    pub async fn find_source(&self, name: &str, directory: Option<&str>) -> Result<Value> {
        let path = endpoints::source::by_path(
            &self.owner_name,
            &self.name,
            self.directory_or_default(directory),
            name,
        );
        self.api.get(&path, None).await
    }

    /// テキストソースを作成
    pub async fn create_text_source(
        &self,
        name: &str,
        text: &str,
        directory: Option<&str>,
    ) -> Result<Value> {
        let mut body = json!({
            "projectIdentifier": self.id,
            "groupName": self.owner_name,
            "sourceName": name,
            "text": text,
        });
        if let Some(directory) = directory {
            body["directoryIdentifier"] = json!(directory);
        }

        self.api
            .post(endpoints::source::create_text(), Some(&body), &[])
            .await
    }

    /// PDF ソースを作成
    ///
    /// init-pdf で署名付き URL を取得し、PDF を PUT してから create-pdf を呼ぶ。
    pub async fn create_pdf_source(
        &self,
        name: &str,
        content: Vec<u8>,
        options: &PdfSourceOptions,
    ) -> Result<Value> {
        let directory = self.directory_or_default(options.directory.as_deref());

        let init_body = json!({
            "projectIdentifier": self.id,
            "groupName": self.owner_name,
            "directoryIdentifier": directory,
            "sourceName": name,
        });
        let init = self
            .api
            .post(endpoints::source::init_pdf(), Some(&init_body), &[])
            .await?;

        let upload_url = init
            .get("uploadUrl")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AnnolabError::InvalidArgument(format!("init-pdf returned no uploadUrl: {}", init))
            })?;

        self.api
            .put(upload_url, content, &[("Content-Type", "application/pdf")], &[])
            .await?;

        let mut body = json!({
            "projectIdentifier": self.id,
            "groupName": self.owner_name,
            "directoryIdentifier": directory,
            "sourceIdentifier": name,
        });
        if let Some(ocr) = options.ocr {
            body["ocr"] = json!(ocr);
        }
        if let Some(text) = &options.source_text {
            body["sourceText"] = json!(text);
        }
        if let Some(bounds) = &options.text_bounds {
            body["textBounds"] = bounds.clone();
        }

        self.api
            .post(endpoints::source::create_pdf(), Some(&body), &[])
            .await
    }

    /// ローカルの PDF ファイルからソースを作成（名前の省略時はファイル名）
    pub async fn create_pdf_source_from_file(
        &self,
        path: &Path,
        name: Option<&str>,
        options: &PdfSourceOptions,
    ) -> Result<Value> {
        let name = match name {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| {
                    AnnolabError::InvalidArgument(format!("no file name in {:?}", path))
                })?,
        };

        let content = tokio::fs::read(path).await?;
        self.create_pdf_source(&name, content, options).await
    }

    /// Web 上の PDF を取得してソースを作成（名前の省略時は URL の末尾）
    ///
    /// 2xx 以外の応答はエラーとなり、ソースは作成しない。
    pub async fn create_pdf_source_from_web(
        &self,
        url: &str,
        name: Option<&str>,
        options: &PdfSourceOptions,
    ) -> Result<Value> {
        let name = match name {
            Some(name) => name.to_string(),
            None => file_name_from_url(url)?,
        };

        let staging = tempfile::TempDir::new()?;
        let dest = staging.path().join("source.pdf");
        self.api.download(url, &dest).await?;
        let content = tokio::fs::read(&dest).await?;

        self.create_pdf_source(&name, content, options).await
    }

    /// ソースにアノテーション（とリレーション）を作成
    pub async fn create_annotations(
        &self,
        source_name: &str,
        annotations: &[AnnotationInput],
        relations: &[RelationInput],
        dedup: bool,
        directory: Option<&str>,
    ) -> Result<Value> {
        let path = endpoints::source::annotations(
            &self.owner_name,
            &self.name,
            self.directory_or_default(directory),
            source_name,
        );

        let body = json!({
            "annotations": annotations.iter().map(to_wire_annotation).collect::<Vec<_>>(),
            "relations": relations.iter().map(to_wire_relation).collect::<Vec<_>>(),
            "preventDuplication": dedup,
        });

        self.api.post(&path, Some(&body), &[]).await
    }

    /// アノテーションを一括作成
    pub async fn create_bulk_annotations(
        &self,
        annotations: &[AnnotationInput],
        dedup: bool,
    ) -> Result<Vec<CreatedAnnotation>> {
        let body = json!({
            "annotations": annotations.iter().map(to_wire_annotation).collect::<Vec<_>>(),
            "preventDuplication": dedup,
        });

        let response = self
            .api
            .post(endpoints::annotation::bulk_create(), Some(&body), &[])
            .await?;

        Ok(serde_json::from_value(created_records(response, "annotations")?)?)
    }

    /// リレーションを一括作成
    pub async fn create_bulk_relations(
        &self,
        relations: &[RelationInput],
        dedup: bool,
    ) -> Result<Vec<Value>> {
        let body = json!({
            "relations": relations.iter().map(to_wire_relation).collect::<Vec<_>>(),
            "preventDuplication": dedup,
        });

        let response = self
            .api
            .post(endpoints::relation::bulk_create(), Some(&body), &[])
            .await?;

        Ok(serde_json::from_value(created_records(response, "relations")?)?)
    }

    /// スキーマを作成
    pub async fn create_annotation_schema(&self, name: &str) -> Result<Value> {
        let body = json!({
            "projectIdentifier": self.id,
            "groupName": self.owner_name,
            "name": name,
        });

        self.api
            .post(endpoints::schema::create(), Some(&body), &[])
            .await
    }

    /// アノテーションタイプを作成
    pub async fn create_annotation_type(&self, spec: &AnnotationTypeSpec) -> Result<Value> {
        let mut body = json!({
            "projectIdentifier": self.id,
            "groupName": self.owner_name,
            "name": spec.name,
            "isRelation": spec.is_relation,
            "isDocumentClassification": spec.is_document_classification,
        });
        if let Some(color) = &spec.color {
            body["color"] = json!(color);
        }
        if let Some(schema) = &spec.schema {
            body["schemaIdentifier"] = json!(schema);
        }

        self.api
            .post(endpoints::annotation_type::create(), Some(&body), &[])
            .await
    }

    /// レイヤーを作成
    pub async fn create_annotation_layer(
        &self,
        name: &str,
        is_gold: bool,
        description: Option<&str>,
    ) -> Result<Value> {
        let mut body = json!({
            "projectIdentifier": self.id,
            "groupName": self.owner_name,
            "name": name,
            "isGoldSet": is_gold,
        });
        if let Some(description) = description {
            body["description"] = json!(description);
        }

        self.api
            .post(endpoints::layer::create(), Some(&body), &[])
            .await
    }

    /// エクスポートジョブを準備（開始はしない）
    pub fn export(&self, options: ExportOptions) -> ProjectExport<'_> {
        ProjectExport::new(self, options)
    }

    /// エクスポートアーカイブのインポートを準備
    pub fn import_archive(&self, archive_path: impl Into<PathBuf>) -> ProjectImport<'_> {
        ProjectImport::new(self, archive_path)
    }
}

/// 一括作成レスポンスから作成済みレコードの配列を取り出す
///
/// 配列そのもの、または `{ "<key>": [...] }` のどちらも受け付ける。
fn created_records(response: Value, key: &str) -> Result<Value> {
    match response {
        Value::Array(_) => Ok(response),
        Value::Object(mut map) => match map.remove(key) {
            Some(records @ Value::Array(_)) => Ok(records),
            _ => Err(AnnolabError::UnexpectedResponse(format!(
                "bulk create response has no '{}' array",
                key
            ))),
        },
        other => Err(AnnolabError::UnexpectedResponse(format!(
            "bulk create response is not an array: {}",
            other
        ))),
    }
}

/// URL のパス末尾をファイル名として取り出す
fn file_name_from_url(url: &str) -> Result<String> {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AnnolabError::InvalidArgument(format!("no file name in url '{}'", url)))
}

/// テスト用プロジェクト（jdoe/contracts, id 42）
#[cfg(test)]
pub(crate) fn test_project(api: Arc<dyn ApiTransport>) -> Project {
    let config = ClientConfig::default().with_poll_interval(std::time::Duration::from_millis(1));
    Project::from_response(
        json!({
            "name": "contracts",
            "id": 42,
            "groupName": "jdoe",
            "groupId": 2,
            "defaultDirectory": "Uploads"
        }),
        api,
        Arc::new(config),
    )
    .unwrap()
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
