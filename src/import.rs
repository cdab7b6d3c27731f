//! エクスポートアーカイブのインポート
//!
//! アーカイブを一時ディレクトリに展開し、ソース・スキーマ・レイヤー・アノテーション・
//! リレーションの順に別プロジェクトへ作成し直す。元の ID と新しい ID の対応は
//! `SourceMap` と `AnnotationMap` で引き継ぐ。

mod archive;
mod batch;
mod files;
mod maps;
mod records;

pub use batch::BATCH_SIZE;
pub use files::{ExportFileKind, ExportFiles};
pub use maps::{AnnotationMap, SourceLocation, SourceMap};

use crate::error::{AnnolabError, Result};
use crate::mapper::{AnnotationInput, Identifier, RelationInput};
use crate::project::{AnnotationTypeSpec, PdfSourceOptions, Project};
use archive::{extract_zip, safe_relative_path};
use batch::Batch;
use maps::BoundsIndex;
use records::{
    read_jsonl, AnnotationRecord, AnnotationTypeRecord, LayerRecord, RelationRecord, SchemaRecord,
    SourceRecord,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const STAGING_PREFIX: &str = "annolab-import-";

/// インポート結果の件数
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub sources_created: usize,
    /// 既存（409）のためスキップ
    pub sources_skipped: usize,
    pub schemas_created: usize,
    pub schemas_skipped: usize,
    pub annotation_types_created: usize,
    pub annotation_types_skipped: usize,
    pub layers_created: usize,
    pub layers_skipped: usize,
    pub annotations_created: usize,
    /// ソースがインポートされていないためスキップ
    pub annotations_skipped: usize,
    pub relations_created: usize,
    /// 端点のアノテーションが作成されていないためスキップ
    pub relations_unresolved: usize,
}

/// エクスポートアーカイブのインポート
///
/// `run` で一括実行するか、`unpack` から `cleanup` までの各段階を順に呼ぶ。
pub struct ProjectImport<'p> {
    project: &'p Project,
    archive_path: PathBuf,
    staging_root: Option<PathBuf>,
    staging: Option<TempDir>,
    files: Option<ExportFiles>,
    source_map: SourceMap,
    annotation_map: AnnotationMap,
    batch_size: usize,
    summary: ImportSummary,
}

impl<'p> ProjectImport<'p> {
    pub fn new(project: &'p Project, archive_path: impl Into<PathBuf>) -> Self {
        Self {
            project,
            archive_path: archive_path.into(),
            staging_root: None,
            staging: None,
            files: None,
            source_map: SourceMap::default(),
            annotation_map: AnnotationMap::default(),
            batch_size: BATCH_SIZE,
            summary: ImportSummary::default(),
        }
    }

    /// 一括作成 1 回あたりの件数（1〜1000）
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.clamp(1, BATCH_SIZE);
        self
    }

    /// 展開先を作る親ディレクトリ（省略時はシステムの一時ディレクトリ）
    pub fn with_staging_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.staging_root = Some(root.into());
        self
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// 展開先ディレクトリ（未展開なら `None`）
    pub fn staging_dir(&self) -> Option<&Path> {
        self.staging.as_ref().map(TempDir::path)
    }

    pub fn files(&self) -> Option<&ExportFiles> {
        self.files.as_ref()
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    pub fn annotation_map(&self) -> &AnnotationMap {
        &self.annotation_map
    }

    pub fn summary(&self) -> &ImportSummary {
        &self.summary
    }

    fn require_staging(&self) -> Result<PathBuf> {
        self.staging_dir()
            .map(Path::to_path_buf)
            .ok_or(AnnolabError::NotUnpacked)
    }

    fn require_files(&self) -> Result<ExportFiles> {
        self.files.clone().ok_or(AnnolabError::NotUnpacked)
    }

    /// アーカイブを新しい一時ディレクトリへ展開し、レコードファイルを探す
    pub fn unpack(&mut self) -> Result<&ExportFiles> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(STAGING_PREFIX);
        let staging = match &self.staging_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let count = extract_zip(&self.archive_path, staging.path())?;
        tracing::info!(
            "Unpacked {} ({} files) to {}",
            self.archive_path.display(),
            count,
            staging.path().display()
        );

        self.staging = Some(staging);
        self.discover_files()
    }

    /// 展開済みディレクトリから 7 種のレコードファイルを特定する
    pub fn discover_files(&mut self) -> Result<&ExportFiles> {
        let staging = self.require_staging()?;
        let files = self.files.insert(files::discover(&staging)?);
        Ok(&*files)
    }

    /// ソースを作成せずに SourceMap だけを作る
    pub fn create_source_map(&mut self) -> Result<()> {
        let files = self.require_files()?;
        self.source_map = SourceMap::from_file(&files.sources)?;
        tracing::debug!("Mapped {} sources", self.source_map.len());
        Ok(())
    }

    /// ソースを作成する
    ///
    /// PDF は展開先の `<directoryName>/<sourceName>` を読み、テキスト境界を付けて作成する。
    pub async fn import_sources(&mut self) -> Result<()> {
        let files = self.require_files()?;
        let staging = self.require_staging()?;
        let bounds = BoundsIndex::from_file(&files.text_bounds)?;

        for record in read_jsonl::<SourceRecord>(&files.sources)? {
            let record = record?;
            self.source_map.insert(
                record.source_id.clone(),
                SourceLocation {
                    source_name: record.source_name.clone(),
                    directory_name: record.directory_name.clone(),
                },
            );

            let label = format!("{}/{}", record.directory_name, record.source_name);
            let result = match record.kind.as_str() {
                "text" => {
                    self.project
                        .create_text_source(
                            &record.source_name,
                            record.text.as_deref().unwrap_or_default(),
                            Some(&record.directory_name),
                        )
                        .await
                }
                "pdf" => {
                    let text_bounds = bounds
                        .get(&record.source_id)
                        .ok_or_else(|| AnnolabError::MissingTextBounds(record.source_id.to_string()))?
                        .cloned();
                    let staged = staging
                        .join(safe_relative_path(&record.directory_name)?)
                        .join(safe_relative_path(&record.source_name)?);
                    let content = tokio::fs::read(&staged).await?;

                    let options = PdfSourceOptions {
                        directory: Some(record.directory_name.clone()),
                        ocr: Some(false),
                        source_text: record.text.clone(),
                        text_bounds,
                    };
                    self.project
                        .create_pdf_source(&record.source_name, content, &options)
                        .await
                }
                other => {
                    tracing::warn!("Unknown source type '{}' for {}. Skipping", other, label);
                    continue;
                }
            };

            if tolerate_conflict(result, "Source", &label)? {
                self.summary.sources_created += 1;
            } else {
                self.summary.sources_skipped += 1;
            }
        }

        tracing::info!(
            "Imported sources: {} created, {} skipped",
            self.summary.sources_created,
            self.summary.sources_skipped
        );
        Ok(())
    }

    /// スキーマを作成し、続いてアノテーションタイプを作成する
    pub async fn import_schemas(&mut self) -> Result<()> {
        let files = self.require_files()?;

        for record in read_jsonl::<SchemaRecord>(&files.schemas)? {
            let record = record?;
            let result = self.project.create_annotation_schema(&record.name).await;
            if tolerate_conflict(result, "Schema", &record.name)? {
                self.summary.schemas_created += 1;
            } else {
                self.summary.schemas_skipped += 1;
            }
        }

        for record in read_jsonl::<AnnotationTypeRecord>(&files.annotation_types)? {
            let record = record?;
            let spec = AnnotationTypeSpec {
                name: record.name,
                color: record.color,
                is_relation: record.is_relation.unwrap_or(false),
                is_document_classification: record.is_document_classification.unwrap_or(false),
                schema: record.schema_name,
            };

            let result = self.project.create_annotation_type(&spec).await;
            if tolerate_conflict(result, "Annotation type", &spec.name)? {
                self.summary.annotation_types_created += 1;
            } else {
                self.summary.annotation_types_skipped += 1;
            }
        }

        Ok(())
    }

    /// レイヤーを作成する
    pub async fn import_layers(&mut self) -> Result<()> {
        let files = self.require_files()?;

        for record in read_jsonl::<LayerRecord>(&files.layers)? {
            let record = record?;
            let result = self
                .project
                .create_annotation_layer(
                    &record.name,
                    record.is_gold_set.unwrap_or(false),
                    record.description.as_deref(),
                )
                .await;

            if tolerate_conflict(result, "Layer", &record.name)? {
                self.summary.layers_created += 1;
            } else {
                self.summary.layers_skipped += 1;
            }
        }

        Ok(())
    }

    /// アノテーションをバッチで一括作成し、元の ID と新しい ID を対応付ける
    ///
    /// SourceMap にないソースのアノテーションはスキップする。
    pub async fn import_annotations(&mut self) -> Result<()> {
        let files = self.require_files()?;
        let mut batch = Batch::new(self.batch_size);

        for record in read_jsonl::<AnnotationRecord>(&files.annotations)? {
            let record = record?;
            let Some(location) = self.source_map.get(&record.source_id) else {
                tracing::info!(
                    "Skipping annotation for source {}, source has not been imported",
                    record.source_id
                );
                self.summary.annotations_skipped += 1;
                continue;
            };

            let input = record.into_input(location, self.project.id());
            if let Some(full) = batch.push(input) {
                self.create_annotation_batch(full).await?;
            }
        }

        if let Some(rest) = batch.finish() {
            self.create_annotation_batch(rest).await?;
        }

        tracing::info!(
            "Imported annotations: {} created, {} skipped",
            self.summary.annotations_created,
            self.summary.annotations_skipped
        );
        Ok(())
    }

    async fn create_annotation_batch(&mut self, annotations: Vec<AnnotationInput>) -> Result<()> {
        let created = self
            .project
            .create_bulk_annotations(&annotations, true)
            .await?;

        tracing::debug!("Created {} of {} annotations", created.len(), annotations.len());
        self.summary.annotations_created += created.len();
        self.annotation_map.extend(created);
        Ok(())
    }

    /// リレーションの両端を新しい ID に付け替えて一括作成する
    ///
    /// どちらかの端点が AnnotationMap にない場合はスキップする。
    pub async fn import_relations(&mut self) -> Result<()> {
        let files = self.require_files()?;
        let mut batch = Batch::new(self.batch_size);

        for record in read_jsonl::<RelationRecord>(&files.relations)? {
            let record = record?;
            let predecessor = self.annotation_map.resolve(&record.predecessor_id).cloned();
            let successor = self.annotation_map.resolve(&record.successor_id).cloned();

            let (Some(predecessor), Some(successor)) = (predecessor, successor) else {
                tracing::warn!(
                    "Skipping relation {} -> {}, annotation was not imported",
                    record.predecessor_id,
                    record.successor_id
                );
                self.summary.relations_unresolved += 1;
                continue;
            };

            let relation = RelationInput {
                kind: record.type_name,
                schema: record.schema_name,
                value: record.value,
                project: Some(Identifier::Id(self.project.id())),
                ..RelationInput::new(predecessor, successor)
            };
            if let Some(full) = batch.push(relation) {
                self.create_relation_batch(full).await?;
            }
        }

        if let Some(rest) = batch.finish() {
            self.create_relation_batch(rest).await?;
        }

        tracing::info!(
            "Imported relations: {} created, {} unresolved",
            self.summary.relations_created,
            self.summary.relations_unresolved
        );
        Ok(())
    }

    async fn create_relation_batch(&mut self, relations: Vec<RelationInput>) -> Result<()> {
        let created = self.project.create_bulk_relations(&relations, true).await?;
        self.summary.relations_created += created.len();
        Ok(())
    }

    /// ソースからリレーションまでを順に取り込む
    pub async fn import_all(&mut self) -> Result<ImportSummary> {
        self.import_sources().await?;
        self.import_schemas().await?;
        self.import_layers().await?;
        self.import_annotations().await?;
        self.import_relations().await?;
        Ok(self.summary.clone())
    }

    /// 展開先ディレクトリを削除する（失敗しても警告のみ）
    pub fn cleanup(&mut self) {
        self.files = None;
        if let Some(staging) = self.staging.take() {
            let path = staging.path().to_path_buf();
            match staging.close() {
                Ok(()) => tracing::debug!("Removed {}", path.display()),
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }

    /// 展開・インポート・後片付けをまとめて行う
    ///
    /// 失敗した場合も展開先は削除される。
    pub async fn run(mut self) -> Result<ImportSummary> {
        let unpacked = self.unpack().map(|_| ());
        let result = match unpacked {
            Ok(()) => self.import_all().await,
            Err(e) => Err(e),
        };
        self.cleanup();
        result
    }
}

/// 409 Conflict を警告してスキップ扱いにする
///
/// 作成できたら `true`、既存だったら `false`。それ以外のエラーはそのまま返す。
fn tolerate_conflict<T>(result: Result<T>, entity: &str, name: &str) -> Result<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(e) if e.is_conflict() => {
            tracing::warn!("{} {} already exists. Skipping", entity, name);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "import_test.rs"]
mod tests;
