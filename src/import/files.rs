//! エクスポートファイルの検出

use crate::error::{AnnolabError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// エクスポートに含まれるレコードファイルの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFileKind {
    Sources,
    TextBounds,
    Schemas,
    AnnotationTypes,
    Annotations,
    Layers,
    Relations,
}

impl ExportFileKind {
    /// ファイル名のタグ（`<prefix>.<tag>.jsonl`）
    pub fn tag(&self) -> &'static str {
        match self {
            ExportFileKind::Sources => "sources",
            ExportFileKind::TextBounds => "text-bounds",
            ExportFileKind::Schemas => "schemas",
            ExportFileKind::AnnotationTypes => "atntypes",
            ExportFileKind::Annotations => "annotations",
            ExportFileKind::Layers => "layers",
            ExportFileKind::Relations => "relations",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sources" => Some(ExportFileKind::Sources),
            "text-bounds" => Some(ExportFileKind::TextBounds),
            "schemas" => Some(ExportFileKind::Schemas),
            "atntypes" => Some(ExportFileKind::AnnotationTypes),
            "annotations" => Some(ExportFileKind::Annotations),
            "layers" => Some(ExportFileKind::Layers),
            "relations" => Some(ExportFileKind::Relations),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportFileKind::Sources => "Sources",
            ExportFileKind::TextBounds => "Text Bounds",
            ExportFileKind::Schemas => "Schemas",
            ExportFileKind::AnnotationTypes => "Annotation Types",
            ExportFileKind::Annotations => "Annotations",
            ExportFileKind::Layers => "Layers",
            ExportFileKind::Relations => "Relations",
        }
    }

    /// 欠落時の対処方法
    pub fn hint(&self) -> &'static str {
        match self {
            ExportFileKind::Sources => "Request the export with include_sources enabled.",
            ExportFileKind::TextBounds => "Request the export with include_text_bounds enabled.",
            ExportFileKind::Schemas | ExportFileKind::AnnotationTypes => {
                "Request the export with include_schemas enabled."
            }
            ExportFileKind::Annotations | ExportFileKind::Layers | ExportFileKind::Relations => {
                "The archive is incomplete."
            }
        }
    }
}

impl std::fmt::Display for ExportFileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// 展開済みディレクトリ内のレコードファイル
#[derive(Debug, Clone)]
pub struct ExportFiles {
    pub sources: PathBuf,
    pub text_bounds: PathBuf,
    pub schemas: PathBuf,
    pub annotation_types: PathBuf,
    pub annotations: PathBuf,
    pub layers: PathBuf,
    pub relations: PathBuf,
}

/// ディレクトリ直下からレコードファイルを探す
///
/// 7種すべてが必須。欠けていれば最初に見つかった欠落種別で `MissingExportData`。
/// 同じ種別が複数ある場合はファイル名順で最初のものを使う。
pub fn discover(dir: &Path) -> Result<ExportFiles> {
    let pattern = Regex::new(
        r"^.*\.(sources|text-bounds|schemas|atntypes|annotations|layers|relations)\.jsonl$",
    )
    .map_err(|e| AnnolabError::InvalidArgument(e.to_string()))?;

    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();

    let mut found: HashMap<ExportFileKind, PathBuf> = HashMap::new();
    for name in names {
        let kind = pattern
            .captures(&name)
            .and_then(|caps| caps.get(1))
            .and_then(|tag| ExportFileKind::from_tag(tag.as_str()));

        if let Some(kind) = kind {
            found.entry(kind).or_insert_with(|| dir.join(&name));
        }
    }

    let mut take = |kind: ExportFileKind| {
        found
            .remove(&kind)
            .ok_or(AnnolabError::MissingExportData(kind))
    };

    Ok(ExportFiles {
        sources: take(ExportFileKind::Sources)?,
        text_bounds: take(ExportFileKind::TextBounds)?,
        schemas: take(ExportFileKind::Schemas)?,
        annotation_types: take(ExportFileKind::AnnotationTypes)?,
        annotations: take(ExportFileKind::Annotations)?,
        layers: take(ExportFileKind::Layers)?,
        relations: take(ExportFileKind::Relations)?,
    })
}
