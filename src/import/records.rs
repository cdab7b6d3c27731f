//! エクスポートファイルのレコード型と JSONL 読み込み

use crate::error::{AnnolabError, Result};
use crate::mapper::{AnnotationInput, Identifier};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use super::maps::SourceLocation;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub source_id: Identifier,
    pub source_name: String,
    pub directory_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBoundsRecord {
    pub source_id: Identifier,
    #[serde(default)]
    pub text_bounds: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaRecord {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationTypeRecord {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_relation: Option<bool>,
    #[serde(default)]
    pub is_document_classification: Option<bool>,
    #[serde(default)]
    pub schema_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerRecord {
    pub name: String,
    #[serde(default)]
    pub is_gold_set: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub id: Identifier,
    pub source_id: Identifier,
    pub type_name: String,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub offsets: Option<Vec<i64>>,
    #[serde(default)]
    pub text_bounds: Option<Value>,
    #[serde(default)]
    pub image_bounds: Option<Value>,
    #[serde(default)]
    pub layer_name: Option<String>,
    #[serde(default)]
    pub page_number: Option<i64>,
    #[serde(default)]
    pub end_page_number: Option<i64>,
}

impl AnnotationRecord {
    /// インポート先プロジェクト向けの SDK 形式へ変換
    ///
    /// 元のアノテーション ID を client id として引き継ぐ。
    pub fn into_input(self, location: &SourceLocation, project_id: i64) -> AnnotationInput {
        AnnotationInput {
            kind: self.type_name,
            client_id: Some(self.id),
            schema: self.schema_name,
            value: self.value,
            offsets: self.offsets,
            bbox: None,
            text_bounds: self.text_bounds,
            image_bounds: self.image_bounds,
            layer: self.layer_name,
            page: self.page_number,
            end_page: self.end_page_number,
            reviewed: None,
            source: Some(location.source_name.clone()),
            directory: Some(location.directory_name.clone()),
            project: Some(Identifier::Id(project_id)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationRecord {
    pub predecessor_id: Identifier,
    pub successor_id: Identifier,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

/// JSONL ファイルを 1 行ずつデシリアライズするイテレータ
///
/// 空行は読み飛ばす。
pub struct JsonLines<T> {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line: usize,
    _marker: PhantomData<T>,
}

/// JSONL ファイルを開く
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<JsonLines<T>> {
    let file = File::open(path)?;
    Ok(JsonLines {
        path: path.to_path_buf(),
        lines: BufReader::new(file).lines(),
        line: 0,
        _marker: PhantomData,
    })
}

impl<T: DeserializeOwned> Iterator for JsonLines<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;

            if line.trim().is_empty() {
                continue;
            }

            return Some(serde_json::from_str(&line).map_err(|e| AnnolabError::InvalidRecord {
                file: self.path.clone(),
                line: self.line,
                message: e.to_string(),
            }));
        }
    }
}
