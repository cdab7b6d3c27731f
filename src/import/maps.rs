//! インポート中に使う対応表

use crate::error::Result;
use crate::mapper::Identifier;
use crate::project::CreatedAnnotation;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use super::records::{read_jsonl, SourceRecord, TextBoundsRecord};

/// ソースの配置先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub source_name: String,
    pub directory_name: String,
}

/// 元のソース ID → 配置先
#[derive(Debug, Default)]
pub struct SourceMap {
    entries: HashMap<Identifier, SourceLocation>,
}

impl SourceMap {
    /// sources ファイルから作成
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut entries = HashMap::new();
        for record in read_jsonl::<SourceRecord>(path)? {
            let record = record?;
            entries.insert(
                record.source_id,
                SourceLocation {
                    source_name: record.source_name,
                    directory_name: record.directory_name,
                },
            );
        }
        Ok(Self { entries })
    }

    pub fn insert(&mut self, source_id: Identifier, location: SourceLocation) {
        self.entries.insert(source_id, location);
    }

    pub fn get(&self, source_id: &Identifier) -> Option<&SourceLocation> {
        self.entries.get(source_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 元のアノテーション ID（client id）→ 作成されたアノテーション
///
/// キーは文字列化した ID。数値 `100` と文字列 `"100"` は同じものとして扱う。
#[derive(Debug, Default)]
pub struct AnnotationMap {
    entries: HashMap<String, CreatedAnnotation>,
}

impl AnnotationMap {
    /// 一括作成の結果を登録（client id のないものは無視）
    pub fn extend(&mut self, created: Vec<CreatedAnnotation>) {
        for annotation in created {
            if let Some(client_id) = &annotation.client_id {
                self.entries.insert(client_id.to_string(), annotation);
            }
        }
    }

    /// 元の ID から新しい ID を引く
    pub fn resolve(&self, original: &Identifier) -> Option<&Identifier> {
        self.entries.get(&original.to_string()).map(|a| &a.id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// ソース ID → テキスト境界
///
/// text-bounds ファイルを一度だけ読んで索引化する。
#[derive(Debug, Default)]
pub struct BoundsIndex {
    entries: HashMap<Identifier, Option<Value>>,
}

impl BoundsIndex {
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut entries = HashMap::new();
        for record in read_jsonl::<TextBoundsRecord>(path)? {
            let record = record?;
            // 同じソースが複数回現れた場合は最初のものを使う
            entries.entry(record.source_id).or_insert(record.text_bounds);
        }
        Ok(Self { entries })
    }

    /// レコードが存在しなければ `None`、存在すれば境界（null 可）
    pub fn get(&self, source_id: &Identifier) -> Option<Option<&Value>> {
        self.entries.get(source_id).map(Option::as_ref)
    }
}
