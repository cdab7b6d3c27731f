//! SDK 形式のアノテーション／リレーションを API のワイヤー形式へ変換する
//!
//! 省略可能なフィールドは `Option` で表し、`None`（未指定）のフィールドは
//! ワイヤー形式から省かれる（`null` にはならない）。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// 数値 ID または名前による識別子
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Id(i64),
    Name(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Id(id) => write!(f, "{}", id),
            Identifier::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<i64> for Identifier {
    fn from(id: i64) -> Self {
        Identifier::Id(id)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Identifier::Name(name.to_string())
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Identifier::Name(name)
    }
}

/// SDK 形式のアノテーション
///
/// `kind`（`type`）のみ必須。`client_id` はリレーションを同時に渡す場合に必要。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnnotationInput {
    #[serde(rename = "type")]
    pub kind: String,
    pub client_id: Option<Identifier>,
    pub schema: Option<String>,
    pub value: Option<String>,
    pub offsets: Option<Vec<i64>>,
    /// `text_bounds` がある場合は無視される
    pub bbox: Option<Vec<f64>>,
    pub text_bounds: Option<Value>,
    pub image_bounds: Option<Value>,
    pub layer: Option<String>,
    pub page: Option<i64>,
    #[serde(alias = "endPage")]
    pub end_page: Option<i64>,
    pub reviewed: Option<bool>,
    pub source: Option<String>,
    pub directory: Option<String>,
    pub project: Option<Identifier>,
}

impl AnnotationInput {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }
}

/// SDK 形式のリレーション
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelationInput {
    /// [先行アノテーション, 後続アノテーション]
    pub annotations: [Identifier; 2],
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub reviewed: Option<bool>,
    #[serde(default)]
    pub project: Option<Identifier>,
}

impl RelationInput {
    pub fn new(predecessor: impl Into<Identifier>, successor: impl Into<Identifier>) -> Self {
        Self {
            annotations: [predecessor.into(), successor.into()],
            kind: None,
            schema: None,
            value: None,
            reviewed: None,
            project: None,
        }
    }
}

/// API 形式のアノテーション
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAnnotation {
    pub anno_type_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offsets: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_bounds: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_bounds: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_page_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_reviewed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_identifier: Option<Identifier>,
}

/// API 形式のリレーション
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRelation {
    pub predecessor_id: String,
    pub successor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anno_type_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_reviewed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_identifier: Option<Identifier>,
}

/// アノテーションを API 形式へ変換
pub fn to_wire_annotation(input: &AnnotationInput) -> WireAnnotation {
    WireAnnotation {
        anno_type_identifier: input.kind.clone(),
        client_id: input.client_id.as_ref().map(Identifier::to_string),
        offsets: input.offsets.clone(),
        schema_identifier: input.schema.clone(),
        value: input.value.clone(),
        bbox: input.bbox.clone(),
        text_bounds: input.text_bounds.clone(),
        image_bounds: input.image_bounds.clone(),
        layer_identifier: input.layer.clone(),
        page_number: input.page,
        end_page_number: input.end_page,
        is_reviewed: input.reviewed,
        source_identifier: input.source.clone(),
        directory_identifier: input.directory.clone(),
        project_identifier: input.project.clone(),
    }
}

/// リレーションを API 形式へ変換
///
/// 両端の ID は数値・文字列に関わらず文字列化する。
pub fn to_wire_relation(input: &RelationInput) -> WireRelation {
    let [predecessor, successor] = &input.annotations;

    WireRelation {
        predecessor_id: predecessor.to_string(),
        successor_id: successor.to_string(),
        anno_type_identifier: input.kind.clone(),
        schema_identifier: input.schema.clone(),
        value: input.value.clone(),
        is_reviewed: input.reviewed,
        project_identifier: input.project.clone(),
    }
}

#[cfg(test)]
#[path = "mapper_test.rs"]
mod tests;
