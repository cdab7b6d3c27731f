//! SDK のエントリーポイント

use crate::config::ClientConfig;
use crate::endpoints;
use crate::error::{AnnolabError, Result};
use crate::http::{ApiTransport, HttpClient};
use crate::project::Project;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// API キーが所属するグループ
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub group_name: String,
    #[serde(default)]
    pub group_id: Option<i64>,
    #[serde(default)]
    pub is_single_user: bool,
}

/// `v1/api-key/info` のレスポンス
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiKeyInfo {
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl ApiKeyInfo {
    /// デフォルトのオーナー（ユーザー個人を表すグループ）
    ///
    /// 複数ある場合は最後のものを使う。
    pub fn default_owner(&self) -> Option<&Group> {
        self.groups.iter().rev().find(|g| g.is_single_user)
    }
}

/// AnnoLab クライアント
///
/// 接続時に API キー情報を一度だけ取得し、デフォルトのオーナーを確定させる。
pub struct AnnoLab {
    api: Arc<dyn ApiTransport>,
    config: Arc<ClientConfig>,
    key_info: ApiKeyInfo,
}

impl AnnoLab {
    /// 設定から HTTP クライアントを構築して接続
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let api: Arc<dyn ApiTransport> = Arc::new(HttpClient::new(&config)?);
        Self::with_transport(api, config).await
    }

    /// 任意の `ApiTransport` で接続
    pub async fn with_transport(api: Arc<dyn ApiTransport>, config: ClientConfig) -> Result<Self> {
        let info = api.get(endpoints::api_key::info(), None).await?;
        let key_info: ApiKeyInfo = serde_json::from_value(info)?;

        match key_info.default_owner() {
            Some(owner) => tracing::debug!("Default owner: {}", owner.group_name),
            None => tracing::warn!("API key has no single-user group; owner names must be passed explicitly"),
        }

        Ok(Self {
            api,
            config: Arc::new(config),
            key_info,
        })
    }

    pub fn api_key_info(&self) -> &ApiKeyInfo {
        &self.key_info
    }

    pub fn default_owner(&self) -> Option<&Group> {
        self.key_info.default_owner()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn owner_or_default<'a>(&'a self, owner: Option<&'a str>) -> Result<&'a str> {
        match owner {
            Some(owner) => Ok(owner),
            None => self
                .default_owner()
                .map(|g| g.group_name.as_str())
                .ok_or_else(|| {
                    AnnolabError::InvalidArgument(
                        "no default owner for this api key; pass an owner name".to_string(),
                    )
                }),
        }
    }

    fn project_from(&self, value: serde_json::Value) -> Result<Project> {
        Project::from_response(value, Arc::clone(&self.api), Arc::clone(&self.config))
    }

    /// プロジェクトを名前（とオーナー）で検索
    pub async fn find_project(&self, name: &str, owner: Option<&str>) -> Result<Project> {
        let owner = self.owner_or_default(owner)?;
        let value = self
            .api
            .get(&endpoints::project::by_owner(owner, name), None)
            .await?;
        self.project_from(value)
    }

    /// プロジェクトを ID で取得
    pub async fn get_project(&self, id: i64) -> Result<Project> {
        let value = self.api.get(&endpoints::project::by_id(id), None).await?;
        self.project_from(value)
    }

    /// プロジェクトを作成
    pub async fn create_project(&self, name: &str, owner: Option<&str>) -> Result<Project> {
        let owner = self.owner_or_default(owner)?;
        let body = json!({
            "name": name,
            "groupName": owner,
        });

        let value = self
            .api
            .post(endpoints::project::create(), Some(&body), &[])
            .await?;
        self.project_from(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::{api_error, MockApi};
    use serde_json::Value;

    fn key_info() -> Value {
        json!({
            "groups": [
                { "groupName": "acme", "groupId": 1, "isSingleUser": false },
                { "groupName": "jdoe", "groupId": 2, "isSingleUser": true }
            ]
        })
    }

    fn project_json(name: &str, owner: &str) -> Value {
        json!({
            "name": name,
            "id": 42,
            "groupName": owner,
            "groupId": 2,
            "defaultDirectory": "Uploads"
        })
    }

    fn mock() -> Arc<MockApi> {
        Arc::new(MockApi::new(|call| match call.path.as_str() {
            "v1/api-key/info" => Ok(key_info()),
            "v1/project/jdoe/contracts" => Ok(project_json("contracts", "jdoe")),
            "v1/project/acme/contracts" => Ok(project_json("contracts", "acme")),
            "v1/project/create" => {
                let body = call.body.clone().unwrap_or(Value::Null);
                Ok(project_json(
                    body["name"].as_str().unwrap_or_default(),
                    body["groupName"].as_str().unwrap_or_default(),
                ))
            }
            _ => Err(api_error(404, "Not Found")),
        }))
    }

    #[test]
    fn test_default_owner_is_single_user_group() {
        let info: ApiKeyInfo = serde_json::from_value(key_info()).unwrap();
        assert_eq!(info.default_owner().unwrap().group_name, "jdoe");
    }

    #[test]
    fn test_default_owner_prefers_last_single_user_group() {
        let info: ApiKeyInfo = serde_json::from_value(json!({
            "groups": [
                { "groupName": "jdoe", "isSingleUser": true },
                { "groupName": "acme", "isSingleUser": false },
                { "groupName": "jdoe-2", "isSingleUser": true }
            ]
        }))
        .unwrap();
        assert_eq!(info.default_owner().unwrap().group_name, "jdoe-2");
    }

    #[test]
    fn test_default_owner_missing() {
        let info: ApiKeyInfo = serde_json::from_value(json!({ "groups": [] })).unwrap();
        assert!(info.default_owner().is_none());
    }

    #[tokio::test]
    async fn test_connect_fetches_key_info_once() {
        let api = mock();
        let lab = AnnoLab::with_transport(api.clone(), ClientConfig::default())
            .await
            .unwrap();

        lab.find_project("contracts", None).await.unwrap();
        lab.find_project("contracts", None).await.unwrap();

        assert_eq!(api.calls_to("v1/api-key/info").len(), 1);
        assert_eq!(lab.default_owner().unwrap().group_name, "jdoe");
    }

    #[tokio::test]
    async fn test_find_project_with_explicit_owner() {
        let lab = AnnoLab::with_transport(mock(), ClientConfig::default())
            .await
            .unwrap();

        let project = lab.find_project("contracts", Some("acme")).await.unwrap();
        assert_eq!(project.project_path(), "acme/contracts");
        assert_eq!(project.id(), 42);
    }

    #[tokio::test]
    async fn test_create_project_uses_default_owner() {
        let api = mock();
        let lab = AnnoLab::with_transport(api.clone(), ClientConfig::default())
            .await
            .unwrap();

        let project = lab.create_project("new-project", None).await.unwrap();

        assert_eq!(project.owner_name(), "jdoe");
        let calls = api.calls_to("v1/project/create");
        assert_eq!(calls[0].body.as_ref().unwrap()["groupName"], "jdoe");
    }

    #[tokio::test]
    async fn test_find_project_not_found() {
        let lab = AnnoLab::with_transport(mock(), ClientConfig::default())
            .await
            .unwrap();

        let err = lab.find_project("missing", None).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }
}
