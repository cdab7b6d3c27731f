//! クライアント設定
//!
//! 起動時に一度だけ構築し、各コンポーネントへ参照で渡す。

use crate::env::{EnvVar, API_KEY_VAR, API_URL_VAR};
use crate::error::{AnnolabError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.annolab.ai";

/// エクスポート状態のポーリング間隔（デフォルト）
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// クライアント設定
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API のベース URL
    pub api_url: String,
    /// API キー
    pub api_key: Option<String>,
    /// HTTP タイムアウト
    pub timeout: Option<Duration>,
    /// User-Agent
    pub user_agent: String,
    /// エクスポート状態のポーリング間隔
    pub poll_interval: Duration,
    /// ダウンロード時にプログレスバーを表示するか
    pub show_progress: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            timeout: Some(Duration::from_secs(30)),
            user_agent: "annolab-rust-sdk".to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            show_progress: false,
        }
    }
}

/// 設定ファイルの内容（すべて省略可能）
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
    poll_interval_secs: Option<u64>,
    show_progress: Option<bool>,
}

impl ClientConfig {
    /// API キーを指定して作成
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::default().with_api_key(api_key)
    }

    /// 環境変数から作成
    ///
    /// `ANNOLAB_API_KEY` と `ANNOLAB_API_URL` を参照する。
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// TOML 文字列から作成
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| AnnolabError::Config(e.to_string()))?;
        Ok(Self::default().merge_file(file))
    }

    /// TOML ファイルから作成（環境変数が優先される）
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?.merge_env())
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// reqwest::Client を構築
    pub fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder().user_agent(&self.user_agent);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(builder.build()?)
    }

    fn merge_env(mut self) -> Self {
        if let Some(key) = EnvVar::get(API_KEY_VAR) {
            self.api_key = Some(key);
        }
        if let Some(url) = EnvVar::get(API_URL_VAR) {
            self.api_url = url;
        }
        self
    }

    fn merge_file(mut self, file: ConfigFile) -> Self {
        if let Some(url) = file.api_url {
            self.api_url = url;
        }
        if file.api_key.is_some() {
            self.api_key = file.api_key;
        }
        if let Some(secs) = file.timeout_secs {
            self.timeout = Some(Duration::from_secs(secs));
        }
        if let Some(agent) = file.user_agent {
            self.user_agent = agent;
        }
        if let Some(secs) = file.poll_interval_secs {
            self.poll_interval = Duration::from_secs(secs);
        }
        if let Some(show) = file.show_progress {
            self.show_progress = show;
        }
        self
    }
}
