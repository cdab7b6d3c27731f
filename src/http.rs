//! リモート API との HTTP 境界
//!
//! `ApiTransport` がリクエストを抽象化し、本番コードでは reqwest ベースの
//! `HttpClient` を使う。テスト時は `mock::MockApi` を注入する。

use crate::config::ClientConfig;
use crate::error::{AnnolabError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::Value;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tokio::io::AsyncWriteExt;

/// `ApiTransport` が返す Future
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// クエリパラメータ・ヘッダーのペア
pub type Pairs<'a> = &'a [(&'a str, &'a str)];

/// HTTP 操作を抽象化するトレイト
///
/// 2xx 以外のレスポンスはすべて `AnnolabError::Api` として返す。
/// 相対パスはベース URL に連結し、絶対 URL はそのまま使う。
pub trait ApiTransport: Send + Sync {
    /// GET（認証付き）。レスポンスボディを JSON として返す
    fn get<'a>(&'a self, path: &'a str, body: Option<&'a Value>) -> ApiFuture<'a, Value>;

    /// POST（認証付き）。レスポンスボディを JSON として返す
    fn post<'a>(
        &'a self,
        path: &'a str,
        body: Option<&'a Value>,
        params: Pairs<'a>,
    ) -> ApiFuture<'a, Value>;

    /// PUT（署名付き URL 向け、認証ヘッダーなし）
    fn put<'a>(
        &'a self,
        url: &'a str,
        data: Vec<u8>,
        headers: Pairs<'a>,
        params: Pairs<'a>,
    ) -> ApiFuture<'a, ()>;

    /// レスポンスをファイルへストリーム書き込みし、書き込んだバイト数を返す
    fn download<'a>(&'a self, url: &'a str, dest: &'a Path) -> ApiFuture<'a, u64>;
}

/// reqwest ベースの本番実装
pub struct HttpClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    show_progress: bool,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http: config.build_client()?,
            base_url: parse_base_url(&config.api_url)?,
            api_key: config.api_key.clone(),
            show_progress: config.show_progress,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| AnnolabError::InvalidArgument(format!("invalid url '{}': {}", path, e)))
    }

    /// 認証ヘッダーを付与
    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.header("Authorization", format!("Api-Key {}", key)),
            None => req,
        }
    }

    fn progress_bar(&self, total_size: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        if total_size > 0 {
            let pb = ProgressBar::new(total_size);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            {
                pb.set_style(style.progress_chars("#>-"));
            }
            pb
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} Downloading...") {
                pb.set_style(style);
            }
            pb
        }
    }
}

impl ApiTransport for HttpClient {
    fn get<'a>(&'a self, path: &'a str, body: Option<&'a Value>) -> ApiFuture<'a, Value> {
        Box::pin(async move {
            let mut req = self.authorize(self.http.get(self.url(path)?));
            if let Some(body) = body {
                req = req.json(body);
            }

            let response = check_status("GET", path, req.send().await?).await?;
            read_json(response).await
        })
    }

    fn post<'a>(
        &'a self,
        path: &'a str,
        body: Option<&'a Value>,
        params: Pairs<'a>,
    ) -> ApiFuture<'a, Value> {
        Box::pin(async move {
            let mut req = self.authorize(self.http.post(self.url(path)?)).query(params);
            if let Some(body) = body {
                req = req.json(body);
            }

            let response = check_status("POST", path, req.send().await?).await?;
            read_json(response).await
        })
    }

    fn put<'a>(
        &'a self,
        url: &'a str,
        data: Vec<u8>,
        headers: Pairs<'a>,
        params: Pairs<'a>,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let mut req = self.http.put(self.url(url)?).query(params).body(data);
            for (name, value) in headers {
                req = req.header(*name, *value);
            }

            check_status("PUT", url, req.send().await?).await?;
            Ok(())
        })
    }

    fn download<'a>(&'a self, url: &'a str, dest: &'a Path) -> ApiFuture<'a, u64> {
        Box::pin(async move {
            let response = self.http.get(self.url(url)?).send().await?;
            let mut response = check_status("GET", url, response).await?;

            let pb = self.progress_bar(response.content_length().unwrap_or(0));

            if let Some(parent) = dest.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            let mut file = tokio::fs::File::create(dest).await?;
            let mut written = 0u64;

            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
                pb.set_position(written);
            }
            file.flush().await?;
            pb.finish_and_clear();

            tracing::debug!("Downloaded {} bytes to {}", written, dest.display());
            Ok(written)
        })
    }
}

/// ベース URL を解析（相対パス連結のため末尾スラッシュを補う）
fn parse_base_url(api_url: &str) -> Result<Url> {
    let normalized = if api_url.ends_with('/') {
        api_url.to_string()
    } else {
        format!("{}/", api_url)
    };

    Url::parse(&normalized)
        .map_err(|e| AnnolabError::Config(format!("invalid api url '{}': {}", api_url, e)))
}

/// 2xx 以外を `AnnolabError::Api` に変換
async fn check_status(method: &'static str, path: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body);

    tracing::error!("{} {} failed with message: {}", method, path, message);

    Err(AnnolabError::Api {
        method,
        path: path.to_string(),
        status: status.as_u16(),
        message,
    })
}

/// エラーレスポンスの `message` を取り出す
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| "Unknown Error".to_string())
}

/// 空ボディは Null として扱う
async fn read_json(response: Response) -> Result<Value> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
pub mod mock;

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
