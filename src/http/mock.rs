//! テスト用モック API

use super::*;
use serde_json::json;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

/// 呼び出し種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Download,
}

/// 記録されたリクエスト
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub data: Vec<u8>,
}

type Handler = Box<dyn Fn(&Call) -> Result<Value> + Send + Sync>;

/// テスト用モック API
///
/// すべての呼び出しを記録し、レスポンスはハンドラで決める。
pub struct MockApi {
    handler: Handler,
    calls: Mutex<Vec<Call>>,
    download_content: Mutex<Vec<u8>>,
}

impl MockApi {
    pub fn new(handler: impl Fn(&Call) -> Result<Value> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            download_content: Mutex::new(Vec::new()),
        }
    }

    /// 擬似サーバー（`fake_server`）で応答するモック
    pub fn server() -> Self {
        Self::new(fake_server())
    }

    /// ダウンロード時に書き込む内容を設定
    pub fn with_download(self, content: &[u8]) -> Self {
        *self.download_content.lock().unwrap() = content.to_vec();
        self
    }

    pub fn into_arc(self) -> Arc<dyn ApiTransport> {
        Arc::new(self)
    }

    /// 記録済みの呼び出し
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// 指定パスへの呼び出し
    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }

    fn record(&self, call: Call) -> Result<Value> {
        let result = (self.handler)(&call);
        self.calls.lock().unwrap().push(call);
        result
    }
}

fn owned(pairs: Pairs<'_>) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl ApiTransport for MockApi {
    fn get<'a>(&'a self, path: &'a str, body: Option<&'a Value>) -> ApiFuture<'a, Value> {
        Box::pin(async move {
            self.record(Call {
                method: Method::Get,
                path: path.to_string(),
                body: body.cloned(),
                params: Vec::new(),
                headers: Vec::new(),
                data: Vec::new(),
            })
        })
    }

    fn post<'a>(
        &'a self,
        path: &'a str,
        body: Option<&'a Value>,
        params: Pairs<'a>,
    ) -> ApiFuture<'a, Value> {
        Box::pin(async move {
            self.record(Call {
                method: Method::Post,
                path: path.to_string(),
                body: body.cloned(),
                params: owned(params),
                headers: Vec::new(),
                data: Vec::new(),
            })
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
            self.record(Call {
                method: Method::Put,
                path: url.to_string(),
                body: None,
                params: owned(params),
                headers: owned(headers),
                data,
            })?;
            Ok(())
        })
    }

    fn download<'a>(&'a self, url: &'a str, dest: &'a Path) -> ApiFuture<'a, u64> {
        Box::pin(async move {
            self.record(Call {
                method: Method::Download,
                path: url.to_string(),
                body: None,
                params: Vec::new(),
                headers: Vec::new(),
                data: Vec::new(),
            })?;

            let content = self.download_content.lock().unwrap().clone();
            std::fs::write(dest, &content)?;
            Ok(content.len() as u64)
        })
    }
}

/// 指定ステータスの API エラー
pub fn api_error(status: u16, message: &str) -> AnnolabError {
    AnnolabError::Api {
        method: "POST",
        path: "mock".to_string(),
        status,
        message: message.to_string(),
    }
}

/// 一括作成に新しい ID を採番して応答する擬似サーバー
pub fn fake_server() -> impl Fn(&Call) -> Result<Value> + Send + Sync + 'static {
    let next_id = AtomicI64::new(10_000);

    move |call: &Call| {
        let assign = |items: &Value| -> Value {
            let created: Vec<Value> = items
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .map(|item| {
                            let mut record = item.clone();
                            record["id"] = json!(next_id.fetch_add(1, Ordering::SeqCst));
                            record
                        })
                        .collect()
                })
                .unwrap_or_default();
            Value::Array(created)
        };

        let body = call.body.clone().unwrap_or(Value::Null);
        match call.path.as_str() {
            "v1/annotation/bulk-create" => Ok(assign(&body["annotations"])),
            "v1/relation/bulk-create" => Ok(assign(&body["relations"])),
            "v1/source/init-pdf" => Ok(json!({ "uploadUrl": "https://upload.test/pdf" })),
            _ => Ok(json!({})),
        }
    }
}
