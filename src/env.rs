/// API キーの環境変数名
pub const API_KEY_VAR: &str = "ANNOLAB_API_KEY";

/// API URL の環境変数名
pub const API_URL_VAR: &str = "ANNOLAB_API_URL";

/// 環境変数ユーティリティ
pub struct EnvVar;

impl EnvVar {
    /// 環境変数を取得（空文字列・空白のみはNoneとして扱う）
    pub fn get(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
