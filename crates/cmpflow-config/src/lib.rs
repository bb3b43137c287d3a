pub mod error;
pub mod provider;

pub use error::*;
pub use provider::{ProviderConfig, SsoSettings, TokenSource, WaitSettings};

use std::path::PathBuf;

const CONFIG_PATH_ENV: &str = "CMPFLOW_CONFIG_PATH";
const CANDIDATES: [&str; 2] = ["cmpflow.local.yaml", "cmpflow.yaml"];

/// cmpflow の設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 CMPFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: cmpflow.local.yaml, cmpflow.yaml
/// 3. ~/.config/cmpflow/config.yaml (グローバル設定)
///
/// どれも見つからなければ `Ok(None)`（環境変数だけで設定する）
pub fn find_config_file() -> Result<Option<PathBuf>> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    // 2. カレントディレクトリで検索（local が優先）
    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    // 3. グローバル設定ファイル (~/.config/cmpflow/config.yaml)
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("cmpflow").join("config.yaml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}
