//! プロバイダ設定（CMP / SSO の接続情報とポーリング設定）
//!
//! ```yaml
//! sso_endpoint: https://sso.example.com
//! cmp_endpoint: https://cmp.example.com
//! cmp_client_id: cmpflow
//! cmp_client_secret: "..."
//! wait:
//!   delay_secs: 60
//!   poll_interval_secs: 20
//!   timeout_secs: 1800
//! ```

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const ENV_OVERRIDES: [(&str, Field); 7] = [
    ("CMPFLOW_SSO_ENDPOINT", Field::SsoEndpoint),
    ("CMPFLOW_CMP_ENDPOINT", Field::CmpEndpoint),
    ("CMPFLOW_ACCESS_TOKEN", Field::AccessToken),
    ("CMPFLOW_CLIENT_ID", Field::ClientId),
    ("CMPFLOW_CLIENT_SECRET", Field::ClientSecret),
    ("CMPFLOW_USERNAME", Field::Username),
    ("CMPFLOW_PASSWORD", Field::Password),
];

#[derive(Clone, Copy)]
enum Field {
    SsoEndpoint,
    CmpEndpoint,
    AccessToken,
    ClientId,
    ClientSecret,
    Username,
    Password,
}

/// 1つの CMP 環境に対する接続先と認証情報
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// 例: https://sso.example.com
    pub sso_endpoint: Option<String>,
    /// 例: https://cmp.example.com
    pub cmp_endpoint: Option<String>,
    /// 事前発行済みトークン（client secret がある場合は使わない）
    pub cmp_access_token: Option<String>,
    pub cmp_client_id: Option<String>,
    pub cmp_client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub wait: WaitSettings,
}

/// ポーリング設定（秒単位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitSettings {
    pub delay_secs: u64,
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
}

impl WaitSettings {
    /// ポーリング間隔とタイムアウトは 0 不可（delay は 0 で即時ポーリング）
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidWait {
                field: "poll_interval_secs",
                value: self.poll_interval_secs,
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidWait {
                field: "timeout_secs",
                value: self.timeout_secs,
            });
        }
        Ok(())
    }
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            delay_secs: 60,
            poll_interval_secs: 20,
            timeout_secs: 30 * 60,
        }
    }
}

/// CMP アクセストークンの取得方法
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// 設定済みトークンをそのまま使う（未設定なら匿名）
    Static(Option<String>),
    /// SSO に発行を依頼する
    Sso(SsoSettings),
}

#[derive(Clone, PartialEq, Eq)]
pub struct SsoSettings {
    pub endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    /// パスワードグラント用の `(username, password)`
    pub user: Option<(String, String)>,
}

impl fmt::Debug for SsoSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SsoSettings")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("user", &self.user.as_ref().map(|(name, _)| name))
            .finish()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hidden = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("ProviderConfig")
            .field("sso_endpoint", &self.sso_endpoint)
            .field("cmp_endpoint", &self.cmp_endpoint)
            .field("cmp_access_token", &hidden(&self.cmp_access_token))
            .field("cmp_client_id", &self.cmp_client_id)
            .field("cmp_client_secret", &hidden(&self.cmp_client_secret))
            .field("username", &self.username)
            .field("password", &hidden(&self.password))
            .field("wait", &self.wait)
            .finish()
    }
}

impl ProviderConfig {
    /// 設定ファイルを探して読み込み、環境変数で上書きする
    pub fn load() -> Result<Self> {
        // 1. 設定ファイル（なければデフォルト値）
        let mut config = match crate::find_config_file()? {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        // 2. 環境変数で上書き
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// 空でない `CMPFLOW_*` 環境変数がファイルの値より優先される
    pub fn apply_env(&mut self) {
        for (name, field) in ENV_OVERRIDES {
            let Ok(value) = std::env::var(name) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            *self.field_mut(field) = Some(value);
        }
    }

    fn field_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::SsoEndpoint => &mut self.sso_endpoint,
            Field::CmpEndpoint => &mut self.cmp_endpoint,
            Field::AccessToken => &mut self.cmp_access_token,
            Field::ClientId => &mut self.cmp_client_id,
            Field::ClientSecret => &mut self.cmp_client_secret,
            Field::Username => &mut self.username,
            Field::Password => &mut self.password,
        }
    }

    /// 設定全体の検証
    ///
    /// cmp_endpoint は常に必須、sso_endpoint はトークンを発行する場合のみ必須
    pub fn validate(&self) -> Result<()> {
        self.cmp_endpoint()?;
        self.token_source()?;
        self.wait.validate()?;
        Ok(())
    }

    pub fn cmp_endpoint(&self) -> Result<&str> {
        non_empty(&self.cmp_endpoint).ok_or(ConfigError::MissingField("cmp_endpoint"))
    }

    /// トークンの取得方法を決める
    pub fn token_source(&self) -> Result<TokenSource> {
        // 1. client secret がなければ静的トークン（なければ匿名）
        let Some(client_secret) = non_empty(&self.cmp_client_secret) else {
            return Ok(TokenSource::Static(
                non_empty(&self.cmp_access_token).map(String::from),
            ));
        };

        // 2. SSO を使う場合はエンドポイントと client id が必須
        let endpoint =
            non_empty(&self.sso_endpoint).ok_or(ConfigError::MissingField("sso_endpoint"))?;
        let client_id =
            non_empty(&self.cmp_client_id).ok_or(ConfigError::MissingField("cmp_client_id"))?;

        // 3. username があればパスワードグラント
        let user = match (non_empty(&self.username), non_empty(&self.password)) {
            (Some(username), Some(password)) => Some((username.to_string(), password.to_string())),
            (Some(_), None) => return Err(ConfigError::MissingField("password")),
            (None, _) => None,
        };

        Ok(TokenSource::Sso(SsoSettings {
            endpoint: endpoint.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            user,
        }))
    }
}

/// 空白のみの値は未設定として扱う
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
