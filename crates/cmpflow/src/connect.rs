use anyhow::Context;
use cmpflow_cmp::{CmpClient, RequestOptions};
use cmpflow_config::{ProviderConfig, SsoSettings, TokenSource};
use cmpflow_sso::{Authorization, Credentials};

/// 設定から CMP クライアントを作る（必要なら SSO でトークンを取得）
pub async fn connect(config: &ProviderConfig) -> anyhow::Result<CmpClient> {
    let endpoint = config.cmp_endpoint()?;
    let access_token = match config.token_source()? {
        TokenSource::Static(token) => token,
        TokenSource::Sso(sso) => Some(request_token(&sso).await?.access_token),
    };

    if access_token.is_none() {
        tracing::debug!("No access token configured, calling CMP anonymously");
    }

    Ok(CmpClient::new(RequestOptions::new(endpoint, access_token)))
}

pub async fn request_token(sso: &SsoSettings) -> anyhow::Result<Authorization> {
    let credentials = match &sso.user {
        Some((username, password)) => {
            Credentials::password(&sso.client_id, &sso.client_secret, username, password)
        }
        None => Credentials::client(&sso.client_id, &sso.client_secret),
    };

    tracing::debug!(
        endpoint = %sso.endpoint,
        grant_type = credentials.grant_type(),
        "Requesting access token"
    );

    cmpflow_sso::authenticate(&sso.endpoint, &credentials)
        .await
        .context("[SSO] Generate access token failed")
}
