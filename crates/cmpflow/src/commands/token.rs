use crate::connect::request_token;
use cmpflow_config::{ProviderConfig, TokenSource};
use colored::Colorize;

/// SSO からトークンを取得して表示する
///
/// `cmp_endpoint` は参照しない。SSO 関連の必須項目は `token_source()` が検証する。
pub async fn handle(config: &ProviderConfig, print_token: bool) -> anyhow::Result<()> {
    let sso = match config.token_source()? {
        TokenSource::Sso(sso) => sso,
        TokenSource::Static(_) => {
            anyhow::bail!(
                "cmp_client_secret is not configured; \
                 set it (or CMPFLOW_CLIENT_SECRET) to request a token"
            );
        }
    };

    let authorization = request_token(&sso).await?;

    // --print-token: スクリプトから使えるようトークンのみ出力
    if print_token {
        println!("{}", authorization.access_token);
        return Ok(());
    }

    println!("{}", "✓ Access token issued".green());
    println!("  {} {}", "type:".dimmed(), authorization.token_type);
    println!("  {} {}s", "expires in:".dimmed(), authorization.expires_in);
    if authorization.refresh_token.is_some() {
        println!("  {} yes", "refresh token:".dimmed());
    }
    Ok(())
}
