//! OAuth2 token endpoint client

use crate::error::{Result, SsoError};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

const TOKEN_PATH: &str = "oauth2/token";

/// Identity presented to the token endpoint
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `grant_type=client_credentials`
    Client {
        client_id: String,
        client_secret: String,
    },
    /// `grant_type=password`, on behalf of a user
    Password {
        client_id: String,
        client_secret: String,
        username: String,
        password: String,
    },
}

impl Credentials {
    pub fn client(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Credentials::Client {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn password(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Credentials::Password {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn grant_type(&self) -> &'static str {
        match self {
            Credentials::Client { .. } => "client_credentials",
            Credentials::Password { .. } => "password",
        }
    }

    /// `Basic base64(client_id:client_secret)`
    fn basic_auth_header(&self) -> String {
        let (client_id, client_secret) = match self {
            Credentials::Client {
                client_id,
                client_secret,
            }
            | Credentials::Password {
                client_id,
                client_secret,
                ..
            } => (client_id, client_secret),
        };
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", client_id, client_secret));
        format!("Basic {}", encoded)
    }

    fn query(&self) -> Vec<(&'static str, &str)> {
        let mut query = vec![("grant_type", self.grant_type())];
        if let Credentials::Password {
            username, password, ..
        } = self
        {
            query.push(("username", username.as_str()));
            query.push(("password", password.as_str()));
        }
        query
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Client { client_id, .. } => f
                .debug_struct("Client")
                .field("client_id", client_id)
                .field("client_secret", &"***")
                .finish(),
            Credentials::Password {
                client_id,
                username,
                ..
            } => f
                .debug_struct("Password")
                .field("client_id", client_id)
                .field("client_secret", &"***")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// Token issued by the SSO
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    /// Seconds until the access token expires
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authorization")
            .field("access_token", &"***")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// SSO token endpoint client
pub struct SsoClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SsoClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn token_url(&self) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), TOKEN_PATH)
    }

    /// Exchange `credentials` for an access token
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Authorization> {
        let url = self.token_url();
        tracing::debug!(grant_type = credentials.grant_type(), "POST {}", url);

        // Grant parameters go in the query string, client credentials in the header
        let response = self
            .http
            .post(&url)
            .query(&credentials.query())
            .header(reqwest::header::AUTHORIZATION, credentials.basic_auth_header())
            .send()
            .await?;

        let status = response.status();
        let content = response.text().await?;

        if !status.is_success() {
            return Err(SsoError::Api {
                status: status.as_u16(),
                body: content,
            });
        }

        let auth: Authorization =
            serde_json::from_str(&content).map_err(|source| SsoError::Decode {
                source,
                body: content,
            })?;

        tracing::debug!(
            token_type = %auth.token_type,
            expires_in = auth.expires_in,
            "Generated access token"
        );
        Ok(auth)
    }
}

/// One-shot [`SsoClient::authenticate`]
pub async fn authenticate(endpoint: &str, credentials: &Credentials) -> Result<Authorization> {
    SsoClient::new(endpoint).authenticate(credentials).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[test]
    fn test_token_url() {
        assert_eq!(
            SsoClient::new("https://sso.example.com/").token_url(),
            "https://sso.example.com/oauth2/token"
        );
    }

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(
            Credentials::client("cid", "csec").basic_auth_header(),
            "Basic Y2lkOmNzZWM="
        );
    }

    #[test]
    fn test_debug_hides_secrets() {
        let credentials = Credentials::password("cid", "csec", "alice", "p@ss");
        let printed = format!("{:?}", credentials);
        assert!(printed.contains("alice"));
        assert!(!printed.contains("csec"));
        assert!(!printed.contains("p@ss"));

        let auth = Authorization {
            access_token: "tok123".to_string(),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            refresh_token: Some("ref456".to_string()),
        };
        let printed = format!("{:?}", auth);
        assert!(!printed.contains("tok123"));
        assert!(!printed.contains("ref456"));
    }

    #[tokio::test]
    async fn test_client_credentials() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .match_query(Matcher::UrlEncoded(
                "grant_type".into(),
                "client_credentials".into(),
            ))
            .match_header("authorization", "Basic Y2lkOmNzZWM=")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"tok123","token_type":"bearer","expires_in":3600}"#)
            .create_async()
            .await;

        let auth = authenticate(&server.url(), &Credentials::client("cid", "csec"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(auth.access_token, "tok123");
        assert_eq!(auth.token_type, "bearer");
        assert_eq!(auth.expires_in, 3600);
        assert_eq!(auth.refresh_token, None);
    }

    #[tokio::test]
    async fn test_password_grant_escapes_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth2/token")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "password".into()),
                Matcher::UrlEncoded("username".into(), "alice".into()),
                Matcher::UrlEncoded("password".into(), "p&ss=1 2".into()),
            ]))
            .match_header("authorization", "Basic Y2lkOmNzZWM=")
            .with_status(200)
            .with_body(
                r#"{"access_token":"tok","token_type":"bearer","expires_in":60,"refresh_token":"ref"}"#,
            )
            .create_async()
            .await;

        let auth = SsoClient::new(server.url())
            .authenticate(&Credentials::password("cid", "csec", "alice", "p&ss=1 2"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(auth.refresh_token.as_deref(), Some("ref"));
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth2/token")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;

        let err = authenticate(&server.url(), &Credentials::client("cid", "wrong"))
            .await
            .unwrap_err();

        match &err {
            SsoError::Api { status, body } => {
                assert_eq!(*status, 401);
                assert!(body.contains("invalid_client"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
        assert!(err.to_string().contains("[SSO] Response code: [401]"));
    }

    #[tokio::test]
    async fn test_undecodable_token_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth2/token")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = authenticate(&server.url(), &Credentials::client("cid", "csec"))
            .await
            .unwrap_err();

        assert!(matches!(err, SsoError::Decode { ref body, .. } if body == "not json"));
    }
}
