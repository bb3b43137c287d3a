//! CMP command API client
//!
//! Every call is a JSON `POST` below `<endpoint>/gateway/cmp-main-api/api/`.
//! Request settings are carried by an immutable [`RequestOptions`] that is
//! passed into each request.

use crate::command::{CommandRecord, CommandStep, CommandSubmission};
use crate::error::{CmpError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// API context path of the CMP main API
pub const MAIN_API_CONTEXT: &str = "gateway/cmp-main-api";

const CON_STR: &str = "deploy";
const SQL_SELECT_RECORD: &str = "command.selectRecordById";
const SQL_LIST_STEPS: &str = "task.listAllStepsForAgent";

/// Remote command operations
///
/// Implemented by [`CmpClient`]; the completion poller only depends on this trait.
#[async_trait]
pub trait CommandApi: Send + Sync {
    /// Submit a command. The returned record is the initial one, usually `new`.
    async fn create_command(&self, submission: &CommandSubmission) -> Result<CommandRecord>;

    /// Fetch the current state of a record
    async fn describe_command(&self, record_id: &str) -> Result<CommandRecord>;

    /// Fetch one page of execution steps of a task
    ///
    /// The CMP decides the row order; callers asking for page 1 with a page
    /// size of 1 rely on it returning the representative (latest) step first.
    async fn describe_command_steps(
        &self,
        task_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<CommandStep>>;
}

/// Per-request settings
#[derive(Clone)]
pub struct RequestOptions {
    /// CMP base address, e.g. `https://cmp.example.com`
    pub endpoint: String,
    pub api_context: String,
    /// Sent as `Authorization: Bearer <token>` when present
    pub access_token: Option<String>,
}

impl RequestOptions {
    pub fn new(endpoint: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_context: MAIN_API_CONTEXT.to_string(),
            access_token: access_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn with_api_context(mut self, api_context: impl Into<String>) -> Self {
        self.api_context = api_context.into();
        self
    }

    /// `<endpoint>/<api_context>/api/<path>`
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/api/{}",
            self.endpoint.trim_end_matches('/'),
            self.api_context.trim_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("endpoint", &self.endpoint)
            .field("api_context", &self.api_context)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// HTTP client for the CMP command API
pub struct CmpClient {
    http: reqwest::Client,
    options: RequestOptions,
}

impl CmpClient {
    pub fn new(options: RequestOptions) -> Self {
        Self {
            http: reqwest::Client::new(),
            options,
        }
    }
}

#[async_trait]
impl CommandApi for CmpClient {
    async fn create_command(&self, submission: &CommandSubmission) -> Result<CommandRecord> {
        let record: CommandRecord =
            post_json(&self.http, &self.options, "command/sendCommand", submission).await?;

        tracing::debug!(
            record_id = %record.record_id,
            task_id = %record.task_id,
            status = %record.status,
            "Sent a command"
        );
        Ok(record)
    }

    async fn describe_command(&self, record_id: &str) -> Result<CommandRecord> {
        let request = DescribeCommandRequest {
            con_str: CON_STR,
            sql_id: SQL_SELECT_RECORD,
            params: RecordParams { id: record_id },
        };
        post_json(&self.http, &self.options, "getEntity", &request).await
    }

    async fn describe_command_steps(
        &self,
        task_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<CommandStep>> {
        let request = DescribeStepsRequest {
            sql_id: SQL_LIST_STEPS,
            con_str: CON_STR,
            params: TaskParams { task_id },
            page,
            page_size,
        };
        post_json(&self.http, &self.options, "queryPageList", &request).await
    }
}

/// POST a JSON body and decode a JSON response
async fn post_json<B, T>(
    http: &reqwest::Client,
    options: &RequestOptions,
    path: &str,
    body: &B,
) -> Result<T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let url = options.url(path);
    tracing::debug!("POST {}", url);

    let mut request = http.post(&url).json(body);
    if let Some(token) = options.access_token.as_deref() {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    // Read the body first so error reports carry it
    let content = response.text().await?;

    if !status.is_success() {
        return Err(CmpError::Api {
            status: status.as_u16(),
            body: content,
        });
    }

    serde_json::from_str(&content).map_err(|source| CmpError::Decode {
        source,
        body: content,
    })
}

// ============ API Types ============

// getEntity / queryPageList run a named server-side query (`sqlId`) against
// the `deploy` data source (`conStr`).

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeCommandRequest<'a> {
    con_str: &'a str,
    sql_id: &'a str,
    params: RecordParams<'a>,
}

#[derive(Debug, Serialize)]
struct RecordParams<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct DescribeStepsRequest<'a> {
    #[serde(rename = "sqlId")]
    sql_id: &'a str,
    #[serde(rename = "conStr")]
    con_str: &'a str,
    params: TaskParams<'a>,
    page: u32,
    // snake_case on the wire, unlike the other keys
    page_size: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskParams<'a> {
    task_id: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandStatus, HostType};
    use mockito::Matcher;
    use serde_json::json;

    const RECORD_BODY: &str = r#"{"id":"r1","name":"cmpflow-deploy-1","content":"pwd","userId":"u1","createTime":"2024-05-01T10:30:00+08:00","status":"deploying","machines":"vm-1","taskId":"t1","description":null}"#;

    const STEPS_BODY: &str = r#"[{"stepId":"s1","machineName":"vm-1","stepStatus":"failed","stepLog":"disk full","progress":"100"}]"#;

    fn client(server: &mockito::Server, token: Option<&str>) -> CmpClient {
        CmpClient::new(RequestOptions::new(server.url(), token.map(String::from)))
    }

    #[test]
    fn test_url() {
        let options = RequestOptions::new("https://cmp.example.com/", None);
        assert_eq!(
            options.url("getEntity"),
            "https://cmp.example.com/gateway/cmp-main-api/api/getEntity"
        );

        let options = options.with_api_context("/custom/");
        assert_eq!(
            options.url("/queryPageList"),
            "https://cmp.example.com/custom/api/queryPageList"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let options = RequestOptions::new("https://cmp", Some("secret-token".to_string()));
        let printed = format!("{:?}", options);
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn test_empty_token_is_dropped() {
        let options = RequestOptions::new("https://cmp", Some(String::new()));
        assert!(options.access_token.is_none());
    }

    #[tokio::test]
    async fn test_create_command() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/gateway/cmp-main-api/api/command/sendCommand")
            .match_header("authorization", "Bearer tok123")
            .match_body(Matcher::PartialJson(json!({
                "hostType": "1",
                "content": "pwd",
                "instanceIds": "c0dea473-cfc0-49a7-830e-a7edc8f1125d",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"recordId":"r1","taskId":"t1","status":"new","name":"n"}"#)
            .create_async()
            .await;

        let submission = CommandSubmission::new(
            HostType::VirtualMachine,
            "pwd",
            "c0dea473-cfc0-49a7-830e-a7edc8f1125d",
        );
        let record = client(&server, Some("tok123"))
            .create_command(&submission)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(record.record_id, "r1");
        assert_eq!(record.task_id, "t1");
        assert_eq!(record.status, CommandStatus::New);
    }

    #[tokio::test]
    async fn test_no_auth_header_without_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/gateway/cmp-main-api/api/getEntity")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(RECORD_BODY)
            .create_async()
            .await;

        let result = client(&server, None).describe_command("r1").await;

        mock.assert_async().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_describe_command_is_idempotent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/gateway/cmp-main-api/api/getEntity")
            .match_body(Matcher::Json(json!({
                "conStr": "deploy",
                "sqlId": "command.selectRecordById",
                "params": { "id": "r1" },
            })))
            .with_status(200)
            .with_body(RECORD_BODY)
            .expect(2)
            .create_async()
            .await;

        let client = client(&server, Some("tok123"));
        let first = client.describe_command("r1").await.unwrap();
        let second = client.describe_command("r1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(first, second);
        assert_eq!(first.record_id, "r1");
        assert_eq!(first.status, CommandStatus::Deploying);
        assert_eq!(first.user_id, "u1");
    }

    #[tokio::test]
    async fn test_describe_command_steps() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/gateway/cmp-main-api/api/queryPageList")
            .match_body(Matcher::Json(json!({
                "sqlId": "task.listAllStepsForAgent",
                "conStr": "deploy",
                "params": { "taskId": "t1" },
                "page": 1,
                "page_size": 1,
            })))
            .with_status(200)
            .with_body(STEPS_BODY)
            .create_async()
            .await;

        let steps = client(&server, Some("tok123"))
            .describe_command_steps("t1", 1, 1)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].step_log, "disk full");
        assert_eq!(steps[0].progress, Some(100.0));
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gateway/cmp-main-api/api/getEntity")
            .with_status(401)
            .with_body("token expired")
            .create_async()
            .await;

        let err = client(&server, Some("old"))
            .describe_command("r1")
            .await
            .unwrap_err();

        match &err {
            CmpError::Api { status, body } => {
                assert_eq!(*status, 401);
                assert_eq!(body, "token expired");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("token expired"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/gateway/cmp-main-api/api/queryPageList")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let err = client(&server, None)
            .describe_command_steps("t1", 1, 1)
            .await
            .unwrap_err();

        match err {
            CmpError::Decode { body, .. } => assert_eq!(body, "<html>gateway</html>"),
            other => panic!("expected Decode error, got {:?}", other),
        }
    }
}
