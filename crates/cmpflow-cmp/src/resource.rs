//! Command resource lifecycle
//!
//! A submitted command managed like any other provider resource: create sends
//! it, read waits for it to finish, update and delete have no remote effect
//! (a command that already ran cannot be changed or taken back).

use crate::client::CommandApi;
use crate::command::{CommandRecord, CommandStatus, CommandSubmission};
use crate::error::Result;
use crate::waiter::{CommandWaiter, WaitConfig};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Locally tracked state of a command resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResourceState {
    pub record_id: String,
    pub task_id: String,
    pub status: CommandStatus,
    pub name: String,
    pub content: String,
}

impl From<&CommandRecord> for CommandResourceState {
    fn from(record: &CommandRecord) -> Self {
        Self {
            record_id: record.record_id.clone(),
            task_id: record.task_id.clone(),
            status: record.status.clone(),
            name: record.name.clone(),
            content: record.content.clone(),
        }
    }
}

pub struct CommandResource<'a, A: CommandApi + ?Sized> {
    api: &'a A,
    wait: WaitConfig,
}

impl<'a, A: CommandApi + ?Sized> CommandResource<'a, A> {
    pub fn new(api: &'a A, wait: WaitConfig) -> Self {
        Self { api, wait }
    }

    /// Send the command; the state holds the freshly minted ids
    pub async fn create(&self, submission: &CommandSubmission) -> Result<CommandResourceState> {
        let record = self.api.create_command(submission).await?;

        let mut state = CommandResourceState::from(&record);
        // sendCommand may echo neither name nor content back
        if state.name.is_empty() {
            state.name = submission.name.clone();
        }
        if state.content.is_empty() {
            state.content = submission.content.clone();
        }

        tracing::info!(
            record_id = %state.record_id,
            task_id = %state.task_id,
            status = %state.status,
            "Created command resource"
        );
        Ok(state)
    }

    /// Re-read the record and wait until it finishes
    pub async fn read(
        &self,
        record_id: &str,
        cancel: &CancellationToken,
    ) -> Result<CommandResourceState> {
        let record = self.api.describe_command(record_id).await?;
        tracing::debug!(
            record_id = %record.record_id,
            status = %record.status,
            "Read command resource"
        );

        let waiter = CommandWaiter::new(self.api, self.wait.clone());
        let done = waiter
            .wait_for_completion(
                &record.record_id,
                &record.task_id,
                &CommandStatus::Failed,
                cancel,
            )
            .await?;

        Ok(CommandResourceState::from(&done))
    }

    pub fn update(&self, state: &CommandResourceState) -> CommandResourceState {
        tracing::debug!(record_id = %state.record_id, "Updated command resource (no-op)");
        state.clone()
    }

    pub fn delete(&self, state: &CommandResourceState) {
        tracing::debug!(record_id = %state.record_id, "Deleted command resource (no-op)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandStep, HostType};
    use crate::error::CmpError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeApi {
        describe_statuses: Mutex<Vec<CommandStatus>>,
    }

    #[async_trait]
    impl CommandApi for FakeApi {
        async fn create_command(&self, _submission: &CommandSubmission) -> Result<CommandRecord> {
            Ok(CommandRecord::new("r1", "t1", CommandStatus::New))
        }

        async fn describe_command(&self, record_id: &str) -> Result<CommandRecord> {
            let mut statuses = self.describe_statuses.lock().unwrap();
            let status = if statuses.len() > 1 {
                statuses.remove(0)
            } else {
                statuses[0].clone()
            };
            let mut record = CommandRecord::new(record_id, "t1", status);
            record.content = "pwd".to_string();
            Ok(record)
        }

        async fn describe_command_steps(
            &self,
            _task_id: &str,
            _page: u32,
            _page_size: u32,
        ) -> Result<Vec<CommandStep>> {
            Ok(vec![CommandStep {
                step_log: "permission denied".to_string(),
                ..Default::default()
            }])
        }
    }

    fn api(statuses: &[CommandStatus]) -> FakeApi {
        FakeApi {
            describe_statuses: Mutex::new(statuses.to_vec()),
        }
    }

    fn config() -> WaitConfig {
        WaitConfig {
            delay: Duration::ZERO,
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }

    #[tokio::test]
    async fn test_create_fills_missing_fields_from_submission() {
        let api = api(&[CommandStatus::New]);
        let resource = CommandResource::new(&api, config());
        let submission =
            CommandSubmission::new(HostType::VirtualMachine, "pwd", "vm-1").with_name("deploy-1");

        let state = resource.create(&submission).await.unwrap();

        assert_eq!(state.record_id, "r1");
        assert_eq!(state.task_id, "t1");
        assert_eq!(state.status, CommandStatus::New);
        assert_eq!(state.name, "deploy-1");
        assert_eq!(state.content, "pwd");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_waits_for_success() {
        let api = api(&[
            CommandStatus::New,
            CommandStatus::Deploying,
            CommandStatus::Success,
        ]);
        let resource = CommandResource::new(&api, config());

        let state = resource.read("r1", &CancellationToken::new()).await.unwrap();

        assert_eq!(state.status, CommandStatus::Success);
        assert_eq!(state.record_id, "r1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_reports_failure_reason() {
        let api = api(&[CommandStatus::Deploying, CommandStatus::Failed]);
        let resource = CommandResource::new(&api, config());

        let err = resource.read("r1", &CancellationToken::new()).await.unwrap_err();

        assert!(matches!(
            err,
            CmpError::RemoteFailure { ref reason, .. } if reason == "permission denied"
        ));
    }

    #[test]
    fn test_update_and_delete_are_local() {
        let api = api(&[CommandStatus::New]);
        let resource = CommandResource::new(&api, config());
        let record = CommandRecord::new("r1", "t1", CommandStatus::Success);
        let state = CommandResourceState::from(&record);

        assert_eq!(resource.update(&state), state);
        resource.delete(&state);
    }
}
