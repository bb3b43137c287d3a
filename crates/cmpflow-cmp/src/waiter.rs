//! Command completion poller
//!
//! Re-reads a command record on a fixed schedule until it reaches `success`
//! or the caller's failure sentinel. Statuses outside the known pending set
//! keep the poller waiting, so an unknown terminal status runs into the
//! timeout instead of failing early.
//!
//! ```text
//!  start ──delay──▶ refresh ──pending──▶ sleep(poll_interval) ──▶ refresh ...
//!                      │
//!                      ├── success ─────▶ Ok(record)
//!                      └── fail_state ──▶ steps(page 1, size 1) ──▶ Err(RemoteFailure)
//! ```

use crate::client::CommandApi;
use crate::command::{CommandRecord, CommandStatus};
use crate::error::{CmpError, Result};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout_at};
use tokio_util::sync::CancellationToken;

/// Shortest pause the poller takes between two refreshes
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polling schedule (fixed, no backoff)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Quiet period before the first refresh
    pub delay: Duration,
    /// Pause between two refreshes, never shorter than [`MIN_POLL_INTERVAL`]
    pub poll_interval: Duration,
    /// Wall-clock ceiling measured from the start of the wait
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(60),
            poll_interval: Duration::from_secs(20),
            timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Outcome of a single refresh that did not end in an error
#[derive(Debug, Clone, PartialEq)]
pub enum Refresh {
    /// Not terminal yet; carries the observed status
    Pending(CommandStatus),
    /// Reached `success`
    Done(CommandRecord),
}

/// Waits for one command to finish
pub struct CommandWaiter<'a, A: CommandApi + ?Sized> {
    api: &'a A,
    config: WaitConfig,
}

impl<'a, A: CommandApi + ?Sized> CommandWaiter<'a, A> {
    pub fn new(api: &'a A, config: WaitConfig) -> Self {
        Self { api, config }
    }

    /// Fetch the record once and classify it
    ///
    /// On `fail_state` the first step of the task is fetched and its log
    /// becomes the failure reason. API errors are returned unchanged.
    pub async fn refresh(
        &self,
        record_id: &str,
        task_id: &str,
        fail_state: &CommandStatus,
    ) -> Result<Refresh> {
        let record = self.api.describe_command(record_id).await?;

        if &record.status == fail_state {
            // Prefer the task the CMP reports over the caller's copy
            let task_id = if record.task_id.is_empty() {
                task_id.to_string()
            } else {
                record.task_id.clone()
            };

            // Only the first step explains the failure
            let mut steps = self.api.describe_command_steps(&task_id, 1, 1).await?;
            if steps.len() != 1 {
                return Err(CmpError::AmbiguousStep {
                    task_id,
                    found: steps.len(),
                });
            }

            let step = steps.remove(0);
            tracing::debug!(
                record_id,
                task_id = %task_id,
                step_id = %step.step_id,
                machine = %step.machine_name,
                "Command reached failure state"
            );
            return Err(CmpError::RemoteFailure {
                record: Box::new(record),
                reason: step.step_log,
            });
        }

        if record.status.is_target() {
            return Ok(Refresh::Done(record));
        }

        Ok(Refresh::Pending(record.status))
    }

    /// Poll until the command reaches `success` or `fail_state`
    ///
    /// # Returns
    /// * `Ok(record)` - the record in `success`
    /// * `Err(CmpError::RemoteFailure)` - `fail_state` reached; carries the record and step log
    /// * `Err(CmpError::Timeout)` - no terminal state within `timeout`
    /// * `Err(CmpError::Cancelled)` - `cancel` fired
    /// * any API error from a refresh, unchanged
    pub async fn wait_for_completion(
        &self,
        record_id: &str,
        task_id: &str,
        fail_state: &CommandStatus,
        cancel: &CancellationToken,
    ) -> Result<CommandRecord> {
        let deadline = Instant::now() + self.config.timeout;
        let mut last_status = None;

        tracing::info!(
            record_id,
            task_id,
            timeout = ?self.config.timeout,
            "Waiting for command to complete"
        );

        let outcome = {
            let poll = timeout_at(
                deadline,
                self.poll(record_id, task_id, fail_state, &mut last_status),
            );
            // Cancellation wins over a poll that is ready at the same time
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                outcome = poll => Some(outcome),
            }
        };

        match outcome {
            None => {
                tracing::info!(record_id, "Waiting for command cancelled");
                Err(CmpError::Cancelled)
            }
            Some(Ok(result)) => result,
            Some(Err(_elapsed)) => Err(CmpError::Timeout {
                timeout: self.config.timeout,
                last_status,
            }),
        }
    }

    async fn poll(
        &self,
        record_id: &str,
        task_id: &str,
        fail_state: &CommandStatus,
        last_status: &mut Option<CommandStatus>,
    ) -> Result<CommandRecord> {
        let interval = self.config.poll_interval.max(MIN_POLL_INTERVAL);
        let mut unrecognized = UnrecognizedStatuses::default();

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        loop {
            match self.refresh(record_id, task_id, fail_state).await? {
                Refresh::Done(record) => {
                    tracing::info!(record_id, "Command executed successfully");
                    return Ok(record);
                }
                Refresh::Pending(status) => {
                    if unrecognized.first_sighting(&status) {
                        tracing::warn!(
                            record_id,
                            status = %status,
                            "Unrecognized command status, continuing to wait"
                        );
                    }
                    tracing::debug!(record_id, status = %status, "Command still pending");
                    *last_status = Some(status);
                }
            }

            sleep(interval).await;
        }
    }
}

/// Statuses outside the pending set already reported during one wait
#[derive(Debug, Default)]
struct UnrecognizedStatuses {
    seen: HashSet<CommandStatus>,
}

impl UnrecognizedStatuses {
    /// `true` the first time a non-pending status shows up
    fn first_sighting(&mut self, status: &CommandStatus) -> bool {
        !status.is_pending() && self.seen.insert(status.clone())
    }
}
