//! CMP client error types

use crate::command::{CommandRecord, CommandStatus};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CmpError {
    #[error("[CMP] Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("[CMP] Response code: [{status}], result: [{body}]")]
    Api { status: u16, body: String },

    #[error("[CMP] Unable to decode response: {source}, result: [{body}]")]
    Decode {
        source: serde_json::Error,
        body: String,
    },

    #[error("command step not found ({task_id}): expected exactly 1 row, got {found}")]
    AmbiguousStep { task_id: String, found: usize },

    #[error(
        "timeout while waiting for command to reach 'success' (last state: '{}', timeout: {timeout:?})",
        last_status.as_ref().map(CommandStatus::as_str).unwrap_or("none")
    )]
    Timeout {
        timeout: Duration,
        last_status: Option<CommandStatus>,
    },

    #[error("failed to reach target state. Reason: {reason}")]
    RemoteFailure {
        record: Box<CommandRecord>,
        reason: String,
    },

    #[error("waiting for command was cancelled")]
    Cancelled,
}

impl CmpError {
    /// The record observed in the failure state, if this error carries one
    pub fn record(&self) -> Option<&CommandRecord> {
        match self {
            CmpError::RemoteFailure { record, .. } => Some(record),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CmpError>;
