//! CMP remote command client for cmpflow
//!
//! This crate talks to the command API of a cloud management platform (CMP):
//! it submits commands to a set of instances, re-reads the command record and
//! waits until the remote execution reaches a terminal state.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │                  cmpflow CLI                   │
//! └───────────────────────┬────────────────────────┘
//!                         │
//! ┌───────────────────────▼────────────────────────┐
//! │                  cmpflow-cmp                   │
//! │  ┌─────────────────┐    ┌───────────────────┐  │
//! │  │ CommandResource │───▶│   CommandWaiter   │  │
//! │  └────────┬────────┘    └─────────┬─────────┘  │
//! │  ┌────────▼───────────────────────▼─────────┐  │
//! │  │       trait CommandApi (CmpClient)       │  │
//! │  └──────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cmpflow_cmp::{CmpClient, CommandStatus, CommandSubmission, CommandWaiter, HostType};
//! use cmpflow_cmp::{RequestOptions, WaitConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = CmpClient::new(RequestOptions::new("https://cmp.example.com", Some(token)));
//! let submission = CommandSubmission::new(HostType::VirtualMachine, "pwd", "c0dea473-...");
//! let record = client.create_command(&submission).await?;
//!
//! let waiter = CommandWaiter::new(&client, WaitConfig::default());
//! let done = waiter
//!     .wait_for_completion(&record.record_id, &record.task_id, &CommandStatus::Failed, &CancellationToken::new())
//!     .await?;
//! ```

pub mod client;
pub mod command;
pub mod error;
pub mod resource;
pub mod waiter;

pub use client::{CmpClient, CommandApi, MAIN_API_CONTEXT, RequestOptions};
pub use command::{CommandRecord, CommandStatus, CommandStep, CommandSubmission, HostType};
pub use error::{CmpError, Result};
pub use resource::{CommandResource, CommandResourceState};
pub use waiter::{CommandWaiter, MIN_POLL_INTERVAL, Refresh, WaitConfig};
