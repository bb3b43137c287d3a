//! Command API data types

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

const DEFAULT_DESCRIPTION: &str = "Created by `cmpflow`";

/// Kind of host a command runs on, sent as a string code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum HostType {
    /// `"1"`
    VirtualMachine,
    /// `"2"`
    PhysicalMachine,
}

impl HostType {
    pub fn code(&self) -> &'static str {
        match self {
            HostType::VirtualMachine => "1",
            HostType::PhysicalMachine => "2",
        }
    }
}

impl FromStr for HostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "vm" | "virtual-machine" => Ok(HostType::VirtualMachine),
            "2" | "pm" | "physical-machine" => Ok(HostType::PhysicalMachine),
            other => Err(format!(
                "unknown host type '{}' (expected 1/virtual-machine or 2/physical-machine)",
                other
            )),
        }
    }
}

impl From<HostType> for String {
    fn from(host_type: HostType) -> Self {
        host_type.code().to_string()
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Command status as reported by the CMP
///
/// The remote side sends a free-form string. The four known values map to
/// their own variants and anything else is kept verbatim in `Unrecognized`,
/// so callers decide explicitly how to treat statuses they do not know.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CommandStatus {
    /// Accepted, not started yet
    New,
    /// Running on the target machines
    Deploying,
    Success,
    Failed,
    Unrecognized(String),
}

impl CommandStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CommandStatus::New => "new",
            CommandStatus::Deploying => "deploying",
            CommandStatus::Success => "success",
            CommandStatus::Failed => "failed",
            CommandStatus::Unrecognized(raw) => raw,
        }
    }

    /// `new` or `deploying`
    pub fn is_pending(&self) -> bool {
        matches!(self, CommandStatus::New | CommandStatus::Deploying)
    }

    pub fn is_target(&self) -> bool {
        matches!(self, CommandStatus::Success)
    }
}

impl From<String> for CommandStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "new" => CommandStatus::New,
            "deploying" => CommandStatus::Deploying,
            "success" => CommandStatus::Success,
            "failed" => CommandStatus::Failed,
            _ => CommandStatus::Unrecognized(raw),
        }
    }
}

impl From<&str> for CommandStatus {
    fn from(raw: &str) -> Self {
        CommandStatus::from(raw.to_string())
    }
}

impl From<CommandStatus> for String {
    fn from(status: CommandStatus) -> Self {
        match status {
            CommandStatus::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for `sendCommand`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSubmission {
    pub name: String,
    pub content: String,
    pub host_type: HostType,
    /// Comma separated instance ids
    pub instance_ids: String,
    pub description: String,
}

impl CommandSubmission {
    /// Create a submission with a generated name and the default description
    pub fn new(
        host_type: HostType,
        content: impl Into<String>,
        instance_ids: impl Into<String>,
    ) -> Self {
        Self {
            name: default_name(),
            content: content.into(),
            host_type,
            instance_ids: instance_ids.into(),
            description: DEFAULT_DESCRIPTION.to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Iterate over the individual instance ids
    pub fn instances(&self) -> impl Iterator<Item = &str> {
        self.instance_ids
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// `cmpflow-deploy-20240501103000`
fn default_name() -> String {
    format!("cmpflow-deploy-{}", Local::now().format("%Y%m%d%H%M%S"))
}

/// One snapshot of a command record
///
/// `sendCommand` returns the id as `recordId`, `getEntity` as `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    #[serde(alias = "id")]
    pub record_id: String,

    #[serde(default)]
    pub task_id: String,

    pub status: CommandStatus,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub content: String,

    /// Creator
    #[serde(default)]
    pub user_id: String,

    #[serde(default)]
    pub machines: String,

    #[serde(default)]
    pub create_time: Option<DateTime<FixedOffset>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<FixedOffset>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<FixedOffset>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<serde_json::Value>,
}

impl CommandRecord {
    pub fn new(
        record_id: impl Into<String>,
        task_id: impl Into<String>,
        status: CommandStatus,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            task_id: task_id.into(),
            status,
            name: String::new(),
            content: String::new(),
            user_id: String::new(),
            machines: String::new(),
            create_time: None,
            start_time: None,
            end_time: None,
            description: None,
        }
    }
}

/// One execution step of a task on one machine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommandStep {
    pub step_id: String,
    pub machine_id: String,
    pub machine_name: String,
    pub machine_code: String,
    pub instance_code: String,
    pub agent: String,
    pub step_content: String,
    pub step_desc: String,
    pub step_status: String,
    /// Diagnostic output, filled when the step failed
    pub step_log: String,
    #[serde(deserialize_with = "progress_from_number_or_text")]
    pub progress: Option<f64>,
    pub start_time: Option<DateTime<FixedOffset>>,
    pub end_time: Option<DateTime<FixedOffset>>,
    pub create_time: Option<DateTime<FixedOffset>>,
}

/// The CMP sends progress either as a number or as a numeric string ("100", "50%")
fn progress_from_number_or_text<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(text)) => {
            let text = text.trim().trim_end_matches('%');
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<f64>()
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
    }
}
