use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
    sync::{atomic::AtomicBool, Arc},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use url::Url;

use crate::{
    error::{Error, Result},
    Endpoints,
};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Id(pub String);

/// Snapshot of a long-running server-side job. Snapshots never change;
/// polling the operations endpoint produces a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub url: Url,
    /// Wire field `type`, e.g. `"SPARK"`. Informational.
    pub kind: String,
    pub description: Option<String>,
    pub status: OperationStatus,
}

impl Operation {
    pub(crate) fn from_body(endpoints: &Endpoints, body: OperationBody) -> Result<Self> {
        Ok(Operation {
            url: endpoints.operation_by_id(&Id(body.id))?,
            kind: body.kind,
            description: body.description,
            status: body.status,
        })
    }

    /// Stand-in for a POST the server answered with 204 No Content: nothing
    /// needed doing, no job was scheduled, and the outcome is already final.
    pub(crate) fn no_op(endpoints: &Endpoints) -> Result<Self> {
        Ok(Operation {
            url: endpoints.operation_by_id(&Id("-1".to_owned()))?,
            kind: "NOOP".to_owned(),
            description: Some("The requested action required no work".to_owned()),
            status: OperationStatus {
                state: OperationState::Succeeded,
                message: String::new(),
                start_time: String::new(),
                end_time: String::new(),
            },
        })
    }

    pub fn id(&self) -> Id {
        Id(self
            .url
            .path()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_owned())
    }

    pub fn state(&self) -> &OperationState {
        &self.status.state
    }

    pub fn is_terminal(&self) -> bool {
        self.status.state.is_terminal()
    }

    pub fn succeeded(&self) -> bool {
        self.status.state == OperationState::Succeeded
    }
}

/// Status block of an operation document. Only `state` drives client
/// behavior; the other fields are informational and stay empty until the
/// server fills them in.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    pub state: OperationState,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

#[derive(Debug, Clone, SerializeDisplay, DeserializeFromStr, PartialEq, Eq, Hash)]
pub enum OperationState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Unknown(Box<str>),
}

impl OperationState {
    /// Whether the server will never change this state again. Labels this
    /// client does not recognise are treated as still in flight.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationState::Succeeded | OperationState::Failed | OperationState::Canceled
        )
    }
}

impl FromStr for OperationState {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self> {
        Ok(match string {
            "PENDING" => OperationState::Pending,
            "RUNNING" => OperationState::Running,
            "SUCCEEDED" => OperationState::Succeeded,
            "FAILED" => OperationState::Failed,
            "CANCELED" => OperationState::Canceled,
            value => OperationState::Unknown(value.into()),
        })
    }
}

impl Display for OperationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{}",
            match self {
                OperationState::Pending => "PENDING",
                OperationState::Running => "RUNNING",
                OperationState::Succeeded => "SUCCEEDED",
                OperationState::Failed => "FAILED",
                OperationState::Canceled => "CANCELED",
                OperationState::Unknown(value) => value.as_ref(),
            }
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OperationBody {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    pub status: OperationStatus,
}

/// Controls how [`crate::Client::wait_for_operation_with`] follows a running
/// operation.
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Delay between consecutive polls of the operation's state.
    pub poll_interval: Duration,
    /// Deadline, measured from the start of the wait. `None` waits forever.
    pub timeout: Option<Duration>,
    /// Cooperative cancellation flag. Setting it makes the wait return
    /// [`crate::Error::OperationCanceled`] before the next poll.
    pub cancellation: Option<Arc<AtomicBool>>,
}

impl WaitOptions {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
}

impl Default for WaitOptions {
    fn default() -> Self {
        WaitOptions {
            poll_interval: WaitOptions::DEFAULT_POLL_INTERVAL,
            timeout: None,
            cancellation: None,
        }
    }
}
