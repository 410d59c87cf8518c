pub mod categorization;
pub mod dataset;
pub mod machine_learning;
pub mod mastering;
pub mod operation;
pub mod project;

use std::fmt::{Display, Formatter, Result as FmtResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned locator of a resource relative to the versioned API root,
/// e.g. `projects/1` or `datasets/4`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct RelativeId(pub String);

impl RelativeId {
    /// The trailing segment, which the server uses as the resource's own id.
    pub fn resource_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub(crate) fn join(&self, suffix: &str) -> Self {
        RelativeId(format!("{}/{}", self.0, suffix))
    }
}

impl Display for RelativeId {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        write!(formatter, "{}", self.0)
    }
}

/// Audit stamp the server attaches to every versioned resource.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Modification {
    pub username: String,
    pub time: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: Option<String>,
}
