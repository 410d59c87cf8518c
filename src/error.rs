use std::time::Duration;

use reqwest::StatusCode;
use url::Url;

use crate::resources::project::ProjectKind;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("API request failed with {}: {}", status_code, message)]
    Api {
        status_code: StatusCode,
        message: String,
    },

    #[error("No resource at `{}`", url)]
    NotFound { url: Url },

    #[error("Could not parse JSON response from `{}`", url)]
    MalformedResponse {
        url: Url,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid endpoint `{}`", endpoint)]
    BadEndpoint { endpoint: Url },

    #[error("Credentials for `{}` cannot be sent in an HTTP header", username)]
    BadCredentials { username: String },

    #[error("Expected a dataset id or name, got: {}", identifier)]
    BadDatasetIdentifier { identifier: String },

    #[error("Expected a project id or name, got: {}", identifier)]
    BadProjectIdentifier { identifier: String },

    #[error("Project `{}` is a {} project, expected {}", project, actual, expected)]
    WrongProjectKind {
        project: String,
        expected: ProjectKind,
        actual: ProjectKind,
    },

    #[error("Operation `{}` did not reach a terminal state within {:?}", url, timeout)]
    OperationTimedOut { url: Url, timeout: Duration },

    #[error("Wait for operation `{}` was canceled", url)]
    OperationCanceled { url: Url },

    #[error("Failed to initialise the HTTP client")]
    BuildHttpClient(#[source] reqwest::Error),

    #[error("HTTP request error: {}", message)]
    ReqwestError {
        message: String,
        source: reqwest::Error,
    },
}
