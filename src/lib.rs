//! Blocking client for the Unify data-mastering platform's versioned REST
//! API: dataset and project lookup, model training and prediction, and
//! waiting on the long-running operations those actions schedule.
#![deny(clippy::all)]
mod error;
pub mod resources;
pub mod retry;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use http::Method;
use log::debug;
use once_cell::sync::Lazy;
use reqwest::{
    blocking::{Client as HttpClient, Response as HttpResponse},
    header::{self, HeaderMap, HeaderValue},
    Proxy, Result as ReqwestResult, StatusCode,
};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::atomic::Ordering,
    thread::sleep,
    time::{Duration, Instant},
};
use url::Url;

use crate::resources::{dataset::UnifiedDatasetBody, operation::OperationBody, ApiErrorBody};
use crate::retry::{Retrier, RetryConfig};

pub use crate::{
    error::{Error, Result},
    resources::{
        categorization,
        dataset::{
            Dataset, DatasetAlias, Id as DatasetId, Identifier as DatasetIdentifier,
            Name as DatasetName, UnifiedDataset,
        },
        machine_learning::MachineLearningModel,
        mastering::{
            self, EstimatedPairCounts, PairCountEstimate, PublishedClustersConfiguration,
        },
        operation::{Id as OperationId, Operation, OperationState, OperationStatus, WaitOptions},
        project::{
            Id as ProjectId, Identifier as ProjectIdentifier, Name as ProjectName, Project,
            ProjectKind,
        },
        Modification, RelativeId,
    },
};

/// Username and password for the platform's `BasicCreds` auth scheme.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub struct Config {
    pub endpoint: Url,
    pub credentials: Credentials,
    pub accept_invalid_certificates: bool,
    pub proxy: Option<Url>,
    /// Retry settings to use, if any. These apply to idempotent GET requests
    /// only; POSTs that schedule server-side work are never retried.
    pub retry_config: Option<RetryConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: DEFAULT_ENDPOINT.clone(),
            credentials: Credentials::new("", ""),
            accept_invalid_certificates: false,
            proxy: None,
            retry_config: None,
        }
    }
}

#[derive(Debug)]
pub struct Client {
    endpoints: Endpoints,
    http_client: HttpClient,
    headers: HeaderMap,
    retrier: Option<Retrier>,
}

#[derive(Serialize)]
struct NameFilterQuery {
    filter: String,
}

impl Client {
    /// Create a new API client.
    pub fn new(config: Config) -> Result<Client> {
        let http_client = build_http_client(&config)?;
        let headers = build_headers(&config)?;
        let endpoints = Endpoints::new(config.endpoint)?;
        let retrier = config.retry_config.map(Retrier::new);
        Ok(Client {
            endpoints,
            http_client,
            headers,
            retrier,
        })
    }

    /// Get the base url for the client
    pub fn base_url(&self) -> &Url {
        &self.endpoints.base
    }

    /// List all datasets.
    pub fn get_datasets(&self) -> Result<Vec<Dataset>> {
        self.get(self.endpoints.datasets.clone())
    }

    /// Get a dataset by either id or name.
    pub fn get_dataset(&self, dataset: impl Into<DatasetIdentifier>) -> Result<Dataset> {
        match dataset.into() {
            DatasetIdentifier::Id(dataset_id) => {
                self.get(self.endpoints.dataset_by_id(&dataset_id)?)
            }
            DatasetIdentifier::Name(dataset_name) => self.get_dataset_by_name(&dataset_name),
        }
    }

    fn get_dataset_by_name(&self, name: &DatasetName) -> Result<Dataset> {
        let url = self.endpoints.datasets.clone();
        let datasets: Vec<Dataset> = self.get_query(
            url.clone(),
            &NameFilterQuery {
                filter: format!("name=={}", name.0),
            },
        )?;
        // The filter can match more than the exact name; pick the exact one.
        datasets
            .into_iter()
            .find(|dataset| &dataset.name == name)
            .ok_or(Error::NotFound { url })
    }

    /// List all projects.
    pub fn get_projects(&self) -> Result<Vec<Project>> {
        self.get(self.endpoints.projects.clone())
    }

    /// Get a project by either id or name.
    pub fn get_project(&self, project: impl Into<ProjectIdentifier>) -> Result<Project> {
        match project.into() {
            ProjectIdentifier::Id(project_id) => {
                self.get(self.endpoints.project_by_id(&project_id)?)
            }
            ProjectIdentifier::Name(project_name) => self.get_project_by_name(&project_name),
        }
    }

    fn get_project_by_name(&self, name: &ProjectName) -> Result<Project> {
        let url = self.endpoints.projects.clone();
        let projects: Vec<Project> = self.get_query(
            url.clone(),
            &NameFilterQuery {
                filter: format!("name=={}", name.0),
            },
        )?;
        projects
            .into_iter()
            .find(|project| &project.name == name)
            .ok_or(Error::NotFound { url })
    }

    /// Get a project's unified dataset.
    pub fn unified_dataset(&self, project: &Project) -> Result<UnifiedDataset> {
        let url = self
            .endpoints
            .resource(&project.relative_id.join("unifiedDataset"))?;
        let body: UnifiedDatasetBody = self.get(url.clone())?;
        Ok(UnifiedDataset::from_body(url, body))
    }

    /// Commit the project's configuration, rebuilding the unified dataset and
    /// everything derived from it, and wait for the rebuild to finish.
    pub fn apply_changes(&self, unified_dataset: &UnifiedDataset) -> Result<Operation> {
        let operation = self.apply_changes_async(unified_dataset)?;
        self.wait_for_operation(operation)
    }

    /// Like [`Client::apply_changes`], but returns the freshly scheduled
    /// operation instead of waiting on it.
    pub fn apply_changes_async(&self, unified_dataset: &UnifiedDataset) -> Result<Operation> {
        self.submit_operation(action_url(&unified_dataset.url, "refresh")?)
    }

    /// Rebuild a dataset from its upstream inputs.
    pub fn refresh_dataset(&self, dataset: &Dataset) -> Result<Operation> {
        self.submit_operation(self.endpoints.resource_action(&dataset.relative_id, "refresh")?)
    }

    /// Rebuild a dataset addressed through a project's path.
    pub fn refresh_dataset_alias(&self, alias: &DatasetAlias) -> Result<Operation> {
        self.submit_operation(self.endpoints.resource_action(&alias.0, "refresh")?)
    }

    /// Get an operation by id.
    pub fn get_operation(&self, operation_id: &OperationId) -> Result<Operation> {
        let body: OperationBody = self.get(self.endpoints.operation_by_id(operation_id)?)?;
        Operation::from_body(&self.endpoints, body)
    }

    /// Fetch a fresh snapshot of an operation.
    pub fn poll_operation(&self, operation: &Operation) -> Result<Operation> {
        let body: OperationBody = self.get(operation.url.clone())?;
        Operation::from_body(&self.endpoints, body)
    }

    /// Follow an operation until it reaches a terminal state, polling at the
    /// default interval.
    pub fn wait_for_operation(&self, operation: Operation) -> Result<Operation> {
        self.wait_for_operation_with(operation, &WaitOptions::default())
    }

    /// Follow an operation until it reaches a terminal state.
    ///
    /// Returns the terminal snapshot without judging it: callers decide what
    /// a `FAILED` or `CANCELED` outcome means for them. An operation that is
    /// already terminal is returned as-is without touching the network.
    pub fn wait_for_operation_with(
        &self,
        mut operation: Operation,
        options: &WaitOptions,
    ) -> Result<Operation> {
        let started = Instant::now();
        loop {
            if operation.is_terminal() {
                return Ok(operation);
            }
            check_deadline_and_cancellation(&operation, started, options)?;
            operation = self.poll_operation(&operation)?;
            if operation.is_terminal() {
                return Ok(operation);
            }
            check_deadline_and_cancellation(&operation, started, options)?;
            debug!(
                "Operation `{}` is {}; polling again in {:?}",
                operation.url,
                operation.state(),
                options.poll_interval
            );
            sleep(options.poll_interval);
        }
    }

    /// Train a model on its project's current labels.
    pub fn train(&self, model: &MachineLearningModel) -> Result<Operation> {
        self.submit_operation(self.endpoints.resource_action(&model.relative_id, "refresh")?)
    }

    /// Regenerate a model's predictions for its project's current records.
    pub fn predict(&self, model: &MachineLearningModel) -> Result<Operation> {
        self.submit_operation(
            self.endpoints
                .resource_action(&model.relative_id.join("predictions"), "refresh")?,
        )
    }

    /// Retention settings for a mastering project's published clusters.
    pub fn published_clusters_configuration(
        &self,
        project: &Project,
    ) -> Result<PublishedClustersConfiguration> {
        mastering::require_dedup(project)?;
        self.get(
            self.endpoints
                .resource(&project.relative_id.join("publishedClustersConfiguration"))?,
        )
    }

    /// Estimate how many record pairs the project's current pair-generation
    /// clauses would produce.
    pub fn estimate_pairs(&self, project: &Project) -> Result<EstimatedPairCounts> {
        mastering::require_dedup(project)?;
        self.get(
            self.endpoints
                .resource(&project.relative_id.join("estimatedPairCounts"))?,
        )
    }

    /// Update the published cluster ids of a mastering project.
    pub fn refresh_published_cluster_ids(&self, project: &Project) -> Result<Operation> {
        mastering::require_dedup(project)?;
        self.submit_operation(self.endpoints.resource_action(
            &project.relative_id.join("allPublishedClusterIds"),
            "refresh",
        )?)
    }

    /// The published clusters of a mastering project.
    pub fn published_clusters(&self, project: &Project) -> Result<Dataset> {
        self.cluster_dataset(project, mastering::published_clusters_name)
    }

    /// The record clusters of a mastering project, joined with the records.
    pub fn record_clusters_with_data(&self, project: &Project) -> Result<Dataset> {
        self.cluster_dataset(project, mastering::record_clusters_with_data_name)
    }

    /// The published clusters of a mastering project, joined with the records.
    pub fn published_clusters_with_data(&self, project: &Project) -> Result<Dataset> {
        self.cluster_dataset(project, mastering::published_clusters_with_data_name)
    }

    fn cluster_dataset(
        &self,
        project: &Project,
        derive_name: fn(&DatasetName) -> DatasetName,
    ) -> Result<Dataset> {
        mastering::require_dedup(project)?;
        let unified_dataset = self.unified_dataset(project)?;
        self.get_dataset(derive_name(&unified_dataset.name))
    }

    fn get<SuccessT>(&self, url: Url) -> Result<SuccessT>
    where
        for<'de> SuccessT: Deserialize<'de>,
    {
        self.request(&Method::GET, &url, &None::<()>, &Retry::Yes)
    }

    fn get_query<QueryT, SuccessT>(&self, url: Url, query: &QueryT) -> Result<SuccessT>
    where
        QueryT: Serialize,
        for<'de> SuccessT: Deserialize<'de>,
    {
        self.request(&Method::GET, &url, &Some(query), &Retry::Yes)
    }

    /// POST an action URL and hand back the operation the server scheduled.
    /// Actions are not idempotent, so they go out exactly once.
    fn submit_operation(&self, url: Url) -> Result<Operation> {
        debug!("Attempting POST `{}`", url);
        let http_response = self.raw_request(&Method::POST, &url, &None::<()>, &Retry::No)?;

        let status = http_response.status();
        if status == StatusCode::NO_CONTENT {
            return Operation::no_op(&self.endpoints);
        }
        if !status.is_success() {
            return Err(response_error(&url, status, http_response));
        }
        let body = json_body(&url, http_response)?;
        Operation::from_body(&self.endpoints, body)
    }

    fn request<QueryT, SuccessT>(
        &self,
        method: &Method,
        url: &Url,
        query: &Option<QueryT>,
        retry: &Retry,
    ) -> Result<SuccessT>
    where
        QueryT: Serialize,
        for<'de> SuccessT: Deserialize<'de>,
    {
        debug!("Attempting {} `{}`", method, url);
        let http_response = self.raw_request(method, url, query, retry)?;

        let status = http_response.status();
        if !status.is_success() {
            return Err(response_error(url, status, http_response));
        }
        json_body(url, http_response)
    }

    fn raw_request<QueryT>(
        &self,
        method: &Method,
        url: &Url,
        query: &Option<QueryT>,
        retry: &Retry,
    ) -> Result<HttpResponse>
    where
        QueryT: Serialize,
    {
        let do_request = || {
            let request = self
                .http_client
                .request(method.clone(), url.clone())
                .headers(self.headers.clone());
            let request = match &query {
                Some(query) => request.query(query),
                None => request,
            };
            request.send()
        };

        let result = match retry {
            Retry::Yes => self.with_retries(do_request),
            Retry::No => do_request(),
        };
        result.map_err(|source| Error::ReqwestError {
            source,
            message: format!("{method} operation failed."),
        })
    }

    fn with_retries(
        &self,
        send_request: impl Fn() -> ReqwestResult<HttpResponse>,
    ) -> ReqwestResult<HttpResponse> {
        match &self.retrier {
            Some(retrier) => retrier.with_retries(send_request),
            None => send_request(),
        }
    }
}

#[derive(Copy, Clone)]
enum Retry {
    Yes,
    No,
}

#[derive(Debug)]
pub(crate) struct Endpoints {
    base: Url,
    datasets: Url,
    projects: Url,
}

impl Endpoints {
    pub(crate) fn new(base: Url) -> Result<Self> {
        let datasets = construct_endpoint(&base, &["api", "versioned", "v1", "datasets"])?;
        let projects = construct_endpoint(&base, &["api", "versioned", "v1", "projects"])?;

        Ok(Endpoints {
            base,
            datasets,
            projects,
        })
    }

    fn dataset_by_id(&self, dataset_id: &DatasetId) -> Result<Url> {
        construct_endpoint(
            &self.base,
            &["api", "versioned", "v1", "datasets", &dataset_id.0],
        )
    }

    fn project_by_id(&self, project_id: &ProjectId) -> Result<Url> {
        construct_endpoint(
            &self.base,
            &["api", "versioned", "v1", "projects", &project_id.0],
        )
    }

    pub(crate) fn operation_by_id(&self, operation_id: &OperationId) -> Result<Url> {
        construct_endpoint(
            &self.base,
            &["api", "versioned", "v1", "operations", &operation_id.0],
        )
    }

    fn resource(&self, relative_id: &RelativeId) -> Result<Url> {
        let mut segments = vec!["api", "versioned", "v1"];
        segments.extend(relative_id.0.split('/'));
        construct_endpoint(&self.base, &segments)
    }

    fn resource_action(&self, relative_id: &RelativeId, action: &str) -> Result<Url> {
        action_url(&self.resource(relative_id)?, action)
    }
}

fn check_deadline_and_cancellation(
    operation: &Operation,
    started: Instant,
    options: &WaitOptions,
) -> Result<()> {
    if let Some(cancellation) = &options.cancellation {
        if cancellation.load(Ordering::SeqCst) {
            return Err(Error::OperationCanceled {
                url: operation.url.clone(),
            });
        }
    }
    if let Some(timeout) = options.timeout {
        if started.elapsed() >= timeout {
            return Err(Error::OperationTimedOut {
                url: operation.url.clone(),
                timeout,
            });
        }
    }
    Ok(())
}

fn construct_endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut endpoint = base.clone();

    let mut endpoint_segments = endpoint
        .path_segments_mut()
        .map_err(|_| Error::BadEndpoint {
            endpoint: base.clone(),
        })?;

    for segment in segments {
        endpoint_segments.push(segment);
    }

    drop(endpoint_segments);

    Ok(endpoint)
}

/// Rewrite the last path segment to the platform's `segment:action` calling
/// convention, e.g. `datasets/3` plus `refresh` becomes `datasets/3:refresh`.
fn action_url(resource: &Url, action: &str) -> Result<Url> {
    let mut url = resource.clone();

    let last = url
        .path_segments()
        .and_then(|segments| segments.last().map(ToOwned::to_owned))
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| Error::BadEndpoint {
            endpoint: resource.clone(),
        })?;

    let mut segments = url.path_segments_mut().map_err(|_| Error::BadEndpoint {
        endpoint: resource.clone(),
    })?;
    segments.pop().push(&format!("{last}:{action}"));
    drop(segments);

    Ok(url)
}

fn response_error(url: &Url, status: StatusCode, http_response: HttpResponse) -> Error {
    if status == StatusCode::NOT_FOUND {
        return Error::NotFound { url: url.clone() };
    }

    let message = http_response
        .text()
        .ok()
        .map(|body| match serde_json::from_str::<ApiErrorBody>(&body) {
            Ok(ApiErrorBody {
                message: Some(message),
            }) => message,
            _ => body.trim().to_owned(),
        })
        .unwrap_or_default();
    Error::Api {
        status_code: status,
        message,
    }
}

fn json_body<SuccessT>(url: &Url, http_response: HttpResponse) -> Result<SuccessT>
where
    for<'de> SuccessT: Deserialize<'de>,
{
    let body = http_response.text().map_err(|source| Error::ReqwestError {
        source,
        message: format!("Failed reading response from `{url}`."),
    })?;
    serde_json::from_str(&body).map_err(|source| Error::MalformedResponse {
        url: url.clone(),
        source,
    })
}

const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 120;

fn build_http_client(config: &Config) -> Result<HttpClient> {
    let mut builder = HttpClient::builder()
        .gzip(true)
        .danger_accept_invalid_certs(config.accept_invalid_certificates)
        .timeout(Some(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECONDS)));

    if let Some(proxy) = config.proxy.clone() {
        builder = builder.proxy(Proxy::all(proxy).map_err(Error::BuildHttpClient)?);
    }
    builder.build().map_err(Error::BuildHttpClient)
}

fn build_headers(config: &Config) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

    let encoded = STANDARD.encode(format!(
        "{}:{}",
        config.credentials.username, config.credentials.password
    ));
    headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("BasicCreds {encoded}")).map_err(|_| {
            Error::BadCredentials {
                username: config.credentials.username.clone(),
            }
        })?,
    );
    Ok(headers)
}

pub static DEFAULT_ENDPOINT: Lazy<Url> =
    Lazy::new(|| Url::parse("http://localhost:9100").expect("Default URL is well-formed"));
