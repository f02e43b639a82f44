//! Workflow runs from GitHub REST API and related functions.

use reqwest::{Client, Method, RequestBuilder, StatusCode, header};
use thiserror::Error;
use tracing::debug;

use crate::{
    env::Config,
    workflow::{PULL_REQUEST_EVENT, WorkflowRun, WorkflowRunsPage},
};

/// How many runs a single listing fetches.
pub const PAGE_SIZE: u8 = 50;

const USER_AGENT: &str = concat!("workflow-reaper/", env!("CARGO_PKG_VERSION"));

/// The result of listing workflow runs.
pub type ListResult<T> = Result<T, ListError>;

/// The result of cancelling a workflow run.
pub type CancelResult = Result<(), CancelError>;

/// Listing workflow runs failed.
#[derive(Debug, Error)]
pub enum ListError {
    /// The request never produced a response.
    #[error("failed to fetch workflow runs from {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// GitHub answered with a non-success status.
    #[error("failed to fetch workflow runs from {url}: {status}")]
    Status { url: String, status: StatusCode },
    /// The response body was not a page of workflow runs.
    #[error("failed to parse workflow runs from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Cancelling a single workflow run failed.
#[derive(Debug, Error)]
pub enum CancelError {
    /// The request never produced a response.
    #[error("failed to cancel run {id}: {source}")]
    Request {
        id: u64,
        #[source]
        source: reqwest::Error,
    },
    /// GitHub answered with a non-success status, e.g. 409 for runs that already finished.
    #[error("failed to cancel run {id}: {status}")]
    Status { id: u64, status: StatusCode },
}

/// A directory of the workflow runs of one repository.
pub trait RunDirectory: Send + Sync {
    /// Lists one page of the repository's runs triggered by pull requests.
    ///
    /// # Errors
    ///
    /// Returns a [`ListError`] if the runs cannot be fetched or parsed.
    fn list_pull_request_runs(&self) -> impl Future<Output = ListResult<Vec<WorkflowRun>>> + Send;

    /// Requests cancellation of the run with the given id.
    ///
    /// # Errors
    ///
    /// Returns a [`CancelError`] if GitHub does not accept the cancellation.
    fn cancel_run(&self, id: u64) -> impl Future<Output = CancelResult> + Send;
}

/// A [`RunDirectory`] backed by GitHub REST API.
#[derive(Clone)]
pub struct GitHubRunDirectory {
    client: Client,
    api_url: String,
    token: String,
    owner: String,
    repo: String,
}

impl GitHubRunDirectory {
    /// Creates a directory for `owner/repo` at the given API base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new<U, T, O, R>(api_url: U, token: T, owner: O, repo: R) -> reqwest::Result<Self>
    where
        U: Into<String>,
        T: Into<String>,
        O: Into<String>,
        R: Into<String>,
    {
        Ok(Self {
            client: Client::builder().user_agent(USER_AGENT).build()?,
            api_url: api_url.into(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
        })
    }

    /// Creates a directory for the repository named in the [`Config`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        Self::new(
            &*config.api_url,
            &*config.github_token,
            &*config.owner,
            &*config.repo,
        )
    }

    /// Returns the repository as `owner/repo`.
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn runs_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/actions/runs",
            self.api_url, self.owner, self.repo
        )
    }

    /// Builds a request for GitHub REST API.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(header::ACCEPT, "application/vnd.github+json")
            .bearer_auth(&self.token)
            .header("X-GitHub-Api-Version", "2022-11-28")
    }
}

impl RunDirectory for GitHubRunDirectory {
    async fn list_pull_request_runs(&self) -> ListResult<Vec<WorkflowRun>> {
        let url = self.runs_url();
        debug!("fetching pull request runs from {url}…");

        let response = self
            .request(Method::GET, &url)
            .query(&[("event", PULL_REQUEST_EVENT)])
            .query(&[("per_page", PAGE_SIZE)])
            .send()
            .await
            .map_err(|source| ListError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ListError::Status { url, status });
        }

        let page = response
            .json::<WorkflowRunsPage>()
            .await
            .map_err(|source| ListError::Decode {
                url: url.clone(),
                source,
            })?;
        debug!(
            "fetched {} of {} pull request runs from {url}",
            page.workflow_runs.len(),
            page.total_count
        );

        Ok(page.workflow_runs)
    }

    async fn cancel_run(&self, id: u64) -> CancelResult {
        let url = format!("{}/{id}/cancel", self.runs_url());
        debug!("cancelling run {id} at {url}…");

        let response = self
            .request(Method::POST, &url)
            .send()
            .await
            .map_err(|source| CancelError::Request { id, source })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(CancelError::Status { id, status }),
        }
    }
}

impl std::fmt::Debug for GitHubRunDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubRunDirectory")
            .field("api_url", &self.api_url)
            .field("repository", &self.repository())
            .finish_non_exhaustive()
    }
}
