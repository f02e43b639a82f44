//! Data models of GitHub Actions workflows.

#![cfg(feature = "workflow")]

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::Deserialize;

pub mod runs;

/// The triggering event of runs created for pull requests.
pub const PULL_REQUEST_EVENT: &str = "pull_request";

/// Represents a GitHub Actions workflow run from GitHub REST API.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    pub id: u64,
    pub workflow_id: u64,
    /// Null for runs whose head ref is no longer a branch, e.g. after the branch was deleted.
    #[serde(default)]
    pub head_branch: Option<String>,
    /// Increases with every run of the same workflow, which makes it a better recency marker than
    /// [`Self::id`].
    pub run_number: u64,
    #[serde(default)]
    pub status: Option<RunStatus>,
    /// The event that created the run, e.g. `pull_request` or `push`.
    pub event: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub run_started_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// Whether the run has not reached a terminal state yet. Runs without a status count as active.
    pub fn is_active(&self) -> bool {
        self.status != Some(RunStatus::Completed)
    }

    /// Whether the run was created by a pull request event.
    pub fn is_pull_request(&self) -> bool {
        self.event == PULL_REQUEST_EVENT
    }
}

impl Display for WorkflowRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} #{} ({})", self.run_number, self.id),
            None => write!(f, "#{} ({})", self.run_number, self.id),
        }
    }
}

/// The status of a workflow run.
#[non_exhaustive]
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Requested,
    Queued,
    Pending,
    Waiting,
    InProgress,
    Completed,
    /// Any status GitHub adds later. Treated as non-terminal.
    #[serde(other)]
    Other,
}

/// A page of workflow runs from GitHub REST API.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkflowRunsPage {
    pub total_count: u64,
    pub workflow_runs: Vec<WorkflowRun>,
}
