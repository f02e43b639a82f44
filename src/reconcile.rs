//! Cancels workflow runs that have a newer sibling on the same branch.
//!
//! Runs are grouped by workflow and head branch. Within each group the run with the highest run
//! number survives and every other run is cancelled, one request at a time.

#![cfg(feature = "reconcile")]

use std::{
    cmp::Reverse,
    collections::HashMap,
    fmt::{self, Display},
};

use tracing::{error, info, warn};

use crate::workflow::{
    WorkflowRun,
    runs::{GitHubRunDirectory, RunDirectory},
};

/// Identifies a group of runs that supersede one another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub workflow_id: u64,
    pub head_branch: String,
}

impl GroupKey {
    /// Returns `None` for runs without a head branch, which cannot be grouped.
    fn of(run: &WorkflowRun) -> Option<Self> {
        Some(Self {
            workflow_id: run.workflow_id,
            head_branch: run.head_branch.clone()?,
        })
    }
}

impl Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.workflow_id, self.head_branch)
    }
}

/// The decision for one group of at least two runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    pub key: GroupKey,
    /// The run that keeps going.
    pub survivor: u64,
    /// The runs to cancel, newest first.
    pub extras: Vec<u64>,
}

/// The runs a reconciliation pass cancels, grouped by the run that superseded them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancellationPlan {
    /// Groups in the order their first run was listed.
    pub groups: Vec<GroupPlan>,
}

impl CancellationPlan {
    /// Returns the ids to cancel, group by group.
    pub fn run_ids(&self) -> Vec<u64> {
        self.groups
            .iter()
            .flat_map(|group| group.extras.iter().copied())
            .collect()
    }

    /// Whether there is nothing to cancel.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Decides which of the listed runs to cancel.
///
/// Only active runs triggered by pull requests and carrying a head branch are considered. In each
/// group, runs are ordered by run number, then by id, both descending; the first one survives.
pub fn plan_cancellations(runs: &[WorkflowRun]) -> CancellationPlan {
    let mut order: Vec<GroupKey> = Vec::new();
    let mut groups: HashMap<GroupKey, Vec<&WorkflowRun>> = HashMap::new();

    for run in runs
        .iter()
        .filter(|run| run.is_active() && run.is_pull_request())
    {
        let Some(key) = GroupKey::of(run) else {
            continue;
        };
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(run);
    }

    let groups = order
        .into_iter()
        .filter_map(|key| {
            let mut group = groups.remove(&key)?;
            if group.len() < 2 {
                return None;
            }

            group.sort_by_key(|run| Reverse((run.run_number, run.id)));
            let (survivor, extras) = group.split_first()?;
            Some(GroupPlan {
                key,
                survivor: survivor.id,
                extras: extras.iter().map(|run| run.id).collect(),
            })
        })
        .collect();

    CancellationPlan { groups }
}

/// Runs reconciliation passes against a [`RunDirectory`].
#[derive(Debug)]
pub struct Reconciler<D = GitHubRunDirectory> {
    directory: D,
}

impl<D> Reconciler<D>
where
    D: RunDirectory,
{
    /// Creates a [`Reconciler`] working on the given directory.
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    #[cfg(test)]
    fn directory(&self) -> &D {
        &self.directory
    }

    /// Lists in-flight pull request runs and cancels the superseded ones.
    ///
    /// Failures are logged and never returned: a failed listing skips the pass, a failed
    /// cancellation moves on to the next run. Cancellations are sent one at a time to stay clear of
    /// rate limits.
    pub async fn reconcile(&self) {
        let runs = match self.directory.list_pull_request_runs().await {
            Ok(runs) => runs,
            Err(err) => {
                error!("unable to get workflow runs: {err}");
                return;
            }
        };

        let plan = plan_cancellations(&runs);
        if plan.is_empty() {
            info!("no superseded runs among {} listed", runs.len());
            return;
        }

        for group in &plan.groups {
            info!(
                group = %group.key,
                len = group.extras.len(),
                keep_id = group.survivor,
                cancel_ids = ?group.extras,
                "canceling workflows because a more recent one exists"
            );
        }

        for id in plan.run_ids() {
            if let Err(err) = self.directory.cancel_run(id).await {
                warn!(id, "unable to cancel run: {err}");
            }
        }
    }
}
