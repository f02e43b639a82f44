//! Decoding of the webhook deliveries that can trigger a reconciliation.

use serde::Deserialize;

use crate::workflow::PULL_REQUEST_EVENT;

/// The `X-GitHub-Event` value of workflow run deliveries.
pub const WORKFLOW_RUN_EVENT: &str = "workflow_run";

/// The action of deliveries announcing a newly requested run.
pub const REQUESTED_ACTION: &str = "requested";

#[derive(Debug, Deserialize)]
struct WorkflowRunDelivery {
    action: String,
    #[serde(default)]
    workflow_run: Option<RequestedRun>,
}

#[derive(Debug, Deserialize)]
struct RequestedRun {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    event: Option<String>,
}

/// What a webhook delivery means for the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// A run was requested for a pull request; duplicates may now be in flight.
    RunRequested {
        /// The id of the new run.
        run_id: Option<u64>,
    },
    /// The delivery is well-formed but irrelevant.
    Ignored(&'static str),
    /// The delivery claims to be relevant but lacks the fields to tell.
    Malformed(&'static str),
}

/// Classifies a delivery by its `X-GitHub-Event` header and JSON body.
///
/// Bodies of events other than `workflow_run` are not parsed.
///
/// # Errors
///
/// Returns an error if a `workflow_run` body is not valid JSON or lacks an `action`.
pub fn classify(event_type: &str, payload: &[u8]) -> Result<Delivery, serde_json::Error> {
    if event_type != WORKFLOW_RUN_EVENT {
        return Ok(Delivery::Ignored("not a workflow run event"));
    }

    let delivery: WorkflowRunDelivery = serde_json::from_slice(payload)?;
    if delivery.action != REQUESTED_ACTION {
        return Ok(Delivery::Ignored("run was not requested"));
    }

    let Some(run) = delivery.workflow_run else {
        return Ok(Delivery::Malformed("missing workflow run"));
    };

    Ok(match run.event.as_deref() {
        Some(PULL_REQUEST_EVENT) => Delivery::RunRequested { run_id: run.id },
        Some(_) => Delivery::Ignored("run was not triggered by a pull request"),
        None => Delivery::Malformed("workflow run has no triggering event"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn requested_pull_request_run_qualifies() {
        let payload = body(json!({
            "action": "requested",
            "workflow_run": { "id": 30433642, "event": "pull_request", "status": "queued" },
            "repository": { "name": "hello-world", "owner": { "login": "octocat" } }
        }));

        assert_eq!(
            classify("workflow_run", &payload).unwrap(),
            Delivery::RunRequested {
                run_id: Some(30433642)
            }
        );
    }

    #[test]
    fn other_events_are_ignored_without_parsing() {
        assert!(matches!(
            classify("ping", b"not even json").unwrap(),
            Delivery::Ignored(_)
        ));
    }

    #[test]
    fn other_actions_are_ignored() {
        let payload = body(json!({
            "action": "completed",
            "workflow_run": { "id": 1, "event": "pull_request" }
        }));

        assert!(matches!(
            classify("workflow_run", &payload).unwrap(),
            Delivery::Ignored(_)
        ));
    }

    #[test]
    fn push_runs_are_ignored() {
        let payload = body(json!({
            "action": "requested",
            "workflow_run": { "id": 1, "event": "push" }
        }));

        assert!(matches!(
            classify("workflow_run", &payload).unwrap(),
            Delivery::Ignored(_)
        ));
    }

    #[test]
    fn missing_run_is_malformed() {
        let payload = body(json!({ "action": "requested" }));

        assert_eq!(
            classify("workflow_run", &payload).unwrap(),
            Delivery::Malformed("missing workflow run")
        );

        let payload = body(json!({ "action": "requested", "workflow_run": null }));
        assert!(matches!(
            classify("workflow_run", &payload).unwrap(),
            Delivery::Malformed(_)
        ));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(classify("workflow_run", b"{").is_err());
        assert!(classify("workflow_run", br#"{"workflow_run": {}}"#).is_err());
    }
}
