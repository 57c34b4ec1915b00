//! Reduction of per-worker outcomes into one verdict.

use crate::outcome::WorkerOutcome;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    /// Every worker answered with a 2xx status.
    Success,
    Failure,
}

impl AggregateStatus {
    /// HTTP status the master answers with.
    pub fn http_status(self) -> u16 {
        match self {
            AggregateStatus::Success => 200,
            AggregateStatus::Failure => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateResult {
    pub status: AggregateStatus,
    /// One body per worker, in broadcast order.
    pub bodies: Vec<String>,
    /// Number of workers that did not succeed.
    pub failed: usize,
}

/// Fold outcomes into a single result. An empty input is a success.
pub fn aggregate(outcomes: &[WorkerOutcome]) -> AggregateResult {
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    AggregateResult {
        status: if failed == 0 {
            AggregateStatus::Success
        } else {
            AggregateStatus::Failure
        },
        bodies: outcomes.iter().map(WorkerOutcome::body_text).collect(),
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{TransportFailure, FAILURE_MARKER};
    use multinet_types::WorkerDescriptor;
    use std::time::Duration;

    fn outcomes(statuses: &[u16]) -> Vec<WorkerOutcome> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, &status)| {
                WorkerOutcome::response(
                    WorkerDescriptor::new(format!("10.0.0.{}", i + 1), 3333),
                    status,
                    format!("body-{i}"),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_is_success() {
        let result = aggregate(&[]);
        assert_eq!(result.status, AggregateStatus::Success);
        assert!(result.bodies.is_empty());
        assert_eq!(result.failed, 0);
    }

    #[test]
    fn test_all_ok() {
        let result = aggregate(&outcomes(&[200, 200, 200]));
        assert_eq!(result.status, AggregateStatus::Success);
        assert_eq!(result.status.http_status(), 200);
        assert_eq!(result.bodies, ["body-0", "body-1", "body-2"]);
    }

    #[test]
    fn test_one_non_2xx_fails_everything() {
        let result = aggregate(&outcomes(&[200, 200, 404]));
        assert_eq!(result.status, AggregateStatus::Failure);
        assert_eq!(result.status.http_status(), 500);
        assert_eq!(result.bodies, ["body-0", "body-1", "body-2"]);
        assert_eq!(result.failed, 1);
    }

    #[test]
    fn test_transport_failure_keeps_position() {
        let mut input = outcomes(&[200, 200]);
        input.insert(
            1,
            WorkerOutcome::failure(
                WorkerDescriptor::new("10.0.0.9", 3333),
                TransportFailure::Timeout(Duration::from_secs(1)),
            ),
        );
        let result = aggregate(&input);
        assert_eq!(result.status, AggregateStatus::Failure);
        assert_eq!(result.bodies.len(), 3);
        assert_eq!(result.bodies[0], "body-0");
        assert!(result.bodies[1].starts_with(FAILURE_MARKER));
        assert!(result.bodies[1].contains("10.0.0.9"));
        assert_eq!(result.bodies[2], "body-1");
    }
}
