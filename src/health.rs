//! Pod status snapshots and the health classifier
//!
//! The classifier is a pure function over a point-in-time status snapshot.
//! It distinguishes pods that are definitively failing (unschedulable,
//! crash-looping, unable to pull their image) from pods that are merely not
//! ready yet, so the polling engine can fail fast instead of waiting out its
//! full attempt budget.

/// Restart count at which a container is considered crash-looping
pub const RESTART_THRESHOLD: i32 = 3;

/// Pod phase reported for a running pod
pub const PHASE_RUNNING: &str = "Running";

/// Point-in-time read of a pod's status
///
/// Transient and never persisted; consumed only by [`classify`] and, for the
/// pod IP, by the runner when wiring the testing pod to the workload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObservationSnapshot {
    /// Pod phase (`Pending`, `Running`, `Succeeded`, ...)
    pub phase: String,
    /// IP assigned to the pod, once scheduled and started
    pub pod_ip: Option<String>,
    /// IP of the node hosting the pod
    pub host_ip: Option<String>,
    /// Status conditions, reduced to their reason and message
    pub conditions: Vec<ConditionObservation>,
    /// Per-container restart and waiting state
    pub containers: Vec<ContainerObservation>,
}

/// A pod status condition reduced to the fields the classifier inspects
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConditionObservation {
    /// Machine-readable condition reason (e.g. `Unschedulable`)
    pub reason: String,
    /// Human-readable condition message
    pub message: String,
}

/// A container status reduced to the fields the classifier inspects
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContainerObservation {
    /// Container name
    pub name: String,
    /// Recorded restart count
    pub restart_count: i32,
    /// Waiting-state reason, if the container is waiting
    pub waiting_reason: Option<String>,
}

/// Classification of a status snapshot
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    /// The object satisfies its readiness requirement
    Healthy,
    /// The object is not ready yet but not known to be failing
    Pending,
    /// The object is definitively failing and will not recover
    Failing(String),
}

/// Classify a pod status snapshot as healthy, pending, or failing
///
/// Rules, in priority order:
/// 1. any condition with reason `Unschedulable` is failing;
/// 2. any container restarted [`RESTART_THRESHOLD`] or more times is failing;
/// 3. any container waiting in `ImagePullBackOff` or `ErrImagePull` is failing;
/// 4. otherwise the pod is healthy iff its phase is `Running`, else pending.
pub fn classify(snapshot: &ObservationSnapshot) -> Verdict {
    for cond in &snapshot.conditions {
        if cond.reason == "Unschedulable" {
            return Verdict::Failing(format!("cannot schedule: {}", cond.message));
        }
    }

    for container in &snapshot.containers {
        if container.restart_count >= RESTART_THRESHOLD {
            return Verdict::Failing(format!(
                "container {} restarted {} times",
                container.name, container.restart_count
            ));
        }

        if let Some(reason) = &container.waiting_reason {
            if reason == "ImagePullBackOff" || reason == "ErrImagePull" {
                return Verdict::Failing(format!(
                    "container {} in state {}",
                    container.name, reason
                ));
            }
        }
    }

    if snapshot.phase == PHASE_RUNNING {
        Verdict::Healthy
    } else {
        Verdict::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_snapshot() -> ObservationSnapshot {
        ObservationSnapshot {
            phase: PHASE_RUNNING.to_string(),
            pod_ip: Some("10.244.1.7".to_string()),
            host_ip: Some("172.18.0.3".to_string()),
            conditions: vec![],
            containers: vec![ContainerObservation {
                name: "nginx".to_string(),
                restart_count: 0,
                waiting_reason: None,
            }],
        }
    }

    #[test]
    fn running_pod_with_clean_containers_is_healthy() {
        assert_eq!(classify(&running_snapshot()), Verdict::Healthy);
    }

    #[test]
    fn pending_phase_is_pending() {
        let snapshot = ObservationSnapshot {
            phase: "Pending".to_string(),
            ..Default::default()
        };
        assert_eq!(classify(&snapshot), Verdict::Pending);
    }

    #[test]
    fn unschedulable_condition_is_always_failing() {
        // Even a snapshot that otherwise looks healthy must classify as
        // failing when the scheduler has given up on it.
        let mut snapshot = running_snapshot();
        snapshot.conditions.push(ConditionObservation {
            reason: "Unschedulable".to_string(),
            message: "0/3 nodes are available".to_string(),
        });
        match classify(&snapshot) {
            Verdict::Failing(reason) => {
                assert!(reason.contains("cannot schedule"));
                assert!(reason.contains("0/3 nodes are available"));
            }
            other => panic!("expected Failing, got {other:?}"),
        }
    }

    #[test]
    fn crash_looping_container_is_failing() {
        let mut snapshot = running_snapshot();
        snapshot.containers[0].restart_count = RESTART_THRESHOLD;
        match classify(&snapshot) {
            Verdict::Failing(reason) => {
                assert!(reason.contains("container nginx restarted 3 times"));
            }
            other => panic!("expected Failing, got {other:?}"),
        }
    }

    #[test]
    fn restarts_below_threshold_do_not_fail() {
        let mut snapshot = running_snapshot();
        snapshot.containers[0].restart_count = RESTART_THRESHOLD - 1;
        assert_eq!(classify(&snapshot), Verdict::Healthy);
    }

    #[test]
    fn image_pull_backoff_is_failing() {
        let mut snapshot = running_snapshot();
        snapshot.phase = "Pending".to_string();
        snapshot.containers[0].waiting_reason = Some("ImagePullBackOff".to_string());
        assert_eq!(
            classify(&snapshot),
            Verdict::Failing("container nginx in state ImagePullBackOff".to_string())
        );
    }

    #[test]
    fn err_image_pull_is_failing() {
        let mut snapshot = running_snapshot();
        snapshot.containers[0].waiting_reason = Some("ErrImagePull".to_string());
        assert_eq!(
            classify(&snapshot),
            Verdict::Failing("container nginx in state ErrImagePull".to_string())
        );
    }

    #[test]
    fn benign_waiting_reason_is_not_failing() {
        let mut snapshot = running_snapshot();
        snapshot.phase = "Pending".to_string();
        snapshot.containers[0].waiting_reason = Some("ContainerCreating".to_string());
        assert_eq!(classify(&snapshot), Verdict::Pending);
    }

    #[test]
    fn unschedulable_takes_priority_over_container_failures() {
        let mut snapshot = running_snapshot();
        snapshot.conditions.push(ConditionObservation {
            reason: "Unschedulable".to_string(),
            message: "insufficient cpu".to_string(),
        });
        snapshot.containers[0].waiting_reason = Some("ImagePullBackOff".to_string());
        match classify(&snapshot) {
            Verdict::Failing(reason) => assert!(reason.starts_with("cannot schedule")),
            other => panic!("expected Failing, got {other:?}"),
        }
    }
}
