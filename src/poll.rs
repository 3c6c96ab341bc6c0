//! Bounded sleep-then-sample polling engine
//!
//! Generic poller used for both readiness and completion waits. The contract
//! is sleep-then-sample: the first observation happens only after one full
//! interval, giving the cluster time to react to whatever was just created.
//!
//! Classified failures short-circuit immediately (fail-fast); transport
//! errors from the sample function are surfaced immediately and never
//! retried here (transient-error retry is deliberately left to callers);
//! an exhausted attempt budget is a timeout. The poller therefore always
//! terminates within `interval * (max_attempts + 1)` wall-clock time.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, trace};

use crate::health::Verdict;
use crate::Error;

/// Repeatedly sample an observation until its classification is healthy
///
/// # Arguments
/// * `interval` - Sleep duration before every sample, including the first
/// * `max_attempts` - Attempt budget; exhausting it is a timeout
/// * `operation_name` - Name for logging purposes
/// * `sample` - Async observation function; errors surface immediately
/// * `classify` - Pure verdict function over each observation
///
/// # Returns
/// The first observation classified [`Verdict::Healthy`], or the error that
/// ended the poll: [`Error::Health`] on a definitive failure,
/// [`Error::Timeout`] on budget exhaustion, or the sample's own error.
pub async fn poll<O, S, Fut, C>(
    interval: Duration,
    max_attempts: u32,
    operation_name: &str,
    mut sample: S,
    classify: C,
) -> Result<O, Error>
where
    S: FnMut() -> Fut,
    Fut: Future<Output = Result<O, Error>>,
    C: Fn(&O) -> Verdict,
{
    for attempt in 1..=max_attempts {
        tokio::time::sleep(interval).await;

        let observation = sample().await?;

        match classify(&observation) {
            Verdict::Healthy => {
                debug!(
                    operation = %operation_name,
                    attempt = attempt,
                    "Poll condition met"
                );
                return Ok(observation);
            }
            Verdict::Failing(reason) => {
                debug!(
                    operation = %operation_name,
                    attempt = attempt,
                    reason = %reason,
                    "Poll observed definitive failure"
                );
                return Err(Error::health(reason));
            }
            Verdict::Pending => {
                trace!(
                    operation = %operation_name,
                    attempt = attempt,
                    "Poll condition not yet met"
                );
            }
        }
    }

    Err(Error::timeout(format!(
        "timed out after {max_attempts} attempts"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const TICK: Duration = Duration::from_millis(10);

    #[tokio::test(start_paused = true)]
    async fn healthy_first_sample_returns_after_one_interval() {
        let start = tokio::time::Instant::now();
        let samples = Arc::new(AtomicU32::new(0));
        let s = samples.clone();

        let result = poll(
            TICK,
            6,
            "readiness",
            || {
                let s = s.clone();
                async move {
                    s.fetch_add(1, Ordering::SeqCst);
                    Ok("Running")
                }
            },
            |_| Verdict::Healthy,
        )
        .await;

        assert_eq!(result.unwrap(), "Running");
        assert_eq!(samples.load(Ordering::SeqCst), 1);
        // Sleep-then-sample: exactly one interval elapsed before the sample.
        assert_eq!(start.elapsed(), TICK);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_forever_times_out_with_attempt_count() {
        let samples = Arc::new(AtomicU32::new(0));
        let s = samples.clone();

        let result: Result<(), Error> = poll(
            TICK,
            5,
            "readiness",
            || {
                let s = s.clone();
                async move {
                    s.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            |_| Verdict::Pending,
        )
        .await;

        let err = result.expect_err("should time out");
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(err.to_string(), "timed out after 5 attempts");
        assert_eq!(samples.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn terminates_within_the_wall_clock_bound() {
        let start = tokio::time::Instant::now();
        let result: Result<(), Error> =
            poll(TICK, 4, "readiness", || async { Ok(()) }, |_| Verdict::Pending).await;

        assert!(result.is_err());
        assert!(start.elapsed() <= TICK * 5);
    }

    #[tokio::test(start_paused = true)]
    async fn classified_failure_short_circuits() {
        let samples = Arc::new(AtomicU32::new(0));
        let s = samples.clone();

        let result: Result<(), Error> = poll(
            TICK,
            100,
            "readiness",
            || {
                let s = s.clone();
                async move {
                    s.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            |_| Verdict::Failing("container wrk in state ImagePullBackOff".to_string()),
        )
        .await;

        let err = result.expect_err("should fail fast");
        assert!(matches!(err, Error::Health(_)));
        assert!(err.to_string().contains("ImagePullBackOff"));
        // No further polls after a definitive failure.
        assert_eq!(samples.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sample_errors_surface_immediately() {
        let samples = Arc::new(AtomicU32::new(0));
        let s = samples.clone();

        let result: Result<(), Error> = poll(
            TICK,
            100,
            "completion",
            || {
                let s = s.clone();
                async move {
                    s.fetch_add(1, Ordering::SeqCst);
                    Err(Error::cleanup("placeholder transport failure"))
                }
            },
            |_| Verdict::Pending,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(samples.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn condition_met_on_a_later_attempt() {
        let samples = Arc::new(AtomicU32::new(0));
        let s = samples.clone();

        let result = poll(
            TICK,
            10,
            "completion",
            || {
                let s = s.clone();
                async move { Ok(s.fetch_add(1, Ordering::SeqCst) + 1) }
            },
            |n| {
                if *n >= 3 {
                    Verdict::Healthy
                } else {
                    Verdict::Pending
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(samples.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempt_budget_times_out_without_sampling() {
        let samples = Arc::new(AtomicU32::new(0));
        let s = samples.clone();

        let result: Result<(), Error> = poll(
            TICK,
            0,
            "readiness",
            || {
                let s = s.clone();
                async move {
                    s.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
            |_| Verdict::Pending,
        )
        .await;

        assert_eq!(
            result.unwrap_err().to_string(),
            "timed out after 0 attempts"
        );
        assert_eq!(samples.load(Ordering::SeqCst), 0);
    }
}
