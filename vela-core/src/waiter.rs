//! Convergence waiter
//!
//! Polls a status source until the resource reaches a target status, with a
//! minimum consecutive-target count before declaring convergence. Not every
//! resource type needs one; the adapter treats this as an opt-in extension
//! point, and neither shipped resource configuration enables it.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::error::AdapterError;

/// Result of one status poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusPoll {
    /// The resource exists and reports this status
    Status(String),
    /// The resource does not exist (tolerated for a bounded number of polls)
    NotFound,
}

/// Polling parameters for one convergence wait
#[derive(Debug, Clone)]
pub struct WaitSpec {
    /// Statuses that mean "still in progress"
    pub pending: Vec<String>,
    /// Statuses that mean "converged"
    pub target: Vec<String>,
    /// Delay between polls
    pub interval: Duration,
    /// Total time budget
    pub timeout: Duration,
    /// Consecutive target observations required before success
    pub consecutive_target: u32,
    /// Not-found polls tolerated before giving up
    pub not_found_checks: u32,
}

impl WaitSpec {
    pub fn new(
        pending: impl IntoIterator<Item = impl Into<String>>,
        target: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            pending: pending.into_iter().map(Into::into).collect(),
            target: target.into_iter().map(Into::into).collect(),
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
            consecutive_target: 1,
            not_found_checks: 20,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_consecutive_target(mut self, count: u32) -> Self {
        self.consecutive_target = count.max(1);
        self
    }

    pub fn with_not_found_checks(mut self, count: u32) -> Self {
        self.not_found_checks = count;
        self
    }
}

/// Why a wait did not converge
#[derive(Debug, Error)]
pub enum WaitError {
    #[error("timed out after {elapsed:?} waiting for status {target:?}, last seen {last:?}")]
    Timeout {
        target: Vec<String>,
        last: Option<String>,
        elapsed: Duration,
    },

    #[error("unexpected status '{status}' while waiting for {target:?}")]
    UnexpectedStatus {
        status: String,
        target: Vec<String>,
    },

    #[error("resource disappeared while waiting (not found {checks} times)")]
    Gone { checks: u32 },

    #[error(transparent)]
    Refresh(#[from] AdapterError),
}

/// Poll `refresh` until a target status holds for the configured count
///
/// A status in neither the pending nor the target set fails immediately.
pub async fn wait_for_status<F, Fut>(spec: &WaitSpec, mut refresh: F) -> Result<String, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<StatusPoll, AdapterError>>,
{
    let started = tokio::time::Instant::now();
    let mut consecutive = 0u32;
    let mut not_found = 0u32;
    let mut last: Option<String> = None;

    loop {
        match refresh().await? {
            StatusPoll::NotFound => {
                not_found += 1;
                consecutive = 0;
                if not_found > spec.not_found_checks {
                    return Err(WaitError::Gone { checks: not_found });
                }
            }
            StatusPoll::Status(status) => {
                not_found = 0;
                if spec.target.iter().any(|t| *t == status) {
                    consecutive += 1;
                    if consecutive >= spec.consecutive_target {
                        return Ok(status);
                    }
                } else if spec.pending.iter().any(|p| *p == status) {
                    consecutive = 0;
                } else {
                    return Err(WaitError::UnexpectedStatus {
                        status,
                        target: spec.target.clone(),
                    });
                }
                last = Some(status);
            }
        }

        if started.elapsed() >= spec.timeout {
            return Err(WaitError::Timeout {
                target: spec.target.clone(),
                last,
                elapsed: started.elapsed(),
            });
        }

        tokio::time::sleep(spec.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn fast_spec() -> WaitSpec {
        WaitSpec::new(["Pending"], ["Normal"])
            .with_interval(Duration::from_millis(1))
            .with_timeout(Duration::from_millis(250))
    }

    async fn run_script(spec: &WaitSpec, script: Vec<StatusPoll>) -> Result<String, WaitError> {
        let polls = Mutex::new(script.into_iter());
        wait_for_status(spec, || {
            let next = polls.lock().unwrap().next();
            async move {
                // Past the end of the script, stay on the last pending status
                Ok(next.unwrap_or(StatusPoll::Status("Pending".to_string())))
            }
        })
        .await
    }

    #[tokio::test]
    async fn converges_on_target() {
        let script = vec![
            StatusPoll::Status("Pending".to_string()),
            StatusPoll::Status("Pending".to_string()),
            StatusPoll::Status("Normal".to_string()),
        ];
        let status = run_script(&fast_spec(), script).await.unwrap();
        assert_eq!(status, "Normal");
    }

    #[tokio::test]
    async fn requires_consecutive_target_occurrences() {
        // One Normal followed by a Pending resets the streak
        let script = vec![
            StatusPoll::Status("Normal".to_string()),
            StatusPoll::Status("Pending".to_string()),
            StatusPoll::Status("Normal".to_string()),
            StatusPoll::Status("Normal".to_string()),
        ];
        let spec = fast_spec().with_consecutive_target(2);
        let status = run_script(&spec, script).await.unwrap();
        assert_eq!(status, "Normal");
    }

    #[tokio::test]
    async fn times_out_when_never_target() {
        let result = run_script(&fast_spec(), vec![]).await;
        assert!(matches!(result, Err(WaitError::Timeout { .. })));
    }

    #[tokio::test]
    async fn unexpected_status_fails_fast() {
        let script = vec![StatusPoll::Status("Failed".to_string())];
        let result = run_script(&fast_spec(), script).await;
        match result {
            Err(WaitError::UnexpectedStatus { status, .. }) => assert_eq!(status, "Failed"),
            other => panic!("expected UnexpectedStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn tolerates_bounded_not_found() {
        let script = vec![
            StatusPoll::NotFound,
            StatusPoll::NotFound,
            StatusPoll::Status("Normal".to_string()),
        ];
        let spec = fast_spec().with_not_found_checks(5);
        assert!(run_script(&spec, script).await.is_ok());
    }

    #[tokio::test]
    async fn gives_up_after_too_many_not_found() {
        let script = vec![StatusPoll::NotFound; 10];
        let spec = fast_spec().with_not_found_checks(2);
        let result = run_script(&spec, script).await;
        assert!(matches!(result, Err(WaitError::Gone { .. })));
    }
}
