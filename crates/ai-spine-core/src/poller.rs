//! Execution polling
//!
//! Turns a submitted execution into a terminal snapshot by fetching its
//! status at a fixed interval until it completes, fails, is cancelled, or the
//! local wait budget runs out. Timing uses `tokio::time`, which is monotonic.
//!
//! ```text
//! pending ─┬─> running ─┬─> completed
//!          │            ├─> failed
//!          └────────────┴─> cancelled
//! ```

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use crate::http::dispatcher::Dispatcher;
use crate::models::{Execution, ExecutionStatus};
use crate::{Error, Result};

/// Default overall wait budget
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default delay between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Shorter intervals are raised to this
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Anything that can fetch an execution snapshot by id
pub trait ExecutionSource: Send + Sync {
    fn fetch_execution(&self, execution_id: &str) -> impl Future<Output = Result<Execution>> + Send;
}

impl ExecutionSource for Dispatcher {
    fn fetch_execution(&self, execution_id: &str) -> impl Future<Output = Result<Execution>> + Send {
        let path = format!("/executions/{}", urlencoding::encode(execution_id));
        async move { self.get(&path).await }
    }
}

/// Timing knobs for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Give up once this much time has elapsed
    pub timeout: Duration,
    /// Fixed delay between polls, never below [`MIN_POLL_INTERVAL`]
    pub interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WaitOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Polls one execution at a time through an [`ExecutionSource`]
#[derive(Debug)]
pub struct ExecutionPoller<'a, S> {
    source: &'a S,
}

impl<'a, S: ExecutionSource> ExecutionPoller<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// Wait for the execution to reach a terminal state.
    ///
    /// `completed` and `cancelled` return the snapshot; `failed` returns
    /// [`Error::Execution`] with the service's error message. Running out of
    /// time returns [`Error::Timeout`] and leaves the remote execution alone.
    /// Fatal fetch errors abort the wait and are returned unchanged.
    pub async fn wait(&self, execution_id: &str, options: WaitOptions) -> Result<Execution> {
        self.poll(execution_id, options, None).await
    }

    /// Like [`wait`](Self::wait), but also stops when `cancel` fires, whether
    /// a fetch is in flight or the poller is sleeping.
    pub async fn wait_with_cancel(
        &self,
        execution_id: &str,
        options: WaitOptions,
        cancel: &CancellationToken,
    ) -> Result<Execution> {
        self.poll(execution_id, options, Some(cancel)).await
    }

    #[tracing::instrument(level = "debug", skip(self, options, cancel), fields(timeout_ms = options.timeout.as_millis() as u64))]
    async fn poll(
        &self,
        execution_id: &str,
        options: WaitOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<Execution> {
        let start = Instant::now();
        // an unrepresentable deadline means "never", roughly thirty years out
        let deadline = start
            .checked_add(options.timeout)
            .unwrap_or_else(|| start + Duration::from_secs(86_400 * 365 * 30));
        let interval = options.interval.max(MIN_POLL_INTERVAL);
        let mut polls: u32 = 0;

        loop {
            polls += 1;
            // a fetch still in flight at the deadline is abandoned
            let fetch = async {
                match timeout_at(deadline, self.source.fetch_execution(execution_id)).await {
                    Ok(result) => result,
                    Err(_) => Err(wait_timed_out(execution_id, options.timeout, start.elapsed(), None)),
                }
            };
            let execution = until_cancelled(cancel, execution_id, start, fetch).await?;

            tracing::debug!(polls, status = %execution.status, "Polled execution");

            match execution.status {
                ExecutionStatus::Completed | ExecutionStatus::Cancelled => {
                    tracing::info!(
                        polls,
                        status = %execution.status,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Execution finished"
                    );
                    return Ok(execution);
                }
                ExecutionStatus::Failed => {
                    tracing::warn!(polls, "Execution failed");
                    return Err(failed_execution(execution));
                }
                ExecutionStatus::Pending | ExecutionStatus::Running => {}
            }

            let elapsed = start.elapsed();
            if elapsed >= options.timeout {
                tracing::warn!(polls, elapsed_ms = elapsed.as_millis() as u64, "Wait timed out");
                return Err(wait_timed_out(
                    execution_id,
                    options.timeout,
                    elapsed,
                    Some(execution.status),
                ));
            }

            let delay = interval.min(options.timeout - elapsed);
            until_cancelled(cancel, execution_id, start, async {
                sleep(delay).await;
                Ok(())
            })
            .await?;
        }
    }
}

/// Race `work` against the cancellation token, if any
async fn until_cancelled<T, F>(
    cancel: Option<&CancellationToken>,
    execution_id: &str,
    start: Instant,
    work: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(token) = cancel else {
        return work.await;
    };

    tokio::select! {
        biased;
        _ = token.cancelled() => {
            tracing::info!("Wait cancelled");
            Err(Error::Timeout {
                message: format!("wait for execution {} was cancelled", execution_id),
                elapsed: Some(start.elapsed()),
            })
        }
        result = work => result,
    }
}

fn wait_timed_out(
    execution_id: &str,
    timeout: Duration,
    elapsed: Duration,
    last_status: Option<ExecutionStatus>,
) -> Error {
    let message = match last_status {
        Some(status) => format!(
            "execution {} did not finish within {:?} (last status: {})",
            execution_id, timeout, status
        ),
        None => format!(
            "execution {} did not finish within {:?} (status request still in flight)",
            execution_id, timeout
        ),
    };
    Error::Timeout {
        message,
        elapsed: Some(elapsed),
    }
}

fn failed_execution(execution: Execution) -> Error {
    Error::Execution {
        message: execution
            .error_message
            .unwrap_or_else(|| format!("execution {} failed", execution.execution_id)),
        status_code: None,
        body: None,
        execution_id: Some(execution.execution_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Replays scripted statuses; the last one repeats forever
    struct Scripted {
        replies: Mutex<VecDeque<Result<Execution>>>,
        fetches: AtomicU32,
    }

    impl Scripted {
        fn new(replies: Vec<Result<Execution>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                fetches: AtomicU32::new(0),
            }
        }

        fn fetches(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl ExecutionSource for Scripted {
        fn fetch_execution(&self, _execution_id: &str) -> impl Future<Output = Result<Execution>> + Send {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            let reply = if replies.len() > 1 {
                replies.pop_front().unwrap()
            } else {
                replies.front().cloned().unwrap()
            };
            async move { reply }
        }
    }

    /// Answers `running`, but only after `delay`
    struct Slow {
        delay: Duration,
        fetches: AtomicU32,
    }

    impl ExecutionSource for Slow {
        fn fetch_execution(&self, _execution_id: &str) -> impl Future<Output = Result<Execution>> + Send {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let delay = self.delay;
            async move {
                sleep(delay).await;
                snapshot("running")
            }
        }
    }

    fn snapshot(status: &str) -> Result<Execution> {
        Ok(serde_json::from_value(json!({
            "execution_id": "exec-123",
            "flow_id": "sentiment-analysis",
            "status": status,
            "output_data": if status == "completed" { json!({"result": "success"}) } else { json!(null) },
            "error_message": if status == "failed" { json!("Processing failed") } else { json!(null) }
        }))
        .unwrap())
    }

    fn options(timeout: u64, interval: u64) -> WaitOptions {
        WaitOptions::new(Duration::from_secs(timeout), Duration::from_secs(interval))
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_on_first_terminal_poll() {
        let source = Scripted::new(vec![snapshot("running"), snapshot("completed")]);
        let poller = ExecutionPoller::new(&source);

        let execution = poller.wait("exec-123", options(5, 1)).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Completed);
        assert_eq!(execution.output_data.unwrap()["result"], "success");
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_is_idempotent_after_terminal() {
        let source = Scripted::new(vec![snapshot("completed")]);
        let poller = ExecutionPoller::new(&source);

        let first = poller.wait("exec-123", options(5, 1)).await.unwrap();
        let second = poller.wait("exec-123", options(5, 1)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_execution_is_an_error() {
        let source = Scripted::new(vec![snapshot("running"), snapshot("failed")]);
        let poller = ExecutionPoller::new(&source);

        let err = poller.wait("exec-123", options(5, 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Execution);
        assert!(err.to_string().contains("Processing failed"));
        match err {
            Error::Execution { execution_id, .. } => assert_eq!(execution_id.as_deref(), Some("exec-123")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_execution_returns_normally() {
        let source = Scripted::new(vec![snapshot("running"), snapshot("cancelled")]);
        let poller = ExecutionPoller::new(&source);

        let execution = poller.wait("exec-123", options(5, 1)).await.unwrap();
        assert_eq!(execution.status, ExecutionStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_within_one_interval() {
        let source = Scripted::new(vec![snapshot("running")]);
        let poller = ExecutionPoller::new(&source);
        let start = Instant::now();

        let err = poller.wait("exec-123", options(5, 2)).await.unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(elapsed >= Duration::from_secs(5), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(7), "{:?}", elapsed);
        // polls at 0s, 2s, 4s and 5s
        assert_eq!(source.fetches(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_fetch_error_aborts() {
        let source = Scripted::new(vec![
            snapshot("running"),
            Err(Error::Execution {
                message: "Execution not found".to_string(),
                status_code: Some(404),
                body: None,
                execution_id: None,
            }),
        ]);
        let poller = ExecutionPoller::new(&source);

        let err = poller.wait("exec-123", options(60, 1)).await.unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_token_stops_sleeping_poller() {
        let source = Scripted::new(vec![snapshot("running")]);
        let poller = ExecutionPoller::new(&source);
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(3)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        let err = poller
            .wait_with_cancel("exec-123", options(60, 10), &token)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("cancelled"));
        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_is_bounded_by_timeout() {
        let source = Slow {
            delay: Duration::from_secs(4),
            fetches: AtomicU32::new(0),
        };
        let poller = ExecutionPoller::new(&source);
        let start = Instant::now();

        let err = poller.wait("exec-123", options(5, 2)).await.unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.to_string().contains("still in flight"));
        assert!(elapsed >= Duration::from_secs(5), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(7), "{:?}", elapsed);
        // first fetch returns at 4s, the second is cut off at 5s
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_to_minimum() {
        let source = Scripted::new(vec![snapshot("running")]);
        let poller = ExecutionPoller::new(&source);

        let options = WaitOptions::new(Duration::from_secs(1), Duration::ZERO);
        let err = poller.wait("exec-123", options).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Timeout);
        // one poll every 50ms over one second, plus the first
        assert!(source.fetches() <= 21, "{}", source.fetches());
        assert!(source.fetches() > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_budget_timeout_is_not_retryable() {
        let source = Scripted::new(vec![snapshot("running")]);
        let poller = ExecutionPoller::new(&source);

        let err = poller.wait("exec-123", options(2, 1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(!err.is_retryable());
    }
}
