//! Polling a conversion until it leaves `IN_PROGRESS`.

use std::time::Duration;

use tokio::time::Instant;

use crate::conversion::{ConversionInitiator, ConversionStatus};
use crate::error::ImportError;
use crate::progress::{ImportProgress, ProgressCallback, emit};

/// Default wait between status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pacing and bound for the status poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Wait between consecutive status queries.
    pub interval: Duration,
    /// Give up once this much time has passed. `None` polls forever.
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

impl PollConfig {
    #[must_use]
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Re-queries a conversion at a fixed interval until it is terminal.
pub struct StatusPoller<'a> {
    conversions: ConversionInitiator<'a>,
    config: PollConfig,
    on_progress: Option<&'a ProgressCallback>,
}

impl<'a> StatusPoller<'a> {
    pub fn new(
        conversions: ConversionInitiator<'a>,
        config: PollConfig,
        on_progress: Option<&'a ProgressCallback>,
    ) -> Self {
        Self {
            conversions,
            config,
            on_progress,
        }
    }

    /// Poll `process_id` and return its first terminal status.
    ///
    /// Query failures end the loop immediately. If a deadline is configured
    /// and the next wait would overrun it, polling stops with
    /// [`ImportError::Timeout`].
    pub async fn wait_for_terminal(&self, process_id: &str) -> Result<ConversionStatus, ImportError> {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let status = self.conversions.status(process_id).await?;
            emit(
                self.on_progress,
                ImportProgress::StatusChecked {
                    attempt,
                    status: status.state.as_str().to_string(),
                },
            );

            if status.state.is_terminal() {
                tracing::debug!(process_id, attempt, status = status.state.as_str(), "Conversion finished");
                return Ok(status);
            }

            let elapsed = started.elapsed();
            if let Some(timeout) = self.config.timeout
                && elapsed
                    .checked_add(self.config.interval)
                    .is_none_or(|next| next > timeout)
            {
                tracing::warn!(process_id, attempt, ?elapsed, "Conversion poll deadline reached");
                return Err(ImportError::Timeout {
                    process_id: process_id.to_string(),
                    elapsed,
                });
            }

            tracing::debug!(process_id, attempt, "Conversion in progress");
            emit(
                self.on_progress,
                ImportProgress::Waiting {
                    attempt,
                    interval: self.config.interval,
                },
            );
            tokio::time::sleep(self.config.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AccessToken;
    use crate::context::ApiContext;
    use crate::conversion::ConversionState;
    use crate::http::{HttpError, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockTransport};
    use std::sync::{Arc, Mutex};

    const STATUS_URL: &str =
        "https://ast.test/api/repos-manager/conversion/status?processId=proc-1";

    fn script(transport: &MockTransport, statuses: &[&str]) {
        for status in statuses {
            transport.push_json(
                HttpMethod::Get,
                STATUS_URL,
                200,
                serde_json::json!({"migrationStatus": status, "summary": format!("{status} summary")}),
            );
        }
    }

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<ImportProgress>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (Box::new(move |e| sink.lock().unwrap().push(e)), seen)
    }

    fn waits(events: &[ImportProgress]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, ImportProgress::Waiting { .. }))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_ok() {
        let transport = MockTransport::new();
        script(&transport, &["IN_PROGRESS", "IN_PROGRESS", "OK"]);
        let ctx = ApiContext::new("https://ast.test", AccessToken::new("t"), Arc::new(transport.clone()));
        let (cb, seen) = recorder();

        let started = Instant::now();
        let status = StatusPoller::new(ConversionInitiator::new(&ctx), PollConfig::default(), Some(&cb))
            .wait_for_terminal("proc-1")
            .await
            .unwrap();

        assert_eq!(status.state, ConversionState::Ok);
        assert_eq!(transport.count(HttpMethod::Get, STATUS_URL), 3);
        assert_eq!(waits(&seen.lock().unwrap()), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_status_is_returned_not_raised() {
        let transport = MockTransport::new();
        script(&transport, &["IN_PROGRESS", "FAILED"]);
        let ctx = ApiContext::new("https://ast.test", AccessToken::new("t"), Arc::new(transport.clone()));

        let status = StatusPoller::new(ConversionInitiator::new(&ctx), PollConfig::default(), None)
            .wait_for_terminal("proc-1")
            .await
            .unwrap();

        assert_eq!(status.state, ConversionState::Failed("FAILED".into()));
        assert_eq!(status.summary.as_deref(), Some("FAILED summary"));
        assert_eq!(transport.count(HttpMethod::Get, STATUS_URL), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_polling() {
        let transport = MockTransport::new();
        script(&transport, &["IN_PROGRESS"; 10]);
        let ctx = ApiContext::new("https://ast.test", AccessToken::new("t"), Arc::new(transport.clone()));
        let (cb, seen) = recorder();

        let config = PollConfig::default().with_timeout(Duration::from_secs(2));
        let err = StatusPoller::new(ConversionInitiator::new(&ctx), config, Some(&cb))
            .wait_for_terminal("proc-1")
            .await
            .expect_err("should time out");

        match err {
            ImportError::Timeout {
                process_id,
                elapsed,
            } => {
                assert_eq!(process_id, "proc-1");
                assert_eq!(elapsed, Duration::from_secs(2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.count(HttpMethod::Get, STATUS_URL), 3);
        assert_eq!(waits(&seen.lock().unwrap()), 2);
    }

    /// Transport that takes `delay` to answer every status query with `IN_PROGRESS`.
    struct SlowTransport {
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl HttpTransport for SlowTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, HttpError> {
            tokio::time::sleep(self.delay).await;
            Ok(HttpResponse::json(
                200,
                &serde_json::json!({"migrationStatus": "IN_PROGRESS"}),
            ))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_with_deadline_times_out() {
        let transport = SlowTransport {
            delay: Duration::from_secs(2),
        };
        let ctx = ApiContext::new("https://ast.test", AccessToken::new("t"), Arc::new(transport));

        let config = PollConfig::new(Duration::from_secs(u64::MAX), Some(Duration::from_secs(3600)));
        let err = StatusPoller::new(ConversionInitiator::new(&ctx), config, None)
            .wait_for_terminal("proc-1")
            .await
            .expect_err("interval can never fit inside the deadline");

        match err {
            ImportError::Timeout { elapsed, .. } => assert_eq!(elapsed, Duration::from_secs(2)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_interval() {
        let transport = MockTransport::new();
        script(&transport, &["IN_PROGRESS", "OK"]);
        let ctx = ApiContext::new("https://ast.test", AccessToken::new("t"), Arc::new(transport.clone()));

        let started = Instant::now();
        let config = PollConfig::new(Duration::from_secs(5), None);
        StatusPoller::new(ConversionInitiator::new(&ctx), config, None)
            .wait_for_terminal("proc-1")
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_error_ends_loop() {
        let transport = MockTransport::new();
        script(&transport, &["IN_PROGRESS"]);
        transport.push_transport_error(HttpMethod::Get, STATUS_URL, "reset by peer");
        let ctx = ApiContext::new("https://ast.test", AccessToken::new("t"), Arc::new(transport.clone()));

        let err = StatusPoller::new(ConversionInitiator::new(&ctx), PollConfig::default(), None)
            .wait_for_terminal("proc-1")
            .await
            .expect_err("transport failure");
        assert!(matches!(err, ImportError::Status(_)));
    }
}
