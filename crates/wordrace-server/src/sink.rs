//! Result sinks: where finished-player tallies go once a race completes.
//!
//! Sinks are best-effort. The room manager spawns one task per record and
//! only logs failures; nothing is retried and nothing reaches clients.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Notify;

use wordrace_core::result::SessionResult;

use crate::config::{ResultsConfig, SinkKind};

pub type SharedResultSink = Arc<dyn ResultSink>;

/// Accepts one finished player's record.
pub trait ResultSink: Send + Sync {
    fn record(&self, result: SessionResult) -> BoxFuture<'static, Result<(), SinkError>>;
}

#[derive(Debug)]
pub enum SinkError {
    Request(String),
    Status(u16),
    Rejected(String),
    Build(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request(e) => write!(f, "request failed: {e}"),
            Self::Status(code) => write!(f, "session store returned HTTP {code}"),
            Self::Rejected(user) => write!(f, "record for {user} rejected"),
            Self::Build(e) => write!(f, "failed to build sink: {e}"),
        }
    }
}

impl std::error::Error for SinkError {}

/// Build the sink selected in config.
pub fn build_sink(config: &ResultsConfig) -> Result<SharedResultSink, SinkError> {
    match config.sink {
        SinkKind::Log => Ok(Arc::new(LogResultSink)),
        SinkKind::Http => {
            let endpoint = config
                .endpoint
                .clone()
                .ok_or_else(|| SinkError::Build("missing endpoint".to_string()))?;
            let sink = HttpResultSink::new(
                endpoint,
                config.bearer_token.clone(),
                Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Arc::new(sink))
        },
    }
}

/// Writes each record as a structured log line. Default when no session
/// store is configured.
pub struct LogResultSink;

impl ResultSink for LogResultSink {
    fn record(&self, result: SessionResult) -> BoxFuture<'static, Result<(), SinkError>> {
        tracing::info!(
            user_id = %result.user_id,
            quiz_subject_id = %result.quiz_subject_id,
            recalled = result.recalled,
            not_recalled = result.not_recalled,
            mode = %result.mode,
            "Session result"
        );
        Box::pin(async { Ok(()) })
    }
}

/// POSTs each record as JSON to the session store.
pub struct HttpResultSink {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpResultSink {
    pub fn new(
        endpoint: String,
        bearer_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Build(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            bearer_token,
        })
    }
}

impl ResultSink for HttpResultSink {
    fn record(&self, result: SessionResult) -> BoxFuture<'static, Result<(), SinkError>> {
        let mut request = self.client.post(&self.endpoint).json(&result);
        if let Some(ref token) = self.bearer_token {
            request = request.bearer_auth(token);
        }
        Box::pin(async move {
            let resp = request
                .send()
                .await
                .map_err(|e| SinkError::Request(e.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(SinkError::Status(status.as_u16()));
            }
            Ok(())
        })
    }
}

/// Collects records in memory. Optionally rejects one user's records, which
/// lets callers observe that failures stay isolated.
#[derive(Default)]
pub struct MemoryResultSink {
    records: Mutex<Vec<SessionResult>>,
    reject_user: Option<String>,
    rejected: AtomicUsize,
    notify: Notify,
}

impl MemoryResultSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(user_id: &str) -> Self {
        Self {
            reject_user: Some(user_id.to_string()),
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<SessionResult> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.load(Ordering::Acquire)
    }

    /// Wait until at least `n` records arrived or `timeout` elapsed, then
    /// return what was collected.
    pub async fn wait_for(&self, n: usize, timeout: Duration) -> Vec<SessionResult> {
        self.wait_until(|sink| sink.records().len() >= n, timeout).await;
        self.records()
    }

    /// Wait until at least `n` records were rejected or `timeout` elapsed,
    /// then return the rejection count.
    pub async fn wait_for_rejections(&self, n: usize, timeout: Duration) -> usize {
        self.wait_until(|sink| sink.rejected_count() >= n, timeout).await;
        self.rejected_count()
    }

    async fn wait_until(&self, done: impl Fn(&Self) -> bool, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.notify.notified();
            if done(self) {
                return;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return;
            }
        }
    }
}

impl ResultSink for MemoryResultSink {
    fn record(&self, result: SessionResult) -> BoxFuture<'static, Result<(), SinkError>> {
        if self.reject_user.as_deref() == Some(result.user_id.as_str()) {
            self.rejected.fetch_add(1, Ordering::AcqRel);
            self.notify.notify_waiters();
            let user = result.user_id;
            return Box::pin(async move { Err(SinkError::Rejected(user)) });
        }
        if let Ok(mut records) = self.records.lock() {
            records.push(result);
        }
        self.notify.notify_waiters();
        Box::pin(async { Ok(()) })
    }
}
