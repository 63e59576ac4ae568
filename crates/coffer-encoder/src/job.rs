use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::client::TranscoderClientFactory;
use crate::error::{EncodeError, EncodeResult};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Started,
    Complete,
    Failed,
}

impl JobStatus {
    /// Map a status string reported by the transcoding service.
    ///
    /// Anything that is not a known in-progress or success value, including no
    /// value at all, counts as a failure.
    pub fn from_backend(status: Option<&str>) -> Self {
        match status {
            Some(s) if s.eq_ignore_ascii_case("submitted") || s.eq_ignore_ascii_case("progressing") => {
                JobStatus::Started
            }
            Some(s) if s.eq_ignore_ascii_case("complete") => JobStatus::Complete,
            _ => JobStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Started => "started",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polling behaviour for [`EncodeJob::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    /// Give up after this long. `None` waits until cancelled.
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

impl WaitOptions {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug)]
struct JobState {
    status: JobStatus,
    ended: Option<DateTime<Utc>>,
}

/// Handle to a submitted transcoding job
///
/// Status is read from the backend until a terminal value is seen. From then on
/// the cached value is returned and the backend is not contacted again.
pub struct EncodeJob {
    token: Uuid,
    job_id: String,
    source: String,
    output: String,
    thumbnail_pattern: Option<String>,
    started: DateTime<Utc>,
    state: Mutex<JobState>,
    factory: Arc<dyn TranscoderClientFactory>,
}

impl EncodeJob {
    pub(crate) fn new(
        job_id: String,
        source: String,
        output: String,
        thumbnail_pattern: Option<String>,
        factory: Arc<dyn TranscoderClientFactory>,
    ) -> Self {
        Self {
            token: Uuid::new_v4(),
            job_id,
            source,
            output,
            thumbnail_pattern,
            started: Utc::now(),
            state: Mutex::new(JobState {
                status: JobStatus::Started,
                ended: None,
            }),
            factory,
        }
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    /// Job id assigned by the transcoding service.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Backend key of the input.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Backend key of the output.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn thumbnail_pattern(&self) -> Option<&str> {
        self.thumbnail_pattern.as_deref()
    }

    pub fn started(&self) -> DateTime<Utc> {
        self.started
    }

    /// When the job was first seen in a terminal state.
    pub async fn ended(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.ended
    }

    pub async fn status(&self) -> EncodeResult<JobStatus> {
        // Held across the backend read so only one caller records the transition.
        let mut state = self.state.lock().await;
        if state.status.is_terminal() {
            tracing::debug!(job_id = %self.job_id, status = %state.status, "Using cached job status");
            return Ok(state.status);
        }

        let client = self.factory.create_client()?;
        let reported = client.read_job(&self.job_id).await.map_err(|e| {
            tracing::error!(error = %e, job_id = %self.job_id, "Failed to read transcoding job");
            e
        })?;

        let status = JobStatus::from_backend(reported.as_deref());
        if status.is_terminal() {
            let ended = Utc::now();
            state.status = status;
            state.ended = Some(ended);

            tracing::info!(
                job_id = %self.job_id,
                token = %self.token,
                status = %status,
                backend_status = reported.as_deref().unwrap_or("<none>"),
                duration_ms = (ended - self.started).num_milliseconds(),
                "Transcoding job finished"
            );
        }

        Ok(status)
    }

    /// Poll until the job reaches a terminal state.
    ///
    /// Fails with `InvalidOperation` if the job is already known to be finished,
    /// `Cancelled` once `cancel` fires and `TimedOut` after `options.timeout`.
    pub async fn wait(
        &self,
        options: &WaitOptions,
        cancel: &CancellationToken,
    ) -> EncodeResult<JobStatus> {
        {
            let state = self.state.lock().await;
            if state.status.is_terminal() {
                return Err(EncodeError::InvalidOperation(format!(
                    "job {} has already finished with status {}",
                    self.job_id, state.status
                )));
            }
        }

        let bounded = async {
            match options.timeout {
                Some(timeout) => {
                    match tokio::time::timeout(timeout, self.poll(options.poll_interval)).await {
                        Ok(result) => result,
                        Err(_) => {
                            tracing::warn!(
                                job_id = %self.job_id,
                                timeout_ms = timeout.as_millis(),
                                "Timed out waiting for transcoding job"
                            );
                            Err(EncodeError::TimedOut)
                        }
                    }
                }
                None => self.poll(options.poll_interval).await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(job_id = %self.job_id, "Stopped waiting for transcoding job");
                Err(EncodeError::Cancelled)
            }
            result = bounded => result,
        }
    }

    async fn poll(&self, interval: Duration) -> EncodeResult<JobStatus> {
        loop {
            let status = self.status().await?;
            if status.is_terminal() {
                return Ok(status);
            }
            tracing::debug!(job_id = %self.job_id, "Transcoding job still in progress");
            tokio::time::sleep(interval).await;
        }
    }
}

impl fmt::Debug for EncodeJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeJob")
            .field("token", &self.token)
            .field("job_id", &self.job_id)
            .field("source", &self.source)
            .field("output", &self.output)
            .field("thumbnail_pattern", &self.thumbnail_pattern)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{CreateJobRequest, TranscoderClient};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed list of statuses, repeating the last one.
    #[derive(Default)]
    struct Script {
        statuses: std::sync::Mutex<VecDeque<Option<String>>>,
        reads: AtomicUsize,
    }

    struct ScriptedFactory(Arc<Script>);

    struct ScriptedClient(Arc<Script>);

    #[async_trait]
    impl TranscoderClient for ScriptedClient {
        async fn create_job(&self, _request: CreateJobRequest) -> EncodeResult<String> {
            Ok("job-1".to_string())
        }

        async fn read_job(&self, _job_id: &str) -> EncodeResult<Option<String>> {
            self.0.reads.fetch_add(1, Ordering::SeqCst);
            let mut statuses = self.0.statuses.lock().unwrap();
            if statuses.len() > 1 {
                Ok(statuses.pop_front().flatten())
            } else {
                Ok(statuses.front().cloned().flatten())
            }
        }
    }

    impl TranscoderClientFactory for ScriptedFactory {
        fn create_client(&self) -> EncodeResult<Box<dyn TranscoderClient>> {
            Ok(Box::new(ScriptedClient(self.0.clone())))
        }
    }

    fn job(statuses: &[Option<&str>]) -> (EncodeJob, Arc<Script>) {
        let script = Arc::new(Script::default());
        *script.statuses.lock().unwrap() = statuses.iter().map(|s| s.map(String::from)).collect();
        let job = EncodeJob::new(
            "job-1".to_string(),
            "in.mp4".to_string(),
            "out.mp4".to_string(),
            None,
            Arc::new(ScriptedFactory(script.clone())),
        );
        (job, script)
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(JobStatus::from_backend(Some("Submitted")), JobStatus::Started);
        assert_eq!(JobStatus::from_backend(Some("PROGRESSING")), JobStatus::Started);
        assert_eq!(JobStatus::from_backend(Some("complete")), JobStatus::Complete);
        assert_eq!(JobStatus::from_backend(Some("Error")), JobStatus::Failed);
        assert_eq!(JobStatus::from_backend(Some("Canceled")), JobStatus::Failed);
        assert_eq!(JobStatus::from_backend(Some("")), JobStatus::Failed);
        assert_eq!(JobStatus::from_backend(None), JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_in_progress_status_is_not_cached() {
        let (job, script) = job(&[Some("Submitted"), Some("Progressing"), Some("Progressing")]);

        assert_eq!(job.status().await.unwrap(), JobStatus::Started);
        assert_eq!(job.status().await.unwrap(), JobStatus::Started);
        assert_eq!(script.reads.load(Ordering::SeqCst), 2);
        assert!(job.ended().await.is_none());
    }

    #[tokio::test]
    async fn test_terminal_status_is_cached() {
        let (job, script) = job(&[Some("Progressing"), Some("Complete"), Some("Error")]);

        assert_eq!(job.status().await.unwrap(), JobStatus::Started);
        assert_eq!(job.status().await.unwrap(), JobStatus::Complete);
        let ended = job.ended().await.expect("ended should be set");
        assert!(ended >= job.started());

        assert_eq!(job.status().await.unwrap(), JobStatus::Complete);
        assert_eq!(job.ended().await, Some(ended));
        assert_eq!(script.reads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_readers_see_one_transition() {
        let (job, script) = job(&[Some("Complete")]);
        let job = Arc::new(job);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let job = job.clone();
                tokio::spawn(async move { job.status().await.unwrap() })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), JobStatus::Complete);
        }

        assert_eq!(script.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wait_on_finished_job_is_invalid() {
        let (job, _script) = job(&[Some("Error")]);
        assert_eq!(job.status().await.unwrap(), JobStatus::Failed);

        let result = job
            .wait(&WaitOptions::default(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(EncodeError::InvalidOperation(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_polls_until_terminal() {
        let (job, script) = job(&[
            Some("Submitted"),
            Some("Progressing"),
            Some("Progressing"),
            Some("Complete"),
        ]);

        let status = job
            .wait(&WaitOptions::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(status, JobStatus::Complete);
        assert_eq!(script.reads.load(Ordering::SeqCst), 4);
        assert!(job.ended().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let (job, _script) = job(&[Some("Progressing")]);
        let options = WaitOptions::default().with_timeout(Duration::from_secs(12));

        let result = job.wait(&options, &CancellationToken::new()).await;
        assert!(matches!(result, Err(EncodeError::TimedOut)));
        assert!(job.ended().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_cancelled() {
        let (job, _script) = job(&[Some("Progressing")]);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            trigger.cancel();
        });

        let result = job.wait(&WaitOptions::default(), &cancel).await;
        assert!(matches!(result, Err(EncodeError::Cancelled)));
    }

    #[test]
    fn test_wait_options_builder() {
        let options = WaitOptions::default()
            .with_poll_interval(Duration::from_millis(250))
            .with_timeout(Duration::from_secs(60));
        assert_eq!(options.poll_interval, Duration::from_millis(250));
        assert_eq!(options.timeout, Some(Duration::from_secs(60)));
        assert_eq!(WaitOptions::default().timeout, None);
    }
}
