//! The poll loop and the result-URL wait.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::attempt::PollAttempt;
use super::policy::{PollDecision, PollPolicy};
use crate::error::{AssetError, GENERIC_FAILURE_MESSAGE};
use crate::job::AssetJob;
use crate::normalize::{self, AssetStatus};
use crate::transport::TransportError;

/// Outcome of one attempt as judged by a specialisation.
pub(super) enum Verdict<T> {
    Done(T),
    Continue,
    Fail(AssetError),
}

/// Value produced by a finished wait, with attempt accounting.
pub(super) struct Polled<T> {
    pub value: T,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// A job that reached `SUCCESS` with a non-empty result URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyAsset {
    pub job_id: i64,
    pub result_url: String,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Drives status fetches under a [`PollPolicy`].
///
/// No state is shared between waits; running two waits for the same job at
/// once is the caller's problem.
#[derive(Debug, Clone)]
pub struct Poller {
    policy: PollPolicy,
    ticks: Option<mpsc::Sender<PollAttempt>>,
    cancel: CancellationToken,
    url_keys: &'static [&'static str],
}

impl Poller {
    pub fn new(policy: PollPolicy) -> Self {
        Self {
            policy,
            ticks: None,
            cancel: CancellationToken::new(),
            url_keys: &normalize::URL_KEYS,
        }
    }

    /// Send a [`PollAttempt`] after every attempt. Sends never block: a full
    /// or closed channel drops the record.
    pub fn with_ticks(mut self, ticks: mpsc::Sender<PollAttempt>) -> Self {
        self.ticks = Some(ticks);
        self
    }

    /// Stop sleeping and abandon the in-flight fetch once `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Look the result URL up under `keys` instead of the shared aliases.
    pub fn with_url_keys(mut self, keys: &'static [&'static str]) -> Self {
        self.url_keys = keys;
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Poll until `job` reports `SUCCESS` with a non-empty URL.
    ///
    /// `FAILED` rejects at once with the backend's message. Transport errors
    /// are absorbed and retried. `SUCCESS` without a URL, `PENDING`,
    /// `PROCESSING` and unreadable payloads keep the loop going.
    pub async fn wait_until_ready<F, Fut>(
        &self,
        job: &mut AssetJob,
        fetch_status: F,
    ) -> Result<ReadyAsset, AssetError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Value, TransportError>>,
    {
        let job_id = job.job_id();
        tracing::info!(job_id, "waiting for asset");
        let outcome = {
            let job = &mut *job;
            self.drive(&format!("job {job_id}"), fetch_status, |raw, record| {
                let n = normalize::normalize_with(raw, self.url_keys);
                record.phase = Some(n.phase);
                record.result_url = n.result_url.clone();
                if let Err(e) = job.observe(&n) {
                    tracing::error!(job_id, "backend contract violated: {}", e);
                    return Verdict::Fail(e);
                }
                match n.status() {
                    AssetStatus::Ready { url } => Verdict::Done(url),
                    AssetStatus::Failed { message } => {
                        let message =
                            message.unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
                        Verdict::Fail(AssetError::TerminalJobFailure { message })
                    }
                    AssetStatus::AwaitingUrl => {
                        tracing::debug!(job_id, "success reported without url yet");
                        Verdict::Continue
                    }
                    AssetStatus::Pending | AssetStatus::Processing => Verdict::Continue,
                    // Same as pending: keep polling.
                    AssetStatus::Unknown => Verdict::Continue,
                }
            })
            .await
        };

        match outcome {
            Ok(polled) => {
                tracing::info!(
                    job_id,
                    attempts = polled.attempts,
                    "asset ready after {:.1}s",
                    polled.elapsed.as_secs_f64()
                );
                Ok(ReadyAsset {
                    job_id,
                    result_url: polled.value,
                    attempts: polled.attempts,
                    elapsed: polled.elapsed,
                })
            }
            Err(e) => {
                job.record_error(e.to_string());
                Err(e)
            }
        }
    }

    /// The shared loop. `decide` inspects each parsed payload and may fill in
    /// the attempt record before it is emitted.
    pub(super) async fn drive<T, F, Fut, D>(
        &self,
        label: &str,
        mut fetch: F,
        mut decide: D,
    ) -> Result<Polled<T>, AssetError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Value, TransportError>>,
        D: FnMut(&Value, &mut PollAttempt) -> Verdict<T>,
    {
        let started = Instant::now();
        let mut delay = self.policy.interval;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AssetError::Cancelled),
                r = fetch() => r,
            };

            let mut record = PollAttempt::new(attempt, started.elapsed());
            let verdict = match fetched {
                Ok(raw) => {
                    let v = decide(&raw, &mut record);
                    record.raw_response = Some(raw);
                    v
                }
                Err(TransportError::Cancelled) => return Err(AssetError::Cancelled),
                Err(e) => {
                    tracing::warn!("{}: poll attempt {} failed: {}", label, attempt, e);
                    record.transport_error = Some(e.to_string());
                    Verdict::Continue
                }
            };
            tracing::debug!(
                "{}: attempt {} phase={} url={}",
                label,
                attempt,
                record.phase.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
                record.result_url.as_deref().unwrap_or("-")
            );
            self.emit(record);

            match verdict {
                Verdict::Done(value) => {
                    return Ok(Polled {
                        value,
                        attempts: attempt,
                        elapsed: started.elapsed(),
                    })
                }
                Verdict::Fail(e) => return Err(e),
                Verdict::Continue => {}
            }

            let elapsed = started.elapsed();
            match self.policy.decide(elapsed, delay) {
                PollDecision::GiveUp => {
                    tracing::warn!(
                        "{}: no terminal state after {} attempts in {:.1}s",
                        label,
                        attempt,
                        elapsed.as_secs_f64()
                    );
                    return Err(AssetError::PollTimeout {
                        waited: elapsed,
                        attempts: attempt,
                    });
                }
                PollDecision::SleepFor(d) => {
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Err(AssetError::Cancelled),
                        _ = tokio::time::sleep(d) => {}
                    }
                }
            }
            delay = self.policy.next_delay(delay);
        }
    }

    fn emit(&self, record: PollAttempt) {
        if let Some(tx) = &self.ticks {
            let _ = tx.try_send(record);
        }
    }
}
