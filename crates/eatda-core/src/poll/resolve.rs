//! Job-id resolution: wait until a parent resource exposes its job id.

use std::future::Future;

use serde_json::Value;

use super::run::{Poller, Verdict};
use crate::error::{AssetError, GENERIC_FAILURE_MESSAGE};
use crate::job::JobPhase;
use crate::normalize;
use crate::transport::TransportError;

impl Poller {
    /// Poll `fetch` until the payload carries a positive job id.
    ///
    /// Same discipline as [`Poller::wait_until_ready`]: transport errors are
    /// absorbed, a reported failure rejects immediately, and the policy's
    /// deadline bounds the wait.
    pub async fn wait_for_job_id<F, Fut>(&self, parent_id: i64, fetch: F) -> Result<i64, AssetError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Value, TransportError>>,
    {
        self.resolve(parent_id, fetch, false).await
    }

    /// Like [`Poller::wait_for_job_id`], for sources keyed by the parent id
    /// itself: once `fetch` answers with a recognised phase and no id of its
    /// own, the job id is `parent_id`. Errors such as a 404 before the job
    /// row exists are retried.
    pub async fn wait_for_job_id_or_parent<F, Fut>(
        &self,
        parent_id: i64,
        fetch: F,
    ) -> Result<i64, AssetError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Value, TransportError>>,
    {
        self.resolve(parent_id, fetch, true).await
    }

    async fn resolve<F, Fut>(
        &self,
        parent_id: i64,
        fetch: F,
        parent_is_job: bool,
    ) -> Result<i64, AssetError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Value, TransportError>>,
    {
        tracing::info!(parent_id, "resolving job id");
        let polled = self
            .drive(&format!("parent {parent_id}"), fetch, |raw, record| {
                if let Some(id) = normalize::extract_job_id(raw) {
                    record.job_id = Some(id);
                    return Verdict::Done(id);
                }
                let n = normalize::normalize(raw);
                record.phase = Some(n.phase);
                match n.phase {
                    JobPhase::Failed => {
                        let message = n
                            .message
                            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
                        Verdict::Fail(AssetError::TerminalJobFailure { message })
                    }
                    JobPhase::Unknown => Verdict::Continue,
                    _ if parent_is_job => {
                        record.job_id = Some(parent_id);
                        Verdict::Done(parent_id)
                    }
                    _ => Verdict::Continue,
                }
            })
            .await?;
        tracing::info!(
            parent_id,
            job_id = polled.value,
            attempts = polled.attempts,
            "job id resolved"
        );
        Ok(polled.value)
    }
}
