// crates/evoseal-adapters/src/remote.rs
// ============================================================================
// Module: Remote Job Protocol
// Description: The submit/poll/result HTTP job protocol shared by
//              ProgramOptimizerAdapter's remote mode and SelfAdaptingLMAdapter.
// Purpose: One retrying HTTP client rather than duplicating backoff logic
//          per adapter.
// Dependencies: reqwest, serde_json, tokio
// ============================================================================

//! ## Overview
//! `POST .../jobs/<op>` returns a `job_id`; the client then polls
//! `GET .../jobs/{id}/status` until it leaves `queued`/`running`, then reads
//! `GET .../jobs/{id}/result`. Transient HTTP errors (request build/send
//! failure, 5xx) are retried with exponential backoff; a `failed` job
//! status is not retried — it is a definite engine-side outcome.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::AdapterError;

/// A remote job client configuration.
#[derive(Debug, Clone)]
pub struct RemoteClientConfig {
    /// Base URL of the remote engine, e.g. `https://engine.internal`.
    pub base_url: String,
    /// Interval between status polls.
    pub poll_interval: Duration,
    /// Maximum number of status polls before giving up.
    pub max_polls: u32,
    /// Maximum retries for a transient HTTP failure.
    pub max_retries: u32,
    /// Initial backoff delay; doubled on each retry.
    pub initial_backoff: Duration,
}

impl Default for RemoteClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8100".to_string(),
            poll_interval: Duration::from_secs(2),
            max_polls: 150,
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

/// A remote job's reported status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted, not yet running.
    Queued,
    /// Currently executing.
    Running,
    /// Finished successfully; the result is available.
    Completed,
    /// Finished with an error; no result is available.
    Failed,
}

/// The `{job_id}` response from a job submission.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

/// The `{status}` response from a status poll.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: JobStatus,
}

/// The `{result}` response from a completed job.
#[derive(Debug, Deserialize)]
struct ResultResponse {
    result: Value,
}

/// Drives the submit/poll/result protocol against a remote engine.
pub struct RemoteJobClient {
    config: RemoteClientConfig,
    client: reqwest::Client,
}

impl RemoteJobClient {
    /// Builds a client for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Component`] when the underlying HTTP client
    /// cannot be constructed.
    pub fn new(config: RemoteClientConfig) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| AdapterError::Component(format!("http client build failed: {err}")))?;
        Ok(Self { config, client })
    }

    /// Submits `args` to `operation_name`, polls until terminal, and
    /// returns the job's result payload.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Network`] when every retry of a transient
    /// HTTP failure is exhausted, [`AdapterError::Component`] when the job
    /// reports `failed` or the poll budget is exhausted, or when a response
    /// cannot be decoded.
    pub async fn run_job(&self, operation_name: &str, args: &Value) -> Result<Value, AdapterError> {
        let job_id = self.submit(operation_name, args).await?;
        self.await_result(operation_name, &job_id).await
    }

    /// Submits a job, retrying transient failures with exponential backoff.
    async fn submit(&self, operation_name: &str, args: &Value) -> Result<String, AdapterError> {
        let url = format!("{}/jobs/{operation_name}", self.config.base_url);
        let response: SubmitResponse = self.send_with_retries(|| self.client.post(&url).json(args)).await?;
        Ok(response.job_id)
    }

    /// Polls status until terminal, then fetches the result.
    async fn await_result(&self, operation_name: &str, job_id: &str) -> Result<Value, AdapterError> {
        let status_url = format!("{}/jobs/{job_id}/status", self.config.base_url);
        for _ in 0..self.config.max_polls {
            let status: StatusResponse = self.send_with_retries(|| self.client.get(&status_url)).await?;
            match status.status {
                JobStatus::Completed => {
                    let result_url = format!("{}/jobs/{job_id}/result", self.config.base_url);
                    let result: ResultResponse = self.send_with_retries(|| self.client.get(&result_url)).await?;
                    return Ok(result.result);
                }
                JobStatus::Failed => {
                    return Err(AdapterError::Component(format!("remote job for {operation_name} failed")));
                }
                JobStatus::Queued | JobStatus::Running => {
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
        Err(AdapterError::Component(format!(
            "remote job for {operation_name} did not complete within {} polls",
            self.config.max_polls
        )))
    }

    /// Sends a request built by `build`, retrying transient failures
    /// (connection errors, timeouts, 5xx statuses) with exponential
    /// backoff up to `max_retries`.
    async fn send_with_retries<T, F>(&self, build: F) -> Result<T, AdapterError>
    where
        T: for<'de> Deserialize<'de>,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut delay = self.config.initial_backoff;
        let mut last_error = String::new();
        for attempt in 0..=self.config.max_retries {
            match build().send().await {
                Ok(response) if response.status().is_server_error() => {
                    last_error = format!("server error: {}", response.status());
                }
                Ok(response) => {
                    return response
                        .json::<T>()
                        .await
                        .map_err(|err| AdapterError::Network(format!("decode failure: {err}")));
                }
                Err(err) => {
                    last_error = err.to_string();
                }
            }
            if attempt < self.config.max_retries {
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
        Err(AdapterError::Network(format!(
            "exhausted {} retries: {last_error}",
            self.config.max_retries
        )))
    }
}

/// A submission payload shape, for adapters that need to build `args`
/// generically.
#[derive(Debug, Serialize)]
pub struct JobArgs {
    /// Opaque operation arguments.
    pub params: Value,
}
