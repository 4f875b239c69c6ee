//! Webhook Queue Processor
//!
//! Pops webhook jobs from a Redis list and POSTs them to their target URL.
//! Transient failures are retried with jittered exponential backoff; jobs
//! that still fail are pushed onto the dead-letter list with the last error.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use reqwest::StatusCode;
use serde_json::json;
use sha2::Sha256;
use supercheck_shared::{SupercheckResult, WebhookJob};
use time::format_description::well_known::Rfc3339;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::WorkerConfig;

/// First retry delay
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Upper bound for any single retry delay
const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

/// BRPOP timeout, bounds how long shutdown waits on an idle queue
const POP_TIMEOUT_SECS: u64 = 5;

type HmacSha256 = Hmac<Sha256>;

/// Webhook delivery errors
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Invalid webhook URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint returned status {0}")]
    Status(u16),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid signing key")]
    SigningKey,
}

impl DeliveryError {
    /// Returns true if this error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            // Retry network-related errors and timeouts
            DeliveryError::Http(e) => !e.is_builder(),
            DeliveryError::Status(code) => {
                *code >= 500 || *code == StatusCode::TOO_MANY_REQUESTS.as_u16()
            }

            // Don't retry permanent errors
            DeliveryError::InvalidUrl(_) => false,
            DeliveryError::Serialization(_) => false,
            DeliveryError::SigningKey => false,
        }
    }
}

/// Result of delivering one job, including how many requests were made
#[derive(Debug)]
pub struct DeliveryReport {
    pub attempts: u32,
    pub result: Result<(), DeliveryError>,
}

/// What happened to a popped job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Delivered,
    DeadLettered,
}

/// HTTP client for webhook delivery
#[derive(Clone)]
pub struct WebhookDeliverer {
    client: reqwest::Client,
    signing_secret: Option<String>,
    max_retries: usize,
    retry_base: Duration,
}

impl WebhookDeliverer {
    pub fn new(config: &WorkerConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("Supercheck-Webhook/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            signing_secret: config.signing_secret.clone(),
            max_retries: config.max_retries,
            retry_base: RETRY_BASE_DELAY,
        })
    }

    /// Override the first retry delay
    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    /// Deliver a job, retrying transient failures
    pub async fn deliver(&self, job: &WebhookJob) -> DeliveryReport {
        use tokio_retry::strategy::{jitter, ExponentialBackoff};
        use tokio_retry::Retry;

        if let Err(e) = validate_url(&job.url) {
            return DeliveryReport {
                attempts: 0,
                result: Err(e),
            };
        }

        // Delays of base, 2*base, 4*base, ... capped and jittered
        let retry_strategy = ExponentialBackoff::from_millis(2)
            .factor((self.retry_base.as_millis() as u64 / 2).max(1))
            .max_delay(RETRY_MAX_DELAY)
            .take(self.max_retries)
            .map(jitter);

        let mut attempts = 0u32;
        let result = Retry::spawn(retry_strategy, || {
            attempts += 1;
            let deliverer = self;
            async move {
                let result = deliverer.deliver_once(job).await;

                match &result {
                    Ok(_) => Ok(result),
                    Err(e) if e.is_transient() => {
                        tracing::debug!(job_id = %job.id, error = %e, "Transient error - will retry");
                        Err(result) // Return error to trigger retry
                    }
                    Err(e) => {
                        tracing::debug!(job_id = %job.id, error = %e, "Permanent error - will not retry");
                        Ok(result) // Return error wrapped in Ok to stop retrying
                    }
                }
            }
        })
        .await
        .unwrap_or_else(|e| e);

        DeliveryReport { attempts, result }
    }

    async fn deliver_once(&self, job: &WebhookJob) -> Result<(), DeliveryError> {
        let body = render_body(job)?;

        let mut request = self
            .client
            .post(&job.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("X-Supercheck-Event", &job.event)
            .header("X-Supercheck-Delivery", job.id.to_string());

        if let Some(secret) = &self.signing_secret {
            request = request.header("X-Supercheck-Signature", sign_payload(secret, &body)?);
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}

/// Request body sent to the endpoint
pub fn render_body(job: &WebhookJob) -> Result<Vec<u8>, DeliveryError> {
    let timestamp = job
        .created_at
        .format(&Rfc3339)
        .unwrap_or_else(|_| job.created_at.unix_timestamp().to_string());

    Ok(serde_json::to_vec(&json!({
        "id": job.id,
        "event": job.event,
        "timestamp": timestamp,
        "data": job.payload,
    }))?)
}

/// `sha256=<hex>` HMAC of the request body
pub fn sign_payload(secret: &str, body: &[u8]) -> Result<String, DeliveryError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| DeliveryError::SigningKey)?;
    mac.update(body);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

fn validate_url(raw: &str) -> Result<(), DeliveryError> {
    let parsed = url::Url::parse(raw).map_err(|e| DeliveryError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(DeliveryError::InvalidUrl(format!(
            "unsupported scheme '{}'",
            other
        ))),
    }
}

/// Source of raw webhook jobs and sink for failed ones
#[async_trait]
pub trait JobQueue: Send {
    /// Next raw job, or `None` once the pop timeout passes on an empty queue
    async fn pop(&mut self) -> SupercheckResult<Option<String>>;

    /// Park a job that will not be delivered
    async fn dead_letter(&mut self, raw: String) -> SupercheckResult<()>;
}

/// Redis lists: BRPOP from the queue, LPUSH onto the dead-letter list
pub struct RedisJobQueue {
    conn: ConnectionManager,
    queue: String,
    dead_letter_queue: String,
}

impl RedisJobQueue {
    pub fn new(conn: ConnectionManager, config: &WorkerConfig) -> Self {
        Self {
            conn,
            queue: config.queue.clone(),
            dead_letter_queue: config.dead_letter_queue.clone(),
        }
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn pop(&mut self) -> SupercheckResult<Option<String>> {
        let popped: Option<(String, String)> = redis::cmd("BRPOP")
            .arg(&self.queue)
            .arg(POP_TIMEOUT_SECS)
            .query_async(&mut self.conn)
            .await?;
        Ok(popped.map(|(_, raw)| raw))
    }

    async fn dead_letter(&mut self, raw: String) -> SupercheckResult<()> {
        let _: () = self.conn.lpush(&self.dead_letter_queue, raw).await?;
        Ok(())
    }
}

/// Pop and deliver one job. `Ok(None)` when the queue stayed empty.
///
/// Once a job is popped it is either delivered or dead-lettered; callers
/// must not drop this future midway.
pub async fn process_next(
    queue: &mut dyn JobQueue,
    deliverer: &WebhookDeliverer,
) -> SupercheckResult<Option<ProcessOutcome>> {
    let Some(raw) = queue.pop().await? else {
        return Ok(None);
    };

    let mut job: WebhookJob = match serde_json::from_str(&raw) {
        Ok(job) => job,
        Err(e) => {
            error!(error = %e, "Malformed webhook job, moving to dead-letter queue");
            queue.dead_letter(raw).await?;
            return Ok(Some(ProcessOutcome::DeadLettered));
        }
    };

    let report = deliverer.deliver(&job).await;
    job.attempts += report.attempts;

    match report.result {
        Ok(()) => {
            info!(job_id = %job.id, event = %job.event, attempts = job.attempts, "Webhook delivered");
            Ok(Some(ProcessOutcome::Delivered))
        }
        Err(e) => {
            error!(
                job_id = %job.id,
                event = %job.event,
                attempts = job.attempts,
                error = %e,
                "Webhook permanently failed"
            );
            job.last_error = Some(e.to_string());
            queue.dead_letter(serde_json::to_string(&job)?).await?;
            Ok(Some(ProcessOutcome::DeadLettered))
        }
    }
}

/// Process jobs until shutdown is signalled
///
/// Shutdown is only observed between jobs, so an in-flight job always
/// finishes. The pop timeout bounds the wait on an idle queue.
pub async fn run<Q: JobQueue>(
    mut queue: Q,
    deliverer: WebhookDeliverer,
    shutdown: watch::Receiver<bool>,
) {
    info!("Webhook processor started");

    while !*shutdown.borrow() {
        if let Err(e) = process_next(&mut queue, &deliverer).await {
            warn!(error = %e, "Failed to process webhook queue");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    info!("Webhook processor stopped");
}
