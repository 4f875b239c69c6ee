//! Supercheck background worker
//!
//! Delivers outbound webhooks queued in Redis.

pub mod config;
pub mod webhook_processor;

pub use config::WorkerConfig;
pub use webhook_processor::{DeliveryError, JobQueue, RedisJobQueue, WebhookDeliverer};
