//! Scheduling-center client
//!
//! The outbound half of the executor: the registrar heartbeat loop that
//! keeps this executor visible to the center, and the callback reporter
//! that delivers task outcomes. Transport failures on either path are
//! logged and swallowed; the registrar retries implicitly on its next
//! tick, callbacks are at-most-once.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::{CallbackRequest, RegistryRequest};

/// Registration endpoint on the scheduling center
pub const REGISTRY_PATH: &str = "/api/registry";

/// De-registration endpoint on the scheduling center
pub const REGISTRY_REMOVE_PATH: &str = "/api/registryRemove";

/// Completion callback endpoint on the scheduling center
pub const CALLBACK_PATH: &str = "/api/callback";

// ─────────────────────────────────────────────────────────────────
// Center Client
// ─────────────────────────────────────────────────────────────────

/// Thin HTTP client for the scheduling center's executor-facing API
pub struct CenterClient {
    http: reqwest::Client,
    base_url: String,
}

impl CenterClient {
    /// Build a client for the center at `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { http, base_url })
    }

    /// The center's base address this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, payload: &T) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.post(&url).json(payload).send().await?;
        Ok(response.text().await?)
    }

    /// Announce this executor on the center's registry endpoint
    pub async fn register(&self, payload: &RegistryRequest) -> Result<String> {
        self.post_json(REGISTRY_PATH, payload).await
    }

    /// Remove this executor from the center's registry
    pub async fn deregister(&self, payload: &RegistryRequest) -> Result<String> {
        self.post_json(REGISTRY_REMOVE_PATH, payload).await
    }

    /// Report a task instance's outcome
    pub async fn callback(&self, payload: &CallbackRequest) -> Result<String> {
        self.post_json(CALLBACK_PATH, payload).await
    }
}

// ─────────────────────────────────────────────────────────────────
// Registrar
// ─────────────────────────────────────────────────────────────────

/// Periodic self-registration loop.
///
/// Fires one heartbeat immediately on startup, then one per interval,
/// forever, regardless of prior outcomes. The only fatal path is a
/// heartbeat payload that cannot be serialized at construction time,
/// before the executor starts serving.
pub struct Registrar {
    client: Arc<CenterClient>,
    payload: RegistryRequest,
    interval: Duration,
}

impl Registrar {
    pub fn new(
        client: Arc<CenterClient>,
        registry_key: impl Into<String>,
        address: impl Into<String>,
        interval: Duration,
    ) -> Result<Self> {
        let payload = RegistryRequest::executor(registry_key, address);

        // Startup check: a payload that cannot be built aborts before
        // the control surface ever serves.
        serde_json::to_string(&payload)
            .map_err(|e| Error::Registration(format!("cannot encode heartbeat payload: {}", e)))?;

        Ok(Self {
            client,
            payload,
            interval,
        })
    }

    /// The heartbeat payload sent on every tick
    pub fn payload(&self) -> &RegistryRequest {
        &self.payload
    }

    /// Send a single heartbeat
    pub async fn beat(&self) -> Result<String> {
        self.client.register(&self.payload).await
    }

    /// Run the heartbeat loop. Never returns; outcomes are logged and
    /// the timer is rearmed on success and failure alike.
    pub async fn run(&self) {
        info!(
            registry_key = %self.payload.registry_key,
            address = %self.payload.registry_value,
            interval_secs = self.interval.as_secs(),
            "Registrar started"
        );

        // First tick fires immediately, then one per interval.
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.beat().await {
                Ok(body) => debug!(response = %body, "Heartbeat delivered"),
                Err(e) => warn!(error = %e, "Heartbeat failed, retrying on next tick"),
            }
        }
    }

    /// Best-effort de-registration on graceful shutdown
    pub async fn deregister(&self) {
        match self.client.deregister(&self.payload).await {
            Ok(body) => info!(response = %body, "Executor de-registered"),
            Err(e) => warn!(error = %e, "De-registration failed"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Callback Reporter
// ─────────────────────────────────────────────────────────────────

/// Reports task outcomes to the center's callback endpoint.
///
/// Invoked exactly once per dispatched instance, from the completion
/// continuation. Failures are logged and swallowed; there is no retry
/// and no re-queue.
#[derive(Clone)]
pub struct CallbackReporter {
    client: Arc<CenterClient>,
}

impl CallbackReporter {
    pub fn new(client: Arc<CenterClient>) -> Self {
        Self { client }
    }

    pub async fn report(&self, job_id: i64, log_id: i64, code: i32, msg: Option<String>) {
        let payload = CallbackRequest {
            job_id,
            log_id,
            code,
            msg,
        };

        match self.client.callback(&payload).await {
            Ok(body) => debug!(job_id, code, response = %body, "Callback delivered"),
            Err(e) => warn!(job_id, code, error = %e, "Callback failed"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
