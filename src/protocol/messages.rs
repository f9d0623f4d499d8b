//! Protocol message definitions
//!
//! All message types exchanged with the scheduling center. Requests
//! arrive on the control surface (`/run`, `/kill`, `/log`); registry and
//! callback messages go out to the center's API. Everything is JSON with
//! camelCase field names.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Response Envelope
// ─────────────────────────────────────────────────────────────────

/// Success status code used by both sides of the protocol
pub const CODE_SUCCESS: i32 = 200;

/// Failure status code used by both sides of the protocol
pub const CODE_FAILURE: i32 = 500;

/// Generic response envelope returned by the control surface and
/// accepted by the scheduling center's API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    /// Status code (200 success, 500 failure)
    pub code: i32,

    /// Human-readable message, set on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,

    /// Payload, set on success when the operation returns data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Build a success response with no payload
    pub fn success() -> Self {
        Self {
            code: CODE_SUCCESS,
            msg: None,
            content: None,
        }
    }

    /// Build a success response carrying a payload
    pub fn success_with(content: T) -> Self {
        Self {
            code: CODE_SUCCESS,
            msg: None,
            content: Some(content),
        }
    }

    /// Build a failure response with a message
    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            code: CODE_FAILURE,
            msg: Some(msg.into()),
            content: None,
        }
    }

    /// Whether this response carries the success code
    pub fn is_success(&self) -> bool {
        self.code == CODE_SUCCESS
    }
}

// ─────────────────────────────────────────────────────────────────
// Inbound Requests (scheduling center → executor)
// ─────────────────────────────────────────────────────────────────

/// Start request delivered to `/run`.
///
/// Fields the center may omit default to zero values; the handler name
/// is the lookup key into the task registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunRequest {
    /// Job identifier, unique per scheduled job on the center side
    pub job_id: i64,

    /// Name of the registered handler to execute
    pub executor_handler: String,

    /// Opaque parameter string passed through to the handler
    pub executor_params: String,

    /// Per-job timeout in seconds (0 = no timeout)
    pub executor_timeout: i64,

    /// Log identifier assigned by the center for this trigger
    pub log_id: i64,

    /// Trigger timestamp (epoch millis) assigned by the center
    pub log_date_time: i64,

    /// Execution mode marker, informational for this executor
    pub glue_type: String,
}

impl RunRequest {
    /// Trigger time as a UTC timestamp, when the center supplied one
    pub fn trigger_time(&self) -> Option<DateTime<Utc>> {
        if self.log_date_time <= 0 {
            return None;
        }
        Utc.timestamp_millis_opt(self.log_date_time).single()
    }
}

/// Cancel request delivered to `/kill`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KillRequest {
    /// Job identifier to cancel
    pub job_id: i64,
}

/// Log query delivered to `/log`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogRequest {
    /// Log identifier from the original trigger
    pub log_id: i64,

    /// Trigger timestamp (epoch millis) from the original trigger
    pub log_date_time: i64,

    /// First line number the center wants back
    pub from_line_num: i32,
}

/// Log payload returned from `/log`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogResponse {
    /// First line number of this page
    pub from_line_num: i32,

    /// Last line number of this page
    pub to_line_num: i32,

    /// Log text for the requested range
    pub log_content: String,

    /// Whether the log is complete at this point
    pub is_end: bool,
}

impl LogResponse {
    /// An empty page; log storage is owned by an external collaborator
    pub fn empty(from_line_num: i32) -> Self {
        Self {
            from_line_num,
            to_line_num: from_line_num,
            log_content: String::new(),
            is_end: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Outbound Messages (executor → scheduling center)
// ─────────────────────────────────────────────────────────────────

/// Registry group under which executors announce themselves
pub const REGISTRY_GROUP_EXECUTOR: &str = "EXECUTOR";

/// Heartbeat payload POSTed to the center's registry endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryRequest {
    /// Registry group, always "EXECUTOR" for this process
    pub registry_group: String,

    /// Key identifying this executor group on the center
    pub registry_key: String,

    /// Reachable address of this executor's control surface
    pub registry_value: String,
}

impl RegistryRequest {
    /// Build the executor heartbeat payload
    pub fn executor(registry_key: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            registry_group: REGISTRY_GROUP_EXECUTOR.to_string(),
            registry_key: registry_key.into(),
            registry_value: address.into(),
        }
    }
}

/// Completion report POSTed to the center's callback endpoint,
/// exactly once per dispatched task instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackRequest {
    /// Job identifier of the finished instance
    pub job_id: i64,

    /// Log identifier from the original trigger
    pub log_id: i64,

    /// Outcome status code (200 success, 500 failure)
    pub code: i32,

    /// Result payload or failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_field_names() {
        let json = r#"{
            "jobId": 1001,
            "executorHandler": "demoTask",
            "executorParams": "a=1",
            "executorTimeout": 30,
            "logId": 7,
            "logDateTime": 1700000000000,
            "glueType": "BEAN"
        }"#;

        let req: RunRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.job_id, 1001);
        assert_eq!(req.executor_handler, "demoTask");
        assert_eq!(req.executor_params, "a=1");
        assert_eq!(req.executor_timeout, 30);
        assert_eq!(req.log_id, 7);
    }

    #[test]
    fn test_run_request_missing_fields_default() {
        // The center omits fields it does not use for a given trigger
        let req: RunRequest = serde_json::from_str(r#"{"jobId": 5}"#).unwrap();
        assert_eq!(req.job_id, 5);
        assert_eq!(req.executor_handler, "");
        assert_eq!(req.executor_timeout, 0);
    }

    #[test]
    fn test_run_request_trigger_time() {
        let req = RunRequest {
            log_date_time: 1700000000000,
            ..Default::default()
        };
        let ts = req.trigger_time().unwrap();
        assert_eq!(ts.timestamp_millis(), 1700000000000);

        let req = RunRequest::default();
        assert!(req.trigger_time().is_none());
    }

    #[test]
    fn test_kill_request_roundtrip() {
        let req = KillRequest { job_id: 42 };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jobId\":42"));

        let back: KillRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.job_id, 42);
    }

    #[test]
    fn test_api_response_success() {
        let resp: ApiResponse = ApiResponse::success();
        assert!(resp.is_success());

        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"code\":200"));
        // No msg/content keys on a bare success
        assert!(!json.contains("msg"));
        assert!(!json.contains("content"));
    }

    #[test]
    fn test_api_response_failure() {
        let resp: ApiResponse = ApiResponse::failure("no handler");
        assert_eq!(resp.code, CODE_FAILURE);
        assert_eq!(resp.msg.as_deref(), Some("no handler"));
        assert!(!resp.is_success());
    }

    #[test]
    fn test_registry_request_executor() {
        let req = RegistryRequest::executor("demo-group", "http://10.0.0.5:9999");
        assert_eq!(req.registry_group, REGISTRY_GROUP_EXECUTOR);

        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"registryGroup\":\"EXECUTOR\""));
        assert!(json.contains("\"registryKey\":\"demo-group\""));
        assert!(json.contains("\"registryValue\":\"http://10.0.0.5:9999\""));
    }

    #[test]
    fn test_callback_request_serialization() {
        let cb = CallbackRequest {
            job_id: 1001,
            log_id: 7,
            code: CODE_SUCCESS,
            msg: Some("done".to_string()),
        };

        let json = serde_json::to_string(&cb).unwrap();
        assert!(json.contains("\"jobId\":1001"));
        assert!(json.contains("\"logId\":7"));
        assert!(json.contains("\"code\":200"));
    }

    #[test]
    fn test_log_response_empty() {
        let page = LogResponse::empty(3);
        assert_eq!(page.from_line_num, 3);
        assert_eq!(page.to_line_num, 3);
        assert!(page.is_end);
        assert!(page.log_content.is_empty());
    }
}
