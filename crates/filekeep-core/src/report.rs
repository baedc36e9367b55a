//! Error reporting sink
//!
//! `ErrorReporter` logs a failure together with the request context and the
//! acting user, then hands back the `{success: false, message}` payload that a
//! boundary adapter serializes with the returned status code.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{AppError, ErrorMetadata, LogLevel};
use crate::hooks::{ActorContext, AnonymousActor, ErrorLog, TracingErrorLog};

pub const INTERNAL_SERVER_ERROR: u16 = 500;

/// Body of a reported failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureBody {
    pub success: bool,
    pub message: String,
}

/// Failure payload paired with the status code it should be sent with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedFailure {
    pub status: u16,
    pub body: FailureBody,
}

impl ReportedFailure {
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "success": self.body.success,
            "message": self.body.message,
        })
    }
}

#[derive(Clone)]
pub struct ErrorReporter {
    log: Arc<dyn ErrorLog>,
    actor: Arc<dyn ActorContext>,
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new(Arc::new(TracingErrorLog), Arc::new(AnonymousActor))
    }
}

impl ErrorReporter {
    pub fn new(log: Arc<dyn ErrorLog>, actor: Arc<dyn ActorContext>) -> Self {
        Self { log, actor }
    }

    /// Log `message` with the request context and actor id, and build the failure payload.
    ///
    /// A missing context is logged as an empty object and a missing actor as `null`.
    pub fn report(&self, message: &str, context: Option<&Value>, status: u16) -> ReportedFailure {
        self.log.error(message, &self.fields(context));
        Self::failure(message, status)
    }

    /// Report an `AppError` using its client message and HTTP status.
    ///
    /// The error code and suggestion are always logged. Internal details are
    /// only added to the log entry when the error is not sensitive; sensitive
    /// details stay in the `tracing` event.
    pub fn report_error(&self, error: &AppError, context: Option<&Value>) -> ReportedFailure {
        let details = error.detailed_message();
        match error.log_level() {
            LogLevel::Debug => tracing::debug!(
                error_type = error.error_type(),
                code = error.error_code(),
                recoverable = error.is_recoverable(),
                details = %details,
                "Reporting error"
            ),
            LogLevel::Warn => tracing::warn!(
                error_type = error.error_type(),
                code = error.error_code(),
                recoverable = error.is_recoverable(),
                details = %details,
                "Reporting error"
            ),
            LogLevel::Error => tracing::error!(
                error_type = error.error_type(),
                code = error.error_code(),
                recoverable = error.is_recoverable(),
                details = %details,
                "Reporting error"
            ),
        }

        let message = error.client_message();
        let mut fields = self.fields(context);
        fields.insert(
            "error_code".to_string(),
            Value::String(error.error_code().to_string()),
        );
        fields.insert(
            "suggestion".to_string(),
            error
                .suggested_action()
                .map(|s| Value::String(s.to_string()))
                .unwrap_or(Value::Null),
        );
        if !error.is_sensitive() {
            fields.insert("details".to_string(), Value::String(details));
        }

        self.log.error(&message, &fields);
        Self::failure(&message, error.http_status_code())
    }

    fn fields(&self, context: Option<&Value>) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert(
            "request".to_string(),
            context.cloned().unwrap_or_else(|| Value::Object(Map::new())),
        );
        fields.insert(
            "user_id".to_string(),
            self.actor
                .current_actor_id()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        fields
    }

    fn failure(message: &str, status: u16) -> ReportedFailure {
        ReportedFailure {
            status,
            body: FailureBody {
                success: false,
                message: message.to_string(),
            },
        }
    }
}
