//! Hooks and traits for host integration
//!
//! These traits let the core log failures and look up the acting user without
//! depending on a particular logging transport or authentication layer. The host
//! application implements them; the defaults below cover standalone use.

use serde_json::{Map, Value};

/// Identity of the caller on whose behalf an operation runs.
pub trait ActorContext: Send + Sync {
    /// Identifier of the current authenticated actor, if any.
    fn current_actor_id(&self) -> Option<String>;
}

/// No authenticated actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousActor;

impl ActorContext for AnonymousActor {
    fn current_actor_id(&self) -> Option<String> {
        None
    }
}

/// A fixed actor id, e.g. resolved once per request by the host.
#[derive(Debug, Clone)]
pub struct StaticActor(pub String);

impl ActorContext for StaticActor {
    fn current_actor_id(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Sink for error-level log entries with structured context.
pub trait ErrorLog: Send + Sync {
    fn error(&self, message: &str, fields: &Map<String, Value>);
}

/// Emits entries as `tracing` error events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorLog;

impl ErrorLog for TracingErrorLog {
    fn error(&self, message: &str, fields: &Map<String, Value>) {
        let context = Value::Object(fields.clone());
        tracing::error!(context = %context, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_actor_has_no_id() {
        assert_eq!(AnonymousActor.current_actor_id(), None);
    }

    #[test]
    fn static_actor_returns_its_id() {
        let actor = StaticActor("user-42".to_string());
        assert_eq!(actor.current_actor_id().as_deref(), Some("user-42"));
    }

    #[test]
    fn tracing_log_accepts_empty_fields() {
        TracingErrorLog.error("nothing attached", &Map::new());
    }
}
