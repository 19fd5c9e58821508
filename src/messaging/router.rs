use super::EventRegistry;
use crate::types::{ArenaError, error::Result};
use serde_json::Value;
use std::sync::Arc;

/// Decodes inbound frames and fans them out through the event registry.
///
/// Every well-formed frame causes exactly one dispatch, keyed by its `type`
/// discriminator. Built-in behaviors for the well-known types are ordinary
/// subscribers registered at client startup, so they share this single
/// mechanism with page-specific subscribers.
pub struct MessageRouter {
    registry: Arc<EventRegistry>,
}

impl MessageRouter {
    pub fn new(registry: Arc<EventRegistry>) -> Self {
        Self { registry }
    }

    /// Routes one raw text frame.
    ///
    /// A frame that is not a JSON object carrying a string `type` field is a
    /// decode fault: the error is returned for logging and the frame is
    /// dropped without reaching any subscriber.
    pub fn handle_frame(&self, raw: &str) -> Result<()> {
        let value: Value = serde_json::from_str(raw)?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ArenaError::MalformedFrame("missing `type` discriminator".to_string())
            })?
            .to_owned();

        tracing::debug!(%kind, "routing frame");
        self.registry.dispatch(&kind, &value);
        Ok(())
    }
}
