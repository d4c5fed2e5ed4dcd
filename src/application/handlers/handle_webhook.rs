//! HandleWebhookHandler - Command handler for inbound provider webhooks.
//!
//! Verification consumes the exact raw bytes received; only a verified
//! event reaches the dispatcher.

use std::sync::Arc;

use crate::domain::webhooks::{DispatchOutcome, EventDispatcher, WebhookError, WebhookVerifier};

/// Command carrying one raw webhook delivery.
#[derive(Debug, Clone)]
pub struct HandleWebhookCommand {
    /// Raw request body, exactly as received.
    pub payload: Vec<u8>,
    /// Signature header value.
    pub signature: String,
}

/// Handler for webhook deliveries: verify, classify, dispatch.
pub struct HandleWebhookHandler {
    verifier: Arc<WebhookVerifier>,
    dispatcher: Arc<EventDispatcher>,
}

impl HandleWebhookHandler {
    pub fn new(verifier: Arc<WebhookVerifier>, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            verifier,
            dispatcher,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandleWebhookCommand,
    ) -> Result<DispatchOutcome, WebhookError> {
        let event = self.verifier.verify_and_parse(&cmd.payload, &cmd.signature)?;
        self.dispatcher.dispatch(&event).await
    }
}
