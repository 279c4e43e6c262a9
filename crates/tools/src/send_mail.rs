//! Mock mail capability: logs the message and reports it as sent.

use async_trait::async_trait;
use optimus_core::capability::{Capability, required_str};
use optimus_core::error::CapabilityError;
use serde_json::{Value, json};
use tracing::info;

pub struct SendMailCapability;

#[async_trait]
impl Capability for SendMailCapability {
    fn name(&self) -> &str {
        "send_mail"
    }

    fn description(&self) -> &str {
        "Send an email to the specified recipient and return a confirmation payload."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to": { "type": "string", "description": "Recipient email address" },
                "subject": { "type": "string", "description": "Subject line" },
                "body": { "type": "string", "description": "Message body" }
            },
            "required": ["to", "subject", "body"]
        })
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, CapabilityError> {
        let to = required_str(&arguments, "to")?;
        let subject = required_str(&arguments, "subject")?;
        let body = required_str(&arguments, "body")?;

        info!(to = %to, subject = %subject, body = %body, "SEND-MAIL MOCK");
        Ok(json!({
            "status": "sent",
            "to": to,
            "subject": subject,
            "body": body,
        }))
    }
}
