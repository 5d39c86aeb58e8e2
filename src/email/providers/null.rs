use crate::email::{EmailBody, EmailError, EmailMessage, EmailProvider};
use async_trait::async_trait;
use tracing::{debug, info};

/// Logs contact messages instead of delivering them.
pub struct NullProvider;

impl NullProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NullProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailProvider for NullProvider {
    async fn send_email(&self, message: EmailMessage) -> Result<(), EmailError> {
        let preview: String = message.body.text().chars().take(200).collect();
        let truncated = message.body.text().chars().count() > 200;

        info!(
            from = %message.from,
            to = %message.to.join(", "),
            reply_to = %message.reply_to.as_deref().unwrap_or("(none)"),
            subject = %message.subject,
            "Null email provider: message not sent"
        );
        info!("Body: {}{}", preview, if truncated { "..." } else { "" });

        if let EmailBody::Both { html, .. } = &message.body {
            debug!("HTML body:\n{}", html);
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "Null Email Provider (Logging Only)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_provider_accepts_text_and_multipart() {
        let provider = NullProvider::new();

        let text = EmailMessage::new("owner@example.com", "site@example.com", "Hello")
            .with_text("Plain body")
            .with_reply_to("visitor@example.com");
        assert!(provider.send_email(text).await.is_ok());

        let long_body = "x".repeat(500);
        let both = EmailMessage::new("owner@example.com", "site@example.com", "Hello")
            .with_both(long_body, "<p>html</p>");
        assert!(provider.send_email(both).await.is_ok());
    }

    #[test]
    fn test_null_provider_name() {
        assert_eq!(NullProvider::new().name(), "Null Email Provider (Logging Only)");
    }
}
