//! Template rendering plus delivery in one call.

use crate::error::{NotificationError, NotificationResult};
use crate::models::{Email, EmailPriority};
use crate::provider::{EmailProvider, SendResult};
use crate::templates::TemplateEngine;
use serde_json::Value;
use tracing::{debug, instrument};

pub struct Mailer<P: EmailProvider> {
    provider: P,
    templates: TemplateEngine,
}

impl<P: EmailProvider> Mailer<P> {
    pub fn new(provider: P, templates: TemplateEngine) -> Self {
        Self {
            provider,
            templates,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Render `template` with `data` and send it to `to`.
    #[instrument(skip(self, data), fields(provider = self.provider.name()))]
    pub async fn send_template(
        &self,
        to: &str,
        template: &str,
        data: &Value,
    ) -> NotificationResult<SendResult> {
        if to.trim().is_empty() {
            return Err(NotificationError::InvalidInput(
                "recipient address is empty".to_string(),
            ));
        }

        let rendered = self
            .templates
            .render(template, data)
            .map_err(|e| NotificationError::Template(e.to_string()))?;

        let mut email = Email::new(to, rendered.subject).with_priority(EmailPriority::High);
        email.body_text = rendered.body_text;
        email.body_html = rendered.body_html;

        let result = self.provider.send(&email).await?;
        debug!(message_id = %result.message_id, "Email handed to provider");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockEmailProvider;
    use crate::templates::{BOOKING_CONFIRMED, PAYMENT_FAILED};
    use serde_json::json;

    fn mailer(provider: MockEmailProvider) -> Mailer<MockEmailProvider> {
        Mailer::new(provider, TemplateEngine::new().unwrap())
    }

    #[tokio::test]
    async fn test_send_template_delivers_rendered_email() {
        let provider = MockEmailProvider::new();
        let mailer = mailer(provider.clone());

        mailer
            .send_template(
                "ada@example.com",
                BOOKING_CONFIRMED,
                &json!({"event_title": "RustConf", "quantity": 1, "reference": "bk_1"}),
            )
            .await
            .unwrap();

        let sent = provider.sent_emails().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "You're booked for RustConf");
        assert_eq!(sent[0].priority, EmailPriority::High);
        assert!(sent[0].body_html.is_some());
    }

    #[tokio::test]
    async fn test_unknown_template_is_template_error() {
        let mailer = mailer(MockEmailProvider::new());

        let err = mailer
            .send_template("ada@example.com", "nope", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::Template(_)));
    }

    #[tokio::test]
    async fn test_empty_recipient_is_rejected() {
        let provider = MockEmailProvider::new();
        let mailer = mailer(provider.clone());

        let err = mailer
            .send_template(" ", PAYMENT_FAILED, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::InvalidInput(_)));
        assert_eq!(provider.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_provider_failure_surfaces() {
        let mailer = mailer(MockEmailProvider::failing("quota exceeded"));

        let err = mailer
            .send_template(
                "ada@example.com",
                PAYMENT_FAILED,
                &json!({"event_title": "x", "reason": "declined", "reference": "bk_2"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::Provider(msg) if msg.contains("quota")));
    }
}
