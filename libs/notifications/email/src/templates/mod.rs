//! Email templates rendered with Handlebars.
//!
//! `TemplateEngine::new` registers the booking templates below. Extra
//! templates can be added with [`TemplateEngine::register`].

use eyre::{eyre, Result};
use handlebars::Handlebars;
use serde_json::Value;
use std::collections::HashMap;

/// Sent once a booking reaches `confirmed`.
pub const BOOKING_CONFIRMED: &str = "booking_confirmed";
/// Sent when a payment is declined, abandoned or arrives after sell-out.
pub const PAYMENT_FAILED: &str = "payment_failed";

#[derive(Debug, Clone)]
pub struct RenderedTemplate {
    pub subject: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
}

#[derive(Clone, Debug)]
pub struct EmailTemplate {
    pub name: String,
    pub subject: String,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
}

/// Handlebars-based template engine
///
/// Supports:
/// - Variables: `{{name}}`
/// - Conditionals: `{{#if condition}}...{{/if}}`
/// - HTML escaping: `{{{unescaped}}}` for raw HTML
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
    templates: HashMap<String, EmailTemplate>,
}

impl TemplateEngine {
    pub fn new() -> Result<Self> {
        let mut engine = Self {
            handlebars: Handlebars::new(),
            templates: HashMap::new(),
        };

        engine.register_defaults()?;

        Ok(engine)
    }

    pub fn register(&mut self, template: EmailTemplate) -> Result<()> {
        self.handlebars
            .register_template_string(&format!("{}_subject", template.name), &template.subject)
            .map_err(|e| eyre!("Failed to register subject template: {}", e))?;

        if let Some(text) = &template.body_text {
            self.handlebars
                .register_template_string(&format!("{}_text", template.name), text)
                .map_err(|e| eyre!("Failed to register text template: {}", e))?;
        }

        if let Some(html) = &template.body_html {
            self.handlebars
                .register_template_string(&format!("{}_html", template.name), html)
                .map_err(|e| eyre!("Failed to register HTML template: {}", e))?;
        }

        self.templates.insert(template.name.clone(), template);
        Ok(())
    }

    pub fn render(&self, name: &str, data: &Value) -> Result<RenderedTemplate> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| eyre!("Template not found: {}", name))?;

        let subject = self
            .handlebars
            .render(&format!("{}_subject", name), data)
            .map_err(|e| eyre!("Failed to render subject: {}", e))?;

        let body_text = template
            .body_text
            .as_ref()
            .map(|_| {
                self.handlebars
                    .render(&format!("{}_text", name), data)
                    .map_err(|e| eyre!("Failed to render text: {}", e))
            })
            .transpose()?;

        let body_html = template
            .body_html
            .as_ref()
            .map(|_| {
                self.handlebars
                    .render(&format!("{}_html", name), data)
                    .map_err(|e| eyre!("Failed to render HTML: {}", e))
            })
            .transpose()?;

        Ok(RenderedTemplate {
            subject,
            body_text,
            body_html,
        })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    fn register_defaults(&mut self) -> Result<()> {
        self.register(EmailTemplate {
            name: BOOKING_CONFIRMED.to_string(),
            subject: "You're booked for {{event_title}}".to_string(),
            body_text: Some(
                r#"Hello,

Your booking for {{event_title}} is confirmed.

Tickets: {{quantity}}
{{#if amount}}Amount paid: {{amount}} {{currency}}
{{/if}}Reference: {{reference}}

See you there!"#
                    .to_string(),
            ),
            body_html: Some(
                r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <h1 style="color: #2563eb;">You're booked!</h1>
    <p>Your booking for <strong>{{event_title}}</strong> is confirmed.</p>
    <table style="margin: 20px 0;">
        <tr><td>Tickets</td><td><strong>{{quantity}}</strong></td></tr>
        {{#if amount}}<tr><td>Amount paid</td><td><strong>{{amount}} {{currency}}</strong></td></tr>{{/if}}
        <tr><td>Reference</td><td><code>{{reference}}</code></td></tr>
    </table>
    <p>See you there!</p>
</body>
</html>"#
                    .to_string(),
            ),
        })?;

        self.register(EmailTemplate {
            name: PAYMENT_FAILED.to_string(),
            subject: "Your booking for {{event_title}} was not completed".to_string(),
            body_text: Some(
                r#"Hello,

We could not complete your booking for {{event_title}}.

Reason: {{reason}}
Reference: {{reference}}

{{#if refund_required}}Your payment was received after the event sold out. A refund will be issued to your original payment method.
{{/if}}You can try booking again while spots remain."#
                    .to_string(),
            ),
            body_html: Some(
                r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <h1 style="color: #dc2626;">Booking not completed</h1>
    <p>We could not complete your booking for <strong>{{event_title}}</strong>.</p>
    <p>Reason: {{reason}}<br>Reference: <code>{{reference}}</code></p>
    {{#if refund_required}}<p style="font-weight: bold;">Your payment was received after the event sold out. A refund will be issued to your original payment method.</p>{{/if}}
    <p style="color: #666; font-size: 14px;">You can try booking again while spots remain.</p>
</body>
</html>"#
                    .to_string(),
            ),
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_engine_registers_booking_templates() {
        let engine = TemplateEngine::new().unwrap();
        assert!(engine.has_template(BOOKING_CONFIRMED));
        assert!(engine.has_template(PAYMENT_FAILED));
        assert!(!engine.has_template("welcome"));
    }

    #[test]
    fn test_booking_confirmed_rendering() {
        let engine = TemplateEngine::new().unwrap();

        let data = serde_json::json!({
            "event_title": "RustConf",
            "quantity": 2,
            "amount": "1000.00",
            "currency": "NGN",
            "reference": "bk_abc"
        });

        let rendered = engine.render(BOOKING_CONFIRMED, &data).unwrap();

        assert_eq!(rendered.subject, "You're booked for RustConf");
        let text = rendered.body_text.unwrap();
        assert!(text.contains("Tickets: 2"));
        assert!(text.contains("Amount paid: 1000.00 NGN"));
        assert!(rendered.body_html.unwrap().contains("bk_abc"));
    }

    #[test]
    fn test_free_booking_omits_amount() {
        let engine = TemplateEngine::new().unwrap();
        let data = serde_json::json!({
            "event_title": "Meetup",
            "quantity": 1,
            "reference": "bk_free"
        });

        let text = engine.render(BOOKING_CONFIRMED, &data).unwrap().body_text.unwrap();
        assert!(!text.contains("Amount paid"));
    }

    #[test]
    fn test_payment_failed_mentions_refund_when_required() {
        let engine = TemplateEngine::new().unwrap();
        let data = serde_json::json!({
            "event_title": "RustConf",
            "reason": "sold out before payment confirmation; refund required",
            "reference": "bk_late",
            "refund_required": true
        });

        let rendered = engine.render(PAYMENT_FAILED, &data).unwrap();
        assert!(rendered.body_text.unwrap().contains("A refund will be issued"));
    }

    #[test]
    fn test_custom_template() {
        let mut engine = TemplateEngine::new().unwrap();

        engine
            .register(EmailTemplate {
                name: "custom".to_string(),
                subject: "Custom: {{title}}".to_string(),
                body_text: Some("{{content}}".to_string()),
                body_html: None,
            })
            .unwrap();

        let data = serde_json::json!({"title": "Test", "content": "Hello World"});
        let rendered = engine.render("custom", &data).unwrap();
        assert_eq!(rendered.subject, "Custom: Test");
        assert_eq!(rendered.body_text.unwrap(), "Hello World");
        assert!(rendered.body_html.is_none());
    }

    #[test]
    fn test_unknown_template_errors() {
        let engine = TemplateEngine::new().unwrap();
        assert!(engine.render("missing", &Value::Null).is_err());
    }
}
