//! Transactional email for booking notifications.
//!
//! ## Components
//!
//! - **Email Models**: `Email`, `EmailPriority`
//! - **Providers**: SendGrid over HTTP and an in-memory mock for tests
//! - **Templates**: Handlebars-based `TemplateEngine` preloaded with the
//!   booking templates
//! - **Mailer**: renders a named template and hands it to a provider
//!
//! ```ignore
//! use email::{Mailer, SendGridProvider, TemplateEngine, templates::BOOKING_CONFIRMED};
//!
//! let mailer = Mailer::new(SendGridProvider::from_env()?, TemplateEngine::new()?);
//! mailer
//!     .send_template("ada@example.com", BOOKING_CONFIRMED, &json!({"event_title": "RustConf"}))
//!     .await?;
//! ```

pub mod error;
pub mod mailer;
pub mod models;
pub mod provider;
pub mod templates;

pub use error::{NotificationError, NotificationResult};
pub use mailer::Mailer;
pub use models::{Email, EmailPriority};
pub use provider::{EmailProvider, MockEmailProvider, SendGridProvider, SendResult};
pub use templates::{EmailTemplate, RenderedTemplate, TemplateEngine};
