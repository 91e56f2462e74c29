use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_bookings::{
    BookingNotifier, BookingService, BookingSettings, EmailNotifier, GatewayConfig,
    HttpPaymentGateway, MockPaymentGateway, NoopNotifier, PaymentGateway, PgBookingRepository,
    PgEventStore,
};
use email::{Mailer, SendGridProvider, TemplateEngine};
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    // Load configuration from environment variables
    let config = Config::from_env()?;

    // Initialize tracing with ErrorLayer for span trace capture
    init_tracing(&config.environment);

    let db = database::postgres::connect_with_retry(config.database.clone(), config.retry.clone())
        .await
        .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

    database::postgres::run_migrations::<migration::Migrator>(&db, config.app.name).await?;

    let gateway: Arc<dyn PaymentGateway> = match &config.payment.secret_key {
        Some(secret_key) => {
            info!(base_url = %config.payment.base_url, "Using HTTP payment gateway");
            let gateway_config = GatewayConfig::new(secret_key.clone())
                .with_base_url(config.payment.base_url.clone())
                .with_timeout(config.payment.timeout);
            Arc::new(
                HttpPaymentGateway::new(gateway_config)
                    .map_err(|e| eyre::eyre!("Failed to initialize payment gateway: {}", e))?,
            )
        }
        None => {
            warn!("PAYMENT_SECRET_KEY not set; using the in-process mock gateway");
            Arc::new(MockPaymentGateway::new())
        }
    };

    let notifier: Arc<dyn BookingNotifier> = match &config.email {
        Some(email) => {
            info!(from = %email.from_address, "Booking emails go through SendGrid");
            let provider = SendGridProvider::new(
                email.api_key.clone(),
                email.from_address.clone(),
                email.from_name.clone(),
            );
            Arc::new(EmailNotifier::new(Mailer::new(provider, TemplateEngine::new()?)))
        }
        None => {
            warn!("SendGrid not configured; booking emails are disabled");
            Arc::new(NoopNotifier)
        }
    };

    let events = Arc::new(PgEventStore::new(db.clone()));
    let bookings = BookingService::new(
        Arc::new(PgBookingRepository::new(db.clone())),
        events.clone(),
        events,
        gateway,
        notifier,
        BookingSettings {
            currency: config.payment.currency.clone(),
            callback_url: config.payment.callback_url.clone(),
        },
    );

    let jwt_auth = axum_helpers::JwtAuth::new(&config.jwt);

    let state = AppState {
        config,
        db,
        bookings,
        jwt_auth,
    };

    // Build router with API routes (pass reference, not ownership!)
    let api_routes = api::routes(&state);

    // create_router adds docs/middleware to our composed routes
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes, &state.config.server)?;

    // - /health: liveness check with app name/version
    // - /ready: readiness check that pings the database
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()));

    info!("Starting booking API");

    let server_config = state.config.server.clone();
    create_production_app(app, &server_config, async move {
        info!("Shutting down: closing database connections");
        match state.db.close().await {
            Ok(_) => info!("PostgreSQL connection closed successfully"),
            Err(e) => tracing::error!("Error closing PostgreSQL: {}", e),
        }
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Booking API shutdown complete");
    Ok(())
}
