//! Paydesk server entry point.
//!
//! Wires configuration, the PostgreSQL stores, the Stripe bridge, and the
//! webhook pipeline into the axum router. All shared state is constructed
//! once here and injected explicitly; nothing reads configuration after
//! startup.

use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use chrono::Duration as ChronoDuration;
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paydesk::adapters::http::{api_router, AppState, PaymentSettings};
use paydesk::adapters::postgres::{PostgresLedger, PostgresPaymentLinkStore};
use paydesk::adapters::stripe::{StripeCheckoutBridge, StripeConfig};
use paydesk::application::handlers::HandleWebhookHandler;
use paydesk::config::AppConfig;
use paydesk::domain::webhooks::{EventDispatcher, WebhookVerifier};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    if config.payment.is_live_mode() && !config.is_production() {
        tracing::warn!("live Stripe key configured outside production");
    }

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        tracing::info!("running database migrations");
        sqlx::migrate!().run(&pool).await?;
    }

    let links = Arc::new(PostgresPaymentLinkStore::new(
        pool.clone(),
        ChronoDuration::hours(config.payment.link_ttl_hours),
    ));
    let ledger = Arc::new(PostgresLedger::new(pool));
    let bridge = Arc::new(StripeCheckoutBridge::new(StripeConfig::new(
        SecretString::new(config.payment.stripe_api_key.expose_secret().clone()),
    )));

    let verifier = Arc::new(WebhookVerifier::new(SecretString::new(
        config.payment.stripe_webhook_secret.expose_secret().clone(),
    )));
    let dispatcher = Arc::new(EventDispatcher::new(ledger.clone(), bridge.clone()));
    let webhook = Arc::new(HandleWebhookHandler::new(verifier, dispatcher));

    let state = AppState {
        links,
        ledger_reader: ledger,
        bridge,
        webhook,
        settings: PaymentSettings {
            frontend_base_url: config.payment.frontend_base_url.clone(),
            one_time_amount_minor: config.payment.one_time_amount_minor,
            currency: config.payment.currency.clone(),
            subscription_price_id: config.payment.subscription_price_id.clone(),
        },
    };

    let app = api_router().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&config))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            ))),
    );

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, test_mode = config.payment.is_test_mode(), "paydesk listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = config.server.cors_origins_list();
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
