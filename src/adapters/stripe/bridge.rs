//! Stripe implementation of the Checkout Bridge port.
//!
//! Talks to the Stripe REST API with form-encoded requests and basic auth.
//! Every request carries a bounded timeout; failures surface as
//! `BridgeError` without touching local state.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::ports::{
    BridgeError, BridgeSubscription, CheckoutBridge, CheckoutSession,
    CreateCheckoutSessionRequest, PaymentIntent, PortalSession,
};

/// Default timeout for Stripe API requests.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the Stripe API.
    api_base_url: String,

    /// Per-request timeout.
    request_timeout: Duration,
}

impl StripeConfig {
    /// Creates a new Stripe configuration.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: "https://api.stripe.com".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets a custom API base URL (for testing against a stub server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Sets a custom request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Stripe-backed Checkout Bridge.
pub struct StripeCheckoutBridge {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeCheckoutBridge {
    /// Creates a new bridge with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .expect("reqwest client configuration is valid");
        Self {
            config,
            http_client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<T, BridgeError> {
        let response = self
            .http_client
            .post(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))?;

        Self::parse_response(path, response).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, BridgeError> {
        let response = self
            .http_client
            .get(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| BridgeError::Network(e.to_string()))?;

        Self::parse_response(path, response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, BridgeError> {
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(BridgeError::NotFound(path.to_string()));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(path, status = status.as_u16(), error = %error_text, "Stripe API call failed");
            return Err(BridgeError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        response
            .json()
            .await
            .map_err(|e| BridgeError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CheckoutBridge for StripeCheckoutBridge {
    async fn create_payment_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, BridgeError> {
        let mut params = vec![
            ("amount".to_string(), amount_minor.to_string()),
            ("currency".to_string(), currency.to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        for (key, value) in metadata {
            params.push((format!("metadata[{}]", key), value));
        }

        self.post_form("/v1/payment_intents", &params).await
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutSessionRequest,
    ) -> Result<CheckoutSession, BridgeError> {
        let params = vec![
            ("mode".to_string(), request.mode.as_str().to_string()),
            (
                "customer_email".to_string(),
                request.customer_email.into_string(),
            ),
            ("line_items[0][price]".to_string(), request.price_id),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), request.success_url),
            ("cancel_url".to_string(), request.cancel_url),
        ];

        self.post_form("/v1/checkout/sessions", &params).await
    }

    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<BridgeSubscription, BridgeError> {
        self.get(&format!("/v1/subscriptions/{}", subscription_id))
            .await
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        cancel_at_period_end: bool,
    ) -> Result<BridgeSubscription, BridgeError> {
        let params = vec![(
            "cancel_at_period_end".to_string(),
            cancel_at_period_end.to_string(),
        )];

        self.post_form(&format!("/v1/subscriptions/{}", subscription_id), &params)
            .await
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, BridgeError> {
        let params = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];

        self.post_form("/v1/billing_portal/sessions", &params).await
    }
}
