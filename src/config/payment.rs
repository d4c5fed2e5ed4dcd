//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment configuration (Stripe + link policy)
#[derive(Debug, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    pub stripe_api_key: SecretString,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: SecretString,

    /// Stripe price ID for the subscription plan
    pub subscription_price_id: String,

    /// Base URL issued payment links point at
    pub frontend_base_url: String,

    /// One-time payment amount in minor currency units
    #[serde(default = "default_amount_minor")]
    pub one_time_amount_minor: i64,

    /// Currency for one-time payments
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Payment link lifetime in hours
    #[serde(default = "default_link_ttl_hours")]
    pub link_ttl_hours: i64,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_live_")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }
        if self.subscription_price_id.is_empty() {
            return Err(ValidationError::MissingRequired("SUBSCRIPTION_PRICE_ID"));
        }

        // Verify key prefixes for safety
        if !self.stripe_api_key.expose_secret().starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.expose_secret().starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        if !self.frontend_base_url.starts_with("http://")
            && !self.frontend_base_url.starts_with("https://")
        {
            return Err(ValidationError::InvalidFrontendUrl);
        }
        if self.one_time_amount_minor <= 0 {
            return Err(ValidationError::InvalidAmount);
        }
        if self.link_ttl_hours <= 0 {
            return Err(ValidationError::InvalidLinkTtl);
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: SecretString::new(String::new()),
            stripe_webhook_secret: SecretString::new(String::new()),
            subscription_price_id: String::new(),
            frontend_base_url: String::new(),
            one_time_amount_minor: default_amount_minor(),
            currency: default_currency(),
            link_ttl_hours: default_link_ttl_hours(),
        }
    }
}

impl Clone for PaymentConfig {
    fn clone(&self) -> Self {
        Self {
            stripe_api_key: SecretString::new(self.stripe_api_key.expose_secret().clone()),
            stripe_webhook_secret: SecretString::new(
                self.stripe_webhook_secret.expose_secret().clone(),
            ),
            subscription_price_id: self.subscription_price_id.clone(),
            frontend_base_url: self.frontend_base_url.clone(),
            one_time_amount_minor: self.one_time_amount_minor,
            currency: self.currency.clone(),
            link_ttl_hours: self.link_ttl_hours,
        }
    }
}

fn default_amount_minor() -> i64 {
    200
}

fn default_currency() -> String {
    "pln".to_string()
}

fn default_link_ttl_hours() -> i64 {
    24
}
