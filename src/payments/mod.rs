pub mod stripe_client;

use std::fmt::Display;

use thiserror::Error;

use crate::domain::value_objects::enums::billing_periods::BillingPeriod;

/// Account metadata key holding the provider customer id.
pub const PROVIDER_CUSTOMER_KEY: &str = "provider_customer";
/// Subscription metadata key holding the provider subscription id.
pub const PROVIDER_SUBSCRIPTION_KEY: &str = "provider_subscription";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProviderKind {
    Stripe,
}

impl PaymentProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProviderKind::Stripe => "stripe",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "stripe" => Some(PaymentProviderKind::Stripe),
            _ => None,
        }
    }
}

impl Display for PaymentProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a payment provider. The HTTP status is kept when the
/// provider supplied one so it can be passed through to the caller.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(value: reqwest::Error) -> Self {
        Self {
            status: value.status().map(|status| status.as_u16()),
            message: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(value: serde_json::Error) -> Self {
        Self {
            status: None,
            message: value.to_string(),
        }
    }
}

/// Correlation ids handed back by the provider when a subscription is set up.
#[derive(Debug, Clone)]
pub struct ProviderSubscription {
    pub customer_id: String,
    pub subscription_id: String,
}

#[derive(Debug, Clone)]
pub struct SubscriptionRequest {
    pub plan_reference: Option<String>,
    pub billing: BillingPeriod,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentDetails {
    pub token: Option<String>,
}

/// A verified provider renewal notification mapped to lifecycle terms.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendEvent {
    pub customer_id: String,
    pub subscription_id: String,
    pub period: BillingPeriod,
}
