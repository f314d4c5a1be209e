use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use tracing::error;

use crate::config::config_model::StripeSecrets;
use crate::domain::entities::accounts::AccountEntity;
use crate::domain::value_objects::enums::billing_periods::BillingPeriod;
use crate::payments::{
    ExtendEvent, PROVIDER_CUSTOMER_KEY, PaymentDetails, ProviderError, ProviderSubscription,
    SubscriptionRequest,
};

type HmacSha256 = Hmac<Sha256>;

/// Minimal Stripe client built on reqwest.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(rename = "type")]
    pub type_: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StripeInvoiceObject {
    customer: Option<String>,
    subscription: Option<String>,
    #[serde(default)]
    lines: StripeInvoiceLines,
}

#[derive(Debug, Default, Deserialize)]
struct StripeInvoiceLines {
    #[serde(default)]
    data: Vec<StripeInvoiceLine>,
}

#[derive(Debug, Deserialize)]
struct StripeInvoiceLine {
    plan: Option<StripePlanRef>,
}

#[derive(Debug, Deserialize)]
struct StripePlanRef {
    interval: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

impl StripeClient {
    pub fn new(secrets: &StripeSecrets) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secrets.secret_key.clone(),
            webhook_secret: secrets.webhook_secret.clone(),
        }
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = resp
            .text()
            .await
            .unwrap_or_else(|err| format!("<failed to read response body: {err}>"));

        let details = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_error_type = ?details.as_ref().and_then(|d| d.type_.as_deref()),
            stripe_error_code = ?details.as_ref().and_then(|d| d.code.as_deref()),
            response_body = %body,
            context = %context,
            "stripe api request failed"
        );

        Err(ProviderError {
            status: Some(status.as_u16()),
            message: details
                .and_then(|d| d.message)
                .unwrap_or_else(|| format!("Stripe API request failed: {context}")),
        })
    }

    /// Creates a Stripe customer carrying the card token as default source.
    async fn create_customer(
        &self,
        user_reference: Option<&str>,
        token: Option<&str>,
    ) -> Result<String, ProviderError> {
        // https://stripe.com/docs/api/customers/create
        let mut body: Vec<(String, String)> = Vec::new();
        if let Some(token) = token {
            body.push(("source".to_string(), token.to_string()));
        }
        if let Some(user_reference) = user_reference {
            body.push((
                "metadata[user_reference]".to_string(),
                user_reference.to_string(),
            ));
        }

        let resp = self
            .http
            .post("https://api.stripe.com/v1/customers")
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create customer").await?;

        #[derive(Deserialize)]
        struct CustomerResp {
            id: String,
        }

        let parsed: CustomerResp = resp.json().await?;
        Ok(parsed.id)
    }

    /// Sets up a provider subscription for the account, reusing the customer
    /// already recorded on the account metadata when there is one.
    pub async fn create_subscription(
        &self,
        user_reference: Option<&str>,
        account: &AccountEntity,
        request: &SubscriptionRequest,
        payment: &PaymentDetails,
    ) -> Result<ProviderSubscription, ProviderError> {
        let customer_id = match account.metadata.get(PROVIDER_CUSTOMER_KEY) {
            Some(existing) => existing.clone(),
            None => {
                self.create_customer(user_reference, payment.token.as_deref())
                    .await?
            }
        };

        // https://stripe.com/docs/api/subscriptions/create
        let mut body: Vec<(String, String)> = vec![
            ("customer".to_string(), customer_id.clone()),
            (
                "metadata[account_reference]".to_string(),
                account.reference.clone(),
            ),
            ("metadata[billing]".to_string(), request.billing.to_string()),
        ];
        if let Some(plan_reference) = request.plan_reference.as_deref() {
            body.push(("items[0][price]".to_string(), plan_reference.to_string()));
        }

        let resp = self
            .http
            .post("https://api.stripe.com/v1/subscriptions")
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create subscription").await?;

        #[derive(Deserialize)]
        struct SubscriptionResp {
            id: String,
        }

        let parsed: SubscriptionResp = resp.json().await?;
        Ok(ProviderSubscription {
            customer_id,
            subscription_id: parsed.id,
        })
    }

    /// Verifies the webhook signature. https://stripe.com/docs/webhooks/signatures
    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent, ProviderError> {
        let mut timestamp: Option<String> = None;
        let mut signature: Option<String> = None;

        for part in signature_header.split(',') {
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest.to_string());
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signature = Some(rest.to_string());
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| ProviderError::new("missing timestamp in stripe-signature"))?;
        let signature =
            signature.ok_or_else(|| ProviderError::new("missing v1 in stripe-signature"))?;

        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|err| ProviderError::new(format!("invalid webhook secret: {err}")))?;
        mac.update(signed_payload.as_bytes());
        let expected = mac.finalize().into_bytes();
        let provided = hex::decode(&signature)
            .map_err(|err| ProviderError::new(format!("malformed signature: {err}")))?;

        if expected[..] != provided[..] {
            return Err(ProviderError::new("invalid webhook signature"));
        }

        let event: StripeEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }

    /// Maps a verified renewal notification to an [`ExtendEvent`]. Only
    /// `invoice.payment_succeeded` extends a subscription.
    pub fn parse_extend_event(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<ExtendEvent, ProviderError> {
        let signature_header = signature_header
            .ok_or_else(|| ProviderError::new("missing stripe-signature header"))?;
        let event = self.verify_webhook_signature(payload, signature_header)?;

        if event.type_ != "invoice.payment_succeeded" {
            return Err(ProviderError::new(format!(
                "unhandled stripe event type: {}",
                event.type_
            )));
        }

        let invoice: StripeInvoiceObject = serde_json::from_value(event.data.object)?;
        let customer_id = invoice
            .customer
            .ok_or_else(|| ProviderError::new("invoice missing customer id"))?;
        let subscription_id = invoice
            .subscription
            .ok_or_else(|| ProviderError::new("invoice missing subscription id"))?;
        let period = invoice
            .lines
            .data
            .first()
            .and_then(|line| line.plan.as_ref())
            .and_then(|plan| plan.interval.as_deref())
            .and_then(BillingPeriod::from_str)
            .unwrap_or_default();

        Ok(ExtendEvent {
            customer_id,
            subscription_id,
            period,
        })
    }
}
