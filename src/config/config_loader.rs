use anyhow::{Result, anyhow};

use crate::payments::PaymentProviderKind;

use super::config_model::{
    Database, DotEnvyConfig, Payments, Server, StripeSecrets, SubscriptionsPolicy,
};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let subscriptions = SubscriptionsPolicy {
        allow_multiple: std::env::var("MULTIPLE_SUBSCRIPTIONS")
            .map(|value| value == "yes")
            .unwrap_or(false),
    };

    let provider_name =
        std::env::var("PAYMENT_PROVIDER").unwrap_or_else(|_| "stripe".to_string());
    let provider = PaymentProviderKind::from_str(&provider_name)
        .ok_or_else(|| anyhow!("unsupported payment provider: {}", provider_name))?;

    let stripe = StripeSecrets {
        secret_key: std::env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY is invalid"),
        webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
            .expect("STRIPE_WEBHOOK_SECRET is invalid"),
    };

    Ok(DotEnvyConfig {
        server,
        database,
        subscriptions,
        payments: Payments { provider, stripe },
    })
}
