use crate::payments::PaymentProviderKind;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub subscriptions: SubscriptionsPolicy,
    pub payments: Payments,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

/// Business policy injected into the subscription lifecycle engine at
/// construction time. When `allow_multiple` is off, creating a subscription
/// stops every other subscription on the account.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionsPolicy {
    pub allow_multiple: bool,
}

#[derive(Debug, Clone)]
pub struct Payments {
    pub provider: PaymentProviderKind,
    pub stripe: StripeSecrets,
}

#[derive(Debug, Clone)]
pub struct StripeSecrets {
    pub secret_key: String,
    pub webhook_secret: String,
}
