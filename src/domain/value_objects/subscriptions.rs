use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::billing_periods::BillingPeriod;
use crate::domain::value_objects::plans::NewPlanModel;
use crate::domain::value_objects::references::EntityRef;

/// A subscription embedded in an account document. Records are never removed:
/// stopping sets `date_stopped`, expiry is derived from `date_expires` at
/// read time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub billing: BillingPeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_expires: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_stopped: Option<DateTime<Utc>>,
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Subscription {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.date_stopped.is_none() && self.date_expires.is_some_and(|at| at > now)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionModel {
    pub plan: EntityRef<NewPlanModel>,
    pub billing: Option<String>,
    pub token: Option<String>,
}

/// Shallow-merge patch for a subscription. Metadata merges key by key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSubscriptionModel {
    pub plan_id: Option<Uuid>,
    pub billing: Option<String>,
    pub date_expires: Option<DateTime<Utc>>,
    pub date_stopped: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl UpdateSubscriptionModel {
    pub fn merge_into(&self, subscription: &mut Subscription) {
        if let Some(plan_id) = self.plan_id {
            subscription.plan_id = plan_id;
        }
        if let Some(billing) = self.billing.as_deref() {
            subscription.billing = BillingPeriod::from_str(billing).unwrap_or_default();
        }
        if let Some(date_expires) = self.date_expires {
            subscription.date_expires = Some(date_expires);
        }
        if let Some(date_stopped) = self.date_stopped {
            subscription.date_stopped = Some(date_stopped);
        }
        for (key, value) in &self.metadata {
            subscription
                .metadata
                .insert(key.clone(), value.clone());
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StoppedSubscriptionsDto {
    pub stopped: usize,
    pub message: String,
}

impl StoppedSubscriptionsDto {
    pub fn new(stopped: usize) -> Self {
        Self {
            stopped,
            message: format!("Stopped {} subscriptions", stopped),
        }
    }
}

/// Best-effort acknowledgement body for the provider webhook. Always paired
/// with HTTP 200 so the receiver leaks nothing about account existence.
#[derive(Debug, Serialize)]
pub struct WebhookAckDto {
    pub message: String,
}
