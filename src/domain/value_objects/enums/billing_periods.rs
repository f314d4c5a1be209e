use std::fmt::Display;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Billing cadence of a subscription. Anything that is not "year" bills
/// monthly, so Month is the fallback for unknown inbound values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    #[default]
    Month,
    Year,
}

impl BillingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingPeriod::Month => "month",
            BillingPeriod::Year => "year",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "month" => Some(BillingPeriod::Month),
            "year" => Some(BillingPeriod::Year),
            _ => None,
        }
    }

    /// Year plans run 366 days, everything else 31.
    pub fn period_days(&self) -> i64 {
        match self {
            BillingPeriod::Month => 31,
            BillingPeriod::Year => 366,
        }
    }

    pub fn expiry_from(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        from + Duration::days(self.period_days())
    }
}

impl Display for BillingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
