use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::value_objects::subscriptions::Subscription;
use crate::infrastructure::postgres::schema::accounts;

/// Raw row used for Diesel queries. Metadata and subscriptions stay as JSON
/// and are parsed into their typed forms on the entity.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable, QueryableByName)]
#[diesel(table_name = accounts)]
pub struct AccountRow {
    pub id: Uuid,
    pub reference: String,
    pub name: Option<String>,
    pub metadata: serde_json::Value,
    pub subscriptions: serde_json::Value,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

/// An account document: the unit of consistency for subscription edits.
/// Subscriptions keep insertion order, which is the historical order.
#[derive(Debug, Clone)]
pub struct AccountEntity {
    pub id: Uuid,
    pub reference: String,
    pub name: Option<String>,
    pub metadata: HashMap<String, String>,
    pub subscriptions: Vec<Subscription>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl From<AccountRow> for AccountEntity {
    fn from(value: AccountRow) -> Self {
        let metadata = serde_json::from_value(value.metadata).unwrap_or_default();
        let subscriptions = serde_json::from_value(value.subscriptions).unwrap_or_default();

        Self {
            id: value.id,
            reference: value.reference,
            name: value.name,
            metadata,
            subscriptions,
            version: value.version,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
pub struct InsertAccountRow {
    pub reference: String,
    pub name: Option<String>,
    pub metadata: serde_json::Value,
    pub subscriptions: serde_json::Value,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = accounts)]
pub struct EditAccountRow {
    pub name: Option<String>,
    pub metadata: Option<serde_json::Value>,
}
