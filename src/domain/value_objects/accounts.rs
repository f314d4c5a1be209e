use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::accounts::AccountEntity;
use crate::domain::value_objects::subscriptions::Subscription;

#[derive(Debug, Clone, Deserialize)]
pub struct NewAccountModel {
    pub reference: String,
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAccountModel {
    pub name: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
pub struct AccountDto {
    pub id: Uuid,
    pub reference: String,
    pub name: Option<String>,
    pub metadata: HashMap<String, String>,
    pub subscriptions: Vec<Subscription>,
    pub created_at: DateTime<Utc>,
}

impl From<AccountEntity> for AccountDto {
    fn from(value: AccountEntity) -> Self {
        Self {
            id: value.id,
            reference: value.reference,
            name: value.name,
            metadata: value.metadata,
            subscriptions: value.subscriptions,
            created_at: value.created_at,
        }
    }
}
