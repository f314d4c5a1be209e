use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::users::UserEntity;
use crate::domain::value_objects::accounts::NewAccountModel;
use crate::domain::value_objects::references::EntityRef;

/// The `account` field takes a reference string or an inline account payload,
/// resolved to a storage identifier before the user row is written.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUserModel {
    pub reference: String,
    pub email: Option<String>,
    pub account: Option<EntityRef<NewAccountModel>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserModel {
    pub email: Option<String>,
    pub account: Option<EntityRef<NewAccountModel>>,
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub reference: String,
    pub account_id: Option<Uuid>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserEntity> for UserDto {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id,
            reference: value.reference,
            account_id: value.account_id,
            email: value.email,
            created_at: value.created_at,
        }
    }
}
