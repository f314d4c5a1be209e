use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::users;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users)]
pub struct UserEntity {
    pub id: Uuid,
    pub reference: String,
    /// Link to the owning account. May legitimately be absent for users that
    /// have not been attached to an account yet.
    pub account_id: Option<Uuid>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct InsertUserEntity {
    pub reference: String,
    pub account_id: Option<Uuid>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct EditUserEntity {
    pub account_id: Option<Uuid>,
    pub email: Option<String>,
}
