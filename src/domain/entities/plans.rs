use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::plans;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanEntity {
    pub id: Uuid,
    pub reference: String,
    pub name: Option<String>,
    pub price_minor: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = plans)]
pub struct InsertPlanEntity {
    pub reference: String,
    pub name: Option<String>,
    pub price_minor: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = plans)]
pub struct EditPlanEntity {
    pub name: Option<String>,
    pub price_minor: Option<i32>,
    pub is_active: Option<bool>,
}
