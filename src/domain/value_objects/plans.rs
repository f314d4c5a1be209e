use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::plans::PlanEntity;

/// Inline plan payload: creating one through a reference field is not
/// idempotent, a retried request creates a duplicate plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlanModel {
    pub reference: String,
    pub name: Option<String>,
    pub price_minor: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlanModel {
    pub name: Option<String>,
    pub price_minor: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PlanDto {
    pub id: Uuid,
    pub reference: String,
    pub name: Option<String>,
    pub price_minor: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PlanEntity> for PlanDto {
    fn from(value: PlanEntity) -> Self {
        Self {
            id: value.id,
            reference: value.reference,
            name: value.name,
            price_minor: value.price_minor,
            is_active: value.is_active,
            created_at: value.created_at,
        }
    }
}
