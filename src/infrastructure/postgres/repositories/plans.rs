use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};

use crate::domain::entities::plans::{EditPlanEntity, InsertPlanEntity, PlanEntity};
use crate::domain::repositories::plans::PlanRepository;
use crate::domain::value_objects::plans::{NewPlanModel, UpdatePlanModel};
use crate::infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::plans};

pub struct PlanPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PlanPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl PlanRepository for PlanPostgres {
    async fn list(&self) -> Result<Vec<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = plans::table
            .order(plans::created_at.asc())
            .select(PlanEntity::as_select())
            .load::<PlanEntity>(&mut conn)?;

        Ok(results)
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = plans::table
            .filter(plans::reference.eq(reference))
            .select(PlanEntity::as_select())
            .first::<PlanEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_references(&self, references: &[String]) -> Result<Vec<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = plans::table
            .filter(plans::reference.eq_any(references))
            .select(PlanEntity::as_select())
            .load::<PlanEntity>(&mut conn)?;

        Ok(results)
    }

    async fn create(&self, new_plan: NewPlanModel) -> Result<PlanEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let insert_entity = InsertPlanEntity {
            reference: new_plan.reference,
            name: new_plan.name,
            price_minor: new_plan.price_minor.unwrap_or(0),
            is_active: new_plan.is_active.unwrap_or(true),
        };

        let result = insert_into(plans::table)
            .values(&insert_entity)
            .returning(PlanEntity::as_returning())
            .get_result::<PlanEntity>(&mut conn)?;

        Ok(result)
    }

    async fn update_by_reference(
        &self,
        reference: &str,
        changes: UpdatePlanModel,
    ) -> Result<Option<PlanEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let edit_entity = EditPlanEntity {
            name: changes.name,
            price_minor: changes.price_minor,
            is_active: changes.is_active,
        };

        let result = update(plans::table.filter(plans::reference.eq(reference)))
            .set(&edit_entity)
            .returning(PlanEntity::as_returning())
            .get_result::<PlanEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn delete_by_reference(&self, reference: &str) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted = diesel::delete(plans::table.filter(plans::reference.eq(reference)))
            .execute(&mut conn)?;

        Ok(deleted > 0)
    }
}
