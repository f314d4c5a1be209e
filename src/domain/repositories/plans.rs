use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::plans::PlanEntity;
use crate::domain::value_objects::plans::{NewPlanModel, UpdatePlanModel};

#[async_trait]
#[automock]
pub trait PlanRepository {
    async fn list(&self) -> Result<Vec<PlanEntity>>;
    async fn find_by_reference(&self, reference: &str) -> Result<Option<PlanEntity>>;
    /// Set-membership lookup; result order is whatever the store returns.
    async fn find_by_references(&self, references: &[String]) -> Result<Vec<PlanEntity>>;
    async fn create(&self, new_plan: NewPlanModel) -> Result<PlanEntity>;
    async fn update_by_reference(
        &self,
        reference: &str,
        changes: UpdatePlanModel,
    ) -> Result<Option<PlanEntity>>;
    async fn delete_by_reference(&self, reference: &str) -> Result<bool>;
}
