use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::users::{EditUserEntity, InsertUserEntity, UserEntity};

#[async_trait]
#[automock]
pub trait UserRepository {
    async fn list(&self) -> Result<Vec<UserEntity>>;
    async fn find_by_reference(&self, reference: &str) -> Result<Option<UserEntity>>;
    async fn create(&self, new_user: InsertUserEntity) -> Result<UserEntity>;
    async fn update_by_reference(
        &self,
        reference: &str,
        changes: EditUserEntity,
    ) -> Result<Option<UserEntity>>;
    async fn delete_by_reference(&self, reference: &str) -> Result<bool>;
}
