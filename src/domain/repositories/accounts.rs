use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::accounts::AccountEntity;
use crate::domain::value_objects::accounts::{NewAccountModel, UpdateAccountModel};

#[async_trait]
#[automock]
pub trait AccountRepository {
    async fn list(&self) -> Result<Vec<AccountEntity>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountEntity>>;
    async fn find_by_reference(&self, reference: &str) -> Result<Option<AccountEntity>>;
    /// Equality lookup on one metadata key, used to map provider correlation
    /// ids back to an account.
    async fn find_by_metadata(&self, key: &str, value: &str) -> Result<Option<AccountEntity>>;
    async fn create(&self, new_account: NewAccountModel) -> Result<AccountEntity>;
    /// Whole-document save guarded by the version counter. Returns None when
    /// the stored version no longer matches, i.e. a concurrent writer won.
    async fn save(&self, account: &AccountEntity) -> Result<Option<AccountEntity>>;
    async fn update_by_reference(
        &self,
        reference: &str,
        changes: UpdateAccountModel,
    ) -> Result<Option<AccountEntity>>;
    async fn delete_by_reference(&self, reference: &str) -> Result<bool>;
}
