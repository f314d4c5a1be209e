use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use diesel::sql_types::Text;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use uuid::Uuid;

use crate::domain::entities::accounts::{AccountEntity, AccountRow, EditAccountRow, InsertAccountRow};
use crate::domain::repositories::accounts::AccountRepository;
use crate::domain::value_objects::accounts::{NewAccountModel, UpdateAccountModel};
use crate::infrastructure::postgres::{postgres_connection::PgPoolSquad, schema::accounts};

pub struct AccountPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl AccountPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AccountRepository for AccountPostgres {
    async fn list(&self) -> Result<Vec<AccountEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = accounts::table
            .order(accounts::created_at.asc())
            .select(AccountRow::as_select())
            .load::<AccountRow>(&mut conn)?;

        Ok(rows.into_iter().map(AccountEntity::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = accounts::table
            .find(id)
            .select(AccountRow::as_select())
            .first::<AccountRow>(&mut conn)
            .optional()?;

        Ok(row.map(AccountEntity::from))
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<AccountEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = accounts::table
            .filter(accounts::reference.eq(reference))
            .select(AccountRow::as_select())
            .first::<AccountRow>(&mut conn)
            .optional()?;

        Ok(row.map(AccountEntity::from))
    }

    async fn find_by_metadata(&self, key: &str, value: &str) -> Result<Option<AccountEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = diesel::sql_query(
            "SELECT * FROM accounts WHERE metadata ->> $1 = $2 LIMIT 1",
        )
        .bind::<Text, _>(key)
        .bind::<Text, _>(value)
        .get_result::<AccountRow>(&mut conn)
        .optional()?;

        Ok(row.map(AccountEntity::from))
    }

    async fn create(&self, new_account: NewAccountModel) -> Result<AccountEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let insert_row = InsertAccountRow {
            reference: new_account.reference,
            name: new_account.name,
            metadata: serde_json::to_value(new_account.metadata)?,
            subscriptions: serde_json::Value::Array(Vec::new()),
        };

        let row = insert_into(accounts::table)
            .values(&insert_row)
            .returning(AccountRow::as_returning())
            .get_result::<AccountRow>(&mut conn)?;

        Ok(row.into())
    }

    async fn save(&self, account: &AccountEntity) -> Result<Option<AccountEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        // Compare-and-swap on the version column; zero rows means a
        // concurrent writer bumped the version first.
        let row = update(
            accounts::table
                .filter(accounts::id.eq(account.id))
                .filter(accounts::version.eq(account.version)),
        )
        .set((
            accounts::name.eq(account.name.clone()),
            accounts::metadata.eq(serde_json::to_value(&account.metadata)?),
            accounts::subscriptions.eq(serde_json::to_value(&account.subscriptions)?),
            accounts::version.eq(account.version + 1),
        ))
        .returning(AccountRow::as_returning())
        .get_result::<AccountRow>(&mut conn)
        .optional()?;

        Ok(row.map(AccountEntity::from))
    }

    async fn update_by_reference(
        &self,
        reference: &str,
        changes: UpdateAccountModel,
    ) -> Result<Option<AccountEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let edit_row = EditAccountRow {
            name: changes.name,
            metadata: changes.metadata.map(serde_json::to_value).transpose()?,
        };

        let row = update(accounts::table.filter(accounts::reference.eq(reference)))
            .set(&edit_row)
            .returning(AccountRow::as_returning())
            .get_result::<AccountRow>(&mut conn)
            .optional()?;

        Ok(row.map(AccountEntity::from))
    }

    async fn delete_by_reference(&self, reference: &str) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deleted =
            diesel::delete(accounts::table.filter(accounts::reference.eq(reference)))
                .execute(&mut conn)?;

        Ok(deleted > 0)
    }
}
