use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::domain::entities::accounts::AccountEntity;
use crate::domain::repositories::accounts::AccountRepository;
use crate::domain::repositories::users::UserRepository;

/// How the caller names the target account: directly, or through the user
/// that owns it. Exactly one of the two is present on any route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSelector {
    ByAccountReference(String),
    ByUserReference(String),
}

impl AccountSelector {
    pub fn user_reference(&self) -> Option<&str> {
        match self {
            AccountSelector::ByUserReference(reference) => Some(reference),
            AccountSelector::ByAccountReference(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("account not found: {0}")]
    AccountNotFound(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("user has no linked account: {0}")]
    UserWithoutAccount(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl LookupError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LookupError::AccountNotFound(_)
            | LookupError::UserNotFound(_)
            | LookupError::UserWithoutAccount(_) => StatusCode::NOT_FOUND,
            LookupError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub struct AccountLookup<A, U>
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    account_repository: Arc<A>,
    user_repository: Arc<U>,
}

impl<A, U> AccountLookup<A, U>
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
{
    pub fn new(account_repository: Arc<A>, user_repository: Arc<U>) -> Self {
        Self {
            account_repository,
            user_repository,
        }
    }

    pub async fn resolve(&self, selector: &AccountSelector) -> Result<AccountEntity, LookupError> {
        match selector {
            AccountSelector::ByAccountReference(reference) => {
                debug!(%reference, "account_lookup: resolving by account reference");
                self.account_repository
                    .find_by_reference(reference)
                    .await?
                    .ok_or_else(|| LookupError::AccountNotFound(reference.clone()))
            }
            AccountSelector::ByUserReference(reference) => {
                debug!(%reference, "account_lookup: resolving via user reference");
                let user = self
                    .user_repository
                    .find_by_reference(reference)
                    .await?
                    .ok_or_else(|| LookupError::UserNotFound(reference.clone()))?;
                let account_id = user
                    .account_id
                    .ok_or_else(|| LookupError::UserWithoutAccount(reference.clone()))?;
                self.account_repository
                    .find_by_id(account_id)
                    .await?
                    .ok_or_else(|| LookupError::AccountNotFound(reference.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockall::predicate::eq;
    use std::collections::HashMap;
    use uuid::Uuid;

    use crate::domain::entities::users::UserEntity;
    use crate::domain::repositories::accounts::MockAccountRepository;
    use crate::domain::repositories::users::MockUserRepository;

    fn sample_account(id: Uuid, reference: &str) -> AccountEntity {
        AccountEntity {
            id,
            reference: reference.to_string(),
            name: None,
            metadata: HashMap::new(),
            subscriptions: Vec::new(),
            version: 0,
            created_at: Utc::now(),
        }
    }

    fn sample_user(reference: &str, account_id: Option<Uuid>) -> UserEntity {
        UserEntity {
            id: Uuid::new_v4(),
            reference: reference.to_string(),
            account_id,
            email: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn resolves_account_by_reference() {
        let account = sample_account(Uuid::new_v4(), "acme");
        let expected_id = account.id;

        let mut account_repository = MockAccountRepository::new();
        account_repository
            .expect_find_by_reference()
            .with(eq("acme"))
            .returning(move |_| {
                let account = account.clone();
                Box::pin(async move { Ok(Some(account)) })
            });
        let user_repository = MockUserRepository::new();

        let lookup = AccountLookup::new(Arc::new(account_repository), Arc::new(user_repository));
        let resolved = lookup
            .resolve(&AccountSelector::ByAccountReference("acme".to_string()))
            .await
            .unwrap();

        assert_eq!(resolved.id, expected_id);
    }

    #[tokio::test]
    async fn resolves_account_through_user_link() {
        let account_id = Uuid::new_v4();
        let account = sample_account(account_id, "acme");
        let user = sample_user("jane", Some(account_id));

        let mut account_repository = MockAccountRepository::new();
        account_repository
            .expect_find_by_id()
            .with(eq(account_id))
            .returning(move |_| {
                let account = account.clone();
                Box::pin(async move { Ok(Some(account)) })
            });
        let mut user_repository = MockUserRepository::new();
        user_repository
            .expect_find_by_reference()
            .with(eq("jane"))
            .returning(move |_| {
                let user = user.clone();
                Box::pin(async move { Ok(Some(user)) })
            });

        let lookup = AccountLookup::new(Arc::new(account_repository), Arc::new(user_repository));
        let resolved = lookup
            .resolve(&AccountSelector::ByUserReference("jane".to_string()))
            .await
            .unwrap();

        assert_eq!(resolved.id, account_id);
    }

    #[tokio::test]
    async fn user_without_linked_account_fails_not_found() {
        let user = sample_user("jane", None);

        let mut account_repository = MockAccountRepository::new();
        account_repository.expect_find_by_id().never();
        let mut user_repository = MockUserRepository::new();
        user_repository
            .expect_find_by_reference()
            .returning(move |_| {
                let user = user.clone();
                Box::pin(async move { Ok(Some(user)) })
            });

        let lookup = AccountLookup::new(Arc::new(account_repository), Arc::new(user_repository));
        let err = lookup
            .resolve(&AccountSelector::ByUserReference("jane".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, LookupError::UserWithoutAccount(ref r) if r == "jane"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_user_reference_fails_not_found() {
        let account_repository = MockAccountRepository::new();
        let mut user_repository = MockUserRepository::new();
        user_repository
            .expect_find_by_reference()
            .returning(|_| Box::pin(async { Ok(None) }));

        let lookup = AccountLookup::new(Arc::new(account_repository), Arc::new(user_repository));
        let err = lookup
            .resolve(&AccountSelector::ByUserReference("ghost".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, LookupError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn dangling_account_link_fails_not_found() {
        let user = sample_user("jane", Some(Uuid::new_v4()));

        let mut account_repository = MockAccountRepository::new();
        account_repository
            .expect_find_by_id()
            .returning(|_| Box::pin(async { Ok(None) }));
        let mut user_repository = MockUserRepository::new();
        user_repository
            .expect_find_by_reference()
            .returning(move |_| {
                let user = user.clone();
                Box::pin(async move { Ok(Some(user)) })
            });

        let lookup = AccountLookup::new(Arc::new(account_repository), Arc::new(user_repository));
        let err = lookup
            .resolve(&AccountSelector::ByUserReference("jane".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(err, LookupError::AccountNotFound(_)));
    }
}
