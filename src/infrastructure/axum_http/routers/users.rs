use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use uuid::Uuid;

use crate::application::usecases::reference_resolver::{
    AccountReferenceTarget, resolve_reference,
};
use crate::domain::entities::users::{EditUserEntity, InsertUserEntity};
use crate::domain::repositories::{accounts::AccountRepository, users::UserRepository};
use crate::domain::value_objects::accounts::NewAccountModel;
use crate::domain::value_objects::references::{EntityRef, ResolvedRef};
use crate::domain::value_objects::users::{NewUserModel, UpdateUserModel, UserDto};
use crate::infrastructure::axum_http::error_responses::ApiError;
use crate::infrastructure::postgres::postgres_connection::PgPoolSquad;
use crate::infrastructure::postgres::repositories::{
    accounts::AccountPostgres, users::UserPostgres,
};

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let user_repository = Arc::new(UserPostgres::new(Arc::clone(&db_pool)));
    let account_repository = Arc::new(AccountPostgres::new(db_pool));

    Router::new()
        .route("/api/users", get(list).post(create))
        .route(
            "/api/users/:reference",
            get(read).put(update).delete(remove),
        )
        .with_state((user_repository, account_repository))
}

/// Normalizes the `account` field to a storage identifier before the user row
/// is written, creating the account when an inline payload is supplied.
async fn resolve_account_link<A>(
    account_repository: &Arc<A>,
    account: Option<EntityRef<NewAccountModel>>,
) -> Result<Option<Uuid>, ApiError>
where
    A: AccountRepository + Send + Sync + 'static,
{
    let Some(entity_ref) = account else {
        return Ok(None);
    };

    let target = AccountReferenceTarget::new(Arc::clone(account_repository));
    match resolve_reference(&target, entity_ref).await? {
        ResolvedRef::One(id) => Ok(Some(id)),
        ResolvedRef::Many(_) => Err(ApiError::BadRequest(
            "user account must resolve to a single identifier".to_string(),
        )),
    }
}

pub async fn list<U, A>(
    State((user_repository, _)): State<(Arc<U>, Arc<A>)>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    match user_repository.list().await {
        Ok(users) => {
            let users: Vec<UserDto> = users.into_iter().map(UserDto::from).collect();
            (StatusCode::OK, Json(users)).into_response()
        }
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

pub async fn read<U, A>(
    State((user_repository, _)): State<(Arc<U>, Arc<A>)>,
    Path(reference): Path<String>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    match user_repository.find_by_reference(&reference).await {
        Ok(Some(user)) => (StatusCode::OK, Json(UserDto::from(user))).into_response(),
        Ok(None) => ApiError::NotFound(format!("user not found: {reference}")).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

pub async fn create<U, A>(
    State((user_repository, account_repository)): State<(Arc<U>, Arc<A>)>,
    Json(new_user): Json<NewUserModel>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    let account_id = match resolve_account_link(&account_repository, new_user.account).await {
        Ok(account_id) => account_id,
        Err(err) => return err.into_response(),
    };

    let insert_user = InsertUserEntity {
        reference: new_user.reference,
        account_id,
        email: new_user.email,
    };
    match user_repository.create(insert_user).await {
        Ok(user) => (StatusCode::CREATED, Json(UserDto::from(user))).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

pub async fn update<U, A>(
    State((user_repository, account_repository)): State<(Arc<U>, Arc<A>)>,
    Path(reference): Path<String>,
    Json(changes): Json<UpdateUserModel>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    let account_id = match resolve_account_link(&account_repository, changes.account).await {
        Ok(account_id) => account_id,
        Err(err) => return err.into_response(),
    };

    let edit_user = EditUserEntity {
        account_id,
        email: changes.email,
    };
    match user_repository.update_by_reference(&reference, edit_user).await {
        Ok(Some(user)) => (StatusCode::OK, Json(UserDto::from(user))).into_response(),
        Ok(None) => ApiError::NotFound(format!("user not found: {reference}")).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

pub async fn remove<U, A>(
    State((user_repository, _)): State<(Arc<U>, Arc<A>)>,
    Path(reference): Path<String>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    A: AccountRepository + Send + Sync + 'static,
{
    match user_repository.delete_by_reference(&reference).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => ApiError::NotFound(format!("user not found: {reference}")).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}
