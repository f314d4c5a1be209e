use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::domain::repositories::accounts::AccountRepository;
use crate::domain::value_objects::accounts::{AccountDto, NewAccountModel, UpdateAccountModel};
use crate::infrastructure::axum_http::error_responses::ApiError;
use crate::infrastructure::postgres::postgres_connection::PgPoolSquad;
use crate::infrastructure::postgres::repositories::accounts::AccountPostgres;

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let account_repository = Arc::new(AccountPostgres::new(db_pool));

    Router::new()
        .route("/api/accounts", get(list).post(create))
        .route(
            "/api/accounts/:reference",
            get(read).put(update).delete(remove),
        )
        .with_state(account_repository)
}

pub async fn list<A>(State(account_repository): State<Arc<A>>) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
{
    match account_repository.list().await {
        Ok(accounts) => {
            let accounts: Vec<AccountDto> = accounts.into_iter().map(AccountDto::from).collect();
            (StatusCode::OK, Json(accounts)).into_response()
        }
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

pub async fn read<A>(
    State(account_repository): State<Arc<A>>,
    Path(reference): Path<String>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
{
    match account_repository.find_by_reference(&reference).await {
        Ok(Some(account)) => (StatusCode::OK, Json(AccountDto::from(account))).into_response(),
        Ok(None) => ApiError::NotFound(format!("account not found: {reference}")).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

pub async fn create<A>(
    State(account_repository): State<Arc<A>>,
    Json(new_account): Json<NewAccountModel>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
{
    match account_repository.create(new_account).await {
        Ok(account) => (StatusCode::CREATED, Json(AccountDto::from(account))).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

pub async fn update<A>(
    State(account_repository): State<Arc<A>>,
    Path(reference): Path<String>,
    Json(changes): Json<UpdateAccountModel>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
{
    match account_repository
        .update_by_reference(&reference, changes)
        .await
    {
        Ok(Some(account)) => (StatusCode::OK, Json(AccountDto::from(account))).into_response(),
        Ok(None) => ApiError::NotFound(format!("account not found: {reference}")).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

pub async fn remove<A>(
    State(account_repository): State<Arc<A>>,
    Path(reference): Path<String>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
{
    match account_repository.delete_by_reference(&reference).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => ApiError::NotFound(format!("account not found: {reference}")).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}
