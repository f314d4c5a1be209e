use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::domain::repositories::plans::PlanRepository;
use crate::domain::value_objects::plans::{NewPlanModel, PlanDto, UpdatePlanModel};
use crate::infrastructure::axum_http::error_responses::ApiError;
use crate::infrastructure::postgres::postgres_connection::PgPoolSquad;
use crate::infrastructure::postgres::repositories::plans::PlanPostgres;

pub fn routes(db_pool: Arc<PgPoolSquad>) -> Router {
    let plan_repository = Arc::new(PlanPostgres::new(db_pool));

    Router::new()
        .route("/api/plans", get(list).post(create))
        .route(
            "/api/plans/:reference",
            get(read).put(update).delete(remove),
        )
        .with_state(plan_repository)
}

pub async fn list<P>(State(plan_repository): State<Arc<P>>) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
{
    match plan_repository.list().await {
        Ok(plans) => {
            let plans: Vec<PlanDto> = plans.into_iter().map(PlanDto::from).collect();
            (StatusCode::OK, Json(plans)).into_response()
        }
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

pub async fn read<P>(
    State(plan_repository): State<Arc<P>>,
    Path(reference): Path<String>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
{
    match plan_repository.find_by_reference(&reference).await {
        Ok(Some(plan)) => (StatusCode::OK, Json(PlanDto::from(plan))).into_response(),
        Ok(None) => ApiError::NotFound(format!("plan not found: {reference}")).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

pub async fn create<P>(
    State(plan_repository): State<Arc<P>>,
    Json(new_plan): Json<NewPlanModel>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
{
    match plan_repository.create(new_plan).await {
        Ok(plan) => (StatusCode::CREATED, Json(PlanDto::from(plan))).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

pub async fn update<P>(
    State(plan_repository): State<Arc<P>>,
    Path(reference): Path<String>,
    Json(changes): Json<UpdatePlanModel>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
{
    match plan_repository.update_by_reference(&reference, changes).await {
        Ok(Some(plan)) => (StatusCode::OK, Json(PlanDto::from(plan))).into_response(),
        Ok(None) => ApiError::NotFound(format!("plan not found: {reference}")).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}

pub async fn remove<P>(
    State(plan_repository): State<Arc<P>>,
    Path(reference): Path<String>,
) -> impl IntoResponse
where
    P: PlanRepository + Send + Sync + 'static,
{
    match plan_repository.delete_by_reference(&reference).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => ApiError::NotFound(format!("plan not found: {reference}")).into_response(),
        Err(err) => ApiError::Internal(err).into_response(),
    }
}
