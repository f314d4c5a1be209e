use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use uuid::Uuid;

use crate::application::usecases::account_lookup::AccountSelector;
use crate::application::usecases::subscriptions::{
    ExtendOutcome, PaymentGateway, SubscriptionUseCase,
};
use crate::config::config_model::DotEnvyConfig;
use crate::domain::repositories::{
    accounts::AccountRepository, plans::PlanRepository, users::UserRepository,
};
use crate::domain::value_objects::subscriptions::{
    CreateSubscriptionModel, StoppedSubscriptionsDto, UpdateSubscriptionModel, WebhookAckDto,
};
use crate::infrastructure::postgres::postgres_connection::PgPoolSquad;
use crate::infrastructure::postgres::repositories::{
    accounts::AccountPostgres, plans::PlanPostgres, users::UserPostgres,
};
use crate::payments::PaymentProviderKind;
use crate::payments::stripe_client::StripeClient;

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let account_repository = Arc::new(AccountPostgres::new(Arc::clone(&db_pool)));
    let user_repository = Arc::new(UserPostgres::new(Arc::clone(&db_pool)));
    let plan_repository = Arc::new(PlanPostgres::new(Arc::clone(&db_pool)));
    let payment_gateway = match config.payments.provider {
        PaymentProviderKind::Stripe => Arc::new(StripeClient::new(&config.payments.stripe)),
    };
    let subscriptions_usecase = SubscriptionUseCase::new(
        account_repository,
        user_repository,
        plan_repository,
        payment_gateway,
        config.subscriptions,
    );

    Router::new()
        .route(
            "/api/accounts/:reference/subscriptions",
            get(list_for_account)
                .post(create_for_account)
                .delete(stop_all_for_account),
        )
        .route(
            "/api/accounts/:reference/subscriptions/:subscription_id",
            get(read_for_account)
                .put(update_for_account)
                .delete(stop_for_account),
        )
        .route(
            "/api/users/:reference/subscriptions",
            get(list_for_user)
                .post(create_for_user)
                .delete(stop_all_for_user),
        )
        .route(
            "/api/users/:reference/subscriptions/:subscription_id",
            get(read_for_user).put(update_for_user).delete(stop_for_user),
        )
        .route("/api/subscriptions/extend", post(extend))
        .with_state(Arc::new(subscriptions_usecase))
}

async fn list_subscriptions<A, U, P, Pay>(
    subscriptions_usecase: &SubscriptionUseCase<A, U, P, Pay>,
    selector: AccountSelector,
) -> Response
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    match subscriptions_usecase.list(&selector).await {
        Ok(subscriptions) => (StatusCode::OK, Json(subscriptions)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn read_subscription<A, U, P, Pay>(
    subscriptions_usecase: &SubscriptionUseCase<A, U, P, Pay>,
    selector: AccountSelector,
    subscription_id: Uuid,
) -> Response
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    match subscriptions_usecase
        .read(&selector, subscription_id)
        .await
    {
        Ok(subscription) => (StatusCode::OK, Json(subscription)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn create_subscription<A, U, P, Pay>(
    subscriptions_usecase: &SubscriptionUseCase<A, U, P, Pay>,
    selector: AccountSelector,
    request: CreateSubscriptionModel,
) -> Response
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    match subscriptions_usecase.create(&selector, request).await {
        Ok(subscriptions) => (StatusCode::CREATED, Json(subscriptions)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn update_subscription<A, U, P, Pay>(
    subscriptions_usecase: &SubscriptionUseCase<A, U, P, Pay>,
    selector: AccountSelector,
    subscription_id: Uuid,
    changes: UpdateSubscriptionModel,
) -> Response
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    match subscriptions_usecase
        .update(&selector, subscription_id, changes)
        .await
    {
        Ok(subscription) => (StatusCode::OK, Json(subscription)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn stop_subscriptions<A, U, P, Pay>(
    subscriptions_usecase: &SubscriptionUseCase<A, U, P, Pay>,
    selector: AccountSelector,
    subscription_id: Option<Uuid>,
) -> Response
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    match subscriptions_usecase
        .stop(&selector, subscription_id)
        .await
    {
        Ok(stopped) => (StatusCode::OK, Json(StoppedSubscriptionsDto::new(stopped))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_for_account<A, U, P, Pay>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<A, U, P, Pay>>>,
    Path(reference): Path<String>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    list_subscriptions(
        &subscriptions_usecase,
        AccountSelector::ByAccountReference(reference),
    )
    .await
}

pub async fn list_for_user<A, U, P, Pay>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<A, U, P, Pay>>>,
    Path(reference): Path<String>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    list_subscriptions(
        &subscriptions_usecase,
        AccountSelector::ByUserReference(reference),
    )
    .await
}

pub async fn read_for_account<A, U, P, Pay>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<A, U, P, Pay>>>,
    Path((reference, subscription_id)): Path<(String, Uuid)>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    read_subscription(
        &subscriptions_usecase,
        AccountSelector::ByAccountReference(reference),
        subscription_id,
    )
    .await
}

pub async fn read_for_user<A, U, P, Pay>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<A, U, P, Pay>>>,
    Path((reference, subscription_id)): Path<(String, Uuid)>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    read_subscription(
        &subscriptions_usecase,
        AccountSelector::ByUserReference(reference),
        subscription_id,
    )
    .await
}

pub async fn create_for_account<A, U, P, Pay>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<A, U, P, Pay>>>,
    Path(reference): Path<String>,
    Json(request): Json<CreateSubscriptionModel>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    create_subscription(
        &subscriptions_usecase,
        AccountSelector::ByAccountReference(reference),
        request,
    )
    .await
}

pub async fn create_for_user<A, U, P, Pay>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<A, U, P, Pay>>>,
    Path(reference): Path<String>,
    Json(request): Json<CreateSubscriptionModel>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    create_subscription(
        &subscriptions_usecase,
        AccountSelector::ByUserReference(reference),
        request,
    )
    .await
}

pub async fn update_for_account<A, U, P, Pay>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<A, U, P, Pay>>>,
    Path((reference, subscription_id)): Path<(String, Uuid)>,
    Json(changes): Json<UpdateSubscriptionModel>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    update_subscription(
        &subscriptions_usecase,
        AccountSelector::ByAccountReference(reference),
        subscription_id,
        changes,
    )
    .await
}

pub async fn update_for_user<A, U, P, Pay>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<A, U, P, Pay>>>,
    Path((reference, subscription_id)): Path<(String, Uuid)>,
    Json(changes): Json<UpdateSubscriptionModel>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    update_subscription(
        &subscriptions_usecase,
        AccountSelector::ByUserReference(reference),
        subscription_id,
        changes,
    )
    .await
}

pub async fn stop_for_account<A, U, P, Pay>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<A, U, P, Pay>>>,
    Path((reference, subscription_id)): Path<(String, Uuid)>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    stop_subscriptions(
        &subscriptions_usecase,
        AccountSelector::ByAccountReference(reference),
        Some(subscription_id),
    )
    .await
}

pub async fn stop_for_user<A, U, P, Pay>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<A, U, P, Pay>>>,
    Path((reference, subscription_id)): Path<(String, Uuid)>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    stop_subscriptions(
        &subscriptions_usecase,
        AccountSelector::ByUserReference(reference),
        Some(subscription_id),
    )
    .await
}

pub async fn stop_all_for_account<A, U, P, Pay>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<A, U, P, Pay>>>,
    Path(reference): Path<String>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    stop_subscriptions(
        &subscriptions_usecase,
        AccountSelector::ByAccountReference(reference),
        None,
    )
    .await
}

pub async fn stop_all_for_user<A, U, P, Pay>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<A, U, P, Pay>>>,
    Path(reference): Path<String>,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    stop_subscriptions(
        &subscriptions_usecase,
        AccountSelector::ByUserReference(reference),
        None,
    )
    .await
}

/// Provider webhook receiver. Always answers 200 with a best-effort message
/// so transport errors never reveal whether an account exists.
pub async fn extend<A, U, P, Pay>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<A, U, P, Pay>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    let signature_header = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok());

    let message = match subscriptions_usecase
        .extend_from_webhook_request(&body, signature_header)
        .await
    {
        Ok(ExtendOutcome::Updated(count)) => {
            format!("Updated account and {count} subscription(s)")
        }
        Ok(ExtendOutcome::AccountNotFound) => "Account not found".to_string(),
        Err(err) => err.to_string(),
    };

    (StatusCode::OK, Json(WebhookAckDto { message }))
}
