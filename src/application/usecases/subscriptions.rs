use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::usecases::account_lookup::{AccountLookup, AccountSelector, LookupError};
use crate::application::usecases::reference_resolver::{
    PlanReferenceTarget, ResolveError, resolve_reference,
};
use crate::config::config_model::SubscriptionsPolicy;
use crate::domain::entities::accounts::AccountEntity;
use crate::domain::repositories::accounts::AccountRepository;
use crate::domain::repositories::plans::PlanRepository;
use crate::domain::repositories::users::UserRepository;
use crate::domain::value_objects::enums::billing_periods::BillingPeriod;
use crate::domain::value_objects::references::{EntityRef, ResolvedRef};
use crate::domain::value_objects::subscriptions::{
    CreateSubscriptionModel, Subscription, UpdateSubscriptionModel,
};
use crate::payments::stripe_client::StripeClient;
use crate::payments::{
    ExtendEvent, PROVIDER_CUSTOMER_KEY, PROVIDER_SUBSCRIPTION_KEY, PaymentDetails, ProviderError,
    ProviderSubscription, SubscriptionRequest,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_subscription<'a>(
        &self,
        user_reference: Option<&'a str>,
        account: &AccountEntity,
        request: &SubscriptionRequest,
        payment: &PaymentDetails,
    ) -> Result<ProviderSubscription, ProviderError>;

    fn parse_extend_event<'a>(
        &self,
        payload: &[u8],
        signature_header: Option<&'a str>,
    ) -> Result<ExtendEvent, ProviderError>;
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_subscription<'a>(
        &self,
        user_reference: Option<&'a str>,
        account: &AccountEntity,
        request: &SubscriptionRequest,
        payment: &PaymentDetails,
    ) -> Result<ProviderSubscription, ProviderError> {
        self.create_subscription(user_reference, account, request, payment)
            .await
    }

    fn parse_extend_event<'a>(
        &self,
        payload: &[u8],
        signature_header: Option<&'a str>,
    ) -> Result<ExtendEvent, ProviderError> {
        self.parse_extend_event(payload, signature_header)
    }
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("account not found: {0}")]
    AccountNotFound(String),
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("user has no linked account: {0}")]
    UserWithoutAccount(String),
    #[error("subscription not found: {0}")]
    SubscriptionNotFound(Uuid),
    #[error("{entity} not found: {references:?}")]
    ReferenceNotFound {
        entity: &'static str,
        references: Vec<String>,
    },
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("payment provider error: {message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },
    #[error("account was modified concurrently: {0}")]
    StaleAccount(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SubscriptionError::AccountNotFound(_)
            | SubscriptionError::UserNotFound(_)
            | SubscriptionError::UserWithoutAccount(_)
            | SubscriptionError::SubscriptionNotFound(_)
            | SubscriptionError::ReferenceNotFound { .. } => StatusCode::NOT_FOUND,
            SubscriptionError::Validation(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::Provider { status, .. } => status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .unwrap_or(StatusCode::BAD_REQUEST),
            SubscriptionError::StaleAccount(_) => StatusCode::CONFLICT,
            SubscriptionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<LookupError> for SubscriptionError {
    fn from(value: LookupError) -> Self {
        match value {
            LookupError::AccountNotFound(reference) => {
                SubscriptionError::AccountNotFound(reference)
            }
            LookupError::UserNotFound(reference) => SubscriptionError::UserNotFound(reference),
            LookupError::UserWithoutAccount(reference) => {
                SubscriptionError::UserWithoutAccount(reference)
            }
            LookupError::Internal(err) => SubscriptionError::Internal(err),
        }
    }
}

impl From<ResolveError> for SubscriptionError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::NotFound { entity, references } => {
                SubscriptionError::ReferenceNotFound { entity, references }
            }
            ResolveError::Internal(err) => SubscriptionError::Internal(err),
        }
    }
}

impl From<ProviderError> for SubscriptionError {
    fn from(value: ProviderError) -> Self {
        SubscriptionError::Provider {
            status: value.status,
            message: value.message,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

/// Outcome of a webhook-driven extension. An unknown customer id is a normal
/// outcome, not an error: the webhook response must not reveal whether an
/// account exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendOutcome {
    Updated(usize),
    AccountNotFound,
}

/// Owns the subscription sequence embedded in account documents: creation,
/// update, stopping and webhook-driven expiry extension.
pub struct SubscriptionUseCase<A, U, P, Pay>
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    account_lookup: AccountLookup<A, U>,
    account_repository: Arc<A>,
    plan_target: PlanReferenceTarget<P>,
    payment_gateway: Arc<Pay>,
    policy: SubscriptionsPolicy,
}

impl<A, U, P, Pay> SubscriptionUseCase<A, U, P, Pay>
where
    A: AccountRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    Pay: PaymentGateway + Send + Sync + 'static,
{
    pub fn new(
        account_repository: Arc<A>,
        user_repository: Arc<U>,
        plan_repository: Arc<P>,
        payment_gateway: Arc<Pay>,
        policy: SubscriptionsPolicy,
    ) -> Self {
        Self {
            account_lookup: AccountLookup::new(Arc::clone(&account_repository), user_repository),
            account_repository,
            plan_target: PlanReferenceTarget::new(plan_repository),
            payment_gateway,
            policy,
        }
    }

    /// Full history, stopped and expired included.
    pub async fn list(&self, selector: &AccountSelector) -> UseCaseResult<Vec<Subscription>> {
        let account = self.account_lookup.resolve(selector).await?;
        Ok(account.subscriptions)
    }

    pub async fn read(
        &self,
        selector: &AccountSelector,
        subscription_id: Uuid,
    ) -> UseCaseResult<Subscription> {
        let account = self.account_lookup.resolve(selector).await?;
        account
            .subscriptions
            .into_iter()
            .find(|subscription| subscription.id == subscription_id)
            .ok_or(SubscriptionError::SubscriptionNotFound(subscription_id))
    }

    /// Staged pipeline: resolve account, set up the provider subscription,
    /// resolve the plan reference, apply the single-active policy, stamp the
    /// expiry, persist once. The first failing stage aborts the rest.
    pub async fn create(
        &self,
        selector: &AccountSelector,
        request: CreateSubscriptionModel,
    ) -> UseCaseResult<Vec<Subscription>> {
        let mut account = self.account_lookup.resolve(selector).await?;
        let billing = request
            .billing
            .as_deref()
            .and_then(BillingPeriod::from_str)
            .unwrap_or_default();

        info!(
            account_reference = %account.reference,
            billing = %billing,
            "subscriptions: creating subscription"
        );

        let plan_reference = match &request.plan {
            EntityRef::Reference(reference) => Some(reference.clone()),
            _ => None,
        };
        let provider = self
            .payment_gateway
            .create_subscription(
                selector.user_reference(),
                &account,
                &SubscriptionRequest {
                    plan_reference,
                    billing,
                },
                &PaymentDetails {
                    token: request.token.clone(),
                },
            )
            .await
            .map_err(|err| {
                warn!(
                    account_reference = %account.reference,
                    provider_status = ?err.status,
                    error = %err.message,
                    "subscriptions: provider subscription creation failed"
                );
                SubscriptionError::from(err)
            })?;

        let plan_id = match resolve_reference(&self.plan_target, request.plan).await? {
            ResolvedRef::One(id) => id,
            ResolvedRef::Many(_) => {
                return Err(SubscriptionError::Validation(
                    "subscription plan must resolve to a single identifier".to_string(),
                ));
            }
        };

        let now = Utc::now();
        if !self.policy.allow_multiple {
            for existing in account.subscriptions.iter_mut() {
                existing.date_stopped = Some(now);
            }
        }

        account
            .metadata
            .insert(PROVIDER_CUSTOMER_KEY.to_string(), provider.customer_id);

        account.subscriptions.push(Subscription {
            id: Uuid::new_v4(),
            plan_id,
            billing,
            date_expires: Some(billing.expiry_from(now)),
            date_stopped: None,
            date_created: now,
            metadata: HashMap::from([(
                PROVIDER_SUBSCRIPTION_KEY.to_string(),
                provider.subscription_id,
            )]),
        });

        let saved = self.save(account).await?;
        info!(
            account_reference = %saved.reference,
            subscription_count = saved.subscriptions.len(),
            "subscriptions: subscription created"
        );
        Ok(saved.subscriptions)
    }

    /// Shallow-merges the patch into the subscription with the given id.
    pub async fn update(
        &self,
        selector: &AccountSelector,
        subscription_id: Uuid,
        changes: UpdateSubscriptionModel,
    ) -> UseCaseResult<Subscription> {
        let mut account = self.account_lookup.resolve(selector).await?;

        let updated = {
            let subscription = account
                .subscriptions
                .iter_mut()
                .find(|subscription| subscription.id == subscription_id)
                .ok_or_else(|| {
                    warn!(
                        account_reference = %account.reference,
                        %subscription_id,
                        "subscriptions: update target not found"
                    );
                    SubscriptionError::SubscriptionNotFound(subscription_id)
                })?;
            changes.merge_into(subscription);
            subscription.clone()
        };

        self.save(account).await?;
        Ok(updated)
    }

    /// Stops one subscription, or every subscription when no id is given.
    /// Records are stamped, never removed. Returns the number stopped.
    pub async fn stop(
        &self,
        selector: &AccountSelector,
        subscription_id: Option<Uuid>,
    ) -> UseCaseResult<usize> {
        let mut account = self.account_lookup.resolve(selector).await?;

        let now = Utc::now();
        let mut stopped = 0;
        for subscription in account.subscriptions.iter_mut() {
            if subscription_id.is_none_or(|id| subscription.id == id) {
                subscription.date_stopped = Some(now);
                stopped += 1;
            }
        }

        let saved = self.save(account).await?;
        info!(
            account_reference = %saved.reference,
            stopped,
            "subscriptions: stopped subscriptions"
        );
        Ok(stopped)
    }

    /// Webhook entry point: verification and parsing are delegated to the
    /// provider client, then the extension is applied. Nothing is mutated on
    /// a parse failure.
    pub async fn extend_from_webhook_request(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> UseCaseResult<ExtendOutcome> {
        let event = self
            .payment_gateway
            .parse_extend_event(payload, signature_header)
            .map_err(|err| {
                warn!(
                    provider_status = ?err.status,
                    error = %err.message,
                    "subscriptions: webhook event rejected"
                );
                SubscriptionError::from(err)
            })?;

        self.extend_from_webhook(&event.customer_id, &event.subscription_id, event.period)
            .await
    }

    /// Extends every subscription correlated with the provider subscription
    /// id, on the account correlated with the provider customer id. Never
    /// creates subscriptions; persists once for all matches.
    pub async fn extend_from_webhook(
        &self,
        customer_id: &str,
        subscription_id: &str,
        period: BillingPeriod,
    ) -> UseCaseResult<ExtendOutcome> {
        let account = self
            .account_repository
            .find_by_metadata(PROVIDER_CUSTOMER_KEY, customer_id)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "subscriptions: account lookup by metadata failed");
                SubscriptionError::Internal(err)
            })?;

        let Some(mut account) = account else {
            info!("subscriptions: extend webhook matched no account");
            return Ok(ExtendOutcome::AccountNotFound);
        };

        let now = Utc::now();
        let mut updated = 0;
        for subscription in account.subscriptions.iter_mut() {
            let matches = subscription
                .metadata
                .get(PROVIDER_SUBSCRIPTION_KEY)
                .is_some_and(|value| value == subscription_id);
            if matches {
                subscription.date_expires = Some(period.expiry_from(now));
                updated += 1;
            }
        }

        if updated > 0 {
            self.save(account).await?;
        }

        info!(
            updated,
            period = %period,
            "subscriptions: extended subscriptions from webhook"
        );
        Ok(ExtendOutcome::Updated(updated))
    }

    async fn save(&self, account: AccountEntity) -> UseCaseResult<AccountEntity> {
        let saved = self.account_repository.save(&account).await.map_err(|err| {
            error!(
                account_reference = %account.reference,
                db_error = ?err,
                "subscriptions: failed to persist account"
            );
            SubscriptionError::Internal(err)
        })?;

        saved.ok_or_else(|| {
            warn!(
                account_reference = %account.reference,
                version = account.version,
                "subscriptions: stale account version on save"
            );
            SubscriptionError::StaleAccount(account.reference.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::{DateTime, Duration, Utc};
    use mockall::predicate::eq;

    use crate::domain::entities::plans::PlanEntity;
    use crate::domain::repositories::accounts::MockAccountRepository;
    use crate::domain::repositories::plans::MockPlanRepository;
    use crate::domain::repositories::users::MockUserRepository;

    fn sample_subscription(provider_subscription: &str) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            billing: BillingPeriod::Month,
            date_expires: Some(Utc::now() + Duration::days(10)),
            date_stopped: None,
            date_created: Utc::now() - Duration::days(21),
            metadata: HashMap::from([(
                PROVIDER_SUBSCRIPTION_KEY.to_string(),
                provider_subscription.to_string(),
            )]),
        }
    }

    fn sample_account(subscriptions: Vec<Subscription>) -> AccountEntity {
        AccountEntity {
            id: Uuid::new_v4(),
            reference: "acme".to_string(),
            name: Some("Acme".to_string()),
            metadata: HashMap::new(),
            subscriptions,
            version: 3,
            created_at: Utc::now(),
        }
    }

    fn sample_plan(reference: &str) -> PlanEntity {
        PlanEntity {
            id: Uuid::new_v4(),
            reference: reference.to_string(),
            name: Some("Gold".to_string()),
            price_minor: 990,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn account_repo_returning(account: AccountEntity) -> MockAccountRepository {
        let mut account_repository = MockAccountRepository::new();
        account_repository
            .expect_find_by_reference()
            .with(eq("acme"))
            .returning(move |_| {
                let account = account.clone();
                Box::pin(async move { Ok(Some(account)) })
            });
        account_repository
    }

    fn expect_save_echo(account_repository: &mut MockAccountRepository) {
        account_repository.expect_save().returning(|account| {
            let account = account.clone();
            Box::pin(async move { Ok(Some(account)) })
        });
    }

    fn gateway_returning(customer_id: &str, subscription_id: &str) -> MockPaymentGateway {
        let provider = ProviderSubscription {
            customer_id: customer_id.to_string(),
            subscription_id: subscription_id.to_string(),
        };
        let mut payment_gateway = MockPaymentGateway::new();
        payment_gateway
            .expect_create_subscription()
            .returning(move |_, _, _, _| Ok(provider.clone()));
        payment_gateway
    }

    fn plan_repo_returning(plan: PlanEntity) -> MockPlanRepository {
        let mut plan_repository = MockPlanRepository::new();
        plan_repository
            .expect_find_by_reference()
            .with(eq(plan.reference.clone()))
            .returning(move |_| {
                let plan = plan.clone();
                Box::pin(async move { Ok(Some(plan)) })
            });
        plan_repository
    }

    fn engine(
        account_repository: MockAccountRepository,
        user_repository: MockUserRepository,
        plan_repository: MockPlanRepository,
        payment_gateway: MockPaymentGateway,
        policy: SubscriptionsPolicy,
    ) -> SubscriptionUseCase<
        MockAccountRepository,
        MockUserRepository,
        MockPlanRepository,
        MockPaymentGateway,
    > {
        SubscriptionUseCase::new(
            Arc::new(account_repository),
            Arc::new(user_repository),
            Arc::new(plan_repository),
            Arc::new(payment_gateway),
            policy,
        )
    }

    fn by_account() -> AccountSelector {
        AccountSelector::ByAccountReference("acme".to_string())
    }

    fn create_request(billing: Option<&str>) -> CreateSubscriptionModel {
        CreateSubscriptionModel {
            plan: EntityRef::Reference("gold".to_string()),
            billing: billing.map(str::to_string),
            token: Some("tok_visa".to_string()),
        }
    }

    fn days_from_now(at: DateTime<Utc>, start: DateTime<Utc>) -> i64 {
        (at - start).num_days()
    }

    #[tokio::test]
    async fn create_stops_prior_subscriptions_in_single_mode() {
        let existing = sample_subscription("sub_old");
        let existing_id = existing.id;
        let mut account_repository = account_repo_returning(sample_account(vec![existing]));
        expect_save_echo(&mut account_repository);

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            plan_repo_returning(sample_plan("gold")),
            gateway_returning("cus_1", "sub_new"),
            SubscriptionsPolicy::default(),
        );

        let before = Utc::now();
        let subscriptions = usecase
            .create(&by_account(), create_request(Some("month")))
            .await
            .unwrap();

        assert_eq!(subscriptions.len(), 2);
        assert_eq!(subscriptions[0].id, existing_id);
        assert!(subscriptions[0].date_stopped.is_some());
        assert!(subscriptions[1].date_stopped.is_none());
        assert!(subscriptions[1].is_active_at(Utc::now()));
        assert_eq!(
            days_from_now(subscriptions[1].date_expires.unwrap(), before),
            31
        );

        let active: Vec<_> = subscriptions
            .iter()
            .filter(|subscription| subscription.date_stopped.is_none())
            .collect();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn create_with_year_billing_expires_in_366_days() {
        let mut account_repository = account_repo_returning(sample_account(Vec::new()));
        expect_save_echo(&mut account_repository);

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            plan_repo_returning(sample_plan("gold")),
            gateway_returning("cus_1", "sub_new"),
            SubscriptionsPolicy::default(),
        );

        let before = Utc::now();
        let subscriptions = usecase
            .create(&by_account(), create_request(Some("year")))
            .await
            .unwrap();

        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].billing, BillingPeriod::Year);
        assert_eq!(
            days_from_now(subscriptions[0].date_expires.unwrap(), before),
            366
        );
    }

    #[tokio::test]
    async fn create_with_unknown_billing_falls_back_to_month() {
        let mut account_repository = account_repo_returning(sample_account(Vec::new()));
        expect_save_echo(&mut account_repository);

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            plan_repo_returning(sample_plan("gold")),
            gateway_returning("cus_1", "sub_new"),
            SubscriptionsPolicy::default(),
        );

        let before = Utc::now();
        let subscriptions = usecase
            .create(&by_account(), create_request(Some("fortnight")))
            .await
            .unwrap();

        assert_eq!(subscriptions[0].billing, BillingPeriod::Month);
        assert_eq!(
            days_from_now(subscriptions[0].date_expires.unwrap(), before),
            31
        );
    }

    #[tokio::test]
    async fn create_keeps_existing_subscriptions_when_multiple_allowed() {
        let existing = sample_subscription("sub_old");
        let mut account_repository = account_repo_returning(sample_account(vec![existing]));
        expect_save_echo(&mut account_repository);

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            plan_repo_returning(sample_plan("gold")),
            gateway_returning("cus_1", "sub_new"),
            SubscriptionsPolicy {
                allow_multiple: true,
            },
        );

        let subscriptions = usecase
            .create(&by_account(), create_request(Some("month")))
            .await
            .unwrap();

        let active: Vec<_> = subscriptions
            .iter()
            .filter(|subscription| subscription.date_stopped.is_none())
            .collect();
        assert_eq!(active.len(), 2);
    }

    #[tokio::test]
    async fn create_records_provider_correlation_metadata() {
        let mut account_repository = account_repo_returning(sample_account(Vec::new()));
        account_repository
            .expect_save()
            .withf(|account| {
                account.metadata.get(PROVIDER_CUSTOMER_KEY) == Some(&"cus_1".to_string())
            })
            .returning(|account| {
                let account = account.clone();
                Box::pin(async move { Ok(Some(account)) })
            });

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            plan_repo_returning(sample_plan("gold")),
            gateway_returning("cus_1", "sub_new"),
            SubscriptionsPolicy::default(),
        );

        let subscriptions = usecase
            .create(&by_account(), create_request(Some("month")))
            .await
            .unwrap();

        assert_eq!(
            subscriptions[0].metadata.get(PROVIDER_SUBSCRIPTION_KEY),
            Some(&"sub_new".to_string())
        );
    }

    #[tokio::test]
    async fn create_aborts_pipeline_when_provider_fails() {
        let mut account_repository = account_repo_returning(sample_account(Vec::new()));
        account_repository.expect_save().never();

        let mut payment_gateway = MockPaymentGateway::new();
        payment_gateway
            .expect_create_subscription()
            .returning(|_, _, _, _| {
                Err(ProviderError {
                    status: Some(402),
                    message: "card declined".to_string(),
                })
            });

        let mut plan_repository = MockPlanRepository::new();
        plan_repository.expect_find_by_reference().never();

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            plan_repository,
            payment_gateway,
            SubscriptionsPolicy::default(),
        );

        let err = usecase
            .create(&by_account(), create_request(Some("month")))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SubscriptionError::Provider {
                status: Some(402),
                ..
            }
        ));
        assert_eq!(err.status_code(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn create_with_unknown_plan_fails_not_found_without_saving() {
        let mut account_repository = account_repo_returning(sample_account(Vec::new()));
        account_repository.expect_save().never();

        let mut plan_repository = MockPlanRepository::new();
        plan_repository
            .expect_find_by_reference()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            plan_repository,
            gateway_returning("cus_1", "sub_new"),
            SubscriptionsPolicy::default(),
        );

        let err = usecase
            .create(&by_account(), create_request(Some("month")))
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::ReferenceNotFound { .. }));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_returns_full_history_unfiltered() {
        let mut stopped = sample_subscription("sub_a");
        stopped.date_stopped = Some(Utc::now() - Duration::days(5));
        let mut expired = sample_subscription("sub_b");
        expired.date_expires = Some(Utc::now() - Duration::days(1));
        let active = sample_subscription("sub_c");

        let account_repository =
            account_repo_returning(sample_account(vec![stopped, expired, active]));

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            MockPlanRepository::new(),
            MockPaymentGateway::new(),
            SubscriptionsPolicy::default(),
        );

        let subscriptions = usecase.list(&by_account()).await.unwrap();

        assert_eq!(subscriptions.len(), 3);
    }

    #[tokio::test]
    async fn list_resolves_account_through_user_reference() {
        let account = sample_account(vec![sample_subscription("sub_a")]);
        let account_id = account.id;

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
                Box::pin(async move {
                    Ok(Some(crate::domain::entities::users::UserEntity {
                        id: Uuid::new_v4(),
                        reference: "jane".to_string(),
                        account_id: Some(account_id),
                        email: None,
                        created_at: Utc::now(),
                    }))
                })
            });

        let usecase = engine(
            account_repository,
            user_repository,
            MockPlanRepository::new(),
            MockPaymentGateway::new(),
            SubscriptionsPolicy::default(),
        );

        let subscriptions = usecase
            .list(&AccountSelector::ByUserReference("jane".to_string()))
            .await
            .unwrap();

        assert_eq!(subscriptions.len(), 1);
    }

    #[tokio::test]
    async fn update_merges_patch_and_returns_updated_subscription() {
        let existing = sample_subscription("sub_a");
        let subscription_id = existing.id;
        let mut account_repository = account_repo_returning(sample_account(vec![existing]));
        expect_save_echo(&mut account_repository);

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            MockPlanRepository::new(),
            MockPaymentGateway::new(),
            SubscriptionsPolicy::default(),
        );

        let changes = UpdateSubscriptionModel {
            billing: Some("year".to_string()),
            metadata: HashMap::from([("note".to_string(), "vip".to_string())]),
            ..Default::default()
        };
        let updated = usecase
            .update(&by_account(), subscription_id, changes)
            .await
            .unwrap();

        assert_eq!(updated.billing, BillingPeriod::Year);
        assert_eq!(updated.metadata.get("note"), Some(&"vip".to_string()));
        // Untouched keys survive the merge.
        assert_eq!(
            updated.metadata.get(PROVIDER_SUBSCRIPTION_KEY),
            Some(&"sub_a".to_string())
        );
    }

    #[tokio::test]
    async fn update_with_unknown_id_fails_not_found() {
        let mut account_repository =
            account_repo_returning(sample_account(vec![sample_subscription("sub_a")]));
        account_repository.expect_save().never();

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            MockPlanRepository::new(),
            MockPaymentGateway::new(),
            SubscriptionsPolicy::default(),
        );

        let missing = Uuid::new_v4();
        let err = usecase
            .update(&by_account(), missing, UpdateSubscriptionModel::default())
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::SubscriptionNotFound(id) if id == missing));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stop_without_id_stops_every_subscription() {
        let subscriptions = vec![
            sample_subscription("sub_a"),
            sample_subscription("sub_b"),
            sample_subscription("sub_c"),
        ];
        let mut account_repository = account_repo_returning(sample_account(subscriptions));
        account_repository
            .expect_save()
            .withf(|account| {
                account
                    .subscriptions
                    .iter()
                    .all(|subscription| subscription.date_stopped.is_some())
            })
            .returning(|account| {
                let account = account.clone();
                Box::pin(async move { Ok(Some(account)) })
            });

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            MockPlanRepository::new(),
            MockPaymentGateway::new(),
            SubscriptionsPolicy::default(),
        );

        let stopped = usecase.stop(&by_account(), None).await.unwrap();

        assert_eq!(stopped, 3);
    }

    #[tokio::test]
    async fn stop_with_id_leaves_other_subscriptions_untouched() {
        let target = sample_subscription("sub_a");
        let target_id = target.id;
        let other = sample_subscription("sub_b");
        let other_id = other.id;

        let mut account_repository = account_repo_returning(sample_account(vec![target, other]));
        account_repository
            .expect_save()
            .withf(move |account| {
                account.subscriptions.iter().all(|subscription| {
                    if subscription.id == target_id {
                        subscription.date_stopped.is_some()
                    } else {
                        subscription.date_stopped.is_none()
                    }
                })
            })
            .returning(|account| {
                let account = account.clone();
                Box::pin(async move { Ok(Some(account)) })
            });

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            MockPlanRepository::new(),
            MockPaymentGateway::new(),
            SubscriptionsPolicy::default(),
        );

        let stopped = usecase
            .stop(&by_account(), Some(target_id))
            .await
            .unwrap();

        assert_eq!(stopped, 1);
        assert_ne!(target_id, other_id);
    }

    #[tokio::test]
    async fn extend_with_unknown_customer_reports_not_found_without_saving() {
        let mut account_repository = MockAccountRepository::new();
        account_repository
            .expect_find_by_metadata()
            .with(eq(PROVIDER_CUSTOMER_KEY), eq("cus_ghost"))
            .returning(|_, _| Box::pin(async { Ok(None) }));
        account_repository.expect_save().never();

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            MockPlanRepository::new(),
            MockPaymentGateway::new(),
            SubscriptionsPolicy::default(),
        );

        let outcome = usecase
            .extend_from_webhook("cus_ghost", "sub_x", BillingPeriod::Month)
            .await
            .unwrap();

        assert_eq!(outcome, ExtendOutcome::AccountNotFound);
    }

    #[tokio::test]
    async fn extend_updates_every_matching_subscription() {
        let matching_a = sample_subscription("sub_renewed");
        let matching_b = sample_subscription("sub_renewed");
        let unrelated = sample_subscription("sub_other");
        let unrelated_expiry = unrelated.date_expires;
        let account = sample_account(vec![matching_a, matching_b, unrelated]);

        let mut account_repository = MockAccountRepository::new();
        account_repository
            .expect_find_by_metadata()
            .with(eq(PROVIDER_CUSTOMER_KEY), eq("cus_1"))
            .returning(move |_, _| {
                let account = account.clone();
                Box::pin(async move { Ok(Some(account)) })
            });
        account_repository
            .expect_save()
            .withf(move |account| {
                let renewed_pushed_out = account
                    .subscriptions
                    .iter()
                    .filter(|subscription| {
                        subscription.metadata.get(PROVIDER_SUBSCRIPTION_KEY)
                            == Some(&"sub_renewed".to_string())
                    })
                    .all(|subscription| {
                        subscription
                            .date_expires
                            .is_some_and(|at| (at - Utc::now()).num_days() >= 365)
                    });
                let unrelated_untouched = account.subscriptions.last().unwrap().date_expires
                    == unrelated_expiry;
                renewed_pushed_out && unrelated_untouched
            })
            .returning(|account| {
                let account = account.clone();
                Box::pin(async move { Ok(Some(account)) })
            });

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            MockPlanRepository::new(),
            MockPaymentGateway::new(),
            SubscriptionsPolicy::default(),
        );

        let outcome = usecase
            .extend_from_webhook("cus_1", "sub_renewed", BillingPeriod::Year)
            .await
            .unwrap();

        assert_eq!(outcome, ExtendOutcome::Updated(2));
    }

    #[tokio::test]
    async fn webhook_request_with_bad_event_mutates_nothing() {
        let mut account_repository = MockAccountRepository::new();
        account_repository.expect_find_by_metadata().never();
        account_repository.expect_save().never();

        let mut payment_gateway = MockPaymentGateway::new();
        payment_gateway
            .expect_parse_extend_event()
            .returning(|_, _| Err(ProviderError::new("invalid webhook signature")));

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            MockPlanRepository::new(),
            payment_gateway,
            SubscriptionsPolicy::default(),
        );

        let err = usecase
            .extend_from_webhook_request(b"{}", None)
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::Provider { .. }));
    }

    #[tokio::test]
    async fn webhook_request_extends_through_parsed_event() {
        let matching = sample_subscription("sub_renewed");
        let account = sample_account(vec![matching]);

        let mut account_repository = MockAccountRepository::new();
        account_repository
            .expect_find_by_metadata()
            .returning(move |_, _| {
                let account = account.clone();
                Box::pin(async move { Ok(Some(account)) })
            });
        expect_save_echo(&mut account_repository);

        let mut payment_gateway = MockPaymentGateway::new();
        payment_gateway.expect_parse_extend_event().returning(|_, _| {
            Ok(ExtendEvent {
                customer_id: "cus_1".to_string(),
                subscription_id: "sub_renewed".to_string(),
                period: BillingPeriod::Month,
            })
        });

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            MockPlanRepository::new(),
            payment_gateway,
            SubscriptionsPolicy::default(),
        );

        let outcome = usecase
            .extend_from_webhook_request(b"{}", Some("t=1,v1=aa"))
            .await
            .unwrap();

        assert_eq!(outcome, ExtendOutcome::Updated(1));
    }

    #[tokio::test]
    async fn concurrent_save_conflict_surfaces_as_stale_account() {
        let mut account_repository =
            account_repo_returning(sample_account(vec![sample_subscription("sub_a")]));
        account_repository
            .expect_save()
            .returning(|_| Box::pin(async { Ok(None) }));

        let usecase = engine(
            account_repository,
            MockUserRepository::new(),
            MockPlanRepository::new(),
            MockPaymentGateway::new(),
            SubscriptionsPolicy::default(),
        );

        let err = usecase.stop(&by_account(), None).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::StaleAccount(_)));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
