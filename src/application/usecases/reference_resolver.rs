use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::domain::repositories::accounts::AccountRepository;
use crate::domain::repositories::plans::PlanRepository;
use crate::domain::value_objects::accounts::NewAccountModel;
use crate::domain::value_objects::plans::NewPlanModel;
use crate::domain::value_objects::references::{EntityRef, ResolvedRef};

/// Store-side contract the resolver works against: reference lookups plus
/// inline creation for embedded payloads.
#[async_trait]
#[automock(type CreatePayload = crate::domain::value_objects::plans::NewPlanModel;)]
pub trait ReferenceTarget {
    type CreatePayload: Send + Sync + 'static;

    fn entity_name(&self) -> &'static str;
    async fn id_by_reference(&self, reference: &str) -> AnyResult<Option<Uuid>>;
    /// Set-membership lookup returning (reference, id) pairs in store order.
    async fn ids_by_references(&self, references: &[String]) -> AnyResult<Vec<(String, Uuid)>>;
    async fn create_inline(&self, payload: Self::CreatePayload) -> AnyResult<Uuid>;
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{entity} not found: {references:?}")]
    NotFound {
        entity: &'static str,
        references: Vec<String>,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Turns a reference field into storage identifier(s). Inline payloads always
/// create a new entity; the create is not idempotent.
pub async fn resolve_reference<T>(
    target: &T,
    entity_ref: EntityRef<T::CreatePayload>,
) -> Result<ResolvedRef, ResolveError>
where
    T: ReferenceTarget + Sync,
{
    match entity_ref {
        EntityRef::Reference(reference) => {
            debug!(
                entity = target.entity_name(),
                %reference,
                "reference_resolver: resolving single reference"
            );
            let id = target.id_by_reference(&reference).await?.ok_or_else(|| {
                ResolveError::NotFound {
                    entity: target.entity_name(),
                    references: vec![reference],
                }
            })?;
            Ok(ResolvedRef::One(id))
        }
        EntityRef::References(references) => {
            if references.is_empty() {
                return Ok(ResolvedRef::Many(Vec::new()));
            }
            debug!(
                entity = target.entity_name(),
                reference_count = references.len(),
                "reference_resolver: resolving reference list"
            );
            let found = target.ids_by_references(&references).await?;
            let by_reference: HashMap<&str, Uuid> = found
                .iter()
                .map(|(reference, id)| (reference.as_str(), *id))
                .collect();

            let missing: Vec<String> = references
                .iter()
                .filter(|reference| !by_reference.contains_key(reference.as_str()))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(ResolveError::NotFound {
                    entity: target.entity_name(),
                    references: missing,
                });
            }

            // Identifiers keep the caller's order, not query-result order.
            let ids = references
                .iter()
                .map(|reference| by_reference[reference.as_str()])
                .collect();
            Ok(ResolvedRef::Many(ids))
        }
        EntityRef::Inline(payload) => {
            debug!(
                entity = target.entity_name(),
                "reference_resolver: creating entity from inline payload"
            );
            let id = target.create_inline(payload).await?;
            Ok(ResolvedRef::One(id))
        }
    }
}

/// Resolves plan references for the subscription lifecycle engine.
pub struct PlanReferenceTarget<P>
where
    P: PlanRepository + Send + Sync + 'static,
{
    plan_repository: Arc<P>,
}

impl<P> PlanReferenceTarget<P>
where
    P: PlanRepository + Send + Sync + 'static,
{
    pub fn new(plan_repository: Arc<P>) -> Self {
        Self { plan_repository }
    }
}

#[async_trait]
impl<P> ReferenceTarget for PlanReferenceTarget<P>
where
    P: PlanRepository + Send + Sync + 'static,
{
    type CreatePayload = NewPlanModel;

    fn entity_name(&self) -> &'static str {
        "Plan"
    }

    async fn id_by_reference(&self, reference: &str) -> AnyResult<Option<Uuid>> {
        Ok(self
            .plan_repository
            .find_by_reference(reference)
            .await?
            .map(|plan| plan.id))
    }

    async fn ids_by_references(&self, references: &[String]) -> AnyResult<Vec<(String, Uuid)>> {
        Ok(self
            .plan_repository
            .find_by_references(references)
            .await?
            .into_iter()
            .map(|plan| (plan.reference, plan.id))
            .collect())
    }

    async fn create_inline(&self, payload: NewPlanModel) -> AnyResult<Uuid> {
        Ok(self.plan_repository.create(payload).await?.id)
    }
}

/// Resolves account references on user documents.
pub struct AccountReferenceTarget<A>
where
    A: AccountRepository + Send + Sync + 'static,
{
    account_repository: Arc<A>,
}

impl<A> AccountReferenceTarget<A>
where
    A: AccountRepository + Send + Sync + 'static,
{
    pub fn new(account_repository: Arc<A>) -> Self {
        Self { account_repository }
    }
}

#[async_trait]
impl<A> ReferenceTarget for AccountReferenceTarget<A>
where
    A: AccountRepository + Send + Sync + 'static,
{
    type CreatePayload = NewAccountModel;

    fn entity_name(&self) -> &'static str {
        "Account"
    }

    async fn id_by_reference(&self, reference: &str) -> AnyResult<Option<Uuid>> {
        Ok(self
            .account_repository
            .find_by_reference(reference)
            .await?
            .map(|account| account.id))
    }

    async fn ids_by_references(&self, references: &[String]) -> AnyResult<Vec<(String, Uuid)>> {
        let mut pairs = Vec::with_capacity(references.len());
        for reference in references {
            if let Some(account) = self.account_repository.find_by_reference(reference).await? {
                pairs.push((account.reference, account.id));
            }
        }
        Ok(pairs)
    }

    async fn create_inline(&self, payload: NewAccountModel) -> AnyResult<Uuid> {
        Ok(self.account_repository.create(payload).await?.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn unknown_single_reference_fails_with_the_attempted_reference() {
        let mut target = MockReferenceTarget::new();
        target.expect_entity_name().return_const("Plan");
        target
            .expect_id_by_reference()
            .with(eq("gold"))
            .returning(|_| Box::pin(async { Ok(None) }));

        let err = resolve_reference(&target, EntityRef::Reference("gold".to_string()))
            .await
            .unwrap_err();

        match err {
            ResolveError::NotFound { entity, references } => {
                assert_eq!(entity, "Plan");
                assert_eq!(references, vec!["gold".to_string()]);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn single_reference_resolves_to_the_entity_id() {
        let id = Uuid::new_v4();
        let mut target = MockReferenceTarget::new();
        target.expect_entity_name().return_const("Plan");
        target
            .expect_id_by_reference()
            .with(eq("gold"))
            .returning(move |_| Box::pin(async move { Ok(Some(id)) }));

        let resolved = resolve_reference(&target, EntityRef::Reference("gold".to_string()))
            .await
            .unwrap();

        assert_eq!(resolved, ResolvedRef::One(id));
    }

    #[tokio::test]
    async fn reference_list_preserves_input_order() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let mut target = MockReferenceTarget::new();
        target.expect_entity_name().return_const("Plan");
        // The store answers in its own order; the resolver must not.
        target.expect_ids_by_references().returning(move |_| {
            Box::pin(async move {
                Ok(vec![
                    ("silver".to_string(), second),
                    ("gold".to_string(), first),
                ])
            })
        });

        let resolved = resolve_reference(
            &target,
            EntityRef::References(vec!["gold".to_string(), "silver".to_string()]),
        )
        .await
        .unwrap();

        assert_eq!(resolved, ResolvedRef::Many(vec![first, second]));
    }

    #[tokio::test]
    async fn partial_reference_list_match_lists_every_missing_reference() {
        let found = Uuid::new_v4();
        let mut target = MockReferenceTarget::new();
        target.expect_entity_name().return_const("Plan");
        target.expect_ids_by_references().returning(move |_| {
            Box::pin(async move { Ok(vec![("gold".to_string(), found)]) })
        });

        let err = resolve_reference(
            &target,
            EntityRef::References(vec![
                "gold".to_string(),
                "silver".to_string(),
                "bronze".to_string(),
            ]),
        )
        .await
        .unwrap_err();

        match err {
            ResolveError::NotFound { references, .. } => {
                assert_eq!(
                    references,
                    vec!["silver".to_string(), "bronze".to_string()]
                );
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_reference_list_resolves_without_querying() {
        let mut target = MockReferenceTarget::new();
        target.expect_entity_name().return_const("Plan");
        target.expect_ids_by_references().never();

        let resolved = resolve_reference(&target, EntityRef::References(Vec::new()))
            .await
            .unwrap();

        assert_eq!(resolved, ResolvedRef::Many(Vec::new()));
    }

    #[tokio::test]
    async fn inline_payload_always_creates() {
        let created = Uuid::new_v4();
        let mut target = MockReferenceTarget::new();
        target.expect_entity_name().return_const("Plan");
        target.expect_id_by_reference().never();
        target
            .expect_create_inline()
            .times(1)
            .returning(move |_| Box::pin(async move { Ok(created) }));

        let payload = NewPlanModel {
            reference: "gold".to_string(),
            name: Some("Gold".to_string()),
            price_minor: Some(990),
            is_active: None,
        };
        let resolved = resolve_reference(&target, EntityRef::Inline(payload))
            .await
            .unwrap();

        assert_eq!(resolved, ResolvedRef::One(created));
    }
}
