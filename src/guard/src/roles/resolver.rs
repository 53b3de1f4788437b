//! Concurrent evaluation of custom role predicates

use crate::error::PredicateFailure;
use crate::table::PermissionTable;
use crate::types::{RoleName, AUTHENTICATED, GUEST};
use futures::future::try_join_all;
use tracing::{debug, warn};

/// Outcome of one role resolution
pub type Resolution = std::result::Result<Vec<RoleName>, PredicateFailure>;

/// Resolves the roles of a request against a permission table
pub struct RoleResolver<'a, U, I> {
    table: &'a PermissionTable<U, I>,
}

impl<'a, U, I> RoleResolver<'a, U, I>
where
    U: Sync,
    I: Sync,
{
    pub fn new(table: &'a PermissionTable<U, I>) -> Self {
        Self { table }
    }

    /// Resolve the roles `user` holds for `item`.
    ///
    /// All predicates are polled concurrently. The custom part of the
    /// result keeps declaration order whatever order predicates finish in.
    /// On the first predicate error the remaining checks are dropped and
    /// that error is returned.
    pub async fn resolve_roles(&self, user: Option<&U>, item: Option<&I>) -> Resolution {
        let Some(user) = user else {
            debug!("No authenticated user, resolved roles: [{}]", GUEST);
            return Ok(vec![GUEST.to_string()]);
        };

        let checks = self
            .table
            .predicates()
            .iter()
            .map(|(name, predicate)| async move {
                match predicate.has_role(user, item).await {
                    Ok(held) => Ok(held.then(|| name.clone())),
                    Err(error) => {
                        warn!("Role predicate '{}' failed: {}", name, error);
                        Err(PredicateFailure::new(name.as_str(), error))
                    }
                }
            });

        let custom = try_join_all(checks).await?;

        let mut roles = Vec::with_capacity(custom.len() + 1);
        roles.push(AUTHENTICATED.to_string());
        roles.extend(custom.into_iter().flatten());

        debug!("Resolved roles: {:?}", roles);
        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::table::RolePredicate;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;

    #[derive(Debug, thiserror::Error)]
    #[error("lookup failed")]
    struct LookupFailed;

    /// Answers after a delay so completion order differs from declaration order
    struct Delayed {
        delay: Duration,
        answer: bool,
    }

    #[async_trait]
    impl RolePredicate<u32, u32> for Delayed {
        async fn has_role(&self, _user: &u32, _item: Option<&u32>) -> Result<bool, BoxError> {
            tokio::time::sleep(self.delay).await;
            Ok(self.answer)
        }
    }

    /// Blocks until every other predicate sharing the barrier has started
    struct Rendezvous(Arc<Barrier>);

    #[async_trait]
    impl RolePredicate<u32, u32> for Rendezvous {
        async fn has_role(&self, _user: &u32, _item: Option<&u32>) -> Result<bool, BoxError> {
            self.0.wait().await;
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_guest_skips_predicates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let table = PermissionTable::<u32, u32>::builder()
            .role_fn("owner", move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            })
            .build()
            .unwrap();

        let roles = RoleResolver::new(&table).resolve_roles(None, Some(&1)).await.unwrap();

        assert_eq!(roles, vec![GUEST.to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_authenticated_with_matching_roles() {
        let table = PermissionTable::<u32, u32>::builder()
            .role_fn("owner", |user, item| Ok(item == Some(user)))
            .role_fn("admin", |user, _| Ok(*user == 0))
            .build()
            .unwrap();
        let resolver = RoleResolver::new(&table);

        let owner = resolver.resolve_roles(Some(&1), Some(&1)).await.unwrap();
        assert_eq!(owner, vec!["authenticated", "owner"]);

        let unrelated = resolver.resolve_roles(Some(&2), Some(&1)).await.unwrap();
        assert_eq!(unrelated, vec!["authenticated"]);

        let admin = resolver.resolve_roles(Some(&0), None).await.unwrap();
        assert_eq!(admin, vec!["authenticated", "admin"]);
    }

    #[tokio::test]
    async fn test_declaration_order_survives_completion_order() {
        let table = PermissionTable::<u32, u32>::builder()
            .role("slow", Delayed { delay: Duration::from_millis(30), answer: true })
            .role("never", Delayed { delay: Duration::from_millis(1), answer: false })
            .role("fast", Delayed { delay: Duration::from_millis(1), answer: true })
            .build()
            .unwrap();

        let roles = RoleResolver::new(&table).resolve_roles(Some(&7), None).await.unwrap();
        assert_eq!(roles, vec!["authenticated", "slow", "fast"]);
    }

    #[tokio::test]
    async fn test_predicates_run_concurrently() {
        let barrier = Arc::new(Barrier::new(3));
        let table = PermissionTable::<u32, u32>::builder()
            .role("a", Rendezvous(barrier.clone()))
            .role("b", Rendezvous(barrier.clone()))
            .role("c", Rendezvous(barrier))
            .build()
            .unwrap();

        let resolution = tokio::time::timeout(
            Duration::from_secs(5),
            RoleResolver::new(&table).resolve_roles(Some(&1), None),
        )
        .await
        .expect("predicates were evaluated one after another");

        assert_eq!(resolution.unwrap(), vec!["authenticated", "a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_failing_predicate_fails_resolution() {
        let table = PermissionTable::<u32, u32>::builder()
            .role_fn("owner", |_, _| Ok(true))
            .role_fn("auditor", |_, _| Err(Box::new(LookupFailed) as BoxError))
            .build()
            .unwrap();

        let failure = RoleResolver::new(&table)
            .resolve_roles(Some(&1), Some(&1))
            .await
            .unwrap_err();

        assert_eq!(failure.role(), "auditor");
        assert_eq!(failure.to_string(), "lookup failed");
        assert!(failure.downcast_ref::<LookupFailed>().is_some());
    }
}
