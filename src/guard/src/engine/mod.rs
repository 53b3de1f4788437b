//! Guard factory and per-request sessions
//!
//! A [`Guard`] wraps one immutable [`PermissionTable`] and hands out a
//! [`Session`] per (user, item) pair. Every session operation awaits the
//! same memoized role resolution:
//!
//! ```text
//! Guard ──session(user, item)──▶ Session
//!                                  │
//!                    ┌─────────────┼──────────────┐
//!              resolve_roles  ensure_allowed    filter
//!                    └──────▶ [OnceCell<Resolution>] ◀──┘
//!                                  │ (first caller only)
//!                             RoleResolver
//! ```

pub mod access;
pub mod projection;

use crate::error::{GuardError, Result};
use crate::roles::{Resolution, RoleResolver};
use crate::table::PermissionTable;
use crate::types::RoleName;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Session factory over a shared permission table
pub struct Guard<U, I> {
    table: Arc<PermissionTable<U, I>>,
}

impl<U, I> Guard<U, I> {
    /// Create a guard owning `table`
    pub fn new(table: PermissionTable<U, I>) -> Self {
        Self {
            table: Arc::new(table),
        }
    }

    /// Create a guard over a table shared with other owners
    pub fn from_shared(table: Arc<PermissionTable<U, I>>) -> Self {
        Self { table }
    }

    /// The guard's permission table
    pub fn table(&self) -> &PermissionTable<U, I> {
        &self.table
    }

    /// Open a session for one request.
    ///
    /// `None` as user means the request is unauthenticated. No predicate
    /// runs until the first session operation is awaited.
    pub fn session(&self, user: Option<U>, item: Option<I>) -> Session<U, I> {
        Session {
            table: Arc::clone(&self.table),
            user,
            item,
            roles: OnceCell::new(),
        }
    }
}

impl<U, I> Clone for Guard<U, I> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
        }
    }
}

impl<U, I> From<PermissionTable<U, I>> for Guard<U, I> {
    fn from(table: PermissionTable<U, I>) -> Self {
        Self::new(table)
    }
}

/// Authorization state of one request
pub struct Session<U, I> {
    table: Arc<PermissionTable<U, I>>,
    user: Option<U>,
    item: Option<I>,
    roles: OnceCell<Resolution>,
}

impl<U, I> Session<U, I>
where
    U: Sync,
    I: Sync,
{
    /// Acting user, if authenticated
    pub fn user(&self) -> Option<&U> {
        self.user.as_ref()
    }

    /// Item the request targets
    pub fn item(&self) -> Option<&I> {
        self.item.as_ref()
    }

    /// Resolve, once, the roles of this session.
    ///
    /// Callers arriving while resolution is in flight wait for it instead
    /// of starting another one. A predicate failure is memoized too.
    async fn resolution(&self) -> &Resolution {
        self.roles
            .get_or_init(|| async {
                RoleResolver::new(self.table.as_ref())
                    .resolve_roles(self.user.as_ref(), self.item.as_ref())
                    .await
            })
            .await
    }

    /// Roles held by this session
    pub async fn resolve_roles(&self) -> Result<&[RoleName]> {
        match self.resolution().await {
            Ok(roles) => Ok(roles.as_slice()),
            Err(failure) => Err(GuardError::Predicate(failure.clone())),
        }
    }

    /// Return `item` unchanged if the session may perform `action`,
    /// otherwise fail with [`GuardError::NotPermitted`]
    pub async fn ensure_allowed<T>(&self, action: &str, item: T) -> Result<T> {
        let roles = self.resolve_roles().await?;
        access::ensure_allowed(self.table.as_ref(), roles, action, item)
    }

    /// Like [`ensure_allowed`](Self::ensure_allowed) with the denial as `false`.
    /// Predicate failures are still errors.
    pub async fn is_allowed(&self, action: &str) -> Result<bool> {
        match self.ensure_allowed(action, ()).await {
            Ok(()) => Ok(true),
            Err(GuardError::NotPermitted { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Project `input` onto the fields this session may touch for `action`
    pub async fn filter(&self, action: &str, input: &Value) -> Result<Value> {
        let roles = self.resolve_roles().await?;
        projection::filter(self.table.as_ref(), roles, action, input)
    }

    /// [`filter`](Self::filter) for any serializable input
    pub async fn filter_serialized<T>(&self, action: &str, input: &T) -> Result<Value>
    where
        T: Serialize + ?Sized,
    {
        let roles = self.resolve_roles().await?;
        let value = serde_json::to_value(input)?;
        projection::filter(self.table.as_ref(), roles, action, &value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AUTHENTICATED, GUEST};
    use serde_json::json;

    fn guard() -> Guard<u32, u32> {
        PermissionTable::<u32, u32>::builder()
            .role_fn("owner", |user, item| Ok(item == Some(user)))
            .allow(GUEST, ["create:email"])
            .allow("owner", ["read:email", "delete"])
            .build()
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn test_session_accessors() {
        let session = guard().session(Some(1), Some(2));
        assert_eq!(session.user(), Some(&1));
        assert_eq!(session.item(), Some(&2));
    }

    #[tokio::test]
    async fn test_guest_session() {
        let session = guard().session(None, None);

        assert_eq!(session.resolve_roles().await.unwrap(), [GUEST]);
        assert!(session.is_allowed("create").await.unwrap());
        assert!(!session.is_allowed("delete").await.unwrap());
    }

    #[tokio::test]
    async fn test_owner_session() {
        let session = guard().session(Some(1), Some(1));

        assert_eq!(session.resolve_roles().await.unwrap(), [AUTHENTICATED, "owner"]);
        assert_eq!(session.ensure_allowed("delete", "doc-1").await.unwrap(), "doc-1");

        let filtered = session
            .filter("read", &json!({ "email": "a@b.c", "password": "secret" }))
            .await
            .unwrap();
        assert_eq!(filtered, json!({ "email": "a@b.c" }));
    }

    #[tokio::test]
    async fn test_filter_serialized() {
        #[derive(Serialize)]
        struct Signup<'a> {
            email: &'a str,
            password: &'a str,
        }

        let session = guard().session(None, None);
        let filtered = session
            .filter_serialized("create", &Signup { email: "a@b.c", password: "x" })
            .await
            .unwrap();

        assert_eq!(filtered, json!({ "email": "a@b.c" }));
    }
}
