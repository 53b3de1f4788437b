//! # CretoAI Guard
//!
//! Per-request authorization guard: resolves the roles an acting user holds
//! for an item, checks whole actions, and projects input documents down to
//! the fields those roles may touch.
//!
//! ## Features
//!
//! - **Built-in roles**: `guest` without a user, `authenticated` with one
//! - **Custom roles** decided by async predicates, evaluated concurrently
//! - **Rules** of the form `action` or `action:field.path`
//! - **Field projection** along dotted paths, preserving document shape
//! - **Memoized sessions**: predicates run at most once per request
//!
//! ## Example
//!
//! ```rust
//! use cretoai_guard::{Guard, PermissionTable, GUEST};
//! use serde_json::json;
//!
//! #[derive(Debug)]
//! struct User {
//!     id: u64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let table = PermissionTable::<User, User>::builder()
//!         .role_fn("owner", |user, item| Ok(item.map_or(false, |item| item.id == user.id)))
//!         .allow(GUEST, ["create:email", "create:password"])
//!         .allow("owner", ["read:email", "delete"])
//!         .build()?;
//!
//!     let guard = Guard::new(table);
//!
//!     let session = guard.session(Some(User { id: 1 }), Some(User { id: 1 }));
//!     session.ensure_allowed("delete", ()).await?;
//!
//!     let visible = session
//!         .filter("read", &json!({ "email": "max@example.com", "password": "secret" }))
//!         .await?;
//!     assert_eq!(visible, json!({ "email": "max@example.com" }));
//!
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod error;
pub mod flatten;
pub mod table;
pub mod roles;
pub mod engine;

// Re-export commonly used types
pub use types::{ActionName, PermissionRule, RoleName, AUTHENTICATED, GUEST};
pub use error::{BoxError, GuardError, PredicateFailure, Result};
pub use flatten::Flattener;
pub use table::{FnPredicate, PermissionTable, PermissionTableBuilder, PermissionsConfig, RolePredicate};
pub use roles::RoleResolver;
pub use engine::{Guard, Session};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
