//! User profile guard
//!
//! Loads action rules from a JSON document, registers an async ownership
//! check, and walks a few requests through the guard.
//!
//! Run with `RUST_LOG=cretoai_guard=debug cargo run --example user_profile`.

use async_trait::async_trait;
use cretoai_guard::{BoxError, Guard, PermissionTable, RolePredicate};
use serde_json::json;
use tracing::info;

#[derive(Debug, Clone)]
struct User {
    id: u64,
}

#[derive(Debug, Clone)]
struct Profile {
    owner_id: u64,
}

/// Ownership lookup; a real service would ask its datastore
struct IsOwner;

#[async_trait]
impl RolePredicate<User, Profile> for IsOwner {
    async fn has_role(&self, user: &User, item: Option<&Profile>) -> Result<bool, BoxError> {
        tokio::task::yield_now().await;
        Ok(item.map_or(false, |profile| profile.owner_id == user.id))
    }
}

const PERMISSIONS: &str = r#"{
    "actions": {
        "guest": ["create:firstName", "create:email", "create:password"],
        "owner": ["read:firstName", "read:email", "read:address.city", "update:email", "delete"]
    }
}"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let guard = Guard::new(
        PermissionTable::<User, Profile>::builder()
            .role("owner", IsOwner)
            .actions_from_json(PERMISSIONS)?
            .build()?,
    );

    let signup = json!({ "firstName": "Max", "email": "max@example.com", "isAdmin": true });
    let created = guard.session(None, None).filter("create", &signup).await?;
    info!("Guest signup accepted as {}", created);

    let profile = Profile { owner_id: 1 };
    let stored = json!({
        "firstName": "Max",
        "email": "max@example.com",
        "password": "hash",
        "address": { "city": "Berlin", "street": "Somewhere Street 61" }
    });

    let owner = guard.session(Some(User { id: 1 }), Some(profile.clone()));
    info!("Owner roles: {:?}", owner.resolve_roles().await?);
    info!("Owner sees {}", owner.filter("read", &stored).await?);
    owner.ensure_allowed("delete", &profile).await?;
    info!("Owner may delete the profile");

    let stranger = guard.session(Some(User { id: 2 }), Some(profile));
    match stranger.filter("read", &stored).await {
        Ok(visible) => info!("Stranger sees {}", visible),
        Err(e) if e.is_not_permitted() => info!("Stranger denied: {}", e),
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
