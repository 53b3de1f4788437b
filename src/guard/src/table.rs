//! Permission table: role predicates plus per-role action rules

use crate::error::{BoxError, GuardError, Result};
use crate::flatten::Flattener;
use crate::types::{PermissionRule, RoleName, AUTHENTICATED, GUEST};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Decides whether the acting user holds a custom role for an item.
///
/// Predicates are assumed independent of each other and may do I/O
/// (ownership lookups and the like). An `Err` fails the whole role
/// resolution with that error.
#[async_trait]
pub trait RolePredicate<U, I>: Send + Sync {
    /// Whether `user` holds the role for `item`
    async fn has_role(&self, user: &U, item: Option<&I>) -> std::result::Result<bool, BoxError>;
}

/// Adapts a synchronous closure into a [`RolePredicate`]
pub struct FnPredicate<F>(F);

impl<F> FnPredicate<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<U, I, F> RolePredicate<U, I> for FnPredicate<F>
where
    U: Sync,
    I: Sync,
    F: Fn(&U, Option<&I>) -> std::result::Result<bool, BoxError> + Send + Sync,
{
    async fn has_role(&self, user: &U, item: Option<&I>) -> std::result::Result<bool, BoxError> {
        (self.0)(user, item)
    }
}

/// Serializable part of a permission table: the action rules per role.
///
/// ```json
/// { "actions": { "guest": ["create:email"], "owner": ["read:email", "delete"] } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// Rules per role name
    #[serde(default)]
    pub actions: HashMap<RoleName, Vec<PermissionRule>>,
}

impl PermissionsConfig {
    /// Parse a JSON permissions document
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Read a JSON permissions document from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Convert an already parsed document
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(GuardError::Configuration(
                "permissions must be an object".to_string(),
            ));
        }

        serde_json::from_value(value).map_err(|e| GuardError::Configuration(e.to_string()))
    }
}

/// Immutable permission table shared by every session of a guard
pub struct PermissionTable<U, I> {
    /// Custom roles in declaration order
    roles: Vec<(RoleName, Arc<dyn RolePredicate<U, I>>)>,

    /// Rules per role name (custom or built-in)
    actions: HashMap<RoleName, Vec<PermissionRule>>,

    /// Path syntax shared by field rules and filtered documents
    flattener: Flattener,
}

impl<U, I> PermissionTable<U, I> {
    /// Start building a table
    pub fn builder() -> PermissionTableBuilder<U, I> {
        PermissionTableBuilder::new()
    }

    /// Custom role names in declaration order
    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|(name, _)| name.as_str())
    }

    pub(crate) fn predicates(&self) -> &[(RoleName, Arc<dyn RolePredicate<U, I>>)] {
        &self.roles
    }

    /// Flattener used to project documents onto field rules
    pub fn flattener(&self) -> &Flattener {
        &self.flattener
    }

    /// Rules granted to `role`; empty for unknown roles
    pub fn rules_for(&self, role: &str) -> &[PermissionRule] {
        self.actions.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if any of `roles` has `action` bare or field-scoped
    pub fn permits<S: AsRef<str>>(&self, roles: &[S], action: &str) -> bool {
        roles
            .iter()
            .flat_map(|role| self.rules_for(role.as_ref()))
            .any(|rule| rule.permits(action))
    }

    /// Union of field paths granted for `action` across `roles`
    pub fn fields_for<S: AsRef<str>>(&self, roles: &[S], action: &str) -> BTreeSet<&str> {
        roles
            .iter()
            .flat_map(|role| self.rules_for(role.as_ref()))
            .filter_map(|rule| rule.field_for(action))
            .collect()
    }
}

impl<U, I> fmt::Debug for PermissionTable<U, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionTable")
            .field("roles", &self.role_names().collect::<Vec<_>>())
            .field("actions", &self.actions)
            .field("flattener", &self.flattener)
            .finish()
    }
}

/// Builder for [`PermissionTable`].
///
/// Rule parse errors are collected and reported by [`build`](Self::build).
pub struct PermissionTableBuilder<U, I> {
    roles: Vec<(RoleName, Arc<dyn RolePredicate<U, I>>)>,
    actions: HashMap<RoleName, Vec<PermissionRule>>,
    flattener: Flattener,
    error: Option<GuardError>,
}

impl<U, I> Default for PermissionTableBuilder<U, I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U, I> PermissionTableBuilder<U, I> {
    pub fn new() -> Self {
        Self {
            roles: Vec::new(),
            actions: HashMap::new(),
            flattener: Flattener::new(),
            error: None,
        }
    }

    /// Declare a custom role backed by an async predicate
    pub fn role<P>(mut self, name: impl Into<String>, predicate: P) -> Self
    where
        P: RolePredicate<U, I> + 'static,
    {
        let predicate: Arc<dyn RolePredicate<U, I>> = Arc::new(predicate);
        self.roles.push((name.into(), predicate));
        self
    }

    /// Declare a custom role backed by a synchronous closure
    pub fn role_fn<F>(self, name: impl Into<String>, predicate: F) -> Self
    where
        U: Sync + 'static,
        I: Sync + 'static,
        F: Fn(&U, Option<&I>) -> std::result::Result<bool, BoxError> + Send + Sync + 'static,
    {
        self.role(name, FnPredicate::new(predicate))
    }

    /// Grant rules to a role, e.g. `["read:email", "delete"]`
    pub fn allow<R, S>(mut self, role: impl Into<String>, rules: R) -> Self
    where
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let role = role.into();
        for raw in rules {
            match PermissionRule::parse(raw.as_ref()) {
                Ok(rule) => self.actions.entry(role.clone()).or_default().push(rule),
                Err(e) => {
                    self.error.get_or_insert(e);
                }
            }
        }
        self
    }

    /// Path syntax for field rules, e.g. `Flattener::new().with_delimiter('/')`
    /// for rules like `read:address/city`
    pub fn flattener(mut self, flattener: Flattener) -> Self {
        self.flattener = flattener;
        self
    }

    /// Merge the rules of a permissions document
    pub fn actions(mut self, config: PermissionsConfig) -> Self {
        for (role, rules) in config.actions {
            self.actions.entry(role).or_default().extend(rules);
        }
        self
    }

    /// Merge rules from a JSON permissions document
    pub fn actions_from_json(self, json: &str) -> Result<Self> {
        Ok(self.actions(PermissionsConfig::from_json(json)?))
    }

    /// Merge rules from an already parsed permissions document
    pub fn actions_from_value(self, value: Value) -> Result<Self> {
        Ok(self.actions(PermissionsConfig::from_value(value)?))
    }

    /// Merge rules from a JSON permissions file
    pub fn actions_from_file(self, path: impl AsRef<Path>) -> Result<Self> {
        Ok(self.actions(PermissionsConfig::from_file(path)?))
    }

    /// Validate and freeze the table
    pub fn build(self) -> Result<PermissionTable<U, I>> {
        if let Some(e) = self.error {
            return Err(e);
        }

        let mut seen = BTreeSet::new();
        for (name, _) in &self.roles {
            if name.is_empty() {
                return Err(GuardError::Configuration(
                    "Role name cannot be empty".to_string(),
                ));
            }

            if name == GUEST || name == AUTHENTICATED {
                return Err(GuardError::Configuration(format!(
                    "Role '{}' is built in and cannot have a predicate",
                    name
                )));
            }

            if !seen.insert(name.as_str()) {
                return Err(GuardError::Configuration(format!(
                    "Duplicate role: {}",
                    name
                )));
            }
        }

        info!(
            "PermissionTable built with {} custom roles, rules for {} roles",
            self.roles.len(),
            self.actions.len()
        );

        Ok(PermissionTable {
            roles: self.roles,
            actions: self.actions,
            flattener: self.flattener,
        })
    }
}
