//! Core guard types

use crate::error::{GuardError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Role identifier
pub type RoleName = String;

/// Action identifier; any string is a legal action
pub type ActionName = String;

/// Role held by requests without an authenticated user
pub const GUEST: &str = "guest";

/// Role held by every request with an authenticated user
pub const AUTHENTICATED: &str = "authenticated";

/// Separator between action and field path in a rule
pub const RULE_SEPARATOR: char = ':';

/// A single grant: a bare action (`"delete"`) or an action scoped to one
/// field path (`"read:address.city"`).
///
/// Matching works on the whole rule string, so an action may itself
/// contain `:`. The rule `"a:b:c"` permits both `a` (field `b:c`) and
/// `a:b` (field `c`), and `"read:email"` also permits the action
/// `read:email`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionRule {
    raw: String,
}

impl PermissionRule {
    /// Create a bare action rule
    pub fn action(action: impl Into<String>) -> Self {
        Self { raw: action.into() }
    }

    /// Create a field-scoped rule
    pub fn field(action: impl AsRef<str>, field: impl AsRef<str>) -> Self {
        Self {
            raw: format!("{}{}{}", action.as_ref(), RULE_SEPARATOR, field.as_ref()),
        }
    }

    /// Parse `action` or `action:field.path`
    pub fn parse(rule: &str) -> Result<Self> {
        if rule.is_empty() {
            return Err(GuardError::Configuration(
                "Permission rule cannot be empty".to_string(),
            ));
        }

        if rule.starts_with(RULE_SEPARATOR) {
            return Err(GuardError::Configuration(format!(
                "Permission rule '{}' has an empty action",
                rule
            )));
        }

        Ok(Self {
            raw: rule.to_string(),
        })
    }

    /// The rule as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Action part up to the first `:`
    pub fn action_name(&self) -> &str {
        match self.raw.split_once(RULE_SEPARATOR) {
            Some((action, _)) => action,
            None => &self.raw,
        }
    }

    /// True if the rule is `action` itself or starts with `action:`
    pub fn permits(&self, action: &str) -> bool {
        self.raw == action || self.field_for(action).is_some()
    }

    /// Field path this rule grants for `action`
    pub fn field_for(&self, action: &str) -> Option<&str> {
        self.raw
            .strip_prefix(action)
            .and_then(|rest| rest.strip_prefix(RULE_SEPARATOR))
    }
}

impl fmt::Display for PermissionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PermissionRule {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for PermissionRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PermissionRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_action() {
        let rule = PermissionRule::parse("delete").unwrap();
        assert_eq!(rule, PermissionRule::action("delete"));
        assert!(rule.permits("delete"));
        assert!(!rule.permits("del"));
        assert_eq!(rule.field_for("delete"), None);
    }

    #[test]
    fn test_parse_field_rule() {
        let rule: PermissionRule = "read:address.city".parse().unwrap();
        assert_eq!(rule.action_name(), "read");
        assert_eq!(rule.as_str(), "read:address.city");
        assert!(rule.permits("read"));
        assert_eq!(rule.field_for("read"), Some("address.city"));
        assert_eq!(rule.field_for("update"), None);
        assert_eq!(rule.to_string(), "read:address.city");
    }

    #[test]
    fn test_prefix_of_action_is_not_a_match() {
        let rule = PermissionRule::parse("readAll:email").unwrap();
        assert!(!rule.permits("read"));
        assert_eq!(rule.field_for("read"), None);
    }

    #[test]
    fn test_action_containing_separator() {
        let rule = PermissionRule::parse("read:email").unwrap();
        assert!(rule.permits("read:email"));
        assert_eq!(rule.field_for("read:email"), None);

        let nested = PermissionRule::parse("a:b:c").unwrap();
        assert!(nested.permits("a"));
        assert_eq!(nested.field_for("a"), Some("b:c"));
        assert!(nested.permits("a:b"));
        assert_eq!(nested.field_for("a:b"), Some("c"));
        assert!(nested.permits("a:b:c"));
        assert_eq!(nested.field_for("a:b:c"), None);
        assert!(!nested.permits("a:"));
    }

    #[test]
    fn test_invalid_rules() {
        assert!(PermissionRule::parse("").is_err());
        assert!(PermissionRule::parse(":email").is_err());
    }

    #[test]
    fn test_rule_serde() {
        let rules: Vec<PermissionRule> =
            serde_json::from_str(r#"["create:firstName", "delete"]"#).unwrap();
        assert_eq!(rules[0], PermissionRule::field("create", "firstName"));
        assert_eq!(rules[1], PermissionRule::action("delete"));
        assert_eq!(
            serde_json::to_string(&rules).unwrap(),
            r#"["create:firstName","delete"]"#
        );

        assert!(serde_json::from_str::<Vec<PermissionRule>>(r#"[""]"#).is_err());
    }
}
