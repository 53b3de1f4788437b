//! Field-level projection of input documents

use crate::error::{GuardError, Result};
use crate::flatten::Flattener;
use crate::table::PermissionTable;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// Keep only the fields of `input` that `roles` may touch for `action`.
///
/// Field grants come from `action:field.path` rules only; a bare `action`
/// rule grants no fields. With no field grants at all the projection is
/// denied, even for an empty input.
pub fn filter<U, I, S>(
    table: &PermissionTable<U, I>,
    roles: &[S],
    action: &str,
    input: &Value,
) -> Result<Value>
where
    S: AsRef<str>,
{
    let fields = table.fields_for(roles, action);
    if fields.is_empty() {
        debug!("No fields granted for action '{}'", action);
        return Err(GuardError::not_permitted(action));
    }

    let projected = project(table.flattener(), &fields, input);
    debug!(
        "Projected '{}' input onto {} granted field paths",
        action,
        fields.len()
    );
    Ok(projected)
}

/// Select the leaves of `input` whose full path is in `fields`.
///
/// Paths match literally: granting `address` selects a leaf named
/// `address`, not the nested object's leaves. Granted paths missing from
/// the input are ignored.
pub fn project(flattener: &Flattener, fields: &BTreeSet<&str>, input: &Value) -> Value {
    let selected = flattener
        .leaves(input)
        .into_iter()
        .filter(|(path, _)| fields.contains(path.as_str()))
        .map(|(path, leaf)| (path, leaf.clone()));

    flattener.unflatten(selected)
}
