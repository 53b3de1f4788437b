//! Allow/deny decision for a whole action

use crate::error::{GuardError, Result};
use crate::table::PermissionTable;
use tracing::debug;

/// Pass `item` through if any of `roles` may perform `action`.
///
/// A role may perform an action if it holds the bare action rule or any
/// field rule for it. Unknown actions and unknown roles deny.
pub fn ensure_allowed<U, I, S, T>(
    table: &PermissionTable<U, I>,
    roles: &[S],
    action: &str,
    item: T,
) -> Result<T>
where
    S: AsRef<str>,
{
    if table.permits(roles, action) {
        debug!("Action '{}' allowed", action);
        Ok(item)
    } else {
        debug!("Action '{}' denied", action);
        Err(GuardError::not_permitted(action))
    }
}
