//! Visibility rules for purchase records

use crate::models::Caller;

/// Resolve which owners' records a caller may read
///
/// Non-privileged callers are always confined to their own records, whatever
/// was requested. Privileged callers get exactly what they asked for; an
/// empty list means no restriction.
pub fn allowed_user_ids(caller: &Caller, requested: &[i64]) -> Vec<i64> {
    if caller.role.is_privileged() {
        requested.to_vec()
    } else {
        vec![caller.user_id]
    }
}
