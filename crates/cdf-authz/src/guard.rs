use crate::RoleSet;
use serde::{Deserialize, Serialize};

/// Decide whether a caller holding `caller` may reach a resource requiring
/// `required`.
///
/// An empty requirement is unrestricted. Otherwise the caller needs at least
/// one of the required roles, so a caller with no roles is denied anything
/// restricted. Denial is an ordinary `false`, not an error.
///
/// ```rust
/// use cdf_authz::{Role, RoleSet, is_allowed};
///
/// let caller = RoleSet::from_iter([Role::Auditor]);
/// assert!(is_allowed(&caller, &RoleSet::new()));
/// assert!(!is_allowed(&RoleSet::new(), &caller));
/// ```
pub fn is_allowed(caller: &RoleSet, required: &RoleSet) -> bool {
    required.is_empty() || caller.intersects(required)
}

/// Outcome of a registry lookup plus the access predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub path: String,
    pub allowed: bool,
    /// `false` when the path has no registry entry and was let through by the
    /// open default.
    pub registered: bool,
    pub required_roles: RoleSet,
}
