//! Static role-to-route registry.
//!
//! # Purpose
//! Maps application route paths to the roles allowed to open them, with a
//! short description used by navigation listings.
//!
//! # Key invariants
//! - Built once (usually via [`RouteRegistry::default`]) and never mutated.
//! - Lookups are exact on the normalized path; there is no prefix matching.
//! - Unregistered paths require no role. This open default is deliberate
//!   legacy behavior and is reported through [`AccessDecision::registered`].
use crate::role::groups::{ADMIN, ALL_INTERNAL, COMMUNITY, FINANCE, OVERSIGHT, PROJECT};
use crate::{AccessDecision, Role, RoleSet, is_allowed};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub path: String,
    pub roles: RoleSet,
    pub description: String,
}

impl RouteEntry {
    pub fn new(path: &str, roles: &[Role], description: &str) -> Self {
        Self {
            path: normalize_path(path),
            roles: roles.iter().copied().collect(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteRegistry {
    entries: BTreeMap<String, RouteEntry>,
}

impl RouteRegistry {
    pub fn from_entries(entries: impl IntoIterator<Item = RouteEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.path.clone(), entry))
                .collect(),
        }
    }

    pub fn lookup(&self, path: &str) -> Option<&RouteEntry> {
        self.entries.get(&normalize_path(path))
    }

    /// Roles required for `path`; empty when the path is not registered.
    pub fn required_roles(&self, path: &str) -> RoleSet {
        self.lookup(path)
            .map(|entry| entry.roles.clone())
            .unwrap_or_default()
    }

    pub fn decide(&self, caller: &RoleSet, path: &str) -> AccessDecision {
        let path = normalize_path(path);
        let (registered, required_roles) = match self.entries.get(&path) {
            Some(entry) => (true, entry.roles.clone()),
            None => (false, RoleSet::new()),
        };
        AccessDecision {
            allowed: is_allowed(caller, &required_roles),
            path,
            registered,
            required_roles,
        }
    }

    /// Registered routes the caller may open, in path order.
    pub fn accessible<'a>(&'a self, caller: &'a RoleSet) -> impl Iterator<Item = &'a RouteEntry> {
        self.entries
            .values()
            .filter(move |entry| is_allowed(caller, &entry.roles))
    }

    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RouteRegistry {
    fn default() -> Self {
        let cdfc = [
            Role::SuperAdmin,
            Role::CdfcChair,
            Role::CdfcMember,
            Role::Plgo,
            Role::MinistryOfficial,
            Role::Mp,
        ];
        let tac = [
            Role::SuperAdmin,
            Role::TacChair,
            Role::TacMember,
            Role::Plgo,
            Role::MinistryOfficial,
        ];
        let plgo = [Role::SuperAdmin, Role::Plgo, Role::MinistryOfficial];
        let command_center = [Role::SuperAdmin, Role::MinistryOfficial, Role::Auditor];
        let procurement = [
            Role::SuperAdmin,
            Role::MinistryOfficial,
            Role::Plgo,
            Role::CdfcChair,
            Role::FinanceOfficer,
        ];
        let grants = [
            Role::SuperAdmin,
            Role::MinistryOfficial,
            Role::Plgo,
            Role::CdfcChair,
            Role::CdfcMember,
            Role::Mp,
        ];
        let audits = [Role::SuperAdmin, Role::Auditor, Role::MinistryOfficial];
        let reports: Vec<Role> = OVERSIGHT
            .iter()
            .copied()
            .chain([Role::FinanceOfficer])
            .collect();

        Self::from_entries([
            RouteEntry::new("/", ALL_INTERNAL, "Dashboard"),
            RouteEntry::new("/ai-knowledge", ALL_INTERNAL, "AI Knowledge Centre"),
            RouteEntry::new("/ai-chat", ALL_INTERNAL, "AI Assistant"),
            RouteEntry::new("/ward-intake", COMMUNITY, "Ward Intake"),
            RouteEntry::new("/cdfc", &cdfc, "CDFC Workspace"),
            RouteEntry::new("/tac", &tac, "TAC Workspace"),
            RouteEntry::new("/plgo", &plgo, "PLGO Workspace"),
            RouteEntry::new("/ministry", ADMIN, "Ministry Dashboard"),
            RouteEntry::new("/command-center", &command_center, "Command Center"),
            RouteEntry::new("/projects", PROJECT, "Projects"),
            RouteEntry::new("/project-workflow", PROJECT, "Project Workflow"),
            RouteEntry::new("/procurement", &procurement, "Procurement"),
            RouteEntry::new("/financial", FINANCE, "Financial Management"),
            RouteEntry::new("/expenditure", FINANCE, "Expenditure"),
            RouteEntry::new("/payments", FINANCE, "Payments"),
            RouteEntry::new("/empowerment", &grants, "Empowerment Grants"),
            RouteEntry::new("/bursaries", &grants, "Bursaries"),
            RouteEntry::new("/monitoring", OVERSIGHT, "Monitoring & Evaluation"),
            RouteEntry::new("/legal", OVERSIGHT, "Legal & Compliance"),
            RouteEntry::new("/audits", &audits, "Audits"),
            RouteEntry::new("/users", ADMIN, "User Management"),
            RouteEntry::new("/admin", ADMIN, "Administration"),
            RouteEntry::new("/billing", ADMIN, "Billing"),
            RouteEntry::new("/integrations", ADMIN, "Integrations"),
            RouteEntry::new("/system-health", ADMIN, "System Health"),
            RouteEntry::new("/security", ADMIN, "Security"),
            RouteEntry::new("/reports", &reports, "Reports"),
        ])
    }
}

/// Normalize a route path for registry lookup.
///
/// Drops any query string, ensures a leading `/`, and trims trailing slashes
/// (the root path stays `/`).
pub fn normalize_path(path: &str) -> String {
    let path = path.trim();
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_variants() {
        assert_eq!(normalize_path("/payments/"), "/payments");
        assert_eq!(normalize_path("payments"), "/payments");
        assert_eq!(normalize_path("/payments?tab=pending"), "/payments");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("  /users  "), "/users");
    }

    #[test]
    fn default_table_is_complete() {
        let registry = RouteRegistry::default();
        assert_eq!(registry.len(), 27);
        for entry in registry.entries() {
            assert!(!entry.roles.is_empty(), "{} has no roles", entry.path);
            assert!(!entry.description.is_empty());
        }
    }

    #[test]
    fn finance_officer_reaches_payments_not_users() {
        let registry = RouteRegistry::default();
        let caller = RoleSet::from_iter([Role::FinanceOfficer]);
        let decision = registry.decide(&caller, "/payments");
        assert!(decision.allowed);
        assert!(decision.registered);
        assert!(!registry.decide(&caller, "/users").allowed);
    }

    #[test]
    fn reports_include_finance_officer() {
        let registry = RouteRegistry::default();
        let roles = registry.required_roles("/reports");
        assert!(roles.contains(Role::FinanceOfficer));
        assert!(roles.contains(Role::Auditor));
        assert!(!roles.contains(Role::Mp));
    }

    #[test]
    fn unregistered_path_is_open() {
        let registry = RouteRegistry::default();
        let decision = registry.decide(&RoleSet::new(), "/not-a-route");
        assert!(decision.allowed);
        assert!(!decision.registered);
        assert!(decision.required_roles.is_empty());
    }

    #[test]
    fn caller_without_roles_denied_dashboard() {
        let registry = RouteRegistry::default();
        let decision = registry.decide(&RoleSet::new(), "/");
        assert!(!decision.allowed);
        assert!(decision.registered);
    }

    #[test]
    fn citizen_has_no_internal_routes() {
        let registry = RouteRegistry::default();
        let citizen = RoleSet::from_iter([Role::Citizen]);
        assert_eq!(registry.accessible(&citizen).count(), 0);
    }

    #[test]
    fn super_admin_reaches_everything() {
        let registry = RouteRegistry::default();
        let admin = RoleSet::from_iter([Role::SuperAdmin]);
        assert_eq!(registry.accessible(&admin).count(), registry.len());
    }
}
