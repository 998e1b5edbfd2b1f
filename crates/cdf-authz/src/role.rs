//! Role tags and role groups.
//!
//! # Purpose
//! Defines the fixed role vocabulary of the platform and the named groups the
//! route registry is assembled from.
//!
//! # Key invariants
//! - Wire names are snake_case and stable; they match the tags stored with
//!   users and carried in tokens.
//! - `citizen` is a public role and is not part of [`groups::ALL_INTERNAL`].
use crate::AuthzError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    MinistryOfficial,
    Auditor,
    Plgo,
    TacChair,
    TacMember,
    CdfcChair,
    CdfcMember,
    FinanceOfficer,
    WdcMember,
    Mp,
    Citizen,
}

impl Role {
    pub const ALL: [Role; 12] = [
        Role::SuperAdmin,
        Role::MinistryOfficial,
        Role::Auditor,
        Role::Plgo,
        Role::TacChair,
        Role::TacMember,
        Role::CdfcChair,
        Role::CdfcMember,
        Role::FinanceOfficer,
        Role::WdcMember,
        Role::Mp,
        Role::Citizen,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::MinistryOfficial => "ministry_official",
            Role::Auditor => "auditor",
            Role::Plgo => "plgo",
            Role::TacChair => "tac_chair",
            Role::TacMember => "tac_member",
            Role::CdfcChair => "cdfc_chair",
            Role::CdfcMember => "cdfc_member",
            Role::FinanceOfficer => "finance_officer",
            Role::WdcMember => "wdc_member",
            Role::Mp => "mp",
            Role::Citizen => "citizen",
        }
    }

    /// Human-readable role name for UI listings.
    pub fn label(self) -> &'static str {
        match self {
            Role::SuperAdmin => "Super Administrator",
            Role::MinistryOfficial => "Ministry Official",
            Role::Auditor => "Auditor",
            Role::Plgo => "Provincial Local Government Officer",
            Role::TacChair => "TAC Chair",
            Role::TacMember => "TAC Member",
            Role::CdfcChair => "CDFC Chair",
            Role::CdfcMember => "CDFC Member",
            Role::FinanceOfficer => "Finance Officer",
            Role::WdcMember => "WDC Member",
            Role::Mp => "Member of Parliament",
            Role::Citizen => "Citizen",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AuthzError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| AuthzError::InvalidRole(value.to_string()))
    }
}

/// Ordered set of roles held by a caller or required by a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse role tags, dropping any tag outside the vocabulary.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tags.into_iter()
            .filter_map(|tag| tag.as_ref().parse::<Role>().ok())
            .collect()
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn intersects(&self, other: &RoleSet) -> bool {
        // Iterate the smaller set; both are tiny but this keeps the check symmetric.
        let (small, large) = if self.0.len() <= other.0.len() {
            (&self.0, &other.0)
        } else {
            (&other.0, &self.0)
        };
        small.iter().any(|role| large.contains(role))
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    pub fn tags(&self) -> Vec<String> {
        self.0.iter().map(|role| role.as_str().to_string()).collect()
    }

    pub fn union(&self, other: &RoleSet) -> RoleSet {
        self.0.union(&other.0).copied().collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a Role;
    type IntoIter = std::collections::btree_set::Iter<'a, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Named role groups the default route table is built from.
pub mod groups {
    use super::Role;

    pub const ALL_INTERNAL: &[Role] = &[
        Role::SuperAdmin,
        Role::MinistryOfficial,
        Role::Auditor,
        Role::Plgo,
        Role::TacChair,
        Role::TacMember,
        Role::CdfcChair,
        Role::CdfcMember,
        Role::FinanceOfficer,
        Role::WdcMember,
        Role::Mp,
    ];

    pub const ADMIN: &[Role] = &[Role::SuperAdmin, Role::MinistryOfficial];

    pub const FINANCE: &[Role] = &[
        Role::SuperAdmin,
        Role::FinanceOfficer,
        Role::CdfcChair,
        Role::Plgo,
        Role::MinistryOfficial,
    ];

    pub const OVERSIGHT: &[Role] = &[
        Role::SuperAdmin,
        Role::MinistryOfficial,
        Role::Auditor,
        Role::Plgo,
    ];

    pub const PROJECT: &[Role] = &[
        Role::SuperAdmin,
        Role::MinistryOfficial,
        Role::Plgo,
        Role::CdfcChair,
        Role::CdfcMember,
        Role::WdcMember,
        Role::TacChair,
        Role::TacMember,
        Role::Mp,
    ];

    pub const COMMUNITY: &[Role] = &[
        Role::SuperAdmin,
        Role::CdfcChair,
        Role::CdfcMember,
        Role::WdcMember,
        Role::Mp,
        Role::Plgo,
        Role::MinistryOfficial,
    ];

    /// Payment Panel A reviewers.
    pub const PANEL_A: &[Role] = &[
        Role::Mp,
        Role::CdfcChair,
        Role::FinanceOfficer,
        Role::SuperAdmin,
    ];

    /// Payment Panel B reviewers.
    pub const PANEL_B: &[Role] = &[Role::Plgo, Role::MinistryOfficial, Role::SuperAdmin];
}
