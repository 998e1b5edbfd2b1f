//! Platform user directory entry.
use cdf_authz::{Role, RoleSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    #[schema(value_type = Vec<String>)]
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role_set(&self) -> RoleSet {
        self.roles.iter().copied().collect()
    }

    pub fn holds_any(&self, roles: &RoleSet) -> bool {
        self.role_set().intersects(roles)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct UserUpsertRequest {
    pub id: String,
    pub email: String,
    #[schema(value_type = Vec<String>)]
    pub roles: Vec<Role>,
}
