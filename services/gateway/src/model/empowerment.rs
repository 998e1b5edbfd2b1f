//! Empowerment grant model.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

wire_enum! {
    GrantStatus {
        Submitted => "submitted",
        Shortlisted => "shortlisted",
        Approved => "approved",
        Rejected => "rejected",
        Disbursed => "disbursed",
        Completed => "completed",
    }
}

wire_enum! {
    GrantType {
        Individual => "individual",
        Group => "group",
        Cooperative => "cooperative",
        WomenGroup => "women_group",
        YouthGroup => "youth_group",
        DisabilityGroup => "disability_group",
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct EmpowermentGrant {
    pub id: Uuid,
    pub application_number: String,
    pub applicant_name: String,
    pub grant_type: GrantType,
    pub purpose: String,
    pub requested_amount: f64,
    pub constituency_id: String,
    pub ward_id: Option<String>,
    pub status: GrantStatus,
    pub submitted_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct GrantCreateRequest {
    pub applicant_name: String,
    pub grant_type: GrantType,
    pub purpose: String,
    pub requested_amount: f64,
    pub constituency_id: String,
    pub ward_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct GrantStatusUpdateRequest {
    pub status: GrantStatus,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, Clone, Default)]
#[into_params(parameter_in = Query)]
pub struct GrantFilter {
    pub status: Option<GrantStatus>,
    pub constituency_id: Option<String>,
    pub grant_type: Option<GrantType>,
}

impl GrantFilter {
    pub fn matches(&self, grant: &EmpowermentGrant) -> bool {
        self.status.is_none_or(|s| grant.status == s)
            && self
                .constituency_id
                .as_deref()
                .is_none_or(|id| grant.constituency_id == id)
            && self.grant_type.is_none_or(|t| grant.grant_type == t)
    }
}
