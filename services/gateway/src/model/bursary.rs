//! Bursary application model.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

wire_enum! {
    BursaryStatus {
        Submitted => "submitted",
        Shortlisted => "shortlisted",
        Approved => "approved",
        Rejected => "rejected",
        Disbursed => "disbursed",
    }
}

wire_enum! {
    InstitutionType {
        Primary => "primary",
        Secondary => "secondary",
        Tertiary => "tertiary",
        Skills => "skills",
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct BursaryApplication {
    pub id: Uuid,
    pub application_number: String,
    pub student_name: String,
    pub institution_name: String,
    pub institution_type: InstitutionType,
    pub tuition_fees: f64,
    pub academic_year: i32,
    pub constituency_id: String,
    pub ward_id: Option<String>,
    pub status: BursaryStatus,
    pub submitted_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct BursaryCreateRequest {
    pub student_name: String,
    pub institution_name: String,
    pub institution_type: InstitutionType,
    pub tuition_fees: f64,
    pub academic_year: i32,
    pub constituency_id: String,
    pub ward_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct BursaryStatusUpdateRequest {
    pub status: BursaryStatus,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, Clone, Default)]
#[into_params(parameter_in = Query)]
pub struct BursaryFilter {
    pub status: Option<BursaryStatus>,
    pub constituency_id: Option<String>,
    pub academic_year: Option<i32>,
    pub institution_type: Option<InstitutionType>,
}

impl BursaryFilter {
    pub fn matches(&self, application: &BursaryApplication) -> bool {
        self.status.is_none_or(|s| application.status == s)
            && self
                .constituency_id
                .as_deref()
                .is_none_or(|id| application.constituency_id == id)
            && self
                .academic_year
                .is_none_or(|year| application.academic_year == year)
            && self
                .institution_type
                .is_none_or(|t| application.institution_type == t)
    }
}
