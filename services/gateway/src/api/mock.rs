//! Fixture project listing for front-end development.
//!
//! # Purpose
//! Serves a fixed, unauthenticated project list so UI work can proceed without
//! a seeded database. Disabled unless `CDF_MOCK_API_ENABLED` is set.
//!
//! # Key invariants
//! - Constituency `156` yields exactly the three fixtures; anything else,
//!   including no filter, yields an empty array.
//! - The body is a bare JSON array, not an envelope.
use crate::api::error::{ApiError, api_not_enabled};
use crate::api::types::ConstituencyParams;
use crate::app::AppState;
use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const FIXTURE_CONSTITUENCY: &str = "156";

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct MockProject {
    pub project_id: String,
    pub project_name: String,
    pub constituency_id: u32,
    pub ward_id: u32,
    pub status: String,
    pub budget: u64,
}

fn fixture(id: &str, name: &str, ward_id: u32, status: &str, budget: u64) -> MockProject {
    MockProject {
        project_id: id.to_string(),
        project_name: name.to_string(),
        constituency_id: 156,
        ward_id,
        status: status.to_string(),
        budget,
    }
}

pub fn fixture_projects() -> Vec<MockProject> {
    vec![
        fixture(
            "MSW-001",
            "Mock: Kabwata Community Hall Renovation",
            1,
            "IMPLEMENTATION",
            1_250_000,
        ),
        fixture(
            "MSW-002",
            "Mock: Lusaka Central Water Borehole",
            2,
            "APPROVED",
            750_000,
        ),
        fixture(
            "MSW-003",
            "Mock: Chawama Youth Skills Center Equipment",
            3,
            "COMPLETED",
            500_000,
        ),
    ]
}

/// Fixtures matching `constituency_id`.
pub fn mock_projects_for(constituency_id: Option<&str>) -> Vec<MockProject> {
    match constituency_id {
        Some(FIXTURE_CONSTITUENCY) => fixture_projects(),
        _ => Vec::new(),
    }
}

#[utoipa::path(
    get,
    path = "/v1/mock/projects",
    tag = "mock",
    params(ConstituencyParams),
    responses(
        (status = 200, description = "Fixture projects", body = Vec<MockProject>),
        (status = 404, description = "Mock API disabled", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_mock_projects(
    State(state): State<AppState>,
    Query(params): Query<ConstituencyParams>,
) -> Result<Json<Vec<MockProject>>, ApiError> {
    if !state.mock_api_enabled {
        return Err(api_not_enabled("mock API is disabled"));
    }
    Ok(Json(mock_projects_for(params.constituency_id.as_deref())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_constituency_returns_three_records() {
        let projects = mock_projects_for(Some("156"));
        assert_eq!(projects.len(), 3);
        let ids: Vec<&str> = projects.iter().map(|p| p.project_id.as_str()).collect();
        assert_eq!(ids, ["MSW-001", "MSW-002", "MSW-003"]);
        assert_eq!(projects[0].budget, 1_250_000);
        assert_eq!(projects[1].status, "APPROVED");
        assert!(projects.iter().all(|p| p.constituency_id == 156));
    }

    #[test]
    fn other_constituencies_are_empty() {
        assert!(mock_projects_for(Some("157")).is_empty());
        assert!(mock_projects_for(Some("")).is_empty());
        assert!(mock_projects_for(None).is_empty());
    }
}
