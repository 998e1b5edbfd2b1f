//! Project model definitions and request payloads.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

wire_enum! {
    ProjectStatus {
        Draft => "draft",
        Submitted => "submitted",
        CdfcReview => "cdfc_review",
        TacAppraisal => "tac_appraisal",
        PlgoReview => "plgo_review",
        Approved => "approved",
        Implementation => "implementation",
        Completed => "completed",
        Rejected => "rejected",
        Cancelled => "cancelled",
    }
}

wire_enum! {
    ProjectSector {
        Education => "education",
        Health => "health",
        Water => "water",
        Roads => "roads",
        Agriculture => "agriculture",
        Community => "community",
        Energy => "energy",
        Governance => "governance",
        Other => "other",
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub project_number: String,
    pub name: String,
    pub description: Option<String>,
    pub sector: ProjectSector,
    pub constituency_id: String,
    pub ward_id: Option<String>,
    pub budget: f64,
    pub spent: f64,
    pub beneficiaries: Option<i64>,
    pub progress: i32,
    pub status: ProjectStatus,
    pub submitted_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProjectCreateRequest {
    pub name: String,
    pub description: Option<String>,
    pub sector: ProjectSector,
    pub constituency_id: String,
    pub ward_id: Option<String>,
    pub budget: f64,
    pub beneficiaries: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct ProjectPatchRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sector: Option<ProjectSector>,
    pub ward_id: Option<String>,
    pub budget: Option<f64>,
    pub spent: Option<f64>,
    pub beneficiaries: Option<i64>,
    pub progress: Option<i32>,
}

impl ProjectPatchRequest {
    pub fn apply(self, project: &mut Project) {
        if let Some(name) = self.name {
            project.name = name;
        }
        if let Some(description) = self.description {
            project.description = Some(description);
        }
        if let Some(sector) = self.sector {
            project.sector = sector;
        }
        if let Some(ward_id) = self.ward_id {
            project.ward_id = Some(ward_id);
        }
        if let Some(budget) = self.budget {
            project.budget = budget;
        }
        if let Some(spent) = self.spent {
            project.spent = spent;
        }
        if let Some(beneficiaries) = self.beneficiaries {
            project.beneficiaries = Some(beneficiaries);
        }
        if let Some(progress) = self.progress {
            project.progress = progress;
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ProjectStatusUpdateRequest {
    pub status: ProjectStatus,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, Clone, Default)]
#[into_params(parameter_in = Query)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub constituency_id: Option<String>,
    pub ward_id: Option<String>,
    pub sector: Option<ProjectSector>,
}

impl ProjectFilter {
    pub fn matches(&self, project: &Project) -> bool {
        self.status.is_none_or(|status| project.status == status)
            && self
                .constituency_id
                .as_deref()
                .is_none_or(|id| project.constituency_id == id)
            && self
                .ward_id
                .as_deref()
                .is_none_or(|id| project.ward_id.as_deref() == Some(id))
            && self.sector.is_none_or(|sector| project.sector == sector)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct ConstituencyStats {
    pub constituency_id: String,
    pub total_projects: u64,
    pub by_status: BTreeMap<String, u64>,
    pub total_budget: f64,
    pub total_spent: f64,
    pub ongoing_projects: u64,
    pub completed_projects: u64,
}

impl ConstituencyStats {
    pub fn from_projects<'a>(
        constituency_id: &str,
        projects: impl IntoIterator<Item = &'a Project>,
    ) -> Self {
        let mut stats = ConstituencyStats {
            constituency_id: constituency_id.to_string(),
            total_projects: 0,
            by_status: BTreeMap::new(),
            total_budget: 0.0,
            total_spent: 0.0,
            ongoing_projects: 0,
            completed_projects: 0,
        };
        for project in projects {
            stats.total_projects += 1;
            *stats
                .by_status
                .entry(project.status.as_str().to_string())
                .or_default() += 1;
            stats.total_budget += project.budget;
            stats.total_spent += project.spent;
            match project.status {
                ProjectStatus::Approved | ProjectStatus::Implementation => {
                    stats.ongoing_projects += 1
                }
                ProjectStatus::Completed => stats.completed_projects += 1,
                _ => {}
            }
        }
        stats
    }
}
