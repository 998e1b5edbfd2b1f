//! Advisory status workflow catalogue.
//!
//! # Purpose
//! Describes the review path of projects and payments: which status usually
//! follows which, who is expected to act, and whether a comment is expected.
//! The gateway uses it to list the actions open to a caller.
//!
//! # Key invariants
//! - The tables are read-only and built at compile time.
//! - Nothing on a write path consults them. A status write may set any value
//!   of the enumeration regardless of the current status.
use crate::model::{EntityKind, PaymentStatus, ProjectStatus};
use cdf_authz::{Role, RoleSet, groups, is_allowed};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Status enumerations that have a display label.
pub trait StatusLabel: Copy + PartialEq {
    fn tag(self) -> &'static str;
    fn label(self) -> &'static str;
}

impl StatusLabel for ProjectStatus {
    fn tag(self) -> &'static str {
        self.as_str()
    }

    fn label(self) -> &'static str {
        match self {
            ProjectStatus::Draft => "Draft",
            ProjectStatus::Submitted => "Submitted",
            ProjectStatus::CdfcReview => "CDFC Review",
            ProjectStatus::TacAppraisal => "TAC Appraisal",
            ProjectStatus::PlgoReview => "PLGO Review",
            ProjectStatus::Approved => "Approved",
            ProjectStatus::Implementation => "Implementation",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Rejected => "Rejected",
            ProjectStatus::Cancelled => "Cancelled",
        }
    }
}

impl StatusLabel for PaymentStatus {
    fn tag(self) -> &'static str {
        self.as_str()
    }

    fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pending Approval",
            PaymentStatus::PanelAApproved => "Panel A Approved",
            PaymentStatus::PanelARejected => "Panel A Rejected",
            PaymentStatus::PanelBApproved => "Panel B Approved",
            PaymentStatus::Approved => "Fully Approved",
            PaymentStatus::Rejected => "Rejected",
            PaymentStatus::Disbursed => "Disbursed",
            PaymentStatus::Cancelled => "Cancelled",
        }
    }
}

/// One catalogued step from `from` to `to`.
#[derive(Debug, Clone, Copy)]
pub struct Transition<S: 'static> {
    pub from: S,
    pub to: S,
    pub action: &'static str,
    pub label: &'static str,
    pub roles: &'static [Role],
    pub requires_comment: bool,
    pub event: &'static str,
}

impl<S: StatusLabel> Transition<S> {
    pub fn permits(&self, caller: &RoleSet) -> bool {
        is_allowed(caller, &self.roles.iter().copied().collect())
    }

    pub fn view(&self) -> TransitionView {
        TransitionView {
            from: self.from.tag().to_string(),
            to: self.to.tag().to_string(),
            action: self.action.to_string(),
            label: self.label.to_string(),
            required_roles: self.roles.iter().map(|role| role.as_str().to_string()).collect(),
            requires_comment: self.requires_comment,
            event: self.event.to_string(),
        }
    }
}

const PROJECT_SUBMITTERS: &[Role] = &[
    Role::CdfcMember,
    Role::WdcMember,
    Role::Citizen,
    Role::CdfcChair,
    Role::SuperAdmin,
];
const CDFC_DECIDERS: &[Role] = &[Role::CdfcChair, Role::SuperAdmin];
const TAC_APPRAISERS: &[Role] = &[Role::TacChair, Role::TacMember, Role::SuperAdmin];
const PLGO_DECIDERS: &[Role] = &[Role::Plgo, Role::MinistryOfficial, Role::SuperAdmin];

pub const PROJECT_TRANSITIONS: &[Transition<ProjectStatus>] = &[
    Transition {
        from: ProjectStatus::Draft,
        to: ProjectStatus::Submitted,
        action: "submit",
        label: "Submit for Review",
        roles: PROJECT_SUBMITTERS,
        requires_comment: false,
        event: "project.submitted",
    },
    Transition {
        from: ProjectStatus::Submitted,
        to: ProjectStatus::CdfcReview,
        action: "accept_for_review",
        label: "Accept for CDFC Review",
        roles: CDFC_DECIDERS,
        requires_comment: false,
        event: "project.accepted_for_review",
    },
    Transition {
        from: ProjectStatus::Submitted,
        to: ProjectStatus::Rejected,
        action: "reject",
        label: "Reject",
        roles: CDFC_DECIDERS,
        requires_comment: true,
        event: "project.rejected",
    },
    Transition {
        from: ProjectStatus::CdfcReview,
        to: ProjectStatus::TacAppraisal,
        action: "forward_to_tac",
        label: "Forward to TAC",
        roles: CDFC_DECIDERS,
        requires_comment: false,
        event: "project.forwarded_to_tac",
    },
    Transition {
        from: ProjectStatus::CdfcReview,
        to: ProjectStatus::Rejected,
        action: "reject",
        label: "Reject",
        roles: CDFC_DECIDERS,
        requires_comment: true,
        event: "project.rejected",
    },
    Transition {
        from: ProjectStatus::TacAppraisal,
        to: ProjectStatus::PlgoReview,
        action: "recommend_approval",
        label: "Recommend Approval",
        roles: TAC_APPRAISERS,
        requires_comment: false,
        event: "project.recommended_for_approval",
    },
    Transition {
        from: ProjectStatus::TacAppraisal,
        to: ProjectStatus::Rejected,
        action: "reject",
        label: "Reject",
        roles: TAC_APPRAISERS,
        requires_comment: true,
        event: "project.rejected",
    },
    Transition {
        from: ProjectStatus::PlgoReview,
        to: ProjectStatus::Approved,
        action: "approve",
        label: "Approve Project",
        roles: PLGO_DECIDERS,
        requires_comment: false,
        event: "project.approved",
    },
    Transition {
        from: ProjectStatus::PlgoReview,
        to: ProjectStatus::Rejected,
        action: "reject",
        label: "Reject",
        roles: PLGO_DECIDERS,
        requires_comment: true,
        event: "project.rejected",
    },
    Transition {
        from: ProjectStatus::Approved,
        to: ProjectStatus::Implementation,
        action: "start_implementation",
        label: "Start Implementation",
        roles: &[Role::Plgo, Role::FinanceOfficer, Role::SuperAdmin],
        requires_comment: false,
        event: "project.implementation_started",
    },
    Transition {
        from: ProjectStatus::Implementation,
        to: ProjectStatus::Completed,
        action: "complete",
        label: "Mark Complete",
        roles: &[Role::Plgo, Role::CdfcChair, Role::SuperAdmin],
        requires_comment: false,
        event: "project.completed",
    },
    Transition {
        from: ProjectStatus::Implementation,
        to: ProjectStatus::Cancelled,
        action: "cancel",
        label: "Cancel Project",
        roles: PLGO_DECIDERS,
        requires_comment: true,
        event: "project.cancelled",
    },
    Transition {
        from: ProjectStatus::Rejected,
        to: ProjectStatus::Draft,
        action: "revise",
        label: "Revise & Resubmit",
        roles: &[
            Role::CdfcMember,
            Role::WdcMember,
            Role::CdfcChair,
            Role::SuperAdmin,
        ],
        requires_comment: false,
        event: "project.revision_started",
    },
];

pub const PAYMENT_TRANSITIONS: &[Transition<PaymentStatus>] = &[
    Transition {
        from: PaymentStatus::Pending,
        to: PaymentStatus::PanelAApproved,
        action: "approve_panel_a",
        label: "Approve (Panel A)",
        roles: groups::PANEL_A,
        requires_comment: false,
        event: "payment.panel_a_approved",
    },
    Transition {
        from: PaymentStatus::Pending,
        to: PaymentStatus::PanelARejected,
        action: "reject_panel_a",
        label: "Reject (Panel A)",
        roles: groups::PANEL_A,
        requires_comment: true,
        event: "payment.panel_a_rejected",
    },
    Transition {
        from: PaymentStatus::PanelAApproved,
        to: PaymentStatus::Approved,
        action: "approve_panel_b",
        label: "Approve (Panel B)",
        roles: groups::PANEL_B,
        requires_comment: false,
        event: "payment.approved",
    },
    Transition {
        from: PaymentStatus::PanelAApproved,
        to: PaymentStatus::Rejected,
        action: "reject_panel_b",
        label: "Reject (Panel B)",
        roles: groups::PANEL_B,
        requires_comment: true,
        event: "payment.rejected",
    },
    Transition {
        from: PaymentStatus::Approved,
        to: PaymentStatus::Disbursed,
        action: "disburse",
        label: "Disburse Payment",
        roles: &[Role::FinanceOfficer, Role::SuperAdmin],
        requires_comment: false,
        event: "payment.disbursed",
    },
    Transition {
        from: PaymentStatus::Pending,
        to: PaymentStatus::Cancelled,
        action: "cancel",
        label: "Cancel Payment",
        roles: &[Role::FinanceOfficer, Role::CdfcChair, Role::SuperAdmin],
        requires_comment: true,
        event: "payment.cancelled",
    },
    Transition {
        from: PaymentStatus::PanelAApproved,
        to: PaymentStatus::Cancelled,
        action: "cancel",
        label: "Cancel Payment",
        roles: PLGO_DECIDERS,
        requires_comment: true,
        event: "payment.cancelled",
    },
];

/// Catalogued steps out of `current` that `caller` is expected to take.
pub fn available<'a, S: StatusLabel>(
    table: &'a [Transition<S>],
    current: S,
    caller: &RoleSet,
) -> Vec<&'a Transition<S>> {
    table
        .iter()
        .filter(|transition| transition.from == current && transition.permits(caller))
        .collect()
}

/// Whether the catalogue lists a step from `from` to `to`. Informational only.
pub fn is_catalogued<S: StatusLabel>(table: &[Transition<S>], from: S, to: S) -> bool {
    table.iter().any(|t| t.from == from && t.to == to)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TransitionView {
    pub from: String,
    pub to: String,
    pub action: String,
    pub label: String,
    pub required_roles: Vec<String>,
    pub requires_comment: bool,
    pub event: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct StatusView {
    pub status: String,
    pub label: String,
}

impl StatusView {
    pub fn of<S: StatusLabel>(status: S) -> Self {
        Self {
            status: status.tag().to_string(),
            label: status.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct WorkflowCatalogue {
    pub entity: EntityKind,
    pub statuses: Vec<StatusView>,
    pub transitions: Vec<TransitionView>,
}

/// Catalogue for `entity`, or `None` for families without a transition table.
pub fn catalogue(entity: EntityKind) -> Option<WorkflowCatalogue> {
    match entity {
        EntityKind::Project => Some(build(entity, ProjectStatus::ALL, PROJECT_TRANSITIONS)),
        EntityKind::Payment => Some(build(entity, PaymentStatus::ALL, PAYMENT_TRANSITIONS)),
        EntityKind::Bursary | EntityKind::Grant => None,
    }
}

fn build<S: StatusLabel>(
    entity: EntityKind,
    statuses: &[S],
    table: &[Transition<S>],
) -> WorkflowCatalogue {
    WorkflowCatalogue {
        entity,
        statuses: statuses.iter().map(|s| StatusView::of(*s)).collect(),
        transitions: table.iter().map(Transition::view).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdfc_chair_sees_review_actions_on_submitted_project() {
        let caller = RoleSet::from_iter([Role::CdfcChair]);
        let actions: Vec<_> = available(PROJECT_TRANSITIONS, ProjectStatus::Submitted, &caller)
            .into_iter()
            .map(|t| t.action)
            .collect();
        assert_eq!(actions, vec!["accept_for_review", "reject"]);
    }

    #[test]
    fn auditor_has_no_project_actions() {
        let caller = RoleSet::from_iter([Role::Auditor]);
        for status in ProjectStatus::ALL {
            assert!(available(PROJECT_TRANSITIONS, *status, &caller).is_empty());
        }
    }

    #[test]
    fn completed_project_is_terminal_in_catalogue() {
        let caller = RoleSet::from_iter(Role::ALL);
        assert!(available(PROJECT_TRANSITIONS, ProjectStatus::Completed, &caller).is_empty());
    }

    #[test]
    fn panel_b_follows_panel_a_in_catalogue() {
        assert!(is_catalogued(
            PAYMENT_TRANSITIONS,
            PaymentStatus::PanelAApproved,
            PaymentStatus::Approved
        ));
        assert!(!is_catalogued(
            PAYMENT_TRANSITIONS,
            PaymentStatus::Pending,
            PaymentStatus::Disbursed
        ));
    }

    #[test]
    fn every_status_has_a_label() {
        for status in ProjectStatus::ALL {
            assert!(!status.label().is_empty());
        }
        for status in PaymentStatus::ALL {
            assert!(!status.label().is_empty());
        }
    }

    #[test]
    fn catalogue_covers_projects_and_payments_only() {
        let project = catalogue(EntityKind::Project).expect("project catalogue");
        assert_eq!(project.statuses.len(), ProjectStatus::ALL.len());
        assert_eq!(project.transitions.len(), PROJECT_TRANSITIONS.len());
        let payment = catalogue(EntityKind::Payment).expect("payment catalogue");
        assert_eq!(payment.transitions[0].required_roles.len(), groups::PANEL_A.len());
        assert!(catalogue(EntityKind::Bursary).is_none());
        assert!(catalogue(EntityKind::Grant).is_none());
    }

    #[test]
    fn rejection_steps_expect_a_comment() {
        for transition in PROJECT_TRANSITIONS.iter().filter(|t| t.action == "reject") {
            assert!(transition.requires_comment);
        }
    }
}
