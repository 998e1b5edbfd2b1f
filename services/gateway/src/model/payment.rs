//! Payment model definitions and request payloads.
//!
//! # Purpose
//! Describes milestone/advance/final payments raised against projects and the
//! two review panels that sign them off.
//!
//! # Key invariants
//! - The same user may not sign off both panels of one payment. The store
//!   enforces this when recording a Panel B approval.
//! - Status is otherwise a free label: no write path checks the current value.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

wire_enum! {
    PaymentStatus {
        Pending => "pending",
        PanelAApproved => "panel_a_approved",
        PanelARejected => "panel_a_rejected",
        PanelBApproved => "panel_b_approved",
        Approved => "approved",
        Rejected => "rejected",
        Disbursed => "disbursed",
        Cancelled => "cancelled",
    }
}

wire_enum! {
    PaymentType {
        Milestone => "milestone",
        Advance => "advance",
        Final => "final",
        Other => "other",
    }
}

/// Payment review panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    A,
    B,
}

impl Panel {
    /// Status recorded when this panel approves.
    pub fn approved_status(self) -> PaymentStatus {
        match self {
            Panel::A => PaymentStatus::PanelAApproved,
            Panel::B => PaymentStatus::Approved,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub payment_number: String,
    pub project_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub amount: f64,
    pub payment_type: PaymentType,
    pub recipient_name: String,
    pub recipient_account: String,
    pub recipient_bank: String,
    pub description: String,
    pub supporting_documents: Vec<String>,
    pub status: PaymentStatus,
    pub created_by: String,
    pub panel_a_approved_by: Option<String>,
    pub panel_a_approved_at: Option<DateTime<Utc>>,
    pub panel_b_approved_by: Option<String>,
    pub panel_b_approved_at: Option<DateTime<Utc>>,
    pub disbursed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Apply a status write, stamping `disbursed_at` the first time the
    /// payment is marked disbursed.
    pub fn set_status(&mut self, status: PaymentStatus, now: DateTime<Utc>) {
        self.status = status;
        if status == PaymentStatus::Disbursed && self.disbursed_at.is_none() {
            self.disbursed_at = Some(now);
        }
        self.updated_at = now;
    }

    /// Record a panel sign-off. Returns `false` without changing anything when
    /// `approver` already signed the other panel.
    pub fn record_panel_approval(&mut self, panel: Panel, approver: &str, now: DateTime<Utc>) -> bool {
        let other = match panel {
            Panel::A => self.panel_b_approved_by.as_deref(),
            Panel::B => self.panel_a_approved_by.as_deref(),
        };
        if other == Some(approver) {
            return false;
        }
        match panel {
            Panel::A => {
                self.panel_a_approved_by = Some(approver.to_string());
                self.panel_a_approved_at = Some(now);
            }
            Panel::B => {
                self.panel_b_approved_by = Some(approver.to_string());
                self.panel_b_approved_at = Some(now);
            }
        }
        self.set_status(panel.approved_status(), now);
        true
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PaymentCreateRequest {
    pub project_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub amount: f64,
    pub payment_type: PaymentType,
    pub recipient_name: String,
    pub recipient_account: String,
    pub recipient_bank: String,
    pub description: String,
    #[serde(default)]
    pub supporting_documents: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct PaymentStatusUpdateRequest {
    pub status: PaymentStatus,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams, Clone, Default)]
#[into_params(parameter_in = Query)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub project_id: Option<Uuid>,
}

impl PaymentFilter {
    pub fn matches(&self, payment: &Payment) -> bool {
        self.status.is_none_or(|status| payment.status == status)
            && self.project_id.is_none_or(|id| payment.project_id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment() -> Payment {
        let now = Utc::now();
        Payment {
            id: Uuid::new_v4(),
            payment_number: "PAY-2026-00001".to_string(),
            project_id: Uuid::new_v4(),
            milestone_id: None,
            amount: 5_000.0,
            payment_type: PaymentType::Milestone,
            recipient_name: "Builder Ltd".to_string(),
            recipient_account: "0001".to_string(),
            recipient_bank: "Zanaco".to_string(),
            description: "Foundation".to_string(),
            supporting_documents: vec![],
            status: PaymentStatus::Pending,
            created_by: "u-finance".to_string(),
            panel_a_approved_by: None,
            panel_a_approved_at: None,
            panel_b_approved_by: None,
            panel_b_approved_at: None,
            disbursed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn same_user_cannot_sign_both_panels() {
        let mut p = payment();
        let now = Utc::now();
        assert!(p.record_panel_approval(Panel::A, "u1", now));
        assert_eq!(p.status, PaymentStatus::PanelAApproved);
        assert!(!p.record_panel_approval(Panel::B, "u1", now));
        assert_eq!(p.status, PaymentStatus::PanelAApproved);
        assert!(p.panel_b_approved_by.is_none());
        assert!(p.record_panel_approval(Panel::B, "u2", now));
        assert_eq!(p.status, PaymentStatus::Approved);
    }

    #[test]
    fn panel_b_does_not_require_panel_a_first() {
        let mut p = payment();
        assert!(p.record_panel_approval(Panel::B, "u2", Utc::now()));
        assert_eq!(p.status, PaymentStatus::Approved);
    }

    #[test]
    fn disbursed_at_is_stamped_once() {
        let mut p = payment();
        let first = Utc::now();
        p.set_status(PaymentStatus::Disbursed, first);
        let later = first + chrono::Duration::seconds(30);
        p.set_status(PaymentStatus::Disbursed, later);
        assert_eq!(p.disbursed_at, Some(first));
        assert_eq!(p.updated_at, later);
    }

    #[test]
    fn any_status_may_follow_any_status() {
        let mut p = payment();
        for status in PaymentStatus::ALL {
            p.set_status(*status, Utc::now());
            assert_eq!(p.status, *status);
        }
    }
}
