//! Gateway data model module.
//!
//! # Purpose
//! Defines the domain records (projects, payments, bursaries, empowerment
//! grants, documents, notifications, users) and their request payloads, shared
//! by the API and store layers.
//!
//! # Notes
//! Status enums are plain labels. Nothing in this module restricts which
//! status may follow which; see `crate::workflow` for the advisory catalogue.
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a stored or submitted tag is outside an enumeration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a unit enum with a fixed snake_case wire name per variant, plus
/// `ALL`, `as_str`, `Display`, and `FromStr`.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize, utoipa::ToSchema,
        )]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::model::UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($wire => Ok($name::$variant),)+
                    other => Err($crate::model::UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

mod bursary;
mod document;
mod empowerment;
mod notification;
mod payment;
mod project;
mod user;

pub use bursary::{
    BursaryApplication, BursaryCreateRequest, BursaryFilter, BursaryStatus,
    BursaryStatusUpdateRequest, InstitutionType,
};
pub use document::{
    Document, DocumentAuditAction, DocumentAuditEntry, DocumentCreateRequest, DocumentFilter,
    DocumentPatchRequest, DocumentStatistics,
};
pub use empowerment::{
    EmpowermentGrant, GrantCreateRequest, GrantFilter, GrantStatus, GrantStatusUpdateRequest,
    GrantType,
};
pub use notification::{
    NewNotification, Notification, NotificationCategory, NotificationKind,
};
pub use payment::{
    Panel, Payment, PaymentCreateRequest, PaymentFilter, PaymentStatus,
    PaymentStatusUpdateRequest, PaymentType,
};
pub use project::{
    ConstituencyStats, Project, ProjectCreateRequest, ProjectFilter, ProjectPatchRequest,
    ProjectSector, ProjectStatus, ProjectStatusUpdateRequest,
};
pub use user::{User, UserUpsertRequest};

wire_enum! {
    /// Entity families that carry a status label.
    EntityKind {
        Project => "project",
        Payment => "payment",
        Bursary => "bursary",
        Grant => "grant",
    }
}

/// One recorded status write. `from`/`to` are wire tags of the entity's
/// status enumeration.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema, PartialEq)]
pub struct StatusChange {
    pub seq: u64,
    pub entity: EntityKind,
    pub entity_id: uuid::Uuid,
    pub from_status: String,
    pub to_status: String,
    pub changed_by: String,
    pub comment: Option<String>,
    pub changed_at: chrono::DateTime<chrono::Utc>,
}
