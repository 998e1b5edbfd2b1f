//! In-app notification model.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

wire_enum! {
    NotificationKind {
        Info => "info",
        Warning => "warning",
        Success => "success",
        Error => "error",
        ActionRequired => "action_required",
    }
}

wire_enum! {
    NotificationCategory {
        Payment => "payment",
        Project => "project",
        Approval => "approval",
        System => "system",
        Audit => "audit",
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub category: NotificationCategory,
    pub action_url: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification payload without a recipient; fanned out per user.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub category: NotificationCategory,
    pub action_url: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl NewNotification {
    pub fn for_user(&self, user_id: &str) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            title: self.title.clone(),
            message: self.message.clone(),
            kind: self.kind,
            category: self.category,
            action_url: self.action_url.clone(),
            metadata: self.metadata.clone(),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}
