//! Document model, audit entries, and statistics.
//!
//! # Purpose
//! Documents are uploaded evidence (contracts, minutes, receipts) addressed by
//! their content hash. Once a document is marked immutable it becomes
//! write-once: the flag never clears and update/delete are refused.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub uploader_id: String,
    pub file_url: String,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub file_hash: String,
    pub document_type: String,
    pub description: Option<String>,
    pub is_immutable: bool,
    pub immutable_at: Option<DateTime<Utc>>,
    pub immutable_by: Option<String>,
    pub constituency_id: String,
    pub ward_id: Option<String>,
    #[schema(value_type = Object)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Flip the immutability flag. Returns `false` when it was already set,
    /// leaving the original stamp untouched.
    pub fn seal(&mut self, actor: &str, now: DateTime<Utc>) -> bool {
        if self.is_immutable {
            return false;
        }
        self.is_immutable = true;
        self.immutable_at = Some(now);
        self.immutable_by = Some(actor.to_string());
        self.updated_at = now;
        true
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct DocumentCreateRequest {
    pub project_id: Option<Uuid>,
    pub file_url: String,
    pub file_name: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub file_hash: String,
    pub document_type: String,
    pub description: Option<String>,
    pub constituency_id: String,
    pub ward_id: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Default)]
pub struct DocumentPatchRequest {
    pub document_type: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Value>,
}

impl DocumentPatchRequest {
    pub fn apply(self, document: &mut Document) {
        if let Some(document_type) = self.document_type {
            document.document_type = document_type;
        }
        if let Some(description) = self.description {
            document.description = Some(description);
        }
        if let Some(metadata) = self.metadata {
            document.metadata = metadata;
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, Clone, Default)]
#[into_params(parameter_in = Query)]
pub struct DocumentFilter {
    pub project_id: Option<Uuid>,
    pub constituency_id: Option<String>,
    pub document_type: Option<String>,
}

impl DocumentFilter {
    pub fn matches(&self, document: &Document) -> bool {
        self.project_id
            .is_none_or(|id| document.project_id == Some(id))
            && self
                .constituency_id
                .as_deref()
                .is_none_or(|id| document.constituency_id == id)
            && self
                .document_type
                .as_deref()
                .is_none_or(|t| document.document_type == t)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Default)]
pub struct DocumentStatistics {
    pub total: u64,
    pub by_type: BTreeMap<String, u64>,
    pub immutable_count: u64,
    pub total_size: i64,
}

impl DocumentStatistics {
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut stats = DocumentStatistics::default();
        for document in documents {
            stats.total += 1;
            *stats
                .by_type
                .entry(document.document_type.clone())
                .or_default() += 1;
            if document.is_immutable {
                stats.immutable_count += 1;
            }
            stats.total_size += document.file_size.unwrap_or(0);
        }
        stats
    }
}

wire_enum! {
    DocumentAuditAction {
        Created => "created",
        Updated => "updated",
        MadeImmutable => "made_immutable",
        Deleted => "deleted",
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct DocumentAuditEntry {
    pub seq: u64,
    pub document_id: Uuid,
    pub action: DocumentAuditAction,
    pub actor: String,
    #[schema(value_type = Object)]
    pub details: Value,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(kind: &str, size: Option<i64>) -> Document {
        let now = Utc::now();
        Document {
            id: Uuid::new_v4(),
            project_id: None,
            uploader_id: "u1".to_string(),
            file_url: "https://files/a.pdf".to_string(),
            file_name: "a.pdf".to_string(),
            file_size: size,
            mime_type: Some("application/pdf".to_string()),
            file_hash: Uuid::new_v4().to_string(),
            document_type: kind.to_string(),
            description: None,
            is_immutable: false,
            immutable_at: None,
            immutable_by: None,
            constituency_id: "156".to_string(),
            ward_id: None,
            metadata: Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn seal_is_one_way() {
        let mut doc = document("contract", None);
        let first = Utc::now();
        assert!(doc.seal("plgo-1", first));
        assert!(!doc.seal("admin", first + chrono::Duration::seconds(5)));
        assert!(doc.is_immutable);
        assert_eq!(doc.immutable_by.as_deref(), Some("plgo-1"));
        assert_eq!(doc.immutable_at, Some(first));
    }

    #[test]
    fn statistics_count_types_and_sizes() {
        let mut sealed = document("contract", Some(100));
        sealed.seal("u", Utc::now());
        let docs = [sealed, document("contract", Some(50)), document("minutes", None)];
        let stats = DocumentStatistics::from_documents(&docs);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.immutable_count, 1);
        assert_eq!(stats.total_size, 150);
        assert_eq!(stats.by_type.get("contract"), Some(&2));
        assert_eq!(stats.by_type.get("minutes"), Some(&1));
    }
}
