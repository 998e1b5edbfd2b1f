//! Gateway HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules and the small helpers they share: paging
//! defaults, record numbering, and owner notifications.
pub mod access;
pub mod bursaries;
pub mod documents;
pub mod empowerment;
pub mod error;
pub mod extract;
pub mod mock;
pub mod notifications;
pub mod openapi;
pub mod payments;
pub mod projects;
pub mod session;
pub mod system;
pub mod types;
pub mod users;
pub mod workflow;

use crate::api::error::{ApiError, api_internal};
use crate::api::types::PageParams;
use crate::app::AppState;
use crate::model::NewNotification;
use crate::store::PageRequest;
use chrono::{Datelike, Utc};

pub(crate) const DEFAULT_PAGE_LIMIT: u32 = 20;

pub(crate) fn page_request(params: &PageParams, default_limit: u32) -> PageRequest {
    PageRequest::new(params.page, params.limit, default_limit)
}

/// Amount check shared by create handlers; rejects NaN and infinities.
pub(crate) fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Draw the next value of `scope` for the current year and hand back
/// `(year, seq)`.
pub(crate) async fn next_number(state: &AppState, scope: &str) -> Result<(i32, u64), ApiError> {
    let year = Utc::now().year();
    let seq = state
        .store
        .next_sequence(&format!("{scope}:{year}"))
        .await
        .map_err(|err| api_internal("failed to allocate record number", &err))?;
    Ok((year, seq))
}

/// Best-effort notification to one user. Failures are logged and never fail
/// the request that triggered them.
pub(crate) async fn notify_user(state: &AppState, user_id: &str, notification: NewNotification) {
    let result = state
        .store
        .insert_notifications(vec![notification.for_user(user_id)])
        .await;
    if let Err(err) = result {
        tracing::warn!(error = %err, user_id, "failed to record notification");
    }
}
