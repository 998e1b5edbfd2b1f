//! Request body extraction.
//!
//! Axum's `Json` rejects a body that parses but does not fit the target type
//! (for example a status outside its enumeration) with 422 and a plain-text
//! body. [`ApiJson`] reports every body failure as a 400 `validation_error`
//! envelope instead.
//!
//! [`OptionalApiJson`] is for action endpoints whose body may be left out. An
//! empty body yields `None`; anything else must parse.
use crate::api::error::{ApiError, api_validation_error};
use axum::Json;
use axum::async_trait;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(api_validation_error(&rejection.body_text())),
        }
    }
}

pub struct OptionalApiJson<T>(pub Option<T>);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| api_validation_error(&rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalApiJson(None));
        }
        serde_json::from_slice(&bytes)
            .map(|value| OptionalApiJson(Some(value)))
            .map_err(|err| api_validation_error(&format!("invalid request body: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Note {
        comment: Option<String>,
    }

    async fn extract(body: &'static str) -> Result<Option<Note>, ApiError> {
        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .expect("request");
        OptionalApiJson::<Note>::from_request(req, &())
            .await
            .map(|OptionalApiJson(note)| note)
    }

    #[tokio::test]
    async fn empty_bodies_are_absent() {
        assert!(extract("").await.expect("empty").is_none());
        assert!(extract(" \n").await.expect("blank").is_none());
    }

    #[tokio::test]
    async fn present_bodies_must_parse() {
        let note = extract(r#"{"comment":"ok"}"#).await.expect("note").expect("some");
        assert_eq!(note.comment.as_deref(), Some("ok"));

        for bad in [r#"{"comment": 5}"#, "comment=ok", "{"] {
            let err = extract(bad).await.expect_err(bad);
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
            assert_eq!(err.body.code, "validation_error");
        }
    }
}
