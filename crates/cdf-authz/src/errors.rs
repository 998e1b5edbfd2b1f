use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("token subject is empty")]
    MissingSubject,
    #[error("signing secret is empty")]
    EmptySecret,
}

pub type AuthzResult<T> = Result<T, AuthzError>;
