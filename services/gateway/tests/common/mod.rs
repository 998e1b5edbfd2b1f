#![allow(dead_code)]

use cdf_authz::{Role, RoleSet, TokenIssuer, TokenVerifier};
use gateway::app::{AppState, build_router};
use gateway::store::StoreConfig;
use gateway::store::memory::InMemoryStore;
use std::sync::Arc;
use std::time::Duration;

pub const SECRET: &[u8] = b"gateway-test-secret";
pub const ISSUER: &str = "cdf-platform";
pub const AUDIENCE: &str = "authenticated";

pub type TestApp = axum::routing::RouterIntoService<axum::body::Body, ()>;

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub fn test_state(mock_api_enabled: bool) -> AppState {
    let store = Arc::new(InMemoryStore::new(StoreConfig::default()));
    let verifier = TokenVerifier::new(SECRET, ISSUER, AUDIENCE, 0).expect("verifier");
    AppState::new(store, verifier, mock_api_enabled)
}

pub fn app_with_state(state: AppState) -> TestApp {
    build_router(state).into_service()
}

pub fn app() -> TestApp {
    app_with_state(test_state(false))
}

/// Mint a token for `subject` holding `roles`.
pub fn token(subject: &str, roles: &[Role]) -> String {
    let issuer = TokenIssuer::new(SECRET, ISSUER, AUDIENCE, Duration::from_secs(3600))
        .expect("issuer");
    let roles: RoleSet = roles.iter().copied().collect();
    issuer
        .mint(subject, Some(&format!("{subject}@cdf.test")), &roles)
        .expect("mint")
}
