//! CDF platform authorization primitives shared by services.
//!
//! # Purpose
//! Centralizes the role vocabulary, the static route registry, the access
//! predicate, and bearer token claims used by the gateway.
//!
//! # How it fits
//! The gateway verifies bearer tokens with [`TokenVerifier`], turns the claimed
//! role tags into a [`RoleSet`], then asks [`RouteRegistry::decide`] (or
//! [`is_allowed`] directly for operation-level requirements) whether the call
//! may proceed.
//!
//! # Key invariants
//! - Access is granted iff the required set is empty or shares a role with the
//!   caller.
//! - A path missing from the registry requires no role. The decision carries
//!   `registered = false` so callers can see the open default.
//! - The registry is built once and never mutated afterwards.
//!
//! # Examples
//! ```rust
//! use cdf_authz::{Role, RoleSet, RouteRegistry};
//!
//! let registry = RouteRegistry::default();
//! let caller = RoleSet::from_iter([Role::FinanceOfficer]);
//! assert!(registry.decide(&caller, "/payments").allowed);
//! assert!(!registry.decide(&caller, "/users").allowed);
//! ```
//!
//! # Common pitfalls
//! - Unknown role tags are dropped when parsing claims; a token carrying only
//!   unknown tags behaves like a caller with no roles.
//! - Issuer/audience values must match between the token issuer and verifier.

mod errors;
mod guard;
mod role;
mod routes;
mod token;

pub use errors::{AuthzError, AuthzResult};
pub use guard::{AccessDecision, is_allowed};
pub use role::{Role, RoleSet, groups};
pub use routes::{RouteEntry, RouteRegistry, normalize_path};
pub use token::{CdfClaims, TokenIssuer, TokenVerifier, now_epoch_seconds};
