//! CDF platform gateway library crate.
//!
//! # Purpose
//! Exposes the HTTP API, auth helpers, workflow catalogue, configuration, and
//! storage implementations for use by the binary and tests.
//!
//! # Notes
//! Role vocabulary, the route registry and token handling live in `cdf-authz`;
//! this crate applies them to HTTP requests.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod model;
pub mod observability;
pub mod store;
pub mod workflow;
