//! REST API client module for the CrewzNation backend.
//!
//! This module provides the `ApiClient` for the auth endpoints and generic
//! authenticated requests used by the feed, garage, events and forum screens.
//!
//! The API uses JWT bearer token authentication obtained from
//! `/api/auth/login` or `/api/auth/register`.

pub mod client;
pub mod error;

pub use client::{bearer_header, Anonymous, ApiClient, AuthProvider};
pub use error::ApiError;
