//! Data models for CrewzNation entities.
//!
//! - `User`, `UserPatch`: the authenticated member record and partial updates
//! - Auth payloads: `LoginRequest`, `RegisterRequest`, `AuthResponse`
//! - `ProfileUpdate`: fields accepted by the profile endpoint

pub mod auth;
pub mod user;

pub use auth::{AuthResponse, LoginRequest, ProfileUpdate, RegisterRequest};
pub use user::{User, UserPatch};
