//! Core library for the CrewzNation client.
//!
//! Provides the pieces every screen of the app depends on:
//!
//! - `auth`: the `SessionStore`, the single source of truth for who is logged in
//! - `api`: REST client for the CrewzNation backend
//! - `storage`: on-device key-value persistence backing the session mirror
//! - `models`: user and auth payloads shared with the backend
//! - `config`: API base URL and storage backend selection

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod storage;

pub use api::{ApiClient, ApiError, AuthProvider};
pub use auth::{Identity, Session, SessionError, SessionStatus, SessionStore};
pub use config::{Config, StorageBackend};
pub use models::{User, UserPatch};
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore, StorageError};
