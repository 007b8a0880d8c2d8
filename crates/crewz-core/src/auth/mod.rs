//! Authentication module: who is logged in and which token to send.
//!
//! This module provides:
//! - `SessionStore`: the shared session, its startup restoration and the
//!   login/register/logout/update operations
//! - `PersistedSession`: the on-device mirror (`auth_token` + `user_data`)
//! - `Session`: an immutable snapshot handed to consumers
//!
//! Tokens are issued by the backend for 7 days; the store does not track
//! expiry itself and relies on `/api/auth/me` rejecting stale tokens.

pub mod error;
pub mod mirror;
pub mod session;
pub mod store;

pub use error::SessionError;
pub use mirror::PersistedSession;
pub use session::{Identity, Session, SessionStatus};
pub use store::{AuthorizedClient, SessionStore};
