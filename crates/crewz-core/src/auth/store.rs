//! The session store shared by every screen.
//!
//! State lives in a `watch` channel so readers always see a whole snapshot,
//! never a token without its user. Mutating operations take `ops` first;
//! tokio's mutex is fair, so concurrent calls run one at a time in arrival
//! order and the last one to arrive wins.

use std::sync::Arc;

use reqwest::header::HeaderMap;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::api::{bearer_header, ApiClient, ApiError, AuthProvider};
use crate::models::{AuthResponse, LoginRequest, ProfileUpdate, RegisterRequest, User, UserPatch};
use crate::storage::KeyValueStore;

use super::mirror::{PersistedSession, Stored};
use super::{Identity, Session, SessionError, SessionStatus};

const MISSING_FIELDS: &str = "Please fill in all fields";

pub struct SessionStore {
    api: ApiClient,
    mirror: PersistedSession,
    state: watch::Sender<Session>,
    ops: Mutex<()>,
}

impl SessionStore {
    pub fn new(api: ApiClient, storage: Arc<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(Session::default());
        Self {
            api,
            mirror: PersistedSession::new(storage),
            state,
            ops: Mutex::new(()),
        }
    }

    // =========================================================================
    // Reading
    // =========================================================================

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receive every subsequent session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token().map(str::to_string)
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Wait for startup restoration to settle
    pub async fn settled(&self) -> Session {
        let mut rx = self.state.subscribe();
        let session = match rx.wait_for(|s| !s.loading).await {
            Ok(session) => session.clone(),
            // Unreachable while `self` holds the sender
            Err(_) => self.snapshot(),
        };
        session
    }

    /// Requests carrying the live session token
    pub fn client(&self) -> AuthorizedClient<'_> {
        AuthorizedClient {
            api: &self.api,
            auth: self,
        }
    }

    // =========================================================================
    // Restoration
    // =========================================================================

    /// Rebuild the session from storage and verify the token with the backend.
    ///
    /// The stored identity is published right away so the app can render,
    /// then replaced by the server's copy of the user, or dropped together
    /// with the stored entries when verification fails for any reason.
    /// Only the first call does anything.
    pub async fn restore(&self) -> Session {
        let _op = self.ops.lock().await;

        if !self.state.borrow().loading {
            debug!("Session already restored");
            return self.snapshot();
        }

        match self.mirror.load() {
            Ok(Stored::Empty) => debug!("No stored session"),
            Ok(Stored::Inconsistent) => {
                warn!("Stored session is incomplete, clearing it");
                self.clear_mirror_quietly();
            }
            Ok(Stored::Complete(identity)) => {
                let token = identity.token.clone();
                debug!(user_id = %identity.user.id, "Stored session found, verifying");
                self.state.send_modify(|s| s.identity = Some(identity));

                match self.api.current_user(&token).await {
                    Ok(user) => {
                        info!(user_id = %user.id, "Stored session verified");
                        if let Err(e) = self.mirror.save_user(&user) {
                            warn!(error = %e, "Failed to persist refreshed user");
                        }
                        self.replace_user(user);
                    }
                    Err(e) => {
                        info!(error = %e, "Stored session rejected, logging out");
                        self.clear_mirror_quietly();
                        self.state.send_modify(|s| s.identity = None);
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored session, clearing it");
                self.clear_mirror_quietly();
            }
        }

        self.state.send_modify(|s| s.loading = false);
        self.snapshot()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    pub async fn login(&self, email: &str, password: &str) -> Result<User, SessionError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(SessionError::Validation(MISSING_FIELDS.to_string()));
        }

        let _op = self.ops.lock().await;
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self.api.login(&request).await.inspect_err(|e| {
            warn!(error = %e, "Login failed");
        })?;
        self.establish(response)
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<User, SessionError> {
        let (username, email, full_name) = (username.trim(), email.trim(), full_name.trim());
        if username.is_empty() || email.is_empty() || password.is_empty() || full_name.is_empty() {
            return Err(SessionError::Validation(MISSING_FIELDS.to_string()));
        }

        let _op = self.ops.lock().await;
        let request = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
        };

        let response = self.api.register(&request).await.inspect_err(|e| {
            warn!(error = %e, "Registration failed");
        })?;
        self.establish(response)
    }

    /// Clear storage, then memory. Safe to call when already logged out.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let _op = self.ops.lock().await;

        let cleared = self.mirror.clear();
        if let Err(ref e) = cleared {
            warn!(error = %e, "Failed to clear stored session");
        }

        if self.state.send_if_modified(|s| s.identity.take().is_some()) {
            info!("Logged out");
        }
        cleared.map_err(SessionError::from)
    }

    /// Persist and publish a fresh identity. Storage goes first so a failed
    /// write leaves the previous session untouched.
    fn establish(&self, response: AuthResponse) -> Result<User, SessionError> {
        if response.access_token.trim().is_empty() {
            return Err(ApiError::InvalidResponse("empty access token".to_string()).into());
        }

        let identity = Identity {
            user: response.user,
            token: response.access_token,
        };
        self.mirror.save(&identity)?;

        let user = identity.user.clone();
        info!(user_id = %user.id, username = %user.username, "Session established");
        self.state.send_modify(|s| s.identity = Some(identity));
        Ok(user)
    }

    // =========================================================================
    // User record
    // =========================================================================

    /// Shallow-merge `patch` into the current user and persist the result.
    pub async fn update_user(&self, patch: UserPatch) -> Result<User, SessionError> {
        let _op = self.ops.lock().await;
        self.merge_user(&patch)
    }

    /// Send profile changes to the backend, then merge them locally.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User, SessionError> {
        let _op = self.ops.lock().await;
        if !self.state.borrow().is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }

        self.api.update_profile(self, &update).await?;
        self.merge_user(&UserPatch::from(&update))
    }

    /// Re-fetch the current user, e.g. after counters changed server-side.
    /// A rejected token ends the session.
    pub async fn refresh_user(&self) -> Result<User, SessionError> {
        let _op = self.ops.lock().await;
        let token = self.token().ok_or(SessionError::NotAuthenticated)?;

        match self.api.current_user(&token).await {
            Ok(user) => {
                self.mirror.save_user(&user)?;
                self.replace_user(user.clone());
                Ok(user)
            }
            Err(e) if e.is_auth_failure() => {
                info!(error = %e, "Session rejected during refresh, logging out");
                self.clear_mirror_quietly();
                self.state.send_modify(|s| s.identity = None);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn merge_user(&self, patch: &UserPatch) -> Result<User, SessionError> {
        let mut user = self.user().ok_or(SessionError::NotAuthenticated)?;
        user.apply(patch);
        self.mirror.save_user(&user)?;

        debug!(user_id = %user.id, "User record updated");
        self.replace_user(user.clone());
        Ok(user)
    }

    fn replace_user(&self, user: User) {
        self.state.send_modify(|s| {
            if let Some(identity) = s.identity.as_mut() {
                identity.user = user;
            }
        });
    }

    fn clear_mirror_quietly(&self) {
        if let Err(e) = self.mirror.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }
    }
}

impl AuthProvider for SessionStore {
    fn auth_header(&self) -> Result<HeaderMap, ApiError> {
        bearer_header(self.state.borrow().token())
    }
}

/// Borrowed view of the API that attaches the current token to every request.
#[derive(Clone, Copy)]
pub struct AuthorizedClient<'a> {
    api: &'a ApiClient,
    auth: &'a dyn AuthProvider,
}

impl AuthorizedClient<'_> {
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.api.get(path, self.auth).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.api.post(path, body, self.auth).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.api.put(path, body, self.auth).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.api.delete(path, self.auth).await
    }
}
