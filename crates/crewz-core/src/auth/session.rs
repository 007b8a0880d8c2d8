use crate::models::User;

/// Authenticated identity: a user and the bearer token issued for them.
/// Held together so one can never be set without the other.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Startup restoration has not settled yet
    Restoring,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of the session as seen by consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub loading: bool,
    pub identity: Option<Identity>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            loading: true,
            identity: None,
        }
    }
}

impl Session {
    pub fn user(&self) -> Option<&User> {
        self.identity.as_ref().map(|i| &i.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.token.as_str())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user().map(|u| u.id.as_str())
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        match (self.loading, &self.identity) {
            (true, _) => SessionStatus::Restoring,
            (false, Some(_)) => SessionStatus::Authenticated,
            (false, None) => SessionStatus::Unauthenticated,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Restoring => write!(f, "restoring"),
            SessionStatus::Authenticated => write!(f, "authenticated"),
            SessionStatus::Unauthenticated => write!(f, "unauthenticated"),
        }
    }
}
