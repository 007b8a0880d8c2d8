use std::sync::Arc;

use tracing::warn;

use crate::models::User;
use crate::storage::{KeyValueStore, StorageError};

use super::Identity;

/// Storage key holding the raw bearer token
pub const TOKEN_KEY: &str = "auth_token";

/// Storage key holding the JSON-serialized user record
pub const USER_KEY: &str = "user_data";

/// What restoration found in storage
#[derive(Debug)]
pub enum Stored {
    Empty,
    Complete(Identity),
    /// Only one of the two entries, or an unreadable user record
    Inconsistent,
}

/// On-device copy of the session: the token and the user record.
#[derive(Clone)]
pub struct PersistedSession {
    storage: Arc<dyn KeyValueStore>,
}

impl PersistedSession {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    pub fn load(&self) -> Result<Stored, StorageError> {
        let token = self.storage.get(TOKEN_KEY)?;
        let user = self.storage.get(USER_KEY)?;

        match (token, user) {
            (None, None) => Ok(Stored::Empty),
            (Some(token), Some(user_json)) => match serde_json::from_str::<User>(&user_json) {
                Ok(user) => Ok(Stored::Complete(Identity { user, token })),
                Err(e) => {
                    warn!(error = %e, "Stored user record is unreadable");
                    Ok(Stored::Inconsistent)
                }
            },
            _ => Ok(Stored::Inconsistent),
        }
    }

    /// Write token and user in one storage operation
    pub fn save(&self, identity: &Identity) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(&identity.user)?;
        self.storage
            .set_many(&[(TOKEN_KEY, identity.token.as_str()), (USER_KEY, user_json.as_str())])
    }

    pub fn save_user(&self, user: &User) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(user)?;
        self.storage.set(USER_KEY, &user_json)
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.multi_remove(&[TOKEN_KEY, USER_KEY])
    }
}
