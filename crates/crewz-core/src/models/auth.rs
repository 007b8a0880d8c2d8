use serde::{Deserialize, Serialize};

use super::{User, UserPatch};

/// Body of `POST /api/auth/login`. The backend identifies members by email.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/auth/register`
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Successful login/register response
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: User,
}

/// Fields accepted by `PUT /api/users/profile`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.bio.is_none() && self.profile_image.is_none()
    }
}

impl From<&ProfileUpdate> for UserPatch {
    fn from(update: &ProfileUpdate) -> Self {
        UserPatch {
            full_name: update.full_name.clone(),
            bio: update.bio.clone(),
            profile_image: update.profile_image.clone(),
            ..Default::default()
        }
    }
}
