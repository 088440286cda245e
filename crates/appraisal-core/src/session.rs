//! Per-user session state, passed explicitly into every operation

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::analogs::AnalogCollection;
use crate::error::{AppraisalError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub login: String,
    /// Seven decimal digits, zero-padded
    pub user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppraisalSession {
    pub profile: Option<UserProfile>,
    #[serde(default)]
    pub analogs: AnalogCollection,
}

/// Random seven-digit identifier used in output file names
pub fn new_user_id() -> String {
    format!("{:07}", Uuid::new_v4().as_u128() % 10_000_000)
}

impl AppraisalSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, name: &str, login: &str) -> Result<&UserProfile> {
        let name = name.trim();
        let login = login.trim();
        if name.is_empty() {
            return Err(AppraisalError::invalid("name", "must not be blank"));
        }
        if login.is_empty() {
            return Err(AppraisalError::invalid("login", "must not be blank"));
        }

        let profile = UserProfile {
            name: name.to_string(),
            login: login.to_string(),
            user_id: new_user_id(),
        };
        info!("Signed in {} as user {}", profile.login, profile.user_id);
        let profile = self.profile.insert(profile);
        Ok(&*profile)
    }

    pub fn sign_out(&mut self) {
        if let Some(profile) = self.profile.take() {
            info!("Signed out user {}", profile.user_id);
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.profile.is_some()
    }

    pub fn require_profile(&self) -> Result<&UserProfile> {
        self.profile.as_ref().ok_or(AppraisalError::NotSignedIn)
    }
}
