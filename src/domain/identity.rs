//! Users and the identity carried by access tokens.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a user authenticated when the account was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Credentials,
    Google,
    Github,
}

impl AuthProvider {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credentials => "credentials",
            Self::Google => "google",
            Self::Github => "github",
        }
    }
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credentials" => Ok(Self::Credentials),
            "google" => Ok(Self::Google),
            "github" => Ok(Self::Github),
            other => Err(format!("unknown auth provider {other:?}")),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Account type column (`user` for regular accounts).
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub email: String,
    pub verified: bool,
    #[serde(rename = "profile")]
    pub photo: String,
    pub provider: AuthProvider,
}

impl User {
    /// The claim set that an access token carries for this user.
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            verified: self.verified,
            provider: self.provider,
            photo: self.photo.clone(),
        }
    }
}

/// Authenticated caller, decoded from a verified access token.
///
/// Threaded explicitly through every authenticated operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub verified: bool,
    pub provider: AuthProvider,
    #[serde(rename = "profile")]
    pub photo: String,
}

/// A user row together with its password hash (credential users only).
#[derive(Debug, Clone)]
pub struct UserWithSecret {
    pub user: User,
    pub password_hash: Option<String>,
}

/// Input for a new credentials account.
#[derive(Debug, Clone)]
pub struct NewCredentialUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// Profile returned by an OAuth provider after a successful callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthProfile {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub photo: String,
    pub provider: AuthProvider,
}
