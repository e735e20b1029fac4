//! Call value objects

use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::CallId;
use serde::{Deserialize, Serialize};

/// Vendor session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Call status as seen by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    #[default]
    Idle,
    Connecting,
    Ringing,
    Connected,
    Ended,
}

/// Inbound call waiting for accept or decline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingCall {
    pub id: CallId,
    pub caller_name: Option<String>,
    pub caller_number: Option<String>,
}

/// The call currently carrying media
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCall {
    pub id: CallId,
    pub caller_name: Option<String>,
    pub caller_number: Option<String>,
}

/// Credentials as supplied by the user or stored settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub login_token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Resolved login handed to the vendor
#[derive(Clone, PartialEq, Eq)]
pub enum Login {
    Token(String),
    Sip { username: String, password: String },
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Secrets stay out of logs
        match self {
            Login::Token(_) => f.write_str("Login::Token(..)"),
            Login::Sip { username, .. } => write!(f, "Login::Sip({})", username),
        }
    }
}

impl Credentials {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            login_token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn sip(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login_token: None,
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Pick the login method. A token wins over a username/password pair.
    pub fn resolve(&self) -> Result<Login> {
        if let Some(token) = non_empty(&self.login_token) {
            return Ok(Login::Token(token.to_string()));
        }

        match (non_empty(&self.username), non_empty(&self.password)) {
            (Some(username), Some(password)) => Ok(Login::Sip {
                username: username.to_string(),
                password: password.to_string(),
            }),
            _ => Err(DomainError::Auth(
                "either a login token or a SIP username and password is required".to_string(),
            )),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
