//! Softphone settings
//!
//! A singleton record (id 1) holding vendor credentials and audio device
//! choices.

use crate::domain::call::Credentials;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const SETTINGS_ID: i32 = 1;
pub const DEFAULT_CONNECTION_SERVER: &str = "rtc.telnyx.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub id: i32,
    pub telnyx_api_key: Option<String>,
    pub sip_username: Option<String>,
    pub sip_password: Option<String>,
    pub connection_server: String,
    pub selected_microphone: Option<String>,
    pub selected_speaker: Option<String>,
}

impl Settings {
    /// Credentials for connecting with the stored account
    pub fn credentials(&self) -> Credentials {
        Credentials {
            login_token: self.telnyx_api_key.clone(),
            username: self.sip_username.clone(),
            password: self.sip_password.clone(),
        }
    }
}

/// Full replacement payload for `PUT /api/settings`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default)]
    pub telnyx_api_key: Option<String>,
    #[serde(default)]
    pub sip_username: Option<String>,
    #[serde(default)]
    pub sip_password: Option<String>,
    #[serde(default)]
    pub connection_server: Option<String>,
    #[serde(default)]
    pub selected_microphone: Option<String>,
    #[serde(default)]
    pub selected_speaker: Option<String>,
}

impl SettingsUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(server) = &self.connection_server {
            if server.contains(char::is_whitespace) {
                return Err(DomainError::invalid_field(
                    "connectionServer",
                    "must be a host name without whitespace",
                ));
            }
        }
        Ok(())
    }

    /// Build the stored record. Empty strings are stored as absent.
    pub fn into_settings(self) -> Settings {
        Settings {
            id: SETTINGS_ID,
            telnyx_api_key: blank_to_none(self.telnyx_api_key),
            sip_username: blank_to_none(self.sip_username),
            sip_password: blank_to_none(self.sip_password),
            connection_server: blank_to_none(self.connection_server)
                .unwrap_or_else(|| DEFAULT_CONNECTION_SERVER.to_string()),
            selected_microphone: blank_to_none(self.selected_microphone),
            selected_speaker: blank_to_none(self.selected_speaker),
        }
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Settings repository trait
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Stored settings, if they were ever saved
    async fn get_settings(&self) -> Result<Option<Settings>>;

    async fn update_settings(&self, update: SettingsUpdate) -> Result<Settings>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_settings_defaults_server_and_drops_blanks() {
        let settings = SettingsUpdate {
            telnyx_api_key: Some(String::new()),
            sip_username: Some("alice".to_string()),
            sip_password: Some("secret".to_string()),
            ..SettingsUpdate::default()
        }
        .into_settings();

        assert_eq!(settings.id, SETTINGS_ID);
        assert_eq!(settings.connection_server, DEFAULT_CONNECTION_SERVER);
        assert_eq!(settings.telnyx_api_key, None);
        assert!(settings.credentials().resolve().is_ok());
    }

    #[test]
    fn test_validate_rejects_whitespace_server() {
        let update = SettingsUpdate {
            connection_server: Some("rtc telnyx com".to_string()),
            ..SettingsUpdate::default()
        };
        assert!(matches!(
            update.validate(),
            Err(DomainError::Validation { .. })
        ));
    }
}
