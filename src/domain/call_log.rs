//! Call log domain model
//!
//! One record per finished call, shown in the call history.

use crate::domain::shared::error::{DomainError, FieldError};
use crate::domain::shared::result::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Call direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Inbound => "inbound",
            CallDirection::Outbound => "outbound",
        }
    }
}

/// Outcome of a logged call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallLogStatus {
    /// Call was answered and later hung up
    Completed,
    /// Inbound call never answered
    Missed,
    /// Outbound call never connected
    Failed,
}

impl CallLogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallLogStatus::Completed => "completed",
            CallLogStatus::Missed => "missed",
            CallLogStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLog {
    pub id: i32,
    pub phone_number: String,
    pub contact_name: Option<String>,
    pub direction: CallDirection,
    pub status: CallLogStatus,
    /// Seconds
    pub duration: u64,
    pub timestamp: DateTime<Utc>,
    pub conference_id: Option<String>,
    pub is_conference_call: bool,
}

/// Payload for creating a call log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCallLog {
    pub phone_number: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    pub direction: CallDirection,
    pub status: CallLogStatus,
    #[serde(default)]
    pub duration: u64,
    #[serde(default)]
    pub conference_id: Option<String>,
    #[serde(default)]
    pub is_conference_call: bool,
}

impl NewCallLog {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.phone_number.trim().is_empty() {
            errors.push(FieldError::new("phoneNumber", "must not be empty"));
        }
        if self.is_conference_call && self.conference_id.is_none() {
            errors.push(FieldError::new(
                "conferenceId",
                "required when isConferenceCall is set",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation("Invalid call log data", errors))
        }
    }
}

/// Call log repository trait
#[async_trait]
pub trait CallLogRepository: Send + Sync {
    /// All call logs, newest first
    async fn list_call_logs(&self) -> Result<Vec<CallLog>>;

    async fn create_call_log(&self, log: NewCallLog) -> Result<CallLog>;
}
