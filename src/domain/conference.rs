/// Conference record domain model
///
/// Persistent history of conferences hosted from this softphone. The live
/// conference (participant call handles) lives in the call client.
use crate::domain::shared::error::{DomainError, FieldError};
use crate::domain::shared::result::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Conference lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConferenceStatus {
    Active,
    Ended,
}

/// Conference record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conference {
    pub id: i32,
    pub conference_id: String,
    pub host_number: String,
    pub participant_numbers: Vec<String>,
    pub status: ConferenceStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Conference {
    /// Apply a partial update
    pub fn apply(&mut self, update: ConferenceUpdate) {
        if let Some(host_number) = update.host_number {
            self.host_number = host_number;
        }
        if let Some(numbers) = update.participant_numbers {
            self.participant_numbers = numbers;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(end_time) = update.end_time {
            self.end_time = Some(end_time);
        }
    }
}

/// Payload for creating a conference record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConference {
    pub conference_id: String,
    pub host_number: String,
    #[serde(default)]
    pub participant_numbers: Vec<String>,
    pub status: ConferenceStatus,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl NewConference {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.conference_id.trim().is_empty() {
            errors.push(FieldError::new("conferenceId", "must not be empty"));
        }
        if self.host_number.trim().is_empty() {
            errors.push(FieldError::new("hostNumber", "must not be empty"));
        }
        for (index, number) in self.participant_numbers.iter().enumerate() {
            if number.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("participantNumbers.{}", index),
                    "must not be empty",
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation("Invalid conference data", errors))
        }
    }
}

/// Partial update for a conference record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceUpdate {
    #[serde(default)]
    pub host_number: Option<String>,
    #[serde(default)]
    pub participant_numbers: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<ConferenceStatus>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl ConferenceUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(host) = &self.host_number {
            if host.trim().is_empty() {
                return Err(DomainError::invalid_field("hostNumber", "must not be empty"));
            }
        }
        Ok(())
    }

    /// Mark the conference finished now
    pub fn ended() -> Self {
        Self {
            status: Some(ConferenceStatus::Ended),
            end_time: Some(Utc::now()),
            ..Self::default()
        }
    }
}

/// Conference repository trait
#[async_trait::async_trait]
pub trait ConferenceRepository: Send + Sync {
    /// All conference records, newest first
    async fn list_conferences(&self) -> Result<Vec<Conference>>;

    async fn get_conference(&self, id: i32) -> Result<Option<Conference>>;

    /// Look up by the call client's conference token
    async fn find_by_conference_id(&self, conference_id: &str) -> Result<Option<Conference>>;

    async fn create_conference(&self, conference: NewConference) -> Result<Conference>;

    /// Returns `None` when no record has this id
    async fn update_conference(&self, id: i32, update: ConferenceUpdate)
        -> Result<Option<Conference>>;

    async fn delete_conference(&self, id: i32) -> Result<bool>;
}
