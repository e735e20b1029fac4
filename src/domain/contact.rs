//! Contact domain model

use crate::domain::shared::error::{DomainError, FieldError};
use crate::domain::shared::result::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i32,
    pub name: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub name: String,
    pub phone_number: String,
}

impl NewContact {
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be empty"));
        }
        if self.phone_number.trim().is_empty() {
            errors.push(FieldError::new("phoneNumber", "must not be empty"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::validation("Invalid contact data", errors))
        }
    }
}

/// Contact repository trait
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// All contacts sorted by name
    async fn list_contacts(&self) -> Result<Vec<Contact>>;

    async fn get_contact(&self, id: i32) -> Result<Option<Contact>>;

    async fn find_contact_by_number(&self, phone_number: &str) -> Result<Option<Contact>>;

    async fn create_contact(&self, contact: NewContact) -> Result<Contact>;

    /// Returns whether a contact was removed
    async fn delete_contact(&self, id: i32) -> Result<bool>;
}
