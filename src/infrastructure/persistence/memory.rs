//! In-memory implementation of the softphone repositories
//!
//! Records live for the lifetime of the process; ids are assigned from
//! per-table counters starting at 1.

use crate::domain::call_log::{CallLog, CallLogRepository, NewCallLog};
use crate::domain::conference::{
    Conference, ConferenceRepository, ConferenceUpdate, NewConference,
};
use crate::domain::contact::{Contact, ContactRepository, NewContact};
use crate::domain::settings::{Settings, SettingsRepository, SettingsUpdate};
use crate::domain::shared::result::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

struct Table<T> {
    rows: HashMap<i32, T>,
    next_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Process-local storage for call logs, contacts, settings and conferences
#[derive(Default)]
pub struct MemoryStorage {
    call_logs: RwLock<Table<CallLog>>,
    contacts: RwLock<Table<Contact>>,
    conferences: RwLock<Table<Conference>>,
    settings: RwLock<Option<Settings>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallLogRepository for MemoryStorage {
    async fn list_call_logs(&self) -> Result<Vec<CallLog>> {
        let table = self.call_logs.read().await;
        let mut logs: Vec<CallLog> = table.rows.values().cloned().collect();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        Ok(logs)
    }

    async fn create_call_log(&self, log: NewCallLog) -> Result<CallLog> {
        let mut table = self.call_logs.write().await;
        let id = table.allocate_id();
        let record = CallLog {
            id,
            phone_number: log.phone_number,
            contact_name: log.contact_name,
            direction: log.direction,
            status: log.status,
            duration: log.duration,
            timestamp: Utc::now(),
            conference_id: log.conference_id,
            is_conference_call: log.is_conference_call,
        };
        table.rows.insert(id, record.clone());
        debug!("Created call log {}", id);
        Ok(record)
    }
}

#[async_trait]
impl ContactRepository for MemoryStorage {
    async fn list_contacts(&self) -> Result<Vec<Contact>> {
        let table = self.contacts.read().await;
        let mut contacts: Vec<Contact> = table.rows.values().cloned().collect();
        contacts.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        Ok(contacts)
    }

    async fn get_contact(&self, id: i32) -> Result<Option<Contact>> {
        Ok(self.contacts.read().await.rows.get(&id).cloned())
    }

    async fn find_contact_by_number(&self, phone_number: &str) -> Result<Option<Contact>> {
        let table = self.contacts.read().await;
        Ok(table
            .rows
            .values()
            .filter(|contact| contact.phone_number == phone_number)
            .min_by_key(|contact| contact.id)
            .cloned())
    }

    async fn create_contact(&self, contact: NewContact) -> Result<Contact> {
        let mut table = self.contacts.write().await;
        let id = table.allocate_id();
        let record = Contact {
            id,
            name: contact.name,
            phone_number: contact.phone_number,
        };
        table.rows.insert(id, record.clone());
        debug!("Created contact {}", id);
        Ok(record)
    }

    async fn delete_contact(&self, id: i32) -> Result<bool> {
        let removed = self.contacts.write().await.rows.remove(&id).is_some();
        debug!("Delete contact {}: removed={}", id, removed);
        Ok(removed)
    }
}

#[async_trait]
impl SettingsRepository for MemoryStorage {
    async fn get_settings(&self) -> Result<Option<Settings>> {
        Ok(self.settings.read().await.clone())
    }

    async fn update_settings(&self, update: SettingsUpdate) -> Result<Settings> {
        let settings = update.into_settings();
        *self.settings.write().await = Some(settings.clone());
        debug!("Settings updated");
        Ok(settings)
    }
}

#[async_trait]
impl ConferenceRepository for MemoryStorage {
    async fn list_conferences(&self) -> Result<Vec<Conference>> {
        let table = self.conferences.read().await;
        let mut conferences: Vec<Conference> = table.rows.values().cloned().collect();
        conferences.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(b.id.cmp(&a.id)));
        Ok(conferences)
    }

    async fn get_conference(&self, id: i32) -> Result<Option<Conference>> {
        Ok(self.conferences.read().await.rows.get(&id).cloned())
    }

    async fn find_by_conference_id(&self, conference_id: &str) -> Result<Option<Conference>> {
        let table = self.conferences.read().await;
        Ok(table
            .rows
            .values()
            .find(|conference| conference.conference_id == conference_id)
            .cloned())
    }

    async fn create_conference(&self, conference: NewConference) -> Result<Conference> {
        let mut table = self.conferences.write().await;
        let id = table.allocate_id();
        let record = Conference {
            id,
            conference_id: conference.conference_id,
            host_number: conference.host_number,
            participant_numbers: conference.participant_numbers,
            status: conference.status,
            start_time: Utc::now(),
            end_time: conference.end_time,
        };
        table.rows.insert(id, record.clone());
        debug!("Created conference record {} ({})", id, record.conference_id);
        Ok(record)
    }

    async fn update_conference(
        &self,
        id: i32,
        update: ConferenceUpdate,
    ) -> Result<Option<Conference>> {
        let mut table = self.conferences.write().await;
        let Some(conference) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        conference.apply(update);
        debug!("Updated conference record {}", id);
        Ok(Some(conference.clone()))
    }

    async fn delete_conference(&self, id: i32) -> Result<bool> {
        Ok(self.conferences.write().await.rows.remove(&id).is_some())
    }
}
