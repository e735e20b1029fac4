//! Softphone application service
//!
//! Folds the call client's events into a shared `CallState`, keeps the
//! persisted call history and conference records in step with what the
//! client reports, and publishes every state change to UI subscribers.

use crate::domain::call::{CallEvent, CallState, CallStatus, Credentials};
use crate::domain::call_log::{
    CallDirection, CallLogRepository, CallLogStatus, NewCallLog,
};
use crate::domain::conference::{
    ConferenceRepository, ConferenceStatus, ConferenceUpdate, NewConference,
};
use crate::domain::contact::ContactRepository;
use crate::domain::settings::SettingsRepository;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{CallId, ConferenceId};
use crate::infrastructure::telephony::{CallClient, Subscription};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const UPDATE_CHANNEL_CAPACITY: usize = 256;
const UNKNOWN_NUMBER: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Message pushed to UI subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SoftphoneUpdate {
    State {
        state: CallState,
    },
    Notification {
        level: NotificationLevel,
        title: String,
        message: String,
    },
}

/// Repositories the service writes to
#[derive(Clone)]
pub struct SoftphoneRepositories {
    pub call_logs: Arc<dyn CallLogRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub conferences: Arc<dyn ConferenceRepository>,
}

struct CallMeta {
    direction: CallDirection,
    phone_number: Option<String>,
    caller_name: Option<String>,
    connected: bool,
}

impl CallMeta {
    fn outbound(phone_number: Option<String>) -> Self {
        Self {
            direction: CallDirection::Outbound,
            phone_number,
            caller_name: None,
            connected: false,
        }
    }

    fn final_status(&self) -> CallLogStatus {
        match (self.connected, self.direction) {
            (true, _) => CallLogStatus::Completed,
            (false, CallDirection::Inbound) => CallLogStatus::Missed,
            (false, CallDirection::Outbound) => CallLogStatus::Failed,
        }
    }
}

struct ConferenceRecord {
    conference_id: ConferenceId,
    /// Call that was active when the conference started
    host_call: Option<CallId>,
    record_id: i32,
    participant_numbers: Vec<String>,
}

struct ParticipantMeta {
    phone_number: String,
    joined_at: DateTime<Utc>,
}

/// Bookkeeping for records derived from the event stream
#[derive(Default)]
struct CallTracker {
    calls: HashMap<CallId, CallMeta>,
    /// Destination of a dial whose first event has not arrived yet
    pending_dial: Option<String>,
    participants: HashMap<CallId, ParticipantMeta>,
    conference: Option<ConferenceRecord>,
}

impl CallTracker {
    fn meta_for(&mut self, call_id: &CallId) -> &mut CallMeta {
        let pending = &mut self.pending_dial;
        self.calls
            .entry(call_id.clone())
            .or_insert_with(|| CallMeta::outbound(pending.take()))
    }
}

struct Shared {
    state: RwLock<CallState>,
    updates: broadcast::Sender<SoftphoneUpdate>,
    tracker: Mutex<CallTracker>,
    repositories: SoftphoneRepositories,
}

impl Shared {
    fn publish(&self, update: SoftphoneUpdate) {
        // No receivers is fine
        let _ = self.updates.send(update);
    }

    fn notify(&self, level: NotificationLevel, title: &str, message: impl Into<String>) {
        self.publish(SoftphoneUpdate::Notification {
            level,
            title: title.to_string(),
            message: message.into(),
        });
    }

    async fn update_state(&self, change: impl FnOnce(CallState) -> CallState) -> CallState {
        let mut state = self.state.write().await;
        let next = change(state.clone());
        if next != *state {
            *state = next.clone();
            self.publish(SoftphoneUpdate::State {
                state: next.clone(),
            });
        }
        next
    }

    async fn handle_event(&self, event: CallEvent) {
        debug!("Reducing {} event", event.event_type());
        let before = self.state.read().await.clone();

        let after = self.update_state(|state| state.apply(&event)).await;
        gauge!("softphone_active_calls").set(if after.active_call.is_some() { 1.0 } else { 0.0 });

        self.record(&event, &before).await;

        if let CallEvent::Failed { reason } = &event {
            // Failures during connect are reported by the connect command itself
            if before.is_connected {
                gauge!("softphone_session_connected").set(0.0);
                self.notify(
                    NotificationLevel::Error,
                    "Connection Failed",
                    reason.clone().unwrap_or_else(|| "session lost".to_string()),
                );
            }
        }
    }

    /// Persist whatever the event completes
    async fn record(&self, event: &CallEvent, before: &CallState) {
        let mut tracker = self.tracker.lock().await;
        match event {
            CallEvent::Incoming {
                call_id,
                caller_name,
                caller_number,
            } => {
                counter!("softphone_calls_total", "direction" => "inbound").increment(1);
                tracker.calls.insert(
                    call_id.clone(),
                    CallMeta {
                        direction: CallDirection::Inbound,
                        phone_number: caller_number.clone(),
                        caller_name: caller_name.clone(),
                        connected: false,
                    },
                );
            }
            CallEvent::Connecting { call_id } => {
                tracker.meta_for(call_id);
            }
            CallEvent::Connected { call_id: Some(id) } => {
                tracker.meta_for(id).connected = true;
            }
            CallEvent::Connected { call_id: None } => {}
            CallEvent::Ended { call_id, duration } => {
                let Some(meta) = tracker.calls.remove(call_id) else {
                    debug!("No record kept for call {}", call_id);
                    return;
                };
                let hosted_here = tracker.conference.as_ref().map_or(false, |record| {
                    record.host_call.as_ref().map_or(true, |host| host == call_id)
                });
                let conference = if hosted_here {
                    tracker.participants.clear();
                    tracker.conference.take()
                } else {
                    None
                };
                drop(tracker);

                let conference_id = match conference {
                    Some(record) => {
                        self.finish_conference(&record).await;
                        Some(record.conference_id)
                    }
                    None => None,
                };
                self.log_call(&meta, *duration, conference_id).await;
            }
            CallEvent::Failed { .. } => {
                let calls: Vec<CallMeta> = tracker.calls.drain().map(|(_, meta)| meta).collect();
                let conference = tracker.conference.take();
                tracker.participants.clear();
                tracker.pending_dial = None;
                drop(tracker);

                if let Some(record) = &conference {
                    self.finish_conference(record).await;
                }
                for meta in calls {
                    self.log_call(
                        &meta,
                        before.call_duration,
                        conference.as_ref().map(|c| c.conference_id.clone()),
                    )
                    .await;
                }
            }
            CallEvent::ConferenceCreated { conference_id } => {
                let host_call = before.active_call.as_ref().map(|call| call.id.clone());
                let host_number = host_call
                    .as_ref()
                    .and_then(|id| tracker.calls.get(id))
                    .and_then(|meta| meta.phone_number.clone())
                    .unwrap_or_else(|| "host".to_string());
                let created = self
                    .repositories
                    .conferences
                    .create_conference(NewConference {
                        conference_id: conference_id.to_string(),
                        host_number,
                        participant_numbers: Vec::new(),
                        status: ConferenceStatus::Active,
                        end_time: None,
                    })
                    .await;
                match created {
                    Ok(record) => {
                        tracker.conference = Some(ConferenceRecord {
                            conference_id: conference_id.clone(),
                            host_call,
                            record_id: record.id,
                            participant_numbers: Vec::new(),
                        });
                    }
                    Err(e) => error!("Failed to store conference {}: {}", conference_id, e),
                }
            }
            CallEvent::ParticipantJoined {
                conference_id,
                call_id,
                participant_number,
            } => {
                counter!("softphone_calls_total", "direction" => "outbound").increment(1);
                tracker.participants.insert(
                    call_id.clone(),
                    ParticipantMeta {
                        phone_number: participant_number.clone(),
                        joined_at: Utc::now(),
                    },
                );
                let Some(record) = tracker
                    .conference
                    .as_mut()
                    .filter(|record| &record.conference_id == conference_id)
                else {
                    return;
                };
                record.participant_numbers.push(participant_number.clone());
                let update = ConferenceUpdate {
                    participant_numbers: Some(record.participant_numbers.clone()),
                    ..ConferenceUpdate::default()
                };
                let record_id = record.record_id;
                if let Err(e) = self
                    .repositories
                    .conferences
                    .update_conference(record_id, update)
                    .await
                {
                    error!("Failed to update conference {}: {}", conference_id, e);
                }
            }
            CallEvent::ParticipantLeft {
                conference_id,
                call_id,
            } => {
                let Some(participant) = tracker.participants.remove(call_id) else {
                    return;
                };
                drop(tracker);

                let duration = (Utc::now() - participant.joined_at).num_seconds().max(0) as u64;
                self.store_log(NewCallLog {
                    phone_number: participant.phone_number,
                    contact_name: None,
                    direction: CallDirection::Outbound,
                    status: CallLogStatus::Completed,
                    duration,
                    conference_id: Some(conference_id.to_string()),
                    is_conference_call: true,
                })
                .await;
            }
        }
    }

    async fn finish_conference(&self, record: &ConferenceRecord) {
        info!("Conference {} finished", record.conference_id);
        if let Err(e) = self
            .repositories
            .conferences
            .update_conference(record.record_id, ConferenceUpdate::ended())
            .await
        {
            error!("Failed to end conference {}: {}", record.conference_id, e);
        }
    }

    async fn log_call(&self, meta: &CallMeta, duration: u64, conference_id: Option<ConferenceId>) {
        let phone_number = meta
            .phone_number
            .clone()
            .filter(|number| !number.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_NUMBER.to_string());

        let contact_name = match self
            .repositories
            .contacts
            .find_contact_by_number(&phone_number)
            .await
        {
            Ok(Some(contact)) => Some(contact.name),
            Ok(None) => meta.caller_name.clone(),
            Err(e) => {
                warn!("Contact lookup failed for {}: {}", phone_number, e);
                meta.caller_name.clone()
            }
        };

        let status = meta.final_status();
        match status {
            CallLogStatus::Completed => counter!("softphone_calls_completed").increment(1),
            CallLogStatus::Missed => counter!("softphone_calls_missed").increment(1),
            CallLogStatus::Failed => counter!("softphone_calls_failed").increment(1),
        }

        self.store_log(NewCallLog {
            phone_number,
            contact_name,
            direction: meta.direction,
            status,
            duration: if status == CallLogStatus::Completed { duration } else { 0 },
            is_conference_call: conference_id.is_some(),
            conference_id: conference_id.map(|id| id.to_string()),
        })
        .await;
    }

    async fn store_log(&self, log: NewCallLog) {
        let phone_number = log.phone_number.clone();
        match self.repositories.call_logs.create_call_log(log).await {
            Ok(stored) => info!(
                "Logged {} {} call with {}",
                stored.status.as_str(),
                stored.direction.as_str(),
                phone_number
            ),
            Err(e) => error!("Failed to store call log for {}: {}", phone_number, e),
        }
    }
}

/// Softphone service: commands in, state and notifications out
pub struct SoftphoneService {
    client: Arc<CallClient>,
    shared: Arc<Shared>,
    tasks: Vec<JoinHandle<()>>,
}

impl SoftphoneService {
    /// Subscribe to `client` and start the reducer and duration ticker
    pub async fn start(client: Arc<CallClient>, repositories: SoftphoneRepositories) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            state: RwLock::new(CallState::default()),
            updates,
            tracker: Mutex::new(CallTracker::default()),
            repositories,
        });

        let subscription = client.subscribe().await;
        let reducer = tokio::spawn(run_reducer(subscription, Arc::clone(&shared)));
        let ticker = tokio::spawn(run_ticker(Arc::clone(&shared)));
        info!("Softphone service started");

        Self {
            client,
            shared,
            tasks: vec![reducer, ticker],
        }
    }

    /// Open the session with `credentials`, or with the stored settings when `None`
    pub async fn connect(&self, credentials: Option<Credentials>) -> Result<()> {
        let credentials = match credentials {
            Some(credentials) => credentials,
            None => self
                .shared
                .repositories
                .settings
                .get_settings()
                .await?
                .map(|settings| settings.credentials())
                .unwrap_or_default(),
        };

        let was_connected = self.shared.state.read().await.is_connected;
        match self.client.connect(&credentials).await {
            Ok(()) if was_connected => {
                debug!("connect: session already up");
                Ok(())
            }
            Ok(()) => {
                self.shared
                    .update_state(|state| state.apply(&CallEvent::Connected { call_id: None }))
                    .await;
                gauge!("softphone_session_connected").set(1.0);
                self.shared
                    .notify(NotificationLevel::Info, "Connected", "Softphone session ready");
                Ok(())
            }
            Err(e) => {
                if !matches!(e, DomainError::InvalidOperation(_)) {
                    self.shared.notify(NotificationLevel::Error, "Connection Failed", e.to_string());
                }
                Err(e)
            }
        }
    }

    pub async fn disconnect(&self) {
        self.client.disconnect().await;
        {
            let mut tracker = self.shared.tracker.lock().await;
            *tracker = CallTracker::default();
        }
        self.shared.update_state(|_| CallState::disconnected()).await;
        gauge!("softphone_session_connected").set(0.0);
        gauge!("softphone_active_calls").set(0.0);
    }

    pub async fn dial(&self, destination: &str) -> Result<CallId> {
        let destination = destination.trim().to_string();
        self.shared.tracker.lock().await.pending_dial = Some(destination.clone());

        // Show progress right away, but only when nothing else is in flight
        let mut marked = false;
        self.shared
            .update_state(|state| {
                if state.call_status == CallStatus::Idle
                    && state.active_call.is_none()
                    && state.incoming_call.is_none()
                {
                    marked = true;
                    state.dialing()
                } else {
                    state
                }
            })
            .await;

        match self.client.dial(&destination).await {
            Ok(call_id) => {
                counter!("softphone_calls_total", "direction" => "outbound").increment(1);
                let mut tracker = self.shared.tracker.lock().await;
                let meta = tracker.meta_for(&call_id);
                if meta.phone_number.is_none() {
                    meta.phone_number = Some(destination);
                }
                tracker.pending_dial = None;
                Ok(call_id)
            }
            Err(e) => {
                self.shared.tracker.lock().await.pending_dial = None;
                if marked {
                    self.shared.update_state(CallState::dial_failed).await;
                }
                self.shared.notify(NotificationLevel::Error, "Call Failed", e.to_string());
                Err(e)
            }
        }
    }

    pub async fn answer(&self) {
        self.client.answer().await;
    }

    pub async fn decline(&self) {
        self.client.decline().await;
    }

    pub async fn hangup(&self) {
        self.client.hangup().await;
    }

    /// Flip mute on the current call
    pub async fn toggle_mute(&self) -> CallState {
        let state = self.state().await;
        if state.active_call.is_none() {
            return state;
        }
        if state.is_muted {
            self.client.unmute().await;
        } else {
            self.client.mute().await;
        }
        self.shared.update_state(CallState::toggle_mute).await
    }

    /// Flip hold on the current call
    pub async fn toggle_hold(&self) -> CallState {
        let state = self.state().await;
        if state.active_call.is_none() {
            return state;
        }
        if state.is_on_hold {
            self.client.unhold().await;
        } else {
            self.client.hold().await;
        }
        self.shared.update_state(CallState::toggle_hold).await
    }

    pub async fn transfer(&self, destination: &str) {
        self.client.transfer(destination).await;
    }

    pub async fn create_conference(&self) -> Option<ConferenceId> {
        self.client.create_conference().await
    }

    pub async fn add_participant(&self, phone_number: &str) -> Result<Option<CallId>> {
        self.client.add_participant(phone_number).await
    }

    pub async fn remove_participant(&self, call_id: &CallId) -> bool {
        self.client.remove_participant(call_id).await
    }

    pub async fn end_conference(&self) {
        self.client.end_conference().await;
    }

    /// Current state snapshot
    pub async fn state(&self) -> CallState {
        self.shared.state.read().await.clone()
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<SoftphoneUpdate> {
        self.shared.updates.subscribe()
    }

    pub fn client(&self) -> &Arc<CallClient> {
        &self.client
    }
}

impl Drop for SoftphoneService {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn run_reducer(mut subscription: Subscription, shared: Arc<Shared>) {
    debug!("Reducer attached as {}", subscription.id());
    while let Some(event) = subscription.recv().await {
        shared.handle_event(event).await;
    }
    debug!("Reducer stopped: client gone");
}

async fn run_ticker(shared: Arc<Shared>) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First tick completes immediately
    interval.tick().await;
    loop {
        interval.tick().await;
        shared.update_state(CallState::tick).await;
    }
}
