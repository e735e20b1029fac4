//! Call client adapter
//!
//! Owns one vendor session and the call handles it produces. Commands are
//! fire-and-forget; their outcome shows up later as `CallEvent`s delivered
//! to every subscriber in emission order.

use super::vendor::{NewCallRequest, VendorCall, VendorCallState, VendorClient, VendorSignal};
use crate::domain::call::{CallEvent, ConnectionState, Credentials};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{CallId, ConferenceId, SubscriptionId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Ordered stream of events for one subscriber
pub struct Subscription {
    id: SubscriptionId,
    events: mpsc::UnboundedReceiver<CallEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next event; `None` once unsubscribed or the client is gone
    pub async fn recv(&mut self) -> Option<CallEvent> {
        self.events.recv().await
    }

    /// Next already-emitted event, without waiting
    pub fn try_recv(&mut self) -> Option<CallEvent> {
        self.events.try_recv().ok()
    }
}

struct ParticipantLeg {
    call: Arc<dyn VendorCall>,
    phone_number: String,
}

struct ConferenceSession {
    id: ConferenceId,
    participants: HashMap<CallId, ParticipantLeg>,
    is_host: bool,
}

#[derive(Default)]
struct ClientInner {
    connection: ConnectionState,
    /// The one call carrying media
    active: Option<Arc<dyn VendorCall>>,
    /// Inbound offer awaiting answer or decline
    pending: Option<Arc<dyn VendorCall>>,
    /// Primary calls hung up locally whose teardown the vendor has not confirmed yet
    closing: HashSet<CallId>,
    conference: Option<ConferenceSession>,
    listeners: Vec<(SubscriptionId, mpsc::UnboundedSender<CallEvent>)>,
}

impl ClientInner {
    fn emit(&mut self, event: CallEvent) {
        debug!("Emitting {} event", event.event_type());
        self.listeners.retain(|(id, tx)| {
            let delivered = tx.send(event.clone()).is_ok();
            if !delivered {
                debug!("Dropping closed subscriber {}", id);
            }
            delivered
        });
    }

    fn current(&self) -> Option<&Arc<dyn VendorCall>> {
        self.active.as_ref().or(self.pending.as_ref())
    }

    fn is_active(&self, call_id: &CallId) -> bool {
        self.active.as_ref().map(|c| c.id()).as_ref() == Some(call_id)
    }

    fn is_pending(&self, call_id: &CallId) -> bool {
        self.pending.as_ref().map(|c| c.id()).as_ref() == Some(call_id)
    }

    fn handle_signal(&mut self, signal: VendorSignal) {
        trace!("Vendor signal: {:?}", signal);

        match signal {
            VendorSignal::SessionReady => {
                self.connection = ConnectionState::Connected;
            }
            VendorSignal::SessionError(detail) => self.fail_session(detail),
            VendorSignal::CallReceived {
                call,
                caller_name,
                caller_number,
            } => {
                let call_id = call.id();
                if self.active.is_some() || self.pending.is_some() {
                    info!("Rejecting inbound call {} while another call is up", call_id);
                    call.hangup();
                    return;
                }

                info!("Inbound call {} from {:?}", call_id, caller_number);
                self.pending = Some(call);
                self.emit(CallEvent::Incoming {
                    call_id,
                    caller_name,
                    caller_number,
                });
            }
            VendorSignal::CallState {
                call_id,
                state,
                duration,
            } => self.handle_call_state(call_id, state, duration),
        }
    }

    fn handle_call_state(&mut self, call_id: CallId, state: VendorCallState, duration: u64) {
        let participant_of = self
            .conference
            .as_ref()
            .filter(|conference| conference.participants.contains_key(&call_id))
            .map(|conference| conference.id.clone());

        if let Some(conference_id) = participant_of {
            if state == VendorCallState::Destroyed {
                if let Some(conference) = self.conference.as_mut() {
                    conference.participants.remove(&call_id);
                }
                info!("Participant {} left conference {}", call_id, conference_id);
                self.emit(CallEvent::ParticipantLeft {
                    conference_id,
                    call_id,
                });
            }
            return;
        }

        let live = self.is_active(&call_id) || self.is_pending(&call_id);

        match state {
            VendorCallState::Trying | VendorCallState::Ringing if live => {
                self.emit(CallEvent::Connecting { call_id });
            }
            VendorCallState::Active if live => {
                if self.is_pending(&call_id) {
                    self.active = self.pending.take();
                }
                info!("Call {} active", call_id);
                self.emit(CallEvent::Connected {
                    call_id: Some(call_id),
                });
            }
            VendorCallState::Destroyed if live || self.closing.contains(&call_id) => {
                self.closing.remove(&call_id);
                if self.is_pending(&call_id) {
                    self.pending = None;
                }
                if self.is_active(&call_id) {
                    self.active = None;
                    self.drop_conference();
                }
                info!("Call {} ended after {}s", call_id, duration);
                self.emit(CallEvent::Ended { call_id, duration });
            }
            VendorCallState::Other(name) => {
                trace!("Unmapped state {} for call {}", name, call_id);
            }
            _ => {
                trace!("Ignoring state for untracked call {}", call_id);
            }
        }
    }

    /// Session is gone: forget every handle and tell subscribers once
    fn fail_session(&mut self, detail: String) {
        warn!("Vendor session failed: {}", detail);
        self.connection = ConnectionState::Disconnected;
        self.active = None;
        self.pending = None;
        self.closing.clear();
        self.conference = None;
        self.emit(CallEvent::Failed {
            reason: Some(detail),
        });
    }

    /// Hang up every participant leg of a conference whose host call is gone
    fn drop_conference(&mut self) {
        if let Some(conference) = self.conference.take() {
            for (call_id, leg) in conference.participants {
                debug!("Hanging up orphaned participant {} ({})", call_id, leg.phone_number);
                leg.call.hangup();
            }
        }
    }
}

/// Adapter over a vendor WebRTC client
pub struct CallClient {
    vendor: Arc<dyn VendorClient>,
    inner: Arc<Mutex<ClientInner>>,
    pump: Mutex<Option<JoinHandle<()>>>,
    next_subscription: AtomicU64,
    connect_timeout: Duration,
}

impl CallClient {
    pub fn new(vendor: Arc<dyn VendorClient>) -> Self {
        Self {
            vendor,
            inner: Arc::new(Mutex::new(ClientInner::default())),
            pump: Mutex::new(None),
            next_subscription: AtomicU64::new(1),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Open the vendor session.
    ///
    /// Resolves once the vendor reports ready. Already connected is a no-op.
    pub async fn connect(&self, credentials: &Credentials) -> Result<()> {
        let login = credentials.resolve()?;

        {
            let mut inner = self.inner.lock().await;
            match inner.connection {
                ConnectionState::Connected => {
                    debug!("connect ignored: session already up");
                    return Ok(());
                }
                ConnectionState::Connecting => {
                    return Err(DomainError::InvalidOperation(
                        "a connection attempt is already in progress".to_string(),
                    ));
                }
                ConnectionState::Disconnected => inner.connection = ConnectionState::Connecting,
            }
        }

        info!("Connecting vendor session ({:?})", login);
        let (tx, mut rx) = mpsc::unbounded_channel();

        if let Err(e) = self.vendor.connect(&login, tx).await {
            self.inner.lock().await.connection = ConnectionState::Disconnected;
            warn!("Vendor refused session: {}", e);
            return Err(DomainError::Connection(e.to_string()));
        }

        let outcome = tokio::time::timeout(self.connect_timeout, async {
            while let Some(signal) = rx.recv().await {
                let mut inner = self.inner.lock().await;
                match signal {
                    VendorSignal::SessionReady => return Ok(()),
                    VendorSignal::SessionError(detail) => {
                        inner.fail_session(detail.clone());
                        return Err(detail);
                    }
                    other => inner.handle_signal(other),
                }
            }
            Err("vendor closed the session before it became ready".to_string())
        })
        .await;

        let detail = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(detail)) => Some(detail),
            Err(_) => {
                self.vendor.disconnect();
                Some(format!(
                    "session not ready after {}s",
                    self.connect_timeout.as_secs()
                ))
            }
        };

        if let Some(detail) = detail {
            self.inner.lock().await.connection = ConnectionState::Disconnected;
            return Err(DomainError::Connection(detail));
        }

        self.inner.lock().await.connection = ConnectionState::Connected;
        info!("Vendor session ready");

        let inner = Arc::clone(&self.inner);
        let pump = tokio::spawn(async move {
            while let Some(signal) = rx.recv().await {
                inner.lock().await.handle_signal(signal);
            }

            let mut inner = inner.lock().await;
            if inner.connection == ConnectionState::Connected {
                inner.fail_session("vendor session closed".to_string());
            }
        });

        if let Some(previous) = self.pump.lock().await.replace(pump) {
            previous.abort();
        }

        Ok(())
    }

    /// Tear the session down and forget every call
    pub async fn disconnect(&self) {
        if let Some(pump) = self.pump.lock().await.take() {
            pump.abort();
        }

        let mut inner = self.inner.lock().await;
        if inner.connection == ConnectionState::Disconnected && inner.current().is_none() {
            return;
        }

        info!("Disconnecting vendor session");
        self.vendor.disconnect();
        inner.connection = ConnectionState::Disconnected;
        inner.active = None;
        inner.pending = None;
        inner.closing.clear();
        inner.conference = None;
    }

    /// Place an outbound call
    pub async fn dial(&self, destination: &str) -> Result<CallId> {
        let mut inner = self.inner.lock().await;
        if inner.connection != ConnectionState::Connected {
            return Err(DomainError::NotConnected);
        }

        let destination = destination.trim();
        if destination.is_empty() {
            return Err(DomainError::invalid_field("destination", "must not be empty"));
        }
        if inner.current().is_some() {
            return Err(DomainError::InvalidOperation(
                "another call is already in progress".to_string(),
            ));
        }

        // Lock stays held so early vendor signals for this call queue behind it
        let call = self
            .vendor
            .new_call(NewCallRequest::to(destination))
            .await
            .map_err(|e| DomainError::Connection(e.to_string()))?;

        let call_id = call.id();
        info!("Dialing {} as call {}", destination, call_id);
        inner.active = Some(call);
        Ok(call_id)
    }

    /// Accept the pending inbound call
    pub async fn answer(&self) {
        let mut inner = self.inner.lock().await;
        match inner.pending.take() {
            Some(call) => {
                info!("Answering call {}", call.id());
                call.answer();
                inner.active = Some(call);
            }
            None => debug!("answer ignored: no incoming call"),
        }
    }

    /// Reject the pending inbound call
    pub async fn decline(&self) {
        let mut inner = self.inner.lock().await;
        match inner.pending.take() {
            Some(call) => {
                info!("Declining call {}", call.id());
                call.hangup();
                inner.closing.insert(call.id());
            }
            None => debug!("decline ignored: no incoming call"),
        }
    }

    pub async fn hangup(&self) {
        let mut inner = self.inner.lock().await;
        let call = match inner.active.take() {
            Some(call) => {
                // Legs cannot outlive the host call
                inner.drop_conference();
                Some(call)
            }
            None => inner.pending.take(),
        };
        match call {
            Some(call) => {
                info!("Hanging up call {}", call.id());
                call.hangup();
                inner.closing.insert(call.id());
            }
            None => debug!("hangup ignored: no call"),
        }
    }

    pub async fn mute(&self) {
        self.with_current("mute", |call| call.mute_audio()).await;
    }

    pub async fn unmute(&self) {
        self.with_current("unmute", |call| call.unmute_audio()).await;
    }

    pub async fn hold(&self) {
        self.with_current("hold", |call| call.hold()).await;
    }

    pub async fn unhold(&self) {
        self.with_current("unhold", |call| call.unhold()).await;
    }

    /// Blind transfer of the current call
    pub async fn transfer(&self, destination: &str) {
        let destination = destination.trim();
        if destination.is_empty() {
            warn!("transfer ignored: empty destination");
            return;
        }
        self.with_current("transfer", |call| call.transfer(destination))
            .await;
    }

    /// Promote the active call into a conference
    pub async fn create_conference(&self) -> Option<ConferenceId> {
        let mut inner = self.inner.lock().await;
        if inner.active.is_none() {
            debug!("create_conference ignored: no active call");
            return None;
        }
        if let Some(conference) = &inner.conference {
            return Some(conference.id.clone());
        }

        let conference_id = ConferenceId::generate();
        info!("Created conference {}", conference_id);
        inner.conference = Some(ConferenceSession {
            id: conference_id.clone(),
            participants: HashMap::new(),
            is_host: true,
        });
        inner.emit(CallEvent::ConferenceCreated {
            conference_id: conference_id.clone(),
        });
        Some(conference_id)
    }

    /// Call `phone_number` into the running conference.
    ///
    /// `Ok(None)` when there is no conference.
    pub async fn add_participant(&self, phone_number: &str) -> Result<Option<CallId>> {
        let mut inner = self.inner.lock().await;
        let Some(conference_id) = inner.conference.as_ref().map(|c| c.id.clone()) else {
            debug!("add_participant ignored: no conference");
            return Ok(None);
        };

        let phone_number = phone_number.trim();
        if phone_number.is_empty() {
            return Err(DomainError::invalid_field("phoneNumber", "must not be empty"));
        }
        if inner.connection != ConnectionState::Connected {
            return Err(DomainError::NotConnected);
        }

        let call = self
            .vendor
            .new_call(NewCallRequest::to(phone_number).in_conference(conference_id.clone()))
            .await
            .map_err(|e| DomainError::Connection(e.to_string()))?;
        let call_id = call.id();

        if let Some(conference) = inner.conference.as_mut() {
            conference.participants.insert(
                call_id.clone(),
                ParticipantLeg {
                    call,
                    phone_number: phone_number.to_string(),
                },
            );
        }

        info!("Adding {} to conference {} as {}", phone_number, conference_id, call_id);
        inner.emit(CallEvent::ParticipantJoined {
            conference_id,
            call_id: call_id.clone(),
            participant_number: phone_number.to_string(),
        });
        Ok(Some(call_id))
    }

    /// Hang up one participant. Returns false when the id is unknown.
    pub async fn remove_participant(&self, call_id: &CallId) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(conference) = inner.conference.as_mut() else {
            return false;
        };
        let Some(leg) = conference.participants.remove(call_id) else {
            debug!("remove_participant ignored: {} not in conference", call_id);
            return false;
        };
        let conference_id = conference.id.clone();

        leg.call.hangup();
        info!("Removed {} from conference {}", call_id, conference_id);
        inner.emit(CallEvent::ParticipantLeft {
            conference_id,
            call_id: call_id.clone(),
        });
        true
    }

    /// Hang up the host call and every participant, then drop the conference
    pub async fn end_conference(&self) {
        let mut inner = self.inner.lock().await;
        let Some(conference) = inner.conference.take() else {
            debug!("end_conference ignored: no conference");
            return;
        };

        info!(
            "Ending conference {} with {} participants",
            conference.id,
            conference.participants.len()
        );
        for leg in conference.participants.into_values() {
            leg.call.hangup();
        }
        if let Some(primary) = inner.active.take() {
            primary.hangup();
            inner.closing.insert(primary.id());
        }
    }

    /// Register a new subscriber
    pub async fn subscribe(&self) -> Subscription {
        let id = SubscriptionId::new(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().await.listeners.push((id, tx));
        debug!("Subscriber {} registered", id);
        Subscription { id, events: rx }
    }

    /// Returns whether the subscriber was registered
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock().await;
        let before = inner.listeners.len();
        inner.listeners.retain(|(listener, _)| *listener != id);
        inner.listeners.len() != before
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.inner.lock().await.connection
    }

    pub async fn active_call_id(&self) -> Option<CallId> {
        self.inner.lock().await.active.as_ref().map(|call| call.id())
    }

    pub async fn pending_call_id(&self) -> Option<CallId> {
        self.inner.lock().await.pending.as_ref().map(|call| call.id())
    }

    pub async fn conference_id(&self) -> Option<ConferenceId> {
        self.inner
            .lock()
            .await
            .conference
            .as_ref()
            .map(|conference| conference.id.clone())
    }

    /// Whether this client hosts the running conference
    pub async fn is_conference_host(&self) -> bool {
        self.inner
            .lock()
            .await
            .conference
            .as_ref()
            .map_or(false, |conference| conference.is_host)
    }

    pub async fn participant_ids(&self) -> Vec<CallId> {
        self.inner
            .lock()
            .await
            .conference
            .as_ref()
            .map(|conference| conference.participants.keys().cloned().collect())
            .unwrap_or_default()
    }

    async fn with_current(&self, command: &str, action: impl FnOnce(&dyn VendorCall)) {
        let inner = self.inner.lock().await;
        match inner.current() {
            Some(call) => {
                debug!("{} on call {}", command, call.id());
                action(call.as_ref());
            }
            None => debug!("{} ignored: no call", command),
        }
    }
}

impl Drop for CallClient {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.get_mut().take() {
            pump.abort();
        }
    }
}
