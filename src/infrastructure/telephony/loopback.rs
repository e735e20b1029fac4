//! In-process loopback vendor
//!
//! Stands in for the WebRTC SDK during development and tests. Calls never
//! leave the process: every command is recorded per call, and the remote
//! side (inbound offers, answering, hanging up, session loss) is driven
//! through the methods on [`LoopbackVendor`].

use super::vendor::{
    NewCallRequest, SignalSender, VendorCall, VendorCallState, VendorClient, VendorError,
    VendorSignal,
};
use crate::domain::call::Login;
use crate::domain::shared::value_objects::CallId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// A command the local side sent to a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopbackCommand {
    Answer,
    Hangup,
    Mute,
    Unmute,
    Hold,
    Unhold,
    Transfer(String),
}

#[derive(Default)]
struct CallRecord {
    active_since: Option<DateTime<Utc>>,
    destroyed: bool,
    commands: Vec<LoopbackCommand>,
}

#[derive(Default)]
struct LoopbackState {
    signals: Option<SignalSender>,
    calls: HashMap<CallId, CallRecord>,
    placed: Vec<NewCallRequest>,
    next_call: u64,
    logins: usize,
}

impl LoopbackState {
    fn send(&self, signal: VendorSignal) {
        match &self.signals {
            Some(tx) => {
                if tx.send(signal).is_err() {
                    debug!("Loopback signal dropped: receiver gone");
                }
            }
            None => debug!("Loopback signal dropped: no session"),
        }
    }

    fn next_id(&mut self) -> CallId {
        self.next_call += 1;
        CallId::new(format!("loop-{}", self.next_call))
    }

    fn go_active(&mut self, call_id: &CallId) {
        let Some(record) = self.calls.get_mut(call_id) else {
            return;
        };
        if record.destroyed || record.active_since.is_some() {
            return;
        }
        record.active_since = Some(Utc::now());
        self.send(VendorSignal::CallState {
            call_id: call_id.clone(),
            state: VendorCallState::Active,
            duration: 0,
        });
    }

    fn destroy(&mut self, call_id: &CallId) {
        let Some(record) = self.calls.get_mut(call_id) else {
            return;
        };
        if record.destroyed {
            return;
        }
        record.destroyed = true;
        let duration = record
            .active_since
            .map(|since| (Utc::now() - since).num_seconds().max(0) as u64)
            .unwrap_or(0);
        self.send(VendorSignal::CallState {
            call_id: call_id.clone(),
            state: VendorCallState::Destroyed,
            duration,
        });
    }
}

type Shared = Arc<Mutex<LoopbackState>>;

fn lock(shared: &Shared) -> MutexGuard<'_, LoopbackState> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Call handle produced by the loopback vendor
pub struct LoopbackCall {
    id: CallId,
    shared: Shared,
}

impl LoopbackCall {
    fn record(&self, command: LoopbackCommand) {
        let mut state = lock(&self.shared);
        if let Some(record) = state.calls.get_mut(&self.id) {
            record.commands.push(command);
        }
    }
}

impl VendorCall for LoopbackCall {
    fn id(&self) -> CallId {
        self.id.clone()
    }

    fn answer(&self) {
        self.record(LoopbackCommand::Answer);
        lock(&self.shared).go_active(&self.id);
    }

    fn hangup(&self) {
        self.record(LoopbackCommand::Hangup);
        lock(&self.shared).destroy(&self.id);
    }

    fn mute_audio(&self) {
        self.record(LoopbackCommand::Mute);
    }

    fn unmute_audio(&self) {
        self.record(LoopbackCommand::Unmute);
    }

    fn hold(&self) {
        self.record(LoopbackCommand::Hold);
    }

    fn unhold(&self) {
        self.record(LoopbackCommand::Unhold);
    }

    fn transfer(&self, destination: &str) {
        self.record(LoopbackCommand::Transfer(destination.to_string()));
        // The local leg drops out once the remote side takes over
        lock(&self.shared).destroy(&self.id);
    }
}

/// Loopback vendor client
pub struct LoopbackVendor {
    shared: Shared,
    refuse_with: Option<String>,
    session_error: Option<String>,
    auto_answer: bool,
}

impl LoopbackVendor {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(LoopbackState::default())),
            refuse_with: None,
            session_error: None,
            auto_answer: false,
        }
    }

    /// Refuse every `connect` outright
    pub fn refusing(mut self, detail: impl Into<String>) -> Self {
        self.refuse_with = Some(detail.into());
        self
    }

    /// Accept `connect` but report a session error instead of ready
    pub fn failing_session(mut self, detail: impl Into<String>) -> Self {
        self.session_error = Some(detail.into());
        self
    }

    /// Outbound calls are answered by the remote side right away
    pub fn auto_answer(mut self, enabled: bool) -> Self {
        self.auto_answer = enabled;
        self
    }

    /// Offer an inbound call. `None` without a session.
    pub fn ring_in(&self, caller_name: Option<&str>, caller_number: &str) -> Option<CallId> {
        let call_id = lock(&self.shared).next_id();
        self.ring_in_with_id(call_id, caller_name, caller_number)
    }

    pub fn ring_in_with_id(
        &self,
        call_id: impl Into<CallId>,
        caller_name: Option<&str>,
        caller_number: &str,
    ) -> Option<CallId> {
        let call_id = call_id.into();
        let mut state = lock(&self.shared);
        state.signals.as_ref()?;

        state.calls.insert(call_id.clone(), CallRecord::default());
        info!("Loopback offering call {} from {}", call_id, caller_number);
        state.send(VendorSignal::CallReceived {
            call: Arc::new(LoopbackCall {
                id: call_id.clone(),
                shared: Arc::clone(&self.shared),
            }),
            caller_name: caller_name.map(str::to_string),
            caller_number: Some(caller_number.to_string()),
        });
        Some(call_id)
    }

    /// Remote side picks up an outbound call
    pub fn remote_answer(&self, call_id: &CallId) {
        let mut state = lock(&self.shared);
        state.send(VendorSignal::CallState {
            call_id: call_id.clone(),
            state: VendorCallState::Ringing,
            duration: 0,
        });
        state.go_active(call_id);
    }

    /// Remote side hangs up
    pub fn remote_hangup(&self, call_id: &CallId) {
        lock(&self.shared).destroy(call_id);
    }

    /// Drop the session with an error
    pub fn fail_session(&self, detail: impl Into<String>) {
        lock(&self.shared).send(VendorSignal::SessionError(detail.into()));
    }

    /// Commands sent to a call so far
    pub fn commands(&self, call_id: &CallId) -> Vec<LoopbackCommand> {
        lock(&self.shared)
            .calls
            .get(call_id)
            .map(|record| record.commands.clone())
            .unwrap_or_default()
    }

    pub fn placed_calls(&self) -> Vec<NewCallRequest> {
        lock(&self.shared).placed.clone()
    }

    pub fn is_destroyed(&self, call_id: &CallId) -> bool {
        lock(&self.shared)
            .calls
            .get(call_id)
            .map_or(false, |record| record.destroyed)
    }

    pub fn has_session(&self) -> bool {
        lock(&self.shared).signals.is_some()
    }

    /// Number of `connect` calls the vendor accepted
    pub fn login_count(&self) -> usize {
        lock(&self.shared).logins
    }
}

impl Default for LoopbackVendor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VendorClient for LoopbackVendor {
    async fn connect(&self, login: &Login, signals: SignalSender) -> Result<(), VendorError> {
        if let Some(detail) = &self.refuse_with {
            return Err(VendorError::Refused(detail.clone()));
        }

        debug!("Loopback session opened for {:?}", login);
        let mut state = lock(&self.shared);
        state.logins += 1;
        state.signals = Some(signals);
        match &self.session_error {
            Some(detail) => state.send(VendorSignal::SessionError(detail.clone())),
            None => state.send(VendorSignal::SessionReady),
        }
        Ok(())
    }

    async fn new_call(&self, request: NewCallRequest) -> Result<Arc<dyn VendorCall>, VendorError> {
        let mut state = lock(&self.shared);
        if state.signals.is_none() {
            return Err(VendorError::NoSession);
        }

        let call_id = state.next_id();
        state.calls.insert(call_id.clone(), CallRecord::default());
        state.placed.push(request);
        state.send(VendorSignal::CallState {
            call_id: call_id.clone(),
            state: VendorCallState::Trying,
            duration: 0,
        });
        if self.auto_answer {
            state.go_active(&call_id);
        }

        Ok(Arc::new(LoopbackCall {
            id: call_id,
            shared: Arc::clone(&self.shared),
        }))
    }

    fn disconnect(&self) {
        debug!("Loopback session closed");
        lock(&self.shared).signals = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_refusing_vendor() {
        let vendor = LoopbackVendor::new().refusing("no account");
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = vendor.connect(&Login::Token("t".to_string()), tx).await;
        assert_eq!(result.err(), Some(VendorError::Refused("no account".to_string())));
        assert!(!vendor.has_session());
    }

    #[tokio::test]
    async fn test_outbound_call_lifecycle_signals() {
        let vendor = LoopbackVendor::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        vendor.connect(&Login::Token("t".to_string()), tx).await.unwrap();
        assert!(matches!(rx.recv().await, Some(VendorSignal::SessionReady)));

        let call = vendor.new_call(NewCallRequest::to("+1555")).await.unwrap();
        assert!(matches!(
            rx.recv().await,
            Some(VendorSignal::CallState { state: VendorCallState::Trying, .. })
        ));

        vendor.remote_answer(&call.id());
        assert!(matches!(
            rx.recv().await,
            Some(VendorSignal::CallState { state: VendorCallState::Ringing, .. })
        ));
        assert!(matches!(
            rx.recv().await,
            Some(VendorSignal::CallState { state: VendorCallState::Active, .. })
        ));

        call.mute_audio();
        call.hangup();
        call.hangup();
        assert!(matches!(
            rx.recv().await,
            Some(VendorSignal::CallState { state: VendorCallState::Destroyed, .. })
        ));
        assert!(rx.try_recv().is_err(), "second hangup must not destroy twice");
        assert_eq!(
            vendor.commands(&call.id()),
            vec![
                LoopbackCommand::Mute,
                LoopbackCommand::Hangup,
                LoopbackCommand::Hangup
            ]
        );
    }

    #[tokio::test]
    async fn test_new_call_without_session() {
        let vendor = LoopbackVendor::new();
        let result = vendor.new_call(NewCallRequest::to("+1555")).await;
        assert!(matches!(result, Err(VendorError::NoSession)));
        assert_eq!(vendor.ring_in(None, "+1555"), None);
    }
}
