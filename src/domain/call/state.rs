//! Call state reducer
//!
//! `CallState` is the snapshot the presentation layer renders. It only
//! changes by folding `CallEvent`s through [`CallState::apply`] or through
//! the local toggles below; none of these touch the vendor.

use crate::domain::call::event::CallEvent;
use crate::domain::call::value_object::{ActiveCall, CallStatus, IncomingCall};
use crate::domain::shared::value_objects::{CallId, ConferenceId};
use serde::{Deserialize, Serialize};

/// Participant leg of a conference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceParticipant {
    pub call_id: CallId,
    pub phone_number: String,
}

/// Conference as seen by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceSnapshot {
    pub conference_id: ConferenceId,
    pub participants: Vec<ConferenceParticipant>,
    pub is_host: bool,
}

/// Observed call, connection and conference state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallState {
    pub is_connected: bool,
    pub active_call: Option<ActiveCall>,
    pub call_status: CallStatus,
    pub is_muted: bool,
    pub is_on_hold: bool,
    pub incoming_call: Option<IncomingCall>,
    /// Seconds; counts up while connected, holds the last call's length after it ends
    pub call_duration: u64,
    pub conference: Option<ConferenceSnapshot>,
}

/// Fold one event into a copy of `state`
pub fn reduce(state: &CallState, event: &CallEvent) -> CallState {
    state.clone().apply(event)
}

impl CallState {
    pub fn apply(mut self, event: &CallEvent) -> Self {
        match event {
            CallEvent::Incoming {
                call_id,
                caller_name,
                caller_number,
            } => {
                self.incoming_call = Some(IncomingCall {
                    id: call_id.clone(),
                    caller_name: caller_name.clone(),
                    caller_number: caller_number.clone(),
                });
            }
            CallEvent::Connecting { .. } => {
                if matches!(self.call_status, CallStatus::Idle | CallStatus::Connecting) {
                    self.call_status = CallStatus::Connecting;
                }
            }
            CallEvent::Connected { call_id: Some(id) } => {
                let same_call = self.active_call.as_ref().map_or(false, |active| &active.id == id);
                // Carry caller details over when this is the offered call being accepted
                let offered = self.incoming_call.take().filter(|incoming| &incoming.id == id);
                let previous = self.active_call.take().filter(|active| &active.id == id);

                self.active_call = Some(match (offered, previous) {
                    (Some(incoming), _) => ActiveCall {
                        id: incoming.id,
                        caller_name: incoming.caller_name,
                        caller_number: incoming.caller_number,
                    },
                    (None, Some(active)) => active,
                    (None, None) => ActiveCall {
                        id: id.clone(),
                        caller_name: None,
                        caller_number: None,
                    },
                });
                if !same_call || self.call_status != CallStatus::Connected {
                    self.call_duration = 0;
                }
                if !same_call {
                    self.is_muted = false;
                    self.is_on_hold = false;
                }
                self.call_status = CallStatus::Connected;
            }
            CallEvent::Connected { call_id: None } => {
                self.is_connected = true;
            }
            CallEvent::Ended { call_id, duration } => {
                // Late teardown of a call that was already replaced on screen
                if !self.holds_other_call(call_id) {
                    self.clear_call();
                    self.call_duration = *duration;
                }
            }
            CallEvent::Failed { .. } => {
                self.clear_call();
                self.is_connected = false;
            }
            CallEvent::ConferenceCreated { conference_id } => {
                if self.conference.as_ref().map(|c| &c.conference_id) != Some(conference_id) {
                    self.conference = Some(ConferenceSnapshot {
                        conference_id: conference_id.clone(),
                        participants: Vec::new(),
                        is_host: true,
                    });
                }
            }
            CallEvent::ParticipantJoined {
                conference_id,
                call_id,
                participant_number,
            } => {
                if let Some(conference) = self.conference_mut(conference_id) {
                    if !conference.participants.iter().any(|p| &p.call_id == call_id) {
                        conference.participants.push(ConferenceParticipant {
                            call_id: call_id.clone(),
                            phone_number: participant_number.clone(),
                        });
                    }
                }
            }
            CallEvent::ParticipantLeft {
                conference_id,
                call_id,
            } => {
                if let Some(conference) = self.conference_mut(conference_id) {
                    conference.participants.retain(|p| &p.call_id != call_id);
                }
            }
        }
        self
    }

    /// Optimistic mute toggle; ignored without an active call
    pub fn toggle_mute(mut self) -> Self {
        if self.active_call.is_some() {
            self.is_muted = !self.is_muted;
        }
        self
    }

    /// Optimistic hold toggle; ignored without an active call
    pub fn toggle_hold(mut self) -> Self {
        if self.active_call.is_some() {
            self.is_on_hold = !self.is_on_hold;
        }
        self
    }

    /// An outbound call was just placed
    pub fn dialing(mut self) -> Self {
        self.call_status = CallStatus::Connecting;
        self
    }

    /// Placing the call failed before the vendor reported anything
    pub fn dial_failed(mut self) -> Self {
        if self.active_call.is_none() {
            self.call_status = CallStatus::Idle;
        }
        self
    }

    /// One second of connected time elapsed
    pub fn tick(mut self) -> Self {
        if self.call_status == CallStatus::Connected {
            self.call_duration += 1;
        }
        self
    }

    /// Session torn down by the user
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Status to render: an offered call shows as ringing while otherwise idle
    pub fn display_status(&self) -> CallStatus {
        if self.call_status == CallStatus::Idle && self.incoming_call.is_some() {
            CallStatus::Ringing
        } else {
            self.call_status
        }
    }

    fn holds_other_call(&self, call_id: &CallId) -> bool {
        let shown: Vec<&CallId> = self
            .active_call
            .iter()
            .map(|call| &call.id)
            .chain(self.incoming_call.iter().map(|call| &call.id))
            .collect();
        !shown.is_empty() && !shown.contains(&call_id)
    }

    fn clear_call(&mut self) {
        self.call_status = CallStatus::Idle;
        self.active_call = None;
        self.incoming_call = None;
        self.conference = None;
        self.is_muted = false;
        self.is_on_hold = false;
    }

    fn conference_mut(&mut self, conference_id: &ConferenceId) -> Option<&mut ConferenceSnapshot> {
        self.conference
            .as_mut()
            .filter(|conference| &conference.conference_id == conference_id)
    }
}
