//! Call domain events
//!
//! The closed set of events the call client emits. Vendor payloads never
//! leave the adapter; each variant carries only the fields relevant to it.

use crate::domain::shared::value_objects::{CallId, ConferenceId};
use serde::{Deserialize, Serialize};

/// Union of all call events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallEvent {
    /// Inbound call offered by the remote side
    Incoming {
        call_id: CallId,
        caller_name: Option<String>,
        caller_number: Option<String>,
    },
    /// Call is trying or ringing
    Connecting { call_id: CallId },
    /// Call media is up. Without a call id this is the session itself.
    Connected { call_id: Option<CallId> },
    /// Call torn down; duration in seconds
    Ended { call_id: CallId, duration: u64 },
    /// Session-level failure
    Failed { reason: Option<String> },
    ConferenceCreated { conference_id: ConferenceId },
    ParticipantJoined {
        conference_id: ConferenceId,
        call_id: CallId,
        participant_number: String,
    },
    ParticipantLeft {
        conference_id: ConferenceId,
        call_id: CallId,
    },
}

impl CallEvent {
    /// Returns the event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            CallEvent::Incoming { .. } => "incoming",
            CallEvent::Connecting { .. } => "connecting",
            CallEvent::Connected { .. } => "connected",
            CallEvent::Ended { .. } => "ended",
            CallEvent::Failed { .. } => "failed",
            CallEvent::ConferenceCreated { .. } => "conference_created",
            CallEvent::ParticipantJoined { .. } => "participant_joined",
            CallEvent::ParticipantLeft { .. } => "participant_left",
        }
    }

    pub fn call_id(&self) -> Option<&CallId> {
        match self {
            CallEvent::Incoming { call_id, .. }
            | CallEvent::Connecting { call_id }
            | CallEvent::Ended { call_id, .. }
            | CallEvent::ParticipantJoined { call_id, .. }
            | CallEvent::ParticipantLeft { call_id, .. } => Some(call_id),
            CallEvent::Connected { call_id } => call_id.as_ref(),
            CallEvent::Failed { .. } | CallEvent::ConferenceCreated { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = CallEvent::Ended {
            call_id: CallId::from("c1"),
            duration: 42,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ended");
        assert_eq!(json["call_id"], "c1");
        assert_eq!(json["duration"], 42);
    }

    #[test]
    fn test_session_level_connected_has_no_call_id() {
        let event = CallEvent::Connected { call_id: None };
        assert_eq!(event.call_id(), None);
        assert_eq!(event.event_type(), "connected");
    }
}
