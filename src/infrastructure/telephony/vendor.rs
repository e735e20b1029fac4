//! Vendor client port
//!
//! Everything vendor-specific stops here. A vendor implementation pushes
//! [`VendorSignal`]s into the sender it receives on `connect`; call control
//! goes through [`VendorCall`] handles and is fire-and-forget.

use crate::domain::call::Login;
use crate::domain::shared::value_objects::{CallId, ConferenceId};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

#[cfg(test)]
use mockall::automock;

/// Errors reported by the vendor SDK
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VendorError {
    #[error("session refused: {0}")]
    Refused(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no session")]
    NoSession,
}

/// Call state names reported by the vendor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorCallState {
    Trying,
    Ringing,
    Active,
    Destroyed,
    /// Anything the adapter does not map (held, hangup, requesting, ...)
    Other(String),
}

impl VendorCallState {
    /// Parse a vendor state name
    pub fn parse(name: &str) -> Self {
        match name {
            "trying" => VendorCallState::Trying,
            "ringing" => VendorCallState::Ringing,
            "active" => VendorCallState::Active,
            "destroy" | "destroyed" => VendorCallState::Destroyed,
            other => VendorCallState::Other(other.to_string()),
        }
    }
}

/// Raw callbacks from the vendor session
pub enum VendorSignal {
    SessionReady,
    SessionError(String),
    /// Inbound call offer
    CallReceived {
        call: Arc<dyn VendorCall>,
        caller_name: Option<String>,
        caller_number: Option<String>,
    },
    CallState {
        call_id: CallId,
        state: VendorCallState,
        /// Seconds since the call went active, as reported by the vendor
        duration: u64,
    },
}

impl fmt::Debug for VendorSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VendorSignal::SessionReady => f.write_str("SessionReady"),
            VendorSignal::SessionError(detail) => write!(f, "SessionError({})", detail),
            VendorSignal::CallReceived {
                call, caller_number, ..
            } => write!(f, "CallReceived({}, {:?})", call.id(), caller_number),
            VendorSignal::CallState {
                call_id,
                state,
                duration,
            } => write!(f, "CallState({}, {:?}, {}s)", call_id, state, duration),
        }
    }
}

pub type SignalSender = mpsc::UnboundedSender<VendorSignal>;

/// Parameters for placing a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCallRequest {
    pub destination_number: String,
    pub caller_id_number: Option<String>,
    pub caller_id_name: Option<String>,
    /// Tags a call placed into a conference
    pub conference_id: Option<ConferenceId>,
}

impl NewCallRequest {
    pub fn to(destination: impl Into<String>) -> Self {
        Self {
            destination_number: destination.into(),
            caller_id_number: None,
            caller_id_name: None,
            conference_id: None,
        }
    }

    pub fn in_conference(mut self, conference_id: ConferenceId) -> Self {
        self.conference_id = Some(conference_id);
        self
    }
}

/// Handle to a vendor-managed call
#[cfg_attr(test, automock)]
pub trait VendorCall: Send + Sync {
    fn id(&self) -> CallId;
    fn answer(&self);
    fn hangup(&self);
    fn mute_audio(&self);
    fn unmute_audio(&self);
    fn hold(&self);
    fn unhold(&self);
    fn transfer(&self, destination: &str);
}

/// The vendor WebRTC client
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VendorClient: Send + Sync {
    /// Open the session. Readiness and failures arrive later on `signals`.
    async fn connect(&self, login: &Login, signals: SignalSender) -> Result<(), VendorError>;

    async fn new_call(&self, request: NewCallRequest) -> Result<Arc<dyn VendorCall>, VendorError>;

    fn disconnect(&self);
}
