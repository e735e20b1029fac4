//! Call bounded context - events, values and the state reducer

pub mod event;
pub mod state;
pub mod value_object;

pub use event::CallEvent;
pub use state::{reduce, CallState, ConferenceParticipant, ConferenceSnapshot};
pub use value_object::{
    ActiveCall, CallStatus, ConnectionState, Credentials, IncomingCall, Login,
};
