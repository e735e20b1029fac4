//! Telephony - wraps the vendor WebRTC client
//!
//! The vendor is reached only through the traits in [`vendor`]. The
//! [`CallClient`] turns vendor signals into `CallEvent`s and keeps the single
//! active call, the pending inbound call and the conference legs.

pub mod client;
pub mod loopback;
pub mod vendor;

pub use client::{CallClient, Subscription};
pub use loopback::{LoopbackCommand, LoopbackVendor};
pub use vendor::{
    NewCallRequest, SignalSender, VendorCall, VendorCallState, VendorClient, VendorError,
    VendorSignal,
};
