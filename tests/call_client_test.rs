//! Call client integration tests against the loopback vendor

use softphone::domain::call::{
    reduce, CallEvent, CallState, CallStatus, ConnectionState, Credentials,
};
use softphone::domain::shared::value_objects::CallId;
use softphone::infrastructure::telephony::{
    CallClient, LoopbackCommand, LoopbackVendor, Subscription,
};
use softphone::DomainError;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

fn sip_credentials() -> Credentials {
    Credentials {
        login_token: None,
        username: Some("alice".to_string()),
        password: Some("secret".to_string()),
    }
}

async fn connected_client(vendor: LoopbackVendor) -> (Arc<LoopbackVendor>, CallClient, Subscription) {
    let vendor = Arc::new(vendor);
    let client = CallClient::new(vendor.clone()).with_connect_timeout(Duration::from_secs(1));
    let events = client.subscribe().await;
    assert_ok!(client.connect(&sip_credentials()).await);
    (vendor, client, events)
}

async fn next_event(events: &mut Subscription) -> CallEvent {
    timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream closed")
}

/// Let the signal pump drain
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_connect_with_sip_credentials() {
    let (vendor, client, mut events) = connected_client(LoopbackVendor::new()).await;

    assert_eq!(client.connection_state().await, ConnectionState::Connected);
    assert_eq!(vendor.login_count(), 1);
    settle().await;
    assert!(events.try_recv().is_none(), "no failed event expected");

    let state = reduce(&CallState::default(), &CallEvent::Connected { call_id: None });
    assert!(state.is_connected);
}

#[tokio::test]
async fn test_connect_without_credentials_never_reaches_vendor() {
    let vendor = Arc::new(LoopbackVendor::new());
    let client = CallClient::new(vendor.clone());

    let result = client.connect(&Credentials::default()).await;
    assert!(matches!(assert_err!(result), DomainError::Auth(_)));
    assert_eq!(vendor.login_count(), 0);
    assert_eq!(client.connection_state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_session_error_emits_failed() {
    let vendor = Arc::new(LoopbackVendor::new().failing_session("bad credentials"));
    let client = CallClient::new(vendor.clone());
    let mut events = client.subscribe().await;

    let result = client.connect(&sip_credentials()).await;
    assert!(matches!(assert_err!(result), DomainError::Connection(_)));
    assert_eq!(
        next_event(&mut events).await,
        CallEvent::Failed {
            reason: Some("bad credentials".to_string())
        }
    );
}

#[tokio::test]
async fn test_incoming_call_answered() {
    let (vendor, client, mut events) = connected_client(LoopbackVendor::new()).await;
    let mut state = CallState::default().apply(&CallEvent::Connected { call_id: None });

    vendor.ring_in_with_id("c1", Some("Bob"), "+15551234");
    let incoming = next_event(&mut events).await;
    assert_eq!(
        incoming,
        CallEvent::Incoming {
            call_id: CallId::from("c1"),
            caller_name: Some("Bob".to_string()),
            caller_number: Some("+15551234".to_string()),
        }
    );
    state = state.apply(&incoming);
    assert_eq!(state.display_status(), CallStatus::Ringing);

    client.answer().await;
    let connected = next_event(&mut events).await;
    assert_eq!(
        connected,
        CallEvent::Connected {
            call_id: Some(CallId::from("c1"))
        }
    );
    state = state.apply(&connected);

    let active = state.active_call.as_ref().unwrap();
    assert_eq!(active.id, CallId::from("c1"));
    assert_eq!(active.caller_number.as_deref(), Some("+15551234"));
    assert!(state.incoming_call.is_none());
    assert_eq!(vendor.commands(&CallId::from("c1")), vec![LoopbackCommand::Answer]);
}

#[tokio::test]
async fn test_second_offer_rejected_while_busy() {
    let (vendor, _client, mut events) = connected_client(LoopbackVendor::new()).await;

    vendor.ring_in_with_id("c1", None, "+15551234");
    next_event(&mut events).await;

    vendor.ring_in_with_id("c2", None, "+15559999");
    settle().await;
    assert!(vendor.is_destroyed(&CallId::from("c2")));
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn test_outbound_call_lifecycle() {
    let (vendor, client, mut events) = connected_client(LoopbackVendor::new()).await;
    let mut state = CallState::default();

    let call_id = assert_ok!(client.dial("+15550100").await);
    state = state.apply(&next_event(&mut events).await);
    assert_eq!(state.call_status, CallStatus::Connecting);

    vendor.remote_answer(&call_id);
    state = state.apply(&next_event(&mut events).await);
    state = state.apply(&next_event(&mut events).await);
    assert_eq!(state.call_status, CallStatus::Connected);

    client.mute().await;
    state = state.toggle_mute();
    client.unmute().await;
    state = state.toggle_mute();
    assert!(!state.is_muted);

    client.hangup().await;
    let ended = next_event(&mut events).await;
    assert!(matches!(&ended, CallEvent::Ended { call_id: id, .. } if id == &call_id));
    state = state.apply(&ended);
    assert!(state.active_call.is_none());
    assert!(state.incoming_call.is_none());
    assert_eq!(state.call_status, CallStatus::Idle);

    assert_eq!(
        vendor.commands(&call_id),
        vec![
            LoopbackCommand::Mute,
            LoopbackCommand::Unmute,
            LoopbackCommand::Hangup
        ]
    );
    assert!(client.active_call_id().await.is_none());
}

#[tokio::test]
async fn test_end_conference_hangs_up_everything() {
    let (vendor, client, mut events) =
        connected_client(LoopbackVendor::new().auto_answer(true)).await;

    let primary = assert_ok!(client.dial("+15550100").await);
    next_event(&mut events).await; // connecting
    next_event(&mut events).await; // connected

    let conference_id = client.create_conference().await.unwrap();
    assert!(client.is_conference_host().await);
    assert_eq!(
        next_event(&mut events).await,
        CallEvent::ConferenceCreated {
            conference_id: conference_id.clone()
        }
    );

    let first = assert_ok!(client.add_participant("+15550101").await).unwrap();
    let second = assert_ok!(client.add_participant("+15550102").await).unwrap();
    next_event(&mut events).await;
    next_event(&mut events).await;
    assert_eq!(client.participant_ids().await.len(), 2);
    assert!(vendor
        .placed_calls()
        .iter()
        .skip(1)
        .all(|request| request.conference_id.as_ref() == Some(&conference_id)));

    client.end_conference().await;
    let ended = next_event(&mut events).await;
    assert!(matches!(ended, CallEvent::Ended { .. }));

    for call_id in [&primary, &first, &second] {
        assert!(vendor.is_destroyed(call_id), "{} still up", call_id);
    }
    assert!(client.conference_id().await.is_none());
    assert!(client.active_call_id().await.is_none());

    settle().await;
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn test_remove_unknown_participant_is_noop() {
    let (_vendor, client, mut events) =
        connected_client(LoopbackVendor::new().auto_answer(true)).await;

    client.dial("+15550100").await.unwrap();
    next_event(&mut events).await;
    next_event(&mut events).await;
    client.create_conference().await.unwrap();
    next_event(&mut events).await;

    assert!(!client.remove_participant(&CallId::from("nope")).await);
    settle().await;
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn test_remote_participant_hangup_emits_single_left() {
    let (vendor, client, mut events) =
        connected_client(LoopbackVendor::new().auto_answer(true)).await;

    client.dial("+15550100").await.unwrap();
    next_event(&mut events).await;
    next_event(&mut events).await;
    let conference_id = client.create_conference().await.unwrap();
    next_event(&mut events).await;

    let leg = client.add_participant("+15550101").await.unwrap().unwrap();
    next_event(&mut events).await;

    vendor.remote_hangup(&leg);
    assert_eq!(
        next_event(&mut events).await,
        CallEvent::ParticipantLeft {
            conference_id,
            call_id: leg.clone()
        }
    );
    assert!(!client.remove_participant(&leg).await);
    settle().await;
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn test_session_loss_fails_and_clears() {
    let (vendor, client, mut events) = connected_client(LoopbackVendor::new()).await;

    vendor.ring_in(None, "+15551234").unwrap();
    let mut state = CallState::default()
        .apply(&CallEvent::Connected { call_id: None })
        .apply(&next_event(&mut events).await);

    vendor.fail_session("network down");
    let failed = next_event(&mut events).await;
    state = state.apply(&failed);

    assert!(!state.is_connected);
    assert!(state.incoming_call.is_none());
    assert_eq!(client.connection_state().await, ConnectionState::Disconnected);
    assert!(matches!(
        client.dial("+1").await,
        Err(DomainError::NotConnected)
    ));
}

#[tokio::test]
async fn test_unsubscribed_listener_stops_receiving() {
    let (vendor, client, mut events) = connected_client(LoopbackVendor::new()).await;
    let mut other = client.subscribe().await;

    assert!(client.unsubscribe(other.id()).await);
    assert!(!client.unsubscribe(other.id()).await);

    vendor.ring_in(None, "+15551234");
    assert!(matches!(next_event(&mut events).await, CallEvent::Incoming { .. }));
    assert!(other.recv().await.is_none());
}

#[tokio::test]
async fn test_host_hangup_drops_conference_legs() {
    let (vendor, client, mut events) =
        connected_client(LoopbackVendor::new().auto_answer(true)).await;

    client.dial("+15550100").await.unwrap();
    next_event(&mut events).await;
    next_event(&mut events).await;
    client.create_conference().await.unwrap();
    next_event(&mut events).await;
    let leg = client.add_participant("+15550101").await.unwrap().unwrap();
    next_event(&mut events).await;

    client.hangup().await;
    assert!(matches!(next_event(&mut events).await, CallEvent::Ended { .. }));
    assert!(vendor.is_destroyed(&leg));
    assert!(client.conference_id().await.is_none());
}
