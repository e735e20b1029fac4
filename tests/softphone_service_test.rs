//! Softphone service integration tests: state folding and record keeping

use softphone::application::{
    NotificationLevel, SoftphoneRepositories, SoftphoneService, SoftphoneUpdate,
};
use softphone::domain::call::{CallStatus, Credentials};
use softphone::domain::call_log::{CallDirection, CallLogRepository, CallLogStatus};
use softphone::domain::conference::{ConferenceRepository, ConferenceStatus};
use softphone::domain::contact::{ContactRepository, NewContact};
use softphone::domain::shared::value_objects::CallId;
use softphone::infrastructure::persistence::MemoryStorage;
use softphone::infrastructure::telephony::{CallClient, LoopbackVendor};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

struct Harness {
    storage: Arc<MemoryStorage>,
    vendor: Arc<LoopbackVendor>,
    service: SoftphoneService,
}

async fn harness(vendor: LoopbackVendor) -> Harness {
    let storage = Arc::new(MemoryStorage::new());
    let vendor = Arc::new(vendor);
    let client = Arc::new(CallClient::new(vendor.clone()).with_connect_timeout(Duration::from_secs(1)));
    let service = SoftphoneService::start(
        client,
        SoftphoneRepositories {
            call_logs: storage.clone(),
            contacts: storage.clone(),
            settings: storage.clone(),
            conferences: storage.clone(),
        },
    )
    .await;
    Harness {
        storage,
        vendor,
        service,
    }
}

fn token() -> Option<Credentials> {
    Some(Credentials {
        login_token: Some("token-123".to_string()),
        username: None,
        password: None,
    })
}

/// Poll until `check` holds or a second passes
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

async fn next_notification(updates: &mut broadcast::Receiver<SoftphoneUpdate>) -> (NotificationLevel, String) {
    loop {
        let update = tokio::time::timeout(Duration::from_secs(1), updates.recv())
            .await
            .expect("timed out waiting for notification")
            .expect("update stream closed");
        if let SoftphoneUpdate::Notification { level, title, .. } = update {
            return (level, title);
        }
    }
}

#[tokio::test]
async fn test_connect_publishes_notification() {
    let h = &harness(LoopbackVendor::new()).await;
    let mut updates = h.service.subscribe_updates();

    h.service.connect(token()).await.unwrap();
    assert!(h.service.state().await.is_connected);
    assert_eq!(
        next_notification(&mut updates).await,
        (NotificationLevel::Info, "Connected".to_string())
    );
}

#[tokio::test]
async fn test_failed_connect_notifies_once() {
    let h = &harness(LoopbackVendor::new().refusing("no account")).await;
    let mut updates = h.service.subscribe_updates();

    assert!(h.service.connect(token()).await.is_err());
    assert_eq!(
        next_notification(&mut updates).await,
        (NotificationLevel::Error, "Connection Failed".to_string())
    );
    assert!(!h.service.state().await.is_connected);
}

#[tokio::test]
async fn test_answered_inbound_call_is_logged_completed() {
    let h = &harness(LoopbackVendor::new()).await;
    h.storage
        .create_contact(NewContact {
            name: "Bob".to_string(),
            phone_number: "+15551234".to_string(),
        })
        .await
        .unwrap();
    h.service.connect(token()).await.unwrap();

    let call_id = h.vendor.ring_in(None, "+15551234").unwrap();
    eventually(move || async move { h.service.state().await.incoming_call.is_some() }).await;
    assert_eq!(h.service.state().await.display_status(), CallStatus::Ringing);

    h.service.answer().await;
    eventually(move || async move { h.service.state().await.call_status == CallStatus::Connected }).await;

    let state = h.service.toggle_mute().await;
    assert!(state.is_muted);

    h.vendor.remote_hangup(&call_id);
    eventually(move || async move { !h.storage.list_call_logs().await.unwrap().is_empty() }).await;

    let logs = h.storage.list_call_logs().await.unwrap();
    assert_eq!(logs[0].direction, CallDirection::Inbound);
    assert_eq!(logs[0].status, CallLogStatus::Completed);
    assert_eq!(logs[0].contact_name.as_deref(), Some("Bob"));

    let state = h.service.state().await;
    assert!(state.active_call.is_none());
    assert!(!state.is_muted);
}

#[tokio::test]
async fn test_declined_inbound_call_is_logged_missed() {
    let h = &harness(LoopbackVendor::new()).await;
    h.service.connect(token()).await.unwrap();

    h.vendor.ring_in(Some("Carol"), "+15557777").unwrap();
    eventually(move || async move { h.service.state().await.incoming_call.is_some() }).await;
    h.service.decline().await;

    eventually(move || async move { !h.storage.list_call_logs().await.unwrap().is_empty() }).await;
    let logs = h.storage.list_call_logs().await.unwrap();
    assert_eq!(logs[0].status, CallLogStatus::Missed);
    assert_eq!(logs[0].phone_number, "+15557777");
    assert_eq!(logs[0].contact_name.as_deref(), Some("Carol"));
    assert!(h.service.state().await.incoming_call.is_none());
}

#[tokio::test]
async fn test_unanswered_outbound_call_is_logged_failed() {
    let h = &harness(LoopbackVendor::new()).await;
    h.service.connect(token()).await.unwrap();

    let call_id = h.service.dial("+15550100").await.unwrap();
    eventually(move || async move { h.service.state().await.call_status == CallStatus::Connecting }).await;

    h.vendor.remote_hangup(&call_id);
    eventually(move || async move { !h.storage.list_call_logs().await.unwrap().is_empty() }).await;

    let logs = h.storage.list_call_logs().await.unwrap();
    assert_eq!(logs[0].direction, CallDirection::Outbound);
    assert_eq!(logs[0].status, CallLogStatus::Failed);
    assert_eq!(logs[0].phone_number, "+15550100");
    assert_eq!(h.service.state().await.call_status, CallStatus::Idle);
}

#[tokio::test]
async fn test_dial_without_session_notifies_call_failed() {
    let h = &harness(LoopbackVendor::new()).await;
    let mut updates = h.service.subscribe_updates();

    assert!(h.service.dial("+15550100").await.is_err());
    assert_eq!(
        next_notification(&mut updates).await,
        (NotificationLevel::Error, "Call Failed".to_string())
    );
    assert_eq!(h.service.state().await.call_status, CallStatus::Idle);
}

#[tokio::test]
async fn test_conference_record_follows_lifecycle() {
    let h = &harness(LoopbackVendor::new().auto_answer(true)).await;
    h.service.connect(token()).await.unwrap();

    h.service.dial("+15550100").await.unwrap();
    eventually(move || async move { h.service.state().await.call_status == CallStatus::Connected }).await;

    let conference_id = h.service.create_conference().await.unwrap();
    h.service.add_participant("+15550101").await.unwrap();
    h.service.add_participant("+15550102").await.unwrap();
    let conference_key = conference_id.to_string();
    let key = conference_key.as_str();
    eventually(move || async move {
        h.storage
            .find_by_conference_id(key)
            .await
            .unwrap()
            .map_or(false, |c| c.participant_numbers.len() == 2)
    })
    .await;

    let record = h
        .storage
        .find_by_conference_id(conference_id.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, ConferenceStatus::Active);
    assert_eq!(record.host_number, "+15550100");
    assert_eq!(record.participant_numbers, vec!["+15550101", "+15550102"]);

    h.service.end_conference().await;
    eventually(move || async move {
        h.storage
            .find_by_conference_id(key)
            .await
            .unwrap()
            .map_or(false, |c| c.status == ConferenceStatus::Ended)
    })
    .await;

    let record = h
        .storage
        .find_by_conference_id(conference_id.as_str())
        .await
        .unwrap()
        .unwrap();
    assert!(record.end_time.is_some());

    eventually(move || async move { !h.storage.list_call_logs().await.unwrap().is_empty() }).await;
    let logs = h.storage.list_call_logs().await.unwrap();
    assert!(logs[0].is_conference_call);
    assert_eq!(logs[0].conference_id.as_deref(), Some(conference_id.as_str()));

    let state = h.service.state().await;
    assert!(state.conference.is_none());
    assert!(state.active_call.is_none());
}

#[tokio::test]
async fn test_removed_participant_is_logged() {
    let h = &harness(LoopbackVendor::new().auto_answer(true)).await;
    h.service.connect(token()).await.unwrap();
    h.service.dial("+15550100").await.unwrap();
    eventually(move || async move { h.service.state().await.call_status == CallStatus::Connected }).await;

    h.service.create_conference().await.unwrap();
    let leg = h.service.add_participant("+15550101").await.unwrap().unwrap();
    assert!(h.service.remove_participant(&leg).await);
    assert!(!h.service.remove_participant(&CallId::from("unknown")).await);

    eventually(move || async move { !h.storage.list_call_logs().await.unwrap().is_empty() }).await;
    let logs = h.storage.list_call_logs().await.unwrap();
    assert_eq!(logs[0].phone_number, "+15550101");
    assert!(logs[0].is_conference_call);

    let state = h.service.state().await;
    assert!(state.conference.unwrap().participants.is_empty());
    assert!(state.active_call.is_some());
}

#[tokio::test]
async fn test_session_loss_resets_state() {
    let h = &harness(LoopbackVendor::new()).await;
    h.service.connect(token()).await.unwrap();
    let mut updates = h.service.subscribe_updates();

    h.vendor.ring_in(None, "+15551234").unwrap();
    eventually(move || async move { h.service.state().await.incoming_call.is_some() }).await;

    h.vendor.fail_session("network down");
    assert_eq!(
        next_notification(&mut updates).await,
        (NotificationLevel::Error, "Connection Failed".to_string())
    );

    let state = h.service.state().await;
    assert!(!state.is_connected);
    assert!(state.incoming_call.is_none());
}

#[tokio::test]
async fn test_disconnect_resets_state() {
    let h = &harness(LoopbackVendor::new()).await;
    h.service.connect(token()).await.unwrap();
    h.service.disconnect().await;

    assert!(!h.vendor.has_session());
    assert!(!h.service.state().await.is_connected);
}

#[tokio::test]
async fn test_connect_while_connected_does_not_notify_again() {
    let h = &harness(LoopbackVendor::new()).await;
    let mut updates = h.service.subscribe_updates();

    h.service.connect(token()).await.unwrap();
    h.service.connect(token()).await.unwrap();

    let mut notifications = 0;
    while let Ok(update) = updates.try_recv() {
        if matches!(update, SoftphoneUpdate::Notification { .. }) {
            notifications += 1;
        }
    }
    assert_eq!(notifications, 1);
    assert_eq!(h.vendor.login_count(), 1);
}
