use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use uuid::Uuid;

use notification_cell::error::NotificationError;
use notification_cell::models::{
    AttemptStatus, ChannelType, DeliveryRecord, DeliveryStatus, NotificationChannel,
    SendNotificationRequest,
};
use notification_cell::services::{
    ChannelRegistry, ChannelSender, ChannelStore, DeliveryLog, DeliveryOrchestrator, SendError,
};

// ==============================================================================
// TEST DOUBLES
// ==============================================================================

struct StaticStore {
    channels: Vec<NotificationChannel>,
}

#[async_trait]
impl ChannelStore for StaticStore {
    async fn channels_for_user(
        &self,
        _user_id: Uuid,
        _auth_token: &str,
    ) -> Result<Vec<NotificationChannel>, NotificationError> {
        Ok(self.channels.clone())
    }
}

#[derive(Default)]
struct RecordingLog {
    records: Mutex<Vec<DeliveryRecord>>,
    fail_writes: bool,
}

impl RecordingLog {
    fn failing() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            fail_writes: true,
        }
    }

    fn stored(&self) -> Vec<DeliveryRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryLog for RecordingLog {
    async fn record(
        &self,
        record: &DeliveryRecord,
        _auth_token: &str,
    ) -> Result<(), NotificationError> {
        if self.fail_writes {
            return Err(NotificationError::Persistence("log store down".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Sender that records the channel type of every call in a shared order
/// log and returns a scripted outcome.
struct ScriptedSender {
    outcome: Result<(), SendError>,
    call_order: Arc<Mutex<Vec<ChannelType>>>,
}

impl ScriptedSender {
    fn succeeding(call_order: Arc<Mutex<Vec<ChannelType>>>) -> Self {
        Self {
            outcome: Ok(()),
            call_order,
        }
    }

    fn failing(message: &str, call_order: Arc<Mutex<Vec<ChannelType>>>) -> Self {
        Self {
            outcome: Err(SendError::new(message)),
            call_order,
        }
    }
}

#[async_trait]
impl ChannelSender for ScriptedSender {
    async fn send(
        &self,
        channel: &NotificationChannel,
        _subject: &str,
        _body: &str,
    ) -> Result<(), SendError> {
        self.call_order.lock().unwrap().push(channel.channel_type);
        self.outcome.clone()
    }
}

struct PanickingSender {
    call_order: Arc<Mutex<Vec<ChannelType>>>,
}

#[async_trait]
impl ChannelSender for PanickingSender {
    async fn send(
        &self,
        channel: &NotificationChannel,
        _subject: &str,
        _body: &str,
    ) -> Result<(), SendError> {
        self.call_order.lock().unwrap().push(channel.channel_type);
        panic!("transport client blew up");
    }
}

struct HangingSender;

#[async_trait]
impl ChannelSender for HangingSender {
    async fn send(
        &self,
        _channel: &NotificationChannel,
        _subject: &str,
        _body: &str,
    ) -> Result<(), SendError> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    }
}

// ==============================================================================
// HELPERS
// ==============================================================================

fn channel(
    user_id: Uuid,
    channel_type: ChannelType,
    verified: bool,
    is_primary: bool,
    age_minutes: i64,
) -> NotificationChannel {
    NotificationChannel {
        id: Uuid::new_v4(),
        user_id,
        channel_type,
        destination: match channel_type {
            ChannelType::Email => "patient@example.com".to_string(),
            _ => "+15551234567".to_string(),
        },
        verified,
        is_primary,
        created_at: Utc::now() - ChronoDuration::minutes(age_minutes),
    }
}

fn request() -> SendNotificationRequest {
    SendNotificationRequest {
        subject: "Appointment reminder".to_string(),
        body: "Your appointment is tomorrow at 10:00".to_string(),
        notification_type: "appointment_reminder".to_string(),
        metadata: None,
    }
}

fn orchestrator(
    channels: Vec<NotificationChannel>,
    log: Arc<RecordingLog>,
) -> DeliveryOrchestrator {
    DeliveryOrchestrator::new(
        ChannelRegistry::new(Arc::new(StaticStore { channels })),
        log,
        Duration::from_millis(200),
    )
}

// ==============================================================================
// TESTS
// ==============================================================================

#[tokio::test]
async fn primary_channel_is_attempted_first() {
    let user_id = Uuid::new_v4();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::new(RecordingLog::default());

    // The SMS channel is older but the email channel carries the primary flag.
    let orchestrator = orchestrator(
        vec![
            channel(user_id, ChannelType::Sms, true, false, 120),
            channel(user_id, ChannelType::Email, true, true, 5),
        ],
        log.clone(),
    )
    .with_sender(
        ChannelType::Email,
        Arc::new(ScriptedSender::succeeding(calls.clone())),
    )
    .with_sender(
        ChannelType::Sms,
        Arc::new(ScriptedSender::succeeding(calls.clone())),
    );

    let outcome = orchestrator
        .deliver(user_id, &request(), "token")
        .await
        .unwrap();

    assert_eq!(outcome.delivered_via, ChannelType::Email);
    assert_eq!(*calls.lock().unwrap(), vec![ChannelType::Email]);
    assert_eq!(outcome.attempts.len(), 1);
    assert_eq!(outcome.attempts[0].status, AttemptStatus::Success);
}

#[tokio::test]
async fn failover_advances_until_a_channel_succeeds() {
    let user_id = Uuid::new_v4();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::new(RecordingLog::default());

    let orchestrator = orchestrator(
        vec![
            channel(user_id, ChannelType::Email, true, true, 30),
            channel(user_id, ChannelType::Sms, true, false, 20),
            channel(user_id, ChannelType::Whatsapp, true, false, 10),
        ],
        log.clone(),
    )
    .with_sender(
        ChannelType::Email,
        Arc::new(ScriptedSender::failing("mailbox rejected", calls.clone())),
    )
    .with_sender(
        ChannelType::Sms,
        Arc::new(ScriptedSender::failing("carrier unreachable", calls.clone())),
    )
    .with_sender(
        ChannelType::Whatsapp,
        Arc::new(ScriptedSender::succeeding(calls.clone())),
    );

    let outcome = orchestrator
        .deliver(user_id, &request(), "token")
        .await
        .unwrap();

    assert_eq!(outcome.delivered_via, ChannelType::Whatsapp);
    assert_eq!(
        *calls.lock().unwrap(),
        vec![ChannelType::Email, ChannelType::Sms, ChannelType::Whatsapp]
    );

    assert_eq!(outcome.attempts.len(), 3);
    assert_eq!(outcome.attempts[0].status, AttemptStatus::Failed);
    assert_eq!(outcome.attempts[1].status, AttemptStatus::Failed);
    assert_eq!(outcome.attempts[2].status, AttemptStatus::Success);
    assert_eq!(
        outcome.attempts[0].error.as_deref(),
        Some("mailbox rejected")
    );
}

#[tokio::test]
async fn no_channels_rejects_before_any_send() {
    let user_id = Uuid::new_v4();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::new(RecordingLog::default());

    let orchestrator = orchestrator(vec![], log.clone()).with_sender(
        ChannelType::Email,
        Arc::new(ScriptedSender::succeeding(calls.clone())),
    );

    let result = orchestrator.deliver(user_id, &request(), "token").await;

    assert_matches!(result, Err(NotificationError::NoChannelsConfigured));
    assert!(calls.lock().unwrap().is_empty());

    // The rejection still leaves an auditable record with zero attempts.
    let stored = log.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, DeliveryStatus::Failed);
    assert!(stored[0].attempts.is_empty());
}

#[tokio::test]
async fn exhaustion_reports_every_attempt() {
    let user_id = Uuid::new_v4();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::new(RecordingLog::default());

    let orchestrator = orchestrator(
        vec![
            channel(user_id, ChannelType::Email, true, true, 30),
            channel(user_id, ChannelType::Sms, true, false, 10),
        ],
        log.clone(),
    )
    .with_sender(
        ChannelType::Email,
        Arc::new(ScriptedSender::failing("bounce", calls.clone())),
    )
    .with_sender(
        ChannelType::Sms,
        Arc::new(ScriptedSender::failing("invalid number", calls.clone())),
    );

    let result = orchestrator.deliver(user_id, &request(), "token").await;

    let attempts = match result {
        Err(NotificationError::AllChannelsExhausted { attempts }) => attempts,
        other => panic!("expected AllChannelsExhausted, got {:?}", other),
    };

    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|a| a.status == AttemptStatus::Failed));

    let stored = log.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, DeliveryStatus::Failed);
    assert_eq!(stored[0].attempts.len(), 2);
}

#[tokio::test]
async fn unverified_channels_are_never_attempted() {
    let user_id = Uuid::new_v4();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::new(RecordingLog::default());

    // The unverified SMS channel is primary, but only the verified email
    // channel may be attempted.
    let orchestrator = orchestrator(
        vec![
            channel(user_id, ChannelType::Sms, false, true, 60),
            channel(user_id, ChannelType::Email, true, false, 10),
        ],
        log.clone(),
    )
    .with_sender(
        ChannelType::Email,
        Arc::new(ScriptedSender::succeeding(calls.clone())),
    )
    .with_sender(
        ChannelType::Sms,
        Arc::new(ScriptedSender::succeeding(calls.clone())),
    );

    let outcome = orchestrator
        .deliver(user_id, &request(), "token")
        .await
        .unwrap();

    assert_eq!(outcome.delivered_via, ChannelType::Email);
    assert_eq!(*calls.lock().unwrap(), vec![ChannelType::Email]);
}

#[tokio::test]
async fn panicking_sender_does_not_abort_failover() {
    let user_id = Uuid::new_v4();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::new(RecordingLog::default());

    let orchestrator = orchestrator(
        vec![
            channel(user_id, ChannelType::Email, true, true, 30),
            channel(user_id, ChannelType::Sms, true, false, 10),
        ],
        log.clone(),
    )
    .with_sender(
        ChannelType::Email,
        Arc::new(PanickingSender {
            call_order: calls.clone(),
        }),
    )
    .with_sender(
        ChannelType::Sms,
        Arc::new(ScriptedSender::succeeding(calls.clone())),
    );

    let outcome = orchestrator
        .deliver(user_id, &request(), "token")
        .await
        .unwrap();

    assert_eq!(outcome.delivered_via, ChannelType::Sms);
    assert_eq!(outcome.attempts.len(), 2);
    assert_eq!(outcome.attempts[0].status, AttemptStatus::Failed);
    assert!(outcome.attempts[0]
        .error
        .as_deref()
        .unwrap()
        .contains("panicked"));
}

#[tokio::test]
async fn hung_transport_times_out_and_fails_over() {
    let user_id = Uuid::new_v4();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::new(RecordingLog::default());

    let orchestrator = orchestrator(
        vec![
            channel(user_id, ChannelType::Email, true, true, 30),
            channel(user_id, ChannelType::Sms, true, false, 10),
        ],
        log.clone(),
    )
    .with_sender(ChannelType::Email, Arc::new(HangingSender))
    .with_sender(
        ChannelType::Sms,
        Arc::new(ScriptedSender::succeeding(calls.clone())),
    );

    let outcome = orchestrator
        .deliver(user_id, &request(), "token")
        .await
        .unwrap();

    assert_eq!(outcome.delivered_via, ChannelType::Sms);
    assert!(outcome.attempts[0]
        .error
        .as_deref()
        .unwrap()
        .contains("timed out"));
}

#[tokio::test]
async fn missing_transport_counts_as_a_failed_attempt() {
    let user_id = Uuid::new_v4();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::new(RecordingLog::default());

    // No WhatsApp sender registered.
    let orchestrator = orchestrator(
        vec![
            channel(user_id, ChannelType::Whatsapp, true, true, 30),
            channel(user_id, ChannelType::Sms, true, false, 10),
        ],
        log.clone(),
    )
    .with_sender(
        ChannelType::Sms,
        Arc::new(ScriptedSender::succeeding(calls.clone())),
    );

    let outcome = orchestrator
        .deliver(user_id, &request(), "token")
        .await
        .unwrap();

    assert_eq!(outcome.delivered_via, ChannelType::Sms);
    assert_eq!(outcome.attempts.len(), 2);
    assert!(outcome.attempts[0]
        .error
        .as_deref()
        .unwrap()
        .contains("No transport configured"));
}

#[tokio::test]
async fn successful_delivery_is_persisted_with_full_log() {
    let user_id = Uuid::new_v4();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::new(RecordingLog::default());

    let orchestrator = orchestrator(
        vec![channel(user_id, ChannelType::Email, true, true, 5)],
        log.clone(),
    )
    .with_sender(
        ChannelType::Email,
        Arc::new(ScriptedSender::succeeding(calls.clone())),
    );

    orchestrator
        .deliver(user_id, &request(), "token")
        .await
        .unwrap();

    let stored = log.stored();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, DeliveryStatus::Delivered);
    assert_eq!(stored[0].delivered_via, Some(ChannelType::Email));
    assert_eq!(stored[0].user_id, user_id);
    assert_eq!(stored[0].notification_type, "appointment_reminder");
    assert!(!stored[0].dedupe_key.is_empty());
}

#[tokio::test]
async fn log_write_failure_does_not_overturn_delivery() {
    let user_id = Uuid::new_v4();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::new(RecordingLog::failing());

    let orchestrator = orchestrator(
        vec![channel(user_id, ChannelType::Email, true, true, 5)],
        log,
    )
    .with_sender(
        ChannelType::Email,
        Arc::new(ScriptedSender::succeeding(calls.clone())),
    );

    let outcome = orchestrator.deliver(user_id, &request(), "token").await;

    assert!(outcome.is_ok());
    assert_eq!(outcome.unwrap().delivered_via, ChannelType::Email);
}

#[tokio::test]
async fn invalid_request_is_rejected_before_resolution() {
    let user_id = Uuid::new_v4();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::new(RecordingLog::default());

    let orchestrator = orchestrator(
        vec![channel(user_id, ChannelType::Email, true, true, 5)],
        log.clone(),
    )
    .with_sender(
        ChannelType::Email,
        Arc::new(ScriptedSender::succeeding(calls.clone())),
    );

    let mut bad_request = request();
    bad_request.subject = String::new();

    let result = orchestrator.deliver(user_id, &bad_request, "token").await;

    assert_matches!(result, Err(NotificationError::Validation(_)));
    assert!(calls.lock().unwrap().is_empty());
    assert!(log.stored().is_empty());
}
