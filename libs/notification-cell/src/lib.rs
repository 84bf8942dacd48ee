// libs/notification-cell/src/lib.rs
//! # Notification Cell
//!
//! This cell delivers patient notifications across a user's verified
//! contact channels (email, SMS, WhatsApp) with automatic failover:
//! channels are tried primary-first, one at a time, stopping at the first
//! success, and every attempt is written to a durable delivery log.
//!
//! ## Features
//!
//! - **Multi-Channel Failover**: email via Resend, SMS/WhatsApp via Twilio
//! - **Primary-First Ordering**: verified channels only, primary first
//! - **Audit Trail**: immutable, idempotent delivery log per request
//! - **Bounded Sends**: per-transport timeout so a hung vendor cannot
//!   stall the orchestration
//! - **Channel Management**: register, verify, re-prioritize, deactivate
//!
//! ## Architecture
//!
//! The notification cell follows the established cell architecture pattern:
//!
//! ```text
//! +-----------------------------------------------------+
//! |                Notification Cell                    |
//! +-----------------------------------------------------+
//! |  handlers.rs    |  HTTP endpoint handlers           |
//! |  router.rs      |  Route definitions                |
//! |  models.rs      |  Data structures & DTOs           |
//! |  error.rs       |  Cell error taxonomy              |
//! |  services/      |  Business logic layer             |
//! |    registry.rs  |  Channel resolution & ordering    |
//! |    channels.rs  |  Channel store (Supabase)         |
//! |    senders/     |  Transport adapters               |
//! |    orchestrator.rs | Failover sequencing            |
//! |    log_store.rs |  Delivery log (Supabase)          |
//! +-----------------------------------------------------+
//! ```
//!
//! ## API Endpoints
//!
//! - `POST /notifications/send` - Deliver a notification with failover
//! - `GET /notifications/history` - Caller's delivery records
//! - `GET /notifications/channels` - Caller's channels in attempt order
//! - `POST /notifications/channels` - Register a contact method
//! - `POST /notifications/channels/{id}/verify` - Mark a channel verified
//! - `POST /notifications/channels/{id}/primary` - Make a channel primary
//! - `DELETE /notifications/channels/{id}` - Deactivate a channel
//! - `GET /notifications/health` - Transport configuration check
//!
//! ## Configuration
//!
//! Required environment variables:
//! - `RESEND_API_KEY`, `RESEND_FROM_ADDRESS` - email transport
//! - `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`, `TWILIO_FROM_NUMBER` -
//!   SMS/WhatsApp transport (`TWILIO_WHATSAPP_NUMBER` optional)
//! - `NOTIFICATION_SEND_TIMEOUT_SECONDS` - per-transport timeout (default 10)

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export commonly used types
pub use error::NotificationError;
pub use models::{
    AttemptStatus, ChannelType, CreateChannelRequest, DeliveryAttempt, DeliveryRecord,
    DeliveryState, DeliveryStatus, NotificationChannel, SendNotificationRequest,
    SendNotificationResponse,
};
pub use services::{
    ChannelRegistry, ChannelSender, ChannelService, ChannelStore, DeliveryLog,
    DeliveryOrchestrator, DeliveryOutcome, ResendEmailSender, SendError, SupabaseDeliveryLog,
    TwilioSmsSender,
};
pub use router::notification_routes;
