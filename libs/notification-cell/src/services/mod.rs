pub mod channels;
pub mod log_store;
pub mod orchestrator;
pub mod registry;
pub mod senders;

pub use channels::ChannelService;
pub use log_store::{DeliveryLog, SupabaseDeliveryLog};
pub use orchestrator::{DeliveryOrchestrator, DeliveryOutcome};
pub use registry::{ChannelRegistry, ChannelStore};
pub use senders::{ChannelSender, ResendEmailSender, SendError, TwilioSmsSender};
