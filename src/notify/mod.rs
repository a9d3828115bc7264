#[cfg(feature = "email")]
pub mod email;
pub mod notifier;
pub mod traits;
pub mod webhook;

#[cfg(feature = "email")]
pub use email::EmailChannel;
pub use notifier::{DispatchReport, Notifier};
pub use traits::{AlertChannel, Notification};
pub use webhook::WebhookChannel;
