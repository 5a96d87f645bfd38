pub mod channel;
pub mod envelope;
pub mod live_event;
pub mod notification;
pub mod settings;
pub mod signal;
pub mod view;

pub use channel::ChannelState;
pub use envelope::ApiEnvelope;
pub use live_event::LiveEvent;
pub use notification::{Notification, NotificationLevel};
pub use settings::{SettingError, Settings};
pub use signal::Signal;
pub use view::View;
