pub mod error;
pub mod remote;
pub mod services;
pub mod traits;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::ApiError;
pub use remote::ApiClient;
pub use services::live_channel::LiveChannel;
pub use traits::{RefreshTarget, SessionTeardown};
