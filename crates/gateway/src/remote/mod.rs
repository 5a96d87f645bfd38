use url::Url;

use crate::error::ApiError;

pub mod api_client;
pub mod responses;

pub use api_client::{ApiClient, CallOptions};
pub use responses::LoginResponse;

const LIVE_PATH: &str = "/ws";

/// The live channel lives on the API host: `http` becomes `ws` and `https`
/// becomes `wss`. An explicit override is used as given.
pub fn live_channel_url(api_url: &str, override_url: Option<&str>) -> Result<Url, ApiError> {
    let invalid = |url: &str, reason: String| ApiError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    if let Some(raw) = override_url {
        return Url::parse(raw).map_err(|e| invalid(raw, e.to_string()));
    }

    let mut url = Url::parse(api_url).map_err(|e| invalid(api_url, e.to_string()))?;
    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => return Err(invalid(api_url, format!("unsupported scheme {}", other))),
    };
    url.set_scheme(scheme)
        .map_err(|_| invalid(api_url, "cannot switch scheme".to_string()))?;
    url.set_path(LIVE_PATH);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
