use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub user: Option<Value>,
}

impl LoginResponse {
    pub fn username(&self) -> Option<&str> {
        self.user.as_ref()?.get("username")?.as_str()
    }
}
