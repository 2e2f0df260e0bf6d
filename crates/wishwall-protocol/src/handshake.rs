use serde::{Deserialize, Serialize};
use serde_json::Value;
use wishwall_core::types::View;

/// Server → Client: initial challenge on WS connect.
/// Sent as: `EVENT connect.challenge { nonce: "..." }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectChallenge {
    pub nonce: String,
}

/// Client → Server: declare the view and authenticate.
/// Sent as: `REQ connect { view: "admin", device_id: "...", auth: { mode: "password", password: "..." } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectParams {
    pub view: View,
    /// Scopes per-device state (like flag). Optional for displays.
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default = "default_auth")]
    pub auth: AuthPayload,
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

fn default_auth() -> AuthPayload {
    AuthPayload::None
}

/// Discriminated auth payload: mode determines which fields are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum AuthPayload {
    /// Shared admin password; success yields a session token in `hello-ok`.
    Password { password: String },
    /// Reuse a token issued by an earlier password login (page reload).
    Session { token: String },
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub platform: Option<String>,
}

/// Server → Client: successful connect response payload.
///
/// Carries everything a display needs for its first paint so it never has to
/// wait for the next change notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloOk {
    pub protocol: u32,
    pub server: ServerInfo,
    pub view: View,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
    /// Current wishes, projected for `view`.
    pub snapshot: Value,
    /// Current spotlight, if one is running.
    pub spotlight: Option<Value>,
    pub policy: ClientPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientPolicy {
    pub max_message_size: usize,
    /// Countdown recompute cadence the server uses; clients should match it.
    pub tick_ms: u64,
}
