use serde_json::Value;
use uuid::Uuid;
use wishwall_core::config::{WishwallConfig, MAX_PAYLOAD_BYTES, PROTOCOL_VERSION};
use wishwall_core::error::{Result, WishwallError};
use wishwall_core::types::View;
use wishwall_protocol::{
    frames::EventFrame,
    handshake::{AuthPayload, ClientPolicy, ConnectChallenge, ConnectParams, HelloOk, ServerInfo},
    methods::EV_CHALLENGE,
};

use crate::auth::AuthService;

/// Random nonce for the connect challenge.
pub fn make_nonce() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Serialize the `connect.challenge` event that opens every WS session.
pub fn challenge_event(nonce: &str) -> String {
    EventFrame::new(
        EV_CHALLENGE,
        ConnectChallenge {
            nonce: nonce.to_string(),
        },
    )
    .to_text()
}

/// Outcome of a successful connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub view: View,
    pub admin: bool,
    /// Set for admin connections; a password login mints a fresh one.
    pub session_token: Option<String>,
}

/// Decide whether `params` may open the requested view.
///
/// Wall and stage are open to everyone and ignore any credentials. The admin
/// view needs the shared password or a live session token.
pub fn admit(params: &ConnectParams, auth: &dyn AuthService) -> Result<Admission> {
    match params.view {
        View::Wall | View::Stage => Ok(Admission {
            view: params.view,
            admin: false,
            session_token: None,
        }),
        View::Admin => {
            let token = match &params.auth {
                AuthPayload::Password { password } => auth.login(password)?,
                AuthPayload::Session { token } => {
                    if !auth.validate(token) {
                        return Err(WishwallError::AuthFailed(
                            "invalid or expired session".to_string(),
                        ));
                    }
                    token.clone()
                }
                AuthPayload::None => {
                    return Err(WishwallError::AuthFailed(
                        "admin view requires a password".to_string(),
                    ))
                }
            };
            Ok(Admission {
                view: View::Admin,
                admin: true,
                session_token: Some(token),
            })
        }
    }
}

/// Build the `hello-ok` response payload after successful authentication.
pub fn hello_ok_payload(
    admission: &Admission,
    config: &WishwallConfig,
    snapshot: Value,
    spotlight: Option<Value>,
) -> HelloOk {
    HelloOk {
        protocol: PROTOCOL_VERSION,
        server: ServerInfo {
            name: "wishwall".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        view: admission.view,
        session_token: admission.session_token.clone(),
        snapshot,
        spotlight,
        policy: ClientPolicy {
            max_message_size: MAX_PAYLOAD_BYTES,
            tick_ms: config.spotlight.tick_ms,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SharedPasswordAuth;
    use std::sync::Arc;
    use wishwall_broadcast::MemoryKv;

    fn auth() -> SharedPasswordAuth {
        SharedPasswordAuth::new("pw", Arc::new(MemoryKv::new()))
    }

    fn params(view: View, auth: AuthPayload) -> ConnectParams {
        ConnectParams {
            view,
            device_id: None,
            auth,
            client_info: None,
        }
    }

    #[test]
    fn wall_and_stage_need_no_credentials() {
        let a = auth();
        for view in [View::Wall, View::Stage] {
            let adm = admit(&params(view, AuthPayload::None), &a).unwrap();
            assert!(!adm.admin);
            assert!(adm.session_token.is_none());
        }
    }

    #[test]
    fn admin_password_mints_session_that_reconnects() {
        let a = auth();
        let first = admit(
            &params(View::Admin, AuthPayload::Password { password: "pw".into() }),
            &a,
        )
        .unwrap();
        let token = first.session_token.unwrap();

        let again = admit(&params(View::Admin, AuthPayload::Session { token: token.clone() }), &a).unwrap();
        assert!(again.admin);
        assert_eq!(again.session_token.as_deref(), Some(token.as_str()));
    }

    #[test]
    fn admin_rejections() {
        let a = auth();
        let wrong = admit(
            &params(View::Admin, AuthPayload::Password { password: "nope".into() }),
            &a,
        );
        assert_eq!(wrong.unwrap_err().code(), "AUTH_FAILED");

        let none = admit(&params(View::Admin, AuthPayload::None), &a);
        assert_eq!(none.unwrap_err().code(), "AUTH_FAILED");

        let stale = admit(&params(View::Admin, AuthPayload::Session { token: "old".into() }), &a);
        assert_eq!(stale.unwrap_err().code(), "AUTH_FAILED");
    }

    #[test]
    fn challenge_is_an_event_frame() {
        let v: Value = serde_json::from_str(&challenge_event("abc")).unwrap();
        assert_eq!(v["type"], "event");
        assert_eq!(v["event"], "connect.challenge");
        assert_eq!(v["payload"]["nonce"], "abc");
    }
}
