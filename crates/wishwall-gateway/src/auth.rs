//! Admin authentication.
//!
//! One shared password, compared as-is. A successful login issues a random
//! session token persisted under `admin_session:<token>` so a reconnecting
//! admin (or an HTTP export) can authenticate without the password.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use wishwall_broadcast::KeyValueStore;
use wishwall_core::error::{Result, WishwallError};

fn session_key(token: &str) -> String {
    format!("admin_session:{token}")
}

/// Admin gate used by the WS handshake and the HTTP export route.
pub trait AuthService: Send + Sync {
    /// Check the password and issue a session token.
    fn login(&self, password: &str) -> Result<String>;
    fn validate(&self, token: &str) -> bool;
    /// Returns whether the token was live.
    fn logout(&self, token: &str) -> bool;
}

/// Static shared-password auth with sessions in a [`KeyValueStore`].
pub struct SharedPasswordAuth {
    password: String,
    sessions: Arc<dyn KeyValueStore>,
}

impl SharedPasswordAuth {
    pub fn new(password: impl Into<String>, sessions: Arc<dyn KeyValueStore>) -> Self {
        Self {
            password: password.into(),
            sessions,
        }
    }
}

impl AuthService for SharedPasswordAuth {
    fn login(&self, password: &str) -> Result<String> {
        if password != self.password {
            warn!("admin login rejected");
            return Err(WishwallError::AuthFailed("wrong password".to_string()));
        }
        let token = Uuid::new_v4().simple().to_string();
        self.sessions
            .set(&session_key(&token), &chrono::Utc::now().to_rfc3339())?;
        info!("admin session opened");
        Ok(token)
    }

    fn validate(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }
        match self.sessions.get(&session_key(token)) {
            Ok(v) => v.is_some(),
            Err(e) => {
                warn!(error = %e, "session lookup failed");
                false
            }
        }
    }

    fn logout(&self, token: &str) -> bool {
        match self.sessions.remove(&session_key(token)) {
            Ok(removed) => {
                if removed {
                    info!("admin session closed");
                }
                removed
            }
            Err(e) => {
                warn!(error = %e, "session removal failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wishwall_broadcast::MemoryKv;

    fn auth() -> SharedPasswordAuth {
        SharedPasswordAuth::new("hunter2", Arc::new(MemoryKv::new()))
    }

    #[test]
    fn wrong_password_is_rejected_without_lockout() {
        let a = auth();
        for _ in 0..5 {
            let err = a.login("nope").unwrap_err();
            assert_eq!(err.code(), "AUTH_FAILED");
        }
        assert!(a.login("hunter2").is_ok());
    }

    #[test]
    fn password_is_compared_as_is() {
        let a = auth();
        assert!(a.login(" hunter2").is_err());
        assert!(a.login("HUNTER2").is_err());
    }

    #[test]
    fn session_lifecycle() {
        let a = auth();
        let token = a.login("hunter2").unwrap();
        assert!(a.validate(&token));
        assert!(!a.validate("forged"));
        assert!(!a.validate(""));

        assert!(a.logout(&token));
        assert!(!a.validate(&token));
        assert!(!a.logout(&token));
    }
}
