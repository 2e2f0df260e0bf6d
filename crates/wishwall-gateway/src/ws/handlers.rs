//! Concrete WS method handler functions.
//!
//! Each function extracts its parameters, calls the appropriate `AppState`
//! subsystem, and returns a `ResFrame`. `dispatch::route` is the only caller
//! and has already applied the admin gate.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{info, warn};
use wishwall_core::clock;
use wishwall_core::error::WishwallError;
use wishwall_protocol::frames::ResFrame;
use wishwall_store::export;

use crate::app::AppState;
use crate::ws::connection::Session;
use crate::ws::events;

/// Longest spotlight an admin may request, in seconds.
const MAX_SPOTLIGHT_SECS: u64 = 60 * 60;

fn str_param<'a>(params: Option<&'a Value>, key: &str) -> Option<&'a str> {
    params.and_then(|p| p.get(key)).and_then(|v| v.as_str())
}

fn fail(req_id: &str, method: &str, e: WishwallError) -> ResFrame {
    warn!(method, error = %e, "request failed");
    ResFrame::from_error(req_id, &e)
}

// ---------------------------------------------------------------------------
// wishes.submit
// ---------------------------------------------------------------------------

/// Params: `{ "name": string, "wish": string, "createdAtMs"?: number }`
///
/// Empty fields are rejected with `MISSING_FIELDS` before anything is written.
pub fn handle_wishes_submit(params: Option<&Value>, req_id: &str, app: &AppState) -> ResFrame {
    let name = str_param(params, "name").unwrap_or_default();
    let wish = str_param(params, "wish").unwrap_or_default();
    let created_at_ms = params
        .and_then(|p| p.get("createdAtMs"))
        .and_then(|v| v.as_i64());

    match app.submit_wish(name, wish, created_at_ms) {
        Ok(record) => ResFrame::ok(req_id, record.public()),
        Err(e) => fail(req_id, "wishes.submit", e),
    }
}

// ---------------------------------------------------------------------------
// wishes.list
// ---------------------------------------------------------------------------

/// Current snapshot, projected for the caller's role.
pub fn handle_wishes_list(req_id: &str, session: &Session, app: &AppState) -> ResFrame {
    match app.store.snapshot() {
        Ok(snapshot) => ResFrame::ok(req_id, events::snapshot_payload(&snapshot, session.is_admin())),
        Err(e) => fail(req_id, "wishes.list", e.into()),
    }
}

// ---------------------------------------------------------------------------
// wishes.delete / wishes.clear
// ---------------------------------------------------------------------------

/// Params: `{ "id": string }`. Unknown ids succeed with `deleted: false`.
pub fn handle_wishes_delete(params: Option<&Value>, req_id: &str, app: &AppState) -> ResFrame {
    let Some(id) = str_param(params, "id") else {
        let e = WishwallError::InvalidParams("missing 'id' field".to_string());
        return ResFrame::from_error(req_id, &e);
    };
    match app.store.delete_one(id) {
        Ok(deleted) => ResFrame::ok(req_id, json!({ "id": id, "deleted": deleted })),
        Err(e) => fail(req_id, "wishes.delete", e.into()),
    }
}

pub fn handle_wishes_clear(req_id: &str, app: &AppState) -> ResFrame {
    match app.store.clear_all() {
        Ok(cleared) => ResFrame::ok(req_id, json!({ "cleared": cleared })),
        Err(e) => fail(req_id, "wishes.clear", e.into()),
    }
}

// ---------------------------------------------------------------------------
// wishes.search / wishes.export
// ---------------------------------------------------------------------------

/// Params: `{ "query"?: string }`. Blank or missing query returns everything.
pub fn handle_wishes_search(params: Option<&Value>, req_id: &str, app: &AppState) -> ResFrame {
    let query = str_param(params, "query").unwrap_or_default();
    match app.store.snapshot() {
        Ok(snapshot) => {
            let records = snapshot.search(query);
            ResFrame::ok(
                req_id,
                json!({ "query": query, "count": records.len(), "records": records }),
            )
        }
        Err(e) => fail(req_id, "wishes.search", e.into()),
    }
}

pub fn handle_wishes_export(req_id: &str, app: &AppState) -> ResFrame {
    match app.store.snapshot() {
        Ok(snapshot) => ResFrame::ok(
            req_id,
            json!({
                "filename": export::filename(chrono::Utc::now()),
                "entries": export::entries(&snapshot.records),
            }),
        ),
        Err(e) => fail(req_id, "wishes.export", e.into()),
    }
}

// ---------------------------------------------------------------------------
// spotlight.trigger / spotlight.current
// ---------------------------------------------------------------------------

/// Params: `{ "message"?: string, "durationSecs"?: number }`, both defaulting
/// to the configured values.
pub fn handle_spotlight_trigger(params: Option<&Value>, req_id: &str, app: &AppState) -> ResFrame {
    let message = str_param(params, "message")
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(app.config.spotlight.message.as_str());

    let secs = match params.and_then(|p| p.get("durationSecs")) {
        None | Some(Value::Null) => app.config.spotlight.duration_secs,
        Some(v) => match v.as_u64() {
            Some(s) if (1..=MAX_SPOTLIGHT_SECS).contains(&s) => s,
            _ => {
                let e = WishwallError::InvalidParams(format!(
                    "'durationSecs' must be between 1 and {MAX_SPOTLIGHT_SECS}"
                ));
                return ResFrame::from_error(req_id, &e);
            }
        },
    };

    let now = clock::now_ms();
    match app.spotlight.trigger(message, Duration::from_secs(secs), now) {
        Ok(event) => ResFrame::ok(req_id, events::spotlight_payload(&event, now)),
        Err(e) => fail(req_id, "spotlight.trigger", e.into()),
    }
}

/// The current spotlight, or `null` when none is active.
pub fn handle_spotlight_current(req_id: &str, app: &AppState) -> ResFrame {
    let now = clock::now_ms();
    let current = app
        .spotlight
        .current(now)
        .map(|e| events::spotlight_payload(&e, now));
    ResFrame::ok(req_id, json!({ "spotlight": current }))
}

// ---------------------------------------------------------------------------
// stage.next / stage.prev
// ---------------------------------------------------------------------------

pub async fn handle_stage_step(forward: bool, req_id: &str, app: &AppState) -> ResFrame {
    let frame = if forward {
        app.stage.next().await
    } else {
        app.stage.prev().await
    };
    match frame {
        Some(frame) => ResFrame::ok(req_id, frame),
        None => ResFrame::from_error(
            req_id,
            &WishwallError::Internal("stage engine is not running".to_string()),
        ),
    }
}

// ---------------------------------------------------------------------------
// likes.get / likes.toggle
// ---------------------------------------------------------------------------

pub fn handle_likes_get(req_id: &str, session: &Session, app: &AppState) -> ResFrame {
    match app.likes.get(&session.device) {
        Ok(state) => ResFrame::ok(req_id, state),
        Err(e) => fail(req_id, "likes.get", e.into()),
    }
}

/// Flips this device's like and pushes the new count to every client.
pub fn handle_likes_toggle(req_id: &str, session: &Session, app: &AppState) -> ResFrame {
    match app.likes.toggle(&session.device) {
        Ok(state) => {
            app.broadcast(events::likes_event(state.count));
            ResFrame::ok(req_id, state)
        }
        Err(e) => fail(req_id, "likes.toggle", e.into()),
    }
}

// ---------------------------------------------------------------------------
// admin.logout
// ---------------------------------------------------------------------------

/// Ends the admin session. The connection stays open with public visibility.
pub fn handle_admin_logout(req_id: &str, session: &mut Session, app: &AppState) -> ResFrame {
    let ended = session
        .token
        .take()
        .map(|t| app.auth.logout(&t))
        .unwrap_or(false);
    session.revoke_admin();
    info!(ended, "admin logged out");
    ResFrame::ok(req_id, json!({ "loggedOut": true }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::test_state;
    use std::sync::{atomic::AtomicBool, Arc};
    use wishwall_core::types::{DeviceId, View};
    use wishwall_store::Snapshot;

    fn session(app: &AppState, device: &str, admin: bool) -> Session {
        Session {
            view: if admin { View::Admin } else { View::Wall },
            device: DeviceId::from(device),
            token: None,
            admin: Arc::new(AtomicBool::new(admin)),
            _subscription: app.store.subscribe(Box::new(|_: &Snapshot| {})).unwrap(),
        }
    }

    fn payload(res: ResFrame) -> Value {
        assert!(res.ok, "unexpected error: {:?}", res.error);
        res.payload.unwrap()
    }

    #[test]
    fn submit_validates_before_writing() {
        let app = test_state();
        let res = handle_wishes_submit(Some(&json!({"name": "Anna"})), "1", &app);
        assert_eq!(res.error.unwrap().code, "MISSING_FIELDS");
        assert!(app.store.snapshot().unwrap().is_empty());

        let res = handle_wishes_submit(None, "2", &app);
        assert_eq!(res.error.unwrap().message, "Please fill in both name and wish");
    }

    #[test]
    fn submit_uses_client_sort_key() {
        let app = test_state();
        for (name, ms) in [("Cleo", 100), ("Anna", 300), ("Bo", 200)] {
            let params = json!({"name": name, "wish": "song", "createdAtMs": ms});
            payload(handle_wishes_submit(Some(&params), "1", &app));
        }
        assert_eq!(app.store.snapshot().unwrap().names(), vec!["Anna", "Bo", "Cleo"]);
    }

    #[test]
    fn list_is_projected_by_role() {
        let app = test_state();
        app.submit_wish("Anna", "Dancing Queen", None).unwrap();

        let public = payload(handle_wishes_list("1", &session(&app, "d", false), &app));
        assert!(public["records"][0].get("wish").is_none());
        let full = payload(handle_wishes_list("1", &session(&app, "d", true), &app));
        assert_eq!(full["records"][0]["wish"], "Dancing Queen");
    }

    #[test]
    fn delete_unknown_is_not_an_error() {
        let app = test_state();
        let v = payload(handle_wishes_delete(Some(&json!({"id": "ghost"})), "1", &app));
        assert_eq!(v["deleted"], false);

        let res = handle_wishes_delete(None, "2", &app);
        assert_eq!(res.error.unwrap().code, "INVALID_PARAMS");
    }

    #[test]
    fn search_matches_name_or_wish() {
        let app = test_state();
        app.submit_wish("Anna", "Dancing Queen", Some(3)).unwrap();
        app.submit_wish("Bo", "Waterloo", Some(2)).unwrap();

        let v = payload(handle_wishes_search(Some(&json!({"query": "QUEEN"})), "1", &app));
        assert_eq!(v["count"], 1);
        assert_eq!(v["records"][0]["name"], "Anna");

        let v = payload(handle_wishes_search(Some(&json!({"query": "  "})), "1", &app));
        assert_eq!(v["count"], 2);
    }

    #[test]
    fn spotlight_defaults_and_bounds() {
        let app = test_state();
        let v = payload(handle_spotlight_trigger(None, "1", &app));
        assert_eq!(v["message"], app.config.spotlight.message);
        assert_eq!(v["remainingMs"], 120_000);

        let current = payload(handle_spotlight_current("2", &app));
        assert_eq!(current["spotlight"]["id"], v["id"]);

        let res = handle_spotlight_trigger(Some(&json!({"durationSecs": 0})), "3", &app);
        assert_eq!(res.error.unwrap().code, "INVALID_PARAMS");
    }

    #[test]
    fn likes_toggle_per_device() {
        let app = test_state();
        let a = session(&app, "a", false);
        let b = session(&app, "b", false);

        let v = payload(handle_likes_toggle("1", &a, &app));
        assert_eq!(v, json!({"count": 1, "voted": true}));
        let v = payload(handle_likes_get("2", &b, &app));
        assert_eq!(v, json!({"count": 1, "voted": false}));
        let v = payload(handle_likes_toggle("3", &a, &app));
        assert_eq!(v, json!({"count": 0, "voted": false}));
    }

    #[tokio::test]
    async fn stage_step_without_engine_reports_error() {
        let app = test_state();
        let res = handle_stage_step(true, "1", &app).await;
        assert_eq!(res.error.unwrap().code, "INTERNAL_ERROR");
    }
}
