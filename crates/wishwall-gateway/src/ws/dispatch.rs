use std::sync::Arc;

use serde_json::json;
use tracing::warn;
use wishwall_core::clock;
use wishwall_core::error::WishwallError;
use wishwall_protocol::{frames::ResFrame, methods};

use crate::app::AppState;
use crate::ws::connection::Session;
use crate::ws::handlers;

/// Route a WS method call to the correct handler.
///
/// Admin-only methods are gated here, before any handler runs, so a wall or
/// stage client can never reach a destructive operation.
pub async fn route(
    method: &str,
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &mut Session,
    app: &Arc<AppState>,
) -> ResFrame {
    if methods::is_admin_only(method) && !session.is_admin() {
        warn!(method, view = %session.view, "admin method refused");
        let denied = WishwallError::PermissionDenied {
            reason: "admin session required".to_string(),
        };
        return ResFrame::from_error(req_id, &denied);
    }

    match method {
        // ------------------------------------------------------------------
        // Utility
        // ------------------------------------------------------------------
        methods::PING => ResFrame::ok(req_id, json!({ "pong": true, "ts": clock::now_ms() })),

        // ------------------------------------------------------------------
        // Wishes
        // ------------------------------------------------------------------
        methods::WISHES_SUBMIT => handlers::handle_wishes_submit(params, req_id, app),

        methods::WISHES_LIST => handlers::handle_wishes_list(req_id, session, app),

        methods::WISHES_DELETE => handlers::handle_wishes_delete(params, req_id, app),

        methods::WISHES_CLEAR => handlers::handle_wishes_clear(req_id, app),

        methods::WISHES_SEARCH => handlers::handle_wishes_search(params, req_id, app),

        methods::WISHES_EXPORT => handlers::handle_wishes_export(req_id, app),

        // ------------------------------------------------------------------
        // Spotlight
        // ------------------------------------------------------------------
        methods::SPOTLIGHT_TRIGGER => handlers::handle_spotlight_trigger(params, req_id, app),

        methods::SPOTLIGHT_CURRENT => handlers::handle_spotlight_current(req_id, app),

        // ------------------------------------------------------------------
        // Stage
        // ------------------------------------------------------------------
        methods::STAGE_NEXT => handlers::handle_stage_step(true, req_id, app).await,

        methods::STAGE_PREV => handlers::handle_stage_step(false, req_id, app).await,

        methods::STAGE_CURRENT => ResFrame::ok(req_id, app.stage.current()),

        // ------------------------------------------------------------------
        // Likes
        // ------------------------------------------------------------------
        methods::LIKES_GET => handlers::handle_likes_get(req_id, session, app),

        methods::LIKES_TOGGLE => handlers::handle_likes_toggle(req_id, session, app),

        // ------------------------------------------------------------------
        // Admin
        // ------------------------------------------------------------------
        methods::ADMIN_LOGOUT => handlers::handle_admin_logout(req_id, session, app),

        _ => ResFrame::from_error(
            req_id,
            &WishwallError::MethodNotFound {
                method: method.to_string(),
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::{test_state, ADMIN_PASSWORD};
    use std::sync::atomic::AtomicBool;
    use wishwall_core::types::{DeviceId, View};
    use wishwall_store::Snapshot;

    fn session(app: &Arc<AppState>, view: View, admin: bool) -> Session {
        let token = admin.then(|| app.auth.login(ADMIN_PASSWORD).unwrap());
        Session {
            view,
            device: DeviceId::from("dev-1"),
            token,
            admin: Arc::new(AtomicBool::new(admin)),
            _subscription: app.store.subscribe(Box::new(|_: &Snapshot| {})).unwrap(),
        }
    }

    fn code(res: &ResFrame) -> &str {
        res.error.as_ref().map(|e| e.code.as_str()).unwrap_or("")
    }

    #[tokio::test]
    async fn wall_cannot_call_admin_methods() {
        let app = test_state();
        app.submit_wish("Anna", "song", None).unwrap();
        let mut wall = session(&app, View::Wall, false);

        for method in methods::ADMIN_ONLY {
            let res = route(method, Some(&json!({"id": "x"})), "1", &mut wall, &app).await;
            assert!(!res.ok, "{method} should be refused");
            assert_eq!(code(&res), "PERMISSION_DENIED");
            assert_eq!(
                res.error.unwrap().message,
                "Permission denied: admin session required"
            );
        }
        assert_eq!(app.store.snapshot().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_method_is_reported() {
        let app = test_state();
        let mut wall = session(&app, View::Wall, false);
        let res = route("wishes.update", None, "1", &mut wall, &app).await;
        assert_eq!(code(&res), "METHOD_NOT_FOUND");
        assert_eq!(res.error.unwrap().message, "Method not found: wishes.update");
    }

    #[tokio::test]
    async fn ping_answers() {
        let app = test_state();
        let mut stage = session(&app, View::Stage, false);
        let res = route("ping", None, "7", &mut stage, &app).await;
        assert!(res.ok);
        assert_eq!(res.id, "7");
        assert_eq!(res.payload.unwrap()["pong"], true);
    }

    #[tokio::test]
    async fn logout_downgrades_the_session() {
        let app = test_state();
        let mut admin = session(&app, View::Admin, true);
        let token = admin.token.clone().unwrap();

        let res = route("admin.logout", None, "1", &mut admin, &app).await;
        assert!(res.ok);
        assert!(!app.auth.validate(&token));

        let res = route("wishes.clear", None, "2", &mut admin, &app).await;
        assert_eq!(code(&res), "PERMISSION_DENIED");
    }
}
