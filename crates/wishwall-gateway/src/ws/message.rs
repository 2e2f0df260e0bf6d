use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wishwall_core::clock;
use wishwall_core::error::WishwallError;
use wishwall_core::types::DeviceId;
use wishwall_protocol::{
    frames::{InboundFrame, ResFrame},
    handshake::ConnectParams,
    methods::CONNECT,
};
use wishwall_store::{Snapshot, Subscription};

use crate::app::AppState;
use crate::ws::connection::{ConnState, Session};
use crate::ws::handshake::{self, Admission};
use crate::ws::send::{self, WsSink};
use crate::ws::{dispatch, events};

/// Process one inbound WS text frame. Returns the new connection state.
pub async fn handle(
    conn_id: &str,
    text: &str,
    state: ConnState,
    tx: &mut WsSink,
    queue: &mpsc::Sender<String>,
    app: &Arc<AppState>,
) -> ConnState {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            warn!(conn_id, error = %e, "malformed frame");
            return state;
        }
    };

    match state {
        ConnState::AwaitingConnect => handle_auth(conn_id, frame, tx, queue, app).await,
        ConnState::Authenticated(mut session) => {
            handle_method(frame, &mut session, tx, app).await;
            ConnState::Authenticated(session)
        }
        ConnState::Closing => ConnState::Closing,
    }
}

/// Pre-auth: only `connect` method is accepted.
async fn handle_auth(
    conn_id: &str,
    frame: InboundFrame,
    tx: &mut WsSink,
    queue: &mpsc::Sender<String>,
    app: &Arc<AppState>,
) -> ConnState {
    let Some(req) = frame.as_req() else {
        return ConnState::AwaitingConnect;
    };

    if req.method != CONNECT {
        let e = WishwallError::Protocol("must connect first".to_string());
        let res = ResFrame::from_error(&req.id, &e);
        let _ = send::json(tx, &res).await;
        return ConnState::AwaitingConnect;
    }

    let params: ConnectParams = match req.params.and_then(|p| serde_json::from_value(p).ok()) {
        Some(p) => p,
        None => {
            let e = WishwallError::Protocol("invalid connect params".to_string());
            let res = ResFrame::from_error(&req.id, &e);
            let _ = send::json(tx, &res).await;
            return ConnState::Closing;
        }
    };

    let admission = match handshake::admit(&params, app.auth.as_ref()) {
        Ok(a) => a,
        Err(e) => {
            warn!(conn_id, view = %params.view, error = %e, "connect rejected");
            let _ = send::json(tx, &ResFrame::from_error(&req.id, &e)).await;
            return ConnState::Closing;
        }
    };

    let (session, snapshot) = match open_session(&params, &admission, queue, app) {
        Ok(opened) => opened,
        Err(e) => {
            warn!(conn_id, error = %e, "could not open session");
            let _ = send::json(tx, &ResFrame::from_error(&req.id, &e)).await;
            return ConnState::Closing;
        }
    };

    let spotlight = app
        .spotlight
        .current(clock::now_ms())
        .map(|e| events::spotlight_payload(&e, clock::now_ms()));
    let hello = handshake::hello_ok_payload(
        &admission,
        &app.config,
        events::snapshot_payload(&snapshot, session.is_admin()),
        spotlight,
    );
    if send::json(tx, &ResFrame::ok(&req.id, hello)).await.is_err() {
        return ConnState::Closing;
    }

    app.ws_clients.insert(conn_id.to_string(), queue.clone());
    info!(conn_id, view = %admission.view, device = %session.device, "client connected");
    ConnState::Authenticated(session)
}

/// Read the hello snapshot and subscribe for everything after it.
fn open_session(
    params: &ConnectParams,
    admission: &Admission,
    queue: &mpsc::Sender<String>,
    app: &Arc<AppState>,
) -> Result<(Session, Snapshot), WishwallError> {
    let snapshot = app.store.snapshot()?;
    let admin = Arc::new(AtomicBool::new(admission.admin));
    let subscription = subscribe_snapshots(app, queue.clone(), admin.clone(), snapshot.version)?;

    let device = params
        .device_id
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(DeviceId::from)
        .unwrap_or_else(DeviceId::anonymous);

    Ok((
        Session {
            view: admission.view,
            device,
            token: admission.session_token.clone(),
            admin,
            _subscription: subscription,
        },
        snapshot,
    ))
}

/// Forward every snapshot newer than `after` into the connection queue,
/// projected for the connection's current role.
fn subscribe_snapshots(
    app: &Arc<AppState>,
    queue: mpsc::Sender<String>,
    admin: Arc<AtomicBool>,
    after: u64,
) -> Result<Subscription, WishwallError> {
    let seq_app = Arc::clone(app);
    let sub = app.store.subscribe(Box::new(move |snapshot: &Snapshot| {
        // the hello response already carried this one
        if snapshot.version <= after {
            return;
        }
        let ev = events::snapshot_event(snapshot, admin.load(Ordering::Acquire))
            .with_seq(seq_app.next_seq());
        if queue.try_send(ev.to_text()).is_err() {
            debug!(version = snapshot.version, "client queue full, snapshot dropped");
        }
    }))?;
    Ok(sub)
}

/// Post-auth: dispatch method calls to handlers.
async fn handle_method(
    frame: InboundFrame,
    session: &mut Session,
    tx: &mut WsSink,
    app: &Arc<AppState>,
) {
    if let Some(req) = frame.as_req() {
        let res = dispatch::route(&req.method, req.params.as_ref(), &req.id, session, app).await;
        let _ = send::json(tx, &res).await;
    }
}
