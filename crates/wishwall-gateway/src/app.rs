use axum::{routing::get, Router};
use dashmap::DashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tracing::debug;
use wishwall_broadcast::{LikeCounter, SpotlightChannel};
use wishwall_core::config::WishwallConfig;
use wishwall_core::error::WishwallError;
use wishwall_protocol::frames::EventFrame;
use wishwall_stage::StageHandle;
use wishwall_store::{RecordStore, Submission, WishRecord};

use crate::auth::AuthService;

/// Central shared state: passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: WishwallConfig,
    pub event_seq: AtomicU64,
    pub store: Arc<dyn RecordStore>,
    pub spotlight: Arc<SpotlightChannel>,
    pub likes: LikeCounter,
    pub auth: Arc<dyn AuthService>,
    pub stage: StageHandle,
    /// Active WS connections: conn_id -> outbound queue.
    pub ws_clients: DashMap<String, mpsc::Sender<String>>,
}

impl AppState {
    pub fn new(
        config: WishwallConfig,
        store: Arc<dyn RecordStore>,
        spotlight: Arc<SpotlightChannel>,
        likes: LikeCounter,
        auth: Arc<dyn AuthService>,
        stage: StageHandle,
    ) -> Self {
        Self {
            config,
            event_seq: AtomicU64::new(0),
            store,
            spotlight,
            likes,
            auth,
            stage,
            ws_clients: DashMap::new(),
        }
    }

    /// Monotonically increasing sequence for broadcast events.
    pub fn next_seq(&self) -> u64 {
        self.event_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Validate and store a submission. Shared by the WS and HTTP surfaces.
    pub fn submit_wish(
        &self,
        name: &str,
        wish: &str,
        created_at_ms: Option<i64>,
    ) -> Result<WishRecord, WishwallError> {
        let mut submission = Submission::new(name, wish)?;
        if let Some(ms) = created_at_ms {
            submission = submission.with_created_at_ms(ms);
        }
        Ok(self.store.create(&submission)?)
    }

    /// Push an event to every connected client. Full queues drop the event.
    pub fn broadcast(&self, event: EventFrame) {
        let text = event.with_seq(self.next_seq()).to_text();
        for entry in self.ws_clients.iter() {
            if entry.value().try_send(text.clone()).is_err() {
                debug!(conn_id = %entry.key(), "client queue full, event dropped");
            }
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .route(
            "/wishes",
            get(crate::http::wishes::list_wishes).post(crate::http::wishes::submit_wish),
        )
        .route("/admin/export", get(crate::http::export::export_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::auth::SharedPasswordAuth;
    use wishwall_broadcast::{KeyValueStore, MemoryKv};
    use wishwall_stage::StageEngine;
    use wishwall_store::SqliteRecordStore;

    pub const ADMIN_PASSWORD: &str = "letmein";

    /// In-memory app with a stage engine that is built but never run.
    pub fn test_state() -> Arc<AppState> {
        let mut config = WishwallConfig::default();
        config.admin.password = ADMIN_PASSWORD.to_string();

        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKv::new());
        let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::open_in_memory().unwrap());
        let spotlight = Arc::new(SpotlightChannel::new(kv.clone(), true));
        let (_engine, stage) = StageEngine::new(store.clone(), spotlight.clone(), &config);
        let auth = Arc::new(SharedPasswordAuth::new(ADMIN_PASSWORD, kv.clone()));

        Arc::new(AppState::new(
            config,
            store,
            spotlight,
            LikeCounter::new(kv),
            auth,
            stage,
        ))
    }
}
