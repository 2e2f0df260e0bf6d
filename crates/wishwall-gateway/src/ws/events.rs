//! Server → client event payloads.
//!
//! Snapshots are projected per role here: only connections that may see wish
//! text ever get it serialized.

use serde_json::{json, Value};
use wishwall_broadcast::SpotlightEvent;
use wishwall_core::types::View;
use wishwall_protocol::{
    frames::EventFrame,
    methods::{
        EV_LIKES, EV_SNAPSHOT, EV_SPOTLIGHT, EV_SPOTLIGHT_CLEARED, EV_SPOTLIGHT_EXITING,
        EV_STAGE_FRAME, EV_TICK,
    },
};
use wishwall_stage::StageUpdate;
use wishwall_store::Snapshot;

pub fn snapshot_payload(snapshot: &Snapshot, sees_wishes: bool) -> Value {
    let records = if sees_wishes {
        serde_json::to_value(snapshot.records.as_ref())
    } else {
        serde_json::to_value(snapshot.public())
    }
    .unwrap_or_else(|_| Value::Array(Vec::new()));
    json!({
        "version": snapshot.version,
        "count": snapshot.len(),
        "records": records,
    })
}

pub fn snapshot_event(snapshot: &Snapshot, sees_wishes: bool) -> EventFrame {
    EventFrame::new(EV_SNAPSHOT, snapshot_payload(snapshot, sees_wishes))
}

/// Spotlight as sent in `hello-ok` and `spotlight.current`.
pub fn spotlight_payload(event: &SpotlightEvent, now_ms: i64) -> Value {
    json!({
        "id": event.id,
        "active": event.active,
        "message": event.message,
        "until": event.until,
        "durationMs": event.duration_ms,
        "remainingMs": event.remaining_ms(now_ms),
    })
}

/// Map an engine update onto the event a connection with `view` should get.
/// Stage frames only go to stage displays.
pub fn stage_event(update: &StageUpdate, view: View) -> Option<EventFrame> {
    match update {
        StageUpdate::Frame(frame) => {
            (view == View::Stage).then(|| EventFrame::new(EV_STAGE_FRAME, frame))
        }
        StageUpdate::Spotlight(countdown) => Some(EventFrame::new(EV_SPOTLIGHT, countdown)),
        StageUpdate::SpotlightExiting { id } => {
            Some(EventFrame::new(EV_SPOTLIGHT_EXITING, json!({ "id": id })))
        }
        StageUpdate::SpotlightCleared { id } => {
            Some(EventFrame::new(EV_SPOTLIGHT_CLEARED, json!({ "id": id })))
        }
    }
}

pub fn likes_event(count: u64) -> EventFrame {
    EventFrame::new(EV_LIKES, json!({ "count": count }))
}

pub fn tick_event(now_ms: i64) -> EventFrame {
    EventFrame::new(EV_TICK, json!({ "ts": now_ms }))
}
