use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};
use wishwall_broadcast::{SpotlightChannel, SpotlightEvent};
use wishwall_core::clock;
use wishwall_core::config::WishwallConfig;
use wishwall_store::{RecordStore, Snapshot};

use crate::countdown::{Countdown, CountdownStep, CountdownView};
use crate::rotation::Rotation;
use crate::view::StageFrame;

const UPDATE_CAPACITY: usize = 64;
const CONTROL_CAPACITY: usize = 16;

/// Epoch-millisecond source. Swappable so tests can follow tokio's paused clock.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Output of the engine, fanned out to every stage client.
#[derive(Debug, Clone)]
pub enum StageUpdate {
    Frame(StageFrame),
    Spotlight(CountdownView),
    SpotlightExiting { id: String },
    SpotlightCleared { id: String },
}

/// Manual hero navigation; the reply carries the resulting frame.
#[derive(Debug)]
pub enum StageControl {
    Next(oneshot::Sender<StageFrame>),
    Prev(oneshot::Sender<StageFrame>),
}

/// Cheap, cloneable handle for talking to a running [`StageEngine`].
#[derive(Clone)]
pub struct StageHandle {
    control: mpsc::Sender<StageControl>,
    frames: watch::Receiver<StageFrame>,
    updates: broadcast::Sender<StageUpdate>,
}

impl StageHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<StageUpdate> {
        self.updates.subscribe()
    }

    /// Latest frame the engine produced.
    pub fn current(&self) -> StageFrame {
        self.frames.borrow().clone()
    }

    /// `None` once the engine has stopped.
    pub async fn next(&self) -> Option<StageFrame> {
        let (tx, rx) = oneshot::channel();
        self.control.send(StageControl::Next(tx)).await.ok()?;
        rx.await.ok()
    }

    pub async fn prev(&self) -> Option<StageFrame> {
        let (tx, rx) = oneshot::channel();
        self.control.send(StageControl::Prev(tx)).await.ok()?;
        rx.await.ok()
    }
}

/// Server-side stage consumer.
///
/// Follows the record store and the spotlight channel, rotates the hero on a
/// fixed interval, runs the spotlight countdown and clears each expired
/// spotlight exactly once.
pub struct StageEngine {
    store: Arc<dyn RecordStore>,
    spotlight: Arc<SpotlightChannel>,
    config: WishwallConfig,
    clock: Clock,
    updates: broadcast::Sender<StageUpdate>,
    frames: watch::Sender<StageFrame>,
    control_rx: mpsc::Receiver<StageControl>,
    snapshot: Snapshot,
    rotation: Rotation,
    countdown: Countdown,
}

impl StageEngine {
    pub fn new(
        store: Arc<dyn RecordStore>,
        spotlight: Arc<SpotlightChannel>,
        config: &WishwallConfig,
    ) -> (Self, StageHandle) {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        let (control, control_rx) = mpsc::channel(CONTROL_CAPACITY);
        let rotation = Rotation::new(config.stage.hero_cap);
        let snapshot = Snapshot::default();
        let initial = StageFrame::build(&snapshot, &rotation, &config.stage, Utc::now());
        let (frames, frames_rx) = watch::channel(initial);

        let handle = StageHandle {
            control,
            frames: frames_rx,
            updates: updates.clone(),
        };
        let engine = Self {
            store,
            spotlight,
            clock: Arc::new(clock::now_ms),
            updates,
            frames,
            control_rx,
            snapshot,
            rotation,
            countdown: Countdown::new(
                (config.spotlight.duration_secs * 1000) as i64,
                config.spotlight.exit_ms as i64,
            ),
            config: config.clone(),
        };
        (engine, handle)
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Main loop. Runs until `shutdown` broadcasts `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("stage engine started");

        // Subscribe to the spotlight first so a trigger racing startup is not lost.
        let mut spot = self.spotlight.subscribe_merged();
        let mut spot_open = true;

        let (snap_tx, mut snap_rx) = watch::channel(Snapshot::default());
        let _subscription = match self.store.subscribe(Box::new(move |s: &Snapshot| {
            snap_tx.send_replace(s.clone());
        })) {
            Ok(sub) => sub,
            Err(e) => {
                error!(error = %e, "stage engine could not subscribe to the record store");
                return;
            }
        };

        let rotate_every = Duration::from_secs(self.config.stage.rotate_secs.max(1));
        let mut rotate = interval_at(Instant::now() + rotate_every, rotate_every);
        rotate.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let tick_every = Duration::from_millis(self.config.spotlight.tick_ms.max(10));
        let mut countdown_tick = interval_at(Instant::now() + tick_every, tick_every);
        countdown_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = snap_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snap_rx.borrow_and_update().clone();
                    if self.on_snapshot(snapshot) {
                        // a new hero gets a full slot
                        rotate.reset();
                    }
                }
                _ = rotate.tick() => {
                    if self.rotation.window() > 1 {
                        self.rotation.tick();
                        self.emit_frame();
                    }
                }
                _ = countdown_tick.tick() => {
                    self.on_countdown_tick();
                }
                event = spot.recv(), if spot_open => match event {
                    Some(event) => self.on_spotlight(event),
                    None => {
                        debug!("live spotlight unavailable, polling persisted state");
                        spot_open = false;
                    }
                },
                Some(control) = self.control_rx.recv() => {
                    self.on_control(control);
                }
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        info!("stage engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    // --- private helpers ---------------------------------------------------

    /// Returns `true` when the record count changed and rotation restarted.
    fn on_snapshot(&mut self, snapshot: Snapshot) -> bool {
        let reset = self.rotation.set_len(snapshot.len());
        if reset {
            debug!(len = snapshot.len(), "record count changed, rotation reset");
        }
        self.snapshot = snapshot;
        self.emit_frame();
        reset
    }

    fn on_control(&mut self, control: StageControl) {
        let reply = match control {
            StageControl::Next(reply) => {
                self.rotation.advance();
                reply
            }
            StageControl::Prev(reply) => {
                self.rotation.retreat();
                reply
            }
        };
        let frame = self.emit_frame();
        // caller may have gone away
        let _ = reply.send(frame);
    }

    fn on_spotlight(&mut self, event: SpotlightEvent) {
        let now = (self.clock)();
        let id = event.id.clone();
        if !self.countdown.show(event, now) {
            debug!(spotlight_id = %id, "spotlight already over, clearing");
            self.spotlight.clear_if(&id);
            return;
        }
        if let Some(view) = self.countdown.view(now) {
            info!(spotlight_id = %view.id, remaining_ms = view.remaining_ms, "spotlight showing");
            self.send(StageUpdate::Spotlight(view));
        }
    }

    fn on_countdown_tick(&mut self) {
        let now = (self.clock)();

        // Without the live channel, pick up new events from persisted state.
        if !self.spotlight.live_available() {
            if let Some(event) = self.spotlight.current(now) {
                if self.countdown.event().map(|e| e.id.as_str()) != Some(event.id.as_str()) {
                    self.on_spotlight(event);
                }
            }
        }

        match self.countdown.poll(now) {
            CountdownStep::Nothing => {}
            CountdownStep::Exiting(id) => {
                debug!(spotlight_id = %id, "spotlight exiting");
                self.send(StageUpdate::SpotlightExiting { id });
            }
            CountdownStep::Clear(id) => {
                if !self.spotlight.clear_if(&id) {
                    debug!(spotlight_id = %id, "persisted spotlight already replaced or cleared");
                }
                self.send(StageUpdate::SpotlightCleared { id });
            }
        }
    }

    fn emit_frame(&mut self) -> StageFrame {
        let frame = StageFrame::build(&self.snapshot, &self.rotation, &self.config.stage, self.now());
        self.frames.send_replace(frame.clone());
        self.send(StageUpdate::Frame(frame.clone()));
        frame
    }

    fn now(&self) -> DateTime<Utc> {
        clock::from_ms((self.clock)()).unwrap_or_else(Utc::now)
    }

    fn send(&self, update: StageUpdate) {
        // no stage clients connected is normal
        if self.updates.send(update).is_err() {
            debug!("stage update had no receivers");
        }
    }
}
