//! Spotlight countdown state machine.
//!
//! ```text
//!   Idle ──show──▶ Showing ──remaining = 0──▶ Exiting ──exit delay──▶ Done
//!                    ▲                           │
//!                    └──────── show(new) ────────┘
//! ```
//!
//! `Done` is reached at most once per event, which is when the owner must
//! clear the persisted spotlight.

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use wishwall_broadcast::SpotlightEvent;
use wishwall_core::clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Showing,
    /// Countdown hit zero; waiting out the exit animation until `deadline_ms`.
    Exiting { deadline_ms: i64 },
    Done,
}

/// What [`Countdown::poll`] asks its owner to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountdownStep {
    Nothing,
    /// Entered the exit phase for the event with this id.
    Exiting(String),
    /// Exit delay elapsed; clear the event with this id. Emitted exactly once.
    Clear(String),
}

/// Renderable countdown state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountdownView {
    pub id: String,
    pub message: String,
    pub until: i64,
    pub remaining_ms: i64,
    /// `mm:ss` of whole seconds left.
    pub countdown: String,
    /// 0 at start, 1 at expiry.
    pub progress: f64,
    /// Local wall-clock `HH:MM` of expiry.
    pub done_at: String,
    pub exiting: bool,
}

pub struct Countdown {
    event: Option<SpotlightEvent>,
    phase: Phase,
    /// Progress denominator for events that do not carry their own length.
    duration_ms: i64,
    exit_ms: i64,
}

impl Countdown {
    pub fn new(duration_ms: i64, exit_ms: i64) -> Self {
        Self {
            event: None,
            phase: Phase::Idle,
            duration_ms,
            exit_ms,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn event(&self) -> Option<&SpotlightEvent> {
        self.event.as_ref()
    }

    /// Start (or restart) for `event`. A pending exit for an older event is
    /// abandoned. Events that are not current at `now_ms` are ignored.
    pub fn show(&mut self, event: SpotlightEvent, now_ms: i64) -> bool {
        if !event.is_current(now_ms) {
            return false;
        }
        self.event = Some(event);
        self.phase = Phase::Showing;
        true
    }

    /// Advance on a timer tick.
    pub fn poll(&mut self, now_ms: i64) -> CountdownStep {
        let Some(event) = &self.event else {
            return CountdownStep::Nothing;
        };
        match self.phase {
            Phase::Showing if event.remaining_ms(now_ms) == 0 => {
                self.phase = Phase::Exiting {
                    deadline_ms: now_ms + self.exit_ms,
                };
                CountdownStep::Exiting(event.id.clone())
            }
            Phase::Exiting { deadline_ms } if now_ms >= deadline_ms => {
                self.phase = Phase::Done;
                CountdownStep::Clear(event.id.clone())
            }
            _ => CountdownStep::Nothing,
        }
    }

    /// `None` unless an event is showing or exiting.
    pub fn view(&self, now_ms: i64) -> Option<CountdownView> {
        let exiting = match self.phase {
            Phase::Showing => false,
            Phase::Exiting { .. } => true,
            Phase::Idle | Phase::Done => return None,
        };
        let event = self.event.as_ref()?;
        let remaining_ms = event.remaining_ms(now_ms);
        let total_ms = if event.duration_ms > 0 {
            event.duration_ms
        } else {
            self.duration_ms
        };
        Some(CountdownView {
            id: event.id.clone(),
            message: event.message.clone(),
            until: event.until,
            remaining_ms,
            countdown: format_countdown(remaining_ms),
            progress: progress(remaining_ms, total_ms),
            done_at: clock::from_ms(event.until)
                .map(|t| hh_mm(&t.with_timezone(&Local)))
                .unwrap_or_default(),
            exiting,
        })
    }
}

/// `mm:ss` of the whole seconds in `remaining_ms`.
pub fn format_countdown(remaining_ms: i64) -> String {
    let s = remaining_ms.max(0) / 1000;
    format!("{:02}:{:02}", s / 60, s % 60)
}

/// Elapsed fraction of `duration_ms`, clamped to `[0, 1]`.
pub fn progress(remaining_ms: i64, duration_ms: i64) -> f64 {
    let total = duration_ms.max(1) as f64;
    (1.0 - remaining_ms.max(0) as f64 / total).clamp(0.0, 1.0)
}

pub fn hh_mm<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    t.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;

    const NOW: i64 = 1_700_000_000_000;

    fn event(secs: u64) -> SpotlightEvent {
        SpotlightEvent::new("WISH WALL", Duration::from_secs(secs), NOW)
    }

    #[test]
    fn countdown_formatting() {
        assert_eq!(format_countdown(120_000), "02:00");
        assert_eq!(format_countdown(61_999), "01:01");
        assert_eq!(format_countdown(999), "00:00");
        assert_eq!(format_countdown(-5), "00:00");
    }

    #[test]
    fn progress_is_clamped() {
        assert_eq!(progress(120_000, 120_000), 0.0);
        assert_eq!(progress(60_000, 120_000), 0.5);
        assert_eq!(progress(0, 120_000), 1.0);
        assert_eq!(progress(500_000, 120_000), 0.0);
        assert_eq!(progress(0, 0), 1.0);
    }

    #[test]
    fn hh_mm_pads() {
        let t = Utc.with_ymd_and_hms(2026, 10, 16, 7, 5, 0).unwrap();
        assert_eq!(hh_mm(&t), "07:05");
    }

    #[test]
    fn runs_through_exit_and_clears_once() {
        let mut c = Countdown::new(5_000, 480);
        assert!(c.show(event(5), NOW));
        let id = c.event().unwrap().id.clone();

        assert_eq!(c.poll(NOW + 4_800), CountdownStep::Nothing);
        assert_eq!(c.view(NOW + 4_800).unwrap().countdown, "00:00");

        assert_eq!(c.poll(NOW + 5_000), CountdownStep::Exiting(id.clone()));
        assert!(c.view(NOW + 5_000).unwrap().exiting);
        assert_eq!(c.poll(NOW + 5_200), CountdownStep::Nothing);
        assert_eq!(c.poll(NOW + 5_480), CountdownStep::Clear(id));

        assert_eq!(c.phase(), Phase::Done);
        assert!(c.view(NOW + 5_480).is_none());
        for t in [5_600, 6_000, 60_000] {
            assert_eq!(c.poll(NOW + t), CountdownStep::Nothing);
        }
    }

    #[test]
    fn new_event_during_exit_abandons_old_clear() {
        let mut c = Countdown::new(5_000, 480);
        c.show(event(5), NOW);
        c.poll(NOW + 5_000);

        let fresh = SpotlightEvent::new("AGAIN", Duration::from_secs(10), NOW + 5_100);
        let fresh_id = fresh.id.clone();
        assert!(c.show(fresh, NOW + 5_100));
        assert_eq!(c.phase(), Phase::Showing);
        assert_eq!(c.poll(NOW + 5_600), CountdownStep::Nothing);
        assert_eq!(c.poll(NOW + 15_100), CountdownStep::Exiting(fresh_id));
    }

    #[test]
    fn expired_event_is_not_shown() {
        let mut c = Countdown::new(5_000, 480);
        assert!(!c.show(event(5), NOW + 5_000));
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.poll(NOW + 10_000), CountdownStep::Nothing);
    }

    #[test]
    fn progress_follows_the_event_length() {
        // configured default is two minutes; this takeover lasts ten seconds
        let mut c = Countdown::new(120_000, 480);
        assert!(c.show(event(10), NOW));

        let start = c.view(NOW).unwrap();
        assert_eq!(start.progress, 0.0);
        assert_eq!(start.countdown, "00:10");
        assert_eq!(c.view(NOW + 5_000).unwrap().progress, 0.5);
        assert_eq!(c.view(NOW + 10_000).unwrap().progress, 1.0);
    }

    #[test]
    fn events_without_length_fall_back_to_configured_duration() {
        let mut c = Countdown::new(10_000, 480);
        let mut legacy = event(5);
        legacy.duration_ms = 0;
        assert!(c.show(legacy, NOW));
        assert_eq!(c.view(NOW).unwrap().progress, 0.5);
    }
}
