use chrono::{DateTime, Utc};
use serde::Serialize;
use wishwall_core::config::StageConfig;
use wishwall_core::types::WishId;
use wishwall_store::{Snapshot, WishRecord};

use crate::rotation::Rotation;

/// Ticker wish snippets are cut shorter than the hero text.
const TICKER_WISH_LEN: usize = 80;

/// The highlighted record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroCard {
    pub id: WishId,
    pub name: String,
    /// Present only when the stage is configured to show wish text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wish: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub age: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SideItem {
    pub id: WishId,
    pub name: String,
    pub age: String,
}

/// Everything one stage screen renders at an instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageFrame {
    pub hero: Option<HeroCard>,
    pub index: Option<usize>,
    pub next: Option<String>,
    pub side: Vec<SideItem>,
    pub ticker: Vec<String>,
    pub total: usize,
}

impl StageFrame {
    pub fn build(snapshot: &Snapshot, rotation: &Rotation, cfg: &StageConfig, now: DateTime<Utc>) -> Self {
        let records = &snapshot.records;
        let index = rotation.hero_index().filter(|&i| i < records.len());

        let hero = index.map(|i| {
            let r = &records[i];
            HeroCard {
                id: r.id.clone(),
                name: r.name.clone(),
                wish: cfg
                    .show_wishes
                    .then(|| trim_one_line(&r.wish, cfg.hero_max_len)),
                created_at: r.created_at,
                age: age_label(r, now),
            }
        });

        let next = rotation
            .next_index()
            .and_then(|i| records.get(i))
            .map(|r| r.name.clone());

        let side = records
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != index)
            .take(cfg.side_max)
            .map(|(_, r)| SideItem {
                id: r.id.clone(),
                name: r.name.clone(),
                age: age_label(r, now),
            })
            .collect();

        let ticker = records
            .iter()
            .take(cfg.ticker_max)
            .map(|r| ticker_line(r, cfg.show_wishes))
            .collect();

        Self {
            hero,
            index,
            next,
            side,
            ticker,
            total: records.len(),
        }
    }
}

fn ticker_line(r: &WishRecord, show_wish: bool) -> String {
    if show_wish && !r.wish.is_empty() {
        format!("{} · {}", r.name, trim_one_line(&r.wish, TICKER_WISH_LEN))
    } else {
        r.name.clone()
    }
}

// Records still waiting on a server timestamp read as "now".
fn age_label(r: &WishRecord, now: DateTime<Utc>) -> String {
    r.created_at
        .map(|t| time_ago(t, now))
        .unwrap_or_else(|| "now".to_string())
}

/// Collapse whitespace runs to single spaces and cut to `max` characters,
/// marking a cut with a trailing ellipsis.
pub fn trim_one_line(text: &str, max: usize) -> String {
    let one = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if one.chars().count() <= max {
        return one;
    }
    let mut cut: String = one.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// Relative age label: `42s ago`, `5m ago`, `3h ago`, `2d ago`, then a plain
/// date once a week has passed.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    if secs < 60 {
        return format!("{secs}s ago");
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{mins}m ago");
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = hours / 24;
    if days < 7 {
        return format!("{days}d ago");
    }
    then.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 21, 0, 0).unwrap()
    }

    fn record(name: &str, wish: &str, mins_ago: i64) -> WishRecord {
        let at = now() - Duration::minutes(mins_ago);
        WishRecord {
            id: WishId::from(name),
            name: name.into(),
            wish: wish.into(),
            created_at: Some(at),
            created_at_ms: at.timestamp_millis(),
        }
    }

    fn snapshot(n: usize) -> Snapshot {
        Snapshot::new(
            1,
            (0..n)
                .map(|i| record(&format!("guest-{i}"), "Dancing Queen", i as i64))
                .collect(),
        )
    }

    #[test]
    fn trim_collapses_and_cuts() {
        assert_eq!(trim_one_line("  a \n\t b  ", 80), "a b");
        assert_eq!(trim_one_line("abcdef", 6), "abcdef");
        assert_eq!(trim_one_line("abcdefg", 6), "abcde…");
        assert_eq!(trim_one_line("æøåæøå!", 4), "æøå…");
    }

    #[test]
    fn time_ago_buckets() {
        let n = now();
        assert_eq!(time_ago(n, n), "0s ago");
        assert_eq!(time_ago(n - Duration::seconds(59), n), "59s ago");
        assert_eq!(time_ago(n - Duration::minutes(5), n), "5m ago");
        assert_eq!(time_ago(n - Duration::hours(3), n), "3h ago");
        assert_eq!(time_ago(n - Duration::days(6), n), "6d ago");
        assert_eq!(time_ago(n - Duration::days(8), n), "2026-10-08");
        // clock skew never yields a negative label
        assert_eq!(time_ago(n + Duration::seconds(30), n), "0s ago");
    }

    #[test]
    fn empty_snapshot_has_no_hero() {
        let frame = StageFrame::build(&Snapshot::default(), &Rotation::new(10), &StageConfig::default(), now());
        assert!(frame.hero.is_none());
        assert!(frame.side.is_empty());
        assert!(frame.ticker.is_empty());
        assert_eq!(frame.total, 0);
    }

    #[test]
    fn frame_excludes_hero_from_side_and_respects_caps() {
        let snap = snapshot(40);
        let mut rot = Rotation::new(10);
        rot.set_len(snap.len());
        rot.tick();
        rot.tick();

        let frame = StageFrame::build(&snap, &rot, &StageConfig::default(), now());
        let hero = frame.hero.as_ref().unwrap();
        assert_eq!(hero.name, "guest-2");
        assert!(hero.wish.is_none());
        assert_eq!(hero.age, "2m ago");
        assert_eq!(frame.next.as_deref(), Some("guest-3"));

        assert_eq!(frame.side.len(), 14);
        assert!(frame.side.iter().all(|s| s.name != "guest-2"));
        assert_eq!(frame.side[0].name, "guest-0");

        assert_eq!(frame.ticker.len(), 30);
        assert_eq!(frame.ticker[0], "guest-0");
        assert_eq!(frame.total, 40);
    }

    #[test]
    fn show_wishes_adds_trimmed_text() {
        let long = "la ".repeat(100);
        let snap = Snapshot::new(1, vec![record("Anna", &long, 0)]);
        let mut rot = Rotation::new(10);
        rot.set_len(1);
        let cfg = StageConfig {
            show_wishes: true,
            ..StageConfig::default()
        };

        let frame = StageFrame::build(&snap, &rot, &cfg, now());
        let wish = frame.hero.unwrap().wish.unwrap();
        assert_eq!(wish.chars().count(), cfg.hero_max_len);
        assert!(wish.ends_with('…'));
        assert!(frame.ticker[0].starts_with("Anna · la la"));
        assert!(frame.next.is_none());
    }

    #[test]
    fn hero_never_serializes_wish_by_default() {
        let snap = Snapshot::new(1, vec![record("Anna", "secret song", 0)]);
        let mut rot = Rotation::new(10);
        rot.set_len(1);
        let frame = StageFrame::build(&snap, &rot, &StageConfig::default(), now());
        let json = serde_json::to_string(&frame).unwrap();
        assert!(!json.contains("secret song"));
    }
}
