use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wishwall_core::types::DeviceId;

use crate::error::Result;
use crate::kv::KeyValueStore;

const COUNT_KEY: &str = "stars";

fn voted_key(device: &DeviceId) -> String {
    format!("star_voted:{device}")
}

/// What a device sees: the global count and whether it has liked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeState {
    pub count: u64,
    pub voted: bool,
}

/// Global like counter with one vote per device.
pub struct LikeCounter {
    kv: Arc<dyn KeyValueStore>,
    // serializes read-modify-write of the count
    guard: Mutex<()>,
}

impl LikeCounter {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            guard: Mutex::new(()),
        }
    }

    pub fn get(&self, device: &DeviceId) -> Result<LikeState> {
        Ok(LikeState {
            count: self.count()?,
            voted: self.kv.get(&voted_key(device))?.is_some(),
        })
    }

    /// Flip this device's vote and move the count by one, never below zero.
    pub fn toggle(&self, device: &DeviceId) -> Result<LikeState> {
        let _held = self.guard.lock().unwrap_or_else(|e| e.into_inner());
        let key = voted_key(device);
        let voted = self.kv.get(&key)?.is_some();
        let count = self.count()?;

        let next = if voted {
            self.kv.remove(&key)?;
            LikeState {
                count: count.saturating_sub(1),
                voted: false,
            }
        } else {
            self.kv.set(&key, "1")?;
            LikeState {
                count: count + 1,
                voted: true,
            }
        };
        self.kv.set(COUNT_KEY, &next.count.to_string())?;
        debug!(device = %device, count = next.count, voted = next.voted, "like toggled");
        Ok(next)
    }

    fn count(&self) -> Result<u64> {
        let Some(raw) = self.kv.get(COUNT_KEY)? else {
            return Ok(0);
        };
        Ok(raw.trim().parse().unwrap_or_else(|_| {
            warn!(raw = %raw, "corrupt like count reset to zero");
            0
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    fn counter() -> (LikeCounter, Arc<MemoryKv>) {
        let kv = Arc::new(MemoryKv::new());
        (LikeCounter::new(kv.clone()), kv)
    }

    #[test]
    fn toggle_twice_returns_to_start() {
        let (likes, _) = counter();
        let dev = DeviceId::from("phone-1");

        let on = likes.toggle(&dev).unwrap();
        assert_eq!(on, LikeState { count: 1, voted: true });
        let off = likes.toggle(&dev).unwrap();
        assert_eq!(off, LikeState { count: 0, voted: false });
    }

    #[test]
    fn devices_vote_independently() {
        let (likes, _) = counter();
        let a = DeviceId::from("a");
        let b = DeviceId::from("b");
        likes.toggle(&a).unwrap();
        likes.toggle(&b).unwrap();

        assert_eq!(likes.get(&a).unwrap(), LikeState { count: 2, voted: true });
        let c = DeviceId::from("c");
        assert_eq!(likes.get(&c).unwrap(), LikeState { count: 2, voted: false });
    }

    #[test]
    fn count_never_goes_negative() {
        let (likes, kv) = counter();
        let dev = DeviceId::from("a");
        kv.set("star_voted:a", "1").unwrap();
        kv.set("stars", "0").unwrap();

        let s = likes.toggle(&dev).unwrap();
        assert_eq!(s, LikeState { count: 0, voted: false });
    }

    #[test]
    fn corrupt_count_reads_as_zero() {
        let (likes, kv) = counter();
        kv.set("stars", "lots").unwrap();
        assert_eq!(likes.get(&DeviceId::from("a")).unwrap().count, 0);
    }
}
