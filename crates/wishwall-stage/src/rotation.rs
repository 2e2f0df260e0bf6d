/// Hero rotation over the newest `cap` records.
///
/// The index always stays inside `0..min(cap, len)` and snaps back to 0
/// whenever the record count changes. Timer ticks and manual moves share the
/// same modulus; a manual move does not pause the timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    index: usize,
    cap: usize,
    len: usize,
}

impl Rotation {
    pub fn new(cap: usize) -> Self {
        Self {
            index: 0,
            cap: cap.max(1),
            len: 0,
        }
    }

    /// Number of records the hero cycles through.
    pub fn window(&self) -> usize {
        self.cap.min(self.len)
    }

    /// Record the current list length. Returns `true` if it changed, in which
    /// case the index was reset.
    pub fn set_len(&mut self, len: usize) -> bool {
        if len == self.len {
            return false;
        }
        self.len = len;
        self.index = 0;
        true
    }

    /// Timer-driven step.
    pub fn tick(&mut self) {
        self.advance();
    }

    pub fn advance(&mut self) {
        let w = self.window();
        if w > 0 {
            self.index = (self.index + 1) % w;
        }
    }

    pub fn retreat(&mut self) {
        let w = self.window();
        if w > 0 {
            self.index = (self.index + w - 1) % w;
        }
    }

    /// Current hero position, `None` when there are no records.
    pub fn hero_index(&self) -> Option<usize> {
        (self.len > 0).then_some(self.index)
    }

    /// Position that the next tick will land on.
    pub fn next_index(&self) -> Option<usize> {
        let w = self.window();
        (w > 1).then(|| (self.index + 1) % w)
    }
}
