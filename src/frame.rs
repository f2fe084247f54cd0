// Redraw scheduling. Input handlers only *request* a redraw; the render loop
// composites at most once per frame tick no matter how many requests arrived.

use tracing::trace;

#[derive(Debug, Default, Clone)]
pub struct FrameScheduler {
    dirty: bool,
    coalesced: u64, // requests folded into an already pending redraw
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the surface stale; it will be redrawn on the next tick.
    pub fn request(&mut self) {
        if self.dirty {
            self.coalesced += 1;
            trace!(coalesced = self.coalesced, "redraw already pending");
        }
        self.dirty = true;
    }

    pub fn is_pending(&self) -> bool {
        self.dirty
    }

    /// Consume the pending request, if any. Returns true when a draw is due.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }
}
