//! Delayed callbacks posted back into the event loop
//!
//! Every timer is a spawned sleep that sends [`PageEvent::TimerFired`] into
//! the content script's channel. Timers are keyed by purpose: scheduling a
//! kind that is already pending replaces it, which is all a debounce needs.
//! Each schedule bumps a generation; a firing whose generation is no longer
//! pending (cancelled or superseded) is ignored by [`Timers::take_fired`].

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::content_script::PageEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Reposition after the user stops typing in the anchor
    AnchorInputDebounce,
    /// Look at what the pointer landed on after leaving the anchor
    HoverCheck,
    /// Decide whether a blur should hide the overlay
    BlurCheck,
    /// Return the visual state to Default after Success/Error
    VisualReset,
}

impl TimerKind {
    /// Timers tied to the current anchor; hide cancels all of them
    pub const ANCHOR_SCOPED: [TimerKind; 4] = [
        TimerKind::AnchorInputDebounce,
        TimerKind::HoverCheck,
        TimerKind::BlurCheck,
        TimerKind::VisualReset,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub kind: TimerKind,
    pub generation: u64,
}

#[derive(Debug)]
struct PendingTimer {
    generation: u64,
    task: JoinHandle<()>,
}

#[derive(Debug)]
pub struct Timers {
    tx: UnboundedSender<PageEvent>,
    next_generation: u64,
    pending: HashMap<TimerKind, PendingTimer>,
}

impl Timers {
    pub fn new(tx: UnboundedSender<PageEvent>) -> Self {
        Self {
            tx,
            next_generation: 0,
            pending: HashMap::new(),
        }
    }

    /// Schedule `kind` after `delay`, replacing any pending timer of that kind
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration) -> u64 {
        self.cancel(kind);
        self.next_generation += 1;
        let generation = self.next_generation;

        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(PageEvent::TimerFired(TimerFired { kind, generation }));
        });
        trace!(kind = ?kind, generation = generation, delay_ms = delay.as_millis() as u64, "Scheduled timer");
        self.pending.insert(kind, PendingTimer { generation, task });
        generation
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        if let Some(timer) = self.pending.remove(&kind) {
            timer.task.abort();
            trace!(kind = ?kind, generation = timer.generation, "Cancelled timer");
        }
    }

    pub fn cancel_all(&mut self, kinds: &[TimerKind]) {
        for kind in kinds {
            self.cancel(*kind);
        }
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.pending.contains_key(&kind)
    }

    /// Accept a firing if it is still the pending one for its kind
    pub fn take_fired(&mut self, fired: TimerFired) -> bool {
        match self.pending.get(&fired.kind) {
            Some(timer) if timer.generation == fired.generation => {
                self.pending.remove(&fired.kind);
                true
            }
            _ => {
                trace!(kind = ?fired.kind, generation = fired.generation, "Ignoring stale timer");
                false
            }
        }
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        for (_, timer) in self.pending.drain() {
            timer.task.abort();
        }
    }
}
