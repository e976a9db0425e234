use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{offset, SharedClock};
use crate::shuffle::{Layout, ShuffleEvent, ShufflePhase, ShuffleSettings, ShuffleState};

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingTransition {
    animation_id: String,
    due: DateTime<Utc>,
    to: ShufflePhase,
}

/// Two-phase re-ranking animation: `idle -> delaying -> shuffling -> idle`.
///
/// Timers are deadlines checked by [`ShuffleCoordinator::tick`]; only one is
/// pending at a time and each is tagged with the animation that armed it, so
/// a retrigger or cancel makes older deadlines unreachable.
pub struct ShuffleCoordinator {
    clock: SharedClock,
    settings: ShuffleSettings,
    layout: Layout,
    phase: ShufflePhase,
    animation_id: Option<String>,
    pending: Option<PendingTransition>,
    sequence: u64,
    disposed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerOutcome {
    pub animation_id: String,
    pub replaced: Option<String>,
}

impl ShuffleCoordinator {
    pub fn new(clock: SharedClock, settings: ShuffleSettings) -> Self {
        Self {
            clock,
            settings,
            layout: Layout::Standard,
            phase: ShufflePhase::Idle,
            animation_id: None,
            pending: None,
            sequence: 0,
            disposed: false,
        }
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
    }

    pub fn phase(&self) -> ShufflePhase {
        self.phase
    }

    pub fn state(&self) -> ShuffleState {
        ShuffleState {
            phase: self.phase,
            is_delaying: self.phase == ShufflePhase::Delaying,
            is_shuffling: self.phase == ShufflePhase::Shuffling,
            animation_id: self.animation_id.clone(),
        }
    }

    pub fn animation_id(&self) -> Option<&str> {
        self.animation_id.as_deref()
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.pending.as_ref().map(|p| p.due)
    }

    fn shuffle_duration(&self) -> Duration {
        match self.layout {
            Layout::Standard => self.settings.duration(),
            Layout::Compact => self.settings.compact_duration(),
        }
    }

    /// Starts a fresh animation, replacing any in flight. Returns `None` when
    /// animations are disabled or the coordinator was disposed.
    pub fn trigger_shuffle(&mut self) -> Option<TriggerOutcome> {
        if self.settings.disabled || self.disposed {
            return None;
        }
        let replaced = self.clear();
        self.sequence += 1;
        let animation_id = format!("shuffle-{}", self.sequence);
        let due = offset(self.clock.now(), self.settings.delay());
        self.phase = ShufflePhase::Delaying;
        self.animation_id = Some(animation_id.clone());
        self.pending = Some(PendingTransition {
            animation_id: animation_id.clone(),
            due,
            to: ShufflePhase::Shuffling,
        });
        debug!("shuffle {animation_id} delaying until {due}");
        Some(TriggerOutcome {
            animation_id,
            replaced,
        })
    }

    /// Returns to idle immediately, dropping any pending transition.
    pub fn cancel_shuffle(&mut self) -> Option<ShuffleEvent> {
        self.clear()
            .map(|animation_id| ShuffleEvent::Cancelled { animation_id })
    }

    fn clear(&mut self) -> Option<String> {
        self.pending = None;
        self.phase = ShufflePhase::Idle;
        self.animation_id.take()
    }

    /// Fires every transition due at the current clock time.
    pub fn tick(&mut self) -> Vec<ShuffleEvent> {
        let mut events = Vec::new();
        if self.disposed {
            return events;
        }
        let now = self.clock.now();
        while let Some(pending) = self.pending.clone() {
            if pending.due > now {
                break;
            }
            // stale deadline from a replaced animation
            if self.animation_id.as_deref() != Some(pending.animation_id.as_str()) {
                self.pending = None;
                break;
            }
            match pending.to {
                ShufflePhase::Shuffling => {
                    self.phase = ShufflePhase::Shuffling;
                    self.pending = Some(PendingTransition {
                        animation_id: pending.animation_id.clone(),
                        due: offset(pending.due, self.shuffle_duration()),
                        to: ShufflePhase::Idle,
                    });
                    events.push(ShuffleEvent::ShuffleStarted {
                        animation_id: pending.animation_id,
                    });
                }
                ShufflePhase::Idle | ShufflePhase::Delaying => {
                    self.phase = ShufflePhase::Idle;
                    self.animation_id = None;
                    self.pending = None;
                    events.push(ShuffleEvent::Completed {
                        animation_id: pending.animation_id,
                    });
                }
            }
        }
        events
    }

    /// Clears every pending timer; later ticks and triggers are no-ops.
    pub fn dispose(&mut self) {
        self.clear();
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Drop for ShuffleCoordinator {
    fn drop(&mut self) {
        if self.pending.is_some() {
            debug!("shuffle coordinator dropped with a pending transition");
        }
        self.dispose();
    }
}
