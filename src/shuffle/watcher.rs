use tracing::debug;

use crate::shuffle::{ShuffleCoordinator, TriggerOutcome};

/// Detects reordering between successive observations of a ranked id list.
#[derive(Debug, Clone, Default)]
pub struct OrderWatcher {
    previous: Option<Vec<String>>,
}

impl OrderWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `order` and reports whether it differs from the last one seen.
    /// The first observation only seeds the snapshot.
    pub fn observe(&mut self, order: &[String]) -> bool {
        let changed = match &self.previous {
            Some(previous) => previous.as_slice() != order,
            None => false,
        };
        if self.previous.as_deref() != Some(order) {
            self.previous = Some(order.to_vec());
        }
        changed
    }

    /// Observes `order` and starts a shuffle on `coordinator` if it changed.
    pub fn observe_and_trigger(
        &mut self,
        order: &[String],
        coordinator: &mut ShuffleCoordinator,
    ) -> Option<TriggerOutcome> {
        if !self.observe(order) {
            return None;
        }
        debug!("tool order changed, triggering shuffle");
        coordinator.trigger_shuffle()
    }

    pub fn snapshot(&self) -> Option<&[String]> {
        self.previous.as_deref()
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }
}
