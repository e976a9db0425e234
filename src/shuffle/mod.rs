pub mod coordinator;
pub mod watcher;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::clock::millis;

pub use coordinator::{ShuffleCoordinator, TriggerOutcome};
pub use watcher::OrderWatcher;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShufflePhase {
    Idle,
    Delaying,
    Shuffling,
}

/// Narrow/mobile layouts get the shorter shuffle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Standard,
    Compact,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ShuffleEvent {
    ShuffleStarted { animation_id: String },
    Completed { animation_id: String },
    Cancelled { animation_id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShuffleState {
    pub phase: ShufflePhase,
    pub is_delaying: bool,
    pub is_shuffling: bool,
    pub animation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShuffleSettings {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,
    #[serde(default = "default_compact_duration_ms")]
    pub compact_duration_ms: u64,
    #[serde(default)]
    pub disabled: bool,
}

impl ShuffleSettings {
    pub fn delay(&self) -> Duration {
        millis(self.delay_ms)
    }

    pub fn duration(&self) -> Duration {
        millis(self.duration_ms)
    }

    pub fn compact_duration(&self) -> Duration {
        millis(self.compact_duration_ms)
    }
}

impl Default for ShuffleSettings {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            duration_ms: default_duration_ms(),
            compact_duration_ms: default_compact_duration_ms(),
            disabled: false,
        }
    }
}

fn default_delay_ms() -> u64 {
    500
}

fn default_duration_ms() -> u64 {
    1_200
}

fn default_compact_duration_ms() -> u64 {
    800
}
