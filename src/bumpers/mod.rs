pub mod coordinator;
pub mod exit_intent;
pub mod state;
pub mod storage;

use std::fmt::{Display, Formatter};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::clock::millis;

pub use coordinator::{BumperCoordinator, BumperStatus};
pub use exit_intent::{
    detect_exit_intent, BrowserKind, ExitIntentMonitor, ExitIntentSignal, ExitZone, PointerSample,
    Viewport,
};
pub use state::{BumperKind, BumperState, CoordinationState, StateRepository, TriggerSource};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StorageError};

/// What presentation layers should do with a bumper.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum BumperSignal {
    Show { kind: BumperKind, trigger: TriggerSource },
    Hide { kind: BumperKind },
}

/// The first gate that kept a bumper from showing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BlockReason {
    Dismissed,
    AlreadyShownThisSession,
    SessionLimitReached,
    GuidedRankingActive,
    GuidedRankingCompleted,
    AnotherBumperVisible { visible: BumperKind },
    Cooldown { remaining_ms: u64 },
    InsufficientPresence { remaining_ms: u64 },
    PostGuidedQuietPeriod { remaining_ms: u64 },
    Disposed,
}

impl Display for BlockReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dismissed => write!(f, "dismissed"),
            Self::AlreadyShownThisSession => write!(f, "already shown this session"),
            Self::SessionLimitReached => write!(f, "session limit reached"),
            Self::GuidedRankingActive => write!(f, "guided ranking in progress"),
            Self::GuidedRankingCompleted => write!(f, "guided ranking already completed"),
            Self::AnotherBumperVisible { visible } => write!(f, "{visible} is visible"),
            Self::Cooldown { remaining_ms } => write!(f, "cool-down, {remaining_ms}ms left"),
            Self::InsufficientPresence { remaining_ms } => {
                write!(f, "page presence too short, {remaining_ms}ms left")
            }
            Self::PostGuidedQuietPeriod { remaining_ms } => {
                write!(f, "post guided ranking quiet period, {remaining_ms}ms left")
            }
            Self::Disposed => write!(f, "coordinator disposed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BumperSettings {
    /// Minimum gap between any two bumpers.
    #[serde(default = "default_bumper_delay_ms")]
    pub bumper_delay_ms: u64,
    /// Gap between guided ranking completion and the exit-intent timer start.
    #[serde(default = "default_guided_ranking_delay_ms")]
    pub guided_ranking_delay_ms: u64,
    #[serde(default = "default_exit_intent_timer_ms")]
    pub exit_intent_timer_ms: u64,
    #[serde(default = "default_exit_intent_min_presence_ms")]
    pub exit_intent_min_presence_ms: u64,
    #[serde(default = "default_exit_intent_max_per_session")]
    pub exit_intent_max_per_session: u32,
    #[serde(default = "default_product_bumper_initial_delay_ms")]
    pub product_bumper_initial_delay_ms: u64,
    #[serde(default = "default_manual_guidance_delay_ms")]
    pub manual_guidance_delay_ms: u64,
    /// A guided-ranking flag left by another session stops counting after this long.
    #[serde(default = "default_guided_ranking_stale_after_ms")]
    pub guided_ranking_stale_after_ms: u64,
}

impl BumperSettings {
    pub fn bumper_delay(&self) -> Duration {
        millis(self.bumper_delay_ms)
    }

    pub fn guided_ranking_delay(&self) -> Duration {
        millis(self.guided_ranking_delay_ms)
    }

    pub fn exit_intent_timer(&self) -> Duration {
        millis(self.exit_intent_timer_ms)
    }

    pub fn exit_intent_min_presence(&self) -> Duration {
        millis(self.exit_intent_min_presence_ms)
    }

    pub fn product_bumper_initial_delay(&self) -> Duration {
        millis(self.product_bumper_initial_delay_ms)
    }

    pub fn manual_guidance_delay(&self) -> Duration {
        millis(self.manual_guidance_delay_ms)
    }

    pub fn guided_ranking_stale_after(&self) -> Duration {
        millis(self.guided_ranking_stale_after_ms)
    }
}

impl Default for BumperSettings {
    fn default() -> Self {
        Self {
            bumper_delay_ms: default_bumper_delay_ms(),
            guided_ranking_delay_ms: default_guided_ranking_delay_ms(),
            exit_intent_timer_ms: default_exit_intent_timer_ms(),
            exit_intent_min_presence_ms: default_exit_intent_min_presence_ms(),
            exit_intent_max_per_session: default_exit_intent_max_per_session(),
            product_bumper_initial_delay_ms: default_product_bumper_initial_delay_ms(),
            manual_guidance_delay_ms: default_manual_guidance_delay_ms(),
            guided_ranking_stale_after_ms: default_guided_ranking_stale_after_ms(),
        }
    }
}

fn default_bumper_delay_ms() -> u64 {
    20_000
}

fn default_guided_ranking_delay_ms() -> u64 {
    10_000
}

fn default_exit_intent_timer_ms() -> u64 {
    120_000
}

fn default_guided_ranking_stale_after_ms() -> u64 {
    30 * 60 * 1_000
}

fn default_exit_intent_min_presence_ms() -> u64 {
    30_000
}

fn default_exit_intent_max_per_session() -> u32 {
    1
}

fn default_product_bumper_initial_delay_ms() -> u64 {
    10_000
}

fn default_manual_guidance_delay_ms() -> u64 {
    3_000
}
