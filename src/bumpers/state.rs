use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::bumpers::storage::KeyValueStore;

const KEY_PREFIX: &str = "ppm-tool-finder";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum BumperKind {
    ManualGuidance,
    Product,
    ExitIntent,
}

impl BumperKind {
    pub const ALL: [BumperKind; 3] = [
        BumperKind::ManualGuidance,
        BumperKind::Product,
        BumperKind::ExitIntent,
    ];

    pub fn as_slug(&self) -> &'static str {
        match self {
            Self::ManualGuidance => "manual-guidance",
            Self::Product => "product",
            Self::ExitIntent => "exit-intent",
        }
    }

    /// Storage key owned by this bumper alone.
    pub fn storage_key(&self) -> String {
        format!("{KEY_PREFIX}.bumper.{}", self.as_slug())
    }
}

impl Display for BumperKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::ManualGuidance => "Manual guidance",
            Self::Product => "Product bumper",
            Self::ExitIntent => "Exit intent",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error)]
#[error("unknown bumper: {0}")]
pub struct BumperParseError(pub String);

impl FromStr for BumperKind {
    type Err = BumperParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "manual-guidance" | "manual" | "guidance" => Ok(Self::ManualGuidance),
            "product" | "product-bumper" => Ok(Self::Product),
            "exit-intent" | "exit" => Ok(Self::ExitIntent),
            _ => Err(BumperParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    MouseLeave,
    TabSwitch,
    Timer,
    ManualAdjustment,
}

/// Persisted record for one bumper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BumperState {
    #[serde(default)]
    pub dismissed: bool,
    #[serde(default)]
    pub dismissed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub show_count: u32,
    #[serde(default)]
    pub last_shown_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_triggered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_trigger: Option<TriggerSource>,
    #[serde(default)]
    pub trigger_counts: BTreeMap<TriggerSource, u32>,
}

/// Cross-bumper timing record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CoordinationState {
    #[serde(default)]
    pub is_guided_ranking_active: bool,
    #[serde(default)]
    pub guided_ranking_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub guided_ranking_completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_bumper_shown_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_bumper_type: Option<BumperKind>,
    #[serde(default)]
    pub exit_intent_timer_started_at: Option<DateTime<Utc>>,
}

pub fn coordination_key() -> String {
    format!("{KEY_PREFIX}.bumper.coordination")
}

/// Typed access to the key/value store. Reads and writes never fail outward:
/// a storage error is logged and reads fall back to the default record.
#[derive(Clone)]
pub struct StateRepository {
    store: Arc<dyn KeyValueStore>,
}

impl StateRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(err) => {
                warn!("failed reading {key}, assuming no saved state: {err}");
                return T::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("discarding unreadable state under {key}: {err}");
            T::default()
        })
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("failed encoding state for {key}: {err}");
                return false;
            }
        };
        match self.store.set(key, &raw) {
            Ok(()) => true,
            Err(err) => {
                warn!("failed writing {key}: {err}");
                false
            }
        }
    }

    pub fn bumper(&self, kind: BumperKind) -> BumperState {
        self.load(&kind.storage_key())
    }

    pub fn save_bumper(&self, kind: BumperKind, state: &BumperState) -> bool {
        self.save(&kind.storage_key(), state)
    }

    pub fn update_bumper(
        &self,
        kind: BumperKind,
        update: impl FnOnce(&mut BumperState),
    ) -> BumperState {
        let mut state = self.bumper(kind);
        update(&mut state);
        self.save_bumper(kind, &state);
        state
    }

    pub fn coordination(&self) -> CoordinationState {
        self.load(&coordination_key())
    }

    pub fn update_coordination(
        &self,
        update: impl FnOnce(&mut CoordinationState),
    ) -> CoordinationState {
        let mut state = self.coordination();
        update(&mut state);
        self.save(&coordination_key(), &state);
        state
    }

    /// Debug-only wipe of every bumper record.
    pub fn reset(&self) {
        let keys = BumperKind::ALL
            .iter()
            .map(BumperKind::storage_key)
            .chain(std::iter::once(coordination_key()));
        for key in keys {
            if let Err(err) = self.store.remove(&key) {
                warn!("failed removing {key}: {err}");
            }
        }
    }
}
