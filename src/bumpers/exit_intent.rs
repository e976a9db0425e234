use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::bumpers::{BumperCoordinator, BumperSignal, TriggerSource};
use crate::clock::{offset, SharedClock};

const SIDE_ZONE_PX: f64 = 20.0;
const FAST_EXIT_PX_PER_MS: f64 = 0.5;
const SLOW_EXIT_DELAY_MS: i64 = 150;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    Chrome,
    Edge,
    Firefox,
    Safari,
    #[default]
    Other,
}

impl BrowserKind {
    /// Height of the band under the browser chrome that counts as "leaving".
    pub fn top_zone_px(&self) -> f64 {
        match self {
            Self::Chrome | Self::Edge | Self::Other => 50.0,
            Self::Firefox => 60.0,
            Self::Safari => 40.0,
        }
    }

    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if ua.contains("edg/") {
            Self::Edge
        } else if ua.contains("firefox/") {
            Self::Firefox
        } else if ua.contains("chrome/") || ua.contains("chromium/") {
            Self::Chrome
        } else if ua.contains("safari/") {
            Self::Safari
        } else {
            Self::Other
        }
    }
}

impl Display for BrowserKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let display = match self {
            Self::Chrome => "chrome",
            Self::Edge => "edge",
            Self::Firefox => "firefox",
            Self::Safari => "safari",
            Self::Other => "other",
        };
        write!(f, "{display}")
    }
}

#[derive(Debug, Error)]
#[error("unknown browser: {0}")]
pub struct BrowserParseError(pub String);

impl FromStr for BrowserKind {
    type Err = BrowserParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" | "chromium" => Ok(Self::Chrome),
            "edge" => Ok(Self::Edge),
            "firefox" => Ok(Self::Firefox),
            "safari" => Ok(Self::Safari),
            "other" => Ok(Self::Other),
            _ => Err(BrowserParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Touch and mobile form factors never produce exit intent.
    #[serde(default)]
    pub touch: bool,
}

/// Pointer position in viewport pixels with velocity in px/ms.
/// Negative `vy` is upward movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub vx: f64,
    #[serde(default)]
    pub vy: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExitZone {
    Top,
    TopLeftCorner,
    TopRightCorner,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExitIntentSignal {
    pub zone: ExitZone,
    pub delay_ms: i64,
}

/// Decides whether a pointer sample looks like the user heading for the
/// browser chrome. Returns the zone and how long the pointer must stay there.
pub fn detect_exit_intent(
    sample: PointerSample,
    viewport: Viewport,
    browser: BrowserKind,
) -> Option<ExitIntentSignal> {
    if viewport.touch || viewport.width <= 0.0 || viewport.height <= 0.0 {
        return None;
    }

    let in_top = sample.y <= browser.top_zone_px();
    let in_left = sample.x <= SIDE_ZONE_PX;
    let in_right = sample.x >= viewport.width - SIDE_ZONE_PX;

    let zone = match (in_top, in_left, in_right) {
        (true, true, _) => ExitZone::TopLeftCorner,
        (true, _, true) => ExitZone::TopRightCorner,
        (true, false, false) => ExitZone::Top,
        (false, true, _) => ExitZone::Left,
        (false, _, true) => ExitZone::Right,
        (false, false, false) => return None,
    };

    let toward_edge = match zone {
        ExitZone::Top | ExitZone::TopLeftCorner | ExitZone::TopRightCorner => -sample.vy,
        ExitZone::Left => -sample.vx,
        ExitZone::Right => sample.vx,
    };
    // heading back into the page
    if toward_edge < 0.0 {
        return None;
    }
    let delay_ms = if toward_edge >= FAST_EXIT_PX_PER_MS {
        0
    } else {
        SLOW_EXIT_DELAY_MS
    };
    Some(ExitIntentSignal { zone, delay_ms })
}

/// Feeds pointer and visibility events into the bumper coordinator.
pub struct ExitIntentMonitor {
    clock: SharedClock,
    viewport: Viewport,
    browser: BrowserKind,
    pending: Option<(ExitZone, DateTime<Utc>)>,
    disposed: bool,
}

impl ExitIntentMonitor {
    pub fn new(clock: SharedClock, viewport: Viewport, browser: BrowserKind) -> Self {
        Self {
            clock,
            viewport,
            browser,
            pending: None,
            disposed: false,
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn pending_zone(&self) -> Option<ExitZone> {
        self.pending.map(|(zone, _)| zone)
    }

    pub fn on_pointer(
        &mut self,
        sample: PointerSample,
        coordinator: &mut BumperCoordinator,
    ) -> Option<BumperSignal> {
        if self.disposed {
            return None;
        }
        let Some(signal) = detect_exit_intent(sample, self.viewport, self.browser) else {
            // pointer left the zone before the delay ran out
            self.pending = None;
            return None;
        };
        if signal.delay_ms == 0 {
            self.pending = None;
            debug!("fast exit toward {:?}", signal.zone);
            return coordinator.trigger_exit_intent(TriggerSource::MouseLeave);
        }
        if self.pending.is_none() {
            let due = offset(self.clock.now(), Duration::milliseconds(signal.delay_ms));
            self.pending = Some((signal.zone, due));
        }
        None
    }

    pub fn on_visibility_change(
        &mut self,
        hidden: bool,
        coordinator: &mut BumperCoordinator,
    ) -> Option<BumperSignal> {
        if self.disposed || !hidden || self.viewport.touch {
            return None;
        }
        self.pending = None;
        coordinator.trigger_exit_intent(TriggerSource::TabSwitch)
    }

    pub fn tick(&mut self, coordinator: &mut BumperCoordinator) -> Option<BumperSignal> {
        let (_, due) = self.pending?;
        if self.disposed || self.clock.now() < due {
            return None;
        }
        self.pending = None;
        coordinator.trigger_exit_intent(TriggerSource::MouseLeave)
    }

    pub fn dispose(&mut self) {
        self.pending = None;
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::bumpers::storage::MemoryStore;
    use crate::bumpers::{BumperKind, BumperSettings};
    use crate::clock::ManualClock;

    fn desktop() -> Viewport {
        Viewport {
            width: 1280.0,
            height: 800.0,
            touch: false,
        }
    }

    fn at(x: f64, y: f64, vx: f64, vy: f64) -> PointerSample {
        PointerSample { x, y, vx, vy }
    }

    fn setup() -> (ManualClock, BumperCoordinator, ExitIntentMonitor) {
        let clock = ManualClock::default();
        let coordinator = BumperCoordinator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(clock.clone()),
            BumperSettings::default(),
        );
        let monitor = ExitIntentMonitor::new(Arc::new(clock.clone()), desktop(), BrowserKind::Chrome);
        (clock, coordinator, monitor)
    }

    #[test]
    fn classifies_zones() {
        let detect = |x, y| detect_exit_intent(at(x, y, 0.0, 0.0), desktop(), BrowserKind::Chrome);
        assert_eq!(detect(600.0, 10.0).map(|s| s.zone), Some(ExitZone::Top));
        assert_eq!(detect(5.0, 10.0).map(|s| s.zone), Some(ExitZone::TopLeftCorner));
        assert_eq!(detect(1275.0, 10.0).map(|s| s.zone), Some(ExitZone::TopRightCorner));
        assert_eq!(detect(5.0, 400.0).map(|s| s.zone), Some(ExitZone::Left));
        assert_eq!(detect(1270.0, 400.0).map(|s| s.zone), Some(ExitZone::Right));
        assert_eq!(detect(600.0, 400.0), None);
    }

    #[test]
    fn top_zone_depends_on_browser() {
        let sample = at(600.0, 55.0, 0.0, 0.0);
        assert!(detect_exit_intent(sample, desktop(), BrowserKind::Firefox).is_some());
        assert!(detect_exit_intent(sample, desktop(), BrowserKind::Chrome).is_none());
        let sample = at(600.0, 45.0, 0.0, 0.0);
        assert!(detect_exit_intent(sample, desktop(), BrowserKind::Safari).is_none());
    }

    #[test]
    fn fast_upward_movement_fires_immediately() {
        let fast = detect_exit_intent(at(600.0, 20.0, 0.0, -0.8), desktop(), BrowserKind::Chrome);
        assert_eq!(fast.map(|s| s.delay_ms), Some(0));
        let slow = detect_exit_intent(at(600.0, 20.0, 0.0, -0.1), desktop(), BrowserKind::Chrome);
        assert_eq!(slow.map(|s| s.delay_ms), Some(150));
    }

    #[test]
    fn movement_away_from_the_edge_is_ignored() {
        let detect = |sample| detect_exit_intent(sample, desktop(), BrowserKind::Chrome);
        assert_eq!(detect(at(600.0, 20.0, 0.0, 0.3)), None);
        assert_eq!(detect(at(5.0, 400.0, 0.4, 0.0)), None);
        assert_eq!(detect(at(1270.0, 400.0, -0.4, 0.0)), None);
        assert!(detect(at(1270.0, 400.0, 0.1, 0.0)).is_some());
    }

    #[test]
    fn pointer_turning_back_cancels_the_dwell() {
        let (clock, mut coordinator, mut monitor) = setup();
        clock.advance_ms(40_000);
        monitor.on_pointer(at(600.0, 5.0, 0.0, -0.1), &mut coordinator);
        assert_eq!(monitor.pending_zone(), Some(ExitZone::Top));
        monitor.on_pointer(at(600.0, 8.0, 0.0, 0.2), &mut coordinator);
        assert_eq!(monitor.pending_zone(), None);
        clock.advance_ms(500);
        assert!(monitor.tick(&mut coordinator).is_none());
    }

    #[test]
    fn touch_devices_never_trigger() {
        let touch = Viewport {
            touch: true,
            ..desktop()
        };
        assert_eq!(
            detect_exit_intent(at(600.0, 0.0, 0.0, -2.0), touch, BrowserKind::Safari),
            None
        );
    }

    #[test]
    fn detects_browser_from_user_agent() {
        let edge = "Mozilla/5.0 (Windows NT 10.0) AppleWebKit/537.36 Chrome/120.0 Safari/537.36 Edg/120.0";
        let safari = "Mozilla/5.0 (Macintosh) AppleWebKit/605.1.15 Version/17.0 Safari/605.1.15";
        assert_eq!(BrowserKind::from_user_agent(edge), BrowserKind::Edge);
        assert_eq!(BrowserKind::from_user_agent(safari), BrowserKind::Safari);
        assert_eq!("Firefox".parse::<BrowserKind>().ok(), Some(BrowserKind::Firefox));
    }

    #[test]
    fn ignores_triggers_before_minimum_presence() {
        let (clock, mut coordinator, mut monitor) = setup();
        clock.advance_ms(10_000);
        assert!(monitor
            .on_pointer(at(600.0, 5.0, 0.0, -1.0), &mut coordinator)
            .is_none());
        assert!(monitor.on_visibility_change(true, &mut coordinator).is_none());
    }

    #[test]
    fn slow_exit_fires_after_dwell_unless_pointer_leaves() {
        let (clock, mut coordinator, mut monitor) = setup();
        clock.advance_ms(40_000);

        monitor.on_pointer(at(600.0, 5.0, 0.0, -0.1), &mut coordinator);
        assert_eq!(monitor.pending_zone(), Some(ExitZone::Top));
        monitor.on_pointer(at(600.0, 300.0, 0.0, 0.2), &mut coordinator);
        assert_eq!(monitor.pending_zone(), None);
        clock.advance_ms(500);
        assert!(monitor.tick(&mut coordinator).is_none());

        monitor.on_pointer(at(600.0, 5.0, 0.0, -0.1), &mut coordinator);
        clock.advance_ms(149);
        assert!(monitor.tick(&mut coordinator).is_none());
        clock.advance_ms(1);
        assert_eq!(
            monitor.tick(&mut coordinator),
            Some(BumperSignal::Show {
                kind: BumperKind::ExitIntent,
                trigger: TriggerSource::MouseLeave
            })
        );
    }

    #[test]
    fn tab_switch_is_recorded_separately() {
        let (clock, mut coordinator, mut monitor) = setup();
        clock.advance_ms(31_000);
        assert!(monitor.on_visibility_change(false, &mut coordinator).is_none());
        assert!(monitor.on_visibility_change(true, &mut coordinator).is_some());
        let state = coordinator.bumper_state(BumperKind::ExitIntent);
        assert_eq!(state.last_trigger, Some(TriggerSource::TabSwitch));
        assert_eq!(state.trigger_counts.get(&TriggerSource::TabSwitch), Some(&1));
        assert_eq!(state.trigger_counts.get(&TriggerSource::MouseLeave), None);
    }

    #[test]
    fn disposed_monitor_is_inert() {
        let (clock, mut coordinator, mut monitor) = setup();
        clock.advance_ms(40_000);
        monitor.on_pointer(at(600.0, 5.0, 0.0, 0.0), &mut coordinator);
        monitor.dispose();
        clock.advance_ms(1_000);
        assert!(monitor.tick(&mut coordinator).is_none());
        assert!(monitor.on_visibility_change(true, &mut coordinator).is_none());
    }
}
