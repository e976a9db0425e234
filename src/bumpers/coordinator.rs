use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bumpers::state::{
    BumperKind, BumperState, CoordinationState, StateRepository, TriggerSource,
};
use crate::bumpers::storage::KeyValueStore;
use crate::bumpers::{BlockReason, BumperSettings, BumperSignal};
use crate::clock::{offset, SharedClock};

/// Decides when each nudge may appear.
///
/// Persisted records are re-read at every decision point so a dismissal in
/// another tab sharing the store is honored immediately. Session-scoped
/// gates (shown this session, exit-intent count, pending auto-show timers)
/// live in memory and die with the coordinator. The guided flag and the
/// cool-down timestamps are kept in both places, so a store that drops
/// writes still cannot let a bumper through mid-flow.
pub struct BumperCoordinator {
    repo: StateRepository,
    clock: SharedClock,
    settings: BumperSettings,
    session_started_at: DateTime<Utc>,
    shown_this_session: BTreeSet<BumperKind>,
    exit_intent_shows: u32,
    pending: BTreeMap<BumperKind, DateTime<Utc>>,
    visible: Option<BumperKind>,
    manual_adjustment_seen: bool,
    guided_active: bool,
    guided_completed_at: Option<DateTime<Utc>>,
    exit_intent_armed_at: Option<DateTime<Utc>>,
    last_shown_at: Option<DateTime<Utc>>,
    disposed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BumperStatus {
    pub kind: BumperKind,
    pub state: BumperState,
    pub shown_this_session: bool,
    pub pending_at: Option<DateTime<Utc>>,
    pub blocked_by: Option<BlockReason>,
}

impl BumperCoordinator {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: SharedClock,
        settings: BumperSettings,
    ) -> Self {
        let session_started_at = clock.now();
        let repo = StateRepository::new(store);
        Self {
            repo,
            clock,
            settings,
            session_started_at,
            shown_this_session: BTreeSet::new(),
            exit_intent_shows: 0,
            pending: BTreeMap::new(),
            visible: None,
            manual_adjustment_seen: false,
            guided_active: false,
            guided_completed_at: None,
            exit_intent_armed_at: None,
            last_shown_at: None,
            disposed: false,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn settings(&self) -> &BumperSettings {
        &self.settings
    }

    pub fn session_started_at(&self) -> DateTime<Utc> {
        self.session_started_at
    }

    pub fn visible(&self) -> Option<BumperKind> {
        self.visible
    }

    pub fn coordination_state(&self) -> CoordinationState {
        self.repo.coordination()
    }

    pub fn bumper_state(&self, kind: BumperKind) -> BumperState {
        self.repo.bumper(kind)
    }

    // ---- guided ranking ------------------------------------------------

    /// True while this session runs a guided flow, or another session
    /// started one less than `guided_ranking_stale_after` ago.
    pub fn is_guided_ranking_active(&self) -> bool {
        self.guided_active
            || self.shared_guided_active(&self.repo.coordination(), self.clock.now())
    }

    fn shared_guided_active(&self, coordination: &CoordinationState, now: DateTime<Utc>) -> bool {
        if !coordination.is_guided_ranking_active {
            return false;
        }
        // a flag with no start time predates expiry tracking
        let stale_after = self.settings.guided_ranking_stale_after();
        let fresh = coordination
            .guided_ranking_started_at
            .is_some_and(|started| now < offset(started, stale_after));
        if !fresh {
            debug!("ignoring stale guided ranking flag");
        }
        fresh
    }

    /// Suppresses every bumper and drops pending auto-show timers.
    pub fn mark_guided_ranking_active(&mut self) -> Option<BumperSignal> {
        let now = self.clock.now();
        self.guided_active = true;
        self.repo.update_coordination(|state| {
            state.is_guided_ranking_active = true;
            state.guided_ranking_started_at = Some(now);
        });
        self.pending.clear();
        self.visible
            .take()
            .map(|kind| BumperSignal::Hide { kind })
    }

    pub fn mark_guided_ranking_inactive(&mut self) {
        self.guided_active = false;
        self.repo.update_coordination(|state| {
            state.is_guided_ranking_active = false;
            state.guided_ranking_started_at = None;
        });
    }

    /// Ends the guided flow and arms the exit-intent timer to start after the
    /// post-guided delay.
    pub fn mark_guided_ranking_completed(&mut self) {
        let now = self.clock.now();
        let armed_at = offset(now, self.settings.guided_ranking_delay());
        self.guided_active = false;
        self.guided_completed_at = Some(now);
        self.exit_intent_armed_at = Some(armed_at);
        self.repo.update_coordination(|state| {
            state.is_guided_ranking_active = false;
            state.guided_ranking_started_at = None;
            state.guided_ranking_completed_at = Some(now);
            state.exit_intent_timer_started_at = Some(armed_at);
        });
        info!("guided ranking completed; exit intent timer armed for {armed_at}");
    }

    // ---- gates ---------------------------------------------------------

    pub fn can_show_product_bumper(&self) -> bool {
        self.check(BumperKind::Product).is_ok()
    }

    pub fn can_show_exit_intent_bumper(&self) -> bool {
        self.check(BumperKind::ExitIntent).is_ok()
    }

    pub fn can_show_manual_guidance(&self) -> bool {
        self.check(BumperKind::ManualGuidance).is_ok()
    }

    pub fn should_show(&self, kind: BumperKind) -> bool {
        self.check(kind).is_ok()
    }

    /// First gate that blocks `kind` right now, if any.
    pub fn check(&self, kind: BumperKind) -> Result<(), BlockReason> {
        if self.disposed {
            return Err(BlockReason::Disposed);
        }
        let now = self.clock.now();
        let bumper = self.repo.bumper(kind);
        let coordination = self.repo.coordination();

        if bumper.dismissed {
            return Err(BlockReason::Dismissed);
        }
        match kind {
            BumperKind::ExitIntent => {
                if self.exit_intent_shows >= self.settings.exit_intent_max_per_session {
                    return Err(BlockReason::SessionLimitReached);
                }
            }
            BumperKind::Product | BumperKind::ManualGuidance => {
                if self.shown_this_session.contains(&kind) {
                    return Err(BlockReason::AlreadyShownThisSession);
                }
            }
        }
        if self.guided_active || self.shared_guided_active(&coordination, now) {
            return Err(BlockReason::GuidedRankingActive);
        }
        if let Some(visible) = self.visible {
            return Err(BlockReason::AnotherBumperVisible { visible });
        }
        if let Some(last) = later(coordination.last_bumper_shown_at, self.last_shown_at) {
            let ready_at = offset(last, self.settings.bumper_delay());
            if now < ready_at {
                return Err(BlockReason::Cooldown {
                    remaining_ms: remaining_ms(now, ready_at),
                });
            }
        }

        match kind {
            BumperKind::Product => {
                if coordination.guided_ranking_completed_at.is_some()
                    || self.guided_completed_at.is_some()
                {
                    return Err(BlockReason::GuidedRankingCompleted);
                }
                self.require_presence(now, self.settings.product_bumper_initial_delay())?;
            }
            BumperKind::ExitIntent => {
                self.require_presence(now, self.settings.exit_intent_min_presence())?;
                let armed_at = later(
                    coordination.exit_intent_timer_started_at,
                    self.exit_intent_armed_at,
                );
                if let Some(started) = armed_at {
                    let ready_at = offset(started, self.settings.exit_intent_timer());
                    if now < ready_at {
                        return Err(BlockReason::PostGuidedQuietPeriod {
                            remaining_ms: remaining_ms(now, ready_at),
                        });
                    }
                }
            }
            BumperKind::ManualGuidance => {}
        }
        Ok(())
    }

    fn require_presence(&self, now: DateTime<Utc>, needed: Duration) -> Result<(), BlockReason> {
        let ready_at = offset(self.session_started_at, needed);
        if now < ready_at {
            return Err(BlockReason::InsufficientPresence {
                remaining_ms: remaining_ms(now, ready_at),
            });
        }
        Ok(())
    }

    // ---- showing and dismissing ---------------------------------------

    /// Records that `kind` is now on screen and starts the shared cool-down.
    pub fn record_bumper_shown(&mut self, kind: BumperKind) {
        let now = self.clock.now();
        self.repo.update_bumper(kind, |state| {
            state.show_count = state.show_count.saturating_add(1);
            state.last_shown_at = Some(now);
        });
        self.repo.update_coordination(|state| {
            state.last_bumper_shown_at = Some(now);
            state.last_bumper_type = Some(kind);
        });
        self.last_shown_at = Some(now);
        self.shown_this_session.insert(kind);
        if kind == BumperKind::ExitIntent {
            self.exit_intent_shows += 1;
        }
        self.pending.remove(&kind);
        self.visible = Some(kind);
        info!("showing {kind}");
    }

    /// Shows `kind` if every gate passes, recording `trigger` for analytics.
    pub fn try_show(&mut self, kind: BumperKind, trigger: TriggerSource) -> Option<BumperSignal> {
        if let Err(reason) = self.check(kind) {
            debug!("{kind} suppressed: {reason}");
            return None;
        }
        let now = self.clock.now();
        self.repo.update_bumper(kind, |state| {
            state.last_triggered_at = Some(now);
            state.last_trigger = Some(trigger);
            *state.trigger_counts.entry(trigger).or_insert(0) += 1;
        });
        self.record_bumper_shown(kind);
        Some(BumperSignal::Show { kind, trigger })
    }

    pub fn trigger_exit_intent(&mut self, trigger: TriggerSource) -> Option<BumperSignal> {
        self.try_show(BumperKind::ExitIntent, trigger)
    }

    /// Closing a bumper, by button or outside click, dismisses it for good.
    pub fn dismiss(&mut self, kind: BumperKind) -> Option<BumperSignal> {
        let now = self.clock.now();
        self.repo.update_bumper(kind, |state| {
            state.dismissed = true;
            state.dismissed_at = Some(now);
        });
        self.pending.remove(&kind);
        info!("{kind} dismissed");
        if self.visible == Some(kind) {
            self.visible = None;
            return Some(BumperSignal::Hide { kind });
        }
        None
    }

    pub fn dismiss_product_bumper(&mut self) -> Option<BumperSignal> {
        self.dismiss(BumperKind::Product)
    }

    pub fn dismiss_exit_intent_bumper(&mut self) -> Option<BumperSignal> {
        self.dismiss(BumperKind::ExitIntent)
    }

    pub fn dismiss_manual_guidance(&mut self) -> Option<BumperSignal> {
        self.dismiss(BumperKind::ManualGuidance)
    }

    // ---- auto-show timers ---------------------------------------------

    /// Arms (or re-arms) an auto-show timer for `kind` after `delay`.
    pub fn schedule(&mut self, kind: BumperKind, delay: Duration) -> Option<DateTime<Utc>> {
        if self.disposed {
            return None;
        }
        let due = offset(self.clock.now(), delay);
        self.pending.insert(kind, due);
        debug!("{kind} scheduled for {due}");
        Some(due)
    }

    /// Arms the product bumper relative to session start.
    pub fn arm_product_bumper(&mut self) -> Option<DateTime<Utc>> {
        if self.disposed {
            return None;
        }
        let due = offset(
            self.session_started_at,
            self.settings.product_bumper_initial_delay(),
        );
        self.pending.insert(BumperKind::Product, due);
        Some(due)
    }

    /// First manual criterion change arms the manual-guidance bumper.
    pub fn note_manual_adjustment(&mut self) -> Option<DateTime<Utc>> {
        if self.manual_adjustment_seen {
            return None;
        }
        self.manual_adjustment_seen = true;
        self.schedule(
            BumperKind::ManualGuidance,
            self.settings.manual_guidance_delay(),
        )
    }

    pub fn cancel_scheduled(&mut self, kind: BumperKind) -> bool {
        self.pending.remove(&kind).is_some()
    }

    pub fn pending_at(&self, kind: BumperKind) -> Option<DateTime<Utc>> {
        self.pending.get(&kind).copied()
    }

    /// Fires due auto-show timers. A timer whose gates fail is dropped.
    pub fn tick(&mut self) -> Vec<BumperSignal> {
        let mut signals = Vec::new();
        if self.disposed {
            return signals;
        }
        let now = self.clock.now();
        let mut due = self
            .pending
            .iter()
            .filter(|(_, at)| **at <= now)
            .map(|(kind, at)| (*kind, *at))
            .collect::<Vec<_>>();
        due.sort_by_key(|(_, at)| *at);

        for (kind, _) in due {
            self.pending.remove(&kind);
            let trigger = match kind {
                BumperKind::ManualGuidance => TriggerSource::ManualAdjustment,
                BumperKind::Product | BumperKind::ExitIntent => TriggerSource::Timer,
            };
            if let Some(signal) = self.try_show(kind, trigger) {
                signals.push(signal);
            }
        }
        signals
    }

    pub fn status(&self) -> Vec<BumperStatus> {
        BumperKind::ALL
            .iter()
            .map(|kind| BumperStatus {
                kind: *kind,
                state: self.repo.bumper(*kind),
                shown_this_session: self.shown_this_session.contains(kind),
                pending_at: self.pending_at(*kind),
                blocked_by: self.check(*kind).err(),
            })
            .collect()
    }

    /// Debug-only: forget persisted and session state.
    pub fn reset(&mut self) {
        self.repo.reset();
        self.shown_this_session.clear();
        self.exit_intent_shows = 0;
        self.pending.clear();
        self.visible = None;
        self.manual_adjustment_seen = false;
        self.guided_active = false;
        self.guided_completed_at = None;
        self.exit_intent_armed_at = None;
        self.last_shown_at = None;
    }

    pub fn dispose(&mut self) {
        self.pending.clear();
        self.visible = None;
        self.disposed = true;
    }
}

fn later(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    a.max(b)
}

fn remaining_ms(now: DateTime<Utc>, ready_at: DateTime<Utc>) -> u64 {
    u64::try_from((ready_at - now).num_milliseconds()).unwrap_or(0)
}
