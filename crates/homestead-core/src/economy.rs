//! Mission progression: money, days, satisfaction, star rating and the
//! win/lose flags.
//!
//! [`Economy`] is the single source of truth for these values. The star is
//! recomputed on every money or satisfaction change, and every money, day or
//! satisfaction change is saved to the [`ProgressStore`] under
//! [`PROGRESS_KEY`]. A failed save is logged; it never undoes the change.

use crate::error::ActionError;
use crate::fixed::{Fixed64, HUNDRED, percent_of};
use crate::id::MissionId;
use crate::mission::{MissionTarget, StarMetric, StarRule};
use crate::persist::{MemoryStore, ProgressStore, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Key the progress record is saved under.
pub const PROGRESS_KEY: &str = "gameProgress";

/// Satisfaction is a percentage.
pub const MAX_SATISFACTION: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyState {
    pub mission_id: MissionId,
    pub money: u64,
    pub day: u32,
    /// 1..=3.
    pub star: u8,
    /// 0..=100.
    pub satisfaction: u32,
    pub is_game_over: bool,
    pub is_mission_complete: bool,
}

impl Default for EconomyState {
    fn default() -> Self {
        Self {
            mission_id: MissionId::default(),
            money: 0,
            day: 0,
            star: 1,
            satisfaction: 0,
            is_game_over: false,
            is_mission_complete: false,
        }
    }
}

fn default_star() -> u8 {
    1
}

/// The saved shape of [`EconomyState`]. Missing keys load as zero/false,
/// except `star`, which loads as 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default)]
    pub mission_id: u32,
    #[serde(default)]
    pub money: u64,
    #[serde(default)]
    pub day: u32,
    #[serde(default = "default_star")]
    pub star: u8,
    #[serde(default)]
    pub customer_rate: u32,
    #[serde(default)]
    pub is_game_over: bool,
    #[serde(default)]
    pub is_mission_complete: bool,
}

impl From<&EconomyState> for ProgressRecord {
    fn from(state: &EconomyState) -> Self {
        Self {
            mission_id: state.mission_id.0,
            money: state.money,
            day: state.day,
            star: state.star,
            customer_rate: state.satisfaction,
            is_game_over: state.is_game_over,
            is_mission_complete: state.is_mission_complete,
        }
    }
}

impl From<ProgressRecord> for EconomyState {
    fn from(record: ProgressRecord) -> Self {
        Self {
            mission_id: MissionId(record.mission_id),
            money: record.money,
            day: record.day,
            star: record.star.clamp(1, 3),
            satisfaction: record.customer_rate.min(MAX_SATISFACTION),
            is_game_over: record.is_game_over,
            is_mission_complete: record.is_mission_complete,
        }
    }
}

pub struct Economy {
    state: EconomyState,
    target: Option<MissionTarget>,
    star_rule: Option<StarRule>,
    store: Box<dyn ProgressStore>,
}

impl fmt::Debug for Economy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Economy")
            .field("state", &self.state)
            .field("target", &self.target)
            .field("star_rule", &self.star_rule)
            .finish_non_exhaustive()
    }
}

impl Default for Economy {
    fn default() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }
}

impl Economy {
    pub fn new(store: Box<dyn ProgressStore>) -> Self {
        Self {
            state: EconomyState::default(),
            target: None,
            star_rule: None,
            store,
        }
    }

    pub fn set_store(&mut self, store: Box<dyn ProgressStore>) {
        self.store = store;
    }

    pub fn init_mission(
        &mut self,
        mission_id: MissionId,
        target: MissionTarget,
        star_rule: StarRule,
    ) {
        info!(
            mission = mission_id.0,
            start_money = target.start_money,
            max_days = target.max_days,
            "mission initialised"
        );
        self.state = EconomyState {
            mission_id,
            money: target.start_money,
            ..EconomyState::default()
        };
        self.target = Some(target);
        self.star_rule = Some(star_rule);
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> &EconomyState {
        &self.state
    }

    pub fn money(&self) -> u64 {
        self.state.money
    }

    pub fn day(&self) -> u32 {
        self.state.day
    }

    pub fn star(&self) -> u8 {
        self.state.star
    }

    pub fn satisfaction(&self) -> u32 {
        self.state.satisfaction
    }

    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over
    }

    pub fn is_mission_complete(&self) -> bool {
        self.state.is_mission_complete
    }

    pub fn target(&self) -> Option<&MissionTarget> {
        self.target.as_ref()
    }

    pub fn star_rule(&self) -> Option<&StarRule> {
        self.star_rule.as_ref()
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Credit `amount`. Zero is a no-op.
    pub fn add_money(&mut self, amount: u64) {
        if amount == 0 {
            return;
        }
        self.state.money = self.state.money.saturating_add(amount);
        debug!(amount, money = self.state.money, "money added");
        self.recompute_star();
        self.save_progress();
    }

    /// Debit `amount`, or reject without touching the balance.
    pub fn spend_money(&mut self, amount: u64) -> Result<(), ActionError> {
        if amount == 0 {
            return Ok(());
        }
        if self.state.money < amount {
            warn!(needed = amount, available = self.state.money, "insufficient funds");
            return Err(ActionError::InsufficientFunds {
                needed: amount,
                available: self.state.money,
            });
        }
        self.state.money -= amount;
        debug!(amount, money = self.state.money, "money spent");
        self.recompute_star();
        self.save_progress();
        Ok(())
    }

    /// Advance the day counter. Reaching the mission's day limit ends the
    /// game.
    pub fn add_day(&mut self, days: u32) {
        if days == 0 {
            return;
        }
        self.state.day = self.state.day.saturating_add(days);
        if let Some(target) = &self.target {
            if self.state.day >= target.max_days && !self.state.is_game_over {
                self.state.is_game_over = true;
                info!(day = self.state.day, "game over: out of time");
            }
        }
        debug!(days, day = self.state.day, "day advanced");
        self.save_progress();
    }

    /// Set satisfaction, clamped to 0..=100.
    pub fn set_satisfaction(&mut self, rate: i64) {
        self.state.satisfaction = rate.clamp(0, i64::from(MAX_SATISFACTION)) as u32;
        debug!(satisfaction = self.state.satisfaction, "satisfaction set");
        self.recompute_star();
        self.save_progress();
    }

    fn metric(&self) -> StarMetric {
        self.target
            .as_ref()
            .map_or(StarMetric::Money, |target| target.star_metric)
    }

    fn metric_value(&self) -> u64 {
        match self.metric() {
            StarMetric::Money => self.state.money,
            StarMetric::Satisfaction => u64::from(self.state.satisfaction),
        }
    }

    /// Re-rate the star from the active metric. The rating may go down.
    pub fn recompute_star(&mut self) {
        let Some(rule) = &self.star_rule else {
            return;
        };
        let star = rule.star_for(self.metric_value());
        if star != self.state.star {
            debug!(from = self.state.star, to = star, "star changed");
            self.state.star = star;
        }
    }

    /// Money and satisfaction targets met before the day limit. Updates the
    /// completion flag but fires nothing.
    pub fn check_mission_complete(&mut self) -> bool {
        let Some(target) = &self.target else {
            return false;
        };
        let complete = self.state.money >= target.target_money
            && self.state.satisfaction >= target.target_satisfaction
            && self.state.day < target.max_days;
        if complete && !self.state.is_mission_complete {
            info!(mission = self.state.mission_id.0, "mission complete");
        }
        self.state.is_mission_complete = complete;
        complete
    }

    /// Progress towards the active target in percent, capped at 100. A zero
    /// target counts as met; no mission counts as no progress.
    pub fn progress_percent(&self) -> Fixed64 {
        let Some(target) = &self.target else {
            return Fixed64::ZERO;
        };
        let goal = match target.star_metric {
            StarMetric::Money => target.target_money,
            StarMetric::Satisfaction => u64::from(target.target_satisfaction),
        };
        if goal == 0 {
            return HUNDRED;
        }
        percent_of(self.metric_value(), goal)
    }

    /// Reward for the current star.
    pub fn reward(&self) -> u64 {
        self.star_rule
            .as_ref()
            .map_or(0, |rule| rule.reward_for(self.state.star))
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn write_progress(&mut self) -> Result<(), StoreError> {
        let value = serde_json::to_value(ProgressRecord::from(&self.state))?;
        self.store.set(PROGRESS_KEY, value)
    }

    pub fn save_progress(&mut self) {
        if let Err(err) = self.write_progress() {
            warn!(error = %err, "failed to save progress");
        }
    }

    /// Replace the state with the saved record. Returns `false` when nothing
    /// usable is saved.
    pub fn load_progress(&mut self) -> bool {
        let Some(value) = self.store.get(PROGRESS_KEY) else {
            debug!("no saved progress");
            return false;
        };
        match serde_json::from_value::<ProgressRecord>(value) {
            Ok(record) => {
                self.state = record.into();
                info!(
                    mission = self.state.mission_id.0,
                    money = self.state.money,
                    "progress loaded"
                );
                true
            }
            Err(err) => {
                warn!(error = %err, "saved progress is unreadable");
                false
            }
        }
    }

    /// Forget the mission and delete the saved record.
    pub fn reset_game(&mut self) {
        self.state = EconomyState::default();
        self.target = None;
        self.star_rule = None;
        if let Err(err) = self.store.remove(PROGRESS_KEY) {
            warn!(error = %err, "failed to remove saved progress");
        }
        info!("game reset");
    }

    /// Overwrite the state wholesale, e.g. from a snapshot. Nothing is saved.
    pub fn restore_state(&mut self, state: EconomyState) {
        self.state = state;
    }
}
