//! The per-mission context that owns the farm, factory and economy.
//!
//! [`Simulation`] is the only component that reads the [`Clock`]. Every
//! player action goes through it and is recorded in the [`EventLog`]. Each
//! [`Simulation::step`] runs five phases in order:
//!
//! 1. growth: crops and animals advance toward maturity
//! 2. production: in-flight products finish and are sold
//! 3. failure: running machines may break down
//! 4. calendar: wall-clock time rolls over into in-game days
//! 5. completion: the mission is checked for a win or a lost deadline

use crate::catalog::Catalog;
use crate::clock::Clock;
use crate::economy::Economy;
use crate::error::ActionError;
use crate::event::{DEFAULT_EVENT_CAPACITY, EventListener, EventLog, SimEvent};
use crate::factory::{
    Completion, Factory, default_repair_cost, default_unlock_cost, default_upgrade_cost,
};
use crate::farm::{Farm, HarvestOutcome, default_field_upgrade_cost};
use crate::fixed::{Fixed64, Millis, Timestamp};
use crate::goal::{Goal, GoalProgress};
use crate::id::{CropId, FieldRef, MissionId, ProductId, SlotRef};
use crate::machine::MachineState;
use crate::mission::MissionSetup;
use crate::persist::ProgressStore;
use crate::product::Product;
use crate::query::{EconomySnapshot, FieldSnapshot, MachineSnapshot};
use crate::rng::{RandomSource, SimRng};
use crate::serialize::{DeserializeError, SerializeError, SimulationSnapshot, SnapshotHeader};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Driver configuration
// ---------------------------------------------------------------------------

/// Tuning for the periodic driver.
#[derive(Debug, Clone, PartialEq)]
pub struct TickConfig {
    /// Minimum wall-clock time between steps.
    pub interval_ms: Millis,
    /// Wall-clock length of one in-game day. `None` leaves the day counter
    /// to the host.
    pub day_length_ms: Option<Millis>,
    /// Per-step breakdown chance for each producing machine. Zero disables
    /// random failures.
    pub failure_chance: Fixed64,
    pub event_capacity: usize,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            day_length_ms: None,
            failure_chance: Fixed64::ZERO,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// What one step changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepReport {
    pub at: Timestamp,
    pub matured: Vec<SlotRef>,
    pub completed: Vec<Completion>,
    pub broken: Vec<usize>,
    pub days_advanced: u32,
    pub mission_complete: bool,
    pub game_over: bool,
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

/// The per-mission context. Owns the farm, factory and economy together with
/// the injected clock and random source; every action and query goes
/// through it.
pub struct Simulation {
    mission_id: MissionId,
    farm: Farm,
    factory: Factory,
    economy: Economy,
    catalog: Catalog,
    goals: Vec<Goal>,
    config: TickConfig,
    clock: Box<dyn Clock>,
    rng: Box<dyn RandomSource>,
    events: EventLog,
    last_step: Option<Timestamp>,
    day_elapsed: Millis,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("mission_id", &self.mission_id)
            .field("farm", &self.farm)
            .field("factory", &self.factory)
            .field("economy", &self.economy)
            .field("config", &self.config)
            .field("last_step", &self.last_step)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Build a simulation for one mission. Progress is kept in memory until
    /// a store is supplied with [`Simulation::with_store`].
    pub fn new(setup: &MissionSetup, catalog: Catalog, clock: Box<dyn Clock>) -> Self {
        let mut economy = Economy::default();
        economy.init_mission(setup.id, setup.target.clone(), setup.star_rule.clone());
        let factory = setup
            .factory
            .as_ref()
            .map(Factory::from_setup)
            .unwrap_or_default();
        let config = TickConfig::default();
        info!(
            mission = setup.id.0,
            fields = setup.farm.fields.len(),
            machines = factory.machines().len(),
            "simulation created"
        );
        Self {
            mission_id: setup.id,
            farm: Farm::from_setup(&setup.farm),
            factory,
            economy,
            catalog,
            goals: setup.goals(),
            events: EventLog::new(config.event_capacity),
            config,
            clock,
            rng: Box::new(SimRng::new(u64::from(setup.id.0))),
            last_step: None,
            day_elapsed: 0,
        }
    }

    pub fn with_store(mut self, store: Box<dyn ProgressStore>) -> Self {
        self.economy.set_store(store);
        self
    }

    pub fn with_rng(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_config(mut self, config: TickConfig) -> Self {
        if config.event_capacity != self.config.event_capacity {
            self.events = EventLog::new(config.event_capacity);
        }
        self.config = config;
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn mission_id(&self) -> MissionId {
        self.mission_id
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn farm(&self) -> &Farm {
        &self.farm
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn economy(&self) -> &Economy {
        &self.economy
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &TickConfig {
        &self.config
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    pub fn subscribe(&mut self, listener: EventListener) {
        self.events.subscribe(listener);
    }

    pub fn last_step(&self) -> Option<Timestamp> {
        self.last_step
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Run a step if at least one interval has passed since the last one.
    pub fn step(&mut self) -> Option<StepReport> {
        let now = self.clock.now();
        if let Some(last) = self.last_step {
            if now.elapsed_since(last) < self.config.interval_ms {
                return None;
            }
        }
        Some(self.run_step(now))
    }

    /// Run a step now, regardless of the interval.
    pub fn force_step(&mut self) -> StepReport {
        let now = self.clock.now();
        self.run_step(now)
    }

    fn run_step(&mut self, now: Timestamp) -> StepReport {
        let mut report = StepReport {
            at: now,
            ..StepReport::default()
        };

        // Phase 1: growth.
        report.matured = self.farm.tick_all(now, &self.catalog);
        for &slot in &report.matured {
            let crop = self.farm.crop(slot).map_or(CropId::EMPTY, |c| c.crop_id);
            self.events.push(SimEvent::CropMatured { slot, crop, at: now });
        }

        // Phase 2: production.
        let money_before = self.economy.money();
        report.completed = self.factory.tick_all(now, &self.catalog, &mut self.economy);
        for completion in &report.completed {
            self.events.push(SimEvent::ProductCompleted {
                machine: completion.machine,
                product: completion.product.product_id,
                earned: completion.earned,
                at: now,
            });
            if let Some(next) = completion.next_started {
                self.events.push(SimEvent::ProductStarted {
                    machine: completion.machine,
                    product: next,
                    at: now,
                });
            }
        }
        self.note_money(money_before, now);

        // Phase 3: random failures.
        if self.config.failure_chance > Fixed64::ZERO {
            for position in 0..self.factory.machines().len() {
                let broke = self
                    .factory
                    .check_random_failure(position, self.config.failure_chance, self.rng.as_mut())
                    .unwrap_or(false);
                if broke {
                    report.broken.push(position);
                    self.events.push(SimEvent::MachineBroken { machine: position, at: now });
                }
            }
        }

        // Phase 4: calendar.
        if let Some(day_length) = self.config.day_length_ms.filter(|&len| len > 0) {
            let elapsed = self.last_step.map_or(0, |last| now.elapsed_since(last));
            self.day_elapsed += elapsed;
            let days = (self.day_elapsed / day_length) as u32;
            self.day_elapsed %= day_length;
            if days > 0 {
                self.advance_days(days, now);
                report.days_advanced = days;
            }
        }

        // Phase 5: completion.
        report.mission_complete = self.check_mission_complete();
        report.game_over = self.economy.is_game_over();

        self.last_step = Some(now);
        debug!(
            at = now.millis(),
            matured = report.matured.len(),
            completed = report.completed.len(),
            broken = report.broken.len(),
            "step"
        );
        report
    }

    fn note_money(&mut self, before: u64, now: Timestamp) {
        let after = self.economy.money();
        if after != before {
            self.events.push(SimEvent::MoneyChanged {
                from: before,
                to: after,
                at: now,
            });
        }
    }

    fn advance_days(&mut self, days: u32, now: Timestamp) {
        let was_over = self.economy.is_game_over();
        self.economy.add_day(days);
        let day = self.economy.day();
        self.events.push(SimEvent::DayAdvanced { day, at: now });
        if !was_over && self.economy.is_game_over() {
            self.events.push(SimEvent::GameOver { day, at: now });
        }
    }

    // -----------------------------------------------------------------------
    // Farm actions
    // -----------------------------------------------------------------------

    pub fn plant(&mut self, slot: SlotRef, crop: CropId) -> Result<(), ActionError> {
        let now = self.clock.now();
        self.farm
            .plant(slot, crop, now)
            .inspect_err(|err| warn!(?slot, crop = crop.0, error = %err, "plant rejected"))?;
        self.events.push(SimEvent::CropPlanted { slot, crop, at: now });
        Ok(())
    }

    /// Plant into the first empty slot of a field. Returns the slot used.
    pub fn plant_auto(&mut self, field: FieldRef, crop: CropId) -> Result<usize, ActionError> {
        let now = self.clock.now();
        let slot = self
            .farm
            .plant_auto(field, crop, now)
            .inspect_err(|err| warn!(?field, crop = crop.0, error = %err, "plant rejected"))?;
        self.events.push(SimEvent::CropPlanted {
            slot: SlotRef { field, slot },
            crop,
            at: now,
        });
        Ok(slot)
    }

    /// Plant up to `count` crops. Returns how many were planted.
    pub fn plant_batch(&mut self, field: FieldRef, crop: CropId, count: usize) -> usize {
        (0..count)
            .take_while(|_| self.plant_auto(field, crop).is_ok())
            .count()
    }

    pub fn breed(
        &mut self,
        field: FieldRef,
        slot: Option<usize>,
        animal: CropId,
    ) -> Result<usize, ActionError> {
        let now = self.clock.now();
        let slot = self
            .farm
            .breed(field, slot, animal, now)
            .inspect_err(|err| warn!(?field, animal = animal.0, error = %err, "breed rejected"))?;
        self.events.push(SimEvent::CropPlanted {
            slot: SlotRef { field, slot },
            crop: animal,
            at: now,
        });
        Ok(slot)
    }

    pub fn set_sick(&mut self, slot: SlotRef) -> Result<(), ActionError> {
        self.farm
            .set_sick(slot)
            .inspect_err(|err| warn!(?slot, error = %err, "set sick rejected"))?;
        let at = self.clock.now();
        self.events.push(SimEvent::CropSick { slot, at });
        Ok(())
    }

    pub fn cure(&mut self, slot: SlotRef) -> Result<(), ActionError> {
        self.farm
            .cure(slot)
            .inspect_err(|err| warn!(?slot, error = %err, "cure rejected"))?;
        let at = self.clock.now();
        self.events.push(SimEvent::CropCured { slot, at });
        Ok(())
    }

    pub fn accelerate_growth(&mut self, slot: SlotRef, secs: u64) -> Result<(), ActionError> {
        self.farm
            .accelerate_growth(slot, secs)
            .inspect_err(|err| warn!(?slot, secs, error = %err, "accelerate rejected"))
    }

    fn record_harvest(&mut self, outcome: &HarvestOutcome, money_before: u64) {
        let now = self.clock.now();
        for &(slot, crop) in &outcome.harvested {
            self.events.push(SimEvent::CropHarvested {
                slot,
                crop,
                earned: self.catalog.crop_price(crop),
                at: now,
            });
        }
        self.note_money(money_before, now);
    }

    /// Harvest one mature slot and sell it.
    pub fn harvest_crop(&mut self, slot: SlotRef) -> Result<HarvestOutcome, ActionError> {
        let before = self.economy.money();
        let outcome = self
            .farm
            .harvest_and_sell(slot, &self.catalog, &mut self.economy)
            .inspect_err(|err| warn!(?slot, error = %err, "harvest rejected"))?;
        self.record_harvest(&outcome, before);
        Ok(outcome)
    }

    pub fn harvest_field(&mut self, field: FieldRef) -> Result<HarvestOutcome, ActionError> {
        let before = self.economy.money();
        let outcome = self
            .farm
            .harvest_all_mature(field, &self.catalog, &mut self.economy)
            .inspect_err(|err| warn!(?field, error = %err, "harvest rejected"))?;
        self.record_harvest(&outcome, before);
        Ok(outcome)
    }

    pub fn harvest_all(&mut self) -> HarvestOutcome {
        let before = self.economy.money();
        let outcome = self.farm.harvest_all_fields(&self.catalog, &mut self.economy);
        self.record_harvest(&outcome, before);
        outcome
    }

    pub fn upgrade_field(
        &mut self,
        field: FieldRef,
        cost: Option<u64>,
    ) -> Result<u32, ActionError> {
        let before = self.economy.money();
        let level = self
            .farm
            .upgrade_field(field, cost, &mut self.economy)
            .inspect_err(|err| warn!(?field, error = %err, "field upgrade rejected"))?;
        let now = self.clock.now();
        self.note_money(before, now);
        Ok(level)
    }

    /// Default price of the next upgrade of a field.
    pub fn field_upgrade_cost(&self, field: FieldRef) -> Option<u64> {
        self.farm
            .field(field)
            .map(|f| default_field_upgrade_cost(f.current_level))
    }

    // -----------------------------------------------------------------------
    // Factory actions
    // -----------------------------------------------------------------------

    /// Returns whether the product started immediately.
    pub fn enqueue(&mut self, machine: usize, product: ProductId) -> Result<bool, ActionError> {
        let now = self.clock.now();
        let started = self
            .factory
            .enqueue(machine, product, now)
            .inspect_err(|err| {
                warn!(machine, product = product.0, error = %err, "enqueue rejected")
            })?;
        self.events.push(SimEvent::ProductQueued { machine, product, at: now });
        if started {
            self.events.push(SimEvent::ProductStarted { machine, product, at: now });
        }
        Ok(started)
    }

    pub fn enqueue_batch(&mut self, machine: usize, product: ProductId, count: usize) -> usize {
        (0..count)
            .take_while(|_| self.enqueue(machine, product).is_ok())
            .count()
    }

    pub fn start_next(&mut self, machine: usize) -> Result<ProductId, ActionError> {
        let now = self.clock.now();
        let product = self
            .factory
            .start_next(machine, now)
            .inspect_err(|err| warn!(machine, error = %err, "start rejected"))?;
        self.events.push(SimEvent::ProductStarted { machine, product, at: now });
        Ok(product)
    }

    /// Remove a product. Position 0 is the one in production.
    pub fn cancel(&mut self, machine: usize, position: usize) -> Result<Product, ActionError> {
        let now = self.clock.now();
        let removed = self
            .factory
            .cancel(machine, position, now)
            .inspect_err(|err| warn!(machine, position, error = %err, "cancel rejected"))?;
        self.events.push(SimEvent::ProductCancelled {
            machine,
            product: removed.product_id,
            at: now,
        });
        if position == 0 {
            if let Some(next) = self.factory.machine(machine).and_then(|m| m.in_flight.as_ref()) {
                self.events.push(SimEvent::ProductStarted {
                    machine,
                    product: next.product_id,
                    at: now,
                });
            }
        }
        Ok(removed)
    }

    /// Drop every product on a machine, in production or waiting.
    pub fn clear_queue(&mut self, machine: usize) -> Result<usize, ActionError> {
        let now = self.clock.now();
        let dropped: Vec<ProductId> = self
            .factory
            .queue_info(machine)
            .map(|info| info.current.into_iter().chain(info.queued).collect())
            .unwrap_or_default();
        let cleared = self
            .factory
            .clear_queue(machine)
            .inspect_err(|err| warn!(machine, error = %err, "clear rejected"))?;
        for product in dropped {
            self.events.push(SimEvent::ProductCancelled { machine, product, at: now });
        }
        Ok(cleared)
    }

    pub fn reorder_queue(
        &mut self,
        machine: usize,
        from: usize,
        to: usize) -> Result<(), ActionError> {
        self.factory
            .reorder_queue(machine, from, to)
            .inspect_err(|err| warn!(machine, from, to, error = %err, "reorder rejected"))
    }

    /// Finish the in-flight product of a machine immediately.
    pub fn complete_production(&mut self, machine: usize) -> Result<Completion, ActionError> {
        let now = self.clock.now();
        let before = self.economy.money();
        let completion = self
            .factory
            .complete_production(machine, now, &self.catalog, &mut self.economy)
            .inspect_err(|err| warn!(machine, error = %err, "complete rejected"))?;
        self.events.push(SimEvent::ProductCompleted {
            machine,
            product: completion.product.product_id,
            earned: completion.earned,
            at: now,
        });
        if let Some(next) = completion.next_started {
            self.events.push(SimEvent::ProductStarted { machine, product: next, at: now });
        }
        self.note_money(before, now);
        Ok(completion)
    }

    pub fn upgrade_machine(
        &mut self,
        machine: usize,
        cost: Option<u64>,
    ) -> Result<u32, ActionError> {
        let now = self.clock.now();
        let before = self.economy.money();
        let level = self
            .factory
            .upgrade(machine, cost, &mut self.economy)
            .inspect_err(|err| warn!(machine, error = %err, "machine upgrade rejected"))?;
        self.events.push(SimEvent::MachineUpgraded {
            machine,
            level,
            cost: before - self.economy.money(),
            at: now,
        });
        self.note_money(before, now);
        Ok(level)
    }

    pub fn repair_machine(
        &mut self,
        machine: usize,
        cost: Option<u64>,
    ) -> Result<Option<ProductId>, ActionError> {
        let now = self.clock.now();
        let before = self.economy.money();
        let restarted = self
            .factory
            .repair(machine, cost, &mut self.economy, now)
            .inspect_err(|err| warn!(machine, error = %err, "repair rejected"))?;
        self.events.push(SimEvent::MachineRepaired {
            machine,
            cost: before - self.economy.money(),
            at: now,
        });
        if let Some(product) = restarted {
            self.events.push(SimEvent::ProductStarted { machine, product, at: now });
        }
        self.note_money(before, now);
        Ok(restarted)
    }

    pub fn unlock_machine(&mut self, machine: usize, cost: Option<u64>) -> Result<(), ActionError> {
        let now = self.clock.now();
        let before = self.economy.money();
        self.factory
            .unlock(machine, cost, &mut self.economy)
            .inspect_err(|err| warn!(machine, error = %err, "unlock rejected"))?;
        self.events.push(SimEvent::MachineUnlocked {
            machine,
            cost: before - self.economy.money(),
            at: now,
        });
        self.note_money(before, now);
        Ok(())
    }

    /// Roll a breakdown for one machine with an explicit probability.
    pub fn check_random_failure(
        &mut self,
        machine: usize,
        probability: Fixed64,
    ) -> Result<bool, ActionError> {
        let broke = self
            .factory
            .check_random_failure(machine, probability, self.rng.as_mut())?;
        if broke {
            let at = self.clock.now();
            self.events.push(SimEvent::MachineBroken { machine, at });
        }
        Ok(broke)
    }

    /// Default prices for the next upgrade, repair and unlock of a machine.
    pub fn machine_costs(&self, machine: usize) -> Option<(u64, u64, u64)> {
        let m = self.factory.machine(machine)?;
        Some((
            default_upgrade_cost(m.current_level),
            default_repair_cost(m.current_level),
            default_unlock_cost(machine),
        ))
    }

    // -----------------------------------------------------------------------
    // Economy actions
    // -----------------------------------------------------------------------

    pub fn add_money(&mut self, amount: u64) {
        let before = self.economy.money();
        self.economy.add_money(amount);
        let now = self.clock.now();
        self.note_money(before, now);
    }

    pub fn spend_money(&mut self, amount: u64) -> Result<(), ActionError> {
        let before = self.economy.money();
        self.economy.spend_money(amount)?;
        let now = self.clock.now();
        self.note_money(before, now);
        Ok(())
    }

    pub fn add_day(&mut self, days: u32) {
        if days == 0 {
            return;
        }
        let now = self.clock.now();
        self.advance_days(days, now);
    }

    pub fn set_satisfaction(&mut self, rate: i64) {
        self.economy.set_satisfaction(rate);
    }

    /// Evaluate the win condition and record the first time it holds.
    pub fn check_mission_complete(&mut self) -> bool {
        let was_complete = self.economy.is_mission_complete();
        let complete = self.economy.check_mission_complete();
        if complete && !was_complete {
            let at = self.clock.now();
            self.events.push(SimEvent::MissionCompleted {
                star: self.economy.star(),
                at,
            });
        }
        complete
    }

    pub fn load_progress(&mut self) -> bool {
        self.economy.load_progress()
    }

    pub fn reset_game(&mut self) {
        self.economy.reset_game();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn goal_progress(&self) -> Vec<(Goal, GoalProgress)> {
        self.goals
            .iter()
            .map(|goal| (*goal, goal.evaluate(&self.farm, &self.factory, &self.economy)))
            .collect()
    }

    pub fn all_goals_reached(&self) -> bool {
        self.goal_progress().iter().all(|(_, progress)| progress.reached)
    }

    pub fn field_snapshots(&self) -> Vec<FieldSnapshot> {
        self.farm.all_fields().map(FieldSnapshot::from).collect()
    }

    pub fn machine_snapshots(&self) -> Vec<MachineSnapshot> {
        self.factory
            .machines()
            .iter()
            .enumerate()
            .map(|(position, machine)| MachineSnapshot::new(position, machine))
            .collect()
    }

    pub fn economy_snapshot(&self) -> EconomySnapshot {
        EconomySnapshot::from(&self.economy)
    }

    /// Number of machines currently producing.
    pub fn producing_count(&self) -> usize {
        self.factory
            .machines()
            .iter()
            .filter(|m| m.state == MachineState::Producing)
            .count()
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            header: SnapshotHeader::new(self.mission_id, self.clock.now()),
            farm: self.farm.clone(),
            factory: self.factory.clone(),
            economy: self.economy.state().clone(),
            last_step: self.last_step,
            day_elapsed: self.day_elapsed,
        }
    }

    pub fn save_snapshot(&self) -> Result<Vec<u8>, SerializeError> {
        self.snapshot().encode()
    }

    /// Replace the runtime state with a decoded snapshot. The catalog, goals,
    /// clock, random source and store are kept.
    pub fn restore_snapshot(&mut self, data: &[u8]) -> Result<(), DeserializeError> {
        let snapshot = SimulationSnapshot::decode(data)?;
        if snapshot.header.mission_id != self.mission_id {
            let err = DeserializeError::MissionMismatch {
                expected: self.mission_id,
                found: snapshot.header.mission_id,
            };
            warn!(error = %err, "snapshot rejected");
            return Err(err);
        }
        self.farm = snapshot.farm;
        self.factory = snapshot.factory;
        self.economy.restore_state(snapshot.economy);
        self.last_step = snapshot.last_step;
        self.day_elapsed = snapshot.day_elapsed;
        info!(mission = self.mission_id.0, "snapshot restored");
        Ok(())
    }
}
