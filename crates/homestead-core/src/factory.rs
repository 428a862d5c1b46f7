//! The factory: a row of machines, their production economics and the
//! production totals.
//!
//! Machines are addressed by position in the factory, which follows the
//! mission's machine order (sorted by machine id). A machine's `index`
//! keeps its position in the mission data.

use crate::catalog::Catalog;
use crate::economy::Economy;
use crate::error::ActionError;
use crate::fixed::{Fixed64, Timestamp, secs_to_millis};
use crate::id::{MachineTypeId, ProductId};
use crate::machine::{Machine, MachineState};
use crate::mission::FactorySetup;
use crate::product::Product;
use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const UPGRADE_COST_BASE: u64 = 100;
pub const REPAIR_COST_BASE: u64 = 50;
pub const UNLOCK_COST_BASE: u64 = 200;

pub fn default_upgrade_cost(level: u32) -> u64 {
    UPGRADE_COST_BASE * u64::from(level)
}

pub fn default_repair_cost(level: u32) -> u64 {
    REPAIR_COST_BASE * u64::from(level)
}

pub fn default_unlock_cost(position: usize) -> u64 {
    UNLOCK_COST_BASE * (position as u64 + 1)
}

/// A product that finished on a machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub machine: usize,
    pub product: Product,
    /// Sell price credited to the economy.
    pub earned: u64,
    /// The queued product that started in its place, if any.
    pub next_started: Option<ProductId>,
}

/// Read-only view of one machine's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueInfo {
    pub current: Option<ProductId>,
    pub queued: Vec<ProductId>,
    pub total: usize,
    pub capacity: usize,
    pub remaining: usize,
    pub full: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactoryStats {
    pub idle: usize,
    pub producing: usize,
    pub broken: usize,
    pub locked: usize,
    /// Waiting products across all machines, excluding in-flight ones.
    pub queued: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factory {
    machines: Vec<Machine>,
    can_break: bool,
    total_produced: u32,
    target_products: u32,
    /// Completed products per machine type, seeded with each template's
    /// start number.
    produced_by_type: BTreeMap<MachineTypeId, u32>,
}

impl Factory {
    pub fn from_setup(setup: &FactorySetup) -> Self {
        let mut produced_by_type = BTreeMap::new();
        let machines = setup
            .machines
            .iter()
            .map(|template| {
                *produced_by_type.entry(template.machine_id).or_insert(0) += template.start_number;
                Machine::new(
                    template.machine_id,
                    template.config_index,
                    template.start_level,
                    template.max_level,
                    template.config_index < setup.unlocked_positions,
                )
            })
            .collect();
        Self {
            machines,
            can_break: setup.can_break,
            total_produced: 0,
            target_products: setup.target_products,
            produced_by_type,
        }
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn machine(&self, position: usize) -> Option<&Machine> {
        self.machines.get(position)
    }

    fn machine_mut(&mut self, position: usize) -> Result<&mut Machine, ActionError> {
        self.machines.get_mut(position).ok_or(ActionError::InvalidIndex)
    }

    /// First machine of the given type.
    pub fn machine_by_type(&self, machine_id: MachineTypeId) -> Option<(usize, &Machine)> {
        self.machines
            .iter()
            .enumerate()
            .find(|(_, machine)| machine.machine_id == machine_id)
    }

    pub fn can_break(&self) -> bool {
        self.can_break
    }

    pub fn total_produced(&self) -> u32 {
        self.total_produced
    }

    pub fn target_products(&self) -> u32 {
        self.target_products
    }

    pub fn produced_by_type(&self, machine_id: MachineTypeId) -> u32 {
        self.produced_by_type.get(&machine_id).copied().unwrap_or(0)
    }

    /// A zero target is never reached.
    pub fn is_target_reached(&self) -> bool {
        self.target_products > 0 && self.total_produced >= self.target_products
    }

    pub fn unlocked_count(&self) -> usize {
        self.machines.iter().filter(|machine| machine.unlocked).count()
    }

    // -----------------------------------------------------------------------
    // Queue operations
    // -----------------------------------------------------------------------

    /// Returns whether the product started immediately.
    pub fn enqueue(
        &mut self,
        position: usize,
        product_id: ProductId,
        now: Timestamp,
    ) -> Result<bool, ActionError> {
        self.machine_mut(position)?.enqueue(product_id, now)
    }

    /// Enqueue up to `count` products, stopping at the first rejection.
    pub fn enqueue_batch(
        &mut self,
        position: usize,
        product_id: ProductId,
        count: usize,
        now: Timestamp,
    ) -> usize {
        (0..count)
            .take_while(|_| self.enqueue(position, product_id, now).is_ok())
            .count()
    }

    pub fn start_next(
        &mut self,
        position: usize,
        now: Timestamp,
    ) -> Result<ProductId, ActionError> {
        self.machine_mut(position)?.start_next(now)
    }

    pub fn cancel(
        &mut self,
        position: usize,
        queue_position: usize,
        now: Timestamp,
    ) -> Result<Product, ActionError> {
        self.machine_mut(position)?.cancel(queue_position, now)
    }

    pub fn clear_queue(&mut self, position: usize) -> Result<usize, ActionError> {
        Ok(self.machine_mut(position)?.clear_queue())
    }

    pub fn reorder_queue(
        &mut self,
        position: usize,
        from: usize,
        to: usize) -> Result<(), ActionError> {
        self.machine_mut(position)?.reorder(from, to)
    }

    pub fn queue_info(&self, position: usize) -> Option<QueueInfo> {
        let machine = self.machine(position)?;
        Some(QueueInfo {
            current: machine.in_flight.as_ref().map(|product| product.product_id),
            queued: machine.queued_ids(),
            total: machine.occupancy(),
            capacity: machine.capacity(),
            remaining: machine.remaining_space(),
            full: machine.is_full(),
        })
    }

    // -----------------------------------------------------------------------
    // Production
    // -----------------------------------------------------------------------

    fn record(
        &mut self,
        position: usize,
        product: Product,
        catalog: &Catalog,
        economy: &mut Economy,
    ) -> Completion {
        let machine = &self.machines[position];
        let next_started = machine.in_flight.as_ref().map(|next| next.product_id);
        *self.produced_by_type.entry(machine.machine_id).or_insert(0) += 1;
        self.total_produced += 1;

        let earned = catalog.product_price(product.product_id);
        economy.add_money(earned);
        debug!(
            machine = position,
            product = product.product_id.0,
            total = self.total_produced,
            "product completed"
        );
        Completion {
            machine: position,
            product,
            earned,
            next_started,
        }
    }

    /// Recompute one machine against an explicit production time. Returns
    /// the finished product, if it completed on this call.
    pub fn tick(
        &mut self,
        position: usize,
        production_secs: u64,
        now: Timestamp,
        catalog: &Catalog,
        economy: &mut Economy,
    ) -> Result<Option<Completion>, ActionError> {
        let finished = self
            .machine_mut(position)?
            .tick(now, secs_to_millis(production_secs));
        Ok(finished.map(|product| self.record(position, product, catalog, economy)))
    }

    /// Recompute every producing machine with catalog production times. At
    /// most one product completes per machine per call.
    pub fn tick_all(
        &mut self,
        now: Timestamp,
        catalog: &Catalog,
        economy: &mut Economy,
    ) -> Vec<Completion> {
        let mut completions = Vec::new();
        for position in 0..self.machines.len() {
            let machine = &mut self.machines[position];
            let Some(in_flight) = machine.in_flight.as_ref() else {
                continue;
            };
            let duration = catalog.production_millis(in_flight.product_id, machine.current_level);
            if let Some(product) = machine.tick(now, duration) {
                completions.push(self.record(position, product, catalog, economy));
            }
        }
        completions
    }

    /// Finish the in-flight product now, whatever its progress.
    pub fn complete_production(
        &mut self,
        position: usize,
        now: Timestamp,
        catalog: &Catalog,
        economy: &mut Economy,
    ) -> Result<Completion, ActionError> {
        let product = self.machine_mut(position)?.complete_production(now)?;
        Ok(self.record(position, product, catalog, economy))
    }

    // -----------------------------------------------------------------------
    // Economics
    // -----------------------------------------------------------------------

    /// Returns the new level.
    pub fn upgrade(
        &mut self,
        position: usize,
        cost: Option<u64>,
        economy: &mut Economy,
    ) -> Result<u32, ActionError> {
        let machine = self.machine_mut(position)?;
        machine.check_upgrade()?;
        economy.spend_money(cost.unwrap_or_else(|| default_upgrade_cost(machine.current_level)))?;
        let level = machine.upgrade_level()?;
        debug!(machine = position, level, "machine upgraded");
        Ok(level)
    }

    /// Returns the product restarted by the repair, if any.
    pub fn repair(
        &mut self,
        position: usize,
        cost: Option<u64>,
        economy: &mut Economy,
        now: Timestamp,
    ) -> Result<Option<ProductId>, ActionError> {
        let machine = self.machine_mut(position)?;
        machine.check_repair()?;
        economy.spend_money(cost.unwrap_or_else(|| default_repair_cost(machine.current_level)))?;
        let restarted = machine.repair(now)?;
        debug!(machine = position, "machine repaired");
        Ok(restarted)
    }

    pub fn unlock(
        &mut self,
        position: usize,
        cost: Option<u64>,
        economy: &mut Economy) -> Result<(), ActionError> {
        let machine = self.machine_mut(position)?;
        machine.check_unlock()?;
        economy.spend_money(cost.unwrap_or_else(|| default_unlock_cost(position)))?;
        machine.unlock()?;
        debug!(machine = position, "machine unlocked");
        Ok(())
    }

    /// Break a producing machine outright.
    pub fn break_machine(&mut self, position: usize) -> Result<(), ActionError> {
        self.machine_mut(position)?.break_down()
    }

    /// Roll for a breakdown. Only producing machines in a mission that
    /// allows breakage can fail. Returns whether the machine broke.
    pub fn check_random_failure(
        &mut self,
        position: usize,
        probability: Fixed64,
        rng: &mut dyn RandomSource,
    ) -> Result<bool, ActionError> {
        let can_break = self.can_break;
        let machine = self.machine_mut(position)?;
        if !can_break || machine.state != MachineState::Producing {
            return Ok(false);
        }
        if !rng.chance(probability) {
            return Ok(false);
        }
        machine.break_down()?;
        debug!(machine = position, "machine broke down");
        Ok(true)
    }

    pub fn stats(&self) -> FactoryStats {
        let mut stats = FactoryStats::default();
        for machine in &self.machines {
            match machine.state {
                MachineState::Idle => stats.idle += 1,
                MachineState::Producing => stats.producing += 1,
                MachineState::Broken => stats.broken += 1,
                MachineState::Locked => stats.locked += 1,
            }
            stats.queued += machine.queue.len();
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Rejection;
    use crate::id::MissionId;
    use crate::mission::{MachineTemplate, MissionTarget, StarRule};
    use crate::rng::SimRng;

    fn template(machine_id: u32, config_index: usize) -> MachineTemplate {
        MachineTemplate {
            machine_id: MachineTypeId(machine_id),
            config_index,
            start_number: 0,
            target_number: 0,
            start_level: 1,
            target_level: 1,
            max_level: 3,
        }
    }

    fn factory(can_break: bool) -> Factory {
        Factory::from_setup(&FactorySetup {
            unlocked_positions: 2,
            target_unlocked_positions: 3,
            can_break,
            machines: vec![template(1, 1), template(2, 0), template(3, 2)],
            target_products: 2,
        })
    }

    fn economy(money: u64) -> Economy {
        let mut economy = Economy::default();
        economy.init_mission(
            MissionId(1),
            MissionTarget {
                start_money: money,
                ..MissionTarget::default()
            },
            StarRule::default(),
        );
        economy
    }

    #[test]
    fn unlock_state_follows_config_index() {
        let factory = factory(false);
        assert!(factory.machine(0).unwrap().unlocked);
        assert!(factory.machine(1).unwrap().unlocked);
        assert_eq!(factory.machine(2).unwrap().state, MachineState::Locked);
        assert_eq!(factory.unlocked_count(), 2);
        assert_eq!(factory.machine_by_type(MachineTypeId(3)).map(|(i, _)| i), Some(2));
    }

    #[test]
    fn batch_stops_when_full() {
        let mut factory = factory(false);
        assert_eq!(factory.enqueue_batch(0, ProductId(1), 8, Timestamp::ZERO), 5);
        let info = factory.queue_info(0).unwrap();
        assert_eq!(info.current, Some(ProductId(1)));
        assert_eq!(info.queued.len(), 4);
        assert_eq!(info.total, 5);
        assert_eq!(info.capacity, 5);
        assert_eq!(info.remaining, 0);
        assert!(info.full);
        assert!(factory.queue_info(9).is_none());
    }

    #[test]
    fn tick_all_completes_and_counts() {
        let catalog = Catalog::default().with_product(
            ProductId(1),
            crate::catalog::ProductSpec {
                production_secs: 10,
                sell_price: 15,
            },
        );
        let mut economy = economy(0);
        let mut factory = factory(false);
        factory.enqueue(0, ProductId(1), Timestamp::ZERO).unwrap();
        factory.enqueue(0, ProductId(1), Timestamp::ZERO).unwrap();

        // Level 1: 10 s less 10%.
        assert!(factory.tick_all(Timestamp(8_999), &catalog, &mut economy).is_empty());
        let done = factory.tick_all(Timestamp(9_000), &catalog, &mut economy);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].machine, 0);
        assert_eq!(done[0].earned, 15);
        assert_eq!(done[0].next_started, Some(ProductId(1)));
        assert_eq!(economy.money(), 15);
        assert_eq!(factory.total_produced(), 1);
        assert_eq!(factory.produced_by_type(MachineTypeId(1)), 1);
        assert!(!factory.is_target_reached());

        factory.tick_all(Timestamp(18_000), &catalog, &mut economy);
        assert!(factory.is_target_reached());
        assert_eq!(factory.machine(0).unwrap().state, MachineState::Idle);
    }

    #[test]
    fn explicit_tick_uses_given_duration() {
        let catalog = Catalog::default();
        let mut economy = economy(0);
        let mut factory = factory(false);
        factory.enqueue(1, ProductId(2), Timestamp::ZERO).unwrap();
        assert_eq!(factory.tick(1, 30, Timestamp(20_000), &catalog, &mut economy), Ok(None));
        assert_eq!(factory.machine(1).unwrap().progress().to_num::<i64>(), 66);
        let done = factory.tick(1, 30, Timestamp(30_000), &catalog, &mut economy).unwrap();
        assert_eq!(done.map(|c| c.product.product_id), Some(ProductId(2)));
        assert_eq!(
            factory.tick(7, 30, Timestamp::ZERO, &catalog, &mut economy),
            Err(ActionError::InvalidIndex)
        );
    }

    #[test]
    fn upgrade_checks_precondition_before_paying() {
        let mut economy = economy(150);
        let mut factory = factory(false);
        assert_eq!(factory.upgrade(2, None, &mut economy), Err(Rejection::MachineLocked.into()));
        assert_eq!(economy.money(), 150);

        assert_eq!(factory.upgrade(0, None, &mut economy), Ok(2));
        assert_eq!(economy.money(), 50);
        assert_eq!(
            factory.upgrade(0, None, &mut economy),
            Err(ActionError::InsufficientFunds {
                needed: 200,
                available: 50
            })
        );
        assert_eq!(factory.machine(0).unwrap().current_level, 2);
    }

    #[test]
    fn unlock_costs_by_position() {
        let mut economy = economy(1_000);
        let mut factory = factory(false);
        factory.unlock(2, None, &mut economy).unwrap();
        assert_eq!(economy.money(), 400);
        assert_eq!(factory.unlocked_count(), 3);
        assert_eq!(factory.unlock(2, None, &mut economy), Err(Rejection::AlreadyUnlocked.into()));
        assert_eq!(economy.money(), 400);
    }

    #[test]
    fn repair_costs_and_restarts() {
        let mut economy = economy(100);
        let mut factory = factory(true);
        factory.enqueue(0, ProductId(1), Timestamp::ZERO).unwrap();
        assert_eq!(
            factory.repair(0, None, &mut economy, Timestamp::ZERO),
            Err(Rejection::NotBroken.into())
        );
        factory.break_machine(0).unwrap();
        assert_eq!(factory.stats().broken, 1);

        assert_eq!(factory.repair(0, None, &mut economy, Timestamp(5_000)), Ok(Some(ProductId(1))));
        assert_eq!(economy.money(), 50);
        assert_eq!(factory.machine(0).unwrap().state, MachineState::Producing);
    }

    #[test]
    fn random_failure_needs_permission_and_production() {
        let mut rng = SimRng::new(1);
        let mut factory = factory(false);
        factory.enqueue(0, ProductId(1), Timestamp::ZERO).unwrap();
        assert_eq!(factory.check_random_failure(0, Fixed64::ONE, &mut rng), Ok(false));

        let mut factory = self::factory(true);
        assert_eq!(factory.check_random_failure(0, Fixed64::ONE, &mut rng), Ok(false));
        factory.enqueue(0, ProductId(1), Timestamp::ZERO).unwrap();
        assert_eq!(factory.check_random_failure(0, Fixed64::ZERO, &mut rng), Ok(false));
        assert_eq!(factory.check_random_failure(0, Fixed64::ONE, &mut rng), Ok(true));
        assert_eq!(factory.machine(0).unwrap().state, MachineState::Broken);
        assert_eq!(
            factory.check_random_failure(5, Fixed64::ONE, &mut rng),
            Err(ActionError::InvalidIndex)
        );
    }

    #[test]
    fn stats_count_states_and_waiting_products() {
        let mut factory = factory(false);
        factory.enqueue_batch(0, ProductId(1), 3, Timestamp::ZERO);
        let stats = factory.stats();
        assert_eq!(
            stats,
            FactoryStats {
                idle: 1,
                producing: 1,
                broken: 0,
                locked: 1,
                queued: 2,
            }
        );
    }

    #[test]
    fn clear_and_reorder_delegate() {
        let mut factory = factory(false);
        factory.enqueue_batch(0, ProductId(1), 2, Timestamp::ZERO);
        factory.enqueue(0, ProductId(2), Timestamp::ZERO).unwrap();
        factory.reorder_queue(0, 2, 1).unwrap();
        assert_eq!(factory.queue_info(0).unwrap().queued, vec![ProductId(2), ProductId(1)]);
        assert_eq!(factory.clear_queue(0), Ok(3));
        assert_eq!(factory.clear_queue(9), Err(ActionError::InvalidIndex));
    }
}
