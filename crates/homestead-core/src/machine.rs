//! One factory machine and its production queue.
//!
//! ```text
//! Locked --unlock--> Idle <--complete/cancel-- Producing
//!                     |  ^                       ^  |
//!                     |  +--------repair------+  |  break
//!                     +------start_next-------|--+  v
//!                                             +-- Broken
//! ```
//!
//! The product in production is held apart from the FIFO queue. Queue
//! positions use one numbering everywhere: position 0 is the in-flight
//! product, position `p > 0` is queue entry `p - 1`.

use crate::error::{ActionError, Rejection};
use crate::fixed::{Fixed64, Millis, Timestamp};
use crate::id::{MachineTypeId, ProductId};
use crate::product::Product;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Queue capacity of a level-0 machine. Every two levels add one place.
pub const BASE_QUEUE_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    Idle,
    Producing,
    Broken,
    Locked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub machine_id: MachineTypeId,
    /// Position in the mission data.
    pub index: usize,
    pub current_level: u32,
    pub max_level: u32,
    pub state: MachineState,
    /// Waiting products; excludes the one in production.
    pub queue: VecDeque<Product>,
    /// The product being produced. Kept while the machine is broken.
    pub in_flight: Option<Product>,
    pub unlocked: bool,
}

impl Machine {
    pub fn new(
        machine_id: MachineTypeId,
        index: usize,
        current_level: u32,
        max_level: u32,
        unlocked: bool,
    ) -> Self {
        Self {
            machine_id,
            index,
            current_level,
            max_level,
            state: if unlocked {
                MachineState::Idle
            } else {
                MachineState::Locked
            },
            queue: VecDeque::new(),
            in_flight: None,
            unlocked,
        }
    }

    pub fn capacity(&self) -> usize {
        BASE_QUEUE_CAPACITY + (self.current_level / 2) as usize
    }

    /// Queued products plus the one in production.
    pub fn occupancy(&self) -> usize {
        self.queue.len() + usize::from(self.in_flight.is_some())
    }

    pub fn remaining_space(&self) -> usize {
        self.capacity().saturating_sub(self.occupancy())
    }

    pub fn is_full(&self) -> bool {
        self.occupancy() >= self.capacity()
    }

    /// Progress of the in-flight product, or zero.
    pub fn progress(&self) -> Fixed64 {
        self.in_flight
            .as_ref()
            .map_or(Fixed64::ZERO, |product| product.progress)
    }

    pub fn queued_ids(&self) -> Vec<ProductId> {
        self.queue.iter().map(|product| product.product_id).collect()
    }

    fn ensure_operational(&self) -> Result<(), ActionError> {
        match self.state {
            MachineState::Locked => Err(Rejection::MachineLocked.into()),
            MachineState::Broken => Err(Rejection::MachineBroken.into()),
            MachineState::Idle | MachineState::Producing => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Queue operations
    // -----------------------------------------------------------------------

    /// Append a waiting product. An idle machine starts it at once; the
    /// return value says whether that happened.
    pub fn enqueue(&mut self, product_id: ProductId, now: Timestamp) -> Result<bool, ActionError> {
        self.ensure_operational()?;
        if self.is_full() {
            return Err(Rejection::QueueFull.into());
        }
        self.queue.push_back(Product::new(product_id));
        if self.state == MachineState::Idle {
            self.begin_next(now);
            return Ok(true);
        }
        Ok(false)
    }

    /// Start the head of the queue on an idle machine.
    pub fn start_next(&mut self, now: Timestamp) -> Result<ProductId, ActionError> {
        self.ensure_operational()?;
        if self.state != MachineState::Idle {
            return Err(Rejection::NotIdle.into());
        }
        self.begin_next(now).ok_or(Rejection::QueueEmpty.into())
    }

    fn begin_next(&mut self, now: Timestamp) -> Option<ProductId> {
        let mut product = self.queue.pop_front()?;
        product.start(now);
        let id = product.product_id;
        self.in_flight = Some(product);
        self.state = MachineState::Producing;
        Some(id)
    }

    /// Recompute the in-flight product. Completes it (and starts the next)
    /// once it reaches 100%.
    pub fn tick(&mut self, now: Timestamp, duration: Millis) -> Option<Product> {
        if self.state != MachineState::Producing {
            return None;
        }
        let done = self
            .in_flight
            .as_mut()
            .is_some_and(|product| product.recompute(now, duration));
        if done {
            self.complete_production(now).ok()
        } else {
            None
        }
    }

    /// Detach the in-flight product as completed, go idle, then auto-start
    /// the next queued product.
    pub fn complete_production(&mut self, now: Timestamp) -> Result<Product, ActionError> {
        if self.state != MachineState::Producing {
            return Err(Rejection::NotProducing.into());
        }
        let mut product = self.in_flight.take().ok_or(Rejection::NothingInFlight)?;
        product.complete();
        self.state = MachineState::Idle;
        self.begin_next(now);
        Ok(product)
    }

    /// Remove the product at `position`. Cancelling the in-flight product of
    /// a working machine starts the next one; a broken machine stays broken.
    pub fn cancel(&mut self, position: usize, now: Timestamp) -> Result<Product, ActionError> {
        if position == 0 {
            let product = self.in_flight.take().ok_or(Rejection::NothingInFlight)?;
            if self.state == MachineState::Producing {
                self.state = MachineState::Idle;
                self.begin_next(now);
            }
            return Ok(product);
        }
        self.queue
            .remove(position - 1)
            .ok_or(ActionError::InvalidIndex)
    }

    /// Drop every queued and in-flight product. Returns how many were dropped.
    pub fn clear_queue(&mut self) -> usize {
        let dropped = self.occupancy();
        self.queue.clear();
        self.in_flight = None;
        if self.state == MachineState::Producing {
            self.state = MachineState::Idle;
        }
        dropped
    }

    /// Move a waiting product from one queue position to another.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), ActionError> {
        if from == 0 || to == 0 {
            return Err(Rejection::InFlightPinned.into());
        }
        let len = self.queue.len();
        if from > len || to > len {
            return Err(ActionError::InvalidIndex);
        }
        if let Some(product) = self.queue.remove(from - 1) {
            self.queue.insert(to - 1, product);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // State changes driven by the factory's economics
    // -----------------------------------------------------------------------

    pub fn check_upgrade(&self) -> Result<(), ActionError> {
        if self.state == MachineState::Locked {
            return Err(Rejection::MachineLocked.into());
        }
        if self.current_level >= self.max_level {
            return Err(Rejection::AtMaxLevel.into());
        }
        Ok(())
    }

    pub fn upgrade_level(&mut self) -> Result<u32, ActionError> {
        self.check_upgrade()?;
        self.current_level += 1;
        Ok(self.current_level)
    }

    pub fn break_down(&mut self) -> Result<(), ActionError> {
        if self.state != MachineState::Producing {
            return Err(Rejection::NotProducing.into());
        }
        self.state = MachineState::Broken;
        Ok(())
    }

    pub fn check_repair(&self) -> Result<(), ActionError> {
        if self.state != MachineState::Broken {
            return Err(Rejection::NotBroken.into());
        }
        Ok(())
    }

    /// Bring a broken machine back. Interrupted work goes back to the head
    /// of the queue with its progress reset and starts again immediately.
    pub fn repair(&mut self, now: Timestamp) -> Result<Option<ProductId>, ActionError> {
        self.check_repair()?;
        if let Some(mut product) = self.in_flight.take() {
            product.reset();
            self.queue.push_front(product);
        }
        self.state = MachineState::Idle;
        Ok(self.begin_next(now))
    }

    pub fn check_unlock(&self) -> Result<(), ActionError> {
        if self.unlocked {
            return Err(Rejection::AlreadyUnlocked.into());
        }
        Ok(())
    }

    pub fn unlock(&mut self) -> Result<(), ActionError> {
        self.check_unlock()?;
        self.unlocked = true;
        self.state = MachineState::Idle;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::HUNDRED;
    use crate::product::ProductState;

    const TEN_SECS: Millis = 10_000;

    fn idle(level: u32) -> Machine {
        Machine::new(MachineTypeId(1), 0, level, 10, true)
    }

    #[test]
    fn capacity_grows_every_two_levels() {
        assert_eq!(idle(0).capacity(), 5);
        assert_eq!(idle(1).capacity(), 5);
        assert_eq!(idle(2).capacity(), 6);
        assert_eq!(idle(5).capacity(), 7);
    }

    #[test]
    fn first_enqueue_starts_production() {
        let mut machine = idle(1);
        assert_eq!(machine.enqueue(ProductId(3), Timestamp(500)), Ok(true));
        assert_eq!(machine.state, MachineState::Producing);
        assert!(machine.queue.is_empty());
        let in_flight = machine.in_flight.as_ref().unwrap();
        assert_eq!(in_flight.started_at, Some(Timestamp(500)));
        assert_eq!(in_flight.state, ProductState::Producing);

        assert_eq!(machine.enqueue(ProductId(4), Timestamp(600)), Ok(false));
        assert_eq!(machine.queued_ids(), vec![ProductId(4)]);
    }

    #[test]
    fn sixth_enqueue_fails_without_mutation() {
        let mut machine = idle(1);
        for i in 0..5 {
            machine.enqueue(ProductId(i), Timestamp::ZERO).unwrap();
        }
        assert!(machine.is_full());
        let before = machine.clone();
        assert_eq!(
            machine.enqueue(ProductId(9), Timestamp::ZERO),
            Err(Rejection::QueueFull.into())
        );
        assert_eq!(machine, before);
    }

    #[test]
    fn locked_and_broken_reject_enqueue() {
        let mut locked = Machine::new(MachineTypeId(1), 0, 1, 3, false);
        assert_eq!(locked.state, MachineState::Locked);
        assert_eq!(
            locked.enqueue(ProductId(1), Timestamp::ZERO),
            Err(Rejection::MachineLocked.into())
        );

        let mut broken = idle(1);
        broken.enqueue(ProductId(1), Timestamp::ZERO).unwrap();
        broken.break_down().unwrap();
        assert_eq!(
            broken.enqueue(ProductId(2), Timestamp::ZERO),
            Err(Rejection::MachineBroken.into())
        );
    }

    #[test]
    fn completion_auto_starts_next() {
        let mut machine = idle(1);
        machine.enqueue(ProductId(1), Timestamp::ZERO).unwrap();
        machine.enqueue(ProductId(2), Timestamp::ZERO).unwrap();

        assert!(machine.tick(Timestamp(5_000), TEN_SECS).is_none());
        assert_eq!(machine.progress(), Fixed64::from_num(50));

        let done = machine.tick(Timestamp(TEN_SECS), TEN_SECS).unwrap();
        assert_eq!(done.product_id, ProductId(1));
        assert!(done.is_completed());
        assert_eq!(done.progress, HUNDRED);

        let next = machine.in_flight.as_ref().unwrap();
        assert_eq!(next.product_id, ProductId(2));
        assert_eq!(next.started_at, Some(Timestamp(TEN_SECS)));
        assert_eq!(machine.state, MachineState::Producing);
    }

    #[test]
    fn completing_last_product_goes_idle() {
        let mut machine = idle(1);
        machine.enqueue(ProductId(1), Timestamp::ZERO).unwrap();
        machine.complete_production(Timestamp(1)).unwrap();
        assert_eq!(machine.state, MachineState::Idle);
        assert!(machine.in_flight.is_none());
        assert_eq!(
            machine.complete_production(Timestamp(2)),
            Err(Rejection::NotProducing.into())
        );
    }

    #[test]
    fn start_next_preconditions() {
        let mut machine = idle(1);
        assert_eq!(
            machine.start_next(Timestamp::ZERO),
            Err(Rejection::QueueEmpty.into())
        );
        machine.enqueue(ProductId(1), Timestamp::ZERO).unwrap();
        assert_eq!(
            machine.start_next(Timestamp::ZERO),
            Err(Rejection::NotIdle.into())
        );
    }

    #[test]
    fn cancel_uses_in_flight_numbering() {
        let mut machine = idle(1);
        for id in 1..=3 {
            machine.enqueue(ProductId(id), Timestamp::ZERO).unwrap();
        }
        let removed = machine.cancel(2, Timestamp::ZERO).unwrap();
        assert_eq!(removed.product_id, ProductId(3));
        assert_eq!(machine.cancel(2, Timestamp::ZERO), Err(ActionError::InvalidIndex));

        let removed = machine.cancel(0, Timestamp(700)).unwrap();
        assert_eq!(removed.product_id, ProductId(1));
        let next = machine.in_flight.as_ref().unwrap();
        assert_eq!(next.product_id, ProductId(2));
        assert_eq!(next.started_at, Some(Timestamp(700)));

        machine.cancel(0, Timestamp(800)).unwrap();
        assert_eq!(machine.state, MachineState::Idle);
        assert_eq!(
            machine.cancel(0, Timestamp(900)),
            Err(Rejection::NothingInFlight.into())
        );
    }

    #[test]
    fn cancelling_broken_in_flight_stays_broken() {
        let mut machine = idle(1);
        machine.enqueue(ProductId(1), Timestamp::ZERO).unwrap();
        machine.enqueue(ProductId(2), Timestamp::ZERO).unwrap();
        machine.break_down().unwrap();
        machine.cancel(0, Timestamp::ZERO).unwrap();
        assert_eq!(machine.state, MachineState::Broken);
        assert!(machine.in_flight.is_none());
        assert_eq!(machine.queued_ids(), vec![ProductId(2)]);
    }

    #[test]
    fn reorder_moves_waiting_products_only() {
        let mut machine = idle(1);
        for id in 1..=4 {
            machine.enqueue(ProductId(id), Timestamp::ZERO).unwrap();
        }
        machine.reorder(3, 1).unwrap();
        assert_eq!(
            machine.queued_ids(),
            vec![ProductId(4), ProductId(2), ProductId(3)]
        );
        assert_eq!(machine.reorder(0, 1), Err(Rejection::InFlightPinned.into()));
        assert_eq!(machine.reorder(1, 0), Err(Rejection::InFlightPinned.into()));
        assert_eq!(machine.reorder(1, 4), Err(ActionError::InvalidIndex));
    }

    #[test]
    fn clear_queue_drops_everything() {
        let mut machine = idle(1);
        for id in 1..=3 {
            machine.enqueue(ProductId(id), Timestamp::ZERO).unwrap();
        }
        assert_eq!(machine.clear_queue(), 3);
        assert_eq!(machine.occupancy(), 0);
        assert_eq!(machine.state, MachineState::Idle);
    }

    #[test]
    fn repair_restarts_interrupted_product() {
        let mut machine = idle(1);
        machine.enqueue(ProductId(1), Timestamp::ZERO).unwrap();
        machine.enqueue(ProductId(2), Timestamp::ZERO).unwrap();
        machine.tick(Timestamp(6_000), TEN_SECS);
        machine.break_down().unwrap();
        assert_eq!(machine.occupancy(), 2);

        // Broken machines ignore ticks.
        assert!(machine.tick(Timestamp(60_000), TEN_SECS).is_none());

        assert_eq!(machine.repair(Timestamp(20_000)), Ok(Some(ProductId(1))));
        let in_flight = machine.in_flight.as_ref().unwrap();
        assert_eq!(in_flight.started_at, Some(Timestamp(20_000)));
        assert_eq!(in_flight.progress, Fixed64::ZERO);
        assert_eq!(machine.queued_ids(), vec![ProductId(2)]);
        assert_eq!(machine.state, MachineState::Producing);

        assert_eq!(machine.repair(Timestamp(20_000)), Err(Rejection::NotBroken.into()));
    }

    #[test]
    fn break_requires_production() {
        let mut machine = idle(1);
        assert_eq!(machine.break_down(), Err(Rejection::NotProducing.into()));
    }

    #[test]
    fn upgrade_and_unlock_preconditions() {
        let mut machine = Machine::new(MachineTypeId(1), 0, 1, 2, false);
        assert_eq!(machine.upgrade_level(), Err(Rejection::MachineLocked.into()));
        machine.unlock().unwrap();
        assert_eq!(machine.unlock(), Err(Rejection::AlreadyUnlocked.into()));
        assert_eq!(machine.upgrade_level(), Ok(2));
        assert_eq!(machine.upgrade_level(), Err(Rejection::AtMaxLevel.into()));
    }
}
