//! Simulation events and the bounded log that records them.
//!
//! Every successful action and every state change made by a step is
//! recorded as a [`SimEvent`]. The log keeps the most recent events up to its
//! capacity and drops the oldest beyond that. Passive listeners see each
//! event as it is pushed.

use crate::fixed::Timestamp;
use crate::id::{CropId, ProductId, SlotRef};
use std::collections::VecDeque;
use std::fmt;

/// Default number of events kept by the log.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    CropPlanted { slot: SlotRef, crop: CropId, at: Timestamp },
    CropMatured { slot: SlotRef, crop: CropId, at: Timestamp },
    CropHarvested { slot: SlotRef, crop: CropId, earned: u64, at: Timestamp },
    CropSick { slot: SlotRef, at: Timestamp },
    CropCured { slot: SlotRef, at: Timestamp },
    ProductQueued { machine: usize, product: ProductId, at: Timestamp },
    ProductStarted { machine: usize, product: ProductId, at: Timestamp },
    ProductCompleted { machine: usize, product: ProductId, earned: u64, at: Timestamp },
    ProductCancelled { machine: usize, product: ProductId, at: Timestamp },
    MachineBroken { machine: usize, at: Timestamp },
    MachineRepaired { machine: usize, cost: u64, at: Timestamp },
    MachineUpgraded { machine: usize, level: u32, cost: u64, at: Timestamp },
    MachineUnlocked { machine: usize, cost: u64, at: Timestamp },
    MoneyChanged { from: u64, to: u64, at: Timestamp },
    DayAdvanced { day: u32, at: Timestamp },
    MissionCompleted { star: u8, at: Timestamp },
    GameOver { day: u32, at: Timestamp },
}

impl SimEvent {
    pub fn at(&self) -> Timestamp {
        match *self {
            SimEvent::CropPlanted { at, .. }
            | SimEvent::CropMatured { at, .. }
            | SimEvent::CropHarvested { at, .. }
            | SimEvent::CropSick { at, .. }
            | SimEvent::CropCured { at, .. }
            | SimEvent::ProductQueued { at, .. }
            | SimEvent::ProductStarted { at, .. }
            | SimEvent::ProductCompleted { at, .. }
            | SimEvent::ProductCancelled { at, .. }
            | SimEvent::MachineBroken { at, .. }
            | SimEvent::MachineRepaired { at, .. }
            | SimEvent::MachineUpgraded { at, .. }
            | SimEvent::MachineUnlocked { at, .. }
            | SimEvent::MoneyChanged { at, .. }
            | SimEvent::DayAdvanced { at, .. }
            | SimEvent::MissionCompleted { at, .. }
            | SimEvent::GameOver { at, .. } => at,
        }
    }
}

/// A listener receives events read-only.
pub type EventListener = Box<dyn FnMut(&SimEvent)>;

pub struct EventLog {
    events: VecDeque<SimEvent>,
    capacity: usize,
    /// Total events ever pushed, including dropped ones.
    total_written: u64,
    listeners: Vec<EventListener>,
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("len", &self.events.len())
            .field("capacity", &self.capacity)
            .field("total_written", &self.total_written)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventLog {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
            listeners: Vec::new(),
        }
    }

    pub fn push(&mut self, event: SimEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.total_written += 1;
    }

    pub fn subscribe(&mut self, listener: EventListener) {
        self.listeners.push(listener);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity as u64)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &SimEvent> {
        self.events.iter()
    }

    /// Remove and return every stored event, oldest first.
    pub fn drain(&mut self) -> Vec<SimEvent> {
        self.events.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
