//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::catalog::Catalog;
use crate::clock::ManualClock;
use crate::economy::Economy;
use crate::fixed::Fixed64;
use crate::id::*;
use crate::mission::*;
use crate::rng::RandomSource;
use crate::sim::Simulation;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Crop and product ids
// ===========================================================================

pub fn wheat() -> CropId {
    CropId(7)
}
pub fn corn() -> CropId {
    CropId(8)
}
pub fn chicken() -> CropId {
    CropId(20)
}
pub fn fish() -> CropId {
    CropId(30)
}

pub fn bread() -> ProductId {
    ProductId(1)
}
pub fn cheese() -> ProductId {
    ProductId(2)
}

// ===========================================================================
// Templates
// ===========================================================================

pub fn field_template(kind: FieldKind, slots: u32, level: u32, max_level: u32) -> FieldTemplate {
    FieldTemplate {
        kind,
        start_slots: slots,
        target_slots: slots,
        start_level: level,
        target_level: level,
        max_level,
    }
}

pub fn machine_template(machine_id: u32, config_index: usize) -> MachineTemplate {
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

/// A mission with every feature switched on:
///
/// - 500 start money, 1000 target, 7 days, stars at 800/1200
/// - farmland 0 (3 slots), farmland 1 (2 slots), one pen (2), one pond (1)
/// - machines of type 1, 2, 3; the first two positions unlocked
pub fn sample_setup() -> MissionSetup {
    MissionSetup {
        id: MissionId(1),
        target: MissionTarget {
            start_money: 500,
            target_money: 1_000,
            max_days: 7,
            ..MissionTarget::default()
        },
        star_rule: StarRule {
            two_star: 800,
            three_star: 1_200,
            reward: [50, 100, 150],
        },
        farm: FarmSetup {
            can_sick: true,
            fields: vec![
                FieldTemplate {
                    target_level: 2,
                    ..field_template(FieldKind::Farmland, 3, 1, 3)
                },
                field_template(FieldKind::Farmland, 2, 1, 1),
                field_template(FieldKind::Pen, 2, 1, 2),
                field_template(FieldKind::Pond, 1, 1, 1),
            ],
            breeds: vec![BreedTemplate {
                animal: chicken(),
                start_number: 0,
                target_number: 2,
            }],
            harvest_targets: vec![HarvestTarget {
                kind: FieldKind::Farmland,
                target: 3,
            }],
        },
        factory: Some(FactorySetup {
            unlocked_positions: 2,
            target_unlocked_positions: 3,
            can_break: true,
            machines: vec![
                machine_template(1, 1),
                machine_template(2, 0),
                machine_template(3, 2),
            ],
            target_products: 5,
        }),
    }
}

// ===========================================================================
// Simulation builders
// ===========================================================================

/// A simulation of [`sample_setup`] driven by a manual clock starting at
/// `start_ms`. The clock handle is returned alongside.
pub fn sim_at(start_ms: u64) -> (ManualClock, Simulation) {
    let clock = ManualClock::new(start_ms);
    let sim = Simulation::new(&sample_setup(), Catalog::default(), Box::new(clock.clone()));
    (clock, sim)
}

/// An economy with the sample mission's targets and `money` in hand.
pub fn economy_with(money: u64) -> Economy {
    let setup = sample_setup();
    let mut economy = Economy::default();
    economy.init_mission(
        setup.id,
        MissionTarget {
            start_money: money,
            ..setup.target
        },
        setup.star_rule,
    );
    economy
}

// ===========================================================================
// Random sources
// ===========================================================================

/// Replays a fixed sequence of raw values, then repeats the last one.
#[derive(Debug, Clone)]
pub struct ScriptedRolls {
    values: Vec<u64>,
    next: usize,
}

impl ScriptedRolls {
    pub fn new(values: Vec<u64>) -> Self {
        Self { values, next: 0 }
    }

    /// Every `chance` roll succeeds for any positive probability.
    pub fn always() -> Self {
        Self::new(vec![0])
    }

    /// Every `chance` roll below certainty fails.
    pub fn never() -> Self {
        Self::new(vec![u64::MAX])
    }
}

impl RandomSource for ScriptedRolls {
    fn next_u64(&mut self) -> u64 {
        let value = self
            .values
            .get(self.next)
            .or(self.values.last())
            .copied()
            .unwrap_or(0);
        self.next += 1;
        value
    }
}
