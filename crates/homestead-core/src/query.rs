//! Read-only query API for inspecting simulation state.
//!
//! Snapshot types are owned copies for UI and tooling; nothing here borrows
//! from the aggregates.

use crate::crop::{Crop, CropState};
use crate::economy::Economy;
use crate::farm::Field;
use crate::fixed::{Fixed64, Timestamp};
use crate::id::{CropId, FieldKind, MachineTypeId, MissionId, ProductId};
use crate::machine::{Machine, MachineState};

// ---------------------------------------------------------------------------
// Farm snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropSnapshot {
    pub crop_id: CropId,
    pub state: CropState,
    /// Percentage in [0, 100].
    pub growth_progress: Fixed64,
    pub planted_at: Option<Timestamp>,
    pub was_sick: bool,
}

impl From<&Crop> for CropSnapshot {
    fn from(crop: &Crop) -> Self {
        Self {
            crop_id: crop.crop_id,
            state: crop.state,
            growth_progress: crop.growth_progress,
            planted_at: crop.planted_at,
            was_sick: crop.was_sick,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSnapshot {
    pub kind: FieldKind,
    pub index: usize,
    pub current_level: u32,
    pub max_level: u32,
    pub slots: Vec<CropSnapshot>,
    pub empty_slots: usize,
    pub mature_slots: usize,
}

impl From<&Field> for FieldSnapshot {
    fn from(field: &Field) -> Self {
        Self {
            kind: field.kind,
            index: field.index,
            current_level: field.current_level,
            max_level: field.max_level,
            slots: field.slots().iter().map(CropSnapshot::from).collect(),
            empty_slots: field.empty_slot_count(),
            mature_slots: field.mature_count(),
        }
    }
}

// ---------------------------------------------------------------------------
// Factory snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSnapshot {
    pub position: usize,
    pub machine_id: MachineTypeId,
    pub current_level: u32,
    pub max_level: u32,
    pub state: MachineState,
    pub in_flight: Option<ProductId>,
    /// Progress of the in-flight product, 0 when there is none.
    pub progress: Fixed64,
    pub queue: Vec<ProductId>,
    pub capacity: usize,
    pub remaining_space: usize,
}

impl MachineSnapshot {
    pub fn new(position: usize, machine: &Machine) -> Self {
        Self {
            position,
            machine_id: machine.machine_id,
            current_level: machine.current_level,
            max_level: machine.max_level,
            state: machine.state,
            in_flight: machine.in_flight.as_ref().map(|product| product.product_id),
            progress: machine.progress(),
            queue: machine.queued_ids(),
            capacity: machine.capacity(),
            remaining_space: machine.remaining_space(),
        }
    }
}

// ---------------------------------------------------------------------------
// Economy snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EconomySnapshot {
    pub mission_id: MissionId,
    pub money: u64,
    pub day: u32,
    pub max_days: Option<u32>,
    pub star: u8,
    pub satisfaction: u32,
    /// Towards the active star metric's target, capped at 100.
    pub progress_percent: Fixed64,
    pub is_game_over: bool,
    pub is_mission_complete: bool,
}

impl From<&Economy> for EconomySnapshot {
    fn from(economy: &Economy) -> Self {
        let state = economy.state();
        Self {
            mission_id: state.mission_id,
            money: state.money,
            day: state.day,
            max_days: economy.target().map(|target| target.max_days),
            star: state.star,
            satisfaction: state.satisfaction,
            progress_percent: economy.progress_percent(),
            is_game_over: state.is_game_over,
            is_mission_complete: state.is_mission_complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::{MissionTarget, StarRule};

    #[test]
    fn field_snapshot_counts_slots() {
        let mut field = Field::new(FieldKind::Farmland, 0, 3, 1, 2);
        let mut farm_crop = Crop::empty();
        farm_crop.plant(CropId(4), Timestamp::ZERO).unwrap();
        let snapshot = FieldSnapshot::from(&field);
        assert_eq!(snapshot.slots.len(), 3);
        assert_eq!(snapshot.empty_slots, 3);
        assert_eq!(snapshot.mature_slots, 0);
        assert_eq!(snapshot.slots[0], CropSnapshot::from(&Crop::empty()));
        field.current_level = 2;
        assert_eq!(FieldSnapshot::from(&field).current_level, 2);
        assert_eq!(CropSnapshot::from(&farm_crop).state, CropState::Growing);
    }

    #[test]
    fn machine_snapshot_copies_queue() {
        let mut machine = Machine::new(MachineTypeId(2), 0, 2, 4, true);
        machine.enqueue(ProductId(1), Timestamp::ZERO).unwrap();
        machine.enqueue(ProductId(3), Timestamp::ZERO).unwrap();
        let snapshot = MachineSnapshot::new(4, &machine);
        assert_eq!(snapshot.position, 4);
        assert_eq!(snapshot.in_flight, Some(ProductId(1)));
        assert_eq!(snapshot.queue, vec![ProductId(3)]);
        assert_eq!(snapshot.capacity, 6);
        assert_eq!(snapshot.remaining_space, 4);
        assert_eq!(snapshot.state, MachineState::Producing);
    }

    #[test]
    fn economy_snapshot_includes_progress() {
        let mut economy = Economy::default();
        economy.init_mission(
            MissionId(9),
            MissionTarget {
                start_money: 250,
                target_money: 1_000,
                max_days: 3,
                ..MissionTarget::default()
            },
            StarRule::default(),
        );
        let snapshot = EconomySnapshot::from(&economy);
        assert_eq!(snapshot.mission_id, MissionId(9));
        assert_eq!(snapshot.money, 250);
        assert_eq!(snapshot.max_days, Some(3));
        assert_eq!(snapshot.progress_percent, Fixed64::from_num(25));
    }
}
