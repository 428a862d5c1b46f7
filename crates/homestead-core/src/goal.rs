//! Mission goals, evaluated against live aggregate state.

use crate::economy::Economy;
use crate::factory::Factory;
use crate::farm::Farm;
use crate::id::{CropId, FieldKind, FieldRef, MachineTypeId};
use serde::{Deserialize, Serialize};

/// What a level or count goal measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalSubject {
    /// A field's level, or its number of occupied slots.
    Field(FieldRef),
    /// A machine's level, by factory position.
    Machine(usize),
    /// Products completed by machines of one type.
    MachineType(MachineTypeId),
    /// Harvests from fields of one kind.
    Harvest(FieldKind),
    /// Animals of one kind placed in pens and ponds.
    Breed(CropId),
    /// Products completed by the whole factory.
    Products,
    /// Unlocked machine positions.
    UnlockedPositions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    Money { target: u64 },
    Satisfaction { target: u32 },
    Level { subject: GoalSubject, target: u32 },
    Count { subject: GoalSubject, target: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalProgress {
    pub current: u64,
    pub target: u64,
    pub reached: bool,
}

impl GoalProgress {
    fn new(current: u64, target: u64) -> Self {
        Self {
            current,
            target,
            reached: current >= target,
        }
    }
}

impl Goal {
    pub fn evaluate(&self, farm: &Farm, factory: &Factory, economy: &Economy) -> GoalProgress {
        match *self {
            Goal::Money { target } => GoalProgress::new(economy.money(), target),
            Goal::Satisfaction { target } => {
                GoalProgress::new(u64::from(economy.satisfaction()), u64::from(target))
            }
            Goal::Level { subject, target } => {
                GoalProgress::new(level_of(subject, farm, factory), u64::from(target))
            }
            Goal::Count { subject, target } => {
                GoalProgress::new(count_of(subject, farm, factory), u64::from(target))
            }
        }
    }
}

fn level_of(subject: GoalSubject, farm: &Farm, factory: &Factory) -> u64 {
    let level = match subject {
        GoalSubject::Field(field) => farm.field(field).map_or(0, |f| f.current_level),
        GoalSubject::Machine(position) => factory.machine(position).map_or(0, |m| m.current_level),
        GoalSubject::MachineType(machine_id) => factory
            .machines()
            .iter()
            .filter(|m| m.machine_id == machine_id)
            .map(|m| m.current_level)
            .max()
            .unwrap_or(0),
        _ => 0,
    };
    u64::from(level)
}

fn count_of(subject: GoalSubject, farm: &Farm, factory: &Factory) -> u64 {
    let count = match subject {
        GoalSubject::Field(field) => farm.field(field).map_or(0, |f| f.occupied_count() as u32),
        GoalSubject::Machine(position) => factory
            .machine(position)
            .map_or(0, |m| factory.produced_by_type(m.machine_id)),
        GoalSubject::MachineType(machine_id) => factory.produced_by_type(machine_id),
        GoalSubject::Harvest(kind) => farm.harvest_count(kind),
        GoalSubject::Breed(animal) => farm.bred_count(animal),
        GoalSubject::Products => factory.total_produced(),
        GoalSubject::UnlockedPositions => factory.unlocked_count() as u32,
    };
    u64::from(count)
}
