//! Immutable mission configuration, as delivered by the config adapters.
//!
//! Nothing here changes after a mission starts. Live values (money, levels,
//! harvest counts) are read from the aggregates, never mirrored here.

use crate::goal::{Goal, GoalSubject};
use crate::id::{CropId, FieldKind, FieldRef, MachineTypeId, MissionId};
use serde::{Deserialize, Serialize};

/// Which live value drives the star rating and progress bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StarMetric {
    #[default]
    Money,
    Satisfaction,
}

/// Money, time and satisfaction targets for a mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionTarget {
    pub start_money: u64,
    pub target_money: u64,
    /// The mission is lost once the day counter reaches this value.
    pub max_days: u32,
    pub max_customer: u32,
    /// Required satisfaction, in percent.
    pub target_satisfaction: u32,
    pub items_in_shop: Vec<u32>,
    pub start_scene: u32,
    pub star_metric: StarMetric,
}

impl Default for MissionTarget {
    fn default() -> Self {
        Self {
            start_money: 0,
            target_money: 0,
            max_days: 0,
            max_customer: 100,
            target_satisfaction: 0,
            items_in_shop: Vec::new(),
            start_scene: 1,
            star_metric: StarMetric::Money,
        }
    }
}

/// Thresholds and rewards for the 1-3 star rating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarRule {
    pub two_star: u64,
    pub three_star: u64,
    pub reward: [u64; 3],
}

impl StarRule {
    /// Rate a value. The three-star threshold is checked first, so a value
    /// equal to a threshold earns that tier.
    pub fn star_for(&self, value: u64) -> u8 {
        if value >= self.three_star {
            3
        } else if value >= self.two_star {
            2
        } else {
            1
        }
    }

    /// Reward for a star count in 1..=3; zero otherwise.
    pub fn reward_for(&self, star: u8) -> u64 {
        match star {
            1..=3 => self.reward[(star - 1) as usize],
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Farm templates
// ---------------------------------------------------------------------------

/// One configured field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTemplate {
    pub kind: FieldKind,
    /// Number of crop slots the field is built with.
    pub start_slots: u32,
    pub target_slots: u32,
    pub start_level: u32,
    pub target_level: u32,
    pub max_level: u32,
}

/// An animal the mission asks the player to raise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreedTemplate {
    pub animal: CropId,
    pub start_number: u32,
    pub target_number: u32,
}

/// Number of harvests required from fields of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestTarget {
    pub kind: FieldKind,
    pub target: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarmSetup {
    pub can_sick: bool,
    pub fields: Vec<FieldTemplate>,
    pub breeds: Vec<BreedTemplate>,
    pub harvest_targets: Vec<HarvestTarget>,
}

// ---------------------------------------------------------------------------
// Factory templates
// ---------------------------------------------------------------------------

/// One configured production slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineTemplate {
    pub machine_id: MachineTypeId,
    /// Position in the mission data, before sorting by machine id. Positions
    /// below [`FactorySetup::unlocked_positions`] start unlocked.
    pub config_index: usize,
    pub start_number: u32,
    pub target_number: u32,
    pub start_level: u32,
    pub target_level: u32,
    pub max_level: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorySetup {
    pub unlocked_positions: usize,
    pub target_unlocked_positions: usize,
    pub can_break: bool,
    pub machines: Vec<MachineTemplate>,
    pub target_products: u32,
}

/// Everything needed to start a mission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionSetup {
    pub id: MissionId,
    pub target: MissionTarget,
    pub star_rule: StarRule,
    pub farm: FarmSetup,
    pub factory: Option<FactorySetup>,
}

impl MissionSetup {
    /// Derive the mission's goals from the configured targets. Templates whose
    /// target does not exceed their start produce no goal.
    pub fn goals(&self) -> Vec<Goal> {
        let mut goals = Vec::new();
        if self.target.target_money > 0 {
            goals.push(Goal::Money {
                target: self.target.target_money,
            });
        }
        if self.target.target_satisfaction > 0 {
            goals.push(Goal::Satisfaction {
                target: self.target.target_satisfaction,
            });
        }

        // Slot counts never change at runtime, so a field contributes only a
        // level goal.
        let mut per_kind = [0usize; 3];
        for field in &self.farm.fields {
            let slot = &mut per_kind[field.kind.config_id() as usize - 1];
            let subject = GoalSubject::Field(FieldRef::new(field.kind, *slot));
            *slot += 1;
            if field.target_level > field.start_level {
                goals.push(Goal::Level {
                    subject,
                    target: field.target_level,
                });
            }
        }
        for breed in &self.farm.breeds {
            if breed.target_number > 0 {
                goals.push(Goal::Count {
                    subject: GoalSubject::Breed(breed.animal),
                    target: breed.target_number,
                });
            }
        }
        for harvest in &self.farm.harvest_targets {
            if harvest.target > 0 {
                goals.push(Goal::Count {
                    subject: GoalSubject::Harvest(harvest.kind),
                    target: harvest.target,
                });
            }
        }

        if let Some(factory) = &self.factory {
            for (position, machine) in factory.machines.iter().enumerate() {
                if machine.target_level > machine.start_level {
                    goals.push(Goal::Level {
                        subject: GoalSubject::Machine(position),
                        target: machine.target_level,
                    });
                }
                if machine.target_number > machine.start_number {
                    goals.push(Goal::Count {
                        subject: GoalSubject::MachineType(machine.machine_id),
                        target: machine.target_number,
                    });
                }
            }
            if factory.target_unlocked_positions > 0 {
                goals.push(Goal::Count {
                    subject: GoalSubject::UnlockedPositions,
                    target: factory.target_unlocked_positions as u32,
                });
            }
            if factory.target_products > 0 {
                goals.push(Goal::Count {
                    subject: GoalSubject::Products,
                    target: factory.target_products,
                });
            }
        }
        goals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule() -> StarRule {
        StarRule {
            two_star: 100,
            three_star: 200,
            reward: [10, 20, 30],
        }
    }

    #[test]
    fn star_thresholds_round_up_at_boundaries() {
        let rule = rule();
        assert_eq!(rule.star_for(50), 1);
        assert_eq!(rule.star_for(99), 1);
        assert_eq!(rule.star_for(100), 2);
        assert_eq!(rule.star_for(150), 2);
        assert_eq!(rule.star_for(200), 3);
        assert_eq!(rule.star_for(250), 3);
    }

    #[test]
    fn rewards_by_star() {
        let rule = rule();
        assert_eq!(rule.reward_for(1), 10);
        assert_eq!(rule.reward_for(3), 30);
        assert_eq!(rule.reward_for(0), 0);
        assert_eq!(rule.reward_for(4), 0);
    }

    #[test]
    fn goals_skip_targets_already_met() {
        let setup = MissionSetup {
            target: MissionTarget {
                target_money: 1_000,
                ..MissionTarget::default()
            },
            farm: FarmSetup {
                fields: vec![
                    FieldTemplate {
                        kind: FieldKind::Farmland,
                        start_slots: 3,
                        target_slots: 3,
                        start_level: 1,
                        target_level: 2,
                        max_level: 3,
                    },
                    FieldTemplate {
                        kind: FieldKind::Farmland,
                        start_slots: 2,
                        target_slots: 4,
                        start_level: 1,
                        target_level: 1,
                        max_level: 1,
                    },
                ],
                harvest_targets: vec![HarvestTarget {
                    kind: FieldKind::Pen,
                    target: 5,
                }],
                ..FarmSetup::default()
            },
            ..MissionSetup::default()
        };

        let goals = setup.goals();
        assert_eq!(
            goals,
            vec![
                Goal::Money { target: 1_000 },
                Goal::Level {
                    subject: GoalSubject::Field(FieldRef::new(FieldKind::Farmland, 0)),
                    target: 2,
                },
                Goal::Count {
                    subject: GoalSubject::Harvest(FieldKind::Pen),
                    target: 5,
                },
            ]
        );
    }
}
