//! One crop slot and its growth state machine.
//!
//! ```text
//! Empty --plant--> Growing --(progress 100)--> Mature --harvest--> Empty
//!                     |  ^                      |  ^
//!                  sick  cure                sick  cure
//!                     v  |                      v  |
//!                  Sick{was_mature: false}   Sick{was_mature: true}
//! ```

use crate::error::{ActionError, Rejection};
use crate::fixed::{Fixed64, HUNDRED, Millis, Timestamp, percent_of, secs_to_millis};
use crate::id::CropId;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CropState {
    #[default]
    Empty,
    Growing,
    Mature,
    /// Sickness pre-empts growth or maturity; `was_mature` selects which
    /// state a cure restores.
    Sick { was_mature: bool },
}

/// Runtime state of one slot. `crop_id` is `CropId::EMPTY` exactly when the
/// state is `Empty`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crop {
    pub crop_id: CropId,
    pub planted_at: Option<Timestamp>,
    /// Percentage in [0, 100], derived from `planted_at`.
    pub growth_progress: Fixed64,
    pub state: CropState,
    /// Set once the crop has been sick during the current cycle.
    pub was_sick: bool,
}

impl Crop {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.state == CropState::Empty
    }

    pub fn is_growing(&self) -> bool {
        self.state == CropState::Growing
    }

    pub fn is_mature(&self) -> bool {
        self.state == CropState::Mature
    }

    pub fn is_sick(&self) -> bool {
        matches!(self.state, CropState::Sick { .. })
    }

    pub fn plant(&mut self, crop_id: CropId, now: Timestamp) -> Result<(), ActionError> {
        if crop_id.is_empty() {
            return Err(Rejection::InvalidCrop.into());
        }
        if !self.is_empty() {
            return Err(Rejection::SlotOccupied.into());
        }
        *self = Crop {
            crop_id,
            planted_at: Some(now),
            growth_progress: Fixed64::ZERO,
            state: CropState::Growing,
            was_sick: false,
        };
        Ok(())
    }

    /// Recompute progress from the planting timestamp. Returns `true` when
    /// this call moved the crop to `Mature`.
    ///
    /// Only growing crops are touched. Calling this repeatedly with the same
    /// `now` always yields the same progress.
    pub fn recompute(&mut self, now: Timestamp, total_growth: Millis) -> bool {
        if !self.is_growing() {
            return false;
        }
        let Some(planted_at) = self.planted_at else {
            return false;
        };
        let progress = percent_of(now.elapsed_since(planted_at), total_growth);
        if progress >= HUNDRED {
            self.growth_progress = HUNDRED;
            self.state = CropState::Mature;
            true
        } else {
            self.growth_progress = progress;
            false
        }
    }

    pub fn set_sick(&mut self) -> Result<(), ActionError> {
        match self.state {
            CropState::Empty => Err(Rejection::SlotEmpty.into()),
            CropState::Sick { .. } => Err(Rejection::AlreadySick.into()),
            CropState::Growing | CropState::Mature => {
                self.state = CropState::Sick {
                    was_mature: self.growth_progress >= HUNDRED,
                };
                self.was_sick = true;
                Ok(())
            }
        }
    }

    pub fn cure(&mut self) -> Result<(), ActionError> {
        match self.state {
            CropState::Sick { was_mature } => {
                self.state = if was_mature {
                    CropState::Mature
                } else {
                    CropState::Growing
                };
                Ok(())
            }
            _ => Err(Rejection::NotSick.into()),
        }
    }

    /// Take the crop out of a mature slot, leaving it empty.
    pub fn harvest(&mut self) -> Result<CropId, ActionError> {
        if !self.is_mature() {
            return Err(Rejection::NotMature.into());
        }
        let id = self.crop_id;
        *self = Crop::empty();
        Ok(id)
    }

    /// Pretend `secs` more seconds have passed since planting.
    pub fn accelerate(&mut self, secs: u64) -> Result<(), ActionError> {
        if !self.is_growing() {
            return Err(Rejection::NotGrowing.into());
        }
        if let Some(planted_at) = self.planted_at {
            self.planted_at = Some(planted_at.rewind(secs_to_millis(secs)));
        }
        Ok(())
    }

    /// Milliseconds since planting, or zero for an empty slot.
    pub fn grown_millis(&self, now: Timestamp) -> Millis {
        self.planted_at
            .map(|planted_at| now.elapsed_since(planted_at))
            .unwrap_or(0)
    }
}
