use crate::fixed::{Fixed64, HUNDRED, Millis, Timestamp, percent_of};
use crate::id::ProductId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductState {
    #[default]
    Waiting,
    Producing,
    Completed,
}

/// One unit of factory output, from enqueue until it completes or is
/// cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub started_at: Option<Timestamp>,
    /// Percentage in [0, 100], derived from `started_at`.
    pub progress: Fixed64,
    pub state: ProductState,
}

impl Product {
    pub fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            started_at: None,
            progress: Fixed64::ZERO,
            state: ProductState::Waiting,
        }
    }

    pub fn start(&mut self, now: Timestamp) {
        self.started_at = Some(now);
        self.progress = Fixed64::ZERO;
        self.state = ProductState::Producing;
    }

    /// Recompute progress from the start timestamp. Returns `true` once the
    /// product has reached 100%.
    pub fn recompute(&mut self, now: Timestamp, duration: Millis) -> bool {
        if self.state != ProductState::Producing {
            return false;
        }
        let Some(started_at) = self.started_at else {
            return false;
        };
        self.progress = percent_of(now.elapsed_since(started_at), duration);
        self.progress >= HUNDRED
    }

    /// Return to `Waiting` with no progress, as if freshly enqueued.
    pub fn reset(&mut self) {
        self.started_at = None;
        self.progress = Fixed64::ZERO;
        self.state = ProductState::Waiting;
    }

    pub fn complete(&mut self) {
        self.progress = HUNDRED;
        self.state = ProductState::Completed;
    }

    pub fn is_completed(&self) -> bool {
        self.state == ProductState::Completed
    }
}
