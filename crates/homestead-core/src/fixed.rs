use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Wall-clock milliseconds are the atomic unit of simulation time.
pub type Millis = u64;

/// 100% as a fixed-point value. Progress values never exceed it.
pub const HUNDRED: Fixed64 = Fixed64::from_bits(100_i64 << 32);

/// A point in wall-clock time, in milliseconds since an arbitrary epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(pub Millis);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub fn millis(self) -> Millis {
        self.0
    }

    /// Milliseconds elapsed since `earlier`. Zero if `earlier` is in the future.
    pub fn elapsed_since(self, earlier: Timestamp) -> Millis {
        self.0.saturating_sub(earlier.0)
    }

    pub fn add_millis(self, ms: Millis) -> Self {
        Self(self.0.saturating_add(ms))
    }

    /// Move the timestamp back by `ms`, clamped at the epoch.
    pub fn rewind(self, ms: Millis) -> Self {
        Self(self.0.saturating_sub(ms))
    }
}

/// Convert whole seconds to milliseconds.
#[inline]
pub fn secs_to_millis(secs: u64) -> Millis {
    secs.saturating_mul(1000)
}

/// `min(100, 100 * part / whole)` as a fixed-point percentage.
///
/// A zero `whole` counts as already complete. Computed in integer space so the
/// result is exact to the last fractional bit and never overflows.
pub fn percent_of(part: u64, whole: u64) -> Fixed64 {
    if whole == 0 || part >= whole {
        return HUNDRED;
    }
    let bits = ((part as u128 * 100) << 32) / whole as u128;
    Fixed64::from_bits(bits as i64)
}

/// Convert an f64 to Fixed64. Use only for configuration, never in the step loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}
