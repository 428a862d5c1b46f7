//! Per-crop and per-product timing and prices.
//!
//! Anything not listed falls back to the catalog defaults: crops grow in 60
//! seconds and sell for 10, products take 10 seconds at level 0 and sell for
//! nothing.

use crate::fixed::{Millis, secs_to_millis};
use crate::id::{CropId, ProductId};
use std::collections::HashMap;

pub const DEFAULT_GROWTH_SECS: u64 = 60;
pub const DEFAULT_CROP_PRICE: u64 = 10;
pub const DEFAULT_PRODUCTION_SECS: u64 = 10;
pub const DEFAULT_PRODUCT_PRICE: u64 = 0;

/// Production never gets faster than this, however high the machine level.
pub const MIN_PRODUCTION_MILLIS: Millis = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSpec {
    pub growth_secs: u64,
    pub sell_price: u64,
}

impl Default for CropSpec {
    fn default() -> Self {
        Self {
            growth_secs: DEFAULT_GROWTH_SECS,
            sell_price: DEFAULT_CROP_PRICE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductSpec {
    /// Production time of a level-0 machine.
    pub production_secs: u64,
    pub sell_price: u64,
}

impl Default for ProductSpec {
    fn default() -> Self {
        Self {
            production_secs: DEFAULT_PRODUCTION_SECS,
            sell_price: DEFAULT_PRODUCT_PRICE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub crops: HashMap<CropId, CropSpec>,
    pub products: HashMap<ProductId, ProductSpec>,
    pub default_crop: CropSpec,
    pub default_product: ProductSpec,
}

impl Catalog {
    pub fn with_crop(mut self, id: CropId, spec: CropSpec) -> Self {
        self.crops.insert(id, spec);
        self
    }

    pub fn with_product(mut self, id: ProductId, spec: ProductSpec) -> Self {
        self.products.insert(id, spec);
        self
    }

    pub fn crop(&self, id: CropId) -> CropSpec {
        self.crops.get(&id).copied().unwrap_or(self.default_crop)
    }

    pub fn product(&self, id: ProductId) -> ProductSpec {
        self.products.get(&id).copied().unwrap_or(self.default_product)
    }

    pub fn growth_millis(&self, id: CropId) -> Millis {
        secs_to_millis(self.crop(id).growth_secs)
    }

    pub fn crop_price(&self, id: CropId) -> u64 {
        self.crop(id).sell_price
    }

    /// Production time on a machine of `level`: 10% faster per level, never
    /// below [`MIN_PRODUCTION_MILLIS`].
    pub fn production_millis(&self, id: ProductId, level: u32) -> Millis {
        let base = secs_to_millis(self.product(id).production_secs);
        let speedup = u64::from(level.min(10)) * 10;
        let scaled = base.saturating_mul(100 - speedup) / 100;
        scaled.max(MIN_PRODUCTION_MILLIS)
    }

    pub fn product_price(&self, id: ProductId) -> u64 {
        self.product(id).sell_price
    }
}
