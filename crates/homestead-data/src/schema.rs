//! Serde structs for mission and catalog data files.
//!
//! Key names follow the level editor's camelCase output, including its
//! historical spellings (`iDMachine`, `targetProductions`, `harvestCage`).
//! Everything optional here is defaulted by the adapter, not by serde, so the
//! adapter can tell "absent" from "zero" where that matters.

use serde::Deserialize;

// ===========================================================================
// Mission record
// ===========================================================================

/// One mission as written by the level editor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionData {
    pub id: Option<u32>,
    pub target_common: Option<TargetCommonData>,
    #[serde(default)]
    pub star_condition: StarConditionData,
    #[serde(default)]
    pub farm_data: FarmData,
    pub factory_data: Option<FactoryData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetCommonData {
    #[serde(default)]
    pub start_money: u64,
    #[serde(default)]
    pub target_money: u64,
    /// Mission length in days.
    #[serde(default)]
    pub time_mission: u32,
    #[serde(default = "default_max_customer")]
    pub max_customer: u32,
    #[serde(default)]
    pub target_customer_rate: u32,
    #[serde(default)]
    pub items_in_shop: Vec<u32>,
    #[serde(default = "default_start_scene")]
    pub start_scene: u32,
    pub star_metric: Option<StarMetricData>,
}

fn default_max_customer() -> u32 {
    100
}

fn default_start_scene() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarMetricData {
    Money,
    Satisfaction,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StarConditionData {
    #[serde(default)]
    pub two_star: u64,
    #[serde(default)]
    pub three_star: u64,
    /// Rewards for one, two and three stars. Missing entries count as zero.
    #[serde(default)]
    pub reward: Vec<u64>,
}

// ===========================================================================
// Farm
// ===========================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmData {
    #[serde(default)]
    pub is_can_sick: bool,
    #[serde(default)]
    pub fields: Vec<FieldData>,
    #[serde(default)]
    pub breeds: Vec<BreedData>,
    /// Farmland harvest target.
    pub harvest_field: Option<HarvestData>,
    /// Pen harvest target.
    pub harvest_cage: Option<HarvestData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldData {
    /// 1 = farmland, 2 = pen, 3 = pond.
    #[serde(alias = "id")]
    pub id_field: u32,
    #[serde(default)]
    pub start_number: u32,
    #[serde(default)]
    pub target_number: u32,
    pub start_level: Option<u32>,
    pub target_level: Option<u32>,
    pub max_level: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreedData {
    pub id_breed: u32,
    #[serde(default)]
    pub start_number: u32,
    #[serde(default)]
    pub target_number: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestData {
    pub id_field: Option<u32>,
    #[serde(default)]
    pub target_number: u32,
}

// ===========================================================================
// Factory
// ===========================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryData {
    #[serde(default)]
    pub position_unlock: PositionUnlockData,
    #[serde(default)]
    pub machines: Vec<MachineData>,
    pub target_products: Option<u32>,
    /// Older spelling of `targetProducts`.
    pub target_productions: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionUnlockData {
    #[serde(default, rename = "positionUnLockBegin")]
    pub position_unlock_begin: usize,
    #[serde(default)]
    pub target_position_unlock: usize,
    #[serde(default)]
    pub is_can_break: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineData {
    #[serde(default, alias = "iDMachine")]
    pub id: u32,
    #[serde(default)]
    pub start_number: u32,
    #[serde(default)]
    pub target_number: u32,
    pub start_level: Option<u32>,
    pub target_level: Option<u32>,
    pub max_level: Option<u32>,
}

// ===========================================================================
// Catalog
// ===========================================================================

/// Per-crop and per-product timing and prices. Entries not listed use the
/// core catalog defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogData {
    #[serde(default)]
    pub crops: Vec<CropData>,
    #[serde(default)]
    pub products: Vec<ProductData>,
    pub default_crop: Option<CropDefaultsData>,
    pub default_product: Option<ProductDefaultsData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropData {
    pub id: u32,
    pub growth_seconds: Option<u64>,
    pub sell_price: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub id: u32,
    pub production_seconds: Option<u64>,
    pub sell_price: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropDefaultsData {
    pub growth_seconds: u64,
    pub sell_price: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDefaultsData {
    pub production_seconds: u64,
    pub sell_price: u64,
}
