//! Turns parsed data records into the core's mission setup and catalog.
//!
//! Validation and defaulting only: a record missing `id` or `targetCommon`
//! is rejected, everything else falls back to the editor's defaults.

use crate::loader::{self, DataLoadError, Format};
use crate::schema::*;
use homestead_core::catalog::{Catalog, CropSpec, ProductSpec};
use homestead_core::id::{CropId, FieldKind, MachineTypeId, MissionId, ProductId};
use homestead_core::mission::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

// ===========================================================================
// Missions
// ===========================================================================

/// Build a mission setup from a parsed record. `file` only labels errors.
pub fn mission_setup(data: &MissionData, file: &Path) -> Result<MissionSetup, DataLoadError> {
    let id = data
        .id
        .filter(|id| *id != 0)
        .ok_or_else(|| missing(file, "id"))?;
    let target_common = data
        .target_common
        .as_ref()
        .ok_or_else(|| missing(file, "targetCommon"))?;

    let setup = MissionSetup {
        id: MissionId(id),
        target: mission_target(target_common),
        star_rule: star_rule(&data.star_condition),
        farm: farm_setup(&data.farm_data, file)?,
        factory: data.factory_data.as_ref().map(factory_setup),
    };

    info!(
        mission = id,
        fields = setup.farm.fields.len(),
        machines = setup.factory.as_ref().map_or(0, |f| f.machines.len()),
        "mission config adapted"
    );
    Ok(setup)
}

/// Parse and adapt a mission record held in memory.
pub fn mission_from_str(content: &str, format: Format) -> Result<MissionSetup, DataLoadError> {
    let label = Path::new("<inline>");
    let data: MissionData = loader::deserialize_str(content, format, label)?;
    mission_setup(&data, label)
}

/// Load and adapt a mission file, format picked by extension.
pub fn load_mission(path: &Path) -> Result<MissionSetup, DataLoadError> {
    let data: MissionData = loader::deserialize_file(path)?;
    mission_setup(&data, path)
}

/// Load `mission_{level}.{ron,json,toml}` from `dir`.
pub fn load_mission_level(dir: &Path, level: u32) -> Result<MissionSetup, DataLoadError> {
    let path = loader::require_data_file(dir, &loader::mission_file_name(level))?;
    load_mission(&path)
}

fn missing(file: &Path, field: &'static str) -> DataLoadError {
    DataLoadError::MissingField {
        file: file.to_path_buf(),
        field,
    }
}

fn mission_target(data: &TargetCommonData) -> MissionTarget {
    // An explicit metric wins; otherwise a satisfaction target implies rating
    // by satisfaction.
    let star_metric = match data.star_metric {
        Some(StarMetricData::Money) => StarMetric::Money,
        Some(StarMetricData::Satisfaction) => StarMetric::Satisfaction,
        None if data.target_customer_rate > 0 => StarMetric::Satisfaction,
        None => StarMetric::Money,
    };
    MissionTarget {
        start_money: data.start_money,
        target_money: data.target_money,
        max_days: data.time_mission,
        max_customer: data.max_customer,
        target_satisfaction: data.target_customer_rate,
        items_in_shop: data.items_in_shop.clone(),
        start_scene: data.start_scene,
        star_metric,
    }
}

fn star_rule(data: &StarConditionData) -> StarRule {
    let mut reward = [0; 3];
    for (slot, value) in reward.iter_mut().zip(&data.reward) {
        *slot = *value;
    }
    StarRule {
        two_star: data.two_star,
        three_star: data.three_star,
        reward,
    }
}

/// Start, target and max level with the editor's rules applied: absent or
/// zero levels become 1, and `max` is raised to at least `target`.
fn levels(start: Option<u32>, target: Option<u32>, max: Option<u32>) -> (u32, u32, u32) {
    let level = |value: Option<u32>| value.filter(|v| *v > 0).unwrap_or(1);
    let (start, target, max) = (level(start), level(target), level(max));
    if max < target {
        debug!(max, target, "max level raised to target level");
    }
    (start, target, max.max(target))
}

// ---------------------------------------------------------------------------
// Farm
// ---------------------------------------------------------------------------

fn farm_setup(data: &FarmData, file: &Path) -> Result<FarmSetup, DataLoadError> {
    let fields = data
        .fields
        .iter()
        .map(|field| field_template(field, file))
        .collect::<Result<Vec<_>, _>>()?;

    let breeds = data
        .breeds
        .iter()
        .map(|breed| BreedTemplate {
            animal: CropId(breed.id_breed),
            start_number: breed.start_number,
            target_number: breed.target_number,
        })
        .collect();

    let mut harvest_targets = Vec::new();
    for (harvest, fallback) in [
        (&data.harvest_field, FieldKind::Farmland),
        (&data.harvest_cage, FieldKind::Pen),
    ] {
        if let Some(harvest) = harvest {
            let kind = match harvest.id_field {
                Some(id) => field_kind(id, file)?,
                None => fallback,
            };
            harvest_targets.push(HarvestTarget {
                kind,
                target: harvest.target_number,
            });
        }
    }

    Ok(FarmSetup {
        can_sick: data.is_can_sick,
        fields,
        breeds,
        harvest_targets,
    })
}

fn field_kind(id: u32, file: &Path) -> Result<FieldKind, DataLoadError> {
    FieldKind::from_config_id(id).ok_or_else(|| DataLoadError::UnknownFieldKind {
        file: file.to_path_buf(),
        kind: id,
    })
}

fn field_template(data: &FieldData, file: &Path) -> Result<FieldTemplate, DataLoadError> {
    let (start_level, target_level, max_level) =
        levels(data.start_level, data.target_level, data.max_level);
    Ok(FieldTemplate {
        kind: field_kind(data.id_field, file)?,
        start_slots: data.start_number,
        target_slots: data.target_number,
        start_level,
        target_level,
        max_level,
    })
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

fn factory_setup(data: &FactoryData) -> FactorySetup {
    let mut machines: Vec<MachineTemplate> = data
        .machines
        .iter()
        .enumerate()
        .map(|(config_index, machine)| {
            let (start_level, target_level, max_level) =
                levels(machine.start_level, machine.target_level, machine.max_level);
            MachineTemplate {
                machine_id: MachineTypeId(machine.id),
                config_index,
                start_number: machine.start_number,
                target_number: machine.target_number,
                start_level,
                target_level,
                max_level,
            }
        })
        .collect();
    // Positions follow machine id; the stable sort keeps config order among
    // equal ids.
    machines.sort_by_key(|machine| machine.machine_id);

    let target_products = data
        .target_products
        .filter(|n| *n > 0)
        .or(data.target_productions)
        .unwrap_or(0);

    let unlock = &data.position_unlock;
    if unlock.position_unlock_begin > machines.len() {
        warn!(
            unlocked = unlock.position_unlock_begin,
            machines = machines.len(),
            "more positions unlocked than machines configured"
        );
    }

    FactorySetup {
        unlocked_positions: unlock.position_unlock_begin,
        target_unlocked_positions: unlock.target_position_unlock,
        can_break: unlock.is_can_break,
        machines,
        target_products,
    }
}

// ===========================================================================
// Catalog
// ===========================================================================

/// Build a catalog from a parsed record. Ids listed twice are rejected.
pub fn catalog(data: &CatalogData, file: &Path) -> Result<Catalog, DataLoadError> {
    let mut catalog = Catalog::default();
    if let Some(defaults) = &data.default_crop {
        catalog.default_crop = CropSpec {
            growth_secs: defaults.growth_seconds,
            sell_price: defaults.sell_price,
        };
    }
    if let Some(defaults) = &data.default_product {
        catalog.default_product = ProductSpec {
            production_secs: defaults.production_seconds,
            sell_price: defaults.sell_price,
        };
    }

    let mut seen = HashSet::new();
    for crop in &data.crops {
        if !seen.insert(crop.id) {
            return Err(duplicate(file, "crop", crop.id));
        }
        let spec = CropSpec {
            growth_secs: crop.growth_seconds.unwrap_or(catalog.default_crop.growth_secs),
            sell_price: crop.sell_price.unwrap_or(catalog.default_crop.sell_price),
        };
        catalog = catalog.with_crop(CropId(crop.id), spec);
    }

    seen.clear();
    for product in &data.products {
        if !seen.insert(product.id) {
            return Err(duplicate(file, "product", product.id));
        }
        let spec = ProductSpec {
            production_secs: product
                .production_seconds
                .unwrap_or(catalog.default_product.production_secs),
            sell_price: product.sell_price.unwrap_or(catalog.default_product.sell_price),
        };
        catalog = catalog.with_product(ProductId(product.id), spec);
    }

    debug!(
        crops = catalog.crops.len(),
        products = catalog.products.len(),
        "catalog adapted"
    );
    Ok(catalog)
}

/// Load and adapt a catalog file, format picked by extension.
pub fn load_catalog(path: &Path) -> Result<Catalog, DataLoadError> {
    let data: CatalogData = loader::deserialize_file(path)?;
    catalog(&data, path)
}

fn duplicate(file: &Path, kind: &'static str, id: u32) -> DataLoadError {
    DataLoadError::DuplicateId {
        file: file.to_path_buf(),
        kind,
        id,
    }
}
