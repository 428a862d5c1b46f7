//! Fields, crop slots, and the planting/breeding/harvesting rules.
//!
//! Fields are addressed by kind plus position among fields of that kind
//! ([`FieldRef`]); slots by field plus slot number ([`SlotRef`]). A field's
//! slot count is fixed when the mission is set up.

use crate::catalog::Catalog;
use crate::crop::Crop;
use crate::economy::Economy;
use crate::error::{ActionError, Rejection};
use crate::fixed::{Timestamp, secs_to_millis};
use crate::id::{CropId, FieldKind, FieldRef, SlotRef};
use crate::mission::FarmSetup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Default field upgrade cost per current level.
pub const FIELD_UPGRADE_COST_BASE: u64 = 100;

pub fn default_field_upgrade_cost(level: u32) -> u64 {
    FIELD_UPGRADE_COST_BASE * u64::from(level)
}

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub kind: FieldKind,
    /// Position among fields of the same kind.
    pub index: usize,
    pub current_level: u32,
    pub max_level: u32,
    slots: Vec<Crop>,
}

impl Field {
    pub fn new(
        kind: FieldKind,
        index: usize,
        slot_count: usize,
        level: u32,
        max_level: u32,
    ) -> Self {
        Self {
            kind,
            index,
            current_level: level,
            max_level,
            slots: vec![Crop::empty(); slot_count],
        }
    }

    pub fn field_ref(&self) -> FieldRef {
        FieldRef::new(self.kind, self.index)
    }

    pub fn slots(&self) -> &[Crop] {
        &self.slots
    }

    pub fn slot(&self, slot: usize) -> Option<&Crop> {
        self.slots.get(slot)
    }

    fn slot_mut(&mut self, slot: usize) -> Result<&mut Crop, ActionError> {
        self.slots.get_mut(slot).ok_or(ActionError::InvalidIndex)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn empty_slot_index(&self) -> Option<usize> {
        self.slots.iter().position(Crop::is_empty)
    }

    pub fn empty_slot_count(&self) -> usize {
        self.slots.iter().filter(|crop| crop.is_empty()).count()
    }

    pub fn mature_count(&self) -> usize {
        self.slots.iter().filter(|crop| crop.is_mature()).count()
    }

    pub fn occupied_count(&self) -> usize {
        self.slot_count() - self.empty_slot_count()
    }

    pub fn can_plant(&self) -> bool {
        self.empty_slot_index().is_some()
    }
}

// ---------------------------------------------------------------------------
// Harvest results
// ---------------------------------------------------------------------------

/// What a harvest action collected and how much it earned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestOutcome {
    pub count: u32,
    pub money: u64,
    pub harvested: Vec<(SlotRef, CropId)>,
}

impl HarvestOutcome {
    pub fn crop_ids(&self) -> Vec<CropId> {
        self.harvested.iter().map(|(_, id)| *id).collect()
    }

    fn merge(&mut self, other: HarvestOutcome) {
        self.count += other.count;
        self.money += other.money;
        self.harvested.extend(other.harvested);
    }
}

// ---------------------------------------------------------------------------
// Farm
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Farm {
    farmland: Vec<Field>,
    pens: Vec<Field>,
    ponds: Vec<Field>,
    can_sick: bool,
    /// Successful harvests per field kind, indexed by `FieldKind as usize`.
    harvests: [u32; 3],
    /// Animals placed into pens and ponds, by animal id.
    bred: BTreeMap<CropId, u32>,
}

impl Farm {
    pub fn from_setup(setup: &FarmSetup) -> Self {
        let mut farm = Farm {
            can_sick: setup.can_sick,
            ..Farm::default()
        };
        for template in &setup.fields {
            let fields = farm.fields_of_mut(template.kind);
            let index = fields.len();
            fields.push(Field::new(
                template.kind,
                index,
                template.start_slots as usize,
                template.start_level,
                template.max_level,
            ));
        }
        farm
    }

    fn fields_of_mut(&mut self, kind: FieldKind) -> &mut Vec<Field> {
        match kind {
            FieldKind::Farmland => &mut self.farmland,
            FieldKind::Pen => &mut self.pens,
            FieldKind::Pond => &mut self.ponds,
        }
    }

    pub fn fields(&self, kind: FieldKind) -> &[Field] {
        match kind {
            FieldKind::Farmland => &self.farmland,
            FieldKind::Pen => &self.pens,
            FieldKind::Pond => &self.ponds,
        }
    }

    /// Every field, farmland first, then pens, then ponds.
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.farmland.iter().chain(&self.pens).chain(&self.ponds)
    }

    pub fn field(&self, field: FieldRef) -> Option<&Field> {
        self.fields(field.kind).get(field.index)
    }

    fn field_mut(&mut self, field: FieldRef) -> Result<&mut Field, ActionError> {
        self.fields_of_mut(field.kind)
            .get_mut(field.index)
            .ok_or(ActionError::InvalidIndex)
    }

    fn crop_mut(&mut self, slot: SlotRef) -> Result<&mut Crop, ActionError> {
        self.field_mut(slot.field)?.slot_mut(slot.slot)
    }

    pub fn crop(&self, slot: SlotRef) -> Option<&Crop> {
        self.field(slot.field)?.slot(slot.slot)
    }

    pub fn can_sick(&self) -> bool {
        self.can_sick
    }

    pub fn harvest_count(&self, kind: FieldKind) -> u32 {
        self.harvests[kind as usize]
    }

    pub fn bred_count(&self, animal: CropId) -> u32 {
        self.bred.get(&animal).copied().unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Planting
    // -----------------------------------------------------------------------

    pub fn plant(
        &mut self,
        slot: SlotRef,
        crop_id: CropId,
        now: Timestamp) -> Result<(), ActionError> {
        self.crop_mut(slot)?.plant(crop_id, now)?;
        if slot.field.kind.holds_animals() {
            *self.bred.entry(crop_id).or_default() += 1;
        }
        Ok(())
    }

    /// Plant into the first empty slot. Returns the slot used.
    pub fn plant_auto(
        &mut self,
        field: FieldRef,
        crop_id: CropId,
        now: Timestamp,
    ) -> Result<usize, ActionError> {
        let slot = self
            .field_mut(field)?
            .empty_slot_index()
            .ok_or(Rejection::NoEmptySlot)?;
        self.plant(SlotRef { field, slot }, crop_id, now)?;
        Ok(slot)
    }

    /// Plant up to `count` crops, stopping at the first failure. Returns how
    /// many were planted.
    pub fn plant_batch(
        &mut self,
        field: FieldRef,
        crop_id: CropId,
        count: usize,
        now: Timestamp,
    ) -> usize {
        (0..count)
            .take_while(|_| self.plant_auto(field, crop_id, now).is_ok())
            .count()
    }

    /// Place an animal in a pen or pond, at `slot` or the first empty one.
    pub fn breed(
        &mut self,
        field: FieldRef,
        slot: Option<usize>,
        animal: CropId,
        now: Timestamp,
    ) -> Result<usize, ActionError> {
        if !field.kind.holds_animals() {
            return Err(Rejection::NotAnimalField.into());
        }
        match slot {
            Some(slot) => self.plant(SlotRef { field, slot }, animal, now).map(|()| slot),
            None => self.plant_auto(field, animal, now),
        }
    }

    // -----------------------------------------------------------------------
    // Growth
    // -----------------------------------------------------------------------

    /// Recompute one slot against a total growth time. Returns `true` when
    /// the crop matured on this call.
    pub fn tick_slot(
        &mut self,
        slot: SlotRef,
        total_growth_secs: u64,
        now: Timestamp,
    ) -> Result<bool, ActionError> {
        let crop = self.crop_mut(slot)?;
        Ok(crop.recompute(now, secs_to_millis(total_growth_secs)))
    }

    /// Recompute every growing slot with its catalog growth time. Returns
    /// the slots that matured.
    pub fn tick_all(&mut self, now: Timestamp, catalog: &Catalog) -> Vec<SlotRef> {
        let mut matured = Vec::new();
        for kind in FieldKind::ALL {
            for field in self.fields_of_mut(kind) {
                let field_ref = field.field_ref();
                for (slot, crop) in field.slots.iter_mut().enumerate() {
                    if !crop.is_growing() {
                        continue;
                    }
                    let total = catalog.growth_millis(crop.crop_id);
                    if crop.recompute(now, total) {
                        matured.push(SlotRef { field: field_ref, slot });
                    }
                }
            }
        }
        matured
    }

    pub fn accelerate_growth(&mut self, slot: SlotRef, secs: u64) -> Result<(), ActionError> {
        self.crop_mut(slot)?.accelerate(secs)
    }

    // -----------------------------------------------------------------------
    // Sickness
    // -----------------------------------------------------------------------

    pub fn set_sick(&mut self, slot: SlotRef) -> Result<(), ActionError> {
        let can_sick = self.can_sick;
        let crop = self.crop_mut(slot)?;
        if crop.is_empty() {
            return Err(Rejection::SlotEmpty.into());
        }
        if !can_sick {
            return Err(Rejection::SicknessDisabled.into());
        }
        crop.set_sick()
    }

    pub fn cure(&mut self, slot: SlotRef) -> Result<(), ActionError> {
        self.crop_mut(slot)?.cure()
    }

    // -----------------------------------------------------------------------
    // Harvesting
    // -----------------------------------------------------------------------

    /// Empty a mature slot and count the harvest. Earns nothing by itself;
    /// see [`Farm::harvest_and_sell`].
    pub fn harvest(&mut self, slot: SlotRef) -> Result<CropId, ActionError> {
        let crop_id = self.crop_mut(slot)?.harvest()?;
        self.harvests[slot.field.kind as usize] += 1;
        debug!(?slot, crop = crop_id.0, "harvested");
        Ok(crop_id)
    }

    /// Harvest one slot and credit its sell price.
    pub fn harvest_and_sell(
        &mut self,
        slot: SlotRef,
        catalog: &Catalog,
        economy: &mut Economy,
    ) -> Result<HarvestOutcome, ActionError> {
        let crop_id = self.harvest(slot)?;
        let money = catalog.crop_price(crop_id);
        economy.add_money(money);
        Ok(HarvestOutcome {
            count: 1,
            money,
            harvested: vec![(slot, crop_id)],
        })
    }

    /// Harvest every mature slot of one field.
    pub fn harvest_all_mature(
        &mut self,
        field: FieldRef,
        catalog: &Catalog,
        economy: &mut Economy,
    ) -> Result<HarvestOutcome, ActionError> {
        let mature: Vec<usize> = self
            .field(field)
            .ok_or(ActionError::InvalidIndex)?
            .slots()
            .iter()
            .enumerate()
            .filter(|(_, crop)| crop.is_mature())
            .map(|(slot, _)| slot)
            .collect();

        let mut outcome = HarvestOutcome::default();
        for slot in mature {
            outcome.merge(self.harvest_and_sell(SlotRef { field, slot }, catalog, economy)?);
        }
        Ok(outcome)
    }

    /// Harvest every mature slot on the farm.
    pub fn harvest_all_fields(
        &mut self,
        catalog: &Catalog,
        economy: &mut Economy,
    ) -> HarvestOutcome {
        let mut outcome = HarvestOutcome::default();
        for slot in self.mature_crops() {
            if let Ok(one) = self.harvest_and_sell(slot, catalog, economy) {
                outcome.merge(one);
            }
        }
        outcome
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    fn slots_where(&self, pred: impl Fn(&Field, &Crop) -> bool) -> Vec<SlotRef> {
        let mut found = Vec::new();
        for field in self.all_fields() {
            for (slot, crop) in field.slots().iter().enumerate() {
                if pred(field, crop) {
                    found.push(SlotRef {
                        field: field.field_ref(),
                        slot,
                    });
                }
            }
        }
        found
    }

    pub fn mature_crops(&self) -> Vec<SlotRef> {
        self.slots_where(|_, crop| crop.is_mature())
    }

    pub fn sick_crops(&self) -> Vec<SlotRef> {
        self.slots_where(|_, crop| crop.is_sick())
    }

    /// Sick crops in pens and ponds only.
    pub fn sick_animals(&self) -> Vec<SlotRef> {
        self.slots_where(|field, crop| field.kind.holds_animals() && crop.is_sick())
    }

    /// Mature slots in one field, or on the whole farm. Unknown fields
    /// count zero.
    pub fn harvestable_count(&self, field: Option<FieldRef>) -> usize {
        match field {
            Some(field) => self.field(field).map_or(0, Field::mature_count),
            None => self.all_fields().map(Field::mature_count).sum(),
        }
    }

    pub fn can_plant(&self, field: FieldRef) -> bool {
        self.field(field).is_some_and(Field::can_plant)
    }

    pub fn empty_slot_count(&self, field: FieldRef) -> usize {
        self.field(field).map_or(0, Field::empty_slot_count)
    }

    // -----------------------------------------------------------------------
    // Upgrades
    // -----------------------------------------------------------------------

    /// Raise a field one level, paying `cost` or the default
    /// `100 x current level`. Returns the new level.
    pub fn upgrade_field(
        &mut self,
        field: FieldRef,
        cost: Option<u64>,
        economy: &mut Economy,
    ) -> Result<u32, ActionError> {
        let target = self.field_mut(field)?;
        if target.current_level >= target.max_level {
            return Err(Rejection::AtMaxLevel.into());
        }
        let price = cost.unwrap_or_else(|| default_field_upgrade_cost(target.current_level));
        economy.spend_money(price)?;
        target.current_level += 1;
        debug!(?field, level = target.current_level, price, "field upgraded");
        Ok(target.current_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::HUNDRED;
    use crate::id::MissionId;
    use crate::mission::{FieldTemplate, MissionTarget, StarRule};

    fn template(kind: FieldKind, slots: u32) -> FieldTemplate {
        FieldTemplate {
            kind,
            start_slots: slots,
            target_slots: slots,
            start_level: 1,
            target_level: 1,
            max_level: 3,
        }
    }

    fn farm(can_sick: bool) -> Farm {
        Farm::from_setup(&FarmSetup {
            can_sick,
            fields: vec![
                template(FieldKind::Farmland, 3),
                template(FieldKind::Pen, 2),
                template(FieldKind::Farmland, 1),
            ],
            ..FarmSetup::default()
        })
    }

    fn economy(money: u64) -> Economy {
        let mut economy = Economy::default();
        economy.init_mission(
            MissionId(1),
            MissionTarget {
                start_money: money,
                ..MissionTarget::default()
            },
            StarRule::default(),
        );
        economy
    }

    const FARMLAND: FieldRef = FieldRef {
        kind: FieldKind::Farmland,
        index: 0,
    };
    const PEN: FieldRef = FieldRef {
        kind: FieldKind::Pen,
        index: 0,
    };

    #[test]
    fn fields_are_indexed_per_kind() {
        let farm = farm(false);
        assert_eq!(farm.fields(FieldKind::Farmland).len(), 2);
        assert_eq!(farm.fields(FieldKind::Pen).len(), 1);
        assert!(farm.fields(FieldKind::Pond).is_empty());
        let second = farm.field(FieldRef::new(FieldKind::Farmland, 1)).unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.slot_count(), 1);
    }

    #[test]
    fn plant_grow_harvest_cycle() {
        let mut farm = farm(false);
        let slot = SlotRef::new(FieldKind::Farmland, 0, 1);
        farm.plant(slot, CropId(7), Timestamp::ZERO).unwrap();

        assert_eq!(farm.tick_slot(slot, 60, Timestamp(60_000)), Ok(true));
        let crop = farm.crop(slot).unwrap();
        assert!(crop.is_mature());
        assert_eq!(crop.growth_progress, HUNDRED);

        assert_eq!(farm.harvest(slot), Ok(CropId(7)));
        assert!(farm.crop(slot).unwrap().is_empty());
        assert_eq!(farm.harvest_count(FieldKind::Farmland), 1);
        assert_eq!(farm.harvest_count(FieldKind::Pen), 0);
    }

    #[test]
    fn bad_indices_are_rejected() {
        let mut farm = farm(false);
        let bad_slot = SlotRef::new(FieldKind::Farmland, 0, 3);
        let bad_field = SlotRef::new(FieldKind::Pond, 0, 0);
        assert_eq!(
            farm.plant(bad_slot, CropId(1), Timestamp::ZERO),
            Err(ActionError::InvalidIndex)
        );
        assert_eq!(
            farm.plant(bad_field, CropId(1), Timestamp::ZERO),
            Err(ActionError::InvalidIndex)
        );
        assert_eq!(farm.harvest(bad_slot), Err(ActionError::InvalidIndex));
        assert!(!farm.can_plant(FieldRef::new(FieldKind::Pond, 0)));
        assert_eq!(farm.empty_slot_count(FieldRef::new(FieldKind::Pond, 0)), 0);
    }

    #[test]
    fn plant_auto_and_batch_fill_in_order() {
        let mut farm = farm(false);
        assert_eq!(farm.plant_auto(FARMLAND, CropId(2), Timestamp::ZERO), Ok(0));
        assert_eq!(farm.plant_batch(FARMLAND, CropId(2), 5, Timestamp::ZERO), 2);
        assert!(!farm.can_plant(FARMLAND));
        assert_eq!(
            farm.plant_auto(FARMLAND, CropId(2), Timestamp::ZERO),
            Err(Rejection::NoEmptySlot.into())
        );
    }

    #[test]
    fn breed_only_in_animal_fields() {
        let mut farm = farm(false);
        assert_eq!(
            farm.breed(FARMLAND, None, CropId(20), Timestamp::ZERO),
            Err(Rejection::NotAnimalField.into())
        );
        assert_eq!(farm.breed(PEN, Some(1), CropId(20), Timestamp::ZERO), Ok(1));
        assert_eq!(farm.breed(PEN, None, CropId(20), Timestamp::ZERO), Ok(0));
        assert_eq!(farm.bred_count(CropId(20)), 2);
        assert_eq!(farm.bred_count(CropId(21)), 0);
    }

    #[test]
    fn tick_all_uses_catalog_growth_times() {
        let catalog = Catalog::default().with_crop(
            CropId(5),
            crate::catalog::CropSpec {
                growth_secs: 30,
                sell_price: 40,
            },
        );
        let mut farm = farm(false);
        farm.plant(SlotRef::new(FieldKind::Farmland, 0, 0), CropId(5), Timestamp::ZERO).unwrap();
        farm.plant(SlotRef::new(FieldKind::Farmland, 0, 1), CropId(6), Timestamp::ZERO).unwrap();

        let matured = farm.tick_all(Timestamp(30_000), &catalog);
        assert_eq!(matured, vec![SlotRef::new(FieldKind::Farmland, 0, 0)]);
        let slow = farm.crop(SlotRef::new(FieldKind::Farmland, 0, 1)).unwrap();
        assert_eq!(slow.growth_progress, crate::fixed::Fixed64::from_num(50));

        assert!(farm.tick_all(Timestamp(30_000), &catalog).is_empty());
    }

    #[test]
    fn sickness_needs_permission_and_a_crop() {
        let slot = SlotRef::new(FieldKind::Pen, 0, 0);
        let mut healthy = farm(false);
        assert_eq!(healthy.set_sick(slot), Err(Rejection::SlotEmpty.into()));
        healthy.plant(slot, CropId(20), Timestamp::ZERO).unwrap();
        assert_eq!(healthy.set_sick(slot), Err(Rejection::SicknessDisabled.into()));

        let mut farm = farm(true);
        farm.plant(slot, CropId(20), Timestamp::ZERO).unwrap();
        farm.plant(SlotRef::new(FieldKind::Farmland, 0, 0), CropId(1), Timestamp::ZERO).unwrap();
        farm.set_sick(slot).unwrap();
        farm.set_sick(SlotRef::new(FieldKind::Farmland, 0, 0)).unwrap();
        assert_eq!(farm.sick_crops().len(), 2);
        assert_eq!(farm.sick_animals(), vec![slot]);

        farm.cure(slot).unwrap();
        assert!(farm.crop(slot).unwrap().is_growing());
        assert_eq!(farm.cure(slot), Err(Rejection::NotSick.into()));
    }

    #[test]
    fn harvest_all_collects_and_credits() {
        let catalog = Catalog::default();
        let mut farm = farm(false);
        let mut economy = economy(0);
        for slot in 0..3 {
            farm.plant(SlotRef::new(FieldKind::Farmland, 0, slot), CropId(1), Timestamp::ZERO)
                .unwrap();
        }
        farm.plant(SlotRef::new(FieldKind::Pen, 0, 0), CropId(20), Timestamp(30_000)).unwrap();
        farm.tick_all(Timestamp(60_000), &catalog);
        let outcome = farm.harvest_all_mature(FARMLAND, &catalog, &mut economy).unwrap();
        assert_eq!(outcome.count, 3);
        assert_eq!(economy.money(), 30);
        assert_eq!(farm.harvestable_count(None), 0);

        farm.tick_all(Timestamp(90_000), &catalog);
        assert_eq!(farm.harvestable_count(Some(PEN)), 1);
        let outcome = farm.harvest_all_fields(&catalog, &mut economy);
        assert_eq!(outcome.count, 1);
        assert_eq!(outcome.money, 10);
        assert_eq!(outcome.crop_ids(), vec![CropId(20)]);
        assert_eq!(economy.money(), 40);
        assert_eq!(farm.harvest_count(FieldKind::Farmland), 3);
        assert_eq!(farm.harvest_count(FieldKind::Pen), 1);
    }

    #[test]
    fn accelerate_only_affects_growing() {
        let mut farm = farm(false);
        let slot = SlotRef::new(FieldKind::Farmland, 0, 0);
        assert_eq!(farm.accelerate_growth(slot, 10), Err(Rejection::NotGrowing.into()));
        farm.plant(slot, CropId(1), Timestamp(100_000)).unwrap();
        farm.accelerate_growth(slot, 60).unwrap();
        assert_eq!(farm.tick_slot(slot, 60, Timestamp(100_000)), Ok(true));
    }

    #[test]
    fn upgrade_field_spends_default_cost() {
        let mut farm = farm(false);
        let mut economy = economy(250);
        assert_eq!(farm.upgrade_field(FARMLAND, None, &mut economy), Ok(2));
        assert_eq!(economy.money(), 150);
        assert_eq!(
            farm.upgrade_field(FARMLAND, None, &mut economy),
            Err(ActionError::InsufficientFunds {
                needed: 200,
                available: 150
            })
        );
        assert_eq!(farm.field(FARMLAND).unwrap().current_level, 2);
        assert_eq!(farm.upgrade_field(FARMLAND, Some(0), &mut economy), Ok(3));
        assert_eq!(
            farm.upgrade_field(FARMLAND, Some(0), &mut economy),
            Err(Rejection::AtMaxLevel.into())
        );
    }
}
