use serde::{Deserialize, Serialize};

/// Identifies a crop or animal type. `CropId(0)` marks an empty slot.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CropId(pub u32);

impl CropId {
    pub const EMPTY: CropId = CropId(0);

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Identifies a factory product type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub u32);

/// Identifies a machine template (the kind of machine, not its position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MachineTypeId(pub u32);

/// Identifies a mission (level).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MissionId(pub u32);

/// The three kinds of field a farm can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Farmland,
    Pen,
    Pond,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [FieldKind::Farmland, FieldKind::Pen, FieldKind::Pond];

    /// Map the numeric kind used in mission data (1 = farmland, 2 = pen,
    /// 3 = pond).
    pub fn from_config_id(id: u32) -> Option<FieldKind> {
        match id {
            1 => Some(FieldKind::Farmland),
            2 => Some(FieldKind::Pen),
            3 => Some(FieldKind::Pond),
            _ => None,
        }
    }

    pub fn config_id(self) -> u32 {
        match self {
            FieldKind::Farmland => 1,
            FieldKind::Pen => 2,
            FieldKind::Pond => 3,
        }
    }

    /// Pens and ponds hold animals; farmland holds plants.
    pub fn holds_animals(self) -> bool {
        matches!(self, FieldKind::Pen | FieldKind::Pond)
    }
}

/// Addresses one field: its kind and its position among fields of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub kind: FieldKind,
    pub index: usize,
}

impl FieldRef {
    pub fn new(kind: FieldKind, index: usize) -> Self {
        Self { kind, index }
    }
}

/// Addresses one crop slot inside a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub field: FieldRef,
    pub slot: usize,
}

impl SlotRef {
    pub fn new(kind: FieldKind, field_index: usize, slot: usize) -> Self {
        Self {
            field: FieldRef::new(kind, field_index),
            slot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_crop_id() {
        assert!(CropId::EMPTY.is_empty());
        assert!(CropId::default().is_empty());
        assert!(!CropId(7).is_empty());
    }

    #[test]
    fn field_kind_config_ids_round_trip() {
        for kind in FieldKind::ALL {
            assert_eq!(FieldKind::from_config_id(kind.config_id()), Some(kind));
        }
        assert_eq!(FieldKind::from_config_id(0), None);
        assert_eq!(FieldKind::from_config_id(4), None);
    }

    #[test]
    fn only_pens_and_ponds_hold_animals() {
        assert!(!FieldKind::Farmland.holds_animals());
        assert!(FieldKind::Pen.holds_animals());
        assert!(FieldKind::Pond.holds_animals());
    }

    #[test]
    fn slot_refs_are_hashable() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(SlotRef::new(FieldKind::Farmland, 0, 1));
        set.insert(SlotRef::new(FieldKind::Farmland, 0, 1));
        set.insert(SlotRef::new(FieldKind::Pen, 0, 1));
        assert_eq!(set.len(), 2);
    }
}
