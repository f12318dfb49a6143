use std::collections::BTreeSet;

use derive_more::{Deref, Display};
use uuid::Uuid;

use crate::{FitnessLevel, Name, ReadError};

/// Read access to the exercise catalog.
///
/// The catalog is maintained elsewhere; this crate never writes to it.
pub trait CatalogRepository {
    /// All exercises that target at least one of the given focus areas.
    fn read_exercises_for(
        &self,
        focus_areas: &BTreeSet<FocusAreaID>,
    ) -> Result<Vec<Exercise>, ReadError>;
    /// The requested exercises, in no particular order. Unknown ids are skipped.
    fn read_exercises(&self, ids: &[ExerciseID]) -> Result<Vec<Exercise>, ReadError>;
    fn read_focus_areas(&self) -> Result<Vec<FocusArea>, ReadError>;
    fn read_equipment(&self) -> Result<Vec<Equipment>, ReadError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    pub id: ExerciseID,
    pub name: Name,
    pub exercise_type: ExerciseType,
    pub focus_areas: BTreeSet<FocusAreaID>,
    /// One of `focus_areas`, used to label the exercise on direct exercise days.
    pub primary_focus_area: FocusAreaID,
    pub fitness_levels: BTreeSet<FitnessLevel>,
    pub equipment: BTreeSet<EquipmentID>,
    pub contraindications: BTreeSet<HealthIssueID>,
}

impl Exercise {
    #[must_use]
    pub fn targets(&self, focus_area: FocusAreaID) -> bool {
        self.focus_areas.contains(&focus_area)
    }

    #[must_use]
    pub fn shared_focus_areas(&self, other: &Exercise) -> BTreeSet<FocusAreaID> {
        self.focus_areas
            .intersection(&other.focus_areas)
            .copied()
            .collect()
    }
}

#[derive(Deref, Debug, Display, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExerciseID(Uuid);

impl ExerciseID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for ExerciseID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for ExerciseID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum ExerciseType {
    Strength,
    Cardio,
    MuscleGrowth,
    Flexibility,
}

/// Muscle group or body region that exercises and routine days are tagged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusArea {
    pub id: FocusAreaID,
    pub name: Name,
}

#[derive(Deref, Debug, Display, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct FocusAreaID(Uuid);

impl From<Uuid> for FocusAreaID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for FocusAreaID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equipment {
    pub id: EquipmentID,
    pub name: Name,
    /// Available to every user, whether listed in the profile or not (e.g. body weight).
    pub baseline: bool,
}

#[derive(Deref, Debug, Display, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct EquipmentID(Uuid);

impl From<Uuid> for EquipmentID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for EquipmentID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

#[derive(Deref, Debug, Display, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct HealthIssueID(Uuid);

impl From<Uuid> for HealthIssueID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for HealthIssueID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

#[must_use]
pub fn baseline_equipment(equipment: &[Equipment]) -> BTreeSet<EquipmentID> {
    equipment
        .iter()
        .filter(|e| e.baseline)
        .map(|e| e.id)
        .collect()
}
