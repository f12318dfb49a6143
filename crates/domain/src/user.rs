use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use derive_more::{Deref, Display, Into};
use uuid::Uuid;

use crate::{EquipmentID, ExerciseType, HealthIssueID, ReadError};

pub trait ProfileRepository {
    fn read_profile(&self, user_id: UserID) -> Result<UserProfile, ReadError>;
}

/// Snapshot of the account data that drives exercise selection.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: UserID,
    pub fitness_level: FitnessLevel,
    pub equipment: BTreeSet<EquipmentID>,
    pub health_issues: BTreeSet<HealthIssueID>,
    pub objective: Option<Objective>,
    pub randomness: Randomness,
    pub session_duration: SessionDuration,
    pub body: BodyMetrics,
    pub created_at: DateTime<Utc>,
}

#[derive(Deref, Debug, Display, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct UserID(Uuid);

impl UserID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for UserID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for UserID {
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
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// Training goal of the user, narrowing the exercise types offered.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum Objective {
    Muscle,
    Strength,
    Cardio,
    Flexibility,
}

impl Objective {
    #[must_use]
    pub fn exercise_type(self) -> ExerciseType {
        match self {
            Objective::Muscle => ExerciseType::MuscleGrowth,
            Objective::Strength => ExerciseType::Strength,
            Objective::Cardio => ExerciseType::Cardio,
            Objective::Flexibility => ExerciseType::Flexibility,
        }
    }
}

/// Share of the non-guaranteed exercises that is drawn at random, in percent.
#[derive(Debug, Display, Clone, Copy, Into, PartialEq, Eq, PartialOrd, Ord)]
pub struct Randomness(u8);

impl Randomness {
    pub const NONE: Randomness = Randomness(0);
    pub const FULL: Randomness = Randomness(100);

    pub fn new(value: u8) -> Result<Self, RandomnessError> {
        if value > 100 {
            return Err(RandomnessError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn percent(self) -> usize {
        usize::from(self.0)
    }
}

impl Default for Randomness {
    fn default() -> Self {
        Self(50)
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RandomnessError {
    #[error("Randomness must be 100 % or less ({0} > 100)")]
    OutOfRange(u8),
}

/// Planned length of a training session in minutes.
#[derive(Debug, Display, Clone, Copy, Into, PartialEq, Eq, PartialOrd, Ord)]
pub struct SessionDuration(u32);

impl SessionDuration {
    #[must_use]
    pub fn minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    /// Number of exercises that fit into a session of this length.
    #[must_use]
    pub fn exercise_count(self) -> usize {
        let count = match self.0 {
            0..=10 => 2,
            11..=20 => 3,
            21..=30 => 4,
            31..=40 => 5,
            41..=50 => 6,
            51..=60 => 7,
            minutes => 7 + (minutes - 60) / 10,
        };
        count as usize
    }
}

impl Default for SessionDuration {
    fn default() -> Self {
        Self(30)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyMetrics {
    pub weight_kg: f32,
    pub height_cm: u32,
    pub age: u32,
}

impl Default for BodyMetrics {
    fn default() -> Self {
        Self {
            weight_kg: 70.0,
            height_cm: 170,
            age: 25,
        }
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
