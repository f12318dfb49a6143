use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};

use crate::{CreateError, DeleteError, ExerciseID, ReadError, UserID};

pub trait ExclusionService {
    fn exclude_exercises(
        &self,
        user_id: UserID,
        exercise_ids: &[ExerciseID],
        scope: Scope,
        reason: Option<String>,
    ) -> Result<Vec<Exclusion>, CreateError>;
    fn remove_exclusions(
        &self,
        user_id: UserID,
        exercise_ids: &[ExerciseID],
        scope: Scope,
    ) -> Result<Vec<ExerciseID>, DeleteError>;
    fn list_exclusions(&self, user_id: UserID) -> Result<Vec<Exclusion>, ReadError>;
}

pub trait ExclusionRepository {
    fn read_exclusions(&self, user_id: UserID) -> Result<Vec<Exclusion>, ReadError>;
    /// Inserts the exclusions, replacing reason and timestamp of existing ones with the same
    /// exercise and scope.
    fn upsert_exclusions(
        &self,
        user_id: UserID,
        exclusions: Vec<Exclusion>,
    ) -> Result<Vec<Exclusion>, CreateError>;
    /// Returns the ids of the exercises whose exclusion was actually deleted.
    fn delete_exclusions(
        &self,
        user_id: UserID,
        exercise_ids: &[ExerciseID],
        scope: ExclusionScope,
    ) -> Result<Vec<ExerciseID>, DeleteError>;
}

/// Scope requested by the user, before it is bound to a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Scope {
    Forever,
    Today,
}

impl Scope {
    #[must_use]
    pub fn on(self, today: NaiveDate) -> ExclusionScope {
        match self {
            Scope::Forever => ExclusionScope::Forever,
            Scope::Today => ExclusionScope::Day(today),
        }
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExclusionScope {
    Forever,
    Day(NaiveDate),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    pub exercise_id: ExerciseID,
    pub scope: ExclusionScope,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Exclusion {
    /// A dated exclusion expires when its day has passed.
    #[must_use]
    pub fn is_active(&self, today: NaiveDate) -> bool {
        match self.scope {
            ExclusionScope::Forever => true,
            ExclusionScope::Day(date) => date == today,
        }
    }
}

/// Union of the forever exclusions and those dated `today`.
#[must_use]
pub fn excluded_ids(exclusions: &[Exclusion], today: NaiveDate) -> BTreeSet<ExerciseID> {
    exclusions
        .iter()
        .filter(|e| e.is_active(today))
        .map(|e| e.exercise_id)
        .collect()
}
