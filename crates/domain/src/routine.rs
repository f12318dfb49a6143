use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use derive_more::{Deref, Display, Into};
use uuid::Uuid;

use crate::{
    CreateError, ExerciseID, FocusAreaID, InvalidInput, Name, NotFound, ReadError, UpdateError,
    UserID,
};

pub trait RoutineService {
    fn provision_routines(
        &self,
        user_id: UserID,
        active_template: TemplateID,
    ) -> Result<Vec<UserRoutine>, CreateError>;
    fn list_routines(&self, user_id: UserID) -> Result<Vec<UserRoutine>, ReadError>;
    fn activate_routine(
        &self,
        user_id: UserID,
        routine_id: RoutineID,
    ) -> Result<UserRoutine, UpdateError>;
    fn resolve_active_day(&self, user_id: UserID) -> Result<DayNumber, ReadError>;
    fn set_active_day(&self, user_id: UserID, day: u32) -> Result<DayNumber, UpdateError>;
    fn get_day_status(&self, user_id: UserID) -> Result<DayStatus, ReadError>;
    fn get_active_routine_days(&self, user_id: UserID) -> Result<RoutineOverview, ReadError>;
}

pub trait RoutineRepository {
    fn read_templates(&self) -> Result<Vec<RoutineTemplate>, ReadError>;
    fn read_routines(&self, user_id: UserID) -> Result<Vec<UserRoutine>, ReadError>;
    /// Stores the initial routine set of a user. Fails if the user already owns routines.
    fn create_routines(
        &self,
        user_id: UserID,
        routines: Vec<UserRoutine>,
    ) -> Result<Vec<UserRoutine>, CreateError>;
    /// Makes the given routine the only active one and clears its day override.
    ///
    /// The target is validated before the current routine is deactivated.
    fn activate_routine(
        &self,
        user_id: UserID,
        routine_id: RoutineID,
    ) -> Result<UserRoutine, UpdateError>;
    /// Loads the active routine, applies `modify` and writes the result back, all in one
    /// transaction. Nothing is written if `modify` fails.
    fn modify_active_routine<T>(
        &self,
        user_id: UserID,
        modify: impl FnOnce(&mut UserRoutine) -> Result<T, UpdateError>,
    ) -> Result<(UserRoutine, T), UpdateError>;
}

/// Catalog routine that personalized routines are copied from.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineTemplate {
    pub id: TemplateID,
    pub name: Name,
    pub days: Vec<BTreeSet<FocusAreaID>>,
}

#[derive(Deref, Debug, Display, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TemplateID(Uuid);

impl From<Uuid> for TemplateID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for TemplateID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

/// Personalized copy of a routine template.
///
/// Days are kept ordered by day number and always numbered 1 to `days.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRoutine {
    pub id: RoutineID,
    pub template_id: TemplateID,
    pub name: Name,
    pub active: bool,
    pub active_day: Option<DayNumber>,
    pub days: Vec<DaySlot>,
}

impl UserRoutine {
    #[must_use]
    pub fn from_template(id: RoutineID, template: &RoutineTemplate, active: bool) -> Self {
        Self {
            id,
            template_id: template.id,
            name: template.name.clone(),
            active,
            active_day: None,
            days: template
                .days
                .iter()
                .zip(1..)
                .map(|(focus_areas, n)| DaySlot {
                    day: DayNumber(n),
                    content: DayContent::FocusAreas(focus_areas.clone()),
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    #[must_use]
    pub fn day(&self, day: DayNumber) -> Option<&DaySlot> {
        self.days.iter().find(|d| d.day == day)
    }

    pub fn day_mut(&mut self, day: DayNumber) -> Result<&mut DaySlot, NotFound> {
        self.days
            .iter_mut()
            .find(|d| d.day == day)
            .ok_or(NotFound::Day(day))
    }

    /// Day slot that is due at `now` for an account created at `created_at`.
    pub fn today(
        &self,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<DayNumber, NotFound> {
        resolve_day(self.day_count(), created_at, now, self.active_day)
    }

    /// Pins the routine to `day` until the override is changed or the routine is switched.
    pub fn set_active_day(&mut self, day: u32) -> Result<DayNumber, InvalidInput> {
        let out_of_range = InvalidInput::DayOutOfRange {
            day,
            days: self.day_count(),
        };
        let day = DayNumber::new(day).map_err(|_| out_of_range.clone())?;
        if self.day(day).is_none() {
            return Err(out_of_range);
        }
        self.active_day = Some(day);
        Ok(day)
    }
}

#[derive(Deref, Debug, Display, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct RoutineID(Uuid);

impl RoutineID {
    #[must_use]
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl From<Uuid> for RoutineID {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<u128> for RoutineID {
    fn from(value: u128) -> Self {
        Self(Uuid::from_bytes(value.to_be_bytes()))
    }
}

/// Position of a day slot within a routine, starting at 1.
#[derive(Debug, Display, Clone, Copy, Into, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct DayNumber(u32);

impl DayNumber {
    pub const ONE: DayNumber = DayNumber(1);

    pub fn new(value: u32) -> Result<Self, DayNumberError> {
        if value == 0 {
            return Err(DayNumberError::Zero);
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize - 1
    }

    pub(crate) fn from_index(index: usize) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self(index as u32 + 1)
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DayNumberError {
    #[error("Day numbers start at 1")]
    Zero,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DaySlot {
    pub day: DayNumber,
    pub content: DayContent,
}

/// Content of a day slot. Only the variant matching the slot's mode exists, so switching the
/// mode always drops the content of the other mode.
#[derive(Debug, Clone, PartialEq)]
pub enum DayContent {
    FocusAreas(BTreeSet<FocusAreaID>),
    Exercises(Vec<DayExercise>),
}

impl DayContent {
    #[must_use]
    pub fn empty(mode: Mode) -> Self {
        match mode {
            Mode::FocusAreas => DayContent::FocusAreas(BTreeSet::new()),
            Mode::DirectExercises => DayContent::Exercises(vec![]),
        }
    }

    /// Direct exercise content with orders 1 to n, following the given sequence.
    #[must_use]
    pub fn exercises(ids: &[ExerciseID]) -> Self {
        DayContent::Exercises(
            ids.iter()
                .zip(1..)
                .map(|(exercise_id, order)| DayExercise {
                    exercise_id: *exercise_id,
                    order,
                })
                .collect(),
        )
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        match self {
            DayContent::FocusAreas(_) => Mode::FocusAreas,
            DayContent::Exercises(_) => Mode::DirectExercises,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            DayContent::FocusAreas(focus_areas) => focus_areas.is_empty(),
            DayContent::Exercises(exercises) => exercises.is_empty(),
        }
    }

    /// Exercise ids of a direct exercise day in their stored order.
    #[must_use]
    pub fn exercise_ids(&self) -> Vec<ExerciseID> {
        match self {
            DayContent::FocusAreas(_) => vec![],
            DayContent::Exercises(exercises) => {
                let mut exercises = exercises.clone();
                exercises.sort_by_key(|e| e.order);
                exercises.into_iter().map(|e| e.exercise_id).collect()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayExercise {
    pub exercise_id: ExerciseID,
    pub order: u32,
}

#[derive(
    Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum Mode {
    FocusAreas,
    DirectExercises,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayStatus {
    pub routine_id: RoutineID,
    pub routine_name: Name,
    pub day: DayNumber,
    pub total_days: usize,
    pub overridden: bool,
    pub content: DayContent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutineOverview {
    pub routine_id: RoutineID,
    pub name: Name,
    pub current_day: DayNumber,
    pub days: Vec<DaySlot>,
}

impl RoutineOverview {
    #[must_use]
    pub fn is_current_day(&self, day: DayNumber) -> bool {
        self.current_day == day
    }
}

/// Resolves the day slot of a cyclic routine with `days` slots.
///
/// A stored override is returned unchanged. Otherwise the routine cycles through its days
/// once per whole day elapsed since `created_at`, independent of the weekday. Elapsed days are
/// counted in UTC; a `now` before `created_at` counts as day 1.
pub fn resolve_day(
    days: usize,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    active_day: Option<DayNumber>,
) -> Result<DayNumber, NotFound> {
    if days == 0 {
        return Err(NotFound::ActiveRoutineDay);
    }

    if let Some(day) = active_day {
        return Ok(day);
    }

    let elapsed = usize::try_from((now - created_at).num_days()).unwrap_or(0);
    Ok(DayNumber::from_index(elapsed % days))
}

#[must_use]
pub fn active_routine(routines: &[UserRoutine]) -> Option<&UserRoutine> {
    routines.iter().find(|r| r.active)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap()
    }

    fn template() -> RoutineTemplate {
        RoutineTemplate {
            id: 1.into(),
            name: Name::new("3 Day Classic").unwrap(),
            days: vec![
                BTreeSet::from([1.into(), 2.into()]),
                BTreeSet::from([3.into()]),
                BTreeSet::from([4.into(), 5.into()]),
            ],
        }
    }

    #[rstest]
    #[case(1, 0, 1)]
    #[case(1, 17, 1)]
    #[case(3, 0, 1)]
    #[case(3, 1, 2)]
    #[case(3, 2, 3)]
    #[case(3, 3, 1)]
    #[case(5, 12, 3)]
    #[case(7, 700, 1)]
    fn test_resolve_day_cycles(#[case] days: usize, #[case] elapsed: i64, #[case] expected: u32) {
        let now = created_at() + Duration::days(elapsed);
        assert_eq!(
            resolve_day(days, created_at(), now, None),
            Ok(DayNumber::new(expected).unwrap())
        );
    }

    #[test]
    fn test_resolve_day_within_range() {
        for days in 1..=9 {
            for elapsed in 0..40 {
                let now = created_at() + Duration::days(elapsed);
                let day = resolve_day(days, created_at(), now, None).unwrap();
                assert!((1..=days).contains(&(day.index() + 1)));
                assert_eq!(day.index(), elapsed as usize % days);
            }
        }
    }

    #[test]
    fn test_resolve_day_stable_within_day() {
        let start = created_at() + Duration::days(4);
        let end = start + Duration::hours(23) + Duration::minutes(59);
        assert_eq!(
            resolve_day(3, created_at(), start, None),
            resolve_day(3, created_at(), end, None)
        );
        assert_ne!(
            resolve_day(3, created_at(), start, None),
            resolve_day(3, created_at(), end + Duration::minutes(1), None)
        );
    }

    #[test]
    fn test_resolve_day_before_creation() {
        let now = created_at() - Duration::hours(30);
        assert_eq!(resolve_day(4, created_at(), now, None), Ok(DayNumber::ONE));
    }

    #[test]
    fn test_resolve_day_override_wins() {
        let now = created_at() + Duration::days(1);
        let day = DayNumber::new(3).unwrap();
        assert_eq!(resolve_day(4, created_at(), now, Some(day)), Ok(day));
    }

    #[test]
    fn test_resolve_day_without_days() {
        assert_eq!(
            resolve_day(0, created_at(), created_at(), None),
            Err(NotFound::ActiveRoutineDay)
        );
        assert_eq!(
            resolve_day(0, created_at(), created_at(), Some(DayNumber::ONE)),
            Err(NotFound::ActiveRoutineDay)
        );
    }

    #[test]
    fn test_user_routine_from_template() {
        let routine = UserRoutine::from_template(7.into(), &template(), true);
        assert_eq!(routine.template_id, 1.into());
        assert_eq!(routine.name.as_str(), "3 Day Classic");
        assert!(routine.active);
        assert_eq!(routine.active_day, None);
        assert_eq!(
            routine.days,
            vec![
                DaySlot {
                    day: DayNumber(1),
                    content: DayContent::FocusAreas(BTreeSet::from([1.into(), 2.into()])),
                },
                DaySlot {
                    day: DayNumber(2),
                    content: DayContent::FocusAreas(BTreeSet::from([3.into()])),
                },
                DaySlot {
                    day: DayNumber(3),
                    content: DayContent::FocusAreas(BTreeSet::from([4.into(), 5.into()])),
                },
            ]
        );
    }

    #[test]
    fn test_user_routine_set_active_day() {
        let mut routine = UserRoutine::from_template(7.into(), &template(), true);
        assert_eq!(routine.set_active_day(2), Ok(DayNumber(2)));
        assert_eq!(routine.active_day, Some(DayNumber(2)));
        assert_eq!(
            routine.today(created_at(), created_at()),
            Ok(DayNumber(2))
        );
    }

    #[rstest]
    #[case(0)]
    #[case(4)]
    #[case(100)]
    fn test_user_routine_set_active_day_out_of_range(#[case] day: u32) {
        let mut routine = UserRoutine::from_template(7.into(), &template(), true);
        routine.set_active_day(3).unwrap();
        assert_eq!(
            routine.set_active_day(day),
            Err(InvalidInput::DayOutOfRange { day, days: 3 })
        );
        assert_eq!(routine.active_day, Some(DayNumber(3)));
    }

    #[test]
    fn test_day_content_exercise_ids_follow_order() {
        let content = DayContent::Exercises(vec![
            DayExercise {
                exercise_id: 5.into(),
                order: 3,
            },
            DayExercise {
                exercise_id: 9.into(),
                order: 1,
            },
            DayExercise {
                exercise_id: 2.into(),
                order: 2,
            },
        ]);
        assert_eq!(
            content.exercise_ids(),
            vec![9.into(), 2.into(), 5.into()]
        );
        assert_eq!(content.mode(), Mode::DirectExercises);
    }

    #[test]
    fn test_day_content_empty() {
        assert_eq!(
            DayContent::empty(Mode::FocusAreas),
            DayContent::FocusAreas(BTreeSet::new())
        );
        assert!(DayContent::empty(Mode::DirectExercises).is_empty());
        assert_eq!(Mode::DirectExercises.to_string(), "direct_exercises");
    }

    #[test]
    fn test_day_number_new() {
        assert_eq!(DayNumber::new(0), Err(DayNumberError::Zero));
        assert_eq!(DayNumber::new(2).unwrap().index(), 1);
    }

    #[test]
    fn test_active_routine() {
        let mut inactive = UserRoutine::from_template(1.into(), &template(), false);
        inactive.name = Name::new("Other").unwrap();
        let active = UserRoutine::from_template(2.into(), &template(), true);
        let routines = vec![inactive, active];
        assert_eq!(active_routine(&routines).map(|r| r.id), Some(2.into()));
        assert_eq!(active_routine(&routines[..1]), None);
    }
}
