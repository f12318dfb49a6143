use std::{
    collections::BTreeSet,
    sync::{Mutex, PoisonError},
};

use log::{debug, error};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use uuid::Uuid;

use crate::{
    Alternative, AssignmentRepository, AssignmentUpdate, CatalogRepository, Clock, Constraints,
    CreateError, DayContent, DayNumber, DayService, DaySlot, DayStatus, DeleteError, Exclusion,
    ExclusionRepository, ExclusionService, ExerciseID, Field, FocusAreaID, GenerateError,
    GeneratedAssignment, InvalidInput, Mode, NotFound, ProfileRepository, ReadError, RoutineID,
    RoutineOverview, RoutineRepository, RoutineService, Scope, SwapOutcome, SystemClock,
    TemplateID, UpdateError, UserID, UserProfile, UserRoutine, Workout, WorkoutComposer,
    WorkoutItem, WorkoutService, active_routine, baseline_equipment, custom_assignments,
    excluded_ids, per_focus_area_limit, plan_assignments, rank_alternatives, select_candidates, select_direct,
};

pub struct Service<R> {
    repository: R,
    clock: Box<dyn Clock>,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl<R> Service<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            clock: Box::new(SystemClock),
            rng: Mutex::new(Box::new(StdRng::from_entropy())),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Mutex::new(Box::new(rng));
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn into_repository(self) -> R {
        self.repository
    }
}

macro_rules! log_on_error {
    ($func: expr, $error: ident, $action: literal, $entity: literal) => {{
        let result = $func;
        match result {
            Ok(_) => {}
            Err(ref err) => match err {
                $error::Storage(_) => {
                    error!("failed to {} {}: {err}", $action, $entity);
                }
                _ => {
                    debug!("failed to {} {}: {err}", $action, $entity);
                }
            },
        }
        result
    }};
}

impl<R: RoutineRepository> Service<R> {
    fn active_routine(&self, user_id: UserID) -> Result<UserRoutine, ReadError> {
        let routines = self.repository.read_routines(user_id)?;
        Ok(active_routine(&routines)
            .ok_or(NotFound::ActiveRoutine)?
            .clone())
    }

    fn modify_day<T>(
        &self,
        user_id: UserID,
        day: u32,
        modify: impl FnOnce(&mut UserRoutine, DayNumber) -> Result<T, UpdateError>,
    ) -> Result<T, UpdateError> {
        let (_, result) = self
            .repository
            .modify_active_routine(user_id, |routine| {
                let day = routine.slot(day)?;
                modify(routine, day)
            })?;
        Ok(result)
    }
}

impl<R: ProfileRepository + RoutineRepository> Service<R> {
    fn today(&self, user_id: UserID) -> Result<(UserProfile, UserRoutine, DayNumber), ReadError> {
        let profile = self.repository.read_profile(user_id)?;
        let routine = self.active_routine(user_id)?;
        let day = routine.today(profile.created_at, self.clock.now())?;
        Ok((profile, routine, day))
    }

    fn provision(
        &self,
        user_id: UserID,
        active_template: TemplateID,
    ) -> Result<Vec<UserRoutine>, CreateError> {
        self.repository.read_profile(user_id)?;
        let templates = self.repository.read_templates()?;
        if !templates.iter().any(|t| t.id == active_template) {
            return Err(NotFound::Template(active_template).into());
        }
        let routines = templates
            .iter()
            .map(|template| {
                UserRoutine::from_template(
                    RoutineID::from(Uuid::new_v4()),
                    template,
                    template.id == active_template,
                )
            })
            .collect();
        self.repository.create_routines(user_id, routines)
    }

    fn day_status(&self, user_id: UserID) -> Result<DayStatus, ReadError> {
        let (_, routine, day) = self.today(user_id)?;
        let slot = routine.day(day).ok_or(NotFound::Day(day))?;
        Ok(DayStatus {
            routine_id: routine.id,
            routine_name: routine.name.clone(),
            day,
            total_days: routine.day_count(),
            overridden: routine.active_day.is_some(),
            content: slot.content.clone(),
        })
    }

    fn overview(&self, user_id: UserID) -> Result<RoutineOverview, ReadError> {
        let (_, routine, day) = self.today(user_id)?;
        Ok(RoutineOverview {
            routine_id: routine.id,
            name: routine.name,
            current_day: day,
            days: routine.days,
        })
    }
}

impl<R: ProfileRepository + RoutineRepository> RoutineService for Service<R> {
    fn provision_routines(
        &self,
        user_id: UserID,
        active_template: TemplateID,
    ) -> Result<Vec<UserRoutine>, CreateError> {
        log_on_error!(
            self.provision(user_id, active_template),
            CreateError,
            "provision",
            "routines"
        )
    }

    fn list_routines(&self, user_id: UserID) -> Result<Vec<UserRoutine>, ReadError> {
        log_on_error!(
            self.repository.read_routines(user_id),
            ReadError,
            "list",
            "routines"
        )
    }

    fn activate_routine(
        &self,
        user_id: UserID,
        routine_id: RoutineID,
    ) -> Result<UserRoutine, UpdateError> {
        log_on_error!(
            self.repository.activate_routine(user_id, routine_id),
            UpdateError,
            "activate",
            "routine"
        )
    }

    fn resolve_active_day(&self, user_id: UserID) -> Result<DayNumber, ReadError> {
        log_on_error!(
            self.today(user_id).map(|(_, _, day)| day),
            ReadError,
            "resolve",
            "active day"
        )
    }

    fn set_active_day(&self, user_id: UserID, day: u32) -> Result<DayNumber, UpdateError> {
        log_on_error!(
            self.repository
                .modify_active_routine(user_id, |routine| Ok(routine.set_active_day(day)?))
                .map(|(_, day)| day),
            UpdateError,
            "set",
            "active day"
        )
    }

    fn get_day_status(&self, user_id: UserID) -> Result<DayStatus, ReadError> {
        log_on_error!(self.day_status(user_id), ReadError, "get", "day status")
    }

    fn get_active_routine_days(&self, user_id: UserID) -> Result<RoutineOverview, ReadError> {
        log_on_error!(
            self.overview(user_id),
            ReadError,
            "get",
            "active routine days"
        )
    }
}

impl<R: CatalogRepository + RoutineRepository> Service<R> {
    fn check_focus_areas(&self, ids: &BTreeSet<FocusAreaID>) -> Result<(), ReadError> {
        let known = self
            .repository
            .read_focus_areas()?
            .into_iter()
            .map(|f| f.id)
            .collect::<BTreeSet<_>>();
        match ids.difference(&known).next() {
            Some(unknown) => Err(NotFound::FocusArea(*unknown).into()),
            None => Ok(()),
        }
    }

    fn check_exercises(&self, ids: &[ExerciseID]) -> Result<(), ReadError> {
        let known = self
            .repository
            .read_exercises(ids)?
            .into_iter()
            .map(|e| e.id)
            .collect::<BTreeSet<_>>();
        match ids.iter().find(|id| !known.contains(id)) {
            Some(unknown) => Err(NotFound::Exercise(*unknown).into()),
            None => Ok(()),
        }
    }

    fn replace_content(
        &self,
        user_id: UserID,
        day: u32,
        content: DayContent,
    ) -> Result<DaySlot, UpdateError> {
        match &content {
            DayContent::FocusAreas(focus_areas) => self.check_focus_areas(focus_areas)?,
            DayContent::Exercises(_) => self.check_exercises(&content.exercise_ids())?,
        }
        self.modify_day(user_id, day, |routine, day| {
            Ok(routine.replace_content(day, content)?.clone())
        })
    }
}

impl<R: CatalogRepository + RoutineRepository> DayService for Service<R> {
    fn set_day_mode(&self, user_id: UserID, day: u32, mode: Mode) -> Result<DaySlot, UpdateError> {
        log_on_error!(
            self.modify_day(user_id, day, |routine, day| Ok(routine
                .set_mode(day, mode)?
                .clone())),
            UpdateError,
            "set",
            "day mode"
        )
    }

    fn add_focus_area(
        &self,
        user_id: UserID,
        day: u32,
        focus_area_id: FocusAreaID,
    ) -> Result<DaySlot, UpdateError> {
        log_on_error!(
            self.check_focus_areas(&BTreeSet::from([focus_area_id]))
                .map_err(UpdateError::from)
                .and_then(|()| self.modify_day(user_id, day, |routine, day| Ok(routine
                    .add_focus_area(day, focus_area_id)?
                    .clone()))),
            UpdateError,
            "add",
            "focus area"
        )
    }

    fn remove_focus_area(
        &self,
        user_id: UserID,
        day: u32,
        focus_area_id: FocusAreaID,
    ) -> Result<DaySlot, UpdateError> {
        log_on_error!(
            self.modify_day(user_id, day, |routine, day| Ok(routine
                .remove_focus_area(day, focus_area_id)?
                .clone())),
            UpdateError,
            "remove",
            "focus area"
        )
    }

    fn add_exercise(
        &self,
        user_id: UserID,
        day: u32,
        exercise_id: ExerciseID,
    ) -> Result<DaySlot, UpdateError> {
        log_on_error!(
            self.check_exercises(&[exercise_id])
                .map_err(UpdateError::from)
                .and_then(|()| self.modify_day(user_id, day, |routine, day| Ok(routine
                    .add_exercise(day, exercise_id)?
                    .clone()))),
            UpdateError,
            "add",
            "exercise"
        )
    }

    fn remove_exercise(
        &self,
        user_id: UserID,
        day: u32,
        exercise_id: ExerciseID,
    ) -> Result<DaySlot, UpdateError> {
        log_on_error!(
            self.modify_day(user_id, day, |routine, day| Ok(routine
                .remove_exercise(day, exercise_id)?
                .clone())),
            UpdateError,
            "remove",
            "exercise"
        )
    }

    fn replace_day_content(
        &self,
        user_id: UserID,
        day: u32,
        content: DayContent,
    ) -> Result<DaySlot, UpdateError> {
        log_on_error!(
            self.replace_content(user_id, day, content),
            UpdateError,
            "replace",
            "day content"
        )
    }

    fn reorder_days(
        &self,
        user_id: UserID,
        source: u32,
        target: u32,
    ) -> Result<Vec<DaySlot>, UpdateError> {
        log_on_error!(
            self.modify_day(user_id, source, |routine, source| {
                let target = routine.slot(target)?;
                routine.reorder(source, target)?;
                Ok(routine.days.clone())
            }),
            UpdateError,
            "reorder",
            "days"
        )
    }

    fn swap_days(&self, user_id: UserID, a: u32, b: u32) -> Result<SwapOutcome, UpdateError> {
        log_on_error!(
            self.modify_day(user_id, a, |routine, a| {
                let b = routine.slot(b)?;
                routine.swap(a, b)
            }),
            UpdateError,
            "swap",
            "days"
        )
    }

    fn add_day(&self, user_id: UserID) -> Result<DaySlot, UpdateError> {
        log_on_error!(
            self.repository
                .modify_active_routine(user_id, |routine| Ok(routine.add_day().clone()))
                .map(|(_, slot)| slot),
            UpdateError,
            "add",
            "day"
        )
    }

    fn remove_day(&self, user_id: UserID, day: u32) -> Result<Vec<DaySlot>, UpdateError> {
        log_on_error!(
            self.modify_day(user_id, day, |routine, day| {
                routine.remove_day(day)?;
                Ok(routine.days.clone())
            }),
            UpdateError,
            "remove",
            "day"
        )
    }
}

impl<R> Service<R>
where
    R: ProfileRepository
        + RoutineRepository
        + CatalogRepository
        + ExclusionRepository
        + AssignmentRepository,
{
    fn constraints(&self, profile: &UserProfile) -> Result<Constraints, ReadError> {
        let today = self.clock.now().date_naive();
        let excluded = excluded_ids(&self.repository.read_exclusions(profile.id)?, today);
        let baseline = baseline_equipment(&self.repository.read_equipment()?);
        Ok(Constraints::new(profile, &baseline, excluded))
    }

    fn generate(&self, user_id: UserID) -> Result<Workout, GenerateError> {
        let (profile, routine, day) = self.today(user_id)?;
        let slot = routine.day(day).ok_or(NotFound::Day(day))?;
        let constraints = self.constraints(&profile)?;

        let workout = match &slot.content {
            DayContent::FocusAreas(focus_areas) => {
                let target = profile.session_duration.exercise_count();
                let limit = per_focus_area_limit(target, focus_areas.len());
                let exercises = self.repository.read_exercises_for(focus_areas)?;
                let pool = select_candidates(&exercises, focus_areas, &constraints, limit)?;
                debug!(
                    "generate workout for day {day}: {} focus areas, {} of {} exercises eligible, \
                     target {target}, randomness {} %",
                    focus_areas.len(),
                    pool.len(),
                    exercises.len(),
                    profile.randomness,
                );
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                WorkoutComposer::new(target, profile.randomness).compose(pool, &mut **rng)?
            }
            DayContent::Exercises(_) => {
                let order = slot.content.exercise_ids();
                let exercises = self.repository.read_exercises(&order)?;
                debug!(
                    "generate workout for day {day}: {} direct exercises",
                    order.len()
                );
                select_direct(&exercises, &order, &constraints.excluded)?
            }
        };

        let assignments = self
            .repository
            .replace_assignments(user_id, plan_assignments(&workout, &profile))?;

        Ok(Workout {
            day,
            mode: slot.content.mode(),
            items: workout
                .into_iter()
                .zip(assignments)
                .map(|(candidate, assignment)| WorkoutItem {
                    exercise: candidate.exercise,
                    focus_area: candidate.focus_area,
                    assignment,
                })
                .collect(),
        })
    }

    fn update_assignment(
        &self,
        user_id: UserID,
        exercise_id: ExerciseID,
        update: AssignmentUpdate,
    ) -> Result<GeneratedAssignment, UpdateError> {
        if update.is_empty() {
            return Err(InvalidInput::Empty(Field::AssignmentValues).into());
        }
        self.repository
            .update_assignment(user_id, exercise_id, update)
    }

    fn alternatives(
        &self,
        user_id: UserID,
        exercise_id: ExerciseID,
        limit: usize,
    ) -> Result<Vec<Alternative>, ReadError> {
        let original = self
            .repository
            .read_exercises(&[exercise_id])?
            .into_iter()
            .next()
            .ok_or(NotFound::Exercise(exercise_id))?;
        let profile = self.repository.read_profile(user_id)?;
        let constraints = self.constraints(&profile)?;
        let exercises = self
            .repository
            .read_exercises_for(&original.focus_areas)?;
        Ok(rank_alternatives(&original, &exercises, &constraints, limit))
    }

    fn add_custom(
        &self,
        user_id: UserID,
        exercise_ids: &[ExerciseID],
    ) -> Result<Vec<GeneratedAssignment>, CreateError> {
        if exercise_ids.is_empty() {
            return Err(InvalidInput::Empty(Field::ExerciseIDs).into());
        }
        let known = self
            .repository
            .read_exercises(exercise_ids)?
            .into_iter()
            .map(|e| e.id)
            .collect::<BTreeSet<_>>();
        if let Some(unknown) = exercise_ids.iter().find(|id| !known.contains(id)) {
            return Err(NotFound::Exercise(*unknown).into());
        }
        let profile = self.repository.read_profile(user_id)?;
        let constraints = self.constraints(&profile)?;
        if let Some(excluded) = exercise_ids
            .iter()
            .find(|id| constraints.excluded.contains(id))
        {
            return Err(InvalidInput::Excluded(*excluded).into());
        }
        debug!(
            "add {} custom assignments for user {user_id}",
            exercise_ids.len()
        );
        self.repository
            .add_assignments(user_id, custom_assignments(exercise_ids, &profile))
    }
}

impl<R> WorkoutService for Service<R>
where
    R: ProfileRepository
        + RoutineRepository
        + CatalogRepository
        + ExclusionRepository
        + AssignmentRepository,
{
    fn generate_workout(&self, user_id: UserID) -> Result<Workout, GenerateError> {
        log_on_error!(self.generate(user_id), GenerateError, "generate", "workout")
    }

    fn get_generated_assignments(
        &self,
        user_id: UserID,
    ) -> Result<Vec<GeneratedAssignment>, ReadError> {
        log_on_error!(
            self.repository.read_assignments(user_id),
            ReadError,
            "get",
            "generated assignments"
        )
    }

    fn update_generated_assignment(
        &self,
        user_id: UserID,
        exercise_id: ExerciseID,
        update: AssignmentUpdate,
    ) -> Result<GeneratedAssignment, UpdateError> {
        log_on_error!(
            self.update_assignment(user_id, exercise_id, update),
            UpdateError,
            "update",
            "generated assignment"
        )
    }

    fn alternative_exercises(
        &self,
        user_id: UserID,
        exercise_id: ExerciseID,
        limit: usize,
    ) -> Result<Vec<Alternative>, ReadError> {
        log_on_error!(
            self.alternatives(user_id, exercise_id, limit),
            ReadError,
            "get",
            "alternative exercises"
        )
    }

    fn add_custom_assignments(
        &self,
        user_id: UserID,
        exercise_ids: &[ExerciseID],
    ) -> Result<Vec<GeneratedAssignment>, CreateError> {
        log_on_error!(
            self.add_custom(user_id, exercise_ids),
            CreateError,
            "add",
            "custom assignments"
        )
    }
}

impl<R: CatalogRepository + ExclusionRepository> Service<R> {
    fn exclude(
        &self,
        user_id: UserID,
        exercise_ids: &[ExerciseID],
        scope: Scope,
        reason: Option<String>,
    ) -> Result<Vec<Exclusion>, CreateError> {
        if exercise_ids.is_empty() {
            return Err(InvalidInput::Empty(Field::ExerciseIDs).into());
        }
        let ids = exercise_ids.iter().copied().collect::<BTreeSet<_>>();
        let known = self
            .repository
            .read_exercises(exercise_ids)?
            .into_iter()
            .map(|e| e.id)
            .collect::<BTreeSet<_>>();
        if let Some(unknown) = ids.difference(&known).next() {
            return Err(NotFound::Exercise(*unknown).into());
        }
        let now = self.clock.now();
        let scope = scope.on(now.date_naive());
        self.repository.upsert_exclusions(
            user_id,
            ids.into_iter()
                .map(|exercise_id| Exclusion {
                    exercise_id,
                    scope,
                    reason: reason.clone(),
                    created_at: now,
                })
                .collect(),
        )
    }

    fn unexclude(
        &self,
        user_id: UserID,
        exercise_ids: &[ExerciseID],
        scope: Scope,
    ) -> Result<Vec<ExerciseID>, DeleteError> {
        let Some(first) = exercise_ids.first() else {
            return Err(InvalidInput::Empty(Field::ExerciseIDs).into());
        };
        let scope = scope.on(self.clock.now().date_naive());
        let removed = self
            .repository
            .delete_exclusions(user_id, exercise_ids, scope)?;
        if removed.is_empty() {
            return Err(NotFound::Exclusion(*first).into());
        }
        Ok(removed)
    }

    fn active_exclusions(&self, user_id: UserID) -> Result<Vec<Exclusion>, ReadError> {
        let today = self.clock.now().date_naive();
        Ok(self
            .repository
            .read_exclusions(user_id)?
            .into_iter()
            .filter(|e| e.is_active(today))
            .collect())
    }
}

impl<R: CatalogRepository + ExclusionRepository> ExclusionService for Service<R> {
    fn exclude_exercises(
        &self,
        user_id: UserID,
        exercise_ids: &[ExerciseID],
        scope: Scope,
        reason: Option<String>,
    ) -> Result<Vec<Exclusion>, CreateError> {
        log_on_error!(
            self.exclude(user_id, exercise_ids, scope, reason),
            CreateError,
            "exclude",
            "exercises"
        )
    }

    fn remove_exclusions(
        &self,
        user_id: UserID,
        exercise_ids: &[ExerciseID],
        scope: Scope,
    ) -> Result<Vec<ExerciseID>, DeleteError> {
        log_on_error!(
            self.unexclude(user_id, exercise_ids, scope),
            DeleteError,
            "remove",
            "exclusions"
        )
    }

    fn list_exclusions(&self, user_id: UserID) -> Result<Vec<Exclusion>, ReadError> {
        log_on_error!(
            self.active_exclusions(user_id),
            ReadError,
            "list",
            "exclusions"
        )
    }
}
