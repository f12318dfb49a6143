use std::{cmp::Reverse, collections::BTreeSet};

use crate::{
    Candidate, Constraints, CreateError, DayNumber, Exercise, ExerciseID, FocusAreaID,
    GenerateError, InvalidInput, Mode, ReadError, Reps, Sets, UpdateError, UserID, UserProfile, Weight,
    one_rep_max, prescription, working_weight,
};

pub trait WorkoutService {
    /// Composes today's workout and replaces the generated assignments of the user.
    fn generate_workout(&self, user_id: UserID) -> Result<Workout, GenerateError>;
    fn get_generated_assignments(
        &self,
        user_id: UserID,
    ) -> Result<Vec<GeneratedAssignment>, ReadError>;
    fn update_generated_assignment(
        &self,
        user_id: UserID,
        exercise_id: ExerciseID,
        update: AssignmentUpdate,
    ) -> Result<GeneratedAssignment, UpdateError>;
    fn alternative_exercises(
        &self,
        user_id: UserID,
        exercise_id: ExerciseID,
        limit: usize,
    ) -> Result<Vec<Alternative>, ReadError>;
    /// Adds exercises picked by the user to today's assignments. Excluded exercises are
    /// rejected.
    fn add_custom_assignments(
        &self,
        user_id: UserID,
        exercise_ids: &[ExerciseID],
    ) -> Result<Vec<GeneratedAssignment>, CreateError>;
}

pub trait AssignmentRepository {
    /// The live assignments of the user in generated order.
    fn read_assignments(&self, user_id: UserID) -> Result<Vec<GeneratedAssignment>, ReadError>;
    /// Deletes all assignments of the user and inserts the given ones in one transaction.
    fn replace_assignments(
        &self,
        user_id: UserID,
        assignments: Vec<GeneratedAssignment>,
    ) -> Result<Vec<GeneratedAssignment>, UpdateError>;
    fn update_assignment(
        &self,
        user_id: UserID,
        exercise_id: ExerciseID,
        update: AssignmentUpdate,
    ) -> Result<GeneratedAssignment, UpdateError>;
    /// Appends the given assignments after the last position of the user and returns them with
    /// their stored positions. An exercise that is already assigned keeps its position and takes
    /// the new values.
    fn add_assignments(
        &self,
        user_id: UserID,
        assignments: Vec<GeneratedAssignment>,
    ) -> Result<Vec<GeneratedAssignment>, CreateError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    pub day: DayNumber,
    pub mode: Mode,
    pub items: Vec<WorkoutItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutItem {
    pub exercise: Exercise,
    pub focus_area: Option<FocusAreaID>,
    pub assignment: GeneratedAssignment,
}

/// Load prescription for one exercise of today's workout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratedAssignment {
    pub exercise_id: ExerciseID,
    pub position: u32,
    pub weight: Weight,
    pub reps: Reps,
    pub sets: Sets,
    pub one_rep_max: Weight,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AssignmentUpdate {
    pub weight: Option<Weight>,
    pub reps: Option<Reps>,
    pub sets: Option<Sets>,
}

impl AssignmentUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weight.is_none() && self.reps.is_none() && self.sets.is_none()
    }

    /// Applies the given values. The one-repetition maximum keeps its computed value.
    pub fn apply(&self, assignment: &mut GeneratedAssignment) -> Result<(), InvalidInput> {
        if self.is_empty() {
            return Err(InvalidInput::Empty(crate::Field::AssignmentValues));
        }
        if let Some(weight) = self.weight {
            assignment.weight = weight;
        }
        if let Some(reps) = self.reps {
            assignment.reps = reps;
        }
        if let Some(sets) = self.sets {
            assignment.sets = sets;
        }
        Ok(())
    }
}

/// Computes the assignments of a composed workout, numbered in display order.
#[must_use]
pub fn plan_assignments(workout: &[Candidate], profile: &UserProfile) -> Vec<GeneratedAssignment> {
    assign(workout.iter().map(|c| c.exercise.id), profile)
}

/// Computes the assignments of exercises picked by the user. Repeated ids are dropped and the
/// positions only reflect the given order.
#[must_use]
pub fn custom_assignments(
    exercise_ids: &[ExerciseID],
    profile: &UserProfile,
) -> Vec<GeneratedAssignment> {
    let mut seen = BTreeSet::new();
    assign(
        exercise_ids.iter().copied().filter(|id| seen.insert(*id)),
        profile,
    )
}

fn assign(
    exercise_ids: impl Iterator<Item = ExerciseID>,
    profile: &UserProfile,
) -> Vec<GeneratedAssignment> {
    let one_rep_max = one_rep_max(&profile.body);
    let weight = working_weight(&profile.body);
    let (reps, sets) = prescription(profile.fitness_level);
    exercise_ids
        .zip(1..)
        .map(|(exercise_id, position)| GeneratedAssignment {
            exercise_id,
            position,
            weight,
            reps,
            sets,
            one_rep_max,
        })
        .collect()
}

/// Exercise that can replace another one.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub exercise: Exercise,
    pub shared_focus_areas: BTreeSet<FocusAreaID>,
    /// Share of the original exercise's focus areas that the alternative also targets.
    pub similarity: f32,
}

/// Ranks eligible exercises by the number of focus areas they share with `original`, then by
/// id. Exercises without a shared focus area are dropped.
#[must_use]
pub fn rank_alternatives(
    original: &Exercise,
    exercises: &[Exercise],
    constraints: &Constraints,
    limit: usize,
) -> Vec<Alternative> {
    let mut alternatives = exercises
        .iter()
        .filter(|e| e.id != original.id && constraints.admits(e))
        .filter_map(|e| {
            let shared_focus_areas = original.shared_focus_areas(e);
            if shared_focus_areas.is_empty() {
                return None;
            }
            #[allow(clippy::cast_precision_loss)]
            let similarity = shared_focus_areas.len() as f32 / original.focus_areas.len() as f32;
            Some(Alternative {
                exercise: e.clone(),
                shared_focus_areas,
                similarity,
            })
        })
        .collect::<Vec<_>>();
    alternatives.sort_by_key(|a| (Reverse(a.shared_focus_areas.len()), a.exercise.id));
    alternatives.truncate(limit);
    alternatives
}
