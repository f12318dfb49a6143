#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod composition;
mod error;
mod exclusion;
mod exercise;
mod name;
mod routine;
mod routine_day;
mod selection;
mod service;
mod training;
mod user;
mod workout;

pub use composition::{Split, WorkoutComposer};
pub use error::{
    CreateError, DeleteError, Field, GenerateError, InvalidInput, NotFound, ReadError,
    StorageError, UpdateError,
};
pub use exclusion::{
    Exclusion, ExclusionRepository, ExclusionScope, ExclusionService, Scope, excluded_ids,
};
pub use exercise::{
    CatalogRepository, Equipment, EquipmentID, Exercise, ExerciseID, ExerciseType, FocusArea,
    FocusAreaID, HealthIssueID, baseline_equipment,
};
pub use name::{Name, NameError};
pub use routine::{
    DayContent, DayExercise, DayNumber, DayNumberError, DaySlot, DayStatus, Mode, RoutineID,
    RoutineOverview, RoutineRepository, RoutineService, RoutineTemplate, TemplateID, UserRoutine,
    active_routine, resolve_day,
};
pub use routine_day::{DayService, SwapOutcome};
pub use selection::{
    Candidate, Constraints, MAX_CANDIDATES, per_focus_area_limit, select_candidates,
    select_direct,
};
pub use service::Service;
pub use training::{
    Reps, RepsError, Sets, SetsError, Weight, WeightError, one_rep_max, prescription,
    working_weight,
};
pub use user::{
    BodyMetrics, Clock, FitnessLevel, Objective, ProfileRepository, Randomness, RandomnessError,
    SessionDuration, SystemClock, UserID, UserProfile,
};
pub use workout::{
    Alternative, AssignmentRepository, AssignmentUpdate, GeneratedAssignment, Workout,
    WorkoutItem, WorkoutService, custom_assignments, plan_assignments, rank_alternatives,
};
