use std::fmt;

use crate::{DayNumber, ExerciseID, FocusAreaID, Mode, RoutineID, TemplateID};

#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(thiserror::Error, Debug)]
pub enum CreateError {
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ReadError> for CreateError {
    fn from(value: ReadError) -> Self {
        match value {
            ReadError::NotFound(not_found) => CreateError::NotFound(not_found),
            ReadError::Storage(storage) => CreateError::Storage(storage),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum UpdateError {
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ReadError> for UpdateError {
    fn from(value: ReadError) -> Self {
        match value {
            ReadError::NotFound(not_found) => UpdateError::NotFound(not_found),
            ReadError::Storage(storage) => UpdateError::Storage(storage),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DeleteError {
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failure of a workout generation request.
///
/// `EmptyCandidatePool` is kept apart from `NotFound`: the routine and the day were resolved,
/// but no exercise qualifies under the current constraints.
#[derive(thiserror::Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    NotFound(#[from] NotFound),
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error("no exercise matches the current constraints")]
    EmptyCandidatePool,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ReadError> for GenerateError {
    fn from(value: ReadError) -> Self {
        match value {
            ReadError::NotFound(not_found) => GenerateError::NotFound(not_found),
            ReadError::Storage(storage) => GenerateError::Storage(storage),
        }
    }
}

impl From<UpdateError> for GenerateError {
    fn from(value: UpdateError) -> Self {
        match value {
            UpdateError::NotFound(not_found) => GenerateError::NotFound(not_found),
            UpdateError::InvalidInput(invalid) => GenerateError::InvalidInput(invalid),
            UpdateError::Storage(storage) => GenerateError::Storage(storage),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("storage lock poisoned")]
    Poisoned,
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    #[error("user not found")]
    User,
    #[error("no active routine")]
    ActiveRoutine,
    #[error("active routine has no days")]
    ActiveRoutineDay,
    #[error("routine {0} not found")]
    Routine(RoutineID),
    #[error("routine template {0} not found")]
    Template(TemplateID),
    #[error("day {0} not found")]
    Day(DayNumber),
    #[error("focus area {0} not found")]
    FocusArea(FocusAreaID),
    #[error("exercise {0} not found")]
    Exercise(ExerciseID),
    #[error("no generated assignment for exercise {0}")]
    Assignment(ExerciseID),
    #[error("no exclusion for exercise {0}")]
    Exclusion(ExerciseID),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    #[error("day {day} is not a slot of the active routine (1 to {days})")]
    DayOutOfRange { day: u32, days: usize },
    #[error("day {day} is in {mode} mode")]
    WrongMode { day: DayNumber, mode: Mode },
    #[error("routine must keep at least one day")]
    LastDay,
    #[error("routines have already been provisioned")]
    AlreadyProvisioned,
    #[error("exercise {0} is excluded")]
    Excluded(ExerciseID),
    #[error("no {0} given")]
    Empty(Field),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ExerciseIDs,
    AssignmentValues,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Field::ExerciseIDs => "exercise ids",
                Field::AssignmentValues => "weight, reps or sets",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_error_from_read_error() {
        assert!(matches!(
            UpdateError::from(ReadError::NotFound(NotFound::ActiveRoutine)),
            UpdateError::NotFound(NotFound::ActiveRoutine)
        ));
        assert!(matches!(
            UpdateError::from(ReadError::Storage(StorageError::Poisoned)),
            UpdateError::Storage(StorageError::Poisoned)
        ));
    }

    #[test]
    fn test_create_error_from_read_error() {
        assert!(matches!(
            CreateError::from(ReadError::NotFound(NotFound::User)),
            CreateError::NotFound(NotFound::User)
        ));
        assert!(matches!(
            CreateError::from(ReadError::Storage(StorageError::Other("foo".into()))),
            CreateError::Storage(StorageError::Other(error)) if error.to_string() == "foo"
        ));
    }

    #[test]
    fn test_generate_error_from_update_error() {
        assert!(matches!(
            GenerateError::from(UpdateError::NotFound(NotFound::Day(DayNumber::ONE))),
            GenerateError::NotFound(NotFound::Day(DayNumber::ONE))
        ));
        assert!(matches!(
            GenerateError::from(UpdateError::InvalidInput(InvalidInput::LastDay)),
            GenerateError::InvalidInput(InvalidInput::LastDay)
        ));
        assert!(matches!(
            GenerateError::from(UpdateError::Storage(StorageError::Poisoned)),
            GenerateError::Storage(StorageError::Poisoned)
        ));
    }

    #[test]
    fn test_generate_error_from_read_error() {
        assert!(matches!(
            GenerateError::from(ReadError::NotFound(NotFound::User)),
            GenerateError::NotFound(NotFound::User)
        ));
    }

    #[test]
    fn test_invalid_input_display() {
        assert_eq!(
            InvalidInput::DayOutOfRange { day: 6, days: 5 }.to_string(),
            "day 6 is not a slot of the active routine (1 to 5)"
        );
        assert_eq!(
            InvalidInput::Empty(Field::ExerciseIDs).to_string(),
            "no exercise ids given"
        );
    }
}
