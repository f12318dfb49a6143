use derive_more::{Display, Into};

use crate::{BodyMetrics, FitnessLevel};

#[derive(Debug, Display, Clone, Copy, Into, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reps(u32);

impl Reps {
    pub fn new(value: u32) -> Result<Self, RepsError> {
        if !(1..1000).contains(&value) {
            return Err(RepsError::OutOfRange);
        }

        Ok(Self(value))
    }
}

impl TryFrom<&str> for Reps {
    type Error = RepsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.parse::<u32>() {
            Ok(parsed_value) => Reps::new(parsed_value),
            Err(_) => Err(RepsError::ParseError),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum RepsError {
    #[error("Reps must be in the range 1 to 999")]
    OutOfRange,
    #[error("Reps must be an integer")]
    ParseError,
}

#[derive(Debug, Display, Clone, Copy, Into, PartialEq, Eq, PartialOrd, Ord)]
pub struct Sets(u32);

impl Sets {
    pub fn new(value: u32) -> Result<Self, SetsError> {
        if !(1..100).contains(&value) {
            return Err(SetsError::OutOfRange);
        }

        Ok(Self(value))
    }
}

impl TryFrom<&str> for Sets {
    type Error = SetsError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.parse::<u32>() {
            Ok(parsed_value) => Sets::new(parsed_value),
            Err(_) => Err(SetsError::ParseError),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SetsError {
    #[error("Sets must be in the range 1 to 99")]
    OutOfRange,
    #[error("Sets must be an integer")]
    ParseError,
}

/// Load in kg with a resolution of 0.1 kg.
#[derive(Debug, Default, Display, Clone, Copy, Into, PartialEq, PartialOrd)]
pub struct Weight(f32);

impl Weight {
    pub fn new(value: f32) -> Result<Self, WeightError> {
        if !(0.0..1000.0).contains(&value) {
            return Err(WeightError::OutOfRange);
        }

        if ((value * 10.0).round() - value * 10.0).abs() > 1e-3 {
            return Err(WeightError::InvalidResolution);
        }

        Ok(Self(value))
    }

    /// Rounds to the nearest 0.1 kg within the valid range.
    #[must_use]
    pub fn rounded(value: f32) -> Self {
        Self(((value * 10.0).round() / 10.0).clamp(0.0, 999.9))
    }
}

impl TryFrom<&str> for Weight {
    type Error = WeightError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.parse::<f32>() {
            Ok(parsed_value) => Weight::new(parsed_value),
            Err(_) => Err(WeightError::ParseError),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum WeightError {
    #[error("Weight must be in the range 0.0 to 999.9 kg")]
    OutOfRange,
    #[error("Weight must be a multiple of 0.1 kg")]
    InvalidResolution,
    #[error("Weight must be a decimal")]
    ParseError,
}

/// Estimated one-repetition maximum derived from body metrics.
#[must_use]
pub fn one_rep_max(body: &BodyMetrics) -> Weight {
    Weight::rounded(estimate_one_rep_max(body))
}

/// Default load for a user: half of the estimated one-repetition maximum, rounded once.
#[must_use]
pub fn working_weight(body: &BodyMetrics) -> Weight {
    Weight::rounded(estimate_one_rep_max(body) / 2.0)
}

#[allow(clippy::cast_precision_loss)]
fn estimate_one_rep_max(body: &BodyMetrics) -> f32 {
    0.6 * body.weight_kg + 0.08 * body.height_cm as f32 - 0.3 * body.age as f32 + 10.0
}

/// Repetitions and sets prescribed for a fitness level.
#[must_use]
pub fn prescription(fitness_level: FitnessLevel) -> (Reps, Sets) {
    match fitness_level {
        FitnessLevel::Beginner => (Reps(15), Sets(3)),
        FitnessLevel::Intermediate => (Reps(12), Sets(3)),
        FitnessLevel::Advanced => (Reps(10), Sets(3)),
    }
}
