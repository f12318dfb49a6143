use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use rand::{Rng, seq::SliceRandom};

use crate::{Candidate, FocusAreaID, GenerateError, Randomness};

/// Assembles the exercise list of a focus area day from a candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkoutComposer {
    pub target: usize,
    pub randomness: Randomness,
}

/// Deterministic part of a composition.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// Exercises ensuring that every focus area with candidates is represented.
    pub guaranteed: Vec<Candidate>,
    /// Remainder taken in id order.
    pub fixed: Vec<Candidate>,
    /// Remainder that random picks are drawn from.
    pub rest: Vec<Candidate>,
    pub random: usize,
}

impl WorkoutComposer {
    #[must_use]
    pub fn new(target: usize, randomness: Randomness) -> Self {
        Self { target, randomness }
    }

    /// Splits an id sorted candidate pool into guaranteed, fixed and randomly drawn parts.
    ///
    /// Every focus area contributes its lowest id candidate, and a second one as long as the
    /// guaranteed part is smaller than the target. Of the remaining slots, the share given by
    /// the randomness (rounded down) is left to random picks, the rest is filled in id order.
    #[must_use]
    pub fn split(&self, pool: Vec<Candidate>) -> Split {
        let mut groups: BTreeMap<Option<FocusAreaID>, Vec<usize>> = BTreeMap::new();
        for (index, candidate) in pool.iter().enumerate() {
            groups.entry(candidate.focus_area).or_default().push(index);
        }

        let mut guaranteed_indices = groups
            .values()
            .filter_map(|indices| indices.first().copied())
            .collect::<Vec<_>>();
        for indices in groups.values() {
            if guaranteed_indices.len() >= self.target {
                break;
            }
            if let Some(second) = indices.get(1) {
                guaranteed_indices.push(*second);
            }
        }
        let guaranteed_set = guaranteed_indices.iter().copied().collect::<BTreeSet<_>>();

        let mut slots = pool.into_iter().map(Some).collect::<Vec<_>>();
        let guaranteed = guaranteed_indices
            .iter()
            .filter_map(|index| slots[*index].take())
            .collect::<Vec<_>>();
        let mut remainder = slots
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !guaranteed_set.contains(index))
            .filter_map(|(_, candidate)| candidate)
            .collect::<Vec<_>>();

        let remaining = self.target.saturating_sub(guaranteed.len());
        let fixed_count = (remaining * (100 - self.randomness.percent()))
            .div_ceil(100)
            .min(remainder.len());
        let rest = remainder.split_off(fixed_count);
        let random = (remaining - fixed_count).min(rest.len());

        Split {
            guaranteed,
            fixed: remainder,
            rest,
            random,
        }
    }

    /// Composes the final list: at most `target` distinct exercises in random display order.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        pool: Vec<Candidate>,
        rng: &mut R,
    ) -> Result<Vec<Candidate>, GenerateError> {
        if pool.is_empty() {
            return Err(GenerateError::EmptyCandidatePool);
        }

        let pool_size = pool.len();
        let Split {
            guaranteed,
            fixed,
            mut rest,
            random,
        } = self.split(pool);

        debug!(
            "compose {} of {pool_size} candidates: {} guaranteed, {} fixed, {random} random",
            self.target,
            guaranteed.len(),
            fixed.len(),
        );

        let (drawn, _) = rest.partial_shuffle(rng, random);
        let mut workout = guaranteed
            .into_iter()
            .chain(fixed)
            .chain(drawn.iter().cloned())
            .collect::<Vec<_>>();
        workout.truncate(self.target);
        workout.shuffle(rng);

        Ok(workout)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;

    use super::*;
    use crate::{
        Constraints, Exercise, ExerciseID, ExerciseType, FitnessLevel, Name, select_candidates,
    };

    fn candidate(id: u128, focus_area: u128) -> Candidate {
        Candidate {
            exercise: Exercise {
                id: id.into(),
                name: Name::new(&format!("Exercise {id}")).unwrap(),
                exercise_type: ExerciseType::Strength,
                focus_areas: BTreeSet::from([focus_area.into()]),
                primary_focus_area: focus_area.into(),
                fitness_levels: BTreeSet::from([FitnessLevel::Beginner]),
                equipment: BTreeSet::new(),
                contraindications: BTreeSet::new(),
            },
            focus_area: Some(focus_area.into()),
        }
    }

    /// Pool of 12 candidates over the focus areas 1, 2 and 3.
    fn pool() -> Vec<Candidate> {
        vec![
            candidate(1, 1),
            candidate(2, 2),
            candidate(3, 1),
            candidate(4, 3),
            candidate(5, 1),
            candidate(6, 2),
            candidate(7, 1),
            candidate(8, 2),
            candidate(9, 1),
            candidate(10, 1),
            candidate(11, 2),
            candidate(12, 1),
        ]
    }

    fn ids(candidates: &[Candidate]) -> Vec<ExerciseID> {
        candidates.iter().map(|c| c.exercise.id).collect()
    }

    fn id_set(candidates: &[Candidate]) -> BTreeSet<ExerciseID> {
        candidates.iter().map(|c| c.exercise.id).collect()
    }

    fn randomness(value: u8) -> Randomness {
        Randomness::new(value).unwrap()
    }

    #[test]
    fn test_split_guarantees_each_focus_area() {
        let split = WorkoutComposer::new(4, randomness(0)).split(pool());
        assert_eq!(ids(&split.guaranteed), vec![1.into(), 2.into(), 4.into(), 3.into()]);
        assert!(split.fixed.is_empty());
        assert_eq!(split.random, 0);
    }

    #[test]
    fn test_split_adds_second_members_up_to_target() {
        let split = WorkoutComposer::new(7, randomness(0)).split(pool());
        assert_eq!(
            ids(&split.guaranteed),
            vec![1.into(), 2.into(), 4.into(), 3.into(), 6.into()]
        );
        assert_eq!(ids(&split.fixed), vec![5.into(), 7.into()]);
        assert_eq!(split.random, 0);
    }

    #[rstest]
    #[case(0, 5, 0)]
    #[case(25, 4, 1)]
    #[case(50, 3, 2)]
    #[case(90, 1, 4)]
    #[case(100, 0, 5)]
    fn test_split_fixed_random_ratio(
        #[case] value: u8,
        #[case] fixed: usize,
        #[case] random: usize,
    ) {
        let split = WorkoutComposer::new(10, randomness(value)).split(pool());
        assert_eq!(split.guaranteed.len(), 5);
        assert_eq!(split.fixed.len(), fixed);
        assert_eq!(split.random, random);
        assert_eq!(split.fixed.len() + split.rest.len(), 7);
        assert_eq!(
            ids(&split.fixed),
            [5_u128, 7, 8, 9, 10][..fixed]
                .iter()
                .map(|id| ExerciseID::from(*id))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_split_small_pool() {
        let split = WorkoutComposer::new(10, randomness(0)).split(vec![candidate(3, 1)]);
        assert_eq!(ids(&split.guaranteed), vec![3.into()]);
        assert!(split.fixed.is_empty());
        assert!(split.rest.is_empty());
        assert_eq!(split.random, 0);
    }

    #[rstest]
    #[case(2, 0)]
    #[case(4, 50)]
    #[case(7, 100)]
    #[case(10, 30)]
    #[case(20, 100)]
    fn test_compose_length_and_uniqueness(#[case] target: usize, #[case] value: u8) {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let workout = WorkoutComposer::new(target, randomness(value))
            .compose(pool(), &mut rng)
            .unwrap();
        assert_eq!(workout.len(), target.min(pool().len()));
        assert_eq!(id_set(&workout).len(), workout.len());
        assert!(id_set(&workout).is_subset(&id_set(&pool())));
    }

    #[rstest]
    #[case(3)]
    #[case(4)]
    #[case(9)]
    fn test_compose_covers_all_focus_areas(#[case] target: usize) {
        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let workout = WorkoutComposer::new(target, randomness(100))
                .compose(pool(), &mut rng)
                .unwrap();
            assert_eq!(
                workout
                    .iter()
                    .filter_map(|c| c.focus_area)
                    .collect::<BTreeSet<_>>(),
                BTreeSet::from([1.into(), 2.into(), 3.into()])
            );
        }
    }

    fn bodyweight_exercise(id: u128, focus_areas: &[u128]) -> Exercise {
        Exercise {
            id: id.into(),
            name: Name::new(&format!("Exercise {id}")).unwrap(),
            exercise_type: ExerciseType::Strength,
            focus_areas: focus_areas.iter().map(|f| (*f).into()).collect(),
            primary_focus_area: focus_areas[0].into(),
            fitness_levels: BTreeSet::from([FitnessLevel::Beginner]),
            equipment: BTreeSet::from([1.into()]),
            contraindications: BTreeSet::new(),
        }
    }

    /// Focus area 2 is only reachable through the exercise `shared`, which also targets focus
    /// area 1 and carries a single label in the pool.
    #[rstest]
    #[case(1, 1)]
    #[case(5, 2)]
    fn test_compose_covers_focus_areas_of_shared_exercise(
        #[case] shared: u128,
        #[case] label: u128,
    ) {
        let exercises = (1..=5)
            .map(|id| {
                if id == shared {
                    bodyweight_exercise(id, &[1, 2])
                } else {
                    bodyweight_exercise(id, &[1])
                }
            })
            .chain([bodyweight_exercise(6, &[3]), bodyweight_exercise(7, &[3])])
            .collect::<Vec<_>>();
        let requested = BTreeSet::from([1.into(), 2.into(), 3.into()]);
        let constraints = Constraints {
            fitness_level: FitnessLevel::Beginner,
            equipment: BTreeSet::from([1.into()]),
            health_issues: BTreeSet::new(),
            exercise_type: None,
            excluded: BTreeSet::new(),
        };

        let pool = select_candidates(&exercises, &requested, &constraints, 10).unwrap();
        assert_eq!(
            pool.iter()
                .find(|c| c.exercise.id == shared.into())
                .and_then(|c| c.focus_area),
            Some(label.into())
        );

        for target in 3..=6 {
            for seed in 0..10 {
                let workout = WorkoutComposer::new(target, randomness(100))
                    .compose(pool.clone(), &mut ChaCha8Rng::seed_from_u64(seed))
                    .unwrap();
                assert_eq!(
                    workout
                        .iter()
                        .flat_map(|c| c.exercise.focus_areas.iter().copied())
                        .collect::<BTreeSet<_>>(),
                    requested
                );
            }
        }
    }

    #[test]
    fn test_compose_deterministic_without_randomness() {
        let composer = WorkoutComposer::new(8, randomness(0));
        let first = composer
            .compose(pool(), &mut ChaCha8Rng::seed_from_u64(1))
            .unwrap();
        let second = composer
            .compose(pool(), &mut ChaCha8Rng::seed_from_u64(2))
            .unwrap();
        assert_eq!(id_set(&first), id_set(&second));
        assert_eq!(
            id_set(&first),
            [1_u128, 2, 3, 4, 5, 6, 7, 8]
                .into_iter()
                .map(ExerciseID::from)
                .collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn test_compose_reproducible_with_seed() {
        let composer = WorkoutComposer::new(8, randomness(60));
        assert_eq!(
            composer.compose(pool(), &mut ChaCha8Rng::seed_from_u64(42)).unwrap(),
            composer.compose(pool(), &mut ChaCha8Rng::seed_from_u64(42)).unwrap()
        );
    }

    #[test]
    fn test_compose_empty_pool() {
        assert!(matches!(
            WorkoutComposer::new(4, randomness(50)).compose(vec![], &mut ChaCha8Rng::seed_from_u64(0)),
            Err(GenerateError::EmptyCandidatePool)
        ));
    }
}
