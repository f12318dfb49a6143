use std::collections::{BTreeMap, BTreeSet};

use crate::{
    EquipmentID, Exercise, ExerciseID, ExerciseType, FitnessLevel, FocusAreaID, GenerateError,
    HealthIssueID, UserProfile,
};

/// Upper bound of the candidate pool handed to the composer. Days with more focus areas than
/// this still get one candidate per focus area.
pub const MAX_CANDIDATES: usize = 50;

/// Number of candidates the pool should hold across all focus areas of a day.
const CANDIDATE_BUDGET: usize = 30;

/// Eligibility rules derived from a user profile and the user's exclusions.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraints {
    pub fitness_level: FitnessLevel,
    /// Equipment of the profile plus the baseline equipment.
    pub equipment: BTreeSet<EquipmentID>,
    pub health_issues: BTreeSet<HealthIssueID>,
    pub exercise_type: Option<ExerciseType>,
    pub excluded: BTreeSet<ExerciseID>,
}

impl Constraints {
    #[must_use]
    pub fn new(
        profile: &UserProfile,
        baseline_equipment: &BTreeSet<EquipmentID>,
        excluded: BTreeSet<ExerciseID>,
    ) -> Self {
        Self {
            fitness_level: profile.fitness_level,
            equipment: profile
                .equipment
                .union(baseline_equipment)
                .copied()
                .collect(),
            health_issues: profile.health_issues.clone(),
            exercise_type: profile.objective.map(|o| o.exercise_type()),
            excluded,
        }
    }

    #[must_use]
    pub fn admits(&self, exercise: &Exercise) -> bool {
        !self.excluded.contains(&exercise.id)
            && exercise.fitness_levels.contains(&self.fitness_level)
            && !exercise.equipment.is_disjoint(&self.equipment)
            && exercise.contraindications.is_disjoint(&self.health_issues)
            && self
                .exercise_type
                .is_none_or(|exercise_type| exercise.exercise_type == exercise_type)
    }
}

/// Exercise of the candidate pool, labelled with the focus area it was selected for.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub exercise: Exercise,
    pub focus_area: Option<FocusAreaID>,
}

/// Number of candidates taken per focus area, so that the pool comfortably exceeds the
/// `target` size of the workout.
#[must_use]
pub fn per_focus_area_limit(target: usize, focus_areas: usize) -> usize {
    let focus_areas = focus_areas.max(1);
    (target / focus_areas)
        .min(2)
        .max(CANDIDATE_BUDGET / focus_areas)
        .max(1)
}

/// Builds the candidate pool of a focus area day.
///
/// Every focus area contributes its first `limit` eligible exercises in id order, but no more
/// than its share of `MAX_CANDIDATES`. An exercise matching several focus areas is kept once,
/// labelled with the focus area where it ranked best (ties go to the lower focus area id). The
/// pool is sorted by exercise id.
pub fn select_candidates(
    exercises: &[Exercise],
    focus_areas: &BTreeSet<FocusAreaID>,
    constraints: &Constraints,
    limit: usize,
) -> Result<Vec<Candidate>, GenerateError> {
    let mut eligible = exercises
        .iter()
        .filter(|e| constraints.admits(e))
        .collect::<Vec<_>>();
    eligible.sort_by_key(|e| e.id);
    let limit = limit.min((MAX_CANDIDATES / focus_areas.len().max(1)).max(1));

    let mut best: BTreeMap<ExerciseID, (usize, FocusAreaID, &Exercise)> = BTreeMap::new();
    for focus_area in focus_areas {
        for (rank, exercise) in eligible
            .iter()
            .copied()
            .filter(|e| e.targets(*focus_area))
            .take(limit)
            .enumerate()
        {
            best.entry(exercise.id)
                .and_modify(|entry| {
                    if (rank, *focus_area) < (entry.0, entry.1) {
                        *entry = (rank, *focus_area, exercise);
                    }
                })
                .or_insert((rank, *focus_area, exercise));
        }
    }

    let candidates = best
        .into_values()
        .map(|(_, focus_area, exercise)| Candidate {
            exercise: exercise.clone(),
            focus_area: Some(focus_area),
        })
        .collect::<Vec<_>>();

    if candidates.is_empty() {
        return Err(GenerateError::EmptyCandidatePool);
    }

    Ok(candidates)
}

/// Builds the exercise list of a direct exercise day: the stored exercises in `order` minus
/// the excluded ones. Ids missing from `exercises` are skipped.
pub fn select_direct(
    exercises: &[Exercise],
    order: &[ExerciseID],
    excluded: &BTreeSet<ExerciseID>,
) -> Result<Vec<Candidate>, GenerateError> {
    let by_id = exercises
        .iter()
        .map(|e| (e.id, e))
        .collect::<BTreeMap<_, _>>();
    let mut seen = BTreeSet::new();
    let candidates = order
        .iter()
        .filter(|id| !excluded.contains(*id) && seen.insert(**id))
        .filter_map(|id| by_id.get(id))
        .map(|exercise| Candidate {
            exercise: (*exercise).clone(),
            focus_area: Some(exercise.primary_focus_area),
        })
        .collect::<Vec<_>>();

    if candidates.is_empty() {
        return Err(GenerateError::EmptyCandidatePool);
    }

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{BodyMetrics, Name, Objective, Randomness, SessionDuration};

    const BODYWEIGHT: u128 = 100;
    const DUMBBELL: u128 = 101;
    const BARBELL: u128 = 102;
    const KNEE: u128 = 200;

    fn exercise(
        id: u128,
        focus_areas: &[u128],
        equipment: &[u128],
        contraindications: &[u128],
    ) -> Exercise {
        Exercise {
            id: id.into(),
            name: Name::new(&format!("Exercise {id}")).unwrap(),
            exercise_type: ExerciseType::MuscleGrowth,
            focus_areas: focus_areas.iter().map(|f| (*f).into()).collect(),
            primary_focus_area: focus_areas[0].into(),
            fitness_levels: BTreeSet::from([FitnessLevel::Beginner, FitnessLevel::Intermediate]),
            equipment: equipment.iter().map(|e| (*e).into()).collect(),
            contraindications: contraindications.iter().map(|h| (*h).into()).collect(),
        }
    }

    static EXERCISES: LazyLock<Vec<Exercise>> = LazyLock::new(|| {
        vec![
            exercise(7, &[1], &[BODYWEIGHT], &[]),
            exercise(3, &[1, 2], &[DUMBBELL], &[]),
            exercise(5, &[2], &[BARBELL], &[]),
            exercise(1, &[1], &[BODYWEIGHT], &[KNEE]),
            exercise(9, &[2, 3], &[BODYWEIGHT, BARBELL], &[]),
            exercise(4, &[3], &[BODYWEIGHT], &[]),
            exercise(8, &[2], &[BODYWEIGHT], &[]),
        ]
    });

    fn profile() -> UserProfile {
        UserProfile {
            id: 1.into(),
            fitness_level: FitnessLevel::Beginner,
            equipment: BTreeSet::from([DUMBBELL.into()]),
            health_issues: BTreeSet::from([KNEE.into()]),
            objective: None,
            randomness: Randomness::default(),
            session_duration: SessionDuration::default(),
            body: BodyMetrics::default(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn constraints(excluded: &[u128]) -> Constraints {
        Constraints::new(
            &profile(),
            &BTreeSet::from([BODYWEIGHT.into()]),
            excluded.iter().map(|e| (*e).into()).collect(),
        )
    }

    fn focus_areas(ids: &[u128]) -> BTreeSet<FocusAreaID> {
        ids.iter().map(|id| (*id).into()).collect()
    }

    fn pool(candidates: &[Candidate]) -> Vec<(ExerciseID, Option<FocusAreaID>)> {
        candidates
            .iter()
            .map(|c| (c.exercise.id, c.focus_area))
            .collect()
    }

    #[test]
    fn test_constraints_include_baseline_equipment() {
        assert_eq!(
            constraints(&[]).equipment,
            BTreeSet::from([BODYWEIGHT.into(), DUMBBELL.into()])
        );
    }

    #[rstest]
    #[case(exercise(1, &[1], &[BODYWEIGHT], &[]), true)]
    #[case(exercise(1, &[1], &[DUMBBELL, BARBELL], &[]), true)]
    #[case(exercise(1, &[1], &[BARBELL], &[]), false)]
    #[case(exercise(1, &[1], &[], &[]), false)]
    #[case(exercise(1, &[1], &[BODYWEIGHT], &[KNEE]), false)]
    #[case(exercise(2, &[1], &[BODYWEIGHT], &[]), false)]
    fn test_constraints_admits(#[case] exercise: Exercise, #[case] expected: bool) {
        assert_eq!(constraints(&[2]).admits(&exercise), expected);
    }

    #[test]
    fn test_constraints_fitness_level() {
        let mut exercise = exercise(1, &[1], &[BODYWEIGHT], &[]);
        exercise.fitness_levels = BTreeSet::from([FitnessLevel::Advanced]);
        assert!(!constraints(&[]).admits(&exercise));
    }

    #[test]
    fn test_constraints_objective() {
        let mut profile = profile();
        profile.objective = Some(Objective::Cardio);
        let constraints = Constraints::new(&profile, &BTreeSet::new(), BTreeSet::new());
        let mut exercise = exercise(1, &[1], &[DUMBBELL], &[]);
        assert!(!constraints.admits(&exercise));
        exercise.exercise_type = ExerciseType::Cardio;
        assert!(constraints.admits(&exercise));
    }

    #[rstest]
    #[case(4, 1, 30)]
    #[case(4, 2, 15)]
    #[case(7, 3, 10)]
    #[case(2, 40, 1)]
    #[case(4, 0, 30)]
    fn test_per_focus_area_limit(
        #[case] target: usize,
        #[case] focus_areas: usize,
        #[case] expected: usize,
    ) {
        assert_eq!(per_focus_area_limit(target, focus_areas), expected);
    }

    #[test]
    fn test_select_candidates() {
        let candidates =
            select_candidates(&EXERCISES, &focus_areas(&[1, 2, 3]), &constraints(&[]), 10)
                .unwrap();
        assert_eq!(
            pool(&candidates),
            vec![
                (3.into(), Some(1.into())),
                (4.into(), Some(3.into())),
                (7.into(), Some(1.into())),
                (8.into(), Some(2.into())),
                (9.into(), Some(3.into())),
            ]
        );
    }

    #[test]
    fn test_select_candidates_limit_per_focus_area() {
        let candidates =
            select_candidates(&EXERCISES, &focus_areas(&[1, 2]), &constraints(&[]), 1).unwrap();
        assert_eq!(pool(&candidates), vec![(3.into(), Some(1.into()))]);

        let candidates =
            select_candidates(&EXERCISES, &focus_areas(&[1, 2]), &constraints(&[3]), 1).unwrap();
        assert_eq!(
            pool(&candidates),
            vec![(7.into(), Some(1.into())), (8.into(), Some(2.into()))]
        );
    }

    #[test]
    fn test_select_candidates_no_duplicates() {
        let candidates =
            select_candidates(&EXERCISES, &focus_areas(&[1, 2, 3]), &constraints(&[]), 10)
                .unwrap();
        let ids = candidates
            .iter()
            .map(|c| c.exercise.id)
            .collect::<BTreeSet<_>>();
        assert_eq!(ids.len(), candidates.len());
    }

    #[test]
    fn test_select_candidates_excluded_never_selected() {
        let candidates =
            select_candidates(&EXERCISES, &focus_areas(&[1, 2, 3]), &constraints(&[3, 9]), 10)
                .unwrap();
        assert_eq!(
            pool(&candidates),
            vec![
                (4.into(), Some(3.into())),
                (7.into(), Some(1.into())),
                (8.into(), Some(2.into())),
            ]
        );
    }

    #[test]
    fn test_select_candidates_capped() {
        let exercises = (1..=80)
            .map(|id| exercise(id, &[1], &[BODYWEIGHT], &[]))
            .collect::<Vec<_>>();
        let candidates =
            select_candidates(&exercises, &focus_areas(&[1]), &constraints(&[]), 100).unwrap();
        assert_eq!(candidates.len(), MAX_CANDIDATES);
        assert_eq!(candidates[0].exercise.id, 1.into());
    }

    #[test]
    fn test_select_candidates_capped_per_focus_area() {
        let exercises = (1..=60)
            .map(|id| exercise(id, &[(id + 1) / 2], &[BODYWEIGHT], &[]))
            .collect::<Vec<_>>();
        let requested = (1..=30).collect::<Vec<u128>>();
        let candidates =
            select_candidates(&exercises, &focus_areas(&requested), &constraints(&[]), 2)
                .unwrap();
        assert_eq!(candidates.len(), 30);
        assert_eq!(
            candidates
                .iter()
                .filter_map(|c| c.focus_area)
                .collect::<BTreeSet<_>>(),
            focus_areas(&requested)
        );
    }

    #[rstest]
    #[case(&[4], &[])]
    #[case(&[1, 2, 3], &[3, 4, 7, 8, 9])]
    #[case(&[], &[])]
    fn test_select_candidates_empty_pool(#[case] focus: &[u128], #[case] excluded: &[u128]) {
        assert!(matches!(
            select_candidates(&EXERCISES, &focus_areas(focus), &constraints(excluded), 10),
            Err(GenerateError::EmptyCandidatePool)
        ));
    }

    #[test]
    fn test_select_direct() {
        let candidates = select_direct(
            &EXERCISES,
            &[9.into(), 5.into(), 42.into(), 1.into(), 9.into()],
            &BTreeSet::from([1.into()]),
        )
        .unwrap();
        assert_eq!(
            pool(&candidates),
            vec![(9.into(), Some(2.into())), (5.into(), Some(2.into()))]
        );
    }

    #[test]
    fn test_select_direct_labels_primary_focus_area() {
        let mut pull_up = exercise(6, &[1, 2], &[BODYWEIGHT], &[]);
        pull_up.primary_focus_area = 2.into();
        let candidates =
            select_direct(&[pull_up], &[6.into()], &BTreeSet::new()).unwrap();
        assert_eq!(pool(&candidates), vec![(6.into(), Some(2.into()))]);
    }

    #[test]
    fn test_select_direct_all_excluded() {
        assert!(matches!(
            select_direct(&EXERCISES, &[5.into()], &BTreeSet::from([5.into()])),
            Err(GenerateError::EmptyCandidatePool)
        ));
        assert!(matches!(
            select_direct(&EXERCISES, &[], &BTreeSet::new()),
            Err(GenerateError::EmptyCandidatePool)
        ));
    }
}
