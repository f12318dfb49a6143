use std::{collections::BTreeSet, str::FromStr};

use cadence_domain as domain;
use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use uuid::Uuid;

use crate::{Database, DatabaseError};

const FOREVER: &str = "forever";

fn parse<T>(value: &str) -> Result<T, DatabaseError>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(DatabaseError::invalid)
}

fn name(value: &str) -> Result<domain::Name, DatabaseError> {
    domain::Name::new(value).map_err(DatabaseError::invalid)
}

fn day_number(value: u32) -> Result<domain::DayNumber, DatabaseError> {
    domain::DayNumber::new(value).map_err(DatabaseError::invalid)
}

#[allow(clippy::cast_possible_truncation)]
fn weight(value: f64) -> Result<domain::Weight, DatabaseError> {
    domain::Weight::new(value as f32).map_err(DatabaseError::invalid)
}

fn kilograms(weight: domain::Weight) -> f64 {
    f64::from(f32::from(weight))
}

pub(crate) fn scope_to_sql(scope: domain::ExclusionScope) -> String {
    match scope {
        domain::ExclusionScope::Forever => FOREVER.to_string(),
        domain::ExclusionScope::Day(date) => date.format("%Y-%m-%d").to_string(),
    }
}

pub(crate) fn scope_from_sql(value: &str) -> Result<domain::ExclusionScope, DatabaseError> {
    if value == FOREVER {
        return Ok(domain::ExclusionScope::Forever);
    }
    Ok(domain::ExclusionScope::Day(
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(DatabaseError::invalid)?,
    ))
}

/// Ids returned by a query with a single id column and a single id parameter.
fn id_set<T: From<Uuid> + Ord>(
    connection: &Connection,
    sql: &str,
    key: Uuid,
) -> Result<BTreeSet<T>, DatabaseError> {
    let mut statement = connection.prepare_cached(sql)?;
    let ids = statement
        .query_map([key], |row| row.get::<_, Uuid>(0))?
        .map(|id| id.map(T::from))
        .collect::<rusqlite::Result<_>>()?;
    Ok(ids)
}

fn strings(connection: &Connection, sql: &str, key: Uuid) -> Result<Vec<String>, DatabaseError> {
    let mut statement = connection.prepare_cached(sql)?;
    let values = statement
        .query_map([key], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;
    Ok(values)
}

pub(crate) fn load_exercise(
    connection: &Connection,
    id: Uuid,
) -> Result<Option<domain::Exercise>, DatabaseError> {
    let Some((exercise_name, exercise_type, primary_focus_area)) = connection
        .query_row(
            "SELECT name, exercise_type, primary_focus_area_id FROM exercise WHERE id = ?1",
            [id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Uuid>(2)?,
                ))
            },
        )
        .optional()?
    else {
        return Ok(None);
    };

    Ok(Some(domain::Exercise {
        id: id.into(),
        name: name(&exercise_name)?,
        exercise_type: parse(&exercise_type)?,
        focus_areas: id_set(
            connection,
            "SELECT focus_area_id FROM exercise_focus_area WHERE exercise_id = ?1",
            id,
        )?,
        primary_focus_area: primary_focus_area.into(),
        fitness_levels: strings(
            connection,
            "SELECT fitness_level FROM exercise_fitness_level WHERE exercise_id = ?1",
            id,
        )?
        .iter()
        .map(|level| parse(level))
        .collect::<Result<_, _>>()?,
        equipment: id_set(
            connection,
            "SELECT equipment_id FROM exercise_equipment WHERE exercise_id = ?1",
            id,
        )?,
        contraindications: id_set(
            connection,
            "SELECT health_issue_id FROM exercise_contraindication WHERE exercise_id = ?1",
            id,
        )?,
    }))
}

fn load_exercises(
    connection: &Connection,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<Vec<domain::Exercise>, DatabaseError> {
    let mut exercises = vec![];
    for id in ids {
        if let Some(exercise) = load_exercise(connection, id)? {
            exercises.push(exercise);
        }
    }
    Ok(exercises)
}

fn load_profile(
    connection: &Connection,
    user_id: domain::UserID,
) -> Result<Option<domain::UserProfile>, DatabaseError> {
    let Some(row) = connection
        .query_row(
            "SELECT fitness_level, objective, randomness, session_minutes, weight_kg, height_cm, \
             age, created_at FROM user_profile WHERE id = ?1",
            [*user_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, u8>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, u32>(5)?,
                    row.get::<_, u32>(6)?,
                    row.get::<_, DateTime<Utc>>(7)?,
                ))
            },
        )
        .optional()?
    else {
        return Ok(None);
    };
    let (fitness_level, objective, randomness, minutes, weight_kg, height_cm, age, created_at) =
        row;
    #[allow(clippy::cast_possible_truncation)]
    let weight_kg = weight_kg as f32;

    Ok(Some(domain::UserProfile {
        id: user_id,
        fitness_level: parse(&fitness_level)?,
        equipment: id_set(
            connection,
            "SELECT equipment_id FROM user_equipment WHERE user_id = ?1",
            *user_id,
        )?,
        health_issues: id_set(
            connection,
            "SELECT health_issue_id FROM user_health_issue WHERE user_id = ?1",
            *user_id,
        )?,
        objective: objective.as_deref().map(parse).transpose()?,
        randomness: domain::Randomness::new(randomness).map_err(DatabaseError::invalid)?,
        session_duration: domain::SessionDuration::minutes(minutes),
        body: domain::BodyMetrics {
            weight_kg,
            height_cm,
            age,
        },
        created_at,
    }))
}

fn load_day_content(
    connection: &Connection,
    routine_id: Uuid,
    day: u32,
    mode: domain::Mode,
) -> Result<domain::DayContent, DatabaseError> {
    Ok(match mode {
        domain::Mode::FocusAreas => {
            let mut statement = connection.prepare_cached(
                "SELECT focus_area_id FROM routine_day_focus_area \
                 WHERE routine_id = ?1 AND day_number = ?2",
            )?;
            domain::DayContent::FocusAreas(
                statement
                    .query_map(params![routine_id, day], |row| row.get::<_, Uuid>(0))?
                    .map(|id| id.map(domain::FocusAreaID::from))
                    .collect::<rusqlite::Result<_>>()?,
            )
        }
        domain::Mode::DirectExercises => {
            let mut statement = connection.prepare_cached(
                "SELECT exercise_id, exercise_order FROM routine_day_exercise \
                 WHERE routine_id = ?1 AND day_number = ?2 ORDER BY exercise_order",
            )?;
            domain::DayContent::Exercises(
                statement
                    .query_map(params![routine_id, day], |row| {
                        Ok(domain::DayExercise {
                            exercise_id: row.get::<_, Uuid>(0)?.into(),
                            order: row.get(1)?,
                        })
                    })?
                    .collect::<rusqlite::Result<_>>()?,
            )
        }
    })
}

fn load_days(
    connection: &Connection,
    routine_id: Uuid,
) -> Result<Vec<domain::DaySlot>, DatabaseError> {
    let rows = {
        let mut statement = connection.prepare_cached(
            "SELECT day_number, mode FROM routine_day WHERE routine_id = ?1 ORDER BY day_number",
        )?;
        statement
            .query_map([routine_id], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };
    rows.into_iter()
        .map(|(day, mode)| {
            Ok(domain::DaySlot {
                day: day_number(day)?,
                content: load_day_content(connection, routine_id, day, parse(&mode)?)?,
            })
        })
        .collect()
}

pub(crate) fn load_routines(
    connection: &Connection,
    user_id: domain::UserID,
) -> Result<Vec<domain::UserRoutine>, DatabaseError> {
    let rows = {
        let mut statement = connection.prepare_cached(
            "SELECT id, template_id, name, active, active_day FROM user_routine \
             WHERE user_id = ?1 ORDER BY name, id",
        )?;
        statement
            .query_map([*user_id], |row| {
                Ok((
                    row.get::<_, Uuid>(0)?,
                    row.get::<_, Uuid>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, Option<u32>>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };
    rows.into_iter()
        .map(|(id, template_id, routine_name, active, active_day)| {
            Ok(domain::UserRoutine {
                id: id.into(),
                template_id: template_id.into(),
                name: name(&routine_name)?,
                active,
                active_day: active_day.map(day_number).transpose()?,
                days: load_days(connection, id)?,
            })
        })
        .collect()
}

pub(crate) fn save_days(
    connection: &Connection,
    routine_id: Uuid,
    days: &[domain::DaySlot],
) -> Result<(), DatabaseError> {
    connection.execute("DELETE FROM routine_day WHERE routine_id = ?1", [routine_id])?;
    for slot in days {
        let day = u32::from(slot.day);
        connection.execute(
            "INSERT INTO routine_day (routine_id, day_number, mode) VALUES (?1, ?2, ?3)",
            params![routine_id, day, slot.content.mode().to_string()],
        )?;
        match &slot.content {
            domain::DayContent::FocusAreas(focus_areas) => {
                for focus_area_id in focus_areas {
                    connection.execute(
                        "INSERT INTO routine_day_focus_area (routine_id, day_number, focus_area_id) \
                         VALUES (?1, ?2, ?3)",
                        params![routine_id, day, **focus_area_id],
                    )?;
                }
            }
            domain::DayContent::Exercises(exercises) => {
                for exercise in exercises {
                    connection.execute(
                        "INSERT INTO routine_day_exercise \
                         (routine_id, day_number, exercise_id, exercise_order) \
                         VALUES (?1, ?2, ?3, ?4)",
                        params![routine_id, day, *exercise.exercise_id, exercise.order],
                    )?;
                }
            }
        }
    }
    Ok(())
}

fn insert_routine(
    connection: &Connection,
    user_id: domain::UserID,
    routine: &domain::UserRoutine,
) -> Result<(), DatabaseError> {
    connection.execute(
        "INSERT INTO user_routine (id, user_id, template_id, name, active, active_day) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            *routine.id,
            *user_id,
            *routine.template_id,
            routine.name.as_str(),
            routine.active,
            routine.active_day.map(u32::from),
        ],
    )?;
    save_days(connection, *routine.id, &routine.days)
}

fn update_routine(
    connection: &Connection,
    routine: &domain::UserRoutine,
) -> Result<(), DatabaseError> {
    connection.execute(
        "UPDATE user_routine SET name = ?2, active_day = ?3 WHERE id = ?1",
        params![
            *routine.id,
            routine.name.as_str(),
            routine.active_day.map(u32::from)
        ],
    )?;
    save_days(connection, *routine.id, &routine.days)
}

fn load_template_days(
    connection: &Connection,
    template_id: Uuid,
) -> Result<Vec<BTreeSet<domain::FocusAreaID>>, DatabaseError> {
    let days = {
        let mut statement = connection.prepare_cached(
            "SELECT day_number FROM routine_template_day WHERE template_id = ?1 \
             ORDER BY day_number",
        )?;
        statement
            .query_map([template_id], |row| row.get::<_, u32>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };
    let mut statement = connection.prepare_cached(
        "SELECT focus_area_id FROM routine_template_day_focus_area \
         WHERE template_id = ?1 AND day_number = ?2",
    )?;
    days.into_iter()
        .map(|day| {
            Ok(statement
                .query_map(params![template_id, day], |row| row.get::<_, Uuid>(0))?
                .map(|id| id.map(domain::FocusAreaID::from))
                .collect::<rusqlite::Result<_>>()?)
        })
        .collect()
}

fn load_focus_areas(connection: &Connection) -> Result<Vec<domain::FocusArea>, DatabaseError> {
    let rows = {
        let mut statement =
            connection.prepare_cached("SELECT id, name FROM focus_area ORDER BY name, id")?;
        statement
            .query_map([], |row| Ok((row.get::<_, Uuid>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };
    rows.into_iter()
        .map(|(id, focus_area_name)| {
            Ok(domain::FocusArea {
                id: id.into(),
                name: name(&focus_area_name)?,
            })
        })
        .collect()
}

fn load_equipment(connection: &Connection) -> Result<Vec<domain::Equipment>, DatabaseError> {
    let rows = {
        let mut statement =
            connection.prepare_cached("SELECT id, name, baseline FROM equipment ORDER BY name, id")?;
        statement
            .query_map([], |row| {
                Ok((
                    row.get::<_, Uuid>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };
    rows.into_iter()
        .map(|(id, equipment_name, baseline)| {
            Ok(domain::Equipment {
                id: id.into(),
                name: name(&equipment_name)?,
                baseline,
            })
        })
        .collect()
}

fn exercise_ids_for(
    connection: &Connection,
    focus_areas: &BTreeSet<domain::FocusAreaID>,
) -> Result<Vec<Uuid>, DatabaseError> {
    let placeholders = vec!["?"; focus_areas.len()].join(", ");
    let mut statement = connection.prepare(&format!(
        "SELECT DISTINCT exercise_id FROM exercise_focus_area \
         WHERE focus_area_id IN ({placeholders}) ORDER BY exercise_id"
    ))?;
    let ids = statement
        .query_map(params_from_iter(focus_areas.iter().map(|f| **f)), |row| {
            row.get::<_, Uuid>(0)
        })?
        .collect::<rusqlite::Result<_>>()?;
    Ok(ids)
}

fn load_templates(connection: &Connection) -> Result<Vec<domain::RoutineTemplate>, DatabaseError> {
    let rows = {
        let mut statement =
            connection.prepare_cached("SELECT id, name FROM routine_template ORDER BY name, id")?;
        statement
            .query_map([], |row| Ok((row.get::<_, Uuid>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };
    rows.into_iter()
        .map(|(id, template_name)| {
            Ok(domain::RoutineTemplate {
                id: id.into(),
                name: name(&template_name)?,
                days: load_template_days(connection, id)?,
            })
        })
        .collect()
}

fn load_exclusions(
    connection: &Connection,
    user_id: domain::UserID,
) -> Result<Vec<domain::Exclusion>, DatabaseError> {
    let rows = {
        let mut statement = connection.prepare_cached(
            "SELECT exercise_id, scope, reason, created_at FROM exclusion \
             WHERE user_id = ?1 ORDER BY exercise_id, scope",
        )?;
        statement
            .query_map([*user_id], |row| {
                Ok((
                    row.get::<_, Uuid>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, DateTime<Utc>>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };
    rows.into_iter()
        .map(|(exercise_id, scope, reason, created_at)| {
            Ok(domain::Exclusion {
                exercise_id: exercise_id.into(),
                scope: scope_from_sql(&scope)?,
                reason,
                created_at,
            })
        })
        .collect()
}

fn load_assignment(row: &rusqlite::Row) -> rusqlite::Result<(Uuid, u32, f64, u32, u32, f64)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn assignment(
    (exercise_id, position, weight_kg, reps, sets, one_rep_max_kg): (Uuid, u32, f64, u32, u32, f64),
) -> Result<domain::GeneratedAssignment, DatabaseError> {
    Ok(domain::GeneratedAssignment {
        exercise_id: exercise_id.into(),
        position,
        weight: weight(weight_kg)?,
        reps: domain::Reps::new(reps).map_err(DatabaseError::invalid)?,
        sets: domain::Sets::new(sets).map_err(DatabaseError::invalid)?,
        one_rep_max: weight(one_rep_max_kg)?,
    })
}

fn load_assignments(
    connection: &Connection,
    user_id: domain::UserID,
) -> Result<Vec<domain::GeneratedAssignment>, DatabaseError> {
    let rows = {
        let mut statement = connection.prepare_cached(
            "SELECT exercise_id, position, weight_kg, reps, sets, one_rep_max_kg \
             FROM generated_assignment WHERE user_id = ?1 ORDER BY position",
        )?;
        statement
            .query_map([*user_id], load_assignment)?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };
    rows.into_iter().map(assignment).collect()
}

impl domain::ProfileRepository for Database {
    fn read_profile(
        &self,
        user_id: domain::UserID,
    ) -> Result<domain::UserProfile, domain::ReadError> {
        Ok(self
            .read(|connection| load_profile(connection, user_id))?
            .ok_or(domain::NotFound::User)?)
    }
}

impl domain::CatalogRepository for Database {
    fn read_exercises_for(
        &self,
        focus_areas: &BTreeSet<domain::FocusAreaID>,
    ) -> Result<Vec<domain::Exercise>, domain::ReadError> {
        if focus_areas.is_empty() {
            return Ok(vec![]);
        }
        Ok(self.read(|connection| {
            let ids = exercise_ids_for(connection, focus_areas)?;
            load_exercises(connection, ids)
        })?)
    }

    fn read_exercises(
        &self,
        ids: &[domain::ExerciseID],
    ) -> Result<Vec<domain::Exercise>, domain::ReadError> {
        let ids = ids.iter().map(|id| **id).collect::<BTreeSet<_>>();
        Ok(self.read(|connection| load_exercises(connection, ids))?)
    }

    fn read_focus_areas(&self) -> Result<Vec<domain::FocusArea>, domain::ReadError> {
        Ok(self.read(load_focus_areas)?)
    }

    fn read_equipment(&self) -> Result<Vec<domain::Equipment>, domain::ReadError> {
        Ok(self.read(load_equipment)?)
    }
}

impl domain::RoutineRepository for Database {
    fn read_templates(&self) -> Result<Vec<domain::RoutineTemplate>, domain::ReadError> {
        Ok(self.read(load_templates)?)
    }

    fn read_routines(
        &self,
        user_id: domain::UserID,
    ) -> Result<Vec<domain::UserRoutine>, domain::ReadError> {
        Ok(self.read(|connection| load_routines(connection, user_id))?)
    }

    fn create_routines(
        &self,
        user_id: domain::UserID,
        routines: Vec<domain::UserRoutine>,
    ) -> Result<Vec<domain::UserRoutine>, domain::CreateError> {
        self.write(|transaction| {
            let existing: u32 = transaction
                .query_row(
                    "SELECT COUNT(*) FROM user_routine WHERE user_id = ?1",
                    [*user_id],
                    |row| row.get(0),
                )
                .map_err(DatabaseError::from)?;
            if existing > 0 {
                return Err(domain::InvalidInput::AlreadyProvisioned.into());
            }
            for routine in &routines {
                insert_routine(transaction, user_id, routine)?;
            }
            debug!("created {} routines for user {user_id}", routines.len());
            Ok(routines)
        })
    }

    fn activate_routine(
        &self,
        user_id: domain::UserID,
        routine_id: domain::RoutineID,
    ) -> Result<domain::UserRoutine, domain::UpdateError> {
        self.write(|transaction| {
            let owned = transaction
                .query_row(
                    "SELECT 1 FROM user_routine WHERE id = ?1 AND user_id = ?2",
                    params![*routine_id, *user_id],
                    |_| Ok(()),
                )
                .optional()
                .map_err(DatabaseError::from)?;
            if owned.is_none() {
                return Err(domain::NotFound::Routine(routine_id).into());
            }
            transaction
                .execute(
                    "UPDATE user_routine SET active = 0 WHERE user_id = ?1 AND active = 1",
                    [*user_id],
                )
                .map_err(DatabaseError::from)?;
            transaction
                .execute(
                    "UPDATE user_routine SET active = 1, active_day = NULL WHERE id = ?1",
                    [*routine_id],
                )
                .map_err(DatabaseError::from)?;
            Ok(load_routines(transaction, user_id)?
                .into_iter()
                .find(|r| r.id == routine_id)
                .ok_or(domain::NotFound::Routine(routine_id))?)
        })
    }

    fn modify_active_routine<T>(
        &self,
        user_id: domain::UserID,
        modify: impl FnOnce(&mut domain::UserRoutine) -> Result<T, domain::UpdateError>,
    ) -> Result<(domain::UserRoutine, T), domain::UpdateError> {
        self.write(|transaction| {
            let mut routine = load_routines(transaction, user_id)?
                .into_iter()
                .find(|r| r.active)
                .ok_or(domain::NotFound::ActiveRoutine)?;
            let result = modify(&mut routine)?;
            update_routine(transaction, &routine)?;
            Ok((routine, result))
        })
    }
}

impl domain::ExclusionRepository for Database {
    fn read_exclusions(
        &self,
        user_id: domain::UserID,
    ) -> Result<Vec<domain::Exclusion>, domain::ReadError> {
        Ok(self.read(|connection| load_exclusions(connection, user_id))?)
    }

    fn upsert_exclusions(
        &self,
        user_id: domain::UserID,
        exclusions: Vec<domain::Exclusion>,
    ) -> Result<Vec<domain::Exclusion>, domain::CreateError> {
        self.write(|transaction| {
            for exclusion in &exclusions {
                transaction
                    .execute(
                        "INSERT INTO exclusion (user_id, exercise_id, scope, reason, created_at) \
                         VALUES (?1, ?2, ?3, ?4, ?5) \
                         ON CONFLICT (user_id, exercise_id, scope) \
                         DO UPDATE SET reason = excluded.reason, created_at = excluded.created_at",
                        params![
                            *user_id,
                            *exclusion.exercise_id,
                            scope_to_sql(exclusion.scope),
                            exclusion.reason,
                            exclusion.created_at,
                        ],
                    )
                    .map_err(DatabaseError::from)?;
            }
            Ok(exclusions)
        })
    }

    fn delete_exclusions(
        &self,
        user_id: domain::UserID,
        exercise_ids: &[domain::ExerciseID],
        scope: domain::ExclusionScope,
    ) -> Result<Vec<domain::ExerciseID>, domain::DeleteError> {
        self.write(|transaction| {
            let mut deleted = vec![];
            for exercise_id in exercise_ids {
                let count = transaction
                    .execute(
                        "DELETE FROM exclusion \
                         WHERE user_id = ?1 AND exercise_id = ?2 AND scope = ?3",
                        params![*user_id, **exercise_id, scope_to_sql(scope)],
                    )
                    .map_err(DatabaseError::from)?;
                if count > 0 {
                    deleted.push(*exercise_id);
                }
            }
            Ok(deleted)
        })
    }
}

impl domain::AssignmentRepository for Database {
    fn read_assignments(
        &self,
        user_id: domain::UserID,
    ) -> Result<Vec<domain::GeneratedAssignment>, domain::ReadError> {
        Ok(self.read(|connection| load_assignments(connection, user_id))?)
    }

    fn replace_assignments(
        &self,
        user_id: domain::UserID,
        assignments: Vec<domain::GeneratedAssignment>,
    ) -> Result<Vec<domain::GeneratedAssignment>, domain::UpdateError> {
        self.write(|transaction| {
            let deleted = transaction
                .execute(
                    "DELETE FROM generated_assignment WHERE user_id = ?1",
                    [*user_id],
                )
                .map_err(DatabaseError::from)?;
            for a in &assignments {
                transaction
                    .execute(
                        "INSERT INTO generated_assignment \
                         (user_id, exercise_id, position, weight_kg, reps, sets, one_rep_max_kg) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![
                            *user_id,
                            *a.exercise_id,
                            a.position,
                            kilograms(a.weight),
                            u32::from(a.reps),
                            u32::from(a.sets),
                            kilograms(a.one_rep_max),
                        ],
                    )
                    .map_err(DatabaseError::from)?;
            }
            debug!(
                "replaced {deleted} generated assignments of user {user_id} by {}",
                assignments.len()
            );
            Ok(assignments)
        })
    }

    fn update_assignment(
        &self,
        user_id: domain::UserID,
        exercise_id: domain::ExerciseID,
        update: domain::AssignmentUpdate,
    ) -> Result<domain::GeneratedAssignment, domain::UpdateError> {
        self.write(|transaction| {
            let row = transaction
                .query_row(
                    "SELECT exercise_id, position, weight_kg, reps, sets, one_rep_max_kg \
                     FROM generated_assignment WHERE user_id = ?1 AND exercise_id = ?2",
                    params![*user_id, *exercise_id],
                    load_assignment,
                )
                .optional()
                .map_err(DatabaseError::from)?
                .ok_or(domain::NotFound::Assignment(exercise_id))?;
            let mut current = assignment(row)?;
            update.apply(&mut current)?;
            transaction
                .execute(
                    "UPDATE generated_assignment SET weight_kg = ?3, reps = ?4, sets = ?5 \
                     WHERE user_id = ?1 AND exercise_id = ?2",
                    params![
                        *user_id,
                        *exercise_id,
                        kilograms(current.weight),
                        u32::from(current.reps),
                        u32::from(current.sets),
                    ],
                )
                .map_err(DatabaseError::from)?;
            Ok(current)
        })
    }

    fn add_assignments(
        &self,
        user_id: domain::UserID,
        assignments: Vec<domain::GeneratedAssignment>,
    ) -> Result<Vec<domain::GeneratedAssignment>, domain::CreateError> {
        self.write(|transaction| {
            let mut added = vec![];
            for a in &assignments {
                let row = transaction
                    .query_row(
                        "INSERT INTO generated_assignment \
                         (user_id, exercise_id, position, weight_kg, reps, sets, one_rep_max_kg) \
                         VALUES (?1, ?2, \
                         (SELECT COALESCE(MAX(position), 0) + 1 \
                          FROM generated_assignment WHERE user_id = ?1), \
                         ?3, ?4, ?5, ?6) \
                         ON CONFLICT (user_id, exercise_id) DO UPDATE SET \
                         weight_kg = excluded.weight_kg, reps = excluded.reps, \
                         sets = excluded.sets, one_rep_max_kg = excluded.one_rep_max_kg \
                         RETURNING exercise_id, position, weight_kg, reps, sets, one_rep_max_kg",
                        params![
                            *user_id,
                            *a.exercise_id,
                            kilograms(a.weight),
                            u32::from(a.reps),
                            u32::from(a.sets),
                            kilograms(a.one_rep_max),
                        ],
                        load_assignment,
                    )
                    .map_err(DatabaseError::from)?;
                added.push(assignment(row)?);
            }
            debug!("added {} assignments of user {user_id}", added.len());
            Ok(added)
        })
    }
}
