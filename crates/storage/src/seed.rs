use std::collections::BTreeSet;

use cadence_domain as domain;
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::{Database, DatabaseError};

const DEMO: &str = include_str!("../data/demo.json");

/// Catalog data and user profiles to be loaded into a database.
///
/// The catalog is maintained outside of this crate. Seeding is meant for tests, demos and
/// initial setup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub focus_areas: Vec<domain::FocusArea>,
    pub equipment: Vec<domain::Equipment>,
    pub exercises: Vec<domain::Exercise>,
    pub templates: Vec<domain::RoutineTemplate>,
    pub profiles: Vec<domain::UserProfile>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, SeedError> {
        Catalog::try_from(serde_json::from_str::<CatalogFile>(json)?)
    }

    /// Small catalog with one demo user, bundled with the crate.
    pub fn demo() -> Result<Self, SeedError> {
        Self::from_json(DEMO)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub focus_areas: usize,
    pub equipment: usize,
    pub exercises: usize,
    pub templates: usize,
    pub profiles: usize,
}

impl Database {
    /// Inserts the catalog in one transaction. Entries whose id already exists are left
    /// unchanged and not counted.
    pub fn seed(&self, catalog: &Catalog) -> Result<SeedSummary, DatabaseError> {
        let summary = self.write(|transaction| {
            Ok::<_, DatabaseError>(SeedSummary {
                focus_areas: insert_focus_areas(transaction, &catalog.focus_areas)?,
                equipment: insert_equipment(transaction, &catalog.equipment)?,
                exercises: insert_exercises(transaction, &catalog.exercises)?,
                templates: insert_templates(transaction, &catalog.templates)?,
                profiles: insert_profiles(transaction, &catalog.profiles)?,
            })
        })?;
        info!(
            "seeded {} focus areas, {} equipment, {} exercises, {} templates, {} profiles",
            summary.focus_areas,
            summary.equipment,
            summary.exercises,
            summary.templates,
            summary.profiles
        );
        Ok(summary)
    }
}

fn insert_focus_areas(
    connection: &Connection,
    focus_areas: &[domain::FocusArea],
) -> Result<usize, DatabaseError> {
    let mut inserted = 0;
    for focus_area in focus_areas {
        inserted += connection.execute(
            "INSERT OR IGNORE INTO focus_area (id, name) VALUES (?1, ?2)",
            params![*focus_area.id, focus_area.name.as_str()],
        )?;
    }
    Ok(inserted)
}

fn insert_equipment(
    connection: &Connection,
    equipment: &[domain::Equipment],
) -> Result<usize, DatabaseError> {
    let mut inserted = 0;
    for e in equipment {
        inserted += connection.execute(
            "INSERT OR IGNORE INTO equipment (id, name, baseline) VALUES (?1, ?2, ?3)",
            params![*e.id, e.name.as_str(), e.baseline],
        )?;
    }
    Ok(inserted)
}

fn insert_exercises(
    connection: &Connection,
    exercises: &[domain::Exercise],
) -> Result<usize, DatabaseError> {
    let mut inserted = 0;
    for exercise in exercises {
        let id = *exercise.id;
        if connection.execute(
            "INSERT OR IGNORE INTO exercise (id, name, exercise_type, primary_focus_area_id) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id,
                exercise.name.as_str(),
                exercise.exercise_type.to_string(),
                *exercise.primary_focus_area
            ],
        )? == 0
        {
            continue;
        }
        inserted += 1;
        for focus_area_id in &exercise.focus_areas {
            connection.execute(
                "INSERT INTO exercise_focus_area (exercise_id, focus_area_id) VALUES (?1, ?2)",
                params![id, **focus_area_id],
            )?;
        }
        for level in &exercise.fitness_levels {
            connection.execute(
                "INSERT INTO exercise_fitness_level (exercise_id, fitness_level) VALUES (?1, ?2)",
                params![id, level.to_string()],
            )?;
        }
        for equipment_id in &exercise.equipment {
            connection.execute(
                "INSERT INTO exercise_equipment (exercise_id, equipment_id) VALUES (?1, ?2)",
                params![id, **equipment_id],
            )?;
        }
        for health_issue_id in &exercise.contraindications {
            connection.execute(
                "INSERT INTO exercise_contraindication (exercise_id, health_issue_id) \
                 VALUES (?1, ?2)",
                params![id, **health_issue_id],
            )?;
        }
    }
    Ok(inserted)
}

fn insert_templates(
    connection: &Connection,
    templates: &[domain::RoutineTemplate],
) -> Result<usize, DatabaseError> {
    let mut inserted = 0;
    for template in templates {
        let id = *template.id;
        if connection.execute(
            "INSERT OR IGNORE INTO routine_template (id, name) VALUES (?1, ?2)",
            params![id, template.name.as_str()],
        )? == 0
        {
            continue;
        }
        inserted += 1;
        for (focus_areas, day) in template.days.iter().zip(1_u32..) {
            connection.execute(
                "INSERT INTO routine_template_day (template_id, day_number) VALUES (?1, ?2)",
                params![id, day],
            )?;
            for focus_area_id in focus_areas {
                connection.execute(
                    "INSERT INTO routine_template_day_focus_area \
                     (template_id, day_number, focus_area_id) VALUES (?1, ?2, ?3)",
                    params![id, day, **focus_area_id],
                )?;
            }
        }
    }
    Ok(inserted)
}

fn insert_profiles(
    connection: &Connection,
    profiles: &[domain::UserProfile],
) -> Result<usize, DatabaseError> {
    let mut inserted = 0;
    for profile in profiles {
        let id = *profile.id;
        if connection.execute(
            "INSERT OR IGNORE INTO user_profile \
             (id, fitness_level, objective, randomness, session_minutes, weight_kg, height_cm, \
              age, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                profile.fitness_level.to_string(),
                profile.objective.map(|o| o.to_string()),
                u8::from(profile.randomness),
                u32::from(profile.session_duration),
                f64::from(profile.body.weight_kg),
                profile.body.height_cm,
                profile.body.age,
                profile.created_at,
            ],
        )? == 0
        {
            continue;
        }
        inserted += 1;
        for equipment_id in &profile.equipment {
            connection.execute(
                "INSERT INTO user_equipment (user_id, equipment_id) VALUES (?1, ?2)",
                params![id, **equipment_id],
            )?;
        }
        for health_issue_id in &profile.health_issues {
            connection.execute(
                "INSERT INTO user_health_issue (user_id, health_issue_id) VALUES (?1, ?2)",
                params![id, **health_issue_id],
            )?;
        }
    }
    Ok(inserted)
}

#[derive(thiserror::Error, Debug)]
pub enum SeedError {
    #[error("invalid catalog file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid catalog entry {entry}: {message}")]
    InvalidEntry { entry: String, message: String },
}

impl SeedError {
    fn invalid(entry: impl ToString, err: impl ToString) -> Self {
        SeedError::InvalidEntry {
            entry: entry.to_string(),
            message: err.to_string(),
        }
    }
}

/// Catalog ids are small integers in the file and UUIDs in the database.
fn uuid(id: u64) -> Uuid {
    Uuid::from_u128(u128::from(id))
}

fn ids<T: From<Uuid> + Ord>(ids: &[u64]) -> BTreeSet<T> {
    ids.iter().map(|id| T::from(uuid(*id))).collect()
}

#[derive(serde::Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    focus_areas: Vec<NamedRecord>,
    equipment: Vec<EquipmentRecord>,
    exercises: Vec<ExerciseRecord>,
    templates: Vec<TemplateRecord>,
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(serde::Deserialize, Debug)]
struct NamedRecord {
    id: u64,
    name: String,
}

#[derive(serde::Deserialize, Debug)]
struct EquipmentRecord {
    id: u64,
    name: String,
    #[serde(default)]
    baseline: bool,
}

#[derive(serde::Deserialize, Debug)]
struct ExerciseRecord {
    id: u64,
    name: String,
    #[serde(rename = "type")]
    exercise_type: String,
    primary_focus_area: u64,
    focus_areas: Vec<u64>,
    fitness_levels: Vec<String>,
    equipment: Vec<u64>,
    #[serde(default)]
    contraindications: Vec<u64>,
}

#[derive(serde::Deserialize, Debug)]
struct TemplateRecord {
    id: u64,
    name: String,
    days: Vec<Vec<u64>>,
}

#[derive(serde::Deserialize, Debug)]
struct UserRecord {
    id: u64,
    fitness_level: String,
    #[serde(default)]
    equipment: Vec<u64>,
    #[serde(default)]
    health_issues: Vec<u64>,
    objective: Option<String>,
    randomness: u8,
    session_minutes: u32,
    weight_kg: f32,
    height_cm: u32,
    age: u32,
    created_at: DateTime<Utc>,
}

impl TryFrom<NamedRecord> for domain::FocusArea {
    type Error = SeedError;

    fn try_from(value: NamedRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: uuid(value.id).into(),
            name: domain::Name::new(&value.name)
                .map_err(|err| SeedError::invalid(format!("focus area {}", value.id), err))?,
        })
    }
}

impl TryFrom<EquipmentRecord> for domain::Equipment {
    type Error = SeedError;

    fn try_from(value: EquipmentRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: uuid(value.id).into(),
            name: domain::Name::new(&value.name)
                .map_err(|err| SeedError::invalid(format!("equipment {}", value.id), err))?,
            baseline: value.baseline,
        })
    }
}

impl TryFrom<ExerciseRecord> for domain::Exercise {
    type Error = SeedError;

    fn try_from(value: ExerciseRecord) -> Result<Self, Self::Error> {
        let entry = format!("exercise {}", value.id);
        if !value.focus_areas.contains(&value.primary_focus_area) {
            return Err(SeedError::invalid(
                &entry,
                format!(
                    "primary focus area {} is not one of its focus areas",
                    value.primary_focus_area
                ),
            ));
        }
        Ok(Self {
            id: uuid(value.id).into(),
            name: domain::Name::new(&value.name).map_err(|err| SeedError::invalid(&entry, err))?,
            exercise_type: value
                .exercise_type
                .parse()
                .map_err(|err| SeedError::invalid(&entry, err))?,
            focus_areas: ids(&value.focus_areas),
            primary_focus_area: uuid(value.primary_focus_area).into(),
            fitness_levels: value
                .fitness_levels
                .iter()
                .map(|level| level.parse::<domain::FitnessLevel>())
                .collect::<Result<_, _>>()
                .map_err(|err| SeedError::invalid(&entry, err))?,
            equipment: ids(&value.equipment),
            contraindications: ids(&value.contraindications),
        })
    }
}

impl TryFrom<TemplateRecord> for domain::RoutineTemplate {
    type Error = SeedError;

    fn try_from(value: TemplateRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: uuid(value.id).into(),
            name: domain::Name::new(&value.name)
                .map_err(|err| SeedError::invalid(format!("template {}", value.id), err))?,
            days: value.days.iter().map(|day| ids(day)).collect(),
        })
    }
}

impl TryFrom<UserRecord> for domain::UserProfile {
    type Error = SeedError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        let entry = format!("user {}", value.id);
        Ok(Self {
            id: uuid(value.id).into(),
            fitness_level: value
                .fitness_level
                .parse()
                .map_err(|err| SeedError::invalid(&entry, err))?,
            equipment: ids(&value.equipment),
            health_issues: ids(&value.health_issues),
            objective: value
                .objective
                .as_deref()
                .map(str::parse::<domain::Objective>)
                .transpose()
                .map_err(|err| SeedError::invalid(&entry, err))?,
            randomness: domain::Randomness::new(value.randomness)
                .map_err(|err| SeedError::invalid(&entry, err))?,
            session_duration: domain::SessionDuration::minutes(value.session_minutes),
            body: domain::BodyMetrics {
                weight_kg: value.weight_kg,
                height_cm: value.height_cm,
                age: value.age,
            },
            created_at: value.created_at,
        })
    }
}

impl TryFrom<CatalogFile> for Catalog {
    type Error = SeedError;

    fn try_from(value: CatalogFile) -> Result<Self, Self::Error> {
        Ok(Self {
            focus_areas: value
                .focus_areas
                .into_iter()
                .map(domain::FocusArea::try_from)
                .collect::<Result<_, _>>()?,
            equipment: value
                .equipment
                .into_iter()
                .map(domain::Equipment::try_from)
                .collect::<Result<_, _>>()?,
            exercises: value
                .exercises
                .into_iter()
                .map(domain::Exercise::try_from)
                .collect::<Result<_, _>>()?,
            templates: value
                .templates
                .into_iter()
                .map(domain::RoutineTemplate::try_from)
                .collect::<Result<_, _>>()?,
            profiles: value
                .users
                .into_iter()
                .map(domain::UserProfile::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}
