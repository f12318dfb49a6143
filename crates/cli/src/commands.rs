use std::{collections::BTreeMap, io::Write};

use anyhow::{Context, Result};
use cadence_domain::{
    self as domain, CatalogRepository, DayService, ExclusionService, RoutineService,
    WorkoutService,
};
use cadence_storage::{Catalog, Database};

use crate::Command;

type App = domain::Service<Database>;

pub(crate) fn execute(app: &App, command: Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Init => {
            writeln!(
                out,
                "database ready (schema version {})",
                app.repository().schema_version()?
            )?;
        }
        Command::SeedDemo => seed_demo(app, out)?,
        Command::Provision { user, template } => {
            let routines = app.provision_routines(user.into(), template.into())?;
            write_routines(out, &routines)?;
        }
        Command::Routines { user } => write_routines(out, &app.list_routines(user.into())?)?,
        Command::Activate { user, routine } => {
            let routine = app.activate_routine(user.into(), routine.into())?;
            writeln!(out, "activated {}", routine.name)?;
        }
        Command::Status { user } => {
            let status = app.get_day_status(user.into())?;
            writeln!(
                out,
                "{}: day {} of {}{}",
                status.routine_name,
                status.day,
                status.total_days,
                if status.overridden {
                    " (set manually)"
                } else {
                    ""
                }
            )?;
            writeln!(out, "  {}", describe(app, &status.content)?)?;
        }
        Command::Days { user } => {
            let overview = app.get_active_routine_days(user.into())?;
            writeln!(out, "{}", overview.name)?;
            for slot in &overview.days {
                let marker = if overview.is_current_day(slot.day) {
                    "*"
                } else {
                    " "
                };
                writeln!(out, "{marker} {}", describe_slot(app, slot)?)?;
            }
        }
        Command::Generate { user, .. } => {
            let workout = app.generate_workout(user.into())?;
            writeln!(out, "Day {} ({})", workout.day, workout.mode)?;
            for item in &workout.items {
                let assignment = &item.assignment;
                writeln!(
                    out,
                    "{:>2}. {} {}x{} @ {} kg",
                    assignment.position,
                    item.exercise.name,
                    assignment.sets,
                    assignment.reps,
                    assignment.weight
                )?;
            }
        }
        Command::SetDay { user, day } => {
            writeln!(
                out,
                "active day set to {}",
                app.set_active_day(user.into(), day)?
            )?;
        }
        Command::Reorder {
            user,
            source,
            target,
        } => {
            for slot in &app.reorder_days(user.into(), source, target)? {
                writeln!(out, "  {}", describe_slot(app, slot)?)?;
            }
        }
        Command::Swap { user, a, b } => {
            let outcome = app.swap_days(user.into(), a, b)?;
            writeln!(
                out,
                "swapped day {a} and day {b} ({})",
                outcome
                    .exchanged
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
        }
        Command::Exclude {
            user,
            exercises,
            today,
            reason,
        } => {
            let ids = exercises
                .into_iter()
                .map(domain::ExerciseID::from)
                .collect::<Vec<_>>();
            let scope = if today {
                domain::Scope::Today
            } else {
                domain::Scope::Forever
            };
            let exclusions = app.exclude_exercises(user.into(), &ids, scope, reason)?;
            let excluded = exclusions.iter().map(|e| e.exercise_id).collect::<Vec<_>>();
            for (exclusion, name) in exclusions.iter().zip(exercise_names(app, &excluded)?) {
                let scope = match exclusion.scope {
                    domain::ExclusionScope::Forever => String::from("forever"),
                    domain::ExclusionScope::Day(date) => format!("on {date}"),
                };
                writeln!(out, "excluded {name} {scope}")?;
            }
        }
        Command::AddExercises { user, exercises } => {
            let ids = exercises
                .into_iter()
                .map(domain::ExerciseID::from)
                .collect::<Vec<_>>();
            let added = app.add_custom_assignments(user.into(), &ids)?;
            let added_ids = added.iter().map(|a| a.exercise_id).collect::<Vec<_>>();
            for (assignment, name) in added.iter().zip(exercise_names(app, &added_ids)?) {
                writeln!(
                    out,
                    "{:>2}. {name} {}x{} @ {} kg",
                    assignment.position, assignment.sets, assignment.reps, assignment.weight
                )?;
            }
        }
        Command::Alternatives {
            user,
            exercise,
            limit,
        } => {
            for alternative in app.alternative_exercises(user.into(), exercise.into(), limit)? {
                writeln!(
                    out,
                    "{} (similarity {:.2})",
                    alternative.exercise.name, alternative.similarity
                )?;
            }
        }
    }
    Ok(())
}

fn seed_demo(app: &App, out: &mut impl Write) -> Result<()> {
    let catalog = Catalog::demo()?;
    let summary = app.repository().seed(&catalog)?;
    writeln!(
        out,
        "seeded {} focus areas, {} equipment, {} exercises, {} templates, {} users",
        summary.focus_areas,
        summary.equipment,
        summary.exercises,
        summary.templates,
        summary.profiles
    )?;
    let template = catalog
        .templates
        .first()
        .context("demo catalog contains no routine template")?;
    for profile in &catalog.profiles {
        if !app.list_routines(profile.id)?.is_empty() {
            continue;
        }
        let routines = app.provision_routines(profile.id, template.id)?;
        writeln!(
            out,
            "provisioned {} routines for user {}",
            routines.len(),
            profile.id
        )?;
    }
    Ok(())
}

fn write_routines(out: &mut impl Write, routines: &[domain::UserRoutine]) -> Result<()> {
    for routine in routines {
        let marker = if routine.active { "*" } else { " " };
        writeln!(out, "{marker} {} ({})", routine.name, routine.id)?;
    }
    Ok(())
}

fn describe_slot(app: &App, slot: &domain::DaySlot) -> Result<String> {
    Ok(format!("day {}: {}", slot.day, describe(app, &slot.content)?))
}

fn describe(app: &App, content: &domain::DayContent) -> Result<String> {
    let (kind, names) = match content {
        domain::DayContent::FocusAreas(ids) => {
            let focus_areas = app
                .repository()
                .read_focus_areas()?
                .into_iter()
                .map(|f| (f.id, f.name.to_string()))
                .collect::<BTreeMap<_, _>>();
            let names = ids
                .iter()
                .map(|id| focus_areas.get(id).cloned().unwrap_or_else(|| id.to_string()))
                .collect::<Vec<_>>();
            ("focus areas", names)
        }
        domain::DayContent::Exercises(_) => {
            ("exercises", exercise_names(app, &content.exercise_ids())?)
        }
    };
    if names.is_empty() {
        return Ok(format!("no {kind}"));
    }
    Ok(format!("{kind}: {}", names.join(", ")))
}

/// Names in the order of `ids`, falling back to the id for unknown exercises.
fn exercise_names(app: &App, ids: &[domain::ExerciseID]) -> Result<Vec<String>> {
    let exercises = app
        .repository()
        .read_exercises(ids)?
        .into_iter()
        .map(|e| (e.id, e.name.to_string()))
        .collect::<BTreeMap<_, _>>();
    Ok(ids
        .iter()
        .map(|id| exercises.get(id).cloned().unwrap_or_else(|| id.to_string()))
        .collect())
}
