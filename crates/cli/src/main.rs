#![warn(clippy::pedantic)]

//! Command-line driver for the Cadence routine and workout service.

use std::{
    io::{self, Write},
    path::PathBuf,
};

use anyhow::Context;
use cadence_domain::Service;
use cadence_storage::{Config, Database};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

mod commands;
mod logger;

/// Personalized multi-day workout routines.
#[derive(Parser, Debug)]
#[command(name = "cadence", version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file, overriding configuration and environment
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Ids are UUIDs. Small integers are accepted as shorthand for the seeded demo data.
#[derive(Subcommand, Debug)]
enum Command {
    /// Create or migrate the database
    Init,
    /// Load the bundled demo catalog and provision the demo user
    SeedDemo,
    /// Copy all routine templates to a user and activate one of them
    Provision {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
        #[arg(long, value_parser = parse_id)]
        template: Uuid,
    },
    /// List the routines of a user
    Routines {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
    },
    /// Switch the active routine
    Activate {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
        #[arg(long, value_parser = parse_id)]
        routine: Uuid,
    },
    /// Show today's day of the active routine
    Status {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
    },
    /// Show all days of the active routine
    Days {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
    },
    /// Compose today's workout
    Generate {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
        /// Seed for a reproducible selection
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Override today's day
    SetDay {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
        #[arg(long)]
        day: u32,
    },
    /// Move a day to another position, shifting the days in between
    Reorder {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
        #[arg(long)]
        source: u32,
        #[arg(long)]
        target: u32,
    },
    /// Exchange the content of two days
    Swap {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
        #[arg(long)]
        a: u32,
        #[arg(long)]
        b: u32,
    },
    /// Exclude exercises from selection
    Exclude {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
        #[arg(long = "exercise", value_parser = parse_id, required = true, num_args = 1..)]
        exercises: Vec<Uuid>,
        /// Only exclude for the current day
        #[arg(long)]
        today: bool,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Add exercises of your choice to today's workout
    AddExercises {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
        #[arg(long = "exercise", value_parser = parse_id, required = true, num_args = 1..)]
        exercises: Vec<Uuid>,
    },
    /// List eligible replacements for an exercise
    Alternatives {
        #[arg(long, value_parser = parse_id)]
        user: Uuid,
        #[arg(long, value_parser = parse_id)]
        exercise: Uuid,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
}

fn parse_id(value: &str) -> Result<Uuid, String> {
    if let Ok(number) = value.parse::<u128>() {
        return Ok(Uuid::from_u128(number));
    }
    Uuid::parse_str(value).map_err(|err| format!("invalid id {value:?}: {err}"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(logger::level(cli.verbose))?;
    run(cli, &mut io::stdout().lock())
}

fn run(cli: Cli, out: &mut impl Write) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = database;
    }
    let database = Database::open(&config)
        .with_context(|| format!("failed to open {}", config.database.display()))?;

    let mut service = Service::new(database);
    if let Command::Generate {
        seed: Some(seed), ..
    } = cli.command
    {
        service = service.with_rng(ChaCha8Rng::seed_from_u64(seed));
    }

    let result = commands::execute(&service, cli.command, out);
    service.into_repository().close()?;
    result
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn cadence(database: &std::path::Path, args: &[&str]) -> String {
        let cli = Cli::try_parse_from(
            ["cadence", "--database", database.to_str().unwrap()]
                .iter()
                .chain(args),
        )
        .unwrap();
        let mut out = vec![];
        run(cli, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_cli() {
        Cli::command().debug_assert();
    }

    #[rstest]
    #[case("7", Uuid::from_u128(7))]
    #[case(
        "67e55044-10b1-426f-9247-bb680e5fe0c8",
        Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap()
    )]
    fn test_parse_id(#[case] value: &str, #[case] expected: Uuid) {
        assert_eq!(parse_id(value), Ok(expected));
    }

    #[test]
    fn test_parse_id_invalid() {
        assert!(parse_id("seven").is_err());
    }

    #[test]
    fn test_parse_exclude() {
        let cli = Cli::try_parse_from([
            "cadence",
            "-vv",
            "exclude",
            "--user",
            "1",
            "--exercise",
            "3",
            "--exercise",
            "4",
            "--today",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Exclude {
                exercises, today, ..
            } => {
                assert_eq!(exercises, vec![Uuid::from_u128(3), Uuid::from_u128(4)]);
                assert!(today);
            }
            command => panic!("unexpected command: {command:?}"),
        }
    }

    #[test]
    fn test_parse_exclude_without_exercise() {
        assert!(Cli::try_parse_from(["cadence", "exclude", "--user", "1"]).is_err());
    }

    #[test]
    fn test_demo_session() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("cadence.db");

        assert!(cadence(&database, &["init"]).contains("schema version"));
        assert!(cadence(&database, &["seed-demo"]).contains("provisioned"));
        assert!(cadence(&database, &["routines", "--user", "1"]).contains("* Full Body"));

        assert_eq!(
            cadence(&database, &["set-day", "--user", "1", "--day", "2"]),
            "active day set to 2\n"
        );
        let status = cadence(&database, &["status", "--user", "1"]);
        assert!(status.starts_with("Full Body: day 2 of 3 (set manually)"));
        assert!(status.contains("Legs"));

        let workout = cadence(&database, &["generate", "--user", "1", "--seed", "7"]);
        assert!(workout.starts_with("Day 2 (focus_areas)"));
        assert_eq!(
            workout,
            cadence(&database, &["generate", "--user", "1", "--seed", "7"])
        );

        let swapped = cadence(&database, &["swap", "--user", "1", "--a", "1", "--b", "3"]);
        assert!(swapped.starts_with("swapped day 1 and day 3"));

        let excluded = cadence(
            &database,
            &["exclude", "--user", "1", "--exercise", "18", "--today"],
        );
        assert!(excluded.contains("Plank"));

        let added = cadence(
            &database,
            &["add-exercises", "--user", "1", "--exercise", "21", "--exercise", "1"],
        );
        assert!(added.contains("Cat-Cow Stretch"));
        assert!(added.contains("Push-up"));
    }

    #[test]
    fn test_add_excluded_exercise() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("cadence.db");
        cadence(&database, &["seed-demo"]);
        cadence(&database, &["exclude", "--user", "1", "--exercise", "18"]);
        let cli = Cli::try_parse_from([
            "cadence",
            "--database",
            database.to_str().unwrap(),
            "add-exercises",
            "--user",
            "1",
            "--exercise",
            "18",
        ])
        .unwrap();
        assert_eq!(
            run(cli, &mut vec![]).unwrap_err().to_string(),
            format!("exercise {} is excluded", Uuid::from_u128(18))
        );
    }

    #[test]
    fn test_seed_demo_twice() {
        let dir = tempfile::tempdir().unwrap();
        let database = dir.path().join("cadence.db");
        cadence(&database, &["seed-demo"]);
        let output = cadence(&database, &["seed-demo"]);
        assert!(output.contains("seeded 0 focus areas"));
        assert!(!output.contains("provisioned"));
    }
}
