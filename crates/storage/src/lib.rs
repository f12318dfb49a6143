#![warn(clippy::pedantic)]

mod config;
mod database;
mod repository;
mod schema;
mod seed;

pub use config::{Config, ConfigError, ENV_PREFIX};
pub use database::{Database, DatabaseError};
pub use schema::VERSION as SCHEMA_VERSION;
pub use seed::{Catalog, SeedError, SeedSummary};
