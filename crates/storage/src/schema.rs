use log::{debug, info};
use rusqlite::Connection;

use crate::DatabaseError;

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// The schema version a fully migrated database reports.
pub const VERSION: u32 = 1;

/// Version of the last migration applied to `connection`, 0 for an empty database.
pub(crate) fn version(connection: &Connection) -> Result<u32, DatabaseError> {
    Ok(connection.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM refinery_schema_history",
        [],
        |row| row.get(0),
    )?)
}

/// Applies all pending migrations, each in its own transaction.
///
/// A database that has migrations applied which this build does not know is rejected.
pub(crate) fn migrate(connection: &mut Connection) -> Result<u32, DatabaseError> {
    let report = embedded::migrations::runner().run(connection)?;
    for migration in report.applied_migrations() {
        debug!("applied migration {migration}");
    }
    let version = version(connection)?;
    if !report.applied_migrations().is_empty() {
        info!("database schema migrated to version {version}");
    }
    Ok(version)
}
