use std::{
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use cadence_domain as domain;
use log::{debug, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{Config, schema};

/// SQLite database shared by all repositories.
///
/// Access to the connection is serialized. Every write runs in an immediate transaction that
/// is rolled back if any step fails.
pub struct Database {
    connection: Mutex<Connection>,
}

impl Database {
    pub fn open(config: &Config) -> Result<Self, DatabaseError> {
        let connection = if config.is_in_memory() {
            Connection::open_in_memory()?
        } else {
            Connection::open(&config.database)?
        };
        connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        let database = Self::init(connection)?;
        info!("opened database {}", config.database.display());
        Ok(database)
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut connection: Connection) -> Result<Self, DatabaseError> {
        connection.pragma_update(None, "foreign_keys", true)?;
        schema::migrate(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn close(self) -> Result<(), DatabaseError> {
        let connection = self
            .connection
            .into_inner()
            .map_err(|_| DatabaseError::Poisoned)?;
        connection.close().map_err(|(_, err)| err)?;
        debug!("closed database");
        Ok(())
    }

    pub fn schema_version(&self) -> Result<u32, DatabaseError> {
        schema::version(&*self.lock()?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.connection.lock().map_err(|_| DatabaseError::Poisoned)
    }

    pub(crate) fn read<T, E>(
        &self,
        read: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DatabaseError>,
    {
        let connection = self.lock()?;
        read(&connection)
    }

    /// Runs `write` in an immediate transaction and commits if it succeeds.
    pub(crate) fn write<T, E>(
        &self,
        write: impl FnOnce(&Transaction) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DatabaseError>,
    {
        let mut connection = self.lock()?;
        let transaction = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(DatabaseError::from)?;
        let result = write(&transaction)?;
        transaction.commit().map_err(DatabaseError::from)?;
        Ok(result)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DatabaseError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("database lock poisoned")]
    Poisoned,
    #[error("failed to migrate database schema: {0}")]
    Migration(#[from] refinery::Error),
    #[error("invalid data in database: {0}")]
    InvalidData(Box<dyn std::error::Error + Send + Sync>),
}

impl DatabaseError {
    pub(crate) fn invalid(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        DatabaseError::InvalidData(err.into())
    }
}

impl From<DatabaseError> for domain::StorageError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::Poisoned => domain::StorageError::Poisoned,
            _ => domain::StorageError::Other(Box::new(value)),
        }
    }
}

macro_rules! storage_error {
    ($($error: ident),*) => {
        $(
            impl From<DatabaseError> for domain::$error {
                fn from(value: DatabaseError) -> Self {
                    domain::$error::Storage(value.into())
                }
            }
        )*
    };
}

storage_error!(ReadError, CreateError, UpdateError, DeleteError, GenerateError);

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_open_in_memory() {
        let database = Database::open_in_memory().unwrap();
        assert_eq!(database.schema_version().unwrap(), schema::VERSION);
        database.close().unwrap();
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database: dir.path().join("cadence.db"),
            ..Config::default()
        };
        Database::open(&config).unwrap().close().unwrap();
        let database = Database::open(&config).unwrap();
        assert_eq!(database.schema_version().unwrap(), schema::VERSION);
    }

    #[test]
    fn test_write_rolls_back_on_error() {
        let database = Database::open_in_memory().unwrap();
        let result: Result<(), DatabaseError> = database.write(|transaction| {
            transaction.execute(
                "INSERT INTO focus_area (id, name) VALUES (x'01', 'Chest')",
                [],
            )?;
            Err(DatabaseError::invalid("abort"))
        });
        assert!(result.is_err());
        let count: u32 = database
            .read(|connection| {
                Ok::<_, DatabaseError>(connection.query_row(
                    "SELECT COUNT(*) FROM focus_area",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_storage_error_from_database_error() {
        assert!(matches!(
            domain::StorageError::from(DatabaseError::Poisoned),
            domain::StorageError::Poisoned
        ));
        assert!(matches!(
            domain::ReadError::from(DatabaseError::invalid("unknown mode")),
            domain::ReadError::Storage(domain::StorageError::Other(_))
        ));
    }
}
