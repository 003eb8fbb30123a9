//! Scoped `DuckDB` connections.
//!
//! Every warehouse call opens its own connection to the database file and the
//! guard closes it when dropped, on success and on every error path. Nothing is
//! pooled across calls so concurrent processes only contend for the file while a
//! statement is actually running.

use std::ops::Deref;
use std::path::{Path, PathBuf};

use ::duckdb::Connection;
use tracing::{trace, warn};

/// An open connection that is closed when the guard goes out of scope.
pub struct ScopedConnection {
    path: PathBuf,
    connection: Option<Connection>,
}

impl ScopedConnection {
    /// Open and configure a connection to the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened (missing directory, lock held
    /// by another process) or the session settings cannot be applied. The open is
    /// attempted once; waiting for a held lock is up to the caller.
    pub fn open(path: &Path) -> Result<Self, ::duckdb::Error> {
        let connection = Connection::open(path)?;
        configure_connection(&connection)?;
        trace!(path = %path.display(), "duckdb connection opened");

        Ok(Self {
            path: path.to_path_buf(),
            connection: Some(connection),
        })
    }
}

impl Deref for ScopedConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("scoped connection is only taken on drop")
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        match connection.close() {
            Ok(()) => trace!(path = %self.path.display(), "duckdb connection closed"),
            Err((_, error)) => warn!(
                path = %self.path.display(),
                %error,
                "duckdb connection did not close cleanly"
            ),
        }
    }
}

/// True when the open failed because another process holds the file lock.
pub(crate) fn is_lock_conflict(error: &::duckdb::Error) -> bool {
    let message = error.to_string();
    message.contains("Could not set lock on file") || message.contains("Conflicting lock")
}

fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}
