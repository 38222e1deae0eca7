use crate::MIGRATIONS;
use diesel::{connection::SimpleConnection, Connection, SqliteConnection};
use diesel_migrations::MigrationHarness;

// A helper function to create a in-memory SQLite DB in order to test. The database is discarded after the test
pub fn establish_connection() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:")
        .unwrap_or_else(|_| panic!("Error creating test database"));

    // Enforce foreign key relation
    conn.batch_execute("PRAGMA foreign_keys = ON;").unwrap();

    conn.run_pending_migrations(MIGRATIONS)
        .unwrap_or_else(|e| panic!("Error running migrations: {}", e));
    conn
}
