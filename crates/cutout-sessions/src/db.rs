use rusqlite::Connection;

use crate::error::Result;

/// Initialise the sessions table.
///
/// Safe to call on every startup; uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            user_id       TEXT PRIMARY KEY,
            stage         TEXT NOT NULL,
            template_name TEXT,
            max_height    INTEGER,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );",
    )?;
    Ok(())
}
