use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, instrument};

use crate::db::init_db;
use crate::error::{Result, SessionError};
use crate::types::{Session, SessionState, Stage};

/// How long a writer waits for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Persisted per-user session records.
///
/// Every read-modify-write runs inside an `IMMEDIATE` transaction while the
/// connection mutex is held, so a stage transition can never be overwritten
/// by a concurrent stale read, whether from another task in this process or
/// from another process sharing the database file.
pub struct SessionStore {
    db: Mutex<Connection>,
}

type RawRow = (String, Option<String>, Option<i64>, String, String);

impl SessionStore {
    /// Wrap an open connection, creating the table if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Retrieve a session, returning `None` for users who never sent `/start`.
    #[instrument(skip(self))]
    pub fn get(&self, user_id: &str) -> Result<Option<Session>> {
        let db = self.lock();
        let row = load(&db, user_id)?;
        row.map(|raw| to_session(user_id, raw)).transpose()
    }

    /// Atomically apply `f` to the user's current state and persist the result.
    ///
    /// A user without a row starts from [`SessionState::default`]. The row is
    /// only written when `f` actually changes the state.
    #[instrument(skip(self, f))]
    pub fn update<T, F>(&self, user_id: &str, f: F) -> Result<(SessionState, T)>
    where
        F: FnOnce(&SessionState) -> (SessionState, T),
    {
        let mut db = self.lock();
        let tx = db.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = match load(&tx, user_id)? {
            Some(raw) => to_session(user_id, raw)?.state,
            None => SessionState::default(),
        };

        let (next, out) = f(&current);

        if next != current {
            let now = chrono::Utc::now().to_rfc3339();
            tx.execute(
                "INSERT INTO sessions
                 (user_id, stage, template_name, max_height, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(user_id) DO UPDATE SET
                     stage         = excluded.stage,
                     template_name = excluded.template_name,
                     max_height    = excluded.max_height,
                     updated_at    = excluded.updated_at",
                rusqlite::params![
                    user_id,
                    next.stage.as_str(),
                    next.template_name,
                    next.max_height.map(i64::from),
                    now
                ],
            )?;
            debug!(from = %current.stage, to = %next.stage, "session state written");
        }

        tx.commit()?;
        Ok((next, out))
    }

    /// Number of stored sessions.
    pub fn count(&self) -> Result<usize> {
        let db = self.lock();
        let n: i64 = db.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied row:
        // the transaction rolls back on drop.
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn load(conn: &Connection, user_id: &str) -> Result<Option<RawRow>> {
    let row = conn
        .query_row(
            "SELECT stage, template_name, max_height, created_at, updated_at
             FROM sessions WHERE user_id = ?1",
            rusqlite::params![user_id],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            },
        )
        .optional()?;
    Ok(row)
}

fn to_session(user_id: &str, raw: RawRow) -> Result<Session> {
    let (stage, template_name, max_height, created_at, updated_at) = raw;

    let corrupt = |reason: String| SessionError::CorruptRecord {
        user_id: user_id.to_string(),
        reason,
    };

    let stage = Stage::parse(&stage).ok_or_else(|| corrupt(format!("unknown stage '{stage}'")))?;
    let max_height = max_height
        .map(|h| u32::try_from(h).map_err(|_| corrupt(format!("max_height out of range: {h}"))))
        .transpose()?;

    Ok(Session {
        user_id: user_id.to_string(),
        state: SessionState {
            stage,
            template_name,
            max_height,
        },
        created_at,
        updated_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Connection::open_in_memory().expect("in-memory db")).expect("store")
    }

    fn ready() -> SessionState {
        SessionState {
            stage: Stage::Ready,
            template_name: Some("promo.png".to_string()),
            max_height: Some(1100),
        }
    }

    #[test]
    fn unknown_user_has_no_session() {
        let s = store();
        assert!(s.get("42").unwrap().is_none());
        assert_eq!(s.count().unwrap(), 0);
    }

    #[test]
    fn update_persists_new_state() {
        let s = store();
        let (state, out) = s.update("42", |_| (ready(), "done")).unwrap();
        assert_eq!(state, ready());
        assert_eq!(out, "done");

        let session = s.get("42").unwrap().expect("session row");
        assert_eq!(session.user_id, "42");
        assert_eq!(session.state, ready());
        assert!(!session.created_at.is_empty());
    }

    #[test]
    fn unchanged_state_is_not_written() {
        let s = store();
        s.update("42", |current| (current.clone(), ())).unwrap();
        assert!(s.get("42").unwrap().is_none());
    }

    #[test]
    fn update_sees_previous_state() {
        let s = store();
        s.update("42", |_| (ready(), ())).unwrap();
        let (_, seen) = s.update("42", |current| (current.clone(), current.clone())).unwrap();
        assert_eq!(seen, ready());
    }

    #[test]
    fn users_are_independent() {
        let s = store();
        s.update("a", |_| (ready(), ())).unwrap();
        assert!(s.get("b").unwrap().is_none());
        assert_eq!(s.count().unwrap(), 1);
    }

    #[test]
    fn sessions_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cutout.db");

        {
            let s = SessionStore::new(Connection::open(&path).unwrap()).unwrap();
            s.update("42", |_| (ready(), ())).unwrap();
        }

        let s = SessionStore::new(Connection::open(&path).unwrap()).unwrap();
        assert_eq!(s.get("42").unwrap().unwrap().state, ready());
    }

    #[test]
    fn concurrent_updates_are_serialised() {
        let s = std::sync::Arc::new(store());
        s.update("42", |_| (SessionState::default(), ())).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = std::sync::Arc::clone(&s);
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        s.update("42", |current| {
                            let next = SessionState {
                                max_height: Some(current.max_height.unwrap_or(0) + 1),
                                ..current.clone()
                            };
                            (next, ())
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let session = s.get("42").unwrap().unwrap();
        assert_eq!(session.state.max_height, Some(200));
    }

    #[test]
    fn unknown_stage_value_is_corrupt() {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        conn.execute(
            "INSERT INTO sessions VALUES ('42', 'sleeping', NULL, NULL, 'x', 'x')",
            [],
        )
        .unwrap();

        let s = SessionStore::new(conn).unwrap();
        assert!(matches!(
            s.get("42"),
            Err(SessionError::CorruptRecord { .. })
        ));
    }
}
