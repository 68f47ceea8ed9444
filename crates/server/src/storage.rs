use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use partyplanner_api::db::migrations::MIGRATIONS;
use partyplanner_api::db::Built;
use partyplanner_api::{
    service, InvitationResponse, MyInvitation, ServiceError, ServiceResult, UserResponse,
    UserSummary,
};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{Connection, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// File name of the SQLite database inside the data directory.
pub const DB_FILE_NAME: &str = "partyplanner.db";

/// Shared database state
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Fresh in-memory database with the schema applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory SQLite database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` inside one transaction. Commits on `Ok`, rolls back on `Err`.
    pub fn transact<T>(
        &self,
        f: impl FnOnce(&Connection) -> ServiceResult<T>,
    ) -> ServiceResult<T> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(ServiceError::from_db("begin transaction"))?;
        let value = f(&tx)?;
        tx.commit().map_err(ServiceError::from_db("commit transaction"))?;
        Ok(value)
    }
}

/// Initialize the database: open connection, enable WAL, run migrations
pub fn init_db(data_dir: &Path) -> Result<Db> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    let db_path = data_dir.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path).context("opening SQLite database")?;

    // Enable WAL mode for better concurrent read performance
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Db::from_connection(conn)
}

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !already_applied {
            conn.execute_batch(sql)
                .with_context(|| format!("running migration {name}"))?;
            conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
            tracing::info!("Applied migration: {name}");
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// sea-query execution helpers
// ---------------------------------------------------------------------------

/// Convert sea-query bind values into rusqlite parameters.
fn to_params(values: &sea_query::Values) -> Vec<SqlValue> {
    values
        .0
        .iter()
        .map(|v| match v {
            sea_query::Value::String(Some(s)) => SqlValue::Text(s.to_string()),
            sea_query::Value::Bool(Some(b)) => SqlValue::Integer(i64::from(*b)),
            sea_query::Value::Int(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::BigInt(Some(i)) => SqlValue::Integer(*i),
            sea_query::Value::Unsigned(Some(i)) => SqlValue::Integer(i64::from(*i)),
            sea_query::Value::Double(Some(f)) => SqlValue::Real(*f),
            sea_query::Value::Bytes(Some(b)) => SqlValue::Blob(b.to_vec()),
            _ => SqlValue::Null,
        })
        .collect()
}

pub fn sq_execute(conn: &Connection, (sql, values): Built) -> rusqlite::Result<usize> {
    conn.execute(&sql, rusqlite::params_from_iter(to_params(&values)))
}

pub fn sq_query_row<T, F>(conn: &Connection, (sql, values): Built, f: F) -> rusqlite::Result<T>
where
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    conn.query_row(&sql, rusqlite::params_from_iter(to_params(&values)), f)
}

pub fn sq_query_map<T, F>(
    conn: &Connection,
    (sql, values): Built,
    f: F,
) -> rusqlite::Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_map(rusqlite::params_from_iter(to_params(&values)), f)?
        .collect()
}

/// Run a `SELECT COUNT(*) ...` statement.
pub fn sq_count(conn: &Connection, built: Built) -> rusqlite::Result<i64> {
    sq_query_row(conn, built, |row| row.get(0))
}

/// `UNIQUE`/`FOREIGN KEY`/`CHECK` violations.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// ---------------------------------------------------------------------------
// Row mappers
// ---------------------------------------------------------------------------

fn conversion_error(idx: usize, err: ServiceError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    service::from_db_timestamp(&raw).map_err(|e| conversion_error(idx, e))
}

fn parsed_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ServiceError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

/// Map a `db::users` profile row.
pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserResponse> {
    Ok(UserResponse {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        is_admin: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// A party row before attendees are attached.
#[derive(Debug, Clone)]
pub struct PartyRow {
    pub id: String,
    pub title: String,
    pub platform: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub creator: UserSummary,
    pub created_at: String,
    pub updated_at: String,
}

/// Map a `db::parties` select row.
pub fn party_from_row(row: &Row<'_>) -> rusqlite::Result<PartyRow> {
    Ok(PartyRow {
        id: row.get(0)?,
        title: row.get(1)?,
        platform: row.get(2)?,
        description: row.get(3)?,
        scheduled_at: timestamp_col(row, 4)?,
        creator: UserSummary {
            id: row.get(5)?,
            username: row.get(6)?,
        },
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Map a `db::invitations::lookup` row.
pub fn invitation_from_row(row: &Row<'_>) -> rusqlite::Result<InvitationResponse> {
    Ok(InvitationResponse {
        id: row.get(0)?,
        party_id: row.get(1)?,
        user_id: row.get(2)?,
        status: parsed_col(row, 3)?,
        origin: parsed_col(row, 4)?,
        created_at: row.get(5)?,
        responded_at: row.get(6)?,
    })
}

/// Map a `db::invitations::list_for_user` row.
pub fn my_invitation_from_row(row: &Row<'_>) -> rusqlite::Result<MyInvitation> {
    Ok(MyInvitation {
        id: row.get(0)?,
        party_id: row.get(1)?,
        party_title: row.get(2)?,
        platform: row.get(3)?,
        scheduled_at: timestamp_col(row, 4)?,
        creator_username: row.get(5)?,
        status: parsed_col(row, 6)?,
        origin: parsed_col(row, 7)?,
        created_at: row.get(8)?,
        responded_at: row.get(9)?,
    })
}
