//! Shared SQLite store used by every civic module.
//!
//! Each module owns its tables but they all live in one database so the
//! gateway can resolve sessions and modules can reference citizens.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

/// Failures raised by the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

/// Handle over the connection pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating when missing) the database at `url` and apply migrations.
    ///
    /// Accepts `sqlite://path/to/file.db` as well as `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        if url.contains(":memory:") {
            return Self::in_memory().await;
        }

        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.migrate().await?;
        debug!(%url, "database ready");
        Ok(database)
    }

    /// Single-connection in-memory database; each call yields an isolated store.
    pub async fn in_memory() -> Result<Self, StoreError> {
        // every pooled connection to :memory: would see its own empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let database = Self { pool };
        database.migrate().await?;
        Ok(database)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in MIGRATIONS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS citizens (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        neighborhood TEXT NOT NULL,
        session_token TEXT NOT NULL UNIQUE,
        registered_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS issues (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL DEFAULT 'report',
        title TEXT NOT NULL,
        description TEXT,
        category TEXT NOT NULL,
        location TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'submitted',
        votes INTEGER NOT NULL DEFAULT 0,
        submitted_by TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_issues_category ON issues(category)",
    r#"
    CREATE TABLE IF NOT EXISTS issue_supporters (
        issue_id TEXT NOT NULL,
        citizen_id TEXT NOT NULL,
        supported_at TEXT NOT NULL,
        PRIMARY KEY (issue_id, citizen_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS issue_events (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        issue_id TEXT NOT NULL,
        from_status TEXT NOT NULL,
        to_status TEXT NOT NULL,
        note TEXT,
        actor TEXT NOT NULL,
        recorded_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_issue_events_issue ON issue_events(issue_id)",
    r#"
    CREATE TABLE IF NOT EXISTS ballots (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        options TEXT NOT NULL,
        opens_at TEXT NOT NULL,
        closes_at TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS votes (
        ballot_id TEXT NOT NULL,
        citizen_id TEXT NOT NULL,
        choice TEXT NOT NULL,
        cast_at TEXT NOT NULL,
        PRIMARY KEY (ballot_id, citizen_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS subscriptions (
        id TEXT PRIMARY KEY,
        citizen_id TEXT NOT NULL,
        neighborhood TEXT NOT NULL,
        channel TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (citizen_id, neighborhood, channel)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_subscriptions_neighborhood ON subscriptions(neighborhood)",
    r#"
    CREATE TABLE IF NOT EXISTS alerts (
        id TEXT PRIMARY KEY,
        message TEXT NOT NULL,
        neighborhood TEXT NOT NULL,
        channel TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS alert_deliveries (
        alert_id TEXT NOT NULL,
        subscription_id TEXT NOT NULL,
        citizen_id TEXT NOT NULL,
        channel TEXT NOT NULL,
        status TEXT NOT NULL,
        detail TEXT,
        attempted_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS budget_line_items (
        id TEXT PRIMARY KEY,
        fiscal_year INTEGER NOT NULL,
        department TEXT NOT NULL,
        description TEXT NOT NULL,
        amount_cents INTEGER NOT NULL,
        published_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS council_meetings (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        body TEXT NOT NULL,
        location TEXT NOT NULL,
        scheduled_at TEXT NOT NULL,
        agenda TEXT NOT NULL DEFAULT '[]',
        published_at TEXT NOT NULL
    )
    "#,
];

/// Generate a prefixed record identifier such as `issue-3f2c…`.
pub fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

/// Current time at the precision the store keeps, so values survive a round trip unchanged.
pub fn now() -> DateTime<Utc> {
    at_store_precision(Utc::now())
}

/// Drop sub-microsecond digits that [`encode_timestamp`] would not keep.
pub fn at_store_precision(value: DateTime<Utc>) -> DateTime<Utc> {
    value.trunc_subsecs(6)
}

/// Canonical text encoding for timestamps; sorts lexicographically.
pub fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| StoreError::Corrupt(format!("invalid timestamp '{raw}': {err}")))
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
