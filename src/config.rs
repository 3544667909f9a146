use anyhow::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend};
use tracing::{debug, info};

/// Used when neither `--database-url` nor `DATABASE_URL` is given.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://registrar.db?mode=rwc";

/// Loads variables from a `.env` file, if there is one.
pub fn load_env() {
    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", path.display());
    }
}

/// Opens the database. On SQLite, foreign keys are switched on so the
/// store refuses to orphan enrollments or courses.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    if db.get_database_backend() == DbBackend::Sqlite {
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;
        debug!("SQLite foreign keys enabled");
    }

    Ok(db)
}
