use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;

use super::migrations::Migrator;

pub async fn establish_connection(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url);

    // An in-memory database lives and dies with its connection, so the pool
    // must never hand out a second one.
    let max_connections = if database_url.contains(":memory:") {
        1
    } else {
        10
    };

    opt.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(5))
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    Database::connect(opt).await
}

/// Connect and bring the schema up to date.
pub async fn connect_and_migrate(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = establish_connection(database_url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn get_database_url(database_path: Option<&str>) -> String {
    match database_path {
        Some(path) if path == ":memory:" => "sqlite::memory:".to_string(),
        Some(path) if path.starts_with("sqlite:") => path.to_string(),
        Some(path) => format!("sqlite://{}?mode=rwc", path),
        None => "sqlite://menuforge.db?mode=rwc".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_path_maps_to_in_memory_url() {
        assert_eq!(get_database_url(Some(":memory:")), "sqlite::memory:");
    }

    #[test]
    fn file_path_is_opened_read_write_create() {
        assert_eq!(
            get_database_url(Some("catalog.db")),
            "sqlite://catalog.db?mode=rwc"
        );
        assert_eq!(get_database_url(None), "sqlite://menuforge.db?mode=rwc");
    }

    #[test]
    fn full_urls_pass_through() {
        assert_eq!(
            get_database_url(Some("sqlite://other.db?mode=ro")),
            "sqlite://other.db?mode=ro"
        );
    }
}
