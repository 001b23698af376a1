use menuforge::database::connection::{connect_and_migrate, get_database_url};
use sea_orm::{DatabaseConnection, DbErr};

/// A database handle that comes up migrated.
pub struct TestDb {
    url: String,
}

impl TestDb {
    pub fn new_in_memory() -> Self {
        Self {
            url: get_database_url(Some(":memory:")),
        }
    }

    pub fn new_file(path: &str) -> Self {
        Self {
            url: get_database_url(Some(path)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn connect(&self) -> Result<DatabaseConnection, DbErr> {
        connect_and_migrate(&self.url).await
    }
}
