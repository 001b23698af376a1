use crate::database::connection::get_database_url;
use crate::errors::{CatalogError, CatalogResult};
use crate::services::OrderMode;

pub const DATABASE_ENV: &str = "MENUFORGE_DATABASE";
pub const ORDER_MODE_ENV: &str = "MENUFORGE_ORDER_MODE";
pub const LOG_LEVEL_ENV: &str = "MENUFORGE_LOG_LEVEL";

/// Runtime settings. Defaults, then environment, then command-line flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuConfig {
    /// Database file path, `:memory:`, or a full `sqlite:` URL.
    pub database: String,
    /// Sort used when listing categories.
    pub order_mode: OrderMode,
    pub log_level: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            database: "menuforge.db".to_string(),
            order_mode: OrderMode::NameAsc,
            log_level: "info".to_string(),
        }
    }
}

impl MenuConfig {
    pub fn from_env() -> CatalogResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from defaults overlaid with whatever `lookup` returns for the
    /// `MENUFORGE_*` variables.
    pub fn from_lookup<F>(lookup: F) -> CatalogResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let set = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(database) = set(DATABASE_ENV) {
            config.database = database;
        }
        if let Some(order_mode) = set(ORDER_MODE_ENV) {
            config.order_mode = order_mode.parse().map_err(|_| {
                CatalogError::validation(format!(
                    "{ORDER_MODE_ENV} must be name-asc or newest-first, got '{order_mode}'"
                ))
            })?;
        }
        if let Some(log_level) = set(LOG_LEVEL_ENV) {
            config.log_level = log_level;
        }

        Ok(config)
    }

    /// Apply command-line flags on top.
    pub fn with_overrides(
        mut self,
        database: Option<String>,
        order_mode: Option<OrderMode>,
        log_level: Option<String>,
    ) -> Self {
        if let Some(database) = database {
            self.database = database;
        }
        if let Some(order_mode) = order_mode {
            self.order_mode = order_mode;
        }
        if let Some(log_level) = log_level {
            self.log_level = log_level;
        }
        self
    }

    pub fn database_url(&self) -> String {
        get_database_url(Some(&self.database))
    }
}
