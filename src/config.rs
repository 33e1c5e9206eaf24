use serde::{Deserialize, Serialize};

use crate::model::{OverrideQuery, OverrideType, ProjectScope};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub project: ProjectConfig,
    pub overrides: OverridesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Account/org/project the demo server seeds and the client state targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub account_id: String,
    pub org_identifier: Option<String>,
    pub project_identifier: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverridesConfig {
    pub override_type: OverrideType,
    pub page_size: usize,
    pub load_seed_data: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            account_id: "default".to_string(),
            org_identifier: Some("default".to_string()),
            project_identifier: Some("default_project".to_string()),
        }
    }
}

impl Default for OverridesConfig {
    fn default() -> Self {
        Self {
            override_type: OverrideType::EnvService,
            page_size: 20,
            load_seed_data: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and config file
    pub fn load() -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Add default configuration
        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        // Add config file if it exists
        config = config.add_source(config::File::with_name("config").required(false));

        // OVERRIDES_SERVER__PORT=3002, OVERRIDES_OVERRIDES__PAGE_SIZE=50, ...
        config = config.add_source(
            config::Environment::with_prefix("OVERRIDES")
                .separator("__")
                .prefix_separator("_"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        if app_config.overrides.page_size == 0 {
            anyhow::bail!("overrides.page_size must be positive");
        }

        Ok(app_config)
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn project_scope(&self) -> ProjectScope {
        ProjectScope::new(
            self.project.account_id.clone(),
            self.project.org_identifier.clone(),
            self.project.project_identifier.clone(),
        )
    }

    /// First-page query for the configured override tab
    pub fn initial_query(&self) -> OverrideQuery {
        OverrideQuery::new(self.overrides.override_type, self.overrides.page_size)
    }
}
