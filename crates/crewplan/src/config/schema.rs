use serde::{Deserialize, Serialize};

use crate::model::TaskTemplate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub conflicts: ConflictConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            database_path: None,
            logging: LoggingConfig::default(),
            conflicts: ConflictConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictConfig {
    /// Also flag the item being saved, not only the pre-existing foreign one.
    #[serde(default)]
    pub flag_candidate: bool,
    /// Notify the responsible user of the foreign project.
    #[serde(default = "default_true")]
    pub notify_owner: bool,
    #[serde(default = "default_kind")]
    pub notification_kind: String,
    /// Deep link for notifications; `{project_id}` is substituted.
    #[serde(default = "default_link_template")]
    pub link_template: String,
}

fn default_true() -> bool {
    true
}

fn default_kind() -> String {
    "schedule_conflict".to_string()
}

fn default_link_template() -> String {
    "/projects/{project_id}/schedule".to_string()
}

impl ConflictConfig {
    pub fn link_for(&self, project_id: &str) -> String {
        self.link_template.replace("{project_id}", project_id)
    }
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            flag_candidate: false,
            notify_owner: true,
            notification_kind: default_kind(),
            link_template: default_link_template(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogConfig {
    #[serde(default = "default_true")]
    pub include_builtins: bool,
    /// Templates seeded on top of (and overriding) the built-in ones.
    #[serde(default)]
    pub templates: Vec<TaskTemplate>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            include_builtins: true,
            templates: Vec::new(),
        }
    }
}
