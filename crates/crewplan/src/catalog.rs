//! Productivity catalog: the reference templates estimation draws on.
//!
//! Templates are seeded from a built-in set plus whatever the config adds,
//! and are never modified by scheduling operations.

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::config::CatalogConfig;
use crate::db::{template_repo, Database, DatabaseError};
use crate::error::ValidationIssue;
use crate::estimation::{self, Estimate, EstimateRequest};
use crate::model::TaskTemplate;

/// Normalizes a key or alias for storage and lookup.
pub fn normalize_key(key: &str) -> String {
    key.trim().to_uppercase()
}

fn builtin(key: &str, label: &str, hours_per_unit: f64, unit: &str, aliases: &[&str]) -> TaskTemplate {
    TaskTemplate {
        key: key.to_string(),
        label: label.to_string(),
        hours_per_unit,
        complexity_factor: 1.0,
        unit_label: unit.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
    }
}

/// The templates every installation starts with.
pub fn builtin_templates() -> Vec<TaskTemplate> {
    vec![
        builtin("EXCAVATION", "Excavation", 1.6, "m3", &[]),
        builtin("BUILDING", "Brick laying", 0.08, "bricks", &["BRICKWORK"]),
        builtin("CONCRETE", "Concrete pouring", 2.0, "m3", &[]),
        builtin("PLASTERING", "Plastering", 0.5, "m2", &[]),
        builtin("TILING", "Tiling", 0.6, "m2", &[]),
        builtin("PAINTING", "Painting", 0.15, "m2", &[]),
    ]
}

#[derive(Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Upserts the built-ins (unless disabled) and the configured templates
    /// in one transaction. Configured templates override built-ins by key.
    pub fn seed(&self, config: &CatalogConfig) -> Result<usize, DatabaseError> {
        let mut templates = if config.include_builtins {
            builtin_templates()
        } else {
            Vec::new()
        };
        templates.extend(config.templates.iter().cloned());

        self.db.transaction(|conn| {
            for template in &templates {
                let mut normalized = template.clone();
                normalized.key = normalize_key(&template.key);
                normalized.aliases = template.aliases.iter().map(|a| normalize_key(a)).collect();
                template_repo::upsert(conn, &normalized)?;
            }
            Ok::<_, DatabaseError>(())
        })?;

        log::info!("Seeded {} task templates", templates.len());
        Ok(templates.len())
    }

    pub fn find(&self, key: &str) -> Result<Option<TaskTemplate>, DatabaseError> {
        self.db.with_conn(|conn| find_in(conn, key))
    }

    pub fn list(&self) -> Result<Vec<TaskTemplate>, DatabaseError> {
        self.db.with_conn(template_repo::list)
    }

    /// Resolves the template and runs the estimation engine.
    pub fn estimate(
        &self,
        request: &EstimateRequest,
        now: DateTime<Utc>,
    ) -> Result<Result<Estimate, ValidationIssue>, DatabaseError> {
        self.db.with_conn(|conn| estimate_in(conn, request, now))
    }
}

/// Template lookup on an open connection (usable inside transactions).
pub fn find_in(conn: &Connection, key: &str) -> Result<Option<TaskTemplate>, DatabaseError> {
    let key = normalize_key(key);
    if key.is_empty() {
        return Ok(None);
    }
    template_repo::find_by_key(conn, &key)
}

/// Estimation on an open connection. The outer error is infrastructure,
/// the inner one is invalid input.
pub fn estimate_in(
    conn: &Connection,
    request: &EstimateRequest,
    now: DateTime<Utc>,
) -> Result<Result<Estimate, ValidationIssue>, DatabaseError> {
    let template = match &request.template_key {
        Some(key) => find_in(conn, key)?,
        None => None,
    };
    if template.is_none() {
        if let Some(key) = &request.template_key {
            tracing::debug!(template_key = %key, "Unknown template, using default estimate");
        }
    }
    Ok(estimation::estimate(request, template.as_ref(), now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{day, db};

    #[test]
    fn test_seed_builtins_and_lookup_alias_case_insensitive() {
        let catalog = Catalog::new(db());
        let seeded = catalog.seed(&CatalogConfig::default()).unwrap();
        assert_eq!(seeded, builtin_templates().len());

        let brick = catalog.find(" brickwork ").unwrap().unwrap();
        assert_eq!(brick.key, "BUILDING");
        assert_eq!(brick.hours_per_unit, 0.08);
        assert!(catalog.find("").unwrap().is_none());
    }

    #[test]
    fn test_config_templates_override_builtins() {
        let catalog = Catalog::new(db());
        let mut config = CatalogConfig::default();
        let mut excavation = builtin_templates().remove(0);
        excavation.key = "excavation".to_string();
        excavation.complexity_factor = 1.25;
        config.templates.push(excavation);
        catalog.seed(&config).unwrap();

        let found = catalog.find("EXCAVATION").unwrap().unwrap();
        assert_eq!(found.complexity_factor, 1.25);
        assert_eq!(catalog.list().unwrap().len(), builtin_templates().len());
    }

    #[test]
    fn test_seed_without_builtins() {
        let catalog = Catalog::new(db());
        let config = CatalogConfig {
            include_builtins: false,
            templates: Vec::new(),
        };
        assert_eq!(catalog.seed(&config).unwrap(), 0);
        assert!(catalog.list().unwrap().is_empty());
    }

    #[test]
    fn test_estimate_through_catalog() {
        let catalog = Catalog::new(db());
        catalog.seed(&CatalogConfig::default()).unwrap();

        let request = EstimateRequest::new(Some("excavation"), Some(50.0), 1).starting_at(Some(day(2025, 6, 1)));
        let estimate = catalog.estimate(&request, day(2025, 1, 1)).unwrap().unwrap();
        assert_eq!(estimate.estimated_hours, 80.0);
        assert_eq!(estimate.duration_days, Some(10));
        assert_eq!(estimate.planned_end, Some(day(2025, 6, 11)));
        assert_eq!(estimate.template_key.as_deref(), Some("EXCAVATION"));

        let bad = EstimateRequest::new(Some("EXCAVATION"), Some(-1.0), 1);
        assert!(catalog.estimate(&bad, day(2025, 1, 1)).unwrap().is_err());
    }

    #[test]
    fn test_quantity_required_only_for_known_templates() {
        let catalog = Catalog::new(db());
        catalog.seed(&CatalogConfig::default()).unwrap();

        let unknown = EstimateRequest::new(Some("ROOFING"), None, 1);
        let estimate = catalog.estimate(&unknown, day(2025, 1, 1)).unwrap().unwrap();
        assert_eq!(estimate, Estimate::fallback());

        let known = EstimateRequest::new(Some("EXCAVATION"), None, 1);
        let issue = catalog.estimate(&known, day(2025, 1, 1)).unwrap().unwrap_err();
        assert_eq!(issue.kind, crate::error::IssueKind::MissingQuantity);
    }
}
