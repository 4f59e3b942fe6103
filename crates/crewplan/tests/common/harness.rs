//! Isolated application instance for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use crewplan::db::{item_repo, notification_repo, progress_repo, project_repo, quote_repo};
use crewplan::model::{Notification, Project, Quote, QuoteLine, ScheduleItem, Worker};
use crewplan::{Caller, CallerRole, Config, Crewplan};

pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub struct TestHarness {
    pub app: Crewplan,
    pub manager: Caller,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let app = Crewplan::in_memory(&config).expect("Failed to create application");
        Self {
            app,
            manager: Caller::new("u-manager", CallerRole::Manager),
        }
    }

    pub fn add_project(&self, id: &str, number: &str, name: &str, owner: Option<&str>) -> Project {
        let project = Project {
            id: id.to_string(),
            number: number.to_string(),
            name: name.to_string(),
            owner_id: owner.map(str::to_string),
        };
        self.app
            .db
            .with_conn(|conn| project_repo::upsert_project(conn, &project))
            .unwrap();
        project
    }

    pub fn add_worker(&self, id: &str, name: &str) -> Worker {
        let worker = Worker {
            id: id.to_string(),
            display_name: name.to_string(),
        };
        self.app
            .db
            .with_conn(|conn| project_repo::upsert_worker(conn, &worker))
            .unwrap();
        worker
    }

    /// Adds a quote whose lines are `(title, unit, quantity, template_key)`.
    pub fn add_quote(
        &self,
        project_id: &str,
        number: &str,
        lines: &[(&str, Option<&str>, Option<f64>, Option<&str>)],
    ) -> Quote {
        let quote = Quote {
            id: format!("q-{}", number),
            project_id: project_id.to_string(),
            number: number.to_string(),
            created_at: day(2025, 1, 1),
        };
        self.app
            .db
            .with_conn(|conn| {
                quote_repo::insert_quote(conn, &quote)?;
                for (position, (title, unit, quantity, template_key)) in lines.iter().enumerate() {
                    quote_repo::insert_line(
                        conn,
                        &QuoteLine {
                            id: format!("{}-{}", quote.id, position),
                            quote_id: quote.id.clone(),
                            position: position as u32,
                            title: title.to_string(),
                            description: None,
                            unit: unit.map(str::to_string),
                            quantity: *quantity,
                            template_key: template_key.map(str::to_string),
                        },
                    )?;
                }
                Ok(())
            })
            .unwrap();
        quote
    }

    pub fn item(&self, id: &str) -> Option<ScheduleItem> {
        self.app
            .db
            .with_conn(|conn| item_repo::find_by_id(conn, id))
            .unwrap()
    }

    pub fn notifications(&self, recipient_id: &str) -> Vec<Notification> {
        self.app
            .db
            .with_conn(|conn| notification_repo::list_for_recipient(conn, recipient_id))
            .unwrap()
    }

    pub fn report_count(&self, item_id: &str) -> u64 {
        self.app
            .db
            .with_conn(|conn| progress_repo::count_for_item(conn, item_id))
            .unwrap()
    }
}
