//! Fixtures shared by unit tests.

use chrono::{DateTime, TimeZone, Utc};

use crate::db::{project_repo, schedule_repo, Database};
use crate::model::{
    Assignment, ItemStatus, Project, Schedule, ScheduleItem, ScheduleStatus, Worker,
};

pub fn db() -> Database {
    Database::open_in_memory().expect("Failed to create test database")
}

pub fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

pub fn add_project(db: &Database, id: &str, owner: Option<&str>) -> Project {
    let project = Project {
        id: id.to_string(),
        number: format!("P-{}", id.to_uppercase()),
        name: format!("Project {}", id),
        owner_id: owner.map(str::to_string),
    };
    db.with_conn(|conn| project_repo::upsert_project(conn, &project))
        .unwrap();
    project
}

pub fn add_worker(db: &Database, id: &str, name: &str) -> Worker {
    let worker = Worker {
        id: id.to_string(),
        display_name: name.to_string(),
    };
    db.with_conn(|conn| project_repo::upsert_worker(conn, &worker))
        .unwrap();
    worker
}

pub fn add_schedule(db: &Database, project_id: &str) -> Schedule {
    let schedule = Schedule {
        id: format!("s-{}", project_id),
        project_id: project_id.to_string(),
        note: None,
        status: ScheduleStatus::Active,
        created_by: "u-admin".to_string(),
        created_at: day(2025, 1, 1),
        updated_at: day(2025, 1, 1),
    };
    db.with_conn(|conn| schedule_repo::insert(conn, &schedule))
        .unwrap();
    schedule
}

/// An active item booked for `workers` over `[start, end]`.
pub fn booked_item(
    schedule_id: &str,
    id: &str,
    title: &str,
    workers: &[&str],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> ScheduleItem {
    ScheduleItem {
        id: id.to_string(),
        schedule_id: schedule_id.to_string(),
        position: 0,
        title: title.to_string(),
        description: None,
        unit: None,
        quantity: None,
        template_key: None,
        planned_start: Some(start),
        planned_end: Some(end),
        status: ItemStatus::Active,
        estimated_hours: 8.0,
        percent_complete: 0.0,
        has_conflict: false,
        conflict_note: None,
        archived: false,
        assignees: workers.iter().map(|w| Assignment::new(*w)).collect(),
        created_at: day(2025, 1, 1),
        updated_at: day(2025, 1, 1),
    }
}
