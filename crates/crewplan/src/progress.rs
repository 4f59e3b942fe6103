//! Progress tracker: appends progress reports and keeps each item's
//! percent/status projection in step with the latest one.
//!
//! The projection is last-write-wins. Two workers reporting on the same
//! item overwrite each other's percent; the history keeps both reports.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};
use uuid::Uuid;

use crate::caller::Caller;
use crate::db::{item_repo, progress_repo, project_repo, schedule_repo, Database};
use crate::error::{IssueKind, Result, SchedulingError, ValidationIssue};
use crate::model::{ItemStatus, ProgressReport, ScheduleItem};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProgress {
    pub item_id: String,
    pub worker_id: String,
    pub percent: f64,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOutcome {
    pub report: ProgressReport,
    pub item: ScheduleItem,
}

/// Aggregate state of a whole schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Done,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleProgress {
    pub project_id: String,
    pub schedule_id: String,
    pub status: ProgressStatus,
    /// Hours-weighted; a plain average when no item carries hours.
    pub percent_complete: f64,
    pub total_hours: f64,
    pub item_count: usize,
    pub done_count: usize,
    pub in_progress_count: usize,
}

/// Rejects anything outside `[0, 100]`, NaN included.
pub fn validate_percent(percent: f64) -> std::result::Result<(), ValidationIssue> {
    if percent.is_finite() && (0.0..=100.0).contains(&percent) {
        Ok(())
    } else {
        Err(ValidationIssue::new(
            IssueKind::InvalidPercent,
            format!("percent must be between 0 and 100, got {}", percent),
        ))
    }
}

/// Status implied by a freshly reported percent.
pub fn status_for_percent(percent: f64) -> ItemStatus {
    if percent >= 100.0 {
        ItemStatus::Done
    } else {
        ItemStatus::InProgress
    }
}

/// Folds live items into a schedule-level summary.
pub fn summarize(items: &[ScheduleItem]) -> (ProgressStatus, f64, f64) {
    if items.is_empty() {
        return (ProgressStatus::NotStarted, 0.0, 0.0);
    }

    let total_hours: f64 = items.iter().map(|i| i.estimated_hours.max(0.0)).sum();
    let percent = if total_hours > 0.0 {
        items
            .iter()
            .map(|i| i.percent_complete * i.estimated_hours.max(0.0))
            .sum::<f64>()
            / total_hours
    } else {
        items.iter().map(|i| i.percent_complete).sum::<f64>() / items.len() as f64
    };

    let status = if items.iter().all(|i| i.status == ItemStatus::Done) {
        ProgressStatus::Done
    } else if items.iter().any(|i| i.status.is_started()) {
        ProgressStatus::InProgress
    } else {
        ProgressStatus::NotStarted
    };

    (status, percent, total_hours)
}

#[derive(Clone)]
pub struct ProgressTracker {
    db: Database,
}

impl ProgressTracker {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Appends a report and updates the item's projection in one transaction.
    pub fn submit(&self, caller: &Caller, input: SubmitProgress) -> Result<ProgressOutcome> {
        caller.ensure_identified()?;
        let _span = info_span!(
            "progress.submit",
            item_id = %input.item_id,
            worker_id = %input.worker_id,
            caller_id = %caller.id,
            percent = input.percent,
        )
        .entered();

        validate_percent(input.percent)?;

        let now = Utc::now();
        let outcome = self.db.transaction(|conn| -> Result<ProgressOutcome> {
            let mut item = item_repo::find_by_id(conn, &input.item_id)?
                .ok_or_else(|| SchedulingError::not_found("item", &input.item_id))?;
            if item.archived {
                return Err(ValidationIssue::for_item(
                    &item.title,
                    IssueKind::Archived,
                    "item was removed from the schedule",
                )
                .into());
            }
            if project_repo::find_worker(conn, &input.worker_id)?.is_none() {
                return Err(ValidationIssue::for_item(
                    &item.title,
                    IssueKind::UnknownWorker,
                    format!("unknown worker {}", input.worker_id),
                )
                .into());
            }

            let report = ProgressReport {
                id: Uuid::new_v4().to_string(),
                item_id: item.id.clone(),
                worker_id: input.worker_id.clone(),
                percent: input.percent,
                note: input.note.clone(),
                created_at: now,
            };
            progress_repo::insert(conn, &report)?;

            let status = status_for_percent(input.percent);
            item_repo::update_projection(conn, &item.id, input.percent, status, now)?;
            item.percent_complete = input.percent;
            item.status = status;
            item.updated_at = now;

            Ok(ProgressOutcome { report, item })
        })?;

        info!(status = %outcome.item.status, "Progress recorded");
        Ok(outcome)
    }

    /// Lists an item's reports, newest first.
    pub fn history(&self, caller: &Caller, item_id: &str) -> Result<Vec<ProgressReport>> {
        caller.ensure_identified()?;
        self.db
            .with_conn(|conn| match item_repo::find_by_id(conn, item_id)? {
                Some(_) => progress_repo::list_for_item(conn, item_id).map(Some),
                None => Ok(None),
            })?
            .ok_or_else(|| SchedulingError::not_found("item", item_id))
    }

    /// Aggregate progress over the live items of a project's schedule.
    pub fn schedule_progress(&self, caller: &Caller, project_id: &str) -> Result<ScheduleProgress> {
        caller.ensure_identified()?;
        let (schedule, items) = self
            .db
            .with_conn(|conn| {
                if project_repo::find_project(conn, project_id)?.is_none() {
                    return Ok(None);
                }
                match schedule_repo::find_by_project(conn, project_id)? {
                    Some(schedule) => {
                        let items = item_repo::list_for_schedule(conn, &schedule.id, false)?;
                        Ok(Some((schedule, items)))
                    }
                    None => Ok(None),
                }
            })?
            .ok_or_else(|| SchedulingError::not_found("schedule", project_id))?;

        let (status, percent_complete, total_hours) = summarize(&items);
        Ok(ScheduleProgress {
            project_id: project_id.to_string(),
            schedule_id: schedule.id,
            status,
            percent_complete,
            total_hours,
            item_count: items.len(),
            done_count: items.iter().filter(|i| i.status == ItemStatus::Done).count(),
            in_progress_count: items
                .iter()
                .filter(|i| i.status == ItemStatus::InProgress)
                .count(),
        })
    }
}
