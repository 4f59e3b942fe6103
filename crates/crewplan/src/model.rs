//! Domain records shared by the scheduling components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a single schedule item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Draft,
    Active,
    InProgress,
    Done,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Draft => "draft",
            ItemStatus::Active => "active",
            ItemStatus::InProgress => "in_progress",
            ItemStatus::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ItemStatus::Draft),
            "active" => Some(ItemStatus::Active),
            "in_progress" => Some(ItemStatus::InProgress),
            "done" => Some(ItemStatus::Done),
            _ => None,
        }
    }

    /// Whether work on the item has been reported (status is owned by progress, not by saves).
    pub fn is_started(&self) -> bool {
        matches!(self, ItemStatus::InProgress | ItemStatus::Done)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a project's schedule as a whole.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    #[default]
    Draft,
    Active,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Draft => "draft",
            ScheduleStatus::Active => "active",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ScheduleStatus::Draft),
            "active" => Some(ScheduleStatus::Active),
            _ => None,
        }
    }
}

/// A project as seen by the scheduler. Owned by the surrounding ERP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub number: String,
    pub name: String,
    /// Responsible user; receives conflict notifications.
    pub owner_id: Option<String>,
}

impl Project {
    /// `P-104 Grain Dryer` style label used in notes and notifications.
    pub fn label(&self) -> String {
        format!("{} {}", self.number, self.name)
    }
}

/// A bookable person. Owned by HR; the scheduler only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    pub id: String,
    pub display_name: String,
}

/// Productivity template: labor-hours per unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskTemplate {
    pub key: String,
    pub label: String,
    pub hours_per_unit: f64,
    #[serde(default = "default_complexity")]
    pub complexity_factor: f64,
    pub unit_label: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

fn default_complexity() -> f64 {
    1.0
}

/// One worker booked onto a schedule item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub worker_id: String,
    /// Hours per day this worker spends on the item. Recorded only; estimates
    /// count every assignee as one full day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_per_day: Option<f64>,
}

impl Assignment {
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            hours_per_day: None,
        }
    }
}

/// A project's schedule header. At most one per project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub project_id: String,
    pub note: Option<String>,
    pub status: ScheduleStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One schedulable unit of work within a project's schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub id: String,
    pub schedule_id: String,
    pub position: u32,
    pub title: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<f64>,
    pub template_key: Option<String>,
    pub planned_start: Option<DateTime<Utc>>,
    pub planned_end: Option<DateTime<Utc>>,
    pub status: ItemStatus,
    pub estimated_hours: f64,
    pub percent_complete: f64,
    pub has_conflict: bool,
    pub conflict_note: Option<String>,
    pub archived: bool,
    #[serde(default)]
    pub assignees: Vec<Assignment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleItem {
    pub fn assignee_ids(&self) -> Vec<String> {
        self.assignees.iter().map(|a| a.worker_id.clone()).collect()
    }
}

/// Append-only record of reported completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub id: String,
    pub item_id: String,
    pub worker_id: String,
    pub percent: f64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outbound message to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub kind: String,
    pub message: String,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A quote attached to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub project_id: String,
    pub number: String,
    pub created_at: DateTime<Utc>,
}

/// A priced line of a quote; becomes a schedule item on extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLine {
    pub id: String,
    pub quote_id: String,
    pub position: u32,
    pub title: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<f64>,
    pub template_key: Option<String>,
}
