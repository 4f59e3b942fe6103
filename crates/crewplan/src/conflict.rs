//! Conflict detector: finds workers double-booked across projects.
//!
//! Detection is a read-only pass run before a save commits; it yields
//! [`PendingConflicts`]. Once the save has committed, [`ConflictDetector::apply`]
//! drains them: the foreign items get flagged and their project owners
//! notified. Each of those writes has its own error boundary. Failures become
//! [`SaveWarning`]s and broadcast events, never errors of the save.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info_span, warn};
use uuid::Uuid;

use crate::broadcast::{ConflictBroadcaster, ConflictEvent};
use crate::config::ConflictConfig;
use crate::db::item_repo::{self, ForeignBooking};
use crate::db::{notification_repo, Database};
use crate::model::{Notification, Project};

/// A best-effort step that failed during a save. The save still succeeded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SaveWarning {
    ConflictLookupFailed { item: String, error: String },
    ConflictFlagFailed { foreign_item_id: String, error: String },
    NotificationFailed { recipient_id: String, error: String },
}

/// What the detector needs to know about an item being saved.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub title: String,
    pub planned_start: Option<DateTime<Utc>>,
    pub planned_end: Option<DateTime<Utc>>,
    pub worker_ids: Vec<String>,
}

impl Candidate {
    /// Only items with both dates and at least one assignee can collide.
    pub fn is_checkable(&self) -> bool {
        self.planned_start.is_some() && self.planned_end.is_some() && !self.worker_ids.is_empty()
    }
}

/// Two ranges overlap iff `start <= other_end && end >= other_start`.
/// Touching boundaries count.
pub fn ranges_overlap(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    other_start: DateTime<Utc>,
    other_end: DateTime<Utc>,
) -> bool {
    start <= other_end && end >= other_start
}

/// Client-facing description of one collision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSummary {
    pub foreign_item_id: String,
    pub foreign_item_title: String,
    pub foreign_project_id: String,
    pub foreign_project_label: String,
    pub worker_ids: Vec<String>,
    pub worker_names: Vec<String>,
    pub overlap_start: DateTime<Utc>,
    pub overlap_end: DateTime<Utc>,
}

/// A candidate/foreign pair found by detection.
#[derive(Debug, Clone)]
pub struct ConflictMatch {
    pub candidate_index: usize,
    pub candidate_title: String,
    pub candidate_start: DateTime<Utc>,
    pub candidate_end: DateTime<Utc>,
    pub booking: ForeignBooking,
}

impl ConflictMatch {
    pub fn overlap_start(&self) -> DateTime<Utc> {
        self.candidate_start.max(self.booking.planned_start)
    }

    pub fn overlap_end(&self) -> DateTime<Utc> {
        self.candidate_end.min(self.booking.planned_end)
    }

    pub fn summary(&self) -> ConflictSummary {
        ConflictSummary {
            foreign_item_id: self.booking.item_id.clone(),
            foreign_item_title: self.booking.item_title.clone(),
            foreign_project_id: self.booking.project.id.clone(),
            foreign_project_label: self.booking.project.label(),
            worker_ids: self.booking.shared_workers.iter().map(|w| w.id.clone()).collect(),
            worker_names: self.worker_names(),
            overlap_start: self.overlap_start(),
            overlap_end: self.overlap_end(),
        }
    }

    fn worker_names(&self) -> Vec<String> {
        self.booking
            .shared_workers
            .iter()
            .map(|w| w.display_name.clone())
            .collect()
    }

    /// Note written onto the foreign item.
    pub fn foreign_note(&self, project: &Project) -> String {
        format!(
            "Conflict with {}: '{}' books {} from {} to {}",
            project.label(),
            self.candidate_title,
            self.worker_names().join(", "),
            self.candidate_start.format("%Y-%m-%d"),
            self.candidate_end.format("%Y-%m-%d"),
        )
    }

    /// Note written onto the candidate when candidate flagging is enabled.
    pub fn candidate_note(&self) -> String {
        format!(
            "Conflict with {}: '{}' ({})",
            self.booking.project.label(),
            self.booking.item_title,
            self.worker_names().join(", "),
        )
    }

    pub fn notification_message(&self, project: &Project) -> String {
        format!(
            "Scheduling conflict: {} on '{}' ({}) also booked on '{}' ({}) around {}",
            self.worker_names().join(", "),
            self.booking.item_title,
            self.booking.project.label(),
            self.candidate_title,
            project.label(),
            self.overlap_start().format("%Y-%m-%d"),
        )
    }
}

/// Detection result waiting for the save to commit.
#[derive(Debug, Default)]
pub struct PendingConflicts {
    pub matches: Vec<ConflictMatch>,
    /// Candidate indices whose lookup failed; their flags are left as they were.
    pub unknown: Vec<usize>,
    pub warnings: Vec<SaveWarning>,
}

impl PendingConflicts {
    pub fn for_candidate(&self, index: usize) -> Option<Vec<&ConflictMatch>> {
        if self.unknown.contains(&index) {
            return None;
        }
        Some(
            self.matches
                .iter()
                .filter(|m| m.candidate_index == index)
                .collect(),
        )
    }
}

#[derive(Clone)]
pub struct ConflictDetector {
    db: Database,
    config: ConflictConfig,
    broadcaster: ConflictBroadcaster,
}

impl ConflictDetector {
    pub fn new(db: Database, config: ConflictConfig, broadcaster: ConflictBroadcaster) -> Self {
        Self {
            db,
            config,
            broadcaster,
        }
    }

    pub fn config(&self) -> &ConflictConfig {
        &self.config
    }

    pub fn broadcaster(&self) -> &ConflictBroadcaster {
        &self.broadcaster
    }

    /// Looks up foreign bookings for each checkable candidate, one query per
    /// candidate. Lookup failures are recorded, not returned.
    pub fn detect(&self, project: &Project, candidates: &[Candidate]) -> PendingConflicts {
        let _span = info_span!("conflict.detect", project_id = %project.id, candidates = candidates.len())
            .entered();
        let mut pending = PendingConflicts::default();

        for (index, candidate) in candidates.iter().enumerate() {
            let (start, end) = match (candidate.planned_start, candidate.planned_end) {
                (Some(s), Some(e)) if candidate.is_checkable() => (s, e),
                _ => continue,
            };

            let found = self.db.with_conn(|conn| {
                item_repo::find_overlapping(conn, &candidate.worker_ids, start, end, &project.id)
            });

            match found {
                Ok(bookings) => {
                    for booking in bookings {
                        debug!(
                            candidate = %candidate.title,
                            foreign_item_id = %booking.item_id,
                            foreign_project_id = %booking.project.id,
                            "Worker double-booked"
                        );
                        self.broadcaster.send(ConflictEvent::Detected {
                            project_id: project.id.clone(),
                            candidate_title: candidate.title.clone(),
                            foreign_item_id: booking.item_id.clone(),
                            foreign_project_id: booking.project.id.clone(),
                            worker_ids: booking.shared_workers.iter().map(|w| w.id.clone()).collect(),
                        });
                        pending.matches.push(ConflictMatch {
                            candidate_index: index,
                            candidate_title: candidate.title.clone(),
                            candidate_start: start,
                            candidate_end: end,
                            booking,
                        });
                    }
                }
                Err(e) => {
                    warn!(candidate = %candidate.title, error = %e, "Conflict lookup failed");
                    pending.unknown.push(index);
                    pending.warnings.push(SaveWarning::ConflictLookupFailed {
                        item: candidate.title.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        pending
    }

    /// Post-commit step: flags every foreign item and notifies its owner.
    pub fn apply(&self, project: &Project, pending: &PendingConflicts) -> Vec<SaveWarning> {
        let _span = info_span!("conflict.apply", project_id = %project.id, matches = pending.matches.len())
            .entered();
        let mut warnings = Vec::new();

        for conflict in &pending.matches {
            let foreign_id = &conflict.booking.item_id;
            let note = conflict.foreign_note(project);

            match self
                .db
                .with_conn(|conn| item_repo::set_conflict(conn, foreign_id, &note, Utc::now()))
            {
                Ok(()) => self.broadcaster.send(ConflictEvent::Flagged {
                    foreign_item_id: foreign_id.clone(),
                }),
                Err(e) => {
                    warn!(foreign_item_id = %foreign_id, error = %e, "Failed to flag conflicting item");
                    self.broadcaster.send(ConflictEvent::Failed {
                        foreign_item_id: foreign_id.clone(),
                        step: "flag".to_string(),
                        error: e.to_string(),
                    });
                    warnings.push(SaveWarning::ConflictFlagFailed {
                        foreign_item_id: foreign_id.clone(),
                        error: e.to_string(),
                    });
                }
            }

            if !self.config.notify_owner {
                continue;
            }
            let Some(recipient) = conflict.booking.project.owner_id.clone() else {
                debug!(foreign_project_id = %conflict.booking.project.id, "No owner to notify");
                continue;
            };

            let notification = Notification {
                id: Uuid::new_v4().to_string(),
                recipient_id: recipient.clone(),
                kind: self.config.notification_kind.clone(),
                message: conflict.notification_message(project),
                link: Some(self.config.link_for(&conflict.booking.project.id)),
                created_at: Utc::now(),
            };

            match self
                .db
                .with_conn(|conn| notification_repo::insert(conn, &notification))
            {
                Ok(()) => self.broadcaster.send(ConflictEvent::Notified {
                    recipient_id: recipient,
                    notification_id: notification.id,
                }),
                Err(e) => {
                    warn!(recipient_id = %recipient, error = %e, "Failed to send conflict notification");
                    self.broadcaster.send(ConflictEvent::Failed {
                        foreign_item_id: foreign_id.clone(),
                        step: "notify".to_string(),
                        error: e.to_string(),
                    });
                    warnings.push(SaveWarning::NotificationFailed {
                        recipient_id: recipient,
                        error: e.to_string(),
                    });
                }
            }
        }

        warnings
    }
}
