//! Schedule builder: validates, estimates and persists a project's full
//! item set, and seeds a draft schedule from the project's quote.
//!
//! A save replaces the item set as a whole, but item identity survives:
//! incoming items are matched to stored ones by id, then by title. Stored
//! items left unmatched are deleted, unless they carry progress reports,
//! in which case they are archived.

use std::collections::HashSet;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};
use uuid::Uuid;

use crate::caller::Caller;
use crate::catalog::{self, normalize_key};
use crate::conflict::{Candidate, ConflictDetector, ConflictMatch, ConflictSummary, SaveWarning};
use crate::db::{item_repo, progress_repo, project_repo, quote_repo, schedule_repo, Database};
use crate::error::{IssueKind, Result, SchedulingError, ValidationErrors, ValidationIssue};
use crate::estimation::EstimateRequest;
use crate::model::{
    Assignment, ItemStatus, Project, Schedule, ScheduleItem, ScheduleStatus,
};

/// One item as submitted by the client.
///
/// Planned dates are kept to whole seconds; a save truncates any fraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub template_key: Option<String>,
    #[serde(default)]
    pub planned_start: Option<DateTime<Utc>>,
    /// Wins over the computed end when present.
    #[serde(default)]
    pub planned_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assignees: Vec<Assignment>,
}

impl ItemInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_template(mut self, key: &str, quantity: f64) -> Self {
        self.template_key = Some(key.to_string());
        self.quantity = Some(quantity);
        self
    }

    pub fn starting(mut self, start: DateTime<Utc>) -> Self {
        self.planned_start = Some(start);
        self
    }

    pub fn ending(mut self, end: DateTime<Utc>) -> Self {
        self.planned_end = Some(end);
        self
    }

    pub fn assigned(mut self, worker_ids: &[&str]) -> Self {
        self.assignees = worker_ids.iter().map(|w| Assignment::new(*w)).collect();
        self
    }

    /// Drops sub-second precision from the planned dates, matching what
    /// storage keeps.
    fn truncate_to_seconds(&mut self) {
        self.planned_start = self.planned_start.map(|t| t.trunc_subsecs(0));
        self.planned_end = self.planned_end.map(|t| t.trunc_subsecs(0));
    }

    /// Label used in validation messages.
    fn label(&self, index: usize) -> String {
        if self.title.trim().is_empty() {
            format!("item #{}", index + 1)
        } else {
            self.title.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveScheduleRequest {
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemInput>,
    #[serde(default)]
    pub status: ScheduleStatus,
}

/// A persisted item plus the collisions detected for it during the save.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItem {
    #[serde(flatten)]
    pub item: ScheduleItem,
    pub conflicts: Vec<ConflictSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub schedule: Schedule,
    pub items: Vec<SavedItem>,
    pub archived_item_ids: Vec<String>,
    pub deleted_item_ids: Vec<String>,
    pub warnings: Vec<SaveWarning>,
}

impl SaveOutcome {
    pub fn schedule_id(&self) -> &str {
        &self.schedule.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView {
    pub project: Project,
    pub schedule: Schedule,
    pub items: Vec<ScheduleItem>,
}

/// An input after estimation, ready to persist.
#[derive(Debug, Clone)]
struct PlannedItem {
    input: ItemInput,
    template_key: Option<String>,
    estimated_hours: f64,
    planned_end: Option<DateTime<Utc>>,
}

impl PlannedItem {
    fn candidate(&self) -> Candidate {
        Candidate {
            title: self.input.title.clone(),
            planned_start: self.input.planned_start,
            planned_end: self.planned_end,
            worker_ids: self
                .input
                .assignees
                .iter()
                .map(|a| a.worker_id.clone())
                .collect(),
        }
    }
}

/// Caller-independent checks; every problem is collected.
pub fn validate_items(items: &[ItemInput], status: ScheduleStatus) -> ValidationErrors {
    let mut errors = ValidationErrors::default();
    let mut ids = HashSet::new();

    for (index, item) in items.iter().enumerate() {
        let label = item.label(index);

        if item.title.trim().is_empty() {
            errors.push(ValidationIssue::for_item(&label, IssueKind::MissingTitle, "title is required"));
        }
        if let Some(id) = &item.id {
            if !ids.insert(id.as_str()) {
                errors.push(ValidationIssue::for_item(
                    &label,
                    IssueKind::DuplicateItemId,
                    format!("item id {} appears more than once", id),
                ));
            }
        }
        if let (Some(start), Some(end)) = (item.planned_start, item.planned_end) {
            if end < start {
                errors.push(ValidationIssue::for_item(
                    &label,
                    IssueKind::InvalidDateRange,
                    "planned end is before planned start",
                ));
            }
        }
        let mut workers = HashSet::new();
        for assignee in &item.assignees {
            if !workers.insert(assignee.worker_id.as_str()) {
                errors.push(ValidationIssue::for_item(
                    &label,
                    IssueKind::DuplicateWorker,
                    format!("worker {} is assigned more than once", assignee.worker_id),
                ));
            }
            if let Some(h) = assignee.hours_per_day {
                if !h.is_finite() || h <= 0.0 || h > 24.0 {
                    errors.push(ValidationIssue::for_item(
                        &label,
                        IssueKind::InvalidQuantity,
                        format!("hours per day for {} must be in (0, 24], got {}", assignee.worker_id, h),
                    ));
                }
            }
        }

        if status == ScheduleStatus::Active {
            if item.assignees.is_empty() {
                errors.push(ValidationIssue::for_item(
                    &label,
                    IssueKind::MissingAssignees,
                    "no workers assigned",
                ));
            }
            if item.planned_start.is_none() {
                errors.push(ValidationIssue::for_item(
                    &label,
                    IssueKind::MissingStartDate,
                    "no planned start date",
                ));
            }
        }
    }

    errors
}

/// Pairs inputs with stored items: first by id (archived items included, so
/// they can be restored), then by exact title among live items.
///
/// Returns, per input, the index of its stored item.
pub fn match_existing(existing: &[ScheduleItem], inputs: &[ItemInput]) -> Vec<Option<usize>> {
    let mut claimed = vec![false; existing.len()];
    let mut matches = vec![None; inputs.len()];

    for (i, input) in inputs.iter().enumerate() {
        if let Some(id) = &input.id {
            if let Some(pos) = existing.iter().position(|e| &e.id == id) {
                if !claimed[pos] {
                    claimed[pos] = true;
                    matches[i] = Some(pos);
                }
            }
        }
    }

    for (i, input) in inputs.iter().enumerate() {
        if input.id.is_some() {
            continue;
        }
        let found = existing
            .iter()
            .enumerate()
            .position(|(pos, e)| !claimed[pos] && !e.archived && e.title == input.title);
        if let Some(pos) = found {
            claimed[pos] = true;
            matches[i] = Some(pos);
        }
    }

    matches
}

fn item_status(previous: Option<&ScheduleItem>, target: ScheduleStatus) -> ItemStatus {
    match previous {
        Some(p) if p.status.is_started() => p.status,
        _ => match target {
            ScheduleStatus::Active => ItemStatus::Active,
            ScheduleStatus::Draft => ItemStatus::Draft,
        },
    }
}

/// Conflict flag for an item being saved.
///
/// `conflicts` is `None` when the lookup failed; previous flags are then kept.
fn candidate_flag(
    previous: Option<&ScheduleItem>,
    conflicts: Option<&[&ConflictMatch]>,
    flag_candidate: bool,
) -> (bool, Option<String>) {
    let kept = || {
        previous
            .map(|p| (p.has_conflict, p.conflict_note.clone()))
            .unwrap_or((false, None))
    };
    match conflicts {
        None => kept(),
        Some([]) => (false, None),
        Some(list) if flag_candidate => {
            let note = list
                .iter()
                .map(|m| m.candidate_note())
                .collect::<Vec<_>>()
                .join("; ");
            (true, Some(note))
        }
        Some(_) => kept(),
    }
}

#[derive(Clone)]
pub struct ScheduleService {
    db: Database,
    detector: ConflictDetector,
}

impl ScheduleService {
    pub fn new(db: Database, detector: ConflictDetector) -> Self {
        Self { db, detector }
    }

    fn load_project(&self, project_id: &str) -> Result<Project> {
        self.db
            .with_conn(|conn| project_repo::find_project(conn, project_id))?
            .ok_or_else(|| SchedulingError::not_found("project", project_id))
    }

    /// Returns the project's schedule with its live items.
    pub fn get(&self, caller: &Caller, project_id: &str) -> Result<ScheduleView> {
        caller.ensure_identified()?;
        let project = self.load_project(project_id)?;
        let (schedule, items) = self.db.with_conn(|conn| {
            match schedule_repo::find_by_project(conn, project_id)? {
                Some(schedule) => {
                    let items = item_repo::list_for_schedule(conn, &schedule.id, false)?;
                    Ok(Some((schedule, items)))
                }
                None => Ok(None),
            }
        })?
        .ok_or_else(|| SchedulingError::not_found("schedule", project_id))?;

        Ok(ScheduleView {
            project,
            schedule,
            items,
        })
    }

    /// Validates, estimates and persists the full item set of a project.
    pub fn save(
        &self,
        caller: &Caller,
        project_id: &str,
        request: SaveScheduleRequest,
    ) -> Result<SaveOutcome> {
        caller.ensure_identified()?;
        let _span = info_span!(
            "schedule.save",
            project_id = %project_id,
            caller_id = %caller.id,
            caller_role = caller.role.as_str(),
            items = request.items.len(),
            status = request.status.as_str(),
        )
        .entered();

        let project = self.load_project(project_id)?;
        self.save_for_project(caller, &project, request)
    }

    fn save_for_project(
        &self,
        caller: &Caller,
        project: &Project,
        mut request: SaveScheduleRequest,
    ) -> Result<SaveOutcome> {
        // Storage keeps whole seconds; the outcome must match a later read.
        let now = Utc::now().trunc_subsecs(0);
        request.items.iter_mut().for_each(ItemInput::truncate_to_seconds);
        let mut errors = validate_items(&request.items, request.status);

        let planned = self.plan_items(&request.items, now, &mut errors)?;
        errors.into_result()?;

        let candidates: Vec<Candidate> = planned.iter().map(PlannedItem::candidate).collect();
        let pending = self.detector.detect(project, &candidates);
        let flag_candidate = self.detector.config().flag_candidate;

        type Committed = (Schedule, Vec<ScheduleItem>, Vec<String>, Vec<String>);
        let (schedule, saved, archived, deleted) = self.db.transaction(|conn| -> Result<Committed> {
            let schedule = match schedule_repo::find_by_project(conn, &project.id)? {
                Some(mut schedule) => {
                    schedule.note = request.note.clone();
                    schedule.status = request.status;
                    schedule.updated_at = now;
                    schedule_repo::update(conn, &schedule)?;
                    schedule
                }
                None => {
                    let schedule = Schedule {
                        id: Uuid::new_v4().to_string(),
                        project_id: project.id.clone(),
                        note: request.note.clone(),
                        status: request.status,
                        created_by: caller.id.clone(),
                        created_at: now,
                        updated_at: now,
                    };
                    schedule_repo::insert(conn, &schedule)?;
                    schedule
                }
            };

            let existing = item_repo::list_for_schedule(conn, &schedule.id, true)?;
            let matches = match_existing(&existing, &request.items);

            let mut saved = Vec::with_capacity(planned.len());
            for (index, plan) in planned.iter().enumerate() {
                let previous = matches[index].map(|pos| &existing[pos]);

                let id = match (previous, &plan.input.id) {
                    (Some(p), _) => p.id.clone(),
                    (None, Some(id)) => {
                        if item_repo::find_by_id(conn, id)?.is_some() {
                            return Err(ValidationIssue::for_item(
                                &plan.input.label(index),
                                IssueKind::UnknownItemId,
                                format!("item {} belongs to another schedule", id),
                            )
                            .into());
                        }
                        id.clone()
                    }
                    (None, None) => Uuid::new_v4().to_string(),
                };

                let conflicts = pending.for_candidate(index);
                let (has_conflict, conflict_note) =
                    candidate_flag(previous, conflicts.as_deref(), flag_candidate);

                let item = ScheduleItem {
                    id,
                    schedule_id: schedule.id.clone(),
                    position: index as u32,
                    title: plan.input.title.clone(),
                    description: plan.input.description.clone(),
                    unit: plan.input.unit.clone(),
                    quantity: plan.input.quantity,
                    template_key: plan.template_key.clone(),
                    planned_start: plan.input.planned_start,
                    planned_end: plan.planned_end,
                    status: item_status(previous, request.status),
                    estimated_hours: plan.estimated_hours,
                    percent_complete: previous.map(|p| p.percent_complete).unwrap_or(0.0),
                    has_conflict,
                    conflict_note,
                    archived: false,
                    assignees: plan.input.assignees.clone(),
                    created_at: previous.map(|p| p.created_at).unwrap_or(now),
                    updated_at: now,
                };

                if previous.is_some() {
                    item_repo::update(conn, &item)?;
                } else {
                    item_repo::insert(conn, &item)?;
                }
                saved.push(item);
            }

            let claimed: HashSet<usize> = matches.iter().flatten().copied().collect();
            let mut archived = Vec::new();
            let mut deleted = Vec::new();
            for (pos, old) in existing.iter().enumerate() {
                if claimed.contains(&pos) || old.archived {
                    continue;
                }
                if progress_repo::count_for_item(conn, &old.id)? > 0 {
                    item_repo::archive(conn, &old.id, now)?;
                    archived.push(old.id.clone());
                } else {
                    item_repo::delete(conn, &old.id)?;
                    deleted.push(old.id.clone());
                }
            }

            Ok((schedule, saved, archived, deleted))
        })?;

        let mut warnings = pending.warnings.clone();
        warnings.extend(self.detector.apply(project, &pending));

        info!(
            schedule_id = %schedule.id,
            saved = saved.len(),
            archived = archived.len(),
            deleted = deleted.len(),
            conflicts = pending.matches.len(),
            warnings = warnings.len(),
            "Schedule saved"
        );

        let items = saved
            .into_iter()
            .enumerate()
            .map(|(index, item)| SavedItem {
                item,
                conflicts: pending
                    .for_candidate(index)
                    .unwrap_or_default()
                    .into_iter()
                    .map(ConflictMatch::summary)
                    .collect(),
            })
            .collect();

        Ok(SaveOutcome {
            schedule,
            items,
            archived_item_ids: archived,
            deleted_item_ids: deleted,
            warnings,
        })
    }

    /// Runs estimation for every input. Input problems land in `errors`;
    /// only infrastructure failures return early.
    fn plan_items(
        &self,
        items: &[ItemInput],
        now: DateTime<Utc>,
        errors: &mut ValidationErrors,
    ) -> Result<Vec<PlannedItem>> {
        let planned = self.db.with_conn(|conn| {
            let worker_ids: Vec<String> = items
                .iter()
                .flat_map(|i| i.assignees.iter().map(|a| a.worker_id.clone()))
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            let missing: HashSet<String> = project_repo::missing_workers(conn, &worker_ids)?
                .into_iter()
                .collect();

            let mut planned = Vec::with_capacity(items.len());
            for (index, input) in items.iter().enumerate() {
                for assignee in &input.assignees {
                    if missing.contains(&assignee.worker_id) {
                        errors.push(ValidationIssue::for_item(
                            &input.label(index),
                            IssueKind::UnknownWorker,
                            format!("unknown worker {}", assignee.worker_id),
                        ));
                    }
                }

                let request = EstimateRequest::new(
                    input.template_key.as_deref(),
                    input.quantity,
                    input.assignees.len(),
                )
                .with_assignments(&input.assignees)
                .starting_at(input.planned_start);

                match catalog::estimate_in(conn, &request, now)? {
                    Ok(estimate) => {
                        // Never fabricate an end for an item that has no start.
                        let computed_end = input.planned_start.and(estimate.planned_end);
                        planned.push(PlannedItem {
                            template_key: estimate
                                .template_key
                                .or_else(|| request.template_key.as_deref().map(normalize_key)),
                            estimated_hours: estimate.estimated_hours,
                            planned_end: input.planned_end.or(computed_end),
                            input: input.clone(),
                        });
                    }
                    Err(mut issue) => {
                        issue.item = Some(input.label(index));
                        errors.push(issue);
                    }
                }
            }
            Ok(planned)
        })?;
        Ok(planned)
    }

    /// Seeds a draft schedule with one item per line of the project's latest
    /// quote. Refuses to touch a schedule that is active or already has items.
    pub fn extract_from_quote(&self, caller: &Caller, project_id: &str) -> Result<SaveOutcome> {
        caller.ensure_identified()?;
        let _span = info_span!(
            "schedule.extract",
            project_id = %project_id,
            caller_id = %caller.id,
        )
        .entered();

        let project = self.load_project(project_id)?;

        let (quote, lines, existing) = self.db.with_conn(|conn| {
            let quote = quote_repo::find_latest_for_project(conn, project_id)?;
            let lines = match &quote {
                Some(q) => quote_repo::lines_for_quote(conn, &q.id)?,
                None => Vec::new(),
            };
            let existing = match schedule_repo::find_by_project(conn, project_id)? {
                Some(s) => {
                    let count = item_repo::list_for_schedule(conn, &s.id, false)?.len();
                    Some((s, count))
                }
                None => None,
            };
            Ok((quote, lines, existing))
        })?;

        let quote = quote.ok_or_else(|| SchedulingError::not_found("quote", project_id))?;

        if let Some((schedule, count)) = existing {
            if schedule.status == ScheduleStatus::Active || count > 0 {
                return Err(SchedulingError::ConflictPolicy(format!(
                    "project {} already has a {} schedule with {} item(s)",
                    project.label(),
                    schedule.status.as_str(),
                    count
                )));
            }
        }

        let items = lines
            .into_iter()
            .map(|line| ItemInput {
                id: None,
                title: line.title,
                description: line.description,
                unit: line.unit,
                quantity: line.quantity,
                template_key: line.template_key,
                planned_start: None,
                planned_end: None,
                assignees: Vec::new(),
            })
            .collect();

        let request = SaveScheduleRequest {
            note: Some(format!("Extracted from quote {}", quote.number)),
            items,
            status: ScheduleStatus::Draft,
        };
        self.save_for_project(caller, &project, request)
    }
}
