//! Request/response façade for the host's HTTP layer.
//!
//! Every handler returns an [`ApiResponse`] carrying the status code the
//! host should answer with, so error mapping lives in one place.

use log::error;
use serde::Serialize;

use crate::app::Crewplan;
use crate::caller::Caller;
use crate::error::{SchedulingError, ValidationIssue};
use crate::progress::{ProgressOutcome, ScheduleProgress, SubmitProgress};
use crate::schedule::{SaveOutcome, SaveScheduleRequest, ScheduleView};

/// Response wrapper for API calls.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ValidationIssue>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            status: 200,
            data: Some(data),
            error: None,
            issues: Vec::new(),
        }
    }

    pub fn err(status: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            data: None,
            error: Some(message.into()),
            issues: Vec::new(),
        }
    }

    pub fn from_result(result: Result<T, SchedulingError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::from_error(e),
        }
    }

    pub fn from_error(err: SchedulingError) -> Self {
        let status = status_code(&err);
        if status >= 500 {
            error!("Request failed: {}", err);
        }
        let issues = match &err {
            SchedulingError::Validation(errors) => errors.issues().to_vec(),
            _ => Vec::new(),
        };
        Self {
            issues,
            ..Self::err(status, err.to_string())
        }
    }
}

/// HTTP status for an error.
pub fn status_code(err: &SchedulingError) -> u16 {
    match err {
        SchedulingError::Validation(_) => 400,
        SchedulingError::Unauthenticated => 401,
        SchedulingError::NotFound { .. } => 404,
        SchedulingError::ConflictPolicy(_) => 409,
        SchedulingError::Database(_) => 500,
    }
}

pub fn get_schedule(app: &Crewplan, caller: &Caller, project_id: &str) -> ApiResponse<ScheduleView> {
    ApiResponse::from_result(app.schedules.get(caller, project_id))
}

/// Saves or activates a schedule from a `{note, items, status}` body.
pub fn save_schedule(
    app: &Crewplan,
    caller: &Caller,
    project_id: &str,
    request: SaveScheduleRequest,
) -> ApiResponse<SaveOutcome> {
    ApiResponse::from_result(app.schedules.save(caller, project_id, request))
}

pub fn extract_schedule(app: &Crewplan, caller: &Caller, project_id: &str) -> ApiResponse<SaveOutcome> {
    ApiResponse::from_result(app.schedules.extract_from_quote(caller, project_id))
}

pub fn submit_progress(
    app: &Crewplan,
    caller: &Caller,
    input: SubmitProgress,
) -> ApiResponse<ProgressOutcome> {
    ApiResponse::from_result(app.progress.submit(caller, input))
}

pub fn get_schedule_progress(
    app: &Crewplan,
    caller: &Caller,
    project_id: &str,
) -> ApiResponse<ScheduleProgress> {
    ApiResponse::from_result(app.progress.schedule_progress(caller, project_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caller::CallerRole;
    use crate::config::Config;
    use crate::db::DatabaseError;
    use crate::error::{IssueKind, ValidationErrors};

    #[test]
    fn test_status_codes() {
        let cases: Vec<(SchedulingError, u16)> = vec![
            (ValidationIssue::new(IssueKind::InvalidPercent, "bad").into(), 400),
            (SchedulingError::Unauthenticated, 401),
            (SchedulingError::not_found("project", "p1"), 404),
            (SchedulingError::ConflictPolicy("exists".to_string()), 409),
            (DatabaseError::LockPoisoned.into(), 500),
        ];
        for (err, expected) in cases {
            assert_eq!(status_code(&err), expected, "{}", err);
        }
    }

    #[test]
    fn test_validation_response_carries_issues() {
        let errors = ValidationErrors(vec![
            ValidationIssue::for_item("Dig", IssueKind::MissingAssignees, "no workers assigned"),
            ValidationIssue::for_item("Dig", IssueKind::MissingStartDate, "no planned start date"),
        ]);
        let response: ApiResponse<()> = ApiResponse::from_error(SchedulingError::Validation(errors));
        assert!(!response.success);
        assert_eq!(response.status, 400);
        assert_eq!(response.issues.len(), 2);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["issues"][0]["kind"], "missing_assignees");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_handlers_map_caller_and_lookup_errors() {
        let app = Crewplan::in_memory(&Config::default()).unwrap();

        let anonymous = Caller::new("", CallerRole::Manager);
        assert_eq!(get_schedule(&app, &anonymous, "p1").status, 401);

        let manager = Caller::new("u1", CallerRole::Manager);
        assert_eq!(get_schedule(&app, &manager, "p1").status, 404);
        assert_eq!(extract_schedule(&app, &manager, "p1").status, 404);
    }
}
