//! Estimation engine: labor-hours and planned duration from a productivity
//! template, a quantity and the size of the crew.
//!
//! Pure computation. Template lookup happens in [`crate::catalog`]; this
//! module only sees the resolved template (or its absence).

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::{IssueKind, ValidationIssue};
use crate::model::{Assignment, TaskTemplate};

/// One standard workday per assigned worker.
pub const HOURS_PER_DAY: f64 = 8.0;

/// Estimate used when no template applies.
pub const DEFAULT_ESTIMATE_HOURS: f64 = 8.0;

/// Steps per hour kept when turning hours into days.
const HOUR_PRECISION: f64 = 1e9;

/// Inputs for a single estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateRequest {
    pub template_key: Option<String>,
    pub quantity: Option<f64>,
    /// Labor-hours the crew delivers per calendar day.
    pub daily_capacity: f64,
    pub start: Option<DateTime<Utc>>,
}

impl EstimateRequest {
    /// A crew of `assignee_count` full-day workers (zero counts as one).
    pub fn new(template_key: Option<&str>, quantity: Option<f64>, assignee_count: usize) -> Self {
        Self {
            template_key: template_key
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string),
            quantity,
            daily_capacity: assignee_count.max(1) as f64 * HOURS_PER_DAY,
            start: None,
        }
    }

    /// Sizes the crew from explicit assignments. Only the head count
    /// matters; `hours_per_day` is stored with the assignment but every
    /// worker counts as one standard workday.
    pub fn with_assignments(mut self, assignments: &[Assignment]) -> Self {
        self.daily_capacity = daily_capacity(assignments);
        self
    }

    pub fn starting_at(mut self, start: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self
    }
}

/// One standard workday per assignee; an empty crew counts as one worker.
pub fn daily_capacity(assignments: &[Assignment]) -> f64 {
    assignments.len().max(1) as f64 * HOURS_PER_DAY
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub estimated_hours: f64,
    /// Calendar days needed; `None` when no template resolved.
    pub duration_days: Option<u32>,
    /// `start + duration_days`; set if and only if a template resolved.
    pub planned_end: Option<DateTime<Utc>>,
    /// Canonical key of the resolved template.
    pub template_key: Option<String>,
}

impl Estimate {
    pub fn fallback() -> Self {
        Self {
            estimated_hours: DEFAULT_ESTIMATE_HOURS,
            duration_days: None,
            planned_end: None,
            template_key: None,
        }
    }
}

/// Checks the quantity of a request that carries a template key.
///
/// A supplied quantity must be a positive finite number. A missing one is
/// only an error once the key resolved to a template; an unknown key falls
/// back to the default estimate instead.
pub fn validate_request(
    request: &EstimateRequest,
    template: Option<&TaskTemplate>,
) -> Result<(), ValidationIssue> {
    if request.template_key.is_none() {
        return Ok(());
    }
    match request.quantity {
        None if template.is_some() => Err(ValidationIssue::new(
            IssueKind::MissingQuantity,
            "quantity is required when a template is set",
        )),
        Some(q) if !q.is_finite() || q <= 0.0 => Err(ValidationIssue::new(
            IssueKind::InvalidQuantity,
            format!("quantity must be a positive number, got {}", q),
        )),
        _ => Ok(()),
    }
}

/// Computes the estimate for an already-resolved template.
///
/// `now` stands in for a missing start date.
pub fn estimate(
    request: &EstimateRequest,
    template: Option<&TaskTemplate>,
    now: DateTime<Utc>,
) -> Result<Estimate, ValidationIssue> {
    validate_request(request, template)?;

    let (template, quantity) = match (template, request.quantity) {
        (Some(t), Some(q)) if request.template_key.is_some() => (t, q),
        _ => return Ok(Estimate::fallback()),
    };

    let estimated_hours = (quantity * template.hours_per_unit * template.complexity_factor).max(0.0);
    let days = duration_days(estimated_hours, request.daily_capacity);
    let start = request.start.unwrap_or(now);

    Ok(Estimate {
        estimated_hours,
        duration_days: Some(days),
        planned_end: Some(start + Duration::days(i64::from(days))),
        template_key: Some(template.key.clone()),
    })
}

/// `ceil(hours / capacity)`; partial days always consume a full day.
pub fn duration_days(estimated_hours: f64, daily_capacity: f64) -> u32 {
    let capacity = if daily_capacity > 0.0 {
        daily_capacity
    } else {
        HOURS_PER_DAY
    };
    if !estimated_hours.is_finite() || estimated_hours <= 0.0 {
        return 0;
    }
    // Hours are rounded to a nanohour first so that product noise
    // (16.000000000000004 h on a 16 h crew) never costs a day.
    let scaled = estimated_hours * HOUR_PRECISION;
    let hours = if scaled.is_finite() {
        scaled.round() / HOUR_PRECISION
    } else {
        estimated_hours
    };
    (hours / capacity).ceil().clamp(1.0, u32::MAX as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn template(key: &str, hours_per_unit: f64, complexity_factor: f64) -> TaskTemplate {
        TaskTemplate {
            key: key.to_string(),
            label: key.to_lowercase(),
            hours_per_unit,
            complexity_factor,
            unit_label: "unit".to_string(),
            aliases: Vec::new(),
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 7, 0, 0).unwrap()
    }

    struct EstimateCase {
        name: &'static str,
        hours_per_unit: f64,
        complexity_factor: f64,
        quantity: f64,
        assignees: usize,
        expected_hours: f64,
        expected_days: u32,
    }

    const CASES: &[EstimateCase] = &[
        EstimateCase {
            name: "excavation_single_worker",
            hours_per_unit: 1.6,
            complexity_factor: 1.0,
            quantity: 50.0,
            assignees: 1,
            expected_hours: 80.0,
            expected_days: 10,
        },
        EstimateCase {
            name: "brickwork_two_workers",
            hours_per_unit: 0.08,
            complexity_factor: 1.0,
            quantity: 200.0,
            assignees: 2,
            expected_hours: 16.0,
            expected_days: 1,
        },
        EstimateCase {
            name: "partial_day_rounds_up",
            hours_per_unit: 1.0,
            complexity_factor: 1.0,
            quantity: 9.0,
            assignees: 1,
            expected_hours: 9.0,
            expected_days: 2,
        },
        EstimateCase {
            name: "complexity_multiplies",
            hours_per_unit: 2.0,
            complexity_factor: 1.5,
            quantity: 4.0,
            assignees: 3,
            expected_hours: 12.0,
            expected_days: 1,
        },
        EstimateCase {
            name: "zero_assignees_count_as_one",
            hours_per_unit: 1.0,
            complexity_factor: 1.0,
            quantity: 16.0,
            assignees: 0,
            expected_hours: 16.0,
            expected_days: 2,
        },
        EstimateCase {
            name: "tiny_job_takes_a_day",
            hours_per_unit: 0.01,
            complexity_factor: 1.0,
            quantity: 1.0,
            assignees: 5,
            expected_hours: 0.01,
            expected_days: 1,
        },
    ];

    #[test]
    fn test_estimate_cases() {
        for case in CASES {
            let t = template("T", case.hours_per_unit, case.complexity_factor);
            let request =
                EstimateRequest::new(Some("T"), Some(case.quantity), case.assignees).starting_at(Some(start()));
            let result = estimate(&request, Some(&t), start()).unwrap();

            assert!(
                (result.estimated_hours - case.expected_hours).abs() < 1e-9,
                "Test '{}': expected {} hours, got {}",
                case.name,
                case.expected_hours,
                result.estimated_hours
            );
            assert_eq!(
                result.duration_days,
                Some(case.expected_days),
                "Test '{}': wrong duration",
                case.name
            );
            assert_eq!(
                result.planned_end,
                Some(start() + Duration::days(case.expected_days as i64)),
                "Test '{}': wrong planned end",
                case.name
            );
        }
    }

    #[test]
    fn test_missing_template_key_falls_back() {
        let request = EstimateRequest::new(None, None, 2);
        let result = estimate(&request, None, start()).unwrap();
        assert_eq!(result, Estimate::fallback());
        assert_eq!(result.estimated_hours, 8.0);
        assert!(result.planned_end.is_none());
    }

    #[test]
    fn test_unknown_template_falls_back() {
        let request = EstimateRequest::new(Some("ROOFING"), Some(10.0), 1);
        let result = estimate(&request, None, start()).unwrap();
        assert_eq!(result.estimated_hours, DEFAULT_ESTIMATE_HOURS);
        assert!(result.duration_days.is_none());
    }

    #[test]
    fn test_blank_key_is_no_key() {
        let request = EstimateRequest::new(Some("   "), None, 1);
        assert!(request.template_key.is_none());
        assert!(estimate(&request, None, start()).is_ok());
    }

    #[test]
    fn test_invalid_quantities_rejected_with_template() {
        let t = template("T", 1.0, 1.0);
        for quantity in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let request = EstimateRequest::new(Some("T"), Some(quantity), 1);
            let err = estimate(&request, Some(&t), start()).unwrap_err();
            assert_eq!(err.kind, IssueKind::InvalidQuantity, "quantity {}", quantity);
        }
        let err = estimate(&EstimateRequest::new(Some("T"), None, 1), Some(&t), start()).unwrap_err();
        assert_eq!(err.kind, IssueKind::MissingQuantity);
    }

    #[test]
    fn test_missing_start_uses_now() {
        let t = template("T", 1.0, 1.0);
        let now = Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap();
        let request = EstimateRequest::new(Some("T"), Some(8.0), 1);
        let result = estimate(&request, Some(&t), now).unwrap();
        assert_eq!(result.planned_end, Some(now + Duration::days(1)));
    }

    #[test]
    fn test_capacity_counts_heads_not_hours() {
        let crew = vec![
            Assignment::new("w1"),
            Assignment {
                worker_id: "w2".to_string(),
                hours_per_day: Some(4.0),
            },
        ];
        assert_eq!(daily_capacity(&crew), 16.0);
        assert_eq!(daily_capacity(&[]), HOURS_PER_DAY);

        let t = template("T", 1.0, 1.0);
        let request = EstimateRequest::new(Some("T"), Some(24.0), 2).with_assignments(&crew);
        assert_eq!(estimate(&request, Some(&t), start()).unwrap().duration_days, Some(2));
    }

    #[test]
    fn test_duration_never_divides_by_zero() {
        assert_eq!(duration_days(16.0, 0.0), 2);
        assert_eq!(duration_days(0.0, 8.0), 0);
        assert_eq!(duration_days(16.000000000000004, 16.0), 1);
        assert_eq!(duration_days(1e-9, 8.0), 1);
        assert_eq!(duration_days(1e-12, 8.0), 1);
        assert_eq!(duration_days(8.000000004, 8.0), 2);
        assert_eq!(duration_days(f64::NAN, 8.0), 0);
    }

    #[test]
    fn test_unknown_template_without_quantity_falls_back() {
        let request = EstimateRequest::new(Some("ROOFING"), None, 1);
        assert_eq!(estimate(&request, None, start()).unwrap(), Estimate::fallback());

        let request = EstimateRequest::new(Some("ROOFING"), Some(-1.0), 1);
        let err = estimate(&request, None, start()).unwrap_err();
        assert_eq!(err.kind, IssueKind::InvalidQuantity);
    }
}
