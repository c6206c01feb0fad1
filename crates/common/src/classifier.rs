//! Issue classification
//!
//! Turns the aggregate of one run into an [`Analysis`]. Rules are evaluated
//! in a fixed order (performance, compatibility, accessibility, functional,
//! responsive) so the issue list never depends on which suites ran or how
//! the aggregate happens to be iterated.
//!
//! Only two rules move the overall status: a slow page escalates to
//! WARNING, a failed functional check escalates to FAIL. The MEDIUM rules
//! add issues without touching the status.

use chrono::{DateTime, Utc};
use serde_json::{Number, Value};
use tracing::warn;

use crate::types::{
    AggregateResult, Analysis, Issue, IssueType, OverallStatus, Severity, Suite, SuiteResult,
    ERROR_KEY,
};

/// Page load time above which a PERFORMANCE issue is raised (exclusive)
pub const LOAD_TIME_LIMIT_MS: f64 = 3000.0;

/// Accessibility score below which an ACCESSIBILITY issue is raised
pub const ACCESSIBILITY_MIN_SCORE: f64 = 80.0;

/// Classify an aggregate, stamping the analysis with the current time
pub fn classify(aggregate: &AggregateResult) -> Analysis {
    classify_at(aggregate, Utc::now())
}

/// Classify an aggregate with an explicit timestamp
pub fn classify_at(aggregate: &AggregateResult, timestamp: DateTime<Utc>) -> Analysis {
    let mut draft = Draft::default();

    check_performance(aggregate, &mut draft);
    check_compatibility(aggregate, &mut draft);
    check_accessibility(aggregate, &mut draft);
    check_functional(aggregate, &mut draft);
    check_responsive(aggregate, &mut draft);

    let errored = aggregate
        .iter()
        .filter(|(_, result)| result.has_error())
        .map(|(suite, _)| *suite)
        .collect();

    Analysis::new(timestamp, draft.status, draft.issues).with_errored_suites(errored)
}

#[derive(Default)]
struct Draft {
    status: OverallStatus,
    issues: Vec<Issue>,
}

impl Draft {
    fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }
}

/// Suite result for a rule that requires a clean (non-error) result
fn clean_suite(aggregate: &AggregateResult, suite: Suite) -> Option<&SuiteResult> {
    aggregate.get(suite).filter(|result| !result.has_error())
}

/// Read a numeric field, substituting `default` when it is absent
///
/// Returns `None` when the field is present but not a number.
fn number_field(result: &SuiteResult, suite: Suite, key: &str, default: u64) -> Option<Number> {
    match result.get(key) {
        None => Some(Number::from(default)),
        Some(Value::Number(n)) => Some(n.clone()),
        Some(other) => {
            warn!(suite = %suite, field = key, value = %other, "Skipping rule: field is not a number");
            None
        }
    }
}

/// Names of entries whose value is literally `false`
fn failed_checks(result: &SuiteResult) -> Vec<&str> {
    result
        .iter()
        .filter(|(key, value)| key.as_str() != ERROR_KEY && **value == Value::Bool(false))
        .map(|(key, _)| key.as_str())
        .collect()
}

fn check_performance(aggregate: &AggregateResult, draft: &mut Draft) {
    let Some(perf) = clean_suite(aggregate, Suite::Performance) else {
        return;
    };
    let Some(load_time) = number_field(perf, Suite::Performance, "loadTime", 0) else {
        return;
    };

    if load_time.as_f64().unwrap_or(0.0) > LOAD_TIME_LIMIT_MS {
        draft.push(Issue::new(
            IssueType::Performance,
            Severity::High,
            format!("Page load time is {load_time}ms, which is too slow (recommended: <3000ms)"),
            "Optimize images, minify and bundle CSS/JS, and consider serving assets from a CDN",
        ));
        draft.status.escalate(OverallStatus::Warning);
    }
}

fn check_compatibility(aggregate: &AggregateResult, draft: &mut Draft) {
    let Some(browsers) = clean_suite(aggregate, Suite::BrowserTests) else {
        return;
    };

    let failed = failed_checks(browsers);
    if !failed.is_empty() {
        draft.push(Issue::new(
            IssueType::Compatibility,
            Severity::Medium,
            format!("Tests failed in the following browsers: {}", failed.join(", ")),
            "Check browser-specific CSS prefixes and JavaScript polyfills",
        ));
    }
}

fn check_accessibility(aggregate: &AggregateResult, draft: &mut Draft) {
    let Some(a11y) = clean_suite(aggregate, Suite::Accessibility) else {
        return;
    };
    let Some(score) = number_field(a11y, Suite::Accessibility, "score", 0) else {
        return;
    };

    if score.as_f64().unwrap_or(0.0) < ACCESSIBILITY_MIN_SCORE {
        draft.push(Issue::new(
            IssueType::Accessibility,
            Severity::Medium,
            format!("Accessibility score is {score}, which is too low (recommended: >80)"),
            "Improve alt attributes, ARIA labels, and keyboard navigation",
        ));
    }
}

// A functional suite that reported an error may still carry the checks it
// finished before failing, so this rule scans it regardless.
fn check_functional(aggregate: &AggregateResult, draft: &mut Draft) {
    let Some(functional) = aggregate.get(Suite::FunctionalTests) else {
        return;
    };

    let failed = failed_checks(functional);
    if !failed.is_empty() {
        draft.push(Issue::new(
            IssueType::Functional,
            Severity::High,
            format!("Functional checks failed: {}", failed.join(", ")),
            "Check the JavaScript console for errors and review the form validation logic",
        ));
        draft.status.escalate(OverallStatus::Fail);
    }
}

fn check_responsive(aggregate: &AggregateResult, draft: &mut Draft) {
    let Some(mobile) = clean_suite(aggregate, Suite::MobileTests) else {
        return;
    };

    let responsive = match mobile.get("responsive") {
        None => true,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            warn!(suite = %Suite::MobileTests, value = %other, "Skipping rule: responsive is not a boolean");
            return;
        }
    };

    if !responsive {
        draft.push(Issue::new(
            IssueType::Responsive,
            Severity::Medium,
            "The mobile responsive layout is broken",
            "Check CSS media queries and flexbox/grid layouts",
        ));
    }
}
