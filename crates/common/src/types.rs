//! Core types for sitecheck

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// Suites
// ============================================================================

/// A named category of checks; each suite owns exactly one aggregate entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suite {
    Performance,
    FunctionalTests,
    BrowserTests,
    Accessibility,
    MobileTests,
    AdminTests,
}

impl Suite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Suite::Performance => "performance",
            Suite::FunctionalTests => "functional_tests",
            Suite::BrowserTests => "browser_tests",
            Suite::Accessibility => "accessibility",
            Suite::MobileTests => "mobile_tests",
            Suite::AdminTests => "admin_tests",
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key under which a failed suite records its failure message
pub const ERROR_KEY: &str = "error";

/// Raw outcome of one suite: check/metric name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SuiteResult(Map<String, Value>);

impl SuiteResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result of a suite that could not complete
    pub fn from_error(message: impl Into<String>) -> Self {
        let mut map = Map::new();
        map.insert(ERROR_KEY.to_string(), Value::String(message.into()));
        Self(map)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The recorded failure message, if this suite failed
    pub fn error(&self) -> Option<&str> {
        self.0.get(ERROR_KEY).and_then(Value::as_str)
    }

    pub fn has_error(&self) -> bool {
        self.0.contains_key(ERROR_KEY)
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for SuiteResult {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// All suite results of one run
///
/// Every suite key is written at most once; a second write for the same
/// suite is rejected and the first result is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateResult(BTreeMap<Suite, SuiteResult>);

impl AggregateResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result of a suite
    pub fn record(&mut self, suite: Suite, result: SuiteResult) -> Result<()> {
        if self.0.contains_key(&suite) {
            return Err(Error::DuplicateSuite(suite));
        }
        self.0.insert(suite, result);
        Ok(())
    }

    pub fn get(&self, suite: Suite) -> Option<&SuiteResult> {
        self.0.get(&suite)
    }

    pub fn contains(&self, suite: Suite) -> bool {
        self.0.contains_key(&suite)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Suite, &SuiteResult)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Issues
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    Performance,
    Compatibility,
    Accessibility,
    Functional,
    Responsive,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Performance => "PERFORMANCE",
            IssueType::Compatibility => "COMPATIBILITY",
            IssueType::Accessibility => "ACCESSIBILITY",
            IssueType::Functional => "FUNCTIONAL",
            IssueType::Responsive => "RESPONSIVE",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }

    /// Marker shown next to an issue heading in reports
    pub fn marker(&self) -> &'static str {
        match self {
            Severity::High => "🔴",
            Severity::Medium => "🟡",
            Severity::Low => "🟢",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified problem found in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    issue_type: IssueType,
    severity: Severity,
    message: String,
    recommendation: String,
}

impl Issue {
    pub fn new(
        issue_type: IssueType,
        severity: Severity,
        message: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            issue_type,
            severity,
            message: message.into(),
            recommendation: recommendation.into(),
        }
    }

    pub fn issue_type(&self) -> IssueType {
        self.issue_type
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn recommendation(&self) -> &str {
        &self.recommendation
    }
}

// ============================================================================
// Analysis
// ============================================================================

/// Overall verdict of a run, ordered from best to worst
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    #[default]
    Pass,
    Warning,
    Fail,
}

impl OverallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Pass => "PASS",
            OverallStatus::Warning => "WARNING",
            OverallStatus::Fail => "FAIL",
        }
    }

    /// Human label used in report summaries
    pub fn label(&self) -> &'static str {
        match self {
            OverallStatus::Pass => "✅ Healthy",
            OverallStatus::Warning => "⚠️ Needs attention",
            OverallStatus::Fail => "❌ Problems found",
        }
    }

    /// Raise the status to `to` unless it is already worse
    pub fn escalate(&mut self, to: OverallStatus) {
        if to > *self {
            *self = to;
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification output: overall status plus issues in rule order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    timestamp: DateTime<Utc>,
    overall_status: OverallStatus,
    issues: Vec<Issue>,

    /// Suites whose result carries an `error` instead of checks
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    errored_suites: Vec<Suite>,
}

impl Analysis {
    pub fn new(timestamp: DateTime<Utc>, overall_status: OverallStatus, issues: Vec<Issue>) -> Self {
        Self {
            timestamp,
            overall_status,
            issues,
            errored_suites: Vec::new(),
        }
    }

    pub fn with_errored_suites(mut self, suites: Vec<Suite>) -> Self {
        self.errored_suites = suites;
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn overall_status(&self) -> OverallStatus {
        self.overall_status
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn errored_suites(&self) -> &[Suite] {
        &self.errored_suites
    }

    /// HIGH severity issues in their original order
    pub fn high_severity_issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::High)
    }

    pub fn has_high_severity(&self) -> bool {
        self.high_severity_issues().next().is_some()
    }
}
