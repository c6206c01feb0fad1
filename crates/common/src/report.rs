//! Markdown rendering of an analysis
//!
//! [`render`] produces the full run report; [`draft_ticket`] produces a bug
//! ticket body covering only the HIGH severity issues.

use std::fmt::Write;

use crate::types::{Analysis, Issue};

/// Line emitted in place of the issue list when nothing was found
pub const NO_ISSUES_MARKER: &str = "✅ No issues detected!";

/// Ticket body returned when there is no HIGH severity issue
pub const NO_CRITICAL_ISSUES: &str = "🎉 No critical issues found!";

const SUGGESTIONS: &str = "\
## 💡 Recommended Improvements

### 🚀 Performance
- Serve images in WebP format
- Minify and bundle CSS/JS files
- Use browser caching

### 🎯 User Experience
- Add a loading spinner
- Improve error messages
- Support keyboard navigation

### 🔒 Security
- Configure a Content Security Policy (CSP)
- Enforce HTTPS
- Strengthen input validation

### 📱 Mobile
- Touch-friendly button sizes
- Swipe gesture support
- Offline support
";

const NEXT_STEPS: &str = "\
## 🎯 Next Steps
1. Fix the highest priority issues first
2. Set up an automated CI/CD pipeline
3. Schedule regular performance monitoring
4. Build a user feedback channel
";

const TICKET_PRIORITIES: &str = "\
## 🔧 Fix Priority
1. Functional problems (FUNCTIONAL) - fix immediately
2. Performance problems (PERFORMANCE) - fix within 1 week
3. Compatibility problems (COMPATIBILITY) - fix within 2 weeks
";

const TICKET_ENVIRONMENT: &str = "\
## 📝 Environment
- Test harness: Playwright E2E
- Browsers: Chromium, Firefox, WebKit
- Devices: desktop, mobile
";

/// Render the full report for an analysis
pub fn render(analysis: &Analysis) -> String {
    let status = analysis.overall_status();
    let mut out = String::new();

    out.push_str("# 🔍 Site Test Analysis Report\n");
    let _ = writeln!(out, "**Generated**: {}", analysis.timestamp().to_rfc3339());
    let _ = writeln!(out, "**Overall status**: {status}");
    out.push('\n');

    out.push_str("## 📊 Summary\n");
    let _ = writeln!(out, "- Issues detected: {}", analysis.issues().len());
    let _ = writeln!(out, "- Overall status: {}", status.label());
    if !analysis.errored_suites().is_empty() {
        let names: Vec<&str> = analysis.errored_suites().iter().map(|s| s.as_str()).collect();
        let _ = writeln!(out, "- Suites that did not complete: {}", names.join(", "));
    }
    out.push('\n');

    out.push_str("## 🚨 Detected Issues\n");
    if analysis.issues().is_empty() {
        out.push_str(NO_ISSUES_MARKER);
        out.push('\n');
    } else {
        for (i, issue) in analysis.issues().iter().enumerate() {
            out.push_str(&render_issue(i + 1, issue));
        }
    }

    out.push('\n');
    out.push_str(SUGGESTIONS);
    out.push('\n');
    out.push_str(NEXT_STEPS);
    out.push_str("\n---\n*Generated automatically by sitecheck*\n");
    out
}

fn render_issue(index: usize, issue: &Issue) -> String {
    format!(
        "\n### {}. {} {}\n**Severity**: {}\n**Problem**: {}\n**Recommendation**: {}\n",
        index,
        issue.issue_type(),
        issue.severity().marker(),
        issue.severity(),
        issue.message(),
        issue.recommendation(),
    )
}

/// Draft a bug ticket from the HIGH severity issues of an analysis
pub fn draft_ticket(analysis: &Analysis) -> String {
    let high: Vec<&Issue> = analysis.high_severity_issues().collect();
    if high.is_empty() {
        return NO_CRITICAL_ISSUES.to_string();
    }

    let mut out = String::new();
    out.push_str("# 🐛 Automatically Detected Site Issues\n\n");
    let _ = writeln!(out, "**Detected at**: {}", analysis.timestamp().to_rfc3339());
    out.push_str("**Severity**: HIGH\n");
    out.push_str("**Impact**: user experience\n\n");

    out.push_str("## 📋 Issues\n");
    for (i, issue) in high.iter().enumerate() {
        let _ = write!(
            out,
            "\n### {}. {} problem\n- **Description**: {}\n- **Suggested fix**: {}\n",
            i + 1,
            issue.issue_type(),
            issue.message(),
            issue.recommendation(),
        );
    }

    out.push('\n');
    out.push_str(TICKET_PRIORITIES);
    out.push('\n');
    out.push_str(TICKET_ENVIRONMENT);
    out.push_str("\n---\n*sitecheck automatic issue detection*\n");
    out
}
