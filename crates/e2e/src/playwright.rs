//! Playwright browser automation
//!
//! Every check runs as a generated Node.js script. The script collects its
//! results in a `checks` object (plus optional `metrics`), records console
//! errors and uncaught page errors as it goes, and prints a single report
//! line prefixed with [`REPORT_MARKER`] when it finishes.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{debug, warn};

use sitecheck_common::SuiteResult;

use crate::error::{E2eError, E2eResult};

/// Prefix of the stdout line carrying the script report
pub const REPORT_MARKER: &str = "__SITECHECK_REPORT__";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub const ALL: [Browser; 3] = [Browser::Chromium, Browser::Firefox, Browser::Webkit];

    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl fmt::Display for Browser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Browser context a script runs in
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub browser: Browser,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Console,
    PageError,
}

/// Console error or uncaught exception observed while a script ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserEvent {
    pub kind: EventKind,
    pub text: String,
}

/// Report printed by a finished script
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptReport {
    #[serde(default)]
    pub checks: Map<String, Value>,
    #[serde(default)]
    pub metrics: Option<Map<String, Value>>,
    #[serde(default)]
    pub events: Vec<BrowserEvent>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScriptReport {
    /// Fold checks, captured events and any script error into a suite result
    pub fn into_suite_result(self) -> SuiteResult {
        let mut result = SuiteResult::from(self.checks);

        if !self.events.is_empty() {
            let texts: Vec<Value> = self
                .events
                .into_iter()
                .map(|e| Value::String(e.text))
                .collect();
            result.insert("console_errors", texts);
        }

        if let Some(error) = self.error {
            result.insert(sitecheck_common::ERROR_KEY, error);
        }

        result
    }
}

/// Runs generated Playwright scripts with Node.js
#[derive(Debug, Clone)]
pub struct PlaywrightDriver {
    config: PlaywrightConfig,
}

impl PlaywrightDriver {
    pub fn new(config: PlaywrightConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlaywrightConfig {
        &self.config
    }

    /// Desktop context in the given browser
    pub fn desktop(&self, browser: Browser) -> ContextOptions {
        ContextOptions {
            browser,
            viewport_width: self.config.viewport_width,
            viewport_height: self.config.viewport_height,
            user_agent: None,
        }
    }

    /// Check if Playwright is installed
    pub async fn check_installed(&self) -> E2eResult<()> {
        let status = Command::new(&self.config.node_binary)
            .args(["-e", "require.resolve('playwright')"])
            .current_dir(&self.config.working_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Build the full script around a body of checks
    pub fn build_script(&self, options: &ContextOptions, base_url: &str, body: &str) -> String {
        let user_agent = options
            .user_agent
            .as_deref()
            .map(|ua| format!(", userAgent: {}", js_string(ua)))
            .unwrap_or_default();

        format!(
            r#"const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const events = [];
  const checks = {{}};
  let metrics = null;
  let error = null;
  const browser = await {browser}.launch({{ headless: {headless} }});
  try {{
    const context = await browser.newContext({{
      viewport: {{ width: {width}, height: {height} }}{user_agent}
    }});
    const page = await context.newPage();
    page.on('console', msg => {{
      if (msg.type() === 'error') events.push({{ kind: 'console', text: msg.text() }});
    }});
    page.on('pageerror', err => events.push({{ kind: 'page_error', text: String(err) }}));
    const baseUrl = {base_url};

{body}
  }} catch (e) {{
    error = e.message;
  }} finally {{
    await browser.close();
  }}
  console.log({marker} + JSON.stringify({{ checks, metrics, events, error }}));
}})().catch(e => {{
  console.error(e && e.stack ? e.stack : String(e));
  process.exit(1);
}});
"#,
            browser = options.browser.as_str(),
            headless = self.config.headless,
            width = options.viewport_width,
            height = options.viewport_height,
            user_agent = user_agent,
            base_url = js_string(base_url),
            body = body,
            marker = js_string(REPORT_MARKER),
        )
    }

    /// Run a body of checks and return the script report
    pub async fn run(&self, options: &ContextOptions, base_url: &str, body: &str) -> E2eResult<ScriptReport> {
        let script = self.build_script(options, base_url, body);
        self.run_script(&script).await
    }

    /// Execute a full script via Node.js
    pub async fn run_script(&self, script: &str) -> E2eResult<ScriptReport> {
        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("check.js");
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let child = Command::new(&self.config.node_binary)
            .arg(&script_path)
            .current_dir(&self.config.working_dir)
            .env("NODE_PATH", self.config.working_dir.join("node_modules"))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => E2eError::PlaywrightNotFound,
                _ => E2eError::Io(e),
            })?;

        let limit = self.config.script_timeout();
        let output = tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| E2eError::Timeout(format!("Playwright script after {}s", limit.as_secs())))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(E2eError::Playwright(format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }

        if !stderr.trim().is_empty() {
            debug!("Playwright stderr: {}", stderr.trim());
        }

        let report = parse_report(&stdout)?;
        if let Some(error) = &report.error {
            warn!("Script reported an error: {}", error);
        }
        Ok(report)
    }
}

/// Find and decode the report line in script output
pub fn parse_report(stdout: &str) -> E2eResult<ScriptReport> {
    let line = stdout
        .lines()
        .rev()
        .find_map(|line| line.trim().strip_prefix(REPORT_MARKER))
        .ok_or_else(|| E2eError::ScriptOutput(truncate(stdout, 200)))?;

    Ok(serde_json::from_str(line)?)
}

/// Quote a string as a JavaScript literal
pub fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaywrightConfig {
    /// Node.js executable
    pub node_binary: PathBuf,

    /// Directory whose `node_modules` provides `playwright`
    pub working_dir: PathBuf,

    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Upper bound for a single script run
    pub script_timeout_secs: u64,
}

impl PlaywrightConfig {
    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            node_binary: PathBuf::from("node"),
            working_dir: PathBuf::from("."),
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            script_timeout_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn driver() -> PlaywrightDriver {
        PlaywrightDriver::new(PlaywrightConfig::default())
    }

    #[test]
    fn test_build_script_context() {
        let driver = driver();
        let options = ContextOptions {
            browser: Browser::Webkit,
            viewport_width: 375,
            viewport_height: 667,
            user_agent: Some("Mozilla/5.0 (iPhone)".to_string()),
        };

        let script = driver.build_script(&options, "http://127.0.0.1:8000", "    checks.ok = true;");

        assert!(script.contains("await webkit.launch({ headless: true })"));
        assert!(script.contains("viewport: { width: 375, height: 667 }, userAgent: \"Mozilla/5.0 (iPhone)\""));
        assert!(script.contains("const baseUrl = \"http://127.0.0.1:8000\";"));
        assert!(script.contains("    checks.ok = true;"));
        assert!(script.contains(&format!("console.log(\"{}\" + JSON.stringify", REPORT_MARKER)));
    }

    #[test]
    fn test_desktop_context_has_no_user_agent() {
        let driver = driver();
        let script = driver.build_script(&driver.desktop(Browser::Chromium), "http://x", "");
        assert!(script.contains("viewport: { width: 1280, height: 720 }\n"));
        assert!(!script.contains("userAgent"));
    }

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string("it's \"here\""), r#""it's \"here\"""#);
    }

    #[test]
    fn test_parse_report_finds_marker_line() {
        let stdout = format!(
            "noise\n{}{}\n",
            REPORT_MARKER,
            json!({
                "checks": { "page_loading": true },
                "metrics": { "loadTime": 120 },
                "events": [{ "kind": "page_error", "text": "boom" }],
                "error": null
            })
        );

        let report = parse_report(&stdout).unwrap();
        assert_eq!(report.checks["page_loading"], json!(true));
        assert_eq!(report.metrics.unwrap()["loadTime"], json!(120));
        assert_eq!(report.events[0].kind, EventKind::PageError);
        assert!(report.error.is_none());
    }

    #[test]
    fn test_parse_report_without_marker() {
        let err = parse_report("plain output").unwrap_err();
        assert!(matches!(err, E2eError::ScriptOutput(_)));
    }

    #[test]
    fn test_report_folds_events_and_error() {
        let mut checks = Map::new();
        checks.insert("hero_element".to_string(), json!(false));
        let report = ScriptReport {
            checks,
            metrics: None,
            events: vec![BrowserEvent {
                kind: EventKind::Console,
                text: "Failed to load resource".to_string(),
            }],
            error: Some("Timeout 5000ms exceeded".to_string()),
        };

        let result = report.into_suite_result();
        assert_eq!(result.get("hero_element"), Some(&json!(false)));
        assert_eq!(result.get("console_errors"), Some(&json!(["Failed to load resource"])));
        assert_eq!(result.error(), Some("Timeout 5000ms exceeded"));
    }

    #[test]
    fn test_browser_names() {
        let names: Vec<&str> = Browser::ALL.iter().map(Browser::as_str).collect();
        assert_eq!(names, vec!["chromium", "firefox", "webkit"]);
    }
}
