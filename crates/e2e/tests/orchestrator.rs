//! Orchestrator behavior with stub servers and suites

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::json;

use sitecheck_common::{IssueType, OverallStatus, ReportStore, Suite, SuiteResult};
use sitecheck_e2e::server::ServerConfig;
use sitecheck_e2e::{
    E2eError, E2eResult, Orchestrator, SiteServer, StaticSiteServer, SuiteContext, SuiteExecutor,
    SuiteOutput,
};

#[derive(Default)]
struct Counters {
    starts: AtomicUsize,
    stops: AtomicUsize,
}

struct StubServer {
    counters: Arc<Counters>,
    fail_start: bool,
}

#[async_trait]
impl SiteServer for StubServer {
    async fn start(&mut self) -> E2eResult<String> {
        self.counters.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(E2eError::ServerStartup("address in use".to_string()));
        }
        Ok("http://127.0.0.1:8000".to_string())
    }

    async fn stop(&mut self) -> E2eResult<()> {
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Shared call log so tests can see which suites ran and in what order
type CallLog = Arc<Mutex<Vec<Suite>>>;

enum Behavior {
    Return(SuiteOutput),
    Fail(&'static str),
    Panic(&'static str),
    /// Fail when this is the n-th call across all suites sharing `calls`
    FailOnCall(usize, Arc<AtomicUsize>, SuiteOutput),
}

struct StubSuite {
    suite: Suite,
    behavior: Behavior,
    log: CallLog,
}

impl StubSuite {
    fn boxed(suite: Suite, behavior: Behavior, log: &CallLog) -> Box<dyn SuiteExecutor> {
        Box::new(Self {
            suite,
            behavior,
            log: log.clone(),
        })
    }
}

#[async_trait]
impl SuiteExecutor for StubSuite {
    fn suite(&self) -> Suite {
        self.suite
    }

    async fn execute(&self, _ctx: &SuiteContext) -> E2eResult<SuiteOutput> {
        self.log.lock().unwrap().push(self.suite);
        match &self.behavior {
            Behavior::Return(output) => Ok(output.clone()),
            Behavior::Fail(message) => Err(E2eError::Playwright(message.to_string())),
            Behavior::Panic(message) => panic!("{}", message),
            Behavior::FailOnCall(n, calls, output) => {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if call == *n {
                    Err(E2eError::Timeout(format!("call {}", call)))
                } else {
                    Ok(output.clone())
                }
            }
        }
    }
}

fn stub_server(counters: &Arc<Counters>, fail_start: bool) -> Box<dyn SiteServer> {
    Box::new(StubServer {
        counters: counters.clone(),
        fail_start,
    })
}

fn output(result: SuiteResult) -> SuiteOutput {
    SuiteOutput::new(result)
}

fn report_files(dir: &std::path::Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => vec![],
    }
}

#[tokio::test]
async fn failing_second_suite_still_stops_server_once() {
    let reports = tempfile::tempdir().unwrap();
    let counters = Arc::new(Counters::default());
    let log = CallLog::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let suites = vec![
        StubSuite::boxed(
            Suite::FunctionalTests,
            Behavior::FailOnCall(
                2,
                calls.clone(),
                output(SuiteResult::new().with("page_loading", true).with("form_submission", false)),
            ),
            &log,
        ),
        StubSuite::boxed(
            Suite::BrowserTests,
            Behavior::FailOnCall(2, calls.clone(), output(SuiteResult::new().with("webkit", false))),
            &log,
        ),
        StubSuite::boxed(
            Suite::MobileTests,
            Behavior::FailOnCall(2, calls.clone(), output(SuiteResult::new().with("responsive", false))),
            &log,
        ),
    ];

    let mut orchestrator = Orchestrator::new(
        stub_server(&counters, false),
        suites,
        ReportStore::new(reports.path()),
    );
    let outcome = orchestrator.run().await.unwrap();

    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    assert_eq!(
        *log.lock().unwrap(),
        vec![Suite::FunctionalTests, Suite::BrowserTests, Suite::MobileTests]
    );

    // The browser suite failed, so only the first and third suites contribute issues
    let types: Vec<IssueType> = outcome.analysis.issues().iter().map(|i| i.issue_type()).collect();
    assert_eq!(types, vec![IssueType::Functional, IssueType::Responsive]);
    assert_eq!(outcome.analysis.overall_status(), OverallStatus::Fail);

    let report = std::fs::read_to_string(outcome.report_path.unwrap()).unwrap();
    assert!(report.contains("form_submission"));

    let ticket = std::fs::read_to_string(outcome.ticket_path.unwrap()).unwrap();
    assert!(ticket.contains("FUNCTIONAL problem"));
    assert!(!ticket.contains("RESPONSIVE"));
}

#[tokio::test]
async fn suite_error_and_panic_become_error_results() {
    let reports = tempfile::tempdir().unwrap();
    let counters = Arc::new(Counters::default());
    let log = CallLog::default();

    let suites = vec![
        StubSuite::boxed(Suite::AdminTests, Behavior::Fail("admin panel missing"), &log),
        StubSuite::boxed(Suite::Accessibility, Behavior::Panic("audit exploded"), &log),
        StubSuite::boxed(
            Suite::MobileTests,
            Behavior::Return(output(SuiteResult::new().with("responsive", true))),
            &log,
        ),
    ];

    let mut orchestrator = Orchestrator::new(
        stub_server(&counters, false),
        suites,
        ReportStore::new(reports.path()),
    );
    let outcome = orchestrator.run().await.unwrap();

    assert_eq!(log.lock().unwrap().len(), 3);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);

    // An errored accessibility suite is skipped rather than scored as 0
    assert!(outcome.analysis.issues().is_empty());
    assert_eq!(outcome.analysis.overall_status(), OverallStatus::Pass);
    assert!(outcome.ticket_path.is_none());

    let report = std::fs::read_to_string(outcome.report_path.unwrap()).unwrap();
    assert!(report.contains("No issues detected"));
}

#[tokio::test]
async fn server_start_failure_aborts_before_any_suite() {
    let reports = tempfile::tempdir().unwrap();
    let counters = Arc::new(Counters::default());
    let log = CallLog::default();

    let suites = vec![StubSuite::boxed(
        Suite::FunctionalTests,
        Behavior::Return(output(SuiteResult::new())),
        &log,
    )];

    let mut orchestrator = Orchestrator::new(
        stub_server(&counters, true),
        suites,
        ReportStore::new(reports.path().join("reports")),
    );
    let err = orchestrator.run().await.err().unwrap();

    assert!(matches!(err, E2eError::ServerStartup(_)));
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    assert!(report_files(&reports.path().join("reports")).is_empty());
}

#[tokio::test]
async fn companion_results_are_recorded_once() {
    let reports = tempfile::tempdir().unwrap();
    let counters = Arc::new(Counters::default());
    let log = CallLog::default();

    let functional = SuiteOutput::new(SuiteResult::new().with("page_loading", true))
        .with_companion(Suite::Performance, SuiteResult::new().with("loadTime", 4200));
    // A second suite trying to write `performance` again is ignored
    let mobile = SuiteOutput::new(SuiteResult::new().with("responsive", true))
        .with_companion(Suite::Performance, SuiteResult::new().with("loadTime", 10));

    let suites = vec![
        StubSuite::boxed(Suite::FunctionalTests, Behavior::Return(functional), &log),
        StubSuite::boxed(Suite::MobileTests, Behavior::Return(mobile), &log),
    ];

    let mut orchestrator = Orchestrator::new(
        stub_server(&counters, false),
        suites,
        ReportStore::new(reports.path()),
    );
    let outcome = orchestrator.run().await.unwrap();

    let issues = outcome.analysis.issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].issue_type(), IssueType::Performance);
    assert!(issues[0].message().contains("4200ms"));
    assert_eq!(outcome.analysis.overall_status(), OverallStatus::Warning);
    assert!(outcome.ticket_path.is_some());
}

#[tokio::test]
async fn unwritable_reports_dir_keeps_analysis() {
    let scratch = tempfile::tempdir().unwrap();
    let not_a_dir = scratch.path().join("reports");
    std::fs::write(&not_a_dir, "plain file").unwrap();

    let counters = Arc::new(Counters::default());
    let log = CallLog::default();
    let suites = vec![StubSuite::boxed(
        Suite::FunctionalTests,
        Behavior::Return(output(SuiteResult::new().with("form_submission", false))),
        &log,
    )];

    let mut orchestrator = Orchestrator::new(
        stub_server(&counters, false),
        suites,
        ReportStore::new(not_a_dir.clone()),
    );
    let outcome = orchestrator.run().await.unwrap();

    assert!(outcome.report_path.is_none());
    assert!(outcome.ticket_path.is_none());
    assert_eq!(outcome.analysis.overall_status(), OverallStatus::Fail);
    assert_eq!(outcome.analysis.issues()[0].issue_type(), IssueType::Functional);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
}

/// Suite whose name lookup panics, outside the per-suite isolation
struct UnnamedSuite;

#[async_trait]
impl SuiteExecutor for UnnamedSuite {
    fn suite(&self) -> Suite {
        panic!("suite has no name")
    }

    async fn execute(&self, _ctx: &SuiteContext) -> E2eResult<SuiteOutput> {
        Ok(SuiteResult::new().into())
    }
}

#[tokio::test]
async fn panic_outside_suites_stops_server_then_propagates() {
    let reports = tempfile::tempdir().unwrap();
    let counters = Arc::new(Counters::default());

    let mut orchestrator = Orchestrator::new(
        stub_server(&counters, false),
        vec![Box::new(UnnamedSuite)],
        ReportStore::new(reports.path()),
    );
    let result = AssertUnwindSafe(orchestrator.run()).catch_unwind().await;

    let panic = result.err().unwrap();
    assert_eq!(panic.downcast_ref::<&str>(), Some(&"suite has no name"));
    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
    assert!(report_files(reports.path()).is_empty());
}

/// Fetches the landing page over HTTP instead of driving a browser
struct HttpSuite;

#[async_trait]
impl SuiteExecutor for HttpSuite {
    fn suite(&self) -> Suite {
        Suite::FunctionalTests
    }

    async fn execute(&self, ctx: &SuiteContext) -> E2eResult<SuiteOutput> {
        let resp = reqwest::get(&ctx.base_url).await?;
        let ok = resp.status().is_success();
        let body = resp.text().await?;

        Ok(SuiteResult::new()
            .with("page_loading", ok)
            .with("title_check", body.contains("Saturday Run & Coffee Club"))
            .with("hero_element", body.contains("hero-title"))
            .into())
    }
}

#[tokio::test]
async fn runs_against_static_site_server() {
    let site = tempfile::tempdir().unwrap();
    std::fs::write(
        site.path().join("index.html"),
        "<html><head><title>Saturday Run & Coffee Club</title></head><body><h1 class=\"title\">Hi</h1></body></html>",
    )
    .unwrap();
    let reports = tempfile::tempdir().unwrap();

    let server = StaticSiteServer::new(ServerConfig {
        site_dir: site.path().to_path_buf(),
        port: 0,
        startup_timeout_secs: 5,
        ..Default::default()
    });

    let mut orchestrator = Orchestrator::new(
        Box::new(server),
        vec![Box::new(HttpSuite)],
        ReportStore::new(reports.path()),
    );
    let outcome = orchestrator.run().await.unwrap();

    let issues = outcome.analysis.issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].message(), "Functional checks failed: hero_element");
    assert_eq!(outcome.analysis.overall_status(), OverallStatus::Fail);

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["analysis"]["overall_status"], json!("FAIL"));
    assert_eq!(report_files(reports.path()).len(), 2);
}
