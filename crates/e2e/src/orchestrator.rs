//! Test orchestrator: server lifecycle, suite sequencing and reporting
//!
//! A run starts the site server, executes every suite in order, classifies
//! the aggregate, renders the report and saves it. The server is stopped on
//! every path out of a run, including panics inside a suite or inside
//! classification and rendering.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use serde::Serialize;
use tracing::{error, info, warn};

use sitecheck_common::{
    classify, draft_ticket, render, AggregateResult, Analysis, ReportStore, Suite, SuiteResult,
};

use crate::config::SitecheckConfig;
use crate::error::E2eResult;
use crate::playwright::PlaywrightDriver;
use crate::server::{SiteServer, StaticSiteServer};
use crate::suites::{default_suites, SuiteContext, SuiteExecutor, SuiteOutput};

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub analysis: Analysis,

    /// Saved report, unless writing it failed
    pub report_path: Option<PathBuf>,

    /// Saved ticket draft, only when HIGH severity issues exist
    pub ticket_path: Option<PathBuf>,
}

pub struct Orchestrator {
    server: Box<dyn SiteServer>,
    suites: Vec<Box<dyn SuiteExecutor>>,
    store: ReportStore,
}

impl Orchestrator {
    pub fn new(
        server: Box<dyn SiteServer>,
        suites: Vec<Box<dyn SuiteExecutor>>,
        store: ReportStore,
    ) -> Self {
        Self {
            server,
            suites,
            store,
        }
    }

    /// Orchestrator with the static site server and the full suite list
    pub fn from_config(config: SitecheckConfig) -> Self {
        let driver = Arc::new(PlaywrightDriver::new(config.playwright));
        let suites = default_suites(driver, Arc::new(config.site), &config.suites);

        Self::new(
            Box::new(StaticSiteServer::new(config.server)),
            suites,
            ReportStore::new(config.reports.dir),
        )
    }

    /// Run every suite and produce the analysis
    ///
    /// Only a server that fails to start is an error; suite failures end up
    /// in the report.
    pub async fn run(&mut self) -> E2eResult<RunOutcome> {
        info!("Starting site test run ({} suites)", self.suites.len());

        let base_url = match self.server.start().await {
            Ok(url) => url,
            Err(e) => {
                error!("Server failed to start, aborting run: {}", e);
                if let Err(stop_err) = self.server.stop().await {
                    warn!("Failed to clean up server: {}", stop_err);
                }
                return Err(e);
            }
        };

        let body = AssertUnwindSafe(self.execute(&base_url)).catch_unwind().await;

        if let Err(e) = self.server.stop().await {
            warn!("Failed to stop server: {}", e);
        }

        match body {
            Ok(outcome) => Ok(outcome),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn execute(&self, base_url: &str) -> RunOutcome {
        let ctx = SuiteContext::new(base_url);
        let mut aggregate = AggregateResult::new();

        for executor in &self.suites {
            let output = run_suite(executor.as_ref(), &ctx).await;
            record(&mut aggregate, executor.suite(), output.result);
            for (suite, result) in output.companions {
                record(&mut aggregate, suite, result);
            }
        }

        let analysis = classify(&aggregate);
        log_summary(&analysis);

        let report_path = match self.store.save(&render(&analysis), None) {
            Ok(path) => Some(path),
            Err(e) => {
                error!("Failed to save report: {}", e);
                None
            }
        };

        let ticket_path = if analysis.has_high_severity() {
            match self.store.save_ticket(&draft_ticket(&analysis)) {
                Ok(path) => {
                    info!("Bug ticket draft written to: {}", path.display());
                    Some(path)
                }
                Err(e) => {
                    error!("Failed to save bug ticket draft: {}", e);
                    None
                }
            }
        } else {
            None
        };

        RunOutcome {
            analysis,
            report_path,
            ticket_path,
        }
    }
}

/// Run one suite, turning an error or panic into an error result
async fn run_suite(executor: &dyn SuiteExecutor, ctx: &SuiteContext) -> SuiteOutput {
    let suite = executor.suite();
    info!("Running suite: {}", suite);

    match AssertUnwindSafe(executor.execute(ctx)).catch_unwind().await {
        Ok(Ok(output)) => {
            info!("✓ {}", suite);
            output
        }
        Ok(Err(e)) => {
            error!("✗ {} - {}", suite, e);
            SuiteResult::from_error(e.to_string()).into()
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("✗ {} - panicked: {}", suite, message);
            SuiteResult::from_error(format!("suite panicked: {}", message)).into()
        }
    }
}

fn record(aggregate: &mut AggregateResult, suite: Suite, result: SuiteResult) {
    if let Err(e) = aggregate.record(suite, result) {
        warn!("Ignoring result: {}", e);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn log_summary(analysis: &Analysis) {
    info!("");
    info!(
        "Overall status: {} ({} issue(s))",
        analysis.overall_status(),
        analysis.issues().len()
    );
    for issue in analysis.issues() {
        info!("  - {} [{}]: {}", issue.issue_type(), issue.severity(), issue.message());
    }
}
