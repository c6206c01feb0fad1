//! sitecheck E2E Runner
//!
//! Runs the site test suites against a locally served copy of the site and
//! turns their results into a report:
//! - Serves the site directory from an in-process HTTP server
//! - Drives Playwright through generated Node.js scripts
//! - Collects suite results into one aggregate, tolerating suite failures
//! - Classifies, renders and saves the report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Orchestrator                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SiteServer::start() -> base_url                            │
//! │  for each SuiteExecutor (functional, admin, browsers,       │
//! │                          mobile, accessibility)             │
//! │    execute(ctx) -> SuiteOutput | {error}                    │
//! │  classify(aggregate) -> Analysis                            │
//! │  render / draft_ticket -> ReportStore                       │
//! │  SiteServer::stop()                                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod playwright;
pub mod server;
pub mod suites;

pub use config::SitecheckConfig;
pub use error::{E2eError, E2eResult};
pub use orchestrator::{Orchestrator, RunOutcome};
pub use server::{SiteServer, StaticSiteServer};
pub use suites::{SuiteContext, SuiteExecutor, SuiteOutput};
