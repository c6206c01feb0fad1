//! Test suites run against the live site
//!
//! Each suite produces one [`SuiteResult`] under its own [`Suite`] key. The
//! functional suite also measures navigation timings and hands them back as
//! a companion `performance` entry.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use sitecheck_common::{Suite, SuiteResult};

use crate::error::E2eResult;
use crate::playwright::{js_string, Browser, ContextOptions, PlaywrightDriver};

/// What a suite gets to know about the run
#[derive(Debug, Clone)]
pub struct SuiteContext {
    pub base_url: String,
}

impl SuiteContext {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

/// Output of one suite: its own result plus entries it measured for others
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuiteOutput {
    pub result: SuiteResult,
    pub companions: Vec<(Suite, SuiteResult)>,
}

impl SuiteOutput {
    pub fn new(result: SuiteResult) -> Self {
        Self {
            result,
            companions: Vec::new(),
        }
    }

    pub fn with_companion(mut self, suite: Suite, result: SuiteResult) -> Self {
        self.companions.push((suite, result));
        self
    }
}

impl From<SuiteResult> for SuiteOutput {
    fn from(result: SuiteResult) -> Self {
        Self::new(result)
    }
}

/// One category of checks
#[async_trait]
pub trait SuiteExecutor: Send + Sync {
    /// Aggregate key this suite writes
    fn suite(&self) -> Suite;

    async fn execute(&self, ctx: &SuiteContext) -> E2eResult<SuiteOutput>;
}

/// Selectors and expectations for the site under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Text the page title must contain
    pub expected_title: String,
    pub hero_selector: String,
    pub join_form_selector: String,
    pub name_input_selector: String,
    pub join_button_selector: String,

    /// Value of the `admin` query parameter that unlocks the admin panel
    pub admin_key: String,
    pub admin_panel_selector: String,
    pub admin_button_selectors: Vec<String>,

    /// Milliseconds to wait for the admin panel to appear
    pub admin_wait_ms: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            expected_title: "Saturday Run & Coffee Club".to_string(),
            hero_selector: ".hero-title".to_string(),
            join_form_selector: ".join-form".to_string(),
            name_input_selector: "#participantName".to_string(),
            join_button_selector: "#joinBtn".to_string(),
            admin_key: "runclub2024".to_string(),
            admin_panel_selector: "#adminControls".to_string(),
            admin_button_selectors: vec![
                "#editEventBtn".to_string(),
                "#clearAllBtn".to_string(),
                "#addParticipantBtn".to_string(),
            ],
            admin_wait_ms: 5000,
        }
    }
}

/// Which optional suites run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitesConfig {
    pub admin: bool,
    pub accessibility: bool,

    /// Browsers exercised by the compatibility suite
    pub browsers: Vec<Browser>,
}

impl Default for SuitesConfig {
    fn default() -> Self {
        Self {
            admin: true,
            accessibility: true,
            browsers: Browser::ALL.to_vec(),
        }
    }
}

/// The suites of a full run, in execution order
pub fn default_suites(
    driver: Arc<PlaywrightDriver>,
    site: Arc<SiteConfig>,
    suites: &SuitesConfig,
) -> Vec<Box<dyn SuiteExecutor>> {
    let mut executors: Vec<Box<dyn SuiteExecutor>> = vec![Box::new(FunctionalSuite::new(
        driver.clone(),
        site.clone(),
    ))];

    if suites.admin {
        executors.push(Box::new(AdminSuite::new(driver.clone(), site.clone())));
    }
    executors.push(Box::new(BrowserSuite::new(
        driver.clone(),
        site.clone(),
        suites.browsers.clone(),
    )));
    executors.push(Box::new(MobileSuite::new(driver.clone(), site)));
    if suites.accessibility {
        executors.push(Box::new(AccessibilitySuite::new(driver)));
    }

    executors
}

// ============================================================================
// Functional
// ============================================================================

/// Page load, title, key elements, script initialization and timings
pub struct FunctionalSuite {
    driver: Arc<PlaywrightDriver>,
    site: Arc<SiteConfig>,
}

impl FunctionalSuite {
    pub fn new(driver: Arc<PlaywrightDriver>, site: Arc<SiteConfig>) -> Self {
        Self { driver, site }
    }

    pub fn script_body(&self) -> String {
        let site = &self.site;
        format!(
            r#"    const response = await page.goto(baseUrl);
    checks.page_loading = !!response && response.status() === 200;
    checks.title_check = (await page.title()).includes({title});
    checks.hero_element = (await page.locator({hero}).count()) > 0;
    checks.form_elements = (await page.locator({name_input}).count()) > 0
      && (await page.locator({join_button}).count()) > 0;
    await page.waitForLoadState('networkidle');
    checks.js_initialized = await page.evaluate(() => !!window.app);
    metrics = await page.evaluate(() => {{
      const nav = performance.getEntriesByType('navigation')[0];
      return {{
        loadTime: nav.loadEventEnd - nav.loadEventStart,
        domContentLoaded: nav.domContentLoadedEventEnd - nav.domContentLoadedEventStart,
        totalTime: nav.loadEventEnd - nav.fetchStart
      }};
    }});"#,
            title = js_string(&site.expected_title),
            hero = js_string(&site.hero_selector),
            name_input = js_string(&site.name_input_selector),
            join_button = js_string(&site.join_button_selector),
        )
    }
}

#[async_trait]
impl SuiteExecutor for FunctionalSuite {
    fn suite(&self) -> Suite {
        Suite::FunctionalTests
    }

    async fn execute(&self, ctx: &SuiteContext) -> E2eResult<SuiteOutput> {
        info!("Running functional checks...");
        let options = self.driver.desktop(Browser::Chromium);
        let mut report = self.driver.run(&options, &ctx.base_url, &self.script_body()).await?;

        let metrics = report.metrics.take();
        let output = SuiteOutput::new(report.into_suite_result());

        Ok(match metrics {
            Some(metrics) => output.with_companion(Suite::Performance, SuiteResult::from(metrics)),
            None => output,
        })
    }
}

// ============================================================================
// Admin
// ============================================================================

/// Admin panel access through the admin query parameter
pub struct AdminSuite {
    driver: Arc<PlaywrightDriver>,
    site: Arc<SiteConfig>,
}

impl AdminSuite {
    pub fn new(driver: Arc<PlaywrightDriver>, site: Arc<SiteConfig>) -> Self {
        Self { driver, site }
    }

    pub fn script_body(&self) -> String {
        let site = &self.site;
        let buttons = Value::from(site.admin_button_selectors.clone());
        format!(
            r#"    await page.goto(baseUrl + '?admin=' + encodeURIComponent({key}));
    await page.waitForSelector({panel}, {{ timeout: {wait} }});
    checks.admin_panel_access = await page.locator({panel}).isVisible();
    let allButtons = true;
    for (const selector of {buttons}) {{
      if ((await page.locator(selector).count()) === 0) allButtons = false;
    }}
    checks.admin_buttons = allButtons;"#,
            key = js_string(&site.admin_key),
            panel = js_string(&site.admin_panel_selector),
            wait = site.admin_wait_ms,
            buttons = buttons,
        )
    }
}

#[async_trait]
impl SuiteExecutor for AdminSuite {
    fn suite(&self) -> Suite {
        Suite::AdminTests
    }

    async fn execute(&self, ctx: &SuiteContext) -> E2eResult<SuiteOutput> {
        info!("Running admin checks...");
        let options = self.driver.desktop(Browser::Chromium);
        let report = self.driver.run(&options, &ctx.base_url, &self.script_body()).await?;
        Ok(report.into_suite_result().into())
    }
}

// ============================================================================
// Cross-browser
// ============================================================================

/// Loads the page in each configured browser; a browser that cannot run the
/// check is recorded as failed rather than failing the suite
pub struct BrowserSuite {
    driver: Arc<PlaywrightDriver>,
    site: Arc<SiteConfig>,
    browsers: Vec<Browser>,
}

impl BrowserSuite {
    pub fn new(driver: Arc<PlaywrightDriver>, site: Arc<SiteConfig>, browsers: Vec<Browser>) -> Self {
        Self {
            driver,
            site,
            browsers,
        }
    }

    pub fn script_body(&self) -> String {
        format!(
            r#"    const response = await page.goto(baseUrl);
    const heroCount = await page.locator({hero}).count();
    checks.loaded = !!response && response.status() === 200 && heroCount > 0;"#,
            hero = js_string(&self.site.hero_selector),
        )
    }
}

#[async_trait]
impl SuiteExecutor for BrowserSuite {
    fn suite(&self) -> Suite {
        Suite::BrowserTests
    }

    async fn execute(&self, ctx: &SuiteContext) -> E2eResult<SuiteOutput> {
        info!("Running cross-browser checks...");
        let body = self.script_body();
        let mut result = SuiteResult::new();

        for browser in &self.browsers {
            let options = self.driver.desktop(*browser);
            let passed = match self.driver.run(&options, &ctx.base_url, &body).await {
                Ok(report) => {
                    if let Some(error) = &report.error {
                        warn!("{} check failed: {}", browser, error);
                    }
                    report.error.is_none()
                        && report.checks.get("loaded") == Some(&Value::Bool(true))
                }
                Err(e) => {
                    warn!("{} check failed: {}", browser, e);
                    false
                }
            };

            info!("  {} {}", if passed { "✓" } else { "✗" }, browser);
            result.insert(browser.as_str(), passed);
        }

        Ok(result.into())
    }
}

// ============================================================================
// Mobile
// ============================================================================

pub const MOBILE_VIEWPORT: (u32, u32) = (375, 667);
pub const MOBILE_USER_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 14_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148";

/// Layout on a phone-sized viewport
pub struct MobileSuite {
    driver: Arc<PlaywrightDriver>,
    site: Arc<SiteConfig>,
}

impl MobileSuite {
    pub fn new(driver: Arc<PlaywrightDriver>, site: Arc<SiteConfig>) -> Self {
        Self { driver, site }
    }

    pub fn context(&self) -> ContextOptions {
        ContextOptions {
            browser: Browser::Chromium,
            viewport_width: MOBILE_VIEWPORT.0,
            viewport_height: MOBILE_VIEWPORT.1,
            user_agent: Some(MOBILE_USER_AGENT.to_string()),
        }
    }

    pub fn script_body(&self) -> String {
        format!(
            r#"    await page.goto(baseUrl);
    const heroVisible = await page.locator({hero}).first().isVisible();
    const formVisible = await page.locator({form}).first().isVisible();
    checks.responsive = heroVisible && formVisible;
    checks.viewport_correct = (await page.evaluate(() => window.innerWidth)) === {width};"#,
            hero = js_string(&self.site.hero_selector),
            form = js_string(&self.site.join_form_selector),
            width = MOBILE_VIEWPORT.0,
        )
    }
}

#[async_trait]
impl SuiteExecutor for MobileSuite {
    fn suite(&self) -> Suite {
        Suite::MobileTests
    }

    async fn execute(&self, ctx: &SuiteContext) -> E2eResult<SuiteOutput> {
        info!("Running mobile checks...");
        let report = self
            .driver
            .run(&self.context(), &ctx.base_url, &self.script_body())
            .await?;
        Ok(report.into_suite_result().into())
    }
}

// ============================================================================
// Accessibility
// ============================================================================

/// In-page heuristic audit scored 0-100
pub struct AccessibilitySuite {
    driver: Arc<PlaywrightDriver>,
}

impl AccessibilitySuite {
    pub fn new(driver: Arc<PlaywrightDriver>) -> Self {
        Self { driver }
    }

    pub fn script_body(&self) -> String {
        r#"    await page.goto(baseUrl);
    const audit = await page.evaluate(() => {
      const labelled = el => {
        if (el.getAttribute('aria-label') || el.getAttribute('aria-labelledby')) return true;
        if (el.id && document.querySelector(`label[for="${el.id}"]`)) return true;
        return !!el.closest('label');
      };
      const images = [...document.images];
      const inputs = [...document.querySelectorAll('input:not([type=hidden]), select, textarea')];
      const buttons = [...document.querySelectorAll('button')];
      return {
        lang_attribute: !!document.documentElement.getAttribute('lang'),
        image_alt_text: images.every(img => img.hasAttribute('alt')),
        labelled_inputs: inputs.every(labelled),
        named_buttons: buttons.every(b => (b.textContent || '').trim() || b.getAttribute('aria-label')),
        main_heading: document.querySelectorAll('h1').length > 0
      };
    });
    Object.assign(checks, audit);
    const names = Object.keys(audit);
    checks.score = Math.round(100 * names.filter(n => audit[n]).length / names.length);"#
            .to_string()
    }
}

#[async_trait]
impl SuiteExecutor for AccessibilitySuite {
    fn suite(&self) -> Suite {
        Suite::Accessibility
    }

    async fn execute(&self, ctx: &SuiteContext) -> E2eResult<SuiteOutput> {
        info!("Running accessibility audit...");
        let options = self.driver.desktop(Browser::Chromium);
        let report = self.driver.run(&options, &ctx.base_url, &self.script_body()).await?;
        Ok(report.into_suite_result().into())
    }
}
