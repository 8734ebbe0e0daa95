//! `evaluate` subcommand.

use std::sync::Arc;

use tracing::{info, warn};

use stepcheck_config::Config;
use stepcheck_driver_cdp::{BrowserOptions, CdpBrowser};
use stepcheck_protocols::BrowserDriver;
use stepcheck_provider_gemini::{GeminiClient, GeminiFixer, GeminiJudge};
use stepcheck_workqueue::{FileResultStore, FileSourceStore, RunContext, Scheduler};

/// Command-line overrides for the evaluate run.
#[derive(Debug, Default)]
pub(crate) struct EvaluateOverrides {
    pub headless: bool,
    pub max_attempts: Option<u32>,
    pub no_fix: bool,
}

impl EvaluateOverrides {
    pub fn apply(&self, config: &mut Config) {
        if self.headless {
            config.browser.headless = true;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.queue.max_attempts = max_attempts;
        }
        if self.no_fix {
            config.queue.fix_enabled = false;
        }
    }
}

/// Run the queue for one module. Returns whether every component passed.
pub(crate) async fn evaluate(module_id: &str, config: Config) -> Result<bool, Box<dyn std::error::Error>> {
    info!("Starting stepcheck v{}", env!("CARGO_PKG_VERSION"));
    info!(
        module = module_id,
        max_attempts = config.queue.max_attempts,
        fix_enabled = config.queue.fix_enabled,
        headless = config.browser.headless,
        "Evaluate"
    );

    let client = Arc::new(GeminiClient::from_config(&config.provider)?);
    let judge = Arc::new(GeminiJudge::new(client.clone(), config.provider.model.clone()));
    let fixer = Arc::new(GeminiFixer::new(client, config.provider.model.clone()));
    let driver = Arc::new(CdpBrowser::new(BrowserOptions::from(&config.browser)));

    let ctx = RunContext {
        driver: driver.clone(),
        judge,
        fixer,
        results: Arc::new(FileResultStore::new(config.paths.clone())),
        sources: Arc::new(FileSourceStore::new(config.queue.backup_retention)),
        config,
    };

    let outcome = Scheduler::new(ctx).run_module(module_id).await;

    if let Err(e) = driver.close().await {
        warn!("Failed to close browser: {}", e);
    }

    let report = outcome?;
    println!("{}", report.summary());
    Ok(report.all_passed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = Config::default();
        EvaluateOverrides::default().apply(&mut config);
        assert!(!config.browser.headless);
        assert_eq!(config.queue.max_attempts, 3);
        assert!(config.queue.fix_enabled);
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = Config::default();
        EvaluateOverrides {
            headless: true,
            max_attempts: Some(1),
            no_fix: true,
        }
        .apply(&mut config);
        assert!(config.browser.headless);
        assert_eq!(config.queue.max_attempts, 1);
        assert!(!config.queue.fix_enabled);
    }
}
