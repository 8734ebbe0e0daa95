//! `report` and `reset` subcommands.

use tracing::info;

use stepcheck_config::PathsConfig;
use stepcheck_workqueue::{FileResultStore, ResultStore};

/// Print the summary of the last persisted run.
pub(crate) async fn report(module_id: &str, paths: PathsConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileResultStore::new(paths);
    match store.load_report(module_id).await? {
        Some(report) => {
            println!("{}", report.summary());
            println!("Run: {} at {}", report.run_id, report.timestamp);
        }
        None => println!("No results for module '{}'", module_id),
    }
    Ok(())
}

/// Delete persisted results so the next run evaluates everything.
pub(crate) async fn reset(module_id: &str, paths: PathsConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileResultStore::new(paths);
    if store.clear(module_id).await? {
        info!(module = module_id, "Cleared previous results");
        println!("Cleared results for module '{}'", module_id);
    } else {
        println!("No results for module '{}'", module_id);
    }
    Ok(())
}
