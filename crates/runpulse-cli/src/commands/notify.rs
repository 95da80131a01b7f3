use super::{load_config, load_summary, runtime, CommandArgs};
use runpulse_report::escalation::IssueLinkStore;
use runpulse_report::notification::standard_artifacts;
use runpulse_report::{NotificationDispatcher, ResultCollector, RunSummary};
use std::path::Path;
use tracing::warn;

/// `runpulse notify [--results <results.json>] [--config <file>]`
///
/// Sends the digest for a run whose reports and issue links were written
/// earlier. Only configuration errors fail the command.
pub fn execute(args: &[String]) -> anyhow::Result<i32> {
    let args = CommandArgs::parse(args)?;
    let config = load_config(args.config.as_deref())?;
    let output_dir = config.reports.output_dir.clone();

    let results = args
        .results
        .clone()
        .or_else(|| args.input.clone())
        .unwrap_or_else(|| output_dir.join("results.json"));
    let summary = summary_or_empty(&results)?;

    let store = IssueLinkStore::new(&config.reports.issue_links_file);
    let issues = store.load().unwrap_or_else(|e| {
        warn!(path = %store.path().display(), error = %e, "failed to read issue links; sending without them");
        Vec::new()
    });

    let sent = runtime()?.block_on(async {
        let Some(dispatcher) = NotificationDispatcher::from_config(&config)? else {
            return anyhow::Ok(None);
        };
        let artifacts = standard_artifacts(&output_dir);
        Ok(Some(dispatcher.dispatch(&summary, &issues, &artifacts).await))
    })?;

    match sent {
        Some(true) => println!("Digest sent ({} issues linked)", issues.len()),
        Some(false) => println!("Digest could not be sent; see log for details"),
        None => {
            warn!("mail not configured (set EMAIL_HOST, EMAIL_FROM, EMAIL_TO)");
            println!("Mail not configured; no digest sent");
        }
    }

    Ok(0)
}

fn summary_or_empty(path: &Path) -> anyhow::Result<RunSummary> {
    match load_summary(path) {
        Ok(summary) => Ok(summary),
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{:#}", e), "no usable results; sending an empty digest");
            Ok(ResultCollector::new().finalize()?)
        }
    }
}
