use super::{collect, load_config, load_outcomes, runtime, CommandArgs};
use anyhow::Context;
use runpulse_report::escalation::IssueLinkStore;
use runpulse_report::{IssueEscalator, ResultCollector};
use tracing::warn;

/// `runpulse escalate <results.json> [--config <file>]`
pub fn execute(args: &[String]) -> anyhow::Result<i32> {
    let args = CommandArgs::parse(args)?;
    let input = args.require_input("escalate")?;
    let config = load_config(args.config.as_deref())?;

    let collector = ResultCollector::new();
    collect(load_outcomes(input)?, &collector)?;
    let summary = collector.finalize()?;

    let runtime = runtime()?;
    let escalation = runtime.block_on(async {
        let Some(escalator) = IssueEscalator::from_config(&config)? else {
            return anyhow::Ok(None);
        };
        Ok(Some(escalator.escalate(&summary.outcomes).await))
    })?;

    let Some(escalation) = escalation else {
        warn!("issue tracker not configured (set JIRA_BASE_URL, JIRA_PROJECT, JIRA_USERNAME, JIRA_API_TOKEN)");
        println!("Issue tracker not configured; nothing escalated");
        return Ok(0);
    };

    let store = IssueLinkStore::new(&config.reports.issue_links_file);
    store
        .save(&escalation.issues)
        .with_context(|| format!("Failed to write {}", store.path().display()))?;

    println!(
        "Escalated {} failed tests: {} issues created, {} failed",
        escalation.attempted,
        escalation.issues.len(),
        escalation.failures.len()
    );
    for issue in &escalation.issues {
        println!("  {}: {}", issue.key, issue.url);
    }

    Ok(0)
}
