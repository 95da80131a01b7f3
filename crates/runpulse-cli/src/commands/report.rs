use super::{load_config, load_outcomes, runtime, CommandArgs};
use anyhow::Context;
use runpulse_report::{ResultCollector, RunOrchestrator};
use std::sync::Arc;

/// `runpulse report <results.json> [--config <file>]`
pub fn execute(args: &[String]) -> anyhow::Result<i32> {
    let args = CommandArgs::parse(args)?;
    let input = args.require_input("report")?;
    let config = load_config(args.config.as_deref())?;
    let outcomes = load_outcomes(input)?;

    println!("Reporting {} test outcomes from {}", outcomes.len(), input.display());

    let report = runtime()?.block_on(async {
        let collector = Arc::new(ResultCollector::new());
        let orchestrator = RunOrchestrator::from_config(&config, collector)?;

        let hooks = orchestrator.hooks();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            hooks
                .on_test_end(outcome)
                .with_context(|| format!("Outcome #{} is invalid", index + 1))?;
        }

        anyhow::Ok(orchestrator.run().await)
    })?;

    if let Some(summary) = &report.summary {
        println!(
            "Run {}: {} total, {} passed, {} failed, {} skipped ({}% pass rate)",
            summary.run_id,
            summary.total,
            summary.passed,
            summary.failed,
            summary.skipped,
            summary.pass_rate()
        );
    }
    for artifact in &report.artifacts {
        println!("  {}: {}", artifact.label, artifact.path.display());
    }
    for issue in report.issues() {
        println!("  Issue {}: {}", issue.key, issue.url);
    }
    for failure in &report.render_failures {
        eprintln!("  Report failed: {}", failure);
    }

    Ok(report.exit_code())
}
