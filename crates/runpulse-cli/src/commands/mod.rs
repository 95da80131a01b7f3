pub mod escalate;
pub mod notify;
pub mod report;

use anyhow::{bail, Context};
use runpulse_report::{HarnessConfig, ResultCollector, RunSummary, TestOutcome};
use std::path::{Path, PathBuf};

/// Positional input plus the flags shared by every command.
#[derive(Debug, Default, PartialEq)]
pub struct CommandArgs {
    pub input: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub results: Option<PathBuf>,
}

impl CommandArgs {
    pub fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut parsed = Self::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--config" => parsed.config = Some(flag_value(&mut iter, "--config")?),
                "--results" => parsed.results = Some(flag_value(&mut iter, "--results")?),
                flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
                _ if parsed.input.is_none() => parsed.input = Some(PathBuf::from(arg)),
                _ => bail!("Unexpected argument: {}", arg),
            }
        }

        Ok(parsed)
    }

    pub fn require_input(&self, command: &str) -> anyhow::Result<&Path> {
        self.input
            .as_deref()
            .with_context(|| format!("Usage: runpulse {} <results.json> [--config <file>]", command))
    }
}

fn flag_value<'a>(iter: &mut impl Iterator<Item = &'a String>, flag: &str) -> anyhow::Result<PathBuf> {
    iter.next()
        .map(PathBuf::from)
        .with_context(|| format!("{} requires a value", flag))
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<HarnessConfig> {
    HarnessConfig::load(path).context("Failed to load configuration")
}

/// Reads a JSON array of outcomes as emitted by the test runner.
pub fn load_outcomes(path: &Path) -> anyhow::Result<Vec<TestOutcome>> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse outcomes in {}", path.display()))
}

/// Records every outcome into a fresh collector, rejecting the file on the
/// first invalid entry.
pub fn collect(outcomes: Vec<TestOutcome>, collector: &ResultCollector) -> anyhow::Result<()> {
    for (index, outcome) in outcomes.into_iter().enumerate() {
        collector
            .record(outcome)
            .with_context(|| format!("Outcome #{} is invalid", index + 1))?;
    }
    Ok(())
}

/// Accepts either an exported run summary or a bare array of outcomes.
pub fn load_summary(path: &Path) -> anyhow::Result<RunSummary> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if value.is_array() {
        let outcomes: Vec<TestOutcome> = serde_json::from_value(value)
            .with_context(|| format!("Failed to parse outcomes in {}", path.display()))?;
        let collector = ResultCollector::new();
        collect(outcomes, &collector)?;
        return Ok(collector.finalize()?);
    }

    serde_json::from_value(value).with_context(|| format!("Failed to parse run summary in {}", path.display()))
}

pub fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_positional_and_flags() {
        let parsed = CommandArgs::parse(&args(&["out.json", "--config", "ci.toml"])).unwrap();
        assert_eq!(parsed.input, Some(PathBuf::from("out.json")));
        assert_eq!(parsed.config, Some(PathBuf::from("ci.toml")));
        assert_eq!(parsed.results, None);
    }

    #[test]
    fn test_parse_rejects_missing_flag_value_and_extras() {
        assert!(CommandArgs::parse(&args(&["--config"])).is_err());
        assert!(CommandArgs::parse(&args(&["a.json", "b.json"])).is_err());
        assert!(CommandArgs::parse(&args(&["--verbose"])).is_err());
    }

    #[test]
    fn test_load_summary_accepts_outcome_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("outcomes.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "Login", "status": "passed", "durationMs": 2300},
                {"name": "Checkout", "status": "failed", "durationMs": 1500, "errorMessage": "timeout"}
            ]"#,
        )
        .unwrap();

        let summary = load_summary(&path).unwrap();
        assert_eq!((summary.total, summary.passed, summary.failed), (2, 1, 1));
    }

    #[test]
    fn test_collect_reports_invalid_entry_index() {
        let collector = ResultCollector::new();
        let outcomes = vec![
            TestOutcome::passed("Login", 10),
            TestOutcome::passed("", 10),
        ];
        let err = collect(outcomes, &collector).unwrap_err();
        assert!(err.to_string().contains("#2"));
    }
}
