use proptest::prelude::*;
use runpulse_report::reporting::{CsvRenderer, ReportRenderer};
use runpulse_report::{ResultCollector, TestOutcome};

/// Minimal RFC 4180 reader: every field is quoted, quotes are doubled.
fn parse_csv(input: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            ('"', _) => in_quotes = !in_quotes,
            (',', false) => row.push(std::mem::take(&mut field)),
            ('\n', false) => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            (c, _) => field.push(c),
        }
    }
    rows
}

fn outcome_strategy() -> impl Strategy<Value = TestOutcome> {
    let name = "[A-Za-z][A-Za-z0-9 ,\"\n]{0,20}";
    let error = "[a-z][a-z ,\"\n]{0,20}";
    let feature = proptest::option::of("[A-Za-z ,\"]{1,10}");
    (0u8..3, name, error, feature, 0u64..100_000).prop_map(|(kind, name, error, feature, ms)| {
        let outcome = match kind {
            0 => TestOutcome::passed(name, ms),
            1 => TestOutcome::failed(name, ms, error),
            _ => TestOutcome::skipped(name),
        };
        match feature {
            Some(feature) => outcome.with_feature(feature),
            None => outcome,
        }
    })
}

#[test]
fn test_csv_header_only_for_empty_run() {
    let summary = ResultCollector::new().finalize().unwrap();
    let rows = parse_csv(&CsvRenderer.render(&summary).unwrap().content);
    assert_eq!(rows, vec![vec!["Test Name", "Status", "Duration", "Feature", "Error"]]);
}

proptest! {
    #[test]
    fn test_csv_rows_parse_back_to_outcomes(outcomes in proptest::collection::vec(outcome_strategy(), 0..12)) {
        let collector = ResultCollector::new();
        for outcome in &outcomes {
            collector.record(outcome.clone()).unwrap();
        }
        let summary = collector.finalize().unwrap();
        let rows = parse_csv(&CsvRenderer.render(&summary).unwrap().content);

        prop_assert_eq!(rows.len(), outcomes.len() + 1);
        for (row, outcome) in rows[1..].iter().zip(&outcomes) {
            prop_assert_eq!(row.len(), 5);
            prop_assert_eq!(&row[0], &outcome.name);
            prop_assert_eq!(row[1].as_str(), outcome.status.as_str());
            prop_assert_eq!(row[2].parse::<u64>().unwrap(), outcome.duration_ms);
            prop_assert_eq!(row[3].as_str(), outcome.feature.as_deref().unwrap_or(""));
            prop_assert_eq!(row[4].as_str(), outcome.error_message.as_deref().unwrap_or(""));
        }
    }
}
