//! JSON reporter for suite results

use crate::runner::SuiteResults;
use anyhow::Result;

/// JSON format reporter
pub struct JsonReporter;

impl JsonReporter {
    /// Format suite results as JSON, optionally pretty-printed
    pub fn format(results: &SuiteResults, pretty: bool) -> Result<String> {
        let mut output = if pretty {
            serde_json::to_string_pretty(results)?
        } else {
            serde_json::to_string(results)?
        };
        output.push('\n');
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::tests::create_test_results;

    #[test]
    fn test_json_format_compact() {
        let results = create_test_results();
        let output = JsonReporter::format(&results, false).unwrap();

        // Compact JSON is a single line
        assert_eq!(output.trim_end().lines().count(), 1);
        assert!(output.contains("\"base_url\":\"https://hrm.example.gov\""));
    }

    #[test]
    fn test_json_format_pretty() {
        let results = create_test_results();
        let output = JsonReporter::format(&results, true).unwrap();

        assert!(output.trim_end().lines().count() > 1);
        assert!(output.contains("  "));
    }

    #[test]
    fn test_json_roundtrip() {
        let results = create_test_results();
        let json = JsonReporter::format(&results, false).unwrap();
        let parsed: SuiteResults = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.base_url, results.base_url);
        assert_eq!(parsed.passed, results.passed);
        assert_eq!(parsed.scenario_results.len(), 2);
        assert_eq!(
            parsed.scenario_results[1].failed_step,
            results.scenario_results[1].failed_step
        );
    }
}
