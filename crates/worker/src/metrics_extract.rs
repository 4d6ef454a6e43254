use std::collections::BTreeMap;

use regex::Regex;
use tracing::warn;

use conveyor_domain::Reports;

/// Applies every `name -> pattern` entry to the job output.
///
/// Each pattern runs once over stdout followed by stderr, every line
/// newline-terminated. The values are the capture groups of the first match,
/// the whole match first; groups that did not participate come back as
/// empty strings.
pub fn extract_metrics(
    patterns: &BTreeMap<String, String>,
    stdout: &[String],
    stderr: &[String],
) -> Reports {
    if patterns.is_empty() {
        return Reports::new();
    }

    let output = merge_output(stdout, stderr);

    patterns
        .iter()
        .map(|(name, pattern)| {
            let values = match Regex::new(pattern) {
                Ok(regex) => first_match(&regex, &output).unwrap_or_default(),
                Err(e) => {
                    warn!(metric = %name, pattern = %pattern, error = %e, "Invalid metric pattern");
                    Vec::new()
                }
            };
            (name.clone(), values)
        })
        .collect()
}

fn merge_output(stdout: &[String], stderr: &[String]) -> String {
    let lines = stdout.iter().chain(stderr);
    let mut text = String::with_capacity(lines.clone().map(|l| l.len() + 1).sum());
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}

fn first_match(regex: &Regex, text: &str) -> Option<Vec<String>> {
    regex.captures(text).map(|captures| {
        captures
            .iter()
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn patterns(raw: &[(&str, &str)]) -> BTreeMap<String, String> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_capture_groups_follow_whole_match() {
        let reports = extract_metrics(
            &patterns(&[("coverage", r"coverage: (\d+)\.(\d+)%")]),
            &lines(&["running", "coverage: 87.5% of statements"]),
            &[],
        );
        assert_eq!(reports["coverage"], vec!["coverage: 87.5%", "87", "5"]);
    }

    #[test]
    fn test_stderr_matched_when_stdout_has_no_match() {
        let reports = extract_metrics(
            &patterns(&[("warnings", r"(\d+) warnings")]),
            &lines(&["build ok"]),
            &lines(&["3 warnings emitted"]),
        );
        assert_eq!(reports["warnings"], vec!["3 warnings", "3"]);
    }

    #[test]
    fn test_first_match_in_merged_output_wins() {
        let reports = extract_metrics(
            &patterns(&[("n", r"n=(\d+)")]),
            &lines(&["n=1"]),
            &lines(&["n=2"]),
        );
        assert_eq!(reports["n"], vec!["n=1", "1"]);
    }

    #[test]
    fn test_pattern_spans_stdout_and_stderr() {
        let reports = extract_metrics(
            &patterns(&[("span", r"(?s)start (\w+).*end (\w+)")]),
            &lines(&["start a", "1"]),
            &lines(&["end b", "2"]),
        );
        assert_eq!(reports["span"], vec!["start a\n1\nend b", "a", "b"]);
    }

    #[test]
    fn test_end_anchor_is_end_of_stderr() {
        let reports = extract_metrics(
            &patterns(&[("last", r"(\d+)\n\z")]),
            &lines(&["start a", "1"]),
            &lines(&["end b", "2"]),
        );
        assert_eq!(reports["last"], vec!["2\n", "2"]);
    }

    #[test]
    fn test_unmatched_optional_group_is_empty() {
        let reports = extract_metrics(
            &patterns(&[("time", r"took (\d+)(ms)?")]),
            &lines(&["took 12"]),
            &[],
        );
        assert_eq!(reports["time"], vec!["took 12", "12", ""]);
    }

    #[test]
    fn test_no_match_gives_empty_list() {
        let reports = extract_metrics(&patterns(&[("x", "absent")]), &lines(&["a"]), &[]);
        assert_eq!(reports["x"], Vec::<String>::new());
    }

    #[test]
    fn test_invalid_pattern_gives_empty_list() {
        let reports = extract_metrics(&patterns(&[("bad", "(unclosed")]), &lines(&["("]), &[]);
        assert!(reports["bad"].is_empty());
    }

    #[test]
    fn test_anchored_pattern_matches_per_line() {
        let reports = extract_metrics(
            &patterns(&[("total", r"(?m)^total (\d+)$")]),
            &lines(&["subtotal 1", "total 42"]),
            &[],
        );
        assert_eq!(reports["total"], vec!["total 42", "42"]);
    }

    #[test]
    fn test_no_patterns_gives_empty_map() {
        assert!(extract_metrics(&BTreeMap::new(), &lines(&["x"]), &[]).is_empty());
    }
}
