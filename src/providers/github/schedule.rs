use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::warn;
use serde_yaml::Value;

use crate::metrics::ScheduleSpec;

use super::types::GitHubContent;

/// Extracts the cron schedule from a workflow file fetched via the contents API.
///
/// Undecodable content, invalid YAML or a workflow without `on.schedule` all
/// produce an empty [`ScheduleSpec`]; none of them is an error.
pub fn schedule_from_content(path: &str, content: &GitHubContent) -> ScheduleSpec {
    match decode_content(content) {
        Some(source) => parse_schedule(path, &source),
        None => {
            warn!("Could not decode workflow file {path}, assuming no schedule");
            ScheduleSpec::default()
        }
    }
}

/// Decodes the base64 payload into UTF-8 text.
///
/// GitHub wraps the encoded payload at 60 columns, so whitespace is stripped first.
pub fn decode_content(content: &GitHubContent) -> Option<String> {
    if !content.encoding.is_empty() && content.encoding != "base64" {
        return None;
    }

    let compact: String = content
        .content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = STANDARD.decode(compact).ok()?;
    String::from_utf8(bytes).ok()
}

/// Reads `on.schedule[].cron` from a workflow definition.
pub fn parse_schedule(path: &str, source: &str) -> ScheduleSpec {
    let document: Value = match serde_yaml::from_str(source) {
        Ok(document) => document,
        Err(e) => {
            warn!("Invalid YAML in workflow file {path}: {e}");
            return ScheduleSpec::default();
        }
    };

    // YAML 1.1 parsers read a bare `on` key as boolean true
    let triggers = document
        .get("on")
        .or_else(|| document.get(Value::Bool(true)));

    let crons: Vec<String> = triggers
        .and_then(|on| on.get("schedule"))
        .and_then(Value::as_sequence)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("cron"))
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    ScheduleSpec { crons }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEDULED: &str = r#"
name: Nightly
on:
  push:
    branches: [main]
  schedule:
    - cron: "0 3 * * *"
    - cron: "30 12 * * 1-5"
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - run: echo hi
"#;

    fn encoded(source: &str) -> GitHubContent {
        let raw = STANDARD.encode(source);
        // Mimic GitHub's line wrapping
        let wrapped = raw
            .as_bytes()
            .chunks(60)
            .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
            .collect::<Vec<_>>()
            .join("\n");
        GitHubContent {
            content: wrapped,
            encoding: "base64".to_string(),
        }
    }

    #[test]
    fn test_decode_wrapped_content() {
        let content = encoded(SCHEDULED);
        assert_eq!(decode_content(&content).as_deref(), Some(SCHEDULED));
    }

    #[test]
    fn test_decode_rejects_other_encodings() {
        let content = GitHubContent {
            content: "plain".to_string(),
            encoding: "none".to_string(),
        };
        assert!(decode_content(&content).is_none());
    }

    #[test]
    fn test_decode_invalid_base64() {
        let content = GitHubContent {
            content: "!!!not-base64!!!".to_string(),
            encoding: "base64".to_string(),
        };
        assert!(decode_content(&content).is_none());
    }

    #[test]
    fn test_parse_schedule_crons() {
        let schedule = parse_schedule("nightly.yml", SCHEDULED);
        assert_eq!(schedule.crons, vec!["0 3 * * *", "30 12 * * 1-5"]);
    }

    #[test]
    fn test_parse_schedule_without_schedule_trigger() {
        let schedule = parse_schedule("ci.yml", "on:\n  push:\n    branches: [main]\n");
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_parse_schedule_with_list_triggers() {
        let schedule = parse_schedule("ci.yml", "on: [push, pull_request]\n");
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_parse_schedule_malformed_yaml() {
        let schedule = parse_schedule("broken.yml", "on: [push, pull_request\njobs: {\n");
        assert!(schedule.is_empty());
    }

    #[test]
    fn test_schedule_from_content_end_to_end() {
        let schedule = schedule_from_content("nightly.yml", &encoded(SCHEDULED));
        assert_eq!(schedule.crons.len(), 2);

        let garbage = GitHubContent {
            content: STANDARD.encode([0xff_u8, 0xfe, 0xfd]),
            encoding: "base64".to_string(),
        };
        assert!(schedule_from_content("binary.yml", &garbage).is_empty());
    }
}
