//! Markdown, JSON and fixed-width table renderings of commitments.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};

use deadline_core::commitment::Commitment;

use crate::error::EngineError;

const NO_DEADLINE: &str = "No explicit deadline";
const TABLE_HEADERS: [&str; 5] = ["WHO", "PROMISE", "CREATED_AT", "DEADLINE", "STATUS"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
    Table,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Json => "json",
            Self::Table => "table",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

fn iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn deadline(c: &Commitment) -> &str {
    c.explicit_deadline_text.as_deref().unwrap_or(NO_DEADLINE)
}

pub fn render(format: OutputFormat, commitments: &[Commitment]) -> Result<String, EngineError> {
    Ok(match format {
        OutputFormat::Markdown => to_markdown(commitments),
        OutputFormat::Json => to_json(commitments)?,
        OutputFormat::Table => to_table(commitments),
    })
}

pub fn to_markdown(commitments: &[Commitment]) -> String {
    let mut lines = Vec::new();
    for c in commitments {
        lines.push(format!("- **Promise**: {}", c.sentence));
        lines.push(format!("  - **Who**: {}", c.who));
        lines.push(format!("  - **When**: {}", iso(&c.created_at)));
        lines.push(format!("  - **Deadline**: {}", deadline(c)));
        lines.push(format!("  - **Status**: {}", c.status));
        lines.push(String::new());
    }
    lines.join("\n").trim().to_string()
}

/// Pretty-printed JSON array in the commitment data-model shape.
pub fn to_json(commitments: &[Commitment]) -> Result<String, EngineError> {
    Ok(serde_json::to_string_pretty(commitments)?)
}

pub fn to_table(commitments: &[Commitment]) -> String {
    let mut rows: Vec<Vec<String>> = vec![TABLE_HEADERS.iter().map(|h| (*h).to_string()).collect()];
    for c in commitments {
        rows.push(vec![
            c.who.clone(),
            c.sentence.clone(),
            iso(&c.created_at),
            deadline(c).to_string(),
            c.status.to_string(),
        ]);
    }

    let mut widths = [0usize; TABLE_HEADERS.len()];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (idx, row) in rows.iter().enumerate() {
        let padded: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{cell:<width$}", width = widths[i]))
            .collect();
        lines.push(padded.join(" | "));
        if idx == 0 {
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            lines.push(rule.join("-+-"));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use deadline_core::commitment::{CommitmentKind, CommitmentStatus, RawLabels, SourceMessage};
    use deadline_core::ids::CommitmentId;
    use serde_json::{json, Value};

    fn commitment(sentence: &str, who: &str, deadline: Option<&str>) -> Commitment {
        let source = SourceMessage::new(sentence);
        Commitment {
            id: CommitmentId::from_raw("cmt_1"),
            sentence: sentence.into(),
            full_message: sentence.into(),
            who: who.into(),
            kind: Some(CommitmentKind::PersonalPromise),
            kind_confidence: 0.6,
            created_at: Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap(),
            explicit_deadline_text: deadline.map(str::to_string),
            explicit_deadline_date: None,
            status: CommitmentStatus::Unclear,
            source: Arc::new(source),
            raw_llm_labels: RawLabels::default(),
        }
    }

    #[test]
    fn markdown_blocks() {
        let out = to_markdown(&[
            commitment("I will fix it.", "I", Some("tomorrow")),
            commitment("We'll look.", "Unassigned", None),
        ]);
        let expected = "\
- **Promise**: I will fix it.
  - **Who**: I
  - **When**: 2024-02-03T04:05:06Z
  - **Deadline**: tomorrow
  - **Status**: unclear

- **Promise**: We'll look.
  - **Who**: Unassigned
  - **When**: 2024-02-03T04:05:06Z
  - **Deadline**: No explicit deadline
  - **Status**: unclear";
        assert_eq!(out, expected);
    }

    #[test]
    fn markdown_empty() {
        assert_eq!(to_markdown(&[]), "");
    }

    #[test]
    fn table_layout() {
        let out = to_table(&[commitment("I will fix it.", "I", Some("by Friday"))]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "WHO | PROMISE        | CREATED_AT           | DEADLINE  | STATUS "
        );
        assert_eq!(
            lines[1],
            "----+----------------+----------------------+-----------+--------"
        );
        assert_eq!(
            lines[2],
            "I   | I will fix it. | 2024-02-03T04:05:06Z | by Friday | unclear"
        );
    }

    #[test]
    fn table_pads_by_chars() {
        let out = to_table(&[commitment("Je m'en occupe après.", "José", None)]);
        let lines: Vec<&str> = out.lines().collect();
        let widths: Vec<usize> = lines.iter().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "ragged table: {widths:?}");
    }

    #[test]
    fn table_header_only_when_empty() {
        let out = to_table(&[]);
        assert_eq!(out.lines().count(), 2);
        assert!(out.starts_with("WHO | PROMISE | CREATED_AT | DEADLINE | STATUS"));
    }

    #[test]
    fn json_array_shape() {
        let out = to_json(&[commitment("Je vais régler ça.", "I", None)]).unwrap();
        assert!(out.contains("régler"), "non-ASCII should be kept verbatim");
        let value: Value = serde_json::from_str(&out).unwrap();
        let first = &value.as_array().unwrap()[0];
        assert_eq!(first["kind"], "personal_promise");
        assert_eq!(first["status"], "unclear");
        assert_eq!(first["created_at"], "2024-02-03T04:05:06Z");
        assert_eq!(first["explicit_deadline_text"], Value::Null);
        assert_eq!(first["source"]["text"], json!("Je vais régler ça."));
    }

    #[test]
    fn json_roundtrip() {
        let original = vec![commitment("I will fix it.", "I", Some("soon"))];
        let out = to_json(&original).unwrap();
        let parsed: Vec<Commitment> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn format_parsing() {
        assert_eq!("markdown".parse::<OutputFormat>(), Ok(OutputFormat::Markdown));
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("table".parse::<OutputFormat>(), Ok(OutputFormat::Table));
        assert!("csv".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default().to_string(), "markdown");
    }

    #[test]
    fn render_dispatches() {
        let items = [commitment("I will fix it.", "I", None)];
        assert!(render(OutputFormat::Json, &items).unwrap().starts_with('['));
        assert!(render(OutputFormat::Markdown, &items).unwrap().starts_with("- **Promise**"));
        assert!(render(OutputFormat::Table, &items).unwrap().starts_with("WHO"));
    }
}
