//! Front-matter parsing

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Tags and prerequisites: a list, a comma-separated string, or nothing
fn string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_yaml::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_yaml::Value::Null) => Ok(Vec::new()),
        Some(serde_yaml::Value::Sequence(items)) => Ok(items
            .iter()
            .filter_map(scalar_text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()),
        Some(other) => match scalar_text(&other) {
            Some(text) => Ok(split_inline_list(&text)),
            None => Err(serde::de::Error::custom(
                "expected a string or a list of strings",
            )),
        },
    }
}

/// `tags: [apex, 2024]` keeps the number as a tag
fn scalar_text(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `prerequisites: apex-basics, soql` is accepted as two entries
fn split_inline_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Exam weight as written in front-matter
#[derive(Deserialize)]
#[serde(untagged)]
enum RawWeight {
    Number(f64),
    Text(String),
}

/// Exam weight given as `12`, `12.5` or `"12%"`
fn percent_or_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawWeight>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawWeight::Number(n)) => Ok(Some(n)),
        Some(RawWeight::Text(text)) => {
            let trimmed = text.trim().trim_end_matches('%').trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<f64>().map(Some).map_err(|_| {
                serde::de::Error::custom(format!("invalid exam weight: {}", text))
            })
        }
    }
}

/// Front-matter data from a topic or page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub section: Option<String>,
    pub order: Option<i64>,
    pub difficulty: Option<String>,
    #[serde(deserialize_with = "percent_or_number", default)]
    pub exam_weight: Option<f64>,
    #[serde(deserialize_with = "string_or_vec", default)]
    pub prerequisites: Vec<String>,
    #[serde(deserialize_with = "string_or_vec", default)]
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub layout: Option<String>,
    pub date: Option<String>,
    pub updated: Option<String>,
    pub draft: bool,
    /// Minutes, overrides the computed reading time
    pub reading_time: Option<u32>,

    /// Additional custom fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str)> {
        let content = content.trim_start_matches('\u{feff}').trim_start();

        if content.starts_with("---") {
            return Self::parse_yaml(content);
        }

        if content.starts_with(";;;") || content.starts_with('{') {
            return Self::parse_json(content);
        }

        Ok((FrontMatter::default(), content))
    }

    fn parse_yaml(content: &str) -> Result<(Self, &str)> {
        let rest = &content[3..];
        let rest = rest.trim_start_matches(['\n', '\r']);

        let Some(end_pos) = rest.find("\n---") else {
            return Ok((FrontMatter::default(), content));
        };

        let yaml_content = &rest[..end_pos];
        let remaining = &rest[end_pos + 4..];
        let remaining = remaining.trim_start_matches(['\n', '\r']);

        if yaml_content.trim().is_empty() {
            return Ok((FrontMatter::default(), remaining));
        }

        // A `---` rule followed by prose is markdown, not front-matter
        if !looks_like_yaml(yaml_content) {
            return Ok((FrontMatter::default(), content));
        }

        match serde_yaml::from_str::<FrontMatter>(yaml_content) {
            Ok(fm) => Ok((fm, remaining)),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse YAML front-matter, treating as content: {}",
                    e
                );
                Ok((FrontMatter::default(), content))
            }
        }
    }

    fn parse_json(content: &str) -> Result<(Self, &str)> {
        // `;;;` fences wrap a bare JSON object body
        if let Some(rest) = content.strip_prefix(";;;") {
            let end_pos = rest
                .find(";;;")
                .ok_or_else(|| anyhow!("Unterminated ;;; front-matter"))?;
            let body = rest[..end_pos].trim();
            let json = if body.starts_with('{') {
                body.to_string()
            } else {
                format!("{{{}}}", body)
            };
            let fm: FrontMatter = serde_json::from_str(&json)
                .map_err(|e| anyhow!("Failed to parse JSON front-matter: {}", e))?;
            return Ok((fm, rest[end_pos + 3..].trim_start_matches(['\n', '\r'])));
        }

        // A leading object; the stream deserializer reports where it ends
        let mut stream = serde_json::Deserializer::from_str(content).into_iter::<FrontMatter>();
        match stream.next() {
            Some(Ok(fm)) => {
                let remaining = content[stream.byte_offset()..].trim_start_matches(['\n', '\r']);
                Ok((fm, remaining))
            }
            Some(Err(e)) => Err(anyhow!("Failed to parse JSON front-matter: {}", e)),
            None => Err(anyhow!("Invalid JSON front-matter")),
        }
    }

    /// Parse the date string into a DateTime
    pub fn parse_date(&self) -> Option<DateTime<Local>> {
        self.date.as_ref().and_then(|s| parse_date_string(s))
    }

    /// Parse the updated date string into a DateTime
    pub fn parse_updated(&self) -> Option<DateTime<Local>> {
        self.updated.as_ref().and_then(|s| parse_date_string(s))
    }
}

/// At least one `key: value` line with a plain identifier key
fn looks_like_yaml(block: &str) -> bool {
    block.lines().any(|line| {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return false;
        }
        let Some(colon_pos) = trimmed.find(':') else {
            return false;
        };
        let key = &trimmed[..colon_pos];
        let is_valid_key = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
            && !matches!(key, "http" | "https" | "ftp");
        let after_colon = &trimmed[colon_pos + 1..];
        is_valid_key && (after_colon.is_empty() || after_colon.starts_with(' '))
    })
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// RFC 3339, a handful of local datetime layouts, or a bare date at midnight
fn parse_date_string(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    naive.and_local_timezone(Local).earliest()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_topic_frontmatter() {
        let content = r#"---
title: Apex Triggers
section: basics
order: 4
difficulty: intermediate
exam_weight: 12
prerequisites:
  - apex-classes
  - dml
tags: [apex, triggers]
---

Triggers run before or after DML.
"#;

        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Apex Triggers"));
        assert_eq!(fm.section.as_deref(), Some("basics"));
        assert_eq!(fm.order, Some(4));
        assert_eq!(fm.difficulty.as_deref(), Some("intermediate"));
        assert_eq!(fm.exam_weight, Some(12.0));
        assert_eq!(fm.prerequisites, vec!["apex-classes", "dml"]);
        assert_eq!(fm.tags, vec!["apex", "triggers"]);
        assert!(remaining.starts_with("Triggers run"));
    }

    #[test]
    fn test_single_string_prerequisites_and_percent_weight() {
        let content = r#"---
title: Callouts
prerequisites: apex-basics, named-credentials
exam_weight: "7.5%"
---
Body
"#;
        let (fm, _) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.prerequisites, vec!["apex-basics", "named-credentials"]);
        assert_eq!(fm.exam_weight, Some(7.5));
    }

    #[test]
    fn test_numeric_tags_kept() {
        let (fm, _) = FrontMatter::parse("---\ntags: [apex, 2024]\nprerequisites: ~\n---\n").unwrap();
        assert_eq!(fm.tags, vec!["apex", "2024"]);
        assert!(fm.prerequisites.is_empty());
    }

    #[test]
    fn test_missing_fields_default() {
        let (fm, remaining) = FrontMatter::parse("---\ntitle: Only Title\n---\nText").unwrap();
        assert_eq!(fm.section, None);
        assert_eq!(fm.order, None);
        assert_eq!(fm.exam_weight, None);
        assert!(fm.prerequisites.is_empty());
        assert!(!fm.draft);
        assert_eq!(remaining, "Text");
    }

    #[test]
    fn test_parse_json_frontmatter() {
        let content = r#"{"title": "SOQL", "order": 2, "prerequisites": ["sobjects"]}

Queries.
"#;
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("SOQL"));
        assert_eq!(fm.order, Some(2));
        assert_eq!(fm.prerequisites, vec!["sobjects"]);
        assert!(remaining.contains("Queries."));
    }

    #[test]
    fn test_json_braces_inside_strings() {
        let content = "{\"title\": \"Maps {key: value}\", \"tags\": \"apex\"}\nBody {not json}\n";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Maps {key: value}"));
        assert_eq!(fm.tags, vec!["apex"]);
        assert_eq!(remaining, "Body {not json}\n");
    }

    #[test]
    fn test_fenced_json_frontmatter() {
        let content = ";;;\n\"title\": \"Flows\",\n\"exam_weight\": \"5%\"\n;;;\nBody";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Flows"));
        assert_eq!(fm.exam_weight, Some(5.0));
        assert_eq!(remaining, "Body");
    }

    #[test]
    fn test_no_frontmatter() {
        let (fm, remaining) = FrontMatter::parse("# Heading\n\nText").unwrap();
        assert_eq!(fm.title, None);
        assert!(remaining.starts_with("# Heading"));
    }

    #[test]
    fn test_markdown_rule_not_yaml() {
        let content = r#"
---

Governor limits apply per transaction:
- 100 SOQL queries
- 150 DML statements

---
More content here.
"#;
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title, None);
        assert!(remaining.contains("Governor limits"));
    }

    #[test]
    fn test_url_line_not_yaml() {
        let content = "---\nSee https://developer.salesforce.com for docs\n---\nRest";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title, None);
        assert!(remaining.contains("developer.salesforce.com"));
    }

    #[test]
    fn test_invalid_yaml_kept_as_content() {
        let content = "---\ntitle: [unclosed\n---\nBody";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title, None);
        assert!(remaining.contains("Body"));
    }

    #[test]
    fn test_parse_date() {
        let fm = FrontMatter {
            date: Some("2024-01-15 10:30:00".to_string()),
            updated: Some("2024/02/01".to_string()),
            ..Default::default()
        };
        assert_eq!(
            fm.parse_date().unwrap().format("%Y-%m-%d").to_string(),
            "2024-01-15"
        );
        assert_eq!(
            fm.parse_updated().unwrap().format("%Y-%m-%d").to_string(),
            "2024-02-01"
        );
    }
}
