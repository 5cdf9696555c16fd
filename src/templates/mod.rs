//! Built-in guide theme using the Tera template engine
//!
//! Templates are embedded in the binary. Context structs below are the only
//! shapes templates see; the generator builds them from the curriculum.
//! Links in the context are site paths without the root; templates prefix
//! them with `base`, which is either the configured root or a page-relative
//! prefix.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::helpers;
use crate::progress::Tally;

/// Stylesheet written to `css/guide.css` unless the static dir provides one
pub const STYLESHEET: &str = include_str!("theme/guide.css");

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        // Tera's default escaper also rewrites `/`, which mangles every href
        tera.set_escape_fn(helpers::html_escape);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("section.html", include_str!("theme/section.html")),
            ("topic.html", include_str!("theme/topic.html")),
            ("difficulty.html", include_str!("theme/difficulty.html")),
            ("page.html", include_str!("theme/page.html")),
            ("partials/head.html", include_str!("theme/partials/head.html")),
            (
                "partials/header.html",
                include_str!("theme/partials/header.html"),
            ),
            (
                "partials/footer.html",
                include_str!("theme/partials/footer.html"),
            ),
            (
                "partials/progress.html",
                include_str!("theme/partials/progress.html"),
            ),
            (
                "partials/topic_card.html",
                include_str!("theme/partials/topic_card.html"),
            ),
        ])?;

        tera.register_filter("strip_html", strip_html_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);
        tera.register_filter("date_format", date_format_filter);
        tera.register_filter("minutes", minutes_filter);
        tera.register_filter("progress_bar", progress_bar_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: strip HTML tags
fn strip_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    Ok(tera::Value::String(helpers::strip_html(&s)))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 160,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };
    Ok(tera::Value::String(helpers::truncate(
        &s,
        length,
        Some(&omission),
    )))
}

/// Tera filter: reformat an RFC 3339 timestamp with a moment-style pattern
fn date_format_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("date_format", "value", String, value);
    let format = match args.get("format") {
        Some(val) => tera::try_get_value!("date_format", "format", String, val),
        None => "YYYY-MM-DD".to_string(),
    };

    match chrono::DateTime::parse_from_rfc3339(&s) {
        Ok(date) => Ok(tera::Value::String(helpers::format_date(&date, &format))),
        // Not a timestamp; pass it through untouched
        Err(_) => Ok(tera::Value::String(s)),
    }
}

/// Tera filter: minutes as `12 min` or `1 h 5 min`
fn minutes_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let minutes = tera::try_get_value!("minutes", "value", u64, value);
    Ok(tera::Value::String(format_minutes(minutes)))
}

/// Tera filter: percentage as an inline progress bar
fn progress_bar_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let percent = tera::try_get_value!("progress_bar", "value", u64, value);
    Ok(tera::Value::String(helpers::progress_bar(
        percent.min(100) as u8,
    )))
}

pub fn format_minutes(minutes: u64) -> String {
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{} min", m),
        (h, 0) => format!("{} h", h),
        (h, m) => format!("{} h {} min", h, m),
    }
}

// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub url: String,
    pub root: String,
    pub difficulty_dir: String,
    pub exam_name: String,
    pub passing_score: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuItem {
    pub name: String,
    pub url: String,
    /// External URLs are used as-is, site paths get the `base` prefix
    pub external: bool,
}

/// Curriculum-wide data available on every page
#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub sections: Vec<SectionData>,
    pub difficulties: Vec<DifficultyData>,
    pub tags: Vec<TagData>,
    pub pages: Vec<PageLink>,
    pub topic_count: usize,
    pub reading_time: u32,
    /// Sum of section weights, empty when no weights are set
    pub exam_weight: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub key: String,
    pub title: String,
    pub description: String,
    pub path: String,
    pub exam_weight: Option<String>,
    pub reading_time: u32,
    pub topics: Vec<NavTopic>,
    pub progress: ProgressData,
}

/// Compact topic reference for lists and navigation
#[derive(Debug, Clone, Serialize)]
pub struct NavTopic {
    pub slug: String,
    pub title: String,
    pub path: String,
    pub section: String,
    pub order: Option<i64>,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub difficulty_key: Option<String>,
    pub reading_time: u32,
    pub status: String,
}

/// Everything a topic page shows
#[derive(Debug, Clone, Serialize)]
pub struct TopicData {
    #[serde(flatten)]
    pub nav: NavTopic,
    pub section_title: String,
    pub section_path: String,
    pub permalink: String,
    pub exam_weight: Option<String>,
    pub tags: Vec<String>,
    pub content: String,
    pub toc: String,
    pub word_count: usize,
    pub date: Option<String>,
    pub updated: Option<String>,
    /// 1-based position in study order
    pub position: usize,
    pub prerequisites: Vec<PrereqData>,
    pub dependents: Vec<NavTopic>,
    pub prev: Option<NavTopic>,
    pub next: Option<NavTopic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrereqData {
    pub slug: String,
    pub title: String,
    /// None when the prerequisite does not exist
    pub path: Option<String>,
    pub status: String,
    pub missing: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProgressData {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl From<Tally> for ProgressData {
    fn from(tally: Tally) -> Self {
        Self {
            completed: tally.completed,
            total: tally.total,
            percent: tally.percent,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DifficultyData {
    pub key: String,
    pub label: String,
    pub path: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagData {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageLink {
    pub title: String,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apply(
        filter: fn(&tera::Value, &HashMap<String, tera::Value>) -> tera::Result<tera::Value>,
        value: tera::Value,
        args: &[(&str, tera::Value)],
    ) -> String {
        let args = args
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        filter(&value, &args).unwrap().as_str().unwrap().to_string()
    }

    #[test]
    fn test_templates_parse() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn test_format_minutes() {
        assert_eq!(format_minutes(1), "1 min");
        assert_eq!(format_minutes(12), "12 min");
        assert_eq!(format_minutes(60), "1 h");
        assert_eq!(format_minutes(65), "1 h 5 min");
    }

    #[test]
    fn test_date_format_filter() {
        let date = json!("2024-03-09T10:00:00+01:00");
        assert_eq!(
            apply(date_format_filter, date.clone(), &[]),
            "2024-03-09"
        );
        assert_eq!(
            apply(date_format_filter, date, &[("format", json!("MMM D, YYYY"))]),
            "Mar 9, 2024"
        );
        assert_eq!(apply(date_format_filter, json!("soon"), &[]), "soon");
    }

    #[test]
    fn test_text_filters() {
        assert_eq!(
            apply(strip_html_filter, json!("<p>SOQL <em>joins</em></p>"), &[]),
            "SOQL joins"
        );
        assert_eq!(
            apply(
                truncate_chars_filter,
                json!("Asynchronous Apex"),
                &[("length", json!(10))]
            ),
            "Asynchr..."
        );
        assert!(apply(progress_bar_filter, json!(55), &[]).contains("width: 55%"));
        assert_eq!(apply(minutes_filter, json!(90), &[]), "1 h 30 min");
    }
}
