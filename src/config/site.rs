//! Site configuration (_config.yml / _config.toml)

use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::GuideError;

/// Config file names probed in order
pub const CONFIG_FILES: [&str; 2] = ["_config.yml", "_config.toml"];

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,
    pub topic_permalink: String,
    pub difficulty_dir: String,
    /// Emit page-relative links instead of root-prefixed ones
    pub relative_link: bool,

    // Directory
    pub source_dir: String,
    pub public_dir: String,
    pub static_dir: String,
    #[serde(default)]
    pub ignore: Vec<String>,

    // Writing
    pub render_drafts: bool,
    pub words_per_minute: u32,
    pub toc_depth: usize,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Curriculum
    #[serde(default)]
    pub sections: IndexMap<String, SectionConfig>,
    #[serde(default)]
    pub exam: ExamConfig,
    pub progress_file: String,

    // Navigation
    #[serde(default)]
    pub menu: IndexMap<String, String>,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Salesforce Developer Guide".to_string(),
            subtitle: String::new(),
            description: String::new(),
            author: String::new(),
            language: "en".to_string(),
            timezone: String::new(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),
            topic_permalink: ":section/:slug/".to_string(),
            difficulty_dir: "difficulty".to_string(),
            relative_link: false,

            source_dir: "content".to_string(),
            public_dir: "public".to_string(),
            static_dir: "static".to_string(),
            ignore: Vec::new(),

            render_drafts: false,
            words_per_minute: 200,
            toc_depth: 3,
            highlight: HighlightConfig::default(),

            sections: IndexMap::new(),
            exam: ExamConfig::default(),
            progress_file: ".progress.json".to_string(),

            menu: IndexMap::new(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file, picking the parser from its extension
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: SiteConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => serde_yaml::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => return Err(GuideError::UnsupportedConfig(path.to_path_buf()).into()),
        };
        Ok(config)
    }

    /// Find the config file in a base directory, if any
    pub fn locate(base_dir: &Path) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| base_dir.join(name))
            .find(|p| p.exists())
    }

    /// Rank of a section key: configured sections first (by `order`, then
    /// declaration position), everything else after
    pub fn section_rank(&self, key: &str) -> (u8, i64, usize) {
        match self.sections.get_full(key) {
            Some((index, _, section)) => (0, section.order.unwrap_or(i64::MAX), index),
            None => (1, 0, 0),
        }
    }

    /// Display title for a section key
    pub fn section_title(&self, key: &str) -> String {
        self.sections
            .get(key)
            .and_then(|s| s.title.clone())
            .unwrap_or_else(|| humanize(key))
    }

    /// Current time in the configured timezone, or local time
    pub fn now(&self) -> chrono::DateTime<chrono::FixedOffset> {
        let utc = chrono::Utc::now();
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) if !self.timezone.is_empty() => utc.with_timezone(&tz).fixed_offset(),
            _ => utc.with_timezone(&chrono::Local).fixed_offset(),
        }
    }
}

/// A curriculum section declared in config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfig {
    pub title: Option<String>,
    pub description: String,
    pub order: Option<i64>,
    pub exam_weight: Option<f64>,
}

/// Certification exam the curriculum prepares for
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamConfig {
    pub name: String,
    pub passing_score: Option<f64>,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            name: "Platform Developer I".to_string(),
            passing_score: None,
        }
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub line_number: bool,
    pub theme: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            line_number: true,
            theme: "base16-ocean.dark".to_string(),
        }
    }
}

/// Turn a key like `apex-triggers` into `Apex Triggers`
pub fn humanize(key: &str) -> String {
    key.split(['-', '_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
