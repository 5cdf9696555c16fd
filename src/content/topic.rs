//! Topic and Page models

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::GuideError;

/// How demanding a topic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    /// URL-safe key
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Difficulty {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" | "basic" | "intro" | "easy" => Ok(Difficulty::Beginner),
            "intermediate" | "medium" => Ok(Difficulty::Intermediate),
            "advanced" | "expert" | "hard" => Ok(Difficulty::Advanced),
            _ => Err(GuideError::InvalidDifficulty(s.to_string())),
        }
    }
}

/// A tutorial in the curriculum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// URL-friendly identifier, also used for prerequisite references
    pub slug: String,

    pub title: String,

    /// Section key this topic belongs to
    pub section: String,

    /// Position within the section
    pub order: Option<i64>,

    pub difficulty: Option<Difficulty>,

    /// Share of the certification exam, in percent
    pub exam_weight: Option<f64>,

    /// Slugs of topics to study first
    pub prerequisites: Vec<String>,

    pub tags: Vec<String>,

    pub description: Option<String>,

    pub date: Option<DateTime<Local>>,

    pub updated: Option<DateTime<Local>>,

    pub draft: bool,

    /// Raw markdown content
    pub raw: String,

    /// Rendered HTML content
    pub content: String,

    /// Rendered table of contents
    pub toc: String,

    pub word_count: usize,

    /// Estimated minutes to read
    pub reading_time: u32,

    /// Source file path (relative to the content dir)
    pub source: String,

    /// Full source file path
    pub full_source: PathBuf,

    /// URL path (without root)
    pub path: String,

    /// Full permalink URL
    pub permalink: String,

    /// Custom front-matter fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Topic {
    /// Create a topic with minimal required fields
    pub fn new(slug: &str, title: &str, section: &str) -> Self {
        Self {
            slug: slug.to_string(),
            title: title.to_string(),
            section: section.to_string(),
            order: None,
            difficulty: None,
            exam_weight: None,
            prerequisites: Vec::new(),
            tags: Vec::new(),
            description: None,
            date: None,
            updated: None,
            draft: false,
            raw: String::new(),
            content: String::new(),
            toc: String::new(),
            word_count: 0,
            reading_time: 0,
            source: String::new(),
            full_source: PathBuf::new(),
            path: String::new(),
            permalink: String::new(),
            extra: HashMap::new(),
        }
    }

    /// Whether the topic lists `slug` as a prerequisite
    pub fn requires(&self, slug: &str) -> bool {
        self.prerequisites.iter().any(|p| p == slug)
    }
}

/// A standalone page at the content root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub title: String,

    /// Raw markdown content
    pub raw: String,

    /// Rendered HTML content
    pub content: String,

    /// Layout template to use
    pub layout: String,

    /// Source file path (relative)
    pub source: String,

    /// URL path (without root)
    pub path: String,

    /// Full permalink URL
    pub permalink: String,

    pub updated: Option<DateTime<Local>>,
}

impl Page {
    pub fn new(title: String, source: String) -> Self {
        Self {
            title,
            raw: String::new(),
            content: String::new(),
            layout: "page".to_string(),
            source,
            path: String::new(),
            permalink: String::new(),
            updated: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_aliases() {
        assert_eq!("Beginner".parse::<Difficulty>().unwrap(), Difficulty::Beginner);
        assert_eq!("basic".parse::<Difficulty>().unwrap(), Difficulty::Beginner);
        assert_eq!(" medium ".parse::<Difficulty>().unwrap(), Difficulty::Intermediate);
        assert_eq!("EXPERT".parse::<Difficulty>().unwrap(), Difficulty::Advanced);
        assert!(matches!(
            "wizard".parse::<Difficulty>(),
            Err(GuideError::InvalidDifficulty(_))
        ));
    }

    #[test]
    fn test_difficulty_ordering() {
        assert!(Difficulty::Beginner < Difficulty::Intermediate);
        assert!(Difficulty::Intermediate < Difficulty::Advanced);
        assert_eq!(Difficulty::Advanced.as_str(), "advanced");
    }

    #[test]
    fn test_requires() {
        let mut topic = Topic::new("triggers", "Triggers", "basics");
        topic.prerequisites = vec!["dml".to_string()];
        assert!(topic.requires("dml"));
        assert!(!topic.requires("soql"));
    }
}
