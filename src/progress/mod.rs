//! Learner progress tracking
//!
//! Completed topic slugs are persisted as JSON next to the site config. The
//! report overlays them on the curriculum to derive percentages and the
//! per-topic status shown on every page.

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::curriculum::{Curriculum, PrerequisiteRef};
use crate::error::GuideError;

/// Persisted set of completed topics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressStore {
    pub completed: BTreeSet<String>,
    pub updated: Option<DateTime<Local>>,
    #[serde(skip)]
    path: PathBuf,
}

impl ProgressStore {
    /// Load from disk; a missing or unreadable file yields an empty store
    pub fn load(path: &Path) -> Self {
        let mut store = match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<ProgressStore>(&content) {
                Ok(store) => store,
                Err(e) => {
                    tracing::warn!("Ignoring corrupt progress file {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        };
        store.path = path.to_path_buf();
        store
    }

    /// Save to the path it was loaded from
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&self.path, content)?;
        tracing::debug!("Saved progress to {:?}", self.path);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_completed(&self, slug: &str) -> bool {
        self.completed.contains(slug)
    }

    /// Mark a topic complete; returns false if it already was
    pub fn complete(&mut self, slug: &str, curriculum: &Curriculum) -> Result<bool, GuideError> {
        if curriculum.get(slug).is_none() {
            return Err(GuideError::UnknownTopic(slug.to_string()));
        }
        let added = self.completed.insert(slug.to_string());
        if added {
            self.updated = Some(Local::now());
        }
        Ok(added)
    }

    /// Unmark a topic; returns false if it was not complete
    pub fn uncomplete(&mut self, slug: &str) -> bool {
        let removed = self.completed.remove(slug);
        if removed {
            self.updated = Some(Local::now());
        }
        removed
    }

    /// Flip completion; returns the new state
    pub fn toggle(&mut self, slug: &str, curriculum: &Curriculum) -> Result<bool, GuideError> {
        if curriculum.get(slug).is_none() {
            return Err(GuideError::UnknownTopic(slug.to_string()));
        }
        if self.uncomplete(slug) {
            Ok(false)
        } else {
            self.complete(slug, curriculum)
        }
    }

    pub fn reset(&mut self) {
        self.completed.clear();
        self.updated = Some(Local::now());
    }
}

/// Rounded percentage of `completed` over `total`, halves rounded up
pub fn percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total);
    ((completed * 200 + total) / (total * 2)) as u8
}

/// Where a learner stands on a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicStatus {
    Completed,
    /// Every known prerequisite is completed
    Available,
    /// Some known prerequisite is still open
    Locked,
}

impl TopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicStatus::Completed => "completed",
            TopicStatus::Available => "available",
            TopicStatus::Locked => "locked",
        }
    }
}

/// Completed out of total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Tally {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
}

impl Tally {
    pub fn new(completed: usize, total: usize) -> Self {
        Self {
            completed,
            total,
            percent: percentage(completed, total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionProgress {
    pub key: String,
    pub title: String,
    #[serde(flatten)]
    pub tally: Tally,
}

/// Progress overlaid on a curriculum
#[derive(Debug, Clone, Default)]
pub struct ProgressReport {
    pub overall: Tally,
    pub sections: Vec<SectionProgress>,
    statuses: HashMap<String, TopicStatus>,
    next_up: Option<String>,
}

impl ProgressReport {
    /// Compute statuses and tallies; completed slugs not in the curriculum are ignored
    pub fn build(curriculum: &Curriculum, store: &ProgressStore) -> Self {
        let mut statuses = HashMap::new();

        for topic in curriculum.topics() {
            let status = if store.is_completed(&topic.slug) {
                TopicStatus::Completed
            } else {
                let blocked = curriculum
                    .prerequisites_of(&topic.slug)
                    .iter()
                    .any(|p| match p {
                        PrerequisiteRef::Resolved(t) => {
                            t.slug != topic.slug && !store.is_completed(&t.slug)
                        }
                        PrerequisiteRef::Missing(_) => false,
                    });
                if blocked {
                    TopicStatus::Locked
                } else {
                    TopicStatus::Available
                }
            };
            statuses.insert(topic.slug.clone(), status);
        }

        let done = |slug: &str| statuses.get(slug) == Some(&TopicStatus::Completed);

        let completed = curriculum
            .topics()
            .iter()
            .filter(|t| done(&t.slug))
            .count();
        let overall = Tally::new(completed, curriculum.len());

        let sections = curriculum
            .sections()
            .into_iter()
            .map(|section| {
                let completed = section.topics.iter().filter(|t| done(&t.slug)).count();
                SectionProgress {
                    key: section.key,
                    title: section.title,
                    tally: Tally::new(completed, section.topics.len()),
                }
            })
            .collect();

        let next_up = curriculum
            .topics()
            .iter()
            .find(|t| statuses.get(&t.slug) == Some(&TopicStatus::Available))
            .map(|t| t.slug.clone());

        Self {
            overall,
            sections,
            statuses,
            next_up,
        }
    }

    /// Status of a topic; unknown slugs read as available
    pub fn status(&self, slug: &str) -> TopicStatus {
        self.statuses
            .get(slug)
            .copied()
            .unwrap_or(TopicStatus::Available)
    }

    pub fn section(&self, key: &str) -> Option<&SectionProgress> {
        self.sections.iter().find(|s| s.key == key)
    }

    /// First open, unlocked topic in study order
    pub fn next_up(&self) -> Option<&str> {
        self.next_up.as_deref()
    }
}
