//! Curriculum - topics in study order, grouped by section
//!
//! Canonical order is: section rank (configured sections by `order`, then
//! declaration position; unconfigured sections alphabetically after them),
//! then topic `order` (unordered topics last), then title, then slug.

use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::config::{SectionConfig, SiteConfig};
use crate::content::{Difficulty, Topic};

/// A section with its topics in canonical order
#[derive(Debug, Clone)]
pub struct SectionGroup<'a> {
    pub key: String,
    pub title: String,
    pub description: String,
    /// Configured weight, or the sum of the topics' weights
    pub exam_weight: Option<f64>,
    /// Sum of topic reading times, in minutes
    pub reading_time: u32,
    pub topics: Vec<&'a Topic>,
}

/// A prerequisite reference, resolved against the curriculum
#[derive(Debug, Clone, PartialEq)]
pub enum PrerequisiteRef<'a> {
    Resolved(&'a Topic),
    Missing(String),
}

impl PrerequisiteRef<'_> {
    pub fn slug(&self) -> &str {
        match self {
            PrerequisiteRef::Resolved(topic) => &topic.slug,
            PrerequisiteRef::Missing(slug) => slug,
        }
    }
}

/// Structural problems worth reporting; none of them block rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurriculumIssue {
    MissingPrerequisite { topic: String, prerequisite: String },
    SelfPrerequisite(String),
    PrerequisiteCycle(Vec<String>),
    UnknownSection { topic: String, section: String },
}

impl fmt::Display for CurriculumIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurriculumIssue::MissingPrerequisite {
                topic,
                prerequisite,
            } => write!(f, "{}: prerequisite '{}' does not exist", topic, prerequisite),
            CurriculumIssue::SelfPrerequisite(topic) => {
                write!(f, "{}: lists itself as a prerequisite", topic)
            }
            CurriculumIssue::PrerequisiteCycle(cycle) => {
                write!(f, "prerequisite cycle: {}", cycle.join(" -> "))
            }
            CurriculumIssue::UnknownSection { topic, section } => {
                write!(f, "{}: section '{}' is not declared in config", topic, section)
            }
        }
    }
}

/// The full set of topics in study order
#[derive(Debug, Clone, Default)]
pub struct Curriculum {
    topics: Vec<Topic>,
    index: HashMap<String, usize>,
    sections: IndexMap<String, SectionConfig>,
    /// Section keys in display order
    section_order: Vec<String>,
}

impl Curriculum {
    /// Build a curriculum, sorting topics into canonical order
    pub fn new(mut topics: Vec<Topic>, config: &SiteConfig) -> Self {
        topics.sort_by(|a, b| {
            config
                .section_rank(&a.section)
                .cmp(&config.section_rank(&b.section))
                .then_with(|| a.section.cmp(&b.section))
                .then_with(|| order_key(a).cmp(&order_key(b)))
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.slug.cmp(&b.slug))
        });

        let index = topics
            .iter()
            .enumerate()
            .map(|(i, t)| (t.slug.clone(), i))
            .collect();

        let mut section_order: Vec<String> = config.sections.keys().cloned().collect();
        section_order.sort_by_key(|key| config.section_rank(key));
        for topic in &topics {
            if !section_order.contains(&topic.section) {
                section_order.push(topic.section.clone());
            }
        }

        let sections = config
            .sections
            .iter()
            .map(|(key, section)| {
                let mut section = section.clone();
                section.title.get_or_insert_with(|| config.section_title(key));
                (key.clone(), section)
            })
            .collect();

        Self {
            topics,
            index,
            sections,
            section_order,
        }
    }

    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Look a topic up by slug
    pub fn get(&self, slug: &str) -> Option<&Topic> {
        self.index.get(slug).map(|&i| &self.topics[i])
    }

    /// Position of a topic in canonical order
    pub fn position(&self, slug: &str) -> Option<usize> {
        self.index.get(slug).copied()
    }

    /// All sections in display order; configured sections appear even when empty
    pub fn sections(&self) -> Vec<SectionGroup<'_>> {
        self.section_order
            .iter()
            .map(|key| self.build_section(key))
            .collect()
    }

    /// A single section by key
    pub fn section(&self, key: &str) -> Option<SectionGroup<'_>> {
        self.section_order
            .iter()
            .any(|k| k == key)
            .then(|| self.build_section(key))
    }

    fn build_section(&self, key: &str) -> SectionGroup<'_> {
        let topics: Vec<&Topic> = self.topics.iter().filter(|t| t.section == key).collect();
        let config = self.sections.get(key);

        let derived_weight = topics
            .iter()
            .filter_map(|t| t.exam_weight)
            .fold(None, |acc: Option<f64>, w| Some(acc.unwrap_or(0.0) + w));

        SectionGroup {
            key: key.to_string(),
            title: config
                .and_then(|c| c.title.clone())
                .unwrap_or_else(|| crate::config::humanize(key)),
            description: config.map(|c| c.description.clone()).unwrap_or_default(),
            exam_weight: config.and_then(|c| c.exam_weight).or(derived_weight),
            reading_time: topics.iter().map(|t| t.reading_time).sum(),
            topics,
        }
    }

    pub fn filter_by_difficulty(&self, difficulty: Difficulty) -> Vec<&Topic> {
        self.topics
            .iter()
            .filter(|t| t.difficulty == Some(difficulty))
            .collect()
    }

    pub fn filter_by_tag(&self, tag: &str) -> Vec<&Topic> {
        self.topics
            .iter()
            .filter(|t| t.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
            .collect()
    }

    /// Number of topics per difficulty; topics without one are not counted
    pub fn difficulty_counts(&self) -> BTreeMap<Difficulty, usize> {
        let mut counts = BTreeMap::new();
        for difficulty in self.topics.iter().filter_map(|t| t.difficulty) {
            *counts.entry(difficulty).or_insert(0) += 1;
        }
        counts
    }

    /// Sorted, de-duplicated tags with topic counts
    pub fn tag_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for tag in self.topics.iter().flat_map(|t| t.tags.iter()) {
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Topic before `slug` in study order
    pub fn prev(&self, slug: &str) -> Option<&Topic> {
        let pos = self.position(slug)?;
        pos.checked_sub(1).map(|i| &self.topics[i])
    }

    /// Topic after `slug` in study order
    pub fn next(&self, slug: &str) -> Option<&Topic> {
        let pos = self.position(slug)?;
        self.topics.get(pos + 1)
    }

    /// Prerequisites of a topic, resolved where possible
    pub fn prerequisites_of(&self, slug: &str) -> Vec<PrerequisiteRef<'_>> {
        let Some(topic) = self.get(slug) else {
            return Vec::new();
        };
        topic
            .prerequisites
            .iter()
            .map(|p| match self.get(p) {
                Some(found) => PrerequisiteRef::Resolved(found),
                None => PrerequisiteRef::Missing(p.clone()),
            })
            .collect()
    }

    /// Topics that list `slug` as a prerequisite
    pub fn dependents_of(&self, slug: &str) -> Vec<&Topic> {
        self.topics
            .iter()
            .filter(|t| t.slug != slug && t.requires(slug))
            .collect()
    }

    /// Sum of section weights
    pub fn total_exam_weight(&self) -> f64 {
        self.sections().iter().filter_map(|s| s.exam_weight).sum()
    }

    /// Total reading time in minutes
    pub fn total_reading_time(&self) -> u32 {
        self.topics.iter().map(|t| t.reading_time).sum()
    }

    /// Report dangling, self-referencing and cyclic prerequisites
    pub fn issues(&self) -> Vec<CurriculumIssue> {
        let mut issues = Vec::new();

        for topic in &self.topics {
            if !self.sections.is_empty() && !self.sections.contains_key(&topic.section) {
                issues.push(CurriculumIssue::UnknownSection {
                    topic: topic.slug.clone(),
                    section: topic.section.clone(),
                });
            }
            let prerequisites: BTreeSet<&String> = topic.prerequisites.iter().collect();
            for prereq in prerequisites {
                if prereq == &topic.slug {
                    issues.push(CurriculumIssue::SelfPrerequisite(topic.slug.clone()));
                } else if self.get(prereq).is_none() {
                    issues.push(CurriculumIssue::MissingPrerequisite {
                        topic: topic.slug.clone(),
                        prerequisite: prereq.clone(),
                    });
                }
            }
        }

        issues.extend(
            self.find_cycles()
                .into_iter()
                .map(CurriculumIssue::PrerequisiteCycle),
        );
        issues
    }

    /// Strongly connected prerequisite groups, each listed in canonical
    /// order with the first slug repeated at the end
    fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(self.topics.len(), 0);
        let nodes: Vec<NodeIndex> = (0..self.topics.len()).map(|i| graph.add_node(i)).collect();

        for (i, topic) in self.topics.iter().enumerate() {
            for prereq in &topic.prerequisites {
                if prereq == &topic.slug {
                    continue;
                }
                if let Some(j) = self.position(prereq) {
                    graph.update_edge(nodes[i], nodes[j], ());
                }
            }
        }

        let mut cycles: Vec<Vec<usize>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut members: Vec<usize> = component.into_iter().map(|n| graph[n]).collect();
                members.sort_unstable();
                members
            })
            .collect();
        cycles.sort();

        cycles
            .into_iter()
            .map(|members| {
                let mut slugs: Vec<String> = members
                    .iter()
                    .map(|&k| self.topics[k].slug.clone())
                    .collect();
                slugs.push(self.topics[members[0]].slug.clone());
                slugs
            })
            .collect()
    }
}

fn order_key(topic: &Topic) -> (bool, i64) {
    (topic.order.is_none(), topic.order.unwrap_or(0))
}
