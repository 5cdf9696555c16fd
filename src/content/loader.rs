//! Content loader - loads topics and pages from the content directory

use anyhow::Result;
use chrono::Local;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::{Difficulty, FrontMatter, MarkdownRenderer, Page, ReadingStats, Topic};
use crate::config::humanize;
use crate::helpers::{full_url_for, toc};
use crate::Guide;

lazy_static! {
    /// `03-apex-triggers` -> order 3, name `apex-triggers`
    static ref ORDER_PREFIX: Regex = Regex::new(r"^(\d+)[-_. ]+(.+)$").unwrap();
}

/// Loads content from the content directory
pub struct ContentLoader<'a> {
    guide: &'a Guide,
    renderer: MarkdownRenderer,
    ignore: Vec<glob::Pattern>,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(guide: &'a Guide) -> Self {
        let renderer = MarkdownRenderer::with_options(
            &guide.config.highlight.theme,
            guide.config.highlight.line_number,
        );

        let ignore = guide
            .config
            .ignore
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!("Ignoring invalid ignore pattern {:?}: {}", p, e);
                    None
                }
            })
            .collect();

        Self {
            guide,
            renderer,
            ignore,
        }
    }

    /// Markdown files under the content dir, sorted, skipping `_`/`.` entries
    /// and ignored paths. Yields (full path, path relative to the content dir).
    fn markdown_files(&self) -> Vec<(std::path::PathBuf, std::path::PathBuf)> {
        let source_dir = &self.guide.source_dir;
        if !source_dir.exists() {
            return Vec::new();
        }

        WalkDir::new(source_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && is_markdown_file(e.path()))
            .filter_map(|e| {
                let relative = e.path().strip_prefix(source_dir).ok()?.to_path_buf();
                if self.ignore.iter().any(|p| p.matches_path(&relative)) {
                    tracing::debug!("Ignored: {:?}", relative);
                    return None;
                }
                Some((e.path().to_path_buf(), relative))
            })
            .collect()
    }

    /// Load all topics; files directly in the content root are pages
    pub fn load_topics(&self) -> Result<Vec<Topic>> {
        let mut topics = Vec::new();
        let mut seen = HashSet::new();

        for (path, relative) in self.markdown_files() {
            let mut components = relative.components();
            let Some(first) = components.next() else {
                continue;
            };
            if components.next().is_none() {
                continue;
            }
            let dir_section = first.as_os_str().to_string_lossy().to_string();

            match self.load_topic(&path, &relative, &dir_section) {
                Ok(Some(topic)) => {
                    if seen.insert(topic.slug.clone()) {
                        topics.push(topic);
                    } else {
                        tracing::warn!(
                            "Duplicate topic slug '{}' in {:?}, skipping",
                            topic.slug,
                            path
                        );
                    }
                }
                Ok(None) => tracing::debug!("Skipped draft: {:?}", path),
                Err(e) => tracing::warn!("Failed to load topic {:?}: {}", path, e),
            }
        }

        Ok(topics)
    }

    /// Load a single topic; `None` for drafts when drafts are not rendered
    fn load_topic(&self, path: &Path, relative: &Path, dir_section: &str) -> Result<Option<Topic>> {
        let content = fs::read_to_string(path)?;
        let (fm, body) = FrontMatter::parse(&content)?;

        if fm.draft && !self.guide.config.render_drafts {
            return Ok(None);
        }

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled");
        let (prefix_order, name) = split_order_prefix(stem);

        let slug = fm
            .slug
            .as_deref()
            .map(slug::slugify)
            .unwrap_or_else(|| slug::slugify(name));
        let title = fm.title.clone().unwrap_or_else(|| humanize(name));
        let section = fm
            .section
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(dir_section)
            .to_string();

        let difficulty = fm.difficulty.as_deref().and_then(|d| {
            d.parse::<Difficulty>()
                .map_err(|e| tracing::warn!("{:?}: {}", path, e))
                .ok()
        });

        let file_modified = fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .map(chrono::DateTime::<Local>::from);

        let stats = ReadingStats::from_markdown(body, self.guide.config.words_per_minute);
        let html = self.renderer.render(body)?;

        let mut topic = Topic::new(&slug, &title, &section);
        topic.date = fm.parse_date();
        topic.updated = fm.parse_updated().or(file_modified);
        topic.order = fm.order.or(prefix_order);
        topic.difficulty = difficulty;
        topic.exam_weight = fm.exam_weight;
        topic.prerequisites = fm.prerequisites.iter().map(|p| slug::slugify(p)).collect();
        topic.tags = fm.tags;
        topic.description = fm.description;
        topic.draft = fm.draft;
        topic.raw = body.to_string();
        topic.toc = toc(&html, self.guide.config.toc_depth);
        topic.content = html;
        topic.word_count = stats.words;
        topic.reading_time = fm.reading_time.unwrap_or(stats.minutes);
        topic.source = relative.to_string_lossy().to_string();
        topic.full_source = path.to_path_buf();
        topic.path = self.topic_path(&topic);
        topic.permalink = full_url_for(&self.guide.config, &topic.path);
        topic.extra = fm.extra;

        Ok(Some(topic))
    }

    /// Expand the topic permalink pattern (relative to the site root)
    fn topic_path(&self, topic: &Topic) -> String {
        let order = topic.order.map(|o| o.to_string()).unwrap_or_default();
        let path = self
            .guide
            .config
            .topic_permalink
            .replace(":section", &slug::slugify(&topic.section))
            .replace(":slug", &topic.slug)
            .replace(":order", &order);
        normalize_path(&path)
    }

    /// Load standalone pages from the content root
    pub fn load_pages(&self) -> Result<Vec<Page>> {
        let mut pages = Vec::new();

        for (path, relative) in self.markdown_files() {
            if relative.components().count() != 1 {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
            if stem == "index" {
                // The curriculum overview owns the index
                continue;
            }

            match self.load_page(&path, &relative, stem) {
                Ok(page) => pages.push(page),
                Err(e) => tracing::warn!("Failed to load page {:?}: {}", path, e),
            }
        }

        Ok(pages)
    }

    fn load_page(&self, path: &Path, relative: &Path, stem: &str) -> Result<Page> {
        let content = fs::read_to_string(path)?;
        let (fm, body) = FrontMatter::parse(&content)?;

        let title = fm.title.clone().unwrap_or_else(|| humanize(stem));
        let mut page = Page::new(title, relative.to_string_lossy().to_string());
        page.raw = body.to_string();
        page.content = self.renderer.render(body)?;
        page.layout = fm.layout.clone().unwrap_or_else(|| "page".to_string());
        page.path = normalize_path(&slug::slugify(stem));
        page.permalink = full_url_for(&self.guide.config, &page.path);
        page.updated = fm.parse_updated().or_else(|| {
            fs::metadata(path)
                .and_then(|m| m.modified())
                .ok()
                .map(chrono::DateTime::<Local>::from)
        });

        Ok(page)
    }
}

/// Split a numeric ordering prefix off a file stem
pub fn split_order_prefix(stem: &str) -> (Option<i64>, &str) {
    match ORDER_PREFIX.captures(stem) {
        Some(caps) => {
            let order = caps.get(1).and_then(|m| m.as_str().parse().ok());
            let name = caps.get(2).map(|m| m.as_str()).unwrap_or(stem);
            (order, name)
        }
        None => (None, stem),
    }
}

/// `/a//b` -> `a/b/`
fn normalize_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!("{}/", parts.join("/"))
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str()
        .map(|s| s.starts_with('_') || s.starts_with('.'))
        .unwrap_or(false)
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn site() -> (TempDir, Guide) {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        write(
            &content,
            "basics/01-apex-intro.md",
            "---\ntitle: Intro to Apex\ndifficulty: beginner\nexam_weight: 5\n---\n# Apex\n\nHello Apex.\n",
        );
        write(
            &content,
            "basics/02-dml.md",
            "---\nprerequisites: Apex Intro\n---\nDML text\n",
        );
        write(
            &content,
            "basics/draft.md",
            "---\ntitle: WIP\ndraft: true\n---\nnot yet\n",
        );
        write(
            &content,
            "testing/unit-tests.md",
            "---\nsection: testing\norder: 7\ndifficulty: wizard\n---\nTests\n",
        );
        write(&content, "_partials/skip.md", "---\ntitle: skip\n---\n");
        write(&content, "about.md", "---\ntitle: About\n---\nAbout us\n");
        write(&content, "index.md", "ignored");
        let guide = Guide::new(dir.path()).unwrap();
        (dir, guide)
    }

    #[test]
    fn test_load_topics() {
        let (_dir, guide) = site();
        let loader = ContentLoader::new(&guide);
        let topics = loader.load_topics().unwrap();

        // 4 topic files, minus one draft
        assert_eq!(topics.len(), 3);

        let intro = topics.iter().find(|t| t.slug == "apex-intro").unwrap();
        assert_eq!(intro.title, "Intro to Apex");
        assert_eq!(intro.section, "basics");
        assert_eq!(intro.order, Some(1));
        assert_eq!(intro.difficulty, Some(Difficulty::Beginner));
        assert_eq!(intro.exam_weight, Some(5.0));
        assert_eq!(intro.path, "basics/apex-intro/");
        assert_eq!(intro.permalink, "http://example.com/basics/apex-intro/");
        assert!(intro.toc.contains("toc-item"));
        assert_eq!(intro.reading_time, 1);

        let dml = topics.iter().find(|t| t.slug == "dml").unwrap();
        assert_eq!(dml.title, "Dml");
        assert_eq!(dml.prerequisites, vec!["apex-intro"]);

        let tests = topics.iter().find(|t| t.slug == "unit-tests").unwrap();
        assert_eq!(tests.order, Some(7));
        assert_eq!(tests.difficulty, None);
    }

    #[test]
    fn test_render_drafts() {
        let (_dir, mut guide) = site();
        guide.config.render_drafts = true;
        let topics = ContentLoader::new(&guide).load_topics().unwrap();
        assert_eq!(topics.len(), 4);
    }

    #[test]
    fn test_ignore_patterns() {
        let (_dir, mut guide) = site();
        guide.config.ignore = vec!["testing/*".to_string()];
        let topics = ContentLoader::new(&guide).load_topics().unwrap();
        assert!(topics.iter().all(|t| t.section != "testing"));
    }

    #[test]
    fn test_duplicate_slugs_first_wins() {
        let (dir, guide) = site();
        write(
            &dir.path().join("content"),
            "integration/dml.md",
            "---\ntitle: Other DML\n---\n",
        );
        let topics = ContentLoader::new(&guide).load_topics().unwrap();
        let dml: Vec<_> = topics.iter().filter(|t| t.slug == "dml").collect();
        assert_eq!(dml.len(), 1);
        assert_eq!(dml[0].section, "basics");
    }

    #[test]
    fn test_load_pages() {
        let (_dir, guide) = site();
        let pages = ContentLoader::new(&guide).load_pages().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "About");
        assert_eq!(pages[0].path, "about/");
    }

    #[test]
    fn test_missing_content_dir() {
        let dir = TempDir::new().unwrap();
        let guide = Guide::new(dir.path()).unwrap();
        let loader = ContentLoader::new(&guide);
        assert!(loader.load_topics().unwrap().is_empty());
        assert!(loader.load_pages().unwrap().is_empty());
    }

    #[test]
    fn test_split_order_prefix() {
        assert_eq!(split_order_prefix("03-apex-triggers"), (Some(3), "apex-triggers"));
        assert_eq!(split_order_prefix("10_soql"), (Some(10), "soql"));
        assert_eq!(split_order_prefix("soql"), (None, "soql"));
        assert_eq!(split_order_prefix("2024"), (None, "2024"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/basics//dml"), "basics/dml/");
        assert_eq!(normalize_path("/"), "");
    }
}
