//! Generator module - renders the curriculum into static HTML with the built-in theme

use anyhow::Result;
use serde_json::json;
use std::fs;
use std::path::Path;

use tera::Context;
use walkdir::WalkDir;

use crate::content::{Page, Topic};
use crate::curriculum::{Curriculum, PrerequisiteRef, SectionGroup};
use crate::helpers::{
    date_xml, full_url_for, html_escape, is_external, relative_url, strip_html, url_for,
};
use crate::progress::{ProgressReport, Tally};
use crate::templates::{
    ConfigData, DifficultyData, MenuItem, NavTopic, PageLink, PrereqData, ProgressData,
    SectionData, SiteData, TagData, TemplateRenderer, TopicData, STYLESHEET,
};
use crate::Guide;

/// Context shared by every rendered page
struct Shared {
    config: ConfigData,
    menu: Vec<MenuItem>,
    site: SiteData,
    progress: ProgressData,
    next_up: Option<NavTopic>,
    now: String,
}

/// Static site generator using Tera templates
pub struct Generator {
    guide: Guide,
    renderer: TemplateRenderer,
    interactive: bool,
}

impl Generator {
    pub fn new(guide: &Guide) -> Result<Self> {
        Ok(Self {
            guide: guide.clone(),
            renderer: TemplateRenderer::new()?,
            interactive: false,
        })
    }

    /// Render "mark complete" forms; only meaningful behind the dev server
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Generate the entire site
    pub fn generate(
        &self,
        curriculum: &Curriculum,
        pages: &[Page],
        report: &ProgressReport,
    ) -> Result<()> {
        fs::create_dir_all(&self.guide.public_dir)?;

        // Default stylesheet first so the static dir can override it
        self.write_file("css/guide.css", STYLESHEET)?;
        self.copy_static_assets()?;
        self.copy_content_assets()?;

        let shared = self.build_shared(curriculum, pages, report);

        self.generate_index(&shared)?;
        self.generate_section_pages(&shared)?;
        self.generate_topic_pages(curriculum, report, &shared)?;
        self.generate_difficulty_pages(curriculum, report, &shared)?;
        self.generate_standalone_pages(pages, &shared)?;

        self.generate_search_index(curriculum)?;
        self.generate_curriculum_json(curriculum)?;
        self.generate_sitemap(curriculum, pages, &shared)?;

        Ok(())
    }

    fn build_shared(
        &self,
        curriculum: &Curriculum,
        pages: &[Page],
        report: &ProgressReport,
    ) -> Shared {
        let config = &self.guide.config;

        let sections = curriculum
            .sections()
            .iter()
            .map(|group| self.section_data(group, report))
            .collect();

        let difficulties = curriculum
            .difficulty_counts()
            .into_iter()
            .map(|(difficulty, count)| DifficultyData {
                key: difficulty.as_str().to_string(),
                label: difficulty.label().to_string(),
                path: self.difficulty_path(difficulty.as_str()),
                count,
            })
            .collect();

        let tags = curriculum
            .tag_counts()
            .into_iter()
            .map(|(name, count)| TagData { name, count })
            .collect();

        let pages = pages
            .iter()
            .map(|p| PageLink {
                title: p.title.clone(),
                path: p.path.clone(),
            })
            .collect();

        let total_weight = curriculum.total_exam_weight();

        let site = SiteData {
            sections,
            difficulties,
            tags,
            pages,
            topic_count: curriculum.len(),
            reading_time: curriculum.total_reading_time(),
            exam_weight: (total_weight > 0.0).then(|| format_weight(total_weight)),
        };

        let menu = config
            .menu
            .iter()
            .map(|(name, url)| MenuItem {
                name: name.clone(),
                external: is_external(url),
                url: if is_external(url) {
                    url.clone()
                } else {
                    url.trim_start_matches('/').to_string()
                },
            })
            .collect();

        Shared {
            config: ConfigData {
                title: config.title.clone(),
                subtitle: config.subtitle.clone(),
                description: config.description.clone(),
                author: config.author.clone(),
                language: config.language.clone(),
                url: config.url.clone(),
                root: config.root.clone(),
                difficulty_dir: config.difficulty_dir.trim_matches('/').to_string(),
                exam_name: config.exam.name.clone(),
                passing_score: config.exam.passing_score.map(format_weight),
            },
            menu,
            site,
            progress: report.overall.into(),
            next_up: report
                .next_up()
                .and_then(|slug| curriculum.get(slug))
                .map(|t| nav_topic(t, report)),
            now: config.now().to_rfc3339(),
        }
    }

    fn section_data(&self, group: &SectionGroup<'_>, report: &ProgressReport) -> SectionData {
        let progress = report
            .section(&group.key)
            .map(|s| s.tally)
            .unwrap_or_else(|| Tally::new(0, group.topics.len()));

        SectionData {
            key: group.key.clone(),
            title: group.title.clone(),
            description: group.description.clone(),
            path: section_path(&group.key),
            exam_weight: group.exam_weight.map(format_weight),
            reading_time: group.reading_time,
            topics: group.topics.iter().map(|t| nav_topic(t, report)).collect(),
            progress: progress.into(),
        }
    }

    fn difficulty_path(&self, key: &str) -> String {
        let dir = self.guide.config.difficulty_dir.trim_matches('/');
        if dir.is_empty() {
            format!("{}/", key)
        } else {
            format!("{}/{}/", dir, key)
        }
    }

    /// Prefix templates put in front of site paths
    fn base_for(&self, page_path: &str) -> String {
        if self.guide.config.relative_link {
            let mut base = relative_url(page_path, "");
            if !base.ends_with('/') {
                base.push('/');
            }
            base
        } else {
            url_for(&self.guide.config, "")
        }
    }

    /// Create a base context with common variables
    fn create_base_context(&self, shared: &Shared, page_path: &str) -> Context {
        let mut context = Context::new();
        context.insert("config", &shared.config);
        context.insert("menu", &shared.menu);
        context.insert("site", &shared.site);
        context.insert("progress", &shared.progress);
        context.insert("next_up", &shared.next_up);
        context.insert("now", &shared.now);
        context.insert("version", env!("CARGO_PKG_VERSION"));
        context.insert("interactive", &self.interactive);
        context.insert("base", &self.base_for(page_path));
        context.insert("canonical", &full_url_for(&self.guide.config, page_path));
        context.insert("page_title", "");
        context.insert("page_description", "");
        context.insert("current_section", "");
        context
    }

    fn generate_index(&self, shared: &Shared) -> Result<()> {
        let context = self.create_base_context(shared, "");
        let html = self.renderer.render("index.html", &context)?;
        self.write_page("", &html)?;
        tracing::debug!("Generated index");
        Ok(())
    }

    fn generate_section_pages(&self, shared: &Shared) -> Result<()> {
        for section in &shared.site.sections {
            let mut context = self.create_base_context(shared, &section.path);
            context.insert("section", section);
            context.insert("page_title", &section.title);
            context.insert("page_description", &section.description);
            context.insert("current_section", &section.key);

            let html = self.renderer.render("section.html", &context)?;
            self.write_page(&section.path, &html)?;
        }

        tracing::info!("Generated {} section pages", shared.site.sections.len());
        Ok(())
    }

    fn generate_topic_pages(
        &self,
        curriculum: &Curriculum,
        report: &ProgressReport,
        shared: &Shared,
    ) -> Result<()> {
        for (i, topic) in curriculum.topics().iter().enumerate() {
            let data = self.topic_data(curriculum, report, topic, i);

            let mut context = self.create_base_context(shared, &topic.path);
            context.insert("topic", &data);
            context.insert("page_title", &topic.title);
            context.insert(
                "page_description",
                topic.description.as_deref().unwrap_or_default(),
            );
            context.insert("current_section", &topic.section);

            let html = self.renderer.render("topic.html", &context)?;
            self.write_page(&topic.path, &html)?;
            tracing::debug!("Generated topic: {}", topic.path);
        }

        tracing::info!("Generated {} topic pages", curriculum.len());
        Ok(())
    }

    fn topic_data(
        &self,
        curriculum: &Curriculum,
        report: &ProgressReport,
        topic: &Topic,
        index: usize,
    ) -> TopicData {
        let prerequisites = curriculum
            .prerequisites_of(&topic.slug)
            .into_iter()
            .map(|p| match p {
                PrerequisiteRef::Resolved(t) => PrereqData {
                    slug: t.slug.clone(),
                    title: t.title.clone(),
                    path: Some(t.path.clone()),
                    status: report.status(&t.slug).as_str().to_string(),
                    missing: false,
                },
                PrerequisiteRef::Missing(slug) => PrereqData {
                    title: crate::config::humanize(&slug),
                    slug,
                    path: None,
                    status: "missing".to_string(),
                    missing: true,
                },
            })
            .collect();

        TopicData {
            nav: nav_topic(topic, report),
            section_title: self.guide.config.section_title(&topic.section),
            section_path: section_path(&topic.section),
            permalink: topic.permalink.clone(),
            exam_weight: topic.exam_weight.map(format_weight),
            tags: topic.tags.clone(),
            content: topic.content.clone(),
            toc: topic.toc.clone(),
            word_count: topic.word_count,
            date: topic.date.map(|d| d.to_rfc3339()),
            updated: topic.updated.map(|d| d.to_rfc3339()),
            position: index + 1,
            prerequisites,
            dependents: curriculum
                .dependents_of(&topic.slug)
                .into_iter()
                .map(|t| nav_topic(t, report))
                .collect(),
            prev: curriculum.prev(&topic.slug).map(|t| nav_topic(t, report)),
            next: curriculum.next(&topic.slug).map(|t| nav_topic(t, report)),
        }
    }

    fn generate_difficulty_pages(
        &self,
        curriculum: &Curriculum,
        report: &ProgressReport,
        shared: &Shared,
    ) -> Result<()> {
        for difficulty in &shared.site.difficulties {
            let topics: Vec<NavTopic> = curriculum
                .topics()
                .iter()
                .filter(|t| t.difficulty.map(|d| d.as_str()) == Some(difficulty.key.as_str()))
                .map(|t| nav_topic(t, report))
                .collect();

            let mut context = self.create_base_context(shared, &difficulty.path);
            context.insert("difficulty", difficulty);
            context.insert("topics", &topics);
            context.insert("page_title", &format!("{} topics", difficulty.label));

            let html = self.renderer.render("difficulty.html", &context)?;
            self.write_page(&difficulty.path, &html)?;
        }

        Ok(())
    }

    fn generate_standalone_pages(&self, pages: &[Page], shared: &Shared) -> Result<()> {
        for page in pages {
            // `layout: false` publishes the rendered markdown without the theme
            let html = if matches!(page.layout.as_str(), "false" | "raw") {
                page.content.clone()
            } else {
                let mut context = self.create_base_context(shared, &page.path);
                context.insert("page", page);
                context.insert("page_title", &page.title);
                self.renderer.render("page.html", &context)?
            };
            self.write_page(&page.path, &html)?;
            tracing::debug!("Generated page: {}", page.path);
        }
        Ok(())
    }

    /// Search index consumed by client-side search
    fn generate_search_index(&self, curriculum: &Curriculum) -> Result<()> {
        let config = &self.guide.config;
        let entries: Vec<serde_json::Value> = curriculum
            .topics()
            .iter()
            .map(|t| {
                json!({
                    "title": t.title,
                    "url": url_for(config, &t.path),
                    "section": config.section_title(&t.section),
                    "difficulty": t.difficulty.map(|d| d.as_str()),
                    "tags": t.tags,
                    "text": strip_html(&t.content),
                })
            })
            .collect();

        self.write_file("search.json", &serde_json::to_string_pretty(&entries)?)?;
        tracing::info!("Generated search.json");
        Ok(())
    }

    /// Machine-readable outline of the curriculum
    fn generate_curriculum_json(&self, curriculum: &Curriculum) -> Result<()> {
        let config = &self.guide.config;
        let sections: Vec<serde_json::Value> = curriculum
            .sections()
            .iter()
            .map(|s| {
                json!({
                    "key": s.key,
                    "title": s.title,
                    "exam_weight": s.exam_weight,
                    "reading_time": s.reading_time,
                    "topics": s.topics.iter().map(|t| json!({
                        "slug": t.slug,
                        "title": t.title,
                        "order": t.order,
                        "difficulty": t.difficulty.map(|d| d.as_str()),
                        "exam_weight": t.exam_weight,
                        "reading_time": t.reading_time,
                        "prerequisites": t.prerequisites,
                        "url": url_for(config, &t.path),
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();

        let outline = json!({
            "title": config.title,
            "exam": config.exam.name,
            "topic_count": curriculum.len(),
            "reading_time": curriculum.total_reading_time(),
            "sections": sections,
        });

        self.write_file(
            "curriculum.json",
            &serde_json::to_string_pretty(&outline)?,
        )?;
        tracing::info!("Generated curriculum.json");
        Ok(())
    }

    fn generate_sitemap(
        &self,
        curriculum: &Curriculum,
        pages: &[Page],
        shared: &Shared,
    ) -> Result<()> {
        let config = &self.guide.config;
        let mut entries: Vec<(String, Option<String>)> = vec![(full_url_for(config, ""), None)];

        entries.extend(
            shared
                .site
                .sections
                .iter()
                .map(|s| (full_url_for(config, &s.path), None)),
        );
        entries.extend(curriculum.topics().iter().map(|t| {
            (
                t.permalink.clone(),
                t.updated.or(t.date).map(|d| date_xml(&d)),
            )
        }));
        entries.extend(
            shared
                .site
                .difficulties
                .iter()
                .map(|d| (full_url_for(config, &d.path), None)),
        );
        entries.extend(
            pages
                .iter()
                .map(|p| (p.permalink.clone(), p.updated.map(|d| date_xml(&d)))),
        );

        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        xml.push('\n');
        for (loc, lastmod) in entries {
            xml.push_str("  <url>\n");
            xml.push_str(&format!("    <loc>{}</loc>\n", html_escape(&loc)));
            if let Some(lastmod) = lastmod {
                xml.push_str(&format!("    <lastmod>{}</lastmod>\n", lastmod));
            }
            xml.push_str("  </url>\n");
        }
        xml.push_str("</urlset>\n");

        self.write_file("sitemap.xml", &xml)?;
        tracing::info!("Generated sitemap.xml");
        Ok(())
    }

    /// Write `<public>/<path>/index.html`
    fn write_page(&self, path: &str, html: &str) -> Result<()> {
        let clean_path = path.trim_matches('/');
        let file = if clean_path.is_empty() {
            "index.html".to_string()
        } else {
            format!("{}/index.html", clean_path)
        };
        self.write_file(&file, html)
    }

    fn write_file(&self, relative: &str, content: &str) -> Result<()> {
        let output_path = self.guide.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
        }
        fs::write(&output_path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", output_path, e))?;
        Ok(())
    }

    /// Copy the static dir verbatim
    fn copy_static_assets(&self) -> Result<()> {
        let copied = copy_tree(&self.guide.static_dir, &self.guide.public_dir, |_| false)?;
        if copied > 0 {
            tracing::info!("Copied {} static files", copied);
        }
        Ok(())
    }

    /// Copy images and other non-markdown files from the content dir
    fn copy_content_assets(&self) -> Result<()> {
        copy_tree(&self.guide.source_dir, &self.guide.public_dir, |path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("md") | Some("markdown")
            )
        })?;
        Ok(())
    }
}

/// Copy files under `from` into `to`, skipping `_`/`.` entries and anything
/// `skip` rejects. Returns the number of files copied.
fn copy_tree(from: &Path, to: &Path, skip: impl Fn(&Path) -> bool) -> Result<usize> {
    if !from.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;
    let walker = WalkDir::new(from)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            e.depth() == 0
                || !e
                    .file_name()
                    .to_str()
                    .map(|n| n.starts_with('_') || n.starts_with('.'))
                    .unwrap_or(false)
        });

    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !entry.file_type().is_file() || skip(path) {
            continue;
        }
        let dest = to.join(path.strip_prefix(from)?);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &dest)?;
        copied += 1;
    }

    Ok(copied)
}

fn nav_topic(topic: &Topic, report: &ProgressReport) -> NavTopic {
    NavTopic {
        slug: topic.slug.clone(),
        title: topic.title.clone(),
        path: topic.path.clone(),
        section: topic.section.clone(),
        order: topic.order,
        description: topic.description.clone(),
        difficulty: topic.difficulty.map(|d| d.label().to_string()),
        difficulty_key: topic.difficulty.map(|d| d.as_str().to_string()),
        reading_time: topic.reading_time,
        status: report.status(&topic.slug).as_str().to_string(),
    }
}

/// Site path of a section's overview page
pub fn section_path(key: &str) -> String {
    format!("{}/", slug::slugify(key))
}

/// `20` stays `20`, `33.333` becomes `33.33`
fn format_weight(weight: f64) -> String {
    ((weight * 100.0).round() / 100.0).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ProgressStore;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn site() -> (TempDir, Guide) {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "_config.yml",
            "title: Apex Academy\nsections:\n  basics:\n    title: Apex Basics\n    order: 1\n    exam_weight: 20\n  testing:\n    order: 2\n",
        );
        let content = dir.path().join("content");
        write(
            &content,
            "basics/01-apex-intro.md",
            "---\ntitle: Intro to Apex\ndifficulty: beginner\ntags: [apex]\n---\n## Variables\n\nUse `List<Account>` here.\n",
        );
        write(
            &content,
            "basics/02-triggers.md",
            "---\ntitle: Triggers\nprerequisites: [apex-intro, governor-limits]\n---\nTrigger body\n",
        );
        write(&content, "basics/img/diagram.png", "png");
        write(&content, "about.md", "---\ntitle: About\n---\nAbout this guide\n");
        write(dir.path(), "static/robots.txt", "User-agent: *\n");
        let guide = Guide::new(dir.path()).unwrap();
        (dir, guide)
    }

    fn generate(guide: &Guide, store: &ProgressStore, interactive: bool) {
        let (curriculum, pages) = guide.load().unwrap();
        let report = ProgressReport::build(&curriculum, store);
        Generator::new(guide)
            .unwrap()
            .interactive(interactive)
            .generate(&curriculum, &pages, &report)
            .unwrap();
    }

    fn read(guide: &Guide, rel: &str) -> String {
        fs::read_to_string(guide.public_dir.join(rel)).unwrap()
    }

    #[test]
    fn test_generate_writes_all_outputs() {
        let (_dir, guide) = site();
        generate(&guide, &ProgressStore::default(), false);

        for rel in [
            "index.html",
            "basics/index.html",
            "testing/index.html",
            "basics/apex-intro/index.html",
            "basics/triggers/index.html",
            "difficulty/beginner/index.html",
            "about/index.html",
            "search.json",
            "curriculum.json",
            "sitemap.xml",
            "css/guide.css",
            "robots.txt",
            "basics/img/diagram.png",
        ] {
            assert!(guide.public_dir.join(rel).exists(), "missing {}", rel);
        }
        assert!(!guide.public_dir.join("about.md").exists());

        let index = read(&guide, "index.html");
        assert!(index.contains("Apex Academy"));
        assert!(index.contains("Apex Basics"));
        assert!(index.contains("0 of 2 topics completed"));
        assert!(index.contains("20% of exam"));
    }

    #[test]
    fn test_locked_topic_still_renders() {
        let (_dir, guide) = site();
        generate(&guide, &ProgressStore::default(), false);

        let html = read(&guide, "basics/triggers/index.html");
        assert!(html.contains("Some prerequisites are not completed yet"));
        assert!(html.contains(r#"href="/basics/apex-intro/""#));
        // Dangling prerequisite is listed but not linked
        assert!(html.contains(r#"<span class="missing">governor-limits</span>"#));
        assert!(html.contains("&larr; Intro to Apex"));
        assert!(!html.contains("progress-toggle"));
    }

    #[test]
    fn test_topic_page_escapes_and_toc() {
        let (_dir, guide) = site();
        generate(&guide, &ProgressStore::default(), false);

        let html = read(&guide, "basics/apex-intro/index.html");
        assert!(html.contains("List&lt;Account&gt;"));
        assert!(html.contains(r##"href="#variables""##));
        assert!(html.contains("Topic 1 of 2"));
    }

    #[test]
    fn test_progress_overlay() {
        let (_dir, guide) = site();
        let (curriculum, _) = guide.load().unwrap();
        let mut store = ProgressStore::default();
        store.complete("apex-intro", &curriculum).unwrap();
        generate(&guide, &store, true);

        let index = read(&guide, "index.html");
        assert!(index.contains("1 of 2 topics completed"));
        assert!(index.contains("width: 50%"));

        let html = read(&guide, "basics/apex-intro/index.html");
        assert!(html.contains(r#"action="/__progress/apex-intro""#));
        assert!(html.contains("Mark as not completed"));

        let triggers = read(&guide, "basics/triggers/index.html");
        assert!(!triggers.contains("Some prerequisites are not completed yet"));
    }

    #[test]
    fn test_relative_links() {
        let (_dir, mut guide) = site();
        guide.config.relative_link = true;
        generate(&guide, &ProgressStore::default(), false);

        let html = read(&guide, "basics/triggers/index.html");
        assert!(html.contains(r#"href="../../css/guide.css""#));
        assert!(html.contains(r#"href="../../basics/apex-intro/""#));
        let index = read(&guide, "index.html");
        assert!(index.contains(r#"href="./css/guide.css""#));
    }

    #[test]
    fn test_json_and_sitemap() {
        let (_dir, guide) = site();
        generate(&guide, &ProgressStore::default(), false);

        let search: serde_json::Value = serde_json::from_str(&read(&guide, "search.json")).unwrap();
        assert_eq!(search.as_array().unwrap().len(), 2);
        assert_eq!(search[0]["url"], "/basics/apex-intro/");
        assert_eq!(search[0]["difficulty"], "beginner");

        let outline: serde_json::Value =
            serde_json::from_str(&read(&guide, "curriculum.json")).unwrap();
        assert_eq!(outline["topic_count"], 2);
        assert_eq!(outline["sections"][0]["key"], "basics");
        assert_eq!(outline["sections"][1]["topics"].as_array().unwrap().len(), 0);

        let sitemap = read(&guide, "sitemap.xml");
        assert!(sitemap.contains("<loc>http://example.com/basics/triggers/</loc>"));
        assert!(sitemap.contains("<loc>http://example.com/about/</loc>"));
    }

    #[test]
    fn test_static_dir_overrides_stylesheet() {
        let (dir, guide) = site();
        write(dir.path(), "static/css/guide.css", "body { color: red; }");
        generate(&guide, &ProgressStore::default(), false);
        assert_eq!(read(&guide, "css/guide.css"), "body { color: red; }");
    }

    #[test]
    fn test_format_weight() {
        assert_eq!(format_weight(20.0), "20");
        assert_eq!(format_weight(8.5), "8.5");
        assert_eq!(format_weight(33.333), "33.33");
    }
}
