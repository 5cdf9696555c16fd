//! sfdev-guide: static site generator for a curated Salesforce development curriculum
//!
//! Tutorials are markdown files with front-matter, grouped into sections.
//! The crate loads them into a [`curriculum::Curriculum`], overlays the
//! learner's [`progress::ProgressStore`], and renders everything with an
//! embedded Tera theme.

pub mod commands;
pub mod config;
pub mod content;
pub mod curriculum;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod progress;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

use content::loader::ContentLoader;
use content::Page;
use curriculum::Curriculum;
use progress::ProgressStore;

/// A guide site rooted at a base directory
#[derive(Debug, Clone)]
pub struct Guide {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Config file in use, if any
    pub config_path: Option<PathBuf>,
    /// Markdown content directory
    pub source_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Files copied verbatim into the output
    pub static_dir: PathBuf,
    /// Learner progress file
    pub progress_path: PathBuf,
}

impl Guide {
    /// Open a site directory; a missing config file means defaults
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = config::SiteConfig::locate(&base_dir);

        let config = match &config_path {
            Some(path) => config::SiteConfig::load(path)?,
            None => config::SiteConfig::default(),
        };

        let source_dir = base_dir.join(&config.source_dir);
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);
        let progress_path = base_dir.join(&config.progress_file);

        Ok(Self {
            config,
            base_dir,
            config_path,
            source_dir,
            public_dir,
            static_dir,
            progress_path,
        })
    }

    /// Load topics into a curriculum, plus standalone pages
    pub fn load(&self) -> Result<(Curriculum, Vec<Page>)> {
        let loader = ContentLoader::new(self);
        let topics = loader.load_topics()?;
        let pages = loader.load_pages()?;
        tracing::info!("Loaded {} topics and {} pages", topics.len(), pages.len());
        Ok((Curriculum::new(topics, &self.config), pages))
    }

    /// Load topics only
    pub fn load_curriculum(&self) -> Result<Curriculum> {
        let topics = ContentLoader::new(self).load_topics()?;
        Ok(Curriculum::new(topics, &self.config))
    }

    /// The learner's saved progress
    pub fn load_progress(&self) -> ProgressStore {
        ProgressStore::load(&self.progress_path)
    }

    /// Generate the static site
    pub fn generate(&self) -> Result<()> {
        commands::generate::run(self)
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
