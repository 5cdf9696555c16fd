//! Generate static files

use anyhow::Result;
use notify::Watcher;
use notify_debouncer_mini::new_debouncer;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use crate::generator::Generator;
use crate::progress::ProgressReport;
use crate::Guide;

/// Generate the static site
pub fn run(guide: &Guide) -> Result<()> {
    run_with_options(guide, false)
}

/// Generate, optionally with the dev server's interactive controls
pub fn run_with_options(guide: &Guide, interactive: bool) -> Result<()> {
    let start = Instant::now();

    let (curriculum, pages) = guide.load()?;
    for issue in curriculum.issues() {
        tracing::warn!("{}", issue);
    }

    let store = guide.load_progress();
    let report = ProgressReport::build(&curriculum, &store);
    tracing::debug!(
        "Progress: {}/{} topics ({}%)",
        report.overall.completed,
        report.overall.total,
        report.overall.percent
    );

    Generator::new(guide)?
        .interactive(interactive)
        .generate(&curriculum, &pages, &report)?;

    let duration = start.elapsed();
    tracing::info!("Generated in {:.2}s", duration.as_secs_f64());

    Ok(())
}

/// Paths whose changes should trigger a rebuild
pub fn watched_paths(guide: &Guide) -> Vec<(PathBuf, notify::RecursiveMode)> {
    let mut paths = vec![
        (guide.source_dir.clone(), notify::RecursiveMode::Recursive),
        (guide.static_dir.clone(), notify::RecursiveMode::Recursive),
        (guide.progress_path.clone(), notify::RecursiveMode::NonRecursive),
    ];
    if let Some(config_path) = &guide.config_path {
        paths.push((config_path.clone(), notify::RecursiveMode::NonRecursive));
    }
    paths.retain(|(path, _)| path.exists());
    paths
}

/// Re-read the config and regenerate everything under `base_dir`
pub fn regenerate(base_dir: &Path, interactive: bool) -> Result<()> {
    let guide = Guide::new(base_dir)?;
    run_with_options(&guide, interactive)
}

/// Watch for file changes and regenerate
pub async fn watch(guide: &Guide) -> Result<()> {
    let guide = guide.clone();
    tokio::task::spawn_blocking(move || watch_blocking(&guide)).await?
}

fn watch_blocking(guide: &Guide) -> Result<()> {
    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)?;

    for (path, mode) in watched_paths(guide) {
        debouncer.watcher().watch(&path, mode)?;
        tracing::debug!("Watching: {:?}", path);
    }

    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                if events.is_empty() {
                    continue;
                }
                tracing::info!("File changed, regenerating...");
                if let Err(e) = regenerate(&guide.base_dir, false) {
                    tracing::error!("Generation failed: {}", e);
                }
            }
            Ok(Err(e)) => tracing::error!("Watch error: {:?}", e),
            Err(_) => break,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generate_empty_site() {
        let dir = TempDir::new().unwrap();
        let guide = Guide::new(dir.path()).unwrap();
        run(&guide).unwrap();

        let index = fs::read_to_string(guide.public_dir.join("index.html")).unwrap();
        assert!(index.contains("0 of 0 topics completed"));
    }

    #[test]
    fn test_generate_with_dangling_prerequisites() {
        let dir = TempDir::new().unwrap();
        let topic = dir.path().join("content/basics/soql.md");
        fs::create_dir_all(topic.parent().unwrap()).unwrap();
        fs::write(&topic, "---\nprerequisites: [nowhere]\n---\nSELECT Id FROM Account\n").unwrap();

        let guide = Guide::new(dir.path()).unwrap();
        run_with_options(&guide, true).unwrap();
        assert!(guide.public_dir.join("basics/soql/index.html").exists());
    }

    #[test]
    fn test_watched_paths_skip_missing() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("content")).unwrap();
        fs::write(dir.path().join("_config.yml"), "title: Watch\n").unwrap();
        let guide = Guide::new(dir.path()).unwrap();

        let paths: Vec<PathBuf> = watched_paths(&guide).into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            vec![dir.path().join("content"), dir.path().join("_config.yml")]
        );
    }

    #[test]
    fn test_regenerate_picks_up_edits() {
        let dir = TempDir::new().unwrap();
        let topic = dir.path().join("content/basics/dml.md");
        fs::create_dir_all(topic.parent().unwrap()).unwrap();
        fs::write(&topic, "Insert records with DML\n").unwrap();
        regenerate(dir.path(), false).unwrap();

        fs::write(&topic, "Upsert records by external id\n").unwrap();
        fs::write(dir.path().join("_config.yml"), "title: Edited Guide\n").unwrap();
        regenerate(dir.path(), false).unwrap();

        let page = fs::read_to_string(dir.path().join("public/basics/dml/index.html")).unwrap();
        assert!(page.contains("Upsert records by external id"));
        assert!(!page.contains("Insert records with DML"));
        assert!(page.contains("Edited Guide"));
    }
}
