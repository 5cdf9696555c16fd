//! Inspect and edit learner progress

use anyhow::Result;

use crate::curriculum::Curriculum;
use crate::progress::{ProgressReport, ProgressStore, TopicStatus};
use crate::Guide;

/// What the progress command should do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressAction {
    Show,
    Complete(String),
    Undo(String),
    Reset,
}

/// Run a progress action and print the resulting summary
pub fn run(guide: &Guide, action: ProgressAction) -> Result<()> {
    let curriculum = guide.load_curriculum()?;
    let mut store = guide.load_progress();

    apply(&mut store, &curriculum, &action)?;

    let report = ProgressReport::build(&curriculum, &store);
    for line in summary(&curriculum, &report) {
        println!("{}", line);
    }
    Ok(())
}

/// Apply an action to the store, saving when something changed
pub fn apply(store: &mut ProgressStore, curriculum: &Curriculum, action: &ProgressAction) -> Result<()> {
    match action {
        ProgressAction::Show => {}
        ProgressAction::Complete(slug) => {
            if store.complete(slug, curriculum)? {
                store.save()?;
                tracing::info!("Marked '{}' as completed", slug);
            } else {
                tracing::info!("'{}' was already completed", slug);
            }
        }
        ProgressAction::Undo(slug) => {
            if store.uncomplete(slug) {
                store.save()?;
                tracing::info!("Marked '{}' as not completed", slug);
            } else {
                tracing::info!("'{}' was not completed", slug);
            }
        }
        ProgressAction::Reset => {
            store.reset();
            store.save()?;
            tracing::info!("Progress reset");
        }
    }
    Ok(())
}

/// Per-section progress lines followed by the next suggested topic
pub fn summary(curriculum: &Curriculum, report: &ProgressReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Overall: {}/{} topics ({}%)",
        report.overall.completed, report.overall.total, report.overall.percent
    )];

    for section in &report.sections {
        lines.push(format!(
            "  {}: {}/{} ({}%)",
            section.title, section.tally.completed, section.tally.total, section.tally.percent
        ));
    }

    let locked = curriculum
        .topics()
        .iter()
        .filter(|t| report.status(&t.slug) == TopicStatus::Locked)
        .count();
    if locked > 0 {
        lines.push(format!("Locked: {} topics have unmet prerequisites", locked));
    }

    match report.next_up().and_then(|slug| curriculum.get(slug)) {
        Some(topic) => lines.push(format!("Next up: {} ({})", topic.title, topic.slug)),
        None if report.overall.total > 0 => lines.push("Every topic is completed.".to_string()),
        None => {}
    }

    lines
}
