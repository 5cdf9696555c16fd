//! Validate the curriculum

use anyhow::Result;

use crate::curriculum::CurriculumIssue;
use crate::Guide;

/// Print curriculum issues and return them; an empty list means the curriculum is sound
pub fn run(guide: &Guide) -> Result<Vec<CurriculumIssue>> {
    let curriculum = guide.load_curriculum()?;
    let issues = curriculum.issues();

    if issues.is_empty() {
        println!("{} topics checked, no issues found", curriculum.len());
    } else {
        println!("{} issue(s) found:", issues.len());
        for issue in &issues {
            println!("  {}", issue);
        }
    }

    let weight = curriculum.total_exam_weight();
    if weight > 0.0 && (weight - 100.0).abs() > 0.01 {
        tracing::warn!("Section exam weights add up to {}%, not 100%", weight);
    }

    Ok(issues)
}
