//! List curriculum content

use anyhow::Result;

use crate::curriculum::Curriculum;
use crate::templates::format_minutes;
use crate::Guide;

/// List curriculum content by type
pub fn run(guide: &Guide, content_type: &str) -> Result<()> {
    let curriculum = guide.load_curriculum()?;
    let lines = render(&curriculum, content_type)?;
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

/// Build the listing as lines of text
pub fn render(curriculum: &Curriculum, content_type: &str) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    match content_type {
        "topic" | "topics" => {
            lines.push(format!("Topics ({}):", curriculum.len()));
            for (i, topic) in curriculum.topics().iter().enumerate() {
                let difficulty = topic.difficulty.map(|d| d.label()).unwrap_or("-");
                lines.push(format!(
                    "  {:>3}. {} [{}] {} ({})",
                    i + 1,
                    topic.title,
                    topic.section,
                    difficulty,
                    topic.source
                ));
            }
        }
        "section" | "sections" => {
            let sections = curriculum.sections();
            lines.push(format!("Sections ({}):", sections.len()));
            for section in sections {
                let weight = section
                    .exam_weight
                    .map(|w| format!(", {}% of exam", w))
                    .unwrap_or_default();
                lines.push(format!(
                    "  {} ({} topics, {}{})",
                    section.title,
                    section.topics.len(),
                    format_minutes(u64::from(section.reading_time)),
                    weight
                ));
            }
        }
        "difficulty" | "difficulties" => {
            let counts = curriculum.difficulty_counts();
            lines.push("Difficulty:".to_string());
            for (difficulty, count) in counts {
                lines.push(format!("  {} ({})", difficulty.label(), count));
            }
        }
        "tag" | "tags" => {
            let mut tags: Vec<_> = curriculum.tag_counts().into_iter().collect();
            lines.push(format!("Tags ({}):", tags.len()));
            tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            for (tag, count) in tags {
                lines.push(format!("  {} ({})", tag, count));
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown content type: {}. Use: topics, sections, difficulty, tags",
                content_type
            );
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::content::{Difficulty, Topic};

    fn curriculum() -> Curriculum {
        let mut intro = Topic::new("apex-intro", "Apex Intro", "basics");
        intro.order = Some(1);
        intro.difficulty = Some(Difficulty::Beginner);
        intro.tags = vec!["apex".to_string()];
        intro.reading_time = 5;

        let mut soql = Topic::new("soql", "SOQL", "basics");
        soql.order = Some(2);
        soql.tags = vec!["apex".to_string(), "soql".to_string()];
        soql.reading_time = 70;

        Curriculum::new(vec![soql, intro], &SiteConfig::default())
    }

    #[test]
    fn test_list_topics_in_study_order() {
        let lines = render(&curriculum(), "topics").unwrap();
        assert_eq!(lines[0], "Topics (2):");
        assert!(lines[1].contains("1. Apex Intro [basics] Beginner"));
        assert!(lines[2].contains("2. SOQL [basics] -"));
    }

    #[test]
    fn test_list_sections_and_tags() {
        let lines = render(&curriculum(), "sections").unwrap();
        assert_eq!(lines[1], "  Basics (2 topics, 1 h 15 min)");

        let lines = render(&curriculum(), "tags").unwrap();
        assert_eq!(lines, vec!["Tags (2):", "  apex (2)", "  soql (1)"]);
    }

    #[test]
    fn test_list_unknown_type() {
        assert!(render(&curriculum(), "posts").is_err());
    }
}
