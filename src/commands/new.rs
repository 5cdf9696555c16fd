//! Create a new topic

use anyhow::Result;
use std::fs;
use std::path::PathBuf;

use crate::content::Difficulty;
use crate::Guide;

const DEFAULT_SCAFFOLD: &str = "---
title: {{ title }}
date: {{ date }}
section: {{ section }}
order: {{ order }}
difficulty: {{ difficulty }}
prerequisites: []
tags: []
---
";

/// Create a topic file under `content/<section>/` and return its path
pub fn create_topic(
    guide: &Guide,
    title: &str,
    section: &str,
    order: Option<i64>,
    difficulty: Option<&str>,
) -> Result<PathBuf> {
    let difficulty = difficulty.map(str::parse::<Difficulty>).transpose()?;

    let section_key = slug::slugify(section);
    if section_key.is_empty() {
        anyhow::bail!("Section name is empty");
    }
    if !guide.config.sections.is_empty() && !guide.config.sections.contains_key(&section_key) {
        tracing::warn!("Section '{}' is not declared in config", section_key);
    }

    let order = match order {
        Some(order) => order,
        None => next_order(guide, &section_key)?,
    };

    let slug = slug::slugify(title);
    let file_path = guide
        .source_dir
        .join(&section_key)
        .join(format!("{:02}-{}.md", order, slug));

    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let scaffold_path = guide.base_dir.join("scaffolds").join("topic.md");
    let scaffold = if scaffold_path.exists() {
        fs::read_to_string(&scaffold_path)?
    } else {
        DEFAULT_SCAFFOLD.to_string()
    };

    let now = guide.config.now();
    let content = scaffold
        .replace("{{ title }}", &yaml_string(title))
        .replace("{{ date }}", &now.format("%Y-%m-%d %H:%M:%S").to_string())
        .replace("{{ section }}", &section_key)
        .replace("{{ order }}", &order.to_string())
        .replace(
            "{{ difficulty }}",
            difficulty.map(|d| d.as_str()).unwrap_or_default(),
        );

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;

    tracing::info!("Created: {:?}", file_path);
    Ok(file_path)
}

/// One past the highest order already used in the section
fn next_order(guide: &Guide, section: &str) -> Result<i64> {
    let curriculum = guide.load_curriculum()?;
    let highest = curriculum
        .topics()
        .iter()
        .filter(|t| t.section == section)
        .filter_map(|t| t.order)
        .max()
        .unwrap_or(0);
    Ok(highest + 1)
}

/// Quote titles that YAML would otherwise misread
fn yaml_string(value: &str) -> String {
    let needs_quotes = value.contains(": ")
        || value.contains(" #")
        || value.starts_with(|c: char| "[]{}&*!|>'\"%@`#,?-".contains(c));
    if needs_quotes {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}
