//! Initialize a new guide site

use anyhow::Result;
use std::fs;
use std::path::Path;

const CONFIG: &str = r#"# sfdev-guide configuration

# Site
title: Salesforce Developer Guide
subtitle: From Apex basics to exam day
description: A step-by-step curriculum for Salesforce platform developers
author: ''
language: en
timezone: ''

# URL
url: http://example.com
root: /
topic_permalink: :section/:slug/
difficulty_dir: difficulty
relative_link: false

# Directory
source_dir: content
public_dir: public
static_dir: static
ignore: []

# Writing
render_drafts: false
words_per_minute: 200
toc_depth: 3
highlight:
  line_number: false
  theme: InspiredGitHub

# Curriculum
sections:
  basics:
    title: Apex Basics
    description: Language fundamentals, data types and SOQL.
    order: 1
    exam_weight: 40
  integration:
    title: Integration
    description: Calling out to and receiving calls from external systems.
    order: 2
    exam_weight: 25
  testing:
    title: Testing and Deployment
    description: Unit tests, coverage and moving code between orgs.
    order: 3
    exam_weight: 35

exam:
  name: Platform Developer I
  passing_score: 68

progress_file: .progress.json

menu:
  Home: /
  About: /about/
"#;

const SCAFFOLD: &str = r#"---
title: {{ title }}
date: {{ date }}
section: {{ section }}
order: {{ order }}
difficulty: {{ difficulty }}
prerequisites: []
tags: []
description: ''
---
"#;

const SAMPLES: [(&str, &str); 5] = [
    (
        "basics/01-apex-intro.md",
        r#"---
title: Introduction to Apex
difficulty: beginner
tags: [apex]
description: What Apex is and where it runs.
---
Apex is a strongly typed language that runs on the Salesforce platform.

## Variables

```java
Integer count = 0;
List<Account> accounts = new List<Account>();
```
"#,
    ),
    (
        "basics/02-soql.md",
        r#"---
title: Querying with SOQL
difficulty: beginner
prerequisites: [apex-intro]
tags: [apex, soql]
---
SOQL reads records from the database.

```java
List<Account> accounts = [SELECT Id, Name FROM Account LIMIT 10];
```
"#,
    ),
    (
        "integration/01-rest-callouts.md",
        r#"---
title: REST Callouts
difficulty: intermediate
prerequisites: [apex-intro]
tags: [apex, http]
---
Use `Http` and `HttpRequest` to call external services.

## Remote site settings

Register the endpoint before making a callout.
"#,
    ),
    (
        "testing/01-apex-unit-tests.md",
        r#"---
title: Apex Unit Tests
difficulty: intermediate
prerequisites: [apex-intro, soql]
tags: [apex, testing]
exam_weight: 10
---
Deployments to production need 75% code coverage.

```java
@isTest
private class AccountServiceTest {
    @isTest static void createsAccount() {
        System.assertEquals(0, [SELECT COUNT() FROM Account]);
    }
}
```
"#,
    ),
    (
        "about.md",
        r#"---
title: About
---
This guide follows the Platform Developer I exam outline.
"#,
    ),
];

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;
    fs::create_dir_all(target_dir.join("scaffolds"))?;
    fs::create_dir_all(target_dir.join("static"))?;

    write_new(&target_dir.join("_config.yml"), CONFIG)?;
    write_new(&target_dir.join("scaffolds/topic.md"), SCAFFOLD)?;

    let content_dir = target_dir.join("content");
    for (relative, body) in SAMPLES {
        let path = content_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        write_new(&path, body)?;
    }

    write_new(&target_dir.join(".gitignore"), "public/\n.progress.json\n")?;

    tracing::info!("Initialized guide in {:?}", target_dir);
    Ok(())
}

/// Existing files are never overwritten
fn write_new(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        tracing::warn!("Skipping existing file: {:?}", path);
        return Ok(());
    }
    fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Difficulty;
    use crate::Guide;
    use tempfile::TempDir;

    #[test]
    fn test_init_then_load() {
        let dir = TempDir::new().unwrap();
        init_site(dir.path()).unwrap();

        let guide = Guide::new(dir.path()).unwrap();
        assert_eq!(guide.config.sections.len(), 3);
        assert_eq!(guide.config.exam.passing_score, Some(68.0));

        let (curriculum, pages) = guide.load().unwrap();
        assert_eq!(curriculum.len(), 4);
        assert_eq!(pages.len(), 1);
        assert!(curriculum.issues().is_empty());

        let keys: Vec<_> = curriculum.sections().iter().map(|s| s.key.clone()).collect();
        assert_eq!(keys, vec!["basics", "integration", "testing"]);
        assert_eq!(
            curriculum.filter_by_difficulty(Difficulty::Beginner).len(),
            2
        );
    }

    #[test]
    fn test_init_keeps_existing_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_config.yml"), "title: Mine\n").unwrap();
        init_site(dir.path()).unwrap();

        let config = fs::read_to_string(dir.path().join("_config.yml")).unwrap();
        assert_eq!(config, "title: Mine\n");
        assert!(dir.path().join("scaffolds/topic.md").exists());
    }
}
