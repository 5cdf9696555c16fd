//! Markdown rendering with syntax highlighting

use anyhow::Result;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::helpers::html_escape;

/// Words per minute used when config asks for zero
const DEFAULT_WPM: u32 = 200;

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    line_numbers: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_options("base16-ocean.dark", true)
    }

    /// Create with custom settings
    pub fn with_options(theme: &str, line_numbers: bool) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: theme.to_string(),
            line_numbers,
        }
    }

    fn options() -> Options {
        // Front-matter is stripped before rendering, so no YAML metadata blocks
        Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_SMART_PUNCTUATION
            | Options::ENABLE_HEADING_ATTRIBUTES
            | Options::ENABLE_GFM
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> Result<String> {
        let parser = Parser::new_ext(markdown, Self::options());

        let mut events: Vec<Event> = Vec::new();
        let mut in_code_block = false;
        let mut code_block_lang: Option<String> = None;
        let mut code_block_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(lang) => lang
                            .split_whitespace()
                            .next()
                            .map(|l| l.to_string())
                            .filter(|l| !l.is_empty()),
                        CodeBlockKind::Indented => None,
                    };
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let highlighted =
                        self.highlight_code(&code_block_content, code_block_lang.as_deref());
                    events.push(Event::Html(CowStr::from(highlighted)));
                    in_code_block = false;
                    code_block_lang = None;
                }
                Event::Text(text) if in_code_block => {
                    code_block_content.push_str(&text);
                }
                _ => events.push(event),
            }
        }

        let events = anchor_headings(events);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Ok(html_output)
    }

    /// Highlight a code block
    fn highlight_code(&self, code: &str, lang: Option<&str>) -> String {
        let lang = lang.unwrap_or("text");
        let token = syntax_alias(lang);

        let syntax = self
            .syntax_set
            .find_syntax_by_token(token)
            .or_else(|| self.syntax_set.find_syntax_by_extension(token))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self
            .theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next());

        let highlighted = theme.and_then(|theme| {
            highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
        });

        let class = html_escape(lang);
        match highlighted {
            Some(highlighted) if self.line_numbers => self.add_line_numbers(&highlighted, &class),
            Some(highlighted) => format!(
                r#"<figure class="highlight {}">{}</figure>"#,
                class, highlighted
            ),
            None => format!(
                r#"<pre><code class="language-{}">{}</code></pre>"#,
                class,
                html_escape(code)
            ),
        }
    }

    /// Add line numbers to highlighted code; `class` must already be escaped
    fn add_line_numbers(&self, code: &str, class: &str) -> String {
        let lines: Vec<&str> = code.lines().collect();

        let gutter = (1..=lines.len())
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code">{}</td></tr></table></figure>"#,
            class,
            gutter,
            lines.join("\n")
        )
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Map Salesforce languages onto the closest bundled syntax
fn syntax_alias(lang: &str) -> &str {
    match lang.to_ascii_lowercase().as_str() {
        "apex" | "cls" | "trigger" => "java",
        "soql" | "sosl" => "sql",
        "lwc" => "js",
        "visualforce" | "vf" | "aura" | "page" | "cmp" => "html",
        _ => lang,
    }
}

/// Give every heading without an explicit id a unique slug id
fn anchor_headings(mut events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    for i in 0..events.len() {
        let Event::Start(Tag::Heading { id: None, .. }) = &events[i] else {
            continue;
        };

        let mut text = String::new();
        for event in &events[i + 1..] {
            match event {
                Event::End(TagEnd::Heading(_)) => break,
                Event::Text(t) | Event::Code(t) => text.push_str(t),
                _ => {}
            }
        }

        let base = slug::slugify(&text);
        let base = if base.is_empty() {
            "section".to_string()
        } else {
            base
        };
        let count = seen.entry(base.clone()).or_insert(0);
        let anchor = if *count == 0 {
            base
        } else {
            format!("{}-{}", base, count)
        };
        *count += 1;

        if let Event::Start(Tag::Heading {
            level,
            classes,
            attrs,
            ..
        }) = std::mem::replace(&mut events[i], Event::SoftBreak)
        {
            events[i] = Event::Start(Tag::Heading {
                level,
                id: Some(CowStr::from(anchor)),
                classes,
                attrs,
            });
        }
    }

    events
}

/// Word count and reading time for a markdown body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadingStats {
    pub words: usize,
    pub minutes: u32,
}

impl ReadingStats {
    /// Count words in prose and code; CJK ideographs count one each
    pub fn from_markdown(markdown: &str, words_per_minute: u32) -> Self {
        let mut words = 0;
        for event in Parser::new_ext(markdown, MarkdownRenderer::options()) {
            if let Event::Text(text) | Event::Code(text) = event {
                words += count_words(&text);
            }
        }

        let wpm = if words_per_minute == 0 {
            DEFAULT_WPM
        } else {
            words_per_minute
        } as usize;

        let minutes = if words == 0 {
            0
        } else {
            words.div_ceil(wpm).max(1) as u32
        };

        Self { words, minutes }
    }
}

fn is_cjk(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
        || ('\u{3040}'..='\u{30FF}').contains(&c)
        || ('\u{AC00}'..='\u{D7AF}').contains(&c)
}

fn count_words(text: &str) -> usize {
    text.split_whitespace()
        .map(|token| {
            let cjk = token.chars().filter(|c| is_cjk(*c)).count();
            let has_word = token.chars().any(|c| c.is_alphanumeric() && !is_cjk(c));
            cjk + usize::from(has_word)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let renderer = MarkdownRenderer::new();
        let html = renderer
            .render("# Hello World\n\nThis is a test.")
            .unwrap();
        assert!(html.contains(r#"<h1 id="hello-world">Hello World</h1>"#));
        assert!(html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_duplicate_heading_ids() {
        let renderer = MarkdownRenderer::new();
        let html = renderer
            .render("## Example\n\ntext\n\n## Example\n")
            .unwrap();
        assert!(html.contains(r#"id="example""#));
        assert!(html.contains(r#"id="example-1""#));
    }

    #[test]
    fn test_explicit_heading_id_kept() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("## Limits {#governor}\n").unwrap();
        assert!(html.contains(r#"id="governor""#));
    }

    #[test]
    fn test_render_apex_block() {
        let renderer = MarkdownRenderer::new();
        let html = renderer
            .render("```apex\npublic class Foo {}\n```")
            .unwrap();
        assert!(html.contains("highlight apex"));
        assert!(html.contains("line-number"));
        assert!(!html.contains("```"));
    }

    #[test]
    fn test_fence_language_escaped() {
        let markdown = "```x\"onmouseover=alert(1)\nSystem.debug('hi');\n```";
        for line_numbers in [true, false] {
            let renderer = MarkdownRenderer::with_options("base16-ocean.dark", line_numbers);
            let html = renderer.render(markdown).unwrap();
            assert!(html.contains("highlight x&quot;onmouseover=alert(1)"));
            assert!(!html.contains("x\"onmouseover"));
        }
    }

    #[test]
    fn test_indented_code_block_not_leaked() {
        let renderer = MarkdownRenderer::with_options("base16-ocean.dark", false);
        let html = renderer.render("Para\n\n    SELECT Id FROM Account\n").unwrap();
        assert!(html.contains("highlight text"));
        assert!(html.contains("<p>Para</p>"));
    }

    #[test]
    fn test_syntax_alias() {
        assert_eq!(syntax_alias("Apex"), "java");
        assert_eq!(syntax_alias("soql"), "sql");
        assert_eq!(syntax_alias("rust"), "rust");
    }

    #[test]
    fn test_reading_stats() {
        let body = "word ".repeat(450);
        let stats = ReadingStats::from_markdown(&body, 200);
        assert_eq!(stats.words, 450);
        assert_eq!(stats.minutes, 3);

        let short = ReadingStats::from_markdown("Just a few words.", 200);
        assert_eq!(short.words, 4);
        assert_eq!(short.minutes, 1);

        assert_eq!(ReadingStats::from_markdown("", 200), ReadingStats::default());
    }

    #[test]
    fn test_reading_stats_counts_code_and_cjk() {
        let stats = ReadingStats::from_markdown("Use `insert acc;` 你好\n", 200);
        assert_eq!(stats.words, 5);
    }
}
