//! Generated HTML fragments: table of contents and progress bars

use lazy_static::lazy_static;
use regex::Regex;

use super::html::{html_escape, strip_html};

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"(?s)<h([1-6])([^>]*)>(.*?)</h[1-6]>").unwrap();
    static ref ID_ATTR: Regex = Regex::new(r#"\bid="([^"]*)""#).unwrap();
}

/// Nested table of contents for headings up to `max_depth`
///
/// Links use the heading's `id` attribute, falling back to a slug of its
/// text. Returns an empty string when there are no headings.
pub fn toc(content: &str, max_depth: usize) -> String {
    let headings: Vec<(usize, String, String)> = HEADING
        .captures_iter(content)
        .filter_map(|cap| {
            let level: usize = cap[1].parse().ok()?;
            if level > max_depth {
                return None;
            }
            let text = strip_html(&cap[3]);
            let id = ID_ATTR
                .captures(&cap[2])
                .map(|id| id[1].to_string())
                .unwrap_or_else(|| slug::slugify(&text));
            Some((level, id, text))
        })
        .collect();

    let Some(base) = headings.iter().map(|(level, _, _)| *level).min() else {
        return String::new();
    };

    let mut html = String::new();
    let mut depth = 0;

    for (level, id, text) in &headings {
        if depth == 0 {
            html.push_str(r#"<ol class="toc">"#);
            depth = 1;
        } else {
            // Never skip a nesting level
            let target = (level - base + 1).min(depth + 1);
            if target > depth {
                html.push_str(r#"<ol class="toc-child">"#);
                depth += 1;
            } else {
                html.push_str("</li>");
                while depth > target {
                    html.push_str("</ol></li>");
                    depth -= 1;
                }
            }
        }
        html.push_str(&format!(
            r##"<li class="toc-item toc-level-{}"><a class="toc-link" href="#{}"><span class="toc-text">{}</span></a>"##,
            level,
            html_escape(id),
            html_escape(text)
        ));
    }

    html.push_str("</li>");
    while depth > 1 {
        html.push_str("</ol></li>");
        depth -= 1;
    }
    html.push_str("</ol>");
    html
}

/// Inline progress bar for a percentage
pub fn progress_bar(percent: u8) -> String {
    let percent = percent.min(100);
    format!(
        r#"<div class="progress" role="progressbar" aria-valuenow="{0}" aria-valuemin="0" aria-valuemax="100"><div class="progress-fill" style="width: {0}%"></div><span class="progress-label">{0}%</span></div>"#,
        percent
    )
}
