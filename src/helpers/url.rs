//! URL helpers

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::config::SiteConfig;

/// Characters escaped in URL paths; `/`, `#`, `?` and existing escapes pass through
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

/// Whether a link points off-site
pub fn is_external(path: &str) -> bool {
    path.starts_with("http://")
        || path.starts_with("https://")
        || path.starts_with("//")
        || path.starts_with("mailto:")
}

/// Prefix a site path with the configured root
///
/// External URLs are returned unchanged.
///
/// ```ignore
/// url_for(&config, "basics/apex-intro/") // -> "/guide/basics/apex-intro/"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    if is_external(path) {
        return path.to_string();
    }
    let root = config.root.trim_end_matches('/');
    let path = encode_url(path.trim_start_matches('/'));
    format!("{}/{}", root, path)
}

/// Absolute URL including the site domain
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    if is_external(path) {
        return path.to_string();
    }
    format!("{}{}", config.url.trim_end_matches('/'), url_for(config, path))
}

/// Relative link from one site path to another
///
/// ```ignore
/// relative_url("basics/apex-intro/", "css/guide.css") // -> "../../css/guide.css"
/// ```
pub fn relative_url(from: &str, to: &str) -> String {
    // `from` names a directory when it ends in '/', otherwise a file in one
    let from_dir = match from.trim_start_matches('/') {
        f if f.ends_with('/') || f.is_empty() => f.trim_end_matches('/'),
        f => f.rsplit_once('/').map(|(dir, _)| dir).unwrap_or(""),
    };
    let from_parts: Vec<&str> = from_dir.split('/').filter(|p| !p.is_empty()).collect();

    let trailing = to.ends_with('/');
    let to_parts: Vec<&str> = to.split('/').filter(|p| !p.is_empty()).collect();

    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = vec![".."; from_parts.len() - common];
    parts.extend(&to_parts[common..]);

    if parts.is_empty() {
        return "./".to_string();
    }
    let mut result = parts.join("/");
    if trailing {
        result.push('/');
    }
    result
}

/// Percent-encode a URL path, keeping separators intact
pub fn encode_url(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.url = "https://guide.example.com/".to_string();
        config.root = "/guide/".to_string();
        config
    }

    #[test]
    fn test_url_for() {
        let config = config();
        assert_eq!(url_for(&config, "/css/guide.css"), "/guide/css/guide.css");
        assert_eq!(url_for(&config, "basics/"), "/guide/basics/");
        assert_eq!(url_for(&config, ""), "/guide/");
        assert_eq!(
            url_for(&config, "https://trailhead.salesforce.com"),
            "https://trailhead.salesforce.com"
        );
    }

    #[test]
    fn test_url_for_default_root() {
        let config = SiteConfig::default();
        assert_eq!(url_for(&config, "basics/apex/"), "/basics/apex/");
    }

    #[test]
    fn test_full_url_for() {
        let config = config();
        assert_eq!(
            full_url_for(&config, "basics/apex-intro/"),
            "https://guide.example.com/guide/basics/apex-intro/"
        );
    }

    #[test]
    fn test_relative_url() {
        assert_eq!(
            relative_url("basics/apex-intro/", "css/guide.css"),
            "../../css/guide.css"
        );
        assert_eq!(
            relative_url("basics/apex-intro/", "basics/dml/"),
            "../dml/"
        );
        assert_eq!(relative_url("basics/index.html", "basics/dml/"), "dml/");
        assert_eq!(relative_url("", "search.json"), "search.json");
        assert_eq!(relative_url("basics/", "basics/"), "./");
    }

    #[test]
    fn test_encode_url() {
        assert_eq!(encode_url("tags/apex triggers/"), "tags/apex%20triggers/");
        assert_eq!(encode_url("basics/überblick/"), "basics/%C3%BCberblick/");
        assert_eq!(encode_url("a/b#c"), "a/b#c");
    }
}
