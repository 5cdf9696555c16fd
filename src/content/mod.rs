//! Content module - topics, pages, and content processing

mod frontmatter;
pub mod loader;
mod markdown;
mod topic;

pub use frontmatter::FrontMatter;
pub use markdown::{MarkdownRenderer, ReadingStats};
pub use topic::{Difficulty, Page, Topic};
