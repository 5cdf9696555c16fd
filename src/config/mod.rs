//! Configuration module

mod site;

pub use site::humanize;
pub use site::ExamConfig;
pub use site::HighlightConfig;
pub use site::SectionConfig;
pub use site::SiteConfig;
pub use site::CONFIG_FILES;
