//! Helper functions shared by the loader, generator and template filters

mod date;
mod html;
mod list;
mod url;

pub use date::*;
pub use html::*;
pub use list::*;
pub use url::*;
