//! Clean the public directory

use anyhow::Result;
use std::fs;

use crate::Guide;

/// Remove generated output; progress and content are left alone
pub fn run(guide: &Guide) -> Result<()> {
    if guide.public_dir.exists() {
        fs::remove_dir_all(&guide.public_dir)?;
        tracing::info!("Deleted: {:?}", guide.public_dir);
    } else {
        tracing::debug!("Nothing to clean at {:?}", guide.public_dir);
    }
    Ok(())
}
