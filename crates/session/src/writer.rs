//! Writes build output to disk

use bundlewatch_core::engine::OutputAsset;
use bundlewatch_core::error::{Result, ResultExt};
use std::path::Path;
use tracing::debug;

/// Write every asset under `dir`, creating directories as needed
pub async fn write_assets(dir: &Path, assets: &[OutputAsset]) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .context(format!("Failed to create output directory {}", dir.display()))?;

    for asset in assets {
        let path = dir.join(&asset.file_name);
        if let Some(parent) = path.parent() {
            if parent != dir {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context(format!("Failed to create directory {}", parent.display()))?;
            }
        }
        tokio::fs::write(&path, &asset.content)
            .await
            .context(format!("Failed to write {}", path.display()))?;
        debug!("Wrote {} ({} bytes)", path.display(), asset.content.len());
    }
    Ok(())
}
