pub mod completions;
pub mod dump;
pub mod import;
pub mod reset;

use std::path::{Path, PathBuf};

use rumble_core::config::RumbleConfig;

/// Anchor a relative path at the project root; absolute paths pass through.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

/// Store database path: `--db` wins over `[store] path`.
pub fn store_path(flag: Option<&Path>, config: &RumbleConfig, project_root: &Path) -> PathBuf {
    resolve_path(project_root, flag.unwrap_or(&config.store.path))
}
