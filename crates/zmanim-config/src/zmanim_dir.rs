//! Discovery of the `.zmanim/` directory.

use std::path::{Path, PathBuf};

const ZMANIM_DIR_NAME: &str = ".zmanim";

/// Overrides discovery when set to an existing directory.
const ZMANIM_DIR_ENV: &str = "ZMANIM_DIR";

/// Walk up from `start` looking for a `.zmanim/` directory.
pub fn find_zmanim_dir(start: &Path) -> Option<PathBuf> {
    if let Ok(env_dir) = std::env::var(ZMANIM_DIR_ENV) {
        let env_path = PathBuf::from(env_dir);
        if env_path.is_dir() {
            return Some(env_path);
        }
    }

    let start = start.canonicalize().ok()?;
    start
        .ancestors()
        .map(|dir| dir.join(ZMANIM_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}
