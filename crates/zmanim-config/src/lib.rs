//! Configuration for the zmanim tools.
//!
//! Settings live in `.zmanim/config.yaml`, found by walking up from the
//! working directory. Values are layered: built-in defaults, then the YAML
//! file, then `ZMANIM_`-prefixed environment variables (`__` separates
//! nested keys, e.g. `ZMANIM_CACHE__BACKEND=sqlite`).

pub mod config;
pub mod zmanim_dir;

pub use config::{CacheBackend, ConfigError, ZmanimConfig, load_config, load_config_file};
pub use zmanim_dir::find_zmanim_dir;
