//! Editor configuration loading (ambient stack): parses an optional TOML
//! file into the knobs the rest of the workspace takes as constructor
//! arguments (tab sizes, the vertical-jump fraction, recursion/loop
//! ceilings, ring capacities). Unknown fields are ignored so the file can
//! gain sections ahead of the code that reads them.

use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct TabConfig {
    pub hard_tab_size: usize,
    /// `0` means hard tabs (`\t` bytes); anything else is a soft-tab width.
    pub soft_tab_size: usize,
}

impl Default for TabConfig {
    fn default() -> Self {
        Self { hard_tab_size: 8, soft_tab_size: 0 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct ScrollConfig {
    pub vjump_num: u16,
    pub vjump_den: u16,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self { vjump_num: 1, vjump_den: 3 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_recursion: usize,
    pub max_loop: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self { max_recursion: 100, max_loop: 10_000 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DisplayConfig {
    pub high_bit_visible: bool,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RingConfig {
    pub kill: usize,
    pub delete: usize,
    pub search: usize,
    pub replace: usize,
    pub macro_ring: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self { kill: 10, delete: 10, search: 20, replace: 20, macro_ring: 20 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(default)]
pub struct EditorConfig {
    pub tabs: TabConfig,
    pub scroll: ScrollConfig,
    pub limits: LimitsConfig,
    pub display: DisplayConfig,
    pub rings: RingConfig,
}

/// Best-effort config path: a local `mm.toml` takes priority over the
/// platform config directory.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("mm.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("mm").join("mm.toml");
    }
    PathBuf::from("mm.toml")
}

/// Loads configuration from `path`, or from [`discover`] if `path` is
/// `None`. A missing file or one with an empty/absent section yields
/// defaults for that section. A file that fails to parse as TOML at all
/// also falls back to defaults, with a warning logged.
pub fn load_from(path: Option<PathBuf>) -> Result<EditorConfig> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(EditorConfig::default());
    };
    match toml::from_str(&content) {
        Ok(config) => {
            info!(target: "config", path = %path.display(), "loaded configuration");
            Ok(config)
        }
        Err(error) => {
            warn!(target: "config", path = %path.display(), %error, "failed to parse config, using defaults");
            Ok(EditorConfig::default())
        }
    }
}

/// Installs a `tracing` subscriber writing to stderr, honoring `RUST_LOG`
/// with an `info`-level default. Call once at process start.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_when_file_missing() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_mm_config__.toml"))).unwrap();
        assert_eq!(cfg, EditorConfig::default());
    }

    #[test]
    fn parses_tab_and_limits_sections() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        fs::write(tmp.path(), "[tabs]\nhard_tab_size = 4\nsoft_tab_size = 4\n[limits]\nmax_loop = 500\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.tabs.hard_tab_size, 4);
        assert_eq!(cfg.tabs.soft_tab_size, 4);
        assert_eq!(cfg.limits.max_loop, 500);
        assert_eq!(cfg.limits.max_recursion, LimitsConfig::default().max_recursion);
    }

    #[test]
    fn falls_back_to_defaults_on_parse_error() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        fs::write(tmp.path(), "not valid toml {{{").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg, EditorConfig::default());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        fs::write(tmp.path(), "[tabs]\nhard_tab_size = 2\nfuture_field = true\n").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.tabs.hard_tab_size, 2);
    }
}
