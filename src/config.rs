//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/pyebwa/pyebwa.toml`
//! 3. Local config: `<dir>/.pyebwa.toml` (current directory unless given)
//! 4. Environment variables: `PYEBWA_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::statistics::DEFAULT_GENERATION_SPAN;
use crate::domain::ViewMode;

/// Raw settings for intermediate parsing (`None` means "not specified, inherit").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_file: Option<PathBuf>,
    pub default_view: Option<String>,
    pub current_user: Option<String>,
    pub max_depth: Option<usize>,
    pub generation_span_years: Option<i32>,
}

/// Unified configuration for pyebwa.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Member snapshot used when a command gets no file argument
    pub data_file: Option<PathBuf>,
    /// View used by `tree` without `--view`
    pub default_view: String,
    /// Account id used to pick the focus person
    pub current_user: Option<String>,
    /// Generation cap for tree building (unbounded when unset)
    pub max_depth: Option<usize>,
    /// Width of a generation bucket in family statistics
    pub generation_span_years: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: None,
            default_view: ViewMode::Full.to_string(),
            current_user: None,
            max_depth: None,
            generation_span_years: DEFAULT_GENERATION_SPAN,
        }
    }
}

/// Get the XDG config directory for pyebwa.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pyebwa").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("pyebwa.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".pyebwa.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input untouched.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(raw.as_ref()) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

impl Settings {
    /// The configured default view.
    pub fn view_mode(&self) -> Result<ViewMode, ApplicationError> {
        Ok(self.default_view.parse::<ViewMode>()?)
    }

    fn expand_paths(&mut self) {
        if let Some(path) = &self.data_file {
            self.data_file = Some(expand_path(path));
        }
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_file: overlay.data_file.clone().or_else(|| self.data_file.clone()),
            default_view: overlay
                .default_view
                .clone()
                .unwrap_or_else(|| self.default_view.clone()),
            current_user: overlay
                .current_user
                .clone()
                .or_else(|| self.current_user.clone()),
            max_depth: overlay.max_depth.or(self.max_depth),
            generation_span_years: overlay
                .generation_span_years
                .unwrap_or(self.generation_span_years),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Directory holding `.pyebwa.toml`; the current directory when `None`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Local config
        let local_dir = match local_dir {
            Some(dir) => Some(dir.to_path_buf()),
            None => std::env::current_dir().ok(),
        };
        if let Some(dir) = local_dir {
            let local_path = local_config_path(&dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        current.validate()?;

        Ok(current)
    }

    /// Apply PYEBWA_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("PYEBWA")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("data_file") {
            settings.data_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("default_view") {
            settings.default_view = val;
        }
        if let Ok(val) = config.get_string("current_user") {
            settings.current_user = Some(val);
        }
        if let Ok(val) = config.get_string("max_depth") {
            settings.max_depth = Some(parse_env_number("max_depth", &val)?);
        }
        if let Ok(val) = config.get_string("generation_span_years") {
            settings.generation_span_years = parse_env_number("generation_span_years", &val)?;
        }

        Ok(settings)
    }

    /// Reject values the commands cannot work with.
    pub fn validate(&self) -> Result<(), ApplicationError> {
        self.view_mode()
            .map_err(|e| ApplicationError::Config {
                message: format!("default_view: {e}"),
            })?;
        if self.generation_span_years <= 0 {
            return Err(ApplicationError::Config {
                message: format!(
                    "generation_span_years must be positive, got {}",
                    self.generation_span_years
                ),
            });
        }
        Ok(())
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# pyebwa configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/pyebwa/pyebwa.toml
#   Local:  ./.pyebwa.toml
#   Env:    PYEBWA_* environment variables (e.g. PYEBWA_DATA_FILE)

# Member snapshot used when no file is given on the command line
# data_file = "~/family/members.json"

# View for `pyebwa tree`: full, ancestors, descendants or hourglass
# default_view = "full"

# Account id of the current user, picks the focus person of filtered views
# current_user = "uid-123"

# Stop expanding trees below this many generations
# max_depth = 12

# Birth-year span of one generation in statistics
# generation_span_years = 25
"#
        .to_string()
    }
}

fn parse_env_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ApplicationError> {
    value.trim().parse::<T>().map_err(|_| ApplicationError::Config {
        message: format!("PYEBWA_{}: not a number: {}", key.to_uppercase(), value),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
