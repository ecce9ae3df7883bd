//! Tool configuration.
//!
//! A `refract.yml` loaded relative to a root path drives the run. Missing
//! or malformed configuration is a fatal error raised before any work
//! begins.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;

/// The configuration file name looked up under the root path.
pub const CONFIG_FILE: &str = "refract.yml";

/// Environment variable overriding the addons (template/asset) directory.
pub const ADDONS_ENV: &str = "ADDONS_DIR";

/// Parsed configuration for one run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Config {
    /// Worker count; 0 selects the hardware parallelism.
    pub concurrency: usize,
    /// Emit informational messages.
    pub verbose: bool,
    /// Paths in `input` resolve relative to this directory.
    pub source_root: Option<PathBuf>,
    /// Also document private members.
    pub include_private: bool,
    /// Output format: `adoc`, `xml`, or `bitcode`.
    pub generate: String,
    /// Input paths or glob patterns.
    pub input: Vec<String>,
    /// Macro definitions forwarded to the front-end.
    pub defines: Vec<String>,
    /// Keep going when a translation unit fails to map.
    pub ignore_map_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            concurrency: 0,
            verbose: false,
            source_root: None,
            include_private: false,
            generate: "adoc".to_owned(),
            input: Vec::new(),
            defines: Vec::new(),
            ignore_map_errors: true,
        }
    }
}

impl Config {
    /// Load `refract.yml` from the given root directory.
    pub fn load(root: &Path) -> Result<Self, Error> {
        Self::load_file(&root.join(CONFIG_FILE))
    }

    /// Load a specific configuration file.
    pub fn load_file(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| Error::new(format!("read \"{}\": {err}", path.display())))?;
        let config: Config = serde_yaml::from_str(&text)
            .map_err(|err| Error::new(format!("parse \"{}\": {err}", path.display())))?;
        Ok(config)
    }

    /// The directory searched for templates and assets: the `ADDONS_DIR`
    /// environment variable when set, otherwise `addons` next to the
    /// executable.
    pub fn addons_dir(&self) -> Option<PathBuf> {
        if let Ok(dir) = std::env::var(ADDONS_ENV) {
            if !dir.is_empty() {
                return Some(PathBuf::from(dir));
            }
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("addons")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.concurrency, 0);
        assert_eq!(config.generate, "adoc");
        assert!(config.ignore_map_errors);
        assert!(!config.include_private);
    }

    #[test]
    fn load_recognized_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "concurrency: 4\nverbose: true\nsource-root: src\ninclude-private: true\ngenerate: xml\ninput:\n  - \"include/*.hpp\"\ndefines:\n  - NDEBUG\nignore-map-errors: false\n",
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.concurrency, 4);
        assert!(config.verbose);
        assert_eq!(config.source_root.as_deref(), Some(Path::new("src")));
        assert!(config.include_private);
        assert_eq!(config.generate, "xml");
        assert_eq!(config.input, vec!["include/*.hpp"]);
        assert_eq!(config.defines, vec!["NDEBUG"]);
        assert!(!config.ignore_map_errors);
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(err.failed());
        assert!(err.message().contains(CONFIG_FILE));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "no-such-key: 1\n").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }
}
