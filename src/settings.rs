//! Configuration for the xtb backend.
//!
//! Settings are resolved once at start-up and then passed around by
//! reference. Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. User configuration (`~/.config/grrm2xtb/grrm2xtb.cfg`)
//! 3. Local configuration (`./grrm2xtb.cfg`)
//! 4. Environment variables (`XTB_CHARGE`, `XTB_MULTI`, ...)
//!
//! # Configuration File Format
//!
//! ```ini
//! [xtb]
//! command = xtb
//! charge = 0
//! multiplicity = 1
//! solvation = alpb
//! solvent = water
//! param = 2
//!
//! [runtime]
//! scratch_dir = /scratch/grrm
//! keep_log = false
//!
//! [logging]
//! level = warn
//! ```
//!
//! Empty values, in files or in the environment, count as unset.

use crate::text::is_truthy;
use configparser::ini::Ini;
use log::{debug, info, warn, LevelFilter};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Local configuration file name.
pub const CONFIG_FILE_NAME: &str = "grrm2xtb.cfg";

/// Environment variables and the setting each one overrides.
pub const ENV_VARIABLES: &[(&str, &str, &str)] = &[
    ("XTB_COMMAND", "xtb", "command"),
    ("XTB_CHARGE", "xtb", "charge"),
    ("XTB_MULTI", "xtb", "multiplicity"),
    ("XTB_SOLVATION", "xtb", "solvation"),
    ("XTB_SOLVENT", "xtb", "solvent"),
    ("XTB_PARAM", "xtb", "param"),
    ("XTB_SCRATCH_DIR", "runtime", "scratch_dir"),
    ("XTB_KEEP_LOG", "runtime", "keep_log"),
];

/// Errors that can occur while resolving the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error when reading configuration files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
    /// Solvation model other than gbsa/alpb
    #[error("Solvation '{0}' is invalid. Use gbsa or alpb.")]
    InvalidSolvation(String),
    /// Solvation model given without a solvent
    #[error("Solvation is turned on but solvent is not specified.")]
    MissingSolvent,
    /// Solvent given without a solvation model
    #[error("Solvation model is not selected but solvent is specified.")]
    MissingSolvationModel,
    /// A configuration file was rejected
    #[error("{}: {source}", .path.display())]
    File {
        /// The rejected file
        path: PathBuf,
        /// Why it was rejected
        source: Box<ConfigError>,
    },
}

type Result<T> = std::result::Result<T, ConfigError>;

/// Implicit solvation model understood by xtb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolvationModel {
    /// Generalized Born with surface area
    Gbsa,
    /// Analytical linearized Poisson-Boltzmann
    Alpb,
}

impl SolvationModel {
    /// Parses a model name, ignoring case.
    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "gbsa" => Ok(SolvationModel::Gbsa),
            "alpb" => Ok(SolvationModel::Alpb),
            _ => Err(ConfigError::InvalidSolvation(name.to_string())),
        }
    }

    /// The xtb command-line flag, e.g. `--alpb`.
    pub fn flag(&self) -> &'static str {
        match self {
            SolvationModel::Gbsa => "--gbsa",
            SolvationModel::Alpb => "--alpb",
        }
    }
}

/// Main configuration structure containing all program settings.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct Settings {
    /// How xtb is called
    pub xtb: XtbSettings,
    /// Working-directory handling
    pub runtime: RuntimeSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Options forwarded to the xtb command line.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct XtbSettings {
    /// xtb executable (default: "xtb")
    pub command: String,
    /// Molecular charge, passed verbatim to `--chrg` (default: "0")
    pub charge: String,
    /// Spin multiplicity, `--uhf` receives `multiplicity - 1` (default: 1)
    pub multiplicity: u32,
    /// Implicit solvation model name (gbsa or alpb)
    pub solvation: Option<String>,
    /// Solvent name for the solvation model
    pub solvent: Option<String>,
    /// GFN parametrization passed to `--gfn`
    pub param: Option<String>,
}

impl Default for XtbSettings {
    fn default() -> Self {
        Self {
            command: "xtb".to_string(),
            charge: "0".to_string(),
            multiplicity: 1,
            solvation: None,
            solvent: None,
            param: None,
        }
    }
}

impl XtbSettings {
    /// Number of unpaired electrons.
    pub fn uhf(&self) -> u32 {
        self.multiplicity.saturating_sub(1)
    }

    /// Resolves the solvation pair.
    ///
    /// Both or neither of model and solvent must be given.
    pub fn solvation(&self) -> Result<Option<(SolvationModel, &str)>> {
        let model = self.solvation.as_deref().map(SolvationModel::parse).transpose()?;
        match (model, self.solvent.as_deref()) {
            (Some(model), Some(solvent)) => Ok(Some((model, solvent))),
            (Some(_), None) => Err(ConfigError::MissingSolvent),
            (None, Some(_)) => Err(ConfigError::MissingSolvationModel),
            (None, None) => Ok(None),
        }
    }
}

/// Scratch-directory settings.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct RuntimeSettings {
    /// Root for per-job working directories (default: current directory)
    pub scratch_dir: Option<PathBuf>,
    /// Keep the working directory and xtb logs after a successful run
    pub keep_log: bool,
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level (default: "warn")
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl LoggingSettings {
    /// Level as a `log` filter.
    ///
    /// Levels read from files or the environment are checked when they are
    /// set; an unknown name assigned directly to `level` falls back to `Warn`.
    pub fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::Warn)
    }
}

impl Settings {
    /// Loads configuration files and the process environment.
    ///
    /// A file that cannot be read, parsed or that holds an invalid value is
    /// an error naming that file, as is an invalid environment value.
    pub fn load() -> Result<Self> {
        let mut settings = Settings::default();

        let mut paths = Vec::new();
        if let Some(user_path) = Self::user_config_path() {
            paths.push(user_path);
        }
        paths.push(PathBuf::from(CONFIG_FILE_NAME));

        let source = match settings.merge_files(&paths)? {
            Some(path) => format!("config file ({})", path.display()),
            None => "built-in defaults".to_string(),
        };

        settings.apply_env(|name| std::env::var(name).ok())?;
        settings.validate()?;
        info!("Configuration loaded from: {} and environment", source);
        Ok(settings)
    }

    /// Merges the existing files among `paths` in order and returns the last
    /// one merged. The first rejected file stops the merge.
    fn merge_files<'a>(&mut self, paths: &'a [PathBuf]) -> Result<Option<&'a Path>> {
        let mut last = None;
        for path in paths.iter().filter(|p| p.exists()) {
            self.merge_file(path).map_err(|e| ConfigError::File {
                path: path.clone(),
                source: Box::new(e),
            })?;
            debug!("Loaded configuration from: {}", path.display());
            last = Some(path.as_path());
        }
        Ok(last)
    }

    /// Merges one INI file into these settings.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)?;
        self.merge_ini(&content)
    }

    /// Merges INI text into these settings; keys that are absent keep their
    /// current value.
    ///
    /// Either every key is applied or, on error, none is.
    pub fn merge_ini(&mut self, content: &str) -> Result<()> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|e| ConfigError::IniParse(format!("Failed to parse INI: {}", e)))?;

        let mut staged = self.clone();
        for (section, entries) in ini.get_map_ref() {
            for (key, value) in entries {
                if let Some(value) = value {
                    staged.set(section, key, value)?;
                }
            }
        }
        *self = staged;
        Ok(())
    }

    /// Applies environment overrides.
    ///
    /// `lookup` returns the value of an environment variable; `load` passes
    /// `std::env::var`, tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut staged = self.clone();
        for (name, section, key) in ENV_VARIABLES {
            if let Some(value) = lookup(name) {
                debug!("{} overrides [{}] {}", name, section, key);
                staged.set(section, key, &value)?;
            }
        }
        *self = staged;
        Ok(())
    }

    /// Checks combinations that cannot be checked one key at a time.
    pub fn validate(&self) -> Result<()> {
        self.xtb.solvation()?;
        Ok(())
    }

    fn set(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(());
        }

        match (section, key) {
            ("xtb", "command") => self.xtb.command = value.to_string(),
            ("xtb", "charge") => self.xtb.charge = value.to_string(),
            ("xtb", "multiplicity") => {
                self.xtb.multiplicity = match value.parse::<u32>() {
                    Ok(m) if m >= 1 => m,
                    _ => {
                        return Err(ConfigError::InvalidValue(format!(
                            "Invalid multiplicity: {}",
                            value
                        )))
                    }
                }
            }
            ("xtb", "solvation") => self.xtb.solvation = Some(value.to_string()),
            ("xtb", "solvent") => self.xtb.solvent = Some(value.to_string()),
            ("xtb", "param") => self.xtb.param = Some(value.to_string()),
            ("runtime", "scratch_dir") => self.runtime.scratch_dir = Some(PathBuf::from(value)),
            ("runtime", "keep_log") => self.runtime.keep_log = is_truthy(value),
            ("logging", "level") => {
                value.parse::<LevelFilter>().map_err(|_| {
                    ConfigError::InvalidValue(format!("Invalid log level: {}", value))
                })?;
                self.logging.level = value.to_lowercase();
            }
            _ => warn!("Ignoring unknown setting [{}] {}", section, key),
        }
        Ok(())
    }

    fn user_config_path() -> Option<PathBuf> {
        std::env::var("HOME").ok().map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("grrm2xtb")
                .join(CONFIG_FILE_NAME)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn with_env(pairs: &[(&str, &str)]) -> Result<Settings> {
        let vars = env(pairs);
        let mut settings = Settings::default();
        settings.apply_env(|name| vars.get(name).cloned())?;
        settings.validate()?;
        Ok(settings)
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.xtb.command, "xtb");
        assert_eq!(settings.xtb.charge, "0");
        assert_eq!(settings.xtb.uhf(), 0);
        assert!(settings.runtime.scratch_dir.is_none());
        assert!(!settings.runtime.keep_log);
        assert_eq!(settings.logging.level_filter(), LevelFilter::Warn);
    }

    #[test]
    fn test_env_overrides() {
        let settings = with_env(&[
            ("XTB_CHARGE", "-1"),
            ("XTB_MULTI", "3"),
            ("XTB_PARAM", "1"),
            ("XTB_SCRATCH_DIR", "/tmp/scratch"),
            ("XTB_KEEP_LOG", "ON"),
        ])
        .unwrap();
        assert_eq!(settings.xtb.charge, "-1");
        assert_eq!(settings.xtb.uhf(), 2);
        assert_eq!(settings.xtb.param.as_deref(), Some("1"));
        assert_eq!(settings.runtime.scratch_dir, Some(PathBuf::from("/tmp/scratch")));
        assert!(settings.runtime.keep_log);
    }

    #[test]
    fn test_empty_env_values_are_unset() {
        let settings = with_env(&[("XTB_CHARGE", ""), ("XTB_SOLVENT", ""), ("XTB_MULTI", "")]).unwrap();
        assert_eq!(settings.xtb.charge, "0");
        assert!(settings.xtb.solvent.is_none());
        assert_eq!(settings.xtb.multiplicity, 1);
    }

    #[test]
    fn test_invalid_multiplicity() {
        assert!(matches!(
            with_env(&[("XTB_MULTI", "doublet")]),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(with_env(&[("XTB_MULTI", "0")]).is_err());
    }

    #[test]
    fn test_solvation_pairs() {
        let settings = with_env(&[("XTB_SOLVATION", "GBSA"), ("XTB_SOLVENT", "water")]).unwrap();
        let (model, solvent) = settings.xtb.solvation().unwrap().unwrap();
        assert_eq!(model, SolvationModel::Gbsa);
        assert_eq!(model.flag(), "--gbsa");
        assert_eq!(solvent, "water");

        assert!(matches!(
            with_env(&[("XTB_SOLVATION", "alpb")]),
            Err(ConfigError::MissingSolvent)
        ));
        assert!(matches!(
            with_env(&[("XTB_SOLVENT", "water")]),
            Err(ConfigError::MissingSolvationModel)
        ));
        assert!(matches!(
            with_env(&[("XTB_SOLVATION", "cosmo"), ("XTB_SOLVENT", "water")]),
            Err(ConfigError::InvalidSolvation(_))
        ));
    }

    #[test]
    fn test_keep_log_values() {
        for value in ["true", "TRUE", "1", "on"] {
            assert!(with_env(&[("XTB_KEEP_LOG", value)]).unwrap().runtime.keep_log);
        }
        for value in ["false", "0", "yes", "off"] {
            assert!(!with_env(&[("XTB_KEEP_LOG", value)]).unwrap().runtime.keep_log);
        }
    }

    #[test]
    fn test_ini_then_env() {
        let mut settings = Settings::default();
        settings
            .merge_ini("[xtb]\ncommand = /opt/xtb/bin/xtb\ncharge = 1\n\n[logging]\nlevel = debug\n")
            .unwrap();
        assert_eq!(settings.xtb.command, "/opt/xtb/bin/xtb");
        assert_eq!(settings.logging.level_filter(), LevelFilter::Debug);

        settings
            .apply_env(|name| (name == "XTB_CHARGE").then(|| "2".to_string()))
            .unwrap();
        assert_eq!(settings.xtb.charge, "2");
        assert_eq!(settings.xtb.command, "/opt/xtb/bin/xtb");
    }

    #[test]
    fn test_ini_invalid_level() {
        let mut settings = Settings::default();
        assert!(settings.merge_ini("[logging]\nlevel = loud\n").is_err());
    }

    #[test]
    fn test_rejected_ini_leaves_settings_unchanged() {
        let mut settings = Settings::default();
        settings.merge_ini("[xtb]\ncharge = -1\n").unwrap();
        let before = settings.clone();

        let err = settings
            .merge_ini(
                "[xtb]\ncharge = 5\nmultiplicity = 0\nparam = 1\nsolvent = water\ncommand = /x/xtb\n",
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert_eq!(settings, before);
        assert_eq!(settings.xtb.charge, "-1");
    }

    #[test]
    fn test_rejected_env_leaves_settings_unchanged() {
        let mut settings = Settings::default();
        let vars = env(&[("XTB_CHARGE", "3"), ("XTB_MULTI", "none")]);
        assert!(settings.apply_env(|name| vars.get(name).cloned()).is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_bad_file_stops_loading() {
        let dir = tempfile::TempDir::new().unwrap();
        let user = dir.path().join("user.cfg");
        let local = dir.path().join("local.cfg");
        std::fs::write(&user, "[xtb]\ncharge = 1\n").unwrap();
        std::fs::write(&local, "[xtb]\nmultiplicity = 0\n").unwrap();
        let paths = vec![dir.path().join("missing.cfg"), user.clone(), local.clone()];

        let mut settings = Settings::default();
        let err = settings.merge_files(&paths).unwrap_err();
        assert!(matches!(err, ConfigError::File { ref path, .. } if *path == local));
        assert!(err.to_string().contains("Invalid multiplicity: 0"));

        let mut settings = Settings::default();
        let last = settings.merge_files(&paths[..2]).unwrap();
        assert_eq!(last, Some(user.as_path()));
        assert_eq!(settings.xtb.charge, "1");
    }

    #[test]
    fn test_level_filter_fallback() {
        let mut logging = LoggingSettings::default();
        logging.level = "loud".to_string();
        assert_eq!(logging.level_filter(), LevelFilter::Warn);
    }

    #[test]
    fn test_settings_serialize() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert!(json.contains("\"command\":\"xtb\""));
        assert!(json.contains("\"keep_log\":false"));
    }
}
