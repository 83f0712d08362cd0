//! Layered configuration loading.
//!
//! Later sources override earlier ones:
//!
//! 1. [`AppConfig::default`]
//! 2. Values merged in code ([`ConfigLoader::merge`])
//! 3. `switchyard.{profile}.{ext}`
//! 4. `switchyard.{ext}`
//! 5. `SWITCHYARD_*` environment variables
//!
//! Files are looked up in each search directory in turn (the current
//! directory when none is given); the first directory holding a
//! `switchyard.{ext}` file wins.
//!
//! Supported extensions depend on features: `toml` with `toml-config`
//! (default), `yaml`/`yml` with `yaml-config`.
//!
//! Environment variables use `__` between sections, so
//! `SWITCHYARD_DISPATCH__DEFAULT_CONTROLLER=Home` sets
//! `dispatch.default_controller`. `SWITCHYARD_PROFILE` selects the profile
//! and is not itself a setting.
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .search_path("/etc/blog")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Serialized};
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::AppConfig;

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "SWITCHYARD_";

/// Environment variable selecting the profile.
pub const PROFILE_ENV: &str = "SWITCHYARD_PROFILE";

/// Base name of configuration files.
const FILE_STEM: &str = "switchyard";

// =============================================================================
// Profile
// =============================================================================

/// Deployment profile; selects the `switchyard.{profile}.*` overlay file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    /// Any other name, kept lower-cased.
    Named(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Profile::Development => "development",
            Profile::Production => "production",
            Profile::Named(name) => name,
        }
    }

    /// Parses a profile name. `dev` and `prod` are short forms.
    pub fn parse(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "dev" | "development" => Profile::Development,
            "prod" | "production" => Profile::Production,
            _ => Profile::Named(name),
        }
    }

    /// Reads `SWITCHYARD_PROFILE`; unset means development.
    pub fn from_env() -> Self {
        match std::env::var(PROFILE_ENV) {
            Ok(name) => Profile::parse(&name),
            Err(_) => Profile::Development,
        }
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// File formats
// =============================================================================

/// A configuration file format compiled into this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    /// Enabled formats, in lookup order.
    const ENABLED: &'static [FileFormat] = &[
        #[cfg(feature = "toml-config")]
        FileFormat::Toml,
        #[cfg(feature = "yaml-config")]
        FileFormat::Yaml,
    ];

    fn extensions(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            FileFormat::Toml => &["toml"],
            #[cfg(feature = "yaml-config")]
            FileFormat::Yaml => &["yaml", "yml"],
        }
    }

    fn for_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.extensions().contains(&ext))
    }

    #[cfg_attr(
        not(any(feature = "toml-config", feature = "yaml-config")),
        allow(unused_variables)
    )]
    fn merge_into(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            FileFormat::Toml => figment.merge(figment::providers::Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            FileFormat::Yaml => figment.merge(figment::providers::Yaml::file(path)),
        }
    }
}

// =============================================================================
// ConfigLoader
// =============================================================================

/// Builds an [`AppConfig`] from defaults, files and the environment.
#[derive(Debug)]
pub struct ConfigLoader {
    overrides: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    explicit_file: Option<PathBuf>,
    read_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader for the profile named by `SWITCHYARD_PROFILE`.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            explicit_file: None,
            read_env: true,
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Appends a directory to search for configuration files.
    pub fn search_path(mut self, dir: impl AsRef<Path>) -> Self {
        self.search_paths.push(dir.as_ref().to_path_buf());
        self
    }

    /// Appends `<user config dir>/switchyard` to the search paths, if the
    /// platform has one.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join(FILE_STEM)),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching; it must exist.
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.explicit_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.read_env = true;
        self
    }

    /// Ignores `SWITCHYARD_*` variables.
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Merges values set in code over the defaults.
    ///
    /// Files and the environment still take precedence.
    pub fn merge(mut self, config: AppConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Resolves every source and extracts the configuration.
    pub fn load(self) -> ConfigResult<AppConfig> {
        let profile = self.profile.clone();
        let config: AppConfig = self.into_figment()?.extract()?;

        debug!(
            profile = %profile,
            namespace = %config.dispatch.namespace,
            logging_level = %config.logging.level,
            global_middleware = config.global_middleware.len(),
            "Configuration loaded"
        );

        Ok(config)
    }

    fn into_figment(self) -> ConfigResult<Figment> {
        let mut figment =
            Figment::from(Serialized::defaults(AppConfig::default())).merge(self.overrides.clone());

        match &self.explicit_file {
            Some(path) => figment = Self::merge_explicit(figment, path)?,
            None => {
                let files = self.discover_files();
                if files.is_empty() {
                    warn!("No configuration file found, using defaults");
                }
                for (format, path) in files {
                    info!(path = %path.display(), "Loading configuration file");
                    figment = format.merge_into(figment, &path);
                }
            }
        }

        if self.read_env {
            trace!(prefix = ENV_PREFIX, "Reading environment overrides");
            let env = Env::prefixed(ENV_PREFIX).ignore(&["PROFILE"]).split("__");
            figment = figment.merge(env);
        }

        Ok(figment)
    }

    fn merge_explicit(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        match FileFormat::for_path(path) {
            Some(format) => {
                info!(path = %path.display(), "Loading configuration file");
                Ok(format.merge_into(figment, path))
            }
            None => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Files to merge, lowest precedence first.
    ///
    /// For each enabled format, the first search directory holding the base
    /// file contributes its profile overlay (if any) followed by the base
    /// file.
    fn discover_files(&self) -> Vec<(FileFormat, PathBuf)> {
        let dirs = if self.search_paths.is_empty() {
            std::env::current_dir().into_iter().collect()
        } else {
            self.search_paths.clone()
        };

        let mut files = Vec::new();
        for &format in FileFormat::ENABLED {
            'dirs: for dir in &dirs {
                for ext in format.extensions() {
                    let base = dir.join(format!("{FILE_STEM}.{ext}"));
                    if !base.is_file() {
                        continue;
                    }
                    let overlay = dir.join(format!("{FILE_STEM}.{}.{ext}", self.profile));
                    if overlay.is_file() {
                        debug!(path = %overlay.display(), profile = %self.profile, "Found profile overlay");
                        files.push((format, overlay));
                    }
                    files.push((format, base));
                    break 'dirs;
                }
            }
        }
        files
    }
}

/// Loads configuration from the current directory and the environment.
pub fn load_config() -> ConfigResult<AppConfig> {
    ConfigLoader::new().load()
}

/// Loads `path` plus the environment.
pub fn load_config_from_file(path: impl AsRef<Path>) -> ConfigResult<AppConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use figment::Jail;

    #[test]
    fn test_defaults_without_files() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config, AppConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("prod"), Profile::Production);
        assert_eq!(Profile::parse(" DEV "), Profile::Development);
        assert_eq!(Profile::parse("Staging"), Profile::Named("staging".into()));
        assert_eq!(Profile::Named("qa".into()).to_string(), "qa");
    }

    #[test]
    fn test_programmatic_merge() {
        Jail::expect_with(|jail| {
            let mut base = AppConfig::default();
            base.dispatch.namespace = "shop".into();
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .merge(base)
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.dispatch.namespace, "shop");
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_layered_sources() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "switchyard.toml",
                r#"
                    global_middleware = ["timing"]

                    [dispatch]
                    default_controller = "Home"
                    namespace = "blog"
                "#,
            )?;
            jail.create_file(
                "switchyard.staging.toml",
                r#"
                    [logging]
                    level = "warn"
                "#,
            )?;
            jail.set_env("SWITCHYARD_DISPATCH__NAMESPACE", "shop");

            let config = ConfigLoader::new()
                .profile("staging")
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.dispatch.default_controller, "Home");
            assert_eq!(config.dispatch.namespace, "shop");
            assert_eq!(config.logging.level, LogLevel::Warn);
            assert_eq!(config.global_middleware, ["timing"]);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_overlay_without_base_is_ignored() {
        Jail::expect_with(|jail| {
            jail.create_file("switchyard.production.toml", "[logging]\nlevel = \"error\"")?;
            let config = ConfigLoader::new()
                .profile("prod")
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.logging.level, LogLevel::Info);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = ConfigLoader::new()
            .file("/definitely/not/here/switchyard.toml")
            .without_env()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        Jail::expect_with(|jail| {
            jail.create_file("switchyard.ini", "x = 1")?;
            let err = ConfigLoader::new()
                .file(jail.directory().join("switchyard.ini"))
                .without_env()
                .load()
                .unwrap_err();
            assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
            Ok(())
        });
    }
}
