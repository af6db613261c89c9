//! Settings store and on-disk locations.
//!
//! Settings are layered with Figment: built-in defaults, then the TOML file,
//! then `STUDENT_RECORDS_`-prefixed environment variables. The file is written
//! with defaults on first run and rewritten by the settings dialog; running
//! processes keep the values they started with.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".student-records";
/// Overrides the data directory entirely when set.
pub const HOME_ENV: &str = "STUDENT_RECORDS_HOME";
const ENV_PREFIX: &str = "STUDENT_RECORDS_";
const CONFIG_FILE_NAME: &str = "config.toml";
const LOG_FILE_NAME: &str = "student-records.log";

/// Connection settings. `host` picks the directory that holds the database
/// file (`localhost` means the data directory); `name` is the file stem.
/// The embedded engine has no accounts, so `user` and `password` are stored
/// for the settings dialog only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default = "default_name")]
    pub name: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            user: default_user(),
            password: default_password(),
            name: default_name(),
        }
    }
}

impl DatabaseSettings {
    /// Absolute path of the SQLite file these settings point at.
    pub fn location(&self, paths: &AppPaths) -> PathBuf {
        let host = self.host.trim();
        let dir = if host.is_empty() || host.eq_ignore_ascii_case("localhost") {
            paths.root().to_path_buf()
        } else {
            PathBuf::from(host)
        };
        let name = self.name.trim();
        let stem = if name.is_empty() { "uobs" } else { name };
        dir.join(format!("{stem}.sqlite"))
    }
}

/// Everything read from the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,
    /// Tracing filter used when `RUST_LOG` is unset.
    #[serde(default = "default_loglevel")]
    pub loglevel: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseSettings::default(),
            loglevel: default_loglevel(),
        }
    }
}

impl Settings {
    /// Defaults overlaid with the settings file. This is what the file holds
    /// and what the settings dialog edits.
    pub fn stored_figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
    }

    /// The stored layers plus `STUDENT_RECORDS_` environment overrides, used to
    /// run the process.
    pub fn figment(path: &Path) -> Figment {
        Self::stored_figment(path).merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Effective settings, environment overrides included. Never `save` these:
    /// the overrides would end up in the file.
    pub fn load(path: &Path) -> Result<Self> {
        Self::figment(path)
            .extract()
            .with_context(|| format!("failed to read settings from {}", path.display()))
    }

    /// Settings as written in the file, without environment overrides.
    pub fn load_stored(path: &Path) -> Result<Self> {
        Self::stored_figment(path)
            .extract()
            .with_context(|| format!("failed to read settings from {}", path.display()))
    }

    /// Load settings, writing the defaults to `path` first when the file does
    /// not exist. The flag reports whether the file was just created.
    pub fn load_or_create(path: &Path) -> Result<(Self, bool)> {
        let created = if path.exists() {
            false
        } else {
            Settings::default().save(path)?;
            true
        };
        Ok((Self::load(path)?, created))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("failed to create settings directory")?;
            }
        }
        let text = toml::to_string_pretty(self).context("failed to serialize settings")?;
        fs::write(path, text)
            .with_context(|| format!("failed to write settings to {}", path.display()))
    }
}

/// Resolved locations of the settings file, log file and default database
/// directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    /// `$STUDENT_RECORDS_HOME` if set, otherwise `~/.student-records`.
    pub fn discover() -> Result<Self> {
        if let Some(dir) = env::var_os(HOME_ENV).filter(|value| !value.is_empty()) {
            return Ok(Self::at(dir));
        }
        let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
        Ok(Self::at(base_dirs.home_dir().join(DATA_DIR_NAME)))
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join(LOG_FILE_NAME)
    }

    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create data directory {}", self.root.display()))
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_user() -> String {
    "root".to_string()
}

fn default_password() -> String {
    "password".to_string()
}

fn default_name() -> String {
    "uobs".to_string()
}

fn default_loglevel() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_first_run_values() {
        let settings = Settings::default();
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.database.user, "root");
        assert_eq!(settings.database.password, "password");
        assert_eq!(settings.database.name, "uobs");
        assert_eq!(settings.loglevel, "info");
    }

    #[test]
    fn localhost_resolves_inside_data_dir() {
        let paths = AppPaths::at("/data/app");
        let db = DatabaseSettings::default();
        assert_eq!(db.location(&paths), PathBuf::from("/data/app/uobs.sqlite"));

        let remote = DatabaseSettings {
            host: "/srv/records".into(),
            name: "campus".into(),
            ..DatabaseSettings::default()
        };
        assert_eq!(remote.location(&paths), PathBuf::from("/srv/records/campus.sqlite"));
    }

    #[test]
    fn blank_name_falls_back_to_default_stem() {
        let paths = AppPaths::at("/x");
        let db = DatabaseSettings {
            name: "  ".into(),
            ..DatabaseSettings::default()
        };
        assert_eq!(db.location(&paths), PathBuf::from("/x/uobs.sqlite"));
    }

    #[test]
    fn environment_overrides_never_reach_the_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                "loglevel = \"debug\"\n\n[database]\nname = \"campus\"\npassword = \"from-file\"\n",
            )?;
            jail.set_env("STUDENT_RECORDS_DATABASE__PASSWORD", "from-env-secret");
            let path = Path::new("config.toml");

            let effective = Settings::load(path).unwrap();
            assert_eq!(effective.database.password, "from-env-secret");

            let mut stored = Settings::load_stored(path).unwrap();
            assert_eq!(stored.database.password, "from-file");
            assert_eq!(stored.loglevel, "debug");

            stored.database.user = "admin".into();
            stored.save(path).unwrap();

            let text = fs::read_to_string(path).unwrap();
            assert!(!text.contains("from-env-secret"));
            assert!(text.contains("from-file"));
            assert_eq!(Settings::load_stored(path).unwrap().database.user, "admin");
            Ok(())
        });
    }

    #[test]
    fn path_helpers_hang_off_root() {
        let paths = AppPaths::at("/r");
        assert_eq!(paths.config_file(), PathBuf::from("/r/config.toml"));
        assert_eq!(paths.log_file(), PathBuf::from("/r/student-records.log"));
    }
}
