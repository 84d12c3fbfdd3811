// Configuration loading and parsing (courtside.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Name of the single configuration file, both in `defaults/` and `config/`.
pub const CONFIG_FILE: &str = "courtside.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    pub leaderboard: LeaderboardConfig,
    pub db_path: String,
    pub data_paths: DataPaths,
}

/// Per-category cache lifetimes, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub stats_ttl_secs: u64,
    pub games_ttl_secs: u64,
    pub seasons_ttl_secs: u64,
    pub top_players_ttl_secs: u64,
}

impl CacheConfig {
    pub fn stats_ttl(&self) -> Duration {
        Duration::from_secs(self.stats_ttl_secs)
    }

    pub fn games_ttl(&self) -> Duration {
        Duration::from_secs(self.games_ttl_secs)
    }

    pub fn seasons_ttl(&self) -> Duration {
        Duration::from_secs(self.seasons_ttl_secs)
    }

    pub fn top_players_ttl(&self) -> Duration {
        Duration::from_secs(self.top_players_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stats_ttl_secs: 3 * 60,
            games_ttl_secs: 5 * 60,
            seasons_ttl_secs: 30 * 60,
            top_players_ttl_secs: 2 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardConfig {
    /// Minimum attempts in the window before a player qualifies for a
    /// shooting-percentage leaderboard.
    pub min_shooting_attempts: u32,
    /// How many players the efficiency leaderboard lists.
    pub efficiency_leaders: usize,
    /// Default rolling window used by the report binary.
    pub top_players_window_days: u32,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            min_shooting_attempts: 5,
            efficiency_leaders: 3,
            top_players_window_days: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub games: String,
    pub player_stats: String,
    /// Ballots are optional: a league without peer voting has no file.
    #[serde(default)]
    pub ballots: Option<String>,
}

// ---------------------------------------------------------------------------
// Raw file layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    leaderboard: LeaderboardConfig,
    database: DatabaseSection,
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/courtside.toml` relative to `base_dir`.
///
/// Does not copy defaults; prefer `load_config()` for normal startup.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let config = Config {
        cache: file.cache,
        leaderboard: file.leaderboard,
        db_path: file.database.path,
        data_paths: file.data_paths,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy `defaults/courtside.toml` into `config/` unless a copy is already
/// there. Returns the path written, or `None` when the existing copy was
/// left alone.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let defaults = base_dir.join("defaults").join(CONFIG_FILE);
    let config_dir = base_dir.join("config");
    let target = config_dir.join(CONFIG_FILE);

    if target.is_file() {
        return Ok(None);
    }
    if !defaults.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "neither defaults/{CONFIG_FILE} nor config/{CONFIG_FILE} found in {}; \
                 run from the project root",
                base_dir.display()
            ),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(dest) => dest,
        // Another process got there first.
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => {
            return Err(ConfigError::DefaultsCopyError {
                message: format!("failed to create {}: {e}", target.display()),
            })
        }
    };
    let content = std::fs::read(&defaults).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read {}: {e}", defaults.display()),
    })?;
    std::io::Write::write_all(&mut dest, &content).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to write {}: {e}", target.display()),
    })?;

    info!("Copied default config to {}", target.display());
    Ok(Some(target))
}

/// Loads config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let cache = &config.cache;
    let ttl_fields: &[(&str, u64)] = &[
        ("cache.stats_ttl_secs", cache.stats_ttl_secs),
        ("cache.games_ttl_secs", cache.games_ttl_secs),
        ("cache.seasons_ttl_secs", cache.seasons_ttl_secs),
        ("cache.top_players_ttl_secs", cache.top_players_ttl_secs),
    ];
    for (name, val) in ttl_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    let board = &config.leaderboard;
    if board.min_shooting_attempts == 0 {
        return Err(ConfigError::ValidationError {
            field: "leaderboard.min_shooting_attempts".into(),
            message: "must be > 0".into(),
        });
    }
    if board.efficiency_leaders == 0 {
        return Err(ConfigError::ValidationError {
            field: "leaderboard.efficiency_leaders".into(),
            message: "must be > 0".into(),
        });
    }
    if board.top_players_window_days == 0 {
        return Err(ConfigError::ValidationError {
            field: "leaderboard.top_players_window_days".into(),
            message: "must be > 0".into(),
        });
    }

    if config.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Workspace root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
    }

    fn default_text() -> String {
        fs::read_to_string(project_root().join("defaults").join(CONFIG_FILE)).unwrap()
    }

    /// Fresh scratch directory containing `config/courtside.toml` with `text`.
    fn scratch_with_config(name: &str, text: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config").join(CONFIG_FILE), text).unwrap();
        tmp
    }

    #[test]
    fn load_default_config() {
        let tmp = scratch_with_config("courtside_config_defaults", &default_text());
        let config = load_config_from(&tmp).expect("default config should load");

        assert_eq!(config.cache.stats_ttl(), Duration::from_secs(180));
        assert_eq!(config.cache.games_ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.seasons_ttl(), Duration::from_secs(1800));
        assert_eq!(config.cache.top_players_ttl(), Duration::from_secs(120));
        assert_eq!(config.leaderboard.min_shooting_attempts, 5);
        assert_eq!(config.leaderboard.efficiency_leaders, 3);
        assert_eq!(config.leaderboard.top_players_window_days, 30);
        assert_eq!(config.db_path, "courtside.db");
        assert_eq!(config.data_paths.games, "data/games.csv");
        assert_eq!(config.data_paths.ballots.as_deref(), Some("data/ballots.csv"));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let text = "[database]\npath = \"x.db\"\n\n[data_paths]\ngames = \"g.csv\"\nplayer_stats = \"p.csv\"\n";
        let tmp = scratch_with_config("courtside_config_sparse", text);
        let config = load_config_from(&tmp).expect("sparse config should load");

        assert_eq!(config.cache.stats_ttl_secs, 180);
        assert_eq!(config.leaderboard.min_shooting_attempts, 5);
        assert!(config.data_paths.ballots.is_none());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_ttl() {
        let text = default_text().replace("top_players_ttl_secs = 120", "top_players_ttl_secs = 0");
        let tmp = scratch_with_config("courtside_config_zero_ttl", &text);

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "cache.top_players_ttl_secs");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_min_attempts() {
        let text = default_text().replace(
            "min_shooting_attempts   = 5",
            "min_shooting_attempts   = 0",
        );
        let tmp = scratch_with_config("courtside_config_zero_attempts", &text);

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "leaderboard.min_shooting_attempts");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_config() {
        let tmp = std::env::temp_dir().join("courtside_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => assert!(path.ends_with(CONFIG_FILE)),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = scratch_with_config("courtside_config_invalid", "not valid [[[ toml");

        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_copies_once() {
        let tmp = std::env::temp_dir().join("courtside_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::write(defaults_dir.join(CONFIG_FILE), default_text()).unwrap();

        let copied = ensure_config_file(&tmp).expect("should copy defaults");
        assert_eq!(copied, Some(tmp.join("config").join(CONFIG_FILE)));
        assert!(load_config_from(&tmp).is_ok());

        // Second run leaves the edited copy alone.
        fs::write(tmp.join("config").join(CONFIG_FILE), "# custom\n").unwrap();
        assert_eq!(ensure_config_file(&tmp).expect("should succeed"), None);
        let content = fs::read_to_string(tmp.join("config").join(CONFIG_FILE)).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn existing_config_needs_no_defaults() {
        let tmp = scratch_with_config("courtside_config_no_defaults", &default_text());
        assert_eq!(ensure_config_file(&tmp).unwrap(), None);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_errors_when_nothing_to_copy() {
        let tmp = std::env::temp_dir().join("courtside_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = ensure_config_file(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/courtside.toml"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
