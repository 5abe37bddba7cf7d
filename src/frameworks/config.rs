use crate::domain::SessionError;
use crate::domain::level::LevelGeometry;
use crate::domain::tuning::SessionConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs, io};
use thiserror::Error;

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("GAME_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

/// Gameplay config file: `SESSION_CONFIG` when set, otherwise `session.toml` if present.
///
/// There are no built-in gameplay defaults, so finding neither is a startup error.
pub fn session_config_path() -> Result<PathBuf, ConfigError> {
    resolve_config_path(env::var("SESSION_CONFIG").ok(), Path::new("session.toml"))
}

fn resolve_config_path(explicit: Option<String>, fallback: &Path) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ if fallback.exists() => Ok(fallback.to_path_buf()),
        _ => Err(ConfigError::Missing {
            fallback: fallback.to_path_buf(),
        }),
    }
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no session config: set SESSION_CONFIG or provide {}", fallback.display())]
    Missing { fallback: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse session config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] SessionError),
}

/// Everything a server needs to host one session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameConfig {
    pub session: SessionConfig,
    pub level: LevelGeometry,
}

impl GameConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        self.session.validate()?;
        if let Some(index) = self.level.first_malformed() {
            return Err(SessionError::InvalidConfiguration(format!(
                "level platform {index} is malformed"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../../session.toml");

    #[test]
    fn when_sample_config_is_loaded_then_it_validates() {
        let config = GameConfig::from_toml(SAMPLE).expect("sample config is valid");
        assert_eq!(config.session.tick_rate_hz, 50);
        assert_eq!(config.session.player_spawn_points.len(), 4);
        assert!(!config.level.platforms.is_empty());
    }

    #[test]
    fn when_a_movement_key_is_missing_then_parsing_fails() {
        let text = SAMPLE.replace("jump_force = 12.0\n", "");
        assert!(matches!(
            GameConfig::from_toml(&text),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn when_a_value_is_degenerate_then_validation_fails() {
        let text = SAMPLE.replace("move_speed = 5.0", "move_speed = 0.0");
        assert!(matches!(
            GameConfig::from_toml(&text),
            Err(ConfigError::Invalid(SessionError::InvalidConfiguration(_)))
        ));
    }

    #[test]
    fn when_no_config_file_exists_then_resolution_fails() {
        let err = resolve_config_path(None, Path::new("no-such-session.toml"))
            .expect_err("nothing to load");
        assert!(matches!(err, ConfigError::Missing { .. }));
        assert!(err.to_string().contains("SESSION_CONFIG"));

        let err = resolve_config_path(Some("  ".to_string()), Path::new("no-such-session.toml"))
            .expect_err("blank override falls through");
        assert!(matches!(err, ConfigError::Missing { .. }));
    }

    #[test]
    fn when_config_path_is_set_or_fallback_exists_then_it_is_used() {
        let explicit = resolve_config_path(Some("custom.toml".to_string()), Path::new("x.toml"))
            .expect("explicit path");
        assert_eq!(explicit, PathBuf::from("custom.toml"));

        let manifest = Path::new(env!("CARGO_MANIFEST_DIR")).join("session.toml");
        let fallback = resolve_config_path(None, &manifest).expect("sample file exists");
        assert_eq!(fallback, manifest);
    }

    #[test]
    fn when_file_is_missing_then_io_error_names_the_path() {
        let err = GameConfig::load(Path::new("does-not-exist.toml")).expect_err("missing file");
        assert!(err.to_string().contains("does-not-exist.toml"));
    }
}
