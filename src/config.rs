//! Application-level configuration loading: scoring policy, broadcast sizing and lobby options.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{scoring::ScoringPolicy, session::SessionSettings};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "LIVE_EXAM_CONFIG_PATH";
/// Placeholder replaced by the join code in the redirect templates.
const CODE_PLACEHOLDER: &str = "{code}";
const DEFAULT_AVATAR_COUNT: usize = 12;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    base_points: u32,
    speed_floor: f64,
    default_time_limit: Option<Duration>,
    reveal_top: usize,
    finished_top: usize,
    reveal_results: usize,
    lobby_roster_limit: usize,
    channel_capacity: usize,
    identify_timeout: Duration,
    shuffle_options: bool,
    avatar_keys: Vec<String>,
    player_redirect: String,
    lobby_redirect: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        base_points = app_config.base_points,
                        speed_floor = app_config.speed_floor,
                        avatars = app_config.avatar_keys.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a configuration document; missing or invalid keys keep their default.
    pub fn from_json_str(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Self::from)
    }

    /// Scoring parameters applied to every new session.
    pub fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            base_points: self.base_points,
            speed_floor: self.speed_floor,
        }
    }

    /// Settings copied into a session when it is provisioned.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            policy: self.scoring_policy(),
            shuffle_options: self.shuffle_options,
            avatar_keys: self.avatar_keys.clone(),
        }
    }

    /// Time limit applied to questions that carry none.
    pub fn default_time_limit(&self) -> Option<Duration> {
        self.default_time_limit
    }

    /// Leaderboard entries included in a reveal.
    pub fn reveal_top(&self) -> usize {
        self.reveal_top
    }

    /// Leaderboard entries included in the final standings.
    pub fn finished_top(&self) -> usize {
        self.finished_top
    }

    /// Per-player result lines included in a reveal.
    pub fn reveal_results(&self) -> usize {
        self.reveal_results
    }

    /// Players listed in a lobby snapshot.
    pub fn lobby_roster_limit(&self) -> usize {
        self.lobby_roster_limit
    }

    /// Capacity of every per-session broadcast channel.
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Window granted to a socket to send its identify frame.
    pub fn identify_timeout(&self) -> Duration {
        self.identify_timeout
    }

    /// Allowed avatar keys; the first one is the fallback.
    pub fn avatar_keys(&self) -> &[String] {
        &self.avatar_keys
    }

    /// Redirect sent to players once the game starts.
    pub fn player_redirect(&self, code: &str) -> String {
        self.player_redirect.replace(CODE_PLACEHOLDER, code)
    }

    /// Redirect handed to players joining before the game starts.
    pub fn lobby_redirect(&self, code: &str) -> String {
        self.lobby_redirect.replace(CODE_PLACEHOLDER, code)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_points: 1000,
            speed_floor: 0.5,
            default_time_limit: None,
            reveal_top: 10,
            finished_top: 50,
            reveal_results: 50,
            lobby_roster_limit: 50,
            channel_capacity: 64,
            identify_timeout: Duration::from_secs(10),
            shuffle_options: true,
            avatar_keys: default_avatar_keys(),
            player_redirect: "/live/{code}/play".to_string(),
            lobby_redirect: "/live/{code}/lobby".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
///
/// Every key is optional; missing or invalid keys keep their default.
struct RawConfig {
    base_points: Option<u32>,
    speed_floor: Option<f64>,
    default_time_limit_seconds: Option<u32>,
    reveal_top: Option<usize>,
    finished_top: Option<usize>,
    reveal_results: Option<usize>,
    lobby_roster_limit: Option<usize>,
    channel_capacity: Option<usize>,
    identify_timeout_seconds: Option<u64>,
    shuffle_options: Option<bool>,
    avatar_keys: Option<Vec<String>>,
    player_redirect: Option<String>,
    lobby_redirect: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();

        let speed_floor = match value.speed_floor {
            Some(floor) if floor > 0.0 && floor <= 1.0 => floor,
            Some(floor) => {
                warn!(speed_floor = floor, "speed_floor must be in (0, 1]; using default");
                defaults.speed_floor
            }
            None => defaults.speed_floor,
        };

        let avatar_keys = match value.avatar_keys {
            Some(keys) if !keys.is_empty() => keys,
            Some(_) => {
                warn!("avatar_keys is empty; using default avatars");
                defaults.avatar_keys
            }
            None => defaults.avatar_keys,
        };

        Self {
            base_points: value.base_points.unwrap_or(defaults.base_points),
            speed_floor,
            default_time_limit: value
                .default_time_limit_seconds
                .filter(|seconds| *seconds > 0)
                .map(|seconds| Duration::from_secs(u64::from(seconds))),
            reveal_top: value.reveal_top.unwrap_or(defaults.reveal_top),
            finished_top: value.finished_top.unwrap_or(defaults.finished_top),
            reveal_results: value.reveal_results.unwrap_or(defaults.reveal_results),
            lobby_roster_limit: value
                .lobby_roster_limit
                .unwrap_or(defaults.lobby_roster_limit),
            channel_capacity: value
                .channel_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.channel_capacity),
            identify_timeout: value
                .identify_timeout_seconds
                .filter(|seconds| *seconds > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.identify_timeout),
            shuffle_options: value.shuffle_options.unwrap_or(defaults.shuffle_options),
            avatar_keys,
            player_redirect: value.player_redirect.unwrap_or(defaults.player_redirect),
            lobby_redirect: value.lobby_redirect.unwrap_or(defaults.lobby_redirect),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in avatar set shipped with the binary.
fn default_avatar_keys() -> Vec<String> {
    (1..=DEFAULT_AVATAR_COUNT)
        .map(|n| format!("avatar_{n}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_keep_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"base_points": 500}"#).unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.scoring_policy().base_points, 500);
        assert_eq!(config.scoring_policy().speed_floor, 0.5);
        assert_eq!(config.reveal_top(), 10);
        assert_eq!(config.avatar_keys().len(), 12);
        assert_eq!(config.default_time_limit(), None);
    }

    #[test]
    fn invalid_values_fall_back() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"speed_floor": 1.5, "avatar_keys": [], "channel_capacity": 0}"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.scoring_policy().speed_floor, 0.5);
        assert_eq!(config.avatar_keys()[0], "avatar_1");
        assert_eq!(config.channel_capacity(), 64);
    }

    #[test]
    fn redirect_template_substitutes_code() {
        let config = AppConfig::default();
        assert_eq!(config.player_redirect("K7QX2M"), "/live/K7QX2M/play");
        assert_eq!(config.lobby_redirect("K7QX2M"), "/live/K7QX2M/lobby");
    }

    #[test]
    fn time_limit_is_read_in_seconds() {
        let config = AppConfig::from_json_str(r#"{"default_time_limit_seconds": 15}"#).unwrap();
        assert_eq!(
            config.default_time_limit(),
            Some(Duration::from_secs(15))
        );
    }
}
