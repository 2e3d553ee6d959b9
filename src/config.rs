//! Application-level configuration loading, including room defaults and team presets.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use tracing::{info, warn};

use crate::state::session::Team;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WORDMANIA_BACK_CONFIG_PATH";
/// Environment variable that overrides the configured admin token.
const ADMIN_TOKEN_ENV: &str = "WORDMANIA_ADMIN_TOKEN";
/// Color used when a room has more teams than presets.
const FALLBACK_COLOR: &str = "#95a5a6";

/// Cosmetic defaults for one team slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamPreset {
    /// Team key (`A`, `B`, ...).
    pub id: String,
    /// Default display name.
    pub name: String,
    /// CSS color.
    pub color: String,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Length of generated room codes.
    pub room_code_length: usize,
    /// Rooms without activity for longer than this are swept.
    pub inactivity_timeout: Duration,
    /// Period of the inactivity sweep.
    pub janitor_interval: Duration,
    /// Round duration used when neither the room nor the request sets one.
    pub default_round_seconds: u32,
    /// Upper bound for any round duration.
    pub max_round_seconds: u32,
    /// Target score used when the host does not pick one.
    pub default_target_score: u32,
    /// Fewest teams a room can have.
    pub min_teams: usize,
    /// Team slots, in order; their count caps the number of teams.
    pub team_presets: Vec<TeamPreset>,
    /// Token required by the admin routes; `None` disables them.
    pub admin_token: Option<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        teams = app_config.team_presets.len(),
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
        };

        config.with_admin_token(
            env::var(ADMIN_TOKEN_ENV)
                .ok()
                .filter(|token| !token.trim().is_empty()),
        )
    }

    /// Override the admin token when `token` is set.
    pub fn with_admin_token(mut self, token: Option<String>) -> Self {
        if token.is_some() {
            self.admin_token = token;
        }
        self
    }

    /// Highest number of teams a room can have.
    pub fn max_teams(&self) -> usize {
        self.team_presets.len().max(self.min_teams)
    }

    /// Clamp a requested round duration into `1..=max_round_seconds`.
    pub fn clamp_round_seconds(&self, seconds: u32) -> u32 {
        seconds.clamp(1, self.max_round_seconds.max(1))
    }

    /// Build the teams of a new room.
    ///
    /// The count is clamped to `min_teams..=max_teams`; names supplied by the host replace
    /// preset names when they are not blank.
    pub fn build_teams(&self, count: Option<u32>, names: &IndexMap<String, String>) -> Vec<Team> {
        let count = count
            .map(|count| count as usize)
            .unwrap_or(self.min_teams)
            .clamp(self.min_teams, self.max_teams());

        (0..count)
            .map(|index| {
                let preset = self.preset(index);
                let name = names
                    .get(&preset.id)
                    .map(|name| name.trim())
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .unwrap_or(preset.name);
                Team {
                    id: preset.id,
                    name,
                    color: preset.color,
                    score: 0,
                    members: IndexSet::new(),
                }
            })
            .collect()
    }

    fn preset(&self, index: usize) -> TeamPreset {
        self.team_presets.get(index).cloned().unwrap_or_else(|| {
            let id = char::from(b'A' + (index % 26) as u8).to_string();
            TeamPreset {
                name: format!("Team {id}"),
                id,
                color: FALLBACK_COLOR.to_string(),
            }
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            room_code_length: 4,
            inactivity_timeout: Duration::from_secs(6 * 60 * 60),
            janitor_interval: Duration::from_secs(15 * 60),
            default_round_seconds: 60,
            max_round_seconds: 600,
            default_target_score: 40,
            min_teams: 2,
            team_presets: default_team_presets(),
            admin_token: None,
        }
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    room_code_length: Option<usize>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(default)]
    inactivity_timeout_secs: Option<Duration>,
    #[serde_as(as = "Option<DurationSeconds<u64>>")]
    #[serde(default)]
    janitor_interval_secs: Option<Duration>,
    default_round_seconds: Option<u32>,
    max_round_seconds: Option<u32>,
    default_target_score: Option<u32>,
    min_teams: Option<usize>,
    #[serde(default)]
    teams: Vec<RawTeamPreset>,
    admin_token: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        let team_presets = if value.teams.is_empty() {
            defaults.team_presets
        } else {
            value.teams.into_iter().map(Into::into).collect()
        };

        Self {
            room_code_length: value
                .room_code_length
                .filter(|length| *length >= 3)
                .unwrap_or(defaults.room_code_length),
            inactivity_timeout: value
                .inactivity_timeout_secs
                .unwrap_or(defaults.inactivity_timeout),
            janitor_interval: value
                .janitor_interval_secs
                .filter(|interval| !interval.is_zero())
                .unwrap_or(defaults.janitor_interval),
            default_round_seconds: value
                .default_round_seconds
                .unwrap_or(defaults.default_round_seconds),
            max_round_seconds: value
                .max_round_seconds
                .unwrap_or(defaults.max_round_seconds),
            default_target_score: value
                .default_target_score
                .unwrap_or(defaults.default_target_score),
            min_teams: value.min_teams.unwrap_or(defaults.min_teams).max(1),
            team_presets,
            admin_token: value.admin_token.filter(|token| !token.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single team slot inside the configuration file.
struct RawTeamPreset {
    id: String,
    name: String,
    color: String,
}

impl From<RawTeamPreset> for TeamPreset {
    fn from(value: RawTeamPreset) -> Self {
        Self {
            id: value.id,
            name: value.name,
            color: value.color,
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

/// Built-in team slots shipped with the binary.
fn default_team_presets() -> Vec<TeamPreset> {
    [
        ("A", "#3498db"),
        ("B", "#e74c3c"),
        ("C", "#2ecc71"),
        ("D", "#f1c40f"),
        ("E", "#9b59b6"),
    ]
    .into_iter()
    .map(|(id, color)| TeamPreset {
        id: id.to_string(),
        name: format!("Team {id}"),
        color: color.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_count_is_clamped_to_presets() {
        let config = AppConfig::default();
        assert_eq!(config.build_teams(None, &IndexMap::new()).len(), 2);
        assert_eq!(config.build_teams(Some(1), &IndexMap::new()).len(), 2);
        assert_eq!(config.build_teams(Some(9), &IndexMap::new()).len(), 5);
    }

    #[test]
    fn custom_team_names_replace_presets() {
        let config = AppConfig::default();
        let mut names = IndexMap::new();
        names.insert("B".to_string(), "  Owls ".to_string());
        names.insert("A".to_string(), "   ".to_string());

        let teams = config.build_teams(Some(3), &names);
        let ids = teams.iter().map(|team| team.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["A", "B", "C"]);
        assert_eq!(teams[0].name, "Team A");
        assert_eq!(teams[1].name, "Owls");
        assert_eq!(teams[1].color, "#e74c3c");
    }

    #[test]
    fn raw_config_merges_onto_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "inactivity_timeout_secs": 120, "default_round_seconds": 45, "admin_token": "" }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.inactivity_timeout, Duration::from_secs(120));
        assert_eq!(config.default_round_seconds, 45);
        assert_eq!(config.team_presets.len(), 5);
        assert!(config.admin_token.is_none());
    }

    #[test]
    fn round_seconds_are_bounded() {
        let config = AppConfig::default();
        assert_eq!(config.clamp_round_seconds(0), 1);
        assert_eq!(config.clamp_round_seconds(5_000), 600);
        assert_eq!(config.clamp_round_seconds(30), 30);
    }
}
