//! Session configuration loaded from an optional TOML file.

use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use phantom_maze_core::{Difficulty, Tile, BEHAVIOR_INTERVAL};
use serde::Deserialize;

/// Settings shared by the `generate` and `simulate` subcommands.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SessionConfig {
    /// Seed feeding every random stream of the session.
    pub(crate) seed: u64,
    /// Difficulty active when the session starts.
    pub(crate) difficulty: Difficulty,
    /// Running seconds between two automatic difficulty increases; zero disables escalation.
    pub(crate) escalation_seconds: f32,
    pub(crate) maze: MazeSection,
    pub(crate) spawning: SpawningSection,
    pub(crate) pursuit: PursuitSection,
    pub(crate) player: PlayerSection,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            difficulty: Difficulty::Low,
            escalation_seconds: 30.0,
            maze: MazeSection::default(),
            spawning: SpawningSection::default(),
            pursuit: PursuitSection::default(),
            player: PlayerSection::default(),
        }
    }
}

impl SessionConfig {
    /// Interval between automatic difficulty increases.
    pub(crate) fn escalation_period(&self) -> Duration {
        Duration::from_secs_f32(self.escalation_seconds.max(0.0))
    }
}

/// Maze dimensions before the corridor expansion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MazeSection {
    pub(crate) columns: u32,
    pub(crate) rows: u32,
    pub(crate) arena_columns: u32,
    pub(crate) arena_rows: u32,
}

impl Default for MazeSection {
    fn default() -> Self {
        Self {
            columns: 21,
            rows: 21,
            arena_columns: 6,
            arena_rows: 6,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SpawningSection {
    pub(crate) min_distance: f32,
    pub(crate) attempts: u32,
    pub(crate) fill_percentage: u32,
    /// Tiles that never hold collectibles.
    pub(crate) excluded_tiles: Vec<Tile>,
    /// Agents queued when a session starts.
    pub(crate) opening_wave: u32,
    pub(crate) first_spawn_delay_ms: u64,
    pub(crate) spawn_spacing_ms: u64,
}

impl Default for SpawningSection {
    fn default() -> Self {
        Self {
            min_distance: 10.0,
            attempts: 50,
            fill_percentage: 50,
            excluded_tiles: vec![Tile::Portal],
            opening_wave: 4,
            first_spawn_delay_ms: 2_000,
            spawn_spacing_ms: 1_500,
        }
    }
}

impl SpawningSection {
    pub(crate) fn first_spawn_delay(&self) -> Duration {
        Duration::from_millis(self.first_spawn_delay_ms)
    }

    pub(crate) fn spawn_spacing(&self) -> Duration {
        Duration::from_millis(self.spawn_spacing_ms)
    }
}

/// Cadence of agent decision making.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PursuitSection {
    pub(crate) behavior_interval_ms: u64,
}

impl Default for PursuitSection {
    fn default() -> Self {
        Self {
            behavior_interval_ms: u64::try_from(BEHAVIOR_INTERVAL.as_millis()).unwrap_or(200),
        }
    }
}

impl PursuitSection {
    pub(crate) fn behavior_interval(&self) -> Duration {
        Duration::from_millis(self.behavior_interval_ms)
    }
}

/// Tuning for the scripted player driven by `simulate`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct PlayerSection {
    /// Cells per second.
    pub(crate) speed: f32,
    /// Seconds between two shots.
    pub(crate) fire_interval: f32,
    pub(crate) fire_range: f32,
    /// Distance at which an agent touching the player deals damage.
    pub(crate) contact_radius: f32,
}

impl Default for PlayerSection {
    fn default() -> Self {
        Self {
            speed: 3.0,
            fire_interval: 1.0,
            fire_range: 6.0,
            contact_radius: 0.5,
        }
    }
}

/// Reads the session file when one is given, otherwise returns the defaults.
pub(crate) fn load(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read session config {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse session config {}", path.display()))
}
