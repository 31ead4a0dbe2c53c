#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for agents and collectibles.
//!
//! The system owns a [`Timeline`] of pending spawns. Starting a session
//! scatters a fresh batch of collectibles and queues the opening wave of
//! agents; destroyed agents are replaced after the difficulty's respawn delay
//! and an emptied maze is refilled with collectibles straight away.

use std::time::Duration;

use glam::Vec2;
use phantom_maze_core::{
    AgentKind, CellCoord, Command, Difficulty, Event, GridView, SpawnError, TargetSnapshot,
    Tile, TileSource, Timeline,
};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    min_spawn_distance: f32,
    spawn_attempts: u32,
    fill_percentage: u32,
    opening_wave: u32,
    first_spawn_delay: Duration,
    spawn_spacing: Duration,
    random_kind_chance: f64,
    excluded_tiles: Vec<Tile>,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration with the provided placement rules and seed.
    #[must_use]
    pub fn new(
        min_spawn_distance: f32,
        spawn_attempts: u32,
        fill_percentage: u32,
        rng_seed: u64,
    ) -> Self {
        Self {
            min_spawn_distance,
            spawn_attempts,
            fill_percentage: fill_percentage.min(100),
            opening_wave: 4,
            first_spawn_delay: Duration::from_secs(2),
            spawn_spacing: Duration::from_millis(1_500),
            random_kind_chance: 0.25,
            excluded_tiles: vec![Tile::Portal],
            rng_seed,
        }
    }

    /// Overrides the tiles that never receive collectibles.
    #[must_use]
    pub fn with_excluded_tiles(mut self, excluded_tiles: Vec<Tile>) -> Self {
        self.excluded_tiles = excluded_tiles;
        self
    }

    /// Overrides the size and pacing of the wave spawned at session start.
    #[must_use]
    pub fn with_opening_wave(
        mut self,
        opening_wave: u32,
        first_spawn_delay: Duration,
        spawn_spacing: Duration,
    ) -> Self {
        self.opening_wave = opening_wave;
        self.first_spawn_delay = first_spawn_delay;
        self.spawn_spacing = spawn_spacing;
        self
    }

    /// Overrides the probability that a spawn ignores the kind rotation.
    #[must_use]
    pub fn with_random_kind_chance(mut self, chance: f64) -> Self {
        self.random_kind_chance = chance.clamp(0.0, 1.0);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(10.0, 50, 50, 0)
    }
}

/// Outcome of choosing a spawn cell for an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    /// Cell the agent should appear in.
    pub cell: CellCoord,
    /// Whether the distance rule had to be abandoned.
    pub fallback: bool,
}

/// Samples walkable cells until one lies at least `min_distance` from the player.
///
/// When no sample qualifies within `attempts` tries, the last sample is used
/// and the placement is flagged as a fallback.
pub fn place_agent<R>(
    grid: &GridView<'_>,
    player: Vec2,
    min_distance: f32,
    attempts: u32,
    rng: &mut R,
) -> Result<Placement, SpawnError>
where
    R: Rng + ?Sized,
{
    let mut last = None;
    for _ in 0..attempts.max(1) {
        let cell = grid.random_walkable(rng).ok_or(SpawnError::SpaceExhausted)?;
        if cell.center().distance(player) >= min_distance {
            return Ok(Placement {
                cell,
                fallback: false,
            });
        }
        last = Some(cell);
    }

    let cell = last.ok_or(SpawnError::SpaceExhausted)?;
    warn!(
        attempts,
        min_distance,
        column = cell.column(),
        row = cell.row(),
        "no spawn cell far enough from the player, spawning anyway"
    );
    Ok(Placement {
        cell,
        fallback: true,
    })
}

/// Picks a shuffled share of walkable cells to hold collectibles.
///
/// Cells whose tile appears in `excluded` are never chosen. The number of
/// cells is the candidate count scaled by `fill_percentage` and rounded to
/// the nearest integer.
pub fn select_collectible_cells<T, R>(
    grid: &GridView<'_>,
    tiles: &T,
    excluded: &[Tile],
    fill_percentage: u32,
    rng: &mut R,
) -> Vec<CellCoord>
where
    T: TileSource + ?Sized,
    R: Rng + ?Sized,
{
    let mut candidates: Vec<CellCoord> = grid
        .walkable_cells()
        .iter()
        .copied()
        .filter(|cell| {
            tiles
                .tile_at(*cell)
                .is_some_and(|tile| !excluded.contains(&tile))
        })
        .collect();
    candidates.shuffle(rng);

    let share = candidates.len() as f32 * fill_percentage.min(100) as f32 / 100.0;
    candidates.truncate(share.round() as usize);
    candidates
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SpawnTask {
    Agent,
}

/// Pure system that emits agent and collectible spawn commands.
#[derive(Debug)]
pub struct Spawning {
    config: Config,
    rng: ChaCha8Rng,
    timeline: Timeline<SpawnTask>,
    rotation: usize,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            timeline: Timeline::new(),
            rotation: 0,
        }
    }

    /// Number of agent spawns still waiting on the timeline.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.timeline.len()
    }

    /// Consumes events and immutable views to emit spawn commands.
    #[allow(clippy::too_many_arguments)]
    pub fn handle<T>(
        &mut self,
        events: &[Event],
        grid: &GridView<'_>,
        tiles: &T,
        target: TargetSnapshot,
        difficulty: Difficulty,
        live_agents: usize,
        out: &mut Vec<Command>,
    ) where
        T: TileSource + ?Sized,
    {
        let profile = difficulty.profile();
        let cap = usize::try_from(profile.max_agents).unwrap_or(usize::MAX);

        for event in events {
            match event {
                Event::LayoutInstalled { .. } => {
                    self.timeline.reset();
                }
                Event::GameStarted { .. } => {
                    self.timeline.reset();
                    self.rotation = 0;
                    self.scatter_collectibles(grid, tiles, out);

                    let wave = self.config.opening_wave.min(profile.max_agents);
                    for index in 0..wave {
                        let delay = self
                            .config
                            .first_spawn_delay
                            .saturating_add(self.config.spawn_spacing.saturating_mul(index));
                        self.timeline.schedule_in(delay, SpawnTask::Agent);
                    }
                }
                Event::AgentDied { .. } => {
                    if live_agents < cap {
                        self.timeline
                            .schedule_in(profile.respawn_delay, SpawnTask::Agent);
                    }
                }
                Event::AllCollectiblesConsumed => {
                    self.scatter_collectibles(grid, tiles, out);
                }
                Event::TimeAdvanced { dt } => {
                    for task in self.timeline.advance(*dt) {
                        match task {
                            SpawnTask::Agent => self.spawn_agent(grid, target.position, out),
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn scatter_collectibles<T>(&mut self, grid: &GridView<'_>, tiles: &T, out: &mut Vec<Command>)
    where
        T: TileSource + ?Sized,
    {
        let cells = select_collectible_cells(
            grid,
            tiles,
            &self.config.excluded_tiles,
            self.config.fill_percentage,
            &mut self.rng,
        );
        debug!(count = cells.len(), "scattering collectibles");
        out.push(Command::PlaceCollectibles { cells });
    }

    fn spawn_agent(&mut self, grid: &GridView<'_>, player: Vec2, out: &mut Vec<Command>) {
        match place_agent(
            grid,
            player,
            self.config.min_spawn_distance,
            self.config.spawn_attempts,
            &mut self.rng,
        ) {
            Ok(placement) => {
                let kind = self.next_kind();
                out.push(Command::SpawnAgent {
                    kind,
                    cell: placement.cell,
                });
            }
            Err(error) => warn!(%error, "skipping agent spawn"),
        }
    }

    fn next_kind(&mut self) -> AgentKind {
        let scheduled = AgentKind::ALL[self.rotation % AgentKind::ALL.len()];
        self.rotation = self.rotation.wrapping_add(1);
        if self.rng.gen_bool(self.config.random_kind_chance) {
            AgentKind::ALL[self.rng.gen_range(0..AgentKind::ALL.len())]
        } else {
            scheduled
        }
    }
}
