#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Phantom Maze simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters and systems submit
//! [`Command`] values describing desired mutations, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! for systems to react to deterministically. Systems read immutable views such
//! as [`GridView`] and [`AgentView`] and respond exclusively with new command
//! batches.

use std::{borrow::Cow, cmp::Ordering, collections::BinaryHeap, fmt, time::Duration};

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Phantom Maze.";

/// Interval between two behavior evaluations of the same agent.
pub const BEHAVIOR_INTERVAL: Duration = Duration::from_millis(200);

/// Speed of an agent before the difficulty multiplier is applied, in cells per second.
pub const BASE_AGENT_SPEED: f32 = 3.0;

/// Hit points every agent spawns with.
pub const AGENT_MAX_HEALTH: Health = Health::new(2);

/// Hit points the player starts each session with.
pub const PLAYER_MAX_HEALTH: Health = Health::new(3);

/// Points awarded for consuming a single collectible.
pub const COLLECTIBLE_SCORE: u32 = 25;

/// Points awarded for destroying an agent.
pub const AGENT_KILL_SCORE: u32 = 200;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the maze with the provided tile layout and rebuilds the navigation grid.
    InstallLayout {
        /// Finalized tile layout produced by the maze generator.
        layout: TileLayout,
    },
    /// Resets all session state and starts the simulation clock.
    StartGame,
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Reports the latest position and movement hint of the tracked player.
    UpdateTarget {
        /// Player position expressed in cell units.
        position: Vec2,
        /// Current player velocity, when the adapter can provide one.
        velocity: Option<Vec2>,
    },
    /// Switches the active difficulty and reapplies it to every live agent.
    SetDifficulty {
        /// Difficulty level that should become active.
        level: Difficulty,
    },
    /// Requests that a new agent appear at the provided cell.
    SpawnAgent {
        /// Behavior variant assigned to the new agent.
        kind: AgentKind,
        /// Walkable cell the agent should occupy.
        cell: CellCoord,
    },
    /// Replaces an agent's route with a freshly planned one.
    AssignRoute {
        /// Agent receiving the route.
        agent: AgentId,
        /// Cells to visit in order, excluding the agent's current cell.
        route: Vec<CellCoord>,
    },
    /// Moves an agent along its route.
    MoveAgent {
        /// Agent being moved.
        agent: AgentId,
        /// New position expressed in cell units.
        position: Vec2,
        /// Whether the agent arrived at its current waypoint.
        reached_waypoint: bool,
    },
    /// Offsets an agent without touching its route or heading.
    NudgeAgent {
        /// Agent being displaced.
        agent: AgentId,
        /// Displacement expressed in cell units.
        offset: Vec2,
    },
    /// Applies a single point of damage to an agent.
    DamageAgent {
        /// Agent that was hit.
        agent: AgentId,
    },
    /// Applies a single point of damage to the player.
    DamagePlayer,
    /// Replaces the set of collectibles scattered through the maze.
    PlaceCollectibles {
        /// Cells that should each hold one collectible.
        cells: Vec<CellCoord>,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a new maze layout is active.
    LayoutInstalled {
        /// Number of columns in the installed layout.
        columns: u32,
        /// Number of rows in the installed layout.
        rows: u32,
        /// Number of cells agents may traverse.
        walkable: usize,
    },
    /// Announces that a fresh session started.
    GameStarted {
        /// Difficulty active at the start of the session.
        difficulty: Difficulty,
    },
    /// Announces that a new difficulty level is in effect.
    DifficultyChanged {
        /// Level that became active.
        level: Difficulty,
    },
    /// Confirms that an agent entered the maze.
    AgentSpawned {
        /// Identifier assigned to the new agent.
        agent: AgentId,
        /// Behavior variant of the new agent.
        kind: AgentKind,
        /// Cell the agent occupies after spawning.
        cell: CellCoord,
    },
    /// Reports that a spawn request was refused.
    SpawnRejected {
        /// Behavior variant that was requested.
        kind: AgentKind,
        /// Cell provided in the request.
        cell: CellCoord,
        /// Reason the request failed.
        reason: SpawnRejection,
    },
    /// Confirms that an agent received a new route.
    RouteAssigned {
        /// Agent that received the route.
        agent: AgentId,
        /// Number of cells in the route.
        length: usize,
    },
    /// Reports that an agent lost health without dying.
    AgentDamaged {
        /// Agent that was damaged.
        agent: AgentId,
        /// Remaining health.
        health: Health,
        /// Health the agent spawned with, for indicator scaling.
        max_health: Health,
    },
    /// Reports that an agent was destroyed and removed from the maze.
    AgentDied {
        /// Agent that died.
        agent: AgentId,
        /// Behavior variant of the agent.
        kind: AgentKind,
        /// Cell the agent occupied when it died.
        cell: CellCoord,
    },
    /// Confirms that a batch of collectibles was placed.
    CollectiblesPlaced {
        /// Number of collectibles now present.
        count: usize,
    },
    /// Reports that the player picked up a collectible.
    CollectibleConsumed {
        /// Cell that held the collectible.
        cell: CellCoord,
        /// Collectibles left in the maze.
        remaining: usize,
    },
    /// Reports that the last collectible of the batch was consumed.
    AllCollectiblesConsumed,
    /// Reports the player's updated score.
    ScoreChanged {
        /// Score accumulated during the current session.
        score: u32,
    },
    /// Reports that the player lost health.
    PlayerDamaged {
        /// Remaining player health.
        health: Health,
    },
    /// Reports that the player died and the session ended.
    PlayerDied {
        /// Final score of the session.
        score: u32,
        /// Highest score reached since the process started.
        best_score: u32,
    },
}

/// Reasons a spawn request may be refused by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnRejection {
    /// No session is running.
    NotRunning,
    /// The requested cell is unknown or blocked.
    NotWalkable,
    /// The difficulty's agent cap is already reached.
    CapacityReached,
}

/// Lifecycle stage of the current session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    /// Waiting for the first `StartGame` command.
    #[default]
    Idle,
    /// Simulation time is advancing.
    Running,
    /// The player died; time is frozen until the next `StartGame`.
    GameOver,
}

/// Errors produced while generating a maze.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum MazeError {
    /// Width or height was even or smaller than three.
    #[error("maze dimensions must be odd and at least 3 (received {columns}x{rows})")]
    InvalidDimensions {
        /// Requested number of columns.
        columns: u32,
        /// Requested number of rows.
        rows: u32,
    },
}

/// Errors produced by path searches.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// The open set was exhausted before the goal was reached.
    #[error("no path from {from} to {to}")]
    NoPathFound {
        /// Cell the search started from.
        from: CellCoord,
        /// Cell the search tried to reach.
        to: CellCoord,
    },
    /// An endpoint does not belong to the grid.
    #[error("cell {0} is not part of the grid")]
    UnknownCoordinate(CellCoord),
}

/// Errors produced while choosing spawn locations.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    /// The grid has no walkable cell to sample from.
    #[error("no walkable cell is available for spawning")]
    SpaceExhausted,
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// The center of a cell sits on its integer coordinates in world space, so a
/// cell covers the half-open square `[column - 0.5, column + 0.5)` by
/// `[row - 0.5, row + 0.5)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: i32,
    row: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Returns the cell displaced by the provided column and row deltas.
    #[must_use]
    pub const fn offset(self, columns: i32, rows: i32) -> Self {
        Self::new(self.column + columns, self.row + rows)
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Four-connected neighbors in the fixed order east, west, south, north.
    #[must_use]
    pub const fn cardinal_neighbors(self) -> [CellCoord; 4] {
        [
            self.offset(1, 0),
            self.offset(-1, 0),
            self.offset(0, 1),
            self.offset(0, -1),
        ]
    }

    /// World-space center of the cell.
    #[must_use]
    pub fn center(self) -> Vec2 {
        Vec2::new(self.column as f32, self.row as f32)
    }

    /// Cell that contains the provided world-space point.
    #[must_use]
    pub fn containing(point: Vec2) -> Self {
        Self::new((point.x + 0.5).floor() as i32, (point.y + 0.5).floor() as i32)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Contents of a single maze cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tile {
    /// Impassable wall.
    Wall,
    /// Open corridor.
    Path,
    /// Open arena centerpiece.
    Portal,
}

impl Tile {
    /// Reports whether agents may occupy the tile.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Wall)
    }
}

/// Source of tiles for building navigation data.
pub trait TileSource {
    /// Number of columns and rows covered by the source.
    fn dimensions(&self) -> (u32, u32);

    /// Tile stored at the provided cell, or `None` when the cell is unknown.
    fn tile_at(&self, cell: CellCoord) -> Option<Tile>;
}

/// Destination for presenting a generated layout.
pub trait RenderSink {
    /// Removes everything previously drawn.
    fn clear_all(&mut self);

    /// Draws a single tile at the provided cell.
    fn render_tile(&mut self, cell: CellCoord, tile: Tile);
}

/// Occlusion query used by agent perception.
pub trait LineOfSight {
    /// Reports whether nothing blocks the straight segment between two points.
    fn has_line_of_sight(&self, from: Vec2, to: Vec2) -> bool;
}

/// Dense row-major tile buffer describing a maze.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileLayout {
    columns: u32,
    rows: u32,
    tiles: Vec<Tile>,
}

impl TileLayout {
    /// Creates a layout of the provided size with every cell set to `tile`.
    #[must_use]
    pub fn filled(columns: u32, rows: u32, tile: Tile) -> Self {
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            rows,
            tiles: vec![tile; capacity],
        }
    }

    /// Number of columns in the layout.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows in the layout.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Tile stored at the provided cell.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<Tile> {
        self.index(cell).and_then(|index| self.tiles.get(index).copied())
    }

    /// Overwrites the tile at the provided cell, returning `false` when out of bounds.
    pub fn set(&mut self, cell: CellCoord, tile: Tile) -> bool {
        match self.index(cell).and_then(|index| self.tiles.get_mut(index)) {
            Some(slot) => {
                *slot = tile;
                true
            }
            None => false,
        }
    }

    /// Number of cells holding the provided tile.
    #[must_use]
    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|candidate| **candidate == tile).count()
    }

    /// Iterates every cell in row-major order together with its tile.
    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, Tile)> + '_ {
        let columns = self.columns.max(1) as usize;
        self.tiles.iter().enumerate().map(move |(index, tile)| {
            let column = (index % columns) as i32;
            let row = (index / columns) as i32;
            (CellCoord::new(column, row), *tile)
        })
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        let column = u32::try_from(cell.column()).ok()?;
        let row = u32::try_from(cell.row()).ok()?;
        if column >= self.columns || row >= self.rows {
            return None;
        }

        let width = usize::try_from(self.columns).ok()?;
        let row = usize::try_from(row).ok()?;
        let column = usize::try_from(column).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

impl TileSource for TileLayout {
    fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn tile_at(&self, cell: CellCoord) -> Option<Tile> {
        self.tile(cell)
    }
}

/// Walkability record of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridNode {
    position: CellCoord,
    walkable: bool,
}

impl GridNode {
    /// Creates a node for the provided cell.
    #[must_use]
    pub const fn new(position: CellCoord, walkable: bool) -> Self {
        Self { position, walkable }
    }

    /// Cell represented by the node.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Whether agents may traverse the node.
    #[must_use]
    pub const fn is_walkable(&self) -> bool {
        self.walkable
    }
}

/// Read-only view into the navigation grid.
#[derive(Clone, Debug)]
pub struct GridView<'a> {
    columns: u32,
    rows: u32,
    nodes: Cow<'a, [GridNode]>,
    walkable: Cow<'a, [CellCoord]>,
}

impl<'a> GridView<'a> {
    /// Captures a view backed by the provided node and walkable slices.
    #[must_use]
    pub fn new(columns: u32, rows: u32, nodes: &'a [GridNode], walkable: &'a [CellCoord]) -> Self {
        Self {
            columns,
            rows,
            nodes: Cow::Borrowed(nodes),
            walkable: Cow::Borrowed(walkable),
        }
    }

    /// Creates a view that owns its node and walkable buffers.
    #[must_use]
    pub fn from_owned(
        columns: u32,
        rows: u32,
        nodes: Vec<GridNode>,
        walkable: Vec<CellCoord>,
    ) -> GridView<'static> {
        GridView {
            columns,
            rows,
            nodes: Cow::Owned(nodes),
            walkable: Cow::Owned(walkable),
        }
    }

    /// Number of columns and rows covered by the grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Number of nodes stored in the grid.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Dense index of the provided cell, if it belongs to the grid.
    #[must_use]
    pub fn index_of(&self, cell: CellCoord) -> Option<usize> {
        let column = u32::try_from(cell.column()).ok()?;
        let row = u32::try_from(cell.row()).ok()?;
        if column >= self.columns || row >= self.rows {
            return None;
        }

        let width = usize::try_from(self.columns).ok()?;
        let index = usize::try_from(row)
            .ok()?
            .checked_mul(width)?
            .checked_add(usize::try_from(column).ok()?)?;
        (index < self.nodes.len()).then_some(index)
    }

    /// Node stored at the provided dense index.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&GridNode> {
        self.nodes.get(index)
    }

    /// Node stored for the provided cell.
    #[must_use]
    pub fn lookup(&self, cell: CellCoord) -> Option<&GridNode> {
        self.index_of(cell).and_then(|index| self.nodes.get(index))
    }

    /// Reports whether the cell exists and may be traversed.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.lookup(cell).is_some_and(GridNode::is_walkable)
    }

    /// Walkable cells in the order they were discovered while building the grid.
    #[must_use]
    pub fn walkable_cells(&self) -> &[CellCoord] {
        &self.walkable
    }

    /// Number of walkable four-connected neighbors around the cell.
    #[must_use]
    pub fn walkable_neighbor_count(&self, cell: CellCoord) -> usize {
        cell.cardinal_neighbors()
            .into_iter()
            .filter(|neighbor| self.is_walkable(*neighbor))
            .count()
    }

    /// Samples a walkable cell uniformly at random.
    pub fn random_walkable<R>(&self, rng: &mut R) -> Option<CellCoord>
    where
        R: Rng + ?Sized,
    {
        if self.walkable.is_empty() {
            return None;
        }

        let index = rng.gen_range(0..self.walkable.len());
        self.walkable.get(index).copied()
    }
}

impl LineOfSight for GridView<'_> {
    /// Walks every cell the segment crosses and fails on the first blocked one.
    ///
    /// The cell holding `from` is skipped so agents nudged against a wall can
    /// still see out of it.
    fn has_line_of_sight(&self, from: Vec2, to: Vec2) -> bool {
        let target = CellCoord::containing(to);
        let mut cell = CellCoord::containing(from);
        if cell == target {
            return true;
        }

        let delta = to - from;
        let origin = from + Vec2::splat(0.5);
        let step_column = if delta.x > 0.0 { 1 } else { -1 };
        let step_row = if delta.y > 0.0 { 1 } else { -1 };
        let t_delta_x = if delta.x == 0.0 {
            f32::INFINITY
        } else {
            delta.x.recip().abs()
        };
        let t_delta_y = if delta.y == 0.0 {
            f32::INFINITY
        } else {
            delta.y.recip().abs()
        };
        let mut t_max_x = boundary_distance(origin.x, delta.x);
        let mut t_max_y = boundary_distance(origin.y, delta.y);

        let budget = self.columns as usize + self.rows as usize + 2;
        for _ in 0..budget.max(target.manhattan_distance(cell) as usize + 1) {
            if t_max_x < t_max_y {
                cell = cell.offset(step_column, 0);
                t_max_x += t_delta_x;
            } else {
                cell = cell.offset(0, step_row);
                t_max_y += t_delta_y;
            }

            if !self.is_walkable(cell) {
                return false;
            }
            if cell == target {
                return true;
            }
        }

        true
    }
}

fn boundary_distance(origin: f32, delta: f32) -> f32 {
    if delta > 0.0 {
        (origin.floor() + 1.0 - origin) / delta
    } else if delta < 0.0 {
        (origin - origin.floor()) / -delta
    } else {
        f32::INFINITY
    }
}

/// Global challenge level applied to every agent.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Short sight, short memory, no coordination.
    #[default]
    Low,
    /// Agents coordinate and remember longer.
    Medium,
    /// Agents see furthest, remember longest and replan fastest.
    High,
}

impl Difficulty {
    /// Every level in ascending order.
    pub const ALL: [Difficulty; 3] = [Self::Low, Self::Medium, Self::High];

    /// Next harder level, if any.
    #[must_use]
    pub const fn raised(self) -> Option<Self> {
        match self {
            Self::Low => Some(Self::Medium),
            Self::Medium => Some(Self::High),
            Self::High => None,
        }
    }

    /// Human readable name of the level.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Tuning applied to agents and the spawner while the level is active.
    #[must_use]
    pub const fn profile(self) -> DifficultyProfile {
        match self {
            Self::Low => DifficultyProfile {
                vision_range: 6.0,
                memory_duration: Duration::from_millis(1_500),
                speed_multiplier: 3.0,
                recalculation_interval: Duration::from_millis(2_500),
                coordination: false,
                respawn_delay: Duration::from_secs(5),
                max_agents: 7,
            },
            Self::Medium => DifficultyProfile {
                vision_range: 8.0,
                memory_duration: Duration::from_secs(3),
                speed_multiplier: 3.0,
                recalculation_interval: Duration::from_secs(2),
                coordination: true,
                respawn_delay: Duration::from_secs(5),
                max_agents: 7,
            },
            Self::High => DifficultyProfile {
                vision_range: 10.0,
                memory_duration: Duration::from_secs(5),
                speed_multiplier: 3.0,
                recalculation_interval: Duration::from_secs(1),
                coordination: true,
                respawn_delay: Duration::from_secs(3),
                max_agents: 7,
            },
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-level tuning values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DifficultyProfile {
    /// Distance within which agents can spot the player.
    pub vision_range: f32,
    /// How long agents keep chasing a last known position.
    pub memory_duration: Duration,
    /// Factor applied to [`BASE_AGENT_SPEED`].
    pub speed_multiplier: f32,
    /// Cooldown between optional route recalculations.
    pub recalculation_interval: Duration,
    /// Whether agents see each other, flank and keep separation.
    pub coordination: bool,
    /// Delay before a destroyed agent is replaced.
    pub respawn_delay: Duration,
    /// Maximum number of agents alive at once.
    pub max_agents: u32,
}

impl DifficultyProfile {
    /// Agent movement speed in cells per second.
    #[must_use]
    pub fn agent_speed(&self) -> f32 {
        BASE_AGENT_SPEED * self.speed_multiplier
    }
}

/// Behavior variants available to agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgentKind {
    /// Chases the player directly and remembers where it was last seen.
    Direct,
    /// Aims ahead of the player and patrols intersections.
    Ambusher,
    /// Flanks the player opposite other agents or keeps a stand-off distance.
    Flanker,
    /// Flees when the player is close and chases when it is far.
    Evasive,
}

impl AgentKind {
    /// Every variant in spawn rotation order.
    pub const ALL: [AgentKind; 4] = [Self::Direct, Self::Ambusher, Self::Flanker, Self::Evasive];
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Remaining hit points of an agent or the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Health(u32);

impl Health {
    /// Creates a health value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric hit points.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Whether no hit points remain.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.0 == 0
    }

    /// Health after losing the provided amount, saturating at zero.
    #[must_use]
    pub const fn saturating_sub(self, amount: u32) -> Self {
        Self(self.0.saturating_sub(amount))
    }

    /// Share of `max` that remains, in `0.0..=1.0`.
    #[must_use]
    pub fn fraction_of(self, max: Health) -> f32 {
        if max.0 == 0 {
            return 0.0;
        }
        (self.0 as f32 / max.0 as f32).clamp(0.0, 1.0)
    }
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Behavior variant of the agent.
    pub kind: AgentKind,
    /// Position expressed in cell units.
    pub position: Vec2,
    /// Unit vector the agent faces.
    pub heading: Vec2,
    /// Route the agent follows, excluding the cell it started from.
    pub route: Vec<CellCoord>,
    /// Index of the next waypoint within `route`.
    pub route_cursor: usize,
    /// Movement speed in cells per second.
    pub speed: f32,
    /// Distance within which the agent can spot the player.
    pub vision_range: f32,
    /// How long the agent remembers a sighting.
    pub memory_duration: Duration,
    /// Cooldown between optional route recalculations.
    pub recalculation_interval: Duration,
    /// Whether the agent coordinates with other agents.
    pub coordination: bool,
    /// Remaining hit points.
    pub health: Health,
    /// Hit points the agent spawned with.
    pub max_health: Health,
}

impl AgentSnapshot {
    /// Cell containing the agent's position.
    #[must_use]
    pub fn cell(&self) -> CellCoord {
        CellCoord::containing(self.position)
    }

    /// Next waypoint the agent is heading for.
    #[must_use]
    pub fn next_waypoint(&self) -> Option<CellCoord> {
        self.route.get(self.route_cursor).copied()
    }

    /// Whether the agent has no waypoint left to visit.
    #[must_use]
    pub fn route_exhausted(&self) -> bool {
        self.route_cursor >= self.route.len()
    }
}

/// Read-only snapshot describing all agents within the maze.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured agent snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Snapshot of the agent with the provided identifier.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of agents captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the view holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Last reported state of the tracked player.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TargetSnapshot {
    /// Player position expressed in cell units.
    pub position: Vec2,
    /// Player velocity, when the adapter reported one.
    pub velocity: Option<Vec2>,
}

/// Queue of tasks that become due once simulated time reaches their wake time.
///
/// Tasks scheduled for the same instant are released in the order they were
/// scheduled.
#[derive(Clone, Debug)]
pub struct Timeline<T> {
    now: Duration,
    sequence: u64,
    pending: BinaryHeap<Scheduled<T>>,
}

impl<T> Timeline<T> {
    /// Creates an empty timeline starting at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            sequence: 0,
            pending: BinaryHeap::new(),
        }
    }

    /// Current simulated time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Number of tasks still waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no task is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Schedules `task` to become due after `delay` of simulated time.
    pub fn schedule_in(&mut self, delay: Duration, task: T) {
        let due = self.now.saturating_add(delay);
        self.pending.push(Scheduled {
            due,
            sequence: self.sequence,
            task,
        });
        self.sequence = self.sequence.wrapping_add(1);
    }

    /// Advances simulated time and returns every task that became due.
    pub fn advance(&mut self, dt: Duration) -> Vec<T> {
        self.now = self.now.saturating_add(dt);
        let mut due = Vec::new();
        while self
            .pending
            .peek()
            .is_some_and(|scheduled| scheduled.due <= self.now)
        {
            if let Some(scheduled) = self.pending.pop() {
                due.push(scheduled.task);
            }
        }
        due
    }

    /// Drops every waiting task and rewinds the clock to zero.
    pub fn reset(&mut self) {
        self.now = Duration::ZERO;
        self.sequence = 0;
        self.pending.clear();
    }
}

impl<T> Default for Timeline<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
struct Scheduled<T> {
    due: Duration,
    sequence: u64,
    task: T,
}

impl<T> PartialEq for Scheduled<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.sequence == other.sequence
    }
}

impl<T> Eq for Scheduled<T> {}

impl<T> PartialOrd for Scheduled<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Scheduled<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the max-heap yields the earliest task first.
        (other.due, other.sequence).cmp(&(self.due, self.sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, -3);
        assert_eq!(origin.manhattan_distance(destination), 7);
        assert_eq!(destination.manhattan_distance(origin), 7);
    }

    #[test]
    fn containing_cell_rounds_to_nearest_center() {
        assert_eq!(CellCoord::containing(Vec2::new(2.4, 3.6)), CellCoord::new(2, 4));
        assert_eq!(CellCoord::containing(Vec2::new(-0.4, 0.49)), CellCoord::new(0, 0));
        assert_eq!(CellCoord::containing(Vec2::new(-0.6, 0.5)), CellCoord::new(-1, 1));
        assert_eq!(CellCoord::new(5, 7).center(), Vec2::new(5.0, 7.0));
    }

    #[test]
    fn layout_round_trips_through_bincode() {
        let mut layout = TileLayout::filled(3, 2, Tile::Wall);
        assert!(layout.set(CellCoord::new(1, 1), Tile::Portal));
        let bytes = bincode::serialize(&layout).expect("serialize");
        let restored: TileLayout = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, layout);
    }

    #[test]
    fn layout_rejects_out_of_bounds_writes() {
        let mut layout = TileLayout::filled(2, 2, Tile::Path);
        assert!(!layout.set(CellCoord::new(2, 0), Tile::Wall));
        assert!(!layout.set(CellCoord::new(0, -1), Tile::Wall));
        assert_eq!(layout.tile(CellCoord::new(-1, 0)), None);
        assert_eq!(layout.count(Tile::Path), 4);
    }

    #[test]
    fn raising_difficulty_never_weakens_agents() {
        for pair in Difficulty::ALL.windows(2) {
            let easier = pair[0].profile();
            let harder = pair[1].profile();
            assert!(harder.speed_multiplier >= easier.speed_multiplier);
            assert!(harder.vision_range >= easier.vision_range);
            assert!(harder.memory_duration >= easier.memory_duration);
            assert!(harder.recalculation_interval <= easier.recalculation_interval);
        }
        assert_eq!(Difficulty::High.raised(), None);
    }

    #[test]
    fn health_fraction_is_clamped() {
        assert_eq!(Health::new(1).fraction_of(AGENT_MAX_HEALTH), 0.5);
        assert_eq!(Health::new(5).fraction_of(Health::new(2)), 1.0);
        assert_eq!(Health::new(1).fraction_of(Health::new(0)), 0.0);
    }

    #[test]
    fn timeline_releases_tasks_in_due_order() {
        let mut timeline = Timeline::new();
        timeline.schedule_in(Duration::from_millis(300), "late");
        timeline.schedule_in(Duration::from_millis(100), "early");
        timeline.schedule_in(Duration::from_millis(100), "early-second");

        assert!(timeline.advance(Duration::from_millis(50)).is_empty());
        assert_eq!(
            timeline.advance(Duration::from_millis(60)),
            vec!["early", "early-second"]
        );
        assert_eq!(timeline.advance(Duration::from_secs(1)), vec!["late"]);
        assert!(timeline.is_empty());
    }

    #[test]
    fn random_walkable_only_returns_walkable_cells() {
        let view = corridor_view();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut seen = [false; 3];
        for _ in 0..200 {
            let cell = view.random_walkable(&mut rng).expect("walkable cell");
            assert!(view.is_walkable(cell));
            seen[cell.column() as usize] = true;
        }
        assert!(seen.iter().all(|hit| *hit), "every walkable cell is reachable");
    }

    #[test]
    fn line_of_sight_is_blocked_by_walls() {
        let view = corridor_view();
        assert!(view.has_line_of_sight(Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0)));
        assert!(!view.has_line_of_sight(Vec2::new(0.0, 0.0), Vec2::new(0.0, 2.0)));
        assert!(!view.has_line_of_sight(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0)));
    }

    #[test]
    fn unknown_cells_are_not_walkable() {
        let view = corridor_view();
        assert!(!view.is_walkable(CellCoord::new(-1, 0)));
        assert!(view.lookup(CellCoord::new(3, 0)).is_none());
        assert_eq!(view.walkable_neighbor_count(CellCoord::new(1, 0)), 2);
    }

    /// Three-by-three grid whose top row is open and everything else is wall.
    fn corridor_view() -> GridView<'static> {
        let mut nodes = Vec::new();
        let mut walkable = Vec::new();
        for row in 0..3 {
            for column in 0..3 {
                let cell = CellCoord::new(column, row);
                let open = row == 0;
                nodes.push(GridNode::new(cell, open));
                if open {
                    walkable.push(cell);
                }
            }
        }
        GridView::from_owned(3, 3, nodes, walkable)
    }
}
