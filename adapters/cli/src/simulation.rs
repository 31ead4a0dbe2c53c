//! Headless game session driven by a scripted player.
//!
//! The session wires the world to every system and pumps commands until the
//! world falls quiet, once per frame. The scripted player wanders between
//! random cells along A* routes, shoots the nearest visible agent whenever its
//! weapon is ready and takes contact damage from agents that reach it.

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use glam::Vec2;
use phantom_maze_core::{
    AgentId, AgentView, CellCoord, Command, Difficulty, Event, GridView, LineOfSight,
    SessionPhase, TileLayout,
};
use phantom_maze_system_difficulty::{self as difficulty, DifficultyDirector};
use phantom_maze_system_movement::{move_towards, Movement, ARRIVAL_EPSILON};
use phantom_maze_system_pathfinding::Pathfinder;
use phantom_maze_system_pursuit::{self as pursuit, Pursuit};
use phantom_maze_system_spawning::{self as spawning, Spawning};
use phantom_maze_world::{self as world, query, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::{PlayerSection, SessionConfig};

const FRAMES_PER_SECOND: u32 = 60;
const FRAME: Duration = Duration::from_nanos(1_000_000_000 / FRAMES_PER_SECOND as u64);

/// Running game session with all systems attached.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    pursuit: Pursuit,
    movement: Movement,
    spawning: Spawning,
    director: DifficultyDirector,
    player: ScriptedPlayer,
    report: SimulationReport,
}

impl Session {
    /// Installs the layout, places the player near the center and starts the game.
    pub(crate) fn start(config: &SessionConfig, layout: TileLayout) -> Result<Self> {
        let seed = config.seed;
        let mut session = Self {
            world: World::new(),
            pursuit: Pursuit::new(
                pursuit::Config::new(seed)
                    .with_behavior_interval(config.pursuit.behavior_interval()),
            ),
            movement: Movement,
            spawning: Spawning::new(spawning::Config::new(
                config.spawning.min_distance,
                config.spawning.attempts,
                config.spawning.fill_percentage,
                seed.wrapping_add(1),
            )
            .with_excluded_tiles(config.spawning.excluded_tiles.clone())
            .with_opening_wave(
                config.spawning.opening_wave,
                config.spawning.first_spawn_delay(),
                config.spawning.spawn_spacing(),
            )),
            director: DifficultyDirector::new(difficulty::Config::new(config.escalation_period())),
            player: ScriptedPlayer::new(&config.player, seed.wrapping_add(2)),
            report: SimulationReport::default(),
        };

        session.dispatch(Command::InstallLayout { layout });
        let start = central_cell(&query::grid_view(&session.world))
            .context("maze has no walkable cell for the player")?;
        session.player.position = start.center();

        session.dispatch(Command::SetDifficulty {
            level: config.difficulty,
        });
        session.dispatch(Command::UpdateTarget {
            position: session.player.position,
            velocity: None,
        });
        session.dispatch(Command::StartGame);
        Ok(session)
    }

    /// Banner greeting the player of this session.
    pub(crate) fn banner(&self) -> &'static str {
        query::welcome_banner(&self.world)
    }

    /// Plays frames until `duration` of game time passed or the player died.
    pub(crate) fn run(mut self, duration: Duration) -> SimulationReport {
        let frames = duration
            .as_millis()
            .saturating_mul(u128::from(FRAMES_PER_SECOND))
            / 1_000;
        let frames = u32::try_from(frames).unwrap_or(u32::MAX);

        for _ in 0..frames {
            if query::phase(&self.world) != SessionPhase::Running {
                break;
            }
            self.step();
            self.report.frames += 1;
        }

        self.report.score = query::score(&self.world);
        self.report.best_score = query::best_score(&self.world);
        self.report.difficulty = query::difficulty(&self.world);
        self.report
    }

    fn step(&mut self) {
        let velocity = self
            .player
            .walk(&query::grid_view(&self.world), FRAME);
        self.dispatch(Command::UpdateTarget {
            position: self.player.position,
            velocity: Some(velocity),
        });

        let shot = self.player.aim(
            FRAME,
            &query::agent_view(&self.world),
            &query::grid_view(&self.world),
        );
        if let Some(agent) = shot {
            self.dispatch(Command::DamageAgent { agent });
        }

        self.dispatch(Command::Tick { dt: FRAME });

        if self.player.touching(&query::agent_view(&self.world)) {
            self.dispatch(Command::DamagePlayer);
        }
    }

    fn dispatch(&mut self, command: Command) {
        let mut pending = vec![command];
        while !pending.is_empty() {
            let mut events = Vec::new();
            for command in pending.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }

            let grid = query::grid_view(&self.world);
            let agents = query::agent_view(&self.world);
            let target = query::target(&self.world);
            let level = query::difficulty(&self.world);

            self.spawning.handle(
                &events,
                &grid,
                query::layout(&self.world),
                target,
                level,
                agents.len(),
                &mut pending,
            );
            self.director.handle(&events, level, &mut pending);
            // Moves must land before fresh routes reset the waypoint cursor.
            self.movement.handle(&events, &agents, &mut pending);
            self.pursuit
                .handle(&events, &agents, &grid, &grid, target, &mut pending);

            self.report.record(&events);
        }
    }
}

/// Walkable cell closest to the middle of the grid.
fn central_cell(grid: &GridView<'_>) -> Option<CellCoord> {
    let (columns, rows) = grid.dimensions();
    let middle = Vec2::new(columns as f32 / 2.0, rows as f32 / 2.0);
    grid.walkable_cells()
        .iter()
        .copied()
        .min_by(|left, right| {
            left.center()
                .distance_squared(middle)
                .total_cmp(&right.center().distance_squared(middle))
        })
}

#[derive(Debug)]
struct ScriptedPlayer {
    position: Vec2,
    route: Vec<CellCoord>,
    route_cursor: usize,
    speed: f32,
    fire_interval: Duration,
    fire_cooldown: Duration,
    fire_range: f32,
    contact_radius: f32,
    pathfinder: Pathfinder,
    rng: ChaCha8Rng,
}

impl ScriptedPlayer {
    fn new(config: &PlayerSection, seed: u64) -> Self {
        Self {
            position: Vec2::ZERO,
            route: Vec::new(),
            route_cursor: 0,
            speed: config.speed,
            fire_interval: Duration::from_secs_f32(config.fire_interval.max(0.0)),
            fire_cooldown: Duration::ZERO,
            fire_range: config.fire_range,
            contact_radius: config.contact_radius,
            pathfinder: Pathfinder::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Advances along the current errand and returns the resulting velocity.
    fn walk(&mut self, grid: &GridView<'_>, dt: Duration) -> Vec2 {
        if self.route_cursor >= self.route.len() {
            self.plan_errand(grid);
        }
        let Some(waypoint) = self.route.get(self.route_cursor).map(|cell| cell.center()) else {
            return Vec2::ZERO;
        };

        let seconds = dt.as_secs_f32();
        let next = move_towards(self.position, waypoint, self.speed * seconds);
        if next.distance(waypoint) < ARRIVAL_EPSILON {
            self.route_cursor += 1;
        }
        let velocity = if seconds > 0.0 {
            (next - self.position) / seconds
        } else {
            Vec2::ZERO
        };
        self.position = next;
        velocity
    }

    fn plan_errand(&mut self, grid: &GridView<'_>) {
        self.route.clear();
        self.route_cursor = 0;
        let Some(goal) = grid.random_walkable(&mut self.rng) else {
            return;
        };

        let start = CellCoord::containing(self.position);
        match self.pathfinder.find_path(grid, start, goal) {
            Ok(route) => self.route = route,
            Err(error) => debug!(%error, "scripted player skipped an errand"),
        }
    }

    /// Picks the nearest agent in range and sight once the weapon is ready.
    fn aim<L>(&mut self, dt: Duration, agents: &AgentView, sight: &L) -> Option<AgentId>
    where
        L: LineOfSight + ?Sized,
    {
        self.fire_cooldown = self.fire_cooldown.saturating_sub(dt);
        if !self.fire_cooldown.is_zero() {
            return None;
        }

        let origin = self.position;
        let target = agents
            .iter()
            .filter(|agent| agent.position.distance(origin) <= self.fire_range)
            .filter(|agent| sight.has_line_of_sight(origin, agent.position))
            .min_by(|left, right| {
                left.position
                    .distance_squared(origin)
                    .total_cmp(&right.position.distance_squared(origin))
            })?;

        self.fire_cooldown = self.fire_interval;
        Some(target.id)
    }

    fn touching(&self, agents: &AgentView) -> bool {
        agents
            .iter()
            .any(|agent| agent.position.distance(self.position) <= self.contact_radius)
    }
}

/// Summary of a finished simulation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SimulationReport {
    pub(crate) frames: u32,
    pub(crate) score: u32,
    pub(crate) best_score: u32,
    pub(crate) agents_spawned: u32,
    pub(crate) agents_destroyed: u32,
    pub(crate) collectibles_consumed: u32,
    pub(crate) difficulty: Difficulty,
    pub(crate) player_died: bool,
}

impl SimulationReport {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::LayoutInstalled {
                    columns,
                    rows,
                    walkable,
                } => info!(columns, rows, walkable, "maze installed"),
                Event::GameStarted { difficulty } => info!(%difficulty, "session started"),
                Event::DifficultyChanged { level } => info!(%level, "difficulty changed"),
                Event::AgentSpawned { agent, kind, cell } => {
                    self.agents_spawned += 1;
                    info!(agent = agent.get(), ?kind, %cell, "agent spawned");
                }
                Event::SpawnRejected { kind, cell, reason } => {
                    debug!(?kind, %cell, ?reason, "agent spawn rejected");
                }
                Event::AgentDamaged {
                    agent,
                    health,
                    max_health,
                } => {
                    debug!(
                        agent = agent.get(),
                        health = health.fraction_of(*max_health),
                        "agent damaged"
                    );
                }
                Event::AgentDied { agent, kind, cell } => {
                    self.agents_destroyed += 1;
                    info!(agent = agent.get(), ?kind, %cell, "agent destroyed");
                }
                Event::CollectibleConsumed { .. } => self.collectibles_consumed += 1,
                Event::AllCollectiblesConsumed => info!("every collectible consumed"),
                Event::PlayerDamaged { health } => {
                    info!(health = health.get(), "player damaged");
                }
                Event::PlayerDied { score, best_score } => {
                    self.player_died = true;
                    info!(score, best_score, "player died");
                }
                _ => {}
            }
        }
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "frames played:          {}", self.frames)?;
        writeln!(f, "final difficulty:       {}", self.difficulty)?;
        writeln!(f, "score:                  {}", self.score)?;
        writeln!(f, "best score:             {}", self.best_score)?;
        writeln!(f, "agents spawned:         {}", self.agents_spawned)?;
        writeln!(f, "agents destroyed:       {}", self.agents_destroyed)?;
        writeln!(f, "collectibles consumed:  {}", self.collectibles_consumed)?;
        write!(
            f,
            "outcome:                {}",
            if self.player_died {
                "player died"
            } else {
                "player survived"
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phantom_maze_core::{AgentKind, Tile, TileLayout};
    use phantom_maze_system_maze_generation::{Config as MazeConfig, MazeGenerator};

    fn small_session(seed: u64) -> Session {
        let mut config = SessionConfig::default();
        config.seed = seed;
        let layout = MazeGenerator::new(MazeConfig::new(11, 11, seed))
            .generate()
            .expect("valid maze dimensions");
        Session::start(&config, layout).expect("session starts")
    }

    #[test]
    fn player_starts_in_the_middle_of_the_maze() {
        let session = small_session(1);

        let target = query::target(&session.world).position;
        assert!(target.distance(Vec2::new(11.0, 11.0)) <= 1.5);
        assert_eq!(query::phase(&session.world), SessionPhase::Running);
        assert_eq!(session.banner(), phantom_maze_core::WELCOME_BANNER);
    }

    #[test]
    fn short_runs_play_every_frame() {
        let report = small_session(2).run(Duration::from_secs(1));

        assert_eq!(report.frames, 60);
        assert!(!report.player_died);
        assert_eq!(report.agents_spawned, 0);
    }

    #[test]
    fn opening_wave_and_collectibles_show_up_in_the_report() {
        let report = small_session(3).run(Duration::from_secs(4));

        assert!(report.agents_spawned >= 1);
        assert!(report.collectibles_consumed > 0);
        assert_eq!(
            report.score,
            report.collectibles_consumed * 25 + report.agents_destroyed * 200
        );
    }

    #[test]
    fn opening_wave_follows_the_spawning_settings() {
        let layout = || {
            MazeGenerator::new(MazeConfig::new(11, 11, 3))
                .generate()
                .expect("valid maze dimensions")
        };

        let mut quiet = SessionConfig::default();
        quiet.seed = 3;
        quiet.spawning.opening_wave = 0;
        let report = Session::start(&quiet, layout())
            .expect("session starts")
            .run(Duration::from_secs(4));
        assert_eq!(report.agents_spawned, 0);

        let mut eager = SessionConfig::default();
        eager.seed = 3;
        eager.spawning.first_spawn_delay_ms = 100;
        let report = Session::start(&eager, layout())
            .expect("session starts")
            .run(Duration::from_secs(1));
        assert!(report.agents_spawned >= 1);
    }

    #[test]
    fn simulations_replay_deterministically() {
        let first = small_session(4).run(Duration::from_secs(20));
        let second = small_session(4).run(Duration::from_secs(20));

        assert_eq!(first, second);
    }

    #[test]
    fn mazes_without_floor_are_refused() {
        let result = Session::start(
            &SessionConfig::default(),
            TileLayout::filled(4, 4, Tile::Wall),
        );

        assert!(result.is_err());
    }

    #[test]
    fn aiming_prefers_the_nearest_visible_agent() {
        let layout = TileLayout::filled(9, 3, Tile::Path);
        let mut session = Session::start(&SessionConfig::default(), layout).expect("starts");
        session.dispatch(Command::SpawnAgent {
            kind: AgentKind::Direct,
            cell: CellCoord::new(8, 1),
        });
        session.dispatch(Command::SpawnAgent {
            kind: AgentKind::Evasive,
            cell: CellCoord::new(6, 1),
        });
        session.player.position = Vec2::new(4.0, 1.0);

        let agents = query::agent_view(&session.world);
        let grid = query::grid_view(&session.world);
        let nearest = agents
            .iter()
            .find(|agent| agent.kind == AgentKind::Evasive)
            .map(|agent| agent.id);

        assert_eq!(session.player.aim(FRAME, &agents, &grid), nearest);
        assert_eq!(session.player.aim(FRAME, &agents, &grid), None);
    }
}
