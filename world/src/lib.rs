#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Phantom Maze.
//!
//! The world owns the installed maze, the navigation grid derived from it,
//! every live agent, the tracked player and the session bookkeeping. It is
//! mutated exclusively through [`apply`] and exposes read-only data through
//! the [`query`] module.

mod navigation;

use std::{collections::BTreeSet, time::Duration};

use glam::Vec2;
use phantom_maze_core::{
    AgentId, AgentKind, CellCoord, Command, Difficulty, DifficultyProfile, Event, Health,
    SessionPhase, SpawnRejection, TargetSnapshot, Tile, TileLayout, AGENT_KILL_SCORE,
    AGENT_MAX_HEALTH, COLLECTIBLE_SCORE, PLAYER_MAX_HEALTH, WELCOME_BANNER,
};

pub use navigation::PathfindingGrid;

const PLAYER_DAMAGE_COOLDOWN: Duration = Duration::from_millis(500);

/// Represents the authoritative Phantom Maze world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    layout: TileLayout,
    grid: PathfindingGrid,
    phase: SessionPhase,
    difficulty: Difficulty,
    agents: Vec<Agent>,
    next_agent_id: u32,
    target: TargetSnapshot,
    player: Player,
    score: u32,
    best_score: u32,
    collectibles: BTreeSet<CellCoord>,
    elapsed: Duration,
}

impl World {
    /// Creates an idle world without a maze.
    #[must_use]
    pub fn new() -> Self {
        Self {
            banner: WELCOME_BANNER,
            layout: TileLayout::filled(0, 0, Tile::Wall),
            grid: PathfindingGrid::default(),
            phase: SessionPhase::Idle,
            difficulty: Difficulty::default(),
            agents: Vec::new(),
            next_agent_id: 0,
            target: TargetSnapshot::default(),
            player: Player::new(),
            score: 0,
            best_score: 0,
            collectibles: BTreeSet::new(),
            elapsed: Duration::ZERO,
        }
    }

    fn agent_mut(&mut self, agent: AgentId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|candidate| candidate.id == agent)
    }

    fn agent_index(&self, agent: AgentId) -> Option<usize> {
        self.agents.iter().position(|candidate| candidate.id == agent)
    }

    fn reset_session(&mut self) {
        self.agents.clear();
        self.collectibles.clear();
        self.player = Player::new();
        self.score = 0;
        self.elapsed = Duration::ZERO;
    }

    fn award(&mut self, points: u32, out_events: &mut Vec<Event>) {
        self.score = self.score.saturating_add(points);
        self.best_score = self.best_score.max(self.score);
        out_events.push(Event::ScoreChanged { score: self.score });
    }

    fn consume_collectible_at(&mut self, position: Vec2, out_events: &mut Vec<Event>) {
        let cell = CellCoord::containing(position);
        if !self.collectibles.remove(&cell) {
            return;
        }

        out_events.push(Event::CollectibleConsumed {
            cell,
            remaining: self.collectibles.len(),
        });
        self.award(COLLECTIBLE_SCORE, out_events);
        if self.collectibles.is_empty() {
            out_events.push(Event::AllCollectiblesConsumed);
        }
    }

    fn spawn_rejection(&self, cell: CellCoord) -> Option<SpawnRejection> {
        if self.phase != SessionPhase::Running {
            return Some(SpawnRejection::NotRunning);
        }
        if !self.grid.view().is_walkable(cell) {
            return Some(SpawnRejection::NotWalkable);
        }
        let cap = usize::try_from(self.difficulty.profile().max_agents).unwrap_or(usize::MAX);
        if self.agents.len() >= cap {
            return Some(SpawnRejection::CapacityReached);
        }
        None
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct Player {
    health: Health,
    damage_cooldown: Duration,
}

impl Player {
    const fn new() -> Self {
        Self {
            health: PLAYER_MAX_HEALTH,
            damage_cooldown: Duration::ZERO,
        }
    }
}

#[derive(Clone, Debug)]
struct Agent {
    id: AgentId,
    kind: AgentKind,
    position: Vec2,
    heading: Vec2,
    route: Vec<CellCoord>,
    route_cursor: usize,
    speed: f32,
    vision_range: f32,
    memory_duration: Duration,
    recalculation_interval: Duration,
    coordination: bool,
    health: Health,
}

impl Agent {
    fn spawn(id: AgentId, kind: AgentKind, cell: CellCoord, profile: &DifficultyProfile) -> Self {
        let mut agent = Self {
            id,
            kind,
            position: cell.center(),
            heading: Vec2::X,
            route: Vec::new(),
            route_cursor: 0,
            speed: 0.0,
            vision_range: 0.0,
            memory_duration: Duration::ZERO,
            recalculation_interval: Duration::ZERO,
            coordination: false,
            health: AGENT_MAX_HEALTH,
        };
        agent.apply_profile(profile);
        agent
    }

    fn apply_profile(&mut self, profile: &DifficultyProfile) {
        self.speed = profile.agent_speed();
        self.vision_range = profile.vision_range;
        self.memory_duration = profile.memory_duration;
        self.recalculation_interval = profile.recalculation_interval;
        self.coordination = profile.coordination;
    }

    fn move_to(&mut self, position: Vec2) {
        let travel = position - self.position;
        if let Some(heading) = travel.try_normalize() {
            self.heading = heading;
        }
        self.position = position;
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::InstallLayout { layout } => {
            world.grid = PathfindingGrid::build(&layout);
            world.layout = layout;
            world.agents.clear();
            world.collectibles.clear();
            out_events.push(Event::LayoutInstalled {
                columns: world.grid.columns(),
                rows: world.grid.rows(),
                walkable: world.grid.walkable_count(),
            });
        }
        Command::StartGame => {
            world.reset_session();
            world.phase = SessionPhase::Running;
            out_events.push(Event::GameStarted {
                difficulty: world.difficulty,
            });
        }
        Command::Tick { dt } => {
            if world.phase != SessionPhase::Running {
                return;
            }

            world.elapsed = world.elapsed.saturating_add(dt);
            world.player.damage_cooldown = world.player.damage_cooldown.saturating_sub(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::UpdateTarget { position, velocity } => {
            world.target = TargetSnapshot { position, velocity };
            if world.phase == SessionPhase::Running {
                world.consume_collectible_at(position, out_events);
            }
        }
        Command::SetDifficulty { level } => {
            if level == world.difficulty {
                return;
            }

            world.difficulty = level;
            let profile = level.profile();
            for agent in &mut world.agents {
                agent.apply_profile(&profile);
            }
            out_events.push(Event::DifficultyChanged { level });
        }
        Command::SpawnAgent { kind, cell } => {
            if let Some(reason) = world.spawn_rejection(cell) {
                out_events.push(Event::SpawnRejected { kind, cell, reason });
                return;
            }

            let agent = AgentId::new(world.next_agent_id);
            world.next_agent_id = world.next_agent_id.wrapping_add(1);
            let profile = world.difficulty.profile();
            world.agents.push(Agent::spawn(agent, kind, cell, &profile));
            out_events.push(Event::AgentSpawned { agent, kind, cell });
        }
        Command::AssignRoute { agent, mut route } => {
            let grid = world.grid.view();
            if let Some(blocked) = route.iter().position(|cell| !grid.is_walkable(*cell)) {
                route.truncate(blocked);
            }
            let length = route.len();
            if let Some(target) = world.agent_mut(agent) {
                target.route = route;
                target.route_cursor = 0;
                out_events.push(Event::RouteAssigned { agent, length });
            }
        }
        Command::MoveAgent {
            agent,
            position,
            reached_waypoint,
        } => {
            if let Some(target) = world.agent_mut(agent) {
                target.move_to(position);
                if reached_waypoint && target.route_cursor < target.route.len() {
                    target.route_cursor += 1;
                }
            }
        }
        Command::NudgeAgent { agent, offset } => {
            let grid = world.grid.view();
            let Some(target) = world
                .agents
                .iter_mut()
                .find(|candidate| candidate.id == agent)
            else {
                return;
            };
            let nudged = target.position + offset;
            if grid.is_walkable(CellCoord::containing(nudged)) {
                target.position = nudged;
            }
        }
        Command::DamageAgent { agent } => {
            if world.phase != SessionPhase::Running {
                return;
            }
            let Some(index) = world.agent_index(agent) else {
                return;
            };

            let health = world.agents[index].health.saturating_sub(1);
            world.agents[index].health = health;
            if !health.is_depleted() {
                out_events.push(Event::AgentDamaged {
                    agent,
                    health,
                    max_health: AGENT_MAX_HEALTH,
                });
                return;
            }

            let fallen = world.agents.remove(index);
            out_events.push(Event::AgentDied {
                agent,
                kind: fallen.kind,
                cell: CellCoord::containing(fallen.position),
            });
            world.award(AGENT_KILL_SCORE, out_events);
        }
        Command::DamagePlayer => {
            if world.phase != SessionPhase::Running || !world.player.damage_cooldown.is_zero() {
                return;
            }

            world.player.health = world.player.health.saturating_sub(1);
            world.player.damage_cooldown = PLAYER_DAMAGE_COOLDOWN;
            out_events.push(Event::PlayerDamaged {
                health: world.player.health,
            });

            if world.player.health.is_depleted() {
                world.phase = SessionPhase::GameOver;
                world.best_score = world.best_score.max(world.score);
                out_events.push(Event::PlayerDied {
                    score: world.score,
                    best_score: world.best_score,
                });
            }
        }
        Command::PlaceCollectibles { cells } => {
            let grid = world.grid.view();
            world.collectibles = cells
                .into_iter()
                .filter(|cell| grid.is_walkable(*cell))
                .collect();
            out_events.push(Event::CollectiblesPlaced {
                count: world.collectibles.len(),
            });
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use phantom_maze_core::{
        AgentSnapshot, AgentView, CellCoord, Difficulty, GridView, Health, SessionPhase,
        TargetSnapshot, TileLayout, AGENT_MAX_HEALTH,
    };

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Provides read-only access to the installed maze layout.
    #[must_use]
    pub fn layout(world: &World) -> &TileLayout {
        &world.layout
    }

    /// Exposes a read-only view of the navigation grid.
    #[must_use]
    pub fn grid_view(world: &World) -> GridView<'_> {
        world.grid.view()
    }

    /// Lifecycle stage of the current session.
    #[must_use]
    pub fn phase(world: &World) -> SessionPhase {
        world.phase
    }

    /// Difficulty currently applied to agents.
    #[must_use]
    pub fn difficulty(world: &World) -> Difficulty {
        world.difficulty
    }

    /// Running time accumulated by the current session.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Captures a read-only view of the agents inhabiting the maze.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(
            world
                .agents
                .iter()
                .map(|agent| AgentSnapshot {
                    id: agent.id,
                    kind: agent.kind,
                    position: agent.position,
                    heading: agent.heading,
                    route: agent.route.clone(),
                    route_cursor: agent.route_cursor,
                    speed: agent.speed,
                    vision_range: agent.vision_range,
                    memory_duration: agent.memory_duration,
                    recalculation_interval: agent.recalculation_interval,
                    coordination: agent.coordination,
                    health: agent.health,
                    max_health: AGENT_MAX_HEALTH,
                })
                .collect(),
        )
    }

    /// Last reported position and movement hint of the player.
    #[must_use]
    pub fn target(world: &World) -> TargetSnapshot {
        world.target
    }

    /// Remaining player health.
    #[must_use]
    pub fn player_health(world: &World) -> Health {
        world.player.health
    }

    /// Score accumulated during the current session.
    #[must_use]
    pub fn score(world: &World) -> u32 {
        world.score
    }

    /// Highest score reached since the world was created.
    #[must_use]
    pub fn best_score(world: &World) -> u32 {
        world.best_score
    }

    /// Cells that still hold a collectible, in ascending order.
    #[must_use]
    pub fn collectibles(world: &World) -> Vec<CellCoord> {
        world.collectibles.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_layout(columns: u32, rows: u32) -> TileLayout {
        let mut layout = TileLayout::filled(columns, rows, Tile::Path);
        assert!(layout.set(CellCoord::new(0, 0), Tile::Wall));
        layout
    }

    fn running_world() -> World {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::InstallLayout {
                layout: open_layout(5, 5),
            },
            &mut events,
        );
        apply(&mut world, Command::StartGame, &mut events);
        world
    }

    fn spawn(world: &mut World, cell: CellCoord) -> AgentId {
        let mut events = Vec::new();
        apply(
            world,
            Command::SpawnAgent {
                kind: AgentKind::Direct,
                cell,
            },
            &mut events,
        );
        match events.as_slice() {
            [Event::AgentSpawned { agent, .. }] => *agent,
            other => panic!("unexpected spawn outcome: {other:?}"),
        }
    }

    #[test]
    fn install_layout_reports_walkable_cells() {
        let mut world = World::new();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::InstallLayout {
                layout: open_layout(4, 3),
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::LayoutInstalled {
                columns: 4,
                rows: 3,
                walkable: 11,
            }]
        );
        assert!(!query::grid_view(&world).is_walkable(CellCoord::new(0, 0)));
    }

    #[test]
    fn ticks_are_ignored_until_the_game_starts() {
        let mut world = World::new();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(16),
            },
            &mut events,
        );

        assert!(events.is_empty());
        assert_eq!(query::elapsed(&world), Duration::ZERO);
        assert_eq!(query::phase(&world), SessionPhase::Idle);
    }

    #[test]
    fn spawn_requests_are_validated() {
        let mut world = World::new();
        let mut events = Vec::new();
        let request = Command::SpawnAgent {
            kind: AgentKind::Flanker,
            cell: CellCoord::new(2, 2),
        };
        apply(&mut world, request.clone(), &mut events);
        assert_eq!(
            events,
            vec![Event::SpawnRejected {
                kind: AgentKind::Flanker,
                cell: CellCoord::new(2, 2),
                reason: SpawnRejection::NotRunning,
            }]
        );

        let mut world = running_world();
        events.clear();
        apply(
            &mut world,
            Command::SpawnAgent {
                kind: AgentKind::Direct,
                cell: CellCoord::new(0, 0),
            },
            &mut events,
        );
        assert!(matches!(
            events.as_slice(),
            [Event::SpawnRejected {
                reason: SpawnRejection::NotWalkable,
                ..
            }]
        ));
    }

    #[test]
    fn spawning_stops_at_the_difficulty_cap() {
        let mut world = running_world();
        let cap = Difficulty::Low.profile().max_agents as usize;
        for index in 0..cap {
            let _ = spawn(&mut world, CellCoord::new((index % 4) as i32 + 1, 1));
        }

        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnAgent {
                kind: AgentKind::Evasive,
                cell: CellCoord::new(3, 3),
            },
            &mut events,
        );

        assert!(matches!(
            events.as_slice(),
            [Event::SpawnRejected {
                reason: SpawnRejection::CapacityReached,
                ..
            }]
        ));
        assert_eq!(query::agent_view(&world).len(), cap);
    }

    #[test]
    fn agents_die_after_losing_all_health() {
        let mut world = running_world();
        let agent = spawn(&mut world, CellCoord::new(2, 2));
        let mut events = Vec::new();

        apply(&mut world, Command::DamageAgent { agent }, &mut events);
        assert_eq!(
            events,
            vec![Event::AgentDamaged {
                agent,
                health: Health::new(1),
                max_health: AGENT_MAX_HEALTH,
            }]
        );

        events.clear();
        apply(&mut world, Command::DamageAgent { agent }, &mut events);
        assert_eq!(
            events,
            vec![
                Event::AgentDied {
                    agent,
                    kind: AgentKind::Direct,
                    cell: CellCoord::new(2, 2),
                },
                Event::ScoreChanged {
                    score: AGENT_KILL_SCORE
                },
            ]
        );
        assert!(query::agent_view(&world).is_empty());
    }

    #[test]
    fn difficulty_changes_reach_live_agents() {
        let mut world = running_world();
        let agent = spawn(&mut world, CellCoord::new(1, 1));
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::SetDifficulty {
                level: Difficulty::High,
            },
            &mut events,
        );

        let view = query::agent_view(&world);
        let snapshot = view.get(agent).expect("agent alive");
        let profile = Difficulty::High.profile();
        assert_eq!(snapshot.vision_range, profile.vision_range);
        assert_eq!(snapshot.recalculation_interval, profile.recalculation_interval);
        assert!(snapshot.coordination);
        assert_eq!(
            events,
            vec![Event::DifficultyChanged {
                level: Difficulty::High
            }]
        );

        events.clear();
        apply(
            &mut world,
            Command::SetDifficulty {
                level: Difficulty::High,
            },
            &mut events,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn moving_agents_updates_heading_and_cursor() {
        let mut world = running_world();
        let agent = spawn(&mut world, CellCoord::new(1, 1));
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::AssignRoute {
                agent,
                route: vec![CellCoord::new(1, 2), CellCoord::new(1, 3)],
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::MoveAgent {
                agent,
                position: Vec2::new(1.0, 2.0),
                reached_waypoint: true,
            },
            &mut events,
        );

        let view = query::agent_view(&world);
        let snapshot = view.get(agent).expect("agent alive");
        assert_eq!(snapshot.heading, Vec2::Y);
        assert_eq!(snapshot.next_waypoint(), Some(CellCoord::new(1, 3)));
    }

    #[test]
    fn routes_are_cut_at_the_first_blocked_cell() {
        let mut world = running_world();
        let agent = spawn(&mut world, CellCoord::new(1, 0));
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::AssignRoute {
                agent,
                route: vec![CellCoord::new(0, 0), CellCoord::new(0, 1)],
            },
            &mut events,
        );

        assert_eq!(events, vec![Event::RouteAssigned { agent, length: 0 }]);
    }

    #[test]
    fn collectibles_award_points_and_report_exhaustion() {
        let mut world = running_world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceCollectibles {
                cells: vec![CellCoord::new(0, 0), CellCoord::new(3, 3)],
            },
            &mut events,
        );
        assert_eq!(events, vec![Event::CollectiblesPlaced { count: 1 }]);

        events.clear();
        apply(
            &mut world,
            Command::UpdateTarget {
                position: Vec2::new(3.2, 2.8),
                velocity: None,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                Event::CollectibleConsumed {
                    cell: CellCoord::new(3, 3),
                    remaining: 0,
                },
                Event::ScoreChanged {
                    score: COLLECTIBLE_SCORE
                },
                Event::AllCollectiblesConsumed,
            ]
        );
    }

    #[test]
    fn player_damage_respects_cooldown_and_ends_the_game() {
        let mut world = running_world();
        let mut events = Vec::new();

        apply(&mut world, Command::DamagePlayer, &mut events);
        apply(&mut world, Command::DamagePlayer, &mut events);
        assert_eq!(events.len(), 1, "second hit lands inside the cooldown");

        for _ in 0..2 {
            apply(
                &mut world,
                Command::Tick {
                    dt: PLAYER_DAMAGE_COOLDOWN,
                },
                &mut events,
            );
            apply(&mut world, Command::DamagePlayer, &mut events);
        }

        assert_eq!(query::player_health(&world), Health::new(0));
        assert_eq!(query::phase(&world), SessionPhase::GameOver);
        assert_eq!(
            events.last(),
            Some(&Event::PlayerDied {
                score: 0,
                best_score: 0,
            })
        );
    }

    #[test]
    fn restarting_resets_the_session_but_keeps_best_score() {
        let mut world = running_world();
        let agent = spawn(&mut world, CellCoord::new(2, 2));
        let mut events = Vec::new();
        apply(&mut world, Command::DamageAgent { agent }, &mut events);
        apply(&mut world, Command::DamageAgent { agent }, &mut events);
        let _ = spawn(&mut world, CellCoord::new(3, 3));

        apply(&mut world, Command::StartGame, &mut events);

        assert_eq!(query::score(&world), 0);
        assert_eq!(query::best_score(&world), AGENT_KILL_SCORE);
        assert!(query::agent_view(&world).is_empty());
        assert_eq!(query::player_health(&world), PLAYER_MAX_HEALTH);
    }

    #[test]
    fn nudges_never_push_agents_into_walls() {
        let mut world = running_world();
        let agent = spawn(&mut world, CellCoord::new(1, 0));
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::NudgeAgent {
                agent,
                offset: Vec2::new(-1.0, 0.0),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::NudgeAgent {
                agent,
                offset: Vec2::new(0.0, 0.25),
            },
            &mut events,
        );

        let position = query::agent_view(&world)
            .get(agent)
            .map(|snapshot| snapshot.position);
        assert_eq!(position, Some(Vec2::new(1.0, 0.25)));
        assert!(events.is_empty());
    }
}
