#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pursuit system that decides where each agent should head next.
//!
//! Every agent is evaluated on a fixed behavior cadence. An evaluation first
//! updates the agent's perception of the player, then lets the agent's
//! [`AgentKind`] pick a destination, and finally plans a route to that
//! destination with the A* pathfinder. Agents with coordination enabled are
//! additionally nudged apart when they bunch up.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use phantom_maze_core::{
    AgentId, AgentKind, AgentSnapshot, AgentView, CellCoord, Command, Event, GridView,
    LineOfSight, PathError, TargetSnapshot, BEHAVIOR_INTERVAL,
};
use phantom_maze_system_pathfinding::Pathfinder;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

const PREDICTION_DISTANCE: f32 = 4.0;
const COORDINATION_RADIUS: f32 = 6.0;
const FLANK_DISTANCE: f32 = 3.0;
const STAND_OFF_DISTANCE: f32 = 3.0;
const FLEE_RADIUS: f32 = 4.0;
const CHASE_RADIUS: f32 = 8.0;
const FLEE_DISTANCE: f32 = 5.0;
const SEPARATION_RADIUS: f32 = 2.0;
const SEPARATION_STRENGTH: f32 = 0.3;
const INTERSECTION_NEIGHBORS: usize = 3;

/// Configuration parameters required to construct the pursuit system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    behavior_interval: Duration,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration using the standard behavior cadence.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self {
            behavior_interval: BEHAVIOR_INTERVAL,
            rng_seed,
        }
    }

    /// Overrides the interval between two evaluations of the same agent.
    #[must_use]
    pub const fn with_behavior_interval(mut self, behavior_interval: Duration) -> Self {
        self.behavior_interval = behavior_interval;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Pure system that turns perception into route assignments.
#[derive(Debug)]
pub struct Pursuit {
    behavior_interval: Duration,
    minds: BTreeMap<AgentId, Mind>,
    pathfinder: Pathfinder,
    planner: Planner,
}

impl Pursuit {
    /// Creates a new pursuit system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            behavior_interval: config.behavior_interval,
            minds: BTreeMap::new(),
            pathfinder: Pathfinder::new(),
            planner: Planner::new(config.rng_seed),
        }
    }

    /// Consumes world events and immutable views to emit routing commands.
    pub fn handle<L>(
        &mut self,
        events: &[Event],
        agents: &AgentView,
        grid: &GridView<'_>,
        line_of_sight: &L,
        target: TargetSnapshot,
        out: &mut Vec<Command>,
    ) where
        L: LineOfSight + ?Sized,
    {
        let mut elapsed = Duration::ZERO;
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => elapsed = elapsed.saturating_add(*dt),
                Event::AgentSpawned { agent, .. } => {
                    let _ = self.minds.insert(*agent, Mind::new());
                }
                Event::AgentDied { agent, .. } => {
                    let _ = self.minds.remove(agent);
                }
                Event::GameStarted { .. } => self.minds.clear(),
                Event::LayoutInstalled { .. } => {
                    self.minds.clear();
                    self.planner.forget_layout();
                }
                _ => {}
            }
        }

        if elapsed.is_zero() {
            return;
        }

        for agent in agents.iter() {
            let mind = self.minds.entry(agent.id).or_insert_with(Mind::new);
            mind.recalculation_cooldown = mind.recalculation_cooldown.saturating_sub(elapsed);
            let evaluations = mind.advance(elapsed, self.behavior_interval);
            if evaluations == 0 {
                continue;
            }

            let distance = agent.position.distance(target.position);
            let sees_target = distance <= agent.vision_range
                && line_of_sight.has_line_of_sight(agent.position, target.position);
            if sees_target {
                mind.last_known = Some(target.position);
                mind.memory = agent.memory_duration;
            }
            mind.memory = mind
                .memory
                .saturating_sub(self.behavior_interval.saturating_mul(evaluations));

            let situation = Situation {
                agent,
                target,
                sees_target,
                remembered: mind.last_known.filter(|_| !mind.memory.is_zero()),
                cooldown_elapsed: mind.recalculation_cooldown.is_zero(),
                partner: agent
                    .coordination
                    .then(|| coordination_partner(agent, agents, target.position))
                    .flatten(),
            };

            if let Some(goal) = self.planner.decide_target(&situation, grid) {
                mind.recalculation_cooldown = agent.recalculation_interval;
                match self.pathfinder.find_path(grid, agent.cell(), goal) {
                    Ok(route) => out.push(Command::AssignRoute {
                        agent: agent.id,
                        route,
                    }),
                    Err(error @ PathError::NoPathFound { .. }) => {
                        debug!(agent = agent.id.get(), %error, "dropping route");
                        out.push(Command::AssignRoute {
                            agent: agent.id,
                            route: Vec::new(),
                        });
                    }
                    Err(error @ PathError::UnknownCoordinate(_)) => {
                        debug!(agent = agent.id.get(), %error, "keeping current route");
                    }
                }
            }

            if agent.coordination {
                if let Some(offset) = separation_offset(agent, agents, elapsed) {
                    out.push(Command::NudgeAgent {
                        agent: agent.id,
                        offset,
                    });
                }
            }
        }
    }
}

impl Default for Pursuit {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Per-agent belief and timer state.
#[derive(Clone, Debug)]
struct Mind {
    memory: Duration,
    last_known: Option<Vec2>,
    recalculation_cooldown: Duration,
    cadence: Duration,
    fresh: bool,
}

impl Mind {
    fn new() -> Self {
        Self {
            memory: Duration::ZERO,
            last_known: None,
            recalculation_cooldown: Duration::ZERO,
            cadence: Duration::ZERO,
            fresh: true,
        }
    }

    /// Accumulates time and reports how many behavior ticks became due.
    fn advance(&mut self, elapsed: Duration, interval: Duration) -> u32 {
        if self.fresh {
            self.fresh = false;
            self.cadence = Duration::ZERO;
            return 1;
        }
        if interval.is_zero() {
            return 1;
        }

        self.cadence = self.cadence.saturating_add(elapsed);
        let mut due = 0;
        while self.cadence >= interval {
            self.cadence -= interval;
            due += 1;
        }
        due
    }
}

/// Everything a behavior variant looks at while choosing a destination.
#[derive(Clone, Copy, Debug)]
struct Situation<'a> {
    agent: &'a AgentSnapshot,
    target: TargetSnapshot,
    sees_target: bool,
    remembered: Option<Vec2>,
    cooldown_elapsed: bool,
    partner: Option<Vec2>,
}

/// Destination selection shared by every behavior variant.
#[derive(Debug)]
struct Planner {
    rng: ChaCha8Rng,
    intersections: Option<Vec<CellCoord>>,
}

impl Planner {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            intersections: None,
        }
    }

    fn forget_layout(&mut self) {
        self.intersections = None;
    }

    /// Picks the cell the agent should plan a route to, if any.
    fn decide_target(&mut self, situation: &Situation<'_>, grid: &GridView<'_>) -> Option<CellCoord> {
        let agent = situation.agent;
        let target = situation.target.position;
        let exhausted = agent.route_exhausted();

        match agent.kind {
            AgentKind::Direct => {
                if situation.sees_target {
                    Some(CellCoord::containing(target))
                } else if let Some(remembered) = situation.remembered {
                    Some(CellCoord::containing(remembered))
                } else if exhausted {
                    self.random_patrol(grid)
                } else {
                    None
                }
            }
            AgentKind::Ambusher => {
                if situation.sees_target {
                    let heading = situation
                        .target
                        .velocity
                        .map_or(Vec2::ZERO, Vec2::normalize_or_zero);
                    Some(CellCoord::containing(target + heading * PREDICTION_DISTANCE))
                } else if exhausted || situation.cooldown_elapsed {
                    self.strategic_patrol(grid)
                } else {
                    None
                }
            }
            AgentKind::Flanker => {
                if let Some(partner) = situation.partner {
                    let away = (target - partner).normalize_or_zero();
                    Some(CellCoord::containing(target + away * FLANK_DISTANCE))
                } else if situation.sees_target {
                    let approach = (target - agent.position).normalize_or_zero();
                    Some(CellCoord::containing(target - approach * STAND_OFF_DISTANCE))
                } else if situation.cooldown_elapsed {
                    self.random_patrol(grid)
                } else {
                    None
                }
            }
            AgentKind::Evasive => {
                let distance = agent.position.distance(target);
                if situation.sees_target && distance < FLEE_RADIUS {
                    let away = (agent.position - target).normalize_or_zero();
                    Some(CellCoord::containing(agent.position + away * FLEE_DISTANCE))
                } else if situation.sees_target && distance > CHASE_RADIUS {
                    Some(CellCoord::containing(target))
                } else if exhausted {
                    self.random_patrol(grid)
                } else {
                    None
                }
            }
        }
    }

    fn random_patrol(&mut self, grid: &GridView<'_>) -> Option<CellCoord> {
        grid.random_walkable(&mut self.rng)
    }

    /// Samples a junction with at least three open neighbors, or any open cell.
    fn strategic_patrol(&mut self, grid: &GridView<'_>) -> Option<CellCoord> {
        let intersections = self.intersections.get_or_insert_with(|| {
            grid.walkable_cells()
                .iter()
                .copied()
                .filter(|cell| grid.walkable_neighbor_count(*cell) >= INTERSECTION_NEIGHBORS)
                .collect()
        });

        if intersections.is_empty() {
            return grid.random_walkable(&mut self.rng);
        }
        let index = self.rng.gen_range(0..intersections.len());
        intersections.get(index).copied()
    }
}

/// First other agent, in identifier order, standing close enough to the target to flank with.
fn coordination_partner(agent: &AgentSnapshot, agents: &AgentView, target: Vec2) -> Option<Vec2> {
    agents
        .iter()
        .filter(|other| other.id != agent.id)
        .map(|other| other.position)
        .find(|position| position.distance(target) < COORDINATION_RADIUS)
}

/// Displacement that pushes the agent away from crowding neighbors.
fn separation_offset(agent: &AgentSnapshot, agents: &AgentView, elapsed: Duration) -> Option<Vec2> {
    let push = agents
        .iter()
        .filter(|other| other.id != agent.id)
        .fold(Vec2::ZERO, |sum, other| {
            let distance = agent.position.distance(other.position);
            if distance <= 0.0 || distance >= SEPARATION_RADIUS {
                return sum;
            }
            let away = (agent.position - other.position).normalize_or_zero();
            sum + away * (1.0 - distance / SEPARATION_RADIUS)
        });

    let direction = push.try_normalize()?;
    Some(direction * agent.speed * elapsed.as_secs_f32() * SEPARATION_STRENGTH)
}
