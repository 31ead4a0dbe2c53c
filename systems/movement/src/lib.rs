#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that walks agents along their routes.

use std::time::Duration;

use glam::Vec2;
use phantom_maze_core::{AgentSnapshot, AgentView, Command, Event};

/// Distance below which an agent counts as having reached its waypoint.
pub const ARRIVAL_EPSILON: f32 = 0.1;

/// Pure system that reacts to elapsed time and emits movement commands.
#[derive(Debug, Default)]
pub struct Movement;

impl Movement {
    /// Consumes world events and the agent view to emit movement commands.
    ///
    /// Each agent advances toward the center of its next waypoint by at most
    /// `speed * dt`. Agents without a pending waypoint stay where they are.
    pub fn handle(&mut self, events: &[Event], agents: &AgentView, out: &mut Vec<Command>) {
        let elapsed = events
            .iter()
            .filter_map(|event| match event {
                Event::TimeAdvanced { dt } => Some(*dt),
                _ => None,
            })
            .fold(Duration::ZERO, Duration::saturating_add);
        if elapsed.is_zero() {
            return;
        }

        for agent in agents.iter() {
            if let Some(command) = step(agent, elapsed) {
                out.push(command);
            }
        }
    }
}

fn step(agent: &AgentSnapshot, elapsed: Duration) -> Option<Command> {
    let waypoint = agent.next_waypoint()?.center();
    let position = move_towards(
        agent.position,
        waypoint,
        agent.speed * elapsed.as_secs_f32(),
    );
    Some(Command::MoveAgent {
        agent: agent.id,
        position,
        reached_waypoint: position.distance(waypoint) < ARRIVAL_EPSILON,
    })
}

/// Moves `from` toward `to` without overshooting.
pub fn move_towards(from: Vec2, to: Vec2, max_distance: f32) -> Vec2 {
    let delta = to - from;
    let distance = delta.length();
    if distance <= max_distance || distance == 0.0 {
        to
    } else {
        from + delta / distance * max_distance
    }
}
