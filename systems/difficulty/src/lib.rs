#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Difficulty director that escalates the challenge as a session runs.

use std::time::Duration;

use phantom_maze_core::{Command, Difficulty, Event};
use tracing::debug;

/// Configuration parameters required to construct the difficulty director.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    escalation_period: Duration,
}

impl Config {
    /// Creates a configuration that raises the level once per `escalation_period`.
    #[must_use]
    pub const fn new(escalation_period: Duration) -> Self {
        Self { escalation_period }
    }

    /// Running time between two automatic escalations.
    #[must_use]
    pub const fn escalation_period(&self) -> Duration {
        self.escalation_period
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

/// Pure system that raises the difficulty on a fixed cadence of running time.
#[derive(Debug)]
pub struct DifficultyDirector {
    escalation_period: Duration,
    accumulator: Duration,
}

impl DifficultyDirector {
    /// Creates a new director using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            escalation_period: config.escalation_period,
            accumulator: Duration::ZERO,
        }
    }

    /// Consumes world events and the active level to emit difficulty commands.
    ///
    /// Levels are only ever raised; once the hardest level is active the
    /// director stays silent.
    pub fn handle(&mut self, events: &[Event], current: Difficulty, out: &mut Vec<Command>) {
        if self.escalation_period.is_zero() {
            return;
        }

        let mut level = current;
        for event in events {
            match event {
                Event::GameStarted { .. } => self.accumulator = Duration::ZERO,
                Event::TimeAdvanced { dt } => {
                    self.accumulator = self.accumulator.saturating_add(*dt);
                    while self.accumulator >= self.escalation_period {
                        self.accumulator -= self.escalation_period;
                        let Some(next) = level.raised() else {
                            continue;
                        };
                        debug!(from = %level, to = %next, "escalating difficulty");
                        out.push(Command::SetDifficulty { level: next });
                        level = next;
                    }
                }
                _ => {}
            }
        }
    }
}

impl Default for DifficultyDirector {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(seconds: u64) -> Event {
        Event::TimeAdvanced {
            dt: Duration::from_secs(seconds),
        }
    }

    #[test]
    fn escalates_once_per_period() {
        let mut director = DifficultyDirector::default();
        let mut commands = Vec::new();

        director.handle(&[tick(29)], Difficulty::Low, &mut commands);
        assert!(commands.is_empty());

        director.handle(&[tick(1)], Difficulty::Low, &mut commands);
        assert_eq!(
            commands,
            vec![Command::SetDifficulty {
                level: Difficulty::Medium
            }]
        );
    }

    #[test]
    fn long_frames_escalate_several_levels() {
        let mut director = DifficultyDirector::default();
        let mut commands = Vec::new();

        director.handle(&[tick(95)], Difficulty::Low, &mut commands);

        assert_eq!(
            commands,
            vec![
                Command::SetDifficulty {
                    level: Difficulty::Medium
                },
                Command::SetDifficulty {
                    level: Difficulty::High
                },
            ]
        );
    }

    #[test]
    fn hardest_level_is_never_exceeded() {
        let mut director = DifficultyDirector::default();
        let mut commands = Vec::new();

        director.handle(&[tick(300)], Difficulty::High, &mut commands);

        assert!(commands.is_empty());
    }

    #[test]
    fn restarting_clears_accumulated_time() {
        let mut director = DifficultyDirector::default();
        let mut commands = Vec::new();

        director.handle(&[tick(25)], Difficulty::Low, &mut commands);
        director.handle(
            &[Event::GameStarted {
                difficulty: Difficulty::Low,
            }],
            Difficulty::Low,
            &mut commands,
        );
        director.handle(&[tick(25)], Difficulty::Low, &mut commands);

        assert!(commands.is_empty());
    }
}
