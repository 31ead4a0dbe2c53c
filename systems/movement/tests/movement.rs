use std::time::Duration;

use glam::Vec2;
use phantom_maze_core::{AgentKind, CellCoord, Command, Event, Tile, TileLayout};
use phantom_maze_system_movement::Movement;
use phantom_maze_world::{self as world, query, World};

const FRAME: Duration = Duration::from_millis(16);

fn running_world() -> World {
    let mut world = World::new();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::InstallLayout {
            layout: TileLayout::filled(6, 6, Tile::Path),
        },
        &mut events,
    );
    world::apply(&mut world, Command::StartGame, &mut events);
    world
}

fn pump(world: &mut World, movement: &mut Movement, command: Command) {
    let mut events = Vec::new();
    world::apply(world, command, &mut events);
    let agents = query::agent_view(world);
    let mut commands = Vec::new();
    movement.handle(&events, &agents, &mut commands);
    for command in commands {
        world::apply(world, command, &mut events);
    }
}

#[test]
fn agents_follow_their_route_to_the_end() {
    let mut world = running_world();
    let mut movement = Movement::default();
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SpawnAgent {
            kind: AgentKind::Direct,
            cell: CellCoord::new(0, 0),
        },
        &mut events,
    );
    let agent = match events.last() {
        Some(Event::AgentSpawned { agent, .. }) => *agent,
        other => panic!("unexpected spawn outcome: {other:?}"),
    };
    let route = vec![
        CellCoord::new(1, 0),
        CellCoord::new(2, 0),
        CellCoord::new(2, 1),
    ];
    world::apply(&mut world, Command::AssignRoute { agent, route }, &mut events);

    for _ in 0..60 {
        pump(&mut world, &mut movement, Command::Tick { dt: FRAME });
    }

    let view = query::agent_view(&world);
    let snapshot = view.get(agent).expect("agent alive");
    assert!(snapshot.route_exhausted());
    assert_eq!(snapshot.position, Vec2::new(2.0, 1.0));
    assert_eq!(snapshot.heading, Vec2::Y);
}

#[test]
fn movement_replays_deterministically() {
    let first = replay();
    let second = replay();

    assert_eq!(first, second, "replay diverged between runs");
}

fn replay() -> Vec<(u32, i64, i64)> {
    let mut world = running_world();
    let mut movement = Movement::default();
    let mut events = Vec::new();
    for (index, kind) in AgentKind::ALL.iter().enumerate() {
        world::apply(
            &mut world,
            Command::SpawnAgent {
                kind: *kind,
                cell: CellCoord::new(index as i32, 0),
            },
            &mut events,
        );
    }
    for snapshot in query::agent_view(&world).into_vec() {
        let column = snapshot.cell().column();
        let route = (1..6).map(|row| CellCoord::new(column, row)).collect();
        world::apply(
            &mut world,
            Command::AssignRoute {
                agent: snapshot.id,
                route,
            },
            &mut events,
        );
    }

    let mut trace = Vec::new();
    for _ in 0..30 {
        pump(&mut world, &mut movement, Command::Tick { dt: FRAME });
        trace.extend(query::agent_view(&world).iter().map(|snapshot| {
            (
                snapshot.id.get(),
                (snapshot.position.x * 1_000.0).round() as i64,
                (snapshot.position.y * 1_000.0).round() as i64,
            )
        }));
    }
    trace
}
