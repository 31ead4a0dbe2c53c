use phantom_maze_core::{CellCoord, RenderSink, Tile, TileLayout};
use phantom_maze_system_maze_generation::{
    carve_perfect_maze, expand, render, Config, MazeGenerator,
};
use phantom_maze_world::PathfindingGrid;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn first_path_cell(layout: &TileLayout) -> CellCoord {
    layout
        .iter()
        .find(|(_, tile)| *tile == Tile::Path)
        .map(|(cell, _)| cell)
        .expect("maze has at least one corridor")
}

#[test]
fn every_corridor_is_reachable_before_the_arena_is_carved() {
    for seed in 0..16 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let layout = carve_perfect_maze(15, 11, &mut rng).expect("valid dimensions");
        let grid = PathfindingGrid::build(&layout);

        assert_eq!(
            grid.reachable_from(first_path_cell(&layout)),
            layout.count(Tile::Path),
            "seed {seed} produced a disconnected maze"
        );
    }
}

#[test]
fn five_by_five_maze_has_seven_connected_corridor_cells() {
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let layout = carve_perfect_maze(5, 5, &mut rng).expect("valid dimensions");
    let grid = PathfindingGrid::build(&layout);

    assert_eq!(layout.count(Tile::Path), 7);
    for (cell, tile) in layout.iter() {
        if tile == Tile::Path {
            assert_eq!(grid.reachable_from(cell), 7);
        }
    }
}

#[test]
fn expanded_maze_stays_connected() {
    let mut rng = ChaCha8Rng::seed_from_u64(77);
    let layout = expand(&carve_perfect_maze(9, 9, &mut rng).expect("valid dimensions"));
    let grid = PathfindingGrid::build(&layout);

    assert_eq!(
        grid.reachable_from(first_path_cell(&layout)),
        grid.walkable_count()
    );
}

#[test]
fn generator_output_is_reproducible_for_a_seed() {
    let config = Config::new(21, 21, 0x5eed);
    let first = MazeGenerator::new(config).generate().expect("valid dimensions");
    let second = MazeGenerator::new(config).generate().expect("valid dimensions");

    assert_eq!(first, second);
    assert_eq!((first.columns(), first.rows()), (42, 42));
    assert_eq!(first.count(Tile::Portal), 4);
}

#[test]
fn generated_layout_is_fully_connected_after_the_arena_carve() {
    let mut generator = MazeGenerator::new(Config::default());
    for _ in 0..4 {
        let layout = generator.generate().expect("valid dimensions");
        let grid = PathfindingGrid::build(&layout);
        let portal = CellCoord::new(20, 20);

        assert_eq!(layout.tile(portal), Some(Tile::Portal));
        assert_eq!(grid.reachable_from(portal), grid.walkable_count());
    }
}

#[derive(Default)]
struct CountingSink {
    clears: usize,
    drawn: Vec<(CellCoord, Tile)>,
}

impl RenderSink for CountingSink {
    fn clear_all(&mut self) {
        self.clears += 1;
        self.drawn.clear();
    }

    fn render_tile(&mut self, cell: CellCoord, tile: Tile) {
        self.drawn.push((cell, tile));
    }
}

#[test]
fn render_clears_then_draws_each_tile_once() {
    let layout = MazeGenerator::new(Config::new(5, 7, 3))
        .generate()
        .expect("valid dimensions");
    let mut sink = CountingSink::default();

    render(&layout, &mut sink);

    assert_eq!(sink.clears, 1);
    assert_eq!(sink.drawn.len(), 10 * 14);
    assert!(sink
        .drawn
        .iter()
        .all(|(cell, tile)| layout.tile(*cell) == Some(*tile)));
}
