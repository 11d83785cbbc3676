use hearthvale_core::{Tile, WorldPos};
use hearthvale_world::{
    navigation::{expand_checkpoints, find_path, MAX_CHECKPOINTS},
    GridCell, GridMap,
};

const RNG_MULTIPLIER: u64 = 6_364_136_223_846_793_005;
const RNG_INCREMENT: u64 = 1_442_695_040_888_963_407;

struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(RNG_MULTIPLIER).wrapping_add(RNG_INCREMENT);
        (self.0 >> 33) as u32
    }

    fn below(&mut self, bound: u32) -> u32 {
        self.next() % bound
    }
}

fn random_grid(rng: &mut Lcg, columns: u32, rows: u32) -> GridMap {
    let mut grid = GridMap::new(columns, rows);
    for y in 0..rows {
        for x in 0..columns {
            if rng.below(100) < 28 {
                let _ = grid.set_cell(Tile::new(x, y), GridCell::Blocked);
            }
        }
    }
    grid
}

fn assert_route_is_legal(grid: &GridMap, checkpoints: &[Tile]) {
    assert!(checkpoints.len() <= MAX_CHECKPOINTS);

    let route = expand_checkpoints(checkpoints);
    for tile in &route {
        assert!(grid.is_walkable(*tile), "route crosses blocked tile {tile}");
    }

    for pair in route.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        assert_eq!(from.chebyshev_distance(to), 1, "route is not connected");

        if from.x() != to.x() && from.y() != to.y() {
            let horizontal = Tile::new(to.x(), from.y());
            let vertical = Tile::new(from.x(), to.y());
            assert!(
                grid.is_walkable(horizontal) && grid.is_walkable(vertical),
                "diagonal {from} -> {to} cuts a corner"
            );
        }
    }
}

#[test]
fn ten_by_ten_example_avoids_the_blocked_tile() {
    let mut grid = GridMap::new(10, 10);
    let _ = grid.set_cell(Tile::new(5, 5), GridCell::Blocked);

    let path = find_path(&grid, WorldPos::new(0.0, 0.0), Tile::new(9, 9));

    assert!(!path.is_empty());
    assert!(path.len() <= MAX_CHECKPOINTS);
    assert_eq!(path.first(), Some(&Tile::new(0, 0)));
    assert_eq!(path.last(), Some(&Tile::new(9, 9)));
    assert!(!expand_checkpoints(&path).contains(&Tile::new(5, 5)));
    assert_route_is_legal(&grid, &path);
}

#[test]
fn random_grids_only_produce_legal_routes() {
    let mut rng = Lcg(0x5eed_0f_1a57);
    let mut found = 0;

    for _ in 0..40 {
        let grid = random_grid(&mut rng, 24, 18);
        for _ in 0..20 {
            let start = Tile::new(rng.below(24), rng.below(18));
            let target = Tile::new(rng.below(24), rng.below(18));
            if !grid.is_walkable(start) {
                continue;
            }

            let path = find_path(&grid, start.to_world(), target);
            if path.is_empty() {
                continue;
            }
            found += 1;

            assert_eq!(path.first(), Some(&start));
            let end = *path.last().expect("non-empty path");
            assert!(
                path.len() == MAX_CHECKPOINTS
                    || end == target
                    || end.chebyshev_distance(target) == 1,
                "path ends at {end}, away from {target}"
            );
            assert_route_is_legal(&grid, &path);
        }
    }

    assert!(found > 50, "too few reachable pairs exercised: {found}");
}

#[test]
fn identical_requests_are_reproducible() {
    let mut rng = Lcg(7);
    let grid = random_grid(&mut rng, 30, 30);
    let start = WorldPos::new(1.5, 1.5);
    let target = Tile::new(27, 26);

    let first = find_path(&grid, start, target);
    let second = find_path(&grid, start, target);

    assert_eq!(first, second);
}
