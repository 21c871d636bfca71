use crate::engine::Point;
use rand::seq::SliceRandom;
use rand::Rng;

/// Diamond-projection of logical grid coordinates onto the screen.
/// Columns run toward screen lower-right, rows toward lower-left.
#[derive(Debug, Clone, Copy)]
pub struct IsoProjection {
    pub origin: Point,
    pub tile_width: f32,
    pub tile_height: f32,
}

impl IsoProjection {
    pub fn new(origin: Point, tile_width: f32, tile_height: f32) -> Self {
        IsoProjection {
            origin,
            tile_width,
            tile_height,
        }
    }

    pub fn project(&self, col: u32, row: u32) -> Point {
        let col = col as f32;
        let row = row as f32;
        Point {
            x: self.origin.x + (col - row) * self.tile_width / 2.0,
            y: self.origin.y + (col + row) * self.tile_height / 2.0,
        }
    }
}

/// One ground tile: logical coordinates, projected anchor, draw-order key.
#[derive(Debug, Clone, Copy)]
pub struct TilePlacement {
    pub col: u32,
    pub row: u32,
    pub position: Point,
    pub depth: f32,
}

/// All `size x size` tile placements, back-to-front. Depth equals screen y,
/// so iteration order is already the paint order.
pub fn build_grid(projection: &IsoProjection, size: u32) -> Vec<TilePlacement> {
    let mut tiles: Vec<TilePlacement> = (0..size)
        .flat_map(|col| (0..size).map(move |row| (col, row)))
        .map(|(col, row)| {
            let position = projection.project(col, row);
            TilePlacement {
                col,
                row,
                position,
                depth: position.y,
            }
        })
        .collect();
    tiles.sort_by(|a, b| a.depth.total_cmp(&b.depth));
    tiles
}

/// Pick `count` distinct decoration tiles, never the center tile (reserved
/// for the player spawn). Shuffle of the full candidate list keeps the
/// sampling uniform and without replacement; the caller owns the RNG so
/// tests can seed it.
pub fn scatter_props(size: u32, count: usize, rng: &mut impl Rng) -> Vec<(u32, u32)> {
    let center = (size / 2, size / 2);
    let mut cells: Vec<(u32, u32)> = (0..size)
        .flat_map(|col| (0..size).map(move |row| (col, row)))
        .filter(|cell| *cell != center)
        .collect();
    cells.shuffle(rng);
    cells.truncate(count.min(cells.len()));
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    const SIZE: u32 = 10;

    fn projection() -> IsoProjection {
        IsoProjection::new(Point { x: 400.0, y: 100.0 }, 64.0, 32.0)
    }

    #[test]
    fn projection_matches_diamond_formula() {
        let proj = projection();
        for col in 0..SIZE {
            for row in 0..SIZE {
                let point = proj.project(col, row);
                assert_relative_eq!(
                    point.x,
                    400.0 + (col as f32 - row as f32) * 32.0
                );
                assert_relative_eq!(
                    point.y,
                    100.0 + (col as f32 + row as f32) * 16.0
                );
            }
        }
    }

    #[test]
    fn depth_is_monotonic_in_col_plus_row() {
        let proj = projection();
        for a_col in 0..SIZE {
            for a_row in 0..SIZE {
                for b_col in 0..SIZE {
                    for b_row in 0..SIZE {
                        if a_col + a_row > b_col + b_row {
                            let a = proj.project(a_col, a_row);
                            let b = proj.project(b_col, b_row);
                            assert!(a.y >= b.y);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn grid_covers_every_cell_in_paint_order() {
        let tiles = build_grid(&projection(), SIZE);
        assert_eq!(tiles.len(), (SIZE * SIZE) as usize);

        let cells: HashSet<(u32, u32)> =
            tiles.iter().map(|tile| (tile.col, tile.row)).collect();
        assert_eq!(cells.len(), (SIZE * SIZE) as usize);

        for pair in tiles.windows(2) {
            assert!(pair[0].depth <= pair[1].depth);
        }
    }

    #[test]
    fn tile_depth_equals_screen_y() {
        for tile in build_grid(&projection(), SIZE) {
            assert_relative_eq!(tile.depth, tile.position.y);
        }
    }

    #[test]
    fn scatter_skips_center_and_duplicates() {
        let mut rng = SmallRng::seed_from_u64(7);
        let picked = scatter_props(SIZE, 12, &mut rng);
        assert_eq!(picked.len(), 12);

        let unique: HashSet<(u32, u32)> = picked.iter().copied().collect();
        assert_eq!(unique.len(), picked.len());
        assert!(!unique.contains(&(SIZE / 2, SIZE / 2)));
    }

    #[test]
    fn scatter_clamps_to_available_cells() {
        let mut rng = SmallRng::seed_from_u64(7);
        let picked = scatter_props(3, 50, &mut rng);
        // 3x3 grid minus the center tile
        assert_eq!(picked.len(), 8);
        assert!(!picked.contains(&(1, 1)));
    }

    #[test]
    fn scatter_is_deterministic_for_a_fixed_seed() {
        let mut first = SmallRng::seed_from_u64(42);
        let mut second = SmallRng::seed_from_u64(42);
        assert_eq!(
            scatter_props(SIZE, 12, &mut first),
            scatter_props(SIZE, 12, &mut second)
        );
    }
}
