use crate::assets::{AssetRegistry, AudioKey, ImageKey};
use crate::browser;
use crate::engine::input::KeyState;
use crate::engine::{Point, Rect, Renderer};
use crate::grid::{build_grid, scatter_props, IsoProjection, TilePlacement};
use crate::player::{Motion, MoveInput, Player};
use crate::sound::MusicHandle;
use anyhow::Result;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use web_sys::HtmlImageElement;

// garden layout
const GRID_SIZE: u32 = 10;
const TILE_WIDTH: f32 = 64.0;
const TILE_HEIGHT: f32 = 32.0;
const TREE_COUNT: usize = 12;
// props sort just above the tile under them
const TREE_DEPTH_BIAS: f32 = 1.0;

const MUSIC_VOLUME: f64 = 0.5;
const VIGNETTE_STRENGTH: f32 = 0.45;

struct Prop {
    foot: Point,
    depth: f32,
}

struct Camera {
    center: Point,
}

impl Camera {
    fn follow(&mut self, target: Point) {
        self.center = target;
    }
}

/// The explorable garden: the tile diamond, scattered trees, Eve under
/// keyboard control, a camera glued to her, music and a vignette on top.
pub struct EdenScene {
    grass: HtmlImageElement,
    tree: HtmlImageElement,
    eve: HtmlImageElement,
    tiles: Vec<TilePlacement>,
    trees: Vec<Prop>,
    player: Player,
    camera: Camera,
    music: Option<MusicHandle>,
}

impl EdenScene {
    pub fn create(registry: AssetRegistry) -> Result<Self> {
        let grass = registry.image(ImageKey::Grass)?.clone();
        let tree = registry.image(ImageKey::Tree)?.clone();
        let eve = registry.image(ImageKey::Eve)?.clone();

        let canvas = browser::canvas()?;
        let origin = Point {
            x: canvas.width() as f32 / 2.0,
            y: (canvas.height() as f32 - GRID_SIZE as f32 * TILE_HEIGHT) / 2.0,
        };
        let projection = IsoProjection::new(origin, TILE_WIDTH, TILE_HEIGHT);
        let tiles = build_grid(&projection, GRID_SIZE);

        let mut rng = SmallRng::from_entropy();
        let trees = scatter_props(GRID_SIZE, TREE_COUNT, &mut rng)
            .into_iter()
            .filter_map(|cell| {
                tiles
                    .iter()
                    .find(|tile| (tile.col, tile.row) == cell)
                    .map(|tile| Prop {
                        foot: tile.position,
                        depth: tile.depth + TREE_DEPTH_BIAS,
                    })
            })
            .collect();

        let spawn = projection.project(GRID_SIZE / 2, GRID_SIZE / 2);
        let player = Player::new(spawn);

        let music = match MusicHandle::play_looping(registry.audio(AudioKey::Theme)?, MUSIC_VOLUME)
        {
            Ok(handle) => Some(handle),
            Err(err) => {
                error!("[eden] theme did not start: {:#}", err);
                None
            }
        };

        Ok(EdenScene {
            grass,
            tree,
            eve,
            tiles,
            trees,
            player,
            camera: Camera { center: spawn },
            music,
        })
    }

    pub fn update(&mut self, keystate: &KeyState, delta: f32) {
        let input = MoveInput::from_keystate(keystate);
        self.player.update(&input, delta);
        if self.player.motion() == Motion::Moving {
            self.camera.follow(self.player.position());
        }
    }

    pub fn draw(&self, renderer: &Renderer) {
        let viewport = renderer.viewport();
        let full = Rect::new(0.0, 0.0, viewport.width, viewport.height);
        renderer.clear(&full);
        renderer.fill_rect(&full, "#000000");

        let offset = Point {
            x: self.camera.center.x - viewport.width / 2.0,
            y: self.camera.center.y - viewport.height / 2.0,
        };
        renderer.push_camera(&offset);

        // ground first, already back-to-front
        for tile in &self.tiles {
            renderer.draw_image(
                &self.grass,
                &Rect::new(
                    tile.position.x - TILE_WIDTH / 2.0,
                    tile.position.y - TILE_HEIGHT / 2.0,
                    TILE_WIDTH,
                    TILE_HEIGHT,
                ),
            );
        }

        // trees and the player sort together by depth
        let tree_depths: Vec<f32> = self.trees.iter().map(|prop| prop.depth).collect();
        for index in standing_paint_order(&tree_depths, self.player.depth()) {
            if index < self.trees.len() {
                draw_standing(renderer, &self.tree, self.trees[index].foot, false);
            } else {
                draw_standing(
                    renderer,
                    &self.eve,
                    self.player.position(),
                    self.player.facing_left(),
                );
            }
        }

        renderer.pop_camera();
        renderer.draw_vignette(VIGNETTE_STRENGTH);
    }

    pub fn shutdown(&mut self) {
        if let Some(music) = self.music.take() {
            music.stop();
        }
    }
}

impl Drop for EdenScene {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Paint order for standing entities, lowest depth first. Indices address
/// the tree list; one past the end means the player.
fn standing_paint_order(tree_depths: &[f32], player_depth: f32) -> Vec<usize> {
    let mut order: Vec<(f32, usize)> = tree_depths.iter().copied().enumerate()
        .map(|(index, depth)| (depth, index))
        .collect();
    order.push((player_depth, tree_depths.len()));
    order.sort_by(|a, b| a.0.total_cmp(&b.0));
    order.into_iter().map(|(_, index)| index).collect()
}

/// Bottom-center anchored sprite draw at the image's natural size.
fn draw_standing(renderer: &Renderer, image: &HtmlImageElement, foot: Point, flipped: bool) {
    let width = image.width() as f32;
    let height = image.height() as f32;
    let destination = Rect::new(foot.x - width / 2.0, foot.y - height, width, height);
    if flipped {
        renderer.draw_image_flipped(image, &destination);
    } else {
        renderer.draw_image(image, &destination);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_tracks_its_target() {
        let mut camera = Camera {
            center: Point { x: 0.0, y: 0.0 },
        };
        camera.follow(Point { x: 42.0, y: -7.0 });
        assert_eq!(camera.center, Point { x: 42.0, y: -7.0 });
    }

    #[test]
    fn paint_order_is_lowest_depth_first() {
        let order = standing_paint_order(&[30.0, 10.0, 20.0], 15.0);
        // player (index 3) sits between the trees at depth 10 and 20
        assert_eq!(order, vec![1, 3, 2, 0]);
    }

    #[test]
    fn player_in_front_when_lowest_on_screen() {
        let order = standing_paint_order(&[10.0, 20.0], 99.0);
        assert_eq!(*order.last().unwrap(), 2);
    }

    #[test]
    fn paint_order_with_no_trees_is_just_the_player() {
        assert_eq!(standing_paint_order(&[], 5.0), vec![0]);
    }
}
