use crate::engine::input::KeyState;
use crate::engine::Point;

// movement consts
pub const PLAYER_SPEED: f32 = 150.0; // px per second
const DEPTH_BIAS: f32 = 1.0; // sort above the tile under our feet

/// Directional intent for one update, arrows and WASD OR'd together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveInput {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MoveInput {
    pub fn from_keystate(keystate: &KeyState) -> Self {
        MoveInput {
            left: keystate.is_pressed("ArrowLeft") || keystate.is_pressed("KeyA"),
            right: keystate.is_pressed("ArrowRight") || keystate.is_pressed("KeyD"),
            up: keystate.is_pressed("ArrowUp") || keystate.is_pressed("KeyW"),
            down: keystate.is_pressed("ArrowDown") || keystate.is_pressed("KeyS"),
        }
    }

    pub fn any(&self) -> bool {
        self.left || self.right || self.up || self.down
    }

    /// Unit-or-zero direction vector. Diagonals are scaled by 1/sqrt(2) so
    /// diagonal speed equals axial speed.
    pub fn direction(&self) -> (f32, f32) {
        let x = (self.right as i8 - self.left as i8) as f32;
        let y = (self.down as i8 - self.up as i8) as f32;
        if x != 0.0 && y != 0.0 {
            (
                x * std::f32::consts::FRAC_1_SQRT_2,
                y * std::f32::consts::FRAC_1_SQRT_2,
            )
        } else {
            (x, y)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Idle,
    Moving,
}

/// The player in screen space. Pure data plus arithmetic; the scene feeds
/// it sampled input and the fixed update delta.
#[derive(Debug, Clone, Copy)]
pub struct Player {
    position: Point,
    facing_left: bool,
    motion: Motion,
}

impl Player {
    pub fn new(spawn: Point) -> Self {
        Player {
            position: spawn,
            facing_left: false,
            motion: Motion::Idle,
        }
    }

    pub fn update(&mut self, input: &MoveInput, delta: f32) {
        self.motion = if input.any() {
            Motion::Moving
        } else {
            Motion::Idle
        };

        let (direction_x, direction_y) = input.direction();
        let velocity_x = direction_x * PLAYER_SPEED;
        let velocity_y = direction_y * PLAYER_SPEED;

        self.position.x += velocity_x * delta;
        self.position.y += velocity_y * delta;

        // facing persists through idle frames
        if velocity_x < 0.0 {
            self.facing_left = true;
        } else if velocity_x > 0.0 {
            self.facing_left = false;
        }
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn depth(&self) -> f32 {
        self.position.y + DEPTH_BIAS
    }

    pub fn facing_left(&self) -> bool {
        self.facing_left
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DELTA: f32 = 1.0 / 60.0;

    fn spawn() -> Point {
        Point { x: 100.0, y: 100.0 }
    }

    #[test]
    fn axial_displacement_is_velocity_times_delta() {
        let mut player = Player::new(spawn());
        player.update(
            &MoveInput {
                right: true,
                ..MoveInput::default()
            },
            DELTA,
        );
        assert_relative_eq!(player.position().x, 100.0 + PLAYER_SPEED * DELTA);
        assert_relative_eq!(player.position().y, 100.0);
        assert_eq!(player.motion(), Motion::Moving);
    }

    #[test]
    fn diagonal_speed_equals_axial_speed() {
        let mut player = Player::new(spawn());
        player.update(
            &MoveInput {
                left: true,
                up: true,
                ..MoveInput::default()
            },
            DELTA,
        );
        let moved_x = player.position().x - 100.0;
        let moved_y = player.position().y - 100.0;
        let distance = (moved_x * moved_x + moved_y * moved_y).sqrt();
        assert_relative_eq!(distance, PLAYER_SPEED * DELTA, max_relative = 1e-5);
    }

    #[test]
    fn left_up_direction_is_normalized_unit_vector() {
        let input = MoveInput {
            left: true,
            up: true,
            ..MoveInput::default()
        };
        let (x, y) = input.direction();
        assert_relative_eq!(x, -std::f32::consts::FRAC_1_SQRT_2);
        assert_relative_eq!(y, -std::f32::consts::FRAC_1_SQRT_2);
        assert_relative_eq!((x * x + y * y).sqrt(), 1.0, max_relative = 1e-6);
    }

    #[test]
    fn no_keys_means_idle_and_stationary() {
        let mut player = Player::new(spawn());
        player.update(&MoveInput::default(), DELTA);
        assert_eq!(player.motion(), Motion::Idle);
        assert_relative_eq!(player.position().x, 100.0);
        assert_relative_eq!(player.position().y, 100.0);
    }

    #[test]
    fn opposing_keys_cancel_but_still_count_as_moving() {
        let mut player = Player::new(spawn());
        player.update(
            &MoveInput {
                left: true,
                right: true,
                ..MoveInput::default()
            },
            DELTA,
        );
        assert_eq!(player.motion(), Motion::Moving);
        assert_relative_eq!(player.position().x, 100.0);
    }

    #[test]
    fn facing_follows_horizontal_velocity_and_persists() {
        let mut player = Player::new(spawn());
        assert!(!player.facing_left());

        player.update(
            &MoveInput {
                left: true,
                ..MoveInput::default()
            },
            DELTA,
        );
        assert!(player.facing_left());

        // stopping does not flip us back
        player.update(&MoveInput::default(), DELTA);
        assert!(player.facing_left());

        player.update(
            &MoveInput {
                right: true,
                ..MoveInput::default()
            },
            DELTA,
        );
        assert!(!player.facing_left());
    }

    #[test]
    fn depth_tracks_position_y() {
        let mut player = Player::new(spawn());
        let initial = player.depth();
        assert!(initial > 100.0);

        player.update(
            &MoveInput {
                down: true,
                ..MoveInput::default()
            },
            DELTA,
        );
        assert_relative_eq!(player.depth(), player.position().y + 1.0);
        assert!(player.depth() > initial);
    }

    #[test]
    fn keystate_sampling_ors_arrows_and_wasd() {
        let mut keystate = KeyState::new();
        keystate.set_pressed("KeyA");
        keystate.set_pressed("ArrowUp");

        let input = MoveInput::from_keystate(&keystate);
        assert!(input.left);
        assert!(input.up);
        assert!(!input.right);
        assert!(!input.down);
    }
}
