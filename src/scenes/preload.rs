use crate::engine::{Point, Rect, Renderer};

// seconds to sit on the full bar before the fade starts
const COMPLETE_DELAY: f32 = 0.2;
// seconds for the loading UI to fade out
const FADE_DURATION: f32 = 0.5;

const BOX_WIDTH: f32 = 320.0;
const BOX_HEIGHT: f32 = 50.0;
const BAR_WIDTH: f32 = 300.0;
const BAR_HEIGHT: f32 = 30.0;

/// Lifecycle of the loading screen. The clock is injected as the fixed
/// update delta, so the whole machine runs in plain unit tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreloadPhase {
    Idle,
    Loading,
    Complete { elapsed: f32 },
    Transitioning { elapsed: f32 },
    Done,
    Failed,
}

pub struct PreloadScene {
    phase: PreloadPhase,
    fraction: f32,
    error: Option<String>,
}

impl PreloadScene {
    pub fn new() -> Self {
        PreloadScene {
            phase: PreloadPhase::Idle,
            fraction: 0.0,
            error: None,
        }
    }

    pub fn begin(&mut self) {
        if self.phase == PreloadPhase::Idle {
            self.phase = PreloadPhase::Loading;
        }
    }

    /// Progress updates only move the bar; everything else is untouched.
    pub fn set_progress(&mut self, value: f32) {
        if self.phase == PreloadPhase::Loading {
            self.fraction = value.clamp(0.0, 1.0);
        }
    }

    pub fn finish_loading(&mut self) {
        if self.phase == PreloadPhase::Loading {
            self.fraction = 1.0;
            self.phase = PreloadPhase::Complete { elapsed: 0.0 };
        }
    }

    pub fn fail(&mut self, message: &str) {
        if self.phase != PreloadPhase::Failed {
            self.phase = PreloadPhase::Failed;
            self.error = Some(message.to_string());
        }
    }

    pub fn update(&mut self, delta: f32) {
        self.phase = match self.phase {
            PreloadPhase::Complete { elapsed } => {
                let elapsed = elapsed + delta;
                if elapsed >= COMPLETE_DELAY {
                    PreloadPhase::Transitioning { elapsed: 0.0 }
                } else {
                    PreloadPhase::Complete { elapsed }
                }
            }
            PreloadPhase::Transitioning { elapsed } => {
                let elapsed = elapsed + delta;
                if elapsed >= FADE_DURATION {
                    PreloadPhase::Done
                } else {
                    PreloadPhase::Transitioning { elapsed }
                }
            }
            other => other,
        };
    }

    pub fn phase(&self) -> PreloadPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == PreloadPhase::Done
    }

    pub fn progress(&self) -> f32 {
        self.fraction
    }

    /// Alpha applied to every loading UI element during the fade.
    pub fn ui_alpha(&self) -> f32 {
        match self.phase {
            PreloadPhase::Transitioning { elapsed } => {
                (1.0 - elapsed / FADE_DURATION).clamp(0.0, 1.0)
            }
            PreloadPhase::Done => 0.0,
            _ => 1.0,
        }
    }

    pub fn progress_label(&self) -> String {
        format!("Loading: {}%", (self.fraction * 100.0).floor() as u32)
    }

    pub fn draw(&self, renderer: &Renderer) {
        let viewport = renderer.viewport();
        let full = Rect::new(0.0, 0.0, viewport.width, viewport.height);
        renderer.clear(&full);
        renderer.fill_rect(&full, "#000000");

        let center_x = viewport.width / 2.0;
        let center_y = viewport.height / 2.0;

        if self.phase() == PreloadPhase::Failed {
            renderer.fill_text_centered(
                "Loading failed",
                &Point {
                    x: center_x,
                    y: center_y,
                },
                "18px monospace",
                "#ff6666",
            );
            if let Some(message) = &self.error {
                renderer.fill_text_centered(
                    message,
                    &Point {
                        x: center_x,
                        y: center_y + 30.0,
                    },
                    "12px monospace",
                    "#aaaaaa",
                );
            }
            return;
        }

        let alpha = self.ui_alpha();
        if alpha <= 0.0 {
            return;
        }

        renderer.set_alpha(f64::from(alpha) * 0.8);
        renderer.fill_rect(
            &Rect::new(
                center_x - BOX_WIDTH / 2.0,
                center_y - BOX_HEIGHT / 2.0,
                BOX_WIDTH,
                BOX_HEIGHT,
            ),
            "#222222",
        );

        renderer.set_alpha(alpha.into());
        renderer.fill_rect(
            &Rect::new(
                center_x - BAR_WIDTH / 2.0,
                center_y - BAR_HEIGHT / 2.0,
                BAR_WIDTH * self.progress(),
                BAR_HEIGHT,
            ),
            "#ffffff",
        );
        renderer.fill_text_centered(
            &self.progress_label(),
            &Point {
                x: center_x,
                y: center_y + 60.0,
            },
            "18px monospace",
            "#ffffff",
        );
        renderer.set_alpha(1.0);
    }
}

impl Default for PreloadScene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TICK: f32 = 1.0 / 60.0;

    fn scene_in_loading() -> PreloadScene {
        let mut scene = PreloadScene::new();
        scene.begin();
        scene
    }

    fn drive(scene: &mut PreloadScene, seconds: f32) {
        let steps = (seconds / TICK).ceil() as usize;
        for _ in 0..steps {
            scene.update(TICK);
        }
    }

    #[test]
    fn idle_until_begun() {
        let mut scene = PreloadScene::new();
        assert_eq!(scene.phase(), PreloadPhase::Idle);

        scene.update(TICK);
        scene.set_progress(0.5);
        assert_eq!(scene.phase(), PreloadPhase::Idle);
        assert_relative_eq!(scene.progress(), 0.0);

        scene.begin();
        assert_eq!(scene.phase(), PreloadPhase::Loading);
    }

    #[test]
    fn progress_is_clamped_to_unit_interval() {
        let mut scene = scene_in_loading();
        scene.set_progress(1.5);
        assert_relative_eq!(scene.progress(), 1.0);
        scene.set_progress(-0.25);
        assert_relative_eq!(scene.progress(), 0.0);
    }

    #[test]
    fn progress_label_floors_the_percentage() {
        let mut scene = scene_in_loading();
        assert_eq!(scene.progress_label(), "Loading: 0%");

        scene.set_progress(0.5);
        assert_eq!(scene.progress_label(), "Loading: 50%");

        scene.set_progress(0.999);
        assert_eq!(scene.progress_label(), "Loading: 99%");

        scene.set_progress(1.0);
        assert_eq!(scene.progress_label(), "Loading: 100%");
    }

    #[test]
    fn complete_holds_before_the_fade_starts() {
        let mut scene = scene_in_loading();
        scene.finish_loading();
        assert_eq!(scene.phase(), PreloadPhase::Complete { elapsed: 0.0 });
        assert_relative_eq!(scene.progress(), 1.0);

        // half the delay: still holding
        drive(&mut scene, 0.1);
        assert!(matches!(scene.phase(), PreloadPhase::Complete { .. }));

        drive(&mut scene, 0.15);
        assert!(matches!(scene.phase(), PreloadPhase::Transitioning { .. }));
    }

    #[test]
    fn fade_alpha_decreases_then_scene_is_done() {
        let mut scene = scene_in_loading();
        scene.finish_loading();
        drive(&mut scene, COMPLETE_DELAY + TICK);
        assert!(matches!(scene.phase(), PreloadPhase::Transitioning { .. }));

        let mut last_alpha = scene.ui_alpha();
        while matches!(scene.phase(), PreloadPhase::Transitioning { .. }) {
            scene.update(TICK);
            let alpha = scene.ui_alpha();
            assert!(alpha <= last_alpha);
            last_alpha = alpha;
        }

        assert!(scene.is_done());
        assert_relative_eq!(scene.ui_alpha(), 0.0);
    }

    #[test]
    fn progress_updates_after_completion_are_ignored() {
        let mut scene = scene_in_loading();
        scene.finish_loading();
        scene.set_progress(0.25);
        assert_relative_eq!(scene.progress(), 1.0);
    }

    #[test]
    fn finish_is_idempotent_once_past_loading() {
        let mut scene = scene_in_loading();
        scene.finish_loading();
        drive(&mut scene, 0.1);
        let before = scene.phase();
        scene.finish_loading();
        assert_eq!(scene.phase(), before);
    }

    #[test]
    fn failure_is_terminal() {
        let mut scene = scene_in_loading();
        scene.fail("manifest unreachable");
        assert_eq!(scene.phase(), PreloadPhase::Failed);

        drive(&mut scene, 2.0);
        scene.finish_loading();
        assert_eq!(scene.phase(), PreloadPhase::Failed);
        assert!(!scene.is_done());
    }
}
