use crate::assets::{AssetLoad, MANIFEST_PATH};
use crate::engine::input::KeyState;
use crate::engine::{Game, Renderer};
use crate::scenes::eden::EdenScene;
use crate::scenes::preload::PreloadScene;
use crate::scenes::SceneId;
use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// ┌─────────────────────── Scene Flow ───────────────────────┐
/// │  Boot ── initialize ──► Preload                          │
/// │     asset load runs beside the frame loop;               │
/// │     the scene machine tracks it:                         │
/// │     Idle → Loading → Complete → Transitioning → Done     │
/// │  Preload(Done) ── take assets ──► Eden                   │
/// │     grid + trees + Eve + camera + theme + vignette       │
/// └──────────────────────────────────────────────────────────┘
pub enum ChroniclesOfEden {
    /// Nothing exists yet; `initialize` has not run.
    Boot,
    /// A scene is live and owns the frame.
    Active(ActiveScene),
}

pub enum ActiveScene {
    Preload {
        scene: PreloadScene,
        load: AssetLoad,
    },
    Eden(EdenScene),
}

impl ChroniclesOfEden {
    pub fn new() -> Self {
        ChroniclesOfEden::Boot
    }
}

#[async_trait(?Send)]
impl Game for ChroniclesOfEden {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            ChroniclesOfEden::Boot => {
                let load = AssetLoad::begin(MANIFEST_PATH);
                let mut scene = PreloadScene::new();
                scene.begin();
                log!("[game] starting scene: {}", SceneId::Preload.name());
                Ok(Box::new(ChroniclesOfEden::Active(ActiveScene::Preload {
                    scene,
                    load,
                })))
            }
            ChroniclesOfEden::Active(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, keystate: &KeyState, delta: f32) {
        let ChroniclesOfEden::Active(active) = self else {
            return;
        };

        // pump the current scene; a finished preload yields the registry
        let ready = match active {
            ActiveScene::Preload { scene, load } => {
                if let Some(message) = load.failure() {
                    scene.fail(&message);
                }
                scene.set_progress(load.fraction());
                if load.is_ready() {
                    scene.finish_loading();
                }
                scene.update(delta);
                if scene.is_done() {
                    load.take_assets()
                } else {
                    None
                }
            }
            ActiveScene::Eden(eden) => {
                eden.update(keystate, delta);
                None
            }
        };

        if let Some(registry) = ready {
            match EdenScene::create(registry) {
                Ok(eden) => {
                    log!("[game] starting scene: {}", SceneId::Eden.name());
                    *active = ActiveScene::Eden(eden);
                }
                Err(err) => {
                    error!(
                        "[game] could not start {}: {:#}",
                        SceneId::Eden.name(),
                        err
                    );
                    if let ActiveScene::Preload { scene, .. } = active {
                        scene.fail(&format!("{err:#}"));
                    }
                }
            }
        }
    }

    fn draw(&self, renderer: &Renderer) {
        match self {
            ChroniclesOfEden::Boot => {}
            ChroniclesOfEden::Active(ActiveScene::Preload { scene, .. }) => scene.draw(renderer),
            ChroniclesOfEden::Active(ActiveScene::Eden(eden)) => eden.draw(renderer),
        }
    }
}
