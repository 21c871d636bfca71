use crate::browser;
use crate::engine;
use crate::sound;
use anyhow::{anyhow, Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use web_sys::{HtmlAudioElement, HtmlImageElement};

pub const MANIFEST_PATH: &str = "assets_manifest.json";

// ==================== Manifest ====================

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Manifest {
    #[serde(default)]
    pub sprites: Vec<ImageEntry>,
    #[serde(default)]
    pub tiles: Vec<ImageEntry>,
    #[serde(default)]
    pub audio: Vec<AudioEntry>,
    #[serde(default)]
    pub spritesheets: Vec<SpritesheetEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageEntry {
    pub key: String,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioEntry {
    pub key: String,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpritesheetEntry {
    pub key: String,
    pub path: String,
    pub frame_width: u32,
    pub frame_height: u32,
}

/// One queued loader registration. Splitting "what to load" from the
/// browser fetches keeps the manifest handling testable on any target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    Image {
        key: String,
        path: String,
    },
    Audio {
        key: String,
        path: String,
    },
    Spritesheet {
        key: String,
        path: String,
        frame_width: u32,
        frame_height: u32,
    },
}

impl Manifest {
    /// Flatten the manifest into the loader queue. Sprites and tiles are
    /// both plain images; missing categories contribute nothing.
    pub fn registrations(&self) -> Vec<Registration> {
        let images = self
            .sprites
            .iter()
            .chain(self.tiles.iter())
            .map(|entry| Registration::Image {
                key: entry.key.clone(),
                path: entry.path.clone(),
            });
        let audio = self.audio.iter().map(|entry| Registration::Audio {
            key: entry.key.clone(),
            path: entry.path.clone(),
        });
        let sheets = self
            .spritesheets
            .iter()
            .map(|entry| Registration::Spritesheet {
                key: entry.key.clone(),
                path: entry.path.clone(),
                frame_width: entry.frame_width,
                frame_height: entry.frame_height,
            });
        images.chain(audio).chain(sheets).collect()
    }

    /// The asset list the game ships with. Stands in for the manifest when
    /// the fetch fails, so preload always has something to load.
    pub fn bundled() -> Self {
        Manifest {
            sprites: vec![
                ImageEntry {
                    key: ImageKey::Eve.as_str().into(),
                    path: "assets/eve.png".into(),
                },
                ImageEntry {
                    key: ImageKey::Tree.as_str().into(),
                    path: "assets/eden_tree.png".into(),
                },
            ],
            tiles: vec![ImageEntry {
                key: ImageKey::Grass.as_str().into(),
                path: "assets/eden_grass.png".into(),
            }],
            audio: vec![AudioEntry {
                key: AudioKey::Theme.as_str().into(),
                path: "assets/eden_theme.ogg".into(),
            }],
            spritesheets: vec![],
        }
    }
}

// ==================== Typed asset keys ====================
// The manifest stays stringly-typed data; game code goes through these so
// an asset typo is a compile error, not a blank sprite at runtime.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKey {
    Grass,
    Tree,
    Eve,
}

impl ImageKey {
    pub const ALL: [ImageKey; 3] = [ImageKey::Grass, ImageKey::Tree, ImageKey::Eve];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageKey::Grass => "eden_grass",
            ImageKey::Tree => "eden_tree",
            ImageKey::Eve => "eve",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioKey {
    Theme,
}

impl AudioKey {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioKey::Theme => "theme",
        }
    }
}

// ==================== Registry ====================

pub struct SpriteSheet {
    pub image: HtmlImageElement,
    pub frame_width: u32,
    pub frame_height: u32,
}

enum LoadedAsset {
    Image(String, HtmlImageElement),
    Audio(String, HtmlAudioElement),
    Sheet(String, SpriteSheet),
}

/// Everything the preload phase produced, keyed by manifest key.
#[derive(Default)]
pub struct AssetRegistry {
    images: HashMap<String, HtmlImageElement>,
    audio: HashMap<String, HtmlAudioElement>,
    sheets: HashMap<String, SpriteSheet>,
}

impl AssetRegistry {
    fn insert(&mut self, asset: LoadedAsset) {
        match asset {
            LoadedAsset::Image(key, element) => {
                self.images.insert(key, element);
            }
            LoadedAsset::Audio(key, element) => {
                self.audio.insert(key, element);
            }
            LoadedAsset::Sheet(key, sheet) => {
                self.sheets.insert(key, sheet);
            }
        }
    }

    pub fn image(&self, key: ImageKey) -> Result<&HtmlImageElement> {
        self.images
            .get(key.as_str())
            .ok_or_else(|| anyhow!("missing image asset : {}", key.as_str()))
    }

    pub fn audio(&self, key: AudioKey) -> Result<&HtmlAudioElement> {
        self.audio
            .get(key.as_str())
            .ok_or_else(|| anyhow!("missing audio asset : {}", key.as_str()))
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn audio_count(&self) -> usize {
        self.audio.len()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }
}

// ==================== Loader ====================

enum LoadPhase {
    Fetching,
    Loading { loaded: usize, total: usize },
    Ready(AssetRegistry),
    Failed(String),
    Drained,
}

/// Handle onto the in-flight asset load. The load itself runs on the local
/// executor; the game polls this once per update. Completion is only ever
/// reported after the manifest fetch has resolved and every registration
/// has finished, so scene transition cannot race the manifest.
pub struct AssetLoad {
    phase: Rc<RefCell<LoadPhase>>,
}

impl AssetLoad {
    pub fn begin(manifest_path: &str) -> Self {
        let phase = Rc::new(RefCell::new(LoadPhase::Fetching));
        let task_phase = phase.clone();
        let path = manifest_path.to_string();
        browser::spawn_local(async move {
            let outcome = run_load(&task_phase, &path).await;
            if let Err(err) = outcome {
                error!("[assets] loading failed: {:#}", err);
                *task_phase.borrow_mut() = LoadPhase::Failed(format!("{err:#}"));
            }
        });
        AssetLoad { phase }
    }

    pub fn fraction(&self) -> f32 {
        match &*self.phase.borrow() {
            LoadPhase::Fetching => 0.0,
            LoadPhase::Loading { loaded, total } => {
                if *total == 0 {
                    1.0
                } else {
                    *loaded as f32 / *total as f32
                }
            }
            LoadPhase::Ready(_) | LoadPhase::Drained => 1.0,
            LoadPhase::Failed(_) => 0.0,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(&*self.phase.borrow(), LoadPhase::Ready(_))
    }

    pub fn failure(&self) -> Option<String> {
        match &*self.phase.borrow() {
            LoadPhase::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    pub fn take_assets(&self) -> Option<AssetRegistry> {
        let mut phase = self.phase.borrow_mut();
        if matches!(&*phase, LoadPhase::Ready(_)) {
            match std::mem::replace(&mut *phase, LoadPhase::Drained) {
                LoadPhase::Ready(registry) => Some(registry),
                _ => None,
            }
        } else {
            None
        }
    }
}

async fn run_load(phase: &Rc<RefCell<LoadPhase>>, manifest_path: &str) -> Result<()> {
    // The manifest is awaited before anything else; a fetch or parse
    // failure downgrades to the bundled list instead of hanging preload.
    let manifest = match browser::fetch_json::<Manifest>(manifest_path).await {
        Ok(manifest) => manifest,
        Err(err) => {
            error!(
                "[assets] manifest '{}' unavailable, using bundled list: {:#}",
                manifest_path, err
            );
            Manifest::bundled()
        }
    };

    let registrations = manifest.registrations();
    let total = registrations.len();
    log!("[assets] loading {} assets", total);
    *phase.borrow_mut() = LoadPhase::Loading { loaded: 0, total };

    let mut registry = AssetRegistry::default();
    let mut loaded = 0;
    let mut pending: FuturesUnordered<_> =
        registrations.into_iter().map(load_one).collect();

    while let Some(asset) = pending.next().await {
        registry.insert(asset?);
        loaded += 1;
        *phase.borrow_mut() = LoadPhase::Loading { loaded, total };
    }

    // the scenes ahead look these keys up; catch a bad manifest here
    // instead of as a blank sprite mid-game
    for key in ImageKey::ALL {
        registry.image(key)?;
    }
    registry.audio(AudioKey::Theme)?;

    log!(
        "[assets] ready: {} images, {} audio clips, {} spritesheets",
        registry.image_count(),
        registry.audio_count(),
        registry.sheet_count()
    );
    *phase.borrow_mut() = LoadPhase::Ready(registry);
    Ok(())
}

async fn load_one(registration: Registration) -> Result<LoadedAsset> {
    match registration {
        Registration::Image { key, path } => {
            let element = engine::load_image(&path)
                .await
                .with_context(|| format!("Failed to load image '{key}' from : {path}"))?;
            Ok(LoadedAsset::Image(key, element))
        }
        Registration::Audio { key, path } => {
            let element = sound::load_audio(&path)
                .await
                .with_context(|| format!("Failed to load audio '{key}' from : {path}"))?;
            Ok(LoadedAsset::Audio(key, element))
        }
        Registration::Spritesheet {
            key,
            path,
            frame_width,
            frame_height,
        } => {
            let image = engine::load_image(&path)
                .await
                .with_context(|| format!("Failed to load spritesheet '{key}' from : {path}"))?;
            Ok(LoadedAsset::Sheet(
                key,
                SpriteSheet {
                    image,
                    frame_width,
                    frame_height,
                },
            ))
        }
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    // the same conversion fetch_json performs on a real response body
    #[wasm_bindgen_test]
    fn manifest_converts_from_js_values() {
        let json =
            js_sys::JSON::parse(r#"{"tiles":[{"key":"eden_grass","path":"g.png"}]}"#).unwrap();
        let manifest: Manifest = serde_wasm_bindgen::from_value(json).unwrap();
        assert_eq!(manifest.registrations().len(), 1);
    }
}
