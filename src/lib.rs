// ==================== Imports ====================
use wasm_bindgen::prelude::*;

#[macro_use]
mod browser;
mod assets;
mod engine;
mod game;
mod grid;
mod player;
mod scenes;
mod sound;

use engine::GameLoop;
use game::ChroniclesOfEden;

const GAME_TITLE: &str = "Chronicles of Eden";

// ==================== Main Functions ====================
/// Main entry for the Webassembly module
/// - sizes the canvas to the viewport and keeps it there across resizes
/// - starts the game loop on the preload scene
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();

    if let Ok(document) = browser::document() {
        document.set_title(GAME_TITLE);
    }

    browser::resize_canvas_to_window().expect("canvas should size to the window");
    browser::set_onresize(|| {
        if let Err(err) = browser::resize_canvas_to_window() {
            error!("[boot] resize failed: {:#}", err);
        }
    })
    .expect("resize handler should register");

    // spawns the game on the local executor; the loop re-arms itself via
    // requestAnimationFrame from then on
    browser::spawn_local(async move {
        if let Err(err) = GameLoop::start(ChroniclesOfEden::new()).await {
            error!("[boot] game loop did not start: {:#}", err);
        }
    });

    Ok(())
}
