use crate::browser;
use anyhow::{anyhow, Error, Result};
use futures::channel::oneshot::channel;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::HtmlAudioElement;

/// Asynchronously load an audio clip, resolved once the browser reports it
/// can play the clip through without stalling.
pub async fn load_audio(source: &str) -> Result<HtmlAudioElement> {
    let audio = browser::new_audio(source)?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "[sound::load_audio] Error loading audio: {:#?}",
                err
            )));
        }
    });

    audio.set_oncanplaythrough(Some(success_callback.as_ref().unchecked_ref()));
    audio.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    audio.set_preload("auto");

    // keep callbacks alive until the clip is ready or errors
    success_callback.forget();
    error_callback.forget();

    rx.await??;

    Ok(audio)
}

/// The one looping background track a scene owns. Stopping rewinds the
/// element so the next play starts clean; playing stops any run already in
/// flight, so a scene restart never layers two copies of the theme.
pub struct MusicHandle {
    element: HtmlAudioElement,
}

impl MusicHandle {
    pub fn play_looping(element: &HtmlAudioElement, volume: f64) -> Result<Self> {
        let element = element.clone();
        if !element.paused() {
            let _ = element.pause();
        }
        element.set_current_time(0.0);
        element.set_loop(true);
        element.set_volume(volume.clamp(0.0, 1.0));

        // play() hands back a promise; a rejection (e.g. autoplay policy)
        // surfaces in the console rather than killing the scene
        element
            .play()
            .map_err(|err| anyhow!("Could not start playback : {:#?}", err))?;

        Ok(MusicHandle { element })
    }

    pub fn stop(&self) {
        let _ = self.element.pause();
        self.element.set_current_time(0.0);
    }
}
