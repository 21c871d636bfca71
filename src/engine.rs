use crate::browser;
use anyhow::{anyhow, Error, Result};
// wasm is a single threaded environment, so Rc RefCell > Mutex
use async_trait::async_trait;
use futures::channel::oneshot::channel;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

pub mod input {
    use crate::browser;
    use anyhow::Result;
    use futures::channel::mpsc::{unbounded, UnboundedReceiver};
    use std::collections::HashSet;
    use wasm_bindgen::JsCast;
    use web_sys::KeyboardEvent;

    pub enum KeyPress {
        KeyUp(String),
        KeyDown(String),
    }

    /// Held-key set sampled once per frame. Constructed directly in tests,
    /// fed from the browser key events in the game loop.
    #[derive(Debug, Default)]
    pub struct KeyState {
        pressed_keys: HashSet<String>,
    }

    impl KeyState {
        pub fn new() -> Self {
            KeyState {
                pressed_keys: HashSet::new(),
            }
        }

        pub fn is_pressed(&self, code: &str) -> bool {
            self.pressed_keys.contains(code)
        }

        pub fn set_pressed(&mut self, code: &str) {
            self.pressed_keys.insert(code.into());
        }

        pub fn set_released(&mut self, code: &str) {
            self.pressed_keys.remove(code);
        }
    }

    /// Wire window keydown/keyup to an unbounded channel. The receiver is
    /// drained on the frame boundary by [`process_input`].
    pub fn prepare_input() -> Result<UnboundedReceiver<KeyPress>> {
        let (keydown_sender, keyevent_receiver) = unbounded();
        let keyup_sender = keydown_sender.clone();

        let onkeydown = browser::closure_wrap(Box::new(move |keycode: KeyboardEvent| {
            let _ = keydown_sender.unbounded_send(KeyPress::KeyDown(keycode.code()));
        }) as Box<dyn FnMut(KeyboardEvent)>);

        let onkeyup = browser::closure_wrap(Box::new(move |keycode: KeyboardEvent| {
            let _ = keyup_sender.unbounded_send(KeyPress::KeyUp(keycode.code()));
        }) as Box<dyn FnMut(KeyboardEvent)>);

        let window = browser::window()?;
        window.set_onkeydown(Some(onkeydown.as_ref().unchecked_ref()));
        window.set_onkeyup(Some(onkeyup.as_ref().unchecked_ref()));
        onkeydown.forget();
        onkeyup.forget();

        Ok(keyevent_receiver)
    }

    pub fn process_input(state: &mut KeyState, receiver: &mut UnboundedReceiver<KeyPress>) {
        loop {
            match receiver.try_next() {
                Ok(None) => break,
                Err(_err) => break,
                Ok(Some(event)) => match event {
                    KeyPress::KeyUp(code) => state.set_released(&code),
                    KeyPress::KeyDown(code) => state.set_pressed(&code),
                },
            }
        }
    }
}

use self::input::{prepare_input, process_input, KeyState};

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    fn update(&mut self, keystate: &KeyState, delta: f32);
    fn draw(&self, renderer: &Renderer);
}

// length of a frame in milliseconds
const FRAME_SIZE: f32 = 1.0 / 60.0 * 1000.0;
// the same tick handed to Game::update, in seconds
pub const FRAME_SECONDS: f32 = FRAME_SIZE / 1000.0;

pub struct GameLoop {
    last_frame: f64,
    accumulated_delta: f32,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

impl GameLoop {
    pub async fn start(game: impl Game + 'static) -> Result<()> {
        let mut keyevent_receiver = prepare_input()?;
        let mut game = game.initialize().await?;
        let mut game_loop = GameLoop {
            last_frame: browser::now()?,
            accumulated_delta: 0.0,
        };
        let renderer = Renderer::new(browser::context()?);
        let mut keystate = KeyState::new();
        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            process_input(&mut keystate, &mut keyevent_receiver);
            game_loop.accumulated_delta += (perf - game_loop.last_frame) as f32;
            while game_loop.accumulated_delta > FRAME_SIZE {
                game.update(&keystate, FRAME_SECONDS);
                game_loop.accumulated_delta -= FRAME_SIZE;
            }
            game_loop.last_frame = perf;
            game.draw(&renderer);
            let _ = browser::request_animation_frame(f.borrow().as_ref().unwrap());
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn new(context: CanvasRenderingContext2d) -> Self {
        // pixel-art assets: nearest-neighbour scaling
        context.set_image_smoothing_enabled(false);
        Renderer { context }
    }

    /// Current canvas backing-store dimensions. The canvas tracks the
    /// window, so this changes across resize events.
    pub fn viewport(&self) -> Size {
        self.context
            .canvas()
            .map(|canvas| Size {
                width: canvas.width() as f32,
                height: canvas.height() as f32,
            })
            .unwrap_or_default()
    }

    pub fn clear(&self, rect: &Rect) {
        self.context.clear_rect(
            rect.x.into(),
            rect.y.into(),
            rect.width.into(),
            rect.height.into(),
        );
    }

    pub fn set_alpha(&self, alpha: f64) {
        self.context.set_global_alpha(alpha.clamp(0.0, 1.0));
    }

    pub fn fill_rect(&self, rect: &Rect, color: &str) {
        self.context.set_fill_style_str(color);
        self.context.fill_rect(
            rect.x.into(),
            rect.y.into(),
            rect.width.into(),
            rect.height.into(),
        );
    }

    pub fn fill_text_centered(&self, text: &str, position: &Point, font: &str, color: &str) {
        self.context.set_font(font);
        self.context.set_text_align("center");
        self.context.set_fill_style_str(color);
        self.context
            .fill_text(text, position.x.into(), position.y.into())
            .expect("Text drawing is throwing exceptions! Unrecoverable error");
    }

    pub fn draw_image(&self, image: &HtmlImageElement, destination: &Rect) {
        self.context
            .draw_image_with_html_image_element_and_dw_and_dh(
                image,
                destination.x.into(),
                destination.y.into(),
                destination.width.into(),
                destination.height.into(),
            )
            .expect("Drawing is throwing exceptions! Unrecoverable error");
    }

    /// Mirror the image around its vertical axis (left-facing sprites).
    pub fn draw_image_flipped(&self, image: &HtmlImageElement, destination: &Rect) {
        self.context.save();
        self.context
            .scale(-1.0, 1.0)
            .expect("Scale is throwing exceptions! Unrecoverable error");
        self.context
            .draw_image_with_html_image_element_and_dw_and_dh(
                image,
                (-(destination.x + destination.width)).into(),
                destination.y.into(),
                destination.width.into(),
                destination.height.into(),
            )
            .expect("Drawing is throwing exceptions! Unrecoverable error");
        self.context.restore();
    }

    /// World-space drawing between push/pop is shifted by -offset, which
    /// keeps the camera target centered in the viewport.
    pub fn push_camera(&self, offset: &Point) {
        self.context.save();
        self.context
            .translate((-offset.x).into(), (-offset.y).into())
            .expect("Translate is throwing exceptions! Unrecoverable error");
    }

    pub fn pop_camera(&self) {
        self.context.restore();
    }

    /// Screen-space radial darkening, transparent center to dark edges.
    pub fn draw_vignette(&self, strength: f32) {
        let viewport = self.viewport();
        let center_x = f64::from(viewport.width) / 2.0;
        let center_y = f64::from(viewport.height) / 2.0;
        let inner = f64::from(viewport.width.min(viewport.height)) * 0.35;
        let outer = f64::from(viewport.width.max(viewport.height)) * 0.75;

        match self
            .context
            .create_radial_gradient(center_x, center_y, inner, center_x, center_y, outer)
        {
            Ok(gradient) => {
                let edge = format!("rgba(0, 0, 0, {})", strength.clamp(0.0, 1.0));
                let _ = gradient.add_color_stop(0.0, "rgba(0, 0, 0, 0)");
                let _ = gradient.add_color_stop(1.0, &edge);
                self.context.set_fill_style_canvas_gradient(&gradient);
                self.context.fill_rect(
                    0.0,
                    0.0,
                    viewport.width.into(),
                    viewport.height.into(),
                );
            }
            Err(err) => {
                error!("[engine] could not build vignette gradient: {:#?}", err);
            }
        }
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::new_image()?;
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
                "[engine::load_image] Error loading image: {:#?}",
                err
            )));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callback alive until image is loaded or errors
    success_callback.forget();
    error_callback.forget();

    rx.await??;

    Ok(image)
}
