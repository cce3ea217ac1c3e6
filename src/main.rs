//! Baribari entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;

    use baribari::GameConfig;
    use baribari::platform::web::{
        Inbox, SurfaceInput, WebAudio, WebSurface, listen_for_gestures, new_inbox,
    };
    use baribari::sim::{Control, SceneController};

    type Game = SceneController<WebSurface, WebAudio>;

    fn to_js<E: std::fmt::Display>(e: E) -> JsValue {
        JsValue::from_str(&e.to_string())
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).map_err(to_js)?;

        log::info!("Baribari starting...");

        let config = GameConfig::load_or_default();
        let inbox = new_inbox();

        // Gesture and click listeners unlock the context before queueing input
        let audio = WebAudio::new();
        let unlock = audio.unlock_handle(config.audio.gain);
        let surface = WebSurface::new(inbox.clone())
            .map_err(to_js)?
            .with_audio_unlock(unlock.clone());

        let seed = js_sys::Date::now() as u64;
        let game = SceneController::new(config, seed, surface, audio).map_err(to_js)?;

        listen_for_gestures(&inbox, &unlock).map_err(to_js)?;

        // Start game loop
        request_animation_frame(Rc::new(RefCell::new(game)), inbox);

        log::info!("Baribari running!");
        Ok(())
    }

    fn dispatch(game: &mut Game, input: SurfaceInput) {
        match input {
            SurfaceInput::Command(Control::Start) => {
                game.start();
            }
            SurfaceInput::Command(Control::Restart) => {
                game.restart();
            }
            SurfaceInput::Selected { id, text } => {
                if let Err(e) = game.select(id, &text) {
                    log::debug!("Selection of {} ignored: {}", text, e);
                }
            }
            SurfaceInput::Expired(id) => game.token_expired(id),
            SurfaceInput::Gesture(gesture) => game.user_gesture(gesture),
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>, inbox: Inbox) {
        let Some(window) = web_sys::window() else {
            log::error!("No window; game loop stopped");
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, inbox, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, inbox: Inbox, time: f64) {
        {
            let mut g = game.borrow_mut();

            // Listeners may push while we dispatch; take a snapshot first
            let inputs: Vec<SurfaceInput> = inbox.borrow_mut().drain(..).collect();
            for input in inputs {
                dispatch(&mut g, input);
            }

            g.advance(time);
            for event in g.drain_events() {
                log::debug!("{:?}", event);
            }
        }

        request_animation_frame(game, inbox);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use baribari::GameConfig;
    use baribari::audio::Gesture;
    use baribari::platform::headless::{HeadlessAudio, HeadlessSurface};
    use baribari::sim::{GameEvent, Scene, SceneController};

    /// Bot reaction step
    const STEP_MS: f64 = 250.0;
    /// Give up after this long of simulated time
    const MAX_MS: f64 = 60_000.0;

    /// Play one round headlessly, picking correct words as they appear
    pub fn run(config: GameConfig, seed: u64) {
        let mut game =
            match SceneController::new(config, seed, HeadlessSurface::new(), HeadlessAudio::new()) {
                Ok(game) => game,
                Err(e) => {
                    log::error!("Invalid configuration: {}", e);
                    return;
                }
            };

        game.user_gesture(Gesture::PrimaryAction);
        game.start();

        let mut now = 0.0;
        while now < MAX_MS {
            now += STEP_MS;
            game.advance(now);

            // Pick the oldest word on screen that scores
            let target = game
                .surface()
                .tokens()
                .iter()
                .find(|t| game.config().is_correct(&t.text))
                .map(|t| (t.id, t.text.clone()));
            if let Some((id, text)) = target {
                if let Err(e) = game.select(id, &text) {
                    log::debug!("Selection rejected: {}", e);
                }
            }

            for event in game.drain_events() {
                match event {
                    GameEvent::CountdownTick { .. } => log::debug!("{:?}", event),
                    _ => log::info!("[{:>6.0}ms] {:?}", now, event),
                }
            }

            if matches!(game.scene(), Scene::Clear | Scene::Start) {
                break;
            }
        }

        let stats = game.audio().stats();
        println!(
            "Round finished in {:?} after {:.1}s: score {}, {} voice clips played ({} abandoned)",
            game.scene(),
            now / 1000.0,
            game.state().score(),
            stats.started,
            stats.abandoned
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Baribari (native) starting...");
    log::info!(
        "Native mode runs a headless demo round - run with `trunk serve` for the web version"
    );

    let seed = std::env::var("BARIBARI_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0)
        });
    log::info!("Demo seed: {}", seed);

    demo::run(baribari::GameConfig::load_or_default(), seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
