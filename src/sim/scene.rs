//! Scene state machine
//!
//! `SceneController` owns the round: it switches screens, starts and stops the
//! clock and spawner, routes selections through the score resolver and fires
//! voice feedback. Platform code feeds it commands, selections and the current
//! time; everything else happens through `Surface` and `AudioBackend`.

use std::collections::HashSet;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::clock::{Clock, ClockSignal};
use super::score::{Resolution, SelectError, resolve};
use super::spawner::Spawner;
use super::state::{GameEvent, GameState, RoundOutcome, Scene, Verdict};
use super::surface::{Control, Handle, Surface, SurfaceError};
use super::timer::{TimerId, TimerKind, TimerQueue};
use crate::audio::{AudioBackend, AudioFeedback, Gesture};
use crate::config::{ConfigError, GameConfig};
use crate::consts::{LOSE_MESSAGE, WIN_MESSAGE};

/// Top-level game controller
pub struct SceneController<S: Surface, A: AudioBackend> {
    config: GameConfig,
    scene: Scene,
    state: GameState,
    clock: Clock,
    spawner: Spawner,
    rng: Pcg32,
    timers: TimerQueue,
    surface: S,
    audio: AudioFeedback<A>,
    /// Tokens emitted this round and not yet resolved or expired
    live_tokens: HashSet<u32>,
    end_delay: Option<TimerId>,
    banner_timer: Option<TimerId>,
    reported_missing: HashSet<Handle>,
    events: Vec<GameEvent>,
}

impl<S: Surface, A: AudioBackend> SceneController<S, A> {
    /// Build the controller and show the start screen
    pub fn new(config: GameConfig, seed: u64, surface: S, backend: A) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut controller = Self {
            clock: Clock::new(config.clock_period_ms),
            spawner: Spawner::new(config.spawn_period_ms),
            state: GameState::idle(&config),
            rng: Pcg32::seed_from_u64(seed),
            audio: AudioFeedback::new(backend, &config.audio),
            config,
            scene: Scene::Start,
            timers: TimerQueue::new(),
            surface,
            live_tokens: HashSet::new(),
            end_delay: None,
            banner_timer: None,
            reported_missing: HashSet::new(),
            events: Vec::new(),
        };

        let bound = controller.surface.bind_control(Control::Start);
        controller.paint(bound);
        controller.reset_round();
        controller.show_only(Handle::StartScreen);
        log::info!("Game initialized with seed: {}", seed);

        Ok(controller)
    }

    pub fn scene(&self) -> Scene {
        self.scene
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn audio(&self) -> &AudioFeedback<A> {
        &self.audio
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn now_ms(&self) -> f64 {
        self.timers.now_ms()
    }

    /// Take the events recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Any user interaction; unlocks audio on the first one
    pub fn user_gesture(&mut self, gesture: Gesture) {
        self.audio.on_gesture(gesture);
    }

    /// Advance time to `now_ms`, firing every timer that came due
    pub fn advance(&mut self, now_ms: f64) {
        self.audio.pump(&mut self.timers);
        while let Some(fired) = self.timers.pop_due(now_ms) {
            self.handle_timer(fired.kind);
            self.audio.pump(&mut self.timers);
        }
        self.timers.advance_to(now_ms);
    }

    /// Timer callback entry point. Stray callbacks after a reset are no-ops.
    pub fn handle_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::ClockTick => self.on_clock_tick(),
            TimerKind::SpawnTick => self.on_spawn_tick(),
            TimerKind::RoundEndDelay => self.on_round_end_delay(),
            TimerKind::BannerHide => {
                self.banner_timer = None;
                let hidden = self.surface.set_visible(Handle::Banner, false);
                self.paint(hidden);
            }
            TimerKind::AudioRetry(request) => self.audio.retry(request, &mut self.timers),
            TimerKind::ResumeTimeout(request) => {
                self.audio.resume_timed_out(request, &mut self.timers)
            }
        }
    }

    /// Start command: Start -> Playing
    pub fn start(&mut self) -> bool {
        if self.scene != Scene::Start {
            log::debug!("Ignoring start command in {:?}", self.scene);
            return false;
        }

        self.reset_round();
        self.state = GameState::begin(&self.config);
        self.refresh_indicators();
        self.show_only(Handle::PlayScreen);
        let shown = self.surface.set_visible(Handle::PlayArea, true);
        self.paint(shown);
        let playing = self.surface.set_playing(true);
        self.paint(playing);

        self.scene = Scene::Playing;
        self.clock.start(&mut self.timers);
        self.spawner.start(&mut self.timers);
        self.events.push(GameEvent::RoundStarted);
        log::info!("Game started");
        true
    }

    /// Restart command: Clear -> Start
    pub fn restart(&mut self) -> bool {
        if self.scene != Scene::Clear {
            log::debug!("Ignoring restart command in {:?}", self.scene);
            return false;
        }
        self.reset();
        true
    }

    /// Stop everything, clear the round and go back to the start screen
    pub fn reset(&mut self) {
        self.reset_round();
        self.show_only(Handle::StartScreen);
        self.scene = Scene::Start;
        self.events.push(GameEvent::ReturnedToStart);
    }

    /// The player selected a token
    pub fn select(&mut self, token_id: u32, text: &str) -> Result<Resolution, SelectError> {
        if !self.state.is_active() {
            log::debug!("Rejected selection of {}: round inactive", text);
            return Err(SelectError::RoundInactive);
        }
        if !self.live_tokens.remove(&token_id) {
            log::debug!("Rejected selection of token {}", token_id);
            return Err(SelectError::UnknownToken(token_id));
        }

        let (state, resolution) = resolve(self.state, text, &self.config)?;
        self.state = state;

        self.surface.retire_token(token_id, !self.config.is_correct(text));
        self.audio.play(text, &mut self.timers);
        self.refresh_progress();
        self.events.push(GameEvent::Resolved {
            text: text.to_string(),
            delta: resolution.score_delta,
            score: state.score(),
        });

        if resolution.verdict == Verdict::Win {
            self.end_round(RoundOutcome::Win);
        }
        Ok(resolution)
    }

    /// A token finished its animation without being selected
    pub fn token_expired(&mut self, token_id: u32) {
        self.live_tokens.remove(&token_id);
        self.surface.retire_token(token_id, false);
    }

    fn on_clock_tick(&mut self) {
        let (state, signal) = self.clock.on_tick(self.state, &mut self.timers);
        self.state = state;

        match signal {
            ClockSignal::Ticked(time_left) => {
                self.refresh_countdown();
                self.events.push(GameEvent::CountdownTick { time_left });
            }
            ClockSignal::Expired => {
                self.refresh_countdown();
                self.events.push(GameEvent::CountdownTick { time_left: 0 });
                self.end_round(RoundOutcome::Lose);
            }
            ClockSignal::Idle => log::debug!("Stray clock tick ignored"),
        }
    }

    fn on_spawn_tick(&mut self) {
        if !self.state.is_active() {
            log::debug!("Stray spawn tick ignored");
            return;
        }

        let origin = match self.surface.origin() {
            Ok(origin) => origin,
            Err(e) => {
                self.paint(Err(e));
                Vec2::ZERO
            }
        };
        let now = self.timers.now_ms();
        let spawned = self
            .spawner
            .on_tick(&self.state, &mut self.rng, &self.config, origin, now);
        let Some(token) = spawned else {
            return;
        };

        self.live_tokens.insert(token.id);
        let emitted = self.surface.emit_token(&token);
        self.paint(emitted);
        self.events.push(GameEvent::TokenSpawned {
            id: token.id,
            text: token.text,
        });
    }

    fn end_round(&mut self, outcome: RoundOutcome) {
        // Timers go first so nothing ticks against the finished state
        self.clock.stop(&mut self.timers);
        self.spawner.stop(&mut self.timers);
        self.state = self.state.finish();
        self.scene = Scene::RoundEnding(outcome);
        let playing = self.surface.set_playing(false);
        self.paint(playing);

        match outcome {
            RoundOutcome::Win => {
                self.show_banner(WIN_MESSAGE);
                self.events.push(GameEvent::RoundWon);
            }
            RoundOutcome::Lose => {
                self.show_banner(LOSE_MESSAGE);
                self.events.push(GameEvent::RoundLost);
            }
        }
        log::info!("Round ended: {:?} (score {})", outcome, self.state.score());

        self.end_delay = Some(
            self.timers
                .set_timeout(self.config.round_end_delay_ms, TimerKind::RoundEndDelay),
        );
    }

    fn on_round_end_delay(&mut self) {
        self.end_delay = None;
        let Scene::RoundEnding(outcome) = self.scene else {
            log::debug!("Stray round-end timer in {:?}", self.scene);
            return;
        };

        let hidden = self.surface.set_visible(Handle::Banner, false);
        self.paint(hidden);

        match outcome {
            RoundOutcome::Win => {
                self.show_only(Handle::ClearScreen);
                let bound = self.surface.bind_control(Control::Restart);
                self.paint(bound);
                self.scene = Scene::Clear;
                self.events.push(GameEvent::ClearShown);
            }
            RoundOutcome::Lose => self.reset(),
        }
    }

    /// Cancel round timers and put every indicator back to its initial value
    fn reset_round(&mut self) {
        log::debug!("Resetting game...");
        self.clock.stop(&mut self.timers);
        self.spawner.stop(&mut self.timers);
        if let Some(id) = self.end_delay.take() {
            self.timers.cancel(id);
        }

        self.state = GameState::idle(&self.config);
        self.live_tokens.clear();

        let cleared = self.surface.clear_tokens();
        self.paint(cleared);
        let playing = self.surface.set_playing(false);
        self.paint(playing);
        let banner = self.surface.set_text(Handle::Banner, "");
        self.paint(banner);
        self.refresh_indicators();
    }

    fn refresh_indicators(&mut self) {
        self.refresh_progress();
        self.refresh_countdown();
    }

    fn refresh_progress(&mut self) {
        let text = self.config.progress_text(self.state.score());
        let result = self.surface.set_text(Handle::Progress, &text);
        self.paint(result);
    }

    fn refresh_countdown(&mut self) {
        let text = self.state.time_left().to_string();
        let result = self.surface.set_text(Handle::Countdown, &text);
        self.paint(result);
    }

    fn show_banner(&mut self, message: &str) {
        let text = self.surface.set_text(Handle::Banner, message);
        self.paint(text);
        let shown = self.surface.set_visible(Handle::Banner, true);
        self.paint(shown);

        if let Some(id) = self.banner_timer.take() {
            self.timers.cancel(id);
        }
        self.banner_timer = Some(
            self.timers
                .set_timeout(self.config.banner_duration_ms, TimerKind::BannerHide),
        );
    }

    /// Show one screen container, hide the others
    fn show_only(&mut self, screen: Handle) {
        for handle in [Handle::StartScreen, Handle::PlayScreen, Handle::ClearScreen] {
            let result = self.surface.set_visible(handle, handle == screen);
            self.paint(result);
        }
        let cover = self
            .surface
            .set_visible(Handle::Cover, screen == Handle::StartScreen);
        self.paint(cover);
    }

    /// Downgrade a surface failure to a log record
    fn paint(&mut self, result: Result<(), SurfaceError>) {
        match result {
            Ok(()) => {}
            Err(SurfaceError::MissingHandle(handle)) => {
                if self.reported_missing.insert(handle) {
                    log::warn!("Element {:?} not found; it will not be updated", handle);
                } else {
                    log::debug!("Element {:?} still missing", handle);
                }
            }
            Err(e) => log::warn!("{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::CORRECT_WORD;
    use crate::platform::headless::{HeadlessAudio, HeadlessSurface};
    use proptest::prelude::*;

    type TestController = SceneController<HeadlessSurface, HeadlessAudio>;

    fn controller(config: GameConfig) -> TestController {
        SceneController::new(config, 42, HeadlessSurface::new(), HeadlessAudio::new())
            .expect("valid config")
    }

    /// Only the target word spawns, so every token scores
    fn correct_only() -> GameConfig {
        GameConfig {
            vocabulary: vec![CORRECT_WORD.to_string()],
            ..GameConfig::default()
        }
    }

    fn select_latest(game: &mut TestController) -> Result<Resolution, SelectError> {
        let token = game
            .surface()
            .tokens()
            .last()
            .cloned()
            .expect("a token on screen");
        game.select(token.id, &token.text)
    }

    fn count(events: &[GameEvent], wanted: &GameEvent) -> usize {
        events.iter().filter(|e| *e == wanted).count()
    }

    /// Start at `t`, win with three selections, wait for the clear screen
    fn play_to_clear(game: &mut TestController, t: f64) -> f64 {
        assert!(game.start());
        for n in 1..=3 {
            game.advance(t + n as f64 * 1000.0);
            select_latest(game).expect("token selectable");
        }
        let cleared_at = t + 3000.0 + game.config().round_end_delay_ms;
        game.advance(cleared_at);
        assert_eq!(game.scene(), Scene::Clear);
        cleared_at
    }

    #[test]
    fn test_initial_screen() {
        let game = controller(GameConfig::default());
        let surface = game.surface();
        assert_eq!(game.scene(), Scene::Start);
        assert!(surface.is_visible(Handle::StartScreen));
        assert!(!surface.is_visible(Handle::PlayScreen));
        assert!(!surface.is_visible(Handle::ClearScreen));
        assert_eq!(surface.text(Handle::Countdown), Some("20"));
        assert_eq!(surface.text(Handle::Progress), Some("バリバリを3つ集めろ⚡️"));
        assert_eq!(surface.listeners(Control::Start), 1);
        assert!(!game.state().is_active());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = GameConfig {
            win_score: 0,
            ..GameConfig::default()
        };
        let result = SceneController::new(config, 1, HeadlessSurface::new(), HeadlessAudio::new());
        assert!(matches!(result, Err(ConfigError::ZeroWinScore)));
    }

    #[test]
    fn test_start_begins_round() {
        let mut game = controller(GameConfig::default());
        assert!(game.start());
        assert_eq!(game.scene(), Scene::Playing);
        assert!(game.surface().is_visible(Handle::PlayScreen));
        assert!(!game.surface().is_visible(Handle::StartScreen));

        game.advance(1000.0);
        assert_eq!(game.state().time_left(), 19);
        assert_eq!(game.surface().text(Handle::Countdown), Some("19"));
        assert_eq!(game.surface().emitted(), 1);

        let token = &game.surface().tokens()[0];
        assert_eq!(token.origin, Vec2::new(0.0, 400.0));
        assert_eq!(token.created_at_ms, 1000.0);
    }

    #[test]
    fn test_commands_in_wrong_scene_are_ignored() {
        let mut game = controller(GameConfig::default());
        assert!(!game.restart());
        assert!(game.start());
        assert!(!game.start());
        assert!(!game.restart());
        assert_eq!(game.scene(), Scene::Playing);
    }

    #[test]
    fn test_timeout_takes_lose_path_once() {
        let mut game = controller(GameConfig::default());
        game.start();

        game.advance(19_999.0);
        assert_eq!(game.state().time_left(), 1);
        assert_eq!(game.scene(), Scene::Playing);

        game.advance(20_000.0);
        assert_eq!(game.state().time_left(), 0);
        assert_eq!(game.scene(), Scene::RoundEnding(RoundOutcome::Lose));
        assert_eq!(game.surface().text(Handle::Countdown), Some("0"));
        assert_eq!(game.surface().text(Handle::Banner), Some(LOSE_MESSAGE));
        assert!(game.surface().is_visible(Handle::Banner));

        // Tokens left on screen can no longer score
        if let Some(token) = game.surface().tokens().first().cloned() {
            assert_eq!(
                game.select(token.id, &token.text),
                Err(SelectError::RoundInactive)
            );
        }
        let emitted = game.surface().emitted();

        game.advance(21_999.0);
        assert_eq!(game.scene(), Scene::RoundEnding(RoundOutcome::Lose));
        game.advance(22_000.0);
        assert_eq!(game.scene(), Scene::Start);
        assert!(game.surface().is_visible(Handle::StartScreen));
        assert!(!game.surface().is_visible(Handle::PlayScreen));
        assert!(!game.surface().is_visible(Handle::Banner));
        assert_eq!(game.surface().text(Handle::Countdown), Some("20"));
        assert!(game.surface().tokens().is_empty());

        game.advance(40_000.0);
        assert_eq!(game.surface().emitted(), emitted);

        let events = game.drain_events();
        let ticks = events
            .iter()
            .filter(|e| matches!(e, GameEvent::CountdownTick { .. }))
            .count();
        assert_eq!(ticks, 20);
        assert_eq!(count(&events, &GameEvent::RoundLost), 1);
        assert_eq!(count(&events, &GameEvent::RoundWon), 0);
        assert_eq!(count(&events, &GameEvent::ReturnedToStart), 1);
    }

    #[test]
    fn test_three_correct_selections_win() {
        let mut game = controller(correct_only());
        game.start();

        game.advance(1000.0);
        let first = select_latest(&mut game).unwrap();
        assert_eq!(first.verdict, Verdict::Continue);
        assert_eq!(
            game.surface().text(Handle::Progress),
            Some("バリバリを2つ集めろ⚡️")
        );

        game.advance(2000.0);
        select_latest(&mut game).unwrap();
        game.advance(3000.0);
        let third = select_latest(&mut game).unwrap();
        assert_eq!(third.verdict, Verdict::Win);
        assert_eq!(game.state().score(), 3);
        assert_eq!(game.scene(), Scene::RoundEnding(RoundOutcome::Win));
        assert_eq!(game.surface().text(Handle::Progress), Some("やったね⚡️"));
        assert_eq!(game.surface().text(Handle::Banner), Some(WIN_MESSAGE));

        // No clock or spawner activity once won
        let emitted = game.surface().emitted();
        game.advance(4999.0);
        assert_eq!(game.scene(), Scene::RoundEnding(RoundOutcome::Win));
        assert_eq!(game.state().time_left(), 17);
        assert_eq!(game.surface().emitted(), emitted);

        game.advance(5000.0);
        assert_eq!(game.scene(), Scene::Clear);
        assert!(game.surface().is_visible(Handle::ClearScreen));
        assert!(!game.surface().is_visible(Handle::PlayScreen));
        assert_eq!(game.surface().listeners(Control::Restart), 1);

        game.advance(30_000.0);
        assert_eq!(game.state().time_left(), 17);
        assert_eq!(game.surface().emitted(), emitted);

        let events = game.drain_events();
        assert_eq!(count(&events, &GameEvent::RoundWon), 1);
        assert_eq!(count(&events, &GameEvent::ClearShown), 1);
    }

    #[test]
    fn test_restart_binding_replaced_each_cycle() {
        let mut game = controller(correct_only());
        let mut t = 0.0;
        for cycle in 1..=3 {
            t = play_to_clear(&mut game, t);
            assert_eq!(game.surface().listeners(Control::Restart), 1);
            assert_eq!(game.surface().bind_calls(Control::Restart), cycle);

            assert!(game.restart());
            assert_eq!(game.scene(), Scene::Start);
            assert!(game.surface().is_visible(Handle::StartScreen));
            assert!(!game.surface().is_visible(Handle::ClearScreen));
            assert_eq!(game.state().score(), 0);
        }
        assert_eq!(game.surface().listeners(Control::Start), 1);
    }

    #[test]
    fn test_cover_and_play_mode_follow_scene() {
        let mut game = controller(correct_only());
        assert!(game.surface().is_visible(Handle::Cover));
        assert!(!game.surface().is_playing());

        game.start();
        assert!(!game.surface().is_visible(Handle::Cover));
        assert!(game.surface().is_playing());

        for n in 1..=3 {
            game.advance(n as f64 * 1000.0);
            select_latest(&mut game).unwrap();
        }
        assert_eq!(game.scene(), Scene::RoundEnding(RoundOutcome::Win));
        assert!(!game.surface().is_playing());

        game.advance(5000.0);
        assert_eq!(game.scene(), Scene::Clear);
        assert!(!game.surface().is_visible(Handle::Cover));

        game.restart();
        assert!(game.surface().is_visible(Handle::Cover));
        assert!(!game.surface().is_playing());
    }

    #[test]
    fn test_lost_round_leaves_play_mode() {
        let mut game = controller(GameConfig::default());
        game.start();
        game.advance(20_000.0);
        assert_eq!(game.scene(), Scene::RoundEnding(RoundOutcome::Lose));
        assert!(!game.surface().is_playing());

        game.advance(22_000.0);
        assert_eq!(game.scene(), Scene::Start);
        assert!(game.surface().is_visible(Handle::Cover));
    }

    #[test]
    fn test_stray_ticks_after_reset_change_nothing() {
        let mut game = controller(GameConfig::default());
        game.start();
        game.advance(1500.0);
        assert_eq!(game.surface().emitted(), 1);

        game.reset();
        let state = game.state();
        let emitted = game.surface().emitted();
        let countdown = game.surface().text(Handle::Countdown).map(str::to_string);
        game.drain_events();

        // In-flight callbacks racing the cancellation
        game.handle_timer(TimerKind::ClockTick);
        game.handle_timer(TimerKind::SpawnTick);
        game.handle_timer(TimerKind::RoundEndDelay);
        game.advance(60_000.0);

        assert_eq!(game.state(), state);
        assert_eq!(game.surface().emitted(), emitted);
        assert_eq!(
            game.surface().text(Handle::Countdown).map(str::to_string),
            countdown
        );
        assert!(game.drain_events().is_empty());
        assert_eq!(game.scene(), Scene::Start);
    }

    #[test]
    fn test_selection_rules() {
        let mut game = controller(correct_only());
        assert_eq!(game.select(1, CORRECT_WORD), Err(SelectError::RoundInactive));

        game.start();
        game.advance(1000.0);
        let token = game.surface().tokens()[0].clone();
        assert!(game.select(token.id, &token.text).is_ok());
        assert_eq!(
            game.select(token.id, &token.text),
            Err(SelectError::UnknownToken(token.id))
        );
        assert_eq!(game.select(999, CORRECT_WORD), Err(SelectError::UnknownToken(999)));
        assert_eq!(game.state().score(), 1);
        assert!(game.surface().tokens().is_empty());
    }

    #[test]
    fn test_expired_token_cannot_score() {
        let mut game = controller(correct_only());
        game.start();
        game.advance(1000.0);
        let token = game.surface().tokens()[0].clone();

        game.token_expired(token.id);
        assert!(game.surface().tokens().is_empty());
        assert_eq!(
            game.select(token.id, &token.text),
            Err(SelectError::UnknownToken(token.id))
        );
        assert_eq!(game.state().score(), 0);
    }

    #[test]
    fn test_each_selection_plays_audio_once() {
        let mut game = controller(correct_only());
        game.user_gesture(Gesture::PointerDown);
        game.start();
        game.advance(1000.0);
        select_latest(&mut game).unwrap();
        game.advance(2000.0);
        select_latest(&mut game).unwrap();
        game.advance(2500.0);

        assert_eq!(game.audio().backend().played.len(), 2);
        assert_eq!(game.audio().stats().attempts, 2);
    }

    #[test]
    fn test_rejected_selection_plays_no_audio() {
        let mut game = controller(GameConfig::default());
        game.user_gesture(Gesture::PrimaryAction);
        let _ = game.select(1, CORRECT_WORD);
        game.advance(5000.0);
        assert_eq!(game.audio().stats().attempts, 0);
        assert!(game.audio().backend().played.is_empty());
    }

    #[test]
    fn test_audio_failure_does_not_touch_round() {
        let backend = HeadlessAudio::new().failing_create();
        let mut game =
            SceneController::new(correct_only(), 9, HeadlessSurface::new(), backend).unwrap();
        game.start();
        game.advance(1000.0);
        select_latest(&mut game).unwrap();
        game.advance(5000.0);

        assert_eq!(game.state().score(), 1);
        assert_eq!(game.audio().stats().abandoned, 1);
        assert_eq!(game.scene(), Scene::Playing);
    }

    #[test]
    fn test_gestures_initialize_audio_once() {
        let mut game = controller(GameConfig::default());
        game.user_gesture(Gesture::PointerDown);
        game.user_gesture(Gesture::PointerUp);
        game.start();
        game.user_gesture(Gesture::PrimaryAction);
        assert_eq!(game.audio().backend().create_calls, 1);
    }

    #[test]
    fn test_missing_handles_degrade() {
        let surface = HeadlessSurface::new()
            .without(Handle::Countdown)
            .without(Handle::Origin)
            .without(Handle::Banner);
        let mut game =
            SceneController::new(GameConfig::default(), 3, surface, HeadlessAudio::new()).unwrap();
        game.start();
        game.advance(3000.0);

        assert_eq!(game.state().time_left(), 17);
        assert_eq!(game.surface().text(Handle::Countdown), None);
        assert_eq!(game.surface().tokens()[0].origin, Vec2::ZERO);

        game.advance(22_000.0);
        assert_eq!(game.scene(), Scene::Start);
    }

    #[test]
    fn test_same_seed_same_round() {
        let mut a = controller(GameConfig::default());
        let mut b = controller(GameConfig::default());
        a.start();
        b.start();
        a.advance(10_000.0);
        b.advance(10_000.0);
        assert_eq!(a.surface().tokens(), b.surface().tokens());
    }

    proptest! {
        #[test]
        fn prop_score_and_time_stay_bounded(
            seed in any::<u64>(),
            steps in proptest::collection::vec((0u32..1500, any::<bool>()), 0..60),
        ) {
            let mut game = SceneController::new(
                GameConfig::default(),
                seed,
                HeadlessSurface::new(),
                HeadlessAudio::new(),
            ).unwrap();
            game.start();

            let win = game.config().win_score;
            let total = game.config().game_time_secs;
            let mut t = 0.0;
            for (dt, pick) in steps {
                t += dt as f64;
                game.advance(t);
                if pick {
                    if let Some(token) = game.surface().tokens().first().cloned() {
                        let _ = game.select(token.id, &token.text);
                    }
                }
                let state = game.state();
                prop_assert!(state.score() <= win);
                prop_assert!(state.time_left() <= total);
                if game.scene() == Scene::Playing {
                    prop_assert!(state.score() < win);
                }
            }
        }
    }
}
