//! Browser platform
//!
//! `WebSurface` drives the page's DOM and `WebAudio` the Web Audio API.
//! DOM listeners never call into the controller: they push `SurfaceInput`s into
//! a shared `Inbox` that the frame loop drains, so no callback ever borrows the
//! controller while it is already borrowed.
//!
//! Audio is the exception. Browsers only let a context start or resume inside
//! the gesture handler itself, so listeners hold an `AudioUnlock` and touch
//! the shared output context directly before queueing their input.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use glam::Vec2;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{
    AddEventListenerOptions, AudioBuffer, AudioBufferSourceNode, AudioContext, AudioContextState,
    Document, Element, GainNode, HtmlElement, RequestCache, RequestInit, Response,
};

use crate::audio::{
    AudioBackend, AudioError, AudioEvent, ContextStatus, Gesture, PlayRequest, SourceId,
};
use crate::sim::{Control, Handle, SpawnToken, Surface, SurfaceError};

/// Decoys fade out for this long before removal
const LINGER_MS: i32 = 500;

/// Something the player did on the page
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceInput {
    Command(Control),
    Selected { id: u32, text: String },
    Expired(u32),
    Gesture(Gesture),
}

pub type Inbox = Rc<RefCell<VecDeque<SurfaceInput>>>;

pub fn new_inbox() -> Inbox {
    Rc::new(RefCell::new(VecDeque::new()))
}

type Listener = Closure<dyn FnMut(web_sys::Event)>;

fn selector(handle: Handle) -> &'static str {
    match handle {
        Handle::PlayArea => "#eruption-area",
        Handle::Origin => "#gobou-img",
        Handle::Progress => ".score",
        Handle::Countdown => "#timer",
        Handle::Banner => "#message",
        Handle::StartScreen => "#start-screen",
        Handle::PlayScreen => "#game-screen",
        Handle::ClearScreen => "#clear-screen",
        Handle::Cover => "#cover-image",
    }
}

fn control_selector(control: Control) -> &'static str {
    match control {
        Control::Start => "#start-btn",
        Control::Restart => "#restart-btn",
    }
}

fn js_err(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn dom_err(value: JsValue) -> SurfaceError {
    SurfaceError::Dom(js_err(&value))
}

/// Queue `input`, unlocking audio first while the gesture is still active
fn push_listener(inbox: &Inbox, unlock: Option<AudioUnlock>, input: SurfaceInput) -> Listener {
    let inbox = inbox.clone();
    Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
        if let Some(unlock) = &unlock {
            unlock.unlock();
        }
        inbox.borrow_mut().push_back(input.clone());
    })
}

/// Register one-shot, capturing listeners for the first user interaction.
/// They create the audio context on the spot and report the gesture.
pub fn listen_for_gestures(inbox: &Inbox, unlock: &AudioUnlock) -> Result<(), SurfaceError> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| SurfaceError::Dom("no document".to_string()))?;

    let options = AddEventListenerOptions::new();
    options.set_once(true);
    options.set_capture(true);
    options.set_passive(true);

    for (event, gesture) in [
        ("touchstart", Gesture::PointerDown),
        ("touchend", Gesture::PointerUp),
        ("click", Gesture::PrimaryAction),
    ] {
        let closure = push_listener(
            inbox,
            Some(unlock.clone()),
            SurfaceInput::Gesture(gesture),
        );
        document
            .add_event_listener_with_callback_and_add_event_listener_options(
                event,
                closure.as_ref().unchecked_ref(),
                &options,
            )
            .map_err(dom_err)?;
        closure.forget();
    }
    Ok(())
}

/// An animated word on the page
struct TokenNode {
    element: HtmlElement,
    on_click: Listener,
    on_end: Listener,
}

impl TokenNode {
    /// Remove listeners so the closures can be dropped while the node lingers
    fn detach(&self) {
        let _ = self
            .element
            .remove_event_listener_with_callback("click", self.on_click.as_ref().unchecked_ref());
        let _ = self.element.remove_event_listener_with_callback(
            "animationend",
            self.on_end.as_ref().unchecked_ref(),
        );
    }
}

struct BoundControl {
    target: Element,
    listener: Listener,
}

/// DOM-backed rendering surface
pub struct WebSurface {
    document: Document,
    inbox: Inbox,
    unlock: Option<AudioUnlock>,
    tokens: HashMap<u32, TokenNode>,
    controls: HashMap<Control, BoundControl>,
}

impl WebSurface {
    pub fn new(inbox: Inbox) -> Result<Self, SurfaceError> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| SurfaceError::Dom("no document".to_string()))?;
        if let Some(body) = document.body() {
            let _ = body.style().set_property("touch-action", "manipulation");
        }

        Ok(Self {
            document,
            inbox,
            unlock: None,
            tokens: HashMap::new(),
            controls: HashMap::new(),
        })
    }

    /// Resume audio from token and control clicks
    pub fn with_audio_unlock(mut self, unlock: AudioUnlock) -> Self {
        self.unlock = Some(unlock);
        self
    }

    fn element(&self, handle: Handle) -> Result<HtmlElement, SurfaceError> {
        self.document
            .query_selector(selector(handle))
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
            .ok_or(SurfaceError::MissingHandle(handle))
    }
}

impl Surface for WebSurface {
    fn set_text(&mut self, handle: Handle, text: &str) -> Result<(), SurfaceError> {
        self.element(handle)?.set_text_content(Some(text));
        Ok(())
    }

    fn set_visible(&mut self, handle: Handle, visible: bool) -> Result<(), SurfaceError> {
        let element = self.element(handle)?;
        let display = match handle {
            Handle::Banner => {
                element
                    .class_list()
                    .toggle_with_force("show", visible)
                    .map_err(dom_err)?;
                return Ok(());
            }
            Handle::StartScreen | Handle::PlayScreen | Handle::ClearScreen => "flex",
            _ => "block",
        };
        element
            .style()
            .set_property("display", if visible { display } else { "none" })
            .map_err(dom_err)
    }

    fn origin(&self) -> Result<Vec2, SurfaceError> {
        // Top-center of the origin image
        let rect = self.element(Handle::Origin)?.get_bounding_client_rect();
        Ok(Vec2::new(
            (rect.left() + rect.width() / 2.0) as f32,
            rect.top() as f32,
        ))
    }

    fn emit_token(&mut self, token: &SpawnToken) -> Result<(), SurfaceError> {
        let area = self.element(Handle::PlayArea)?;
        let element: HtmlElement = self
            .document
            .create_element("div")
            .map_err(dom_err)?
            .dyn_into()
            .map_err(|_| SurfaceError::Dom("created element is not an HtmlElement".to_string()))?;

        element.set_class_name("eruption-word");
        element.set_text_content(Some(&token.text));

        let end = token.end_offset();
        let style = element.style();
        style
            .set_property("left", &format!("{}px", token.origin.x))
            .map_err(dom_err)?;
        style
            .set_property("top", &format!("{}px", token.origin.y))
            .map_err(dom_err)?;
        // Animation endpoint, read by the stylesheet
        style
            .set_property("--end-x", &format!("{}vh", end.x))
            .map_err(dom_err)?;
        style
            .set_property("--end-y", &format!("{}vh", end.y))
            .map_err(dom_err)?;

        let on_click = push_listener(
            &self.inbox,
            self.unlock.clone(),
            SurfaceInput::Selected {
                id: token.id,
                text: token.text.clone(),
            },
        );
        let on_end = push_listener(&self.inbox, None, SurfaceInput::Expired(token.id));
        element
            .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref())
            .map_err(dom_err)?;
        element
            .add_event_listener_with_callback("animationend", on_end.as_ref().unchecked_ref())
            .map_err(dom_err)?;

        area.append_child(&element).map_err(dom_err)?;
        self.tokens.insert(
            token.id,
            TokenNode {
                element,
                on_click,
                on_end,
            },
        );
        Ok(())
    }

    fn retire_token(&mut self, id: u32, linger: bool) {
        let Some(node) = self.tokens.remove(&id) else {
            return;
        };
        node.detach();

        if !linger {
            node.element.remove();
            return;
        }

        let _ = node.element.class_list().add_1("incorrect");
        let element = node.element.clone();
        let remove = Closure::once_into_js(move || element.remove());
        let scheduled = web_sys::window().map(|w| {
            w.set_timeout_with_callback_and_timeout_and_arguments_0(
                remove.unchecked_ref(),
                LINGER_MS,
            )
        });
        if !matches!(scheduled, Some(Ok(_))) {
            node.element.remove();
        }
    }

    fn clear_tokens(&mut self) -> Result<(), SurfaceError> {
        for (_, node) in self.tokens.drain() {
            node.detach();
            node.element.remove();
        }
        // Lingering decoys too
        self.element(Handle::PlayArea)?.set_inner_html("");
        Ok(())
    }

    fn bind_control(&mut self, control: Control) -> Result<(), SurfaceError> {
        if let Some(old) = self.controls.remove(&control) {
            let listener = old.listener.as_ref().unchecked_ref();
            let _ = old
                .target
                .remove_event_listener_with_callback("click", listener);
        }

        let target = self
            .document
            .query_selector(control_selector(control))
            .ok()
            .flatten()
            .ok_or(SurfaceError::MissingControl(control))?;
        let listener = push_listener(
            &self.inbox,
            self.unlock.clone(),
            SurfaceInput::Command(control),
        );
        target
            .add_event_listener_with_callback("click", listener.as_ref().unchecked_ref())
            .map_err(dom_err)?;

        self.controls.insert(control, BoundControl { target, listener });
        Ok(())
    }

    fn set_playing(&mut self, playing: bool) -> Result<(), SurfaceError> {
        let body = self
            .document
            .body()
            .ok_or_else(|| SurfaceError::Dom("no body".to_string()))?;
        body.class_list()
            .toggle_with_force("game-active", playing)
            .map_err(dom_err)?;
        Ok(())
    }
}

type EventQueue = Rc<RefCell<Vec<AudioEvent<AudioBuffer>>>>;

/// A playing one-shot source and its completion callback
struct ActiveSource {
    node: AudioBufferSourceNode,
    _on_ended: Closure<dyn FnMut()>,
}

/// Output context and its fixed gain stage
#[derive(Default)]
struct Output {
    context: Option<AudioContext>,
    gain: Option<GainNode>,
}

impl Output {
    /// Create the context unless it already exists
    fn ensure(&mut self, gain: f32) -> Result<(), AudioError> {
        if self.context.is_some() {
            return Ok(());
        }

        let context = AudioContext::new().map_err(|e| AudioError::Unavailable(js_err(&e)))?;
        let node = context
            .create_gain()
            .map_err(|e| AudioError::Unavailable(js_err(&e)))?;
        node.gain().set_value(gain);
        node.connect_with_audio_node(&context.destination())
            .map_err(|e| AudioError::Unavailable(js_err(&e)))?;

        log::info!("AudioContext created (state: {:?})", context.state());
        self.context = Some(context);
        self.gain = Some(node);
        Ok(())
    }
}

/// Handle for gesture listeners onto the output context `WebAudio` plays through
#[derive(Clone)]
pub struct AudioUnlock {
    output: Rc<RefCell<Output>>,
    gain: f32,
}

impl AudioUnlock {
    /// Create the context if needed and resume it if suspended.
    /// Only effective when called from inside a user gesture handler.
    pub fn unlock(&self) {
        let Ok(mut output) = self.output.try_borrow_mut() else {
            return;
        };
        if let Err(e) = output.ensure(self.gain) {
            log::error!("Failed to initialize audio: {}", e);
            return;
        }
        if let Some(context) = &output.context {
            if context.state() == AudioContextState::Suspended {
                let _ = context.resume();
            }
        }
    }
}

/// Web Audio output: one context, one fixed gain stage, a fresh source per play
#[derive(Default)]
pub struct WebAudio {
    output: Rc<RefCell<Output>>,
    events: EventQueue,
    live: HashMap<SourceId, ActiveSource>,
    next_source: u64,
}

impl WebAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share the output context with gesture listeners
    pub fn unlock_handle(&self, gain: f32) -> AudioUnlock {
        AudioUnlock {
            output: self.output.clone(),
            gain,
        }
    }
}

async fn load_clip(context: AudioContext, asset: String) -> Result<AudioBuffer, AudioError> {
    let fetch_err = |reason: String| AudioError::Fetch {
        asset: asset.clone(),
        reason,
    };
    let decode_err = |reason: String| AudioError::Decode {
        asset: asset.clone(),
        reason,
    };

    let window = web_sys::window().ok_or_else(|| fetch_err("no window".to_string()))?;
    let init = RequestInit::new();
    init.set_cache(RequestCache::NoCache);

    let response: Response = JsFuture::from(window.fetch_with_str_and_init(&asset, &init))
        .await
        .map_err(|e| fetch_err(js_err(&e)))?
        .dyn_into()
        .map_err(|e| fetch_err(js_err(&e)))?;
    if !response.ok() {
        return Err(fetch_err(format!("HTTP {}", response.status())));
    }

    let bytes = response.array_buffer().map_err(|e| fetch_err(js_err(&e)))?;
    let bytes: js_sys::ArrayBuffer = JsFuture::from(bytes)
        .await
        .map_err(|e| fetch_err(js_err(&e)))?
        .dyn_into()
        .map_err(|e| fetch_err(js_err(&e)))?;

    let decoded = context
        .decode_audio_data(&bytes)
        .map_err(|e| decode_err(js_err(&e)))?;
    JsFuture::from(decoded)
        .await
        .map_err(|e| decode_err(js_err(&e)))?
        .dyn_into()
        .map_err(|e| decode_err(js_err(&e)))
}

impl AudioBackend for WebAudio {
    type Buffer = AudioBuffer;

    fn create_context(&mut self, gain: f32) -> Result<(), AudioError> {
        self.output.borrow_mut().ensure(gain)
    }

    fn context_status(&self) -> Option<ContextStatus> {
        self.output.borrow().context.as_ref().map(|ctx| match ctx.state() {
            AudioContextState::Running => ContextStatus::Running,
            AudioContextState::Closed => ContextStatus::Closed,
            _ => ContextStatus::Suspended,
        })
    }

    fn request_resume(&mut self, request: PlayRequest) {
        let events = self.events.clone();
        let resumed = self.output.borrow().context.as_ref().map(AudioContext::resume);
        let promise = match resumed {
            Some(Ok(promise)) => promise,
            Some(Err(e)) => {
                let result = Err(AudioError::Resume(js_err(&e)));
                events.borrow_mut().push(AudioEvent::Resumed { request, result });
                return;
            }
            None => {
                let result = Err(AudioError::NoContext);
                events.borrow_mut().push(AudioEvent::Resumed { request, result });
                return;
            }
        };

        spawn_local(async move {
            let result = JsFuture::from(promise)
                .await
                .map(|_| ())
                .map_err(|e| AudioError::Resume(js_err(&e)));
            events.borrow_mut().push(AudioEvent::Resumed { request, result });
        });
    }

    fn request_load(&mut self, key: &str, asset: &str) {
        let events = self.events.clone();
        let key = key.to_string();
        let Some(context) = self.output.borrow().context.clone() else {
            events.borrow_mut().push(AudioEvent::Loaded {
                key,
                result: Err(AudioError::NoContext),
            });
            return;
        };

        let asset = asset.to_string();
        spawn_local(async move {
            let result = load_clip(context, asset).await;
            events.borrow_mut().push(AudioEvent::Loaded { key, result });
        });
    }

    fn start_source(
        &mut self,
        buffer: &AudioBuffer,
        _request: &PlayRequest,
    ) -> Result<SourceId, AudioError> {
        let output = self.output.borrow();
        let (Some(context), Some(gain)) = (&output.context, &output.gain) else {
            return Err(AudioError::NoContext);
        };
        let playback_err = |e: JsValue| AudioError::Playback(js_err(&e));

        let node = context.create_buffer_source().map_err(playback_err)?;
        node.set_buffer(Some(buffer));
        node.connect_with_audio_node(gain).map_err(playback_err)?;

        self.next_source += 1;
        let source = SourceId(self.next_source);
        let events = self.events.clone();
        let on_ended = Closure::<dyn FnMut()>::new(move || {
            events
                .borrow_mut()
                .push(AudioEvent::PlaybackEnded { source });
        });
        node.set_onended(Some(on_ended.as_ref().unchecked_ref()));

        if let Err(e) = node.start() {
            node.set_onended(None);
            let _ = node.disconnect();
            return Err(playback_err(e));
        }

        self.live.insert(
            source,
            ActiveSource {
                node,
                _on_ended: on_ended,
            },
        );
        Ok(source)
    }

    fn drain_events(&mut self) -> Vec<AudioEvent<AudioBuffer>> {
        let events = std::mem::take(&mut *self.events.borrow_mut());
        for event in &events {
            if let AudioEvent::PlaybackEnded { source } = event {
                if let Some(active) = self.live.remove(source) {
                    active.node.set_onended(None);
                    if let Err(e) = active.node.disconnect() {
                        log::warn!("Error during source cleanup: {}", js_err(&e));
                    }
                }
            }
        }
        events
    }
}
