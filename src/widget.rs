//! The chat widget.
//!
//! A [`Widget`] owns the resolved configuration, the conversation log and the
//! host [`Surface`], and reacts to host events: bubble clicks, key presses,
//! suggestion clicks, scroll reports. Network requests, the reply typing
//! animation and the delayed UI timers run as tokio tasks.
//!
//! State lives behind a mutex that is never held across an `.await` and never
//! held while host callbacks run. Listener invocations are collected while the
//! lock is held and dispatched once it is released, so callbacks may call back
//! into the widget. Every reset bumps an epoch; tasks started before the reset
//! compare epochs and stop silently.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::{Duration, Instant};

use tokio::runtime::Handle;

use crate::config::{WidgetConfig, WidgetOptions, browser_language_from_env, generate_session_id};
use crate::conversation::{Conversation, Message, NodeId, RenderMode, Sender};
use crate::error::{Error, Result};
use crate::listeners::{ListenerRegistry, WidgetEvent};
use crate::markdown::{format_markdown, plain_text};
use crate::observability::{
    MESSAGES_FALLBACK, MESSAGES_RECEIVED, MESSAGES_SENT, STREAM_ABANDONED, STREAM_STARTED,
    TRANSPORT_DURATION, TRANSPORT_ERRORS, TRANSPORT_REQUESTS, TRANSPORT_STALE, WIDGET_CLOSES,
    WIDGET_OPENS, WIDGET_RESETS,
};
use crate::surface::{MemorySurface, ScrollMetrics, Surface};
use crate::transport::{ChatRequest, HttpTransport, Outcome, Transport, interpret};
use crate::view::{self, LOADING_MARKUP, STYLE_ELEMENT_ID};

/// Delay between two characters of a typed-out reply.
pub const STREAM_INTERVAL: Duration = Duration::from_millis(14);

/// Delay between opening the panel and focusing the input.
pub const FOCUS_DELAY: Duration = Duration::from_millis(250);

/// Delay before the welcome popup appears.
pub const WELCOME_POPUP_DELAY: Duration = Duration::from_secs(3);

/// Host handler that takes over delivery of user messages.
pub type RequestHook = Arc<dyn Fn(&str) + Send + Sync>;

static DEFAULT_WIDGET: OnceLock<Widget> = OnceLock::new();

/////////////////////////////////////////////// Keys ///////////////////////////////////////////////

/// Keys the widget reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Other,
}

/// Modifier state of a key press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }
}

/// What the host should do after forwarding a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The draft was sent.
    Submitted,
    /// Let the key through so the input gets a newline.
    InsertNewline,
    /// The panel was closed.
    Closed,
    /// Nothing happened. A bare Enter never inserts a newline, even then.
    Ignored,
}

////////////////////////////////////////////// Builder /////////////////////////////////////////////

/// Assembles a [`Widget`].
///
/// Without a surface the widget renders into a fresh [`MemorySurface`];
/// without a transport it posts to the configured endpoint over HTTP; without
/// a browser language it reads the process locale.
pub struct WidgetBuilder {
    options: WidgetOptions,
    surface: Option<Box<dyn Surface>>,
    transport: Option<Arc<dyn Transport>>,
    browser_language: Option<String>,
}

impl WidgetBuilder {
    pub fn new(options: WidgetOptions) -> Self {
        Self {
            options,
            surface: None,
            transport: None,
            browser_language: None,
        }
    }

    pub fn surface(mut self, surface: impl Surface + 'static) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Locale reported by the host, e.g. `en-US`.
    pub fn browser_language(mut self, language: impl Into<String>) -> Self {
        self.browser_language = Some(language.into());
        self
    }

    /// Resolves the configuration, mounts the widget and renders the welcome
    /// message.
    pub fn build(self) -> Result<Widget> {
        let browser_language = self.browser_language.or_else(browser_language_from_env);
        let config = WidgetConfig::resolve(&self.options, browser_language.as_deref());
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(config.api_url.clone())?),
        };
        let surface = self
            .surface
            .unwrap_or_else(|| Box::new(MemorySurface::new()));
        Ok(Widget::start(config, surface, transport))
    }
}

////////////////////////////////////////////// Widget //////////////////////////////////////////////

struct State {
    surface: Box<dyn Surface>,
    conversation: Conversation,
    open: bool,
    unread: u32,
    has_opened: bool,
    at_bottom: bool,
    popup_visible: bool,
    popup_dismissed: bool,
    draft: String,
    session_id: String,
    epoch: u64,
    loading: Option<NodeId>,
}

struct Shared {
    config: Arc<WidgetConfig>,
    state: Mutex<State>,
    listeners: ListenerRegistry,
    transport: Arc<dyn Transport>,
    request_hook: Mutex<Option<RequestHook>>,
}

/// Work deferred until the state lock is released.
enum Effect {
    Emit(WidgetEvent),
    EmitText(WidgetEvent, String),
    Stream {
        id: NodeId,
        epoch: u64,
        markup: String,
    },
    FocusLater,
}

/// Handle to a mounted chat widget. Clones share the same widget.
#[derive(Clone)]
pub struct Widget {
    shared: Arc<Shared>,
}

impl Widget {
    /// Builds a widget rendering into `surface` with the default transport.
    pub fn init(options: WidgetOptions, surface: impl Surface + 'static) -> Result<Self> {
        WidgetBuilder::new(options).surface(surface).build()
    }

    pub fn builder(options: WidgetOptions) -> WidgetBuilder {
        WidgetBuilder::new(options)
    }

    /// Makes `widget` the process-wide default instance. Fails if one is
    /// already installed.
    pub fn install_default(widget: Widget) -> Result<()> {
        DEFAULT_WIDGET
            .set(widget)
            .map_err(|_| Error::widget("a default widget is already installed"))
    }

    /// The process-wide default instance, if installed.
    pub fn default_instance() -> Option<Widget> {
        DEFAULT_WIDGET.get().cloned()
    }

    fn start(config: WidgetConfig, surface: Box<dyn Surface>, transport: Arc<dyn Transport>) -> Self {
        let debug = config.debug;
        let state = State {
            surface,
            conversation: Conversation::new(),
            open: false,
            unread: 0,
            has_opened: false,
            at_bottom: true,
            popup_visible: false,
            popup_dismissed: false,
            draft: String::new(),
            session_id: config.session_id.clone(),
            epoch: 0,
            loading: None,
        };
        let widget = Widget {
            shared: Arc::new(Shared {
                config: Arc::new(config),
                state: Mutex::new(state),
                listeners: ListenerRegistry::new(debug),
                transport,
                request_hook: Mutex::new(None),
            }),
        };
        let mut effects = Vec::new();
        {
            let config = &widget.shared.config;
            let mut state = widget.lock();
            if state.surface.has_element(STYLE_ELEMENT_ID) {
                if debug {
                    tracing::debug!(id = STYLE_ELEMENT_ID, "stylesheet already installed");
                }
            } else {
                state
                    .surface
                    .install_stylesheet(STYLE_ELEMENT_ID, &view::stylesheet(config));
            }
            state.surface.mount(&view::widget_markup(config));
            widget.render_welcome(&mut state, &mut effects);
            if debug {
                tracing::debug!(
                    session_id = %state.session_id,
                    lang = %config.lang,
                    endpoint = %config.api_url,
                    theme = %config.theme,
                    "widget initialized"
                );
            }
        }
        widget.dispatch(effects);
        widget.schedule_welcome_popup();
        widget
    }

    ///////////////////////////////////////// listeners ////////////////////////////////////////

    pub fn on_open(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.shared.listeners.on_open(Arc::new(listener));
    }

    pub fn on_close(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.shared.listeners.on_close(Arc::new(listener));
    }

    pub fn on_message_sent(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.shared.listeners.on_message_sent(Arc::new(listener));
    }

    pub fn on_message_received(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.shared.listeners.on_message_received(Arc::new(listener));
    }

    /// Routes user messages to `handler` instead of the transport. The host
    /// answers through [`Widget::reply`].
    pub fn on_user_request(&self, handler: impl Fn(&str) + Send + Sync + 'static) {
        let hook: RequestHook = Arc::new(handler);
        *self
            .shared
            .request_hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(hook);
    }

    ////////////////////////////////////////// accessors ///////////////////////////////////////

    pub fn config(&self) -> &WidgetConfig {
        &self.shared.config
    }

    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    pub fn unread(&self) -> u32 {
        self.lock().unread
    }

    /// Session identifier sent with the next request.
    pub fn session_id(&self) -> String {
        self.lock().session_id.clone()
    }

    /// Messages in the log, in order.
    pub fn messages(&self) -> Vec<Message> {
        self.lock().conversation.messages().cloned().collect()
    }

    pub fn has_suggestions(&self) -> bool {
        self.lock().conversation.suggestions().is_some()
    }

    pub fn welcome_popup_visible(&self) -> bool {
        self.lock().popup_visible
    }

    pub fn draft(&self) -> String {
        self.lock().draft.clone()
    }

    //////////////////////////////////////// host events ///////////////////////////////////////

    /// Bubble click: opens a closed panel and closes an open one.
    pub fn toggle(&self) {
        let mut effects = Vec::new();
        {
            let mut state = self.lock();
            let open = !state.open;
            self.set_open_locked(&mut state, open, &mut effects);
        }
        self.dispatch(effects);
    }

    /// The header's minimize button.
    pub fn minimize(&self) {
        self.toggle();
    }

    /// The header's close button: closes the panel and starts a new
    /// conversation with a fresh session identifier.
    pub fn close(&self) {
        let mut effects = Vec::new();
        {
            let mut state = self.lock();
            self.set_open_locked(&mut state, false, &mut effects);
            state.conversation.clear();
            state.surface.clear_log();
            state.loading = None;
            state.epoch += 1;
            state.session_id = generate_session_id();
            state.unread = 0;
            state.surface.set_unread_badge(None);
            state.at_bottom = true;
            self.render_welcome(&mut state, &mut effects);
            WIDGET_RESETS.click();
            if self.shared.config.debug {
                tracing::debug!(session_id = %state.session_id, epoch = state.epoch, "conversation reset");
            }
        }
        self.dispatch(effects);
    }

    /// Forwards a key press from the input or the document.
    pub fn handle_key(&self, key: Key, modifiers: Modifiers) -> KeyOutcome {
        match key {
            Key::Enter if modifiers.shift || modifiers.ctrl => KeyOutcome::InsertNewline,
            Key::Enter => {
                if self.submit() {
                    KeyOutcome::Submitted
                } else {
                    KeyOutcome::Ignored
                }
            }
            Key::Escape => {
                let mut effects = Vec::new();
                let closed = {
                    let mut state = self.lock();
                    self.set_open_locked(&mut state, false, &mut effects)
                };
                self.dispatch(effects);
                if closed {
                    KeyOutcome::Closed
                } else {
                    KeyOutcome::Ignored
                }
            }
            Key::Other => KeyOutcome::Ignored,
        }
    }

    /// Input event: records the draft and lets the surface resize the input.
    pub fn set_draft(&self, text: impl Into<String>) {
        let mut state = self.lock();
        state.draft = text.into();
        let State { surface, draft, .. } = &mut *state;
        surface.autosize_input(draft);
    }

    /// Sends the trimmed draft. Returns false if it was empty.
    pub fn submit(&self) -> bool {
        let text = self.lock().draft.trim().to_string();
        if text.is_empty() {
            return false;
        }
        self.post(text, true);
        true
    }

    /// Suggestion click. Returns false if the block is gone or `index` is out
    /// of range.
    pub fn choose_suggestion(&self, index: usize) -> bool {
        let message = {
            let state = self.lock();
            if state.conversation.suggestions().is_none() {
                return false;
            }
            match self.shared.config.suggestions.get(index) {
                Some(suggestion) => suggestion.message.clone(),
                None => return false,
            }
        };
        self.post(message, false);
        true
    }

    /// The welcome popup's close button.
    pub fn dismiss_welcome_popup(&self) {
        let mut state = self.lock();
        Self::dismiss_popup_locked(&mut state);
    }

    /// Scroll report for the message log.
    pub fn on_scroll(&self, metrics: ScrollMetrics) {
        self.lock().at_bottom = metrics.is_at_bottom();
    }

    /////////////////////////////////////////// messages ///////////////////////////////////////

    /// Appends a bot message, as an answer to a request handled by the host.
    pub fn reply(&self, text: &str) -> NodeId {
        self.render(Sender::Bot, text, RenderMode::Plain)
    }

    /// Appends one message node.
    pub fn render(&self, sender: Sender, text: &str, mode: RenderMode) -> NodeId {
        let mut effects = Vec::new();
        let id = {
            let mut state = self.lock();
            self.render_locked(&mut state, sender, text, mode, &mut effects)
        };
        self.dispatch(effects);
        id
    }

    /// Sends `text` through the transport and renders the outcome.
    ///
    /// A loading placeholder is shown until the request completes. Outcomes of
    /// requests issued before a reset are dropped.
    pub fn send(&self, text: &str) {
        let mut effects = Vec::new();
        let (request, epoch, loading) = {
            let mut state = self.lock();
            let loading =
                self.render_locked(&mut state, Sender::Bot, "", RenderMode::Loading, &mut effects);
            let request = ChatRequest {
                chat_input: text.to_string(),
                session_id: state.session_id.clone(),
                lang: self.shared.config.lang.clone(),
            };
            (request, state.epoch, loading)
        };
        self.dispatch(effects);
        TRANSPORT_REQUESTS.click();
        if self.shared.config.debug {
            tracing::debug!(session_id = %request.session_id, lang = %request.lang, "sending message");
        }
        match Handle::try_current() {
            Ok(handle) => {
                let widget = self.clone();
                let transport = Arc::clone(&self.shared.transport);
                handle.spawn(async move {
                    let start = Instant::now();
                    let result = transport.exchange(&request).await;
                    TRANSPORT_DURATION.add(start.elapsed().as_secs_f64());
                    widget.complete(epoch, loading, interpret(result));
                });
            }
            Err(_) => {
                tracing::warn!("no async runtime; message not sent");
                self.complete(
                    epoch,
                    loading,
                    Outcome::Failed {
                        kind: "request",
                        reason: "no async runtime".to_string(),
                    },
                );
            }
        }
    }

    //////////////////////////////////////////// internals /////////////////////////////////////

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn post(&self, text: String, from_input: bool) {
        let mut effects = Vec::new();
        {
            let mut state = self.lock();
            Self::remove_suggestions_locked(&mut state);
            self.render_locked(&mut state, Sender::User, &text, RenderMode::Plain, &mut effects);
            if from_input {
                state.draft.clear();
                state.surface.clear_input();
                state.surface.focus_input();
            }
        }
        effects.push(Effect::EmitText(WidgetEvent::MessageSent, text.clone()));
        self.dispatch(effects);
        self.deliver(&text);
    }

    fn deliver(&self, text: &str) {
        let hook = self
            .shared
            .request_hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match hook {
            Some(hook) => {
                self.shared
                    .listeners
                    .supervise("user request hook", || hook(text));
            }
            None => self.send(text),
        }
    }

    fn complete(&self, epoch: u64, loading: NodeId, outcome: Outcome) {
        let config = &self.shared.config;
        let mut effects = Vec::new();
        {
            let mut state = self.lock();
            if state.epoch != epoch {
                TRANSPORT_STALE.click();
                if config.debug {
                    tracing::debug!(epoch, current = state.epoch, "dropping outcome from before reset");
                }
                return;
            }
            Self::remove_node_locked(&mut state, loading);
            match outcome {
                Outcome::Reply(reply) => {
                    let mode = if config.streaming {
                        RenderMode::Streaming
                    } else {
                        RenderMode::Plain
                    };
                    self.render_locked(&mut state, Sender::Bot, &reply, mode, &mut effects);
                }
                Outcome::Unrecognized(body) => {
                    MESSAGES_FALLBACK.click();
                    if config.debug {
                        tracing::debug!(%body, "response carried no reply");
                    }
                    self.render_locked(
                        &mut state,
                        Sender::Bot,
                        &config.not_understood,
                        RenderMode::Plain,
                        &mut effects,
                    );
                }
                Outcome::Failed { kind, reason } => {
                    TRANSPORT_ERRORS.click();
                    MESSAGES_FALLBACK.click();
                    if config.debug {
                        tracing::debug!(kind, reason = %reason, "request failed");
                    }
                    self.render_locked(
                        &mut state,
                        Sender::Bot,
                        &config.connection_error,
                        RenderMode::Plain,
                        &mut effects,
                    );
                }
            }
        }
        self.dispatch(effects);
    }

    fn render_locked(
        &self,
        state: &mut State,
        sender: Sender,
        text: &str,
        mode: RenderMode,
        effects: &mut Vec<Effect>,
    ) -> NodeId {
        let id = match mode {
            RenderMode::Plain => {
                let markup = format_markdown(text);
                let id = state.conversation.push(sender, text, markup.clone(), mode);
                state
                    .surface
                    .append_node(id, &view::message_markup(sender, &markup));
                id
            }
            RenderMode::Loading => {
                if let Some(previous) = state.loading.take() {
                    Self::remove_node_locked(state, previous);
                }
                let id = state.conversation.push(sender, text, LOADING_MARKUP, mode);
                state
                    .surface
                    .append_node(id, &view::message_markup(sender, LOADING_MARKUP));
                state.loading = Some(id);
                id
            }
            RenderMode::Streaming => {
                let markup = format_markdown(text);
                let id = state.conversation.push(sender, text, markup.clone(), mode);
                state.surface.append_node(id, &view::message_markup(sender, ""));
                STREAM_STARTED.click();
                effects.push(Effect::Stream {
                    id,
                    epoch: state.epoch,
                    markup,
                });
                id
            }
        };
        Self::auto_scroll(state);
        if mode == RenderMode::Loading {
            return id;
        }
        match sender {
            Sender::Bot => {
                MESSAGES_RECEIVED.click();
                if !state.open {
                    state.unread = state.unread.saturating_add(1);
                    let badge = view::badge_text(state.unread);
                    state.surface.set_unread_badge(badge.as_deref());
                }
            }
            Sender::User => MESSAGES_SENT.click(),
        }
        effects.push(Effect::EmitText(
            WidgetEvent::MessageReceived,
            text.to_string(),
        ));
        if self.shared.config.debug {
            tracing::debug!(%sender, ?mode, id, "message rendered");
        }
        id
    }

    fn render_welcome(&self, state: &mut State, effects: &mut Vec<Effect>) {
        let config = &self.shared.config;
        if config.welcome_message.is_empty() {
            return;
        }
        self.render_locked(
            state,
            Sender::Bot,
            &config.welcome_message,
            RenderMode::Plain,
            effects,
        );
        if !config.suggestions.is_empty()
            && let Some(id) = state.conversation.push_suggestions()
        {
            state
                .surface
                .append_node(id, &view::suggestions_markup(&config.suggestions));
            Self::auto_scroll(state);
        }
    }

    /// Returns true if the open state changed.
    fn set_open_locked(&self, state: &mut State, open: bool, effects: &mut Vec<Effect>) -> bool {
        if state.open == open {
            return false;
        }
        state.open = open;
        state.surface.set_open(open);
        if open {
            if !state.has_opened {
                state.has_opened = true;
                Self::dismiss_popup_locked(state);
            }
            state.unread = 0;
            state.surface.set_unread_badge(None);
            WIDGET_OPENS.click();
            effects.push(Effect::FocusLater);
            effects.push(Effect::Emit(WidgetEvent::Opened));
        } else {
            WIDGET_CLOSES.click();
            effects.push(Effect::Emit(WidgetEvent::Closed));
        }
        if self.shared.config.debug {
            tracing::debug!(open, "widget toggled");
        }
        true
    }

    fn dismiss_popup_locked(state: &mut State) {
        state.popup_dismissed = true;
        if state.popup_visible {
            state.popup_visible = false;
            state.surface.hide_welcome_popup();
        }
    }

    fn remove_suggestions_locked(state: &mut State) {
        if let Some(id) = state.conversation.suggestions() {
            state.conversation.remove(id);
            state.surface.remove_node(id);
        }
    }

    fn remove_node_locked(state: &mut State, id: NodeId) {
        if state.conversation.remove(id) {
            state.surface.remove_node(id);
        }
        if state.loading == Some(id) {
            state.loading = None;
        }
    }

    fn auto_scroll(state: &mut State) {
        if state.at_bottom {
            state.surface.scroll_to_bottom();
        }
    }

    fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Emit(event) => self.shared.listeners.emit(event),
                Effect::EmitText(event, text) => self.shared.listeners.emit_text(event, &text),
                Effect::Stream { id, epoch, markup } => self.spawn_stream(id, epoch, markup),
                Effect::FocusLater => self.spawn_focus(),
            }
        }
    }

    ///////////////////////////////////////////// timers ///////////////////////////////////////

    fn spawn_stream(&self, id: NodeId, epoch: u64, markup: String) {
        match Handle::try_current() {
            Ok(handle) => {
                let widget = self.clone();
                handle.spawn(async move { widget.stream(id, epoch, markup).await });
            }
            Err(_) => {
                self.finish_stream(id, epoch, &markup);
            }
        }
    }

    async fn stream(self, id: NodeId, epoch: u64, markup: String) {
        let plain = plain_text(&markup);
        let mut chars = plain.chars();
        let mut typed = String::with_capacity(plain.len());
        loop {
            if !self.type_prefix(id, epoch, &typed) {
                STREAM_ABANDONED.click();
                return;
            }
            tokio::time::sleep(STREAM_INTERVAL).await;
            match chars.next() {
                Some(c) => typed.push(c),
                None => break,
            }
        }
        if !self.finish_stream(id, epoch, &markup) {
            STREAM_ABANDONED.click();
        }
    }

    fn type_prefix(&self, id: NodeId, epoch: u64, typed: &str) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch || !state.conversation.contains(id) {
            return false;
        }
        state.surface.set_node_text(id, typed);
        true
    }

    fn finish_stream(&self, id: NodeId, epoch: u64, markup: &str) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch || !state.conversation.settle(id) {
            return false;
        }
        state.surface.set_node_markup(id, markup);
        Self::auto_scroll(&mut state);
        true
    }

    fn spawn_focus(&self) {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("no async runtime; input focus skipped");
            return;
        };
        let widget = self.clone();
        handle.spawn(async move {
            tokio::time::sleep(FOCUS_DELAY).await;
            widget.focus_if_open();
        });
    }

    fn focus_if_open(&self) {
        let mut state = self.lock();
        if state.open {
            state.surface.focus_input();
        }
    }

    fn schedule_welcome_popup(&self) {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("no async runtime; welcome popup disabled");
            return;
        };
        let widget = self.clone();
        handle.spawn(async move {
            tokio::time::sleep(WELCOME_POPUP_DELAY).await;
            widget.show_welcome_popup();
        });
    }

    fn show_welcome_popup(&self) {
        let welcome = &self.shared.config.welcome_message;
        let mut state = self.lock();
        if state.has_opened
            || state.open
            || state.popup_dismissed
            || state.popup_visible
            || welcome.is_empty()
        {
            return;
        }
        let markup = view::welcome_popup_markup(&format_markdown(welcome));
        state.surface.show_welcome_popup(&markup);
        state.popup_visible = true;
    }
}

impl fmt::Debug for Widget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Widget")
            .field("open", &state.open)
            .field("unread", &state.unread)
            .field("session_id", &state.session_id)
            .field("messages", &state.conversation.messages().count())
            .finish_non_exhaustive()
    }
}
