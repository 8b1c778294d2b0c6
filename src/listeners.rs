//! Event listener registry.
//!
//! Four append-only lists, one per event kind. Listeners run under
//! supervision: a panicking listener is caught, counted and (when diagnostics
//! are on) logged, and the remaining listeners still run.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use crate::observability::LISTENER_PANICS;

/// Listener for events without payload.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Listener receiving message text.
pub type TextListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Widget events hosts can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetEvent {
    Opened,
    Closed,
    MessageSent,
    MessageReceived,
}

#[derive(Default)]
struct Lists {
    opened: Vec<Listener>,
    closed: Vec<Listener>,
    message_sent: Vec<TextListener>,
    message_received: Vec<TextListener>,
}

/// Append-only listener lists.
#[derive(Default)]
pub struct ListenerRegistry {
    lists: Mutex<Lists>,
    debug: bool,
}

impl ListenerRegistry {
    /// Creates an empty registry; `debug` enables logging of listener panics.
    pub fn new(debug: bool) -> Self {
        Self {
            lists: Mutex::new(Lists::default()),
            debug,
        }
    }

    pub fn on_open(&self, listener: Listener) {
        self.lock().opened.push(listener);
    }

    pub fn on_close(&self, listener: Listener) {
        self.lock().closed.push(listener);
    }

    pub fn on_message_sent(&self, listener: TextListener) {
        self.lock().message_sent.push(listener);
    }

    pub fn on_message_received(&self, listener: TextListener) {
        self.lock().message_received.push(listener);
    }

    /// Number of listeners registered for `event`.
    pub fn count(&self, event: WidgetEvent) -> usize {
        let lists = self.lock();
        match event {
            WidgetEvent::Opened => lists.opened.len(),
            WidgetEvent::Closed => lists.closed.len(),
            WidgetEvent::MessageSent => lists.message_sent.len(),
            WidgetEvent::MessageReceived => lists.message_received.len(),
        }
    }

    /// Runs the listeners of a payload-free event.
    ///
    /// The list is snapshotted first, so listeners may register further
    /// listeners or call back into the widget.
    pub fn emit(&self, event: WidgetEvent) {
        let snapshot = {
            let lists = self.lock();
            match event {
                WidgetEvent::Opened => lists.opened.clone(),
                WidgetEvent::Closed => lists.closed.clone(),
                WidgetEvent::MessageSent | WidgetEvent::MessageReceived => Vec::new(),
            }
        };
        for listener in snapshot {
            self.supervise(event, || listener());
        }
    }

    /// Runs the listeners of a message event with `text`.
    pub fn emit_text(&self, event: WidgetEvent, text: &str) {
        let snapshot = {
            let lists = self.lock();
            match event {
                WidgetEvent::MessageSent => lists.message_sent.clone(),
                WidgetEvent::MessageReceived => lists.message_received.clone(),
                WidgetEvent::Opened | WidgetEvent::Closed => Vec::new(),
            }
        };
        for listener in snapshot {
            self.supervise(event, || listener(text));
        }
    }

    /// Runs `f`, containing any panic. Returns false if it panicked.
    ///
    /// `context` names the callback in the diagnostic log.
    pub(crate) fn supervise(&self, context: impl fmt::Debug, f: impl FnOnce()) -> bool {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(()) => true,
            Err(payload) => {
                LISTENER_PANICS.click();
                if self.debug {
                    let reason = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::debug!(?context, reason = %reason, "listener panicked");
                }
                false
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Lists> {
        self.lists.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn panicking_listener_does_not_block_others() {
        let registry = ListenerRegistry::new(true);
        let hits = Arc::new(AtomicUsize::new(0));
        let h1 = hits.clone();
        registry.on_open(Arc::new(move || {
            h1.fetch_add(1, Ordering::SeqCst);
        }));
        registry.on_open(Arc::new(|| panic!("listener failure")));
        let h3 = hits.clone();
        registry.on_open(Arc::new(move || {
            h3.fetch_add(1, Ordering::SeqCst);
        }));
        registry.emit(WidgetEvent::Opened);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn text_listeners_receive_payload() {
        let registry = ListenerRegistry::new(false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        registry.on_message_sent(Arc::new(move |text: &str| {
            sink.lock().unwrap().push(text.to_string());
        }));
        registry.emit_text(WidgetEvent::MessageSent, "hello");
        registry.emit_text(WidgetEvent::MessageReceived, "ignored");
        assert_eq!(*seen.lock().unwrap(), vec!["hello".to_string()]);
        assert_eq!(registry.count(WidgetEvent::MessageSent), 1);
        assert_eq!(registry.count(WidgetEvent::MessageReceived), 0);
    }

    #[test]
    fn listener_may_register_listener() {
        let registry = Arc::new(ListenerRegistry::new(false));
        let inner = registry.clone();
        registry.on_close(Arc::new(move || {
            inner.on_close(Arc::new(|| {}));
        }));
        registry.emit(WidgetEvent::Closed);
        assert_eq!(registry.count(WidgetEvent::Closed), 2);
    }
}
