use biometrics::{Collector, Counter, Moments};

pub(crate) static WIDGET_OPENS: Counter = Counter::new("floatchat.widget.opens");
pub(crate) static WIDGET_CLOSES: Counter = Counter::new("floatchat.widget.closes");
pub(crate) static WIDGET_RESETS: Counter = Counter::new("floatchat.widget.resets");
pub(crate) static LISTENER_PANICS: Counter = Counter::new("floatchat.widget.listener_panics");

pub(crate) static MESSAGES_SENT: Counter = Counter::new("floatchat.messages.sent");
pub(crate) static MESSAGES_RECEIVED: Counter = Counter::new("floatchat.messages.received");
pub(crate) static MESSAGES_FALLBACK: Counter = Counter::new("floatchat.messages.fallback");

pub(crate) static TRANSPORT_REQUESTS: Counter = Counter::new("floatchat.transport.requests");
pub(crate) static TRANSPORT_ERRORS: Counter = Counter::new("floatchat.transport.errors");
pub(crate) static TRANSPORT_STALE: Counter = Counter::new("floatchat.transport.stale_outcomes");
pub(crate) static TRANSPORT_DURATION: Moments =
    Moments::new("floatchat.transport.request_duration_seconds");

pub(crate) static STREAM_STARTED: Counter = Counter::new("floatchat.stream.started");
pub(crate) static STREAM_ABANDONED: Counter = Counter::new("floatchat.stream.abandoned");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&WIDGET_OPENS);
    collector.register_counter(&WIDGET_CLOSES);
    collector.register_counter(&WIDGET_RESETS);
    collector.register_counter(&LISTENER_PANICS);

    collector.register_counter(&MESSAGES_SENT);
    collector.register_counter(&MESSAGES_RECEIVED);
    collector.register_counter(&MESSAGES_FALLBACK);

    collector.register_counter(&TRANSPORT_REQUESTS);
    collector.register_counter(&TRANSPORT_ERRORS);
    collector.register_counter(&TRANSPORT_STALE);
    collector.register_moments(&TRANSPORT_DURATION);

    collector.register_counter(&STREAM_STARTED);
    collector.register_counter(&STREAM_ABANDONED);
}
