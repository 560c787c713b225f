use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("chatstream.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("chatstream.client.request_errors");
pub(crate) static CLIENT_BAD_STATUS: Counter = Counter::new("chatstream.client.bad_status");

pub(crate) static STREAM_BYTES: Counter = Counter::new("chatstream.stream.bytes");
pub(crate) static STREAM_LINES: Counter = Counter::new("chatstream.stream.lines");
pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("chatstream.stream.fragments");
pub(crate) static STREAM_IGNORED_LINES: Counter = Counter::new("chatstream.stream.ignored_lines");
pub(crate) static STREAM_MALFORMED_LINES: Counter =
    Counter::new("chatstream.stream.malformed_lines");
pub(crate) static STREAM_SERVER_ERRORS: Counter = Counter::new("chatstream.stream.server_errors");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("chatstream.stream.errors");
pub(crate) static STREAM_CANCELLATIONS: Counter = Counter::new("chatstream.stream.cancellations");
pub(crate) static STREAM_DISCARDED_BYTES: Counter =
    Counter::new("chatstream.stream.discarded_bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("chatstream.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("chatstream.stream.duration_seconds");

pub(crate) static SESSION_TURNS: Counter = Counter::new("chatstream.session.turns");
pub(crate) static SESSION_IGNORED_SENDS: Counter =
    Counter::new("chatstream.session.ignored_sends");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&CLIENT_BAD_STATUS);

    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_LINES);
    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_IGNORED_LINES);
    collector.register_counter(&STREAM_MALFORMED_LINES);
    collector.register_counter(&STREAM_SERVER_ERRORS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_CANCELLATIONS);
    collector.register_counter(&STREAM_DISCARDED_BYTES);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSION_TURNS);
    collector.register_counter(&SESSION_IGNORED_SENDS);
}
