use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("otters.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("otters.client.request_errors");
pub(crate) static CLIENT_UNAUTHORIZED: Counter = Counter::new("otters.client.unauthorized");
pub(crate) static CLIENT_NETWORK_FAILURES: Counter =
    Counter::new("otters.client.network_failures");
pub(crate) static CLIENT_TOKEN_REFRESHES: Counter = Counter::new("otters.client.token_refreshes");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("otters.client.request_duration_seconds");

pub(crate) static CHAT_SENDS: Counter = Counter::new("otters.chat.sends");
pub(crate) static CHAT_SEND_FAILURES: Counter = Counter::new("otters.chat.send_failures");
pub(crate) static CHAT_DROPPED_EMPTY: Counter = Counter::new("otters.chat.dropped_empty");
pub(crate) static CHAT_DROPPED_BUSY: Counter = Counter::new("otters.chat.dropped_busy");
pub(crate) static SESSION_CREATE_FAILURES: Counter =
    Counter::new("otters.chat.session_create_failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_counter(&CLIENT_UNAUTHORIZED);
    collector.register_counter(&CLIENT_NETWORK_FAILURES);
    collector.register_counter(&CLIENT_TOKEN_REFRESHES);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&CHAT_SENDS);
    collector.register_counter(&CHAT_SEND_FAILURES);
    collector.register_counter(&CHAT_DROPPED_EMPTY);
    collector.register_counter(&CHAT_DROPPED_BUSY);
    collector.register_counter(&SESSION_CREATE_FAILURES);
}
