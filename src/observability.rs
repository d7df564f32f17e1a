use biometrics::{Collector, Counter, Moments};

pub(crate) static DISPATCH_REQUESTS: Counter = Counter::new("ecobot.dispatch.requests");
pub(crate) static DISPATCH_ANSWERED: Counter = Counter::new("ecobot.dispatch.answered");
pub(crate) static DISPATCH_UNANSWERED: Counter = Counter::new("ecobot.dispatch.unanswered");
pub(crate) static DISPATCH_FAILURES: Counter = Counter::new("ecobot.dispatch.failures");
pub(crate) static DISPATCH_DURATION: Moments = Moments::new("ecobot.dispatch.duration_seconds");

pub(crate) static STORE_REJECTED_SUBMISSIONS: Counter =
    Counter::new("ecobot.store.rejected_submissions");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&DISPATCH_REQUESTS);
    collector.register_counter(&DISPATCH_ANSWERED);
    collector.register_counter(&DISPATCH_UNANSWERED);
    collector.register_counter(&DISPATCH_FAILURES);
    collector.register_moments(&DISPATCH_DURATION);

    collector.register_counter(&STORE_REJECTED_SUBMISSIONS);
}
