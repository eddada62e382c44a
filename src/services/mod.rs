pub(crate) mod attempt_timing;
pub(crate) mod attempts;
pub(crate) mod availability;
pub(crate) mod presentation;
pub(crate) mod scoring;
pub(crate) mod store;
